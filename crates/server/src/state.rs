use std::sync::Arc;

use service::NotificationService;

#[derive(Clone)]
pub struct ServerState {
    pub notifier: Arc<NotificationService>,
}

impl ServerState {
    pub fn new(notifier: NotificationService) -> Self {
        Self { notifier: Arc::new(notifier) }
    }
}
