use async_trait::async_trait;

use super::domain::Thread;
use crate::errors::NotifyError;

/// Repository abstraction for thread persistence.
#[async_trait]
pub trait ThreadRepository: Send + Sync {
    async fn find(&self, repository: &str, number: i64) -> Result<Option<Thread>, NotifyError>;
    async fn save(&self, repository: &str, number: i64, channel: &str, ts: &str) -> Result<Thread, NotifyError>;
}

/// Simple in-memory mock repository for tests
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct MockThreadRepository {
        threads: Mutex<HashMap<(String, i64), Thread>>, // key: (repository, number)
        fail_saves: AtomicBool,
    }

    impl MockThreadRepository {
        /// Make every `save` fail like a lost database connection.
        pub fn fail_saves(&self, fail: bool) {
            self.fail_saves.store(fail, Ordering::SeqCst);
        }

        pub fn len(&self) -> usize {
            self.threads.lock().unwrap().len()
        }

        pub fn is_empty(&self) -> bool {
            self.len() == 0
        }
    }

    #[async_trait]
    impl ThreadRepository for MockThreadRepository {
        async fn find(&self, repository: &str, number: i64) -> Result<Option<Thread>, NotifyError> {
            let threads = self.threads.lock().unwrap();
            Ok(threads.get(&(repository.to_string(), number)).cloned())
        }

        async fn save(&self, repository: &str, number: i64, channel: &str, ts: &str) -> Result<Thread, NotifyError> {
            if self.fail_saves.load(Ordering::SeqCst) {
                return Err(NotifyError::Storage("connection closed".into()));
            }
            let mut threads = self.threads.lock().unwrap();
            let t = Thread {
                repository: repository.to_string(),
                number,
                channel: channel.to_string(),
                ts: ts.to_string(),
            };
            threads.insert((repository.to_string(), number), t.clone());
            Ok(t)
        }
    }
}
