use sea_orm::DatabaseConnection;

use crate::errors::NotifyError;
use crate::threads::domain::Thread;
use crate::threads::repository::ThreadRepository;

pub struct SeaOrmThreadRepository {
    pub db: DatabaseConnection,
}

#[async_trait::async_trait]
impl ThreadRepository for SeaOrmThreadRepository {
    async fn find(&self, repository: &str, number: i64) -> Result<Option<Thread>, NotifyError> {
        let res = models::pull_request_thread::find_by_key(&self.db, repository, number)
            .await
            .map_err(|e| NotifyError::Storage(e.to_string()))?;
        Ok(res.map(Thread::from))
    }

    async fn save(&self, repository: &str, number: i64, channel: &str, ts: &str) -> Result<Thread, NotifyError> {
        let m = models::pull_request_thread::upsert(&self.db, repository, number, channel, ts)
            .await
            .map_err(|e| NotifyError::Storage(e.to_string()))?;
        Ok(Thread::from(m))
    }
}
