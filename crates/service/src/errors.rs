use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("invalid payload: {0}")]
    Payload(String),
    #[error("gitea api error: {0}")]
    Gitea(String),
    #[error("slack api error: {0}")]
    Slack(String),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("storage error: {0}")]
    Storage(String),
}

impl NotifyError {
    /// Failures of an upstream API rather than of this service.
    pub fn is_upstream(&self) -> bool {
        matches!(self, Self::Gitea(_) | Self::Slack(_) | Self::Http(_))
    }
}
