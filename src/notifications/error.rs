#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("Notification channel error: {0}")]
    Channel(String),

    #[error("Notification rejected with status {0}")]
    Rejected(u16),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<reqwest::Error> for NotificationError {
    fn from(err: reqwest::Error) -> Self {
        NotificationError::Channel(err.to_string())
    }
}
