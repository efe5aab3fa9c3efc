use sqlx::Error as SqlxError;
use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] SqlxError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Ractor error: {0}")]
    Actor(String),

    #[error("Background task failed: {0}")]
    Background(#[from] tokio::task::JoinError),
}
