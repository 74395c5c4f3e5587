//! Error types shared by the storage and configuration layers.

/// Errors raised while loading configuration or talking to the database.
#[derive(Debug, thiserror::Error)]
pub enum ResetError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

pub type ResetResult<T> = Result<T, ResetError>;
