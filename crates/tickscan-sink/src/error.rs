//! Sink error types.

use thiserror::Error;

/// Errors that can occur while persisting or publishing.
#[derive(Error, Debug)]
pub enum SinkError {
    /// Database error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Unsupported database URL scheme.
    #[error("unsupported database URL '{0}', expected sqlite:// or postgres://")]
    UnsupportedDatabase(String),

    /// I/O error preparing a database file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Redis error.
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// Kafka error.
    #[error("kafka error: {0}")]
    Kafka(String),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
