//! Blob store error types.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, DbError>;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Blob not found: {0}")]
    NotFound(String),

    #[error("Invalid blob id: {0}")]
    InvalidId(String),

    #[error("Integrity mismatch for blob {id}: recorded {recorded}, computed {computed}")]
    IntegrityMismatch {
        id: String,
        recorded: String,
        computed: String,
    },
}
