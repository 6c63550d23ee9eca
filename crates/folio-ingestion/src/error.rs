//! Ingestion error types.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, IngestError>;

#[derive(Debug, Error)]
pub enum IngestError {
    /// The document could not be opened or parsed at all. Fatal for that
    /// document only.
    #[error("Document unreadable: {path}: {reason}")]
    DocumentUnreadable { path: PathBuf, reason: String },

    /// Chunking parameters that would stall or make no sense.
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Extraction of {path} timed out after {secs}s")]
    Timeout { path: PathBuf, secs: u64 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] folio_db::DbError),

    #[error("Worker task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl IngestError {
    pub(crate) fn unreadable(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::DocumentUnreadable {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}
