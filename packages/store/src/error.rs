//! Errors returned by every [`crate::DocumentStore`] backend.

use thiserror::Error;

/// Storage-layer failure. Any of these aborts the batch it occurred in.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store misconfigured: {0}")]
    Config(String),

    #[error("invalid document path: {0:?}")]
    InvalidPath(String),

    #[error("document not found: {0}")]
    NotFound(String),

    #[error("batch of {len} writes exceeds the limit of {max}")]
    BatchTooLarge { len: usize, max: usize },

    #[error("chunk size {size} must be between 1 and {max}")]
    InvalidChunkSize { size: usize, max: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("cannot decode stored value: {0}")]
    Decode(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("store rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },
}
