//! Spool error types.

use thiserror::Error;

/// Spool and library operation errors.
#[derive(Debug, Error)]
pub enum SpoolError {
    #[error("upload session not found: {0}")]
    SessionNotFound(String),

    #[error("upload session already exists: {0}")]
    SessionExists(String),

    #[error("chunk {index} is missing")]
    MissingChunk { index: u32 },

    #[error("invalid file name: {0}")]
    InvalidName(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("session metadata error: {0}")]
    Metadata(#[from] serde_json::Error),
}

/// Result type for spool operations.
pub type SpoolResult<T> = std::result::Result<T, SpoolError>;
