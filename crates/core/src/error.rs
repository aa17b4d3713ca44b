//! Error types for the core domain.

use thiserror::Error;

/// Core domain error type.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid session id")]
    InvalidSessionId,

    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("file type not allowed: {0}")]
    DisallowedExtension(String),

    #[error("file too large: {declared} bytes (maximum {max})")]
    TooLarge { declared: u64, max: u64 },

    #[error("invalid chunk index: {0}")]
    InvalidChunkIndex(String),

    #[error("invalid chunk count: {0}")]
    InvalidChunkCount(String),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;
