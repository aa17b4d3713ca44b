//! API error types.
//!
//! Error signaling on this protocol is in-band: every error renders as
//! HTTP 200 with `{"success": false, "error": "..."}` so legacy upload
//! clients that only inspect the body keep working. The machine-readable
//! `code()` feeds logs and metrics, not the wire.

use axum::Json;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// Transport-layer chunk upload failures, mirroring the classic
/// form-upload error codes.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("uploaded chunk exceeds the size limit")]
    SizeLimit,

    #[error("chunk was only partially transferred")]
    Partial,

    #[error("no space left in the upload spool")]
    NoSpace,

    #[error("failed to write chunk to the upload spool")]
    Write,
}

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("unknown upload session")]
    UnknownSession,

    #[error("station not found")]
    UnknownStation,

    #[error("video limit reached: {count} of {max}")]
    VideoCapReached { count: u64, max: u64 },

    #[error("missing chunks: received {received} of {total}")]
    MissingChunks { received: u32, total: u32 },

    #[error("chunk {index} missing during assembly")]
    MissingChunkFile { index: u32 },

    #[error("size mismatch: expected {expected} bytes, assembled {actual}")]
    SizeMismatch { expected: u64, actual: u64 },

    #[error("insufficient coins: balance {balance}, cost {cost}")]
    InsufficientFunds { balance: i64, cost: i64 },

    #[error("{0}")]
    Transfer(#[from] TransferError),

    #[error("{0}")]
    Core(#[from] airlift_core::Error),

    #[error("storage error: {0}")]
    Spool(#[from] airlift_spool::SpoolError),

    #[error("ledger error: {0}")]
    Metadata(#[from] airlift_metadata::MetadataError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Get the error code for this error, used as a metrics label.
    pub fn code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "bad_request",
            Self::UnknownSession => "unknown_session",
            Self::UnknownStation => "unknown_station",
            Self::VideoCapReached { .. } => "video_cap_reached",
            Self::MissingChunks { .. } => "missing_chunks",
            Self::MissingChunkFile { .. } => "missing_chunk_file",
            Self::SizeMismatch { .. } => "size_mismatch",
            Self::InsufficientFunds { .. } => "insufficient_funds",
            Self::Transfer(TransferError::SizeLimit) => "chunk_too_large",
            Self::Transfer(TransferError::Partial) => "partial_transfer",
            Self::Transfer(TransferError::NoSpace) => "spool_full",
            Self::Transfer(TransferError::Write) => "spool_write_failed",
            Self::Core(_) => "validation_failed",
            Self::Spool(_) => "storage_error",
            Self::Metadata(_) => "ledger_error",
            Self::Internal(_) => "internal_error",
        }
    }
}

/// In-band error envelope.
#[derive(Debug, Serialize)]
struct ErrorBody {
    success: bool,
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        crate::metrics::record_upload_error(self.code());
        tracing::warn!(code = self.code(), error = %self, "upload request failed");
        Json(ErrorBody {
            success: false,
            error: self.to_string(),
        })
        .into_response()
    }
}

/// Result type for API handlers.
pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(ApiError::UnknownSession.code(), "unknown_session");
        assert_eq!(
            ApiError::InsufficientFunds { balance: 5, cost: 10 }.code(),
            "insufficient_funds"
        );
        assert_eq!(
            ApiError::Transfer(TransferError::SizeLimit).code(),
            "chunk_too_large"
        );
    }

    #[test]
    fn messages_surface_exact_counts() {
        let err = ApiError::MissingChunks {
            received: 2,
            total: 3,
        };
        assert_eq!(err.to_string(), "missing chunks: received 2 of 3");

        let err = ApiError::SizeMismatch {
            expected: 1000,
            actual: 4096,
        };
        assert!(err.to_string().contains("expected 1000"));
        assert!(err.to_string().contains("assembled 4096"));
    }
}
