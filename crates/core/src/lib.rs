//! Core domain types for the Airlift upload pipeline.
//!
//! This crate defines the vocabulary shared by the spool, the ledger store
//! and the HTTP surface: session identity, session metadata, video
//! classification, filename hygiene and configuration. It performs no I/O.

pub mod config;
pub mod error;
pub mod filename;
pub mod session;
pub mod video;

pub use error::{Error, Result};

/// Maximum declared upload size (500 MiB).
pub const MAX_UPLOAD_SIZE_BYTES: u64 = 500 * 1024 * 1024;

/// Maximum number of videos a single station may hold.
pub const MAX_VIDEOS_PER_STATION: u64 = 20;

/// Allowed deviation between the declared size and the assembled size,
/// absorbing chunk-boundary rounding on the client side.
pub const SIZE_TOLERANCE_BYTES: u64 = 1024;

/// Width of the zero-padded chunk index in chunk file names. Six digits
/// keep lexical and numeric ordering identical for any realistic upload.
pub const CHUNK_INDEX_WIDTH: usize = 6;

/// File extensions accepted at session init.
pub const ALLOWED_EXTENSIONS: &[&str] = &["mp4", "m4v", "mov", "webm", "mkv", "avi"];
