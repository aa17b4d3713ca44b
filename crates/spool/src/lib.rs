//! Filesystem state for the Airlift upload pipeline.
//!
//! Two abstractions live here, both trait-seamed so tests and future
//! backends can swap implementations:
//!
//! - [`ChunkSpool`] — the staging arena for in-flight upload sessions,
//!   one directory per session id holding `session.json` plus the
//!   zero-padded chunk files.
//! - [`VideoLibrary`] — the durable per-station video store, written
//!   through [`AssemblySink`] handles that guarantee partial output is
//!   removed on abort.

pub mod backends;
pub mod error;
pub mod traits;

pub use backends::filesystem::{FilesystemLibrary, FilesystemSpool};
pub use error::{SpoolError, SpoolResult};
pub use traits::{AssemblySink, ChunkSpool, VideoLibrary};

use airlift_core::config::StorageConfig;
use std::sync::Arc;

/// Build the filesystem spool and library from configuration.
pub async fn from_config(
    config: &StorageConfig,
) -> SpoolResult<(Arc<dyn ChunkSpool>, Arc<dyn VideoLibrary>)> {
    let spool = FilesystemSpool::new(&config.spool_path).await?;
    let library = FilesystemLibrary::new(&config.library_path).await?;
    Ok((Arc::new(spool), Arc::new(library)))
}
