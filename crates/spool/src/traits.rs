//! Spool trait definitions.

use crate::error::SpoolResult;
use airlift_core::session::{SessionId, UploadSession};
use async_trait::async_trait;
use bytes::Bytes;
use time::OffsetDateTime;
use uuid::Uuid;

/// Staging arena for in-flight upload sessions.
///
/// Each session owns an isolated area keyed by its id. Chunks are
/// append-only: written once (an identical index may be overwritten by a
/// retry), read back during assembly, and deleted with the session.
#[async_trait]
pub trait ChunkSpool: Send + Sync + 'static {
    /// Create the session area and persist its initial metadata.
    ///
    /// Fails if the session already exists. A failure to persist the
    /// metadata tears the freshly created area back down, so no partial
    /// state survives.
    async fn create_session(&self, session: &UploadSession) -> SpoolResult<()>;

    /// Load session metadata; `None` if the session is unknown.
    async fn load_session(&self, id: &SessionId) -> SpoolResult<Option<UploadSession>>;

    /// Persist updated session metadata.
    async fn store_session(&self, session: &UploadSession) -> SpoolResult<()>;

    /// Persist one chunk under its zero-padded index name.
    ///
    /// Returns `true` when the index was not present before; a retry of an
    /// already-received index overwrites the data and returns `false`.
    async fn write_chunk(&self, id: &SessionId, index: u32, data: Bytes) -> SpoolResult<bool>;

    /// Read one chunk back for assembly.
    ///
    /// A missing chunk file surfaces as [`SpoolError::MissingChunk`] so the
    /// assembler can report the exact index.
    ///
    /// [`SpoolError::MissingChunk`]: crate::error::SpoolError::MissingChunk
    async fn read_chunk(&self, id: &SessionId, index: u32) -> SpoolResult<Bytes>;

    /// Remove the whole session area, chunks and metadata. Idempotent:
    /// removing an unknown session succeeds.
    async fn remove_session(&self, id: &SessionId) -> SpoolResult<()>;

    /// List sessions currently staged, with their creation times. Used by
    /// the stale-session reaper.
    async fn list_sessions(&self) -> SpoolResult<Vec<(SessionId, OffsetDateTime)>>;
}

/// Durable per-station store for assembled videos.
#[async_trait]
pub trait VideoLibrary: Send + Sync + 'static {
    /// Whether a stored filename is already taken for a station.
    async fn exists(&self, station_id: Uuid, filename: &str) -> SpoolResult<bool>;

    /// Open a streaming sink for a new video file. The file only becomes
    /// visible under its final name once [`AssemblySink::finish`] returns.
    async fn create(&self, station_id: Uuid, filename: &str)
    -> SpoolResult<Box<dyn AssemblySink>>;

    /// Delete a stored video file. Idempotent.
    async fn delete(&self, station_id: Uuid, filename: &str) -> SpoolResult<()>;

    /// Size in bytes of a stored video file.
    async fn size(&self, station_id: Uuid, filename: &str) -> SpoolResult<u64>;
}

/// Streaming write handle for one assembled video.
#[async_trait]
pub trait AssemblySink: Send {
    /// Append a chunk of data.
    async fn write(&mut self, data: Bytes) -> SpoolResult<()>;

    /// Flush, sync and promote the file into place; returns total bytes
    /// written.
    async fn finish(self: Box<Self>) -> SpoolResult<u64>;

    /// Abort the write and remove any partial output.
    async fn abort(self: Box<Self>) -> SpoolResult<()>;
}
