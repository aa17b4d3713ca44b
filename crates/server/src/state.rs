//! Application state shared across handlers.

use airlift_core::config::AppConfig;
use airlift_core::session::SessionId;
use airlift_metadata::MetadataStore;
use airlift_spool::{ChunkSpool, VideoLibrary};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Advisory per-session locks.
///
/// Finalize must be serialized per session id so that concurrent retries
/// cannot both pass the completeness check and double-settle. Chunk
/// receipt takes the same lock briefly around its read-modify-write of the
/// session metadata so progress counters are never lost.
#[derive(Clone, Default)]
pub struct SessionLocks {
    inner: Arc<Mutex<HashMap<SessionId, Arc<Mutex<()>>>>>,
}

impl SessionLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock for a session, creating it on first use.
    pub async fn acquire(&self, id: SessionId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().await;
            map.entry(id).or_default().clone()
        };
        lock.lock_owned().await
    }

    /// Drop the registry entry once nothing else holds the lock, keeping
    /// the map from growing with dead sessions.
    pub async fn release(&self, id: &SessionId) {
        let mut map = self.inner.lock().await;
        if let Some(lock) = map.get(id) {
            if Arc::strong_count(lock) == 1 {
                map.remove(id);
            }
        }
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// Chunk staging area.
    pub spool: Arc<dyn ChunkSpool>,
    /// Assembled video store.
    pub library: Arc<dyn VideoLibrary>,
    /// Ledger and video metadata store.
    pub metadata: Arc<dyn MetadataStore>,
    /// Per-session advisory locks.
    pub session_locks: SessionLocks,
}

impl AppState {
    /// Create a new application state.
    pub fn new(
        config: AppConfig,
        spool: Arc<dyn ChunkSpool>,
        library: Arc<dyn VideoLibrary>,
        metadata: Arc<dyn MetadataStore>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            spool,
            library,
            metadata,
            session_locks: SessionLocks::new(),
        }
    }
}
