//! Local filesystem spool and library backends.

use crate::error::{SpoolError, SpoolResult};
use crate::traits::{AssemblySink, ChunkSpool, VideoLibrary};
use airlift_core::filename::chunk_file_name;
use airlift_core::session::{SessionId, UploadSession};
use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::instrument;
use uuid::Uuid;

/// File name of the per-session metadata record.
const SESSION_META: &str = "session.json";

/// Validate a single path component.
///
/// Everything joined under a spool or library root goes through here.
/// Session ids and station ids are already typed (hex-32 token, UUID), so
/// this is defense in depth for the one string-typed input: stored video
/// filenames.
fn safe_component(name: &str) -> SpoolResult<()> {
    let ok = !name.is_empty()
        && !name.starts_with('.')
        && !name.contains("..")
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'.' | b'_' | b'-'));
    if ok {
        Ok(())
    } else {
        Err(SpoolError::InvalidName(name.to_string()))
    }
}

/// Filesystem-backed chunk spool: one directory per session id.
pub struct FilesystemSpool {
    root: PathBuf,
}

impl FilesystemSpool {
    /// Create a new spool rooted at `root`, creating it if needed.
    pub async fn new(root: impl AsRef<Path>) -> SpoolResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    fn session_dir(&self, id: &SessionId) -> PathBuf {
        // SessionId rendering is 32 lowercase hex chars; safe as a
        // directory name by construction.
        self.root.join(id.to_string())
    }

    fn meta_path(&self, id: &SessionId) -> PathBuf {
        self.session_dir(id).join(SESSION_META)
    }

    /// Atomically rewrite the metadata record (temp file + rename).
    async fn write_meta(&self, session: &UploadSession) -> SpoolResult<()> {
        let path = self.meta_path(&session.id);
        let tmp = path.with_extension("json.tmp");
        let data = serde_json::to_vec_pretty(session)?;
        let mut file = fs::File::create(&tmp).await?;
        file.write_all(&data).await?;
        file.sync_all().await?;
        drop(file);
        fs::rename(&tmp, &path).await?;
        Ok(())
    }
}

#[async_trait]
impl ChunkSpool for FilesystemSpool {
    #[instrument(skip_all, fields(session_id = %session.id))]
    async fn create_session(&self, session: &UploadSession) -> SpoolResult<()> {
        let dir = self.session_dir(&session.id);
        fs::create_dir(&dir).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::AlreadyExists {
                SpoolError::SessionExists(session.id.to_string())
            } else {
                SpoolError::Io(e)
            }
        })?;

        // No partial state on failure: tear the directory back down if the
        // metadata record cannot be written.
        if let Err(e) = self.write_meta(session).await {
            if let Err(cleanup) = fs::remove_dir_all(&dir).await {
                tracing::warn!(
                    session_id = %session.id,
                    error = %cleanup,
                    "failed to clean up session dir after metadata write failure"
                );
            }
            return Err(e);
        }
        Ok(())
    }

    async fn load_session(&self, id: &SessionId) -> SpoolResult<Option<UploadSession>> {
        match fs::read(self.meta_path(id)).await {
            Ok(data) => Ok(Some(serde_json::from_slice(&data)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(SpoolError::Io(e)),
        }
    }

    async fn store_session(&self, session: &UploadSession) -> SpoolResult<()> {
        if !fs::try_exists(self.meta_path(&session.id)).await? {
            return Err(SpoolError::SessionNotFound(session.id.to_string()));
        }
        self.write_meta(session).await
    }

    #[instrument(skip_all, fields(session_id = %id, index = index, size = data.len()))]
    async fn write_chunk(&self, id: &SessionId, index: u32, data: Bytes) -> SpoolResult<bool> {
        if !fs::try_exists(self.meta_path(id)).await? {
            return Err(SpoolError::SessionNotFound(id.to_string()));
        }
        let path = self.session_dir(id).join(chunk_file_name(index));
        let fresh = !fs::try_exists(&path).await?;
        fs::write(&path, &data).await?;
        Ok(fresh)
    }

    async fn read_chunk(&self, id: &SessionId, index: u32) -> SpoolResult<Bytes> {
        let path = self.session_dir(id).join(chunk_file_name(index));
        match fs::read(&path).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(SpoolError::MissingChunk { index })
            }
            Err(e) => Err(SpoolError::Io(e)),
        }
    }

    #[instrument(skip_all, fields(session_id = %id))]
    async fn remove_session(&self, id: &SessionId) -> SpoolResult<()> {
        match fs::remove_dir_all(self.session_dir(id)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(SpoolError::Io(e)),
        }
    }

    async fn list_sessions(&self) -> SpoolResult<Vec<(SessionId, OffsetDateTime)>> {
        let mut sessions = Vec::new();
        let mut entries = fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            let Ok(id) = SessionId::parse(name) else {
                // Foreign entries in the spool root are left alone.
                tracing::debug!(entry = %name, "skipping non-session entry in spool");
                continue;
            };
            let created_at = match self.load_session(&id).await {
                Ok(Some(session)) => session.created_at,
                // Unreadable or missing metadata: fall back to the
                // directory mtime so the reaper can still age it out.
                _ => entry
                    .metadata()
                    .await
                    .ok()
                    .and_then(|m| m.modified().ok())
                    .map(OffsetDateTime::from)
                    .unwrap_or_else(OffsetDateTime::now_utc),
            };
            sessions.push((id, created_at));
        }
        Ok(sessions)
    }
}

/// Filesystem-backed video library: one directory per station.
pub struct FilesystemLibrary {
    root: PathBuf,
}

impl FilesystemLibrary {
    /// Create a new library rooted at `root`, creating it if needed.
    pub async fn new(root: impl AsRef<Path>) -> SpoolResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    fn video_path(&self, station_id: Uuid, filename: &str) -> SpoolResult<PathBuf> {
        safe_component(filename)?;
        Ok(self.root.join(station_id.to_string()).join(filename))
    }
}

#[async_trait]
impl VideoLibrary for FilesystemLibrary {
    async fn exists(&self, station_id: Uuid, filename: &str) -> SpoolResult<bool> {
        let path = self.video_path(station_id, filename)?;
        Ok(fs::try_exists(&path).await?)
    }

    #[instrument(skip_all, fields(station_id = %station_id, filename = %filename))]
    async fn create(
        &self,
        station_id: Uuid,
        filename: &str,
    ) -> SpoolResult<Box<dyn AssemblySink>> {
        let final_path = self.video_path(station_id, filename)?;
        if let Some(parent) = final_path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let temp_path = final_path.with_file_name(format!("{filename}.part"));
        let file = fs::File::create(&temp_path).await?;
        Ok(Box::new(FileSink {
            file,
            temp_path,
            final_path,
            written: 0,
        }))
    }

    #[instrument(skip_all, fields(station_id = %station_id, filename = %filename))]
    async fn delete(&self, station_id: Uuid, filename: &str) -> SpoolResult<()> {
        let path = self.video_path(station_id, filename)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(SpoolError::Io(e)),
        }
    }

    async fn size(&self, station_id: Uuid, filename: &str) -> SpoolResult<u64> {
        let path = self.video_path(station_id, filename)?;
        Ok(fs::metadata(&path).await?.len())
    }
}

/// Streaming sink writing through a temporary `.part` file that is only
/// renamed into place on `finish`.
struct FileSink {
    file: fs::File,
    temp_path: PathBuf,
    final_path: PathBuf,
    written: u64,
}

#[async_trait]
impl AssemblySink for FileSink {
    async fn write(&mut self, data: Bytes) -> SpoolResult<()> {
        self.file.write_all(&data).await?;
        self.written += data.len() as u64;
        Ok(())
    }

    async fn finish(self: Box<Self>) -> SpoolResult<u64> {
        let FileSink {
            mut file,
            temp_path,
            final_path,
            written,
        } = *self;

        let promote = async {
            file.flush().await?;
            file.sync_all().await?;
            drop(file);
            fs::rename(&temp_path, &final_path).await?;
            Ok::<_, SpoolError>(())
        };

        match promote.await {
            Ok(()) => Ok(written),
            Err(e) => {
                // A failed promotion must not strand the temp file.
                if let Err(cleanup) = fs::remove_file(&temp_path).await {
                    if cleanup.kind() != std::io::ErrorKind::NotFound {
                        tracing::warn!(
                            path = %temp_path.display(),
                            error = %cleanup,
                            "failed to remove temp file after failed promotion"
                        );
                    }
                }
                Err(e)
            }
        }
    }

    async fn abort(self: Box<Self>) -> SpoolResult<()> {
        let FileSink {
            file, temp_path, ..
        } = *self;
        drop(file);
        match fs::remove_file(&temp_path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(SpoolError::Io(e)),
        }
    }
}
