//! Upload pipeline handlers: init, chunk receipt, finalize, cancel.
//!
//! All four actions accept multipart form POSTs and answer with the
//! in-band JSON envelope (see [`crate::error`]). The session id is the
//! only value that ever reaches a filesystem path, and it is strictly
//! parsed before anything else happens.

use crate::assemble;
use crate::error::{ApiError, ApiResult, TransferError};
use crate::metrics::{
    BYTES_RECEIVED, CHUNKS_RECEIVED, COINS_DEBITED, FINALIZE_DURATION, SESSIONS_CANCELLED,
    SESSIONS_CREATED, VIDEOS_COMMITTED,
};
use crate::state::AppState;
use airlift_core::filename::extension_allowed;
use airlift_core::session::{SessionId, UploadSession};
use airlift_core::video::{Classification, Priority};
use airlift_core::{MAX_UPLOAD_SIZE_BYTES, MAX_VIDEOS_PER_STATION};
use airlift_spool::SpoolError;
use axum::Json;
use axum::extract::multipart::{Multipart, MultipartError};
use axum::extract::State;
use bytes::Bytes;
use serde::Serialize;
use std::collections::HashMap;
use uuid::Uuid;

/// Response to a successful `init`.
#[derive(Debug, Serialize)]
pub struct InitResponse {
    pub success: bool,
    pub upload_id: String,
}

/// Response to a successful `upload_chunk`.
#[derive(Debug, Serialize)]
pub struct ChunkResponse {
    pub success: bool,
    pub chunk_index: u32,
    pub chunks_received: u32,
    pub total_chunks: u32,
}

/// Response to a successful `finalize`.
#[derive(Debug, Serialize)]
pub struct FinalizeResponse {
    pub success: bool,
    pub video_id: String,
    pub filename: String,
    pub coins_deducted: i64,
    pub new_balance: i64,
}

/// Response to a successful `cancel`.
#[derive(Debug, Serialize)]
pub struct AckResponse {
    pub success: bool,
}

/// Collected multipart form: text fields plus the optional binary chunk.
struct UploadForm {
    texts: HashMap<String, String>,
    chunk: Option<Bytes>,
}

impl UploadForm {
    fn text(&self, name: &str) -> Option<&str> {
        self.texts.get(name).map(String::as_str)
    }

    fn require(&self, name: &'static str) -> ApiResult<&str> {
        match self.text(name) {
            Some(s) if !s.trim().is_empty() => Ok(s),
            _ => Err(airlift_core::Error::MissingField(name).into()),
        }
    }
}

/// Drain a multipart request into an [`UploadForm`].
///
/// The binary part is expected under the field name `chunk`; everything
/// else is read as text.
async fn read_form(multipart: &mut Multipart) -> ApiResult<UploadForm> {
    let mut form = UploadForm {
        texts: HashMap::new(),
        chunk: None,
    };
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(map_multipart_error)?
    {
        let name = field.name().unwrap_or_default().to_string();
        if name == "chunk" {
            form.chunk = Some(field.bytes().await.map_err(map_multipart_error)?);
        } else {
            let value = field.text().await.map_err(map_multipart_error)?;
            form.texts.insert(name, value);
        }
    }
    Ok(form)
}

/// Map a multipart read failure onto the transfer-error taxonomy.
fn map_multipart_error(err: MultipartError) -> ApiError {
    let text = err.body_text();
    if text.contains("length limit") || text.contains("exceeded") {
        TransferError::SizeLimit.into()
    } else {
        TransferError::Partial.into()
    }
}

/// Map a spool write failure onto the transfer-error taxonomy.
fn map_chunk_write_error(err: SpoolError) -> ApiError {
    match err {
        SpoolError::SessionNotFound(_) => ApiError::UnknownSession,
        SpoolError::Io(e) if e.kind() == std::io::ErrorKind::StorageFull => {
            TransferError::NoSpace.into()
        }
        SpoolError::Io(_) => TransferError::Write.into(),
        other => other.into(),
    }
}

fn parse_station_id(raw: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(raw.trim()).map_err(|_| ApiError::BadRequest("invalid station id".to_string()))
}

/// POST /v1/upload/init - Create a new upload session.
#[tracing::instrument(skip(state, multipart))]
pub async fn init_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<InitResponse>> {
    let form = read_form(&mut multipart).await?;

    let station_id = parse_station_id(form.require("station_id")?)?;
    let filename = form.require("filename")?.trim().to_string();
    let title = form.require("title")?.trim().to_string();
    let filesize: u64 = form
        .require("filesize")?
        .trim()
        .parse()
        .map_err(|_| ApiError::BadRequest("invalid filesize".to_string()))?;

    // Never a reason to reject: unknown classifications normalize to the
    // default, out-of-range priorities reset to the default.
    let classification = Classification::normalize(form.text("content_type").unwrap_or_default());
    let priority = Priority::normalize(form.text("priority"));

    if filesize > MAX_UPLOAD_SIZE_BYTES {
        return Err(airlift_core::Error::TooLarge {
            declared: filesize,
            max: MAX_UPLOAD_SIZE_BYTES,
        }
        .into());
    }
    if !extension_allowed(&filename) {
        return Err(airlift_core::Error::DisallowedExtension(filename).into());
    }

    if state.metadata.get_station(station_id).await?.is_none() {
        return Err(ApiError::UnknownStation);
    }

    // Advisory cap check (read-then-insert): concurrent inits from the
    // same station may overshoot by a few; the cap is a soft quota, not a
    // ledger invariant.
    let count = state.metadata.count_videos(station_id).await?;
    if count >= MAX_VIDEOS_PER_STATION {
        return Err(ApiError::VideoCapReached {
            count,
            max: MAX_VIDEOS_PER_STATION,
        });
    }

    let session = UploadSession::new(
        station_id,
        filename,
        filesize,
        title,
        classification,
        priority,
    );
    state.spool.create_session(&session).await?;

    SESSIONS_CREATED.inc();
    tracing::info!(
        session_id = %session.id,
        station_id = %station_id,
        declared_size = filesize,
        "Created upload session"
    );

    Ok(Json(InitResponse {
        success: true,
        upload_id: session.id.to_string(),
    }))
}

/// POST /v1/upload/chunk - Receive one chunk of an upload.
#[tracing::instrument(skip(state, multipart))]
pub async fn upload_chunk(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<ChunkResponse>> {
    let form = read_form(&mut multipart).await?;

    let id = SessionId::parse(form.require("upload_id")?.trim())?;
    let raw_index = form.require("chunk_index")?;
    let chunk_index: u32 = raw_index
        .trim()
        .parse()
        .map_err(|_| airlift_core::Error::InvalidChunkIndex(raw_index.trim().to_string()))?;
    let raw_total = form.require("total_chunks")?;
    let total_chunks: u32 = raw_total
        .trim()
        .parse()
        .ok()
        .filter(|t| *t > 0)
        .ok_or_else(|| airlift_core::Error::InvalidChunkCount(raw_total.trim().to_string()))?;

    let data = form
        .chunk
        .ok_or(airlift_core::Error::MissingField("chunk"))?;
    if data.is_empty() {
        return Err(TransferError::Partial.into());
    }
    if data.len() as u64 > state.config.server.max_chunk_bytes {
        return Err(TransferError::SizeLimit.into());
    }
    let size = data.len() as u64;

    // Chunk writes for one session may race; the session lock only spans
    // the metadata read-modify-write so progress counts are never lost.
    let guard = state.session_locks.acquire(id).await;
    let outcome = receive_chunk_locked(&state, &id, chunk_index, total_chunks, data).await;
    drop(guard);
    state.session_locks.release(&id).await;
    let chunks_received = outcome?;

    CHUNKS_RECEIVED.inc();
    BYTES_RECEIVED.inc_by(size);
    tracing::debug!(
        session_id = %id,
        chunk_index,
        chunks_received,
        total_chunks,
        "Chunk received"
    );

    Ok(Json(ChunkResponse {
        success: true,
        chunk_index,
        chunks_received,
        total_chunks,
    }))
}

async fn receive_chunk_locked(
    state: &AppState,
    id: &SessionId,
    chunk_index: u32,
    total_chunks: u32,
    data: Bytes,
) -> ApiResult<u32> {
    let mut session = state
        .spool
        .load_session(id)
        .await?
        .ok_or(ApiError::UnknownSession)?;

    let fresh = state
        .spool
        .write_chunk(id, chunk_index, data)
        .await
        .map_err(map_chunk_write_error)?;

    // total_chunks is client-declared on every call, last writer wins.
    session.record_chunk(total_chunks, fresh);
    state.spool.store_session(&session).await?;
    Ok(session.chunks_received)
}

/// POST /v1/upload/finalize - Assemble the chunks and settle the ledger.
#[tracing::instrument(skip(state, multipart))]
pub async fn finalize_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<FinalizeResponse>> {
    let form = read_form(&mut multipart).await?;
    let id = SessionId::parse(form.require("upload_id")?.trim())?;

    // Exactly one finalize per session can run at a time. A concurrent
    // retry waits here, then finds the session gone and fails cleanly.
    let timer = FINALIZE_DURATION.start_timer();
    let guard = state.session_locks.acquire(id).await;
    let outcome = finalize_locked(&state, &id).await;
    drop(guard);
    state.session_locks.release(&id).await;
    timer.observe_duration();

    let response = outcome?;
    VIDEOS_COMMITTED.inc();
    COINS_DEBITED.inc_by(response.coins_deducted as u64);
    tracing::info!(
        session_id = %id,
        video_id = %response.video_id,
        filename = %response.filename,
        coins_deducted = response.coins_deducted,
        "Upload finalized"
    );
    Ok(Json(response))
}

async fn finalize_locked(state: &AppState, id: &SessionId) -> ApiResult<FinalizeResponse> {
    let session = state
        .spool
        .load_session(id)
        .await?
        .ok_or(ApiError::UnknownSession)?;

    let total = session.total_chunks.unwrap_or(0);
    if total == 0 || session.chunks_received != total {
        return Err(ApiError::MissingChunks {
            received: session.chunks_received,
            total,
        });
    }

    let (receipt, filename) = assemble::assemble_and_commit(state, &session, total).await?;

    // The upload is settled; failing to sweep the staging area must not
    // fail the request. The reaper will collect any leftovers.
    if let Err(e) = state.spool.remove_session(id).await {
        tracing::warn!(session_id = %id, error = %e, "failed to remove staged session after commit");
    }

    Ok(FinalizeResponse {
        success: true,
        video_id: receipt.video_id.to_string(),
        filename,
        coins_deducted: receipt.cost,
        new_balance: receipt.balance_after,
    })
}

/// POST /v1/upload/cancel - Drop a session and its staged chunks.
///
/// Idempotent: cancelling an unknown or already-cleaned session succeeds.
#[tracing::instrument(skip(state, multipart))]
pub async fn cancel_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<AckResponse>> {
    let form = read_form(&mut multipart).await?;
    let id = SessionId::parse(form.require("upload_id")?.trim())?;

    let guard = state.session_locks.acquire(id).await;
    let outcome = state.spool.remove_session(&id).await;
    drop(guard);
    state.session_locks.release(&id).await;
    outcome?;

    SESSIONS_CANCELLED.inc();
    tracing::info!(session_id = %id, "Upload session cancelled");
    Ok(Json(AckResponse { success: true }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_write_errors_map_to_taxonomy() {
        let err = map_chunk_write_error(SpoolError::SessionNotFound("x".into()));
        assert_eq!(err.code(), "unknown_session");

        let err = map_chunk_write_error(SpoolError::Io(std::io::Error::new(
            std::io::ErrorKind::StorageFull,
            "disk full",
        )));
        assert_eq!(err.code(), "spool_full");

        let err = map_chunk_write_error(SpoolError::Io(std::io::Error::other("boom")));
        assert_eq!(err.code(), "spool_write_failed");
    }

    #[test]
    fn station_id_parsing() {
        assert!(parse_station_id(&Uuid::new_v4().to_string()).is_ok());
        assert!(parse_station_id("not-a-uuid").is_err());
    }
}
