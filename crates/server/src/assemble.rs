//! Chunk assembly and ledger settlement.
//!
//! The compensation rules live here: once a destination file exists in any
//! form, every failure path must remove it before the error escapes. The
//! ledger commit itself is atomic inside the metadata store; this module
//! is responsible for keeping the filesystem in step with it.

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use airlift_core::SIZE_TOLERANCE_BYTES;
use airlift_core::filename::{stored_name, stored_name_with_suffix};
use airlift_core::session::UploadSession;
use airlift_metadata::MetadataError;
use airlift_metadata::models::{CommitReceipt, NewVideo};
use airlift_spool::{AssemblySink, SpoolError};
use time::OffsetDateTime;

/// Assemble all staged chunks of a complete session into the station
/// library and settle the ledger.
///
/// Returns the commit receipt and the stored filename. On any failure
/// after the destination was created, the partial or fully assembled file
/// is removed; the net effect of a failed call is a filesystem and ledger
/// no-op.
pub async fn assemble_and_commit(
    state: &AppState,
    session: &UploadSession,
    total_chunks: u32,
) -> ApiResult<(CommitReceipt, String)> {
    let now = OffsetDateTime::now_utc();

    // Collision-resistant destination name: timestamped, escalating to a
    // random suffix if the timestamped name is already taken.
    let mut filename = stored_name(&session.original_filename, now);
    if state.library.exists(session.station_id, &filename).await? {
        filename = stored_name_with_suffix(&session.original_filename, now);
    }

    let sink = state
        .library
        .create(session.station_id, &filename)
        .await?;

    let actual_size = match append_chunks(state, session, total_chunks, sink).await {
        Ok(size) => size,
        Err(e) => return Err(e),
    };

    // The counters said the session was complete; the size check guards
    // against the byte-level world disagreeing with them.
    let declared = session.declared_size;
    if actual_size.abs_diff(declared) > SIZE_TOLERANCE_BYTES {
        discard(state, session, &filename).await;
        return Err(ApiError::SizeMismatch {
            expected: declared,
            actual: actual_size,
        });
    }

    let video = NewVideo {
        filename: filename.clone(),
        size_bytes: actual_size as i64,
        title: session.title.clone(),
        classification: session.classification.as_str().to_string(),
        priority: session.priority.get() as i64,
    };

    match state
        .metadata
        .commit_video(session.station_id, &video, now)
        .await
    {
        Ok(receipt) => Ok((receipt, filename)),
        Err(MetadataError::InsufficientFunds { balance, cost }) => {
            // No partial charge, no orphaned media: the transaction rolled
            // back, so the assembled file goes too.
            discard(state, session, &filename).await;
            Err(ApiError::InsufficientFunds { balance, cost })
        }
        Err(e) => {
            discard(state, session, &filename).await;
            Err(e.into())
        }
    }
}

/// Stream every chunk, in index order, into the sink. Consumes the sink:
/// on success the destination file is promoted into place, on failure it
/// is aborted and the partial output removed.
async fn append_chunks(
    state: &AppState,
    session: &UploadSession,
    total_chunks: u32,
    mut sink: Box<dyn AssemblySink>,
) -> ApiResult<u64> {
    for index in 0..total_chunks {
        // The received counter can diverge from the chunk set on disk
        // (last-writer-wins totals, duplicate indices); checking lazily
        // per chunk pins the error to the exact missing index.
        let data = match state.spool.read_chunk(&session.id, index).await {
            Ok(data) => data,
            Err(SpoolError::MissingChunk { index }) => {
                abort_sink(sink, session).await;
                return Err(ApiError::MissingChunkFile { index });
            }
            Err(e) => {
                abort_sink(sink, session).await;
                return Err(e.into());
            }
        };
        if let Err(e) = sink.write(data).await {
            abort_sink(sink, session).await;
            return Err(e.into());
        }
    }
    Ok(sink.finish().await?)
}

async fn abort_sink(sink: Box<dyn AssemblySink>, session: &UploadSession) {
    if let Err(e) = sink.abort().await {
        tracing::warn!(
            session_id = %session.id,
            error = %e,
            "failed to remove partial assembly output"
        );
    }
}

/// Best-effort removal of an assembled file after a post-assembly failure.
async fn discard(state: &AppState, session: &UploadSession, filename: &str) {
    if let Err(e) = state.library.delete(session.station_id, filename).await {
        tracing::warn!(
            session_id = %session.id,
            filename,
            error = %e,
            "failed to discard assembled file after failed commit"
        );
    }
}
