//! Background reaper for abandoned upload sessions.
//!
//! A client that goes silent leaves a staged session behind; nothing in
//! the protocol cleans it up. The reaper sweeps the spool on an interval
//! and removes sessions older than the configured TTL.

use crate::metrics::SESSIONS_REAPED;
use crate::state::AppState;
use airlift_spool::SpoolError;
use time::{Duration, OffsetDateTime};
use tokio::task::JoinHandle;

/// Spawn the periodic sweep task.
pub fn spawn_reaper(state: AppState) -> JoinHandle<()> {
    let interval = state.config.reaper.interval();
    let ttl = state.config.reaper.session_ttl();
    tokio::spawn(async move {
        tracing::info!(
            interval_secs = interval.as_secs(),
            ttl_secs = ttl.whole_seconds(),
            "Session reaper started"
        );
        loop {
            tokio::time::sleep(interval).await;
            match sweep_once(&state, ttl).await {
                Ok(0) => {}
                Ok(reaped) => {
                    tracing::info!(reaped, "Session sweep removed stale sessions");
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Session sweep failed");
                }
            }
        }
    })
}

/// Remove every staged session older than `ttl`. Returns how many were
/// removed.
pub async fn sweep_once(state: &AppState, ttl: Duration) -> Result<u64, SpoolError> {
    let now = OffsetDateTime::now_utc();
    let mut reaped = 0;

    for (id, created_at) in state.spool.list_sessions().await? {
        if now - created_at <= ttl {
            continue;
        }

        // Take the session lock so an in-flight finalize is never undercut
        // mid-assembly; removal is idempotent, so a session that completed
        // while we waited is a no-op.
        let guard = state.session_locks.acquire(id).await;
        let removed = state.spool.remove_session(&id).await;
        drop(guard);
        state.session_locks.release(&id).await;

        match removed {
            Ok(()) => {
                SESSIONS_REAPED.inc();
                reaped += 1;
                tracing::info!(session_id = %id, "Reaped stale upload session");
            }
            Err(e) => {
                tracing::warn!(session_id = %id, error = %e, "Failed to reap session");
            }
        }
    }

    Ok(reaped)
}
