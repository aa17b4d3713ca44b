//! Prometheus metrics for the Airlift server.
//!
//! The `/metrics` endpoint is unauthenticated to allow Prometheus
//! scraping and should be network-restricted at the infrastructure level.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::sync::{LazyLock, Once};

/// Global Prometheus registry for all metrics.
pub static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

pub static SESSIONS_CREATED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "airlift_upload_sessions_created_total",
        "Total number of upload sessions created",
    )
    .expect("metric creation failed")
});

pub static SESSIONS_CANCELLED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "airlift_upload_sessions_cancelled_total",
        "Total number of upload sessions explicitly cancelled",
    )
    .expect("metric creation failed")
});

pub static SESSIONS_REAPED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "airlift_upload_sessions_reaped_total",
        "Total number of stale upload sessions removed by the reaper",
    )
    .expect("metric creation failed")
});

pub static CHUNKS_RECEIVED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "airlift_chunks_received_total",
        "Total number of chunks received",
    )
    .expect("metric creation failed")
});

pub static BYTES_RECEIVED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "airlift_bytes_received_total",
        "Total chunk bytes received",
    )
    .expect("metric creation failed")
});

pub static VIDEOS_COMMITTED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "airlift_videos_committed_total",
        "Total number of videos assembled and settled",
    )
    .expect("metric creation failed")
});

pub static COINS_DEBITED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "airlift_coins_debited_total",
        "Total coins debited for successful uploads",
    )
    .expect("metric creation failed")
});

pub static FINALIZE_DURATION: LazyLock<Histogram> = LazyLock::new(|| {
    Histogram::with_opts(
        HistogramOpts::new(
            "airlift_finalize_duration_seconds",
            "Time taken to assemble and settle an upload",
        )
        .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]),
    )
    .expect("metric creation failed")
});

pub static UPLOAD_ERRORS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "airlift_upload_errors_total",
            "Upload requests failed, by error code",
        ),
        &["code"],
    )
    .expect("metric creation failed")
});

/// Record a failed upload request under its error code.
pub fn record_upload_error(code: &str) {
    UPLOAD_ERRORS.with_label_values(&[code]).inc();
}

/// Register all metrics with the global registry. Idempotent.
pub fn register_metrics() {
    static REGISTER: Once = Once::new();
    REGISTER.call_once(|| {
        let registry = &*REGISTRY;
        registry
            .register(Box::new(SESSIONS_CREATED.clone()))
            .expect("register failed");
        registry
            .register(Box::new(SESSIONS_CANCELLED.clone()))
            .expect("register failed");
        registry
            .register(Box::new(SESSIONS_REAPED.clone()))
            .expect("register failed");
        registry
            .register(Box::new(CHUNKS_RECEIVED.clone()))
            .expect("register failed");
        registry
            .register(Box::new(BYTES_RECEIVED.clone()))
            .expect("register failed");
        registry
            .register(Box::new(VIDEOS_COMMITTED.clone()))
            .expect("register failed");
        registry
            .register(Box::new(COINS_DEBITED.clone()))
            .expect("register failed");
        registry
            .register(Box::new(FINALIZE_DURATION.clone()))
            .expect("register failed");
        registry
            .register(Box::new(UPLOAD_ERRORS.clone()))
            .expect("register failed");
    });
}

/// GET /metrics - Prometheus exposition.
pub async fn metrics_handler() -> impl IntoResponse {
    let mut buffer = Vec::new();
    let encoder = TextEncoder::new();
    match encoder.encode(&REGISTRY.gather(), &mut buffer) {
        Ok(()) => (
            StatusCode::OK,
            [("Content-Type", prometheus::TEXT_FORMAT)],
            buffer,
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "failed to encode metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
