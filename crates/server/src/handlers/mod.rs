//! HTTP handlers.

pub mod uploads;

pub use uploads::{cancel_upload, finalize_upload, init_upload, upload_chunk};

use axum::Json;
use serde_json::{Value, json};

/// GET /v1/health - liveness probe, intentionally unauthenticated.
pub async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
