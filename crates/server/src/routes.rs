//! Route configuration.

use crate::handlers;
use crate::metrics::metrics_handler;
use crate::state::AppState;
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

/// Extra allowance on top of the chunk size for multipart framing and the
/// accompanying text fields.
const CHUNK_BODY_SLACK: usize = 64 * 1024;

/// Body limit for the small control-plane actions (init/finalize/cancel).
const CONTROL_BODY_LIMIT: usize = 64 * 1024;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    let chunk_limit = state.config.server.max_chunk_bytes as usize + CHUNK_BODY_SLACK;

    // The chunk route carries the only large body in the protocol; every
    // other action is a handful of form fields.
    let chunk_routes = Router::new()
        .route("/v1/upload/chunk", post(handlers::upload_chunk))
        .layer(DefaultBodyLimit::max(chunk_limit));

    let control_routes = Router::new()
        .route("/v1/upload/init", post(handlers::init_upload))
        .route("/v1/upload/finalize", post(handlers::finalize_upload))
        .route("/v1/upload/cancel", post(handlers::cancel_upload))
        .layer(DefaultBodyLimit::max(CONTROL_BODY_LIMIT));

    // Health check is intentionally unauthenticated for load balancer probes.
    let mut router = Router::new()
        .merge(chunk_routes)
        .merge(control_routes)
        .route("/v1/health", get(handlers::health_check));

    if state.config.server.metrics_enabled {
        router = router.merge(Router::new().route("/metrics", get(metrics_handler)));
    }

    router.layer(TraceLayer::new_for_http()).with_state(state)
}
