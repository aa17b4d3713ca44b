//! Airlift upload server.
//!
//! HTTP surface for the chunked video upload pipeline: session init, chunk
//! receipt, finalize (assembly + coin settlement) and cancel, plus the
//! stale-session reaper and Prometheus metrics.

pub mod assemble;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod reaper;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
