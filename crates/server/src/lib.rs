//! Document Q&A Server
//!
//! HTTP endpoints for the ask pipeline, session management, health, and
//! Prometheus metrics.

pub mod http;
pub mod metrics;
pub mod state;

pub use http::create_router;
pub use self::metrics::{init_metrics, record_ask, record_error};
pub use state::AppState;

use axum::http::StatusCode;
use doc_agent_agent::AgentError;

/// HTTP status for each pipeline failure.
///
/// Validation failures are the caller's fault; everything downstream of
/// validation means an upstream dependency failed.
pub fn error_status(err: &AgentError) -> StatusCode {
    match err {
        AgentError::InvalidQuery(_) => StatusCode::BAD_REQUEST,
        AgentError::Retrieval(_) | AgentError::Generation(_) => StatusCode::BAD_GATEWAY,
    }
}
