//! Prometheus metrics
//!
//! The recorder is installed once at startup; `/metrics` renders the
//! current state.

use axum::response::IntoResponse;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

static PROMETHEUS: OnceCell<PrometheusHandle> = OnceCell::new();

/// Install the Prometheus recorder. Safe to call more than once; only the
/// first call installs.
pub fn init_metrics() {
    if PROMETHEUS.get().is_some() {
        return;
    }

    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            let _ = PROMETHEUS.set(handle);
            tracing::info!("Prometheus metrics recorder installed");
        }
        Err(e) => {
            tracing::error!("Failed to install metrics recorder: {}", e);
        }
    }
}

/// Record a completed ask with its route and latency
pub fn record_ask(classification: &str, used_rag: bool, latency_secs: f64) {
    metrics::counter!(
        "doc_agent_asks_total",
        "classification" => classification.to_string(),
        "used_rag" => used_rag.to_string(),
    )
    .increment(1);
    metrics::histogram!("doc_agent_ask_duration_seconds").record(latency_secs);
}

/// Record a failed ask by pipeline stage
pub fn record_error(stage: &'static str) {
    metrics::counter!("doc_agent_errors_total", "stage" => stage).increment(1);
}

/// Render the current metrics in Prometheus exposition format
pub async fn metrics_handler() -> impl IntoResponse {
    match PROMETHEUS.get() {
        Some(handle) => handle.render(),
        None => String::new(),
    }
}
