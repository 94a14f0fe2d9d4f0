//! HTTP Endpoints
//!
//! REST API for the document Q&A agent.

use axum::{
    extract::{Json, State},
    http::{HeaderValue, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use doc_agent_core::AnswerResult;

use crate::metrics::{metrics_handler, record_ask, record_error};
use crate::state::AppState;
use crate::error_status;

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    let cors_layer = build_cors_layer(&state.server.cors_origins);

    Router::new()
        // Ask pipeline
        .route("/api/ask", post(ask))
        .route("/api/reset-session", post(reset_session))
        // Session stats
        .route("/api/sessions/stats", get(session_stats))
        // Health check
        .route("/health", get(health_check))
        // Prometheus metrics endpoint
        .route("/metrics", get(metrics_handler))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer)
        .with_state(state)
}

/// Build CORS layer from configured origins; an empty list defaults to
/// localhost:3000.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| {
            origin.parse::<HeaderValue>().ok().or_else(|| {
                tracing::warn!("Invalid CORS origin: {}", origin);
                None
            })
        })
        .collect();

    let allowed = if parsed.is_empty() {
        if !origins.is_empty() {
            tracing::error!("All configured CORS origins are invalid, falling back to localhost");
        }
        vec![HeaderValue::from_static("http://localhost:3000")]
    } else {
        parsed
    };

    CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
}

/// Ask request
#[derive(Debug, Deserialize)]
struct AskRequest {
    query: String,
    #[serde(default)]
    session_id: Option<String>,
}

/// Error payload returned for any failed request
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
    stage: &'static str,
}

/// Ask endpoint
async fn ask(
    State(state): State<AppState>,
    Json(request): Json<AskRequest>,
) -> Result<Json<AnswerResult>, (StatusCode, Json<ErrorResponse>)> {
    if request.query.len() > state.server.max_query_length {
        let err = ErrorResponse {
            error: format!(
                "query exceeds {} characters",
                state.server.max_query_length
            ),
            stage: "validation",
        };
        return Err((StatusCode::BAD_REQUEST, Json(err)));
    }

    let started = std::time::Instant::now();
    match state.agent.ask(&request.query, request.session_id).await {
        Ok(result) => {
            record_ask(
                &result.metadata.classification.to_string(),
                result.metadata.used_rag,
                started.elapsed().as_secs_f64(),
            );
            Ok(Json(result))
        }
        Err(e) => {
            record_error(e.stage());
            tracing::error!(stage = e.stage(), error = %e, "ask failed");
            let status = error_status(&e);
            Err((
                status,
                Json(ErrorResponse {
                    error: e.to_string(),
                    stage: e.stage(),
                }),
            ))
        }
    }
}

/// Reset request
#[derive(Debug, Deserialize)]
struct ResetRequest {
    session_id: String,
}

/// Reset a session's conversation history
async fn reset_session(
    State(state): State<AppState>,
    Json(request): Json<ResetRequest>,
) -> Json<serde_json::Value> {
    state.agent.reset_session(&request.session_id);
    Json(serde_json::json!({
        "status": "reset",
        "session_id": request.session_id,
    }))
}

/// Session stats; sweeps expired sessions first so the count reflects live
/// sessions only
async fn session_stats(State(state): State<AppState>) -> Json<serde_json::Value> {
    let swept = state
        .agent
        .sessions()
        .sweep_expired(chrono::Utc::now())
        .await;
    let health = state.agent.health_snapshot();
    Json(serde_json::json!({
        "active_sessions": health.active_sessions,
        "swept": swept,
        "max_turns": state.agent.sessions().config().max_turns,
        "ttl_secs": state.agent.sessions().config().ttl.as_secs(),
    }))
}

/// Health check
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let health = state.agent.health_snapshot();
    Json(serde_json::json!({
        "status": health.status,
        "version": env!("CARGO_PKG_VERSION"),
        "index_size": health.index_size,
        "dimension": health.dimension,
        "active_sessions": health.active_sessions,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use async_trait::async_trait;
    use doc_agent_agent::{
        AgentTimeouts, AnswerSynthesizer, ClassifierConfig, DocAgent, QueryClassifier,
        SessionConfig, SessionStore, SynthesizerConfig,
    };
    use doc_agent_config::ServerSettings;
    use doc_agent_core::{
        CompletionModel, CompletionRequest, Embedder, IndexHit, IndexStats, Result, VectorIndex,
    };
    use doc_agent_rag::{RetrievalAssembler, RetrieverConfig};

    struct StubLlm;

    #[async_trait]
    impl CompletionModel for StubLlm {
        async fn complete(&self, _request: CompletionRequest) -> Result<String> {
            Ok("GENERAL".to_string())
        }

        fn model_name(&self) -> &str {
            "stub"
        }
    }

    struct StubEmbedder;

    #[async_trait]
    impl Embedder for StubEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(vec![0.0])
        }

        fn dimension(&self) -> usize {
            1
        }
    }

    struct EmptyIndex;

    #[async_trait]
    impl VectorIndex for EmptyIndex {
        async fn search(&self, _vector: &[f32], _top_k: usize) -> Result<Vec<IndexHit>> {
            Ok(Vec::new())
        }

        fn stats(&self) -> IndexStats {
            IndexStats {
                size: 0,
                dimension: 1,
            }
        }
    }

    fn test_state() -> AppState {
        let llm = Arc::new(StubLlm);
        let agent = DocAgent::new(
            QueryClassifier::new(ClassifierConfig::default(), llm.clone()),
            RetrievalAssembler::new(
                RetrieverConfig::default(),
                Arc::new(StubEmbedder),
                Arc::new(EmptyIndex),
            ),
            AnswerSynthesizer::new(SynthesizerConfig::default(), llm),
            Arc::new(SessionStore::new(SessionConfig::default())),
            AgentTimeouts::default(),
        );
        AppState::new(Arc::new(agent), ServerSettings::default())
    }

    #[tokio::test]
    async fn test_router_creation() {
        let _ = create_router(test_state());
    }

    #[tokio::test]
    async fn test_ask_rejects_oversized_query() {
        let state = test_state();
        let request = AskRequest {
            query: "x".repeat(state.server.max_query_length + 1),
            session_id: None,
        };

        let result = ask(State(state), Json(request)).await;
        let (status, Json(body)) = result.unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.stage, "validation");
    }

    #[tokio::test]
    async fn test_ask_returns_answer() {
        let state = test_state();
        let request = AskRequest {
            query: "hello".to_string(),
            session_id: Some("s1".to_string()),
        };

        let Json(result) = ask(State(state), Json(request)).await.unwrap();
        assert_eq!(result.session_id, "s1");
        assert!(!result.metadata.used_rag);
    }

    #[test]
    fn test_cors_defaults_to_localhost() {
        let _ = build_cors_layer(&[]);
        let _ = build_cors_layer(&["not a header value\n".to_string()]);
        let _ = build_cors_layer(&["https://app.example.com".to_string()]);
    }
}
