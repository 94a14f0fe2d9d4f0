//! Process entry point
//!
//! Loads configuration, wires the pipeline, and serves HTTP until SIGINT or
//! SIGTERM.

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use doc_agent_agent::{
    spawn_sweeper, AgentTimeouts, AnswerSynthesizer, ClassifierConfig, DocAgent, QueryClassifier,
    SessionConfig, SessionStore, SynthesizerConfig,
};
use doc_agent_config::{load_settings, Settings};
use doc_agent_core::{CompletionModel, Embedder, VectorIndex};
use doc_agent_llm::{AzureOpenAiClient, CachedEmbedder, LlmConfig};
use doc_agent_rag::{FlatIndex, RetrievalAssembler, RetrieverConfig};
use doc_agent_server::{create_router, init_metrics, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let settings = match load_and_validate() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    init_tracing(&settings.log_level);
    init_metrics();

    let agent = Arc::new(build_agent(&settings)?);
    spawn_sweeper(
        Arc::clone(agent.sessions()),
        settings.session.sweep_interval(),
    );

    let state = AppState::new(agent, settings.server.clone());
    let router = create_router(state);

    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

fn load_and_validate() -> Result<Settings, Box<dyn std::error::Error>> {
    let env = std::env::var("APP_ENV").ok();
    let settings = load_settings(env.as_deref())?;
    settings.validate()?;
    Ok(settings)
}

fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.to_string()));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Wire the full pipeline from settings
fn build_agent(settings: &Settings) -> Result<DocAgent, Box<dyn std::error::Error>> {
    let llm_config = LlmConfig {
        endpoint: settings.azure_openai.endpoint.clone(),
        api_key: settings.azure_openai.api_key.clone(),
        chat_deployment: settings.azure_openai.chat_deployment.clone(),
        embedding_deployment: settings.azure_openai.embedding_deployment.clone(),
        api_version: settings.azure_openai.api_version.clone(),
        embedding_dimension: settings.rag.dimension,
        timeout: settings.azure_openai.request_timeout(),
        max_retries: settings.azure_openai.max_retries,
        ..LlmConfig::default()
    };
    let client = AzureOpenAiClient::new(llm_config)?;
    let llm: Arc<dyn CompletionModel> = Arc::new(client.clone());

    let embedder: Arc<dyn Embedder> = Arc::new(CachedEmbedder::new(
        Arc::new(client),
        settings.rag.embedding_cache_size,
    ));

    let index = FlatIndex::load_or_empty(&settings.rag.index_path, settings.rag.dimension);
    let stats = index.stats();
    tracing::info!(
        size = stats.size,
        dimension = stats.dimension,
        path = %settings.rag.index_path,
        "vector index ready"
    );
    let index: Arc<dyn VectorIndex> = Arc::new(index);

    let retriever = RetrievalAssembler::new(
        RetrieverConfig {
            top_k: settings.rag.top_k,
            similarity_threshold: settings.rag.similarity_threshold,
        },
        embedder,
        index,
    );

    let classifier = QueryClassifier::new(
        ClassifierConfig {
            timeout: settings.azure_openai.request_timeout(),
            ..ClassifierConfig::default()
        },
        llm.clone(),
    );

    let synthesizer = AnswerSynthesizer::new(
        SynthesizerConfig {
            context_char_budget: settings.synthesizer.context_char_budget,
            history_max_turns: settings.synthesizer.history_max_turns,
            history_char_budget: settings.synthesizer.history_char_budget,
            temperature: settings.synthesizer.temperature,
            answer_max_tokens: settings.synthesizer.answer_max_tokens,
        },
        llm,
    );

    let sessions = Arc::new(SessionStore::new(SessionConfig {
        ttl: settings.session.ttl(),
        max_turns: settings.session.max_turns,
    }));

    Ok(DocAgent::new(
        classifier,
        retriever,
        synthesizer,
        sessions,
        AgentTimeouts {
            retrieval: settings.azure_openai.request_timeout(),
            generation: settings.azure_openai.request_timeout(),
        },
    )
    .with_max_query_length(settings.server.max_query_length))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to install SIGINT handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => tracing::error!("failed to install SIGTERM handler: {}", e),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received SIGINT, shutting down"),
        _ = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}
