//! Shared application state

use std::sync::Arc;

use doc_agent_agent::DocAgent;
use doc_agent_config::ServerSettings;

/// State shared across all request handlers
#[derive(Clone)]
pub struct AppState {
    pub agent: Arc<DocAgent>,
    pub server: ServerSettings,
}

impl AppState {
    pub fn new(agent: Arc<DocAgent>, server: ServerSettings) -> Self {
        Self { agent, server }
    }
}
