//! Main settings module

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::ConfigError;

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerSettings,

    /// Azure OpenAI configuration
    #[serde(default)]
    pub azure_openai: AzureOpenAiSettings,

    /// Retrieval configuration
    #[serde(default)]
    pub rag: RagSettings,

    /// Answer synthesis configuration
    #[serde(default)]
    pub synthesizer: SynthesizerSettings,

    /// Session memory configuration
    #[serde(default)]
    pub session: SessionSettings,

    /// Log level when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Allowed CORS origins; empty means localhost-only
    #[serde(default)]
    pub cors_origins: Vec<String>,

    /// Maximum accepted query length in characters
    #[serde(default = "default_max_query_length")]
    pub max_query_length: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: Vec::new(),
            max_query_length: default_max_query_length(),
        }
    }
}

/// Azure OpenAI service settings
///
/// `api_key` and `endpoint` have no defaults; validation fails at startup
/// when they are missing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AzureOpenAiSettings {
    #[serde(default)]
    pub api_key: String,

    #[serde(default)]
    pub endpoint: String,

    #[serde(default = "default_chat_deployment")]
    pub chat_deployment: String,

    #[serde(default = "default_embedding_deployment")]
    pub embedding_deployment: String,

    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Maximum retry attempts for transient failures
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for AzureOpenAiSettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            endpoint: String::new(),
            chat_deployment: default_chat_deployment(),
            embedding_deployment: default_embedding_deployment(),
            api_version: default_api_version(),
            request_timeout_secs: default_request_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }
}

impl AzureOpenAiSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Retrieval settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagSettings {
    /// Nearest-neighbor chunks fetched per query
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Minimum similarity for a chunk to be considered relevant
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f32,

    /// Embedding dimension the index was built with
    #[serde(default = "default_dimension")]
    pub dimension: usize,

    /// Path to the pre-built index snapshot
    #[serde(default = "default_index_path")]
    pub index_path: String,

    /// Bound on cached query embeddings
    #[serde(default = "default_embedding_cache_size")]
    pub embedding_cache_size: usize,
}

impl Default for RagSettings {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            similarity_threshold: default_similarity_threshold(),
            dimension: default_dimension(),
            index_path: default_index_path(),
            embedding_cache_size: default_embedding_cache_size(),
        }
    }
}

/// Answer synthesis settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesizerSettings {
    /// Character budget for the retrieved-context block
    #[serde(default = "default_context_char_budget")]
    pub context_char_budget: usize,

    /// Most recent turns included in the prompt
    #[serde(default = "default_history_max_turns")]
    pub history_max_turns: usize,

    /// Character budget for the history block
    #[serde(default = "default_history_char_budget")]
    pub history_char_budget: usize,

    /// Sampling temperature for synthesis
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Token cap for the generated answer
    #[serde(default = "default_answer_max_tokens")]
    pub answer_max_tokens: u32,
}

impl Default for SynthesizerSettings {
    fn default() -> Self {
        Self {
            context_char_budget: default_context_char_budget(),
            history_max_turns: default_history_max_turns(),
            history_char_budget: default_history_char_budget(),
            temperature: default_temperature(),
            answer_max_tokens: default_answer_max_tokens(),
        }
    }
}

/// Session memory settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSettings {
    /// Idle TTL in seconds; no session survives longer than this since its
    /// last activity
    #[serde(default = "default_session_ttl_secs")]
    pub ttl_secs: u64,

    /// Maximum retained turns per session (FIFO eviction)
    #[serde(default = "default_max_turns")]
    pub max_turns: usize,

    /// Interval between background expiry sweeps, seconds
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            ttl_secs: default_session_ttl_secs(),
            max_turns: default_max_turns(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

impl SessionSettings {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_max_query_length() -> usize {
    2000
}
fn default_chat_deployment() -> String {
    "gpt-4".to_string()
}
fn default_embedding_deployment() -> String {
    "text-embedding-ada-002".to_string()
}
fn default_api_version() -> String {
    "2024-02-15-preview".to_string()
}
fn default_request_timeout_secs() -> u64 {
    30
}
fn default_max_retries() -> u32 {
    3
}
fn default_top_k() -> usize {
    3
}
fn default_similarity_threshold() -> f32 {
    0.7
}
fn default_dimension() -> usize {
    1536
}
fn default_index_path() -> String {
    "data/index.json".to_string()
}
fn default_embedding_cache_size() -> usize {
    1024
}
fn default_context_char_budget() -> usize {
    6000
}
fn default_history_max_turns() -> usize {
    5
}
fn default_history_char_budget() -> usize {
    4000
}
fn default_temperature() -> f32 {
    0.7
}
fn default_answer_max_tokens() -> u32 {
    500
}
fn default_session_ttl_secs() -> u64 {
    1800
}
fn default_max_turns() -> usize {
    10
}
fn default_sweep_interval_secs() -> u64 {
    300
}

impl Settings {
    /// Validate settings; any error here is fatal at startup
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.azure_openai.api_key.is_empty() {
            return Err(ConfigError::MissingField("azure_openai.api_key".to_string()));
        }
        if self.azure_openai.endpoint.is_empty() {
            return Err(ConfigError::MissingField("azure_openai.endpoint".to_string()));
        }

        if !(0.0..=1.0).contains(&self.rag.similarity_threshold) {
            return Err(ConfigError::InvalidValue {
                field: "rag.similarity_threshold".to_string(),
                message: format!(
                    "must be between 0.0 and 1.0, got {}",
                    self.rag.similarity_threshold
                ),
            });
        }
        if self.rag.top_k == 0 {
            return Err(ConfigError::InvalidValue {
                field: "rag.top_k".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if self.rag.dimension == 0 {
            return Err(ConfigError::InvalidValue {
                field: "rag.dimension".to_string(),
                message: "must be at least 1".to_string(),
            });
        }

        if self.session.max_turns == 0 {
            return Err(ConfigError::InvalidValue {
                field: "session.max_turns".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if self.session.ttl_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "session.ttl_secs".to_string(),
                message: "must be at least 1".to_string(),
            });
        }

        if self.synthesizer.history_max_turns == 0 {
            return Err(ConfigError::InvalidValue {
                field: "synthesizer.history_max_turns".to_string(),
                message: "must be at least 1".to_string(),
            });
        }

        Ok(())
    }
}

/// Load settings from files and environment.
///
/// Priority: env vars > `config/{env}.yaml` > `config/default.yaml` > defaults.
pub fn load_settings(env: Option<&str>) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder();

    let default_path = Path::new("config/default.yaml");
    if default_path.exists() {
        builder = builder.add_source(File::from(default_path));
    }

    if let Some(env_name) = env {
        let env_path = format!("config/{}.yaml", env_name);
        if Path::new(&env_path).exists() {
            builder = builder.add_source(File::with_name(&env_path));
        } else {
            tracing::warn!(path = %env_path, "environment config file not found, skipping");
        }
    }

    builder = builder.add_source(
        Environment::with_prefix("DOC_AGENT")
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true),
    );

    let settings: Settings = builder.build()?.try_deserialize()?;
    Ok(settings)
}
