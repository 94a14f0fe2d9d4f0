//! Azure OpenAI integration
//!
//! Chat completions and embeddings over the Azure OpenAI REST API, with
//! per-request timeouts and bounded exponential-backoff retry for transient
//! failures. One client implements both collaborator traits so a single
//! credential set serves the whole pipeline.

pub mod cache;
pub mod client;

pub use cache::CachedEmbedder;
pub use client::{AzureOpenAiClient, LlmConfig};

use thiserror::Error;

/// LLM client errors
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("API error: {0}")]
    Api(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("request timed out")]
    Timeout,

    #[error("configuration error: {0}")]
    Configuration(String),
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LlmError::Timeout
        } else {
            LlmError::Network(err.to_string())
        }
    }
}
