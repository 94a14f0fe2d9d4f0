//! Configuration management for the document Q&A agent
//!
//! Supports loading configuration from:
//! - YAML files (`config/default.yaml`, then `config/{env}.yaml`)
//! - Environment variables (`DOC_AGENT_` prefix, `__` separator)
//!
//! A process must not begin serving with invalid external-service
//! configuration: `Settings::validate` is called at startup and any
//! `ConfigError` it returns is fatal.

pub mod settings;

pub use settings::{
    load_settings, AzureOpenAiSettings, RagSettings, ServerSettings, SessionSettings,
    Settings, SynthesizerSettings,
};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    #[error("failed to parse configuration: {0}")]
    ParseError(String),

    #[error("missing required field: {0}")]
    MissingField(String),

    #[error("invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}
