//! The ask pipeline
//!
//! Features:
//! - Query classification (general knowledge vs. document-grounded)
//! - Answer synthesis with bounded context and history windows
//! - Bounded, expiring per-session conversation memory
//! - The `DocAgent` orchestrator sequencing classify -> retrieve ->
//!   synthesize -> record

pub mod agent;
pub mod classifier;
pub mod memory;
pub mod synthesizer;

pub use agent::{AgentTimeouts, DocAgent};
pub use classifier::{ClassifierConfig, QueryClassifier};
pub use memory::{spawn_sweeper, Session, SessionConfig, SessionHandle, SessionStore};
pub use synthesizer::{AnswerSynthesizer, SynthesizerConfig};

use thiserror::Error;

/// Per-request pipeline errors.
///
/// Each variant names the stage that failed so callers can decide whether to
/// retry the whole request. A failed request never records a partial turn.
/// Classification has no variant here: every classification failure mode
/// degrades to the `Document` route inside the classifier, and session
/// operations cannot fail.
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error("retrieval failed: {0}")]
    Retrieval(String),

    #[error("generation failed: {0}")]
    Generation(String),
}

impl AgentError {
    /// Pipeline stage this error belongs to
    pub fn stage(&self) -> &'static str {
        match self {
            AgentError::InvalidQuery(_) => "validation",
            AgentError::Retrieval(_) => "retrieval",
            AgentError::Generation(_) => "generation",
        }
    }
}
