//! Core traits and types for the document Q&A agent
//!
//! This crate provides the foundational types used across all other crates:
//! - Traits for the external collaborators (embedding, completion, vector index)
//! - Conversation and answer types
//! - LLM message types
//! - Collaborator error types

pub mod error;
pub mod llm_types;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
pub use llm_types::{CompletionRequest, Message, Role};
pub use traits::{CompletionModel, Embedder, IndexHit, IndexStats, VectorIndex};
pub use types::{
    AnswerMetadata, AnswerResult, Classification, ConversationTurn, HealthSnapshot,
    RetrievedChunk,
};
