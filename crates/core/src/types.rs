//! Conversation and answer types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Route chosen for a query: answer from general knowledge or ground the answer
/// in retrieved document chunks.
///
/// Exactly one classification is produced per query and it is not persisted
/// beyond the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Classification {
    /// Answerable from the model's general world knowledge
    General,
    /// Requires company/document-specific information
    Document,
}

impl Classification {
    /// Whether this route goes through retrieval
    pub fn needs_retrieval(&self) -> bool {
        matches!(self, Classification::Document)
    }

    /// Strict parse of a completion response into the closed enum.
    ///
    /// Returns `None` for anything that names neither route; the caller owns
    /// the fallback behavior.
    pub fn parse(raw: &str) -> Option<Classification> {
        let normalized = raw.trim().to_uppercase();
        if normalized.contains("DOCUMENT") {
            Some(Classification::Document)
        } else if normalized.contains("GENERAL") || normalized.contains("DIRECT") {
            Some(Classification::General)
        } else {
            None
        }
    }
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Classification::General => write!(f, "GENERAL"),
            Classification::Document => write!(f, "DOCUMENT"),
        }
    }
}

/// A chunk returned by the retrieval assembler
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedChunk {
    /// Chunk text span
    pub content: String,
    /// Source document identifier
    pub source: String,
    /// Similarity score (0.0 - 1.0, higher is closer)
    pub score: f32,
    /// 1-based rank in descending-similarity order
    pub rank: usize,
}

/// One completed question/answer exchange in a session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    /// User query text
    pub query: String,
    /// Answer text
    pub answer: String,
    /// When the turn was recorded
    pub timestamp: DateTime<Utc>,
}

impl ConversationTurn {
    pub fn new(query: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            answer: answer.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Routing metadata attached to every answer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerMetadata {
    /// Route chosen by the classifier
    pub classification: Classification,
    /// Whether retrieval ran for this query
    pub used_rag: bool,
    /// Number of distinct source documents cited
    pub num_sources: usize,
}

/// Final structured result of one `ask` call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerResult {
    /// Generated answer text
    pub answer: String,
    /// Distinct source document identifiers actually used in the prompt
    pub source: Vec<String>,
    /// Session this turn belongs to (generated when the caller sent none)
    pub session_id: String,
    /// Routing metadata
    pub metadata: AnswerMetadata,
}

/// Liveness snapshot of the serving process and its index
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthSnapshot {
    pub status: String,
    pub index_size: usize,
    pub dimension: usize,
    pub active_sessions: usize,
}
