//! The ask pipeline orchestrator
//!
//! `DocAgent` owns the classifier, the retrieval assembler, the synthesizer,
//! and the session store, and runs each request through the fixed sequence
//! validate -> classify -> retrieve -> synthesize -> record.
//!
//! The per-session lock is held from the history read until the turn is
//! recorded, so concurrent requests against one session serialize and each
//! sees every previously completed turn. A request that fails at any stage
//! records nothing.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;
use uuid::Uuid;

use doc_agent_core::{AnswerResult, ConversationTurn, HealthSnapshot};
use doc_agent_rag::RetrievalAssembler;

use crate::classifier::QueryClassifier;
use crate::memory::SessionStore;
use crate::synthesizer::AnswerSynthesizer;
use crate::AgentError;

/// Stage deadlines for external calls
#[derive(Debug, Clone)]
pub struct AgentTimeouts {
    /// Deadline for embedding plus index search
    pub retrieval: Duration,
    /// Deadline for answer generation
    pub generation: Duration,
}

impl Default for AgentTimeouts {
    fn default() -> Self {
        Self {
            retrieval: Duration::from_secs(30),
            generation: Duration::from_secs(30),
        }
    }
}

/// Orchestrates one `ask` end to end
pub struct DocAgent {
    classifier: QueryClassifier,
    retriever: RetrievalAssembler,
    synthesizer: AnswerSynthesizer,
    sessions: Arc<SessionStore>,
    timeouts: AgentTimeouts,
    max_query_length: usize,
}

impl DocAgent {
    pub fn new(
        classifier: QueryClassifier,
        retriever: RetrievalAssembler,
        synthesizer: AnswerSynthesizer,
        sessions: Arc<SessionStore>,
        timeouts: AgentTimeouts,
    ) -> Self {
        Self {
            classifier,
            retriever,
            synthesizer,
            sessions,
            timeouts,
            max_query_length: 2000,
        }
    }

    pub fn with_max_query_length(mut self, max_query_length: usize) -> Self {
        self.max_query_length = max_query_length;
        self
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    /// Answer one query within a session.
    ///
    /// When `session_id` is `None` a fresh id is generated and returned in
    /// the result. The turn is recorded only after synthesis succeeds.
    pub async fn ask(
        &self,
        query: &str,
        session_id: Option<String>,
    ) -> Result<AnswerResult, AgentError> {
        let query = self.validate(query)?;
        let session_id = session_id.unwrap_or_else(|| Uuid::new_v4().to_string());

        let started = std::time::Instant::now();
        let handle = self.sessions.handle(&session_id);
        let mut session = handle.state.lock().await;
        // A sweep may have evicted the map entry between lookup and lock
        self.sessions.reattach(&session_id, &handle);

        // A stale session the sweeper has not reached yet starts over
        if session.is_expired(chrono::Utc::now(), self.sessions.config().ttl) {
            tracing::debug!(session_id = %session_id, "session expired, restarting");
            session.restart();
        }
        let history = session.turns();

        let classification = self.classifier.classify(query, &history).await;

        let chunks = if classification.needs_retrieval() {
            match timeout(self.timeouts.retrieval, self.retriever.retrieve(query)).await {
                Ok(Ok(chunks)) => chunks,
                Ok(Err(e)) => return Err(AgentError::Retrieval(e.to_string())),
                Err(_) => {
                    return Err(AgentError::Retrieval(format!(
                        "timed out after {}ms",
                        self.timeouts.retrieval.as_millis()
                    )))
                }
            }
        } else {
            Vec::new()
        };

        let result = match timeout(
            self.timeouts.generation,
            self.synthesizer
                .synthesize(query, classification, &chunks, &history, &session_id),
        )
        .await
        {
            Ok(result) => result?,
            Err(_) => {
                return Err(AgentError::Generation(format!(
                    "timed out after {}ms",
                    self.timeouts.generation.as_millis()
                )))
            }
        };

        session.record_turn(
            ConversationTurn::new(query, result.answer.clone()),
            self.sessions.config().max_turns,
        );

        tracing::info!(
            session_id = %session_id,
            classification = %classification,
            num_sources = result.metadata.num_sources,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "ask complete"
        );

        Ok(result)
    }

    /// Destroy a session's history
    pub fn reset_session(&self, session_id: &str) {
        self.sessions.reset(session_id);
    }

    /// Liveness snapshot for health reporting
    pub fn health_snapshot(&self) -> HealthSnapshot {
        let stats = self.retriever.index_stats();
        HealthSnapshot {
            status: "healthy".to_string(),
            index_size: stats.size,
            dimension: stats.dimension,
            active_sessions: self.sessions.count(),
        }
    }

    fn validate<'a>(&self, query: &'a str) -> Result<&'a str, AgentError> {
        let trimmed = query.trim();
        if trimmed.is_empty() {
            return Err(AgentError::InvalidQuery("query is empty".to_string()));
        }
        if trimmed.len() > self.max_query_length {
            return Err(AgentError::InvalidQuery(format!(
                "query exceeds {} characters",
                self.max_query_length
            )));
        }
        Ok(trimmed)
    }
}
