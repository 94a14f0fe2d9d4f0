//! Answer synthesizer
//!
//! Builds the final prompt (fixed instructions, optional retrieved-context
//! block, bounded session history, the query), invokes the completion service
//! once, and normalizes the response into an `AnswerResult`.
//!
//! Both the context block and the history window carry character budgets:
//! lowest-ranked chunks are dropped first, oldest turns are dropped first.
//! The cited sources are exactly the distinct source documents of the chunks
//! that made it into the prompt, not of everything retrieved.

use std::sync::Arc;

use doc_agent_core::{
    AnswerMetadata, AnswerResult, Classification, CompletionModel, CompletionRequest,
    ConversationTurn, Message, RetrievedChunk,
};

use crate::AgentError;

const SYSTEM_INSTRUCTIONS: &str = "\
You are a helpful AI assistant. Answer questions clearly and concisely.
If context from documents is provided, use it to answer the question accurately.
If no context is provided, use your general knowledge.
Always be professional and helpful.";

/// Synthesizer configuration
#[derive(Debug, Clone)]
pub struct SynthesizerConfig {
    /// Character budget for the retrieved-context block
    pub context_char_budget: usize,
    /// Most recent turns eligible for the prompt
    pub history_max_turns: usize,
    /// Character budget for the history window
    pub history_char_budget: usize,
    /// Sampling temperature
    pub temperature: f32,
    /// Token cap for the generated answer
    pub answer_max_tokens: u32,
}

impl Default for SynthesizerConfig {
    fn default() -> Self {
        Self {
            context_char_budget: 6000,
            history_max_turns: 5,
            history_char_budget: 4000,
            temperature: 0.7,
            answer_max_tokens: 500,
        }
    }
}

/// Produces the final answer for a classified query
pub struct AnswerSynthesizer {
    config: SynthesizerConfig,
    llm: Arc<dyn CompletionModel>,
}

impl AnswerSynthesizer {
    pub fn new(config: SynthesizerConfig, llm: Arc<dyn CompletionModel>) -> Self {
        Self { config, llm }
    }

    /// Synthesize an answer from whatever chunks are available (possibly none)
    pub async fn synthesize(
        &self,
        query: &str,
        classification: Classification,
        chunks: &[RetrievedChunk],
        history: &[ConversationTurn],
        session_id: &str,
    ) -> Result<AnswerResult, AgentError> {
        let (messages, sources) = self.build_prompt(query, chunks, history);

        let request = CompletionRequest::from_messages(messages)
            .with_temperature(self.config.temperature)
            .with_max_tokens(self.config.answer_max_tokens);

        let answer = self
            .llm
            .complete(request)
            .await
            .map_err(|e| AgentError::Generation(e.to_string()))?;

        Ok(AnswerResult {
            answer,
            metadata: AnswerMetadata {
                classification,
                used_rag: classification.needs_retrieval(),
                num_sources: sources.len(),
            },
            source: sources,
            session_id: session_id.to_string(),
        })
    }

    /// Assemble prompt messages and the distinct sources of included chunks
    fn build_prompt(
        &self,
        query: &str,
        chunks: &[RetrievedChunk],
        history: &[ConversationTurn],
    ) -> (Vec<Message>, Vec<String>) {
        let mut messages = vec![Message::system(SYSTEM_INSTRUCTIONS)];

        let (context, sources) = self.build_context_block(chunks);
        if let Some(context) = context {
            messages.push(Message::system(context));
        }

        for turn in self.history_window(history) {
            messages.push(Message::user(turn.query.clone()));
            messages.push(Message::assistant(turn.answer.clone()));
        }

        let user = if sources.is_empty() {
            query.to_string()
        } else {
            format!(
                "{}\n\nPlease answer based on the provided context. \
                 If the context does not contain relevant information, say so.",
                query
            )
        };
        messages.push(Message::user(user));

        (messages, sources)
    }

    /// Concatenate chunk text in rank order within the character budget.
    ///
    /// Returns the context block (if any chunk fit) and the distinct sources
    /// of the chunks that were included.
    fn build_context_block(
        &self,
        chunks: &[RetrievedChunk],
    ) -> (Option<String>, Vec<String>) {
        if chunks.is_empty() {
            return (None, Vec::new());
        }

        let mut block = String::from("Context from company documents:\n");
        let mut sources: Vec<String> = Vec::new();
        let mut used = 0usize;
        let mut included = 0usize;

        for chunk in chunks {
            let entry = format!("\n[{}] {}\n", chunk.rank, chunk.content);
            if used + entry.len() > self.config.context_char_budget {
                tracing::debug!(
                    rank = chunk.rank,
                    source = %chunk.source,
                    "context budget exceeded, dropping chunk"
                );
                break;
            }
            used += entry.len();
            included += 1;
            block.push_str(&entry);
            if !sources.contains(&chunk.source) {
                sources.push(chunk.source.clone());
            }
        }

        if included == 0 {
            return (None, Vec::new());
        }

        (Some(block), sources)
    }

    /// Most recent turns, oldest dropped first when over either bound
    fn history_window<'a>(&self, history: &'a [ConversationTurn]) -> Vec<&'a ConversationTurn> {
        let mut window: Vec<&ConversationTurn> = Vec::new();
        let mut used = 0usize;

        for turn in history.iter().rev().take(self.config.history_max_turns) {
            let cost = turn.query.len() + turn.answer.len();
            if used + cost > self.config.history_char_budget {
                break;
            }
            used += cost;
            window.push(turn);
        }

        window.reverse();
        window
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use doc_agent_core::{Error, Result};

    struct ReplyLlm(&'static str);

    #[async_trait]
    impl CompletionModel for ReplyLlm {
        async fn complete(&self, _request: CompletionRequest) -> Result<String> {
            Ok(self.0.to_string())
        }

        fn model_name(&self) -> &str {
            "reply-llm"
        }
    }

    struct FailingLlm;

    #[async_trait]
    impl CompletionModel for FailingLlm {
        async fn complete(&self, _request: CompletionRequest) -> Result<String> {
            Err(Error::Completion("service unavailable".to_string()))
        }

        fn model_name(&self) -> &str {
            "failing-llm"
        }
    }

    fn chunk(source: &str, content: &str, rank: usize) -> RetrievedChunk {
        RetrievedChunk {
            content: content.to_string(),
            source: source.to_string(),
            score: 1.0 - rank as f32 * 0.1,
            rank,
        }
    }

    fn synthesizer(config: SynthesizerConfig) -> AnswerSynthesizer {
        AnswerSynthesizer::new(config, Arc::new(ReplyLlm("the answer")))
    }

    #[tokio::test]
    async fn test_general_answer_has_no_sources() {
        let result = synthesizer(SynthesizerConfig::default())
            .synthesize("capital of France?", Classification::General, &[], &[], "s1")
            .await
            .unwrap();

        assert_eq!(result.answer, "the answer");
        assert!(result.source.is_empty());
        assert!(!result.metadata.used_rag);
        assert_eq!(result.metadata.num_sources, 0);
    }

    #[tokio::test]
    async fn test_document_answer_cites_distinct_sources() {
        let chunks = vec![
            chunk("hr_policies", "leave entitlement is 15 days", 1),
            chunk("hr_policies", "carry-over rules", 2),
            chunk("faq", "misc", 3),
        ];

        let result = synthesizer(SynthesizerConfig::default())
            .synthesize("leave policy?", Classification::Document, &chunks, &[], "s1")
            .await
            .unwrap();

        assert_eq!(result.source, vec!["hr_policies", "faq"]);
        assert!(result.metadata.used_rag);
        assert_eq!(result.metadata.num_sources, 2);
    }

    #[tokio::test]
    async fn test_context_budget_drops_lowest_ranked_first() {
        let config = SynthesizerConfig {
            // Fits roughly one chunk entry
            context_char_budget: 80,
            ..Default::default()
        };
        let chunks = vec![
            chunk("hr_policies", &"a".repeat(50), 1),
            chunk("faq", &"b".repeat(50), 2),
        ];

        let result = synthesizer(config)
            .synthesize("q", Classification::Document, &chunks, &[], "s1")
            .await
            .unwrap();

        // Only the top-ranked chunk fit, so only its source is cited
        assert_eq!(result.source, vec!["hr_policies"]);
    }

    #[tokio::test]
    async fn test_zero_chunks_still_succeeds() {
        let result = synthesizer(SynthesizerConfig::default())
            .synthesize("leave policy?", Classification::Document, &[], &[], "s1")
            .await
            .unwrap();

        assert!(result.source.is_empty());
        assert!(result.metadata.used_rag);
    }

    #[tokio::test]
    async fn test_generation_failure_is_typed() {
        let synthesizer =
            AnswerSynthesizer::new(SynthesizerConfig::default(), Arc::new(FailingLlm));
        let err = synthesizer
            .synthesize("q", Classification::General, &[], &[], "s1")
            .await
            .unwrap_err();

        assert!(matches!(err, AgentError::Generation(_)));
        assert_eq!(err.stage(), "generation");
    }

    #[test]
    fn test_history_window_drops_oldest_first() {
        let synthesizer = synthesizer(SynthesizerConfig {
            history_max_turns: 2,
            ..Default::default()
        });
        let history = vec![
            ConversationTurn::new("q1", "a1"),
            ConversationTurn::new("q2", "a2"),
            ConversationTurn::new("q3", "a3"),
        ];

        let window = synthesizer.history_window(&history);
        assert_eq!(window.len(), 2);
        assert_eq!(window[0].query, "q2");
        assert_eq!(window[1].query, "q3");
    }

    #[test]
    fn test_history_char_budget() {
        let synthesizer = synthesizer(SynthesizerConfig {
            history_max_turns: 10,
            history_char_budget: 10,
            ..Default::default()
        });
        let history = vec![
            ConversationTurn::new("a long early question", "a long early answer"),
            ConversationTurn::new("q", "a"),
        ];

        let window = synthesizer.history_window(&history);
        assert_eq!(window.len(), 1);
        assert_eq!(window[0].query, "q");
    }
}
