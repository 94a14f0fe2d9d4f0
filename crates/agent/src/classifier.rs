//! Query classifier
//!
//! Routes a query either to general-knowledge synthesis or through document
//! retrieval, using one short temperature-0 completion with a fixed
//! instruction prompt. Anything the completion service returns that does not
//! parse into the closed enum falls back to `Document`: attempting retrieval
//! on an ambiguous query beats answering from unconditioned general
//! knowledge. The same fallback applies when the completion call errors or
//! times out.

use std::sync::Arc;
use std::time::Duration;

use doc_agent_core::{
    Classification, CompletionModel, CompletionRequest, ConversationTurn,
};

const CLASSIFIER_INSTRUCTIONS: &str = "\
You are a query classifier. Decide whether the query below requires searching \
company documents or can be answered with general world knowledge.

Company documents contain information about:
- HR policies (leave, benefits, code of conduct)
- Product FAQs and features
- Security policies
- Employee onboarding
- Technical API documentation

Respond with ONLY one word: \"DOCUMENT\" if the query needs company documents, \
or \"GENERAL\" if it is general knowledge.";

/// Classifier configuration
#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    /// Deadline for the classification completion call
    pub timeout: Duration,
    /// Recent turns shown to the model for disambiguation
    pub history_turns: usize,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            history_turns: 3,
        }
    }
}

/// Decides the route for each query
pub struct QueryClassifier {
    config: ClassifierConfig,
    llm: Arc<dyn CompletionModel>,
}

impl QueryClassifier {
    pub fn new(config: ClassifierConfig, llm: Arc<dyn CompletionModel>) -> Self {
        Self { config, llm }
    }

    /// Classify a query, consulting recent history for follow-up phrasing
    /// ("what about the salary band?" after a document-grounded turn).
    ///
    /// Infallible by contract: every failure mode degrades to `Document`.
    pub async fn classify(
        &self,
        query: &str,
        history: &[ConversationTurn],
    ) -> Classification {
        let request = self.build_request(query, history);

        let raw = match tokio::time::timeout(self.config.timeout, self.llm.complete(request)).await
        {
            Ok(Ok(raw)) => raw,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "classification call failed, defaulting to DOCUMENT");
                return Classification::Document;
            }
            Err(_) => {
                tracing::warn!(
                    timeout_ms = self.config.timeout.as_millis() as u64,
                    "classification call timed out, defaulting to DOCUMENT"
                );
                return Classification::Document;
            }
        };

        match Classification::parse(&raw) {
            Some(classification) => classification,
            None => {
                tracing::warn!(response = %raw, "unparseable classification, defaulting to DOCUMENT");
                Classification::Document
            }
        }
    }

    fn build_request(&self, query: &str, history: &[ConversationTurn]) -> CompletionRequest {
        let mut user = String::new();

        let recent = history
            .iter()
            .rev()
            .take(self.config.history_turns)
            .rev()
            .collect::<Vec<_>>();
        if !recent.is_empty() {
            user.push_str("Previous conversation:\n");
            for turn in recent {
                user.push_str(&format!("user: {}\nassistant: {}\n", turn.query, turn.answer));
            }
            user.push('\n');
        }

        user.push_str(&format!("Query: {}", query));

        CompletionRequest::new(CLASSIFIER_INSTRUCTIONS)
            .with_user_message(user)
            .with_temperature(0.0)
            .with_max_tokens(8)
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
            Err(Error::Completion("quota exceeded".to_string()))
        }

        fn model_name(&self) -> &str {
            "failing-llm"
        }
    }

    struct SlowLlm;

    #[async_trait]
    impl CompletionModel for SlowLlm {
        async fn complete(&self, _request: CompletionRequest) -> Result<String> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok("GENERAL".to_string())
        }

        fn model_name(&self) -> &str {
            "slow-llm"
        }
    }

    fn classifier(llm: impl CompletionModel) -> QueryClassifier {
        QueryClassifier::new(ClassifierConfig::default(), Arc::new(llm))
    }

    #[tokio::test]
    async fn test_parses_both_routes() {
        assert_eq!(
            classifier(ReplyLlm("GENERAL")).classify("capital of France?", &[]).await,
            Classification::General
        );
        assert_eq!(
            classifier(ReplyLlm("DOCUMENT")).classify("leave policy?", &[]).await,
            Classification::Document
        );
    }

    #[tokio::test]
    async fn test_unparseable_defaults_to_document() {
        let classification = classifier(ReplyLlm("I think it depends"))
            .classify("hmm", &[])
            .await;
        assert_eq!(classification, Classification::Document);
    }

    #[tokio::test]
    async fn test_completion_error_defaults_to_document() {
        let classification = classifier(FailingLlm).classify("anything", &[]).await;
        assert_eq!(classification, Classification::Document);
    }

    #[tokio::test]
    async fn test_timeout_defaults_to_document() {
        let config = ClassifierConfig {
            timeout: Duration::from_millis(10),
            ..Default::default()
        };
        let classifier = QueryClassifier::new(config, Arc::new(SlowLlm));

        let classification = classifier.classify("anything", &[]).await;
        assert_eq!(classification, Classification::Document);
    }

    #[tokio::test]
    async fn test_request_includes_recent_history() {
        let config = ClassifierConfig {
            history_turns: 1,
            ..Default::default()
        };
        let classifier = QueryClassifier::new(config, Arc::new(ReplyLlm("GENERAL")));

        let history = vec![
            ConversationTurn::new("old question", "old answer"),
            ConversationTurn::new("what is the leave policy?", "15 days"),
        ];
        let request = classifier.build_request("what about the salary band?", &history);

        let user = &request.messages[1].content;
        assert!(user.contains("what is the leave policy?"));
        assert!(!user.contains("old question"));
        assert!(user.contains("what about the salary band?"));
        assert_eq!(request.temperature, Some(0.0));
    }
}
