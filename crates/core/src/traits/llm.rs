//! Completion service trait

use async_trait::async_trait;

use crate::{CompletionRequest, Result};

/// Chat-completion interface.
///
/// Implementations:
/// - `AzureOpenAiClient` - remote Azure OpenAI chat deployment
///
/// Output is nondeterministic; callers own retry policy above whatever the
/// client wrapper provides internally.
///
/// # Example
///
/// ```ignore
/// let llm: Arc<dyn CompletionModel> = Arc::new(AzureOpenAiClient::new(config)?);
/// let request = CompletionRequest::new("You are a helpful assistant")
///     .with_user_message("What is a vector index?");
/// let text = llm.complete(request).await?;
/// ```
#[async_trait]
pub trait CompletionModel: Send + Sync + 'static {
    /// Generate a completion for the given messages
    ///
    /// Fails with `Error::Completion` on timeout or quota exhaustion.
    async fn complete(&self, request: CompletionRequest) -> Result<String>;

    /// Model/deployment name for logging
    fn model_name(&self) -> &str;
}
