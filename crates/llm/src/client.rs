//! Azure OpenAI client
//!
//! Deployment-scoped chat-completions and embeddings endpoints, authenticated
//! with the `api-key` header and versioned with the `api-version` query
//! parameter.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use doc_agent_core::{CompletionModel, CompletionRequest, Embedder, Error, Message};

use crate::LlmError;

/// Client configuration
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Azure OpenAI resource endpoint, e.g. `https://myres.openai.azure.com`
    pub endpoint: String,
    /// API key
    pub api_key: String,
    /// Chat model deployment name
    pub chat_deployment: String,
    /// Embedding model deployment name
    pub embedding_deployment: String,
    /// API version query parameter
    pub api_version: String,
    /// Embedding output dimension
    pub embedding_dimension: usize,
    /// Per-request timeout
    pub timeout: Duration,
    /// Maximum retry attempts for transient failures
    pub max_retries: u32,
    /// Initial backoff duration (doubles each retry)
    pub initial_backoff: Duration,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            api_key: String::new(),
            chat_deployment: "gpt-4".to_string(),
            embedding_deployment: "text-embedding-ada-002".to_string(),
            api_version: "2024-02-15-preview".to_string(),
            embedding_dimension: 1536,
            timeout: Duration::from_secs(30),
            max_retries: 3,
            initial_backoff: Duration::from_millis(100),
        }
    }
}

/// Azure OpenAI client implementing both `CompletionModel` and `Embedder`
#[derive(Clone)]
pub struct AzureOpenAiClient {
    client: Client,
    config: LlmConfig,
}

impl AzureOpenAiClient {
    /// Create a new client
    pub fn new(config: LlmConfig) -> Result<Self, LlmError> {
        if config.endpoint.is_empty() || config.api_key.is_empty() {
            return Err(LlmError::Configuration(
                "endpoint and api_key are required".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LlmError::Configuration(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    /// Build a deployment-scoped API URL
    fn api_url(&self, deployment: &str, operation: &str) -> String {
        format!(
            "{}/openai/deployments/{}/{}?api-version={}",
            self.config.endpoint.trim_end_matches('/'),
            deployment,
            operation,
            self.config.api_version
        )
    }

    async fn execute<Req, Resp>(&self, url: &str, request: &Req) -> Result<Resp, LlmError>
    where
        Req: Serialize,
        Resp: for<'de> Deserialize<'de>,
    {
        let response = self
            .client
            .post(url)
            .header("api-key", &self.config.api_key)
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            // 5xx and 429 are retryable, other 4xx are not
            if status.is_server_error() || status.as_u16() == 429 {
                return Err(LlmError::Network(format!("server error {}: {}", status, body)));
            }
            return Err(LlmError::Api(format!("{}: {}", status, body)));
        }

        response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))
    }

    fn is_retryable(error: &LlmError) -> bool {
        matches!(error, LlmError::Network(_) | LlmError::Timeout)
    }

    /// Execute with bounded exponential-backoff retry for transient failures
    async fn execute_with_retry<Req, Resp>(&self, url: &str, request: &Req) -> Result<Resp, LlmError>
    where
        Req: Serialize,
        Resp: for<'de> Deserialize<'de>,
    {
        let mut last_error = None;
        let mut backoff = self.config.initial_backoff;

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                tracing::warn!(
                    attempt,
                    max_retries = self.config.max_retries,
                    backoff_ms = backoff.as_millis() as u64,
                    "transient Azure OpenAI failure, retrying"
                );
                tokio::time::sleep(backoff).await;
                backoff *= 2;
            }

            match self.execute(url, request).await {
                Ok(response) => return Ok(response),
                Err(e) if Self::is_retryable(&e) => {
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or_else(|| LlmError::Network("max retries exceeded".to_string())))
    }

    async fn chat(&self, request: CompletionRequest) -> Result<String, LlmError> {
        let wire = ChatRequest {
            messages: request.messages.iter().map(ChatMessage::from).collect(),
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        let url = self.api_url(&self.config.chat_deployment, "chat/completions");
        let response: ChatResponse = self.execute_with_retry(&url, &wire).await?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::InvalidResponse("no choices in response".to_string()))?;

        Ok(choice.message.content.trim().to_string())
    }

    async fn embed_text(&self, text: &str) -> Result<Vec<f32>, LlmError> {
        let wire = EmbeddingRequest {
            input: text.to_string(),
        };

        let url = self.api_url(&self.config.embedding_deployment, "embeddings");
        let response: EmbeddingResponse = self.execute_with_retry(&url, &wire).await?;

        let item = response
            .data
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::InvalidResponse("no embedding in response".to_string()))?;

        Ok(item.embedding)
    }
}

#[async_trait]
impl CompletionModel for AzureOpenAiClient {
    async fn complete(&self, request: CompletionRequest) -> doc_agent_core::Result<String> {
        self.chat(request)
            .await
            .map_err(|e| Error::Completion(e.to_string()))
    }

    fn model_name(&self) -> &str {
        &self.config.chat_deployment
    }
}

#[async_trait]
impl Embedder for AzureOpenAiClient {
    async fn embed(&self, text: &str) -> doc_agent_core::Result<Vec<f32>> {
        self.embed_text(text)
            .await
            .map_err(|e| Error::Embedding(e.to_string()))
    }

    fn dimension(&self) -> usize {
        self.config.embedding_dimension
    }
}

// Azure OpenAI wire types

#[derive(Debug, Serialize)]
struct ChatRequest {
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

impl From<&Message> for ChatMessage {
    fn from(msg: &Message) -> Self {
        Self {
            role: msg.role.to_string(),
            content: msg.content.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest {
    input: String,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use doc_agent_core::Role;

    fn test_config() -> LlmConfig {
        LlmConfig {
            endpoint: "https://example.openai.azure.com".to_string(),
            api_key: "test-key".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_new_requires_credentials() {
        assert!(matches!(
            AzureOpenAiClient::new(LlmConfig::default()),
            Err(LlmError::Configuration(_))
        ));
        assert!(AzureOpenAiClient::new(test_config()).is_ok());
    }

    #[test]
    fn test_api_url_shape() {
        let client = AzureOpenAiClient::new(test_config()).unwrap();
        let url = client.api_url("gpt-4", "chat/completions");
        assert_eq!(
            url,
            "https://example.openai.azure.com/openai/deployments/gpt-4/chat/completions?api-version=2024-02-15-preview"
        );
    }

    #[test]
    fn test_message_conversion() {
        let msg = Message {
            role: Role::User,
            content: "Hello".to_string(),
        };
        let wire = ChatMessage::from(&msg);
        assert_eq!(wire.role, "user");
        assert_eq!(wire.content, "Hello");
    }

    #[test]
    fn test_retryable_classification() {
        assert!(AzureOpenAiClient::is_retryable(&LlmError::Timeout));
        assert!(AzureOpenAiClient::is_retryable(&LlmError::Network(
            "503".to_string()
        )));
        assert!(!AzureOpenAiClient::is_retryable(&LlmError::Api(
            "400 bad request".to_string()
        )));
    }
}
