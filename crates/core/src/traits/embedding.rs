//! Embedding service trait

use async_trait::async_trait;

use crate::Result;

/// Maps text to a fixed-dimension vector.
///
/// Implementations:
/// - `AzureOpenAiClient` - remote Azure OpenAI embeddings deployment
/// - `CachedEmbedder` - bounded cache wrapper around another embedder
#[async_trait]
pub trait Embedder: Send + Sync + 'static {
    /// Embed a single text
    ///
    /// Fails with `Error::Embedding` on timeout, quota, or malformed input.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Output vector dimension
    fn dimension(&self) -> usize;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    struct FixedEmbedder;

    #[async_trait]
    impl Embedder for FixedEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            if text.is_empty() {
                return Err(Error::Embedding("empty input".to_string()));
            }
            Ok(vec![0.0; 4])
        }

        fn dimension(&self) -> usize {
            4
        }
    }

    #[tokio::test]
    async fn test_mock_embedder() {
        let embedder = FixedEmbedder;
        let vector = embedder.embed("hello").await.unwrap();
        assert_eq!(vector.len(), embedder.dimension());
        assert!(embedder.embed("").await.is_err());
    }
}
