//! Vector index trait

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Result;

/// One nearest-neighbor hit with provenance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexHit {
    /// Stored chunk text
    pub content: String,
    /// Source document identifier
    pub source: String,
    /// Similarity score (0.0 - 1.0, higher is closer)
    pub score: f32,
}

/// Index metadata for health reporting
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct IndexStats {
    /// Number of stored chunks
    pub size: usize,
    /// Embedding dimension
    pub dimension: usize,
}

/// Nearest-neighbor oracle over a pre-built chunk corpus.
///
/// The index is read-only during serving; population happens in an offline
/// batch step. An empty index returns an empty hit list, never an error.
#[async_trait]
pub trait VectorIndex: Send + Sync + 'static {
    /// Return the `top_k` nearest stored chunks by descending similarity
    ///
    /// Fails with `Error::Index` if the index is unavailable.
    async fn search(&self, vector: &[f32], top_k: usize) -> Result<Vec<IndexHit>>;

    /// Index metadata
    fn stats(&self) -> IndexStats;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EmptyIndex;

    #[async_trait]
    impl VectorIndex for EmptyIndex {
        async fn search(&self, _vector: &[f32], _top_k: usize) -> Result<Vec<IndexHit>> {
            Ok(Vec::new())
        }

        fn stats(&self) -> IndexStats {
            IndexStats {
                size: 0,
                dimension: 4,
            }
        }
    }

    #[tokio::test]
    async fn test_empty_index_returns_empty() {
        let index = EmptyIndex;
        let hits = index.search(&[0.0; 4], 3).await.unwrap();
        assert!(hits.is_empty());
        assert_eq!(index.stats().size, 0);
    }
}
