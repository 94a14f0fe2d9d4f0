//! Retrieval assembler
//!
//! Orchestrates query embedding, nearest-neighbor lookup, and relevance
//! filtering. A failing embedder or index fails the call; it is never
//! reported as "no relevant documents". An empty corpus, by contrast, is a
//! valid state that yields an empty chunk list.

use std::sync::Arc;

use doc_agent_core::{Embedder, IndexStats, Result, RetrievedChunk, VectorIndex};

/// Retrieval configuration
#[derive(Debug, Clone)]
pub struct RetrieverConfig {
    /// Nearest-neighbor chunks fetched per query
    pub top_k: usize,
    /// Minimum similarity for a chunk to count as relevant
    pub similarity_threshold: f32,
}

impl Default for RetrieverConfig {
    fn default() -> Self {
        Self {
            top_k: 3,
            similarity_threshold: 0.7,
        }
    }
}

/// Embeds queries and assembles ranked chunks from the vector index
pub struct RetrievalAssembler {
    config: RetrieverConfig,
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
}

impl RetrievalAssembler {
    pub fn new(
        config: RetrieverConfig,
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
    ) -> Self {
        Self {
            config,
            embedder,
            index,
        }
    }

    /// Retrieve relevant chunks for a query, in descending-similarity order.
    ///
    /// Chunks below the similarity threshold are dropped; ranks are assigned
    /// after filtering, starting at 1.
    pub async fn retrieve(&self, query: &str) -> Result<Vec<RetrievedChunk>> {
        if self.index.stats().size == 0 {
            tracing::debug!("index is empty, skipping search");
            return Ok(Vec::new());
        }

        let embedding = self.embedder.embed(query).await?;
        let hits = self.index.search(&embedding, self.config.top_k).await?;

        let total_hits = hits.len();
        let chunks: Vec<RetrievedChunk> = hits
            .into_iter()
            .filter(|hit| hit.score >= self.config.similarity_threshold)
            .enumerate()
            .map(|(i, hit)| RetrievedChunk {
                content: hit.content,
                source: hit.source,
                score: hit.score,
                rank: i + 1,
            })
            .collect();

        tracing::debug!(
            retrieved = total_hits,
            above_threshold = chunks.len(),
            threshold = self.config.similarity_threshold,
            "retrieval complete"
        );

        Ok(chunks)
    }

    /// Size and dimension of the underlying index
    pub fn index_stats(&self) -> IndexStats {
        self.index.stats()
    }
}
