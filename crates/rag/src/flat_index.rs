//! Flat vector index
//!
//! Brute-force nearest-neighbor search over an in-memory chunk corpus. L2
//! distance is converted to a similarity score as `1 / (1 + distance)`, so
//! scores fall in (0.0, 1.0] with 1.0 meaning an exact match.
//!
//! The corpus is built offline; at serving time the index is read-only and
//! loaded from a JSON snapshot.

use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use doc_agent_core::{Error, IndexHit, IndexStats, Result, VectorIndex};

/// One stored chunk with its embedding
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexedChunk {
    /// Chunk text
    pub content: String,
    /// Source document identifier
    pub source: String,
    /// Embedding vector
    pub embedding: Vec<f32>,
}

/// On-disk snapshot format
#[derive(Debug, Serialize, Deserialize)]
pub struct IndexSnapshot {
    /// Embedding dimension all chunks share
    pub dimension: usize,
    /// Stored chunks
    pub chunks: Vec<IndexedChunk>,
}

/// Flat in-memory vector index
pub struct FlatIndex {
    dimension: usize,
    chunks: Vec<IndexedChunk>,
}

impl FlatIndex {
    /// Create an empty index for the given dimension
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            chunks: Vec::new(),
        }
    }

    /// Load an index from a JSON snapshot file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())
            .map_err(|e| Error::Index(format!("failed to read snapshot: {}", e)))?;
        let snapshot: IndexSnapshot = serde_json::from_str(&raw)
            .map_err(|e| Error::Index(format!("failed to parse snapshot: {}", e)))?;

        Self::from_snapshot(snapshot)
    }

    /// Build an index from an in-memory snapshot
    pub fn from_snapshot(snapshot: IndexSnapshot) -> Result<Self> {
        for (i, chunk) in snapshot.chunks.iter().enumerate() {
            if chunk.embedding.len() != snapshot.dimension {
                return Err(Error::Index(format!(
                    "chunk {} has dimension {}, index expects {}",
                    i,
                    chunk.embedding.len(),
                    snapshot.dimension
                )));
            }
        }

        Ok(Self {
            dimension: snapshot.dimension,
            chunks: snapshot.chunks,
        })
    }

    /// Load a snapshot if present, otherwise return an empty index.
    ///
    /// Serving with an empty corpus is valid: retrieval returns no chunks and
    /// synthesis degrades to general knowledge.
    pub fn load_or_empty(path: impl AsRef<Path>, dimension: usize) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            tracing::warn!(path = %path.display(), "index snapshot not found, starting empty");
            return Self::new(dimension);
        }

        match Self::load(path) {
            Ok(index) => {
                tracing::info!(
                    path = %path.display(),
                    chunks = index.chunks.len(),
                    "loaded index snapshot"
                );
                index
            }
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "failed to load index snapshot, starting empty");
                Self::new(dimension)
            }
        }
    }

    /// Save the index to a JSON snapshot file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let snapshot = IndexSnapshot {
            dimension: self.dimension,
            chunks: self.chunks.clone(),
        };
        let raw = serde_json::to_string(&snapshot)
            .map_err(|e| Error::Index(format!("failed to serialize snapshot: {}", e)))?;
        std::fs::write(path.as_ref(), raw)
            .map_err(|e| Error::Index(format!("failed to write snapshot: {}", e)))?;
        Ok(())
    }

    /// Add a chunk (offline index construction and tests)
    pub fn add(&mut self, chunk: IndexedChunk) -> Result<()> {
        if chunk.embedding.len() != self.dimension {
            return Err(Error::Index(format!(
                "embedding dimension {} does not match index dimension {}",
                chunk.embedding.len(),
                self.dimension
            )));
        }
        self.chunks.push(chunk);
        Ok(())
    }

    /// Number of stored chunks
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    fn l2_distance(a: &[f32], b: &[f32]) -> f32 {
        a.iter()
            .zip(b.iter())
            .map(|(x, y)| (x - y) * (x - y))
            .sum::<f32>()
            .sqrt()
    }
}

#[async_trait]
impl VectorIndex for FlatIndex {
    async fn search(&self, vector: &[f32], top_k: usize) -> Result<Vec<IndexHit>> {
        if self.chunks.is_empty() || top_k == 0 {
            return Ok(Vec::new());
        }
        if vector.len() != self.dimension {
            return Err(Error::Index(format!(
                "query dimension {} does not match index dimension {}",
                vector.len(),
                self.dimension
            )));
        }

        let mut scored: Vec<IndexHit> = self
            .chunks
            .iter()
            .map(|chunk| {
                let distance = Self::l2_distance(vector, &chunk.embedding);
                IndexHit {
                    content: chunk.content.clone(),
                    source: chunk.source.clone(),
                    score: 1.0 / (1.0 + distance),
                }
            })
            .collect();

        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(top_k);
        Ok(scored)
    }

    fn stats(&self) -> IndexStats {
        IndexStats {
            size: self.chunks.len(),
            dimension: self.dimension,
        }
    }
}
