//! Retrieval over a pre-built chunk corpus
//!
//! Features:
//! - Flat in-memory vector index with brute-force L2 search
//! - JSON snapshot persistence for the pre-built corpus
//! - Retrieval assembler: embed -> nearest-neighbor search -> threshold filter

pub mod flat_index;
pub mod retriever;

pub use flat_index::{FlatIndex, IndexedChunk, IndexSnapshot};
pub use retriever::{RetrievalAssembler, RetrieverConfig};
