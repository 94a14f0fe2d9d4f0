//! Traits for the external collaborators
//!
//! The pipeline treats the embedding model, the chat-completion model, and the
//! vector index as opaque services behind these traits so they can be mocked
//! in tests and swapped per deployment.

pub mod embedding;
pub mod index;
pub mod llm;

pub use embedding::Embedder;
pub use index::{IndexHit, IndexStats, VectorIndex};
pub use llm::CompletionModel;
