//! Collaborator error types
//!
//! Failures of the three external services the pipeline depends on. The
//! request-level taxonomy (validation/retrieval/generation) lives in the
//! agent crate and wraps these at each pipeline stage.

use thiserror::Error;

/// External collaborator errors
#[derive(Error, Debug)]
pub enum Error {
    /// Embedding service failure (timeout, quota, malformed input)
    #[error("embedding error: {0}")]
    Embedding(String),

    /// Completion service failure (timeout, quota, bad response)
    #[error("completion error: {0}")]
    Completion(String),

    /// Vector index unavailable or corrupt
    #[error("index error: {0}")]
    Index(String),
}

pub type Result<T> = std::result::Result<T, Error>;
