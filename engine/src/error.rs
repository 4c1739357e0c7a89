//! Error types for the query-resolution engine.

use lexfind_corpus::CorpusError;
use thiserror::Error;

/// Errors that can escape the resolution pipeline.
///
/// Per-candidate judge failures never surface here; they are recovered
/// locally and turned into negative verdicts.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Semantic retrieval was attempted before any vectors exist.
    /// The corpus needs its offline embedding step, not a retry.
    #[error("corpus has no embeddings; run the embedding preparation step first")]
    CorpusNotEmbedded,

    /// Embedding provider failure or timeout. Transient; retry advised.
    #[error("embedding error: {0}")]
    Embedding(String),

    /// Storage-layer failure
    #[error("corpus error: {0}")]
    Corpus(#[from] CorpusError),
}

impl EngineError {
    /// True when the corpus needs offline preparation rather than a retry.
    pub fn needs_preparation(&self) -> bool {
        matches!(self, EngineError::CorpusNotEmbedded)
    }
}

/// Result type alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
