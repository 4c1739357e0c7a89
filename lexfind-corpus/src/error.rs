//! Error types for lexfind-corpus

use thiserror::Error;

/// Errors that can occur in the corpus layer
#[derive(Debug, Error)]
pub enum CorpusError {
    /// SQLite error
    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// Vector encoding error (bincode)
    #[error("Encoding error: {0}")]
    Encoding(#[from] bincode::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Embedding generation error
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Profile not found
    #[error("Profile not found: {0}")]
    NotFound(i64),

    /// Builder error
    #[error("Record error: {0}")]
    Record(#[from] crate::record::RecordBuildError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl CorpusError {
    /// Create an embedding error
    pub fn embedding(msg: impl Into<String>) -> Self {
        Self::Embedding(msg.into())
    }

    /// Create a generic error
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }
}

/// Result type for corpus operations
pub type Result<T> = std::result::Result<T, CorpusError>;
