//! Embedding provider contract
//!
//! The engine consumes embeddings through this trait; offline preparation
//! writes vectors into the store through the same one. A local fastembed
//! implementation is available behind the `local-embeddings` feature.

use async_trait::async_trait;

use crate::error::Result;

/// Produces embedding vectors in a fixed model space.
///
/// Implementations must be deterministic for a fixed model/version, so that
/// stored corpus vectors and query vectors stay comparable. Failures must
/// surface as errors; callers decide whether they are recoverable.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a batch of texts, returning one vector per input in order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

#[cfg(feature = "local-embeddings")]
mod local {
    use super::EmbeddingProvider;
    use crate::error::{CorpusError, Result};
    use async_trait::async_trait;
    use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
    use parking_lot::Mutex;

    /// Local embedding provider backed by fastembed (BGE-Small-EN-v1.5).
    ///
    /// Useful for corpora that must embed offline; the model is downloaded
    /// on first use and cached by fastembed.
    pub struct LocalEmbeddingProvider {
        model: Mutex<TextEmbedding>,
    }

    impl LocalEmbeddingProvider {
        pub fn new() -> Result<Self> {
            let model = TextEmbedding::try_new(
                InitOptions::new(EmbeddingModel::BGESmallENV15).with_show_download_progress(false),
            )
            .map_err(|e| CorpusError::embedding(e.to_string()))?;

            tracing::info!("local embedding model ready (BGE-Small-EN-v1.5)");
            Ok(Self {
                model: Mutex::new(model),
            })
        }
    }

    #[async_trait]
    impl EmbeddingProvider for LocalEmbeddingProvider {
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            let documents: Vec<String> = texts.to_vec();
            self.model
                .lock()
                .embed(documents, None)
                .map_err(|e| CorpusError::embedding(e.to_string()))
        }
    }
}

#[cfg(feature = "local-embeddings")]
pub use local::LocalEmbeddingProvider;
