//! Semantic retrieval
//!
//! Embeds the query in the same space as the stored profile vectors and
//! ranks every embedded profile by cosine similarity. Scores are only
//! meaningful for ranking within a single call.

use lexfind_corpus::{EmbeddingProvider, ProfileStore};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

use crate::error::{EngineError, EngineResult};

/// A retrieval candidate prior to verification.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub profile_id: i64,
    pub score: f32,
}

/// Maps extracted-keyword counts to retrieval depth: more specific
/// queries get fewer, more precise candidates. Empirically tuned; treat
/// as policy, not law.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetrievalPolicy {
    pub k_broad: usize,
    pub k_moderate: usize,
    pub k_narrow: usize,
}

impl Default for RetrievalPolicy {
    fn default() -> Self {
        Self {
            k_broad: 50,
            k_moderate: 40,
            k_narrow: 30,
        }
    }
}

impl RetrievalPolicy {
    /// Retrieval depth for a query with the given keyword count.
    pub fn k_for(&self, keyword_count: usize) -> usize {
        match keyword_count {
            0 => self.k_broad,
            1..=2 => self.k_moderate,
            _ => self.k_narrow,
        }
    }
}

/// Ranks profiles by embedding similarity against the query.
pub struct SemanticRetriever {
    store: Arc<ProfileStore>,
    provider: Arc<dyn EmbeddingProvider>,
    embed_timeout: Duration,
}

impl SemanticRetriever {
    pub fn new(store: Arc<ProfileStore>, provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            store,
            provider,
            embed_timeout: Duration::from_secs(30),
        }
    }

    /// Override the query-embedding timeout.
    pub fn with_embed_timeout(mut self, embed_timeout: Duration) -> Self {
        self.embed_timeout = embed_timeout;
        self
    }

    /// Retrieve up to `k` candidates ranked by similarity, descending.
    ///
    /// Fails with [`EngineError::CorpusNotEmbedded`] when no vectors are
    /// stored at all; a store with vectors that yields no candidates
    /// returns an empty list instead.
    pub async fn retrieve(&self, query: &str, k: usize) -> EngineResult<Vec<Candidate>> {
        if self.store.embedding_count()? == 0 {
            return Err(EngineError::CorpusNotEmbedded);
        }

        let embedded = timeout(
            self.embed_timeout,
            self.provider.embed(&[query.to_string()]),
        )
        .await
        .map_err(|_| {
            EngineError::Embedding(format!(
                "query embedding timed out after {:?}",
                self.embed_timeout
            ))
        })?
        .map_err(|e| EngineError::Embedding(e.to_string()))?;

        let query_vector = embedded
            .into_iter()
            .next()
            .ok_or_else(|| EngineError::Embedding("provider returned no vector".to_string()))?;

        let mut candidates: Vec<Candidate> = self
            .store
            .embedded_vectors()?
            .into_iter()
            .map(|(profile_id, vector)| Candidate {
                profile_id,
                score: cosine_similarity(&query_vector, &vector),
            })
            .collect();

        // Ties break on profile id so identical inputs rank identically
        candidates.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.profile_id.cmp(&b.profile_id))
        });
        candidates.truncate(k);

        tracing::debug!("semantic retrieval returned {} candidates", candidates.len());
        Ok(candidates)
    }
}

/// Cosine similarity between two vectors.
/// Zero-norm or length-mismatched inputs score exactly 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}
