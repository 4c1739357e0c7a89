//! Query resolution pipeline
//!
//! Orchestrates the hybrid flow: classification, then either the
//! structured parse/compile/execute path or the semantic
//! retrieve/filter/verify path, with the result cache wrapping the whole
//! call on the way in and out.

use lexfind_corpus::{AliasTable, EmbeddingProvider, ProfileStore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::cache::{CacheConfig, ResultCache};
use crate::classify::{QueryClassifier, QueryKind};
use crate::compile::compile;
use crate::error::EngineResult;
use crate::judge::Judge;
use crate::keywords::{extract_keywords, FilterPolicy, KeywordFilter};
use crate::parse::parse_query;
use crate::retrieve::{RetrievalPolicy, SemanticRetriever};
use crate::verify::{JudgeVerifier, ProfileTextSource, VerifierConfig};

/// One resolved profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileHit {
    pub id: i64,
    pub name: String,
    pub url: String,
    /// Judge rationale; present only on the semantic path
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
}

/// Aggregate pipeline configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    pub retrieval: RetrievalPolicy,
    pub filter: FilterPolicy,
    pub verifier: VerifierConfig,
    pub cache: CacheConfig,
}

/// Hybrid query resolver over one profile corpus.
pub struct QueryResolver {
    store: Arc<ProfileStore>,
    classifier: QueryClassifier,
    retriever: SemanticRetriever,
    prefilter: KeywordFilter,
    verifier: JudgeVerifier,
    cache: ResultCache,
    school_aliases: AliasTable,
    practice_aliases: AliasTable,
    retrieval: RetrievalPolicy,
}

impl QueryResolver {
    /// Build a resolver with default configuration. Alias tables are
    /// loaded once, here.
    pub fn new(
        store: Arc<ProfileStore>,
        embeddings: Arc<dyn EmbeddingProvider>,
        judge: Arc<dyn Judge>,
    ) -> EngineResult<Self> {
        Self::with_config(store, embeddings, judge, ResolverConfig::default())
    }

    pub fn with_config(
        store: Arc<ProfileStore>,
        embeddings: Arc<dyn EmbeddingProvider>,
        judge: Arc<dyn Judge>,
        config: ResolverConfig,
    ) -> EngineResult<Self> {
        let school_aliases = store.school_aliases()?;
        let practice_aliases = store.practice_aliases()?;

        Ok(Self {
            classifier: QueryClassifier::with_fallback(Arc::clone(&judge)),
            retriever: SemanticRetriever::new(Arc::clone(&store), embeddings),
            prefilter: KeywordFilter::new(Arc::clone(&store), config.filter),
            verifier: JudgeVerifier::new(Arc::clone(&store), judge).with_config(config.verifier),
            cache: ResultCache::new(config.cache),
            retrieval: config.retrieval,
            school_aliases,
            practice_aliases,
            store,
        })
    }

    /// Attach a fallback text source for candidates without cached text.
    pub fn with_text_source(mut self, source: Arc<dyn ProfileTextSource>) -> Self {
        self.verifier = self.verifier.with_text_source(source);
        self
    }

    /// Resolve a free-text query into a ranked/filtered list of profiles.
    pub async fn resolve(&self, query: &str) -> EngineResult<Vec<ProfileHit>> {
        if let Some(hits) = self.cache.get(query, self.store.corpus_id()) {
            tracing::debug!("cache hit for query: {query}");
            return Ok(hits);
        }

        let kind = self.classifier.classify(query).await;
        tracing::debug!("query {query:?} classified as {kind:?}");

        let hits = match kind {
            QueryKind::Structured => self.resolve_structured(query)?,
            QueryKind::Semantic => self.resolve_semantic(query).await?,
        };

        self.cache.put(query, self.store.corpus_id(), hits.clone());
        Ok(hits)
    }

    fn resolve_structured(&self, query: &str) -> EngineResult<Vec<ProfileHit>> {
        let ast = parse_query(query, &self.practice_aliases);
        if ast.is_empty() {
            return Ok(Vec::new());
        }

        let compiled = compile(&ast, &self.school_aliases);
        let rows = self.store.execute(&compiled, None)?;
        tracing::debug!("structured path matched {} profiles", rows.len());

        Ok(rows
            .into_iter()
            .map(|row| ProfileHit {
                id: row.id,
                name: row.name,
                url: row.url,
                rationale: None,
            })
            .collect())
    }

    async fn resolve_semantic(&self, query: &str) -> EngineResult<Vec<ProfileHit>> {
        let keywords = extract_keywords(query);
        let k = self.retrieval.k_for(keywords.len());

        let candidates = self.retriever.retrieve(query, k).await?;
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let candidate_ids: Vec<i64> = candidates.iter().map(|c| c.profile_id).collect();
        let narrowed = self.prefilter.filter(&candidate_ids, query);
        tracing::debug!(
            "{} of {} candidates survive keyword pre-filter",
            narrowed.len(),
            candidate_ids.len()
        );

        let verdicts = self.verifier.verify(&narrowed, query).await;

        // Verdicts arrive name-sorted; keep only the passing ones
        Ok(verdicts
            .into_iter()
            .filter(|verdict| verdict.passed)
            .map(|verdict| ProfileHit {
                id: verdict.profile_id,
                name: self
                    .store
                    .display_name(verdict.profile_id)
                    .unwrap_or_default(),
                url: self.store.profile_url(verdict.profile_id).unwrap_or_default(),
                rationale: Some(verdict.rationale),
            })
            .collect())
    }

    /// Parsed predicates, compiled SQL and execution plan for a query's
    /// structured interpretation. Diagnostics only.
    pub fn explain_structured(&self, query: &str) -> EngineResult<String> {
        let ast = parse_query(query, &self.practice_aliases);
        let compiled = compile(&ast, &self.school_aliases);
        let plan = self.store.explain(&compiled)?;
        Ok(format!(
            "ast: {ast:?}\nsql: {}\nparams: {:?}\nplan:\n{plan}",
            compiled.sql, compiled.params
        ))
    }
}
