//! LexFind Query-Resolution Engine
//!
//! Resolves free-text natural-language queries over a corpus of
//! professional profile records into ranked/filtered result lists. Two
//! strategies exist: structured queries parse into predicate sequences
//! and compile to storage queries; everything else goes through semantic
//! retrieval, keyword pre-filtering and parallel judge verification. A
//! capacity- and age-bounded result cache wraps the whole pipeline.
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use lexfind_corpus::ProfileStore;
//! use lexfind_engine::QueryResolver;
//!
//! let store = Arc::new(ProfileStore::open("profiles.db")?);
//! let resolver = QueryResolver::new(store, embeddings, judge)?;
//!
//! let hits = resolver.resolve("lawyers who went to Yale and practice Tax").await?;
//! for hit in hits {
//!     println!("{} ({})", hit.name, hit.url);
//! }
//! ```

pub mod cache;
pub mod classify;
pub mod compile;
pub mod error;
pub mod judge;
pub mod keywords;
pub mod parse;
pub mod predicate;
pub mod resolver;
pub mod retrieve;
pub mod verify;

pub use cache::{CacheConfig, Clock, ResultCache, SystemClock};
pub use classify::{rule_classify, QueryClassifier, QueryKind, RuleVerdict};
pub use compile::compile;
pub use error::{EngineError, EngineResult};
pub use judge::{Judge, JudgeError};
pub use keywords::{extract_keywords, FilterPolicy, KeywordFilter};
pub use parse::parse_query;
pub use predicate::{
    AstNode, CmpOp, Connective, Field, Predicate, PredicateSequence, PredicateValue,
};
pub use resolver::{ProfileHit, QueryResolver, ResolverConfig};
pub use retrieve::{cosine_similarity, Candidate, RetrievalPolicy, SemanticRetriever};
pub use verify::{JudgeVerdict, JudgeVerifier, ProfileTextSource, VerifierConfig};
