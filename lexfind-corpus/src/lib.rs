//! LexFind Corpus Layer
//!
//! Relational storage for professional profile records with whole-token
//! name search (FTS5), alias normalization tables, cached experience text
//! and embedding vectors for semantic retrieval.
//!
//! ## Example
//!
//! ```ignore
//! use lexfind_corpus::{Education, ProfileRecord, ProfileStore};
//!
//! let store = ProfileStore::open("profiles.db")?;
//!
//! let record = ProfileRecord::builder()
//!     .url("https://example.com/people/jane-doe")
//!     .name("Jane Doe")
//!     .title("Partner")
//!     .education(Education::law("Yale Law School", 2008).normalized("Yale"))
//!     .practice("Tax")
//!     .build()?;
//!
//! let id = store.add_profile(&record)?;
//! store.save_experience(id, "Represented streaming platforms...", "")?;
//! store.create_indexes()?;
//! ```

pub mod embedding;
pub mod error;
pub mod query;
pub mod record;
pub mod store;

// Re-exports for convenience
pub use embedding::EmbeddingProvider;
#[cfg(feature = "local-embeddings")]
pub use embedding::LocalEmbeddingProvider;
pub use error::{CorpusError, Result};
pub use query::{AliasResolver, AliasTable, CompiledQuery, NoAliases, ProfileRow, SqlValue};
pub use record::{Education, ProfileRecord, ProfileRecordBuilder, RecordBuildError};
pub use store::ProfileStore;
