//! Result caching
//!
//! Wraps full resolutions keyed by normalized query text plus corpus
//! identity. Capacity-bounded LRU with an independent TTL: reading a live
//! entry refreshes its recency, but an entry older than the TTL is a miss
//! no matter how recently it was touched. The clock is injectable so
//! expiry is testable.

use lru::LruCache;
use serde::Deserialize;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use xxhash_rust::xxh3::xxh3_64;

use crate::resolver::ProfileHit;

/// Time source for cache entries.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Wall-clock time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Capacity and expiry settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub capacity: usize,
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: 256,
            ttl: Duration::from_secs(900),
        }
    }
}

struct CacheEntry {
    hits: Vec<ProfileHit>,
    created_at: Instant,
}

/// LRU + TTL cache for resolved result sets.
///
/// Owns its entries exclusively; entries are replaced wholesale, never
/// partially updated. All bookkeeping happens under one lock so
/// concurrent resolutions cannot corrupt eviction state.
pub struct ResultCache {
    entries: Mutex<LruCache<u64, CacheEntry>>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl ResultCache {
    pub fn new(config: CacheConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: CacheConfig, clock: Arc<dyn Clock>) -> Self {
        let capacity =
            NonZeroUsize::new(config.capacity).unwrap_or(NonZeroUsize::new(256).unwrap());
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            clock,
            ttl: config.ttl,
        }
    }

    /// Look up a cached result set. A hit refreshes recency; an expired
    /// entry is purged and reported as a miss.
    pub fn get(&self, query: &str, corpus_id: &str) -> Option<Vec<ProfileHit>> {
        let key = cache_key(query, corpus_id);
        let mut entries = self.entries.lock().ok()?;

        let created_at = entries.get(&key)?.created_at;
        if self.clock.now().duration_since(created_at) > self.ttl {
            entries.pop(&key);
            return None;
        }
        entries.peek(&key).map(|entry| entry.hits.clone())
    }

    /// Store a result set, evicting the least-recently-used entry on
    /// overflow.
    pub fn put(&self, query: &str, corpus_id: &str, hits: Vec<ProfileHit>) {
        let key = cache_key(query, corpus_id);
        if let Ok(mut entries) = self.entries.lock() {
            entries.put(
                key,
                CacheEntry {
                    hits,
                    created_at: self.clock.now(),
                },
            );
        }
    }

    /// Number of live entries (expired ones included until touched).
    pub fn len(&self) -> usize {
        self.entries.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entry.
    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
    }
}

/// Fixed-length key from case-folded, trimmed query text and corpus
/// identity. Textually different queries stay distinct.
fn cache_key(query: &str, corpus_id: &str) -> u64 {
    let normalized = query.trim().to_lowercase();
    xxh3_64(format!("{corpus_id}\u{1f}{normalized}").as_bytes())
}
