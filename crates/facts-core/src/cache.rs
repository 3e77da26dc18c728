//! Cache service trait for storing fetched documents and computed results.
//!
//! Caches are constructed explicitly and injected into the services that
//! need them; there is no process-global cache state. Backends store opaque
//! bytes with a timestamp and leave staleness policy to the caller, so one
//! backend type serves the archive cache, the ticker-document cache, and
//! the result cache at different TTLs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;

use crate::error::Result;

/// A cached payload with the instant it was stored.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CacheEntry {
    /// The cached bytes.
    pub data: Vec<u8>,
    /// When the entry was stored.
    pub cached_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Creates an entry timestamped now.
    #[must_use]
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            data,
            cached_at: Utc::now(),
        }
    }

    /// Returns true if the entry is older than `ttl`.
    #[must_use]
    pub fn is_stale(&self, ttl: Duration) -> bool {
        let age = Utc::now().signed_duration_since(self.cached_at);
        age > chrono::TimeDelta::from_std(ttl).unwrap_or(chrono::TimeDelta::MAX)
    }
}

/// Hit/miss counters for one cache instance.
///
/// Every [`DataCache::get`] records either a hit or a miss, making cache
/// behavior observable to tests and telemetry without instrumenting call
/// sites.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of `get` calls that found an entry.
    pub hits: u64,
    /// Number of `get` calls that found nothing.
    pub misses: u64,
}

/// Trait for caching fetched documents and computed results.
///
/// Implementations can store data in various backends (SQLite, in-memory,
/// etc.). Concurrent reads are safe; writes are idempotent last-writer-wins,
/// so re-fetching and re-caching the same key twice is harmless.
#[async_trait]
pub trait DataCache: Send + Sync {
    /// Retrieves the entry stored under `key`.
    ///
    /// Returns `Ok(Some(entry))` if cached, `Ok(None)` if not. The caller
    /// judges staleness against its own TTL via [`CacheEntry::is_stale`].
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>>;

    /// Stores `data` under `key`, replacing any previous entry.
    async fn put(&self, key: &str, data: &[u8]) -> Result<()>;

    /// Removes the entry stored under `key`, if any.
    async fn remove(&self, key: &str) -> Result<()>;

    /// Clears all entries.
    async fn clear(&self) -> Result<()>;

    /// Returns the hit/miss counters recorded so far.
    fn stats(&self) -> CacheStats;
}
