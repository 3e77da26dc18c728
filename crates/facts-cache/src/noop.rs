//! No-op cache implementation.

use async_trait::async_trait;
use facts_core::{CacheEntry, CacheStats, DataCache, Result};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::trace;

/// A no-op cache that doesn't store anything.
///
/// `get` always returns `Ok(None)` and `put` discards its payload. Useful
/// for disabling caching or testing code paths without cache hits. Misses
/// are still counted so callers can observe that lookups happened.
#[derive(Debug, Default)]
pub struct NoopCache {
    misses: AtomicU64,
}

impl NoopCache {
    /// Create a new no-op cache.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            misses: AtomicU64::new(0),
        }
    }
}

#[async_trait]
impl DataCache for NoopCache {
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>> {
        trace!("NoopCache: get {key} called, returning None");
        self.misses.fetch_add(1, Ordering::Relaxed);
        Ok(None)
    }

    async fn put(&self, key: &str, _data: &[u8]) -> Result<()> {
        trace!("NoopCache: put {key} called, doing nothing");
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        trace!("NoopCache: remove {key} called, doing nothing");
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        trace!("NoopCache: clear called, doing nothing");
        Ok(())
    }

    fn stats(&self) -> CacheStats {
        CacheStats {
            hits: 0,
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_noop_cache_get_returns_none() {
        let cache = NoopCache::new();
        assert!(cache.get("anything").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_noop_cache_put_is_discarded() {
        let cache = NoopCache::new();

        cache.put("k", b"payload").await.unwrap();
        assert!(cache.get("k").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_noop_cache_counts_misses() {
        let cache = NoopCache::new();

        cache.get("a").await.unwrap();
        cache.get("b").await.unwrap();

        let stats = cache.stats();
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 2);
    }

    #[tokio::test]
    async fn test_noop_cache_management() {
        let cache = NoopCache::new();
        assert!(cache.remove("k").await.is_ok());
        assert!(cache.clear().await.is_ok());
    }
}
