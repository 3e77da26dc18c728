//! In-memory cache implementation.

use async_trait::async_trait;
use facts_core::{CacheEntry, CacheStats, DataCache, Result};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;
use tracing::{debug, instrument};

/// Simple in-memory cache for testing and development.
///
/// Entries are stored in a `RwLock`-protected `HashMap` and are lost when
/// the cache is dropped. Payloads are cloned on get/put operations.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl MemoryCache {
    /// Create a new empty in-memory cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DataCache for MemoryCache {
    #[instrument(skip(self))]
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>> {
        let entries = self.entries.read().await;
        match entries.get(key) {
            Some(entry) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!("Cache hit ({} bytes)", entry.data.len());
                Ok(Some(entry.clone()))
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                debug!("Cache miss");
                Ok(None)
            }
        }
    }

    #[instrument(skip(self, data), fields(bytes = data.len()))]
    async fn put(&self, key: &str, data: &[u8]) -> Result<()> {
        let mut entries = self.entries.write().await;
        entries.insert(key.to_string(), CacheEntry::new(data.to_vec()));
        debug!("Cached {} bytes", data.len());
        Ok(())
    }

    #[instrument(skip(self))]
    async fn remove(&self, key: &str) -> Result<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    #[instrument(skip(self))]
    async fn clear(&self) -> Result<()> {
        self.entries.write().await.clear();
        debug!("Cleared all cache entries");
        Ok(())
    }

    fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_cache_round_trip() {
        let cache = MemoryCache::new();

        // Initially no data
        let result = cache.get("tickers").await.unwrap();
        assert!(result.is_none());

        // Store data
        cache.put("tickers", b"payload").await.unwrap();

        // Retrieve data
        let entry = cache.get("tickers").await.unwrap().unwrap();
        assert_eq!(entry.data, b"payload");
    }

    #[tokio::test]
    async fn test_memory_cache_remove() {
        let cache = MemoryCache::new();

        cache.put("k", b"payload").await.unwrap();
        cache.remove("k").await.unwrap();

        assert!(cache.get("k").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_memory_cache_clear() {
        let cache = MemoryCache::new();

        cache.put("a", b"1").await.unwrap();
        cache.put("b", b"2").await.unwrap();
        cache.clear().await.unwrap();

        assert!(cache.get("a").await.unwrap().is_none());
        assert!(cache.get("b").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_memory_cache_stats() {
        let cache = MemoryCache::new();

        cache.get("k").await.unwrap();
        cache.put("k", b"payload").await.unwrap();
        cache.get("k").await.unwrap();

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }
}
