//! SQLite-based cache implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use facts_core::{CacheEntry, CacheStats, DataCache, DataError, Result};
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, instrument};

/// SQLite-based cache for fetched documents and computed results.
///
/// Entries persist across application restarts. One database file can back
/// several logical caches as long as their key namespaces do not collide.
#[derive(Debug)]
pub struct SqliteCache {
    conn: Mutex<Connection>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl SqliteCache {
    /// Create a new SQLite cache at the given path.
    ///
    /// # Arguments
    /// * `path` - Path to the SQLite database file
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or schema creation fails.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path).map_err(|e| DataError::Cache(e.to_string()))?;
        Self::with_connection(conn)
    }

    /// Create an in-memory SQLite cache.
    ///
    /// Useful for testing; data is lost when the cache is dropped.
    ///
    /// # Errors
    /// Returns an error if schema creation fails.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| DataError::Cache(e.to_string()))?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        let cache = Self {
            conn: Mutex::new(conn),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        };
        cache.initialize_schema()?;
        Ok(cache)
    }

    /// Initialize the database schema.
    fn initialize_schema(&self) -> Result<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| DataError::Cache(e.to_string()))?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS cache (
                key TEXT PRIMARY KEY,
                data BLOB NOT NULL,
                cached_at TEXT NOT NULL
            )",
            [],
        )
        .map_err(|e| DataError::Cache(e.to_string()))?;

        debug!("SQLite cache schema initialized");
        Ok(())
    }
}

#[async_trait]
impl DataCache for SqliteCache {
    #[instrument(skip(self))]
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>> {
        let row = {
            let conn = self
                .conn
                .lock()
                .map_err(|e| DataError::Cache(e.to_string()))?;

            conn.query_row(
                "SELECT data, cached_at FROM cache WHERE key = ?1",
                params![key],
                |row| Ok((row.get::<_, Vec<u8>>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()
            .map_err(|e| DataError::Cache(e.to_string()))?
        };

        match row {
            Some((data, cached_at)) => {
                let cached_at = DateTime::parse_from_rfc3339(&cached_at)
                    .map_err(|e| DataError::Cache(e.to_string()))?
                    .with_timezone(&Utc);
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!("Cache hit ({} bytes)", data.len());
                Ok(Some(CacheEntry { data, cached_at }))
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
        let cached_at = Utc::now().to_rfc3339();

        let conn = self
            .conn
            .lock()
            .map_err(|e| DataError::Cache(e.to_string()))?;

        conn.execute(
            "INSERT OR REPLACE INTO cache (key, data, cached_at) VALUES (?1, ?2, ?3)",
            params![key, data, cached_at],
        )
        .map_err(|e| DataError::Cache(e.to_string()))?;

        debug!("Cached {} bytes", data.len());
        Ok(())
    }

    #[instrument(skip(self))]
    async fn remove(&self, key: &str) -> Result<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| DataError::Cache(e.to_string()))?;

        conn.execute("DELETE FROM cache WHERE key = ?1", params![key])
            .map_err(|e| DataError::Cache(e.to_string()))?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn clear(&self) -> Result<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| DataError::Cache(e.to_string()))?;

        conn.execute("DELETE FROM cache", [])
            .map_err(|e| DataError::Cache(e.to_string()))?;

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
    async fn test_sqlite_cache_initialization() {
        let cache = SqliteCache::in_memory();
        assert!(cache.is_ok());
    }

    #[tokio::test]
    async fn test_round_trip() {
        let cache = SqliteCache::in_memory().unwrap();

        // Initially no data
        let result = cache.get("archive/2023q1").await.unwrap();
        assert!(result.is_none());

        // Store data
        cache.put("archive/2023q1", b"payload").await.unwrap();

        // Retrieve data
        let entry = cache.get("archive/2023q1").await.unwrap().unwrap();
        assert_eq!(entry.data, b"payload");
        assert!(!entry.is_stale(std::time::Duration::from_secs(60)));
    }

    #[tokio::test]
    async fn test_put_replaces_existing_entry() {
        let cache = SqliteCache::in_memory().unwrap();

        cache.put("k", b"first").await.unwrap();
        cache.put("k", b"second").await.unwrap();

        let entry = cache.get("k").await.unwrap().unwrap();
        assert_eq!(entry.data, b"second");
    }

    #[tokio::test]
    async fn test_remove_entry() {
        let cache = SqliteCache::in_memory().unwrap();

        cache.put("k", b"payload").await.unwrap();
        cache.remove("k").await.unwrap();

        let result = cache.get("k").await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_clear_cache() {
        let cache = SqliteCache::in_memory().unwrap();

        cache.put("a", b"1").await.unwrap();
        cache.put("b", b"2").await.unwrap();
        cache.clear().await.unwrap();

        assert!(cache.get("a").await.unwrap().is_none());
        assert!(cache.get("b").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_stats_count_hits_and_misses() {
        let cache = SqliteCache::in_memory().unwrap();

        cache.get("k").await.unwrap();
        cache.put("k", b"payload").await.unwrap();
        cache.get("k").await.unwrap();
        cache.get("k").await.unwrap();

        let stats = cache.stats();
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.db");

        {
            let cache = SqliteCache::new(&path).unwrap();
            cache.put("k", b"payload").await.unwrap();
        }

        let cache = SqliteCache::new(&path).unwrap();
        let entry = cache.get("k").await.unwrap().unwrap();
        assert_eq!(entry.data, b"payload");
    }
}
