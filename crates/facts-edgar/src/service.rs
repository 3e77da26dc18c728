//! The archive data service.
//!
//! [`EdgarService`] ties the transport, the caches, and the collector
//! together. Three cache layers are injected independently and may share a
//! backend: raw archives (served for years, the regulator never revises
//! them), the ticker directory (refreshed yearly), and computed result sets
//! (kept for a week and discarded when the scanning code changes).

use async_trait::async_trait;
use facts_core::{
    AggregateFn, DataCache, DataError, FilterSpec, FilteredRow, ReportPeriod, Result, ResultTable,
    Ticker,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::{Arc, LazyLock};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::client::Transport;
use crate::collector::{self, ArchiveSource};
use crate::tickers::TickerMap;

const ARCHIVE_BASE_URL: &str = "https://www.sec.gov/files/dera/data/financial-statement-data-sets";
const TICKERS_URL: &str = "https://www.sec.gov/files/company_tickers.json";

const ARCHIVE_TTL: Duration = Duration::from_secs(5 * 365 * 24 * 60 * 60);
const TICKERS_TTL: Duration = Duration::from_secs(365 * 24 * 60 * 60);
const RESULT_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Fingerprint of the scanning and collection code. A cached result written
/// by a build with different scanning semantics is recomputed, not trusted.
static CODE_FINGERPRINT: LazyLock<String> = LazyLock::new(|| {
    let mut hasher = Sha256::new();
    hasher.update(include_str!("archive.rs").as_bytes());
    hasher.update(include_str!("collector.rs").as_bytes());
    hasher
        .finalize()
        .iter()
        .map(|byte| format!("{:02x}", byte))
        .collect()
});

/// Envelope for one cached result set.
#[derive(Debug, Serialize, Deserialize)]
struct StoredResult {
    fingerprint: String,
    rows: Vec<FilteredRow>,
}

/// Fetches, caches, and selects facts from the quarterly archives.
///
/// The service holds no global state: construct one per transport and cache
/// configuration and share it behind a reference or an `Arc`. All methods
/// take `&self`.
pub struct EdgarService {
    transport: Arc<dyn Transport>,
    archive_cache: Option<Arc<dyn DataCache>>,
    ticker_cache: Option<Arc<dyn DataCache>>,
    result_cache: Option<Arc<dyn DataCache>>,
    archive_base_url: String,
    tickers_url: String,
    inflight: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl EdgarService {
    /// Creates a service with no caching.
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            archive_cache: None,
            ticker_cache: None,
            result_cache: None,
            archive_base_url: ARCHIVE_BASE_URL.to_string(),
            tickers_url: TICKERS_URL.to_string(),
            inflight: Mutex::new(HashMap::new()),
        }
    }

    /// Caches fetched quarterly archives.
    #[must_use]
    pub fn with_archive_cache(mut self, cache: Arc<dyn DataCache>) -> Self {
        self.archive_cache = Some(cache);
        self
    }

    /// Caches the fetched ticker directory.
    #[must_use]
    pub fn with_ticker_cache(mut self, cache: Arc<dyn DataCache>) -> Self {
        self.ticker_cache = Some(cache);
        self
    }

    /// Caches computed result sets.
    #[must_use]
    pub fn with_result_cache(mut self, cache: Arc<dyn DataCache>) -> Self {
        self.result_cache = Some(cache);
        self
    }

    /// Overrides the archive base URL.
    #[must_use]
    pub fn with_archive_base_url(mut self, url: impl Into<String>) -> Self {
        self.archive_base_url = url.into();
        self
    }

    /// Overrides the ticker directory URL.
    #[must_use]
    pub fn with_tickers_url(mut self, url: impl Into<String>) -> Self {
        self.tickers_url = url.into();
        self
    }

    /// Fetches and parses the ticker directory.
    ///
    /// # Errors
    /// Returns a network error when the directory cannot be fetched and
    /// [`DataError::Parse`] when it cannot be decoded.
    pub async fn ticker_map(&self) -> Result<TickerMap> {
        let data = self
            .fetch_cached(self.ticker_cache.as_ref(), "tickers", &self.tickers_url, TICKERS_TTL)
            .await?;
        TickerMap::parse(&data)
    }

    /// Selects every fact filed by `tickers` that satisfies `filter`.
    ///
    /// Results are cached under the ticker set and filter; concurrent calls
    /// for the same selection share one collection run. Failed selections
    /// are never cached.
    ///
    /// # Errors
    /// Returns [`DataError::TickerNotFound`] for an unknown ticker,
    /// [`DataError::NoData`] when nothing matches, and the underlying error
    /// when fetching or scanning fails.
    pub async fn select(
        &self,
        tickers: &BTreeSet<Ticker>,
        filter: &FilterSpec,
    ) -> Result<Vec<FilteredRow>> {
        let key = result_key(tickers, filter)?;
        let gate = {
            let mut inflight = self.inflight.lock().await;
            Arc::clone(inflight.entry(key.clone()).or_default())
        };
        let _guard = gate.lock().await;

        if let Some(rows) = self.cached_result(&key).await {
            debug!("{}: serving cached result ({} rows)", key, rows.len());
            return Ok(rows);
        }

        let map = self.ticker_map().await?;
        let rows = collector::collect(self, tickers, &map, filter).await?;
        self.store_result(&key, &rows).await;
        Ok(rows)
    }

    /// Selects facts for `tickers` under `filter` and pivots them into a
    /// table, one row per (ticker, fiscal year), with `aggregate` applied
    /// to each cell group.
    ///
    /// # Errors
    /// Same as [`select`](Self::select).
    pub async fn table(
        &self,
        tickers: &BTreeSet<Ticker>,
        filter: &FilterSpec,
        aggregate: AggregateFn,
    ) -> Result<ResultTable> {
        let rows = self.select(tickers, filter).await?;
        Ok(ResultTable::pivot(&rows, aggregate, None))
    }

    /// Serves `url` through `cache`, refreshing entries older than `ttl`.
    /// A stale entry outlives a failed refresh: better old data than none.
    async fn fetch_cached(
        &self,
        cache: Option<&Arc<dyn DataCache>>,
        key: &str,
        url: &str,
        ttl: Duration,
    ) -> Result<Vec<u8>> {
        let Some(cache) = cache else {
            return self.transport.get(url).await;
        };

        let cached = match cache.get(key).await {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Cache read for {} failed: {}", key, e);
                None
            }
        };
        if let Some(entry) = &cached
            && !entry.is_stale(ttl)
        {
            debug!("{}: cache hit ({} bytes)", key, entry.data.len());
            return Ok(entry.data.clone());
        }

        match self.transport.get(url).await {
            Ok(data) => {
                if let Err(e) = cache.put(key, &data).await {
                    warn!("Cache write for {} failed: {}", key, e);
                }
                Ok(data)
            }
            Err(e) => match cached {
                Some(entry) => {
                    warn!("{}: refresh failed, serving stale copy ({})", key, e);
                    Ok(entry.data)
                }
                None => Err(e),
            },
        }
    }

    async fn cached_result(&self, key: &str) -> Option<Vec<FilteredRow>> {
        let cache = self.result_cache.as_ref()?;
        let entry = match cache.get(key).await {
            Ok(Some(entry)) => entry,
            Ok(None) => return None,
            Err(e) => {
                warn!("Cache read for {} failed: {}", key, e);
                return None;
            }
        };
        if entry.is_stale(RESULT_TTL) {
            return None;
        }

        let stored: StoredResult = match serde_json::from_slice(&entry.data) {
            Ok(stored) => stored,
            Err(e) => {
                warn!("{}: discarding undecodable cached result ({})", key, e);
                self.drop_result(cache, key).await;
                return None;
            }
        };
        if stored.fingerprint != *CODE_FINGERPRINT {
            debug!("{}: discarding result cached by a different build", key);
            self.drop_result(cache, key).await;
            return None;
        }
        Some(stored.rows)
    }

    async fn drop_result(&self, cache: &Arc<dyn DataCache>, key: &str) {
        if let Err(e) = cache.remove(key).await {
            warn!("Failed to drop cached result {}: {}", key, e);
        }
    }

    async fn store_result(&self, key: &str, rows: &[FilteredRow]) {
        let Some(cache) = self.result_cache.as_ref() else {
            return;
        };
        let stored = StoredResult {
            fingerprint: CODE_FINGERPRINT.clone(),
            rows: rows.to_vec(),
        };
        match serde_json::to_vec(&stored) {
            Ok(data) => {
                if let Err(e) = cache.put(key, &data).await {
                    warn!("Cache write for {} failed: {}", key, e);
                }
            }
            Err(e) => warn!("{}: failed to encode result for caching: {}", key, e),
        }
    }
}

#[async_trait]
impl ArchiveSource for EdgarService {
    async fn fetch_archive(&self, period: ReportPeriod) -> Result<Vec<u8>> {
        let url = format!("{}/{}.zip", self.archive_base_url, period);
        let key = format!("archive/{}", period);
        self.fetch_cached(self.archive_cache.as_ref(), &key, &url, ARCHIVE_TTL)
            .await
    }
}

impl fmt::Debug for EdgarService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EdgarService")
            .field("archive_base_url", &self.archive_base_url)
            .field("tickers_url", &self.tickers_url)
            .field("archive_cache", &self.archive_cache.is_some())
            .field("ticker_cache", &self.ticker_cache.is_some())
            .field("result_cache", &self.result_cache.is_some())
            .finish_non_exhaustive()
    }
}

fn result_key(tickers: &BTreeSet<Ticker>, filter: &FilterSpec) -> Result<String> {
    let tickers: Vec<&str> = tickers.iter().map(Ticker::as_str).collect();
    let filter = serde_json::to_string(filter).map_err(|e| DataError::Parse(e.to_string()))?;
    Ok(format!("result/{}/{}", tickers.join(","), filter))
}
