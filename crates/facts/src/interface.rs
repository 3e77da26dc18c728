//! Run options and service construction.

use chrono::{Datelike, Utc};
use facts_core::{ReportPeriod, Result, Ticker};
use facts_edgar::{EdgarService, HttpTransport};
use std::collections::BTreeSet;
use std::sync::Arc;

#[cfg(feature = "cache-sqlite")]
use facts_cache::SqliteCache;
#[cfg(feature = "cache-sqlite")]
use facts_core::{DataCache, DataError};
#[cfg(feature = "cache-sqlite")]
use std::path::PathBuf;

/// What to select and how to run it.
///
/// Options are handed to both [`build_service`] and
/// [`Analysis::analyze`](crate::Analysis::analyze), so one value describes a
/// whole run.
#[derive(Clone, Debug)]
pub struct Options {
    tickers: BTreeSet<Ticker>,
    years: u8,
    last_report: Option<ReportPeriod>,
    #[cfg(feature = "cache-sqlite")]
    cache_dir: Option<PathBuf>,
    user_agent: String,
}

impl Options {
    /// Creates options with defaults: no tickers, a one-year span, the most
    /// recently published report, and no caching.
    ///
    /// The archive host requires a descriptive user agent naming a contact
    /// address.
    pub fn new(user_agent: impl Into<String>) -> Self {
        Self {
            tickers: BTreeSet::new(),
            years: 1,
            last_report: None,
            #[cfg(feature = "cache-sqlite")]
            cache_dir: None,
            user_agent: user_agent.into(),
        }
    }

    /// Sets the companies to select.
    #[must_use]
    pub fn with_tickers<I>(mut self, tickers: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Ticker>,
    {
        self.tickers = tickers.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the number of full years to cover.
    #[must_use]
    pub const fn with_years(mut self, years: u8) -> Self {
        self.years = years;
        self
    }

    /// Pins the most recent report period instead of deriving it from the
    /// current date.
    #[must_use]
    pub const fn with_last_report(mut self, last_report: ReportPeriod) -> Self {
        self.last_report = Some(last_report);
        self
    }

    /// Persists fetched documents and computed results under `dir`.
    #[cfg(feature = "cache-sqlite")]
    #[must_use]
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }

    /// The companies to select.
    #[must_use]
    pub const fn tickers(&self) -> &BTreeSet<Ticker> {
        &self.tickers
    }

    /// The number of full years to cover.
    #[must_use]
    pub const fn years(&self) -> u8 {
        self.years
    }

    /// The user agent sent with every request.
    #[must_use]
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// The cache directory, if caching was requested.
    #[cfg(feature = "cache-sqlite")]
    #[must_use]
    pub const fn cache_dir(&self) -> Option<&PathBuf> {
        self.cache_dir.as_ref()
    }

    /// The most recent report period to cover: the pinned one, or the last
    /// period old enough for its archive to have been published.
    ///
    /// # Errors
    /// Returns [`DataError::InvalidParameter`](facts_core::DataError) when
    /// the derived period is invalid, which only a misconfigured clock can
    /// cause.
    pub fn last_report(&self) -> Result<ReportPeriod> {
        match self.last_report {
            Some(period) => Ok(period),
            None => latest_published(),
        }
    }
}

/// The archive covering the current calendar quarter is still being
/// assembled, so the previous quarter is the newest one worth requesting.
fn latest_published() -> Result<ReportPeriod> {
    let now = Utc::now();
    let quarter = (now.month0() / 3 + 1) as u8;
    Ok(ReportPeriod::new(now.year(), quarter)?.previous())
}

/// Builds the data service described by `options`.
///
/// With the `cache-sqlite` feature and a cache directory set, fetched
/// documents land in `documents.db` and computed results in `results.db`
/// under that directory; otherwise nothing is cached.
///
/// # Errors
/// Returns [`DataError::Network`](facts_core::DataError) when the HTTP
/// client cannot be built and
/// [`DataError::Cache`](facts_core::DataError) when the cache directory
/// cannot be prepared.
pub fn build_service(options: &Options) -> Result<EdgarService> {
    let transport = Arc::new(HttpTransport::new(options.user_agent())?);
    let service = EdgarService::new(transport);

    #[cfg(feature = "cache-sqlite")]
    let service = match options.cache_dir() {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .map_err(|e| DataError::Cache(format!("{}: {}", dir.display(), e)))?;
            let documents: Arc<dyn DataCache> =
                Arc::new(SqliteCache::new(dir.join("documents.db"))?);
            let results: Arc<dyn DataCache> = Arc::new(SqliteCache::new(dir.join("results.db"))?);
            service
                .with_archive_cache(Arc::clone(&documents))
                .with_ticker_cache(documents)
                .with_result_cache(results)
        }
        None => service,
    };

    Ok(service)
}
