//! Concurrent collection across quarterly archives.
//!
//! A filter spanning `years` full years touches `4 * years + 1` archives.
//! Fetches run concurrently up to the host's parallelism, each scan runs on
//! the blocking pool, and per-archive results merge into one sorted row set.

use async_trait::async_trait;
use facts_core::{Cik, DataError, FilterSpec, FilteredRow, ReportPeriod, Result, Ticker};
use futures::stream::{self, StreamExt};
use std::collections::{BTreeSet, HashMap};
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

use crate::archive::{self, ScannedFact};
use crate::tickers::TickerMap;

/// Budget for fetching and scanning a single archive.
const SCAN_TIMEOUT: Duration = Duration::from_secs(60);

/// Supplies the raw bytes of one quarterly archive.
#[async_trait]
pub trait ArchiveSource: Send + Sync {
    /// Fetches the archive covering `period`.
    ///
    /// # Errors
    /// Returns [`DataError::Unavailable`] when no archive has been published
    /// for the period, which the collector tolerates, and other errors for
    /// failures that should abort the collection.
    async fn fetch_archive(&self, period: ReportPeriod) -> Result<Vec<u8>>;
}

/// Collects every fact filed by `tickers` that satisfies `filter`, across
/// all archives the filter requires.
///
/// Unpublished archives are skipped with a warning; the most recent quarter
/// routinely lags publication. Rows come back sorted by ticker, fiscal
/// year, tag, and data date.
///
/// # Errors
/// Returns [`DataError::TickerNotFound`] before any fetch when a ticker is
/// unknown, [`DataError::NoData`] when every archive comes back empty, and
/// the underlying error when a fetch or scan fails outright.
pub async fn collect<S>(
    source: &S,
    tickers: &BTreeSet<Ticker>,
    map: &TickerMap,
    filter: &FilterSpec,
) -> Result<Vec<FilteredRow>>
where
    S: ArchiveSource + ?Sized,
{
    let mut requested: HashMap<Cik, Ticker> = HashMap::new();
    for ticker in tickers {
        requested.insert(map.resolve(ticker)?, ticker.clone());
    }
    let ciks: Arc<BTreeSet<Cik>> = Arc::new(requested.keys().copied().collect());
    let shared_filter = Arc::new(filter.clone());

    let periods = filter.required_reports();
    let parallelism = thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1);
    debug!(
        "Scanning {} archives with parallelism {}",
        periods.len(),
        parallelism
    );

    let mut scans = stream::iter(periods.into_iter().map(|period| {
        let ciks = Arc::clone(&ciks);
        let filter = Arc::clone(&shared_filter);
        async move { (period, scan_one(source, period, ciks, filter).await) }
    }))
    .buffer_unordered(parallelism);

    let mut rows = Vec::new();
    while let Some((period, outcome)) = scans.next().await {
        match outcome {
            Ok(Some(facts)) => {
                debug!("{}: {} matching facts", period, facts.len());
                for fact in facts {
                    if let Some(ticker) = requested.get(&fact.cik) {
                        rows.push(attach(ticker.clone(), fact));
                    }
                }
            }
            Ok(None) => debug!("{}: no matching facts", period),
            Err(DataError::Unavailable(reason)) => {
                warn!("{}: archive unavailable, skipping ({})", period, reason);
            }
            Err(e) => return Err(e),
        }
    }

    if rows.is_empty() {
        return Err(DataError::NoData);
    }
    rows.sort_by(|a, b| {
        (a.ticker.as_str(), a.fiscal_year, a.tag.as_str(), a.data_date).cmp(&(
            b.ticker.as_str(),
            b.fiscal_year,
            b.tag.as_str(),
            b.data_date,
        ))
    });
    Ok(rows)
}

async fn scan_one<S>(
    source: &S,
    period: ReportPeriod,
    ciks: Arc<BTreeSet<Cik>>,
    filter: Arc<FilterSpec>,
) -> Result<Option<Vec<ScannedFact>>>
where
    S: ArchiveSource + ?Sized,
{
    tokio::time::timeout(SCAN_TIMEOUT, async {
        let data = source.fetch_archive(period).await?;
        tokio::task::spawn_blocking(move || archive::scan_archive(&data, &ciks, &filter))
            .await
            .map_err(|_| DataError::Malformed(format!("Scan worker for {} panicked", period)))?
    })
    .await
    .map_err(|_| {
        DataError::Timeout(format!(
            "{} not fetched and scanned within {:?}",
            period, SCAN_TIMEOUT
        ))
    })?
}

fn attach(ticker: Ticker, fact: ScannedFact) -> FilteredRow {
    FilteredRow {
        ticker,
        company: fact.company,
        cik: fact.cik,
        accession: fact.accession,
        tag: fact.tag,
        fiscal_year: fact.fiscal_year,
        focus_period: fact.focus_period,
        period_end: fact.period_end,
        data_date: fact.data_date,
        unit: fact.unit,
        value: fact.value,
    }
}
