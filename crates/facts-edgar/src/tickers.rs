//! Ticker symbol to company-identifier resolution.

use facts_core::{Cik, DataError, Result, Ticker};
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::debug;

/// One entry of the regulator's ticker directory.
#[derive(Debug, Clone, Deserialize)]
pub struct TickerRecord {
    /// Company identifier (the directory stores it as a bare integer).
    pub cik_str: u64,
    /// Ticker symbol.
    pub ticker: String,
    /// Company name.
    pub title: String,
}

/// Bidirectional ticker/CIK lookup built from the regulator's directory
/// document.
///
/// Lookups are case-insensitive because [`Ticker`] uppercases on
/// construction. Several tickers can share one CIK (multiple share
/// classes); the directory's first entry wins for the reverse direction.
#[derive(Debug, Clone, Default)]
pub struct TickerMap {
    by_ticker: HashMap<Ticker, (Cik, String)>,
    by_cik: HashMap<Cik, Ticker>,
}

impl TickerMap {
    /// Parses the directory JSON document.
    ///
    /// The document maps row numbers to records:
    /// `{"0": {"cik_str": 320193, "ticker": "AAPL", "title": "Apple Inc."}, ...}`
    ///
    /// # Errors
    /// Returns [`DataError::Parse`] if the document cannot be decoded.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let records: BTreeMap<String, TickerRecord> = serde_json::from_slice(data)
            .map_err(|e| DataError::Parse(format!("Failed to parse ticker directory: {}", e)))?;
        Ok(Self::from_records(records.into_values()))
    }

    /// Builds the map from individual directory records.
    pub fn from_records(records: impl IntoIterator<Item = TickerRecord>) -> Self {
        let mut by_ticker = HashMap::new();
        let mut by_cik: HashMap<Cik, Ticker> = HashMap::new();

        for record in records {
            let ticker = Ticker::new(&record.ticker);
            let cik = Cik::new(record.cik_str);
            by_cik.entry(cik).or_insert_with(|| ticker.clone());
            by_ticker.insert(ticker, (cik, record.title));
        }

        debug!("Loaded {} ticker mappings", by_ticker.len());
        Self { by_ticker, by_cik }
    }

    /// Resolves a ticker to its company identifier.
    ///
    /// # Errors
    /// Returns [`DataError::TickerNotFound`] naming the symbol when the
    /// directory has no entry for it.
    pub fn resolve(&self, ticker: &Ticker) -> Result<Cik> {
        self.by_ticker
            .get(ticker)
            .map(|(cik, _)| *cik)
            .ok_or_else(|| DataError::TickerNotFound(ticker.to_string()))
    }

    /// Returns true if the directory lists every ticker in `tickers`.
    ///
    /// A cheap precondition check for callers that want to fail before
    /// any archive work starts; [`resolve`](Self::resolve) reports which
    /// symbol is missing.
    #[must_use]
    pub fn contains(&self, tickers: &BTreeSet<Ticker>) -> bool {
        tickers.iter().all(|t| self.by_ticker.contains_key(t))
    }

    /// The company name registered for `ticker`.
    ///
    /// # Errors
    /// Returns [`DataError::TickerNotFound`] when the directory has no
    /// entry for the symbol.
    pub fn company_for(&self, ticker: &Ticker) -> Result<&str> {
        self.by_ticker
            .get(ticker)
            .map(|(_, title)| title.as_str())
            .ok_or_else(|| DataError::TickerNotFound(ticker.to_string()))
    }

    /// The primary ticker listed for `cik`, if any.
    #[must_use]
    pub fn ticker_for(&self, cik: Cik) -> Option<&Ticker> {
        self.by_cik.get(&cik)
    }

    /// Number of listed tickers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_ticker.len()
    }

    /// Returns true if the directory is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_ticker.is_empty()
    }
}
