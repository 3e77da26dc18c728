//! Error types for filing-data operations.
//!
//! This module defines [`DataError`] which covers all error cases that can occur
//! when fetching, parsing, filtering, or caching filing data.

use thiserror::Error;

/// Errors that can occur during filing-data operations.
#[derive(Error, Debug)]
pub enum DataError {
    /// Network-related errors (connection failures, HTTP status errors, etc.).
    #[error("Network error: {0}")]
    Network(String),

    /// A ticker symbol could not be resolved to a company identifier.
    ///
    /// Always fatal to the calling operation; never retried and never
    /// masked by a cached value.
    #[error("Ticker not found: {0}")]
    TickerNotFound(String),

    /// A document could not be fetched and no cached copy (even stale) exists.
    #[error("Document not available: {0}")]
    Unavailable(String),

    /// No rows matched the filter across every required archive.
    ///
    /// An empty analysis table is never a valid outcome, so a fully empty
    /// merge is terminal.
    #[error("No data matching the filter was retrieved")]
    NoData,

    /// An archive or one of its tables is structurally unreadable.
    ///
    /// Distinct from the expected per-archive "no rows matched" outcome,
    /// which is not an error.
    #[error("Malformed archive: {0}")]
    Malformed(String),

    /// Error parsing a document or cached payload.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Error interacting with the cache.
    #[error("Cache error: {0}")]
    Cache(String),

    /// A unit of work did not complete within its deadline.
    #[error("Timed out: {0}")]
    Timeout(String),

    /// A requested column is not present in the table.
    #[error("Unknown column: {0}")]
    UnknownColumn(String),

    /// An invalid parameter was provided.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Result type alias using [`DataError`].
pub type Result<T> = std::result::Result<T, DataError>;
