#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factsrs/facts/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Core traits and types for working with regulator filing facts:
//!
//! - [`FilterSpec`](filter::FilterSpec) - Immutable description of which facts to keep
//! - [`ReportPeriod`](period::ReportPeriod) - A fiscal year and quarter pair
//! - [`FilteredRow`](types::FilteredRow) - One surviving numeric fact
//! - [`ResultTable`](table::ResultTable) - Pivoted facts with derived columns
//! - [`AggregateFn`](table::AggregateFn) - Cell aggregation strategies
//! - [`DataCache`](cache::DataCache) - Caching abstraction

/// Cache trait and types for storing fetched data.
pub mod cache;
/// Error types for data operations.
pub mod error;
/// Filter model describing which facts survive a scan.
pub mod filter;
/// Fiscal report periods and quarter arithmetic.
pub mod period;
/// Pivoted result tables and aggregation.
pub mod table;
/// Core data types (Ticker, Cik, FilteredRow, etc.).
pub mod types;

// Re-export commonly used items at crate root
pub use cache::{CacheEntry, CacheStats, DataCache};
pub use error::{DataError, Result};
pub use filter::FilterSpec;
pub use period::ReportPeriod;
pub use table::{AggregateFn, ResultTable};
pub use types::{Cik, FilteredRow, FocusPeriod, Ticker};
