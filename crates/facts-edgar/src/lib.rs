#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factsrs/facts/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! # Overview
//!
//! This crate turns published quarterly archives into filtered fact rows:
//!
//! - [`HttpTransport`] fetches documents politely (rate limit, retries)
//! - [`TickerMap`] resolves ticker symbols to company identifiers
//! - [`scan_archive`] extracts matching facts from one archive
//! - [`EdgarService`] caches documents and results and runs selections

/// Archive scanning.
pub mod archive;
/// HTTP transport with rate limiting and retries.
pub mod client;
/// Concurrent collection across archives.
pub mod collector;
/// The caching data service.
pub mod service;
/// Ticker directory parsing and resolution.
pub mod tickers;

#[cfg(test)]
pub(crate) mod fixtures;

// Re-export commonly used items at crate root
pub use archive::{scan_archive, ScannedFact};
pub use client::{HttpTransport, Transport};
pub use collector::{collect, ArchiveSource};
pub use service::EdgarService;
pub use tickers::{TickerMap, TickerRecord};
