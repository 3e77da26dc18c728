#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factsrs/facts/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Filed-fact selection and analysis over public quarterly archives.
//!
//! This crate ties the lower layers together: it re-exports the core types,
//! the cache backends, and the archive data service, and provides an
//! [`AnalysisRegistry`] for running named analyses over the selected facts.
//!
//! # Features
//!
//! - `cache-sqlite` - SQLite-backed persistent caching (default)
//!
//! # Example
//!
//! ```rust,ignore
//! use facts::{build_service, AnalysisRegistry, Options};
//!
//! #[tokio::main]
//! async fn main() -> facts::Result<()> {
//!     let options = Options::new("MyApp/1.0 (contact@example.com)")
//!         .with_tickers(["AAPL", "MSFT"])
//!         .with_years(2)
//!         .with_cache_dir("/tmp/facts-cache");
//!
//!     let service = build_service(&options)?;
//!     let registry = AnalysisRegistry::with_builtins();
//!     let analysis = registry.create("report")?;
//!
//!     let table = analysis.analyze(&service, &options).await?;
//!     println!("{table}");
//!
//!     Ok(())
//! }
//! ```

// Core types and traits
pub use facts_core::*;

// Cache implementations
#[cfg(feature = "cache-sqlite")]
pub use facts_cache::SqliteCache;
pub use facts_cache::{MemoryCache, NoopCache};

// Archive data service
pub use facts_edgar::{EdgarService, HttpTransport, Transport};

mod interface;
pub use interface::{build_service, Options};

mod registry;
pub use registry::{Analysis, AnalysisCtor, AnalysisRegistry};

mod report;
pub use report::ReportAnalysis;
