//! Analysis registry.
//!
//! Analyses register a constructor under a name, so a run can be requested
//! by name alone and every invocation gets a fresh instance.

use async_trait::async_trait;
use facts_core::{DataError, Result, ResultTable};
use facts_edgar::EdgarService;
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

use crate::interface::Options;
use crate::report::ReportAnalysis;

/// One runnable analysis over filed facts.
#[async_trait]
pub trait Analysis: Send + Sync {
    /// The name the analysis is registered under.
    fn name(&self) -> &'static str;

    /// A one-line description of what the analysis produces.
    fn description(&self) -> &'static str;

    /// Runs the analysis for the companies and span in `options`.
    ///
    /// # Errors
    /// Returns whatever the underlying selection returns, notably
    /// [`DataError::NoData`] when nothing matched.
    async fn analyze(&self, service: &EdgarService, options: &Options) -> Result<ResultTable>;
}

/// Constructor for one analysis.
pub type AnalysisCtor = fn() -> Box<dyn Analysis>;

/// Registry of analyses by name.
pub struct AnalysisRegistry {
    analyses: BTreeMap<String, AnalysisCtor>,
}

impl AnalysisRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            analyses: BTreeMap::new(),
        }
    }

    /// Creates a registry with every built-in analysis registered.
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("report", || Box::new(ReportAnalysis));
        registry
    }

    /// Registers `ctor` under `name`, replacing any previous registration.
    pub fn register(&mut self, name: impl Into<String>, ctor: AnalysisCtor) {
        let name = name.into();
        debug!("Registered analysis {}", name);
        self.analyses.insert(name, ctor);
    }

    /// Instantiates the analysis registered under `name`.
    ///
    /// # Errors
    /// Returns [`DataError::InvalidParameter`] when no analysis is
    /// registered under `name`.
    pub fn create(&self, name: &str) -> Result<Box<dyn Analysis>> {
        self.analyses
            .get(name)
            .map(|ctor| ctor())
            .ok_or_else(|| DataError::InvalidParameter(format!("Unknown analysis: {}", name)))
    }

    /// The registered names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.analyses.keys().map(String::as_str).collect()
    }

    /// The number of registered analyses.
    #[must_use]
    pub fn len(&self) -> usize {
        self.analyses.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.analyses.is_empty()
    }
}

impl Default for AnalysisRegistry {
    /// Equivalent to [`AnalysisRegistry::with_builtins`].
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl fmt::Debug for AnalysisRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalysisRegistry")
            .field("analyses", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtins_include_report() {
        let registry = AnalysisRegistry::with_builtins();
        let analysis = registry.create("report").unwrap();
        assert_eq!(analysis.name(), "report");
        assert!(!analysis.description().is_empty());
    }

    #[test]
    fn test_default_is_builtins() {
        assert_eq!(
            AnalysisRegistry::default().names(),
            AnalysisRegistry::with_builtins().names()
        );
    }

    #[test]
    fn test_unknown_name_is_invalid_parameter() {
        let registry = AnalysisRegistry::with_builtins();
        let result = registry.create("definitely-not-registered");
        assert!(matches!(
            result,
            Err(DataError::InvalidParameter(m)) if m.contains("definitely-not-registered")
        ));
    }

    #[test]
    fn test_names_are_sorted() {
        let mut registry = AnalysisRegistry::with_builtins();
        registry.register("zeta", || Box::new(ReportAnalysis));
        registry.register("alpha", || Box::new(ReportAnalysis));
        assert_eq!(registry.names(), vec!["alpha", "report", "zeta"]);
    }

    #[test]
    fn test_register_replaces() {
        let mut registry = AnalysisRegistry::new();
        registry.register("report", || Box::new(ReportAnalysis));
        registry.register("report", || Box::new(ReportAnalysis));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_empty_registry() {
        let registry = AnalysisRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.create("report").is_err());
    }
}
