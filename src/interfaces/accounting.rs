//! The accounting collaborator — usage aggregation across the hierarchy.
//!
//! A delegation never writes into its caller's accounting state directly;
//! all cross-context usage flows through [`UsageSink::record_usage`] with an
//! explicit source identifier. `UsageLedger` is the provided implementation
//! for runtimes and tests that want per-source breakdowns.

use std::collections::HashMap;
use std::fmt;

use parking_lot::Mutex;

use crate::types::usage_metrics::UsageMetrics;

/// Public aggregation entry point for usage records.
pub trait UsageSink: Send + Sync + fmt::Debug {
    /// Fold `usage` into the sink under `source` (e.g. a blueprint name).
    fn record_usage(&self, source: &str, usage: &UsageMetrics);
}

#[derive(Debug, Default)]
struct LedgerInner {
    total: UsageMetrics,
    by_source: HashMap<String, UsageMetrics>,
}

/// A thread-safe usage ledger with per-source tallies.
#[derive(Debug, Default)]
pub struct UsageLedger {
    inner: Mutex<LedgerInner>,
}

impl UsageLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Usage summed across every source.
    pub fn total(&self) -> UsageMetrics {
        self.inner.lock().total.clone()
    }

    /// Usage recorded under one source, if any.
    pub fn for_source(&self, source: &str) -> Option<UsageMetrics> {
        self.inner.lock().by_source.get(source).cloned()
    }

    /// All source identifiers seen so far.
    pub fn sources(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.lock().by_source.keys().cloned().collect();
        names.sort();
        names
    }
}

impl UsageSink for UsageLedger {
    fn record_usage(&self, source: &str, usage: &UsageMetrics) {
        let mut inner = self.inner.lock();
        inner.total.add_usage_metrics(usage);
        inner
            .by_source
            .entry(source.to_string())
            .or_default()
            .add_usage_metrics(usage);
    }
}
