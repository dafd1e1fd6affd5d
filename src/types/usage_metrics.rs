//! Token-usage accounting records.
//!
//! A `UsageMetrics` value travels with every runner result and is folded
//! upward through the delegation hierarchy via the accounting collaborator.

use serde::{Deserialize, Serialize};

/// Token usage accumulated by one or more model runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageMetrics {
    /// Total number of tokens used.
    pub total_tokens: i64,
    /// Number of tokens used in prompts.
    pub prompt_tokens: i64,
    /// Number of cached prompt tokens used.
    pub cached_prompt_tokens: i64,
    /// Number of tokens used in completions.
    pub completion_tokens: i64,
    /// Number of successful requests made.
    pub successful_requests: i64,
}

impl UsageMetrics {
    /// Create a new empty `UsageMetrics`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold usage from another record into this one.
    pub fn add_usage_metrics(&mut self, other: &UsageMetrics) {
        self.total_tokens += other.total_tokens;
        self.prompt_tokens += other.prompt_tokens;
        self.cached_prompt_tokens += other.cached_prompt_tokens;
        self.completion_tokens += other.completion_tokens;
        self.successful_requests += other.successful_requests;
    }

    /// Whether no usage has been recorded at all.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
