//! The outcome record of one delegation call.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::interfaces::runner::RunnerResult;
use crate::types::usage_metrics::UsageMetrics;

/// Result of a single delegated run. Constructed once per delegation and
/// immutable afterward.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DelegationResult {
    /// Unique id of this delegation.
    pub id: Uuid,
    /// Final text produced by the child, empty on failure.
    pub output: String,
    /// Opaque runner payload.
    pub raw: Value,
    /// Usage recorded by the child run.
    pub usage: UsageMetrics,
    /// Wall-clock duration of the run.
    pub duration_seconds: f64,
    /// Blueprint the child was spawned from.
    pub blueprint_name: String,
    /// Whether the child run completed.
    pub success: bool,
    /// The captured execution fault, when `success` is false.
    pub error: Option<String>,
}

impl DelegationResult {
    /// A completed run.
    pub(crate) fn completed(
        blueprint_name: impl Into<String>,
        runner_result: RunnerResult,
        duration_seconds: f64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            output: runner_result.text,
            raw: runner_result.raw,
            usage: runner_result.usage,
            duration_seconds,
            blueprint_name: blueprint_name.into(),
            success: true,
            error: None,
        }
    }

    /// A captured execution fault.
    pub(crate) fn failed(
        blueprint_name: impl Into<String>,
        error: impl Into<String>,
        duration_seconds: f64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            output: String::new(),
            raw: Value::Null,
            usage: UsageMetrics::default(),
            duration_seconds,
            blueprint_name: blueprint_name.into(),
            success: false,
            error: Some(error.into()),
        }
    }
}
