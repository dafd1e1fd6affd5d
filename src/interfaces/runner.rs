//! The `Runner` collaborator — the external language-model execution loop.
//!
//! This subsystem never drives a model itself. A spawned child context hands
//! the runner a fully assembled request (prompt, system prompt, tool set,
//! turn budget) and receives back text plus usage. Anything the runner does
//! internally — tool calling, streaming, retries — is out of scope here.

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::interfaces::tools::ToolHandle;
use crate::types::usage_metrics::UsageMetrics;
use crate::utilities::errors::RunnerError;

/// A single message in a model conversation.
pub type LLMMessage = HashMap<String, Value>;

/// Everything a runner needs for one execution.
#[derive(Debug, Clone, Default)]
pub struct RunRequest {
    /// The task text to execute.
    pub prompt: String,
    /// Optional system prompt assembled by the spawner.
    pub system_prompt: Option<String>,
    /// Prior conversation, if the caller carries one.
    pub history: Vec<LLMMessage>,
    /// Model identifier resolved for this context.
    pub model: String,
    /// The tools available to the run.
    pub tools: Vec<ToolHandle>,
    /// Hard ceiling on the run's iteration count.
    pub turn_budget: u32,
}

/// The outcome of a runner execution.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunnerResult {
    /// Final answer text.
    pub text: String,
    /// Opaque provider payload, passed through untouched.
    #[serde(default)]
    pub raw: Value,
    /// Token usage for this run.
    #[serde(default)]
    pub usage: UsageMetrics,
}

/// External language-model execution loop.
///
/// Implementations must enforce `turn_budget` as a hard ceiling and report
/// exhaustion via [`RunnerError::TurnBudgetExhausted`].
#[async_trait]
pub trait Runner: Send + Sync + fmt::Debug {
    /// Execute a request to completion.
    async fn run(&self, request: RunRequest) -> Result<RunnerResult, RunnerError>;
}
