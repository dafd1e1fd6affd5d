//! A deterministic runner for tests and embedding smoke checks.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;

use crate::interfaces::runner::{RunRequest, Runner, RunnerResult};
use crate::types::usage_metrics::UsageMetrics;
use crate::utilities::errors::RunnerError;

/// A `Runner` that replays scripted responses.
///
/// Responses are consumed in FIFO order; once the script is exhausted the
/// runner echoes the request prompt back, so simple flows need no setup.
/// Every received request is recorded for later inspection.
#[derive(Debug)]
pub struct ScriptedRunner {
    responses: Mutex<VecDeque<Result<RunnerResult, RunnerError>>>,
    calls: Mutex<Vec<RunRequest>>,
    delay: Option<Duration>,
    usage_per_call: UsageMetrics,
}

impl Default for ScriptedRunner {
    fn default() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
            delay: None,
            usage_per_call: UsageMetrics {
                total_tokens: 64,
                prompt_tokens: 48,
                cached_prompt_tokens: 0,
                completion_tokens: 16,
                successful_requests: 1,
            },
        }
    }
}

impl ScriptedRunner {
    /// Create a runner that echoes prompts.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep this long before answering each request.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Attach this usage record to every echoed response.
    pub fn with_usage(mut self, usage: UsageMetrics) -> Self {
        self.usage_per_call = usage;
        self
    }

    /// Queue a successful text response.
    pub fn enqueue_text(&self, text: impl Into<String>) {
        let text = text.into();
        self.responses.lock().push_back(Ok(RunnerResult {
            raw: json!({ "scripted": true }),
            usage: self.usage_per_call.clone(),
            text,
        }));
    }

    /// Queue a failure.
    pub fn enqueue_error(&self, error: RunnerError) {
        self.responses.lock().push_back(Err(error));
    }

    /// Requests received so far.
    pub fn calls(&self) -> Vec<RunRequest> {
        self.calls.lock().clone()
    }

    /// Number of requests received so far.
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl Runner for ScriptedRunner {
    async fn run(&self, request: RunRequest) -> Result<RunnerResult, RunnerError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let scripted = self.responses.lock().pop_front();
        let prompt = request.prompt.clone();
        self.calls.lock().push(request);
        match scripted {
            Some(response) => response,
            None => Ok(RunnerResult {
                text: format!("echo: {prompt}"),
                raw: json!({ "prompt": prompt }),
                usage: self.usage_per_call.clone(),
            }),
        }
    }
}
