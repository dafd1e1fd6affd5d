//! The delegation engine — executes tasks in spawned child contexts.
//!
//! Three entry points: [`DelegationEngine::execute`] (awaitable, and the
//! path a blocking caller ultimately reaches),
//! [`DelegationEngine::execute_blocking`] (synchronous convenience for the
//! outermost API boundary only), and [`DelegationEngine::dispatch`]
//! (fire-and-forget).
//!
//! Configuration faults — unknown blueprint, nesting violation, tool or
//! preload resolution failure — raise before any execution starts. Every
//! execution fault inside the child run is captured into the returned
//! [`DelegationResult`] instead; delegation never crashes its caller on a
//! child failure.

use std::sync::Arc;

use chrono::Utc;

use super::blueprint::DelegationBlueprint;
use super::handle::DelegationHandle;
use super::result::DelegationResult;
use super::spawner::{AgentContext, ChildContext, ContextSpawner};
use super::store::BlueprintStore;
use crate::capabilities::registry::CapabilityRegistry;
use crate::interfaces::accounting::UsageSink;
use crate::interfaces::template::TemplateResolver;
use crate::utilities::errors::DelegationError;

/// Executes delegations against blueprints from the shared store.
#[derive(Debug)]
pub struct DelegationEngine {
    registry: Arc<CapabilityRegistry>,
    blueprints: Arc<BlueprintStore>,
    spawner: ContextSpawner,
}

impl DelegationEngine {
    /// Create an engine over the shared registry and blueprint store.
    pub fn new(registry: Arc<CapabilityRegistry>, blueprints: Arc<BlueprintStore>) -> Self {
        Self {
            registry,
            blueprints,
            spawner: ContextSpawner::new(),
        }
    }

    /// Attach the template collaborator used for templated system prompts.
    pub fn with_template_resolver(mut self, resolver: Arc<dyn TemplateResolver>) -> Self {
        self.spawner = self.spawner.with_template_resolver(resolver);
        self
    }

    /// The blueprint store this engine resolves against.
    pub fn blueprints(&self) -> &Arc<BlueprintStore> {
        &self.blueprints
    }

    /// Resolve the blueprint and spawn the child context. All
    /// configuration-time faults surface here, before any execution.
    async fn prepare(
        &self,
        blueprint_name: &str,
        parent: &AgentContext,
    ) -> Result<(Arc<DelegationBlueprint>, ChildContext), DelegationError> {
        let blueprint =
            self.blueprints
                .get(blueprint_name)
                .await
                .ok_or_else(|| DelegationError::UnknownBlueprint {
                    name: blueprint_name.to_string(),
                })?;
        let child = self.spawner.spawn(&blueprint, parent, &self.registry).await?;
        Ok((blueprint, child))
    }

    /// Run a task in a child context spawned from `blueprint_name`,
    /// suspending the caller until the child completes.
    ///
    /// Usage is aggregated into the parent's accounting collaborator after
    /// the child run completes and before the result is returned, so a
    /// caller inspecting aggregate usage immediately afterward always sees
    /// this delegation reflected.
    pub async fn execute(
        &self,
        blueprint_name: &str,
        task: &str,
        parent: &AgentContext,
    ) -> Result<DelegationResult, DelegationError> {
        let (blueprint, child) = self.prepare(blueprint_name, parent).await?;
        Ok(run_child(blueprint, child, task.to_string(), parent.usage.clone()).await)
    }

    /// Synchronous convenience wrapper for the outermost API boundary.
    ///
    /// Builds a private current-thread runtime and blocks on
    /// [`execute`](Self::execute). Must not be called from inside an async
    /// context; async callers await `execute` directly.
    pub fn execute_blocking(
        &self,
        blueprint_name: &str,
        task: &str,
        parent: &AgentContext,
    ) -> Result<DelegationResult, DelegationError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| DelegationError::Runtime {
                message: e.to_string(),
            })?;
        runtime.block_on(self.execute(blueprint_name, task, parent))
    }

    /// Dispatch a task as a background unit and return a handle.
    ///
    /// Configuration faults still raise here, before dispatch; execution
    /// faults resolve through the handle. The background unit aggregates
    /// usage into the parent's accounting collaborator before the handle
    /// resolves.
    pub async fn dispatch(
        &self,
        blueprint_name: &str,
        task: &str,
        parent: &AgentContext,
    ) -> Result<DelegationHandle, DelegationError> {
        let (blueprint, child) = self.prepare(blueprint_name, parent).await?;
        let name = blueprint.name.clone();
        let task = task.to_string();
        let usage = parent.usage.clone();
        let join = tokio::spawn(async move { run_child(blueprint, child, task, usage).await });
        log::debug!("dispatched fire-and-forget delegation to blueprint '{name}'");
        Ok(DelegationHandle::new(name, join))
    }
}

/// Drive the child run and fold its outcome into a `DelegationResult`.
async fn run_child(
    blueprint: Arc<DelegationBlueprint>,
    child: ChildContext,
    task: String,
    usage_sink: Arc<dyn UsageSink>,
) -> DelegationResult {
    let started = Utc::now();
    let outcome = child.run(&task).await;
    let duration_seconds = (Utc::now() - started).num_milliseconds() as f64 / 1000.0;

    match outcome {
        Ok(runner_result) => {
            // Aggregation happens-after the run and before the result is
            // handed back.
            usage_sink.record_usage(&blueprint.name, &runner_result.usage);
            DelegationResult::completed(&blueprint.name, runner_result, duration_seconds)
        }
        Err(e) => {
            log::warn!("delegation to blueprint '{}' failed: {e}", blueprint.name);
            DelegationResult::failed(&blueprint.name, e.to_string(), duration_seconds)
        }
    }
}
