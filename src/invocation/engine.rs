//! The invocation engine — capability activate/deactivate lifecycle.
//!
//! Activation gates on the invocation source, materializes the body (Tier
//! 2), substitutes arguments, and either returns the content (standard
//! mode) or hands off to the delegation engine (fork mode). Fork handoff is
//! mediated here: trust restrictions are checked first, then the cycle
//! detector, then delegation — the registry and blueprint store never call
//! each other directly.
//!
//! Activation and deactivation of a single capability are serialized
//! per-name; operations on different capabilities proceed in parallel.

use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::capabilities::descriptor::{CapabilityDescriptor, ExecutionMode};
use crate::capabilities::registry::CapabilityRegistry;
use crate::capabilities::trust::check_restrictions;
use crate::delegation::cycle::{detect_cycle, render_path};
use crate::delegation::engine::DelegationEngine;
use crate::delegation::spawner::AgentContext;
use crate::delegation::store::BlueprintStore;
use crate::interfaces::tools::{ToolHandle, ToolRegistry};
use crate::invocation::arguments::substitute;
use crate::utilities::errors::{CapabilityError, InvocationError};

/// The origin of an activation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvocationSource {
    /// Programmatic activation; always permitted.
    Code,
    /// The model decided to activate; gated by `disable-model-invocation`.
    Model,
    /// A user asked for the capability; gated by `user-invocable`.
    User,
}

impl fmt::Display for InvocationSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvocationSource::Code => write!(f, "code"),
            InvocationSource::Model => write!(f, "model"),
            InvocationSource::User => write!(f, "user"),
        }
    }
}

/// Drives the capability activation lifecycle.
///
/// All collaborators are supplied explicitly at construction; nothing is
/// built lazily behind an accessor. The tool registry is optional — use
/// [`has_tool_registry`](Self::has_tool_registry) to branch without side
/// effects.
pub struct InvocationEngine {
    registry: Arc<CapabilityRegistry>,
    blueprints: Arc<BlueprintStore>,
    delegation: Arc<DelegationEngine>,
    tools: Option<Arc<dyn ToolRegistry>>,
    activation_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl fmt::Debug for InvocationEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InvocationEngine")
            .field("has_tool_registry", &self.tools.is_some())
            .finish_non_exhaustive()
    }
}

impl InvocationEngine {
    /// Create an engine over the shared registry, store, and delegation
    /// engine.
    pub fn new(
        registry: Arc<CapabilityRegistry>,
        blueprints: Arc<BlueprintStore>,
        delegation: Arc<DelegationEngine>,
    ) -> Self {
        Self {
            registry,
            blueprints,
            delegation,
            tools: None,
            activation_locks: DashMap::new(),
        }
    }

    /// Attach the external tool registry used to resolve a capability's
    /// `allowed-tools` at activation.
    pub fn with_tool_registry(mut self, tools: Arc<dyn ToolRegistry>) -> Self {
        self.tools = Some(tools);
        self
    }

    /// Whether a tool registry is attached.
    pub fn has_tool_registry(&self) -> bool {
        self.tools.is_some()
    }

    /// Activate a capability and return its content.
    ///
    /// Standard mode returns the substituted body and marks the capability
    /// active. Fork mode validates trust, then cycles, then delegates the
    /// substituted body as the child's task and returns the delegation
    /// output.
    pub async fn activate(
        &self,
        name: &str,
        arguments: &str,
        source: InvocationSource,
        context: &AgentContext,
    ) -> Result<String, InvocationError> {
        let lock = self.activation_lock(name);
        let _guard = lock.lock().await;

        let descriptor =
            self.registry
                .descriptor(name)
                .await
                .ok_or_else(|| CapabilityError::NotFound {
                    name: name.to_string(),
                })?;

        permission_gate(&descriptor, source)?;

        let capability = self.registry.get(name).await?;
        let body = capability
            .body()
            .map(|b| b.as_ref().to_string())
            .unwrap_or_default();
        let content = substitute(&body, arguments);

        match descriptor.execution_mode {
            ExecutionMode::Fork => {
                self.activate_fork(&descriptor, content, context).await
            }
            ExecutionMode::Standard => {
                let handles = self.resolve_allowed_tools(&descriptor);
                self.registry.mark_active(name, handles).await?;
                log::debug!("activated capability '{name}' ({source} source)");
                Ok(content)
            }
        }
    }

    /// Fork-mode handoff: trust, then cycle detection, then delegation.
    async fn activate_fork(
        &self,
        descriptor: &CapabilityDescriptor,
        task: String,
        context: &AgentContext,
    ) -> Result<String, InvocationError> {
        let violations = check_restrictions(descriptor);
        if !violations.is_empty() {
            return Err(InvocationError::TrustViolation {
                name: descriptor.name.clone(),
                violations,
            });
        }

        if let Some(cycle) =
            detect_cycle(&descriptor.name, &self.registry, &self.blueprints).await
        {
            return Err(InvocationError::CycleDetected {
                path: render_path(&cycle),
            });
        }

        // Validated at parse time; guarded again for programmatic entries.
        let blueprint_name =
            descriptor
                .delegate_blueprint
                .as_deref()
                .ok_or_else(|| CapabilityError::Validation {
                    location: descriptor.source_location.clone(),
                    message: format!(
                        "fork-mode capability '{}' names no delegate blueprint",
                        descriptor.name
                    ),
                    fields: vec!["delegate-blueprint".to_string()],
                })?;

        let result = self
            .delegation
            .execute(blueprint_name, &task, context)
            .await?;

        if result.success {
            Ok(result.output)
        } else {
            // Child faults are isolation-captured; surface the annotation
            // as content rather than disrupting the caller's control flow.
            let error = result.error.unwrap_or_else(|| "unknown failure".to_string());
            log::warn!(
                "fork activation of '{}' completed with child failure: {error}",
                descriptor.name
            );
            Ok(format!(
                "[delegation to blueprint '{}' failed: {error}]",
                result.blueprint_name
            ))
        }
    }

    /// Deactivate a capability, clearing its registered tool handles.
    /// Idempotent on an already-inactive or unknown capability.
    pub async fn deactivate(&self, name: &str) {
        let lock = self.activation_lock(name);
        let _guard = lock.lock().await;
        if self.registry.mark_inactive(name).await {
            log::debug!("deactivated capability '{name}'");
        }
    }

    fn activation_lock(&self, name: &str) -> Arc<Mutex<()>> {
        self.activation_locks
            .entry(name.to_string())
            .or_default()
            .clone()
    }

    /// Resolve `allowed-tools` against the external tool registry. Unknown
    /// names are logged and skipped; activation itself is not blocked.
    fn resolve_allowed_tools(&self, descriptor: &CapabilityDescriptor) -> Vec<ToolHandle> {
        let Some(tools) = &self.tools else {
            if !descriptor.allowed_tools.is_empty() {
                log::debug!(
                    "capability '{}' lists allowed-tools but no tool registry is attached",
                    descriptor.name
                );
            }
            return Vec::new();
        };

        let mut handles = Vec::new();
        for name in &descriptor.allowed_tools {
            match tools.lookup(name) {
                Some(handle) => handles.push(handle),
                None => log::warn!(
                    "capability '{}' allows unknown tool '{name}'",
                    descriptor.name
                ),
            }
        }
        handles
    }
}

/// Reject activations the descriptor's permission flags forbid.
fn permission_gate(
    descriptor: &CapabilityDescriptor,
    source: InvocationSource,
) -> Result<(), InvocationError> {
    match source {
        InvocationSource::Code => Ok(()),
        InvocationSource::Model if descriptor.disable_model_invocation => {
            Err(InvocationError::PermissionDenied {
                name: descriptor.name.clone(),
                invocation_source: source,
                reason: "model invocation is disabled for this capability".to_string(),
            })
        }
        InvocationSource::User if !descriptor.user_invocable => {
            Err(InvocationError::PermissionDenied {
                name: descriptor.name.clone(),
                invocation_source: source,
                reason: "capability is not user invocable".to_string(),
            })
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::capability::Capability;
    use crate::capabilities::descriptor::{CapabilityScope, TrustLevel};
    use crate::delegation::blueprint::DelegationBlueprint;
    use crate::interfaces::accounting::UsageLedger;
    use crate::interfaces::scripted::ScriptedRunner;
    use crate::interfaces::tools::StaticToolRegistry;
    use std::collections::HashMap;
    use std::path::PathBuf;

    struct Fixture {
        registry: Arc<CapabilityRegistry>,
        blueprints: Arc<BlueprintStore>,
        engine: InvocationEngine,
        runner: Arc<ScriptedRunner>,
        ledger: Arc<UsageLedger>,
    }

    impl Fixture {
        fn new() -> Self {
            Self::with_runner(ScriptedRunner::new())
        }

        fn with_runner(runner: ScriptedRunner) -> Self {
            let registry = Arc::new(CapabilityRegistry::new());
            let blueprints = Arc::new(BlueprintStore::new());
            let delegation = Arc::new(DelegationEngine::new(
                registry.clone(),
                blueprints.clone(),
            ));
            let engine =
                InvocationEngine::new(registry.clone(), blueprints.clone(), delegation);
            Self {
                registry,
                blueprints,
                engine,
                runner: Arc::new(runner),
                ledger: Arc::new(UsageLedger::new()),
            }
        }

        fn context(&self) -> AgentContext {
            AgentContext::new(
                "main",
                "large-default",
                self.runner.clone(),
                self.ledger.clone(),
            )
            .with_tools(vec![ToolHandle::new("search", "searches", Ok)])
        }

        async fn register(&self, descriptor: CapabilityDescriptor, body: &str) {
            self.registry
                .register(Capability::with_body(descriptor, body))
                .await;
        }
    }

    fn descriptor(name: &str) -> CapabilityDescriptor {
        CapabilityDescriptor {
            name: name.to_string(),
            description: format!("{name} capability"),
            source_location: PathBuf::from("/caps").join(name),
            scope: CapabilityScope::Project,
            trust: TrustLevel::Trusted,
            license: None,
            compatibility: None,
            metadata: HashMap::new(),
            allowed_tools: Vec::new(),
            model_override: None,
            execution_mode: ExecutionMode::Standard,
            delegate_blueprint: None,
            disable_model_invocation: false,
            user_invocable: true,
            argument_hint: None,
            lifecycle_hooks: Vec::new(),
        }
    }

    fn fork_descriptor(name: &str, blueprint: &str, trust: TrustLevel) -> CapabilityDescriptor {
        let mut d = descriptor(name);
        d.execution_mode = ExecutionMode::Fork;
        d.delegate_blueprint = Some(blueprint.to_string());
        d.trust = trust;
        if trust == TrustLevel::Untrusted {
            d.scope = CapabilityScope::Custom;
        }
        d
    }

    #[tokio::test]
    async fn test_activate_unknown_capability() {
        let fixture = Fixture::new();
        let err = fixture
            .engine
            .activate("ghost", "", InvocationSource::Code, &fixture.context())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            InvocationError::Capability(CapabilityError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_standard_activation_substitutes_and_marks_active() {
        let fixture = Fixture::new();
        fixture
            .register(descriptor("greet"), "Hello $ARGUMENTS[0], from $ARGUMENTS[1]!")
            .await;

        let output = fixture
            .engine
            .activate("greet", "alice bob", InvocationSource::Code, &fixture.context())
            .await
            .unwrap();

        assert_eq!(output, "Hello alice, from bob!");
        assert!(fixture.registry.is_active("greet").await);

        fixture.engine.deactivate("greet").await;
        assert!(!fixture.registry.is_active("greet").await);
        // Idempotent.
        fixture.engine.deactivate("greet").await;
    }

    #[tokio::test]
    async fn test_permission_gate_model_source() {
        let fixture = Fixture::new();
        let mut d = descriptor("no-model");
        d.disable_model_invocation = true;
        fixture.register(d, "body").await;

        let err = fixture
            .engine
            .activate("no-model", "", InvocationSource::Model, &fixture.context())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            InvocationError::PermissionDenied {
                invocation_source: InvocationSource::Model,
                ..
            }
        ));

        // Code source always succeeds on the same capability.
        fixture
            .engine
            .activate("no-model", "", InvocationSource::Code, &fixture.context())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_permission_gate_user_source() {
        let fixture = Fixture::new();
        let mut d = descriptor("internal");
        d.user_invocable = false;
        fixture.register(d, "body").await;

        let err = fixture
            .engine
            .activate("internal", "", InvocationSource::User, &fixture.context())
            .await
            .unwrap_err();
        assert!(matches!(err, InvocationError::PermissionDenied { .. }));

        fixture
            .engine
            .activate("internal", "", InvocationSource::Model, &fixture.context())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_allowed_tools_registered_while_active() {
        let fixture = Fixture::new();
        let mut tools = StaticToolRegistry::new();
        tools.insert(ToolHandle::new("search", "searches", Ok));
        let engine = InvocationEngine::new(
            fixture.registry.clone(),
            fixture.blueprints.clone(),
            Arc::new(DelegationEngine::new(
                fixture.registry.clone(),
                fixture.blueprints.clone(),
            )),
        )
        .with_tool_registry(Arc::new(tools));
        assert!(engine.has_tool_registry());

        let mut d = descriptor("tooled");
        d.allowed_tools = vec!["search".to_string(), "unknown".to_string()];
        fixture.register(d, "body").await;

        engine
            .activate("tooled", "", InvocationSource::Code, &fixture.context())
            .await
            .unwrap();

        let capability = fixture.registry.get("tooled").await.unwrap();
        assert_eq!(capability.tool_handles().len(), 1);
        assert_eq!(capability.tool_handles()[0].name, "search");

        engine.deactivate("tooled").await;
        let capability = fixture.registry.get("tooled").await.unwrap();
        assert!(capability.tool_handles().is_empty());
    }

    #[tokio::test]
    async fn test_untrusted_fork_fails_before_any_delegation() {
        let fixture = Fixture::new();
        fixture
            .register(
                fork_descriptor("sneaky", "researcher", TrustLevel::Untrusted),
                "task body",
            )
            .await;
        fixture
            .blueprints
            .register(DelegationBlueprint::new("researcher", ""))
            .await;

        let err = fixture
            .engine
            .activate("sneaky", "", InvocationSource::Code, &fixture.context())
            .await
            .unwrap_err();

        match err {
            InvocationError::TrustViolation { name, violations } => {
                assert_eq!(name, "sneaky");
                assert!(!violations.is_empty());
            }
            other => panic!("expected trust violation, got {other:?}"),
        }
        // No child context was spawned, so the runner saw nothing.
        assert_eq!(fixture.runner.call_count(), 0);
    }

    #[tokio::test]
    async fn test_cycle_detected_before_execution() {
        let fixture = Fixture::new();
        fixture
            .register(
                fork_descriptor("loopy", "echo-chamber", TrustLevel::Trusted),
                "task",
            )
            .await;
        fixture
            .blueprints
            .register(DelegationBlueprint::new("echo-chamber", "").preload("loopy"))
            .await;

        let err = fixture
            .engine
            .activate("loopy", "", InvocationSource::Code, &fixture.context())
            .await
            .unwrap_err();

        match err {
            InvocationError::CycleDetected { path } => {
                assert_eq!(
                    path,
                    "capability:loopy -> blueprint:echo-chamber -> capability:loopy"
                );
            }
            other => panic!("expected cycle, got {other:?}"),
        }
        assert_eq!(fixture.runner.call_count(), 0);
    }

    #[tokio::test]
    async fn test_end_to_end_fork_activation() -> anyhow::Result<()> {
        let _ = env_logger::builder().is_test(true).try_init();
        let fixture = Fixture::new();
        fixture
            .blueprints
            .register(
                DelegationBlueprint::new("researcher", "researches")
                    .allow_tools(["search"])
                    .with_turn_budget(5),
            )
            .await;
        fixture
            .register(
                fork_descriptor("deep-dive", "researcher", TrustLevel::Trusted),
                "Research the topic: $ARGUMENTS",
            )
            .await;

        let output = fixture
            .engine
            .activate(
                "deep-dive",
                "quantum computing",
                InvocationSource::Code,
                &fixture.context(),
            )
            .await?;

        // The echo runner reflects the substituted task text back.
        assert!(output.contains("Research the topic: quantum computing"));

        // The delegation ran against the researcher blueprint with the
        // allow-listed tool and the configured budget.
        let calls = fixture.runner.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].turn_budget, 5);
        assert_eq!(calls[0].tools.len(), 1);
        assert_eq!(calls[0].tools[0].name, "search");

        // Usage aggregated under the blueprint name.
        assert!(fixture.ledger.for_source("researcher").is_some());
        Ok(())
    }

    #[tokio::test]
    async fn test_fork_child_failure_does_not_raise() {
        let runner = ScriptedRunner::new();
        runner.enqueue_error(crate::utilities::errors::RunnerError::Model(
            "overloaded".to_string(),
        ));
        let fixture = Fixture::with_runner(runner);
        fixture
            .blueprints
            .register(DelegationBlueprint::new("researcher", ""))
            .await;
        fixture
            .register(
                fork_descriptor("deep-dive", "researcher", TrustLevel::Trusted),
                "task: $ARGUMENTS",
            )
            .await;

        let output = fixture
            .engine
            .activate("deep-dive", "x", InvocationSource::Code, &fixture.context())
            .await
            .unwrap();
        assert!(output.contains("overloaded"));
    }

    #[tokio::test]
    async fn test_fork_unknown_blueprint_raises() {
        let fixture = Fixture::new();
        fixture
            .register(
                fork_descriptor("orphan", "nowhere", TrustLevel::Trusted),
                "task",
            )
            .await;

        let err = fixture
            .engine
            .activate("orphan", "", InvocationSource::Code, &fixture.context())
            .await
            .unwrap_err();
        assert!(matches!(err, InvocationError::Delegation(_)));
    }

    #[tokio::test]
    async fn test_concurrent_activation_of_distinct_capabilities() {
        let fixture = Fixture::new();
        fixture.register(descriptor("one"), "first: $ARGUMENTS").await;
        fixture.register(descriptor("two"), "second: $ARGUMENTS").await;

        let context = fixture.context();
        let (a, b) = tokio::join!(
            fixture
                .engine
                .activate("one", "a", InvocationSource::Code, &context),
            fixture
                .engine
                .activate("two", "b", InvocationSource::Code, &context),
        );
        assert_eq!(a.unwrap(), "first: a");
        assert_eq!(b.unwrap(), "second: b");
    }
}
