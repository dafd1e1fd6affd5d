//! # agentry
//!
//! A capability registration and hierarchical task-delegation engine for AI
//! agent runtimes. Agents load reusable, discoverable capability packages
//! (instruction+tool bundles) and delegate subtasks to isolated child
//! contexts spawned from blueprints.
//!
//! The core pieces:
//!
//! - [`capabilities`] — descriptor parsing, the registry with three-tier
//!   lazy loading, scope-priority discovery, and trust resolution.
//! - [`invocation`] — the activate/deactivate lifecycle: permission gating,
//!   argument substitution, and fork-mode handoff.
//! - [`delegation`] — blueprints, the child-context spawner with its
//!   no-nesting invariant, the three-mode delegation engine, and
//!   circular-configuration detection.
//! - [`interfaces`] — the narrow traits this subsystem consumes: the model
//!   runner, usage accounting, tool lookup, and template resolution.
//!
//! The model execution loop itself is external: implement
//! [`interfaces::Runner`] and hand it to an [`AgentContext`].

pub mod capabilities;
pub mod config;
pub mod delegation;
pub mod interfaces;
pub mod invocation;
pub mod types;
pub mod utilities;

pub use capabilities::{
    Capability, CapabilityDescriptor, CapabilityRegistry, CapabilityScope, DiscoveryScanner,
    ExecutionMode, ReferenceFile, TrustLevel, TrustViolation,
};
pub use config::DiscoveryConfig;
pub use delegation::{
    AgentContext, BlueprintStore, ChildContext, ContextSpawner, DelegationBlueprint,
    DelegationEngine, DelegationHandle, DelegationResult, GraphNode,
};
pub use interfaces::{
    Runner, RunnerResult, ScriptedRunner, StaticToolRegistry, TemplateResolver,
    TeraTemplateResolver, ToolHandle, ToolRegistry, UsageLedger, UsageSink,
};
pub use invocation::{InvocationEngine, InvocationSource};
pub use types::usage_metrics::UsageMetrics;
pub use utilities::errors::{
    CapabilityError, DelegationError, InvocationError, RunnerError, SpawnError,
};

/// Library version.
pub const VERSION: &str = "0.1.0";
