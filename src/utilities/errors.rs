//! Error types shared across the capability and delegation subsystems.
//!
//! Configuration-time faults (parse, validation, conflict, nesting, tool or
//! capability resolution, cycle detection) surface through these enums to the
//! immediate caller. Execution-time faults inside a delegated child run are
//! captured into `DelegationResult` instead and never propagate.

use std::path::PathBuf;

use thiserror::Error;

use crate::capabilities::trust::{format_violations, TrustViolation};
use crate::invocation::InvocationSource;

/// Errors from parsing, validating, and resolving capabilities.
#[derive(Debug, Error)]
pub enum CapabilityError {
    /// No capability registered under the requested name.
    #[error("no capability named '{name}' is registered")]
    NotFound { name: String },

    /// The descriptor document is structurally malformed.
    #[error("malformed capability document at {}: {message}", .location.display())]
    Parse {
        location: PathBuf,
        message: String,
        /// Metadata fields implicated in the failure, when known.
        fields: Vec<String>,
    },

    /// The descriptor parsed but violates schema or naming rules.
    #[error("invalid capability metadata at {}: {message}", .location.display())]
    Validation {
        location: PathBuf,
        message: String,
        fields: Vec<String>,
    },

    /// Two capabilities in the same scope share a name.
    #[error(
        "capability '{name}' defined at both {} and {} within the same scope",
        .first.display(),
        .second.display()
    )]
    Conflict {
        name: String,
        first: PathBuf,
        second: PathBuf,
    },

    /// A capability document or reference file could not be read.
    #[error("failed to read {}: {source}", .location.display())]
    Io {
        location: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised while activating or deactivating a capability.
#[derive(Debug, Error)]
pub enum InvocationError {
    /// The invocation source is not permitted to activate this capability.
    #[error("capability '{name}' rejected {invocation_source} invocation: {reason}")]
    PermissionDenied {
        name: String,
        invocation_source: InvocationSource,
        reason: String,
    },

    /// An untrusted capability declares restricted features.
    #[error(
        "untrusted capability '{name}' uses restricted features: {}",
        format_violations(.violations)
    )]
    TrustViolation {
        name: String,
        violations: Vec<TrustViolation>,
    },

    /// Activating the capability would loop back into itself.
    #[error("circular capability configuration: {path}")]
    CycleDetected { path: String },

    /// Lookup or materialization failure.
    #[error(transparent)]
    Capability(#[from] CapabilityError),

    /// The fork-mode handoff could not be configured.
    #[error(transparent)]
    Delegation(#[from] DelegationError),
}

/// Errors from spawning a child context out of a blueprint.
#[derive(Debug, Error)]
pub enum SpawnError {
    /// A child context attempted to spawn its own child.
    #[error("blueprint '{blueprint}' cannot be spawned from within a child context")]
    Nesting { blueprint: String },

    /// An allow-listed tool name does not exist in the parent's tool set.
    #[error("blueprint '{blueprint}' allows unknown tool '{tool}'")]
    ToolResolution { blueprint: String, tool: String },

    /// A preload name does not resolve against the capability registry.
    #[error("blueprint '{blueprint}' preloads unknown capability '{capability}'")]
    CapabilityNotFound {
        blueprint: String,
        capability: String,
    },

    /// The blueprint's system prompt template failed to render.
    #[error(transparent)]
    Template(#[from] TemplateError),

    /// Materializing a preloaded capability body failed.
    #[error(transparent)]
    Capability(#[from] CapabilityError),
}

/// Configuration-time delegation faults. Never caught and wrapped; a child
/// run's execution faults go into `DelegationResult` instead.
#[derive(Debug, Error)]
pub enum DelegationError {
    /// No blueprint registered under the requested name.
    #[error("no blueprint named '{name}' is registered")]
    UnknownBlueprint { name: String },

    /// The blueprint document is malformed.
    #[error("malformed blueprint document at {}: {message}", .location.display())]
    Document { location: PathBuf, message: String },

    /// Child-context construction failed.
    #[error(transparent)]
    Spawn(#[from] SpawnError),

    /// The synchronous convenience wrapper could not build a runtime.
    #[error("failed to start blocking delegation runtime: {message}")]
    Runtime { message: String },
}

/// Faults reported by the external runner collaborator.
#[derive(Debug, Error)]
pub enum RunnerError {
    /// The underlying model call failed.
    #[error("model call failed: {0}")]
    Model(String),

    /// The child hit its hard iteration ceiling.
    #[error("turn budget of {budget} exhausted")]
    TurnBudgetExhausted { budget: u32 },

    /// A tool invoked inside the run failed.
    #[error("tool '{tool}' failed during run: {message}")]
    Tool { tool: String, message: String },
}

/// A tool callable rejected its invocation.
#[derive(Debug, Error)]
#[error("tool '{tool}' failed: {message}")]
pub struct ToolError {
    pub tool: String,
    pub message: String,
}

/// The template collaborator could not resolve or render a template.
#[derive(Debug, Error)]
#[error("template '{name}' failed to render: {message}")]
pub struct TemplateError {
    pub name: String,
    pub message: String,
}
