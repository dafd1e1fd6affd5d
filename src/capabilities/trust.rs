//! Trust resolution and restriction checks.
//!
//! Trust is derived, never authored: project and user capabilities are
//! trusted unconditionally, custom ones only when their location falls under
//! a configured trusted path. Untrusted capabilities may not bring their own
//! tools, fork into child contexts, or declare lifecycle hooks.

use std::fmt;
use std::path::{Path, PathBuf};

use super::descriptor::{CapabilityDescriptor, CapabilityScope, ExecutionMode, TrustLevel};

/// Resolve the trust level for a capability location.
pub fn resolve_trust(
    scope: CapabilityScope,
    location: &Path,
    trusted_custom_paths: &[PathBuf],
) -> TrustLevel {
    match scope {
        CapabilityScope::Project | CapabilityScope::User => TrustLevel::Trusted,
        CapabilityScope::Custom => {
            if trusted_custom_paths.iter().any(|p| location.starts_with(p)) {
                TrustLevel::Trusted
            } else {
                TrustLevel::Untrusted
            }
        }
    }
}

/// A restricted feature used by an untrusted capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrustViolation {
    /// Declares `allowed-tools` beyond what the caller grants.
    AllowedTools,
    /// Requests fork-mode delegation.
    ForkExecution,
    /// Declares lifecycle hooks.
    LifecycleHooks,
}

impl fmt::Display for TrustViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrustViolation::AllowedTools => write!(f, "allowed-tools"),
            TrustViolation::ForkExecution => write!(f, "fork execution mode"),
            TrustViolation::LifecycleHooks => write!(f, "lifecycle hooks"),
        }
    }
}

/// Restricted features this descriptor would exercise.
///
/// Empty for trusted descriptors, and for untrusted ones that set no
/// restricted field.
pub fn check_restrictions(descriptor: &CapabilityDescriptor) -> Vec<TrustViolation> {
    if descriptor.trust == TrustLevel::Trusted {
        return Vec::new();
    }

    let mut violations = Vec::new();
    if !descriptor.allowed_tools.is_empty() {
        violations.push(TrustViolation::AllowedTools);
    }
    if descriptor.execution_mode == ExecutionMode::Fork {
        violations.push(TrustViolation::ForkExecution);
    }
    if !descriptor.lifecycle_hooks.is_empty() {
        violations.push(TrustViolation::LifecycleHooks);
    }
    violations
}

pub(crate) fn format_violations(violations: &[TrustViolation]) -> String {
    violations
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
