//! Capability descriptor — the always-resident metadata for a capability.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Maximum length of a capability name.
pub const MAX_NAME_LEN: usize = 64;

/// Where a capability was discovered from.
///
/// Cross-scope name collisions resolve by priority: Project beats User
/// beats Custom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CapabilityScope {
    /// Checked into the current project.
    Project,
    /// The user's personal capability directory.
    User,
    /// An operator-configured extra search root.
    Custom,
}

impl CapabilityScope {
    /// Priority rank; lower wins on cross-scope collisions.
    pub fn priority(self) -> u8 {
        match self {
            CapabilityScope::Project => 0,
            CapabilityScope::User => 1,
            CapabilityScope::Custom => 2,
        }
    }
}

impl fmt::Display for CapabilityScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CapabilityScope::Project => write!(f, "project"),
            CapabilityScope::User => write!(f, "user"),
            CapabilityScope::Custom => write!(f, "custom"),
        }
    }
}

/// Coarse permission classification, derived from scope at discovery time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrustLevel {
    Trusted,
    Untrusted,
}

/// How an activated capability executes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    /// Activation returns the substituted body to the caller.
    #[default]
    Standard,
    /// Activation delegates the substituted body to a child context.
    Fork,
}

/// A parsed lifecycle hook entry.
///
/// Hooks are parsed and trust-checked but have no execution semantics;
/// the field is reserved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleHook {
    /// Hook trigger name (e.g. "activate").
    pub event: String,
    /// The command text the hook would run.
    pub command: String,
}

/// Metadata for one capability, resident from discovery onward.
///
/// `name` is immutable after registration; the body and reference files are
/// loaded lazily through the registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapabilityDescriptor {
    /// Unique key: lowercase alphanumeric plus hyphens, at most
    /// [`MAX_NAME_LEN`] characters, equal to the source directory name.
    pub name: String,
    /// What the capability does and when to activate it.
    pub description: String,
    /// Directory the capability was discovered in.
    pub source_location: PathBuf,
    /// Scope the capability was discovered from.
    pub scope: CapabilityScope,
    /// Derived trust classification; never authored.
    pub trust: TrustLevel,
    /// Optional license identifier.
    pub license: Option<String>,
    /// Optional runtime-compatibility constraint.
    pub compatibility: Option<String>,
    /// Arbitrary author-supplied metadata.
    pub metadata: HashMap<String, String>,
    /// Tools the capability wants registered while active.
    pub allowed_tools: Vec<String>,
    /// Model to prefer while the capability is active.
    pub model_override: Option<String>,
    /// Standard (inline) or fork (delegated) execution.
    pub execution_mode: ExecutionMode,
    /// Blueprint to delegate to; required in fork mode.
    pub delegate_blueprint: Option<String>,
    /// When set, model-sourced activation is rejected.
    pub disable_model_invocation: bool,
    /// When false, user-sourced activation is rejected.
    pub user_invocable: bool,
    /// Hint shown to users about expected arguments.
    pub argument_hint: Option<String>,
    /// Reserved; parsed but never executed.
    pub lifecycle_hooks: Vec<LifecycleHook>,
}

impl CapabilityDescriptor {
    /// Whether `name` satisfies the naming rules.
    pub fn is_valid_name(name: &str) -> bool {
        !name.is_empty()
            && name.len() <= MAX_NAME_LEN
            && name
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_rules() {
        assert!(CapabilityDescriptor::is_valid_name("deep-dive"));
        assert!(CapabilityDescriptor::is_valid_name("v2-scanner"));
        assert!(!CapabilityDescriptor::is_valid_name(""));
        assert!(!CapabilityDescriptor::is_valid_name("Deep-Dive"));
        assert!(!CapabilityDescriptor::is_valid_name("under_score"));
        assert!(!CapabilityDescriptor::is_valid_name(&"a".repeat(65)));
    }

    #[test]
    fn test_scope_priority() {
        assert!(CapabilityScope::Project.priority() < CapabilityScope::User.priority());
        assert!(CapabilityScope::User.priority() < CapabilityScope::Custom.priority());
    }
}
