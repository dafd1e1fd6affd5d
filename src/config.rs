//! Discovery configuration surface.
//!
//! Loading and merging this configuration (files, environment, CLI) belongs
//! to the embedding runtime; this subsystem only consumes the resolved
//! values.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::capabilities::descriptor::CapabilityScope;

/// Resolved discovery settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Search roots for project-scope capabilities.
    #[serde(default)]
    pub project_roots: Vec<PathBuf>,
    /// Search roots for user-scope capabilities.
    #[serde(default)]
    pub user_roots: Vec<PathBuf>,
    /// Search roots for custom-scope capabilities.
    #[serde(default)]
    pub custom_roots: Vec<PathBuf>,
    /// Custom locations whose capabilities are trusted.
    #[serde(default)]
    pub trusted_custom_paths: Vec<PathBuf>,
    /// Whether tool names are exposed under a namespace prefix.
    #[serde(default)]
    pub tool_namespace_prefix: bool,
}

impl DiscoveryConfig {
    /// Create an empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a project-scope search root.
    pub fn with_project_root(mut self, root: impl AsRef<Path>) -> Self {
        self.project_roots.push(root.as_ref().to_path_buf());
        self
    }

    /// Add a user-scope search root.
    pub fn with_user_root(mut self, root: impl AsRef<Path>) -> Self {
        self.user_roots.push(root.as_ref().to_path_buf());
        self
    }

    /// Add a custom-scope search root.
    pub fn with_custom_root(mut self, root: impl AsRef<Path>) -> Self {
        self.custom_roots.push(root.as_ref().to_path_buf());
        self
    }

    /// Trust capabilities discovered under this custom location.
    pub fn with_trusted_custom_path(mut self, path: impl AsRef<Path>) -> Self {
        self.trusted_custom_paths.push(path.as_ref().to_path_buf());
        self
    }

    /// The search roots configured for a scope.
    pub fn roots_for(&self, scope: CapabilityScope) -> &[PathBuf] {
        match scope {
            CapabilityScope::Project => &self.project_roots,
            CapabilityScope::User => &self.user_roots,
            CapabilityScope::Custom => &self.custom_roots,
        }
    }
}
