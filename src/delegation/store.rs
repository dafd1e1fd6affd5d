//! Blueprint store — keyed, task-safe access to delegation blueprints.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use tokio::sync::RwLock;

use super::blueprint::{DelegationBlueprint, BLUEPRINT_EXTENSION};
use crate::utilities::errors::DelegationError;

/// In-memory store of blueprints, keyed by name.
#[derive(Debug, Default)]
pub struct BlueprintStore {
    entries: RwLock<HashMap<String, Arc<DelegationBlueprint>>>,
}

impl BlueprintStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a blueprint, replacing any existing entry of the same name.
    pub async fn register(&self, blueprint: DelegationBlueprint) {
        let mut entries = self.entries.write().await;
        log::debug!("registering blueprint '{}'", blueprint.name);
        entries.insert(blueprint.name.clone(), Arc::new(blueprint));
    }

    /// Parse and register a blueprint document.
    pub async fn register_from_document(
        &self,
        text: &str,
        location: &Path,
    ) -> Result<Arc<DelegationBlueprint>, DelegationError> {
        let blueprint = Arc::new(DelegationBlueprint::from_document(text, location)?);
        let mut entries = self.entries.write().await;
        log::debug!("registering blueprint '{}'", blueprint.name);
        entries.insert(blueprint.name.clone(), Arc::clone(&blueprint));
        Ok(blueprint)
    }

    /// Load every blueprint document in a directory. Malformed documents
    /// are logged and skipped; returns the number registered.
    pub async fn load_directory(&self, dir: &Path) -> Result<usize, DelegationError> {
        if !dir.exists() {
            return Ok(0);
        }
        let entries = std::fs::read_dir(dir).map_err(|e| DelegationError::Document {
            location: dir.to_path_buf(),
            message: e.to_string(),
        })?;

        let mut count = 0;
        for entry in entries {
            let entry = entry.map_err(|e| DelegationError::Document {
                location: dir.to_path_buf(),
                message: e.to_string(),
            })?;
            let path = entry.path();
            if !path
                .extension()
                .map_or(false, |ext| ext == BLUEPRINT_EXTENSION)
            {
                continue;
            }
            let text = match std::fs::read_to_string(&path) {
                Ok(text) => text,
                Err(e) => {
                    log::warn!("failed to read blueprint {}: {e}", path.display());
                    continue;
                }
            };
            match self.register_from_document(&text, &path).await {
                Ok(_) => count += 1,
                Err(e) => log::warn!("skipping blueprint at {}: {e}", path.display()),
            }
        }
        Ok(count)
    }

    /// Fetch a blueprint by name.
    pub async fn get(&self, name: &str) -> Option<Arc<DelegationBlueprint>> {
        self.entries.read().await.get(name).cloned()
    }

    /// Whether a blueprint is registered, without fetching it.
    pub async fn contains(&self, name: &str) -> bool {
        self.entries.read().await.contains_key(name)
    }

    /// All registered blueprints.
    pub async fn list(&self) -> Vec<Arc<DelegationBlueprint>> {
        let mut blueprints: Vec<Arc<DelegationBlueprint>> =
            self.entries.read().await.values().cloned().collect();
        blueprints.sort_by(|a, b| a.name.cmp(&b.name));
        blueprints
    }

    /// Remove a blueprint.
    pub async fn remove(&self, name: &str) -> bool {
        self.entries.write().await.remove(name).is_some()
    }
}
