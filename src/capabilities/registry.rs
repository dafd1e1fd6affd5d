//! In-memory capability store with three-tier lazy loading.
//!
//! The registry exclusively owns its capabilities; callers get cloned read
//! snapshots (bodies are `Arc`-shared, so a snapshot never re-parses). It is
//! safe for concurrent read/activate access from multiple logical callers.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use tokio::sync::RwLock;

use super::capability::{Capability, ReferenceFile};
use super::descriptor::{CapabilityDescriptor, CapabilityScope, TrustLevel};
use super::document;
use crate::interfaces::tools::ToolHandle;
use crate::utilities::errors::CapabilityError;

/// Keyed store of capabilities.
#[derive(Debug, Default)]
pub struct CapabilityRegistry {
    entries: RwLock<HashMap<String, Capability>>,
}

impl CapabilityRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a full capability. An existing entry under the same name is
    /// replaced; scope-priority arbitration happens in discovery, before
    /// registration.
    pub async fn register(&self, capability: Capability) {
        let mut entries = self.entries.write().await;
        log::debug!(
            "registering capability '{}' from {}",
            capability.name(),
            capability.descriptor.source_location.display()
        );
        entries.insert(capability.name().to_string(), capability);
    }

    /// Register a Tier-1 entry from its descriptor alone.
    pub async fn register_descriptor(&self, descriptor: CapabilityDescriptor) {
        self.register(Capability::from_descriptor(descriptor)).await;
    }

    /// Register from a bare location: Tier-1 parse of the directory's
    /// descriptor document.
    pub async fn register_from_dir(
        &self,
        source_dir: &Path,
        scope: CapabilityScope,
        trust: TrustLevel,
    ) -> Result<CapabilityDescriptor, CapabilityError> {
        let descriptor = document::load_metadata(source_dir, scope, trust)?;
        self.register_descriptor(descriptor.clone()).await;
        Ok(descriptor)
    }

    /// Remove a capability. Active tool handles are dropped with the entry.
    pub async fn deregister(&self, name: &str) -> bool {
        let mut entries = self.entries.write().await;
        match entries.remove(name) {
            Some(capability) => {
                if capability.is_active() {
                    log::debug!(
                        "deregistered active capability '{name}', clearing {} tool handle(s)",
                        capability.tool_handles().len()
                    );
                }
                true
            }
            None => false,
        }
    }

    /// Fetch a capability, materializing its body (Tier 2) on first call.
    ///
    /// Idempotent: the materialized body is retained, so repeated calls
    /// return the same `Arc` instance without re-parsing.
    pub async fn get(&self, name: &str) -> Result<Capability, CapabilityError> {
        {
            let entries = self.entries.read().await;
            match entries.get(name) {
                Some(capability) if capability.body.is_some() => return Ok(capability.clone()),
                Some(_) => {}
                None => {
                    return Err(CapabilityError::NotFound {
                        name: name.to_string(),
                    })
                }
            }
        }

        let mut entries = self.entries.write().await;
        let capability = entries
            .get_mut(name)
            .ok_or_else(|| CapabilityError::NotFound {
                name: name.to_string(),
            })?;
        if capability.body.is_none() {
            let descriptor = &capability.descriptor;
            let (_, body) = document::load_full(
                &descriptor.source_location,
                descriptor.scope,
                descriptor.trust,
            )?;
            log::debug!("materialized body for capability '{name}'");
            capability.body = Some(Arc::from(body.as_str()));
        }
        Ok(capability.clone())
    }

    /// Look up a descriptor without triggering body materialization.
    pub async fn descriptor(&self, name: &str) -> Option<CapabilityDescriptor> {
        self.entries
            .read()
            .await
            .get(name)
            .map(|c| c.descriptor.clone())
    }

    /// Whether a capability is registered, without loading anything.
    pub async fn contains(&self, name: &str) -> bool {
        self.entries.read().await.contains_key(name)
    }

    /// Whether a capability's body has been materialized, without
    /// triggering materialization as a side effect.
    pub async fn is_materialized(&self, name: &str) -> bool {
        self.entries
            .read()
            .await
            .get(name)
            .map(|c| c.body.is_some())
            .unwrap_or(false)
    }

    /// Whether a capability is currently active.
    pub async fn is_active(&self, name: &str) -> bool {
        self.entries
            .read()
            .await
            .get(name)
            .map(|c| c.is_active())
            .unwrap_or(false)
    }

    /// Descriptors of every registered capability.
    pub async fn list(&self) -> Vec<CapabilityDescriptor> {
        let mut descriptors: Vec<CapabilityDescriptor> = self
            .entries
            .read()
            .await
            .values()
            .map(|c| c.descriptor.clone())
            .collect();
        descriptors.sort_by(|a, b| a.name.cmp(&b.name));
        descriptors
    }

    /// Number of registered capabilities.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether the registry holds no capabilities.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Substring search over names and descriptions.
    pub async fn find_relevant(&self, query: &str) -> Vec<CapabilityDescriptor> {
        let query = query.to_lowercase();
        self.entries
            .read()
            .await
            .values()
            .filter(|c| {
                c.descriptor.name.to_lowercase().contains(&query)
                    || c.descriptor.description.to_lowercase().contains(&query)
            })
            .map(|c| c.descriptor.clone())
            .collect()
    }

    /// Tier 3: load a reference file on demand. Never cached.
    pub async fn load_reference(
        &self,
        name: &str,
        relative_path: &Path,
    ) -> Result<ReferenceFile, CapabilityError> {
        // Reference paths must stay inside the capability's reference area.
        if relative_path.is_absolute()
            || relative_path
                .components()
                .any(|c| matches!(c, std::path::Component::ParentDir))
        {
            return Err(CapabilityError::Validation {
                location: relative_path.to_path_buf(),
                message: "reference path must be relative and must not traverse upward"
                    .to_string(),
                fields: vec!["reference".to_string()],
            });
        }

        let descriptor = self
            .descriptor(name)
            .await
            .ok_or_else(|| CapabilityError::NotFound {
                name: name.to_string(),
            })?;
        let path = descriptor
            .source_location
            .join(document::REFERENCES_DIR)
            .join(relative_path);
        let content = std::fs::read_to_string(&path).map_err(|source| CapabilityError::Io {
            location: path,
            source,
        })?;
        Ok(ReferenceFile {
            capability: name.to_string(),
            relative_path: relative_path.to_path_buf(),
            content,
        })
    }

    /// Mark a capability active and install its activation tool handles.
    pub(crate) async fn mark_active(
        &self,
        name: &str,
        tool_handles: Vec<ToolHandle>,
    ) -> Result<(), CapabilityError> {
        let mut entries = self.entries.write().await;
        let capability = entries
            .get_mut(name)
            .ok_or_else(|| CapabilityError::NotFound {
                name: name.to_string(),
            })?;
        capability.active = true;
        capability.tool_handles = tool_handles;
        Ok(())
    }

    /// Mark a capability inactive, clearing its tool handles. Idempotent;
    /// the body is retained for reuse.
    pub(crate) async fn mark_inactive(&self, name: &str) -> bool {
        let mut entries = self.entries.write().await;
        match entries.get_mut(name) {
            Some(capability) => {
                capability.active = false;
                capability.tool_handles.clear();
                true
            }
            None => false,
        }
    }
}
