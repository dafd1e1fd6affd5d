//! The full capability unit: descriptor plus lazily loaded body.

use std::path::PathBuf;
use std::sync::Arc;

use crate::capabilities::descriptor::CapabilityDescriptor;
use crate::interfaces::tools::ToolHandle;

/// A capability as held by the registry.
///
/// The body is absent until first activation or `get`; once materialized it
/// is shared (`Arc`) so repeated reads reuse the same instance. Tool handles
/// are present only while the capability is active.
#[derive(Debug, Clone)]
pub struct Capability {
    /// Always-resident metadata.
    pub descriptor: CapabilityDescriptor,
    pub(crate) body: Option<Arc<str>>,
    pub(crate) active: bool,
    pub(crate) tool_handles: Vec<ToolHandle>,
}

impl Capability {
    /// A Tier-1 capability: metadata only, body loaded on demand.
    pub fn from_descriptor(descriptor: CapabilityDescriptor) -> Self {
        Self {
            descriptor,
            body: None,
            active: false,
            tool_handles: Vec::new(),
        }
    }

    /// A capability with its body already materialized. Used for
    /// programmatic registration where no backing document exists.
    pub fn with_body(descriptor: CapabilityDescriptor, body: impl Into<Arc<str>>) -> Self {
        Self {
            descriptor,
            body: Some(body.into()),
            active: false,
            tool_handles: Vec::new(),
        }
    }

    /// The capability's unique name.
    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    /// The materialized body, if loaded.
    pub fn body(&self) -> Option<&Arc<str>> {
        self.body.as_ref()
    }

    /// Whether the capability is currently active.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Tool handles registered for the current activation.
    pub fn tool_handles(&self) -> &[ToolHandle] {
        &self.tool_handles
    }
}

/// A Tier-3 reference file, loaded on explicit request and never cached.
#[derive(Debug, Clone)]
pub struct ReferenceFile {
    /// Owning capability name.
    pub capability: String,
    /// Path relative to the capability's references directory.
    pub relative_path: PathBuf,
    /// File contents.
    pub content: String,
}
