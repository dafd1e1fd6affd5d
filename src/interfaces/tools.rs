//! Tool registry collaborator — read-only lookup of named callables.
//!
//! Tool execution itself happens inside the external runner; this subsystem
//! only resolves names into handles during capability activation and
//! blueprint tool-policy resolution.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::utilities::errors::ToolError;

/// The callable behind a tool handle.
pub type ToolFn = Arc<dyn Fn(Value) -> Result<Value, ToolError> + Send + Sync>;

/// A named, invocable tool.
#[derive(Clone)]
pub struct ToolHandle {
    /// Unique tool name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    func: ToolFn,
}

impl ToolHandle {
    /// Wrap a callable into a handle.
    pub fn new<F>(name: impl Into<String>, description: impl Into<String>, func: F) -> Self
    where
        F: Fn(Value) -> Result<Value, ToolError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            func: Arc::new(func),
        }
    }

    /// Invoke the tool with JSON arguments.
    pub fn call(&self, args: Value) -> Result<Value, ToolError> {
        (self.func)(args)
    }
}

impl fmt::Debug for ToolHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolHandle")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

/// Read-only lookup of `(name) -> callable`.
pub trait ToolRegistry: Send + Sync + fmt::Debug {
    /// Resolve a tool name to its handle.
    fn lookup(&self, name: &str) -> Option<ToolHandle>;

    /// All resolvable tool names.
    fn names(&self) -> Vec<String>;
}

/// An in-memory tool registry.
///
/// When a namespace prefix is configured, tools are listed as
/// `prefix:name` and `lookup` accepts both the prefixed and the bare form.
#[derive(Debug, Default)]
pub struct StaticToolRegistry {
    tools: HashMap<String, ToolHandle>,
    namespace: Option<String>,
}

impl StaticToolRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Namespace every registered tool under `prefix`.
    pub fn with_namespace(mut self, prefix: impl Into<String>) -> Self {
        self.namespace = Some(prefix.into());
        self
    }

    /// Register a tool handle under its own name.
    pub fn insert(&mut self, handle: ToolHandle) {
        self.tools.insert(handle.name.clone(), handle);
    }

    fn strip_namespace<'a>(&self, name: &'a str) -> &'a str {
        if let Some(prefix) = &self.namespace {
            if let Some(rest) = name.strip_prefix(prefix.as_str()) {
                if let Some(bare) = rest.strip_prefix(':') {
                    return bare;
                }
            }
        }
        name
    }
}

impl ToolRegistry for StaticToolRegistry {
    fn lookup(&self, name: &str) -> Option<ToolHandle> {
        self.tools.get(self.strip_namespace(name)).cloned()
    }

    fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .tools
            .keys()
            .map(|n| match &self.namespace {
                Some(prefix) => format!("{prefix}:{n}"),
                None => n.clone(),
            })
            .collect();
        names.sort();
        names
    }
}
