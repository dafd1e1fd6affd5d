//! Delegation blueprints — reusable child-context configurations.
//!
//! A blueprint can be built programmatically or parsed from a single
//! frontmatter+body document, where the body becomes the literal system
//! prompt.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;

use crate::interfaces::tools::ToolHandle;
use crate::utilities::errors::DelegationError;

/// Default hard ceiling on a child context's iteration count.
pub const DEFAULT_TURN_BUDGET: u32 = 50;

/// File extension for on-disk blueprint documents.
pub const BLUEPRINT_EXTENSION: &str = "md";

/// A tool reference inside an allow-list.
#[derive(Debug, Clone)]
pub enum ToolRef {
    /// Resolved against the parent's registered tool set at spawn time.
    Named(String),
    /// Passed through to the child directly.
    Callable(ToolHandle),
}

/// The tool policy of a blueprint.
///
/// No policy at all means the child gets zero tools, not the parent's full
/// set. Deny entries are removed even when also allow-listed.
#[derive(Debug, Clone, Default)]
pub struct ToolPolicy {
    /// Explicit allow-list; `None` with a non-empty deny-list means
    /// "the parent's full set minus the denied names".
    pub allow: Option<Vec<ToolRef>>,
    /// Names subtracted from whatever the allow side produced.
    pub deny: Vec<String>,
}

/// Where a blueprint's system prompt comes from.
#[derive(Debug, Clone)]
pub enum SystemPromptSource {
    /// Used verbatim.
    Literal(String),
    /// Resolved through the template collaborator at spawn time.
    Template {
        name: String,
        variables: HashMap<String, String>,
    },
}

impl Default for SystemPromptSource {
    fn default() -> Self {
        SystemPromptSource::Literal(String::new())
    }
}

/// A reusable configuration for spawning an isolated child context.
#[derive(Debug, Clone)]
pub struct DelegationBlueprint {
    /// Unique key.
    pub name: String,
    /// What the child context is for.
    pub description: String,
    /// Model for the child; parent's model when absent.
    pub model_override: Option<String>,
    /// Tool policy; absence means an empty child tool set.
    pub tool_policy: Option<ToolPolicy>,
    /// System prompt source.
    pub system_prompt: SystemPromptSource,
    /// Capabilities whose bodies are appended to the system prompt.
    pub preload_capabilities: Vec<String>,
    /// Hard ceiling on the child's iteration count.
    pub turn_budget: u32,
    /// Opaque full-config override passed through to the runner layer.
    pub full_config_override: Option<Value>,
}

impl DelegationBlueprint {
    /// Create a blueprint with defaults: no tools, empty literal prompt,
    /// default turn budget.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            model_override: None,
            tool_policy: None,
            system_prompt: SystemPromptSource::default(),
            preload_capabilities: Vec::new(),
            turn_budget: DEFAULT_TURN_BUDGET,
            full_config_override: None,
        }
    }

    /// Set the child's model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model_override = Some(model.into());
        self
    }

    /// Allow these named tools from the parent's set.
    pub fn allow_tools<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let policy = self.tool_policy.get_or_insert_with(ToolPolicy::default);
        let allow = policy.allow.get_or_insert_with(Vec::new);
        allow.extend(names.into_iter().map(|n| ToolRef::Named(n.into())));
        self
    }

    /// Allow a callable tool directly.
    pub fn allow_tool_handle(mut self, handle: ToolHandle) -> Self {
        let policy = self.tool_policy.get_or_insert_with(ToolPolicy::default);
        policy
            .allow
            .get_or_insert_with(Vec::new)
            .push(ToolRef::Callable(handle));
        self
    }

    /// Deny these named tools.
    pub fn deny_tools<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let policy = self.tool_policy.get_or_insert_with(ToolPolicy::default);
        policy.deny.extend(names.into_iter().map(Into::into));
        self
    }

    /// Use this literal system prompt.
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = SystemPromptSource::Literal(prompt.into());
        self
    }

    /// Resolve the system prompt through a named template.
    pub fn with_template(
        mut self,
        name: impl Into<String>,
        variables: HashMap<String, String>,
    ) -> Self {
        self.system_prompt = SystemPromptSource::Template {
            name: name.into(),
            variables,
        };
        self
    }

    /// Preload a capability into the child's system prompt.
    pub fn preload(mut self, capability: impl Into<String>) -> Self {
        self.preload_capabilities.push(capability.into());
        self
    }

    /// Override the turn budget.
    pub fn with_turn_budget(mut self, budget: u32) -> Self {
        self.turn_budget = budget;
        self
    }

    /// Attach an opaque full-config override.
    pub fn with_full_config_override(mut self, config: Value) -> Self {
        self.full_config_override = Some(config);
        self
    }

    /// Parse a blueprint from a frontmatter+body document. The body, when
    /// non-empty, becomes the literal system prompt unless the metadata
    /// names a template.
    pub fn from_document(text: &str, location: &Path) -> Result<Self, DelegationError> {
        let trimmed = text.trim_start_matches('\u{feff}');
        let rest = trimmed
            .strip_prefix("---")
            .ok_or_else(|| DelegationError::Document {
                location: location.to_path_buf(),
                message: "document must start with a '---' metadata fence".to_string(),
            })?;
        let end = rest.find("\n---").ok_or_else(|| DelegationError::Document {
            location: location.to_path_buf(),
            message: "metadata block is missing its closing '---' fence".to_string(),
        })?;
        let yaml = &rest[..end];
        let body = rest[end + 4..].trim_start_matches(['\r', '\n']);

        let front: BlueprintFrontmatter =
            serde_yaml::from_str(yaml).map_err(|e| DelegationError::Document {
                location: location.to_path_buf(),
                message: format!("invalid metadata block: {e}"),
            })?;

        let name = front.name.unwrap_or_default();
        if name.trim().is_empty() {
            return Err(DelegationError::Document {
                location: location.to_path_buf(),
                message: "missing required field: name".to_string(),
            });
        }

        let mut blueprint = Self::new(name, front.description.unwrap_or_default());
        blueprint.model_override = front.model_override;
        if let Some(tools) = front.tools {
            blueprint = blueprint.allow_tools(tools);
        }
        if !front.disallowed_tools.is_empty() {
            blueprint = blueprint.deny_tools(front.disallowed_tools);
        }
        blueprint.preload_capabilities = front.preload;
        blueprint.turn_budget = front.turn_budget.unwrap_or(DEFAULT_TURN_BUDGET);
        blueprint.full_config_override = front.full_config_override;

        blueprint.system_prompt = match front.template {
            Some(template) => SystemPromptSource::Template {
                name: template,
                variables: front.template_variables,
            },
            None => SystemPromptSource::Literal(body.to_string()),
        };

        Ok(blueprint)
    }
}

#[derive(Debug, Deserialize)]
struct BlueprintFrontmatter {
    name: Option<String>,
    description: Option<String>,
    #[serde(alias = "model")]
    model_override: Option<String>,
    tools: Option<Vec<String>>,
    #[serde(default, alias = "disallowed-tools")]
    disallowed_tools: Vec<String>,
    #[serde(default)]
    preload: Vec<String>,
    #[serde(alias = "turn-budget")]
    turn_budget: Option<u32>,
    template: Option<String>,
    #[serde(default, alias = "template-variables")]
    template_variables: HashMap<String, String>,
    #[serde(alias = "full-config-override")]
    full_config_override: Option<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_builder_defaults() {
        let blueprint = DelegationBlueprint::new("researcher", "digs into topics");
        assert_eq!(blueprint.turn_budget, DEFAULT_TURN_BUDGET);
        assert!(blueprint.tool_policy.is_none());
        assert!(blueprint.preload_capabilities.is_empty());
    }

    #[test]
    fn test_builder_tool_policy() {
        let blueprint = DelegationBlueprint::new("worker", "")
            .allow_tools(["search", "fetch"])
            .deny_tools(["fetch"]);
        let policy = blueprint.tool_policy.unwrap();
        assert_eq!(policy.allow.unwrap().len(), 2);
        assert_eq!(policy.deny, vec!["fetch"]);
    }

    #[test]
    fn test_from_document() {
        let text = "---\n\
                    name: researcher\n\
                    description: Researches a topic\n\
                    model: small-fast\n\
                    tools:\n  - search\n\
                    preload:\n  - citation-style\n\
                    turn-budget: 5\n\
                    ---\n\
                    You are a careful researcher.";
        let blueprint =
            DelegationBlueprint::from_document(text, &PathBuf::from("/bp/researcher.md")).unwrap();

        assert_eq!(blueprint.name, "researcher");
        assert_eq!(blueprint.model_override.as_deref(), Some("small-fast"));
        assert_eq!(blueprint.turn_budget, 5);
        assert_eq!(blueprint.preload_capabilities, vec!["citation-style"]);
        match blueprint.system_prompt {
            SystemPromptSource::Literal(prompt) => {
                assert_eq!(prompt, "You are a careful researcher.")
            }
            other => panic!("expected literal prompt, got {other:?}"),
        }
    }

    #[test]
    fn test_from_document_template() {
        let text = "---\n\
                    name: templated\n\
                    template: researcher-prompt\n\
                    template-variables:\n  depth: thorough\n\
                    ---\n";
        let blueprint =
            DelegationBlueprint::from_document(text, &PathBuf::from("/bp/templated.md")).unwrap();
        match blueprint.system_prompt {
            SystemPromptSource::Template { name, variables } => {
                assert_eq!(name, "researcher-prompt");
                assert_eq!(variables.get("depth").map(String::as_str), Some("thorough"));
            }
            other => panic!("expected template prompt, got {other:?}"),
        }
    }

    #[test]
    fn test_from_document_requires_name() {
        let err = DelegationBlueprint::from_document(
            "---\ndescription: no name\n---\nbody",
            &PathBuf::from("/bp/anon.md"),
        )
        .unwrap_err();
        assert!(matches!(err, DelegationError::Document { .. }));
    }
}
