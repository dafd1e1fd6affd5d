//! Child-context spawning.
//!
//! A spawned context is isolated: it gets its own model, tool set, system
//! prompt, and turn budget, and it can never spawn a further child. The
//! `is_child_context` flag is set exactly once here and is immutable
//! afterward.

use std::sync::Arc;

use uuid::Uuid;

use super::blueprint::{DelegationBlueprint, SystemPromptSource, ToolRef};
use crate::capabilities::registry::CapabilityRegistry;
use crate::interfaces::accounting::UsageSink;
use crate::interfaces::runner::{RunRequest, Runner, RunnerResult};
use crate::interfaces::template::TemplateResolver;
use crate::interfaces::tools::ToolHandle;
use crate::utilities::errors::{CapabilityError, RunnerError, SpawnError};

/// The caller's execution context, as seen by this subsystem.
#[derive(Debug, Clone)]
pub struct AgentContext {
    /// Identifier used in logs and accounting.
    pub name: String,
    /// The caller's model.
    pub model: String,
    /// The caller's registered tool set.
    pub tools: Vec<ToolHandle>,
    /// Whether this context was itself spawned from a blueprint.
    pub is_child_context: bool,
    /// The external model execution loop.
    pub runner: Arc<dyn Runner>,
    /// The accounting collaborator usage aggregates into.
    pub usage: Arc<dyn UsageSink>,
}

impl AgentContext {
    /// A top-level (non-child) context.
    pub fn new(
        name: impl Into<String>,
        model: impl Into<String>,
        runner: Arc<dyn Runner>,
        usage: Arc<dyn UsageSink>,
    ) -> Self {
        Self {
            name: name.into(),
            model: model.into(),
            tools: Vec::new(),
            is_child_context: false,
            runner,
            usage,
        }
    }

    /// Attach the caller's registered tools.
    pub fn with_tools(mut self, tools: Vec<ToolHandle>) -> Self {
        self.tools = tools;
        self
    }
}

/// An isolated execution context built from a blueprint.
#[derive(Debug, Clone)]
pub struct ChildContext {
    /// Unique id of this spawned context.
    pub id: Uuid,
    /// The blueprint the context was built from.
    pub blueprint_name: String,
    /// Resolved model.
    pub model: String,
    /// Resolved tool set.
    pub tools: Vec<ToolHandle>,
    /// Assembled system prompt.
    pub system_prompt: String,
    /// Hard ceiling on the run's iteration count.
    pub turn_budget: u32,
    /// Always true; a child may never spawn.
    pub is_child_context: bool,
    runner: Arc<dyn Runner>,
}

impl ChildContext {
    /// Execute a task inside this context.
    pub async fn run(&self, task: &str) -> Result<RunnerResult, RunnerError> {
        let request = RunRequest {
            prompt: task.to_string(),
            system_prompt: if self.system_prompt.is_empty() {
                None
            } else {
                Some(self.system_prompt.clone())
            },
            history: Vec::new(),
            model: self.model.clone(),
            tools: self.tools.clone(),
            turn_budget: self.turn_budget,
        };
        self.runner.run(request).await
    }

    /// View this child as a caller context, e.g. for code running inside
    /// the child that wants registry access. Spawning through the returned
    /// context fails the no-nesting guard.
    pub fn as_agent_context(&self, usage: Arc<dyn UsageSink>) -> AgentContext {
        AgentContext {
            name: format!("{}:{}", self.blueprint_name, self.id),
            model: self.model.clone(),
            tools: self.tools.clone(),
            is_child_context: true,
            runner: Arc::clone(&self.runner),
            usage,
        }
    }
}

/// Builds isolated child contexts from blueprints.
#[derive(Debug, Default)]
pub struct ContextSpawner {
    template: Option<Arc<dyn TemplateResolver>>,
}

impl ContextSpawner {
    /// A spawner without template support; template-sourced prompts fail.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach the template collaborator.
    pub fn with_template_resolver(mut self, resolver: Arc<dyn TemplateResolver>) -> Self {
        self.template = Some(resolver);
        self
    }

    /// Whether a template collaborator is attached.
    pub fn has_template_resolver(&self) -> bool {
        self.template.is_some()
    }

    /// Build a child context from a blueprint and a parent.
    ///
    /// Fails before any execution on: nesting, unknown allow-listed tools,
    /// unresolvable preload capabilities, template render failure.
    pub async fn spawn(
        &self,
        blueprint: &DelegationBlueprint,
        parent: &AgentContext,
        registry: &CapabilityRegistry,
    ) -> Result<ChildContext, SpawnError> {
        if parent.is_child_context {
            return Err(SpawnError::Nesting {
                blueprint: blueprint.name.clone(),
            });
        }

        let model = blueprint
            .model_override
            .clone()
            .unwrap_or_else(|| parent.model.clone());

        let tools = self.resolve_tools(blueprint, parent)?;
        let system_prompt = self.assemble_system_prompt(blueprint, registry).await?;

        log::debug!(
            "spawned child context for blueprint '{}' (model {}, {} tool(s), budget {})",
            blueprint.name,
            model,
            tools.len(),
            blueprint.turn_budget
        );

        Ok(ChildContext {
            id: Uuid::new_v4(),
            blueprint_name: blueprint.name.clone(),
            model,
            tools,
            system_prompt,
            turn_budget: blueprint.turn_budget,
            is_child_context: true,
            runner: Arc::clone(&parent.runner),
        })
    }

    /// Resolve the blueprint's tool policy against the parent's tool set.
    fn resolve_tools(
        &self,
        blueprint: &DelegationBlueprint,
        parent: &AgentContext,
    ) -> Result<Vec<ToolHandle>, SpawnError> {
        // No policy means an empty tool set, never inheritance.
        let Some(policy) = &blueprint.tool_policy else {
            return Ok(Vec::new());
        };

        let mut tools = match &policy.allow {
            Some(allow) => {
                let mut resolved = Vec::with_capacity(allow.len());
                for entry in allow {
                    match entry {
                        ToolRef::Named(name) => {
                            let handle = parent
                                .tools
                                .iter()
                                .find(|t| t.name == *name)
                                .cloned()
                                .ok_or_else(|| SpawnError::ToolResolution {
                                    blueprint: blueprint.name.clone(),
                                    tool: name.clone(),
                                })?;
                            resolved.push(handle);
                        }
                        ToolRef::Callable(handle) => resolved.push(handle.clone()),
                    }
                }
                resolved
            }
            None => parent.tools.clone(),
        };

        if !policy.deny.is_empty() {
            tools.retain(|t| !policy.deny.contains(&t.name));
        }
        Ok(tools)
    }

    /// Assemble the system prompt: base prompt plus one labeled section per
    /// preloaded capability.
    async fn assemble_system_prompt(
        &self,
        blueprint: &DelegationBlueprint,
        registry: &CapabilityRegistry,
    ) -> Result<String, SpawnError> {
        let mut prompt = match &blueprint.system_prompt {
            SystemPromptSource::Literal(text) => text.clone(),
            SystemPromptSource::Template { name, variables } => match &self.template {
                Some(resolver) => resolver.render(name, variables)?,
                None => {
                    return Err(SpawnError::Template(
                        crate::utilities::errors::TemplateError {
                            name: name.clone(),
                            message: "no template collaborator is configured".to_string(),
                        },
                    ))
                }
            },
        };

        for capability_name in &blueprint.preload_capabilities {
            let capability = registry.get(capability_name).await.map_err(|e| match e {
                CapabilityError::NotFound { name } => SpawnError::CapabilityNotFound {
                    blueprint: blueprint.name.clone(),
                    capability: name,
                },
                other => SpawnError::Capability(other),
            })?;
            let body = capability
                .body()
                .map(|b| b.as_ref().to_string())
                .unwrap_or_default();
            if !prompt.is_empty() {
                prompt.push_str("\n\n");
            }
            prompt.push_str(&format!("## Preloaded capability: {capability_name}\n\n{body}"));
        }

        Ok(prompt)
    }
}
