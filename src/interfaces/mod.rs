//! Narrow interfaces to external collaborators.
//!
//! The engine's boundary is a set of traits, not a wire protocol: the model
//! execution loop ([`Runner`]), usage accounting ([`UsageSink`]), read-only
//! tool lookup ([`ToolRegistry`]), and optional template resolution
//! ([`TemplateResolver`]). Default in-memory implementations are provided
//! where an embedding runtime or a test needs a concrete collaborator.

pub mod accounting;
pub mod runner;
pub mod scripted;
pub mod template;
pub mod tools;

pub use accounting::{UsageLedger, UsageSink};
pub use runner::{LLMMessage, RunRequest, Runner, RunnerResult};
pub use scripted::ScriptedRunner;
pub use template::{TemplateResolver, TeraTemplateResolver};
pub use tools::{StaticToolRegistry, ToolFn, ToolHandle, ToolRegistry};
