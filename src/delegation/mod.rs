//! # Delegation system
//!
//! Blueprints describe isolated child contexts; the spawner builds them
//! from a parent context, and the engine runs tasks in them — suspending
//! the caller, or in the background behind a [`DelegationHandle`]. A child
//! never spawns its own child, and a child's execution failure resolves
//! into a [`DelegationResult`] rather than propagating to the caller.

pub mod blueprint;
pub mod cycle;
pub mod engine;
pub mod handle;
pub mod result;
pub mod spawner;
pub mod store;

pub use blueprint::{
    DelegationBlueprint, SystemPromptSource, ToolPolicy, ToolRef, DEFAULT_TURN_BUDGET,
};
pub use cycle::{detect_cycle, render_path, GraphNode};
pub use engine::DelegationEngine;
pub use handle::DelegationHandle;
pub use result::DelegationResult;
pub use spawner::{AgentContext, ChildContext, ContextSpawner};
pub use store::BlueprintStore;
