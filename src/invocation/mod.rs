//! # Invocation system
//!
//! Activation turns a registered capability into usable content: permission
//! gating by invocation source, lazy body materialization, argument
//! substitution, and — for fork-mode capabilities — the mediated handoff to
//! the delegation engine.

pub mod arguments;
pub mod engine;

pub use arguments::{split_arguments, substitute};
pub use engine::{InvocationEngine, InvocationSource};
