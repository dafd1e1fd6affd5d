//! Circular-configuration detection across the capability/blueprint graph.
//!
//! The graph alternates two edge kinds: capability → blueprint (via the
//! fork delegate reference) and blueprint → capability (via preloads). The
//! detector snapshots both stores and walks depth-first with a path stack;
//! it runs before every fork-mode activation and never caches across
//! registry mutations.

use std::collections::HashMap;
use std::fmt;

use crate::capabilities::registry::CapabilityRegistry;
use crate::delegation::store::BlueprintStore;

/// A node on the dependency path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphNode {
    Capability(String),
    Blueprint(String),
}

impl fmt::Display for GraphNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphNode::Capability(name) => write!(f, "capability:{name}"),
            GraphNode::Blueprint(name) => write!(f, "blueprint:{name}"),
        }
    }
}

/// Render a path as `capability:a -> blueprint:b -> capability:a`.
pub fn render_path(path: &[GraphNode]) -> String {
    path.iter()
        .map(|n| n.to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// Trace the graph from `capability_name`; returns the path ending at the
/// first repeated node, or `None` when acyclic.
pub async fn detect_cycle(
    capability_name: &str,
    registry: &CapabilityRegistry,
    store: &BlueprintStore,
) -> Option<Vec<GraphNode>> {
    // Fresh snapshot per invocation; detection is never cached.
    let mut fork_edges: HashMap<String, String> = HashMap::new();
    for descriptor in registry.list().await {
        if let Some(blueprint) = descriptor.delegate_blueprint {
            fork_edges.insert(descriptor.name, blueprint);
        }
    }
    let mut preload_edges: HashMap<String, Vec<String>> = HashMap::new();
    for blueprint in store.list().await {
        preload_edges.insert(blueprint.name.clone(), blueprint.preload_capabilities.clone());
    }

    let mut path = Vec::new();
    visit_capability(capability_name, &fork_edges, &preload_edges, &mut path)
}

fn visit_capability(
    name: &str,
    fork_edges: &HashMap<String, String>,
    preload_edges: &HashMap<String, Vec<String>>,
    path: &mut Vec<GraphNode>,
) -> Option<Vec<GraphNode>> {
    let node = GraphNode::Capability(name.to_string());
    if path.contains(&node) {
        path.push(node);
        return Some(path.clone());
    }
    path.push(node);

    if let Some(blueprint) = fork_edges.get(name) {
        let blueprint_node = GraphNode::Blueprint(blueprint.clone());
        if path.contains(&blueprint_node) {
            path.push(blueprint_node);
            return Some(path.clone());
        }
        path.push(blueprint_node);

        if let Some(preloads) = preload_edges.get(blueprint) {
            for preload in preloads {
                if let Some(cycle) = visit_capability(preload, fork_edges, preload_edges, path) {
                    return Some(cycle);
                }
            }
        }
        path.pop();
    }

    path.pop();
    None
}
