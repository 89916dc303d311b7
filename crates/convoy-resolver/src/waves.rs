//! Topological ordering and parallel-safe waves
//!
//! Kahn's algorithm, extracted wave by wave: every node whose remaining
//! requirements are all satisfied joins the current wave, the wave's edges
//! are removed, repeat. Members of a wave may run concurrently; `order` is
//! the waves flattened.

use crate::cycle::find_cycles;
use crate::error::Result;
use crate::graph::DependencyGraph;
use convoy_types::{ManifestNode, NodeId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// Outcome of dependency resolution.
///
/// `order` and `waves` are populated only when `cycles` is empty, and are
/// mutually consistent: `order` is the concatenation of `waves`, with
/// original scan order as the tie-break inside each wave.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolutionResult {
    /// Topological execution order
    pub order: Vec<NodeId>,

    /// Parallel-safe waves, each fully satisfied by strictly earlier waves
    pub waves: Vec<Vec<NodeId>>,

    /// Minimal closed cycles; non-empty means resolution failed closed
    pub cycles: Vec<Vec<NodeId>>,
}

impl ResolutionResult {
    /// Whether an execution order was produced.
    pub fn is_resolvable(&self) -> bool {
        self.cycles.is_empty()
    }
}

/// Resolve scanned manifests into an execution order.
pub fn resolve(manifests: &[ManifestNode]) -> Result<ResolutionResult> {
    let graph = DependencyGraph::build(manifests)?;
    Ok(resolve_graph(&graph))
}

/// Resolve an already-built graph into an execution order.
///
/// Fails closed on cycles: all discovered cycles are returned and no
/// partial order is produced.
pub fn resolve_graph(graph: &DependencyGraph) -> ResolutionResult {
    let cycles = find_cycles(graph);
    if !cycles.is_empty() {
        debug!(cycles = cycles.len(), "Resolution failed closed on cycles");
        return ResolutionResult {
            order: Vec::new(),
            waves: Vec::new(),
            cycles,
        };
    }

    let mut remaining: HashMap<&NodeId, usize> = graph
        .nodes()
        .iter()
        .map(|n| (n, graph.requires(n).count()))
        .collect();

    let mut waves: Vec<Vec<NodeId>> = Vec::new();
    let mut placed = 0;

    while placed < graph.len() {
        // Scan order keeps wave membership deterministic.
        let wave: Vec<NodeId> = graph
            .nodes()
            .iter()
            .filter(|n| remaining.get(*n) == Some(&0))
            .cloned()
            .collect();

        debug_assert!(!wave.is_empty(), "acyclic graph must always yield a wave");

        for member in &wave {
            remaining.remove(member);
        }
        for node in graph.nodes() {
            if let Some(count) = remaining.get_mut(node) {
                let satisfied = graph.requires(node).filter(|d| wave.contains(*d)).count();
                *count -= satisfied;
            }
        }

        placed += wave.len();
        waves.push(wave);
    }

    let order: Vec<NodeId> = waves.iter().flatten().cloned().collect();
    ResolutionResult {
        order,
        waves,
        cycles: Vec::new(),
    }
}
