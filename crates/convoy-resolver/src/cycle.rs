//! Cycle detection over the dependency graph
//!
//! Depth-first traversal with three-color marking: unvisited, on the
//! current DFS stack, done. A back-edge to an on-stack node yields a cycle,
//! reconstructed by walking the stack from the back-edge target to the top
//! and closing with the target again.

use crate::graph::DependencyGraph;
use convoy_types::NodeId;
use std::collections::HashSet;

/// Find all dependency cycles.
///
/// Each returned cycle is minimal and closed: the first node is repeated at
/// the end, e.g. `[x, y, x]`. Cycles reachable from multiple roots are
/// reported once.
pub fn find_cycles(graph: &DependencyGraph) -> Vec<Vec<NodeId>> {
    let mut visited = HashSet::new();
    let mut cycles = Vec::new();
    let mut seen_cycles = HashSet::new();

    for node in graph.nodes() {
        if !visited.contains(node) {
            let mut on_stack = HashSet::new();
            let mut stack = Vec::new();
            dfs(
                graph,
                node,
                &mut visited,
                &mut on_stack,
                &mut stack,
                &mut cycles,
                &mut seen_cycles,
            );
        }
    }

    cycles
}

fn dfs(
    graph: &DependencyGraph,
    node: &NodeId,
    visited: &mut HashSet<NodeId>,
    on_stack: &mut HashSet<NodeId>,
    stack: &mut Vec<NodeId>,
    cycles: &mut Vec<Vec<NodeId>>,
    seen_cycles: &mut HashSet<Vec<NodeId>>,
) {
    visited.insert(node.clone());
    on_stack.insert(node.clone());
    stack.push(node.clone());

    for dep in graph.requires(node) {
        if on_stack.contains(dep) {
            let cycle = reconstruct(stack, dep);
            if seen_cycles.insert(normalize(&cycle)) {
                cycles.push(cycle);
            }
        } else if !visited.contains(dep) {
            dfs(graph, dep, visited, on_stack, stack, cycles, seen_cycles);
        }
    }

    stack.pop();
    on_stack.remove(node);
}

/// Walk the DFS stack from the back-edge target to the top, then close the
/// loop by appending the target again.
fn reconstruct(stack: &[NodeId], target: &NodeId) -> Vec<NodeId> {
    let start = stack
        .iter()
        .position(|n| n == target)
        .expect("back-edge target must be on the stack");

    let mut cycle: Vec<NodeId> = stack[start..].to_vec();
    cycle.push(target.clone());
    cycle
}

/// Canonical key for a closed cycle: drop the closing repeat and rotate the
/// smallest node to the front, so the same loop found from different entry
/// points deduplicates.
fn normalize(cycle: &[NodeId]) -> Vec<NodeId> {
    let body = &cycle[..cycle.len() - 1];
    let min_pos = body
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| a.cmp(b))
        .map(|(i, _)| i)
        .unwrap_or(0);

    let mut rotated = Vec::with_capacity(body.len());
    rotated.extend_from_slice(&body[min_pos..]);
    rotated.extend_from_slice(&body[..min_pos]);
    rotated
}
