//! Dependency graph construction
//!
//! Edges mean *from requires to to complete first*. Edges only ever
//! reference scanned nodes; a declared name that matches nothing local is
//! simply not an edge.

use crate::error::{ResolveError, Result};
use convoy_types::{ManifestNode, NodeId};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::debug;

/// Directed dependency graph over scanned manifest nodes.
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    /// Nodes in original scan order
    nodes: Vec<NodeId>,

    /// from -> set of nodes it requires
    requires: BTreeMap<NodeId, BTreeSet<NodeId>>,
}

impl DependencyGraph {
    /// Build the graph from scanned manifests.
    ///
    /// A declared dependency name is matched against every *other* node's
    /// id and name. A name matching the declaring node itself is a
    /// self-edge and rejected; duplicate node ids are rejected.
    pub fn build(manifests: &[ManifestNode]) -> Result<Self> {
        let mut nodes = Vec::with_capacity(manifests.len());
        let mut by_key: HashMap<&str, &NodeId> = HashMap::new();

        for manifest in manifests {
            if nodes.contains(&manifest.id) {
                return Err(ResolveError::DuplicateNode(manifest.id.clone()));
            }
            nodes.push(manifest.id.clone());
            by_key.insert(manifest.id.as_str(), &manifest.id);
        }
        // Name keys never shadow id keys; ids are the stable identity.
        for manifest in manifests {
            by_key.entry(manifest.name.as_str()).or_insert(&manifest.id);
        }

        let mut requires: BTreeMap<NodeId, BTreeSet<NodeId>> = BTreeMap::new();
        for manifest in manifests {
            let deps = requires.entry(manifest.id.clone()).or_default();
            for declared in &manifest.declared_dependencies {
                match by_key.get(declared.as_str()) {
                    Some(target) if **target == manifest.id => {
                        return Err(ResolveError::SelfDependency(manifest.id.clone()));
                    }
                    Some(target) => {
                        deps.insert((*target).clone());
                    }
                    None => {
                        // External or third-party dependency; not an edge
                        debug!(
                            node = %manifest.id,
                            dependency = %declared,
                            "Declared dependency matches no scanned package"
                        );
                    }
                }
            }
        }

        Ok(Self { nodes, requires })
    }

    /// Nodes in original scan order.
    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes that `id` requires to complete first.
    pub fn requires(&self, id: &NodeId) -> impl Iterator<Item = &NodeId> {
        self.requires.get(id).into_iter().flatten()
    }

    /// All edges as `(from, to)` pairs.
    pub fn edges(&self) -> impl Iterator<Item = (&NodeId, &NodeId)> {
        self.requires
            .iter()
            .flat_map(|(from, tos)| tos.iter().map(move |to| (from, to)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: &str, deps: &[&str]) -> ManifestNode {
        deps.iter().fold(ManifestNode::new(id, id), |n, d| {
            n.with_dependency(*d)
        })
    }

    #[test]
    fn external_dependencies_are_not_edges() {
        let graph = DependencyGraph::build(&[
            node("a", &["b", "some-registry-crate"]),
            node("b", &[]),
        ])
        .unwrap();

        assert_eq!(graph.edges().count(), 1);
        assert_eq!(
            graph.requires(&NodeId::new("a")).collect::<Vec<_>>(),
            vec![&NodeId::new("b")]
        );
    }

    #[test]
    fn matches_by_name_as_well_as_id() {
        let manifests = vec![
            ManifestNode::new("pkgs/core/Manifest.toml", "core"),
            node("app", &["core"]),
        ];
        let graph = DependencyGraph::build(&manifests).unwrap();

        assert_eq!(
            graph.requires(&NodeId::new("app")).collect::<Vec<_>>(),
            vec![&NodeId::new("pkgs/core/Manifest.toml")]
        );
    }

    #[test]
    fn self_dependency_is_rejected() {
        let err = DependencyGraph::build(&[node("a", &["a"])]).unwrap_err();
        assert!(matches!(err, ResolveError::SelfDependency(_)));
    }

    #[test]
    fn duplicate_node_is_rejected() {
        let err = DependencyGraph::build(&[node("a", &[]), node("a", &[])]).unwrap_err();
        assert!(matches!(err, ResolveError::DuplicateNode(_)));
    }
}
