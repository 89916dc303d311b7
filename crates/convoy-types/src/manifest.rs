//! Manifest types produced by the (out-of-scope) manifest scanner
//!
//! A ManifestNode describes one deployable package. Declared dependency
//! names reference other *local* packages by name; external library
//! dependencies carry no meaning for the resolver and simply never match.

use crate::NodeId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// One deployable package discovered by a manifest scan.
///
/// Immutable for the duration of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestNode {
    /// Stable identifier, e.g. the manifest path
    pub id: NodeId,

    /// Package name as declared in the manifest
    pub name: String,

    /// Names of packages this one requires to exist before it is built
    pub declared_dependencies: BTreeSet<String>,
}

impl ManifestNode {
    /// Create a node with no declared dependencies.
    pub fn new(id: impl Into<NodeId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            declared_dependencies: BTreeSet::new(),
        }
    }

    /// Add a declared dependency name.
    pub fn with_dependency(mut self, name: impl Into<String>) -> Self {
        self.declared_dependencies.insert(name.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_accumulates_dependencies() {
        let node = ManifestNode::new(NodeId::new("a"), "a")
            .with_dependency("b")
            .with_dependency("c")
            .with_dependency("b");

        assert_eq!(node.declared_dependencies.len(), 2);
    }
}
