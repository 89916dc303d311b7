//! Manifest source contract
//!
//! Scanning a workspace for manifests (parsing build-configuration files)
//! belongs to the host; the resolver only consumes the scanned nodes. The
//! contract makes no network or process calls.

use convoy_types::ManifestNode;
use std::path::Path;

/// Supplies scanned manifest nodes for a root search path.
pub trait ManifestSource: Send + Sync {
    /// Scan `root` and return one node per deployable package, in scan
    /// order. Scan order is the resolver's tie-break, so implementations
    /// should return a deterministic order.
    fn scan(&self, root: &Path) -> Vec<ManifestNode>;
}

/// Fixed in-memory source for hosts and tests.
pub struct StaticManifestSource {
    manifests: Vec<ManifestNode>,
}

impl StaticManifestSource {
    pub fn new(manifests: Vec<ManifestNode>) -> Self {
        Self { manifests }
    }
}

impl ManifestSource for StaticManifestSource {
    fn scan(&self, _root: &Path) -> Vec<ManifestNode> {
        self.manifests.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve;
    use convoy_types::NodeId;

    #[test]
    fn static_source_feeds_resolution() {
        let source = StaticManifestSource::new(vec![
            ManifestNode::new("lib", "lib"),
            ManifestNode::new("app", "app").with_dependency("lib"),
        ]);

        let manifests = source.scan(Path::new("."));
        let resolution = resolve(&manifests).unwrap();
        assert_eq!(resolution.order, vec![NodeId::new("lib"), NodeId::new("app")]);
    }
}
