//! Resolver error types

use convoy_types::NodeId;
use thiserror::Error;

/// Resolver errors
///
/// These are structural input errors, reported before any execution begins.
/// Cycles are not errors at this level: they are data on the
/// `ResolutionResult` so the caller can report every cycle at once.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("Duplicate node id: {0}")]
    DuplicateNode(NodeId),

    #[error("Node {0} declares a dependency on itself")]
    SelfDependency(NodeId),
}

/// Result type for resolver operations
pub type Result<T> = std::result::Result<T, ResolveError>;
