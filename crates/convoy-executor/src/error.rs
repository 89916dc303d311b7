//! Executor error types
//!
//! Only structural problems with the submitted item graph surface as
//! errors from the executor entry point. Item-level deployment failures
//! are captured in the run report, never thrown.

use convoy_resolver::ResolveError;
use convoy_types::{ItemId, NodeId};
use thiserror::Error;

/// Executor errors
#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("Duplicate item id: {0}")]
    DuplicateItem(ItemId),

    #[error("Item {item} depends on unknown item {dependency}")]
    UnknownDependency {
        /// The declaring item
        item: ItemId,
        /// The missing dependency
        dependency: ItemId,
    },

    #[error("Item graph contains dependency cycles: {}", format_cycles(.cycles))]
    CyclicDependencies {
        /// Minimal closed cycles found in the item graph
        cycles: Vec<Vec<NodeId>>,
    },

    #[error(transparent)]
    Resolve(#[from] ResolveError),
}

fn format_cycles(cycles: &[Vec<NodeId>]) -> String {
    cycles
        .iter()
        .map(|cycle| {
            cycle
                .iter()
                .map(|n| n.as_str())
                .collect::<Vec<_>>()
                .join(" -> ")
        })
        .collect::<Vec<_>>()
        .join("; ")
}

/// Result type for executor operations
pub type Result<T> = std::result::Result<T, ExecutorError>;
