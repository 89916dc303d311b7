//! Batch item types
//!
//! A BatchItem is one unit of deployment work, constructed by the host from
//! a ResolutionResult before a run starts and immutable during the run.

use crate::ItemId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::PathBuf;

/// Where the deployable content for an item comes from.
///
/// The discriminant is consumed by the injected deploy operation, never by
/// the executor itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceDescriptor {
    /// A local package directory to build and then deploy
    Directory {
        /// Package root containing the manifest
        path: PathBuf,
    },

    /// A prebuilt artifact to deploy directly
    Artifact {
        /// Path to the built artifact
        path: PathBuf,
    },
}

/// One unit of deployment work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchItem {
    /// Unique item identifier
    pub id: ItemId,

    /// Human-readable name
    pub name: String,

    /// Deployable content
    pub source: SourceDescriptor,

    /// Items that must succeed before this one may start
    pub depends_on: BTreeSet<ItemId>,
}

impl BatchItem {
    /// Create an item with no dependencies.
    pub fn new(id: impl Into<ItemId>, name: impl Into<String>, source: SourceDescriptor) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            source,
            depends_on: BTreeSet::new(),
        }
    }

    /// Add a dependency on another item.
    pub fn with_dependency(mut self, id: impl Into<ItemId>) -> Self {
        self.depends_on.insert(id.into());
        self
    }
}

/// Per-item lifecycle status.
///
/// Transitions: `Pending -> Running -> {Succeeded | Failed}`;
/// `Pending -> Skipped` when a dependency ends in a non-success state;
/// `Pending -> Cancelled` when the run is cancelled before the item starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemStatus {
    /// Not yet started
    Pending,

    /// Deploy operation in flight
    Running,

    /// Deploy operation completed successfully
    Succeeded,

    /// Deploy operation completed with an error
    Failed,

    /// Deliberately not attempted because a dependency did not succeed
    Skipped,

    /// Run was cancelled before this item started
    Cancelled,
}

impl ItemStatus {
    /// Whether this status is terminal for the run.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ItemStatus::Pending | ItemStatus::Running)
    }
}

impl std::fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ItemStatus::Pending => "pending",
            ItemStatus::Running => "running",
            ItemStatus::Succeeded => "succeeded",
            ItemStatus::Failed => "failed",
            ItemStatus::Skipped => "skipped",
            ItemStatus::Cancelled => "cancelled",
        };
        write!(f, "{s}")
    }
}
