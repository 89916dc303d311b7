//! Deployer trait and outcomes
//!
//! The actual build+deploy of one item (process invocation or RPC) is an
//! injected collaborator. The executor only schedules; the deployer
//! interprets the item's [`SourceDescriptor`] and must honor the
//! cancellation token for in-flight work.
//!
//! [`SourceDescriptor`]: convoy_types::SourceDescriptor

use async_trait::async_trait;
use convoy_types::{BatchItem, CancelToken, ItemId};
use std::collections::HashSet;
use tracing::debug;

/// Outcome of deploying one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeployOutcome {
    /// Deploy completed; `artifact_ref` identifies what was published
    Succeeded { artifact_ref: Option<String> },

    /// Deploy failed with an error
    Failed { error: String },

    /// Deploy observed the cancellation signal and stopped
    Cancelled,
}

impl DeployOutcome {
    pub fn succeeded() -> Self {
        Self::Succeeded { artifact_ref: None }
    }

    pub fn succeeded_with(artifact_ref: impl Into<String>) -> Self {
        Self::Succeeded {
            artifact_ref: Some(artifact_ref.into()),
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self::Failed {
            error: error.into(),
        }
    }
}

/// Deploys one batch item.
#[async_trait]
pub trait Deployer: Send + Sync {
    /// Perform the build+deploy for `item`.
    ///
    /// Must respect `cancel` and return promptly when signaled.
    async fn deploy(&self, item: &BatchItem, cancel: &CancelToken) -> DeployOutcome;
}

/// Deployer that succeeds every item without doing anything.
pub struct NoOpDeployer;

#[async_trait]
impl Deployer for NoOpDeployer {
    async fn deploy(&self, item: &BatchItem, _cancel: &CancelToken) -> DeployOutcome {
        debug!(item_id = %item.id, "No-op deploying item");
        DeployOutcome::succeeded()
    }
}

/// Deployer that fails a configured set of items.
pub struct FailingDeployer {
    fail_ids: HashSet<ItemId>,
}

impl FailingDeployer {
    /// Create a deployer that fails exactly the given items.
    pub fn new(fail_ids: impl IntoIterator<Item = ItemId>) -> Self {
        Self {
            fail_ids: fail_ids.into_iter().collect(),
        }
    }
}

#[async_trait]
impl Deployer for FailingDeployer {
    async fn deploy(&self, item: &BatchItem, _cancel: &CancelToken) -> DeployOutcome {
        if self.fail_ids.contains(&item.id) {
            DeployOutcome::failed(format!("Simulated failure for {}", item.id))
        } else {
            DeployOutcome::succeeded()
        }
    }
}
