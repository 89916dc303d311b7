//! Batch executor
//!
//! Runs a set of deployment jobs in dependency order, sequentially or in
//! parallel waves under a bounded semaphore. A failed item never aborts
//! the batch; it only propagates `Skipped` to its dependents. Cancellation
//! is cooperative: checked before every wave and every dispatch, and
//! passed through to the deployer for in-flight work.

use crate::deploy::{DeployOutcome, Deployer};
use crate::error::{ExecutorError, Result};
use crate::progress::{BatchEvent, ProgressTracker};
use convoy_types::{
    BatchItem, BatchRunReport, CancelToken, ItemId, ItemResult, ItemStatus, ManifestNode, RunId,
};
use dashmap::DashMap;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{broadcast, Semaphore};
use tracing::{info, instrument, warn};

/// Upper bound on parallel-mode concurrency.
pub const MAX_CONCURRENCY: usize = 10;

/// How the batch is scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    /// One item at a time, in the order given
    Sequential,

    /// Dependency waves, members dispatched concurrently
    Parallel,
}

/// Executor configuration.
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Scheduling mode
    pub mode: ExecutionMode,

    /// Concurrent deploys in parallel mode, clamped to 1..=10
    pub concurrency: usize,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            mode: ExecutionMode::Parallel,
            concurrency: 4,
        }
    }
}

/// Batch executor for deployment jobs.
pub struct BatchExecutor {
    config: ExecutorConfig,
    event_tx: broadcast::Sender<BatchEvent>,
}

/// Shared per-run state: terminal results plus progress aggregation.
struct RunState {
    results: DashMap<ItemId, ItemResult>,
    tracker: ProgressTracker,
}

impl RunState {
    /// Record a terminal result and emit the matching events.
    fn record(&self, id: &ItemId, result: ItemResult) {
        let status = result.status;
        let error = result.error.clone();
        self.results.insert(id.clone(), result);
        self.tracker.transition(id, status, error);
    }

    /// First dependency of `item` that has not succeeded, if any.
    fn first_unmet(&self, item: &BatchItem) -> Option<ItemId> {
        item.depends_on
            .iter()
            .find(|dep| {
                self.results.get(*dep).map(|r| r.status) != Some(ItemStatus::Succeeded)
            })
            .cloned()
    }
}

impl BatchExecutor {
    pub fn new(config: ExecutorConfig) -> Self {
        let (event_tx, _) = broadcast::channel(1024);
        Self { config, event_tx }
    }

    /// Subscribe to run events.
    pub fn subscribe(&self) -> broadcast::Receiver<BatchEvent> {
        self.event_tx.subscribe()
    }

    /// Run a batch to completion and produce its report.
    ///
    /// Items must arrive in resolver order for sequential mode; parallel
    /// mode recomputes waves from `depends_on`. Structural problems with
    /// the item graph (duplicates, unknown dependencies, cycles) are
    /// reported as errors before any deploy is attempted.
    #[instrument(skip_all, fields(items = items.len(), mode = ?self.config.mode))]
    pub async fn run(
        &self,
        items: Vec<BatchItem>,
        deployer: Arc<dyn Deployer>,
        cancel: CancelToken,
    ) -> Result<BatchRunReport> {
        validate(&items)?;
        // Structural problems must surface before any event or deploy.
        let waves = match self.config.mode {
            ExecutionMode::Parallel => Some(compute_waves(&items)?),
            ExecutionMode::Sequential => None,
        };

        let run_id = RunId::generate();
        let started_at = chrono::Utc::now();
        let state = Arc::new(RunState {
            results: DashMap::new(),
            tracker: ProgressTracker::new(run_id, items.len(), self.event_tx.clone()),
        });

        info!(run_id = %run_id, total = items.len(), "Batch run started");
        let _ = self.event_tx.send(BatchEvent::RunStarted {
            run_id,
            total: items.len(),
        });

        match waves {
            None => {
                self.run_sequential(&items, &deployer, &cancel, &state).await;
            }
            Some(waves) => {
                self.run_parallel(run_id, &items, waves, &deployer, &cancel, &state)
                    .await;
            }
        }

        // Anything still unrecorded never got dispatched (cancellation or
        // an aborted task).
        for item in &items {
            if !state.results.contains_key(&item.id) {
                let result = if cancel.is_cancelled() {
                    ItemResult::cancelled()
                } else {
                    warn!(item_id = %item.id, "Item never reached a terminal status");
                    ItemResult::failed("deploy task aborted")
                };
                state.record(&item.id, result);
            }
        }

        let cancelled = cancel.is_cancelled();
        let report = BatchRunReport {
            run_id,
            results: state
                .results
                .iter()
                .map(|entry| (entry.key().clone(), entry.value().clone()))
                .collect::<BTreeMap<_, _>>(),
            cancelled,
            started_at,
            finished_at: chrono::Utc::now(),
        };

        info!(
            run_id = %run_id,
            cancelled,
            succeeded = report.counts().succeeded,
            failed = report.counts().failed,
            skipped = report.counts().skipped,
            "Batch run completed"
        );
        let _ = self
            .event_tx
            .send(BatchEvent::RunCompleted { run_id, cancelled });

        Ok(report)
    }

    /// Sequential mode: one item at a time in the order given.
    async fn run_sequential(
        &self,
        items: &[BatchItem],
        deployer: &Arc<dyn Deployer>,
        cancel: &CancelToken,
        state: &Arc<RunState>,
    ) {
        for item in items {
            if cancel.is_cancelled() {
                state.record(&item.id, ItemResult::cancelled());
                continue;
            }

            if let Some(blocker) = state.first_unmet(item) {
                state.record(&item.id, ItemResult::skipped(blocker));
                continue;
            }

            state.tracker.transition(&item.id, ItemStatus::Running, None);
            let outcome = deployer.deploy(item, cancel).await;
            state.record(&item.id, outcome_result(outcome));
        }
    }

    /// Parallel mode: waves recomputed from `depends_on`, members
    /// dispatched concurrently under the semaphore, full barrier between
    /// waves.
    async fn run_parallel(
        &self,
        run_id: RunId,
        items: &[BatchItem],
        waves: Vec<Vec<ItemId>>,
        deployer: &Arc<dyn Deployer>,
        cancel: &CancelToken,
        state: &Arc<RunState>,
    ) {
        let by_id: HashMap<&ItemId, &BatchItem> =
            items.iter().map(|item| (&item.id, item)).collect();

        let concurrency = self.config.concurrency.clamp(1, MAX_CONCURRENCY);
        if concurrency != self.config.concurrency {
            warn!(
                requested = self.config.concurrency,
                effective = concurrency,
                "Concurrency out of bounds, clamped"
            );
        }
        let semaphore = Arc::new(Semaphore::new(concurrency));

        for (index, wave) in waves.iter().enumerate() {
            if cancel.is_cancelled() {
                break;
            }

            let _ = self.event_tx.send(BatchEvent::WaveStarted {
                run_id,
                index,
                size: wave.len(),
            });

            let mut handles = Vec::new();
            for id in wave {
                let item = by_id[id];

                if cancel.is_cancelled() {
                    state.record(&item.id, ItemResult::cancelled());
                    continue;
                }

                // Dependencies are terminal by the wave barrier; anything
                // short of success skips the dependent without dispatch.
                if let Some(blocker) = state.first_unmet(item) {
                    state.record(&item.id, ItemResult::skipped(blocker));
                    continue;
                }

                let item = item.clone();
                let deployer = Arc::clone(deployer);
                let cancel = cancel.clone();
                let state = Arc::clone(state);
                let semaphore = Arc::clone(&semaphore);

                handles.push(tokio::spawn(async move {
                    let _permit = semaphore
                        .acquire_owned()
                        .await
                        .expect("run semaphore closed");

                    if cancel.is_cancelled() {
                        state.record(&item.id, ItemResult::cancelled());
                        return;
                    }

                    state.tracker.transition(&item.id, ItemStatus::Running, None);
                    let outcome = deployer.deploy(&item, &cancel).await;
                    state.record(&item.id, outcome_result(outcome));
                }));
            }

            // Wave barrier: the next wave's membership assumes these are
            // all terminal.
            for joined in futures::future::join_all(handles).await {
                if let Err(join_error) = joined {
                    warn!(error = %join_error, "Deploy task aborted");
                }
            }
        }
    }
}

/// Map a deploy outcome to the item's terminal result.
fn outcome_result(outcome: DeployOutcome) -> ItemResult {
    match outcome {
        DeployOutcome::Succeeded {
            artifact_ref: Some(artifact_ref),
        } => ItemResult::succeeded_with(artifact_ref),
        DeployOutcome::Succeeded { artifact_ref: None } => ItemResult::succeeded(),
        DeployOutcome::Failed { error } => ItemResult::failed(error),
        DeployOutcome::Cancelled => ItemResult::cancelled(),
    }
}

/// Reject duplicate ids and references to items outside the batch.
fn validate(items: &[BatchItem]) -> Result<()> {
    let mut seen = HashSet::new();
    for item in items {
        if !seen.insert(&item.id) {
            return Err(ExecutorError::DuplicateItem(item.id.clone()));
        }
    }
    for item in items {
        for dep in &item.depends_on {
            if !seen.contains(dep) {
                return Err(ExecutorError::UnknownDependency {
                    item: item.id.clone(),
                    dependency: dep.clone(),
                });
            }
        }
    }
    Ok(())
}

/// Recompute dependency waves from the items' `depends_on` sets.
fn compute_waves(items: &[BatchItem]) -> Result<Vec<Vec<ItemId>>> {
    let manifests: Vec<ManifestNode> = items
        .iter()
        .map(|item| {
            item.depends_on.iter().fold(
                // Name mirrors the id so only exact item ids form edges.
                ManifestNode::new(item.id.as_str(), item.id.as_str()),
                |node, dep| node.with_dependency(dep.as_str()),
            )
        })
        .collect();

    let resolution = convoy_resolver::resolve(&manifests)?;
    if !resolution.is_resolvable() {
        return Err(ExecutorError::CyclicDependencies {
            cycles: resolution.cycles,
        });
    }

    Ok(resolution
        .waves
        .into_iter()
        .map(|wave| wave.into_iter().map(|n| ItemId::new(n.as_str())).collect())
        .collect())
}
