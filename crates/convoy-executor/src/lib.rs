//! Convoy Executor - Batch execution of deployment jobs
//!
//! Runs a set of [`BatchItem`]s in dependency order, invoking an injected
//! [`Deployer`] per item, and produces a [`BatchRunReport`].
//!
//! ## Scheduling
//!
//! - **Sequential**: items run one at a time in the order supplied (the
//!   resolver's order).
//! - **Parallel**: dependency waves are recomputed from `depends_on`;
//!   members of a wave are dispatched concurrently under a counting
//!   semaphore, and the next wave starts only when every dispatched member
//!   of the current wave is terminal.
//!
//! "Parallel" means concurrently scheduled tasks on the async runtime, not
//! multi-core execution; correctness never depends on true parallelism.
//!
//! ## Failure and Cancellation Semantics
//!
//! A failed item never aborts the batch; dependents are marked `Skipped`
//! with the blocking dependency recorded. Cancellation is cooperative: the
//! token is checked before every wave and every dispatch, and handed to
//! the deployer so in-flight calls can stop promptly. Cancelled is a
//! distinct terminal status, never conflated with failure.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use convoy_executor::{BatchExecutor, ExecutorConfig, NoOpDeployer};
//! use convoy_types::{BatchItem, CancelToken, SourceDescriptor};
//!
//! # async fn example() {
//! let items = vec![
//!     BatchItem::new("core", "core", SourceDescriptor::Directory {
//!         path: "contracts/core".into(),
//!     }),
//!     BatchItem::new("app", "app", SourceDescriptor::Directory {
//!         path: "contracts/app".into(),
//!     })
//!     .with_dependency("core"),
//! ];
//!
//! let executor = BatchExecutor::new(ExecutorConfig::default());
//! let _events = executor.subscribe();
//!
//! let report = executor
//!     .run(items, Arc::new(NoOpDeployer), CancelToken::new())
//!     .await
//!     .unwrap();
//! assert!(!report.has_failures());
//! # }
//! ```

#![deny(unsafe_code)]

pub mod deploy;
pub mod error;
pub mod executor;
pub mod progress;

// Re-export main types
pub use deploy::{DeployOutcome, Deployer, FailingDeployer, NoOpDeployer};
pub use error::{ExecutorError, Result};
pub use executor::{BatchExecutor, ExecutionMode, ExecutorConfig, MAX_CONCURRENCY};
pub use progress::{BatchEvent, ProgressTracker};

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use convoy_types::{
        BatchItem, CancelToken, ItemId, ItemStatus, SourceDescriptor,
    };
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    fn item(id: &str, deps: &[&str]) -> BatchItem {
        deps.iter().fold(
            BatchItem::new(
                id,
                id,
                SourceDescriptor::Directory {
                    path: format!("contracts/{id}").into(),
                },
            ),
            |i, d| i.with_dependency(*d),
        )
    }

    fn executor(mode: ExecutionMode, concurrency: usize) -> BatchExecutor {
        BatchExecutor::new(ExecutorConfig { mode, concurrency })
    }

    /// Records which items were deployed and with what outcome.
    struct RecordingDeployer {
        calls: Mutex<Vec<ItemId>>,
        outcomes: HashMap<ItemId, DeployOutcome>,
    }

    impl RecordingDeployer {
        fn new(outcomes: Vec<(&str, DeployOutcome)>) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                outcomes: outcomes
                    .into_iter()
                    .map(|(id, o)| (ItemId::new(id), o))
                    .collect(),
            }
        }

        fn calls(&self) -> Vec<ItemId> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Deployer for RecordingDeployer {
        async fn deploy(&self, item: &BatchItem, _cancel: &CancelToken) -> DeployOutcome {
            self.calls.lock().unwrap().push(item.id.clone());
            self.outcomes
                .get(&item.id)
                .cloned()
                .unwrap_or_else(DeployOutcome::succeeded)
        }
    }

    /// Tracks the maximum number of concurrently in-flight deploys.
    struct ConcurrencyProbe {
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl ConcurrencyProbe {
        fn new() -> Self {
            Self {
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Deployer for ConcurrencyProbe {
        async fn deploy(&self, _item: &BatchItem, _cancel: &CancelToken) -> DeployOutcome {
            let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(current, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(50)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            DeployOutcome::succeeded()
        }
    }

    /// Waits for cancellation before reporting it.
    struct BlockingDeployer;

    #[async_trait]
    impl Deployer for BlockingDeployer {
        async fn deploy(&self, _item: &BatchItem, cancel: &CancelToken) -> DeployOutcome {
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_secs(3600)) => {
                    DeployOutcome::succeeded()
                }
                _ = cancel.cancelled() => DeployOutcome::Cancelled,
            }
        }
    }

    #[tokio::test]
    async fn failed_dependency_skips_dependent_without_deploying() {
        let deployer = Arc::new(RecordingDeployer::new(vec![(
            "b",
            DeployOutcome::failed("deploy exploded"),
        )]));
        // Resolver order: b first, then its dependent a.
        let items = vec![item("b", &[]), item("a", &["b"])];

        let report = executor(ExecutionMode::Sequential, 1)
            .run(items, deployer.clone(), CancelToken::new())
            .await
            .unwrap();

        assert_eq!(report.status_of(&ItemId::new("b")), Some(ItemStatus::Failed));
        assert_eq!(report.status_of(&ItemId::new("a")), Some(ItemStatus::Skipped));
        assert_eq!(
            report.results[&ItemId::new("a")].skipped_due_to,
            Some(ItemId::new("b"))
        );

        let counts = report.counts();
        assert_eq!(counts.succeeded, 0);
        assert_eq!(counts.failed, 1);
        assert_eq!(counts.skipped, 1);

        // The dependent was never handed to the deployer.
        assert_eq!(deployer.calls(), vec![ItemId::new("b")]);
        assert!(report.has_failures());
    }

    #[tokio::test]
    async fn skip_propagates_in_parallel_mode() {
        let deployer = Arc::new(RecordingDeployer::new(vec![(
            "base",
            DeployOutcome::failed("boom"),
        )]));
        let items = vec![
            item("base", &[]),
            item("mid", &["base"]),
            item("top", &["mid"]),
        ];

        let report = executor(ExecutionMode::Parallel, 4)
            .run(items, deployer.clone(), CancelToken::new())
            .await
            .unwrap();

        assert_eq!(
            report.status_of(&ItemId::new("mid")),
            Some(ItemStatus::Skipped)
        );
        assert_eq!(
            report.status_of(&ItemId::new("top")),
            Some(ItemStatus::Skipped)
        );
        // Transitive skip records the direct blocker.
        assert_eq!(
            report.results[&ItemId::new("top")].skipped_due_to,
            Some(ItemId::new("mid"))
        );
        assert_eq!(deployer.calls(), vec![ItemId::new("base")]);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrency_bound_is_respected() {
        let probe = Arc::new(ConcurrencyProbe::new());
        let items = vec![
            item("a", &[]),
            item("b", &[]),
            item("c", &[]),
            item("d", &[]),
        ];

        let report = executor(ExecutionMode::Parallel, 2)
            .run(items, probe.clone(), CancelToken::new())
            .await
            .unwrap();

        assert_eq!(report.counts().succeeded, 4);
        assert_eq!(probe.max_in_flight.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn sequential_runs_in_given_order() {
        let deployer = Arc::new(RecordingDeployer::new(vec![]));
        let items = vec![item("c", &[]), item("b", &["c"]), item("a", &["b"])];

        let report = executor(ExecutionMode::Sequential, 1)
            .run(items, deployer.clone(), CancelToken::new())
            .await
            .unwrap();

        assert_eq!(report.counts().succeeded, 3);
        assert_eq!(
            deployer.calls(),
            vec![ItemId::new("c"), ItemId::new("b"), ItemId::new("a")]
        );
    }

    #[tokio::test]
    async fn parallel_waves_start_dependencies_first() {
        let deployer = Arc::new(RecordingDeployer::new(vec![]));
        // Submitted out of order; wave computation fixes it.
        let items = vec![item("app", &["lib"]), item("lib", &[])];

        let report = executor(ExecutionMode::Parallel, 4)
            .run(items, deployer.clone(), CancelToken::new())
            .await
            .unwrap();

        assert_eq!(report.counts().succeeded, 2);
        assert_eq!(deployer.calls(), vec![ItemId::new("lib"), ItemId::new("app")]);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_marks_pending_items_cancelled() {
        let items = vec![item("slow", &[]), item("later", &["slow"])];
        let cancel = CancelToken::new();
        let trigger = cancel.clone();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let report = executor(ExecutionMode::Parallel, 2)
            .run(items, Arc::new(BlockingDeployer), cancel)
            .await
            .unwrap();

        assert!(report.cancelled);
        // The in-flight item reported cancellation itself; the dependent
        // never started.
        assert_eq!(
            report.status_of(&ItemId::new("slow")),
            Some(ItemStatus::Cancelled)
        );
        assert_eq!(
            report.status_of(&ItemId::new("later")),
            Some(ItemStatus::Cancelled)
        );
        assert!(!report.has_failures());
    }

    #[tokio::test]
    async fn unknown_dependency_is_structural() {
        let err = executor(ExecutionMode::Parallel, 2)
            .run(
                vec![item("a", &["ghost"])],
                Arc::new(NoOpDeployer),
                CancelToken::new(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, ExecutorError::UnknownDependency { .. }));
    }

    #[tokio::test]
    async fn duplicate_item_is_structural() {
        let err = executor(ExecutionMode::Sequential, 1)
            .run(
                vec![item("a", &[]), item("a", &[])],
                Arc::new(NoOpDeployer),
                CancelToken::new(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, ExecutorError::DuplicateItem(_)));
    }

    #[tokio::test]
    async fn cyclic_items_fail_before_any_deploy() {
        let deployer = Arc::new(RecordingDeployer::new(vec![]));
        let err = executor(ExecutionMode::Parallel, 2)
            .run(
                vec![item("a", &["b"]), item("b", &["a"])],
                deployer.clone(),
                CancelToken::new(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, ExecutorError::CyclicDependencies { .. }));
        assert!(deployer.calls().is_empty());
    }

    #[tokio::test]
    async fn progress_events_are_monotonic() {
        let exec = executor(ExecutionMode::Parallel, 4);
        let mut events = exec.subscribe();
        let items = vec![
            item("a", &[]),
            item("b", &[]),
            item("c", &["a"]),
            item("d", &["b"]),
        ];

        exec.run(items, Arc::new(NoOpDeployer), CancelToken::new())
            .await
            .unwrap();

        let mut percents = Vec::new();
        let mut completed = false;
        while let Ok(event) = events.try_recv() {
            match event {
                BatchEvent::Progress { percent, .. } => percents.push(percent),
                BatchEvent::RunCompleted { cancelled, .. } => {
                    completed = true;
                    assert!(!cancelled);
                }
                _ => {}
            }
        }

        assert!(completed);
        // One aggregate event per transition: Running + terminal per item.
        assert_eq!(percents.len(), 8);
        assert!(percents.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(percents.last(), Some(&100));
    }
}
