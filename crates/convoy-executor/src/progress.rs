//! Progress events and aggregate tracking
//!
//! Every item status transition emits an event, followed by an aggregate
//! `{done, total}` update. Aggregate percentages are monotonically
//! non-decreasing for a run; the clamp lives here so host-specific
//! incremental-progress adapters never have to re-implement it.

use convoy_types::{ItemId, ItemStatus, RunId};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::broadcast;
use tracing::info;

/// Events emitted during a batch run.
#[derive(Debug, Clone)]
pub enum BatchEvent {
    /// Run accepted and starting.
    RunStarted { run_id: RunId, total: usize },

    /// A parallel wave is being dispatched.
    WaveStarted {
        run_id: RunId,
        index: usize,
        size: usize,
    },

    /// An item changed status.
    ItemStatusChanged {
        run_id: RunId,
        item_id: ItemId,
        status: ItemStatus,
        error: Option<String>,
    },

    /// Aggregate progress after a status transition.
    Progress {
        run_id: RunId,
        done: usize,
        total: usize,
        /// Monotonically non-decreasing within a run
        percent: u8,
    },

    /// Run finished; the report carries the details.
    RunCompleted { run_id: RunId, cancelled: bool },
}

/// Per-run aggregate progress with a monotonic percentage.
pub struct ProgressTracker {
    run_id: RunId,
    total: usize,
    done: AtomicUsize,
    last_percent: AtomicUsize,
    event_tx: broadcast::Sender<BatchEvent>,
}

impl ProgressTracker {
    pub fn new(run_id: RunId, total: usize, event_tx: broadcast::Sender<BatchEvent>) -> Self {
        Self {
            run_id,
            total,
            done: AtomicUsize::new(0),
            last_percent: AtomicUsize::new(0),
            event_tx,
        }
    }

    /// Record a status transition for an item.
    ///
    /// Every transition is followed by an aggregate `Progress` event;
    /// terminal transitions bump the done count first. The percentage is
    /// clamped so it never decreases within the run.
    pub fn transition(&self, item_id: &ItemId, status: ItemStatus, error: Option<String>) {
        info!(item_id = %item_id, status = %status, "Item status changed");
        let _ = self.event_tx.send(BatchEvent::ItemStatusChanged {
            run_id: self.run_id,
            item_id: item_id.clone(),
            status,
            error,
        });

        let done = if status.is_terminal() {
            self.done.fetch_add(1, Ordering::SeqCst) + 1
        } else {
            self.done.load(Ordering::SeqCst)
        };
        let percent = self.clamped_percent(done);
        let _ = self.event_tx.send(BatchEvent::Progress {
            run_id: self.run_id,
            done,
            total: self.total,
            percent,
        });
    }

    /// Items that have reached a terminal status.
    pub fn done(&self) -> usize {
        self.done.load(Ordering::SeqCst)
    }

    /// Percentage for `done` items, never less than a previously reported
    /// value.
    fn clamped_percent(&self, done: usize) -> u8 {
        let raw = if self.total == 0 {
            100
        } else {
            (done * 100 / self.total).min(100)
        };
        let previous = self.last_percent.fetch_max(raw, Ordering::SeqCst);
        previous.max(raw) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain_percents(rx: &mut broadcast::Receiver<BatchEvent>) -> Vec<u8> {
        let mut percents = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let BatchEvent::Progress { percent, .. } = event {
                percents.push(percent);
            }
        }
        percents
    }

    #[test]
    fn percentages_are_monotonic() {
        let (tx, mut rx) = broadcast::channel(64);
        let tracker = ProgressTracker::new(RunId::generate(), 3, tx);

        tracker.transition(&ItemId::new("a"), ItemStatus::Succeeded, None);
        tracker.transition(&ItemId::new("b"), ItemStatus::Failed, Some("x".into()));
        tracker.transition(&ItemId::new("c"), ItemStatus::Skipped, None);

        let percents = drain_percents(&mut rx);
        assert_eq!(percents, vec![33, 66, 100]);
        assert!(percents.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn non_terminal_transitions_do_not_advance_done() {
        let (tx, mut rx) = broadcast::channel(64);
        let tracker = ProgressTracker::new(RunId::generate(), 2, tx);

        tracker.transition(&ItemId::new("a"), ItemStatus::Running, None);
        assert_eq!(drain_percents(&mut rx), vec![0]);
        assert_eq!(tracker.done(), 0);

        tracker.transition(&ItemId::new("a"), ItemStatus::Succeeded, None);
        assert_eq!(drain_percents(&mut rx), vec![50]);
        assert_eq!(tracker.done(), 1);
    }

    #[test]
    fn empty_run_reports_full_progress() {
        let (tx, _rx) = broadcast::channel(64);
        let tracker = ProgressTracker::new(RunId::generate(), 0, tx);
        assert_eq!(tracker.clamped_percent(0), 100);
    }
}
