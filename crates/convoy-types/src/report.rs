//! Run report types
//!
//! A BatchRunReport is produced once at run completion and immutable
//! thereafter.

use crate::{ItemId, ItemStatus, RunId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Final record for a single item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemResult {
    /// Terminal status
    pub status: ItemStatus,

    /// Error detail for failed items
    pub error: Option<String>,

    /// Dependency whose non-success caused this item to be skipped
    pub skipped_due_to: Option<ItemId>,

    /// Reference to the published artifact, when the deployer reported one
    pub artifact_ref: Option<String>,

    /// When the item reached its terminal status
    pub finished_at: chrono::DateTime<chrono::Utc>,
}

impl ItemResult {
    pub fn succeeded() -> Self {
        Self::terminal(ItemStatus::Succeeded)
    }

    pub fn succeeded_with(artifact_ref: impl Into<String>) -> Self {
        Self {
            artifact_ref: Some(artifact_ref.into()),
            ..Self::terminal(ItemStatus::Succeeded)
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::terminal(ItemStatus::Failed)
        }
    }

    pub fn skipped(due_to: ItemId) -> Self {
        Self {
            skipped_due_to: Some(due_to),
            ..Self::terminal(ItemStatus::Skipped)
        }
    }

    pub fn cancelled() -> Self {
        Self::terminal(ItemStatus::Cancelled)
    }

    fn terminal(status: ItemStatus) -> Self {
        Self {
            status,
            error: None,
            skipped_due_to: None,
            artifact_ref: None,
            finished_at: chrono::Utc::now(),
        }
    }
}

/// Counts of items by terminal status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub cancelled: usize,
}

/// Immutable record of a completed batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchRunReport {
    /// Run this report belongs to
    pub run_id: RunId,

    /// Terminal result per item
    pub results: BTreeMap<ItemId, ItemResult>,

    /// Whether cancellation was requested during the run
    pub cancelled: bool,

    /// Run start timestamp
    pub started_at: chrono::DateTime<chrono::Utc>,

    /// Run completion timestamp
    pub finished_at: chrono::DateTime<chrono::Utc>,
}

impl BatchRunReport {
    /// Count items by terminal status.
    pub fn counts(&self) -> StatusCounts {
        let mut counts = StatusCounts::default();
        for result in self.results.values() {
            match result.status {
                ItemStatus::Succeeded => counts.succeeded += 1,
                ItemStatus::Failed => counts.failed += 1,
                ItemStatus::Skipped => counts.skipped += 1,
                ItemStatus::Cancelled => counts.cancelled += 1,
                ItemStatus::Pending | ItemStatus::Running => {}
            }
        }
        counts
    }

    /// Whether any item failed.
    ///
    /// A reporting distinction, not a control-flow one: a failed item never
    /// aborts the batch.
    pub fn has_failures(&self) -> bool {
        self.results
            .values()
            .any(|r| r.status == ItemStatus::Failed)
    }

    /// Terminal status of a single item, if recorded.
    pub fn status_of(&self, id: &ItemId) -> Option<ItemStatus> {
        self.results.get(id).map(|r| r.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report_with(results: Vec<(&str, ItemResult)>) -> BatchRunReport {
        BatchRunReport {
            run_id: RunId::generate(),
            results: results
                .into_iter()
                .map(|(id, r)| (ItemId::new(id), r))
                .collect(),
            cancelled: false,
            started_at: chrono::Utc::now(),
            finished_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn counts_by_status() {
        let report = report_with(vec![
            ("a", ItemResult::succeeded()),
            ("b", ItemResult::failed("boom")),
            ("c", ItemResult::skipped(ItemId::new("b"))),
        ]);

        let counts = report.counts();
        assert_eq!(counts.succeeded, 1);
        assert_eq!(counts.failed, 1);
        assert_eq!(counts.skipped, 1);
        assert_eq!(counts.cancelled, 0);
        assert!(report.has_failures());
    }

    #[test]
    fn skip_records_cause() {
        let report = report_with(vec![("a", ItemResult::skipped(ItemId::new("dep")))]);
        let result = &report.results[&ItemId::new("a")];
        assert_eq!(result.skipped_due_to, Some(ItemId::new("dep")));
    }

    #[test]
    fn report_serializes_for_hosts() {
        let report = report_with(vec![("a", ItemResult::succeeded_with("0xabc123"))]);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["results"]["a"]["status"], "Succeeded");
        assert_eq!(json["results"]["a"]["artifact_ref"], "0xabc123");
        assert_eq!(json["cancelled"], false);
    }
}
