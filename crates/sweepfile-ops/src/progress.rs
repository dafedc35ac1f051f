//! Progress reporting types for deletion runs.

use serde::{Deserialize, Serialize};

use sweepfile_core::DeletionOutcome;

/// Progress information for an ongoing deletion run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationProgress {
    /// Number of targets attempted so far.
    pub items_completed: usize,
    /// Total number of targets.
    pub items_total: usize,
    /// Targets removed so far.
    pub deleted: usize,
    /// Targets that could not be removed so far.
    pub failed: usize,
    /// Bytes freed so far.
    pub bytes_freed: u64,
    /// Bytes that would be freed if every target is removed.
    pub bytes_total: u64,
    /// The target currently being removed.
    pub current: Option<String>,
}

impl OperationProgress {
    /// Create a new progress tracker for a run.
    pub fn new(items_total: usize, bytes_total: u64) -> Self {
        Self {
            items_completed: 0,
            items_total,
            deleted: 0,
            failed: 0,
            bytes_freed: 0,
            bytes_total,
            current: None,
        }
    }

    /// Get the progress as a percentage (0.0 to 100.0).
    pub fn percentage(&self) -> f64 {
        if self.items_total > 0 {
            (self.items_completed as f64 / self.items_total as f64) * 100.0
        } else {
            0.0
        }
    }

    /// Record the outcome of one attempt.
    pub fn record(&mut self, outcome: &DeletionOutcome, size: u64) {
        self.items_completed += 1;
        if outcome.deleted {
            self.deleted += 1;
            self.bytes_freed += size;
        } else if !outcome.missing {
            self.failed += 1;
        }
    }
}

/// Result of a completed deletion run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationComplete {
    /// One outcome per attempted target, in order.
    pub outcomes: Vec<DeletionOutcome>,
    /// Number of targets removed.
    pub deleted: usize,
    /// Number of targets that could not be removed.
    pub failed: usize,
    /// Number of targets that were already gone.
    pub missing: usize,
    /// Total bytes freed.
    pub bytes_freed: u64,
    /// The run stopped before every target was attempted.
    pub cancelled: bool,
}

impl OperationComplete {
    /// Check if the run was fully successful.
    pub fn is_success(&self) -> bool {
        self.failed == 0 && !self.cancelled
    }

    /// Failed outcomes only.
    pub fn failures(&self) -> impl Iterator<Item = &DeletionOutcome> {
        self.outcomes.iter().filter(|o| !o.is_gone())
    }

    /// Get a human-readable summary of the run.
    pub fn summary(&self) -> String {
        let mut summary = format!("Deleted {} items", self.deleted);
        if self.failed > 0 {
            summary.push_str(&format!(", {} failed", self.failed));
        }
        if self.missing > 0 {
            summary.push_str(&format!(", {} already gone", self.missing));
        }
        if self.cancelled {
            summary.push_str(" (cancelled)");
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_record() {
        let mut progress = OperationProgress::new(4, 100);

        progress.record(&DeletionOutcome::deleted("a"), 60);
        progress.record(
            &DeletionOutcome {
                path: "b".into(),
                deleted: false,
                reason: Some("Permission denied: b".into()),
                missing: false,
            },
            40,
        );

        assert_eq!(progress.items_completed, 2);
        assert_eq!(progress.deleted, 1);
        assert_eq!(progress.failed, 1);
        assert_eq!(progress.bytes_freed, 60);
        assert_eq!(progress.percentage(), 50.0);
    }

    #[test]
    fn test_complete_summary() {
        let complete = OperationComplete {
            deleted: 3,
            failed: 1,
            missing: 2,
            ..Default::default()
        };
        assert!(!complete.is_success());
        assert_eq!(
            complete.summary(),
            "Deleted 3 items, 1 failed, 2 already gone"
        );

        let clean = OperationComplete {
            deleted: 2,
            ..Default::default()
        };
        assert!(clean.is_success());
        assert_eq!(clean.summary(), "Deleted 2 items");
    }
}
