use checkpoint_core::errors::DropReason;
use checkpoint_core::group::CheckpointGroup;
use serde::Serialize;

/// Counters for one reconciliation cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CycleStats {
    pub received: usize,
    pub accepted: usize,
    pub dropped_unnamed: usize,
    pub dropped_no_status: usize,
    pub dropped_unroutable: usize,
    /// Accepted reports whose timestamp was absent or unparsable.
    pub untimed: usize,
    /// Output slots still holding a value carried over from `previous`.
    pub retained_slots: usize,
}

impl CycleStats {
    pub fn record_drop(&mut self, reason: DropReason) {
        match reason {
            DropReason::Unnamed => self.dropped_unnamed += 1,
            DropReason::NoStatus => self.dropped_no_status += 1,
            DropReason::Unroutable => self.dropped_unroutable += 1,
        }
    }

    pub fn dropped(&self) -> usize {
        self.dropped_unnamed + self.dropped_no_status + self.dropped_unroutable
    }
}

/// Result of [`Reconciler::run`](super::Reconciler::run).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconcileOutcome {
    pub groups: Vec<CheckpointGroup>,
    pub stats: CycleStats,
}
