pub mod outcome;
pub mod reconciler;

pub use outcome::{CycleStats, ReconcileOutcome};
pub use reconciler::{reconcile, Reconciler};
