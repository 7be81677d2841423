pub mod atomic;
pub mod retention;
pub mod snapshot;

pub use retention::prune_stale;
pub use snapshot::{digest_groups, read_snapshot, CommitResult, SnapshotStore};
