use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};

use checkpoint_core::group::{CheckpointGroup, Snapshot};

use super::atomic::{atomic_write, AdvisoryLock};

/// Locked handle on a snapshot file: lock → load → commit → unlock (on drop).
pub struct SnapshotStore {
    path: PathBuf,
    _lock: AdvisoryLock,
}

/// What a commit did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitResult {
    pub cycle: u64,
    pub digest: String,
    /// False when the groups matched the stored digest and nothing was written.
    pub written: bool,
}

impl SnapshotStore {
    /// Acquire the advisory lock, creating the parent directory if needed.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("cannot create {}", parent.display()))?;
        }
        let lock = AdvisoryLock::acquire(path)
            .with_context(|| format!("cannot lock state {}", path.display()))?;
        Ok(Self {
            path: path.to_path_buf(),
            _lock: lock,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stored snapshot, or an empty one when the file does not exist yet.
    pub fn load(&self) -> Result<Snapshot> {
        read_snapshot(&self.path)
    }

    /// Persist `groups` as the next cycle unless they are unchanged.
    pub fn commit(&self, groups: &[CheckpointGroup], now: DateTime<Utc>) -> Result<CommitResult> {
        let current = self.load()?;
        let digest = digest_groups(groups)?;

        if current.digest.as_deref() == Some(digest.as_str()) {
            tracing::info!(path = %self.path.display(), cycle = current.cycle, "snapshot unchanged");
            return Ok(CommitResult {
                cycle: current.cycle,
                digest,
                written: false,
            });
        }

        let next = Snapshot {
            cycle: current.cycle + 1,
            groups: groups.to_vec(),
            digest: Some(digest.clone()),
            updated_at: now,
        };
        let json = serde_json::to_string_pretty(&next)?;
        atomic_write(&self.path, json.as_bytes())?;
        tracing::info!(
            path = %self.path.display(),
            cycle = next.cycle,
            groups = groups.len(),
            "snapshot committed"
        );

        Ok(CommitResult {
            cycle: next.cycle,
            digest,
            written: true,
        })
    }
}

/// Read a snapshot without locking (read-only commands).
pub fn read_snapshot(path: &Path) -> Result<Snapshot> {
    if !path.exists() {
        return Ok(Snapshot::new());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read state {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("{}: invalid snapshot", path.display()))
}

/// SHA-256 over the compact JSON of the groups.
pub fn digest_groups(groups: &[CheckpointGroup]) -> Result<String> {
    let canonical = serde_json::to_vec(groups)?;
    Ok(format!("sha256:{:x}", Sha256::digest(&canonical)))
}
