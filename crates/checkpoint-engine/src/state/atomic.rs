use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

/// Locks older than this are considered abandoned.
const STALE_LOCK_SECS: i64 = 60;

/// Write to a sibling temp file, fsync, then rename over `path`.
///
/// On any failure after the temp file exists, it is removed again.
pub fn atomic_write(path: &Path, content: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let temp_path = dir.join(format!(".{}.tmp", temp_suffix()));

    let mut file = std::fs::File::create(&temp_path)
        .with_context(|| format!("cannot create temp file for {}", path.display()))?;
    let written = file
        .write_all(content)
        .and_then(|()| file.sync_all())
        .with_context(|| format!("cannot write temp file for {}", path.display()));
    drop(file);

    let result = written.and_then(|()| {
        std::fs::rename(&temp_path, path)
            .with_context(|| format!("cannot rename temp to {}", path.display()))
    });
    if result.is_err() {
        let _ = std::fs::remove_file(&temp_path);
    }
    result
}

/// Advisory `<state>.lock` file holding the owner's PID and acquisition time.
#[derive(Debug)]
pub struct AdvisoryLock {
    lock_path: PathBuf,
}

impl AdvisoryLock {
    /// Fails if a fresh lock is already held.
    pub fn acquire(state_path: &Path) -> Result<Self> {
        let mut name = state_path.as_os_str().to_owned();
        name.push(".lock");
        let lock_path = PathBuf::from(name);

        if lock_path.exists() {
            let content = std::fs::read_to_string(&lock_path).unwrap_or_default();
            let held_since = content.lines().nth(1).and_then(|l| l.parse::<i64>().ok());
            match held_since {
                Some(ts) if chrono::Utc::now().timestamp() - ts <= STALE_LOCK_SECS => {
                    bail!(
                        "state file is locked by another process (lock: {})",
                        lock_path.display()
                    );
                }
                _ => {
                    tracing::warn!(lock = %lock_path.display(), "removing stale lock");
                    let _ = std::fs::remove_file(&lock_path);
                }
            }
        }

        let content = format!("{}\n{}\n", std::process::id(), chrono::Utc::now().timestamp());
        std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&lock_path)
            .and_then(|mut f| f.write_all(content.as_bytes()))
            .with_context(|| format!("cannot acquire lock {}", lock_path.display()))?;

        Ok(Self { lock_path })
    }

    pub fn path(&self) -> &Path {
        &self.lock_path
    }

    pub fn release(self) -> Result<()> {
        if self.lock_path.exists() {
            std::fs::remove_file(&self.lock_path)
                .with_context(|| format!("cannot release lock {}", self.lock_path.display()))?;
        }
        Ok(())
    }
}

impl Drop for AdvisoryLock {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.lock_path);
    }
}

fn temp_suffix() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    format!("{}-{nanos:x}", std::process::id())
}
