//! Directory-based advisory locking.
//!
//! Mutual exclusion across processes is keyed on `mkdir` atomicity: whoever
//! creates the lock directory owns the lock, and release removes it. Waiters
//! retry on a fixed step, notify the caller through a hook so the UI can
//! surface the wait, and reclaim locks whose directory has gone stale.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Retry step between acquisition attempts.
pub const LOCK_RETRY_STEP: Duration = Duration::from_millis(120);

/// Callers surface a "waiting" message once the wait passes this threshold.
pub const LOCK_WAIT_NOTIFY: Duration = Duration::from_millis(500);

/// How long to wait before considering stale-lock reclaim at all.
const STALE_CHECK_AFTER: Duration = Duration::from_secs(2);

/// A lock directory untouched for this long is considered abandoned.
const STALE_AFTER: Duration = Duration::from_secs(10 * 60);

/// Held lock. Dropping releases best-effort; call [`LockGuard::release`] to
/// observe removal errors.
#[derive(Debug)]
pub struct LockGuard {
    path: PathBuf,
    armed: bool,
}

impl LockGuard {
    pub fn release(mut self) -> std::io::Result<()> {
        self.armed = false;
        std::fs::remove_dir_all(&self.path)
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if self.armed {
            let _ = std::fs::remove_dir_all(&self.path);
        }
    }
}

fn try_create(path: &Path) -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        std::fs::DirBuilder::new().mode(0o755).create(path)
    }
    #[cfg(not(unix))]
    {
        std::fs::create_dir(path)
    }
}

fn write_owner_file(path: &Path) {
    let meta = format!(
        "pid={}\nacquired={}\n",
        std::process::id(),
        chrono::Utc::now().to_rfc3339()
    );
    let _ = std::fs::write(path.join("owner"), meta);
}

fn is_stale(path: &Path) -> bool {
    let Ok(meta) = std::fs::metadata(path) else {
        return false;
    };
    let Ok(modified) = meta.modified() else {
        return false;
    };
    modified
        .elapsed()
        .map(|age| age > STALE_AFTER)
        .unwrap_or(false)
}

/// Acquire the directory lock at `path`.
///
/// The hook is invoked with the accumulated wait on every retry. A cancelled
/// token aborts immediately without acquiring. Parent directories of `path`
/// must already exist.
pub async fn acquire_dir_lock(
    path: &Path,
    hook: &(dyn Fn(Duration) + Send + Sync),
    cancel: &CancellationToken,
) -> Result<LockGuard> {
    let mut waited = Duration::ZERO;

    loop {
        match try_create(path) {
            Ok(()) => {
                write_owner_file(path);
                return Ok(LockGuard {
                    path: path.to_path_buf(),
                    armed: true,
                });
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {}
            Err(e) => {
                return Err(e).with_context(|| format!("create lock dir {}", path.display()))
            }
        }

        hook(waited);

        tokio::select! {
            _ = cancel.cancelled() => bail!("lock acquisition cancelled"),
            _ = tokio::time::sleep(LOCK_RETRY_STEP) => {
                if waited < STALE_CHECK_AFTER {
                    waited += LOCK_RETRY_STEP;
                }
            }
        }

        if waited >= STALE_CHECK_AFTER && is_stale(path) {
            debug!("reclaiming stale lock at {}", path.display());
            let _ = std::fs::remove_dir_all(path);
        }
    }
}
