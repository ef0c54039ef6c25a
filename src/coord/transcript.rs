//! Transcript file synchronization.
//!
//! A poor-man's pub/sub: every instance polls the transcript file, hashes the
//! bytes and swaps its in-memory copy when the hash changes. Writers hash
//! what they persist so their own next poll is a no-op. Reconciliation is
//! last-writer-wins; there is no coordination beyond this eventually
//! consistent snapshot.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Default polling interval.
pub const SYNC_INTERVAL: Duration = Duration::from_secs(1);

/// Content signature used for change detection.
pub fn hash_text(s: &str) -> String {
    let digest = Sha256::digest(s.as_bytes());
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

/// One poll outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscriptPoll {
    /// Signature unchanged since the last observation (or a transient read
    /// error, silently retried next tick).
    Unchanged,
    /// The file changed; here is the new content.
    Updated(String),
    /// The file does not exist — the caller should write its own transcript.
    Missing,
}

/// Poller/writer for one transcript path.
#[derive(Debug)]
pub struct TranscriptSync {
    path: PathBuf,
    last_sig: Option<String>,
}

impl TranscriptSync {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            last_sig: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and hash the transcript once.
    pub fn poll(&mut self) -> TranscriptPoll {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return TranscriptPoll::Missing,
            Err(e) => {
                debug!("transcript read failed, retrying next tick: {e}");
                return TranscriptPoll::Unchanged;
            }
        };
        let sig = hash_text(&content);
        if self.last_sig.as_deref() == Some(sig.as_str()) {
            return TranscriptPoll::Unchanged;
        }
        self.last_sig = Some(sig);
        TranscriptPoll::Updated(content)
    }

    /// Persist `content` and remember its signature so the writer's own next
    /// poll is a no-op.
    pub fn persist(&mut self, content: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create transcript dir {}", parent.display()))?;
        }
        std::fs::write(&self.path, content)
            .with_context(|| format!("write transcript {}", self.path.display()))?;
        self.last_sig = Some(hash_text(content));
        Ok(())
    }
}

/// Drive a [`TranscriptSync`] on an interval, forwarding `Updated` and
/// `Missing` outcomes until the token is cancelled or the receiver closes.
pub async fn watch(
    path: PathBuf,
    interval: Duration,
    tx: mpsc::Sender<TranscriptPoll>,
    cancel: CancellationToken,
) {
    let mut sync = TranscriptSync::new(path);
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = ticker.tick() => {}
        }
        match sync.poll() {
            TranscriptPoll::Unchanged => {}
            outcome => {
                if tx.send(outcome).await.is_err() {
                    return;
                }
            }
        }
    }
}
