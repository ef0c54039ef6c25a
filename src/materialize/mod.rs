//! Response materialization: parse a model response into fenced code blocks
//! and write them into the workspace, recording per-prompt diffs.
//!
//! Ordering is the parse order of the fences; one fence is one file. Write
//! batches hold the cross-process workspace lock plus an in-process mutex, so
//! concurrent per-file generations cannot interleave their write batches.

mod diff;
mod fences;
mod layout;
mod normalize;
pub mod tracker;
mod workspace;

#[cfg(test)]
mod tests;

pub use diff::unified_diff;
pub use fences::{extract_path_directive, guess_language, parse_fences, CodeFence};
pub use layout::{guess_filename, resolve_destination, sanitize_filename};
pub use normalize::normalize_imports;
pub use tracker::ChangeTracker;
pub use workspace::{checksum, deduplicate_files, diff_snapshots, load_workspace_snapshot};

use std::fmt;
use std::path::{Path, PathBuf};

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::context::ext_for_lang;
use crate::coord::lock::{acquire_dir_lock, LOCK_WAIT_NOTIFY};

/// Outcome classification for one fence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Saved,
    Deleted,
    Removed,
    Error,
    Info,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ActionKind::Saved => "saved",
            ActionKind::Deleted => "deleted",
            ActionKind::Removed => "removed",
            ActionKind::Error => "error",
            ActionKind::Info => "info",
        };
        f.write_str(s)
    }
}

/// Outcome of materializing one fence. `path` is workspace-relative with
/// forward slashes; for `Saved` the message is `created`, `updated` or
/// `unchanged`.
#[derive(Debug, Clone)]
pub struct FileAction {
    pub path: String,
    pub kind: ActionKind,
    pub message: String,
    pub diff: String,
    pub err: Option<String>,
}

impl FileAction {
    fn saved(path: String, message: &str, diff: String) -> Self {
        Self {
            path,
            kind: ActionKind::Saved,
            message: message.to_string(),
            diff,
            err: None,
        }
    }

    fn error(path: String, message: String) -> Self {
        Self {
            path,
            kind: ActionKind::Error,
            err: Some(message.clone()),
            message,
            diff: String::new(),
        }
    }

    fn info(message: &str) -> Self {
        Self {
            path: String::new(),
            kind: ActionKind::Info,
            message: message.to_string(),
            diff: String::new(),
            err: None,
        }
    }
}

/// Status sink for lock-wait and other user-visible notes during a batch.
pub type StatusFn<'a> = &'a (dyn Fn(&str) + Send + Sync);

/// Writes model responses into a workspace.
pub struct Materializer {
    root: PathBuf,
    tracker: std::sync::Arc<ChangeTracker>,
    lock_root: Option<PathBuf>,
    color: bool,
    local: Mutex<()>,
}

impl Materializer {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let tracker = tracker::for_root(&root);
        Self {
            root,
            tracker,
            lock_root: None,
            color: false,
            local: Mutex::new(()),
        }
    }

    /// Enable the cross-process lock under `lock_root` (the lock directory
    /// itself is `<lock_root>/codegen`).
    pub fn with_lock_root(mut self, lock_root: impl Into<PathBuf>) -> Self {
        self.lock_root = Some(lock_root.into());
        self
    }

    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The workspace's shared change tracker.
    pub fn tracker(&self) -> &ChangeTracker {
        &self.tracker
    }

    /// Materialize a response under the workspace lock.
    ///
    /// Lock acquisition failures are surfaced through `status` and the batch
    /// proceeds under the in-process mutex alone.
    pub async fn materialize(
        &self,
        response: &str,
        cancel: &CancellationToken,
        status: StatusFn<'_>,
    ) -> Vec<FileAction> {
        let _local = self.local.lock().await;

        let lock_path = self.lock_root.as_ref().map(|d| d.join("codegen"));
        let guard = match &lock_path {
            Some(path) => {
                let warned = std::sync::atomic::AtomicBool::new(false);
                let hook = |waited: std::time::Duration| {
                    if waited >= LOCK_WAIT_NOTIFY
                        && !warned.swap(true, std::sync::atomic::Ordering::Relaxed)
                    {
                        status("⏳ Waiting for shared code generation lock...");
                    }
                };
                match acquire_dir_lock(path, &hook, cancel).await {
                    Ok(guard) => {
                        if warned.load(std::sync::atomic::Ordering::Relaxed) {
                            status("🔓 Shared code generation lock acquired.");
                        }
                        Some(guard)
                    }
                    Err(e) => {
                        status(&format!("⚠️ code generation lock: {e}"));
                        None
                    }
                }
            }
            None => None,
        };

        let actions = self.write_blocks(response);

        if let Some(guard) = guard {
            if let Err(e) = guard.release() {
                status(&format!("⚠️ release shared lock: {e}"));
            }
        }

        actions
    }

    /// The synchronous write pass: parse → resolve → write → record →
    /// normalize. Callers must hold the materializer's exclusion.
    fn write_blocks(&self, response: &str) -> Vec<FileAction> {
        self.tracker.begin_prompt();

        let blocks = parse_fences(response);
        if blocks.is_empty() {
            return vec![FileAction::info("No code blocks detected.")];
        }

        let mut actions = Vec::with_capacity(blocks.len());
        for (i, block) in blocks.iter().enumerate() {
            actions.push(self.write_block(i, block));
        }

        normalize_imports(&self.root);

        actions
    }

    fn write_block(&self, index: usize, block: &CodeFence) -> FileAction {
        let (explicit, body) = extract_path_directive(&block.body);

        let mut lang = block.lang.clone();
        if lang.is_empty() {
            lang = guess_language(&body).to_string();
        }
        if lang.is_empty() {
            lang = "txt".to_string();
        }

        let rel = match explicit {
            Some(p) => p.trim_start_matches("./").to_string(),
            None => self.infer_rel_path(index, &lang, &body),
        };
        let abs = self.root.join(&rel);

        if let Some(parent) = abs.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                return FileAction::error(rel, format!("Failed to create directory: {e}"));
            }
        }

        let mut text = body.replace("\r\n", "\n");
        if !text.ends_with('\n') {
            text.push('\n');
        }
        let new_bytes = text.into_bytes();

        let old = self.tracker.snapshot(&self.root, &rel);
        let unchanged = old.as_deref() == Some(new_bytes.as_slice());

        if !unchanged {
            if let Err(e) = std::fs::write(&abs, &new_bytes) {
                return FileAction::error(rel, format!("Failed to write file: {e}"));
            }
        }

        let diff = unified_diff(
            &rel,
            old.as_deref().unwrap_or_default(),
            &new_bytes,
            self.color,
        );
        let message = if unchanged {
            "unchanged"
        } else if old.is_some() {
            "updated"
        } else {
            "created"
        };
        self.tracker.record(&rel, Some(&new_bytes));

        FileAction::saved(rel, message, diff)
    }

    /// Destination for a fence without an explicit path: Go entrypoints pin
    /// to the root, everything else goes through package-directory inference,
    /// with an indexed `generated/` fallback when no filename token exists.
    fn infer_rel_path(&self, index: usize, lang: &str, body: &str) -> String {
        let is_go = matches!(lang, "go" | "golang");
        let dir = if is_go && (body.contains("package main") || body.contains("func main(")) {
            self.root.clone()
        } else {
            resolve_destination(&self.root, lang, body).0
        };

        match guess_filename(lang, body) {
            Some(name) => {
                let rel_dir = dir
                    .strip_prefix(&self.root)
                    .unwrap_or(Path::new(""))
                    .to_string_lossy()
                    .replace('\\', "/");
                if rel_dir.is_empty() {
                    name
                } else {
                    format!("{rel_dir}/{name}")
                }
            }
            None => format!("generated/file_{}.{}", index + 1, ext_for_lang(lang)),
        }
    }
}
