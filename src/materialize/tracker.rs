//! Per-path content tracking across prompt turns.
//!
//! A process-wide, mutex-guarded map from forward-slash relative path to
//! last-known bytes. The materializer snapshots a path before writing and
//! records the new bytes after, so diffs stay accurate across turns even when
//! several materialization calls share the process.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, OnceLock};

/// Keyed store of the previous content per relative path.
///
/// A memoized `None` means "known missing on disk" and is distinct from a
/// recorded empty payload, which diffs as a full addition.
pub struct ChangeTracker {
    inner: Mutex<TrackerState>,
}

#[derive(Default)]
struct TrackerState {
    prev: HashMap<String, Option<Vec<u8>>>,
    turn: u64,
}

impl ChangeTracker {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(TrackerState::default()),
        }
    }

    /// Mark a new generation turn.
    pub fn begin_prompt(&self) {
        let mut st = self.inner.lock().expect("tracker poisoned");
        st.turn += 1;
    }

    /// Current turn number (monotonic, starts at zero).
    pub fn turn(&self) -> u64 {
        self.inner.lock().expect("tracker poisoned").turn
    }

    /// Previous content of `rel`, reading and memoizing from disk on a miss.
    ///
    /// Returns `None` when there is no previous known state and the file does
    /// not exist under `root`.
    pub fn snapshot(&self, root: &Path, rel: &str) -> Option<Vec<u8>> {
        let rel = normalize_rel(rel);
        let mut st = self.inner.lock().expect("tracker poisoned");
        if let Some(known) = st.prev.get(&rel) {
            return known.clone();
        }
        let abs = root.join(&rel);
        match std::fs::read(&abs) {
            Ok(data) => {
                st.prev.insert(rel, Some(data.clone()));
                Some(data)
            }
            Err(_) => {
                st.prev.insert(rel, None);
                None
            }
        }
    }

    /// Save the current content for `rel`. Passing `None` forgets the path so
    /// the next snapshot re-reads the disk.
    pub fn record(&self, rel: &str, data: Option<&[u8]>) {
        let rel = normalize_rel(rel);
        let mut st = self.inner.lock().expect("tracker poisoned");
        match data {
            Some(bytes) => {
                st.prev.insert(rel, Some(bytes.to_vec()));
            }
            None => {
                st.prev.remove(&rel);
            }
        }
    }
}

impl Default for ChangeTracker {
    fn default() -> Self {
        Self::new()
    }
}

fn normalize_rel(rel: &str) -> String {
    rel.replace('\\', "/")
}

static REGISTRY: OnceLock<Mutex<HashMap<std::path::PathBuf, Arc<ChangeTracker>>>> =
    OnceLock::new();

/// The process-wide tracker for a workspace, shared by all in-process
/// materialization calls against that root.
pub fn for_root(root: &Path) -> Arc<ChangeTracker> {
    let registry = REGISTRY.get_or_init(|| Mutex::new(HashMap::new()));
    let mut map = registry.lock().expect("tracker registry poisoned");
    map.entry(root.to_path_buf())
        .or_insert_with(|| Arc::new(ChangeTracker::new()))
        .clone()
}
