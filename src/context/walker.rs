//! Filesystem walker feeding the context assembler.
//!
//! Walks the workspace with `ignore::WalkBuilder`, pruning a fixed set of
//! directory names and admitting files by extension. Listings are sorted
//! lexicographically by forward-slash relative path before any cap is
//! applied, so two walks of an unchanged tree are byte-identical downstream.

use std::path::{Path, PathBuf};

use ignore::WalkBuilder;
use tracing::debug;

use super::lang::{allowed_file, allowed_file_for_lang};

/// Directory names never descended into, anywhere in the tree.
const IGNORED_DIRS: &[&str] = &[
    ".git",
    "node_modules",
    "dist",
    "build",
    "out",
    "target",
    "vendor",
    ".venv",
    "__pycache__",
    ".idea",
    ".vscode",
    ".DS_Store",
];

pub fn is_ignored_dir(name: &str) -> bool {
    IGNORED_DIRS.contains(&name)
}

/// A file considered for snapshotting. `rel` is always forward-slash
/// separated regardless of host platform.
#[derive(Debug, Clone)]
pub struct FileEntry {
    pub rel: String,
    pub abs: PathBuf,
    pub size: u64,
}

/// Caps enforced on every snapshot build.
#[derive(Debug, Clone, Copy)]
pub struct SnapshotCaps {
    pub max_files: usize,
    pub max_total_bytes: u64,
    pub per_file_limit: u64,
}

impl Default for SnapshotCaps {
    fn default() -> Self {
        Self {
            max_files: 300,
            max_total_bytes: 1_200_000,
            per_file_limit: 80_000,
        }
    }
}

impl SnapshotCaps {
    /// Caps used for the single-shot headless flow.
    pub fn headless() -> Self {
        Self {
            max_files: 100,
            max_total_bytes: 1_000_000,
            per_file_limit: 20_000,
        }
    }

    /// How much a file of `size` bytes charges against the total.
    pub fn charge(&self, size: u64) -> u64 {
        size.min(self.per_file_limit)
    }
}

/// Walk `root` and return all admissible entries, sorted by relative path.
///
/// An empty `lang_filter` admits the generic source/docs/config extension
/// set; a non-empty one narrows to that language's extensions. I/O errors on
/// individual entries are swallowed — the file is simply omitted.
pub fn collect_entries(root: &Path, lang_filter: &str) -> Vec<FileEntry> {
    let mut entries = Vec::new();

    let walker = WalkBuilder::new(root)
        .standard_filters(false)
        .follow_links(false)
        .filter_entry(|e| {
            let is_dir = e.file_type().map(|t| t.is_dir()).unwrap_or(false);
            if is_dir {
                if let Some(name) = e.file_name().to_str() {
                    return !is_ignored_dir(name);
                }
            }
            true
        })
        .build();

    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                debug!("walk error: {e}");
                continue;
            }
        };
        let path = entry.path();
        if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
            continue;
        }

        let admitted = if lang_filter.is_empty() {
            allowed_file(path)
        } else {
            allowed_file_for_lang(path, lang_filter)
        };
        if !admitted {
            continue;
        }

        let size = match entry.metadata() {
            Ok(m) => m.len(),
            Err(_) => continue,
        };
        let rel = match path.strip_prefix(root) {
            Ok(p) => p.to_string_lossy().replace('\\', "/"),
            Err(_) => continue,
        };
        entries.push(FileEntry {
            rel,
            abs: path.to_path_buf(),
            size,
        });
    }

    entries.sort_by(|a, b| a.rel.cmp(&b.rel));
    entries
}

/// Take the sorted prefix of `entries` until either cap trips.
///
/// Returns the included entries and the charged byte total.
pub fn take_capped_prefix(entries: &[FileEntry], caps: &SnapshotCaps) -> (Vec<FileEntry>, u64) {
    let mut included = Vec::new();
    let mut total: u64 = 0;

    for e in entries {
        if included.len() >= caps.max_files || total >= caps.max_total_bytes {
            break;
        }
        included.push(e.clone());
        total += caps.charge(e.size);
    }

    (included, total)
}
