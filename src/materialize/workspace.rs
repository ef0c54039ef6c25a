//! Whole-workspace snapshot comparison and duplicate cleanup.
//!
//! When generation happens through an external tool instead of fenced
//! blocks, there is no per-fence write to observe. These helpers capture the
//! admissible files before and after, then reconstruct the same `FileAction`
//! stream the fence path produces. The duplicate cleanup pass removes
//! identical copies of a file that concurrent generations scattered across
//! directories.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::context::{allowed_file, collect_entries};

use super::tracker::ChangeTracker;
use super::{unified_diff, ActionKind, FileAction};

/// Content checksum used for equality grouping.
pub fn checksum(data: &[u8]) -> String {
    let digest = Sha256::digest(data);
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

/// Read every admissible file under `root`, keyed by forward-slash relative
/// path. Unreadable files are omitted.
pub fn load_workspace_snapshot(root: &Path) -> HashMap<String, Vec<u8>> {
    let mut files = HashMap::new();
    for entry in collect_entries(root, "") {
        if let Ok(data) = std::fs::read(&entry.abs) {
            files.insert(entry.rel, data);
        }
    }
    files
}

/// Compare two workspace snapshots, record the outcome in the tracker and
/// return actions sorted by path: `deleted` for vanished files, `saved`
/// (created/updated) for new or changed ones.
pub fn diff_snapshots(
    tracker: &ChangeTracker,
    before: &HashMap<String, Vec<u8>>,
    after: &HashMap<String, Vec<u8>>,
    color: bool,
) -> Vec<FileAction> {
    let mut actions = Vec::new();

    for (rel, old_data) in before {
        match after.get(rel) {
            None => {
                tracker.record(rel, None);
                actions.push(FileAction {
                    path: rel.clone(),
                    kind: ActionKind::Deleted,
                    message: "deleted".to_string(),
                    diff: String::new(),
                    err: None,
                });
            }
            Some(new_data) => {
                tracker.record(rel, Some(new_data));
                if old_data != new_data {
                    actions.push(FileAction {
                        path: rel.clone(),
                        kind: ActionKind::Saved,
                        message: "updated".to_string(),
                        diff: unified_diff(rel, old_data, new_data, color),
                        err: None,
                    });
                }
            }
        }
    }

    for (rel, new_data) in after {
        if before.contains_key(rel) {
            continue;
        }
        tracker.record(rel, Some(new_data));
        actions.push(FileAction {
            path: rel.clone(),
            kind: ActionKind::Saved,
            message: "created".to_string(),
            diff: unified_diff(rel, &[], new_data, color),
            err: None,
        });
    }

    actions.sort_by(|a, b| a.path.cmp(&b.path));
    actions
}

/// Remove byte-identical copies of a file that ended up in different
/// directories, preferring to keep a path from `written` (the files the
/// current run produced itself), else the lexicographically first.
///
/// Copies within one directory are left alone.
pub fn deduplicate_files(root: &Path, written: &HashSet<String>) -> Vec<FileAction> {
    let mut by_checksum: BTreeMap<String, Vec<String>> = BTreeMap::new();

    for entry in collect_entries(root, "") {
        if !allowed_file(&entry.abs) {
            continue;
        }
        if let Ok(data) = std::fs::read(&entry.abs) {
            by_checksum.entry(checksum(&data)).or_default().push(entry.rel);
        }
    }

    let mut actions = Vec::new();
    for (_, mut paths) in by_checksum {
        if paths.len() < 2 {
            continue;
        }
        paths.sort();

        let keep = paths
            .iter()
            .find(|p| written.contains(*p))
            .cloned()
            .unwrap_or_else(|| paths[0].clone());
        let keep_dir = Path::new(&keep).parent();

        for path in &paths {
            if *path == keep || Path::new(path).parent() == keep_dir {
                continue;
            }
            match std::fs::remove_file(root.join(path)) {
                Ok(()) => actions.push(FileAction {
                    path: path.clone(),
                    kind: ActionKind::Removed,
                    message: "duplicate".to_string(),
                    diff: String::new(),
                    err: None,
                }),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => actions.push(FileAction {
                    path: path.clone(),
                    kind: ActionKind::Removed,
                    message: "duplicate".to_string(),
                    diff: String::new(),
                    err: None,
                }),
                Err(e) => actions.push(FileAction {
                    path: path.clone(),
                    kind: ActionKind::Error,
                    message: format!("Failed to remove duplicate: {e}"),
                    diff: String::new(),
                    err: Some(e.to_string()),
                }),
            }
        }
    }

    actions
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn checksum_distinguishes_content() {
        assert_eq!(checksum(b"abc"), checksum(b"abc"));
        assert_ne!(checksum(b"abc"), checksum(b"abd"));
    }

    #[test]
    fn snapshot_diff_classifies_created_updated_deleted() {
        let tmp = TempDir::new().unwrap();
        let tracker = ChangeTracker::new();

        let mut before = HashMap::new();
        before.insert("kept.go".to_string(), b"package kept\n".to_vec());
        before.insert("gone.go".to_string(), b"package gone\n".to_vec());
        before.insert("same.go".to_string(), b"package same\n".to_vec());

        let mut after = HashMap::new();
        after.insert("kept.go".to_string(), b"package kept\n\nfunc F() {}\n".to_vec());
        after.insert("same.go".to_string(), b"package same\n".to_vec());
        after.insert("new.go".to_string(), b"package new\n".to_vec());

        let actions = diff_snapshots(&tracker, &before, &after, false);
        let describe: Vec<(String, String)> = actions
            .iter()
            .map(|a| (a.path.clone(), format!("{}/{}", a.kind, a.message)))
            .collect();

        assert_eq!(
            describe,
            vec![
                ("gone.go".to_string(), "deleted/deleted".to_string()),
                ("kept.go".to_string(), "saved/updated".to_string()),
                ("new.go".to_string(), "saved/created".to_string()),
            ]
        );

        // The tracker observed the after-state.
        assert_eq!(
            tracker.snapshot(tmp.path(), "new.go"),
            Some(b"package new\n".to_vec())
        );
        assert_eq!(tracker.snapshot(tmp.path(), "gone.go"), None);
    }

    #[test]
    fn unchanged_files_produce_no_action() {
        let tracker = ChangeTracker::new();
        let mut both = HashMap::new();
        both.insert("a.go".to_string(), b"package a\n".to_vec());
        let actions = diff_snapshots(&tracker, &both, &both.clone(), false);
        assert!(actions.is_empty());
    }

    #[test]
    fn duplicates_across_directories_are_removed() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("pkg")).unwrap();
        fs::write(tmp.path().join("util.go"), "package util\n").unwrap();
        fs::write(tmp.path().join("pkg/util.go"), "package util\n").unwrap();

        let mut written = HashSet::new();
        written.insert("pkg/util.go".to_string());

        let actions = deduplicate_files(tmp.path(), &written);
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].kind, ActionKind::Removed);
        assert_eq!(actions[0].path, "util.go");
        assert!(!tmp.path().join("util.go").exists());
        assert!(tmp.path().join("pkg/util.go").exists());
    }

    #[test]
    fn duplicates_in_one_directory_are_kept() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("a.go"), "package x\n").unwrap();
        fs::write(tmp.path().join("b.go"), "package x\n").unwrap();

        let actions = deduplicate_files(tmp.path(), &HashSet::new());
        assert!(actions.is_empty());
        assert!(tmp.path().join("a.go").exists());
        assert!(tmp.path().join("b.go").exists());
    }

    #[test]
    fn first_path_wins_without_written_preference() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("z")).unwrap();
        fs::write(tmp.path().join("a.go"), "package d\n").unwrap();
        fs::write(tmp.path().join("z/a.go"), "package d\n").unwrap();

        let actions = deduplicate_files(tmp.path(), &HashSet::new());
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].path, "z/a.go");
        assert!(tmp.path().join("a.go").exists());
    }
}
