//! Per-run session identity and coordination paths.
//!
//! Every run gets a random 32-bit session id (rotated on user command). The
//! transcript file and lock root are derived from a deterministic UUID of the
//! workspace path, so independent instances on the same workspace converge on
//! the same coordination files.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use uuid::Uuid;

/// Namespace for workspace-path UUIDs.
const CODELOOM_NAMESPACE: Uuid = Uuid::from_bytes([
    0x6b, 0xa7, 0xb8, 0x10, 0x9d, 0xad, 0x11, 0xd1, 0x80, 0xb4, 0x00, 0xc0, 0x4f, 0xd4, 0x30, 0xc8,
]);

/// Deterministic UUID for a workspace root. The path is normalized to forward
/// slashes so the value is stable across platforms.
pub fn workspace_uuid(path: &Path) -> String {
    let normalized = path.to_string_lossy().replace('\\', "/");
    Uuid::new_v5(&CODELOOM_NAMESPACE, normalized.as_bytes()).to_string()
}

fn random_session_id() -> String {
    format!("{:08x}", rand::random::<u32>())
}

/// Per-run identity: session id, shared spaces, and the on-disk coordination
/// paths for the active workspace.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub session_id: String,
    pub shared_spaces: Vec<String>,
    pub transcript_path: PathBuf,
    pub lock_root: PathBuf,
}

impl SessionState {
    /// Build session state for `workspace`, rooting coordination files under
    /// `~/.codeloom/<workspace-uuid>/`.
    pub fn new(workspace: &Path) -> Result<Self> {
        let base = dirs::home_dir()
            .context("could not determine home directory")?
            .join(".codeloom");
        Self::with_state_dir(workspace, &base)
    }

    /// Like [`SessionState::new`] with an explicit state directory.
    pub fn with_state_dir(workspace: &Path, state_dir: &Path) -> Result<Self> {
        let scope = state_dir.join(workspace_uuid(workspace));
        let lock_root = scope.join("locks");
        std::fs::create_dir_all(&lock_root)
            .with_context(|| format!("create lock root {}", lock_root.display()))?;

        Ok(Self {
            session_id: random_session_id(),
            shared_spaces: Vec::new(),
            transcript_path: scope.join("transcript.log"),
            lock_root,
        })
    }

    /// Replace the session id with a fresh random one.
    pub fn rotate(&mut self) {
        self.session_id = random_session_id();
    }

    /// Parse a comma/whitespace separated shared-spaces string.
    pub fn set_shared_spaces(&mut self, raw: &str) {
        self.shared_spaces = raw
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string())
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn workspace_uuid_is_deterministic() {
        let a = workspace_uuid(Path::new("/tmp/project"));
        let b = workspace_uuid(Path::new("/tmp/project"));
        let c = workspace_uuid(Path::new("/tmp/other"));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn backslashes_normalize_to_the_same_uuid() {
        let a = workspace_uuid(Path::new("C:\\work\\proj"));
        let b = workspace_uuid(Path::new("C:/work/proj"));
        assert_eq!(a, b);
    }

    #[test]
    fn session_paths_are_scoped_to_the_workspace() {
        let home = TempDir::new().unwrap();
        let ws = TempDir::new().unwrap();

        let state = SessionState::with_state_dir(ws.path(), home.path()).unwrap();
        assert!(state.lock_root.is_dir());
        assert!(state
            .transcript_path
            .to_string_lossy()
            .contains(&workspace_uuid(ws.path())));
        assert_eq!(state.session_id.len(), 8);
    }

    #[test]
    fn two_instances_share_coordination_paths() {
        let home = TempDir::new().unwrap();
        let ws = TempDir::new().unwrap();

        let a = SessionState::with_state_dir(ws.path(), home.path()).unwrap();
        let b = SessionState::with_state_dir(ws.path(), home.path()).unwrap();
        assert_eq!(a.transcript_path, b.transcript_path);
        assert_eq!(a.lock_root, b.lock_root);
        assert_ne!(a.session_id, b.session_id);
    }

    #[test]
    fn rotate_changes_the_id() {
        let home = TempDir::new().unwrap();
        let ws = TempDir::new().unwrap();
        let mut state = SessionState::with_state_dir(ws.path(), home.path()).unwrap();
        let before = state.session_id.clone();
        state.rotate();
        assert_ne!(state.session_id, before);
    }

    #[test]
    fn shared_spaces_parse_from_commas_and_spaces() {
        let home = TempDir::new().unwrap();
        let ws = TempDir::new().unwrap();
        let mut state = SessionState::with_state_dir(ws.path(), home.path()).unwrap();

        state.set_shared_spaces("alpha, beta  gamma");
        assert_eq!(state.shared_spaces, vec!["alpha", "beta", "gamma"]);

        state.set_shared_spaces("");
        assert!(state.shared_spaces.is_empty());
    }
}
