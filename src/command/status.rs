use anyhow::Result;

use crate::cli::resolve_workspace_root;
use crate::session::SessionState;

/// Print the session identity and coordination paths for a workspace.
pub async fn run_status(workspace_root: Option<String>) -> Result<()> {
    let root = resolve_workspace_root(workspace_root)?;
    let state = SessionState::new(&root)?;

    println!("Workspace: {}", root.display());
    println!("Session id: {}", state.session_id);
    println!("Transcript: {}", state.transcript_path.display());
    println!("Lock root: {}", state.lock_root.display());
    if state.shared_spaces.is_empty() {
        println!("Shared spaces: (none)");
    } else {
        println!("Shared spaces: {}", state.shared_spaces.join(", "));
    }

    Ok(())
}
