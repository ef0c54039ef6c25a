use anyhow::Result;

use crate::cli::resolve_workspace_root;
use crate::context::{build_snapshot, collect_entries, human_size, SnapshotCaps};

/// Dry-run of the context assembler: show what a generation call would see.
pub async fn run_preview(workspace_root: Option<String>, verbose: bool) -> Result<()> {
    let root = resolve_workspace_root(workspace_root)?;
    if !root.exists() {
        anyhow::bail!("Workspace path does not exist: {}", root.display());
    }

    println!("Scanning workspace: {}\n", root.display());

    let caps = SnapshotCaps::default();
    let snapshot = build_snapshot(&root, &caps, "");

    println!("Summary:");
    println!(
        "  Files included: {} (limit {})",
        snapshot.file_count, caps.max_files
    );
    println!(
        "  Size included: {} (limit {})",
        human_size(snapshot.byte_count),
        human_size(caps.max_total_bytes)
    );

    if verbose {
        println!("\nTree:\n{}", snapshot.tree);
        println!("\nFiles:");
        for entry in collect_entries(&root, "") {
            let size = if entry.size >= 1024 {
                format!("{:.1}K", entry.size as f64 / 1024.0)
            } else {
                format!("{}B", entry.size)
            };
            println!("  {size:>8}  {}", entry.rel);
        }
    } else if snapshot.file_count > 0 {
        println!("\n  Use --verbose to see the tree and all files");
    }

    Ok(())
}
