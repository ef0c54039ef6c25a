//! Markdown snapshot and attachment-list building.
//!
//! Both outputs are produced from the same sorted, capped entry prefix so the
//! snapshot text and the attachment payloads always describe the same files.

use std::fs;
use std::path::Path;

use crate::agent::Attachment;

use super::lang::{fence_lang_from_ext, mime_for_path};
use super::tree::render_tree;
use super::walker::{collect_entries, take_capped_prefix, SnapshotCaps};

/// Immutable markdown bundle plus stats, rebuilt on every generation call.
#[derive(Debug, Clone)]
pub struct ContextSnapshot {
    pub markdown: String,
    pub tree: String,
    pub file_count: usize,
    pub byte_count: u64,
}

/// Build the markdown CODEBASE SNAPSHOT for `root`.
///
/// A fully unreadable workspace produces the header with zeroed stats and an
/// empty tree.
pub fn build_snapshot(root: &Path, caps: &SnapshotCaps, lang_filter: &str) -> ContextSnapshot {
    let entries = collect_entries(root, lang_filter);
    let (included, total) = take_capped_prefix(&entries, caps);

    let tree = render_tree(&included);

    let mut files_section = String::new();
    for f in &included {
        let content = fs::read(&f.abs).unwrap_or_default();
        let truncated = truncate(&content, caps.per_file_limit);
        let ext = f.rel.rsplit('.').next().unwrap_or("");
        let lang = fence_lang_from_ext(ext);
        files_section.push_str("\n### ");
        files_section.push_str(&f.rel);
        files_section.push_str("\n```");
        files_section.push_str(lang);
        files_section.push('\n');
        files_section.push_str(&String::from_utf8_lossy(truncated));
        files_section.push_str("\n```\n");
    }

    let mut markdown = String::new();
    markdown.push_str("## CODEBASE SNAPSHOT\n");
    markdown.push_str(&format!("- Root: `{}`\n", root.display()));
    markdown.push_str(&format!(
        "- Files included: {} (limit {})\n",
        included.len(),
        caps.max_files
    ));
    markdown.push_str(&format!(
        "- Size included: {} (limit {})\n",
        human_size(total),
        human_size(caps.max_total_bytes)
    ));
    markdown.push_str("\n### Tree\n```\n");
    markdown.push_str(&tree);
    markdown.push_str("\n```\n");
    markdown.push_str(&files_section);

    ContextSnapshot {
        markdown,
        tree,
        file_count: included.len(),
        byte_count: total,
    }
}

/// Collect the attachment list from the same ordered prefix as the snapshot.
pub fn collect_attachments(root: &Path, caps: &SnapshotCaps, lang_filter: &str) -> Vec<Attachment> {
    let entries = collect_entries(root, lang_filter);
    let (included, _) = take_capped_prefix(&entries, caps);

    let mut out = Vec::with_capacity(included.len());
    for e in &included {
        let data = match fs::read(&e.abs) {
            Ok(b) => b,
            Err(_) => continue,
        };
        let data = truncate(&data, caps.per_file_limit).to_vec();
        out.push(Attachment {
            name: e.rel.clone(),
            mime: mime_for_path(&e.rel).to_string(),
            data,
        });
    }
    out
}

fn truncate(data: &[u8], limit: u64) -> &[u8] {
    // Tail cut, never re-split.
    if data.len() as u64 > limit {
        &data[..limit as usize]
    } else {
        data
    }
}

/// Human-readable byte count for snapshot headers and the preview command.
pub fn human_size(n: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * KB;
    const GB: u64 = 1024 * MB;
    if n >= GB {
        format!("{:.2} GB", n as f64 / GB as f64)
    } else if n >= MB {
        format!("{:.2} MB", n as f64 / MB as f64)
    } else if n >= KB {
        format!("{:.2} KB", n as f64 / KB as f64)
    } else {
        format!("{n} B")
    }
}
