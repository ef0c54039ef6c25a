//! Git-style unified diffs for materialized writes.

use sha2::{Digest, Sha256};
use similar::{ChangeTag, TextDiff};

const RESET: &str = "\x1b[0m";
const RED: &str = "\x1b[31m";
const GREEN: &str = "\x1b[32m";
const CYAN: &str = "\x1b[36m";
const GRAY: &str = "\x1b[90m";
const BOLD: &str = "\x1b[1m";

/// Short content hash used as the `index` label, like Git's short object ids.
fn short_hash(data: &[u8]) -> String {
    let digest = Sha256::digest(data);
    digest[..3].iter().map(|b| format!("{b:02x}")).collect()
}

fn normalize_lines(data: &[u8]) -> String {
    let text = String::from_utf8_lossy(data).replace("\r\n", "\n");
    text.lines()
        .map(|l| l.trim_end_matches('\r'))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Unified diff with a Git-like header and three lines of hunk context.
///
/// Returns an empty string for byte-equal inputs. With `color` set, lines are
/// ANSI colorized the way the transcript renders them.
pub fn unified_diff(rel: &str, old: &[u8], new: &[u8], color: bool) -> String {
    if old == new {
        return String::new();
    }

    let old_text = normalize_lines(old);
    let new_text = normalize_lines(new);

    let (bold_cyan, cyan, green, red, gray, reset) = if color {
        (
            format!("{BOLD}{CYAN}"),
            CYAN.to_string(),
            GREEN.to_string(),
            RED.to_string(),
            GRAY.to_string(),
            RESET.to_string(),
        )
    } else {
        Default::default()
    };

    let mut out = String::new();
    out.push_str(&format!(
        "{bold_cyan}diff --git a/{rel} b/{rel}{reset}\n"
    ));
    out.push_str(&format!(
        "index {}..{} 100644\n",
        short_hash(old),
        short_hash(new)
    ));
    out.push_str(&format!("{cyan}--- a/{rel}{reset}\n"));
    out.push_str(&format!("{cyan}+++ b/{rel}{reset}\n"));

    let diff = TextDiff::from_lines(&old_text, &new_text);
    for hunk in diff.unified_diff().context_radius(3).iter_hunks() {
        out.push_str(&format!("{cyan}{}{reset}\n", hunk.header()));
        for change in hunk.iter_changes() {
            let line = change.value().trim_end_matches('\n');
            match change.tag() {
                ChangeTag::Insert => out.push_str(&format!("{green}+{line}{reset}\n")),
                ChangeTag::Delete => out.push_str(&format!("{red}-{line}{reset}\n")),
                ChangeTag::Equal => out.push_str(&format!("{gray} {line}{reset}\n")),
            }
        }
    }

    out
}
