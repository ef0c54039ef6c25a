//! ASCII directory tree rendering.

use std::collections::BTreeMap;

use super::walker::FileEntry;

#[derive(Default)]
struct Node {
    children: BTreeMap<String, Node>,
    file: bool,
}

/// Render an ASCII tree from a file list. A fresh in-memory tree is built per
/// call and never persisted. Sibling names are sorted, so the output is
/// deterministic for a given entry list.
pub fn render_tree(files: &[FileEntry]) -> String {
    let mut root = Node::default();

    for f in files {
        let parts: Vec<&str> = f.rel.split('/').collect();
        let mut cur = &mut root;
        for (i, part) in parts.iter().enumerate() {
            cur = cur.children.entry(part.to_string()).or_default();
            if i == parts.len() - 1 {
                cur.file = true;
            }
        }
    }

    let mut lines = Vec::new();
    walk(&root, "", &mut lines);
    lines.join("\n")
}

fn walk(node: &Node, prefix: &str, lines: &mut Vec<String>) {
    for (name, child) in &node.children {
        let mut line = format!("{prefix}└─ {name}");
        if !child.file {
            line.push('/');
        }
        lines.push(line);
        if !child.children.is_empty() {
            walk(child, &format!("{prefix}  "), lines);
        }
    }
}
