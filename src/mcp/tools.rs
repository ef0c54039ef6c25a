//! Workspace file tool implementations.
//!
//! Relative tool paths resolve against the server's workspace root; absolute
//! paths are used as given. Failures are reported as tool errors, never as
//! protocol errors.

use std::path::{Path, PathBuf};

use rmcp::model::{CallToolResult, Content};

use super::types::*;

fn tool_error(message: impl Into<String>) -> CallToolResult {
    CallToolResult::error(vec![Content::text(message.into())])
}

fn tool_text(message: impl Into<String>) -> CallToolResult {
    CallToolResult::success(vec![Content::text(message.into())])
}

fn resolve(root: &Path, path: &str) -> PathBuf {
    let p = Path::new(path);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        root.join(p)
    }
}

/// Shell-style pattern match supporting `*` and `?`.
fn pattern_matches(pattern: &str, name: &str) -> bool {
    let mut regex = String::from("^");
    for ch in pattern.chars() {
        match ch {
            '*' => regex.push_str(".*"),
            '?' => regex.push('.'),
            other => regex.push_str(&regex::escape(&other.to_string())),
        }
    }
    regex.push('$');
    regex::Regex::new(&regex)
        .map(|re| re.is_match(name))
        .unwrap_or(false)
}

fn walk_files(dir: &Path, out: &mut Vec<PathBuf>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    let mut entries: Vec<_> = entries.flatten().collect();
    entries.sort_by_key(|e| e.file_name());
    for entry in entries {
        let path = entry.path();
        if path.is_dir() {
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                if crate::context::is_ignored_dir(name) {
                    continue;
                }
            }
            walk_files(&path, out);
        } else {
            out.push(path);
        }
    }
}

/// Line-granular textual search across the workspace.
pub fn search_codebase(root: &Path, args: SearchCodebaseArgs) -> CallToolResult {
    let search_root = args
        .path
        .as_deref()
        .map(|p| resolve(root, p))
        .unwrap_or_else(|| root.to_path_buf());

    let mut files = Vec::new();
    walk_files(&search_root, &mut files);

    let needle = if args.case_sensitive {
        args.query.clone()
    } else {
        args.query.to_lowercase()
    };

    let mut results = Vec::new();
    for path in files {
        if let Some(pattern) = &args.file_pattern {
            let name = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or_default();
            if !pattern_matches(pattern, name) {
                continue;
            }
        }
        let Ok(content) = std::fs::read_to_string(&path) else {
            continue;
        };
        let display = path
            .strip_prefix(root)
            .map(|p| p.to_string_lossy().replace('\\', "/"))
            .unwrap_or_else(|_| path.display().to_string());
        for (i, line) in content.lines().enumerate() {
            let hit = if args.case_sensitive {
                line.contains(&needle)
            } else {
                line.to_lowercase().contains(&needle)
            };
            if hit {
                results.push(format!("{display}:{}: {}", i + 1, line.trim()));
            }
        }
    }

    if results.is_empty() {
        tool_text("No results found")
    } else {
        tool_text(results.join("\n"))
    }
}

/// Read a file, optionally sliced to a 1-indexed line range.
pub fn read_file(root: &Path, args: ReadFileArgs) -> CallToolResult {
    let path = resolve(root, &args.path);
    let content = match std::fs::read_to_string(&path) {
        Ok(c) => c,
        Err(e) => return tool_error(format!("Failed to read file: {e}")),
    };

    match (args.start_line, args.end_line) {
        (Some(start), Some(end)) if start > 0 && end > 0 => {
            let lines: Vec<&str> = content.lines().collect();
            let start = (start - 1).min(lines.len());
            let end = end.min(lines.len());
            tool_text(lines[start..end].join("\n"))
        }
        _ => tool_text(content),
    }
}

/// Overwrite a file, optionally creating parent directories.
pub fn write_file(root: &Path, args: WriteFileArgs) -> CallToolResult {
    let path = resolve(root, &args.path);

    if args.create_dirs {
        if let Some(parent) = path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                return tool_error(format!("Failed to create directories: {e}"));
            }
        }
    }

    match std::fs::write(&path, args.content.as_bytes()) {
        Ok(()) => tool_text(format!("Successfully wrote to {}", args.path)),
        Err(e) => tool_error(format!("Failed to write file: {e}")),
    }
}

/// Line-scoped substring replacement.
pub fn refactor_file(root: &Path, args: RefactorFileArgs) -> CallToolResult {
    let path = resolve(root, &args.path);
    let content = match std::fs::read_to_string(&path) {
        Ok(c) => c,
        Err(e) => return tool_error(format!("Failed to read file: {e}")),
    };

    let mut lines: Vec<String> = content.lines().map(|l| l.to_string()).collect();
    let start = args.start_line.map(|s| s.saturating_sub(1)).unwrap_or(0);
    let end = args.end_line.unwrap_or(lines.len()).min(lines.len());

    let mut replaced = 0usize;
    for line in lines.iter_mut().take(end).skip(start) {
        let hits = line.matches(&args.find).count();
        if hits > 0 {
            *line = line.replace(&args.find, &args.replace);
            replaced += hits;
        }
    }

    if replaced == 0 {
        return tool_text("No matches found to replace");
    }

    let mut updated = lines.join("\n");
    if content.ends_with('\n') {
        updated.push('\n');
    }
    match std::fs::write(&path, updated) {
        Ok(()) => tool_text(format!(
            "Successfully refactored {} ({replaced} replacement(s))",
            args.path
        )),
        Err(e) => tool_error(format!("Failed to write file: {e}")),
    }
}

/// Directory enumeration with `[DIR]` / `[FILE] … (N bytes)` formatting.
pub fn list_files(root: &Path, args: ListFilesArgs) -> CallToolResult {
    let dir = args
        .path
        .as_deref()
        .map(|p| resolve(root, p))
        .unwrap_or_else(|| root.to_path_buf());

    let mut lines = Vec::new();

    if args.recursive {
        let mut files = Vec::new();
        walk_files(&dir, &mut files);
        for path in files {
            if let Some(pattern) = &args.pattern {
                let name = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or_default();
                if !pattern_matches(pattern, name) {
                    continue;
                }
            }
            let rel = path
                .strip_prefix(&dir)
                .map(|p| p.to_string_lossy().replace('\\', "/"))
                .unwrap_or_else(|_| path.display().to_string());
            let size = path.metadata().map(|m| m.len()).unwrap_or(0);
            lines.push(format!("[FILE] {rel} ({size} bytes)"));
        }
    } else {
        let entries = match std::fs::read_dir(&dir) {
            Ok(e) => e,
            Err(e) => return tool_error(format!("Failed to read directory: {e}")),
        };
        let mut entries: Vec<_> = entries.flatten().collect();
        entries.sort_by_key(|e| e.file_name());
        for entry in entries {
            let name = entry.file_name().to_string_lossy().into_owned();
            if let Some(pattern) = &args.pattern {
                if !pattern_matches(pattern, &name) {
                    continue;
                }
            }
            if entry.path().is_dir() {
                lines.push(format!("[DIR]  {name}"));
            } else {
                let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
                lines.push(format!("[FILE] {name} ({size} bytes)"));
            }
        }
    }

    if lines.is_empty() {
        tool_text("No files found")
    } else {
        tool_text(lines.join("\n"))
    }
}

/// Structural outline: top-level declarations for Go, the first 20 lines
/// otherwise.
pub fn get_file_outline(root: &Path, args: GetFileOutlineArgs) -> CallToolResult {
    let path = resolve(root, &args.path);
    let content = match std::fs::read_to_string(&path) {
        Ok(c) => c,
        Err(e) => return tool_error(format!("Failed to read file: {e}")),
    };

    let mut outline = Vec::new();
    let is_go = path.extension().and_then(|e| e.to_str()) == Some("go");

    if is_go {
        for (i, line) in content.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.starts_with("func ")
                || trimmed.starts_with("type ")
                || trimmed.starts_with("const ")
                || trimmed.starts_with("var ")
            {
                outline.push(format!("Line {}: {trimmed}", i + 1));
            }
        }
    } else {
        for (i, line) in content.lines().take(20).enumerate() {
            outline.push(format!("Line {}: {}", i + 1, line.trim()));
        }
    }

    if outline.is_empty() {
        tool_text("No outline available")
    } else {
        tool_text(outline.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn text_of(result: &CallToolResult) -> String {
        result
            .content
            .iter()
            .filter_map(|c| c.as_text().map(|t| t.text.clone()))
            .collect()
    }

    #[test]
    fn search_reports_path_line_and_text() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("pkg")).unwrap();
        fs::write(
            tmp.path().join("pkg/calc.go"),
            "package calc\n\nfunc Add(a, b int) int { return a + b }\n",
        )
        .unwrap();

        let result = search_codebase(
            tmp.path(),
            SearchCodebaseArgs {
                query: "func add".into(),
                path: None,
                file_pattern: Some("*.go".into()),
                case_sensitive: false,
            },
        );
        let text = text_of(&result);
        assert!(text.contains("pkg/calc.go:3: func Add"), "{text}");
    }

    #[test]
    fn search_case_sensitivity() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("a.txt"), "Token\ntoken\n").unwrap();

        let result = search_codebase(
            tmp.path(),
            SearchCodebaseArgs {
                query: "Token".into(),
                path: None,
                file_pattern: None,
                case_sensitive: true,
            },
        );
        let text = text_of(&result);
        assert!(text.contains("a.txt:1:"));
        assert!(!text.contains("a.txt:2:"));
    }

    #[test]
    fn read_file_slices_by_line_range() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("f.txt"), "one\ntwo\nthree\nfour\n").unwrap();

        let result = read_file(
            tmp.path(),
            ReadFileArgs {
                path: "f.txt".into(),
                start_line: Some(2),
                end_line: Some(3),
            },
        );
        assert_eq!(text_of(&result), "two\nthree");
    }

    #[test]
    fn write_file_creates_parents() {
        let tmp = TempDir::new().unwrap();
        let result = write_file(
            tmp.path(),
            WriteFileArgs {
                path: "deep/dir/new.txt".into(),
                content: "hello".into(),
                create_dirs: true,
            },
        );
        assert!(text_of(&result).contains("Successfully wrote"));
        assert_eq!(
            fs::read_to_string(tmp.path().join("deep/dir/new.txt")).unwrap(),
            "hello"
        );
    }

    #[test]
    fn refactor_respects_line_scope_and_reports_count() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("f.txt"), "old\nold\nold\n").unwrap();

        let result = refactor_file(
            tmp.path(),
            RefactorFileArgs {
                path: "f.txt".into(),
                find: "old".into(),
                replace: "new".into(),
                start_line: Some(2),
                end_line: Some(2),
            },
        );
        assert!(text_of(&result).contains("1 replacement"));
        assert_eq!(
            fs::read_to_string(tmp.path().join("f.txt")).unwrap(),
            "old\nnew\nold\n"
        );
    }

    #[test]
    fn refactor_without_matches_reports_none() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("f.txt"), "abc\n").unwrap();
        let result = refactor_file(
            tmp.path(),
            RefactorFileArgs {
                path: "f.txt".into(),
                find: "zzz".into(),
                replace: "x".into(),
                start_line: None,
                end_line: None,
            },
        );
        assert_eq!(text_of(&result), "No matches found to replace");
    }

    #[test]
    fn list_files_formats_dirs_and_sizes() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("sub")).unwrap();
        fs::write(tmp.path().join("a.txt"), "12345").unwrap();

        let result = list_files(
            tmp.path(),
            ListFilesArgs {
                path: None,
                recursive: false,
                pattern: None,
            },
        );
        let text = text_of(&result);
        assert!(text.contains("[FILE] a.txt (5 bytes)"), "{text}");
        assert!(text.contains("[DIR]  sub"), "{text}");
    }

    #[test]
    fn outline_lists_go_declarations() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join("x.go"),
            "package x\n\nconst K = 1\n\ntype T struct{}\n\nfunc F() {}\n",
        )
        .unwrap();

        let result = get_file_outline(
            tmp.path(),
            GetFileOutlineArgs { path: "x.go".into() },
        );
        let text = text_of(&result);
        assert!(text.contains("Line 3: const K = 1"));
        assert!(text.contains("Line 5: type T struct{}"));
        assert!(text.contains("Line 7: func F() {}"));
    }

    #[test]
    fn outline_falls_back_to_first_lines() {
        let tmp = TempDir::new().unwrap();
        let body: String = (1..=30).map(|i| format!("line {i}\n")).collect();
        fs::write(tmp.path().join("notes.txt"), body).unwrap();

        let result = get_file_outline(
            tmp.path(),
            GetFileOutlineArgs {
                path: "notes.txt".into(),
            },
        );
        let text = text_of(&result);
        assert!(text.contains("Line 1: line 1"));
        assert!(text.contains("Line 20: line 20"));
        assert!(!text.contains("Line 21"));
    }
}
