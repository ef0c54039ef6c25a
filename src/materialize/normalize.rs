//! Post-write import-path normalization.
//!
//! Runs after every batch of writes. Each language pass is best-effort: a
//! file that fails to read or parse is left untouched, files are rewritten
//! only when their text actually changed, and no failure propagates out of
//! the pass.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::context::is_ignored_dir;

/// Run all language-specific fixers over the workspace.
pub fn normalize_imports(root: &Path) {
    normalize_go(root);
    normalize_python(root);
    normalize_js_like(root);
    normalize_java_like(root);
    normalize_cpp_like(root);
    normalize_php(root);
}

fn collect_files(root: &Path, exts: &[&str]) -> Vec<PathBuf> {
    let mut out = Vec::new();
    collect_files_into(root, exts, &mut out);
    out.sort();
    out
}

fn collect_files_into(dir: &Path, exts: &[&str], out: &mut Vec<PathBuf>) {
    let entries = match fs::read_dir(dir) {
        Ok(e) => e,
        Err(_) => return,
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                if is_ignored_dir(name) {
                    continue;
                }
            }
            collect_files_into(&path, exts, out);
        } else if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            if exts.iter().any(|e| e.eq_ignore_ascii_case(ext)) {
                out.push(path);
            }
        }
    }
}

fn rewrite_if_changed(path: &Path, original: &str, updated: String) {
    if updated != original {
        if let Err(e) = fs::write(path, updated) {
            debug!("normalize: failed to rewrite {}: {e}", path.display());
        }
    }
}

// --------------------------- Go ----------------------------------------------

/// Module identifier from `go.mod` (the token after `module`).
fn go_module_path(root: &Path) -> Option<String> {
    let content = fs::read_to_string(root.join("go.mod")).ok()?;
    for line in content.lines() {
        let line = line.trim();
        if let Some(rest) = line.strip_prefix("module ") {
            return Some(rest.trim().to_string());
        }
    }
    None
}

/// Rewrite one Go import path: a path with a `src` segment is re-rooted on
/// the module identifier.
fn fix_go_import(module: &str, path: &str) -> Option<String> {
    let parts: Vec<&str> = path.split('/').collect();
    for i in 0..parts.len().saturating_sub(1) {
        if parts[i] == "src" {
            let new_path = format!("{module}/{}", parts[i + 1..].join("/"));
            if new_path != path {
                return Some(new_path);
            }
            return None;
        }
    }
    None
}

static GO_IMPORT_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^(\s*(?:import\s+)?(?:[A-Za-z_][A-Za-z0-9_]*\s+|\.\s+|_\s+)?)"([^"]+)"(.*)$"#)
        .expect("go import-line regex")
});

fn normalize_go(root: &Path) {
    let Some(module) = go_module_path(root) else {
        return;
    };

    for path in collect_files(root, &["go"]) {
        if path
            .components()
            .any(|c| c.as_os_str().to_str() == Some("vendor"))
        {
            continue;
        }
        let Ok(original) = fs::read_to_string(&path) else {
            continue;
        };

        let mut in_import_block = false;
        let mut changed = false;
        let updated: Vec<String> = original
            .lines()
            .map(|line| {
                let trimmed = line.trim_start();
                if trimmed.starts_with("import (") {
                    in_import_block = true;
                    return line.to_string();
                }
                if in_import_block && trimmed.starts_with(')') {
                    in_import_block = false;
                    return line.to_string();
                }
                let is_import_line = in_import_block || trimmed.starts_with("import ");
                if !is_import_line {
                    return line.to_string();
                }
                if let Some(caps) = GO_IMPORT_LINE.captures(line) {
                    if let Some(fixed) = fix_go_import(&module, &caps[2]) {
                        changed = true;
                        return format!("{}\"{}\"{}", &caps[1], fixed, &caps[3]);
                    }
                }
                line.to_string()
            })
            .collect();

        if changed {
            rewrite_if_changed(&path, &original, updated.join("\n") + "\n");
        }
    }
}

// --------------------------- Python ------------------------------------------

static PY_FROM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^(\s*from\s+)([A-Za-z0-9_.]+)(\s+import\s+)").unwrap());
static PY_IMPORT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^(\s*import\s+)([A-Za-z0-9_.]+)").unwrap());

fn strip_py_module(root_base: &str, module: &str) -> String {
    let mut m = module.to_string();
    if let Some(rest) = m.strip_prefix("src.") {
        m = rest.to_string();
    }
    m = m.replace(".src.", ".");
    if let Some(rest) = m.strip_prefix(&format!("{root_base}.src.")) {
        m = rest.to_string();
    } else if let Some(rest) = m.strip_prefix(&format!("{root_base}.")) {
        m = rest.to_string();
    }
    m
}

fn normalize_python(root: &Path) {
    let files = collect_files(root, &["py"]);
    if files.is_empty() {
        return;
    }
    let root_base = root
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_string();

    let mut package_dirs = Vec::new();
    for path in &files {
        if let Some(dir) = path.parent() {
            if !package_dirs.contains(&dir.to_path_buf()) {
                package_dirs.push(dir.to_path_buf());
            }
        }
        let Ok(original) = fs::read_to_string(path) else {
            continue;
        };

        let updated = PY_FROM.replace_all(&original, |caps: &regex::Captures| {
            format!(
                "{}{}{}",
                &caps[1],
                strip_py_module(&root_base, &caps[2]),
                &caps[3]
            )
        });
        let updated = PY_IMPORT.replace_all(&updated, |caps: &regex::Captures| {
            format!("{}{}", &caps[1], strip_py_module(&root_base, &caps[2]))
        });

        rewrite_if_changed(path, &original, updated.into_owned());
    }

    // Packages need an __init__.py to be importable.
    for dir in package_dirs {
        if dir == *root {
            continue;
        }
        let init = dir.join("__init__.py");
        if !init.exists() {
            let _ = fs::write(init, b"");
        }
    }
}

// --------------------------- JS / TS -----------------------------------------

static JS_IMPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^(\s*(?:import|export)\s+(?:[^'"]*?\s+from\s+)?)["']([^"']+)["']"#).unwrap()
});

fn rel_from_to(from_dir: &Path, abs_target: &Path) -> Option<String> {
    let rel = pathdiff_rel(from_dir, abs_target)?;
    let rel = rel.replace('\\', "/");
    if rel.starts_with('.') {
        Some(rel)
    } else {
        Some(format!("./{rel}"))
    }
}

/// Relative path from `from` to `to` using component-wise comparison.
fn pathdiff_rel(from: &Path, to: &Path) -> Option<String> {
    let from: Vec<_> = from.components().collect();
    let to: Vec<_> = to.components().collect();
    let common = from
        .iter()
        .zip(to.iter())
        .take_while(|(a, b)| a == b)
        .count();
    let mut parts: Vec<String> = Vec::new();
    for _ in common..from.len() {
        parts.push("..".to_string());
    }
    for comp in &to[common..] {
        parts.push(comp.as_os_str().to_str()?.to_string());
    }
    Some(parts.join("/"))
}

fn is_under_root(root: &Path, target: &str) -> bool {
    root.join(target).exists()
}

fn normalize_js_like(root: &Path) {
    let files = collect_files(root, &["js", "mjs", "cjs", "ts", "tsx", "jsx"]);
    for path in files {
        let Ok(original) = fs::read_to_string(&path) else {
            continue;
        };
        let from_dir = path.parent().unwrap_or(root).to_path_buf();

        let updated = JS_IMPORT.replace_all(&original, |caps: &regex::Captures| {
            let prefix = &caps[1];
            let target = &caps[2];
            let whole = caps[0].to_string();

            if target.starts_with('.') || target.starts_with('@') {
                return whole;
            }

            let resolved = if let Some(idx) = target.find("/src/") {
                Some(root.join("src").join(&target[idx + "/src/".len()..]))
            } else if let Some(suffix) = target.strip_prefix("src/") {
                Some(root.join("src").join(suffix))
            } else if is_under_root(root, target) {
                Some(root.join(target))
            } else {
                None
            };

            match resolved.and_then(|abs| rel_from_to(&from_dir, &abs)) {
                Some(new_rel) if new_rel != *target => format!("{prefix}\"{new_rel}\""),
                _ => whole,
            }
        });

        rewrite_if_changed(&path, &original, updated.into_owned());
    }
}

// --------------------------- Java / Kotlin -----------------------------------

static JAVA_PKG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^(package\s+)([A-Za-z0-9_.]+)\s*;").unwrap());
static JAVA_IMP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^(import\s+)([A-Za-z0-9_.]+)\s*;").unwrap());

fn strip_src_segment(name: &str) -> String {
    let mut n = name.replace(".src.", ".");
    if let Some(rest) = n.strip_prefix("src.") {
        n = rest.to_string();
    }
    n.replace("..", ".")
}

fn normalize_java_like(root: &Path) {
    for path in collect_files(root, &["java", "kt"]) {
        let Ok(original) = fs::read_to_string(&path) else {
            continue;
        };
        let fix = |caps: &regex::Captures| {
            let fixed = strip_src_segment(&caps[2]);
            format!("{}{fixed};", &caps[1])
        };
        let updated = JAVA_PKG.replace_all(&original, fix);
        let updated = JAVA_IMP.replace_all(&updated, fix);
        rewrite_if_changed(&path, &original, updated.into_owned());
    }
}

// --------------------------- C / C++ -----------------------------------------

static INCLUDE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?m)^(\s*#\s*include\s*)[<"]([^">]+)[">]"#).unwrap());

fn normalize_cpp_like(root: &Path) {
    let files = collect_files(root, &["c", "h", "hpp", "hh", "hxx", "cpp", "cc", "cxx"]);
    for path in files {
        let Ok(original) = fs::read_to_string(&path) else {
            continue;
        };
        let from_dir = path.parent().unwrap_or(root).to_path_buf();

        let updated = INCLUDE_RE.replace_all(&original, |caps: &regex::Captures| {
            let prefix = &caps[1];
            let target = &caps[2];
            let whole = caps[0].to_string();

            let resolved = if let Some(idx) = target.find("/src/") {
                let abs = root.join("src").join(&target[idx + "/src/".len()..]);
                abs.exists().then_some(abs)
            } else if is_under_root(root, target) {
                Some(root.join(target))
            } else {
                None
            };

            match resolved.and_then(|abs| rel_from_to(&from_dir, &abs)) {
                Some(new_rel) if new_rel != *target => format!("{prefix}\"{new_rel}\""),
                _ => whole,
            }
        });

        rewrite_if_changed(&path, &original, updated.into_owned());
    }
}

// --------------------------- PHP ---------------------------------------------

static PHP_USE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^(\s*use\s+)([A-Za-z0-9_\\]+)\s*;").unwrap());

fn normalize_php(root: &Path) {
    for path in collect_files(root, &["php"]) {
        let Ok(original) = fs::read_to_string(&path) else {
            continue;
        };
        let updated = PHP_USE.replace_all(&original, |caps: &regex::Captures| {
            let fixed = caps[2].replace("\\Src\\", "\\");
            format!("{}{fixed};", &caps[1])
        });
        rewrite_if_changed(&path, &original, updated.into_owned());
    }
}
