//! Plan shapes: sub-goal steps, per-file plan items and entrypoint discovery.

use std::path::Path;

use serde::Deserialize;
use serde_json::Value;

use crate::context::{ext_for_lang, is_ignored_dir};
use crate::materialize::sanitize_filename;

use super::extract::extract_json;

/// Plans are hard-capped at this many sub-goals.
pub const MAX_SUBGOALS: usize = 8;

/// A sub-goal in an orchestrator plan. `prev_runtime_err` carries the
/// previous step's runtime failure into this step's goal text.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlanStep {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub goal: String,
    #[serde(default)]
    pub prev_runtime_err: String,
}

/// One file to generate in a phase.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct FilePlanItem {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub lang: String,
    #[serde(default)]
    pub goal: String,
}

/// Heuristic fallback when the model refuses to emit JSON: non-empty,
/// non-hash lines, with an optional `name: goal` colon split.
pub fn heuristic_split(raw: &str) -> Vec<PlanStep> {
    let mut steps = Vec::new();
    for line in raw.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match line.split_once(':') {
            Some((name, goal)) => steps.push(PlanStep {
                name: name.trim().to_string(),
                goal: goal.trim().to_string(),
                ..Default::default()
            }),
            None => steps.push(PlanStep {
                goal: line.to_string(),
                ..Default::default()
            }),
        }
    }
    steps
}

/// Parse a sub-goal list out of a model response: array of strings, array of
/// `{name, goal}` records, or the heuristic line split. Capped at
/// [`MAX_SUBGOALS`].
pub fn parse_plan_steps(raw: &str) -> Vec<PlanStep> {
    let mut steps = match extract_json(raw) {
        Ok(Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(goal) => {
                    let goal = goal.trim().to_string();
                    (!goal.is_empty()).then(|| PlanStep {
                        goal,
                        ..Default::default()
                    })
                }
                obj @ Value::Object(_) => serde_json::from_value::<PlanStep>(obj)
                    .ok()
                    .filter(|s| !s.goal.is_empty() || !s.name.is_empty()),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    };

    if steps.is_empty() {
        steps = heuristic_split(raw);
    }
    steps.truncate(MAX_SUBGOALS);
    steps
}

fn default_item_for(name: &str, lang: &str, goal: &str) -> FilePlanItem {
    let base = sanitize_filename(name);
    FilePlanItem {
        name: Path::new(name)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| name.to_string()),
        path: format!("src/{base}.{}", ext_for_lang(lang)),
        lang: lang.to_string(),
        goal: goal.to_string(),
    }
}

/// Fill missing `path`/`lang`/`goal` fields deterministically and drop
/// duplicate paths so each path is written by at most one worker.
pub fn normalize_plan(items: Vec<FilePlanItem>, lang: &str, goal: &str) -> Vec<FilePlanItem> {
    let mut seen = Vec::new();
    let mut out = Vec::new();
    for mut item in items {
        if item.name.is_empty() && item.path.is_empty() {
            continue;
        }
        if item.path.is_empty() {
            item.path = format!("src/{}.{}", sanitize_filename(&item.name), ext_for_lang(lang));
        }
        if item.name.is_empty() {
            item.name = Path::new(&item.path)
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
        }
        if item.lang.is_empty() {
            item.lang = lang.to_string();
        }
        if item.goal.is_empty() {
            item.goal = goal.to_string();
        }
        if seen.contains(&item.path) {
            continue;
        }
        seen.push(item.path.clone());
        out.push(item);
    }
    out
}

/// Parse a file plan tolerating the shapes current models produce: an array
/// of objects, a single object, an array of strings, or a `{"files": [...]}`
/// style wrapper.
pub fn parse_file_plan(raw: &str, lang: &str, goal: &str) -> anyhow::Result<Vec<FilePlanItem>> {
    let value = extract_json(raw)?;

    if let Ok(items) = serde_json::from_value::<Vec<FilePlanItem>>(value.clone()) {
        let normalized = normalize_plan(items, lang, goal);
        if !normalized.is_empty() {
            return Ok(normalized);
        }
    }

    if let Ok(names) = serde_json::from_value::<Vec<String>>(value.clone()) {
        let items = names
            .iter()
            .map(|n| default_item_for(n.trim(), lang, goal))
            .collect();
        let normalized = normalize_plan(items, lang, goal);
        if !normalized.is_empty() {
            return Ok(normalized);
        }
    }

    if let Value::Object(map) = &value {
        // A single plan item, or a wrapper object holding the real list.
        if let Ok(single) = serde_json::from_value::<FilePlanItem>(value.clone()) {
            let normalized = normalize_plan(vec![single], lang, goal);
            if !normalized.is_empty() {
                return Ok(normalized);
            }
        }
        for inner in map.values() {
            if let Ok(items) = serde_json::from_value::<Vec<FilePlanItem>>(inner.clone()) {
                let normalized = normalize_plan(items, lang, goal);
                if !normalized.is_empty() {
                    return Ok(normalized);
                }
            }
            if let Ok(names) = serde_json::from_value::<Vec<String>>(inner.clone()) {
                let items = names
                    .iter()
                    .map(|n| default_item_for(n.trim(), lang, goal))
                    .collect();
                let normalized = normalize_plan(items, lang, goal);
                if !normalized.is_empty() {
                    return Ok(normalized);
                }
            }
        }
    }

    anyhow::bail!("file plan JSON had no usable shape")
}

/// Entrypoint candidates per language. The first match in walk order wins and
/// is returned as a workspace-relative path.
const ENTRYPOINTS: &[(&str, &[&str])] = &[
    ("go", &["main.go"]),
    ("python", &["app.py", "main.py"]),
    ("javascript", &["index.js", "main.js"]),
    ("typescript", &["index.ts", "main.ts", "index.tsx"]),
    ("rust", &["main.rs"]),
    ("java", &["main.java"]),
    ("c", &["main.c"]),
    ("cpp", &["main.cpp", "main.cc", "main.cxx"]),
    ("ruby", &["main.rb", "app.rb"]),
    ("php", &["index.php", "main.php"]),
    ("lua", &["main.lua", "app.lua"]),
    ("bash", &["run.sh", "main.sh"]),
    ("kotlin", &["main.kt", "main.kts"]),
    ("scala", &["main.scala", "app.scala"]),
    ("swift", &["main.swift"]),
    ("dart", &["main.dart"]),
];

/// Scan the workspace for the most likely entrypoint.
pub fn find_entrypoint(root: &Path) -> Option<(String, String)> {
    find_entrypoint_under(root, root)
}

fn find_entrypoint_under(root: &Path, dir: &Path) -> Option<(String, String)> {
    let mut entries: Vec<_> = std::fs::read_dir(dir).ok()?.flatten().collect();
    entries.sort_by_key(|e| e.file_name());

    for entry in &entries {
        let path = entry.path();
        if path.is_file() {
            let name = entry.file_name().to_string_lossy().to_ascii_lowercase();
            for (lang, patterns) in ENTRYPOINTS {
                if patterns.contains(&name.as_str()) {
                    let rel = path
                        .strip_prefix(root)
                        .ok()?
                        .to_string_lossy()
                        .replace('\\', "/");
                    return Some((rel, lang.to_string()));
                }
            }
        }
    }
    for entry in &entries {
        let path = entry.path();
        if path.is_dir() {
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                if is_ignored_dir(name) {
                    continue;
                }
            }
            if let Some(found) = find_entrypoint_under(root, &path) {
                return Some(found);
            }
        }
    }
    None
}
