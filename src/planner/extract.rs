//! Tolerant extraction of JSON from free-form model output.
//!
//! Models asked for "JSON only" still wrap answers in fences, prose, single
//! quotes, backticks and trailing commas. The fallback chain here is part of
//! the contract: widening it further risks false positives, narrowing it to
//! strict JSON breaks interoperability with current models. The extractor
//! never fabricates keys — inputs with no JSON and no list shape fail.

use std::sync::LazyLock;

use anyhow::{bail, Result};
use regex::Regex;
use serde_json::Value;

static JSON_FENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)```(?:json[c5]?)?\s*([\[{].*?[\]}])\s*```").expect("json fence regex")
});

static TRAILING_ARRAY_COMMA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r",\s*\]").expect("trailing array comma regex"));
static TRAILING_OBJECT_COMMA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r",\s*\}").expect("trailing object comma regex"));
static BACKTICK_STRING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"`([^`\\]*(?:\\.[^`\\]*)*)`").expect("backtick string regex"));
static ANY_JSON_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)(\[.*?\]|\{.*?\})").expect("any-json regex"));

/// Normalize the common kinds of almost-JSON emitted by models.
fn sanitize(candidate: &str) -> String {
    let mut s = candidate.trim().to_string();
    s = s.replace('\'', "\"");
    s = TRAILING_ARRAY_COMMA.replace_all(&s, "]").into_owned();
    s = TRAILING_OBJECT_COMMA.replace_all(&s, "}").into_owned();
    if s.contains('`') {
        s = BACKTICK_STRING_RE.replace_all(&s, "\"$1\"").into_owned();
    }
    s.trim().to_string()
}

/// Pull the best JSON candidate substring out of `raw`.
fn candidate_of(raw: &str) -> Option<String> {
    if let Some(caps) = JSON_FENCE_RE.captures(raw) {
        return Some(caps[1].to_string());
    }
    let start = raw.find(['[', '{'])?;
    let end = raw.rfind([']', '}'])?;
    if end < start {
        return None;
    }
    Some(raw[start..=end].to_string())
}

/// Build a JSON array of strings from bullet/numbered list lines.
fn list_fallback(raw: &str) -> Option<Value> {
    let mut items = Vec::new();
    for line in raw.lines() {
        let line = line
            .trim()
            .trim_start_matches(['-', '•', '*', '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', '.', ' '])
            .trim();
        if line.is_empty() {
            continue;
        }
        if line.to_ascii_lowercase().contains("step") {
            continue;
        }
        if line.len() < 120 {
            items.push(Value::String(line.to_string()));
        }
    }
    if items.is_empty() {
        None
    } else {
        Some(Value::Array(items))
    }
}

/// Extract a JSON value from a model response.
pub fn extract_json(raw: &str) -> Result<Value> {
    let raw = raw.trim();
    if raw.is_empty() {
        bail!("empty response");
    }

    if let Some(candidate) = candidate_of(raw) {
        let sanitized = sanitize(&candidate);
        if !sanitized.is_empty() {
            if let Ok(value) = serde_json::from_str::<Value>(&sanitized) {
                return Ok(value);
            }
            // The cleaned text may still carry junk around an inner value.
            for caps in ANY_JSON_RE.captures_iter(&sanitized) {
                if let Ok(value) = serde_json::from_str::<Value>(&caps[1]) {
                    return Ok(value);
                }
            }
        }
    }

    if let Some(value) = list_fallback(raw) {
        return Ok(value);
    }

    bail!("no JSON object or array found in response")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn fenced_json_object() {
        let value = extract_json("```json\n{\"key\": \"value\"}\n```").unwrap();
        assert_eq!(value, json!({"key": "value"}));
    }

    #[test]
    fn fenced_jsonc_and_uppercase_tags() {
        let value = extract_json("```JSON\n[1, 2, 3]\n```").unwrap();
        assert_eq!(value, json!([1, 2, 3]));
        let value = extract_json("```jsonc\n[1]\n```").unwrap();
        assert_eq!(value, json!([1]));
    }

    #[test]
    fn unfenced_json_with_surrounding_prose() {
        let value = extract_json("Sure, here is the plan: [\"a\", \"b\"] — hope that helps!").unwrap();
        assert_eq!(value, json!(["a", "b"]));
    }

    #[test]
    fn backticks_and_trailing_commas() {
        let raw = "Here you go:\n[{`name`: `server`, `path`: `src/server.go`, `lang`: `Go`, `goal`: `serve`,},]\n";
        let value = extract_json(raw).unwrap();
        assert_eq!(
            value,
            json!([{"name": "server", "path": "src/server.go", "lang": "Go", "goal": "serve"}])
        );
    }

    #[test]
    fn single_quotes_become_double_quotes() {
        let value = extract_json("['x', 'y']").unwrap();
        assert_eq!(value, json!(["x", "y"]));
    }

    #[test]
    fn list_fallback_strips_bullets_and_step_lines() {
        let raw = "1. add the config loader\n2. wire it into startup\nStep summary: ignore me\n";
        let value = extract_json(raw).unwrap();
        assert_eq!(
            value,
            json!(["add the config loader", "wire it into startup"])
        );
    }

    #[test]
    fn no_structure_at_all_fails() {
        assert!(extract_json("").is_err());
    }

    #[test]
    fn prose_without_json_uses_list_shape() {
        let value = extract_json("first do this\nthen do that").unwrap();
        assert_eq!(value, json!(["first do this", "then do that"]));
    }
}
