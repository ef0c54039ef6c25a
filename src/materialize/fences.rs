//! Fenced code-block parsing.
//!
//! The fence grammar and the explicit-path directive grammar are the only
//! bit-exact surfaces the core owns: a fence opens with triple backticks and
//! an optional language identifier on the same line, carries a body, and
//! closes with triple backticks on their own line. Malformed (unterminated)
//! fences are skipped.

use std::sync::LazyLock;

use regex::Regex;

/// One parsed code block. The language tag is lowercased and trimmed; it may
/// be empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeFence {
    pub lang: String,
    pub body: String,
}

static FENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```([a-zA-Z0-9_+.-]*)[ \t]*\r?\n(.*?)\r?\n```").expect("fence regex")
});

/// Extract fences from a model response, in source order.
pub fn parse_fences(response: &str) -> Vec<CodeFence> {
    FENCE_RE
        .captures_iter(response)
        .map(|c| CodeFence {
            lang: c[1].trim().to_ascii_lowercase(),
            body: c[2].to_string(),
        })
        .collect()
}

static PATH_DIRECTIVE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(?:@path\s+|(?://|#|--)\s*path:\s*|<!--\s*path:\s*)([^\s>]+)")
        .expect("path directive regex")
});

/// Look for an explicit-path directive as the first non-blank line of `body`.
///
/// Recognized forms: `@path p`, `// path: p`, `# path: p`, `-- path: p`,
/// `<!-- path: p -->`. On a hit the directive line is stripped and the
/// forward-slash path is returned.
pub fn extract_path_directive(body: &str) -> (Option<String>, String) {
    let mut lines = body.lines();
    let mut leading = Vec::new();

    for line in lines.by_ref() {
        if line.trim().is_empty() {
            leading.push(line);
            continue;
        }
        if let Some(caps) = PATH_DIRECTIVE_RE.captures(line) {
            let path = caps[1].trim().replace('\\', "/");
            let mut rest: Vec<&str> = leading;
            rest.extend(lines);
            return (Some(path), rest.join("\n"));
        }
        break;
    }

    (None, body.to_string())
}

/// Guess a language tag from body heuristics when the fence declared none.
/// An empty result means "plain text".
pub fn guess_language(body: &str) -> &'static str {
    if body.contains("package main") || body.contains("func main(") {
        "go"
    } else if body.contains("def ") {
        "python"
    } else if body.contains("import React") {
        "js"
    } else if body.contains("fn main") {
        "rust"
    } else if body.contains("#include") {
        "cpp"
    } else {
        ""
    }
}
