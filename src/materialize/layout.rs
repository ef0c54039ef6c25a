//! Destination inference for fences without an explicit path directive.
//!
//! The routing table is part of the contract: a universal package/module
//! directive wins, then a language-specific token, then a per-language
//! default directory. The import normalizer assumes this routing, so moving
//! a language's default (for instance Rust modules out of `src/`) breaks
//! neighbor rewrites.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use crate::context::ext_for_lang;

macro_rules! re {
    ($name:ident, $pattern:expr) => {
        static $name: LazyLock<Regex> =
            LazyLock::new(|| Regex::new($pattern).expect(concat!(stringify!($name), " regex")));
    };
}

re!(UNIVERSAL_AT_PACKAGE, r"@package\s+([a-zA-Z_][a-zA-Z0-9_.-]*)");
re!(UNIVERSAL_AT_MODULE, r"@module\s+([a-zA-Z_][a-zA-Z0-9_.-]*)");
re!(UNIVERSAL_HASH, r"#\s*package:\s*([a-zA-Z_][a-zA-Z0-9_.-]*)");
re!(UNIVERSAL_SLASH, r"//\s*package:\s*([a-zA-Z_][a-zA-Z0-9_.-]*)");

re!(GO_PACKAGE, r"(?m)^package\s+([a-zA-Z_][a-zA-Z0-9_]*)");
re!(PY_CLASS, r"class\s+([A-Za-z_][A-Za-z0-9_]*)");
re!(JS_PACKAGE, r"[@/]\s*(?:package|module)\s+([a-zA-Z_][a-zA-Z0-9_-]*)");
re!(RUST_MOD, r"(?m)^(?:pub\s+)?mod\s+([a-zA-Z_][a-zA-Z0-9_]*)");
re!(JAVA_PACKAGE, r"(?m)^package\s+([a-zA-Z_][a-zA-Z0-9_.]*)\s*;");
re!(CSHARP_NAMESPACE, r"(?m)^\s*namespace\s+([a-zA-Z_][a-zA-Z0-9_.]*)");
re!(CPP_NAMESPACE, r"(?m)^\s*namespace\s+([a-zA-Z_][a-zA-Z0-9_]*)");
re!(RUBY_MODULE, r"(?m)^\s*module\s+([A-Z][a-zA-Z0-9_]*)");
re!(PHP_NAMESPACE, r"(?m)^\s*namespace\s+([a-zA-Z_][a-zA-Z0-9_\\]*)\s*;");
re!(KOTLIN_PACKAGE, r"(?m)^package\s+([a-zA-Z_][a-zA-Z0-9_.]*)");
re!(SWIFT_TYPE, r"public\s+(?:struct|class)\s+([A-Z][a-zA-Z0-9_]*)");
re!(DART_LIBRARY, r"(?m)^library\s+([a-zA-Z_][a-zA-Z0-9_.]*)");
re!(LUA_MODULE, r"(?m)^local\s+([a-zA-Z_][a-zA-Z0-9_]*)\s*=\s*\{\}");
re!(ELIXIR_MODULE, r"(?m)^\s*defmodule\s+([A-Z][a-zA-Z0-9_.]*)");
re!(SCALA_PACKAGE, r"(?m)^package\s+([a-zA-Z_][a-zA-Z0-9_.]*)");
re!(CLOJURE_NS, r"(?m)^\s*\(\s*ns\s+([a-zA-Z_][a-zA-Z0-9_.-]*)");
re!(HASKELL_MODULE, r"(?m)^module\s+([A-Z][a-zA-Z0-9_.]*)");
re!(R_PACKAGE, r"#'\s*@package\s+([a-zA-Z_][a-zA-Z0-9_.]*)");
re!(JULIA_MODULE, r"(?m)^\s*module\s+([A-Z][a-zA-Z0-9_]*)");

fn first_capture(re: &Regex, body: &str) -> Option<String> {
    re.captures(body).map(|c| c[1].to_string())
}

/// Universal package directive, honored for any language.
fn extract_universal_package(body: &str) -> Option<String> {
    for re in [
        &*UNIVERSAL_AT_PACKAGE,
        &*UNIVERSAL_AT_MODULE,
        &*UNIVERSAL_HASH,
        &*UNIVERSAL_SLASH,
    ] {
        if let Some(pkg) = first_capture(re, body) {
            return Some(pkg);
        }
    }
    None
}

fn extract_go_package(body: &str) -> Option<String> {
    first_capture(&GO_PACKAGE, body)
}

fn extract_python_package(body: &str) -> Option<String> {
    // Only treat a class as a package name when module markers are present.
    if body.contains("__all__") || body.contains("__init__") {
        if let Some(name) = first_capture(&PY_CLASS, body) {
            return Some(name.to_ascii_lowercase());
        }
    }
    None
}

fn dotted_to_path(name: &str) -> PathBuf {
    name.split('.').collect()
}

/// Does the body look like a C/C++ header (guarded or `#pragma once`)?
fn looks_like_header(body: &str) -> bool {
    body.contains("#ifndef") || body.contains("#pragma once")
}

/// Decide the destination directory for a fence body and report the detected
/// package/module name when one was found.
pub fn resolve_destination(root: &Path, lang: &str, body: &str) -> (PathBuf, Option<String>) {
    if let Some(pkg) = extract_universal_package(body) {
        return (root.join(&pkg), Some(pkg));
    }

    match lang {
        "go" | "golang" => match extract_go_package(body) {
            Some(pkg) if pkg != "main" => (root.join(&pkg), Some(pkg)),
            _ => (root.to_path_buf(), None),
        },
        "python" | "py" => match extract_python_package(body) {
            Some(pkg) => (root.join(&pkg), Some(pkg)),
            None => (root.join(lang), None),
        },
        "js" | "javascript" | "ts" | "typescript" => match first_capture(&JS_PACKAGE, body) {
            Some(pkg) => (root.join(&pkg), Some(pkg)),
            None => (root.join(lang), None),
        },
        "rs" | "rust" => match first_capture(&RUST_MOD, body) {
            Some(m) => (root.join("src").join(&m), Some(m)),
            None => (root.join("src"), None),
        },
        "java" => match first_capture(&JAVA_PACKAGE, body) {
            Some(pkg) => (root.join("src").join(dotted_to_path(&pkg)), Some(pkg)),
            None => (root.join("src"), None),
        },
        "cs" | "csharp" | "c#" => match first_capture(&CSHARP_NAMESPACE, body) {
            Some(ns) => (root.join(dotted_to_path(&ns)), Some(ns)),
            None => (root.join(lang), None),
        },
        "cpp" | "c++" | "cc" | "cxx" => match first_capture(&CPP_NAMESPACE, body) {
            Some(ns) => (root.join("include").join(&ns), Some(ns)),
            None if looks_like_header(body) => (root.join("include"), None),
            None => (root.join("src"), None),
        },
        "c" => {
            if looks_like_header(body) {
                (root.join("include"), None)
            } else {
                (root.join("src"), None)
            }
        }
        "rb" | "ruby" => match first_capture(&RUBY_MODULE, body) {
            Some(m) => (root.join("lib").join(m.to_ascii_lowercase()), Some(m)),
            None => (root.join("lib"), None),
        },
        "php" => match first_capture(&PHP_NAMESPACE, body) {
            Some(ns) => {
                let ns_path: PathBuf = ns.split('\\').collect();
                (root.join("src").join(ns_path), Some(ns))
            }
            None => (root.join("src"), None),
        },
        "kt" | "kotlin" => match first_capture(&KOTLIN_PACKAGE, body) {
            Some(pkg) => (root.join("src").join(dotted_to_path(&pkg)), Some(pkg)),
            None => (root.join("src"), None),
        },
        "swift" => match first_capture(&SWIFT_TYPE, body) {
            Some(m) => (root.join("Sources").join(&m), Some(m)),
            None => (root.join("Sources"), None),
        },
        "dart" => match first_capture(&DART_LIBRARY, body) {
            Some(pkg) => (root.join("lib").join(&pkg), Some(pkg)),
            None => (root.join("lib"), None),
        },
        "lua" => match first_capture(&LUA_MODULE, body) {
            Some(m) if body.contains(&format!("return {m}")) => (root.join(&m), Some(m)),
            _ => (root.to_path_buf(), None),
        },
        "elixir" | "ex" => match first_capture(&ELIXIR_MODULE, body) {
            Some(m) => {
                let p = dotted_to_path(&m.to_ascii_lowercase());
                (root.join("lib").join(p), Some(m))
            }
            None => (root.join("lib"), None),
        },
        "scala" => match first_capture(&SCALA_PACKAGE, body) {
            Some(pkg) => (
                root.join("src/main/scala").join(dotted_to_path(&pkg)),
                Some(pkg),
            ),
            None => (root.join("src/main/scala"), None),
        },
        "clojure" | "clj" => match first_capture(&CLOJURE_NS, body) {
            Some(ns) => {
                let path = ns.replace('.', "/").replace('-', "_");
                (root.join("src").join(path), Some(ns))
            }
            None => (root.join("src"), None),
        },
        "haskell" | "hs" => match first_capture(&HASKELL_MODULE, body) {
            Some(m) => (root.join("src").join(dotted_to_path(&m)), Some(m)),
            None => (root.join("src"), None),
        },
        "r" => match first_capture(&R_PACKAGE, body) {
            Some(pkg) => (root.join("R").join(&pkg), Some(pkg)),
            None => (root.join("R"), None),
        },
        "julia" | "jl" => match first_capture(&JULIA_MODULE, body) {
            Some(m) => (root.join("src").join(&m), Some(m)),
            None => (root.join("src"), None),
        },
        _ => (root.join(lang), None),
    }
}

/// Strip quotes and trailing punctuation from a candidate filename token.
pub fn sanitize_filename(name: &str) -> String {
    name.trim()
        .trim_matches(|c| "(){};:".contains(c))
        .replace(['"', '\''], "")
}

fn token_after(body: &str, key: &str) -> Option<String> {
    let idx = body.find(key)?;
    let line = body[idx + key.len()..].lines().next()?;
    line.split_whitespace().next().map(|s| s.to_string())
}

/// Derive a base filename from recognizable tokens in the body.
///
/// Returns `None` when nothing usable is found; the caller then falls back
/// to an indexed `generated/` path.
pub fn guess_filename(lang: &str, body: &str) -> Option<String> {
    let base = match lang {
        "go" | "golang" => {
            if body.contains("package main") || body.contains("func main(") {
                Some("main".to_string())
            } else {
                token_after(body, "package ")
            }
        }
        "py" | "python" => {
            if body.contains("def main(") {
                Some("main".to_string())
            } else {
                token_after(body, "class ").map(|c| c.to_ascii_lowercase())
            }
        }
        "rs" | "rust" => {
            if body.contains("fn main(") {
                Some("main".to_string())
            } else {
                first_capture(&RUST_MOD, body)
                    .or_else(|| token_after(body, "struct "))
                    .map(|s| s.to_ascii_lowercase())
            }
        }
        "java" | "kt" | "kotlin" | "cs" | "csharp" | "swift" | "scala" => {
            token_after(body, "class ").or_else(|| token_after(body, "struct "))
        }
        "rb" | "ruby" => {
            token_after(body, "class ").map(|c| c.to_ascii_lowercase())
        }
        "yaml" | "yml" => Some("config".to_string()),
        "json" => Some("data".to_string()),
        "sh" | "bash" | "shell" => Some("script".to_string()),
        _ => None,
    };

    let base = sanitize_filename(&base?);
    if base.is_empty() {
        return None;
    }
    Some(format!("{base}.{}", ext_for_lang(lang)))
}
