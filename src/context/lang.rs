//! Language tables: extension admission sets, fence tags, MIME types and
//! prompt-language detection.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

/// Generic admission set: common source, docs and config extensions. Never
/// binaries.
const GENERIC_EXTS: &[&str] = &[
    "go", "md", "yaml", "yml", "json", "py", "js", "ts", "tsx", "jsx", "rs", "rb", "java", "c",
    "cpp", "h", "sh", "toml", "ini", "cfg", "txt",
];

fn ext_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase()
}

/// Is `path` admissible under the generic extension set?
pub fn allowed_file(path: &Path) -> bool {
    GENERIC_EXTS.contains(&ext_of(path).as_str())
}

/// Extensions admitted when a language filter is in effect.
fn lang_exts(lang: &str) -> Option<&'static [&'static str]> {
    Some(match lang.to_ascii_lowercase().as_str() {
        "go" | "golang" => &["go"],
        "python" | "py" => &["py"],
        "js" | "javascript" => &["js", "jsx"],
        "ts" | "typescript" => &["ts", "tsx"],
        "rust" | "rs" => &["rs"],
        "java" => &["java"],
        "cpp" | "c++" | "cc" | "cxx" => &["cpp", "cc", "cxx", "h"],
        "c" => &["c", "h"],
        "rb" | "ruby" => &["rb"],
        "php" => &["php"],
        "kotlin" | "kt" => &["kt"],
        "swift" => &["swift"],
        "dart" => &["dart"],
        "lua" => &["lua"],
        "r" => &["r"],
        "scala" => &["scala"],
        _ => return None,
    })
}

/// Is `path` admissible for `lang`? Unknown languages fall back to the
/// generic set.
pub fn allowed_file_for_lang(path: &Path, lang: &str) -> bool {
    match lang_exts(lang) {
        Some(exts) => exts.contains(&ext_of(path).as_str()),
        None => allowed_file(path),
    }
}

/// Fence language tag for a file extension; unknown extensions yield an
/// empty tag.
pub fn fence_lang_from_ext(ext: &str) -> &'static str {
    match ext.trim_start_matches('.').to_ascii_lowercase().as_str() {
        "go" => "go",
        "py" => "python",
        "js" => "javascript",
        "ts" | "tsx" => "ts",
        "jsx" => "jsx",
        "rs" => "rust",
        "rb" => "ruby",
        "java" => "java",
        "c" | "h" => "c",
        "cpp" | "hpp" | "cc" | "cxx" => "cpp",
        "json" => "json",
        "yaml" | "yml" => "yaml",
        "md" => "md",
        "sh" => "bash",
        "toml" => "toml",
        _ => "",
    }
}

/// MIME string for an attachment, inferred purely by extension.
pub fn mime_for_path(rel: &str) -> &'static str {
    let ext = Path::new(rel)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    match ext.as_str() {
        "md" => "text/markdown",
        "go" | "py" | "rs" | "rb" | "java" | "c" | "h" | "cpp" | "cc" | "cxx" | "sh" | "txt"
        | "ini" | "cfg" => "text/plain",
        "js" => "application/javascript",
        "ts" | "tsx" => "application/typescript",
        "jsx" => "text/jsx",
        "json" => "application/json",
        "yaml" | "yml" => "application/yaml",
        "toml" => "application/toml",
        _ => "application/octet-stream",
    }
}

static UNKNOWN_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9.+-]+$").expect("unknown-tag regex"));

/// File extension (without the dot) for a fence language tag.
///
/// Unknown short tags that look like an extension are used verbatim; anything
/// else falls back to `txt`.
pub fn ext_for_lang(lang: &str) -> String {
    let lang = lang.trim().to_ascii_lowercase();
    let ext = match lang.as_str() {
        "go" | "golang" => "go",
        "python" | "py" => "py",
        "javascript" | "js" | "node" => "js",
        "typescript" | "ts" => "ts",
        "jsx" => "jsx",
        "tsx" => "tsx",
        "rust" | "rs" => "rs",
        "java" => "java",
        "c" => "c",
        "cpp" | "c++" | "cc" | "cxx" => "cpp",
        "h" | "hpp" | "hh" | "hxx" => "h",
        "csharp" | "c#" | "cs" => "cs",
        "kotlin" | "kt" => "kt",
        "swift" => "swift",
        "ruby" | "rb" => "rb",
        "php" => "php",
        "scala" => "scala",
        "dart" => "dart",
        "lua" => "lua",
        "r" => "r",
        "elixir" | "ex" => "ex",
        "clojure" | "clj" => "clj",
        "haskell" | "hs" => "hs",
        "julia" | "jl" => "jl",
        "shell" | "bash" | "sh" | "zsh" => "sh",
        "sql" => "sql",
        "html" | "xml" | "svg" => return lang,
        "css" | "scss" | "sass" | "less" => "css",
        "json" => "json",
        "yaml" | "yml" => "yml",
        "toml" => "toml",
        "md" | "markdown" => "md",
        "" => "txt",
        other => {
            if other.len() <= 6 && UNKNOWN_TAG_RE.is_match(other) {
                return other.trim_start_matches('.').to_string();
            }
            "txt"
        }
    };
    ext.to_string()
}

static FENCE_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```([a-zA-Z0-9_+.-]+)").expect("fence-tag regex"));

/// Infer the programming language the user wants to work with from their
/// prompt: explicit keywords first, then a leading fence tag, else Go.
pub fn detect_prompt_language(prompt: &str) -> String {
    let p = prompt.to_ascii_lowercase();

    let by_keyword = if p.contains("golang") || p.contains(" in go") || p.contains("use go") {
        "go"
    } else if p.contains("python") {
        "python"
    } else if p.contains("typescript") || p.contains(" ts ") || p.contains(" in ts") {
        "ts"
    } else if p.contains("javascript") || p.contains(" js ") || p.contains("node") {
        "js"
    } else if p.contains("rust") {
        "rust"
    } else if p.contains("java") {
        "java"
    } else if p.contains("c++") || p.contains("cpp") {
        "cpp"
    } else if p.contains("c#") || p.contains("csharp") {
        "cs"
    } else if p.contains("ruby") {
        "rb"
    } else if p.contains("php") {
        "php"
    } else if p.contains("kotlin") {
        "kotlin"
    } else if p.contains("swift") {
        "swift"
    } else if p.contains("dart") {
        "dart"
    } else if p.contains("lua") {
        "lua"
    } else if p.contains("scala") {
        "scala"
    } else if p.contains("r ") {
        "r"
    } else if p.contains("haskell") {
        "hs"
    } else {
        ""
    };
    if !by_keyword.is_empty() {
        return by_keyword.to_string();
    }

    if let Some(m) = FENCE_TAG_RE.captures(&p) {
        return m[1].to_ascii_lowercase();
    }

    "go".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generic_set_rejects_binaries() {
        assert!(allowed_file(Path::new("a/b/main.go")));
        assert!(allowed_file(Path::new("README.md")));
        assert!(!allowed_file(Path::new("app.wasm")));
        assert!(!allowed_file(Path::new("photo.jpg")));
    }

    #[test]
    fn lang_filter_is_case_insensitive() {
        assert!(allowed_file_for_lang(Path::new("x.PY"), "Python"));
        assert!(!allowed_file_for_lang(Path::new("x.go"), "python"));
    }

    #[test]
    fn unknown_fence_ext_is_empty() {
        assert_eq!(fence_lang_from_ext(".weird"), "");
        assert_eq!(fence_lang_from_ext("go"), "go");
        assert_eq!(fence_lang_from_ext(".tsx"), "ts");
    }

    #[test]
    fn mime_falls_back_to_octet_stream() {
        assert_eq!(mime_for_path("a.json"), "application/json");
        assert_eq!(mime_for_path("a.bin"), "application/octet-stream");
    }

    #[test]
    fn ext_mapping_handles_unknown_tags() {
        assert_eq!(ext_for_lang("Go"), "go");
        assert_eq!(ext_for_lang(""), "txt");
        assert_eq!(ext_for_lang("zig"), "zig");
        assert_eq!(ext_for_lang("completely-unreasonable-tag"), "txt");
    }

    #[test]
    fn prompt_language_detection() {
        assert_eq!(detect_prompt_language("write a server in go"), "go");
        assert_eq!(detect_prompt_language("a python scraper"), "python");
        assert_eq!(detect_prompt_language("```rust\nfn main() {}\n```"), "rust");
        assert_eq!(detect_prompt_language("make it fast"), "go");
    }
}
