//! MCP tool parameter types.
//!
//! Used with rmcp's `Parameters<T>` wrapper for automatic deserialization
//! and JSON schema generation.

use schemars::JsonSchema;
use serde::Deserialize;

/// Parameters for the search_codebase tool
#[derive(Debug, Deserialize, JsonSchema)]
pub struct SearchCodebaseArgs {
    /// Search query or pattern to find in the codebase
    pub query: String,
    /// Directory path to search in (defaults to the workspace root)
    pub path: Option<String>,
    /// File pattern to filter (e.g. "*.go", "*.js")
    pub file_pattern: Option<String>,
    /// Whether the search is case sensitive
    #[serde(default)]
    pub case_sensitive: bool,
}

/// Parameters for the read_file tool
#[derive(Debug, Deserialize, JsonSchema)]
pub struct ReadFileArgs {
    /// Path to the file to read
    pub path: String,
    /// Optional starting line number (1-indexed)
    pub start_line: Option<usize>,
    /// Optional ending line number (1-indexed, inclusive)
    pub end_line: Option<usize>,
}

fn default_true() -> bool {
    true
}

/// Parameters for the write_file tool
#[derive(Debug, Deserialize, JsonSchema)]
pub struct WriteFileArgs {
    /// Path to the file to write
    pub path: String,
    /// Content to write
    pub content: String,
    /// Create parent directories if they don't exist
    #[serde(default = "default_true")]
    pub create_dirs: bool,
}

/// Parameters for the refactor_file tool
#[derive(Debug, Deserialize, JsonSchema)]
pub struct RefactorFileArgs {
    /// Path to the file to refactor
    pub path: String,
    /// Content to find
    pub find: String,
    /// Replacement content
    pub replace: String,
    /// Optional starting line to search within (1-indexed)
    pub start_line: Option<usize>,
    /// Optional ending line to search within (1-indexed, inclusive)
    pub end_line: Option<usize>,
}

/// Parameters for the list_files tool
#[derive(Debug, Deserialize, JsonSchema)]
pub struct ListFilesArgs {
    /// Directory path to list (defaults to the workspace root)
    pub path: Option<String>,
    /// Whether to list files recursively
    #[serde(default)]
    pub recursive: bool,
    /// File pattern to filter (e.g. "*.go")
    pub pattern: Option<String>,
}

/// Parameters for the get_file_outline tool
#[derive(Debug, Deserialize, JsonSchema)]
pub struct GetFileOutlineArgs {
    /// Path to the file to analyze
    pub path: String,
}
