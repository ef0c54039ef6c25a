use clap::{Parser, Subcommand};

/// Codeloom — terminal workbench core for LLM-driven code generation
#[derive(Parser)]
#[command(name = "codeloom")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Run as MCP tool server over stdio
    #[arg(long)]
    pub mcp: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Workspace root (auto-detects git root if absent)
    #[arg(short = 'w', long)]
    pub workspace_root: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Preview the context snapshot that would be sent to the model
    Preview {
        /// Workspace root (defaults to git root or current directory)
        #[arg(short = 'w', long)]
        workspace_root: Option<String>,

        /// Show the rendered tree and per-file sizes
        #[arg(short, long)]
        verbose: bool,
    },
    /// Show session identity and coordination paths for a workspace
    Status {
        /// Workspace root (defaults to git root or current directory)
        #[arg(short = 'w', long)]
        workspace_root: Option<String>,
    },
}
