use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use codeloom::cli::{resolve_workspace_root, Cli, Commands};
use codeloom::{command, mcp};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    // If --mcp flag is set, run as MCP tool server
    if cli.mcp {
        let workspace_root = resolve_workspace_root(cli.workspace_root)?;
        return mcp::run_mcp_server(workspace_root).await;
    }

    match cli.command {
        Some(Commands::Preview {
            workspace_root,
            verbose,
        }) => {
            command::run_preview(workspace_root, verbose).await?;
        }
        Some(Commands::Status { workspace_root }) => {
            command::run_status(workspace_root).await?;
        }
        None => {
            eprintln!("No command specified. Use --help for usage information.");
            eprintln!(
                "Use 'codeloom --mcp' to serve workspace tools, or 'codeloom preview' to inspect the context snapshot."
            );
        }
    }

    Ok(())
}
