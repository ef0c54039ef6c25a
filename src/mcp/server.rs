//! MCP server wiring and stdio startup.

use std::path::PathBuf;

use anyhow::Result;
use rmcp::{
    handler::server::router::tool::ToolRouter, handler::server::wrapper::Parameters, model::*,
    tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler,
};
use tracing::{error, info};

use super::tools;
use super::types::*;

/// Codeloom MCP server: workspace file tools over stdio.
#[derive(Clone)]
pub struct CodeloomMcpServer {
    workspace_root: PathBuf,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl CodeloomMcpServer {
    pub fn new(workspace_root: PathBuf) -> Self {
        Self {
            workspace_root,
            tool_router: Self::tool_router(),
        }
    }

    pub fn workspace_root(&self) -> &std::path::Path {
        &self.workspace_root
    }

    #[tool(
        name = "search_codebase",
        description = "Search for code patterns, functions, or text across the codebase using grep-like matching. Returns one '<path>:<line>: <text>' line per hit."
    )]
    fn search_codebase(
        &self,
        Parameters(args): Parameters<SearchCodebaseArgs>,
    ) -> Result<CallToolResult, McpError> {
        Ok(tools::search_codebase(&self.workspace_root, args))
    }

    #[tool(
        name = "read_file",
        description = "Read the contents of a file from the codebase, optionally sliced to a 1-indexed line range."
    )]
    fn read_file(
        &self,
        Parameters(args): Parameters<ReadFileArgs>,
    ) -> Result<CallToolResult, McpError> {
        Ok(tools::read_file(&self.workspace_root, args))
    }

    #[tool(
        name = "write_file",
        description = "Write or update a file in the codebase, creating parent directories when requested."
    )]
    fn write_file(
        &self,
        Parameters(args): Parameters<WriteFileArgs>,
    ) -> Result<CallToolResult, McpError> {
        Ok(tools::write_file(&self.workspace_root, args))
    }

    #[tool(
        name = "refactor_file",
        description = "Refactor a file by replacing specific content with new content, optionally scoped to a line range. Reports the replacement count."
    )]
    fn refactor_file(
        &self,
        Parameters(args): Parameters<RefactorFileArgs>,
    ) -> Result<CallToolResult, McpError> {
        Ok(tools::refactor_file(&self.workspace_root, args))
    }

    #[tool(
        name = "list_files",
        description = "List files and directories in a given path with [DIR]/[FILE] formatting and byte sizes."
    )]
    fn list_files(
        &self,
        Parameters(args): Parameters<ListFilesArgs>,
    ) -> Result<CallToolResult, McpError> {
        Ok(tools::list_files(&self.workspace_root, args))
    }

    #[tool(
        name = "get_file_outline",
        description = "Get an outline of a code file: top-level declarations for Go, the first 20 lines otherwise."
    )]
    fn get_file_outline(
        &self,
        Parameters(args): Parameters<GetFileOutlineArgs>,
    ) -> Result<CallToolResult, McpError> {
        Ok(tools::get_file_outline(&self.workspace_root, args))
    }
}

#[tool_handler]
impl ServerHandler for CodeloomMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "codeloom".to_string(),
                title: None,
                version: env!("CARGO_PKG_VERSION").to_string(),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Codeloom MCP server exposes workspace search, read, write, refactor, list and outline tools.".to_string(),
            ),
        }
    }
}

/// Run the MCP server over stdio for `workspace_root`.
pub async fn run_mcp_server(workspace_root: PathBuf) -> Result<()> {
    use rmcp::{transport::stdio, ServiceExt};

    info!("🔧 Starting Codeloom MCP tool server...");
    info!("🔍 Workspace root: {}", workspace_root.display());

    let server = CodeloomMcpServer::new(workspace_root);

    let service = server.serve(stdio()).await.map_err(|e| {
        error!("Failed to start MCP service: {e:?}");
        anyhow::anyhow!("Failed to start MCP service: {e:?}")
    })?;

    info!("✅ MCP tool server started");

    service.waiting().await.map_err(|e| {
        error!("MCP service error: {e:?}");
        anyhow::anyhow!("MCP service error: {e:?}")
    })?;

    info!("MCP server shutting down");
    Ok(())
}
