//! Embedded MCP tool server.
//!
//! Publishes the workspace file tools (search, read, write, refactor, list,
//! outline) over stdio using rmcp, for consumption by the tool-calling
//! collaborator. Tool names are unique within this provider.

mod server;
mod tools;
pub mod types;

pub use server::{run_mcp_server, CodeloomMcpServer};
