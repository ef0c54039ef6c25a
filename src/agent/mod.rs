//! Collaborator contracts consumed by the core.
//!
//! The model collaborator owns prompt submission, streaming and credentials;
//! the tool collaborator owns the tool-calling protocol. The core never
//! performs network I/O itself — it talks to both through these traits and
//! always implements the attachment-mode → plain-mode fallback on the caller
//! side.

use anyhow::Result;
use async_trait::async_trait;
use futures_util::stream::BoxStream;
use serde_json::Value;

/// A file delivered to the model as an out-of-band input.
///
/// Owned by the outgoing generation call; the payload may already be
/// truncated to the snapshot's per-file limit.
#[derive(Debug, Clone)]
pub struct Attachment {
    pub name: String,
    pub mime: String,
    pub data: Vec<u8>,
}

/// Summary of a tool discoverable through the tool collaborator.
#[derive(Debug, Clone)]
pub struct ToolInfo {
    pub name: String,
    pub description: String,
}

/// String-keyed, JSON-serializable argument map for tool calls.
pub type ToolArgs = serde_json::Map<String, Value>;

/// The model collaborator.
///
/// `session` is a short hex string; isolation of memory/history across
/// sessions is the collaborator's responsibility.
#[async_trait]
pub trait ModelClient: Send + Sync {
    async fn generate(&self, session: &str, prompt: &str) -> Result<String>;

    async fn generate_with_files(
        &self,
        session: &str,
        prompt: &str,
        files: &[Attachment],
    ) -> Result<String>;
}

/// The tool collaborator.
#[async_trait]
pub trait ToolClient: Send + Sync {
    async fn call_tool(&self, name: &str, args: ToolArgs) -> Result<Value>;

    async fn call_tool_stream(
        &self,
        name: &str,
        args: ToolArgs,
    ) -> Result<BoxStream<'static, Result<Value>>>;

    async fn search_tools(&self, query: &str, limit: usize) -> Result<Vec<ToolInfo>>;
}

/// Generate with attachments, falling back to a plain call when the
/// attachment-mode call fails. Only when both fail does the step fail.
pub async fn generate_with_fallback(
    model: &dyn ModelClient,
    session: &str,
    prompt: &str,
    files: &[Attachment],
) -> Result<String> {
    match model.generate_with_files(session, prompt, files).await {
        Ok(text) => Ok(text),
        Err(e) => {
            tracing::debug!("attachment-mode generation failed, retrying plain: {e}");
            model.generate(session, prompt).await
        }
    }
}
