//! Single-shot generation: one prompt in, materialized files out.
//!
//! Two paths produce the same result shape: the model path parses fenced
//! code blocks out of a generation, the tool path hands the whole edit to a
//! workspace tool and reconstructs actions by diffing before/after
//! snapshots.

use anyhow::{bail, Context, Result};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::agent::{generate_with_fallback, ModelClient, ToolClient};
use crate::context::{build_snapshot, collect_attachments, SnapshotCaps};
use crate::materialize::{
    diff_snapshots, load_workspace_snapshot, ActionKind, FileAction, Materializer,
};
use crate::planner::prompts::headless_prompt;

/// Response text plus the file actions it materialized.
#[derive(Debug)]
pub struct HeadlessResult {
    pub response: String,
    pub actions: Vec<FileAction>,
}

/// Run one prompt against the workspace: build the context, generate with
/// attachment fallback, and materialize the response.
pub async fn run_headless(
    model: &dyn ModelClient,
    materializer: &Materializer,
    session: &str,
    prompt: &str,
    cancel: &CancellationToken,
) -> Result<HeadlessResult> {
    let prompt = prompt.trim();
    if prompt.is_empty() {
        bail!("prompt cannot be empty");
    }

    let root = materializer.root().to_path_buf();
    std::fs::create_dir_all(&root)
        .with_context(|| format!("create workspace {}", root.display()))?;

    let caps = SnapshotCaps::headless();
    let snapshot = build_snapshot(&root, &caps, "");
    let attachments = collect_attachments(&root, &caps, "");

    let full_prompt = headless_prompt(&snapshot.tree, prompt);
    let response = generate_with_fallback(model, session, &full_prompt, &attachments).await?;

    let status = |msg: &str| warn!("{msg}");
    let actions = materializer.materialize(&response, cancel, &status).await;

    Ok(HeadlessResult { response, actions })
}

/// Hand the whole edit to a workspace refactor tool and reconstruct the
/// action list by diffing workspace snapshots taken around the call.
pub async fn run_with_tools(
    tools: &dyn ToolClient,
    materializer: &Materializer,
    session: &str,
    prompt: &str,
) -> Result<HeadlessResult> {
    let prompt = prompt.trim();
    if prompt.is_empty() {
        bail!("prompt cannot be empty");
    }

    let root = materializer.root().to_path_buf();
    materializer.tracker().begin_prompt();
    let before = load_workspace_snapshot(&root);

    // Best-effort: let the provider index the tree first.
    let mut store_args = serde_json::Map::new();
    store_args.insert("path".into(), json!(root.display().to_string()));
    if let Err(e) = tools.call_tool("codebase.store_tree", store_args).await {
        debug!("store_tree warning: {e}");
    }

    let mut args = serde_json::Map::new();
    args.insert("session_id".into(), json!(session));
    args.insert("path".into(), json!(root.display().to_string()));
    args.insert("query".into(), json!(prompt));

    let result = tools
        .call_tool("codebase.refactor_codebase", args)
        .await
        .context("workspace refactor tool failed")?;

    let after = load_workspace_snapshot(&root);
    let mut actions = diff_snapshots(materializer.tracker(), &before, &after, false);
    if actions.is_empty() {
        actions.push(FileAction {
            path: String::new(),
            kind: ActionKind::Info,
            message: "No file changes detected.".to_string(),
            diff: String::new(),
            err: None,
        });
    }

    let response = match result {
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    };
    Ok(HeadlessResult { response, actions })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::Attachment;
    use anyhow::anyhow;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tempfile::TempDir;

    struct ScriptedModel {
        responses: Mutex<Vec<String>>,
        fail_attachments: bool,
    }

    #[async_trait]
    impl ModelClient for ScriptedModel {
        async fn generate(&self, _session: &str, _prompt: &str) -> Result<String> {
            let mut responses = self.responses.lock().unwrap();
            if responses.is_empty() {
                return Err(anyhow!("no scripted response left"));
            }
            Ok(responses.remove(0))
        }

        async fn generate_with_files(
            &self,
            session: &str,
            prompt: &str,
            _files: &[Attachment],
        ) -> Result<String> {
            if self.fail_attachments {
                return Err(anyhow!("attachment mode unavailable"));
            }
            self.generate(session, prompt).await
        }
    }

    #[tokio::test]
    async fn empty_prompt_is_rejected_before_generation() {
        let tmp = TempDir::new().unwrap();
        let model = ScriptedModel {
            responses: Mutex::new(vec![]),
            fail_attachments: false,
        };
        let mat = Materializer::new(tmp.path());

        let err = run_headless(&model, &mat, "s", "   ", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("prompt cannot be empty"));
    }

    #[tokio::test]
    async fn generates_and_materializes() {
        let tmp = TempDir::new().unwrap();
        let model = ScriptedModel {
            responses: Mutex::new(vec![
                "```go\n// path: main.go\npackage main\n\nfunc main() {}\n```".to_string(),
            ]),
            fail_attachments: false,
        };
        let mat = Materializer::new(tmp.path());

        let result = run_headless(&model, &mat, "s", "write main", &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(result.actions.len(), 1);
        assert!(tmp.path().join("main.go").is_file());
    }

    struct WritingTool {
        root: std::path::PathBuf,
    }

    #[async_trait]
    impl crate::agent::ToolClient for WritingTool {
        async fn call_tool(
            &self,
            name: &str,
            _args: crate::agent::ToolArgs,
        ) -> Result<serde_json::Value> {
            if name == "codebase.refactor_codebase" {
                std::fs::write(self.root.join("made.go"), "package made\n").unwrap();
                return Ok(serde_json::Value::String("rewrote one file".into()));
            }
            Ok(serde_json::Value::Null)
        }

        async fn call_tool_stream(
            &self,
            _name: &str,
            _args: crate::agent::ToolArgs,
        ) -> Result<futures_util::stream::BoxStream<'static, Result<serde_json::Value>>> {
            Err(anyhow!("no streaming"))
        }

        async fn search_tools(
            &self,
            _query: &str,
            _limit: usize,
        ) -> Result<Vec<crate::agent::ToolInfo>> {
            Ok(vec![])
        }
    }

    #[tokio::test]
    async fn tool_path_reports_actions_from_workspace_diff() {
        let tmp = TempDir::new().unwrap();
        let tools = WritingTool {
            root: tmp.path().to_path_buf(),
        };
        let mat = Materializer::new(tmp.path());

        let result = run_with_tools(&tools, &mat, "s", "make a file").await.unwrap();
        assert_eq!(result.response, "rewrote one file");
        assert_eq!(result.actions.len(), 1);
        assert_eq!(result.actions[0].path, "made.go");
        assert_eq!(result.actions[0].message, "created");
    }

    struct NoopTool;

    #[async_trait]
    impl crate::agent::ToolClient for NoopTool {
        async fn call_tool(
            &self,
            _name: &str,
            _args: crate::agent::ToolArgs,
        ) -> Result<serde_json::Value> {
            Ok(serde_json::Value::String("nothing to do".into()))
        }

        async fn call_tool_stream(
            &self,
            _name: &str,
            _args: crate::agent::ToolArgs,
        ) -> Result<futures_util::stream::BoxStream<'static, Result<serde_json::Value>>> {
            Err(anyhow!("no streaming"))
        }

        async fn search_tools(
            &self,
            _query: &str,
            _limit: usize,
        ) -> Result<Vec<crate::agent::ToolInfo>> {
            Ok(vec![])
        }
    }

    #[tokio::test]
    async fn tool_path_without_changes_reports_info() {
        let tmp = TempDir::new().unwrap();
        let mat = Materializer::new(tmp.path());

        let result = run_with_tools(&NoopTool, &mat, "s", "noop").await.unwrap();
        assert_eq!(result.actions.len(), 1);
        assert!(matches!(result.actions[0].kind, ActionKind::Info));
    }

    #[tokio::test]
    async fn attachment_failure_falls_back_to_plain_mode() {
        let tmp = TempDir::new().unwrap();
        let model = ScriptedModel {
            responses: Mutex::new(vec![
                "```go\n// path: ok.go\npackage ok\n```".to_string(),
            ]),
            fail_attachments: true,
        };
        let mat = Materializer::new(tmp.path());

        let result = run_headless(&model, &mat, "s", "task", &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(result.actions[0].path, "ok.go");
    }
}
