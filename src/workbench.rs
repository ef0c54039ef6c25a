//! Session glue between the UI collaborator and the core.
//!
//! A `Workbench` owns the per-run state for one workspace: the session
//! identity, the materializer with its lock root, and the transcript syncer.
//! The UI hands raw prompts to [`Workbench::handle_prompt`] and drains the
//! progress channel; everything else stays inside the core.

use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{bail, Context, Result};
use futures_util::StreamExt;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::agent::{ModelClient, ToolArgs, ToolClient};
use crate::coord::{TranscriptPoll, TranscriptSync};
use crate::headless::{run_headless, run_with_tools, HeadlessResult};
use crate::materialize::Materializer;
use crate::planner::{send_complete, send_progress, Orchestrator, ProgressSender, StepRunner};
use crate::session::SessionState;

/// Per-workspace session facade.
pub struct Workbench {
    model: Arc<dyn ModelClient>,
    tools: Option<Arc<dyn ToolClient>>,
    materializer: Arc<Materializer>,
    session: Mutex<SessionState>,
    transcript: Mutex<TranscriptSync>,
}

impl Workbench {
    /// Build a workbench rooted at `workspace`, with coordination paths under
    /// the default state directory.
    pub fn new(
        model: Arc<dyn ModelClient>,
        tools: Option<Arc<dyn ToolClient>>,
        workspace: &Path,
    ) -> Result<Self> {
        let session = SessionState::new(workspace)?;
        Ok(Self::with_session(model, tools, workspace, session))
    }

    /// Build a workbench with explicit session state (used by the TUI when it
    /// restores a previous run, and by tests).
    pub fn with_session(
        model: Arc<dyn ModelClient>,
        tools: Option<Arc<dyn ToolClient>>,
        workspace: &Path,
        session: SessionState,
    ) -> Self {
        let materializer =
            Arc::new(Materializer::new(workspace).with_lock_root(&session.lock_root));
        let transcript = TranscriptSync::new(&session.transcript_path);
        Self {
            model,
            tools,
            materializer,
            session: Mutex::new(session),
            transcript: Mutex::new(transcript),
        }
    }

    pub fn materializer(&self) -> Arc<Materializer> {
        self.materializer.clone()
    }

    pub fn session_id(&self) -> String {
        self.session.lock().unwrap().session_id.clone()
    }

    /// Rotate the session id (explicit user command).
    pub fn rotate_session(&self) -> String {
        let mut session = self.session.lock().unwrap();
        session.rotate();
        session.session_id.clone()
    }

    pub fn set_shared_spaces(&self, raw: &str) {
        self.session.lock().unwrap().set_shared_spaces(raw);
    }

    pub fn shared_spaces(&self) -> Vec<String> {
        self.session.lock().unwrap().shared_spaces.clone()
    }

    /// Persist the rendered transcript so co-viewing instances pick it up.
    pub fn persist_transcript(&self, content: &str) -> Result<()> {
        self.transcript.lock().unwrap().persist(content)
    }

    /// One transcript poll tick on behalf of the UI loop.
    pub fn poll_transcript(&self) -> TranscriptPoll {
        self.transcript.lock().unwrap().poll()
    }

    /// Single-shot generation against the workspace: the tool path when a
    /// tool collaborator is connected, else (or on tool failure) the model
    /// path.
    pub async fn generate(&self, prompt: &str, cancel: &CancellationToken) -> Result<HeadlessResult> {
        let session = self.session_id();
        if let Some(tools) = &self.tools {
            match run_with_tools(tools.as_ref(), &self.materializer, &session, prompt).await {
                Ok(res) => return Ok(res),
                Err(e) => {
                    tracing::debug!("tool codegen failed, falling back to local generator: {e}")
                }
            }
        }
        run_headless(self.model.as_ref(), &self.materializer, &session, prompt, cancel).await
    }

    /// Dispatch one user prompt: `@tool name {json}` invokes a tool inline,
    /// anything else runs the orchestrated build. Always terminates the
    /// channel with a `Complete` event.
    pub async fn handle_prompt(&self, raw: &str, tx: ProgressSender, cancel: CancellationToken) {
        let raw = raw.trim();
        if raw.is_empty() {
            send_complete(&tx, None, Some("prompt cannot be empty".into())).await;
            return;
        }

        if let Some(rest) = raw.strip_prefix("@tool ") {
            match self.run_tool_inline(rest, &tx).await {
                Ok(()) => send_complete(&tx, None, None).await,
                Err(e) => {
                    send_progress(&tx, format!("❌ {e}\n")).await;
                    send_complete(&tx, None, Some(e.to_string())).await;
                }
            }
            return;
        }

        let orchestrator = Orchestrator::new(
            self.model.clone(),
            self.materializer.clone(),
            self.session_id(),
        );
        orchestrator.run(raw, tx, cancel).await;
    }

    /// Run a user goal through the sequential planner with runtime-error
    /// feedback instead of the concurrent builder.
    pub async fn run_plan(&self, goal: &str, tx: &ProgressSender, cancel: &CancellationToken) -> Result<()> {
        let runner = StepRunner::new(
            self.model.clone(),
            self.tools.clone(),
            self.materializer.clone(),
            self.session_id(),
        );
        runner.run(goal, tx, cancel).await
    }

    /// `@tool <name> [{json args}]`, streaming when the tool name asks for
    /// it.
    async fn run_tool_inline(&self, cmd: &str, tx: &ProgressSender) -> Result<()> {
        let Some(tools) = &self.tools else {
            bail!("no tool collaborator connected");
        };

        let cmd = cmd.trim();
        if cmd.is_empty() {
            bail!("usage: @tool toolName {{jsonArgs}}");
        }
        let (name, args_raw) = match cmd.split_once(' ') {
            Some((n, rest)) => (n, rest.trim()),
            None => (cmd, ""),
        };

        let args: ToolArgs = if args_raw.is_empty() {
            ToolArgs::new()
        } else {
            serde_json::from_str(args_raw).context("invalid JSON args")?
        };

        if name.to_ascii_lowercase().contains("stream") {
            let mut stream = tools.call_tool_stream(name, args).await?;
            send_progress(tx, format!("Tool stream ({name}):\n")).await;
            while let Some(item) = stream.next().await {
                match item {
                    Ok(value) => send_progress(tx, format!("{}\n", render_value(&value))).await,
                    Err(e) => {
                        send_progress(tx, format!("❌ Stream error: {e}\n")).await;
                        break;
                    }
                }
            }
        } else {
            let result = tools.call_tool(name, args).await?;
            send_progress(tx, format!("{}\n", render_value(&result))).await;
        }
        Ok(())
    }
}

fn render_value(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{Attachment, ToolInfo};
    use crate::planner::ProgressEvent;
    use anyhow::anyhow;
    use async_trait::async_trait;
    use futures_util::stream::BoxStream;
    use tempfile::TempDir;
    use tokio::sync::mpsc;

    struct NoModel;

    #[async_trait]
    impl ModelClient for NoModel {
        async fn generate(&self, _session: &str, _prompt: &str) -> Result<String> {
            Err(anyhow!("model offline"))
        }

        async fn generate_with_files(
            &self,
            _session: &str,
            _prompt: &str,
            _files: &[Attachment],
        ) -> Result<String> {
            Err(anyhow!("model offline"))
        }
    }

    struct EchoTool;

    #[async_trait]
    impl ToolClient for EchoTool {
        async fn call_tool(&self, name: &str, args: ToolArgs) -> Result<Value> {
            Ok(Value::String(format!(
                "{name} <- {}",
                Value::Object(args)
            )))
        }

        async fn call_tool_stream(
            &self,
            _name: &str,
            _args: ToolArgs,
        ) -> Result<BoxStream<'static, Result<Value>>> {
            let items = vec![Ok(Value::String("one".into())), Ok(Value::String("two".into()))];
            Ok(Box::pin(futures_util::stream::iter(items)))
        }

        async fn search_tools(&self, _query: &str, _limit: usize) -> Result<Vec<ToolInfo>> {
            Ok(vec![])
        }
    }

    fn bench(tmp: &TempDir, home: &TempDir, tools: Option<Arc<dyn ToolClient>>) -> Workbench {
        let session = SessionState::with_state_dir(tmp.path(), home.path()).unwrap();
        Workbench::with_session(Arc::new(NoModel), tools, tmp.path(), session)
    }

    async fn collect(mut rx: mpsc::Receiver<ProgressEvent>) -> (String, Option<String>) {
        let mut text = String::new();
        let mut err = None;
        while let Some(ev) = rx.recv().await {
            match ev {
                ProgressEvent::Progress { text: t } => text.push_str(&t),
                ProgressEvent::Complete { err: e, .. } => err = e,
            }
        }
        (text, err)
    }

    #[tokio::test]
    async fn inline_tool_call_round_trips() {
        let tmp = TempDir::new().unwrap();
        let home = TempDir::new().unwrap();
        let wb = bench(&tmp, &home, Some(Arc::new(EchoTool)));

        let (tx, rx) = mpsc::channel(16);
        wb.handle_prompt(
            "@tool fmt.lint {\"path\": \"./\"}",
            tx,
            CancellationToken::new(),
        )
        .await;

        let (text, err) = collect(rx).await;
        assert!(err.is_none());
        assert!(text.contains("fmt.lint"), "{text}");
        assert!(text.contains("\"path\""), "{text}");
    }

    #[tokio::test]
    async fn inline_stream_tool_forwards_items() {
        let tmp = TempDir::new().unwrap();
        let home = TempDir::new().unwrap();
        let wb = bench(&tmp, &home, Some(Arc::new(EchoTool)));

        let (tx, rx) = mpsc::channel(16);
        wb.handle_prompt("@tool log.stream_tail", tx, CancellationToken::new())
            .await;

        let (text, err) = collect(rx).await;
        assert!(err.is_none());
        assert!(text.contains("Tool stream (log.stream_tail):"));
        assert!(text.contains("one\n"));
        assert!(text.contains("two\n"));
    }

    #[tokio::test]
    async fn invalid_inline_json_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let home = TempDir::new().unwrap();
        let wb = bench(&tmp, &home, Some(Arc::new(EchoTool)));

        let (tx, rx) = mpsc::channel(16);
        wb.handle_prompt("@tool fmt.lint {not json}", tx, CancellationToken::new())
            .await;

        let (_, err) = collect(rx).await;
        assert!(err.unwrap().contains("invalid JSON args"));
    }

    #[tokio::test]
    async fn inline_tool_without_collaborator_errors() {
        let tmp = TempDir::new().unwrap();
        let home = TempDir::new().unwrap();
        let wb = bench(&tmp, &home, None);

        let (tx, rx) = mpsc::channel(16);
        wb.handle_prompt("@tool fmt.lint", tx, CancellationToken::new())
            .await;

        let (_, err) = collect(rx).await;
        assert!(err.unwrap().contains("no tool collaborator"));
    }

    #[tokio::test]
    async fn empty_prompt_completes_with_error() {
        let tmp = TempDir::new().unwrap();
        let home = TempDir::new().unwrap();
        let wb = bench(&tmp, &home, None);

        let (tx, rx) = mpsc::channel(4);
        wb.handle_prompt("   ", tx, CancellationToken::new()).await;
        let (_, err) = collect(rx).await;
        assert_eq!(err.as_deref(), Some("prompt cannot be empty"));
    }

    #[tokio::test]
    async fn default_prompt_runs_the_orchestrator_to_completion() {
        let tmp = TempDir::new().unwrap();
        let home = TempDir::new().unwrap();
        let wb = bench(&tmp, &home, None);

        // The model is offline, so the split degrades to a single step whose
        // file plan fails; the run still completes cleanly.
        let (tx, rx) = mpsc::channel(64);
        wb.handle_prompt("build a widget", tx, CancellationToken::new())
            .await;

        let (text, err) = collect(rx).await;
        assert!(err.is_none());
        assert!(text.contains("⚠️ Step 1 failed"), "{text}");
        assert!(text.contains("🎉 Auto build complete!"));
    }

    #[tokio::test]
    async fn generate_prefers_the_tool_path() {
        let tmp = TempDir::new().unwrap();
        let home = TempDir::new().unwrap();
        let wb = bench(&tmp, &home, Some(Arc::new(EchoTool)));

        let result = wb
            .generate("tidy the code", &CancellationToken::new())
            .await
            .unwrap();
        assert!(result.response.contains("codebase.refactor_codebase"));
        // The echo tool changed nothing on disk.
        assert_eq!(result.actions.len(), 1);
        assert_eq!(result.actions[0].message, "No file changes detected.");
    }

    #[tokio::test]
    async fn session_identity_and_transcript_round_trip() {
        let tmp = TempDir::new().unwrap();
        let home = TempDir::new().unwrap();
        let wb = bench(&tmp, &home, None);

        let first = wb.session_id();
        let second = wb.rotate_session();
        assert_ne!(first, second);
        assert_eq!(wb.session_id(), second);

        wb.set_shared_spaces("red, blue");
        assert_eq!(wb.shared_spaces(), vec!["red", "blue"]);

        wb.persist_transcript("hello\n").unwrap();
        assert_eq!(wb.poll_transcript(), TranscriptPoll::Unchanged);
    }
}
