//! Concurrent step builder.
//!
//! Splits a user goal into sub-goals, plans the files of each sub-goal, and
//! generates those files concurrently. Sub-goals run in plan order; file
//! completions within one sub-goal are reported in completion order.

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::{Context, Result};
use futures_util::stream::FuturesUnordered;
use futures_util::StreamExt;
use tokio_util::sync::CancellationToken;

use crate::agent::{generate_with_fallback, ModelClient};
use crate::context::{
    build_snapshot, collect_attachments, collect_entries, detect_prompt_language, render_tree,
    SnapshotCaps,
};
use crate::materialize::{deduplicate_files, ActionKind, Materializer};

use super::plan::{parse_file_plan, parse_plan_steps, FilePlanItem, PlanStep};
use super::prompts::{file_gen_prompt, file_plan_prompt, split_goal_prompt};
use super::{send_complete, send_progress, ProgressSender};

/// Drives a full multi-phase build for one user goal.
pub struct Orchestrator {
    model: Arc<dyn ModelClient>,
    materializer: Arc<Materializer>,
    session: String,
    caps: SnapshotCaps,
}

impl Orchestrator {
    pub fn new(
        model: Arc<dyn ModelClient>,
        materializer: Arc<Materializer>,
        session: impl Into<String>,
    ) -> Self {
        Self {
            model,
            materializer,
            session: session.into(),
            caps: SnapshotCaps::default(),
        }
    }

    pub fn with_caps(mut self, caps: SnapshotCaps) -> Self {
        self.caps = caps;
        self
    }

    /// Run the orchestration; progress is streamed over `tx` and the run
    /// always terminates with a `Complete` event.
    pub async fn run(&self, goal: &str, tx: ProgressSender, cancel: CancellationToken) {
        let goal = goal.trim();
        if goal.is_empty() {
            send_complete(&tx, None, Some("goal cannot be empty".into())).await;
            return;
        }

        send_progress(&tx, format!("🧩 Auto build for GOAL:\n{goal}\n\n")).await;

        let steps = self.split_goal(goal).await;
        let mut listing = format!("📋 {} step prompts generated:\n", steps.len());
        for (i, s) in steps.iter().enumerate() {
            listing.push_str(&format!("  {}) {}\n", i + 1, s.goal));
        }
        send_progress(&tx, listing + "\n").await;

        let total = steps.len();
        let mut written = HashSet::new();
        for (i, step) in steps.iter().enumerate() {
            if cancel.is_cancelled() {
                send_complete(&tx, None, Some("cancelled".into())).await;
                return;
            }
            match self
                .run_subgoal(i + 1, total, &step.goal, &tx, &cancel)
                .await
            {
                Ok(paths) => written.extend(paths),
                Err(e) => send_progress(&tx, format!("⚠️ Step {} failed: {e}\n", i + 1)).await,
            }
        }

        for removed in deduplicate_files(self.materializer.root(), &written) {
            send_progress(
                &tx,
                format!("🧹 Removed {} ({})\n", removed.path, removed.message),
            )
            .await;
        }

        let entries = collect_entries(self.materializer.root(), "");
        let tree = render_tree(&entries);
        send_progress(&tx, format!("\nFinal workspace structure:\n{tree}\n")).await;
        send_progress(&tx, "\n🎉 Auto build complete!\n").await;
        send_complete(&tx, None, None).await;
    }

    /// Split the goal into sub-goals, falling back to a single-step plan
    /// containing the raw goal when everything else fails.
    async fn split_goal(&self, goal: &str) -> Vec<PlanStep> {
        let lang = detect_prompt_language(goal);
        let root = self.materializer.root().to_path_buf();
        let snapshot = build_snapshot(&root, &self.caps, &lang);
        let attachments = collect_attachments(&root, &self.caps, &lang);

        let prompt = split_goal_prompt(&root, &snapshot.markdown, goal);
        let steps = match generate_with_fallback(&*self.model, &self.session, &prompt, &attachments)
            .await
        {
            Ok(raw) => parse_plan_steps(&raw),
            Err(e) => {
                tracing::warn!("goal split failed, using single-step plan: {e}");
                Vec::new()
            }
        };

        if steps.is_empty() {
            vec![PlanStep {
                name: "Step 1".into(),
                goal: goal.to_string(),
                ..Default::default()
            }]
        } else {
            steps
        }
    }

    /// Build the file plan for one sub-goal.
    async fn build_file_plan(&self, phase_name: &str, subgoal: &str) -> Result<Vec<FilePlanItem>> {
        let lang = detect_prompt_language(subgoal);
        let root = self.materializer.root().to_path_buf();
        let snapshot = build_snapshot(&root, &self.caps, &lang);
        let attachments = collect_attachments(&root, &self.caps, &lang);

        let prompt = file_plan_prompt(&root, &snapshot.markdown, phase_name, subgoal);
        let raw = generate_with_fallback(&*self.model, &self.session, &prompt, &attachments)
            .await
            .context("file plan generation failed")?;

        parse_file_plan(&raw, &lang, subgoal)
    }

    /// Run one sub-goal; returns the workspace-relative paths it wrote.
    async fn run_subgoal(
        &self,
        index: usize,
        total: usize,
        subgoal: &str,
        tx: &ProgressSender,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>> {
        send_progress(tx, format!("⚙️ Step {index}/{total} — {subgoal}\n")).await;

        let phase_name = format!("Step {index}");
        let files = self
            .build_file_plan(&phase_name, subgoal)
            .await
            .with_context(|| format!("failed to plan files for step {index}"))?;

        let mut tasks: FuturesUnordered<_> = files
            .iter()
            .map(|item| self.generate_file(subgoal, item, cancel))
            .collect();

        let mut written = Vec::new();
        while let Some((line, paths)) = tasks.next().await {
            send_progress(tx, format!("  {line}")).await;
            written.extend(paths);
        }

        Ok(written)
    }

    /// Generate and materialize one planned file; returns its progress line
    /// and the paths it saved.
    async fn generate_file(
        &self,
        subgoal: &str,
        item: &FilePlanItem,
        cancel: &CancellationToken,
    ) -> (String, Vec<String>) {
        let root = self.materializer.root().to_path_buf();
        let snapshot = build_snapshot(&root, &self.caps, &item.lang);
        let attachments = collect_attachments(&root, &self.caps, &item.lang);

        let prompt = file_gen_prompt(
            &root,
            &snapshot.markdown,
            subgoal,
            &item.path,
            &item.name,
            &item.goal,
        );

        let response =
            match generate_with_fallback(&*self.model, &self.session, &prompt, &attachments).await
            {
                Ok(r) => r,
                Err(e) => return (format!("❌ failed to build {}: {e}\n", item.name), Vec::new()),
            };

        let status = |msg: &str| tracing::warn!("{msg}");
        let actions = self.materializer.materialize(&response, cancel, &status).await;

        let written: Vec<String> = actions
            .iter()
            .filter(|a| a.kind == ActionKind::Saved)
            .map(|a| a.path.clone())
            .collect();

        if let Some(err) = actions.iter().find(|a| a.kind == ActionKind::Error) {
            return (format!("❌ {}: {}\n", err.path, err.message), written);
        }
        (format!("✅ {}\n", item.path), written)
    }
}
