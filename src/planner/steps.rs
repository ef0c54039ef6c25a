//! Step-wise plan execution with runtime-error feedback.
//!
//! Each step materializes its goal, then the workspace entrypoint (when one
//! exists) is executed through the tool collaborator. A failing run is not
//! fatal: the failure text is carried into the next step's goal so the model
//! can repair its own output.

use std::sync::Arc;
use std::time::Instant;

use anyhow::{bail, Result};
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use crate::agent::{ModelClient, ToolClient};
use crate::headless::run_headless;
use crate::materialize::{ActionKind, FileAction, Materializer};

use super::plan::{find_entrypoint, parse_plan_steps};
use super::prompts::step_plan_prompt;
use super::{send_complete, send_progress, ProgressSender};

/// Render materializer actions as transcript lines.
pub fn format_actions(step_name: &str, actions: &[FileAction]) -> Vec<String> {
    if actions.is_empty() {
        return Vec::new();
    }
    let mut lines = vec![format!("\n🔍 Changes in step: {step_name}\n")];
    for act in actions {
        let line = match act.kind {
            ActionKind::Saved => {
                if act.diff.trim().is_empty() {
                    format!("💾 {} ({}, no diff)\n", act.path, act.message)
                } else {
                    format!(
                        "💾 {} ({})\n```diff\n{}\n```\n",
                        act.path, act.message, act.diff
                    )
                }
            }
            ActionKind::Deleted => format!("🧹 Deleted {}\n", act.path),
            ActionKind::Removed => format!("🧹 Removed {}\n", act.path),
            ActionKind::Error => format!("❌ {}: {}\n", act.path, act.message),
            ActionKind::Info => format!("ℹ️ {}\n", act.message),
        };
        lines.push(line);
    }
    lines
}

/// Sequential plan runner (the "planner" execution style).
pub struct StepRunner {
    model: Arc<dyn ModelClient>,
    tools: Option<Arc<dyn ToolClient>>,
    materializer: Arc<Materializer>,
    session: String,
}

impl StepRunner {
    pub fn new(
        model: Arc<dyn ModelClient>,
        tools: Option<Arc<dyn ToolClient>>,
        materializer: Arc<Materializer>,
        session: impl Into<String>,
    ) -> Self {
        Self {
            model,
            tools,
            materializer,
            session: session.into(),
        }
    }

    /// Decompose `goal` and run the steps, streaming progress lines.
    pub async fn run(
        &self,
        goal: &str,
        tx: &ProgressSender,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let start = Instant::now();
        let goal = goal.trim();
        if goal.is_empty() {
            bail!("goal cannot be empty");
        }

        let response = match self.model.generate(&self.session, &step_plan_prompt(goal)).await {
            Ok(r) => r,
            Err(e) => {
                send_progress(tx, format!("❌ planner failed: {e}\n")).await;
                send_complete(tx, None, Some(e.to_string())).await;
                return Err(e);
            }
        };

        let steps = parse_plan_steps(&response);
        if steps.is_empty() {
            send_progress(tx, "❌ no valid steps parsed\n").await;
            send_complete(tx, None, Some("no valid steps parsed".into())).await;
            bail!("no valid steps parsed");
        }

        send_progress(tx, format!("🧭 Plan created with {} steps.\n", steps.len())).await;

        let mut carry_err = String::new();
        let total = steps.len();
        for (i, step) in steps.iter().enumerate() {
            if cancel.is_cancelled() {
                send_complete(tx, None, Some("cancelled".into())).await;
                bail!("cancelled");
            }

            let mut goal_text = step.goal.clone();
            if !carry_err.is_empty() {
                goal_text.push_str(&format!(
                    "\n\n⚠️ Previous runtime error:\n{carry_err}\nPlease fix this issue in this step."
                ));
            }

            send_progress(tx, format!("\n⚙️ Step {}/{} — {}\n", i + 1, total, goal_text)).await;

            let result = run_headless(
                self.model.as_ref(),
                &self.materializer,
                &self.session,
                &goal_text,
                cancel,
            )
            .await;

            let actions = match result {
                Ok(res) => res.actions,
                Err(e) => {
                    carry_err = format!("❌ Step failed to generate: {e}");
                    send_progress(tx, format!("{carry_err}\n")).await;
                    continue;
                }
            };

            for line in format_actions(&step.name, &actions) {
                send_progress(tx, line).await;
            }

            carry_err = self.run_entrypoint(&step.name, tx, cancel).await;
        }

        send_progress(
            tx,
            format!("\n✅ Planner finished in {:?}\n", start.elapsed()),
        )
        .await;
        send_complete(tx, None, None).await;
        Ok(())
    }

    /// Execute the discovered entrypoint through the tool collaborator.
    /// Returns the runtime-error text to carry into the next step (empty on
    /// success or when nothing is runnable).
    async fn run_entrypoint(
        &self,
        step_name: &str,
        tx: &ProgressSender,
        _cancel: &CancellationToken,
    ) -> String {
        let Some((entry_rel, lang)) = find_entrypoint(self.materializer.root()) else {
            send_progress(tx, format!("ℹ️ No main file found for step {step_name}\n")).await;
            return String::new();
        };

        let Some(tools) = &self.tools else {
            send_progress(tx, "ℹ️ No tool collaborator connected; skipping run.\n").await;
            return String::new();
        };

        let runners = match tools.search_tools("", 5).await {
            Ok(t) if !t.is_empty() => t,
            Ok(_) => {
                send_progress(tx, "ℹ️ No runner tool available; skipping run.\n").await;
                return String::new();
            }
            Err(e) => {
                let msg = format!("❌ Tool search error: {e}");
                send_progress(tx, format!("{msg}\n")).await;
                return msg;
            }
        };

        let mut args = serde_json::Map::new();
        args.insert("language".into(), json!(lang));
        args.insert(
            "path".into(),
            json!(self.materializer.root().display().to_string()),
        );
        args.insert("file".into(), json!(entry_rel));

        let entry_base = entry_rel.rsplit('/').next().unwrap_or(&entry_rel).to_string();
        match tools.call_tool(&runners[0].name, args).await {
            Ok(res) => {
                send_progress(
                    tx,
                    format!("🧪 Run result ({entry_base}):\n{}\n", render_value(&res)),
                )
                .await;
                String::new()
            }
            Err(e) => {
                let msg = format!("❌ Runtime error ({entry_base}): {e}");
                send_progress(tx, format!("{msg}\n")).await;
                msg
            }
        }
    }
}

fn render_value(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
