//! Goal decomposition and orchestration.
//!
//! The planner turns a user goal into ordered sub-goals, each sub-goal into
//! a file plan, and drives generation. Two execution styles share the same
//! decomposition machinery: the step-wise runner with runtime-error feedback
//! ([`StepRunner`]) and the concurrent step builder ([`Orchestrator`]).

pub mod extract;
mod orchestrator;
mod plan;
pub mod prompts;
mod steps;

pub use extract::extract_json;
pub use orchestrator::Orchestrator;
pub use plan::{
    find_entrypoint, heuristic_split, normalize_plan, parse_file_plan, parse_plan_steps,
    FilePlanItem, PlanStep, MAX_SUBGOALS,
};
pub use steps::{format_actions, StepRunner};

use tokio::sync::mpsc;

/// Typed progress protocol between worker runs and the cooperative UI loop.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// A line to append to the transcript.
    Progress { text: String },
    /// Terminal event for one run.
    Complete {
        final_text: Option<String>,
        err: Option<String>,
    },
}

pub type ProgressSender = mpsc::Sender<ProgressEvent>;

pub(crate) async fn send_progress(tx: &ProgressSender, text: impl Into<String>) {
    let _ = tx
        .send(ProgressEvent::Progress { text: text.into() })
        .await;
}

pub(crate) async fn send_complete(tx: &ProgressSender, final_text: Option<String>, err: Option<String>) {
    let _ = tx.send(ProgressEvent::Complete { final_text, err }).await;
}
