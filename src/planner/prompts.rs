//! Prompt construction for the planner and the per-file generators.
//!
//! Every prompt that expects structured output spells the format out twice
//! and tells the model what to do when uncertain — current models follow the
//! contract far more reliably when the envelope is this explicit.

use std::path::Path;

/// System prompt installed on the model collaborator by the host binary.
pub const SYSTEM_PROMPT: &str = "\
You are the coding agent inside the Codeloom terminal workbench.\n\
Your responses are parsed mechanically and written to disk, so the output \
contract is strict:\n\
1) Start with a short plan (a few bullets), then emit one or more complete \
files, each in its own fenced code block.\n\
2) The fence tag is the language; the first line inside the fence should be \
a path comment such as `// path: pkg/server.go` or `# path: app/main.py`.\n\
3) Every fence is one whole file. No diffs, no snippets, no placeholders.\n\
4) You will receive a CODEBASE SNAPSHOT (tree plus file excerpts); treat it \
as the authoritative state of the workspace and integrate with it.\n\
5) Prefer small runnable modules, idiomatic per language, with brief \
comments and no hardcoded secrets.\n";

fn context_block(root: &Path, snapshot_markdown: &str) -> String {
    format!(
        "### [WORKSPACE ROOT]\n{}\n\n{}",
        root.display(),
        snapshot_markdown
    )
}

/// Ask for a JSON array of 3–8 sub-goal strings.
pub fn split_goal_prompt(root: &Path, snapshot_markdown: &str, goal: &str) -> String {
    format!(
        "You are an expert software project planner.\n\
         Split the GOAL into 3\u{2013}8 clear development phases.\n\n\
         ### STRICT OUTPUT FORMAT ###\n\
         Return only one valid JSON array of strings.\n\
         No markdown, prose, comments, or keys.\n\
         Start directly with '[' and end with ']'.\n\
         Example:\n[\"plan data model\", \"build API\", \"add tests\"]\n\
         If you are uncertain, return an empty array [] \u{2014} never explain.\n\n\
         ### CONTEXT ###\n{}\n\n---\nGOAL:\n{}\n\n\
         Return ONLY valid JSON, no text before or after.\n",
        context_block(root, snapshot_markdown),
        goal
    )
}

/// Ask for an ordered array of `{name, goal}` step records.
pub fn step_plan_prompt(goal: &str) -> String {
    format!(
        "You are a software engineer. The user has a goal that requires code \
         changes.\n\n\
         Break the goal into 1\u{2013}{} concrete, immediately executable steps.\n\
         Respond with ONLY a JSON array of {{\"name\", \"goal\"}} objects \u{2014} no \
         explanations, no planning meta-text.\n\
         The first step must be a direct code modification or creation, not \
         \"create a plan\".\n\n\
         Example:\n\
         [{{\"name\":\"Step 1: Add config loader\",\"goal\":\"Create config/config.go \
         and implement LoadConfig() reading from .env.\"}}]\n\n\
         User goal:\n{}",
        super::plan::MAX_SUBGOALS,
        goal
    )
}

/// Ask for the file plan of one phase.
pub fn file_plan_prompt(root: &Path, snapshot_markdown: &str, phase_name: &str, phase_goal: &str) -> String {
    format!(
        "You are a senior software planner inside the Codeloom workbench.\n\
         For this PHASE, plan which files must be generated next.\n\n\
         ### STRICT OUTPUT FORMAT ###\n\
         Return only a valid JSON array of objects.\n\
         Each object must include keys: name, path, lang, goal (all strings).\n\
         No markdown, prose, comments, or explanations.\n\
         Start with '[' and end with ']'.\n\
         Example:\n\
         [{{\"name\":\"server\",\"path\":\"src/server.go\",\"lang\":\"Go\",\"goal\":\"HTTP handlers\"}}]\n\n\
         If you are uncertain, return [].\n\n\
         ### CONTEXT ###\n{}\n\n---\nPHASE: {} \u{2014} {}\n\
         Return ONLY valid JSON, no prose.\n",
        context_block(root, snapshot_markdown),
        phase_name,
        phase_goal
    )
}

/// Ask for exactly one file of a sub-goal.
pub fn file_gen_prompt(
    root: &Path,
    snapshot_markdown: &str,
    subgoal: &str,
    file_path: &str,
    file_name: &str,
    file_goal: &str,
) -> String {
    format!(
        "You are the coding agent inside the Codeloom workbench.\n\
         Generate ONLY ONE file for sub-goal '{}': {}\n\n\
         {}\n\n---\nFILE SPEC:\n{} \u{2014} {}\n\n\
         Follow the output contract: short plan, then one fenced file block.",
        subgoal,
        file_name,
        context_block(root, snapshot_markdown),
        file_path,
        file_goal
    )
}

/// Prompt for the single-shot flow: a file tree plus the task.
pub fn headless_prompt(tree: &str, task: &str) -> String {
    format!("File tree:\n```\n{tree}\n```\n\nMy task:\n{task}\n")
}
