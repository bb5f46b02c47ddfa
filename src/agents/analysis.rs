//! Change analysis and commit message agents.

use std::fmt::Write as _;

use super::{truncate, Agent, Prepared};
use crate::ai::strip_code_fence;
use crate::engine::{StepOutcome, WorkflowContext, WorkflowResult};
use crate::git::GitStatus;

const ANALYSIS_SYSTEM_PROMPT: &str = "\
You are a Platform Engineering expert analyzing Git repository changes.

Provide concise, actionable insights about:
- What changed and why
- Potential issues or concerns
- Recommendations for improvements

Be direct and technical.";

const COMMIT_SYSTEM_PROMPT: &str = "\
You are a Git commit message expert.

Generate commit messages following conventional commits format:
type(scope): description

Types: feat, fix, docs, style, refactor, test, chore, ci, build, perf

Rules:
1. Use lowercase for type and description
2. Keep description under 72 characters
3. Be specific but concise
4. Focus on WHAT changed, not HOW
5. Return ONLY the commit message, no explanations

Example: feat(auth): add OAuth2 login support";

/// `git_status` and `git_diff` from the context, or the reason to skip.
fn change_data(
    ctx: &WorkflowContext,
    clean_message: &str,
    missing_message: &str,
) -> anyhow::Result<Result<(Option<GitStatus>, Option<String>), Prepared>> {
    let status: Option<GitStatus> = ctx.get_as("git_status")?;
    let diff = ctx.get_str("git_diff").map(str::to_string);

    if status.is_none() && diff.is_none() {
        return Ok(Err(Prepared::Skip(missing_message.to_string())));
    }
    if status.as_ref().is_some_and(|s| s.is_clean) {
        return Ok(Err(Prepared::Skip(clean_message.to_string())));
    }
    Ok(Ok((status, diff)))
}

/// Review of the uncommitted changes.
///
/// Reads `git_status` / `git_diff` (at least one), and optionally
/// `analysis_prompt`, `analysis_system_prompt` and `pr_number`/`pr_title`.
/// Outputs `ai_analysis` and `analysis_mode`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChangeAnalysis;

impl Agent for ChangeAnalysis {
    fn name(&self) -> &str {
        "analyze_changes"
    }

    fn system_prompt(&self, ctx: &WorkflowContext) -> Option<String> {
        Some(ctx.get_str("analysis_system_prompt").unwrap_or(ANALYSIS_SYSTEM_PROMPT).to_string())
    }

    fn prepare(&self, ctx: &WorkflowContext) -> anyhow::Result<Prepared> {
        let (status, diff) = match change_data(
            ctx,
            "Working directory is clean, nothing to analyze",
            "No git data found in context to analyze",
        )? {
            Ok(data) => data,
            Err(skip) => return Ok(skip),
        };

        let mut prompt = String::new();
        match ctx.get_str("analysis_prompt") {
            Some(custom) => {
                prompt.push_str(custom);
                prompt.push_str("\n\n");
            }
            None => prompt.push_str("Analyze the following git repository changes:\n\n"),
        }

        if let Some(status) = &status {
            prompt.push_str("## Repository Status\n\n");
            let _ = writeln!(prompt, "- Branch: {}", status.branch_display());
            let _ = writeln!(prompt, "- Clean: {}", status.is_clean);
            if !status.modified_files.is_empty() {
                let _ = writeln!(prompt, "- Modified files: {}", status.modified_files.len());
                for file in status.modified_files.iter().take(10) {
                    let _ = writeln!(prompt, "  - {file}");
                }
            }
            if !status.untracked_files.is_empty() {
                let _ = writeln!(prompt, "- Untracked files: {}", status.untracked_files.len());
            }
            prompt.push('\n');
        }

        if let Some(diff) = &diff {
            let _ = write!(prompt, "## Changes\n\n```diff\n{}\n```\n\n", truncate(diff, 2000));
        }

        if let Some(number) = ctx.get("pr_number").filter(|v| !v.is_null()) {
            prompt.push_str("## Pull Request Info\n\n");
            let _ = writeln!(prompt, "- Number: #{number}");
            if let Some(title) = ctx.get_str("pr_title") {
                let _ = writeln!(prompt, "- Title: {title}");
            }
            prompt.push('\n');
        }

        Ok(Prepared::Prompt(prompt))
    }

    fn interpret(&self, response: String, ctx: &WorkflowContext) -> StepOutcome {
        if let Some(ui) = ctx.ui() {
            ui.body(response.trim());
        }
        Ok(WorkflowResult::success("AI analysis completed")
            .with_metadata("ai_analysis", response)
            .with_metadata("analysis_mode", "changes_analysis"))
    }

    fn failure_message(&self) -> &str {
        "AI analysis failed"
    }
}

/// Conventional commit message for the uncommitted changes.
///
/// Outputs `suggested_commit_message` and `commit_message`, so a following
/// `commit` step picks it up.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommitMessageAgent;

impl Agent for CommitMessageAgent {
    fn name(&self) -> &str {
        "suggest_commit_message"
    }

    fn system_prompt(&self, _ctx: &WorkflowContext) -> Option<String> {
        Some(COMMIT_SYSTEM_PROMPT.to_string())
    }

    fn prepare(&self, ctx: &WorkflowContext) -> anyhow::Result<Prepared> {
        if ctx.get_str("commit_message").is_some() {
            return Ok(Prepared::Skip("Commit message already provided".to_string()));
        }

        let (status, diff) = match change_data(
            ctx,
            "Working directory is clean, no commit needed",
            "No git data to analyze for commit message",
        )? {
            Ok(data) => data,
            Err(skip) => return Ok(skip),
        };

        let mut prompt = String::from("Generate a conventional commit message for these changes.\n\n");
        if let Some(hint) = ctx.get_str("commit_type_hint") {
            let _ = write!(prompt, "Expected type: {hint}\n\n");
        }

        if let Some(status) = &status {
            prompt.push_str("Modified files:\n");
            for file in status.changed_files().into_iter().take(20) {
                let _ = writeln!(prompt, "- {file}");
            }
            prompt.push('\n');
        }

        if let Some(diff) = &diff {
            let _ = write!(prompt, "Changes:\n```diff\n{}\n```\n", truncate(diff, 1500));
        }

        Ok(Prepared::Prompt(prompt))
    }

    fn interpret(&self, response: String, _ctx: &WorkflowContext) -> StepOutcome {
        let message = clean_commit_message(&response);
        if message.is_empty() {
            return Ok(WorkflowResult::error("AI returned an empty commit message"));
        }

        Ok(WorkflowResult::success(format!("Suggested commit: {message}"))
            .with_metadata("suggested_commit_message", message.clone())
            .with_metadata("commit_message", message))
    }

    fn failure_message(&self) -> &str {
        "Failed to generate commit message"
    }
}

/// First meaningful line of a model reply, without fences or a label.
fn clean_commit_message(response: &str) -> String {
    let text = strip_code_fence(response);
    let line = text.lines().map(str::trim).find(|l| !l.is_empty()).unwrap_or_default();

    let lower = line.to_ascii_lowercase();
    let line = ["commit message:", "commit:"]
        .iter()
        .find(|prefix| lower.starts_with(**prefix))
        .map_or(line, |prefix| line[prefix.len()..].trim());

    line.trim_matches(|c| c == '"' || c == '\'' || c == '`').trim().to_string()
}
