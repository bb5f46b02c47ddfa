//! Pull request description agent.

use std::fmt::Write as _;

use super::{truncate, Agent, Prepared};
use crate::engine::{StepOutcome, WorkflowContext, WorkflowResult};
use crate::git::GitStatus;

const MAX_TITLE_LEN: usize = 72;
const TEMPLATE_PATH: &str = ".github/pull_request_template.md";

/// Title and body for a pull request of the current branch.
///
/// Opt-in: runs only when `use_ai` is `true`. Reads `git_status`,
/// `git_diff`, `pr_head_branch`/`current_branch` and
/// `pr_base_branch`/`base_branch`, plus the branch commits from the git
/// client when one is attached. Outputs `pr_title`, `pr_body` and
/// `ai_generated`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrDescriptionAgent;

impl PrDescriptionAgent {
    fn base_branch(ctx: &WorkflowContext) -> String {
        ctx.get_str("pr_base_branch")
            .or_else(|| ctx.get_str("base_branch"))
            .map(str::to_string)
            .or_else(|| ctx.settings().plugin_str("github", "default_base"))
            .unwrap_or_else(|| "main".to_string())
    }

    fn head_branch(ctx: &WorkflowContext) -> String {
        ctx.get_str("pr_head_branch")
            .or_else(|| ctx.get_str("current_branch"))
            .map(str::to_string)
            .or_else(|| ctx.git().and_then(|git| git.current_branch().ok()))
            .unwrap_or_else(|| "HEAD".to_string())
    }
}

impl Agent for PrDescriptionAgent {
    fn name(&self) -> &str {
        "suggest_pr_description"
    }

    fn prepare(&self, ctx: &WorkflowContext) -> anyhow::Result<Prepared> {
        if ctx.get_bool("use_ai") != Some(true) {
            return Ok(Prepared::Skip(
                "AI not requested (use_ai=false). Using manual prompts.".to_string(),
            ));
        }
        if ctx.get_str("pr_title").is_some() {
            return Ok(Prepared::Skip("Pull request title already provided".to_string()));
        }

        let status: Option<GitStatus> = ctx.get_as("git_status")?;
        let diff = ctx.get_str("git_diff").unwrap_or_default();
        let base = Self::base_branch(ctx);
        let head = Self::head_branch(ctx);

        let commits = match ctx.git().map(|git| git.branch_commits(&base, &head)) {
            Some(Ok(commits)) => commits,
            Some(Err(e)) => {
                tracing::warn!(error = %e, base, head, "Could not list branch commits");
                Vec::new()
            }
            None => Vec::new(),
        };

        let files: Vec<&str> = status.as_ref().map(GitStatus::changed_files).unwrap_or_default();
        if commits.is_empty() && files.is_empty() && diff.is_empty() {
            return Ok(Prepared::Skip("No changes to analyze for PR".to_string()));
        }

        if let Some(ui) = ctx.ui() {
            ui.info(&format!("📊 Analyzing branch: {head} vs {base}..."));
        }

        let mut commits_text = commits
            .iter()
            .take(15)
            .map(|c| format!("  - {}", c.summary))
            .collect::<Vec<_>>()
            .join("\n");
        if commits.len() > 15 {
            let _ = write!(commits_text, "\n  ... and {} more commits", commits.len() - 15);
        }

        let mut files_text =
            files.iter().take(30).map(|f| format!("  - {f}")).collect::<Vec<_>>().join("\n");
        if files.len() > 30 {
            let _ = write!(files_text, "\n  ... and {} more files", files.len() - 30);
        }

        let diff_preview =
            if diff.is_empty() { "No diff available".to_string() } else { truncate(diff, 8000) };

        let template_path = ctx.settings().project_dir().join(TEMPLATE_PATH);
        let template = std::fs::read_to_string(&template_path).unwrap_or_default();

        let mut prompt = String::from(
            "Analyze this branch and generate a professional pull request following the template.\n\n",
        );
        prompt.push_str("## Branch Information\n");
        let _ = writeln!(prompt, "- Current branch: {head}");
        let _ = writeln!(prompt, "- Base branch: {base}");
        let _ = writeln!(prompt, "- Files changed: {}", files.len());
        let _ = writeln!(prompt, "- Total commits: {}\n", commits.len());

        prompt.push_str("## Commits in Branch\n");
        prompt.push_str(if commits_text.is_empty() {
            "No commit information available"
        } else {
            &commits_text
        });
        prompt.push_str("\n\n## Changed Files\n");
        prompt.push_str(&files_text);
        let _ = write!(prompt, "\n\n## Branch Diff Preview\n```diff\n{diff_preview}\n```\n\n");

        prompt.push_str("## PR Template to Follow\n");
        prompt.push_str(if template.trim().is_empty() {
            "No template found - use standard format"
        } else {
            &template
        });

        prompt.push_str(
            "\n\n## Instructions\n\
             Generate a complete Pull Request that:\n\
             1. **Title**: Follow conventional commits (type(scope): description), max 72 chars\n\
             2. **Body**: Follow the PR template, filling in every section\n\n\
             Format your response EXACTLY like this:\n\
             TITLE: <conventional commit title>\n\n\
             DESCRIPTION:\n\
             <full PR body following the template>\n",
        );

        Ok(Prepared::Prompt(prompt))
    }

    fn interpret(&self, response: String, ctx: &WorkflowContext) -> StepOutcome {
        let Some((title, body)) = parse_pr_response(&response) else {
            let preview: String = response.chars().take(200).collect();
            return Ok(WorkflowResult::error(format!(
                "AI response format incorrect. Expected 'TITLE:' and 'DESCRIPTION:' sections.\nGot: {preview}..."
            )));
        };

        if let Some(ui) = ctx.ui() {
            ui.line();
            ui.title("📝 AI Generated PR:");
            ui.body(&format!("  Title: {title}"));
            ui.line();
            ui.body(&body);
            ui.line();

            if !ui.ask_confirm("Use this AI-generated PR description?", true)? {
                ui.warning("AI suggestion skipped. Will prompt for manual input.");
                return Ok(WorkflowResult::skip("User chose to skip AI suggestion"));
            }
        }

        Ok(WorkflowResult::success("AI generated PR description")
            .with_metadata("pr_title", title)
            .with_metadata("pr_body", body)
            .with_metadata("ai_generated", true))
    }

    fn failure_message(&self) -> &str {
        "AI generation failed"
    }
}

/// Split a `TITLE: ... DESCRIPTION: ...` reply into title and body.
fn parse_pr_response(response: &str) -> Option<(String, String)> {
    let (head, body) = response.split_once("DESCRIPTION:")?;
    let title_start = head.find("TITLE:")? + "TITLE:".len();

    let title = head[title_start..].trim().trim_matches(|c| c == '"' || c == '\'').trim();
    let title = if title.chars().count() > MAX_TITLE_LEN {
        let cut: String = title.chars().take(MAX_TITLE_LEN - 3).collect();
        format!("{cut}...")
    } else {
        title.to_string()
    };

    Some((title, body.trim().to_string()))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::agents::agent_step;
    use crate::agents::testing::ScriptedAi;
    use crate::core::{SecretStore, Settings};
    use crate::engine::WorkflowContextBuilder;
    use crate::ui::CaptureUi;

    const REPLY: &str = "TITLE: \"feat(auth): add login form\"\n\nDESCRIPTION:\n## Summary\nAdds a login form.";

    fn builder(ai: &Arc<ScriptedAi>) -> WorkflowContextBuilder {
        let status = GitStatus {
            branch: Some("feature/login".to_string()),
            modified_files: vec!["src/login.rs".to_string()],
            ..GitStatus::default()
        };
        WorkflowContextBuilder::new(Settings::default(), SecretStore::isolated())
            .with_ai_client(ai.clone())
            .with_data("git_status", serde_json::to_value(status).unwrap())
            .with_data("current_branch", "feature/login")
    }

    #[test]
    fn test_opt_in() {
        let ai = Arc::new(ScriptedAi::replying(REPLY));
        let mut ctx = builder(&ai).build();

        let result = agent_step(PrDescriptionAgent).run(&mut ctx).unwrap();
        assert!(result.is_skip());
        assert!(result.message().starts_with("AI not requested"));
        assert!(ai.prompts.lock().is_empty());
    }

    #[test]
    fn test_generates_title_and_body() {
        let ai = Arc::new(ScriptedAi::replying(REPLY));
        let mut ctx = builder(&ai).with_data("use_ai", true).build();

        let result = agent_step(PrDescriptionAgent).run(&mut ctx).unwrap();
        assert!(result.is_success());
        assert_eq!(result.metadata()["pr_title"], "feat(auth): add login form");
        assert_eq!(result.metadata()["pr_body"], "## Summary\nAdds a login form.");
        assert_eq!(result.metadata()["ai_generated"], true);

        let prompts = ai.prompts.lock();
        assert!(prompts[0].0.contains("- Current branch: feature/login"));
        assert!(prompts[0].0.contains("- Base branch: main"));
        assert!(prompts[0].0.contains("  - src/login.rs"));
    }

    #[test]
    fn test_user_declines() {
        let ai = Arc::new(ScriptedAi::replying(REPLY));
        let ui = Arc::new(CaptureUi::with_replies(["n"]));
        let mut ctx = builder(&ai).with_ui_renderer(ui).with_data("use_ai", true).build();

        let result = agent_step(PrDescriptionAgent).run(&mut ctx).unwrap();
        assert!(result.is_skip());
        assert_eq!(result.message(), "User chose to skip AI suggestion");
    }

    #[test]
    fn test_bad_format() {
        let ai = Arc::new(ScriptedAi::replying("Here is a great PR!"));
        let mut ctx = builder(&ai).with_data("use_ai", true).build();

        let result = agent_step(PrDescriptionAgent).run(&mut ctx).unwrap();
        assert!(result.is_error());
        assert!(result.message().starts_with("AI response format incorrect"));
    }

    #[test]
    fn test_parse_truncates_long_title() {
        let long = "a".repeat(100);
        let (title, body) = parse_pr_response(&format!("TITLE: {long}\nDESCRIPTION:\nbody")).unwrap();
        assert_eq!(title.chars().count(), 72);
        assert!(title.ends_with("..."));
        assert_eq!(body, "body");

        assert!(parse_pr_response("TITLE: only a title").is_none());
    }
}
