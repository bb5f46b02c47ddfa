//! GitHub plugin steps.

use crate::core::{SecretStore, Settings};
use crate::engine::{step, StepOutcome, WorkflowContext, WorkflowResult};
use crate::integrations::{NewPullRequest, GITHUB_TOKEN_SECRET};
use crate::plugins::{failure, Plugin, StepDescriptor, UI_NOT_AVAILABLE};

const PR_KEYS: [&str; 4] = ["pr_title", "pr_body", "pr_head_branch", "pr_base_branch"];

/// Pull request workflow steps.
pub struct GitHubPlugin;

impl Plugin for GitHubPlugin {
    fn name(&self) -> &str {
        "github"
    }

    fn description(&self) -> &str {
        "Pull request creation on GitHub"
    }

    fn dependencies(&self) -> &[&str] {
        &["git"]
    }

    fn is_available(&self, _settings: &Settings, secrets: &SecretStore) -> bool {
        secrets.has(GITHUB_TOKEN_SECRET)
    }

    fn steps(&self) -> Vec<StepDescriptor> {
        vec![
            StepDescriptor::new("prompt_pr_details", "Collect pull request title and body", || {
                step("prompt_pr_details", prompt_pr_details)
            }),
            StepDescriptor::new("create_pr", "Open the pull request", || {
                step("create_pr", create_pr)
            }),
        ]
    }
}

fn default_base(ctx: &WorkflowContext) -> String {
    ctx.settings().plugin_str("github", "default_base").unwrap_or_else(|| "main".to_string())
}

/// Fill in `pr_title`, `pr_body`, `pr_head_branch` and `pr_base_branch`.
///
/// Values already in the context are kept; the title is asked for when
/// missing.
pub fn prompt_pr_details(ctx: &mut WorkflowContext) -> StepOutcome {
    if PR_KEYS.iter().all(|key| ctx.has(key)) && ctx.get_str("pr_title").is_some() {
        return Ok(WorkflowResult::skip("Pull request details already provided"));
    }

    let head = match ctx.get_str("pr_head_branch").map(str::to_string) {
        Some(head) => head,
        None => match ctx.git().map(|git| git.current_branch()) {
            Some(Ok(branch)) => branch,
            Some(Err(e)) => return Ok(failure("Cannot determine head branch", e)),
            None => {
                return Ok(WorkflowResult::error(
                    "Head branch is unknown: set pr_head_branch or attach a git client",
                ))
            }
        },
    };
    let base = ctx.get_str("pr_base_branch").map_or_else(|| default_base(ctx), str::to_string);

    let existing_title = ctx.get_str("pr_title").map(str::to_string);
    let existing_body = ctx.get("pr_body").and_then(|v| v.as_str()).map(str::to_string);

    let (title, body) = match (existing_title, existing_body) {
        (Some(title), Some(body)) => (title, body),
        (title, body) => {
            let Some(ui) = ctx.ui() else {
                return Ok(WorkflowResult::error(UI_NOT_AVAILABLE));
            };
            let title = match title {
                Some(title) => title,
                None => match ui.ask_text(&format!("Pull request title ({head} → {base}):"))? {
                    Some(title) if !title.trim().is_empty() => title.trim().to_string(),
                    _ => return Ok(WorkflowResult::error("Pull request title is required")),
                },
            };
            let body = match body {
                Some(body) => body,
                None => ui.ask_text("Pull request description (optional):")?.unwrap_or_default(),
            };
            (title, body)
        }
    };

    Ok(WorkflowResult::success(format!("Pull request details ready: {title}"))
        .with_metadata("pr_title", title)
        .with_metadata("pr_body", body)
        .with_metadata("pr_head_branch", head)
        .with_metadata("pr_base_branch", base))
}

/// Open a pull request from the `pr_*` context keys.
///
/// Outputs `pr_number` and `pr_url`.
pub fn create_pr(ctx: &mut WorkflowContext) -> StepOutcome {
    let Some(github) = ctx.github() else {
        return Ok(WorkflowResult::error("GitHub client is not available in the workflow context."));
    };

    let (Some(title), Some(head), Some(base)) = (
        ctx.get_str("pr_title"),
        ctx.get_str("pr_head_branch"),
        ctx.get_str("pr_base_branch"),
    ) else {
        return Ok(WorkflowResult::error(
            "Missing pull request details: pr_title, pr_head_branch and pr_base_branch are required",
        ));
    };
    // An empty body is allowed.
    let body = ctx.get("pr_body").and_then(|v| v.as_str()).unwrap_or_default();

    let request = NewPullRequest {
        title: title.to_string(),
        body: body.to_string(),
        head: head.to_string(),
        base: base.to_string(),
        draft: ctx.get_bool("pr_is_draft").unwrap_or(false),
    };

    match github.create_pull_request(&request) {
        Ok(pr) => {
            if let Some(ui) = ctx.ui() {
                ui.body(&pr.html_url);
            }
            Ok(WorkflowResult::success(format!("Pull request #{} created", pr.number))
                .with_metadata("pr_number", pr.number)
                .with_metadata("pr_url", pr.html_url))
        }
        Err(e) => Ok(failure("Failed to create pull request", e)),
    }
}
