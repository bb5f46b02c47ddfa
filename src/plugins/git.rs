//! Git plugin steps.

use crate::engine::{step, StepOutcome, WorkflowContext, WorkflowResult};
use crate::git::{GitError, GitStatus};
use crate::plugins::{failure, Plugin, StepDescriptor, UI_NOT_AVAILABLE};

const GIT_NOT_AVAILABLE: &str = "Git client is not available in the workflow context.";

/// Local repository operations.
pub struct GitPlugin;

impl Plugin for GitPlugin {
    fn name(&self) -> &str {
        "git"
    }

    fn description(&self) -> &str {
        "Repository status, diffs, commits and pushes"
    }

    fn steps(&self) -> Vec<StepDescriptor> {
        vec![
            StepDescriptor::new("status", "Read the working tree status", || {
                step("status", status)
            }),
            StepDescriptor::new("diff", "Collect the uncommitted diff", || step("diff", diff)),
            StepDescriptor::new("prompt_commit_message", "Ask for a commit message", || {
                step("prompt_commit_message", prompt_commit_message)
            }),
            StepDescriptor::new("commit", "Commit staged (or all) changes", || {
                step("commit", commit)
            }),
            StepDescriptor::new("push", "Push the current branch", || step("push", push)),
        ]
    }
}

/// Status of the working tree.
///
/// Outputs `git_status` and `current_branch`.
pub fn status(ctx: &mut WorkflowContext) -> StepOutcome {
    let Some(git) = ctx.git() else {
        return Ok(WorkflowResult::error(GIT_NOT_AVAILABLE));
    };

    let status = match git.status() {
        Ok(status) => status,
        Err(e) => return Ok(failure("Failed to get git status", e)),
    };

    let message = if status.is_clean {
        "Git status retrieved. Working directory is clean.".to_string()
    } else {
        format!(
            "Git status retrieved. {} file(s) with changes.",
            status.changed_files().len()
        )
    };

    Ok(WorkflowResult::success(message)
        .with_metadata("current_branch", status.branch_display())
        .with_metadata("git_status", serde_json::to_value(&status)?))
}

/// Unified diff of uncommitted changes.
///
/// Outputs `git_diff`; skips when there is nothing to show.
pub fn diff(ctx: &mut WorkflowContext) -> StepOutcome {
    let Some(git) = ctx.git() else {
        return Ok(WorkflowResult::error(GIT_NOT_AVAILABLE));
    };

    match git.diff() {
        Ok(diff) if diff.trim().is_empty() => Ok(WorkflowResult::skip("No uncommitted changes")),
        Ok(diff) => {
            let lines = diff.lines().count();
            Ok(WorkflowResult::success(format!("Diff collected ({lines} lines)"))
                .with_metadata("git_diff", diff))
        }
        Err(e) => Ok(failure("Failed to get git diff", e)),
    }
}

const NOTHING_TO_COMMIT: &str = "Working directory is clean, nothing to commit";

/// Whether an earlier `status` step reported a clean working tree.
fn reported_clean(ctx: &WorkflowContext) -> anyhow::Result<bool> {
    Ok(ctx.get_as::<GitStatus>("git_status")?.is_some_and(|status| status.is_clean))
}

/// Ask the user for a commit message unless one is already in the context
/// or there is nothing to commit.
pub fn prompt_commit_message(ctx: &mut WorkflowContext) -> StepOutcome {
    if ctx.get_str("commit_message").is_some() {
        return Ok(WorkflowResult::skip("Commit message already provided"));
    }
    if reported_clean(ctx)? {
        return Ok(WorkflowResult::skip(NOTHING_TO_COMMIT));
    }

    let Some(ui) = ctx.ui() else {
        return Ok(WorkflowResult::error(UI_NOT_AVAILABLE));
    };

    match ui.ask_text("Enter commit message:")? {
        Some(message) if !message.trim().is_empty() => {
            Ok(WorkflowResult::success("Commit message captured")
                .with_metadata("commit_message", message.trim()))
        }
        _ => Ok(WorkflowResult::error("Commit message is required")),
    }
}

/// Commit with `commit_message`. `all_files` stages tracked changes first.
///
/// Outputs `commit_hash`.
pub fn commit(ctx: &mut WorkflowContext) -> StepOutcome {
    let Some(git) = ctx.git() else {
        return Ok(WorkflowResult::error(GIT_NOT_AVAILABLE));
    };

    if reported_clean(ctx)? {
        return Ok(WorkflowResult::skip(NOTHING_TO_COMMIT));
    }

    let Some(message) = ctx.get_str("commit_message") else {
        return Ok(WorkflowResult::error("Commit message is required"));
    };
    let all = ctx.get_bool("all_files").unwrap_or(false);

    match git.commit(message, all) {
        Ok(hash) => Ok(WorkflowResult::success(format!("Commit created successfully: {hash}"))
            .with_metadata("commit_hash", hash)),
        Err(GitError::NothingToCommit) => {
            Ok(WorkflowResult::skip("Nothing staged to commit"))
        }
        Err(e) => Ok(failure("Failed to create commit", e)),
    }
}

/// Push a branch, defaulting to the current branch and the default remote.
pub fn push(ctx: &mut WorkflowContext) -> StepOutcome {
    let Some(git) = ctx.git() else {
        return Ok(WorkflowResult::error(GIT_NOT_AVAILABLE));
    };

    let remote = match ctx.get_str("push_remote") {
        Some(remote) => remote.to_string(),
        None => match git.default_remote() {
            Some(remote) => remote,
            None => return Ok(WorkflowResult::error("No git remote configured")),
        },
    };
    let branch = match ctx.get_str("push_branch") {
        Some(branch) => branch.to_string(),
        None => match git.current_branch() {
            Ok(branch) => branch,
            Err(e) => return Ok(failure("Cannot determine branch to push", e)),
        },
    };
    let set_upstream = ctx.get_bool("push_set_upstream").unwrap_or(true);

    match git.push(&remote, &branch, set_upstream) {
        Ok(()) => Ok(WorkflowResult::success(format!("Pushed {branch} to {remote}"))
            .with_metadata("pushed_branch", branch)),
        Err(e) => Ok(failure("Failed to push", e)),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::core::{SecretStore, Settings};
    use crate::engine::WorkflowContextBuilder;
    use crate::git::testing::FakeGit;
    use crate::git::GitStatus;
    use crate::ui::CaptureUi;

    fn dirty() -> FakeGit {
        FakeGit {
            status: GitStatus {
                branch: Some("feature/login".to_string()),
                is_clean: false,
                modified_files: vec!["src/lib.rs".to_string()],
                ..GitStatus::default()
            },
            diff: "+fn login() {}\n".to_string(),
            ..FakeGit::default()
        }
    }

    fn builder() -> WorkflowContextBuilder {
        WorkflowContextBuilder::new(Settings::default(), SecretStore::isolated())
    }

    #[test]
    fn test_steps_error_without_git() {
        let mut ctx = builder().build();
        for run in [status, diff, commit, push] {
            let result = run(&mut ctx).unwrap();
            assert!(result.is_error());
            assert_eq!(result.message(), GIT_NOT_AVAILABLE);
        }
    }

    #[test]
    fn test_status_outputs() {
        let mut ctx = builder().with_git_client(Arc::new(dirty())).build();
        let result = status(&mut ctx).unwrap();

        assert!(result.is_success());
        assert!(result.message().contains("1 file(s)"));
        assert_eq!(result.metadata()["current_branch"], "feature/login");
        assert_eq!(result.metadata()["git_status"]["is_clean"], false);
    }

    #[test]
    fn test_diff_skips_when_empty() {
        let mut ctx = builder().with_git_client(Arc::new(FakeGit::default())).build();
        assert!(diff(&mut ctx).unwrap().is_skip());

        let mut ctx = builder().with_git_client(Arc::new(dirty())).build();
        let result = diff(&mut ctx).unwrap();
        assert!(result.is_success());
        assert_eq!(result.metadata()["git_diff"], "+fn login() {}\n");
    }

    #[test]
    fn test_prompt_commit_message() {
        let ui = Arc::new(CaptureUi::with_replies(["  feat: add login  "]));
        let mut ctx = builder().with_ui_renderer(ui).build();
        let result = prompt_commit_message(&mut ctx).unwrap();
        assert!(result.is_success());
        assert_eq!(result.metadata()["commit_message"], "feat: add login");

        let mut ctx = builder().with_data("commit_message", "fix: typo").build();
        assert!(prompt_commit_message(&mut ctx).unwrap().is_skip());
    }

    #[test]
    fn test_clean_tree_skips_prompt_and_commit() {
        let ui = Arc::new(CaptureUi::with_replies(["feat: unused"]));
        let git = Arc::new(FakeGit {
            status: GitStatus { is_clean: true, ..GitStatus::default() },
            ..FakeGit::default()
        });
        let workflow = crate::engine::Workflow::new(
            "commit",
            vec![
                step("status", status),
                step("prompt_commit_message", prompt_commit_message),
                step("commit", commit),
            ],
        );
        let mut ctx = builder().with_ui_renderer(ui.clone()).with_git_client(git.clone()).build();

        let report = workflow.run_with_report(&mut ctx);
        assert!(report.succeeded());
        assert!(report.steps[1].result.is_skip());
        assert!(report.steps[2].result.is_skip());
        assert!(!ctx.has("commit_message"));
        assert!(!ui.messages().iter().any(|m| m == "Enter commit message:"));
        assert!(git.commits.lock().is_empty());
    }

    #[test]
    fn test_prompt_commit_message_cancelled() {
        let ui = Arc::new(CaptureUi::new());
        let mut ctx = builder().with_ui_renderer(ui).build();
        let result = prompt_commit_message(&mut ctx).unwrap();
        assert!(result.is_error());
        assert_eq!(result.message(), "Commit message is required");

        let mut ctx = builder().build();
        assert_eq!(prompt_commit_message(&mut ctx).unwrap().message(), UI_NOT_AVAILABLE);
    }

    #[test]
    fn test_commit_uses_context_values() {
        let git = Arc::new(dirty());
        let mut ctx = builder()
            .with_git_client(git.clone())
            .with_data("commit_message", "feat: add login")
            .with_data("all_files", true)
            .build();

        let result = commit(&mut ctx).unwrap();
        assert!(result.is_success());
        assert_eq!(result.message(), "Commit created successfully: abc123");
        assert_eq!(result.metadata()["commit_hash"], "abc123");
        assert_eq!(git.commits.lock().as_slice(), &[("feat: add login".to_string(), true)]);
    }

    #[test]
    fn test_commit_skips_clean_tree() {
        let clean = GitStatus { is_clean: true, ..GitStatus::default() };
        let git = Arc::new(FakeGit::default());
        let mut ctx = builder()
            .with_git_client(git.clone())
            .with_data("commit_message", "chore: nothing")
            .with_data("git_status", serde_json::to_value(clean).unwrap())
            .build();

        assert!(commit(&mut ctx).unwrap().is_skip());
        assert!(git.commits.lock().is_empty());
    }

    #[test]
    fn test_commit_requires_message() {
        let mut ctx = builder().with_git_client(Arc::new(dirty())).build();
        let result = commit(&mut ctx).unwrap();
        assert!(result.is_error());
        assert_eq!(result.message(), "Commit message is required");
    }

    #[test]
    fn test_push_defaults() {
        let git = Arc::new(dirty());
        let mut ctx = builder().with_git_client(git.clone()).build();

        let result = push(&mut ctx).unwrap();
        assert!(result.is_success());
        assert_eq!(
            git.pushes.lock().as_slice(),
            &[("origin".to_string(), "feature/login".to_string(), true)]
        );
    }
}
