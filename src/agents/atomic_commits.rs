//! Atomic commit planning agent.

use std::fmt::Write as _;

use super::{truncate, Agent, Prepared};
use crate::engine::{StepOutcome, WorkflowContext, WorkflowResult};
use crate::git::GitStatus;

const MAX_DIFFS: usize = 10;
const MAX_DIFF_CHARS: usize = 1000;
const SHOWN_FILES: usize = 3;

/// One proposed commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedCommit {
    pub files: Vec<String>,
    pub message: String,
}

/// Split the working tree changes into several conventional commits.
///
/// Reads `git_status` and the per-file diffs from the git client. After the
/// user confirms the plan, stages and commits each group in order. Outputs
/// `commits_created` (the messages) and `total_commits`.
#[derive(Debug, Clone, Copy, Default)]
pub struct AtomicCommitsAgent;

impl AtomicCommitsAgent {
    fn changed_files(ctx: &WorkflowContext) -> anyhow::Result<Option<Vec<String>>> {
        let status: Option<GitStatus> = ctx.get_as("git_status")?;
        Ok(status
            .filter(|s| !s.is_clean)
            .map(|s| s.changed_files().into_iter().map(str::to_string).collect()))
    }
}

impl Agent for AtomicCommitsAgent {
    fn name(&self) -> &str {
        "ai_create_atomic_commits"
    }

    fn prepare(&self, ctx: &WorkflowContext) -> anyhow::Result<Prepared> {
        let Some(files) = Self::changed_files(ctx)? else {
            return Ok(Prepared::Skip("No changes to commit".to_string()));
        };
        let Some(git) = ctx.git() else {
            return Ok(Prepared::Fail("Git client not available".to_string()));
        };
        if files.is_empty() {
            return Ok(Prepared::Skip("No files to commit".to_string()));
        }

        if let Some(ui) = ctx.ui() {
            ui.info(&format!("📝 Analyzing {} changed files...", files.len()));
        }

        let mut diffs = Vec::new();
        for file in &files {
            match git.file_diff(file) {
                Ok(diff) if !diff.is_empty() => diffs.push((file.as_str(), diff)),
                Ok(_) => {}
                Err(e) => {
                    if let Some(ui) = ctx.ui() {
                        ui.warning(&format!("Could not get diff for {file}: {e}"));
                    }
                }
            }
        }
        if diffs.is_empty() {
            return Ok(Prepared::Skip("No diffs available for analysis".to_string()));
        }

        let mut prompt = String::from("Analyze these changes and propose atomic commits.\n\n");
        let _ = writeln!(prompt, "## Changed Files ({} total)", diffs.len());
        for (file, _) in &diffs {
            let _ = writeln!(prompt, "  - {file}");
        }

        prompt.push_str("\n## Sample Diffs\n");
        for (file, diff) in diffs.iter().take(MAX_DIFFS) {
            let _ = write!(prompt, "\n### {file}\n```diff\n{}\n```\n", truncate(diff, MAX_DIFF_CHARS));
        }
        if diffs.len() > MAX_DIFFS {
            let _ = writeln!(prompt, "\n... and {} more files", diffs.len() - MAX_DIFFS);
        }

        prompt.push_str(
            "\n## Instructions\n\
             Create atomic commits that group related changes. Each commit should:\n\
             1. Focus on a single logical change (feature, fix, refactor, docs, etc.)\n\
             2. Use conventional commits format: type(scope): description\n\
             3. Be descriptive but concise (max 72 chars for title)\n\n\
             Format your response EXACTLY like this:\n\n\
             COMMIT 1:\n\
             FILES: src/auth.rs, src/session.rs\n\
             MESSAGE: feat(auth): add user authentication system\n\n\
             COMMIT 2:\n\
             FILES: tests/auth.rs\n\
             MESSAGE: test(auth): add authentication tests\n\n\
             Propose between 1-5 atomic commits based on the changes.\n",
        );

        if let Some(ui) = ctx.ui() {
            ui.info("🤖 AI is analyzing changes to create atomic commits...");
        }
        Ok(Prepared::Prompt(prompt))
    }

    fn interpret(&self, response: String, ctx: &WorkflowContext) -> StepOutcome {
        if !response.contains("COMMIT") {
            let preview: String = response.chars().take(200).collect();
            return Ok(WorkflowResult::error(format!(
                "AI response format incorrect. Expected 'COMMIT N:' sections.\nGot: {preview}..."
            )));
        }

        let plan = parse_commit_plan(&response);
        if plan.is_empty() {
            return Ok(WorkflowResult::error("AI did not propose any commits"));
        }

        let Some(git) = ctx.git() else {
            return Ok(WorkflowResult::error("Git client not available"));
        };
        let changed = Self::changed_files(ctx)?.unwrap_or_default();
        let ui = ctx.ui();

        if let Some(ui) = ui {
            ui.line();
            ui.title(&format!("📦 AI Proposed {} Atomic Commits:", plan.len()));
            for (i, commit) in plan.iter().enumerate() {
                ui.body(&format!("  {}. {}", i + 1, commit.message));
                ui.body(&format!("     Files: {}", files_summary(&commit.files)));
            }
            ui.line();

            if !ui.ask_confirm("Create these atomic commits?", true)? {
                return Ok(WorkflowResult::skip("User declined to create atomic commits"));
            }
        }

        let mut created: Vec<String> = Vec::new();
        for (i, commit) in plan.iter().enumerate() {
            if let Some(ui) = ui {
                ui.info(&format!("Creating commit {}/{}: {}", i + 1, plan.len(), commit.message));
            }

            // Paths the model invented are never staged.
            let files: Vec<String> =
                commit.files.iter().filter(|f| changed.contains(*f)).cloned().collect();
            let outcome = if files.is_empty() {
                Err("none of its files have changes".to_string())
            } else {
                git.stage(&files)
                    .and_then(|()| git.commit(&commit.message, false))
                    .map_err(|e| e.to_string())
            };

            match outcome {
                Ok(hash) => {
                    tracing::debug!(hash = %hash, files = files.len(), "Created atomic commit");
                    if let Some(ui) = ui {
                        ui.success(&format!("  ✓ Created: {}", commit.message));
                    }
                    created.push(commit.message.clone());
                }
                Err(e) => {
                    if let Some(ui) = ui {
                        ui.warning(&format!("  ✗ Failed to create commit: {e}"));
                    }
                }
            }
        }

        if created.is_empty() {
            return Ok(WorkflowResult::error("No commits were created"));
        }

        let total = created.len();
        Ok(WorkflowResult::success(format!("Created {total} atomic commits"))
            .with_metadata("commits_created", created)
            .with_metadata("total_commits", total))
    }

    fn failure_message(&self) -> &str {
        "Atomic commit analysis failed"
    }
}

/// Read `COMMIT N:` / `FILES:` / `MESSAGE:` blocks. Blocks without a
/// message are dropped.
pub fn parse_commit_plan(response: &str) -> Vec<PlannedCommit> {
    let mut plan = Vec::new();
    let mut current: Option<PlannedCommit> = None;

    for line in response.lines().map(str::trim) {
        if line.starts_with("COMMIT") {
            plan.extend(current.take().filter(|c| !c.message.is_empty()));
            current = Some(PlannedCommit { files: Vec::new(), message: String::new() });
        } else if let Some(commit) = current.as_mut() {
            if let Some(files) = line.strip_prefix("FILES:") {
                commit.files = files
                    .split(',')
                    .map(str::trim)
                    .filter(|f| !f.is_empty())
                    .map(str::to_string)
                    .collect();
            } else if let Some(message) = line.strip_prefix("MESSAGE:") {
                commit.message = message.trim().to_string();
            }
        }
    }
    plan.extend(current.filter(|c| !c.message.is_empty()));
    plan
}

fn files_summary(files: &[String]) -> String {
    let mut summary = files.iter().take(SHOWN_FILES).cloned().collect::<Vec<_>>().join(", ");
    if files.len() > SHOWN_FILES {
        let _ = write!(summary, " (+{} more)", files.len() - SHOWN_FILES);
    }
    summary
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;

    use super::*;
    use crate::agents::agent_step;
    use crate::agents::testing::ScriptedAi;
    use crate::core::{SecretStore, Settings};
    use crate::engine::WorkflowContextBuilder;
    use crate::git::testing::FakeGit;
    use crate::ui::CaptureUi;

    const PLAN: &str = "\
COMMIT 1:
FILES: src/auth.rs, src/session.rs
MESSAGE: feat(auth): add login

COMMIT 2:
FILES: README.md
MESSAGE: docs: describe login
";

    fn status() -> GitStatus {
        GitStatus {
            branch: Some("main".to_string()),
            is_clean: false,
            modified_files: vec!["src/auth.rs".to_string(), "README.md".to_string()],
            untracked_files: vec!["src/session.rs".to_string()],
            ..GitStatus::default()
        }
    }

    fn git() -> FakeGit {
        let file_diffs: HashMap<String, String> = [
            ("src/auth.rs", "+fn login() {}\n"),
            ("src/session.rs", "+struct Session;\n"),
            ("README.md", "+## Login\n"),
        ]
        .into_iter()
        .map(|(f, d)| (f.to_string(), d.to_string()))
        .collect();
        FakeGit { status: status(), file_diffs, ..FakeGit::default() }
    }

    fn builder(ai: Arc<ScriptedAi>, git: Arc<FakeGit>) -> WorkflowContextBuilder {
        WorkflowContextBuilder::new(Settings::default(), SecretStore::isolated())
            .with_ai_client(ai)
            .with_git_client(git)
            .with_data("git_status", serde_json::to_value(status()).unwrap())
    }

    #[test]
    fn test_parse_commit_plan() {
        let plan = parse_commit_plan(
            "Here you go:\nCOMMIT 1:\nFILES: a.rs, b.rs,\nMESSAGE: feat: a\n\nCOMMIT 2:\nFILES: c.rs\n\nCOMMIT 3:\n  MESSAGE: chore: c\n",
        );
        assert_eq!(
            plan,
            vec![
                PlannedCommit {
                    files: vec!["a.rs".to_string(), "b.rs".to_string()],
                    message: "feat: a".to_string(),
                },
                PlannedCommit { files: Vec::new(), message: "chore: c".to_string() },
            ]
        );
    }

    #[test]
    fn test_files_summary_truncates() {
        let files: Vec<String> = ["a", "b", "c", "d", "e"].iter().map(|f| f.to_string()).collect();
        assert_eq!(files_summary(&files), "a, b, c (+2 more)");
        assert_eq!(files_summary(&files[..2]), "a, b");
    }

    #[test]
    fn test_creates_commits_in_order() {
        let ai = Arc::new(ScriptedAi::replying(PLAN));
        let fake = Arc::new(git());
        let ui = Arc::new(CaptureUi::with_replies(["y"]));
        let mut ctx = builder(ai.clone(), fake.clone()).with_ui_renderer(ui.clone()).build();

        let result = agent_step(AtomicCommitsAgent).run(&mut ctx).unwrap();
        assert!(result.is_success(), "{}", result.message());
        assert_eq!(result.message(), "Created 2 atomic commits");
        assert_eq!(result.metadata()["total_commits"], 2);
        assert_eq!(result.metadata()["commits_created"][1], "docs: describe login");

        assert_eq!(
            *fake.staged.lock(),
            vec![
                vec!["src/auth.rs".to_string(), "src/session.rs".to_string()],
                vec!["README.md".to_string()],
            ]
        );
        let commits = fake.commits.lock();
        assert_eq!(commits[0], ("feat(auth): add login".to_string(), false));

        let prompt = &ai.prompts.lock()[0].0;
        assert!(prompt.contains("## Changed Files (3 total)"));
        assert!(prompt.contains("+struct Session;"));
        assert!(ui.messages().iter().any(|m| m == "     Files: src/auth.rs, src/session.rs"));
    }

    #[test]
    fn test_declined_plan_commits_nothing() {
        let fake = Arc::new(git());
        let ui = Arc::new(CaptureUi::with_replies(["n"]));
        let mut ctx = builder(Arc::new(ScriptedAi::replying(PLAN)), fake.clone())
            .with_ui_renderer(ui)
            .build();

        let result = agent_step(AtomicCommitsAgent).run(&mut ctx).unwrap();
        assert!(result.is_skip());
        assert_eq!(result.message(), "User declined to create atomic commits");
        assert!(fake.commits.lock().is_empty());
    }

    #[test]
    fn test_unknown_files_are_not_staged() {
        let fake = Arc::new(git());
        let reply = "COMMIT 1:\nFILES: src/ghost.rs\nMESSAGE: feat: ghost\n\nCOMMIT 2:\nFILES: README.md, src/ghost.rs\nMESSAGE: docs: readme\n";
        let mut ctx = builder(Arc::new(ScriptedAi::replying(reply)), fake.clone()).build();

        let result = agent_step(AtomicCommitsAgent).run(&mut ctx).unwrap();
        assert!(result.is_success());
        assert_eq!(result.metadata()["total_commits"], 1);
        assert_eq!(*fake.staged.lock(), vec![vec!["README.md".to_string()]]);
    }

    #[test]
    fn test_failed_commits_are_an_error() {
        let fake = Arc::new(FakeGit { fail_commits: true, ..git() });
        let mut ctx = builder(Arc::new(ScriptedAi::replying(PLAN)), fake).build();

        let result = agent_step(AtomicCommitsAgent).run(&mut ctx).unwrap();
        assert!(result.is_error());
        assert_eq!(result.message(), "No commits were created");
    }

    #[test]
    fn test_malformed_reply_is_an_error() {
        let fake = Arc::new(git());
        let mut ctx = builder(Arc::new(ScriptedAi::replying("feat: everything")), fake.clone()).build();
        let result = agent_step(AtomicCommitsAgent).run(&mut ctx).unwrap();
        assert!(result.message().starts_with("AI response format incorrect"));

        let mut ctx =
            builder(Arc::new(ScriptedAi::replying("COMMIT 1:\nFILES: a.rs\n")), fake).build();
        let result = agent_step(AtomicCommitsAgent).run(&mut ctx).unwrap();
        assert_eq!(result.message(), "AI did not propose any commits");
    }

    #[test]
    fn test_skips_and_failures_before_calling_ai() {
        let ai = Arc::new(ScriptedAi::replying(PLAN));
        let clean = GitStatus { is_clean: true, ..GitStatus::default() };
        let mut ctx = WorkflowContextBuilder::new(Settings::default(), SecretStore::isolated())
            .with_ai_client(ai.clone())
            .with_git_client(Arc::new(git()))
            .with_data("git_status", serde_json::to_value(clean).unwrap())
            .build();
        assert_eq!(
            agent_step(AtomicCommitsAgent).run(&mut ctx).unwrap().message(),
            "No changes to commit"
        );

        let mut ctx = WorkflowContextBuilder::new(Settings::default(), SecretStore::isolated())
            .with_ai_client(ai.clone())
            .with_data("git_status", serde_json::to_value(status()).unwrap())
            .build();
        let result = agent_step(AtomicCommitsAgent).run(&mut ctx).unwrap();
        assert!(result.is_error());
        assert_eq!(result.message(), "Git client not available");

        let mut ctx = builder(ai.clone(), Arc::new(FakeGit { status: status(), ..FakeGit::default() }))
            .build();
        assert_eq!(
            agent_step(AtomicCommitsAgent).run(&mut ctx).unwrap().message(),
            "No diffs available for analysis"
        );
        assert!(ai.prompts.lock().is_empty());
    }
}
