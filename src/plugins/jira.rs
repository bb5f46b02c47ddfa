//! Jira plugin steps.

use crate::core::{SecretStore, Settings};
use crate::engine::{step, StepOutcome, WorkflowContext, WorkflowResult};
use crate::integrations::Issue;
use crate::plugins::{failure, Plugin, StepDescriptor, UI_NOT_AVAILABLE};

const TRACKER_NOT_AVAILABLE: &str = "Jira client is not available in the workflow context.";
const DEFAULT_LIMIT: usize = 20;

/// Issue search and lookup.
pub struct JiraPlugin;

impl Plugin for JiraPlugin {
    fn name(&self) -> &str {
        "jira"
    }

    fn description(&self) -> &str {
        "Jira issue search and lookup"
    }

    fn is_available(&self, settings: &Settings, _secrets: &SecretStore) -> bool {
        settings.plugin_str("jira", "base_url").is_some()
    }

    fn steps(&self) -> Vec<StepDescriptor> {
        vec![
            StepDescriptor::new("search_issues", "Search issues with JQL", || {
                step("search_issues", search_issues)
            }),
            StepDescriptor::new("select_issue", "Pick one of the found issues", || {
                step("select_issue", select_issue)
            }),
            StepDescriptor::new("get_issue", "Fetch a single issue", || {
                step("get_issue", get_issue)
            }),
        ]
    }
}

/// Run `jira_jql`, keeping at most `jira_limit` issues in `jira_issues`.
pub fn search_issues(ctx: &mut WorkflowContext) -> StepOutcome {
    let Some(tracker) = ctx.issues() else {
        return Ok(WorkflowResult::error(TRACKER_NOT_AVAILABLE));
    };
    let Some(jql) = ctx.get_str("jira_jql") else {
        return Ok(WorkflowResult::error("JQL query is required (jira_jql)"));
    };
    let limit = ctx
        .get("jira_limit")
        .and_then(serde_json::Value::as_u64)
        .map_or(DEFAULT_LIMIT, |n| n as usize);

    let issues = match tracker.search(jql, limit) {
        Ok(issues) => issues,
        Err(e) => return Ok(failure("Failed to search issues", e)),
    };

    if let Some(ui) = ctx.ui() {
        for issue in &issues {
            ui.body(&issue.choice_label());
        }
    }

    Ok(WorkflowResult::success(format!("Found {} issue(s)", issues.len()))
        .with_metadata("jira_issues", serde_json::to_value(&issues)?))
}

/// Let the user pick one of `jira_issues`.
///
/// Outputs `jira_issue_key` and `selected_issue`.
pub fn select_issue(ctx: &mut WorkflowContext) -> StepOutcome {
    let issues: Vec<Issue> = ctx.get_as("jira_issues")?.unwrap_or_default();
    if issues.is_empty() {
        return Ok(WorkflowResult::error("No issues found. Run a search first."));
    }

    let Some(ui) = ctx.ui() else {
        return Ok(WorkflowResult::error(UI_NOT_AVAILABLE));
    };

    let labels: Vec<String> = issues.iter().map(Issue::choice_label).collect();
    let Some(index) = ui.ask_choice("Select an issue:", &labels)? else {
        return Ok(WorkflowResult::error("No issue selected"));
    };
    let Some(issue) = issues.into_iter().nth(index) else {
        return Ok(WorkflowResult::error(format!("Invalid selection: {}", index + 1)));
    };

    Ok(WorkflowResult::success(format!("Selected {}", issue.key))
        .with_metadata("jira_issue_key", issue.key.clone())
        .with_metadata("selected_issue", serde_json::to_value(&issue)?))
}

/// Fetch `jira_issue_key` into `jira_issue`.
pub fn get_issue(ctx: &mut WorkflowContext) -> StepOutcome {
    let Some(tracker) = ctx.issues() else {
        return Ok(WorkflowResult::error(TRACKER_NOT_AVAILABLE));
    };
    let Some(key) = ctx.get_str("jira_issue_key") else {
        return Ok(WorkflowResult::error("Issue key is required (jira_issue_key)"));
    };

    match tracker.get_issue(key) {
        Ok(issue) => Ok(WorkflowResult::success(format!("{}: {}", issue.key, issue.summary))
            .with_metadata("jira_issue", serde_json::to_value(&issue)?)),
        Err(e) => Ok(failure(&format!("Failed to get issue {key}"), e)),
    }
}
