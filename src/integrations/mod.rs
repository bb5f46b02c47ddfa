//! External integrations module.
//!
//! Provides the GitHub pull request client and the Jira issue tracker.

pub mod github;
pub mod jira;

pub use github::{
    github_from_settings, parse_remote_url, GitHubApi, GitHubClient, GitHubError, GitHubResult,
    NewPullRequest, PullRequest, GITHUB_TOKEN_SECRET,
};
pub use jira::{
    jira_from_settings, Issue, IssueTracker, IssueTrackerError, IssueTrackerResult, JiraClient,
    JIRA_TOKEN_SECRET,
};
