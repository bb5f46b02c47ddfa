//! Jira issue tracker integration (REST API v2).

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::{SecretStore, Settings};

/// Secret holding the Jira API token.
pub const JIRA_TOKEN_SECRET: &str = "jira_api_token";

/// Errors from the issue tracker.
#[derive(Debug, thiserror::Error)]
pub enum IssueTrackerError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Jira API error: {message} (status: {status})")]
    Api { status: u16, message: String },

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Issue not found: {0}")]
    NotFound(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Jira is not configured: {0}")]
    NotConfigured(String),
}

/// Result type for issue tracker operations.
pub type IssueTrackerResult<T> = Result<T, IssueTrackerError>;

/// A tracker issue, flattened from the API shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub key: String,
    pub summary: String,
    pub status: String,
    pub issue_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Browser URL of the issue
    pub url: String,
}

impl Issue {
    /// One-line label used in selection prompts.
    pub fn choice_label(&self) -> String {
        let summary: String = self.summary.chars().take(60).collect();
        let assignee = self.assignee.as_deref().unwrap_or("Unassigned");
        format!("{} [{}] {} ({} | {})", self.key, self.status, summary, assignee, self.issue_type)
    }
}

/// Issue lookup used by workflow steps.
pub trait IssueTracker: Send + Sync {
    fn get_issue(&self, key: &str) -> IssueTrackerResult<Issue>;

    fn search(&self, jql: &str, limit: usize) -> IssueTrackerResult<Vec<Issue>>;
}

const ISSUE_FIELDS: &[&str] = &["summary", "status", "issuetype", "assignee", "priority", "description"];

/// Jira REST v2 client.
///
/// Uses basic auth (`email` + API token) for Jira Cloud, or a bearer
/// personal access token when no email is configured.
pub struct JiraClient {
    base_url: String,
    email: Option<String>,
    token: String,
    client: reqwest::blocking::Client,
}

impl JiraClient {
    pub fn new(
        base_url: impl Into<String>,
        email: Option<String>,
        token: impl Into<String>,
    ) -> IssueTrackerResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(format!("titan-cli/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            email,
            token: token.into(),
            client,
        })
    }

    fn authorize(
        &self,
        request: reqwest::blocking::RequestBuilder,
    ) -> reqwest::blocking::RequestBuilder {
        let request = request.header("Accept", "application/json");
        match &self.email {
            Some(email) => request.basic_auth(email, Some(&self.token)),
            None => request.bearer_auth(&self.token),
        }
    }

    fn handle_response<T: serde::de::DeserializeOwned>(
        response: reqwest::blocking::Response,
        subject: &str,
    ) -> IssueTrackerResult<T> {
        let status = response.status();

        if status.is_success() {
            return response.json().map_err(|e| IssueTrackerError::InvalidResponse(e.to_string()));
        }

        let body = response.text().unwrap_or_else(|_| "Unknown error".to_string());
        let message = serde_json::from_str::<JiraErrorBody>(&body)
            .ok()
            .and_then(|e| (!e.error_messages.is_empty()).then(|| e.error_messages.join("; ")))
            .unwrap_or(body);

        match status.as_u16() {
            401 | 403 => Err(IssueTrackerError::Auth(message)),
            404 => Err(IssueTrackerError::NotFound(subject.to_string())),
            code => Err(IssueTrackerError::Api { status: code, message }),
        }
    }

    fn to_issue(&self, raw: RawIssue) -> Issue {
        Issue {
            url: format!("{}/browse/{}", self.base_url, raw.key),
            key: raw.key,
            summary: raw.fields.summary,
            status: raw.fields.status.map(|s| s.name).unwrap_or_default(),
            issue_type: raw.fields.issuetype.map(|t| t.name).unwrap_or_default(),
            assignee: raw.fields.assignee.map(|a| a.display_name),
            priority: raw.fields.priority.map(|p| p.name),
            description: raw.fields.description,
        }
    }
}

impl IssueTracker for JiraClient {
    fn get_issue(&self, key: &str) -> IssueTrackerResult<Issue> {
        let url = format!(
            "{}/rest/api/2/issue/{}?fields={}",
            self.base_url,
            urlencoding::encode(key),
            ISSUE_FIELDS.join(",")
        );

        let response = self.authorize(self.client.get(url)).send()?;
        let raw: RawIssue = Self::handle_response(response, key)?;
        Ok(self.to_issue(raw))
    }

    fn search(&self, jql: &str, limit: usize) -> IssueTrackerResult<Vec<Issue>> {
        tracing::debug!(jql, limit, "Searching Jira");

        let body = SearchRequest { jql, max_results: limit, fields: ISSUE_FIELDS };
        let response = self
            .authorize(self.client.post(format!("{}/rest/api/2/search", self.base_url)))
            .json(&body)
            .send()?;

        let result: SearchResponse = Self::handle_response(response, jql)?;
        Ok(result.issues.into_iter().map(|raw| self.to_issue(raw)).collect())
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchRequest<'a> {
    jql: &'a str,
    max_results: usize,
    fields: &'a [&'a str],
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    issues: Vec<RawIssue>,
}

#[derive(Debug, Deserialize)]
struct RawIssue {
    key: String,
    fields: RawFields,
}

#[derive(Debug, Deserialize)]
struct RawFields {
    #[serde(default)]
    summary: String,
    status: Option<Named>,
    issuetype: Option<Named>,
    assignee: Option<RawUser>,
    priority: Option<Named>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Named {
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawUser {
    display_name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JiraErrorBody {
    #[serde(default)]
    error_messages: Vec<String>,
}

/// Build a Jira client from `[plugins.jira.config]` and secrets.
pub fn jira_from_settings(
    settings: &Settings,
    secrets: &SecretStore,
) -> IssueTrackerResult<Box<dyn IssueTracker>> {
    let base_url = settings
        .plugin_str("jira", "base_url")
        .ok_or_else(|| IssueTrackerError::NotConfigured("missing base_url".to_string()))?;
    let token = secrets.get(JIRA_TOKEN_SECRET).ok_or_else(|| {
        IssueTrackerError::NotConfigured(format!("missing secret '{JIRA_TOKEN_SECRET}'"))
    })?;
    let email = settings.plugin_str("jira", "email");

    Ok(Box::new(JiraClient::new(base_url, email, token.expose())?))
}
