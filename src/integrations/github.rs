//! GitHub pull request integration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::{SecretStore, Settings};

const DEFAULT_API_URL: &str = "https://api.github.com";

/// Secret holding the GitHub token.
pub const GITHUB_TOKEN_SECRET: &str = "github_token";

/// Error type for GitHub operations.
#[derive(Debug, thiserror::Error)]
pub enum GitHubError {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error
    #[error("GitHub API error: {message} (status: {status})")]
    Api { status: u16, message: String },

    /// Authentication failed
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Request rejected (e.g. a pull request already exists)
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Invalid response
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("No GitHub token (set secret 'github_token' or GITHUB_TOKEN)")]
    MissingToken,

    #[error("Could not determine the GitHub repository; set owner and repo under [plugins.github.config]")]
    UnknownRepository,
}

/// Result type for GitHub operations.
pub type GitHubResult<T> = Result<T, GitHubError>;

/// Pull request to open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewPullRequest {
    pub title: String,
    pub body: String,
    /// Branch with the changes
    pub head: String,
    /// Branch to merge into
    pub base: String,
    pub draft: bool,
}

/// A pull request as returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    pub html_url: String,
    pub title: String,
    pub state: String,
    #[serde(default)]
    pub draft: bool,
}

/// Pull request operations used by workflow steps.
pub trait GitHubClient: Send + Sync {
    fn create_pull_request(&self, pr: &NewPullRequest) -> GitHubResult<PullRequest>;

    /// `(owner, repo)` this client targets.
    fn repository(&self) -> (&str, &str);
}

/// GitHub REST API client.
pub struct GitHubApi {
    /// GitHub API base URL
    base_url: String,

    /// Repository owner
    owner: String,

    /// Repository name
    repo: String,

    /// Personal access token
    token: String,

    client: reqwest::blocking::Client,
}

impl GitHubApi {
    pub fn new(
        owner: impl Into<String>,
        repo: impl Into<String>,
        token: impl Into<String>,
    ) -> GitHubResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(format!("titan-cli/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            base_url: DEFAULT_API_URL.to_string(),
            owner: owner.into(),
            repo: repo.into(),
            token: token.into(),
            client,
        })
    }

    /// Point at a GitHub Enterprise API.
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    fn repo_url(&self) -> String {
        format!("{}/repos/{}/{}", self.base_url, self.owner, self.repo)
    }

    fn handle_response<T: serde::de::DeserializeOwned>(
        response: reqwest::blocking::Response,
    ) -> GitHubResult<T> {
        let status = response.status();

        if status.is_success() {
            return response.json().map_err(|e| GitHubError::InvalidResponse(e.to_string()));
        }

        let body = response.text().unwrap_or_else(|_| "Unknown error".to_string());
        let message = serde_json::from_str::<ApiErrorBody>(&body)
            .map(|e| e.summary())
            .unwrap_or(body);

        match status.as_u16() {
            401 | 403 => Err(GitHubError::Auth(message)),
            404 => Err(GitHubError::NotFound(message)),
            422 => Err(GitHubError::Validation(message)),
            code => Err(GitHubError::Api { status: code, message }),
        }
    }
}

impl GitHubClient for GitHubApi {
    fn create_pull_request(&self, pr: &NewPullRequest) -> GitHubResult<PullRequest> {
        tracing::debug!(owner = %self.owner, repo = %self.repo, head = %pr.head, base = %pr.base, "Creating pull request");

        let response = self
            .client
            .post(format!("{}/pulls", self.repo_url()))
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28")
            .json(pr)
            .send()?;

        Self::handle_response(response)
    }

    fn repository(&self) -> (&str, &str) {
        (&self.owner, &self.repo)
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
    #[serde(default)]
    errors: Vec<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    message: Option<String>,
}

impl ApiErrorBody {
    fn summary(self) -> String {
        let details: Vec<String> = self.errors.into_iter().filter_map(|e| e.message).collect();
        if details.is_empty() {
            self.message
        } else {
            format!("{}: {}", self.message, details.join("; "))
        }
    }
}

/// Build a GitHub client from `[plugins.github.config]` and secrets.
///
/// `owner` and `repo` fall back to the given `origin` remote URL.
pub fn github_from_settings(
    settings: &Settings,
    secrets: &SecretStore,
    origin: Option<String>,
) -> GitHubResult<Box<dyn GitHubClient>> {
    let token = secrets.get(GITHUB_TOKEN_SECRET).ok_or(GitHubError::MissingToken)?;

    let configured = settings
        .plugin_str("github", "owner")
        .zip(settings.plugin_str("github", "repo"));
    let (owner, repo) = configured
        .or_else(|| origin.as_deref().and_then(parse_remote_url))
        .ok_or(GitHubError::UnknownRepository)?;

    let mut client = GitHubApi::new(owner, repo, token.expose())?;
    if let Some(url) = settings.plugin_str("github", "api_url") {
        client = client.with_base_url(url);
    }
    Ok(Box::new(client))
}

/// Extract `(owner, repo)` from a GitHub remote URL.
///
/// Accepts `https://github.com/owner/repo(.git)`,
/// `git@github.com:owner/repo(.git)` and `ssh://git@github.com/owner/repo`.
pub fn parse_remote_url(url: &str) -> Option<(String, String)> {
    let url = url.trim();
    let path = if let Some(rest) = url.strip_prefix("git@") {
        rest.split_once(':')?.1
    } else {
        let without_scheme = url.split_once("://")?.1;
        without_scheme.split_once('/')?.1
    };

    let path = path.trim_end_matches('/');
    let path = path.strip_suffix(".git").unwrap_or(path);
    let (owner, repo) = path.split_once('/')?;
    if owner.is_empty() || repo.is_empty() || repo.contains('/') {
        return None;
    }
    Some((owner.to_string(), repo.to_string()))
}
