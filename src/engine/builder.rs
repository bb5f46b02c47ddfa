//! Fluent assembly of a [`WorkflowContext`].
//!
//! Every collaborator can be injected (`with_*_client`, `with_ui_renderer`)
//! or constructed from settings and secrets (`with_*`). Construction that
//! fails leaves the collaborator absent; steps notice when they need it.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use super::context::WorkflowContext;
use crate::ai::{self, AiClient};
use crate::core::{SecretStore, Settings};
use crate::git::{self, GitClient};
use crate::integrations::{self, GitHubClient, IssueTracker};
use crate::ui::{ConsoleUi, Ui};

/// Builder for [`WorkflowContext`].
///
/// ```no_run
/// use titan::core::{SecretStore, Settings};
/// use titan::engine::WorkflowContextBuilder;
///
/// let ctx = WorkflowContextBuilder::new(Settings::default(), SecretStore::isolated())
///     .with_ui()
///     .with_git()
///     .with_ai()
///     .build();
/// ```
pub struct WorkflowContextBuilder {
    settings: Arc<Settings>,
    secrets: Arc<SecretStore>,
    ui: Option<Arc<dyn Ui>>,
    ai: Option<Arc<dyn AiClient>>,
    git: Option<Arc<dyn GitClient>>,
    github: Option<Arc<dyn GitHubClient>>,
    issues: Option<Arc<dyn IssueTracker>>,
    data: HashMap<String, Value>,
}

impl WorkflowContextBuilder {
    /// Start from the two mandatory collaborators.
    pub fn new(settings: impl Into<Arc<Settings>>, secrets: impl Into<Arc<SecretStore>>) -> Self {
        Self {
            settings: settings.into(),
            secrets: secrets.into(),
            ui: None,
            ai: None,
            git: None,
            github: None,
            issues: None,
            data: HashMap::new(),
        }
    }

    /// Attach the console renderer.
    pub fn with_ui(mut self) -> Self {
        self.ui = Some(Arc::new(ConsoleUi::new()));
        self
    }

    /// Attach a specific UI renderer.
    pub fn with_ui_renderer(mut self, ui: Arc<dyn Ui>) -> Self {
        self.ui = Some(ui);
        self
    }

    /// Attach the AI client configured in settings, if there is one.
    pub fn with_ai(mut self) -> Self {
        self.ai = match ai::client_from_settings(&self.settings, &self.secrets) {
            Ok(client) => Some(Arc::from(client)),
            Err(e) => {
                tracing::debug!(error = %e, "AI client not available");
                None
            }
        };
        self
    }

    /// Attach a specific AI client.
    pub fn with_ai_client(mut self, client: Arc<dyn AiClient>) -> Self {
        self.ai = Some(client);
        self
    }

    /// Attach the repository found from the project directory.
    pub fn with_git(mut self) -> Self {
        self.git = match git::open_repository(&self.settings) {
            Ok(client) => Some(Arc::from(client)),
            Err(e) => {
                tracing::debug!(error = %e, "Git client not available");
                None
            }
        };
        self
    }

    /// Attach a specific version-control client.
    pub fn with_git_client(mut self, client: Arc<dyn GitClient>) -> Self {
        self.git = Some(client);
        self
    }

    /// Attach a GitHub client.
    ///
    /// When the repository is not configured explicitly it is derived from
    /// the `origin` remote of the git client, so call `with_git` first.
    pub fn with_github(mut self) -> Self {
        let origin = self.git.as_ref().and_then(|g| g.remote_url("origin"));
        self.github =
            match integrations::github_from_settings(&self.settings, &self.secrets, origin) {
                Ok(client) => Some(Arc::from(client)),
                Err(e) => {
                    tracing::debug!(error = %e, "GitHub client not available");
                    None
                }
            };
        self
    }

    /// Attach a specific GitHub client.
    pub fn with_github_client(mut self, client: Arc<dyn GitHubClient>) -> Self {
        self.github = Some(client);
        self
    }

    /// Attach the Jira client configured in settings.
    pub fn with_jira(mut self) -> Self {
        self.issues = match integrations::jira_from_settings(&self.settings, &self.secrets) {
            Ok(client) => Some(Arc::from(client)),
            Err(e) => {
                tracing::debug!(error = %e, "Issue tracker not available");
                None
            }
        };
        self
    }

    /// Attach a specific issue tracker.
    pub fn with_issue_tracker(mut self, tracker: Arc<dyn IssueTracker>) -> Self {
        self.issues = Some(tracker);
        self
    }

    /// Seed a value into the context data store.
    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// Produce the context. The builder is consumed.
    pub fn build(self) -> WorkflowContext {
        let mut ctx = WorkflowContext::new(self.settings, self.secrets);
        ctx.ui = self.ui;
        ctx.ai = self.ai;
        ctx.git = self.git;
        ctx.github = self.github;
        ctx.issues = self.issues;
        for (key, value) in self.data {
            ctx.set(key, value);
        }
        ctx
    }
}
