//! Workflow context.
//!
//! One context is created per workflow run. It carries the configuration,
//! the secrets, whichever collaborators were attached by the builder, and
//! the flat key/value store steps use to talk to each other.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use super::result::Metadata;
use crate::ai::AiClient;
use crate::core::{SecretStore, Settings};
use crate::git::GitClient;
use crate::integrations::{GitHubClient, IssueTracker};
use crate::ui::Ui;

/// Context shared by every step of one workflow run.
pub struct WorkflowContext {
    settings: Arc<Settings>,
    secrets: Arc<SecretStore>,

    pub(crate) ui: Option<Arc<dyn Ui>>,
    pub(crate) ai: Option<Arc<dyn AiClient>>,
    pub(crate) git: Option<Arc<dyn GitClient>>,
    pub(crate) github: Option<Arc<dyn GitHubClient>>,
    pub(crate) issues: Option<Arc<dyn IssueTracker>>,

    data: HashMap<String, Value>,

    current_step: Option<usize>,
    total_steps: usize,
}

impl WorkflowContext {
    /// Create a context with no collaborators attached.
    ///
    /// Prefer [`WorkflowContextBuilder`](super::WorkflowContextBuilder).
    pub fn new(settings: Arc<Settings>, secrets: Arc<SecretStore>) -> Self {
        Self {
            settings,
            secrets,
            ui: None,
            ai: None,
            git: None,
            github: None,
            issues: None,
            data: HashMap::new(),
            current_step: None,
            total_steps: 0,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn secrets(&self) -> &SecretStore {
        &self.secrets
    }

    /// UI renderer, if attached.
    pub fn ui(&self) -> Option<&dyn Ui> {
        self.ui.as_deref()
    }

    /// AI client, if attached and configured.
    pub fn ai(&self) -> Option<&dyn AiClient> {
        self.ai.as_deref()
    }

    /// Version-control client, if attached.
    pub fn git(&self) -> Option<&dyn GitClient> {
        self.git.as_deref()
    }

    /// GitHub client, if attached.
    pub fn github(&self) -> Option<&dyn GitHubClient> {
        self.github.as_deref()
    }

    /// Issue tracker client, if attached.
    pub fn issues(&self) -> Option<&dyn IssueTracker> {
        self.issues.as_deref()
    }

    /// Shared handle to the UI, usable while the context is mutably borrowed.
    pub(crate) fn ui_handle(&self) -> Option<Arc<dyn Ui>> {
        self.ui.clone()
    }

    /// Insert or overwrite a value. Last write wins.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.data.insert(key.into(), value.into());
    }

    /// Stored value for `key`, if any.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// Stored value for `key`, or `default` when missing.
    pub fn get_or(&self, key: &str, default: Value) -> Value {
        self.data.get(key).cloned().unwrap_or(default)
    }

    pub fn has(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    /// String value for `key`. Empty strings count as missing.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
    }

    /// Boolean value for `key`.
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.data.get(key).and_then(Value::as_bool)
    }

    /// Deserialize the value for `key` into a typed value.
    ///
    /// Returns `Ok(None)` when the key is missing and an error when the
    /// stored value has the wrong shape.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> anyhow::Result<Option<T>> {
        match self.data.get(key) {
            Some(value) => serde_json::from_value(value.clone())
                .map(Some)
                .map_err(|e| anyhow::anyhow!("context value '{key}' has an unexpected shape: {e}")),
            None => Ok(None),
        }
    }

    /// Read-only view of the whole data store.
    pub fn data(&self) -> &HashMap<String, Value> {
        &self.data
    }

    /// 1-based index of the step currently running.
    pub fn current_step(&self) -> Option<usize> {
        self.current_step
    }

    /// Number of steps in the workflow currently running.
    pub fn total_steps(&self) -> usize {
        self.total_steps
    }

    pub(crate) fn merge_metadata(&mut self, metadata: &Metadata) {
        for (key, value) in metadata {
            self.data.insert(key.clone(), value.clone());
        }
    }

    pub(crate) fn set_progress(&mut self, current: Option<usize>, total: usize) {
        self.current_step = current;
        self.total_steps = total;
    }
}

impl fmt::Debug for WorkflowContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkflowContext")
            .field("ui", &self.ui.is_some())
            .field("ai", &self.ai.as_ref().map(|ai| ai.provider().to_string()))
            .field("git", &self.git.is_some())
            .field("github", &self.github.is_some())
            .field("issues", &self.issues.is_some())
            .field("data", &self.data.keys().collect::<Vec<_>>())
            .finish()
    }
}
