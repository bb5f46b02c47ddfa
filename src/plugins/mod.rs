//! Plugin registry.
//!
//! A plugin is a named bundle of step factories. Plugins are registered
//! explicitly; [`PluginRegistry::builtin`] knows the ones shipped with Titan:
//!
//! - `git` - status, diff, commit message prompt, commit, push
//! - `github` - pull request details and creation
//! - `jira` - issue search, selection and lookup
//! - `agents` - AI analysis steps
//!
//! ```toml
//! [plugins.jira]
//! enabled = true
//!
//! [plugins.jira.config]
//! base_url = "https://acme.atlassian.net"
//! email = "dev@acme.io"
//! ```

mod agents;
mod git;
mod github;
mod jira;

pub use agents::AgentsPlugin;
pub use git::GitPlugin;
pub use github::GitHubPlugin;
pub use jira::JiraPlugin;

use std::collections::BTreeMap;

use crate::core::{SecretStore, Settings};
use crate::engine::{Step, WorkflowResult};

/// Errors from plugin and step lookup.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("Unknown plugin: {0}")]
    UnknownPlugin(String),

    #[error("Plugin '{plugin}' has no step '{step}'")]
    UnknownStep { plugin: String, step: String },

    #[error("Plugin '{0}' is disabled in configuration")]
    Disabled(String),

    #[error("Plugin '{0}' is already registered")]
    Duplicate(String),

    #[error("Plugin '{plugin}' depends on '{dependency}', which is not registered")]
    MissingDependency { plugin: String, dependency: String },
}

/// Factory for a step provided by a plugin.
#[derive(Debug, Clone, Copy)]
pub struct StepDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    pub factory: fn() -> Box<dyn Step>,
}

impl StepDescriptor {
    pub const fn new(
        name: &'static str,
        description: &'static str,
        factory: fn() -> Box<dyn Step>,
    ) -> Self {
        Self { name, description, factory }
    }
}

/// A named bundle of steps.
pub trait Plugin: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// Plugins that must be registered alongside this one.
    fn dependencies(&self) -> &[&str] {
        &[]
    }

    /// Whether the plugin has what it needs to work (configuration,
    /// credentials). Unavailable plugins still resolve; their steps report
    /// the missing collaborator when run.
    fn is_available(&self, _settings: &Settings, _secrets: &SecretStore) -> bool {
        true
    }

    fn steps(&self) -> Vec<StepDescriptor>;
}

/// Name → plugin map.
#[derive(Default)]
pub struct PluginRegistry {
    plugins: BTreeMap<String, Box<dyn Plugin>>,
}

impl PluginRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in plugin.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        let plugins: [Box<dyn Plugin>; 4] = [
            Box::new(GitPlugin),
            Box::new(GitHubPlugin),
            Box::new(JiraPlugin),
            Box::new(AgentsPlugin),
        ];
        for plugin in plugins {
            let name = plugin.name().to_string();
            registry.plugins.insert(name, plugin);
        }
        registry
    }

    /// Add a plugin. Names are unique.
    pub fn register(&mut self, plugin: impl Plugin + 'static) -> Result<(), RegistryError> {
        let name = plugin.name().to_string();
        if self.plugins.contains_key(&name) {
            return Err(RegistryError::Duplicate(name));
        }
        tracing::debug!(plugin = %name, "Registered plugin");
        self.plugins.insert(name, Box::new(plugin));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&dyn Plugin> {
        self.plugins.get(name).map(AsRef::as_ref)
    }

    /// Registered plugins, by name.
    pub fn list(&self) -> impl Iterator<Item = &dyn Plugin> {
        self.plugins.values().map(AsRef::as_ref)
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Create a step by plugin and step name.
    pub fn step(&self, plugin: &str, step: &str) -> Result<Box<dyn Step>, RegistryError> {
        let found = self.get(plugin).ok_or_else(|| RegistryError::UnknownPlugin(plugin.to_string()))?;
        let descriptor = found.steps().into_iter().find(|d| d.name == step).ok_or_else(|| {
            RegistryError::UnknownStep { plugin: plugin.to_string(), step: step.to_string() }
        })?;
        Ok((descriptor.factory)())
    }

    /// Every dependency that is not registered.
    pub fn check_dependencies(&self) -> Vec<RegistryError> {
        self.list()
            .flat_map(|plugin| {
                plugin
                    .dependencies()
                    .iter()
                    .filter(|dep| !self.plugins.contains_key(**dep))
                    .map(|dep| RegistryError::MissingDependency {
                        plugin: plugin.name().to_string(),
                        dependency: (*dep).to_string(),
                    })
                    .collect::<Vec<_>>()
            })
            .collect()
    }
}

impl std::fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginRegistry").field("plugins", &self.plugins.keys()).finish()
    }
}

pub(crate) const UI_NOT_AVAILABLE: &str = "UI is not available for prompting";

/// Error result for a failed collaborator call, keeping the cause.
pub(crate) fn failure<E>(what: &str, err: E) -> WorkflowResult
where
    E: std::error::Error + Send + Sync + 'static,
{
    WorkflowResult::error_with_cause(format!("{what}: {err}"), err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{step, WorkflowResult};

    struct DemoPlugin;

    impl Plugin for DemoPlugin {
        fn name(&self) -> &str {
            "demo"
        }

        fn description(&self) -> &str {
            "Demo steps"
        }

        fn dependencies(&self) -> &[&str] {
            &["missing"]
        }

        fn steps(&self) -> Vec<StepDescriptor> {
            vec![StepDescriptor::new("hello", "Say hello", || {
                step("hello", |_ctx| Ok(WorkflowResult::success("hello")))
            })]
        }
    }

    #[test]
    fn test_builtin_plugins() {
        let registry = PluginRegistry::builtin();
        let names: Vec<&str> = registry.list().map(|p| p.name()).collect();
        assert_eq!(names, vec!["agents", "git", "github", "jira"]);
        assert!(registry.check_dependencies().is_empty());
    }

    #[test]
    fn test_step_lookup() {
        let registry = PluginRegistry::builtin();
        assert_eq!(registry.step("git", "status").unwrap().name(), "status");

        assert_eq!(
            registry.step("svn", "status").err(),
            Some(RegistryError::UnknownPlugin("svn".to_string()))
        );
        assert!(matches!(
            registry.step("git", "rebase").err(),
            Some(RegistryError::UnknownStep { .. })
        ));
    }

    #[test]
    fn test_register_and_duplicates() {
        let mut registry = PluginRegistry::new();
        assert!(registry.is_empty());
        registry.register(DemoPlugin).unwrap();
        assert_eq!(registry.register(DemoPlugin), Err(RegistryError::Duplicate("demo".to_string())));
        assert_eq!(registry.step("demo", "hello").unwrap().name(), "hello");
    }

    #[test]
    fn test_missing_dependency_reported() {
        let mut registry = PluginRegistry::new();
        registry.register(DemoPlugin).unwrap();
        assert_eq!(
            registry.check_dependencies(),
            vec![RegistryError::MissingDependency {
                plugin: "demo".to_string(),
                dependency: "missing".to_string()
            }]
        );
    }

    #[test]
    fn test_github_requires_git() {
        let mut registry = PluginRegistry::new();
        registry.register(GitHubPlugin).unwrap();
        assert_eq!(registry.check_dependencies().len(), 1);
    }
}
