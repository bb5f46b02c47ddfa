//! Workflow file schema.
//!
//! ```yaml
//! name: release-notes
//! description: Summarise the branch and open a PR
//! params:
//!   use_ai: true
//! steps:
//!   - plugin: git
//!     step: status
//!   - id: notes
//!     name: Render notes
//!     command: ./scripts/notes.sh ${current_branch}
//!     optional: true
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::WorkflowLoadError;

/// A workflow as written in YAML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    /// Name used on the command line
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Stop on the first error (default true)
    #[serde(default = "default_halt_on_error")]
    pub halt_on_error: bool,

    /// Values seeded into the context before the first step
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub params: Map<String, Value>,

    pub steps: Vec<StepDefinition>,
}

fn default_halt_on_error() -> bool {
    true
}

/// One entry of `steps`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StepDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugin: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<String>,

    /// Shell command with `${key}` placeholders
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,

    /// Errors become skips
    #[serde(default)]
    pub optional: bool,

    /// Values written to the context right before this step runs
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub params: Map<String, Value>,
}

/// What a step entry refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepTarget<'a> {
    Plugin { plugin: &'a str, step: &'a str },
    Command(&'a str),
}

impl StepDefinition {
    /// Plugin step entry.
    pub fn plugin(plugin: impl Into<String>, step: impl Into<String>) -> Self {
        Self { plugin: Some(plugin.into()), step: Some(step.into()), ..Self::default() }
    }

    /// Shell command entry.
    pub fn command(command: impl Into<String>) -> Self {
        Self { command: Some(command.into()), ..Self::default() }
    }

    /// Label used in messages: `id`, then `name`, then the target.
    pub fn label(&self) -> String {
        if let Some(label) = self.id.as_ref().or(self.name.as_ref()) {
            return label.clone();
        }
        match (&self.plugin, &self.step, &self.command) {
            (Some(plugin), Some(step), _) => format!("{plugin}.{step}"),
            (_, _, Some(command)) => command.clone(),
            _ => "<unnamed>".to_string(),
        }
    }

    /// Exactly one of `plugin`+`step` or `command`.
    pub fn target(&self, index: usize) -> Result<StepTarget<'_>, WorkflowLoadError> {
        let invalid = |reason: &str| WorkflowLoadError::InvalidStep {
            index: index + 1,
            label: self.label(),
            reason: reason.to_string(),
        };

        match (self.plugin.as_deref(), self.step.as_deref(), self.command.as_deref()) {
            (Some(plugin), Some(step), None) => Ok(StepTarget::Plugin { plugin, step }),
            (None, None, Some(command)) if !command.trim().is_empty() => {
                Ok(StepTarget::Command(command))
            }
            (None, None, Some(_)) => Err(invalid("command is empty")),
            (Some(_), Some(_), Some(_)) => Err(invalid("has both plugin/step and command")),
            (Some(_), None, _) => Err(invalid("plugin without step")),
            (None, Some(_), _) => Err(invalid("step without plugin")),
            (None, None, None) => Err(invalid("needs plugin+step or command")),
        }
    }
}

impl WorkflowDefinition {
    /// Parse and validate a YAML document.
    pub fn from_yaml(content: &str) -> Result<Self, WorkflowLoadError> {
        let definition: Self = serde_yaml::from_str(content)?;
        definition.validate()?;
        Ok(definition)
    }

    /// Check the name and every step entry.
    pub fn validate(&self) -> Result<(), WorkflowLoadError> {
        if self.name.trim().is_empty() {
            return Err(WorkflowLoadError::Invalid("workflow name cannot be empty".to_string()));
        }
        if self.steps.is_empty() {
            return Err(WorkflowLoadError::Invalid(format!(
                "workflow '{}' has no steps",
                self.name
            )));
        }
        for (index, step) in self.steps.iter().enumerate() {
            step.target(index)?;
        }
        Ok(())
    }
}
