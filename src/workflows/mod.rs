//! Workflow definitions.
//!
//! Workflows come from two places: the built-ins compiled into Titan and
//! YAML files in `.titan/workflows/` (plus `[workflows] dir`). A file whose
//! `name` matches a built-in replaces it. Definitions are resolved against a
//! [`PluginRegistry`] into runnable [`Workflow`]s.

mod builtin;
mod schema;

pub use schema::{StepDefinition, StepTarget, WorkflowDefinition};

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::core::{Settings, TITAN_DIR};
use crate::engine::{labeled, optional, CommandStep, Step, StepOutcome, Workflow, WorkflowContext};
use crate::plugins::{PluginRegistry, RegistryError};

/// Errors from loading or resolving workflows.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowLoadError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid workflow YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("{path}: {source}")]
    File {
        path: PathBuf,
        #[source]
        source: Box<WorkflowLoadError>,
    },

    #[error("Invalid workflow: {0}")]
    Invalid(String),

    #[error("Step {index} ({label}) is invalid: {reason}")]
    InvalidStep { index: usize, label: String, reason: String },

    #[error("Workflow not found: {0}")]
    NotFound(String),

    #[error("Step {index} ({label}): {source}")]
    Resolve {
        index: usize,
        label: String,
        #[source]
        source: RegistryError,
    },
}

/// Where a definition came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowSource {
    Builtin,
    File(PathBuf),
}

impl std::fmt::Display for WorkflowSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Builtin => f.write_str("built-in"),
            Self::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// A definition and its origin.
#[derive(Debug, Clone)]
pub struct CatalogEntry {
    pub definition: WorkflowDefinition,
    pub source: WorkflowSource,
}

/// Every workflow known for a project.
#[derive(Debug, Clone, Default)]
pub struct WorkflowCatalog {
    entries: BTreeMap<String, CatalogEntry>,
    disabled_plugins: BTreeSet<String>,
    problems: Vec<String>,
}

impl WorkflowCatalog {
    /// Built-ins only.
    pub fn builtin() -> Self {
        let mut catalog = Self::default();
        for (name, yaml) in builtin::BUILTIN_WORKFLOWS {
            match WorkflowDefinition::from_yaml(yaml) {
                Ok(definition) => catalog.insert(definition, WorkflowSource::Builtin),
                Err(e) => {
                    tracing::error!(workflow = name, error = %e, "Invalid built-in workflow");
                }
            }
        }
        catalog
    }

    /// Built-ins plus the project's workflow files.
    ///
    /// Files that fail to parse are skipped and reported by
    /// [`WorkflowCatalog::problems`].
    pub fn load(settings: &Settings, project_dir: &Path) -> Self {
        let mut catalog = Self::builtin();
        catalog.disabled_plugins = settings
            .plugins
            .iter()
            .filter(|(_, plugin)| !plugin.enabled)
            .map(|(name, _)| name.clone())
            .collect();

        let mut dirs = vec![project_dir.join(TITAN_DIR).join("workflows")];
        if let Some(extra) = &settings.workflows.dir {
            let extra = PathBuf::from(shellexpand::tilde(extra).as_ref());
            dirs.push(if extra.is_absolute() { extra } else { project_dir.join(extra) });
        }

        for dir in dirs {
            for path in workflow_files(&dir) {
                match load_file(&path) {
                    Ok(definition) => {
                        tracing::debug!(path = %path.display(), name = %definition.name, "Loaded workflow");
                        catalog.insert(definition, WorkflowSource::File(path));
                    }
                    Err(e) => {
                        tracing::warn!(path = %path.display(), error = %e, "Failed to load workflow");
                        catalog.problems.push(e.to_string());
                    }
                }
            }
        }

        catalog
    }

    fn insert(&mut self, definition: WorkflowDefinition, source: WorkflowSource) {
        self.entries.insert(definition.name.clone(), CatalogEntry { definition, source });
    }

    /// Entries by name.
    pub fn list(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.entries.values()
    }

    pub fn get(&self, name: &str) -> Result<&CatalogEntry, WorkflowLoadError> {
        self.entries.get(name).ok_or_else(|| WorkflowLoadError::NotFound(name.to_string()))
    }

    /// Files that could not be loaded.
    pub fn problems(&self) -> &[String] {
        &self.problems
    }

    /// Build a runnable workflow from a definition.
    ///
    /// Every plugin step must exist in `registry` and belong to a plugin
    /// that is not disabled in settings.
    pub fn resolve(
        &self,
        definition: &WorkflowDefinition,
        registry: &PluginRegistry,
    ) -> Result<Workflow, WorkflowLoadError> {
        definition.validate()?;

        let mut steps = Vec::with_capacity(definition.steps.len());
        for (index, entry) in definition.steps.iter().enumerate() {
            let resolve_error = |source| WorkflowLoadError::Resolve {
                index: index + 1,
                label: entry.label(),
                source,
            };

            let mut step: Box<dyn Step> = match entry.target(index)? {
                StepTarget::Plugin { plugin, step } => {
                    if self.disabled_plugins.contains(plugin) {
                        return Err(resolve_error(RegistryError::Disabled(plugin.to_string())));
                    }
                    registry.step(plugin, step).map_err(resolve_error)?
                }
                StepTarget::Command(command) => {
                    let name = entry.id.clone().unwrap_or_else(|| "command".to_string());
                    Box::new(CommandStep::new(command).with_name(name))
                }
            };

            if !entry.params.is_empty() {
                step = Box::new(WithParams { params: entry.params.clone(), inner: step });
            }
            if let Some(name) = &entry.name {
                step = labeled(name.clone(), step);
            }
            if entry.optional {
                step = optional(step);
            }
            steps.push(step);
        }

        let mut workflow =
            Workflow::new(definition.name.clone(), steps).halt_on_error(definition.halt_on_error);
        if let Some(description) = &definition.description {
            workflow = workflow.with_description(description.clone());
        }
        Ok(workflow)
    }
}

impl WorkflowDefinition {
    /// Write `params` into the context.
    pub fn seed_params(&self, ctx: &mut WorkflowContext) {
        for (key, value) in &self.params {
            ctx.set(key.clone(), value.clone());
        }
    }

    /// Plugins referenced by the steps.
    pub fn plugins(&self) -> BTreeSet<&str> {
        self.steps.iter().filter_map(|s| s.plugin.as_deref()).collect()
    }
}

/// Writes step-level params into the context, then runs the step.
struct WithParams {
    params: Map<String, Value>,
    inner: Box<dyn Step>,
}

impl Step for WithParams {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn run(&self, ctx: &mut WorkflowContext) -> StepOutcome {
        for (key, value) in &self.params {
            ctx.set(key.clone(), value.clone());
        }
        self.inner.run(ctx)
    }
}

/// Parse a workflow file.
pub fn load_file(path: &Path) -> Result<WorkflowDefinition, WorkflowLoadError> {
    let content = std::fs::read_to_string(path)
        .map_err(|source| WorkflowLoadError::Io { path: path.to_path_buf(), source })?;
    WorkflowDefinition::from_yaml(&content)
        .map_err(|e| WorkflowLoadError::File { path: path.to_path_buf(), source: Box::new(e) })
}

/// `*.yaml` / `*.yml` files in `dir`, sorted by path.
fn workflow_files(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut files: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter(|path| path.extension().is_some_and(|e| e == "yaml" || e == "yml"))
        .collect();
    files.sort();
    files
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtins_resolve() {
        let catalog = WorkflowCatalog::builtin();
        let registry = PluginRegistry::builtin();

        let names: Vec<&str> = catalog.list().map(|e| e.definition.name.as_str()).collect();
        assert_eq!(names, vec!["ai-commit", "analyze", "atomic-commits", "commit", "create-pr"]);

        for entry in catalog.list() {
            assert_eq!(entry.source, WorkflowSource::Builtin);
            let workflow = catalog.resolve(&entry.definition, &registry).unwrap();
            assert_eq!(workflow.len(), entry.definition.steps.len());
        }
    }

    #[test]
    fn test_resolve_uses_display_names() {
        let catalog = WorkflowCatalog::builtin();
        let entry = catalog.get("commit").unwrap();
        let workflow = catalog.resolve(&entry.definition, &PluginRegistry::builtin()).unwrap();
        assert_eq!(
            workflow.step_names(),
            vec!["Check repository status", "Commit message", "Create commit"]
        );
        assert!(workflow.halts_on_error());
    }

    #[test]
    fn test_unknown_step() {
        let def = WorkflowDefinition {
            name: "broken".to_string(),
            description: None,
            halt_on_error: true,
            params: Map::new(),
            steps: vec![StepDefinition::plugin("git", "rebase")],
        };
        let err = WorkflowCatalog::builtin().resolve(&def, &PluginRegistry::builtin()).err().unwrap();
        assert!(matches!(
            err,
            WorkflowLoadError::Resolve { index: 1, source: RegistryError::UnknownStep { .. }, .. }
        ));
    }

    #[test]
    fn test_disabled_plugin_refused() {
        let settings: Settings = toml::from_str("[plugins.agents]\nenabled = false\n").unwrap();
        let dir = tempfile::tempdir().unwrap();
        let catalog = WorkflowCatalog::load(&settings, dir.path());
        let registry = PluginRegistry::builtin();

        let analyze = &catalog.get("analyze").unwrap().definition;
        let err = catalog.resolve(analyze, &registry).err().unwrap();
        assert!(matches!(
            err,
            WorkflowLoadError::Resolve { index: 3, source: RegistryError::Disabled(_), .. }
        ));

        let commit = &catalog.get("commit").unwrap().definition;
        assert!(catalog.resolve(commit, &registry).is_ok());
    }

    #[test]
    fn test_missing_workflow() {
        assert!(matches!(
            WorkflowCatalog::builtin().get("deploy"),
            Err(WorkflowLoadError::NotFound(_))
        ));
    }
}
