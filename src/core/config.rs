//! Configuration management for Titan.
//!
//! Settings come from two TOML files:
//! 1. `~/.titan/config.toml` (global)
//! 2. `.titan/config.toml` in the project, searched upward from the start
//!    directory
//!
//! Project keys replace global keys, except `[plugins]` which is merged per
//! plugin name.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Directory holding Titan files, both in `$HOME` and in a project.
pub const TITAN_DIR: &str = ".titan";

/// Configuration file name inside [`TITAN_DIR`].
pub const CONFIG_FILE: &str = "config.toml";

/// Errors raised while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid TOML in {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(#[source] toml::de::Error),

    #[error("Could not determine the current directory: {0}")]
    CurrentDir(#[source] std::io::Error),
}

/// Merged Titan settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Project identity
    pub project: ProjectConfig,

    /// Core settings
    pub core: CoreConfig,

    /// AI providers
    pub ai: AiConfig,

    /// Per-plugin settings, keyed by plugin name
    pub plugins: BTreeMap<String, PluginConfig>,

    /// Workflow discovery
    pub workflows: WorkflowsConfig,

    /// Where the settings were read from
    #[serde(skip)]
    sources: ConfigSources,
}

#[derive(Debug, Clone, Default)]
struct ConfigSources {
    global: Option<PathBuf>,
    project: Option<PathBuf>,
    start_dir: Option<PathBuf>,
}

/// `[project]` table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Display name of the project
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Project kind (e.g. "fullstack", "backend")
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

/// `[core]` table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// Project root override; `~` is expanded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_root: Option<String>,
}

/// `[ai]` table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    /// Id of the provider used by default
    pub default: String,

    /// Configured providers, keyed by id
    pub providers: BTreeMap<String, AiProviderConfig>,
}

impl AiConfig {
    /// The provider referenced by `default`, if it exists.
    pub fn default_provider(&self) -> Option<(&str, &AiProviderConfig)> {
        self.providers.get_key_value(&self.default).map(|(id, cfg)| (id.as_str(), cfg))
    }
}

/// `[ai.providers.<id>]` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiProviderConfig {
    /// Human readable name
    pub name: String,

    /// "individual" or "corporate"
    #[serde(rename = "type", default = "default_provider_kind")]
    pub kind: String,

    /// Backend: "anthropic", "openai", "ollama", ...
    pub provider: String,

    /// Model override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Endpoint override (corporate gateways, local servers)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

impl AiProviderConfig {
    pub fn new(name: impl Into<String>, provider: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: default_provider_kind(),
            provider: provider.into(),
            model: None,
            base_url: None,
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
        }
    }

    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }
}

fn default_provider_kind() -> String {
    "individual".to_string()
}

const fn default_max_tokens() -> u32 {
    4096
}

const fn default_temperature() -> f32 {
    0.7
}

/// `[plugins.<name>]` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Plugin-specific settings
    #[serde(default, skip_serializing_if = "toml::Table::is_empty")]
    pub config: toml::Table,
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self { enabled: true, config: toml::Table::new() }
    }
}

const fn default_enabled() -> bool {
    true
}

/// `[workflows]` table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowsConfig {
    /// Extra directory scanned for workflow files
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,
}

impl Settings {
    /// Load settings for the current directory.
    pub fn load() -> Result<Self, ConfigError> {
        let cwd = std::env::current_dir().map_err(ConfigError::CurrentDir)?;
        Self::load_from(&cwd)
    }

    /// Load settings for a project containing `start`.
    pub fn load_from(start: &Path) -> Result<Self, ConfigError> {
        Self::load_with_global(start, global_config_path())
    }

    fn load_with_global(start: &Path, global: Option<PathBuf>) -> Result<Self, ConfigError> {
        let global = global.filter(|p| p.is_file());
        let project = find_project_config(start, global.as_deref());
        let mut settings = Self::from_files(global.as_deref(), project.as_deref())?;
        settings.sources.start_dir = Some(start.to_path_buf());
        Ok(settings)
    }

    /// Load and merge explicit files. Missing paths are skipped.
    pub fn from_files(global: Option<&Path>, project: Option<&Path>) -> Result<Self, ConfigError> {
        let global_table = global.map(read_table).transpose()?.unwrap_or_default();
        let project_table = project.map(read_table).transpose()?.unwrap_or_default();

        let merged = merge_tables(global_table, project_table);
        let mut settings: Self =
            toml::Value::Table(merged).try_into().map_err(ConfigError::Invalid)?;

        settings.sources = ConfigSources {
            global: global.map(Path::to_path_buf),
            project: project.map(Path::to_path_buf),
            start_dir: None,
        };

        tracing::debug!(
            global = ?settings.sources.global,
            project = ?settings.sources.project,
            "Loaded settings"
        );

        Ok(settings)
    }

    /// Global config file that was read, if any.
    pub fn global_path(&self) -> Option<&Path> {
        self.sources.global.as_deref()
    }

    /// Project config file that was read, if any.
    pub fn project_path(&self) -> Option<&Path> {
        self.sources.project.as_deref()
    }

    /// Root directory of the project.
    ///
    /// `[core] project_root` wins, then the directory holding `.titan/`,
    /// then the directory settings were loaded from.
    pub fn project_dir(&self) -> PathBuf {
        if let Some(root) = &self.core.project_root {
            return PathBuf::from(shellexpand::tilde(root).into_owned());
        }

        if let Some(project) = &self.sources.project {
            if let Some(root) = project.parent().and_then(Path::parent) {
                return root.to_path_buf();
            }
        }

        self.sources.start_dir.clone().unwrap_or_else(|| PathBuf::from("."))
    }

    /// Names of plugins explicitly configured and enabled.
    pub fn enabled_plugins(&self) -> Vec<&str> {
        self.plugins.iter().filter(|(_, cfg)| cfg.enabled).map(|(name, _)| name.as_str()).collect()
    }

    /// Whether a plugin may be used. Plugins absent from the config are
    /// enabled.
    pub fn is_plugin_enabled(&self, name: &str) -> bool {
        self.plugins.get(name).map_or(true, |cfg| cfg.enabled)
    }

    /// Plugin-specific settings table.
    pub fn plugin_config(&self, name: &str) -> Option<&toml::Table> {
        self.plugins.get(name).map(|cfg| &cfg.config)
    }

    /// A scalar plugin setting rendered as a string.
    pub fn plugin_str(&self, plugin: &str, key: &str) -> Option<String> {
        match self.plugin_config(plugin)?.get(key)? {
            toml::Value::String(s) if !s.is_empty() => Some(s.clone()),
            toml::Value::String(_) => None,
            toml::Value::Integer(i) => Some(i.to_string()),
            toml::Value::Boolean(b) => Some(b.to_string()),
            toml::Value::Float(f) => Some(f.to_string()),
            _ => None,
        }
    }
}

/// `~/.titan/config.toml`.
pub fn global_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(TITAN_DIR).join(CONFIG_FILE))
}

/// Search `start` and its ancestors for `.titan/config.toml`.
///
/// The global file is never a project file, even when the home directory
/// is an ancestor of `start`.
pub fn find_project_config(start: &Path, global: Option<&Path>) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(TITAN_DIR).join(CONFIG_FILE))
        .filter(|candidate| !global.is_some_and(|g| same_file(candidate, g)))
        .find(|candidate| candidate.is_file())
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

fn read_table(path: &Path) -> Result<toml::Table, ConfigError> {
    let content = std::fs::read_to_string(path)
        .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
    toml::from_str(&content).map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })
}

fn merge_tables(mut global: toml::Table, project: toml::Table) -> toml::Table {
    for (key, value) in project {
        if key == "plugins" {
            if let (Some(toml::Value::Table(existing)), toml::Value::Table(incoming)) =
                (global.get_mut("plugins"), &value)
            {
                for (name, cfg) in incoming {
                    existing.insert(name.clone(), cfg.clone());
                }
                continue;
            }
        }
        global.insert(key, value);
    }
    global
}
