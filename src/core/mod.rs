//! Core types for Titan: layered settings, secret lookup and project
//! initialisation.

mod config;
mod init;
mod secrets;

pub use config::{
    find_project_config, global_config_path, AiConfig, AiProviderConfig, ConfigError, CoreConfig,
    PluginConfig, ProjectConfig, Settings, WorkflowsConfig, CONFIG_FILE, TITAN_DIR,
};
pub use init::{initialize_project, PROJECT_TYPES};
pub use secrets::{SecretStore, SecretValue, SecretsError, SECRETS_FILE};
