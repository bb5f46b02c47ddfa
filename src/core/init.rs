//! Interactive `.titan/config.toml` creation.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde::Serialize;

use super::config::{PluginConfig, ProjectConfig, CONFIG_FILE, TITAN_DIR};
use crate::ui::Ui;

/// Project types offered by `titan init`. The last one asks for a custom
/// value.
pub const PROJECT_TYPES: &[&str] = &["frontend", "backend", "fullstack", "library", "generic", "other"];

#[derive(Debug, Serialize)]
struct InitialConfig {
    project: ProjectConfig,
    plugins: BTreeMap<String, PluginConfig>,
}

/// Ask for the project name and type, then write `.titan/config.toml` in
/// `project_dir` listing `plugins` as disabled.
///
/// Returns the written path, or `None` when the user cancelled. An existing
/// file is only replaced with `overwrite`.
pub fn initialize_project(
    project_dir: &Path,
    plugins: &[&str],
    ui: &dyn Ui,
    overwrite: bool,
) -> anyhow::Result<Option<PathBuf>> {
    let config_path = project_dir.join(TITAN_DIR).join(CONFIG_FILE);
    if config_path.exists() && !overwrite {
        anyhow::bail!(
            "{} already exists (use --force to replace it)",
            config_path.display()
        );
    }

    let dir_name = project_dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "project".to_string());

    ui.title(&format!("Initialize project {dir_name}"));
    ui.line();

    let name = ui
        .ask_text(&format!("Project name [{dir_name}]"))?
        .map(|n| n.trim().to_string())
        .unwrap_or(dir_name);

    let choices: Vec<String> = PROJECT_TYPES.iter().map(|t| (*t).to_string()).collect();
    let Some(choice) = ui.ask_choice("Select project type", &choices)? else {
        ui.warning("Project initialization cancelled");
        return Ok(None);
    };
    let kind = if PROJECT_TYPES[choice] == "other" {
        match ui.ask_text("Enter custom project type")? {
            Some(kind) => kind.trim().to_string(),
            None => {
                ui.warning("Project initialization cancelled");
                return Ok(None);
            }
        }
    } else {
        PROJECT_TYPES[choice].to_string()
    };

    let config = InitialConfig {
        project: ProjectConfig { name: Some(name.clone()), kind: Some(kind) },
        plugins: plugins
            .iter()
            .map(|p| ((*p).to_string(), PluginConfig { enabled: false, ..PluginConfig::default() }))
            .collect(),
    };

    let dir = project_dir.join(TITAN_DIR);
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Could not create {}", dir.display()))?;
    std::fs::write(&config_path, toml::to_string_pretty(&config)?)
        .with_context(|| format!("Could not write {}", config_path.display()))?;

    tracing::info!(path = %config_path.display(), "Initialized project");
    ui.success(&format!("Project '{name}' initialized: {}", config_path.display()));
    Ok(Some(config_path))
}
