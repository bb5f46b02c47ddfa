//! Hand the terminal over to an external AI coding CLI.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Command;

/// A CLI Titan knows how to launch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KnownCli {
    /// Executable name
    pub name: &'static str,
    pub display_name: &'static str,
    pub install_instructions: &'static str,
}

/// Launchable CLIs.
pub const KNOWN_CLIS: &[KnownCli] = &[
    KnownCli {
        name: "claude",
        display_name: "Claude Code",
        install_instructions: "Install with: npm install -g @anthropic-ai/claude-code",
    },
    KnownCli {
        name: "gemini",
        display_name: "Gemini CLI",
        install_instructions: "Install with: npm install -g @google/gemini-cli",
    },
];

/// Look up a known CLI by executable name.
pub fn known_cli(name: &str) -> Option<&'static KnownCli> {
    KNOWN_CLIS.iter().find(|cli| cli.name == name)
}

#[derive(Debug, thiserror::Error)]
pub enum LaunchError {
    #[error("Unknown CLI: {0}")]
    Unknown(String),

    #[error("{display_name} is not installed. {install_instructions}")]
    NotInstalled { display_name: String, install_instructions: String },

    #[error("Failed to start {name}: {source}")]
    Spawn {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

/// Runs one CLI with inherited stdio.
#[derive(Debug, Clone)]
pub struct CliLauncher {
    cli: KnownCli,
    search_path: Option<std::ffi::OsString>,
}

impl CliLauncher {
    /// Launcher for a known CLI, searching `$PATH`.
    pub fn new(name: &str) -> Result<Self, LaunchError> {
        let cli = *known_cli(name).ok_or_else(|| LaunchError::Unknown(name.to_string()))?;
        Ok(Self { cli, search_path: std::env::var_os("PATH") })
    }

    /// Search `path` instead of `$PATH`.
    pub fn with_search_path(mut self, path: impl Into<std::ffi::OsString>) -> Self {
        self.search_path = Some(path.into());
        self
    }

    pub fn cli(&self) -> &KnownCli {
        &self.cli
    }

    /// Full path of the executable, if installed.
    pub fn executable(&self) -> Option<PathBuf> {
        find_executable(self.cli.name, self.search_path.as_deref()?)
    }

    pub fn is_available(&self) -> bool {
        self.executable().is_some()
    }

    /// Run the CLI in `cwd`, passing `prompt` as its only argument, and wait
    /// for it. Returns the exit code (`-1` when killed by a signal).
    pub fn launch(&self, prompt: Option<&str>, cwd: &Path) -> Result<i32, LaunchError> {
        let Some(program) = self.executable() else {
            return Err(LaunchError::NotInstalled {
                display_name: self.cli.display_name.to_string(),
                install_instructions: self.cli.install_instructions.to_string(),
            });
        };

        let mut command = Command::new(&program);
        command.current_dir(cwd);
        if let Some(prompt) = prompt.filter(|p| !p.is_empty()) {
            command.arg(prompt);
        }

        tracing::debug!(program = %program.display(), "Launching external CLI");
        let status = command
            .status()
            .map_err(|source| LaunchError::Spawn { name: self.cli.name.to_string(), source })?;
        Ok(status.code().unwrap_or(-1))
    }
}

/// First executable file called `name` in the `PATH`-style list `paths`.
pub fn find_executable(name: &str, paths: &OsStr) -> Option<PathBuf> {
    std::env::split_paths(paths).map(|dir| dir.join(name)).find(|candidate| is_executable(candidate))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata().is_ok_and(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file() || path.with_extension("exe").is_file()
}
