//! Shell command step.
//!
//! Runs a command line through the platform shell after substituting
//! `${key}` placeholders with values from the context data.

use std::collections::BTreeMap;
use std::process::Command as ProcessCommand;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::Value;

use super::context::WorkflowContext;
use super::result::WorkflowResult;
use super::step::{Step, StepOutcome};

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$\{(\w+)\}").unwrap());

/// A step that executes a shell command.
#[derive(Debug, Clone)]
pub struct CommandStep {
    name: String,
    template: String,
    env: BTreeMap<String, String>,
}

impl CommandStep {
    pub fn new(template: impl Into<String>) -> Self {
        Self { name: "command".to_string(), template: template.into(), env: BTreeMap::new() }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set an environment variable for the child process.
    #[must_use]
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn template(&self) -> &str {
        &self.template
    }
}

impl Step for CommandStep {
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&self, ctx: &mut WorkflowContext) -> StepOutcome {
        if self.template.trim().is_empty() {
            return Ok(WorkflowResult::error("Command step is missing the 'command' attribute."));
        }

        let command = resolve_placeholders(&self.template, ctx);
        if let Some(ui) = ctx.ui() {
            ui.info(&format!("Executing command: {command}"));
        }

        let (shell, shell_arg) = get_shell();
        let mut process = ProcessCommand::new(shell);
        process.arg(shell_arg).arg(&command);
        if let Some(cwd) = ctx.get_str("cwd") {
            process.current_dir(cwd);
        }
        for (key, value) in &self.env {
            process.env(key, resolve_placeholders(value, ctx));
        }

        let output = match process.output() {
            Ok(output) => output,
            Err(e) => {
                let program = command.split_whitespace().next().unwrap_or(&command).to_string();
                return Ok(WorkflowResult::error_with_cause(
                    format!("Could not start command '{program}': {e}"),
                    e,
                ));
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        if !stdout.trim().is_empty() {
            if let Some(ui) = ctx.ui() {
                ui.body(stdout.trim_end());
            }
        }

        if !output.status.success() {
            let code = output.status.code().map_or_else(|| "signal".to_string(), |c| c.to_string());
            let mut message = format!("Command failed with exit code {code}");
            if !stderr.trim().is_empty() {
                message.push('\n');
                message.push_str(stderr.trim_end());
            }
            return Ok(WorkflowResult::error(message));
        }

        Ok(WorkflowResult::success(format!("Command '{command}' executed successfully."))
            .with_metadata("command_output", stdout))
    }
}

/// Substitute `${key}` with the context value for `key`.
///
/// Strings are inserted verbatim, other values as JSON. Unknown keys are
/// left untouched.
pub fn resolve_placeholders(text: &str, ctx: &WorkflowContext) -> String {
    PLACEHOLDER
        .replace_all(text, |caps: &Captures<'_>| match ctx.get(&caps[1]) {
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => caps[0].to_string(),
        })
        .into_owned()
}

fn get_shell() -> (&'static str, &'static str) {
    if cfg!(target_os = "windows") {
        ("cmd", "/C")
    } else {
        ("sh", "-c")
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::core::{SecretStore, Settings};

    fn context() -> WorkflowContext {
        WorkflowContext::new(Arc::new(Settings::default()), Arc::new(SecretStore::isolated()))
    }

    #[test]
    fn test_resolve_placeholders() {
        let mut ctx = context();
        ctx.set("branch", "feature/login");
        ctx.set("count", 3);

        assert_eq!(
            resolve_placeholders("git push origin ${branch} # ${count} ${unknown}", &ctx),
            "git push origin feature/login # 3 ${unknown}"
        );
    }

    #[test]
    fn test_empty_command_is_error() {
        let result = CommandStep::new("  ").run(&mut context()).unwrap();
        assert!(result.is_error());
    }

    #[cfg(unix)]
    #[test]
    fn test_success_captures_output() {
        let mut ctx = context();
        ctx.set("greeting", "hello");

        let result = CommandStep::new("echo ${greeting}").run(&mut ctx).unwrap();
        assert!(result.is_success());
        assert_eq!(result.metadata()["command_output"], Value::from("hello\n"));
    }

    #[cfg(unix)]
    #[test]
    fn test_failure_reports_exit_code_and_stderr() {
        let result = CommandStep::new("echo oops >&2; exit 3").run(&mut context()).unwrap();
        assert!(result.is_error());
        assert!(result.message().contains("exit code 3"));
        assert!(result.message().contains("oops"));
    }

    #[cfg(unix)]
    #[test]
    fn test_runs_in_cwd_from_context() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = context();
        ctx.set("cwd", dir.path().to_string_lossy().to_string());

        let result = CommandStep::new("pwd").run(&mut ctx).unwrap();
        let out = result.metadata()["command_output"].as_str().unwrap().trim().to_string();
        let expected = dir.path().canonicalize().unwrap();
        assert_eq!(std::path::Path::new(&out).canonicalize().unwrap(), expected);
    }

    #[cfg(unix)]
    #[test]
    fn test_env_is_passed() {
        let mut ctx = context();
        ctx.set("who", "titan");
        let step = CommandStep::new("echo $GREETING").with_env("GREETING", "hi ${who}");

        let result = step.run(&mut ctx).unwrap();
        assert_eq!(result.metadata()["command_output"], Value::from("hi titan\n"));
    }
}
