//! CLI Integration Tests
//!
//! Tests the command-line interface end-to-end.

use assert_cmd::Command;
use assert_fs::prelude::*;
use assert_fs::TempDir;
use predicates::prelude::*;

/// Get the binary to test.
fn titan() -> Command {
    Command::cargo_bin("titan").unwrap()
}

/// Binary running inside `project` with an empty home directory.
fn titan_in(project: &TempDir, home: &TempDir) -> Command {
    let mut cmd = titan();
    cmd.current_dir(project.path())
        .env("HOME", home.path())
        .env_remove("TITAN_LOG")
        .env_remove("GITHUB_TOKEN");
    cmd
}

fn dirs() -> (TempDir, TempDir) {
    (TempDir::new().unwrap(), TempDir::new().unwrap())
}

// ============================================================================
// Help & Version Tests
// ============================================================================

#[test]
fn test_help_flag() {
    titan()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Developer workflow CLI"));
}

#[test]
fn test_version_flag() {
    titan()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_missing_subcommand_fails() {
    titan().assert().failure().stderr(predicate::str::contains("Usage:"));
}

// ============================================================================
// Workflow Command Tests
// ============================================================================

#[test]
fn test_workflow_list_shows_builtins() {
    let (project, home) = dirs();
    titan_in(&project, &home)
        .args(["workflow", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("commit - "))
        .stdout(predicate::str::contains("ai-commit - "))
        .stdout(predicate::str::contains("create-pr - "))
        .stdout(predicate::str::contains("(built-in)"));
}

#[test]
fn test_workflow_list_includes_project_files() {
    let (project, home) = dirs();
    project
        .child(".titan/workflows/lint.yaml")
        .write_str("name: lint\ndescription: Run the linter\nsteps:\n  - command: 'true'\n")
        .unwrap();
    project.child(".titan/workflows/bad.yaml").write_str("steps: nope\n").unwrap();

    titan_in(&project, &home)
        .args(["workflow", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("lint - Run the linter"))
        .stderr(predicate::str::contains("warning:"));
}

#[test]
fn test_workflow_show() {
    let (project, home) = dirs();
    titan_in(&project, &home)
        .args(["workflow", "show", "ai-commit"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Workflow: ai-commit"))
        .stdout(predicate::str::contains("agents.suggest_commit_message"))
        .stdout(predicate::str::contains("(optional)"));
}

#[test]
fn test_workflow_show_unknown() {
    let (project, home) = dirs();
    titan_in(&project, &home)
        .args(["workflow", "show", "deploy"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Workflow not found: deploy"));
}

#[test]
fn test_workflow_run_command_steps() {
    let (project, home) = dirs();
    project
        .child(".titan/workflows/greet.yaml")
        .write_str("name: greet\nsteps:\n  - id: say\n    command: echo hello ${who}\n")
        .unwrap();

    titan_in(&project, &home)
        .args(["workflow", "run", "greet", "--set", "who=titan"])
        .assert()
        .success()
        .stdout(predicate::str::contains("hello titan"))
        .stdout(predicate::str::contains("greet completed successfully"));
}

#[test]
fn test_workflow_run_failure_json() {
    let (project, home) = dirs();
    project
        .child(".titan/workflows/fail.yaml")
        .write_str("name: fail\nsteps:\n  - id: broken\n    command: exit 2\n  - command: echo never\n")
        .unwrap();

    let output = titan_in(&project, &home)
        .args(["workflow", "run", "fail", "--format", "json"])
        .assert()
        .failure()
        .code(1)
        .get_output()
        .stdout
        .clone();

    let json: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(json["report"]["workflow"], "fail");
    assert_eq!(json["report"]["state"]["state"], "halted");
    assert_eq!(json["report"]["steps"].as_array().unwrap().len(), 1);
    assert_eq!(json["report"]["final_result"]["kind"], "error");
}

#[test]
fn test_workflow_run_prints_final_error_without_halting() {
    let (project, home) = dirs();
    project
        .child(".titan/workflows/lenient.yaml")
        .write_str(
            "name: lenient\nhalt_on_error: false\nsteps:\n  - command: echo first\n  - id: last\n    command: exit 4\n",
        )
        .unwrap();

    titan_in(&project, &home)
        .args(["workflow", "run", "lenient"])
        .assert()
        .failure()
        .code(1)
        .stdout(predicate::str::contains("first"))
        .stderr(predicate::str::contains("lenient: ✗ Command failed with exit code 4"));
}

#[test]
fn test_workflow_run_prints_final_success() {
    let (project, home) = dirs();
    project
        .child(".titan/workflows/ok.yaml")
        .write_str("name: ok\nsteps:\n  - command: echo done\n")
        .unwrap();

    titan_in(&project, &home)
        .args(["workflow", "run", "ok"])
        .assert()
        .success()
        .stdout(predicate::str::contains("ok: ✓ Command 'echo done' executed successfully."));
}

#[test]
fn test_workflow_run_rejects_bad_set() {
    let (project, home) = dirs();
    titan_in(&project, &home)
        .args(["workflow", "run", "commit", "--set", "novalue"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("expected key=value"));
}

#[test]
fn test_workflow_run_disabled_plugin() {
    let (project, home) = dirs();
    project.child(".titan/config.toml").write_str("[plugins.agents]\nenabled = false\n").unwrap();

    titan_in(&project, &home)
        .args(["workflow", "run", "analyze"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("disabled"));
}

// ============================================================================
// Project Below Home Directory
// ============================================================================

/// Home holds the global config and the project lives underneath it.
fn nested_project() -> (TempDir, std::path::PathBuf) {
    let home = TempDir::new().unwrap();
    home.child(".titan/config.toml").write_str("[workflows]\n").unwrap();
    let project = home.child("code/app");
    project
        .child(".titan/workflows/here.yaml")
        .write_str("name: here\nsteps:\n  - command: pwd\n")
        .unwrap();
    (home, project.path().to_path_buf())
}

#[test]
fn test_global_config_is_not_the_project_config() {
    let (home, project) = nested_project();
    titan()
        .current_dir(&project)
        .env("HOME", home.path())
        .args(["config", "--path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("global: "))
        .stdout(predicate::str::contains("project: (none)"));
}

#[test]
fn test_project_workflows_found_below_home() {
    let (home, project) = nested_project();
    titan()
        .current_dir(&project)
        .env("HOME", home.path())
        .args(["workflow", "run", "here"])
        .assert()
        .success()
        .stdout(predicate::str::contains("code/app"));
}

// ============================================================================
// Plugins, Config & Completions
// ============================================================================

#[test]
fn test_plugins_list() {
    let (project, home) = dirs();
    titan_in(&project, &home)
        .args(["plugins", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("git"))
        .stdout(predicate::str::contains("suggest_pr_description"))
        .stdout(predicate::str::contains("[enabled]"));
}

#[test]
fn test_plugins_list_reads_token_from_secrets_file() {
    let (project, home) = dirs();
    titan_in(&project, &home)
        .args(["plugins", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("⚠ github"));

    project.child(".titan/secrets.env").write_str("GITHUB_TOKEN=ghp_from_file\n").unwrap();
    titan_in(&project, &home)
        .args(["plugins", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("✓ github"));
}

#[test]
fn test_config_path_without_files() {
    let (project, home) = dirs();
    titan_in(&project, &home)
        .args(["config", "--path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("global: (none)"))
        .stdout(predicate::str::contains("project: (none)"));
}

#[test]
fn test_config_shows_project_file() {
    let (project, home) = dirs();
    project.child(".titan/config.toml").write_str("[workflows]\ndir = \"flows\"\n").unwrap();

    titan_in(&project, &home)
        .args(["config"])
        .assert()
        .success()
        .stdout(predicate::str::contains("flows"));
}

// ============================================================================
// Init & External CLIs
// ============================================================================

#[test]
fn test_init_writes_project_config() {
    let (project, home) = dirs();
    titan_in(&project, &home)
        .env("NO_COLOR", "1")
        .arg("init")
        .write_stdin("shop\n2\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("5. generic"))
        .stdout(predicate::str::contains("Project 'shop' initialized"));

    project.child(".titan/config.toml").assert(predicate::str::contains("type = \"backend\""));
    project
        .child(".titan/config.toml")
        .assert(predicate::str::contains("[plugins.github]\nenabled = false"));

    titan_in(&project, &home)
        .arg("init")
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn test_init_cancelled_without_answers() {
    let (project, home) = dirs();
    titan_in(&project, &home)
        .env("NO_COLOR", "1")
        .arg("init")
        .write_stdin("")
        .assert()
        .failure()
        .code(1)
        .stdout(predicate::str::contains("Project initialization cancelled"));

    project.child(".titan/config.toml").assert(predicate::path::missing());
}

#[test]
fn test_cli_launch_unknown() {
    let (project, home) = dirs();
    titan_in(&project, &home)
        .args(["cli", "launch", "vim"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown CLI: vim"));
}

#[test]
fn test_cli_not_installed_shows_instructions() {
    let (project, home) = dirs();
    let empty = TempDir::new().unwrap();
    titan_in(&project, &home)
        .env("NO_COLOR", "1")
        .env("PATH", empty.path())
        .args(["cli", "claude", "hello"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Claude Code is not installed"))
        .stdout(predicate::str::contains("npm install -g @anthropic-ai/claude-code"));
}

#[cfg(unix)]
#[test]
fn test_cli_gemini_runs_with_prompt() {
    use std::os::unix::fs::PermissionsExt;

    let (project, home) = dirs();
    let bin = TempDir::new().unwrap();
    let script = bin.child("gemini");
    script.write_str("#!/bin/sh\necho \"gemini got: $1\"\n").unwrap();
    std::fs::set_permissions(script.path(), std::fs::Permissions::from_mode(0o755)).unwrap();

    titan_in(&project, &home)
        .env("NO_COLOR", "1")
        .env("PATH", bin.path())
        .args(["cli", "gemini", "explain main.rs"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Launching Gemini CLI..."))
        .stdout(predicate::str::contains("gemini got: explain main.rs"))
        .stdout(predicate::str::contains("Returned to Titan from Gemini CLI"));
}

#[test]
fn test_completions_bash() {
    titan()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("titan"));
}
