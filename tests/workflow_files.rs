//! Workflow File Tests
//!
//! Loading project workflow files and running the result.

use assert_fs::prelude::*;
use assert_fs::TempDir;
use serde_json::json;
use titan::core::{SecretStore, Settings};
use titan::engine::WorkflowContextBuilder;
use titan::plugins::PluginRegistry;
use titan::workflows::{WorkflowCatalog, WorkflowSource};

fn project() -> TempDir {
    TempDir::new().unwrap()
}

// ============================================================================
// Discovery
// ============================================================================

#[test]
fn test_project_file_is_listed() {
    let dir = project();
    dir.child(".titan/workflows/hello.yaml")
        .write_str("name: hello\ndescription: Say hi\nsteps:\n  - command: echo hi\n")
        .unwrap();

    let catalog = WorkflowCatalog::load(&Settings::default(), dir.path());
    let entry = catalog.get("hello").unwrap();

    assert_eq!(entry.definition.description.as_deref(), Some("Say hi"));
    assert!(matches!(entry.source, WorkflowSource::File(_)));
    assert!(catalog.get("commit").is_ok());
    assert!(catalog.problems().is_empty());
}

#[test]
fn test_project_file_overrides_builtin() {
    let dir = project();
    dir.child(".titan/workflows/commit.yml")
        .write_str("name: commit\nsteps:\n  - plugin: git\n    step: status\n")
        .unwrap();

    let catalog = WorkflowCatalog::load(&Settings::default(), dir.path());
    let entry = catalog.get("commit").unwrap();

    assert_eq!(entry.definition.steps.len(), 1);
    assert!(matches!(entry.source, WorkflowSource::File(_)));
}

#[test]
fn test_broken_file_is_reported_not_fatal() {
    let dir = project();
    let workflows = dir.child(".titan/workflows");
    workflows.child("broken.yaml").write_str("name: [unclosed\n").unwrap();
    workflows.child("empty.yaml").write_str("name: empty\nsteps: []\n").unwrap();
    workflows.child("notes.txt").write_str("not a workflow").unwrap();
    workflows.child("ok.yaml").write_str("name: ok\nsteps:\n  - command: 'true'\n").unwrap();

    let catalog = WorkflowCatalog::load(&Settings::default(), dir.path());

    assert!(catalog.get("ok").is_ok());
    assert!(catalog.get("empty").is_err());
    assert_eq!(catalog.problems().len(), 2);
    assert!(catalog.problems().iter().any(|p| p.contains("broken.yaml")));
}

#[test]
fn test_extra_directory_from_settings() {
    let dir = project();
    dir.child("ops/flows/deploy.yaml")
        .write_str("name: deploy\nsteps:\n  - command: echo deploying\n")
        .unwrap();

    let settings: Settings = toml::from_str("[workflows]\ndir = \"ops/flows\"\n").unwrap();
    let catalog = WorkflowCatalog::load(&settings, dir.path());

    assert!(catalog.get("deploy").is_ok());
}

// ============================================================================
// Running
// ============================================================================

#[test]
fn test_command_workflow_with_params() {
    let dir = project();
    dir.child(".titan/workflows/greet.yaml")
        .write_str(
            r"
name: greet
params:
  greeting: hello
steps:
  - id: say
    command: echo ${greeting} ${who}
    params:
      who: world
",
        )
        .unwrap();

    let catalog = WorkflowCatalog::load(&Settings::default(), dir.path());
    let entry = catalog.get("greet").unwrap();
    let workflow = catalog.resolve(&entry.definition, &PluginRegistry::builtin()).unwrap();
    assert_eq!(workflow.step_names(), vec!["say"]);

    let mut ctx = WorkflowContextBuilder::new(Settings::default(), SecretStore::isolated())
        .with_data("cwd", dir.path().display().to_string())
        .build();
    entry.definition.seed_params(&mut ctx);

    let result = workflow.run(&mut ctx);
    assert!(result.is_success(), "{}", result.message());
    assert_eq!(ctx.get_str("who"), Some("world"));
    assert_eq!(ctx.get_str("command_output").map(str::trim), Some("hello world"));
}

#[test]
fn test_failing_command_halts() {
    let dir = project();
    dir.child(".titan/workflows/fail.yaml")
        .write_str(
            r"
name: fail
steps:
  - id: broken
    command: exit 3
  - id: never
    command: echo never
",
        )
        .unwrap();

    let catalog = WorkflowCatalog::load(&Settings::default(), dir.path());
    let entry = catalog.get("fail").unwrap();
    let workflow = catalog.resolve(&entry.definition, &PluginRegistry::builtin()).unwrap();

    let mut ctx =
        WorkflowContextBuilder::new(Settings::default(), SecretStore::isolated()).build();
    let report = workflow.run_with_report(&mut ctx);

    assert!(!report.succeeded());
    assert_eq!(report.executed_steps(), vec!["broken"]);
    assert!(report.final_result.message().contains("exit code 3"));
}

#[test]
fn test_optional_failure_continues() {
    let dir = project();
    dir.child(".titan/workflows/lenient.yaml")
        .write_str(
            r"
name: lenient
steps:
  - id: flaky
    command: exit 1
    optional: true
  - id: after
    command: echo after
",
        )
        .unwrap();

    let catalog = WorkflowCatalog::load(&Settings::default(), dir.path());
    let entry = catalog.get("lenient").unwrap();
    let workflow = catalog.resolve(&entry.definition, &PluginRegistry::builtin()).unwrap();

    let mut ctx =
        WorkflowContextBuilder::new(Settings::default(), SecretStore::isolated()).build();
    let report = workflow.run_with_report(&mut ctx);

    assert!(report.succeeded());
    assert!(report.steps[0].result.is_skip());
    assert_eq!(ctx.get("command_output"), Some(&json!("after\n")));
}
