//! Titan - developer workflow CLI.
//!
//! Runs named workflows of git, GitHub, Jira and AI steps.

#![allow(clippy::single_match_else)]

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use anyhow::{Context as _, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use serde_json::Value;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use titan::ai;
use titan::core::{initialize_project, SecretStore, SecretValue, Settings};
use titan::engine::WorkflowContextBuilder;
use titan::launcher::CliLauncher;
use titan::plugins::PluginRegistry;
use titan::ui::{CaptureUi, ConsoleUi, Ui};
use titan::workflows::WorkflowCatalog;

/// Developer workflow CLI
#[derive(Parser)]
#[command(name = "titan")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List, inspect and run workflows
    Workflow {
        #[command(subcommand)]
        operation: WorkflowOperation,
    },

    /// Inspect registered plugins
    Plugins {
        #[command(subcommand)]
        operation: PluginsOperation,
    },

    /// Show the merged configuration
    Config {
        /// Show the configuration files in use instead
        #[arg(long)]
        path: bool,
    },

    /// AI provider status
    Ai {
        #[command(subcommand)]
        operation: AiOperation,
    },

    /// Manage secrets in the OS keychain
    Secrets {
        #[command(subcommand)]
        operation: SecretsOperation,
    },

    /// Create .titan/config.toml for the current project
    Init {
        /// Replace an existing configuration file
        #[arg(long)]
        force: bool,
    },

    /// Launch an external AI coding CLI
    Cli {
        #[command(subcommand)]
        operation: CliOperation,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

#[derive(Subcommand)]
enum WorkflowOperation {
    /// List built-in and project workflows
    List,

    /// Run a workflow
    Run {
        /// Workflow name
        name: String,

        /// Context values (key=value); values are parsed as JSON when possible
        #[arg(short, long = "set", value_name = "KEY=VALUE")]
        set: Vec<String>,

        /// Do not attach an AI client
        #[arg(long)]
        no_ai: bool,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Show the steps of a workflow
    Show {
        /// Workflow name
        name: String,
    },
}

#[derive(Subcommand)]
enum PluginsOperation {
    /// List plugins and their steps
    List,
}

#[derive(Subcommand)]
enum AiOperation {
    /// Show which provider would be used
    Status,
}

#[derive(Subcommand)]
enum SecretsOperation {
    /// Store a secret (value read from stdin when not given)
    Set {
        /// Secret name, e.g. github_token
        name: String,

        /// Secret value
        #[arg(long)]
        value: Option<String>,
    },

    /// Remove a secret
    Delete {
        /// Secret name
        name: String,
    },
}

#[derive(Subcommand)]
enum CliOperation {
    /// Launch a known CLI by name
    Launch {
        /// CLI name (claude, gemini)
        name: String,

        /// Initial prompt
        prompt: Option<String>,
    },

    /// Launch Claude Code
    Claude {
        /// Initial prompt
        prompt: Option<String>,
    },

    /// Launch Gemini CLI
    Gemini {
        /// Initial prompt
        prompt: Option<String>,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let default = if cli.verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env("TITAN_LOG").unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(io::stderr))
        .with(filter)
        .init();

    match cli.command {
        Commands::Workflow { operation } => match operation {
            WorkflowOperation::List => cmd_workflow_list()?,
            WorkflowOperation::Run { name, set, no_ai, format } => {
                let succeeded = cmd_workflow_run(&name, &set, no_ai, format)?;
                if !succeeded {
                    std::process::exit(1);
                }
            }
            WorkflowOperation::Show { name } => cmd_workflow_show(&name)?,
        },
        Commands::Plugins { operation: PluginsOperation::List } => cmd_plugins_list()?,
        Commands::Config { path } => cmd_config(path)?,
        Commands::Ai { operation: AiOperation::Status } => cmd_ai_status()?,
        Commands::Secrets { operation } => cmd_secrets(operation)?,
        Commands::Init { force } => {
            if !cmd_init(force)? {
                std::process::exit(1);
            }
        }
        Commands::Cli { operation } => {
            let (name, prompt) = match operation {
                CliOperation::Launch { name, prompt } => (name, prompt),
                CliOperation::Claude { prompt } => ("claude".to_string(), prompt),
                CliOperation::Gemini { prompt } => ("gemini".to_string(), prompt),
            };
            let code = cmd_cli_launch(&name, prompt.as_deref())?;
            if code != 0 {
                std::process::exit(code);
            }
        }
        Commands::Completions { shell } => cmd_completions(shell),
    }

    Ok(())
}

/// List available workflows.
fn cmd_workflow_list() -> Result<()> {
    let settings = Settings::load()?;
    let catalog = WorkflowCatalog::load(&settings, &settings.project_dir());

    for entry in catalog.list() {
        println!(
            "{} - {} ({})",
            entry.definition.name,
            entry.definition.description.as_deref().unwrap_or(""),
            entry.source
        );
    }
    for problem in catalog.problems() {
        eprintln!("warning: {problem}");
    }

    Ok(())
}

/// Show one workflow's steps.
fn cmd_workflow_show(name: &str) -> Result<()> {
    let settings = Settings::load()?;
    let catalog = WorkflowCatalog::load(&settings, &settings.project_dir());
    let entry = catalog.get(name)?;
    let definition = &entry.definition;

    println!("Workflow: {}", definition.name);
    if let Some(description) = &definition.description {
        println!("Description: {description}");
    }
    println!("Source: {}", entry.source);
    println!("Halt on error: {}", definition.halt_on_error);
    if !definition.params.is_empty() {
        println!("Params:");
        for (key, value) in &definition.params {
            println!("  {key} = {value}");
        }
    }

    println!("\nSteps:");
    for (i, step) in definition.steps.iter().enumerate() {
        let target = match (&step.plugin, &step.step, &step.command) {
            (Some(plugin), Some(name), _) => format!("{plugin}.{name}"),
            (_, _, Some(command)) => format!("$ {command}"),
            _ => String::new(),
        };
        let optional = if step.optional { " (optional)" } else { "" };
        println!("  {}. {} [{}]{}", i + 1, step.name.as_deref().unwrap_or(&target), target, optional);
    }

    Ok(())
}

/// Run a workflow. Returns whether it finished without an error.
fn cmd_workflow_run(name: &str, sets: &[String], no_ai: bool, format: OutputFormat) -> Result<bool> {
    let settings = Settings::load()?;
    let project_dir = settings.project_dir();
    let catalog = WorkflowCatalog::load(&settings, &project_dir);
    let entry = catalog.get(name)?;

    let registry = PluginRegistry::builtin();
    let workflow = catalog.resolve(&entry.definition, &registry)?;
    let overrides = parse_sets(sets)?;
    let plugins = entry.definition.plugins();

    let secrets = SecretStore::new(&project_dir);
    let capture = Arc::new(CaptureUi::new());

    let mut builder = WorkflowContextBuilder::new(settings.clone(), secrets);
    builder = match format {
        OutputFormat::Text => builder.with_ui(),
        OutputFormat::Json => builder.with_ui_renderer(capture.clone()),
    };
    builder = builder.with_git();
    if plugins.contains("github") {
        builder = builder.with_github();
    }
    if plugins.contains("jira") {
        builder = builder.with_jira();
    }
    if !no_ai && plugins.contains("agents") {
        builder = builder.with_ai();
    }

    let mut ctx = builder.with_data("cwd", project_dir.display().to_string()).build();
    entry.definition.seed_params(&mut ctx);
    for (key, value) in overrides {
        ctx.set(key, value);
    }

    let report = workflow.run_with_report(&mut ctx);

    match format {
        OutputFormat::Text => {
            let summary = format!("{}: {}", report.workflow, report.final_result);
            if report.succeeded() {
                println!("{summary}");
            } else {
                eprintln!("{summary}");
            }
        }
        OutputFormat::Json => {
            let output = serde_json::json!({ "report": &report, "output": capture.lines() });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(report.succeeded())
}

/// Parse `key=value` pairs. Values that are valid JSON keep their type.
fn parse_sets(sets: &[String]) -> Result<Vec<(String, Value)>> {
    sets.iter()
        .map(|pair| {
            let (key, raw) = pair
                .split_once('=')
                .with_context(|| format!("Invalid --set '{pair}', expected key=value"))?;
            let key = key.trim();
            if key.is_empty() {
                anyhow::bail!("Invalid --set '{pair}', key is empty");
            }
            let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
            Ok((key.to_string(), value))
        })
        .collect()
}

/// List plugins.
fn cmd_plugins_list() -> Result<()> {
    let settings = Settings::load()?;
    let secrets = SecretStore::new(&settings.project_dir());
    let registry = PluginRegistry::builtin();

    for plugin in registry.list() {
        let enabled = if settings.is_plugin_enabled(plugin.name()) { "enabled" } else { "disabled" };
        let available = if plugin.is_available(&settings, &secrets) { "✓" } else { "⚠" };
        println!("{} {} - {} [{}]", available, plugin.name(), plugin.description(), enabled);
        for step in plugin.steps() {
            println!("    {} - {}", step.name, step.description);
        }
    }
    for problem in registry.check_dependencies() {
        eprintln!("warning: {problem}");
    }

    Ok(())
}

/// Show configuration.
fn cmd_config(show_path: bool) -> Result<()> {
    let settings = Settings::load()?;

    if show_path {
        for (label, path) in [("global", settings.global_path()), ("project", settings.project_path())] {
            match path {
                Some(path) => println!("{label}: {}", path.display()),
                None => println!("{label}: (none)"),
            }
        }
        return Ok(());
    }

    let toml = toml::to_string_pretty(&settings)?;
    println!("{toml}");

    Ok(())
}

/// Show which AI provider would be used.
fn cmd_ai_status() -> Result<()> {
    let settings = Settings::load()?;
    let secrets = SecretStore::new(&settings.project_dir());

    match ai::client_from_settings(&settings, &secrets) {
        Ok(client) => println!("AI provider: {} (model {})", client.provider(), client.model()),
        Err(e) => println!("AI not available: {e}"),
    }

    let detected = ai::detect_all();
    if !detected.is_empty() {
        println!("\nDetected in environment:");
        for config in detected {
            let key = if config.api_key.is_some() { "key set" } else { "no key" };
            println!("  {} ({key})", config.provider);
        }
    }

    Ok(())
}

/// Manage keychain secrets.
fn cmd_secrets(operation: SecretsOperation) -> Result<()> {
    let settings = Settings::load()?;
    let secrets = SecretStore::new(&settings.project_dir());

    match operation {
        SecretsOperation::Set { name, value } => {
            let value = match value {
                Some(value) => value,
                None => {
                    print!("Value for {name}: ");
                    io::stdout().flush()?;
                    let mut line = String::new();
                    io::stdin().lock().read_line(&mut line)?;
                    line.trim_end_matches(['\r', '\n']).to_string()
                }
            };
            if value.is_empty() {
                anyhow::bail!("Secret value cannot be empty");
            }
            secrets.set(&name, &SecretValue::new(value))?;
            println!("Stored secret '{name}'");
        }
        SecretsOperation::Delete { name } => {
            secrets.delete(&name)?;
            println!("Deleted secret '{name}'");
        }
    }

    Ok(())
}

/// Initialize the project in the current directory. Returns false when
/// cancelled.
fn cmd_init(force: bool) -> Result<bool> {
    let cwd = std::env::current_dir()?;
    let registry = PluginRegistry::builtin();
    let plugins: Vec<&str> = registry.list().map(|p| p.name()).collect();

    let written = initialize_project(&cwd, &plugins, &ConsoleUi::new(), force)?;
    Ok(written.is_some())
}

/// Run an external CLI. Returns its exit code.
fn cmd_cli_launch(name: &str, prompt: Option<&str>) -> Result<i32> {
    let ui = ConsoleUi::new();
    let launcher = CliLauncher::new(name)?;
    let display_name = launcher.cli().display_name;

    if !launcher.is_available() {
        ui.error(&format!("{display_name} is not installed"));
        ui.body(launcher.cli().install_instructions);
        return Ok(1);
    }

    ui.info(&format!("Launching {display_name}..."));
    if let Some(prompt) = prompt {
        ui.body(&format!("Initial prompt: {prompt}"));
    }
    ui.line();

    let code = launcher.launch(prompt, &std::env::current_dir()?)?;

    ui.line();
    ui.success(&format!("Returned to Titan from {display_name}"));
    Ok(code)
}

/// Generate shell completions.
fn cmd_completions(shell: Shell) {
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "titan", &mut io::stdout());
}
