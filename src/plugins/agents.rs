//! AI agent steps.

use crate::agents::{
    agent_step, AtomicCommitsAgent, ChangeAnalysis, CommitMessageAgent, PrDescriptionAgent,
};
use crate::core::{SecretStore, Settings};
use crate::plugins::{Plugin, StepDescriptor};

/// Steps backed by the configured AI provider.
pub struct AgentsPlugin;

impl Plugin for AgentsPlugin {
    fn name(&self) -> &str {
        "agents"
    }

    fn description(&self) -> &str {
        "AI analysis of repository changes"
    }

    fn is_available(&self, settings: &Settings, secrets: &SecretStore) -> bool {
        crate::ai::client_from_settings(settings, secrets).is_ok()
    }

    fn steps(&self) -> Vec<StepDescriptor> {
        vec![
            StepDescriptor::new("analyze_changes", "Review uncommitted changes", || {
                agent_step(ChangeAnalysis)
            }),
            StepDescriptor::new("suggest_commit_message", "Propose a conventional commit", || {
                agent_step(CommitMessageAgent)
            }),
            StepDescriptor::new("suggest_pr_description", "Draft a pull request title and body", || {
                agent_step(PrDescriptionAgent)
            }),
            StepDescriptor::new(
                "ai_create_atomic_commits",
                "Split changes into several AI-planned commits",
                || agent_step(AtomicCommitsAgent),
            ),
        ]
    }
}
