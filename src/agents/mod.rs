//! AI agents adapted into workflow steps.
//!
//! An [`Agent`] only decides what to ask and how to read the answer.
//! [`AgentStep`] does the rest: it skips when no AI client is attached,
//! calls the model, and turns provider failures into `Error` results that
//! keep the cause.

mod analysis;
mod atomic_commits;
mod pull_request;

pub use analysis::{ChangeAnalysis, CommitMessageAgent};
pub use atomic_commits::{parse_commit_plan, AtomicCommitsAgent, PlannedCommit};
pub use pull_request::PrDescriptionAgent;

use crate::engine::{Step, StepOutcome, WorkflowContext, WorkflowResult};

/// What an agent wants to do with the current context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prepared {
    /// Send this prompt to the model.
    Prompt(String),
    /// Nothing to analyse; skip with this message.
    Skip(String),
    /// A required collaborator is missing; fail with this message.
    Fail(String),
}

/// A prompt builder and response interpreter.
pub trait Agent {
    /// Step name.
    fn name(&self) -> &str;

    /// System prompt, if any.
    fn system_prompt(&self, _ctx: &WorkflowContext) -> Option<String> {
        None
    }

    /// Build the prompt from context data. `Err` is a fault (e.g. a context
    /// value with the wrong shape).
    fn prepare(&self, ctx: &WorkflowContext) -> anyhow::Result<Prepared>;

    /// Turn the model's reply into the step's result.
    fn interpret(&self, response: String, ctx: &WorkflowContext) -> StepOutcome;

    /// Prefix for error messages when the model call fails.
    fn failure_message(&self) -> &str {
        "AI request failed"
    }
}

/// Step adapter for an [`Agent`].
pub struct AgentStep<A> {
    agent: A,
}

impl<A: Agent> AgentStep<A> {
    pub fn new(agent: A) -> Self {
        Self { agent }
    }
}

impl<A: Agent> Step for AgentStep<A> {
    fn name(&self) -> &str {
        self.agent.name()
    }

    fn run(&self, ctx: &mut WorkflowContext) -> StepOutcome {
        let Some(ai) = ctx.ai() else {
            return Ok(WorkflowResult::skip(format!(
                "AI not configured, skipping {}",
                self.agent.name()
            )));
        };

        let prompt = match self.agent.prepare(ctx)? {
            Prepared::Prompt(prompt) => prompt,
            Prepared::Skip(message) => return Ok(WorkflowResult::skip(message)),
            Prepared::Fail(message) => return Ok(WorkflowResult::error(message)),
        };
        let system = self.agent.system_prompt(ctx);

        tracing::debug!(
            agent = self.agent.name(),
            provider = ai.provider(),
            model = ai.model(),
            prompt_chars = prompt.len(),
            "Calling AI"
        );

        match ai.generate(&prompt, system.as_deref()) {
            Ok(response) => self.agent.interpret(response, ctx),
            Err(e) => {
                let message = format!("{}: {e}", self.agent.failure_message());
                Ok(WorkflowResult::error_with_cause(message, e))
            }
        }
    }
}

/// Box an agent as a step.
pub fn agent_step<A: Agent + 'static>(agent: A) -> Box<dyn Step> {
    Box::new(AgentStep::new(agent))
}

/// Cut `text` to at most `max` characters, marking the cut.
pub(crate) fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}\n\n... (truncated)", &text[..idx]),
        None => text.to_string(),
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use parking_lot::Mutex;

    use crate::ai::{AiClient, AiError};

    /// Scripted AI client recording every prompt.
    pub struct ScriptedAi {
        reply: Result<String, String>,
        pub prompts: Mutex<Vec<(String, Option<String>)>>,
    }

    impl ScriptedAi {
        pub fn replying(reply: &str) -> Self {
            Self { reply: Ok(reply.to_string()), prompts: Mutex::new(Vec::new()) }
        }

        pub fn failing(error: &str) -> Self {
            Self { reply: Err(error.to_string()), prompts: Mutex::new(Vec::new()) }
        }
    }

    impl AiClient for ScriptedAi {
        fn provider(&self) -> &str {
            "scripted"
        }

        fn model(&self) -> &str {
            "test"
        }

        fn generate(&self, prompt: &str, system: Option<&str>) -> Result<String, AiError> {
            self.prompts.lock().push((prompt.to_string(), system.map(str::to_string)));
            self.reply.clone().map_err(AiError::NoResponse)
        }
    }
}
