//! Sequential workflow runner.
//!
//! Steps run strictly in list order against one context. After each step
//! the metadata of a `Success` or `Skip` is merged into the context data,
//! overwriting existing keys. An `Error` stops the run when
//! `halt_on_error` is set (the default).

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::context::WorkflowContext;
use super::result::{ResultKind, WorkflowResult};
use super::step::{invoke, Step};
use crate::ui::Ui;

/// An ordered list of steps with a display name.
pub struct Workflow {
    name: String,
    description: Option<String>,
    steps: Vec<Box<dyn Step>>,
    halt_on_error: bool,
}

/// Where a run is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RunState {
    NotStarted,
    Running { step: usize, total: usize },
    /// Stopped on the error returned by `step` (1-based)
    Halted { step: usize },
    Completed,
}

/// One executed step.
#[derive(Debug, Clone, Serialize)]
pub struct StepRecord {
    pub name: String,
    pub result: WorkflowResult,
    #[serde(rename = "duration_ms", serialize_with = "serialize_millis")]
    pub duration: Duration,
}

/// Everything that happened during one run.
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowReport {
    pub workflow: String,
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub state: RunState,
    pub steps: Vec<StepRecord>,
    pub final_result: WorkflowResult,
}

impl WorkflowReport {
    /// Whether the run ended without an error outcome.
    pub fn succeeded(&self) -> bool {
        !self.final_result.is_error()
    }

    /// Names of the steps that actually executed, in order.
    pub fn executed_steps(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name.as_str()).collect()
    }
}

impl Workflow {
    /// Create a workflow that halts on the first error.
    pub fn new(name: impl Into<String>, steps: Vec<Box<dyn Step>>) -> Self {
        Self { name: name.into(), description: None, steps, halt_on_error: true }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Keep going after errors instead of halting.
    #[must_use]
    pub fn halt_on_error(mut self, halt: bool) -> Self {
        self.halt_on_error = halt;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn halts_on_error(&self) -> bool {
        self.halt_on_error
    }

    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Run every step and return the final result.
    pub fn run(&self, ctx: &mut WorkflowContext) -> WorkflowResult {
        self.run_with_report(ctx).final_result
    }

    /// Run every step and return the full report.
    pub fn run_with_report(&self, ctx: &mut WorkflowContext) -> WorkflowReport {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("workflow", name = %self.name, %run_id);
        let _guard = span.enter();

        let ui = ctx.ui_handle();
        let total = self.steps.len();
        let mut report = WorkflowReport {
            workflow: self.name.clone(),
            run_id,
            started_at: Utc::now(),
            state: RunState::NotStarted,
            steps: Vec::with_capacity(total),
            final_result: WorkflowResult::success(format!("{} completed", self.name)),
        };

        if let Some(ui) = &ui {
            ui.title(&format!("🚀 {}", self.name));
            ui.line();
        }

        let mut had_error = false;

        for (index, step) in self.steps.iter().enumerate() {
            let number = index + 1;
            report.state = RunState::Running { step: number, total };
            ctx.set_progress(Some(number), total);

            if let Some(ui) = &ui {
                ui.info(&format!("[{number}/{total}] {}", step.name()));
            }
            tracing::info!(step = step.name(), number, total, "running step");

            let started = Instant::now();
            let result = invoke(step.as_ref(), ctx);
            let duration = started.elapsed();

            if !result.is_error() {
                ctx.merge_metadata(result.metadata());
            }

            if let Some(ui) = &ui {
                render_result(ui.as_ref(), &result);
            }
            tracing::info!(
                step = step.name(),
                outcome = ?result.kind(),
                elapsed_ms = duration.as_millis() as u64,
                "step finished"
            );

            report.steps.push(StepRecord {
                name: step.name().to_string(),
                result: result.clone(),
                duration,
            });
            report.final_result = result;

            if report.final_result.is_error() {
                had_error = true;
                if self.halt_on_error {
                    tracing::warn!(
                        step = step.name(),
                        message = report.final_result.message(),
                        "workflow halted"
                    );
                    if let Some(ui) = &ui {
                        ui.line();
                        ui.error(&format!(
                            "❌ Workflow halted: {}",
                            report.final_result.message()
                        ));
                    }
                    report.state = RunState::Halted { step: number };
                    ctx.set_progress(None, 0);
                    return report;
                }
            }

            if let Some(ui) = &ui {
                ui.line();
            }
        }

        report.state = RunState::Completed;
        ctx.set_progress(None, 0);

        if !had_error {
            if let Some(ui) = &ui {
                ui.success(&format!("✅ {} completed successfully", self.name));
            }
            tracing::info!(steps = total, "workflow completed");
        }

        report
    }
}

impl std::fmt::Debug for Workflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workflow")
            .field("name", &self.name)
            .field("steps", &self.step_names())
            .field("halt_on_error", &self.halt_on_error)
            .finish()
    }
}

fn render_result(ui: &dyn Ui, result: &WorkflowResult) {
    let line = format!("  {} {}", result.kind().symbol(), result.message());
    match result.kind() {
        ResultKind::Success => ui.success(&line),
        ResultKind::Skip => ui.warning(&line),
        ResultKind::Error => ui.error(&line),
    }
}

fn serialize_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::sync::Arc;

    use serde_json::Value;

    use super::*;
    use crate::core::{SecretStore, Settings};
    use crate::engine::step;
    use crate::ui::{CaptureUi, Level};

    fn context() -> WorkflowContext {
        WorkflowContext::new(Arc::new(Settings::default()), Arc::new(SecretStore::isolated()))
    }

    #[test]
    fn test_empty_workflow_succeeds_with_name() {
        let workflow = Workflow::new("Nothing", Vec::new());
        let result = workflow.run(&mut context());
        assert!(result.is_success());
        assert_eq!(result.message(), "Nothing completed");
    }

    #[test]
    fn test_final_result_is_last_step() {
        let workflow = Workflow::new(
            "Two",
            vec![
                step("one", |_| Ok(WorkflowResult::success("first"))),
                step("two", |_| Ok(WorkflowResult::success("second"))),
            ],
        );
        let report = workflow.run_with_report(&mut context());

        assert_eq!(report.final_result.message(), "second");
        assert_eq!(report.state, RunState::Completed);
        assert_eq!(report.executed_steps(), vec!["one", "two"]);
        assert!(report.succeeded());
    }

    #[test]
    fn test_halt_records_state() {
        let workflow = Workflow::new(
            "Halting",
            vec![
                step("ok", |_| Ok(WorkflowResult::success("ok"))),
                step("bad", |_| Ok(WorkflowResult::error("bad"))),
                step("never", |_| Ok(WorkflowResult::success("never"))),
            ],
        );
        let report = workflow.run_with_report(&mut context());

        assert_eq!(report.state, RunState::Halted { step: 2 });
        assert_eq!(report.executed_steps(), vec!["ok", "bad"]);
        assert!(!report.succeeded());
    }

    #[test]
    fn test_continue_on_error_runs_everything() {
        let ran = Rc::new(RefCell::new(Vec::new()));
        let (a, b) = (ran.clone(), ran.clone());
        let workflow = Workflow::new(
            "Lenient",
            vec![
                step("fails", move |_| {
                    a.borrow_mut().push("fails");
                    Ok(WorkflowResult::error("nope").with_metadata("ignored", true))
                }),
                step("after", move |_| {
                    b.borrow_mut().push("after");
                    Ok(WorkflowResult::success("still ran"))
                }),
            ],
        )
        .halt_on_error(false);

        let mut ctx = context();
        let report = workflow.run_with_report(&mut ctx);

        assert_eq!(*ran.borrow(), vec!["fails", "after"]);
        assert_eq!(report.state, RunState::Completed);
        assert!(report.final_result.is_success());
        assert!(!ctx.has("ignored"), "error metadata is never merged");
    }

    #[test]
    fn test_progress_visible_to_steps() {
        let workflow = Workflow::new(
            "Progress",
            vec![
                step("first", |ctx| {
                    let seen = format!("{:?}/{}", ctx.current_step(), ctx.total_steps());
                    Ok(WorkflowResult::success("ok").with_metadata("seen", seen))
                }),
                step("second", |_| Ok(WorkflowResult::success("ok"))),
            ],
        );
        let mut ctx = context();
        workflow.run(&mut ctx);

        assert_eq!(ctx.get("seen"), Some(&Value::from("Some(1)/2")));
        assert_eq!(ctx.current_step(), None);
    }

    #[test]
    fn test_ui_rendering() {
        let ui = Arc::new(CaptureUi::new());
        let mut ctx = context();
        ctx.ui = Some(ui.clone());

        let workflow = Workflow::new(
            "Render",
            vec![
                step("skipper", |_| Ok(WorkflowResult::skip("no ai"))),
                step("doer", |_| Ok(WorkflowResult::success("done"))),
            ],
        );
        workflow.run(&mut ctx);

        let lines = ui.lines();
        assert_eq!(lines[0], (Level::Title, "🚀 Render".to_string()));
        assert!(lines.contains(&(Level::Info, "[1/2] skipper".to_string())));
        assert!(lines.contains(&(Level::Warning, "  ⊝ no ai".to_string())));
        assert!(lines.contains(&(Level::Success, "  ✓ done".to_string())));
        assert_eq!(
            lines.last().unwrap(),
            &(Level::Success, "✅ Render completed successfully".to_string())
        );
    }

    #[test]
    fn test_report_serializes() {
        let workflow =
            Workflow::new("Json", vec![step("one", |_| Ok(WorkflowResult::skip("nothing")))]);
        let report = workflow.run_with_report(&mut context());
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["workflow"], "Json");
        assert_eq!(json["state"]["state"], "completed");
        assert_eq!(json["steps"][0]["name"], "one");
        assert_eq!(json["final_result"]["kind"], "skip");
    }
}
