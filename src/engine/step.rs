//! The step contract.
//!
//! A step takes the context and returns one [`WorkflowResult`]. Returning
//! `Err` (or panicking) is an unexpected fault; [`invoke`] turns it into an
//! `Error` result so nothing escapes the runner.

use std::any::Any;
use std::cell::Cell;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Once;

use super::context::WorkflowContext;
use super::result::WorkflowResult;

/// What a step returns. `Err` is reserved for faults the step did not handle.
pub type StepOutcome = anyhow::Result<WorkflowResult>;

/// A unit of work scheduled by a [`Workflow`](super::Workflow).
pub trait Step {
    /// Name shown in progress output and used in fault messages.
    fn name(&self) -> &str;

    /// Execute against the shared context.
    fn run(&self, ctx: &mut WorkflowContext) -> StepOutcome;
}

/// A step backed by a plain function or closure.
pub struct FnStep<F> {
    name: String,
    func: F,
}

impl<F> FnStep<F>
where
    F: Fn(&mut WorkflowContext) -> StepOutcome,
{
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self { name: name.into(), func }
    }
}

impl<F> Step for FnStep<F>
where
    F: Fn(&mut WorkflowContext) -> StepOutcome,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&self, ctx: &mut WorkflowContext) -> StepOutcome {
        (self.func)(ctx)
    }
}

/// Box a function as a named step.
pub fn step<F>(name: impl Into<String>, func: F) -> Box<dyn Step>
where
    F: Fn(&mut WorkflowContext) -> StepOutcome + 'static,
{
    Box::new(FnStep::new(name, func))
}

/// Wrap a step so that its errors and faults become skips.
pub fn optional(inner: Box<dyn Step>) -> Box<dyn Step> {
    Box::new(Optional { inner })
}

/// Give a step a different display name.
pub fn labeled(name: impl Into<String>, inner: Box<dyn Step>) -> Box<dyn Step> {
    Box::new(Labeled { name: name.into(), inner })
}

struct Optional {
    inner: Box<dyn Step>,
}

impl Step for Optional {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn run(&self, ctx: &mut WorkflowContext) -> StepOutcome {
        let result = invoke(self.inner.as_ref(), ctx);
        if result.is_error() {
            tracing::debug!(step = self.name(), message = result.message(), "optional step failed");
            return Ok(WorkflowResult::skip(result.message()));
        }
        Ok(result)
    }
}

struct Labeled {
    name: String,
    inner: Box<dyn Step>,
}

impl Step for Labeled {
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&self, ctx: &mut WorkflowContext) -> StepOutcome {
        self.inner.run(ctx)
    }
}

thread_local! {
    static IN_STEP: Cell<bool> = const { Cell::new(false) };
}

static QUIET_HOOK: Once = Once::new();

/// Route panics raised inside a step to `tracing` instead of the default
/// stderr report. Panics elsewhere still reach the previous hook.
fn install_quiet_hook() {
    QUIET_HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if IN_STEP.with(Cell::get) {
                tracing::debug!(panic = %info, "step panicked");
            } else {
                previous(info);
            }
        }));
    });
}

/// Run a step, converting returned errors and panics into `Error` results.
pub(crate) fn invoke(step: &dyn Step, ctx: &mut WorkflowContext) -> WorkflowResult {
    install_quiet_hook();
    let outer = IN_STEP.with(|flag| flag.replace(true));
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| step.run(ctx)));
    IN_STEP.with(|flag| flag.set(outer));

    match outcome {
        Ok(Ok(result)) => result,
        Ok(Err(err)) => {
            let message = format!("Step '{}' failed: {err:#}", step.name());
            WorkflowResult::error_with_cause(message, err)
        }
        Err(payload) => {
            let message =
                format!("Step '{}' panicked: {}", step.name(), panic_message(payload.as_ref()));
            WorkflowResult::error(message)
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
