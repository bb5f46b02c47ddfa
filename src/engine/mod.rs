//! Workflow execution engine.
//!
//! Runs an ordered list of steps against one shared context:
//!
//! - [`WorkflowResult`] - success, error or skip, with optional metadata
//! - [`WorkflowContext`] - collaborators plus the shared data store
//! - [`WorkflowContextBuilder`] - fluent context assembly
//! - [`Step`] - the unit of work
//! - [`Workflow`] - the runner (halt on error, metadata merging)

mod builder;
mod command;
mod context;
mod result;
mod step;
mod workflow;

pub use builder::WorkflowContextBuilder;
pub use command::{resolve_placeholders, CommandStep};
pub use context::WorkflowContext;
pub use result::{Metadata, ResultKind, WorkflowResult};
pub use step::{labeled, optional, step, FnStep, Step, StepOutcome};
pub use workflow::{RunState, StepRecord, Workflow, WorkflowReport};
