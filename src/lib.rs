#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unnecessary_lazy_evaluations)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::should_implement_trait)]

//! # Titan
//!
//! Developer workflow CLI: compose git, GitHub, Jira and AI steps into named
//! workflows and run them from the terminal.
//!
//! A workflow is an ordered list of steps sharing one context. Each step
//! returns success, error or skip; the metadata it returns becomes visible
//! to the steps after it, and an error stops the run.
//!
//! ## Quick Start
//!
//! ```bash
//! # Commit with an AI-suggested conventional message
//! titan workflow run ai-commit
//!
//! # Push and open a pull request
//! titan workflow run create-pr --set use_ai=true
//! ```
//!
//! ## Library use
//!
//! ```no_run
//! use titan::core::{SecretStore, Settings};
//! use titan::engine::{step, Workflow, WorkflowContextBuilder, WorkflowResult};
//!
//! let mut ctx = WorkflowContextBuilder::new(Settings::default(), SecretStore::isolated())
//!     .with_ui()
//!     .build();
//!
//! let workflow = Workflow::new(
//!     "hello",
//!     vec![step("greet", |_ctx| Ok(WorkflowResult::success("hello").with_metadata("greeted", true)))],
//! );
//! assert!(workflow.run(&mut ctx).is_success());
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
// Allow common patterns that are intentional in this codebase
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::similar_names)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::redundant_else)]
#![allow(clippy::if_not_else)]
#![allow(clippy::manual_let_else)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::option_if_let_else)]
#![allow(clippy::significant_drop_tightening)]
#![allow(clippy::map_unwrap_or)]
#![allow(clippy::missing_fields_in_debug)]
#![allow(clippy::unnecessary_literal_bound)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::redundant_closure_for_method_calls)]
#![allow(clippy::let_underscore_must_use)]

pub mod agents;
pub mod ai;
pub mod core;
pub mod engine;
pub mod git;
pub mod integrations;
pub mod launcher;
pub mod plugins;
pub mod ui;
pub mod workflows;

pub use core::{SecretStore, Settings};
pub use engine::{Step, Workflow, WorkflowContext, WorkflowContextBuilder, WorkflowResult};
pub use plugins::PluginRegistry;
pub use workflows::WorkflowCatalog;
