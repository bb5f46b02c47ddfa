//! User interface capability.
//!
//! Steps and the runner talk to the user only through [`Ui`]. Two
//! renderers ship with the crate: [`ConsoleUi`] for terminals and
//! [`CaptureUi`], which records output and answers prompts from a script.

mod capture;
mod console;

pub use capture::CaptureUi;
pub use console::ConsoleUi;

use serde::Serialize;

/// Kind of output line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Title,
    Info,
    Body,
    Success,
    Warning,
    Error,
    /// Blank separator line
    Line,
}

/// Output and prompt surface available to steps.
///
/// Prompt methods return `Ok(None)` when the user cancels (end of input or
/// an empty answer where one is required).
pub trait Ui: Send + Sync {
    /// Write one line of output at the given level.
    fn emit(&self, level: Level, text: &str);

    /// Ask for free text.
    fn ask_text(&self, prompt: &str) -> anyhow::Result<Option<String>>;

    /// Ask a yes/no question.
    fn ask_confirm(&self, prompt: &str, default: bool) -> anyhow::Result<bool>;

    /// Ask the user to pick one of `choices`. Returns the 0-based index.
    fn ask_choice(&self, prompt: &str, choices: &[String]) -> anyhow::Result<Option<usize>>;

    fn title(&self, text: &str) {
        self.emit(Level::Title, text);
    }

    fn info(&self, text: &str) {
        self.emit(Level::Info, text);
    }

    fn body(&self, text: &str) {
        self.emit(Level::Body, text);
    }

    fn success(&self, text: &str) {
        self.emit(Level::Success, text);
    }

    fn warning(&self, text: &str) {
        self.emit(Level::Warning, text);
    }

    fn error(&self, text: &str) {
        self.emit(Level::Error, text);
    }

    fn line(&self) {
        self.emit(Level::Line, "");
    }
}
