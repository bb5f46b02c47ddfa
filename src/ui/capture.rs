//! Recording renderer.
//!
//! Used for `--format json` runs and in tests.

use std::collections::VecDeque;

use parking_lot::Mutex;

use super::{Level, Ui};

/// Renderer that keeps every line in memory and answers prompts from a
/// queue of scripted replies. An exhausted queue behaves like a user who
/// cancelled.
#[derive(Debug, Default)]
pub struct CaptureUi {
    lines: Mutex<Vec<(Level, String)>>,
    replies: Mutex<VecDeque<String>>,
}

impl CaptureUi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue replies for upcoming prompts, in order.
    pub fn with_replies<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: Mutex::new(Vec::new()),
            replies: Mutex::new(replies.into_iter().map(Into::into).collect()),
        }
    }

    /// Every recorded line, separators included.
    pub fn lines(&self) -> Vec<(Level, String)> {
        self.lines.lock().clone()
    }

    /// Recorded text, separators excluded.
    pub fn messages(&self) -> Vec<String> {
        self.lines
            .lock()
            .iter()
            .filter(|(level, _)| *level != Level::Line)
            .map(|(_, text)| text.clone())
            .collect()
    }

    /// Recorded text joined with newlines.
    pub fn transcript(&self) -> String {
        self.lines.lock().iter().map(|(_, text)| text.as_str()).collect::<Vec<_>>().join("\n")
    }

    fn next_reply(&self) -> Option<String> {
        self.replies.lock().pop_front()
    }
}

impl Ui for CaptureUi {
    fn emit(&self, level: Level, text: &str) {
        self.lines.lock().push((level, text.to_string()));
    }

    fn ask_text(&self, prompt: &str) -> anyhow::Result<Option<String>> {
        self.emit(Level::Body, prompt);
        Ok(self.next_reply().filter(|r| !r.is_empty()))
    }

    fn ask_confirm(&self, prompt: &str, default: bool) -> anyhow::Result<bool> {
        self.emit(Level::Body, prompt);
        Ok(match self.next_reply().as_deref().map(str::to_lowercase).as_deref() {
            Some("y" | "yes") => true,
            Some("n" | "no") => false,
            _ => default,
        })
    }

    fn ask_choice(&self, prompt: &str, choices: &[String]) -> anyhow::Result<Option<usize>> {
        self.emit(Level::Body, prompt);
        let Some(reply) = self.next_reply() else {
            return Ok(None);
        };
        Ok(reply.trim().parse::<usize>().ok().filter(|n| (1..=choices.len()).contains(n)).map(|n| n - 1))
    }
}
