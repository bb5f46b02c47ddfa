//! Terminal renderer.

use std::io::{self, BufRead, Write};

use crossterm::style::Stylize;

use super::{Level, Ui};

/// Styled stdout renderer with stdin prompts.
#[derive(Debug, Default)]
pub struct ConsoleUi {
    /// Disable colors (e.g. when `NO_COLOR` is set)
    plain: bool,
}

impl ConsoleUi {
    pub fn new() -> Self {
        Self { plain: std::env::var_os("NO_COLOR").is_some() }
    }

    /// Renderer that never emits ANSI styling.
    pub fn plain() -> Self {
        Self { plain: true }
    }

    fn read_line(&self, prompt: &str) -> anyhow::Result<Option<String>> {
        let mut stdout = io::stdout();
        write!(stdout, "{prompt}")?;
        stdout.flush()?;

        let mut line = String::new();
        let read = io::stdin().lock().read_line(&mut line)?;
        if read == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }
}

impl Ui for ConsoleUi {
    fn emit(&self, level: Level, text: &str) {
        if self.plain {
            match level {
                Level::Line => println!(),
                Level::Error => eprintln!("{text}"),
                _ => println!("{text}"),
            }
            return;
        }

        match level {
            Level::Title => println!("{}", text.bold().cyan()),
            Level::Info => println!("{}", text.blue()),
            Level::Body => println!("{text}"),
            Level::Success => println!("{}", text.green()),
            Level::Warning => println!("{}", text.yellow()),
            Level::Error => eprintln!("{}", text.red()),
            Level::Line => println!(),
        }
    }

    fn ask_text(&self, prompt: &str) -> anyhow::Result<Option<String>> {
        let answer = self.read_line(&format!("{prompt}: "))?;
        Ok(answer.filter(|a| !a.is_empty()))
    }

    fn ask_confirm(&self, prompt: &str, default: bool) -> anyhow::Result<bool> {
        let hint = if default { "[Y/n]" } else { "[y/N]" };
        let Some(answer) = self.read_line(&format!("{prompt} {hint} "))? else {
            return Ok(default);
        };
        Ok(match answer.to_lowercase().as_str() {
            "y" | "yes" => true,
            "n" | "no" => false,
            _ => default,
        })
    }

    fn ask_choice(&self, prompt: &str, choices: &[String]) -> anyhow::Result<Option<usize>> {
        if choices.is_empty() {
            return Ok(None);
        }

        for (i, choice) in choices.iter().enumerate() {
            println!("  {}. {choice}", i + 1);
        }

        loop {
            let Some(answer) = self.read_line(&format!("{prompt} [1-{}]: ", choices.len()))? else {
                return Ok(None);
            };
            if answer.is_empty() {
                return Ok(None);
            }
            match answer.parse::<usize>() {
                Ok(n) if (1..=choices.len()).contains(&n) => return Ok(Some(n - 1)),
                _ => self.warning(&format!("Please enter a number between 1 and {}", choices.len())),
            }
        }
    }
}
