//! Interactive input used by reconciliation and manual decisions.

use std::collections::VecDeque;
use std::io::{BufRead, Write};
use std::sync::Mutex;

use crate::progress::Progress;

pub trait Prompt: Send + Sync {
    /// Shows an informational line.
    fn show(&self, line: &str);
    /// Shows `message` and returns the answer without its line terminator,
    /// or `None` once input is closed.
    fn read_line(&self, message: &str) -> Option<String>;
}

/// Outcome of a numbered selection
#[derive(Debug, PartialEq, Eq)]
pub enum Choice {
    /// Zero-based position of the picked option
    Picked(usize),
    Cancelled,
    Invalid(String),
}

/// Yes/no question; anything other than an answer starting with `y` is a no.
pub fn confirm(prompt: &dyn Prompt, question: &str) -> bool {
    prompt
        .read_line(&format!("{} [y/n]: ", question))
        .map_or(false, |answer| answer.trim().to_lowercase().starts_with('y'))
}

/// Lists `options` numbered from 1 and reads a pick. Empty picks the first, `0` or
/// closed input cancels.
pub fn select(prompt: &dyn Prompt, message: &str, options: &[String]) -> Choice {
    for (position, option) in options.iter().enumerate() {
        prompt.show(&format!("[{}] {}", position + 1, option));
    }
    let Some(answer) = prompt.read_line(&format!("{} [1]: ", message)) else {
        return Choice::Cancelled;
    };
    let answer = answer.trim();
    if answer.is_empty() {
        return if options.is_empty() {
            Choice::Cancelled
        } else {
            Choice::Picked(0)
        };
    }
    match answer.parse::<usize>() {
        Ok(0) => Choice::Cancelled,
        Ok(n) if n <= options.len() => Choice::Picked(n - 1),
        _ => Choice::Invalid(answer.to_string()),
    }
}

// ============================================================================
// Terminal
// ============================================================================

/// Reads from stdin with the progress bars suspended.
pub struct TerminalPrompt {
    progress: Progress,
}

impl TerminalPrompt {
    pub fn new(progress: Progress) -> Self {
        Self { progress }
    }
}

impl Prompt for TerminalPrompt {
    fn show(&self, line: &str) {
        self.progress.suspend(|| println!("{}", line));
    }

    fn read_line(&self, message: &str) -> Option<String> {
        self.progress.suspend(|| {
            let mut stdout = std::io::stdout();
            let _ = write!(stdout, "{}", message);
            let _ = stdout.flush();

            let mut answer = String::new();
            match std::io::stdin().lock().read_line(&mut answer) {
                Ok(0) => {
                    log::info!("input closed");
                    None
                }
                Ok(_) => Some(answer.trim_end_matches(['\r', '\n']).to_string()),
                Err(err) => {
                    log::warn!("cannot read answer: {}", err);
                    None
                }
            }
        })
    }
}

// ============================================================================
// Scripted
// ============================================================================

/// Replays canned answers in order, then behaves like closed input.
#[derive(Default)]
pub struct ScriptedPrompt {
    answers: Mutex<VecDeque<String>>,
    shown: Mutex<Vec<String>>,
}

impl ScriptedPrompt {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: Mutex::new(answers.into_iter().map(Into::into).collect()),
            shown: Mutex::new(Vec::new()),
        }
    }

    /// Lines passed to `show` so far.
    pub fn shown(&self) -> Vec<String> {
        self.shown.lock().map(|lines| lines.clone()).unwrap_or_default()
    }

    pub fn remaining(&self) -> usize {
        self.answers.lock().map(|answers| answers.len()).unwrap_or_default()
    }
}

impl Prompt for ScriptedPrompt {
    fn show(&self, line: &str) {
        if let Ok(mut shown) = self.shown.lock() {
            shown.push(line.to_string());
        }
    }

    fn read_line(&self, _message: &str) -> Option<String> {
        self.answers.lock().ok().and_then(|mut answers| answers.pop_front())
    }
}
