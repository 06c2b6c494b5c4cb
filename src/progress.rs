//! Per-stage progress reporting.
//!
//! One spinner per pipeline stage, grouped under a `MultiProgress`. In log-only mode
//! the bars are hidden and stage messages go to the log instead, for tail-friendly
//! output.

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::Duration;

/// Format duration in human-readable format
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs_f64();
    if secs < 60.0 {
        format!("{:.1}s", secs)
    } else {
        let mins = secs / 60.0;
        format!("{:.1}m", mins)
    }
}

#[derive(Clone)]
pub struct Progress {
    multi: MultiProgress,
    log_only: bool,
}

impl Progress {
    pub fn new(log_only: bool) -> Self {
        let multi = if log_only {
            MultiProgress::with_draw_target(ProgressDrawTarget::hidden())
        } else {
            MultiProgress::new()
        };
        Self { multi, log_only }
    }

    /// Draws nothing and logs nothing. Used by tests.
    pub fn hidden() -> Self {
        Self {
            multi: MultiProgress::with_draw_target(ProgressDrawTarget::hidden()),
            log_only: false,
        }
    }

    /// Adds the spinner of `stage`.
    pub fn lot(&self, stage: &'static str) -> Lot {
        let bar = self.multi.add(ProgressBar::new_spinner());
        if !self.log_only && !self.multi.is_hidden() {
            let style = ProgressStyle::default_spinner()
                .template("{prefix:>10.bold} {spinner} {wide_msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner());
            bar.set_style(style);
            bar.enable_steady_tick(Duration::from_millis(100));
        }
        bar.set_prefix(stage);
        Lot {
            stage,
            bar,
            log_only: self.log_only,
        }
    }

    /// Runs `f` with the bars cleared, for interactive input.
    pub fn suspend<R>(&self, f: impl FnOnce() -> R) -> R {
        self.multi.suspend(f)
    }
}

/// Status line of one stage
pub struct Lot {
    stage: &'static str,
    bar: ProgressBar,
    log_only: bool,
}

impl Lot {
    pub fn set(&self, message: impl Into<String>) {
        let message = message.into();
        if self.log_only {
            log::info!("[{}] {}", self.stage, message);
        }
        self.bar.set_message(message);
    }

    pub fn wipe(&self) {
        self.bar.set_message("");
    }

    /// Stops the spinner leaving `summary` on screen.
    pub fn close(&self, summary: impl Into<String>) {
        let summary = summary.into();
        if self.log_only {
            log::info!("[{}] {}", self.stage, summary);
        }
        self.bar.finish_with_message(summary);
    }
}

impl Drop for Lot {
    // a stage that failed leaves its last message on screen
    fn drop(&mut self) {
        if !self.bar.is_finished() {
            self.bar.abandon();
        }
    }
}
