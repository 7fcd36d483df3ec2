//! `TerminalReporter`, the terminal implementation of `ProgressReporter`.
//!
//! Application services emit progress through the port; this type turns the
//! events into terminal lines, or into spinner messages while a spinner is
//! active so the two do not interleave.

use indicatif::ProgressBar;
use owo_colors::OwoColorize as _;

use crate::application::ports::ProgressReporter;
use crate::output::OutputContext;

/// Terminal progress reporter that wraps an `OutputContext`.
///
/// - `step()` prints `"  → {message}"` (suppressed when `ctx.quiet`)
/// - `success()` prints `"  ✓ {message}"` (suppressed when `ctx.quiet`)
/// - `warn()` prints `"  ⚠ {message}"` (suppressed when `ctx.quiet`)
pub struct TerminalReporter<'a> {
    ctx: &'a OutputContext,
    spinner: Option<ProgressBar>,
}

impl<'a> TerminalReporter<'a> {
    #[must_use]
    pub fn new(ctx: &'a OutputContext) -> Self {
        Self { ctx, spinner: None }
    }

    /// Route `step()` messages into `spinner` instead of printing lines.
    #[must_use]
    pub fn with_spinner(ctx: &'a OutputContext, spinner: ProgressBar) -> Self {
        Self {
            ctx,
            spinner: Some(spinner),
        }
    }

    #[must_use]
    pub fn spinner(&self) -> Option<&ProgressBar> {
        self.spinner.as_ref()
    }
}

impl ProgressReporter for TerminalReporter<'_> {
    fn step(&self, message: &str) {
        if let Some(pb) = &self.spinner {
            pb.set_message(message.to_string());
            return;
        }
        if !self.ctx.quiet {
            println!("  {} {message}", "→".style(self.ctx.styles.info));
        }
    }

    fn success(&self, message: &str) {
        if let Some(pb) = &self.spinner {
            pb.println(format!("  ✓ {message}"));
            return;
        }
        self.ctx.success(message);
    }

    fn warn(&self, message: &str) {
        if let Some(pb) = &self.spinner {
            pb.println(format!("  ⚠ {message}"));
            return;
        }
        self.ctx.warn(message);
    }
}
