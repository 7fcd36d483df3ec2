//! Spinners for the slow pipelines (backup, restore).

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", " "];

/// Apply `template`, keeping indicatif's default look if it fails to parse.
fn styled(pb: &ProgressBar, template: &str) {
    match ProgressStyle::default_spinner().template(template) {
        Ok(style) => pb.set_style(style.tick_strings(TICKS)),
        Err(e) => tracing::debug!(error = %e, "spinner template rejected"),
    }
}

#[must_use]
pub fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    styled(&pb, "  {spinner:.cyan} {msg}");
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

fn finish(pb: &ProgressBar, mark: &'static str, msg: &str) {
    styled(pb, "  {prefix} {msg}");
    pb.set_prefix(mark);
    pb.finish_with_message(msg.to_string());
}

pub fn finish_ok(pb: &ProgressBar, msg: &str) {
    finish(pb, "✓", msg);
}

/// Leaves the failed line on screen; the error itself is printed by `main`.
pub fn finish_error(pb: &ProgressBar, msg: &str) {
    finish(pb, "✗", msg);
}
