//! Output formatting module

pub mod human;
pub mod json;
pub mod progress;
pub mod reporter;
pub mod styles;

use anyhow::Result;
use console::Term;
use fleet_common::{BackupEntry, DeploymentState, PodStatus};
use owo_colors::OwoColorize as _;

pub use human::HumanRenderer;
pub use json::JsonRenderer;
pub use reporter::TerminalReporter;
pub use styles::Styles;

use crate::application::services::{BackupReport, RestoreOutcome, SecretCheck};
use crate::domain::context::ContextMetadata;
use crate::domain::registry::Project;

/// Output context carrying styling and terminal state.
pub struct OutputContext {
    /// Stylesheet for colored output.
    pub styles: Styles,
    /// Whether stdout is a TTY.
    pub is_tty: bool,
    /// Whether to suppress non-error output.
    pub quiet: bool,
}

impl OutputContext {
    /// Create output context based on CLI flags and environment.
    #[must_use]
    pub fn new(no_color: bool, quiet: bool) -> Self {
        let is_tty = Term::stdout().is_term();
        let use_colors = !no_color && is_tty && std::env::var("NO_COLOR").is_err();

        let mut styles = Styles::default();
        if use_colors {
            styles.colorize();
        }

        Self {
            styles,
            is_tty,
            quiet,
        }
    }

    /// Check if progress indicators should be shown.
    #[must_use]
    pub fn show_progress(&self) -> bool {
        self.is_tty && !self.quiet
    }

    /// Print a success message prefixed with `✓`. Suppressed when `quiet`.
    pub fn success(&self, msg: &str) {
        if !self.quiet {
            println!("  {} {msg}", "✓".style(self.styles.success));
        }
    }

    /// Print a warning message prefixed with `⚠`. Suppressed when `quiet`.
    pub fn warn(&self, msg: &str) {
        if !self.quiet {
            println!("  {} {msg}", "⚠".style(self.styles.warning));
        }
    }

    /// Print an error message prefixed with `✗` to stderr. Never suppressed.
    pub fn error(&self, msg: &str) {
        eprintln!("  {} {msg}", "✗".style(self.styles.error));
    }

    /// Print an info message prefixed with `ℹ`. Suppressed when `quiet`.
    pub fn info(&self, msg: &str) {
        if !self.quiet {
            println!("  {} {msg}", "ℹ".style(self.styles.info));
        }
    }

    /// Print a section header. Suppressed when `quiet`.
    pub fn header(&self, msg: &str) {
        if !self.quiet {
            println!("  {}", msg.style(self.styles.header));
        }
    }

    /// Print a key-value pair with the key dimmed. Suppressed when `quiet`.
    pub fn kv(&self, key: &str, value: &str) {
        if !self.quiet {
            println!("  {}  {value}", key.style(self.styles.dim));
        }
    }
}

/// Human or JSON rendering, chosen once per invocation from `--json`.
pub enum Renderer<'a> {
    Human(HumanRenderer<'a>),
    Json(JsonRenderer),
}

impl Renderer<'_> {
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_state(&self, state: &DeploymentState) -> Result<()> {
        match self {
            Self::Human(h) => {
                h.render_state(state);
                Ok(())
            }
            Self::Json(j) => j.render(&serde_json::json!({
                "summary": state.summary(),
                "state": state,
                "is_fully_deployed": state.is_fully_deployed(),
                "needs_secrets": state.needs_secrets(),
                "is_fresh_install": state.is_fresh_install(),
            })),
        }
    }

    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_pod_status(&self, status: &PodStatus) -> Result<()> {
        match self {
            Self::Human(h) => {
                h.render_pod_status(status);
                Ok(())
            }
            Self::Json(j) => j.render(status),
        }
    }

    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_backups(&self, backups: &[BackupEntry]) -> Result<()> {
        match self {
            Self::Human(h) => {
                h.render_backups(backups);
                Ok(())
            }
            Self::Json(j) => j.render(backups),
        }
    }

    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_backup_report(&self, report: &BackupReport) -> Result<()> {
        match self {
            Self::Human(h) => {
                h.render_backup_report(report);
                Ok(())
            }
            Self::Json(j) => j.render(&serde_json::json!({
                "path": report.path,
                "size_bytes": report.size,
                "metadata": report.metadata,
            })),
        }
    }

    /// `checksum` is the restored tree's digest, when one was taken.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_restore(
        &self,
        backup: &std::path::Path,
        outcome: &RestoreOutcome,
        checksum: Option<&str>,
    ) -> Result<()> {
        match self {
            Self::Human(h) => {
                h.render_restore(backup, outcome);
                Ok(())
            }
            Self::Json(j) => {
                let body = match outcome {
                    RestoreOutcome::DryRun { files } => serde_json::json!({
                        "result": "dry_run",
                        "backup": backup,
                        "files": files,
                    }),
                    RestoreOutcome::Restored { files, safety_backup } => serde_json::json!({
                        "result": "restored",
                        "backup": backup,
                        "files": files.len(),
                        "safety_backup": safety_backup,
                        "checksum": checksum,
                    }),
                };
                j.render(&body)
            }
        }
    }

    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_secret_checks(&self, checks: &[SecretCheck]) -> Result<()> {
        match self {
            Self::Human(h) => {
                h.render_secret_checks(checks);
                Ok(())
            }
            Self::Json(j) => j.render(checks),
        }
    }

    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_projects(&self, projects: &[(String, Project)]) -> Result<()> {
        match self {
            Self::Human(h) => {
                h.render_projects(projects);
                Ok(())
            }
            Self::Json(j) => {
                let map: serde_json::Map<String, serde_json::Value> = projects
                    .iter()
                    .map(|(n, p)| Ok((n.clone(), serde_json::to_value(p)?)))
                    .collect::<Result<_, serde_json::Error>>()?;
                j.render(&map)
            }
        }
    }

    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_contexts(&self, contexts: &[ContextMetadata], current: Option<&str>) -> Result<()> {
        match self {
            Self::Human(h) => {
                h.render_contexts(contexts, current);
                Ok(())
            }
            Self::Json(j) => j.render(&serde_json::json!({
                "current": current,
                "contexts": contexts,
            })),
        }
    }
}
