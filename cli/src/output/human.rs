//! Human-readable terminal renderer.

use fleet_common::{Agent, BackupEntry, ContainerInfo, DeploymentState, PodStatus, StateSummary};
use owo_colors::OwoColorize as _;

use crate::application::services::{BackupReport, RestoreOutcome, SecretCheck};
use crate::domain::context::ContextMetadata;
use crate::domain::registry::Project;
use crate::output::OutputContext;

/// Renders domain types as human-readable terminal output using `OutputContext`.
pub struct HumanRenderer<'a> {
    ctx: &'a OutputContext,
}

impl<'a> HumanRenderer<'a> {
    #[must_use]
    pub fn new(ctx: &'a OutputContext) -> Self {
        Self { ctx }
    }

    fn check(&self, ok: bool, yes: &str, no: &str) {
        if ok {
            self.ctx.success(yes);
        } else {
            self.ctx.warn(no);
        }
    }

    pub fn render_backup_report(&self, report: &BackupReport) {
        self.ctx.success(&format!(
            "{} ({})",
            report.path.display(),
            format_size(report.size)
        ));
        if !report.metadata.include_secrets {
            self.ctx.warn("secrets were excluded from this backup");
        }
        if !report.metadata.validated {
            self.ctx.warn("backup not validated; `latest` was not moved");
        }
    }

    pub fn render_restore(&self, backup: &std::path::Path, outcome: &RestoreOutcome) {
        match outcome {
            RestoreOutcome::DryRun { files } => {
                self.ctx.info(&format!("{} entries would be restored:", files.len()));
                if !self.ctx.quiet {
                    for file in files {
                        println!("    {file}");
                    }
                }
            }
            RestoreOutcome::Restored { files, safety_backup } => {
                self.ctx.success(&format!(
                    "restored {} entries from {}",
                    files.len(),
                    backup.display()
                ));
                if let Some(safety) = safety_backup {
                    self.ctx.info(&format!("previous data saved to {}", safety.display()));
                }
            }
        }
    }

    /// Render the `status` snapshot.
    pub fn render_state(&self, state: &DeploymentState) {
        self.ctx.header("Deployment:");
        self.ctx.kv("State:", summary_display(state.summary()));
        println!();
        self.check(state.containers_running(), "Agent pod running", "Agent pod not running");
        self.check(state.age_key_exists(), "Age key present", "Age key missing");
        self.check(state.runtime_installed(), "Agent runtime installed", "Agent runtime not detected");
        self.check(state.history_dirs_exist(), "History directories present", "History directories missing");
        for agent in Agent::ALL {
            self.check(
                state.secret_configured(agent),
                &format!("{agent} secret configured"),
                &format!("{agent} secret missing"),
            );
        }
        if state.needs_secrets() && !self.ctx.quiet {
            println!();
            self.ctx.info("Set a key: fleetctl set-secret <agent>  (reads the key from stdin)");
        }
    }

    /// Render the pod and its containers.
    pub fn render_pod_status(&self, status: &PodStatus) {
        let pod_state = match (status.exists, status.running) {
            (false, _) => "absent",
            (true, true) => "running",
            (true, false) => "stopped",
        };
        self.ctx.kv("Pod:", &format!("{} ({pod_state})", status.name));
        if status.containers.is_empty() {
            self.ctx.info("No agent containers found");
            return;
        }
        println!();
        for info in &status.containers {
            self.render_container(info);
        }
    }

    fn render_container(&self, info: &ContainerInfo) {
        if self.ctx.quiet {
            return;
        }
        let styled = info
            .status
            .to_string()
            .style(self.ctx.styles.container_status(&info.status))
            .to_string();
        println!("  {:<16} {styled:<10} {}", info.name, info.image.style(self.ctx.styles.dim));
    }

    /// Render `list-backups`.
    pub fn render_backups(&self, backups: &[BackupEntry]) {
        if self.ctx.quiet {
            return;
        }
        if backups.is_empty() {
            println!("No backups found. Create one: fleetctl backup");
            return;
        }
        for b in backups {
            let latest = if b.is_latest {
                format!("  {}", "latest".style(self.ctx.styles.latest))
            } else {
                String::new()
            };
            let detail = b.metadata.as_ref().map_or_else(String::new, |m| {
                let secrets = if m.include_secrets { "with secrets" } else { "no secrets" };
                let validated = if m.validated { "validated" } else { "unvalidated" };
                format!("  ({secrets}, {validated})")
            });
            println!(
                "  {}  {:>9}  {}{}{latest}",
                b.name,
                format_size(b.size_bytes),
                b.modified.format("%Y-%m-%d %H:%M:%S").style(self.ctx.styles.dim),
                detail.style(self.ctx.styles.dim),
            );
        }
    }

    /// Render `verify-secrets`.
    pub fn render_secret_checks(&self, checks: &[SecretCheck]) {
        for c in checks {
            if c.ok() {
                self.ctx.success(&format!("{}: stored, 0600, decrypts", c.agent));
            } else if !c.exists {
                self.ctx.error(&format!("{0}: no secret stored (fleetctl set-secret {0})", c.agent));
            } else {
                let mut problems = Vec::new();
                if !c.permissions_ok {
                    problems.push("permissions are not 0600");
                }
                if !c.decryptable {
                    problems.push("does not decrypt");
                }
                self.ctx.error(&format!("{}: {}", c.agent, problems.join(", ")));
            }
        }
    }

    /// Render `projects list`.
    pub fn render_projects(&self, projects: &[(String, Project)]) {
        if self.ctx.quiet {
            return;
        }
        if projects.is_empty() {
            println!("No projects. Create one: fleetctl projects create <name> --agent <agent>");
            return;
        }
        for (name, p) in projects {
            println!(
                "  {name:<24} {:>3} contexts  {}  {}",
                p.conversations.len(),
                p.last_activity.format("%Y-%m-%d %H:%M").style(self.ctx.styles.dim),
                p.description,
            );
        }
    }

    /// Render `contexts`, marking the active one.
    pub fn render_contexts(&self, contexts: &[ContextMetadata], current: Option<&str>) {
        if self.ctx.quiet {
            return;
        }
        if contexts.is_empty() {
            println!("No contexts.");
            return;
        }
        for c in contexts {
            let marker = if current == Some(c.name.as_str()) { "*" } else { " " };
            let project = c.project.as_deref().unwrap_or("-");
            println!(
                "{marker} {:<24} {:>5} msgs  {:<16} {}",
                c.name,
                c.message_count,
                project,
                c.last_used.format("%Y-%m-%d %H:%M").style(self.ctx.styles.dim),
            );
        }
    }
}

fn summary_display(summary: StateSummary) -> &'static str {
    match summary {
        StateSummary::Deployed => "fully deployed",
        StateSummary::FreshInstall => "fresh install",
        StateSummary::NeedsSecrets => "needs secrets",
        StateSummary::Partial => "partially deployed",
    }
}

/// `1536` → `"1.5 KB"`.
#[must_use]
#[allow(clippy::cast_precision_loss)] // display only
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1} {}", UNITS[unit])
}
