//! CLI argument parsing with clap derive

use std::process::ExitCode;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};

use crate::app::{AppContext, AppFlags};
use crate::commands;

/// Operate a pod of AI agent containers: lifecycle, secrets, and encrypted backups
#[derive(Parser)]
#[command(
    name = "fleetctl",
    version,
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Answer yes to confirmation prompts
    #[arg(short = 'y', long, global = true)]
    pub yes: bool,

    /// Log more detail to stderr (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show deployment state
    Status,

    /// Show pod and container status
    ContainerStatus,

    /// Start the pod, or one agent container
    Start(commands::lifecycle::TargetArgs),

    /// Stop the pod, or one agent container
    Stop(commands::lifecycle::StopArgs),

    /// Restart the pod, or one agent container
    Restart(commands::lifecycle::TargetArgs),

    /// Run a command inside an agent container
    Exec(commands::exec::ExecArgs),

    /// Encrypt and store an agent API key read from stdin
    SetSecret(commands::set_secret::SetSecretArgs),

    /// Check every agent's stored secret
    VerifySecrets,

    /// Create an encrypted backup of all agent data
    Backup(commands::backup::BackupArgs),

    /// List backups, newest first
    ListBackups,

    /// Restore agent data from a backup
    Restore(commands::restore::RestoreArgs),

    /// Delete a backup
    DeleteBackup(commands::delete_backup::DeleteBackupArgs),

    /// Manage an agent's projects
    Projects(commands::projects::ProjectsArgs),

    /// List or switch an agent's conversation contexts
    Contexts(commands::contexts::ContextsArgs),
}

impl Cli {
    /// Log filter for `-v` occurrences, used when `RUST_LOG` is unset.
    #[must_use]
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        }
    }

    /// Execute the CLI command.
    ///
    /// # Errors
    ///
    /// Returns an error if the context cannot be built or the command fails.
    pub async fn run(self) -> Result<ExitCode> {
        let flags = AppFlags {
            no_color: self.no_color,
            quiet: self.quiet,
            json: self.json,
            yes: self.yes,
        };
        let app = AppContext::new(&flags)?;

        match self.command {
            Command::Status => commands::status::run(&app).await,
            Command::ContainerStatus => commands::container_status::run(&app).await,
            Command::Start(args) => commands::lifecycle::start(&args, &app).await,
            Command::Stop(args) => commands::lifecycle::stop(&args, &app).await,
            Command::Restart(args) => commands::lifecycle::restart(&args, &app).await,
            Command::Exec(args) => commands::exec::run(&args, &app).await,
            Command::SetSecret(args) => commands::set_secret::run(&args, &app).await,
            Command::VerifySecrets => commands::verify_secrets::run(&app).await,
            Command::Backup(args) => commands::backup::run(&args, &app).await,
            Command::ListBackups => commands::list_backups::run(&app),
            Command::Restore(args) => commands::restore::run(&args, &app).await,
            Command::DeleteBackup(args) => commands::delete_backup::run(&args, &app),
            Command::Projects(args) => commands::projects::run(&args, &app),
            Command::Contexts(args) => commands::contexts::run(&args, &app),
        }
    }
}
