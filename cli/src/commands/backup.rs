//! `fleetctl backup`: encrypted snapshot of the agent tree.

use std::process::ExitCode;

use anyhow::Result;
use clap::Args;

use crate::app::AppContext;
use crate::application::SilentReporter;
use crate::application::services::{BackupOptions, SecureBackupManager};
use crate::output::progress;
use crate::output::reporter::TerminalReporter;

#[derive(Args)]
pub struct BackupArgs {
    /// Leave every agent's encrypted secret out of the archive
    #[arg(long)]
    pub no_secrets: bool,

    /// Skip the decrypt-and-list check of the new artifact
    #[arg(long)]
    pub no_validate: bool,
}

impl BackupArgs {
    fn options(&self) -> BackupOptions {
        BackupOptions {
            include_secrets: !self.no_secrets,
            validate: !self.no_validate,
        }
    }
}

/// # Errors
///
/// Returns an error if the key material is unusable, a pipeline stage fails,
/// or validation of the new artifact fails.
pub async fn run(args: &BackupArgs, app: &AppContext) -> Result<ExitCode> {
    let manager = SecureBackupManager::new(&app.pipeline, &app.config, app.paths.clone(), app.operator.clone())?;
    let options = args.options();

    let report = if app.output.show_progress() && !app.is_json() {
        let pb = progress::spinner("creating backup...");
        let reporter = TerminalReporter::with_spinner(&app.output, pb.clone());
        let result = manager.create_backup(options, &reporter).await;
        match &result {
            Ok(_) => progress::finish_ok(&pb, "backup created"),
            Err(_) => progress::finish_error(&pb, "backup failed"),
        }
        result
    } else {
        manager.create_backup(options, &SilentReporter).await
    }?;

    app.renderer().render_backup_report(&report)?;
    Ok(ExitCode::SUCCESS)
}
