//! `fleetctl restore <path|latest>`: replace the agent tree from a backup.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Args;

use crate::app::AppContext;
use crate::application::SilentReporter;
use crate::application::services::{RestoreOptions, RestoreOutcome, SecureBackupManager};
use crate::domain::backup::LATEST_POINTER;
use crate::domain::error::BackupError;
use crate::infra::fs::tree_checksum;
use crate::output::progress;
use crate::output::reporter::TerminalReporter;

#[derive(Args)]
pub struct RestoreArgs {
    /// Backup artifact, or `latest`
    pub backup: String,

    /// Validate the backup and list what would be restored
    #[arg(long)]
    pub dry_run: bool,

    /// Do not snapshot the current tree before restoring
    #[arg(long)]
    pub no_safety_backup: bool,
}

/// # Errors
///
/// Returns an error if the backup is missing or fails validation, or if
/// extraction fails (the message names any safety backup).
pub async fn run(args: &RestoreArgs, app: &AppContext) -> Result<ExitCode> {
    let manager = SecureBackupManager::new(&app.pipeline, &app.config, app.paths.clone(), app.operator.clone())?;
    let path = resolve(&args.backup, &manager)?;
    let options = RestoreOptions {
        create_safety_backup: !args.no_safety_backup,
        dry_run: args.dry_run,
    };

    if !options.dry_run
        && !app.confirm(&format!(
            "Replace {} with the contents of {}?",
            app.paths.ai_root.display(),
            path.display()
        ))?
    {
        app.output.info("Cancelled.");
        return Ok(ExitCode::SUCCESS);
    }

    let outcome = if app.output.show_progress() && !app.is_json() {
        let pb = progress::spinner("restoring...");
        let reporter = TerminalReporter::with_spinner(&app.output, pb.clone());
        let result = manager.restore_backup(&path, options, &reporter).await;
        match &result {
            Ok(RestoreOutcome::DryRun { .. }) => progress::finish_ok(&pb, "backup is valid"),
            Ok(RestoreOutcome::Restored { .. }) => progress::finish_ok(&pb, "restore complete"),
            Err(_) => progress::finish_error(&pb, "restore failed"),
        }
        result
    } else {
        manager.restore_backup(&path, options, &SilentReporter).await
    }?;

    let checksum = match &outcome {
        RestoreOutcome::Restored { .. } => restored_checksum(app),
        RestoreOutcome::DryRun { .. } => None,
    };
    app.renderer().render_restore(&path, &outcome, checksum.as_deref())?;
    Ok(ExitCode::SUCCESS)
}

fn resolve<P: crate::application::ports::PipelineRunner>(
    arg: &str,
    manager: &SecureBackupManager<'_, P>,
) -> Result<PathBuf> {
    if arg == LATEST_POINTER {
        return manager
            .latest()
            .ok_or_else(|| BackupError::NotFound(manager.backup_dir().join(LATEST_POINTER)).into());
    }
    Ok(PathBuf::from(arg))
}

fn restored_checksum(app: &AppContext) -> Option<String> {
    match tree_checksum(&app.paths.ai_root) {
        Ok(sum) => {
            tracing::info!(checksum = %sum, "restored tree checksum");
            Some(sum)
        }
        Err(e) => {
            tracing::warn!(error = %format!("{e:#}"), "could not checksum restored tree");
            None
        }
    }
}
