//! `fleetctl delete-backup <path>`

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Args;

use crate::app::AppContext;
use crate::application::services::BackupStore;

#[derive(Args)]
pub struct DeleteBackupArgs {
    /// Backup artifact to delete
    pub path: PathBuf,
}

/// # Errors
///
/// Returns an error if the artifact does not exist or cannot be removed.
pub fn run(args: &DeleteBackupArgs, app: &AppContext) -> Result<ExitCode> {
    let store = BackupStore::new(app.paths.backup_dir.clone());
    if !args.path.is_file() {
        return Err(crate::domain::error::BackupError::NotFound(args.path.clone()).into());
    }
    if !app.confirm(&format!("Delete backup {}?", args.path.display()))? {
        app.output.info("Cancelled.");
        return Ok(ExitCode::SUCCESS);
    }
    store.delete(&args.path)?;
    app.output.success(&format!("deleted {}", args.path.display()));
    Ok(ExitCode::SUCCESS)
}
