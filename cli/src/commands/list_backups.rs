//! `fleetctl list-backups`

use std::process::ExitCode;

use anyhow::Result;

use crate::app::AppContext;
use crate::application::services::BackupStore;

/// # Errors
///
/// Returns an error if the backup directory exists but cannot be read.
pub fn run(app: &AppContext) -> Result<ExitCode> {
    let store = BackupStore::new(app.paths.backup_dir.clone());
    let backups = store.list()?;
    app.renderer().render_backups(&backups)?;
    Ok(ExitCode::SUCCESS)
}
