//! `fleetctl container-status`: pod and per-agent containers.

use std::process::ExitCode;

use anyhow::Result;

use crate::app::AppContext;
use crate::application::services::ContainerManager;

/// # Errors
///
/// Returns an error if the container engine cannot be run.
pub async fn run(app: &AppContext) -> Result<ExitCode> {
    let manager = ContainerManager::new(&app.runner, &app.config);
    let status = manager.pod_status().await?;
    app.renderer().render_pod_status(&status)?;
    Ok(ExitCode::SUCCESS)
}
