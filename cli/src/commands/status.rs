//! `fleetctl status`: deployment state snapshot.

use std::process::ExitCode;

use anyhow::Result;

use crate::app::AppContext;
use crate::application::services::StateDetector;

/// Run `fleetctl status`. Always succeeds: probes degrade to "not present".
///
/// # Errors
///
/// Returns an error only if JSON serialization fails.
pub async fn run(app: &AppContext) -> Result<ExitCode> {
    let detector = StateDetector::new(&app.probe_runner, &app.config, app.paths.clone());
    let state = detector.detect().await;
    app.renderer().render_state(&state)?;
    Ok(ExitCode::SUCCESS)
}
