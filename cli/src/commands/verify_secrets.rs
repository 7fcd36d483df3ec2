//! `fleetctl verify-secrets`: check every agent's stored secret.

use std::process::ExitCode;

use anyhow::Result;

use crate::app::AppContext;
use crate::application::services::SecretsManager;

/// Exits 1 unless every agent has a stored secret that is 0600 and decrypts.
///
/// # Errors
///
/// Returns an error if the key material is unusable.
pub async fn run(app: &AppContext) -> Result<ExitCode> {
    let manager = SecretsManager::new(&app.pipeline, &app.config, app.paths.clone(), app.operator.clone())?;
    let checks = manager.verify_all().await;
    app.renderer().render_secret_checks(&checks)?;
    let broken = checks.iter().any(|c| !c.ok());
    Ok(if broken { ExitCode::FAILURE } else { ExitCode::SUCCESS })
}
