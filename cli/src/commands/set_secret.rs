//! `fleetctl set-secret <agent>`: encrypt and store an agent's API key.
//!
//! The key is read from stdin only. It is never accepted as an argument, so
//! it cannot end up in shell history or the process list.

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Args;
use fleet_common::Agent;
use tokio::io::AsyncReadExt as _;

use crate::app::AppContext;
use crate::application::services::SecretsManager;

#[derive(Args)]
pub struct SetSecretArgs {
    /// Agent the key belongs to
    pub agent: Agent,
}

/// Read a secret from stdin: the first line, without its line ending.
///
/// # Errors
///
/// Returns an error if stdin cannot be read or holds no secret.
pub async fn read_secret_from_stdin() -> Result<String> {
    let mut buf = String::new();
    tokio::io::stdin()
        .read_to_string(&mut buf)
        .await
        .context("reading secret from stdin")?;
    let secret = first_line(&buf);
    anyhow::ensure!(!secret.is_empty(), "no secret provided on stdin");
    Ok(secret.to_string())
}

fn first_line(input: &str) -> &str {
    input.lines().next().unwrap_or("").trim()
}

/// # Errors
///
/// Returns an error if the key material is unusable, the secret has the wrong
/// format, or encryption fails.
pub async fn run(args: &SetSecretArgs, app: &AppContext) -> Result<ExitCode> {
    let manager = SecretsManager::new(&app.pipeline, &app.config, app.paths.clone(), app.operator.clone())?;
    if !app.output.quiet && app.output.is_tty {
        eprintln!("Paste the {} API key, then press Enter and Ctrl-D:", args.agent);
    }
    let secret = read_secret_from_stdin().await?;
    let path = manager.encrypt_secret(args.agent, &secret).await?;
    drop(secret);
    app.output.success(&format!("{} secret stored at {}", args.agent, path.display()));
    Ok(ExitCode::SUCCESS)
}
