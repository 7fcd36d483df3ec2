//! `fleetctl exec <agent> -- <command…>`: run a command in an agent container.

use std::io::Write as _;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Args;
use fleet_common::Agent;

use crate::app::AppContext;
use crate::application::services::ContainerManager;

/// Arguments for the exec command.
#[derive(Args)]
#[command(trailing_var_arg = true)]
pub struct ExecArgs {
    /// Agent whose container runs the command
    pub agent: Agent,

    /// Command and arguments to run in the container
    #[arg(required = true, allow_hyphen_values = true)]
    pub command: Vec<String>,
}

/// Run a command inside the container, passing its output and exit code through.
///
/// # Errors
///
/// Returns an error if the container is not running or the engine fails.
pub async fn run(args: &ExecArgs, app: &AppContext) -> Result<ExitCode> {
    let manager = ContainerManager::new(&app.runner, &app.config);
    let command: Vec<&str> = args.command.iter().map(String::as_str).collect();
    let out = manager
        .exec_in_container(args.agent, &command, None, false)
        .await?;
    std::io::stdout().write_all(&out.stdout).context("writing command output")?;
    std::io::stderr().write_all(&out.stderr).context("writing command output")?;

    let code = out.status.code().and_then(|c| u8::try_from(c).ok()).unwrap_or(1);
    Ok(ExitCode::from(code))
}
