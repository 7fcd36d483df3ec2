//! `fleetctl contexts`: conversation contexts and the active pointer.

use std::process::ExitCode;

use anyhow::Result;
use clap::Args;
use fleet_common::Agent;

use crate::app::AppContext;
use crate::infra::history::ContextStore;

#[derive(Args)]
pub struct ContextsArgs {
    /// Agent whose history to read
    #[arg(long, default_value = "claude")]
    pub agent: Agent,

    /// Make this context the active one
    #[arg(long, value_name = "NAME")]
    pub set: Option<String>,
}

/// # Errors
///
/// Returns an error for an invalid context name or history I/O failures.
pub fn run(args: &ContextsArgs, app: &AppContext) -> Result<ExitCode> {
    let store = ContextStore::new(app.paths.history_dir(args.agent));
    if let Some(name) = &args.set {
        store.set_current(name)?;
        app.output.success(&format!("active {} context: {name}", args.agent));
        return Ok(ExitCode::SUCCESS);
    }
    let contexts = store.list()?;
    let current = store.current()?;
    app.renderer().render_contexts(&contexts, current.as_deref())?;
    Ok(ExitCode::SUCCESS)
}
