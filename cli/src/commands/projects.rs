//! `fleetctl projects`: the per-agent project registry.

use std::process::ExitCode;

use anyhow::Result;
use clap::{Args, Subcommand};
use fleet_common::Agent;

use crate::app::AppContext;
use crate::infra::registry::RegistryStore;

#[derive(Args)]
pub struct ProjectsArgs {
    /// Agent whose registry to use
    #[arg(long, global = true, default_value = "claude")]
    pub agent: Agent,

    #[command(subcommand)]
    pub command: ProjectsCommand,
}

#[derive(Subcommand)]
pub enum ProjectsCommand {
    /// List projects, most recently active first
    List,
    /// Show one project
    Show { name: String },
    /// Create a project
    Create {
        name: String,
        #[arg(long, short = 'd', default_value = "")]
        description: String,
    },
    /// Link a conversation context to a project
    Link { project: String, context: String },
    /// Mark a project as active now
    Touch { name: String },
}

/// # Errors
///
/// Returns an error for invalid names, unknown projects, or registry I/O
/// failures.
pub fn run(args: &ProjectsArgs, app: &AppContext) -> Result<ExitCode> {
    let store = RegistryStore::new(app.paths.history_dir(args.agent));
    match &args.command {
        ProjectsCommand::List => {
            let projects = store.list_projects()?;
            app.renderer().render_projects(&projects)?;
        }
        ProjectsCommand::Show { name } => {
            let Some(project) = store.get_project(name)? else {
                anyhow::bail!("project '{name}' not found for {}", args.agent);
            };
            app.renderer().render_projects(&[(name.clone(), project)])?;
        }
        ProjectsCommand::Create { name, description } => {
            if store.create_project(name, description)? {
                app.output.success(&format!("project '{name}' created"));
            } else {
                app.output.warn(&format!("project '{name}' already exists"));
            }
        }
        ProjectsCommand::Link { project, context } => {
            if store.get_project(project)?.is_none() {
                anyhow::bail!("project '{project}' not found for {}", args.agent);
            }
            if store.link_context(project, context)? {
                app.output.success(&format!("context '{context}' linked to '{project}'"));
            } else {
                app.output.info(&format!("context '{context}' already linked to '{project}'"));
            }
        }
        ProjectsCommand::Touch { name } => {
            if !store.touch(name)? {
                anyhow::bail!("project '{name}' not found for {}", args.agent);
            }
            app.output.success(&format!("project '{name}' marked active"));
        }
    }
    Ok(ExitCode::SUCCESS)
}
