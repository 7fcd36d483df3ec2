//! `fleetctl start|stop|restart`: pod lifecycle, or one agent container
//! with `--agent`.

use std::process::ExitCode;
use std::time::Duration;

use anyhow::Result;
use clap::Args;
use fleet_common::Agent;

use crate::app::AppContext;
use crate::application::services::ContainerManager;
use crate::domain::container::Transition;

/// Arguments shared by `start` and `restart`.
#[derive(Args, Default)]
pub struct TargetArgs {
    /// Act on one agent container instead of the whole pod
    #[arg(long)]
    pub agent: Option<Agent>,
}

/// Arguments for `stop`.
#[derive(Args)]
pub struct StopArgs {
    /// Act on one agent container instead of the whole pod
    #[arg(long)]
    pub agent: Option<Agent>,

    /// Seconds the engine waits before killing
    #[arg(long, short = 't', default_value_t = 10)]
    pub timeout: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Start,
    Stop,
    Restart,
}

fn describe(action: Action, target: &str, transition: Transition) -> String {
    match (action, transition) {
        (Action::Start, Transition::Applied) => format!("{target} started"),
        (Action::Start, Transition::Unchanged) => format!("{target} already running"),
        (Action::Stop, Transition::Applied) => format!("{target} stopped"),
        (Action::Stop, Transition::Unchanged) => format!("{target} already stopped"),
        (Action::Restart, _) => format!("{target} restarted"),
    }
}

/// # Errors
///
/// Returns an error if the target does not exist or the engine fails.
pub async fn start(args: &TargetArgs, app: &AppContext) -> Result<ExitCode> {
    let manager = ContainerManager::new(&app.runner, &app.config);
    let (target, transition) = match args.agent {
        Some(agent) => (agent.container_name().to_string(), manager.start_container(agent).await?),
        None => (format!("pod {}", manager.pod_name()), manager.start_pod().await?),
    };
    app.output.success(&describe(Action::Start, &target, transition));
    Ok(ExitCode::SUCCESS)
}

/// # Errors
///
/// Returns an error if the engine fails.
pub async fn stop(args: &StopArgs, app: &AppContext) -> Result<ExitCode> {
    let manager = ContainerManager::new(&app.runner, &app.config);
    let grace = Duration::from_secs(args.timeout);
    let (target, transition) = match args.agent {
        Some(agent) => (agent.container_name().to_string(), manager.stop_container(agent, grace).await?),
        None => (format!("pod {}", manager.pod_name()), manager.stop_pod(grace).await?),
    };
    app.output.success(&describe(Action::Stop, &target, transition));
    Ok(ExitCode::SUCCESS)
}

/// # Errors
///
/// Returns an error if the target does not exist or the engine fails.
pub async fn restart(args: &TargetArgs, app: &AppContext) -> Result<ExitCode> {
    let manager = ContainerManager::new(&app.runner, &app.config);
    let (target, transition) = match args.agent {
        Some(agent) => (agent.container_name().to_string(), manager.restart_container(agent).await?),
        None => (format!("pod {}", manager.pod_name()), manager.restart_pod().await?),
    };
    app.output.success(&describe(Action::Restart, &target, transition));
    Ok(ExitCode::SUCCESS)
}
