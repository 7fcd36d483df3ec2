//! Pod and per-container lifecycle through the container engine CLI.
//!
//! Every engine call carries an explicit timeout. Lifecycle requests are
//! idempotent: asking for the state a container is already in issues no
//! command and reports [`Transition::Unchanged`].

use std::process::Output;
use std::time::Duration;

use anyhow::Result;
use fleet_common::{Agent, ContainerInfo, PodStatus};

use crate::application::ports::CommandRunner;
use crate::domain::config::{EngineSettings, FleetConfig};
use crate::domain::container::{
    INSPECT_FORMAT, Transition, names_output_contains, parse_inspect_record, pod_status_is_running,
};
use crate::domain::error::{CommandError, ContainerError};

pub struct ContainerManager<'a, R: CommandRunner> {
    runner: &'a R,
    engine: EngineSettings,
    timeout: Duration,
}

/// Translate process-layer failures into container errors naming the command.
fn map_engine_error(err: anyhow::Error, program: &str, command: &str) -> anyhow::Error {
    match err.downcast_ref::<CommandError>() {
        Some(CommandError::ProgramNotFound(_)) => ContainerError::EngineNotFound(program.to_string()).into(),
        Some(CommandError::TimedOut { secs, .. }) => ContainerError::TimedOut {
            command: command.to_string(),
            secs: *secs,
        }
        .into(),
        _ => err.context(format!("running {command}")),
    }
}

impl<'a, R: CommandRunner> ContainerManager<'a, R> {
    #[must_use]
    pub fn new(runner: &'a R, config: &FleetConfig) -> Self {
        Self {
            runner,
            engine: config.engine_settings(),
            timeout: config.timeouts.lifecycle(),
        }
    }

    #[must_use]
    pub fn pod_name(&self) -> &str {
        &self.engine.pod_name
    }

    fn command_line(&self, args: &[&str]) -> String {
        format!("{} {}", self.engine.program, args.join(" "))
    }

    async fn engine(&self, args: &[&str], timeout: Duration) -> Result<Output> {
        self.runner
            .run_with_timeout(&self.engine.program, args, timeout)
            .await
            .map_err(|e| map_engine_error(e, &self.engine.program, &self.command_line(args)))
    }

    /// Run a state-changing command; a non-zero exit is `CommandFailed`.
    async fn mutate(&self, args: &[&str], timeout: Duration) -> Result<()> {
        let out = self.engine(args, timeout).await?;
        if !out.status.success() {
            return Err(ContainerError::CommandFailed {
                command: self.command_line(args),
                stderr: String::from_utf8_lossy(&out.stderr).trim().to_string(),
            }
            .into());
        }
        Ok(())
    }

    // ── Pod queries ──────────────────────────────────────────────────────────

    /// # Errors
    ///
    /// Returns an error if the engine cannot be run.
    pub async fn pod_exists(&self) -> Result<bool> {
        let out = self.engine(&["pod", "exists", self.engine.pod_name.as_str()], self.timeout).await?;
        Ok(out.status.success())
    }

    /// # Errors
    ///
    /// Returns an error if the engine cannot be run.
    pub async fn is_pod_running(&self) -> Result<bool> {
        let filter = format!("name={}", self.engine.pod_name);
        let out = self
            .engine(&["pod", "ps", "--filter", filter.as_str(), "--format", "{{.Status}}"], self.timeout)
            .await?;
        Ok(out.status.success() && pod_status_is_running(&String::from_utf8_lossy(&out.stdout)))
    }

    // ── Container queries ────────────────────────────────────────────────────

    /// # Errors
    ///
    /// Returns an error if the engine cannot be run.
    pub async fn container_exists(&self, agent: Agent) -> Result<bool> {
        let out = self
            .engine(&["container", "exists", agent.container_name()], self.timeout)
            .await?;
        Ok(out.status.success())
    }

    /// # Errors
    ///
    /// Returns an error if the engine cannot be run.
    pub async fn is_container_running(&self, agent: Agent) -> Result<bool> {
        let name = agent.container_name();
        let filter = format!("name={name}");
        let out = self
            .engine(&["ps", "--filter", filter.as_str(), "--format", "{{.Names}}"], self.timeout)
            .await?;
        Ok(out.status.success() && names_output_contains(&String::from_utf8_lossy(&out.stdout), name))
    }

    // ── Container lifecycle ──────────────────────────────────────────────────

    /// # Errors
    ///
    /// [`ContainerError::NotFound`] if the container does not exist, or any
    /// engine failure.
    pub async fn start_container(&self, agent: Agent) -> Result<Transition> {
        let name = agent.container_name();
        if !self.container_exists(agent).await? {
            return Err(ContainerError::NotFound(name.to_string()).into());
        }
        if self.is_container_running(agent).await? {
            tracing::info!(container = name, "already running");
            return Ok(Transition::Unchanged);
        }
        self.mutate(&["start", name], self.timeout).await?;
        tracing::info!(container = name, "started");
        Ok(Transition::Applied)
    }

    /// Stop with a grace period of `grace` before the engine kills it.
    ///
    /// # Errors
    ///
    /// Returns an error on engine failure.
    pub async fn stop_container(&self, agent: Agent, grace: Duration) -> Result<Transition> {
        let name = agent.container_name();
        if !self.is_container_running(agent).await? {
            tracing::info!(container = name, "already stopped");
            return Ok(Transition::Unchanged);
        }
        let secs = grace.as_secs().to_string();
        self.mutate(&["stop", "-t", secs.as_str(), name], self.timeout + grace).await?;
        tracing::info!(container = name, "stopped");
        Ok(Transition::Applied)
    }

    /// # Errors
    ///
    /// [`ContainerError::NotFound`] if the container does not exist, or any
    /// engine failure.
    pub async fn restart_container(&self, agent: Agent) -> Result<Transition> {
        let name = agent.container_name();
        if !self.container_exists(agent).await? {
            return Err(ContainerError::NotFound(name.to_string()).into());
        }
        self.mutate(&["restart", name], self.timeout).await?;
        tracing::info!(container = name, "restarted");
        Ok(Transition::Applied)
    }

    /// Run `command` inside the agent's container.
    ///
    /// With `check`, a non-zero exit is an error; otherwise the raw output is
    /// returned whatever the exit status.
    ///
    /// # Errors
    ///
    /// [`ContainerError::NotRunning`] without issuing the exec when the
    /// container is not running; [`ContainerError::CommandFailed`] when
    /// `check` is set and the command fails.
    pub async fn exec_in_container(
        &self,
        agent: Agent,
        command: &[&str],
        timeout: Option<Duration>,
        check: bool,
    ) -> Result<Output> {
        let name = agent.container_name();
        if !self.is_container_running(agent).await? {
            return Err(ContainerError::NotRunning(name.to_string()).into());
        }
        let mut args = vec!["exec", name];
        args.extend_from_slice(command);
        let out = self.engine(&args, timeout.unwrap_or(self.timeout)).await?;
        if check && !out.status.success() {
            return Err(ContainerError::CommandFailed {
                command: self.command_line(&args),
                stderr: String::from_utf8_lossy(&out.stderr).trim().to_string(),
            }
            .into());
        }
        Ok(out)
    }

    // ── Pod lifecycle ────────────────────────────────────────────────────────

    /// # Errors
    ///
    /// [`ContainerError::NotFound`] if the pod does not exist, or any engine failure.
    pub async fn start_pod(&self) -> Result<Transition> {
        let pod = self.engine.pod_name.as_str();
        if !self.pod_exists().await? {
            return Err(ContainerError::NotFound(format!("pod {pod}")).into());
        }
        if self.is_pod_running().await? {
            tracing::info!(pod, "pod already running");
            return Ok(Transition::Unchanged);
        }
        self.mutate(&["pod", "start", pod], self.timeout).await?;
        tracing::info!(pod, "pod started");
        Ok(Transition::Applied)
    }

    /// An absent pod counts as stopped.
    ///
    /// # Errors
    ///
    /// Returns an error on engine failure.
    pub async fn stop_pod(&self, grace: Duration) -> Result<Transition> {
        let pod = self.engine.pod_name.as_str();
        if !self.pod_exists().await? || !self.is_pod_running().await? {
            tracing::info!(pod, "pod already stopped");
            return Ok(Transition::Unchanged);
        }
        let secs = grace.as_secs().to_string();
        self.mutate(&["pod", "stop", "-t", secs.as_str(), pod], self.timeout + grace).await?;
        tracing::info!(pod, "pod stopped");
        Ok(Transition::Applied)
    }

    /// # Errors
    ///
    /// [`ContainerError::NotFound`] if the pod does not exist, or any engine failure.
    pub async fn restart_pod(&self) -> Result<Transition> {
        let pod = self.engine.pod_name.as_str();
        if !self.pod_exists().await? {
            return Err(ContainerError::NotFound(format!("pod {pod}")).into());
        }
        self.mutate(&["pod", "restart", pod], self.timeout).await?;
        tracing::info!(pod, "pod restarted");
        Ok(Transition::Applied)
    }

    // ── Inspection ───────────────────────────────────────────────────────────

    /// `None` when the container is missing or its record cannot be parsed.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine cannot be run.
    pub async fn get_container_info(&self, agent: Agent) -> Result<Option<ContainerInfo>> {
        let name = agent.container_name();
        if !self.container_exists(agent).await? {
            return Ok(None);
        }
        let out = self
            .engine(&["inspect", name, "--format", INSPECT_FORMAT], self.timeout)
            .await?;
        if !out.status.success() {
            tracing::warn!(container = name, "inspect failed");
            return Ok(None);
        }
        let record = String::from_utf8_lossy(&out.stdout);
        let info = parse_inspect_record(&record);
        if info.is_none() {
            tracing::warn!(container = name, record = %record.trim(), "unparsable inspect record");
        }
        Ok(info)
    }

    /// Info for every agent whose container exists, in agent order.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine cannot be run.
    pub async fn list_all_containers(&self) -> Result<Vec<ContainerInfo>> {
        let mut all = Vec::new();
        for agent in Agent::ALL {
            if let Some(info) = self.get_container_info(agent).await? {
                all.push(info);
            }
        }
        Ok(all)
    }

    /// Pod plus containers, for `container-status`.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine cannot be run.
    pub async fn pod_status(&self) -> Result<PodStatus> {
        let exists = self.pod_exists().await?;
        let running = exists && self.is_pod_running().await?;
        Ok(PodStatus {
            name: self.engine.pod_name.clone(),
            exists,
            running,
            containers: self.list_all_containers().await?,
        })
    }
}
