//! Read-only snapshot of the deployment.
//!
//! Five independent probes run concurrently. Each is bounded by the probe
//! timeout and degrades to `false` on any error; `detect` never fails.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use fleet_common::{Agent, DeploymentState};

use crate::application::ports::CommandRunner;
use crate::domain::config::{DeploymentPaths, EngineSettings, FleetConfig};
use crate::domain::error::StateError;

pub struct StateDetector<'a, R: CommandRunner> {
    runner: &'a R,
    engine: EngineSettings,
    paths: DeploymentPaths,
    runtime_probe: Vec<String>,
    timeout: Duration,
}

impl<'a, R: CommandRunner> StateDetector<'a, R> {
    #[must_use]
    pub fn new(runner: &'a R, config: &FleetConfig, paths: DeploymentPaths) -> Self {
        Self {
            runner,
            engine: config.engine_settings(),
            paths,
            runtime_probe: config.runtime_probe.clone(),
            timeout: config.timeouts.probe(),
        }
    }

    pub async fn detect(&self) -> DeploymentState {
        let (containers_running, age_key_exists, secrets, history_dirs_exist, runtime_installed) = tokio::join!(
            self.probe_pod(),
            self.probe_key(),
            self.probe_secrets(),
            self.probe_history(),
            self.probe_runtime(),
        );
        let state = DeploymentState::new(
            containers_running,
            age_key_exists,
            runtime_installed,
            history_dirs_exist,
            secrets,
        );
        tracing::debug!(?state, "deployment state detected");
        state
    }

    async fn probe_pod(&self) -> bool {
        let args = ["pod", "exists", self.engine.pod_name.as_str()];
        self.command_probe("containers", &args).await
    }

    async fn probe_runtime(&self) -> bool {
        let mut args = vec!["exec", Agent::Claude.container_name()];
        args.extend(self.runtime_probe.iter().map(String::as_str));
        self.command_probe("runtime", &args).await
    }

    async fn probe_key(&self) -> bool {
        let key = self.paths.key_path.clone();
        self.fs_probe("key_material", move || key.exists()).await
    }

    async fn probe_secrets(&self) -> BTreeMap<Agent, bool> {
        let paths: Vec<(Agent, PathBuf)> = Agent::ALL
            .iter()
            .map(|&a| (a, self.paths.secret_path(a)))
            .collect();
        self.fs_probe("secrets", move || {
            paths.into_iter().map(|(a, p)| (a, p.is_file())).collect()
        })
        .await
    }

    async fn probe_history(&self) -> bool {
        let root = self.paths.ai_root.clone();
        let dirs: Vec<PathBuf> = Agent::ALL.iter().map(|&a| self.paths.history_dir(a)).collect();
        self.fs_probe("history", move || root.is_dir() && dirs.iter().all(|d| d.is_dir()))
            .await
    }

    async fn command_probe(&self, probe: &'static str, args: &[&str]) -> bool {
        match self
            .runner
            .run_with_timeout(&self.engine.program, args, self.timeout)
            .await
        {
            Ok(out) => out.status.success(),
            Err(e) => {
                let err = StateError::ProbeFailed {
                    probe,
                    reason: format!("{e:#}"),
                };
                tracing::debug!(error = %err, "probe degraded to false");
                false
            }
        }
    }

    /// Run a blocking filesystem check on the blocking pool under the probe timeout.
    async fn fs_probe<T, F>(&self, probe: &'static str, check: F) -> T
    where
        T: Default + Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        let err = match tokio::time::timeout(self.timeout, tokio::task::spawn_blocking(check)).await {
            Ok(Ok(value)) => return value,
            Ok(Err(join)) => StateError::ProbeFailed {
                probe,
                reason: join.to_string(),
            },
            Err(_) => StateError::ProbeTimedOut {
                probe,
                secs: self.timeout.as_secs(),
            },
        };
        tracing::debug!(error = %err, "probe degraded to false");
        T::default()
    }
}
