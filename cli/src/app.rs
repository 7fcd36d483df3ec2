//! Per-invocation context handed to every command handler.
//!
//! Built once in `Cli::run`: resolves who the operator really is, loads
//! `config.yaml`, derives the deployment paths, and owns the production
//! runners. Handlers borrow `&AppContext` and pass the pieces they need
//! into the services.

use anyhow::Result;

use crate::domain::config::{DeploymentPaths, FleetConfig};
use crate::domain::identity::OperatorIdentity;
use crate::infra::command_runner::TokioCommandRunner;
use crate::infra::config::YamlConfigStore;
use crate::infra::identity;
use crate::infra::pipeline::TokioPipelineRunner;
use crate::output::{HumanRenderer, JsonRenderer, OutputContext, Renderer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Human,
    Json,
}

/// Global flags lifted off the command line.
#[derive(Debug, Clone, Copy, Default)]
pub struct AppFlags {
    pub no_color: bool,
    pub quiet: bool,
    pub json: bool,
    /// Answer yes to confirmations. `CI` and `FLEETCTL_YES` imply it.
    pub yes: bool,
}

pub struct AppContext {
    pub output: OutputContext,
    pub mode: OutputMode,
    /// The real operator, even under `sudo`.
    pub operator: OperatorIdentity,
    pub config: FleetConfig,
    pub paths: DeploymentPaths,
    /// Engine commands that change state (start, stop, exec, secret writes).
    pub runner: TokioCommandRunner,
    /// Read-only probes, bounded by the shorter probe timeout.
    pub probe_runner: TokioCommandRunner,
    pub pipeline: TokioPipelineRunner,
    pub non_interactive: bool,
}

impl AppContext {
    /// Resolve the operator and load their configuration.
    ///
    /// # Errors
    ///
    /// Fails when `config.yaml` exists but is not valid YAML for `FleetConfig`.
    pub fn new(flags: &AppFlags) -> Result<Self> {
        let operator = identity::resolve();
        let config = YamlConfigStore::new(operator.home.clone()).load()?;
        Ok(Self::with_config(flags, operator, config))
    }

    #[must_use]
    pub fn with_config(flags: &AppFlags, operator: OperatorIdentity, config: FleetConfig) -> Self {
        let from_env = ["CI", "FLEETCTL_YES"]
            .iter()
            .any(|var| std::env::var_os(var).is_some());
        let mode = if flags.json { OutputMode::Json } else { OutputMode::Human };
        let paths = config.paths(&operator);
        tracing::debug!(
            user = %operator.user,
            uid = operator.uid,
            elevated = identity::is_elevated(),
            ai_root = %paths.ai_root.display(),
            "context resolved"
        );

        Self {
            output: OutputContext::new(flags.no_color, flags.quiet),
            mode,
            runner: TokioCommandRunner::new(config.timeouts.lifecycle()),
            probe_runner: TokioCommandRunner::new(config.timeouts.probe()),
            pipeline: TokioPipelineRunner::new(),
            operator,
            config,
            paths,
            non_interactive: flags.yes || from_env,
        }
    }

    #[must_use]
    pub fn is_json(&self) -> bool {
        self.mode == OutputMode::Json
    }

    #[must_use]
    pub fn renderer(&self) -> Renderer<'_> {
        match self.mode {
            OutputMode::Human => Renderer::Human(HumanRenderer::new(&self.output)),
            OutputMode::Json => Renderer::Json(JsonRenderer),
        }
    }

    /// Prompt before a destructive step. Non-interactive runs proceed
    /// without asking; a declined prompt returns `Ok(false)`.
    ///
    /// # Errors
    ///
    /// Propagates prompt failures, e.g. when stdin is not a terminal.
    pub fn confirm(&self, prompt: &str) -> Result<bool> {
        if self.non_interactive {
            return Ok(true);
        }
        Ok(dialoguer::Confirm::new()
            .with_prompt(prompt)
            .default(false)
            .interact()?)
    }
}
