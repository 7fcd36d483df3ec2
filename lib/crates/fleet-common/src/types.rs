use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::agent::Agent;

/// Snapshot of the deployment produced by a single detection pass.
///
/// Fields are private and there are no setters; a newer snapshot replaces
/// an older one instead of updating it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentState {
    containers_running: bool,
    age_key_exists: bool,
    runtime_installed: bool,
    history_dirs_exist: bool,
    secrets_configured: BTreeMap<Agent, bool>,
}

/// One-line classification of a [`DeploymentState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateSummary {
    Deployed,
    FreshInstall,
    NeedsSecrets,
    Partial,
}

impl DeploymentState {
    #[must_use]
    pub fn new(
        containers_running: bool,
        age_key_exists: bool,
        runtime_installed: bool,
        history_dirs_exist: bool,
        secrets_configured: BTreeMap<Agent, bool>,
    ) -> Self {
        Self {
            containers_running,
            age_key_exists,
            runtime_installed,
            history_dirs_exist,
            secrets_configured,
        }
    }

    #[must_use]
    pub fn containers_running(&self) -> bool {
        self.containers_running
    }

    #[must_use]
    pub fn age_key_exists(&self) -> bool {
        self.age_key_exists
    }

    /// Whether the agent runtime package answered inside the containers.
    #[must_use]
    pub fn runtime_installed(&self) -> bool {
        self.runtime_installed
    }

    #[must_use]
    pub fn history_dirs_exist(&self) -> bool {
        self.history_dirs_exist
    }

    /// Whether `agent` has an encrypted secret on disk. Agents missing from
    /// the snapshot count as unconfigured.
    #[must_use]
    pub fn secret_configured(&self, agent: Agent) -> bool {
        self.secrets_configured.get(&agent).copied().unwrap_or(false)
    }

    #[must_use]
    pub fn secrets_configured(&self) -> &BTreeMap<Agent, bool> {
        &self.secrets_configured
    }

    /// No containers and no history trees.
    #[must_use]
    pub fn is_fresh_install(&self) -> bool {
        !self.containers_running && !self.history_dirs_exist
    }

    #[must_use]
    pub fn needs_secrets(&self) -> bool {
        Agent::ALL.iter().any(|a| !self.secret_configured(*a))
    }

    #[must_use]
    pub fn is_fully_deployed(&self) -> bool {
        self.containers_running && self.age_key_exists && !self.needs_secrets() && self.runtime_installed
    }

    #[must_use]
    pub fn summary(&self) -> StateSummary {
        if self.is_fully_deployed() {
            StateSummary::Deployed
        } else if self.is_fresh_install() {
            StateSummary::FreshInstall
        } else if self.needs_secrets() {
            StateSummary::NeedsSecrets
        } else {
            StateSummary::Partial
        }
    }
}

/// Container state as reported by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerStatus {
    Running,
    Stopped,
    Created,
    Other(String),
}

impl ContainerStatus {
    /// Map an engine status word. `exited` and `stopped` both mean stopped.
    #[must_use]
    pub fn from_engine(status: &str) -> Self {
        match status.trim().to_ascii_lowercase().as_str() {
            "running" => Self::Running,
            "exited" | "stopped" => Self::Stopped,
            "created" => Self::Created,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for ContainerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => f.write_str("running"),
            Self::Stopped => f.write_str("stopped"),
            Self::Created => f.write_str("created"),
            Self::Other(s) => f.write_str(s),
        }
    }
}

/// A container as seen by one engine inspection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerInfo {
    pub name: String,
    pub status: ContainerStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pod: Option<String>,
    pub image: String,
}

/// Pod plus per-container view used by `container-status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PodStatus {
    pub name: String,
    pub exists: bool,
    pub running: bool,
    pub containers: Vec<ContainerInfo>,
}

/// Sidecar record written next to every encrypted backup artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupMetadata {
    pub created_at: DateTime<Local>,
    pub include_secrets: bool,
    pub agents: Vec<Agent>,
    pub format: String,
    pub validated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_count: Option<usize>,
}

/// One row of `list-backups`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupEntry {
    pub path: PathBuf,
    pub name: String,
    pub size_bytes: u64,
    pub modified: DateTime<Local>,
    pub is_latest: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<BackupMetadata>,
}
