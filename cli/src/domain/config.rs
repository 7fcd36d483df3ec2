//! Domain types for fleetctl configuration and the derived filesystem layout.
//!
//! Pure functions only: no I/O, no async, no filesystem access.

use std::path::{Path, PathBuf};
use std::time::Duration;

use fleet_common::Agent;
use serde::{Deserialize, Serialize};

use crate::domain::identity::OperatorIdentity;

// ── Constants ────────────────────────────────────────────────────────────────

pub const DEFAULT_AI_ROOT: &str = "/ai";
pub const DEFAULT_POD_NAME: &str = "ai-agents";
pub const DEFAULT_KEY_FILE: &str = ".age-key.txt";
pub const DEFAULT_BACKUP_DIR: &str = "ai-backups";
pub const SECRET_FILE_NAME: &str = ".secrets.age";

// ── Config schema ────────────────────────────────────────────────────────────

/// Top-level configuration stored in `~/.fleetctl/config.yaml`.
///
/// Every field has a default so an absent or empty file is valid.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FleetConfig {
    /// Root of the per-agent state tree.
    pub ai_root: PathBuf,
    /// Pod holding the agent containers.
    pub pod_name: String,
    /// Container engine binary.
    pub engine: String,
    /// `age` binary.
    pub age: String,
    /// `tar` binary.
    pub tar: String,
    /// Private key file; relative paths resolve against the operator home.
    pub key_path: PathBuf,
    /// Backup store; relative paths resolve against the operator home.
    pub backup_dir: PathBuf,
    pub timeouts: Timeouts,
    /// Command run inside the claude container to detect the agent runtime.
    pub runtime_probe: Vec<String>,
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            ai_root: PathBuf::from(DEFAULT_AI_ROOT),
            pod_name: DEFAULT_POD_NAME.to_string(),
            engine: "podman".to_string(),
            age: "age".to_string(),
            tar: "tar".to_string(),
            key_path: PathBuf::from(DEFAULT_KEY_FILE),
            backup_dir: PathBuf::from(DEFAULT_BACKUP_DIR),
            timeouts: Timeouts::default(),
            runtime_probe: vec![
                "python3".to_string(),
                "-c".to_string(),
                "import ai_agents".to_string(),
            ],
        }
    }
}

/// Timeouts in seconds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    /// Read-only probes (`pod exists`, runtime marker).
    pub probe_secs: u64,
    /// Container lifecycle commands.
    pub lifecycle_secs: u64,
    /// Archive/encrypt pipelines.
    pub pipeline_secs: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            probe_secs: 5,
            lifecycle_secs: 30,
            pipeline_secs: 600,
        }
    }
}

impl Timeouts {
    #[must_use]
    pub fn probe(&self) -> Duration {
        Duration::from_secs(self.probe_secs)
    }

    #[must_use]
    pub fn lifecycle(&self) -> Duration {
        Duration::from_secs(self.lifecycle_secs)
    }

    #[must_use]
    pub fn pipeline(&self) -> Duration {
        Duration::from_secs(self.pipeline_secs)
    }
}

/// Which engine binary to call and which pod it manages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSettings {
    pub program: String,
    pub pod_name: String,
}

/// External tools used by the encryption and backup pipelines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CryptoTools {
    pub age: String,
    pub tar: String,
}

impl FleetConfig {
    #[must_use]
    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            program: self.engine.clone(),
            pod_name: self.pod_name.clone(),
        }
    }

    #[must_use]
    pub fn crypto_tools(&self) -> CryptoTools {
        CryptoTools {
            age: self.age.clone(),
            tar: self.tar.clone(),
        }
    }

    /// Resolve the filesystem layout for `operator`.
    #[must_use]
    pub fn paths(&self, operator: &OperatorIdentity) -> DeploymentPaths {
        DeploymentPaths {
            ai_root: self.ai_root.clone(),
            key_path: resolve_against(&operator.home, &self.key_path),
            backup_dir: resolve_against(&operator.home, &self.backup_dir),
        }
    }
}

fn resolve_against(home: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        home.join(path)
    }
}

// ── Filesystem layout ────────────────────────────────────────────────────────

/// Where agent state, key material, and backups live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentPaths {
    pub ai_root: PathBuf,
    pub key_path: PathBuf,
    pub backup_dir: PathBuf,
}

impl DeploymentPaths {
    #[must_use]
    pub fn agent_dir(&self, agent: Agent) -> PathBuf {
        self.ai_root.join(agent.id())
    }

    /// `<ai-root>/<agent>/context/.secrets.age`
    #[must_use]
    pub fn secret_path(&self, agent: Agent) -> PathBuf {
        self.agent_dir(agent).join("context").join(SECRET_FILE_NAME)
    }

    /// `<ai-root>/<agent>/history`
    #[must_use]
    pub fn history_dir(&self, agent: Agent) -> PathBuf {
        self.agent_dir(agent).join("history")
    }
}

// ── Unit tests ───────────────────────────────────────────────────────────────
