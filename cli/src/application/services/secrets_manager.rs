//! Per-agent credential storage: encrypt to the operator's age key, store as
//! an operator-owned 0600 file, and verify what is on disk.
//!
//! Secrets only ever travel on a child's stdin. They are not logged, not
//! placed in argv, and not echoed in errors.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use fleet_common::Agent;
use serde::Serialize;
use tempfile::TempPath;

use crate::application::ports::PipelineRunner;
use crate::application::services::files::{chown_to_operator, create_dirs_for_operator, mode_of, set_mode};
use crate::application::services::keys::load_key_material;
use crate::domain::backup::decrypt_stage;
use crate::domain::config::{CryptoTools, DeploymentPaths, FleetConfig, Timeouts};
use crate::domain::error::{PipelineError, SecurityError};
use crate::domain::identity::OperatorIdentity;
use crate::domain::keys::KeyMaterial;
use crate::domain::pipeline::{Pipeline, PipelineInput, PipelineOutput, Stage};
use crate::domain::secret::SecretValidator;

pub const SECRET_MODE: u32 = 0o600;

/// On-disk health of one agent's secret.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SecretCheck {
    pub agent: Agent,
    pub exists: bool,
    pub permissions_ok: bool,
    pub decryptable: bool,
}

impl SecretCheck {
    #[must_use]
    pub fn ok(&self) -> bool {
        self.exists && self.permissions_ok && self.decryptable
    }
}

pub struct SecretsManager<'a, P: PipelineRunner> {
    runner: &'a P,
    paths: DeploymentPaths,
    operator: OperatorIdentity,
    tools: CryptoTools,
    timeouts: Timeouts,
    key: KeyMaterial,
}

impl<'a, P: PipelineRunner> SecretsManager<'a, P> {
    /// # Errors
    ///
    /// Returns a [`SecurityError`] if the key file is missing, readable by
    /// group or others, or lacks the public key line.
    pub fn new(
        runner: &'a P,
        config: &FleetConfig,
        paths: DeploymentPaths,
        operator: OperatorIdentity,
    ) -> Result<Self> {
        let key = load_key_material(&paths.key_path)?;
        Ok(Self {
            runner,
            paths,
            operator,
            tools: config.crypto_tools(),
            timeouts: config.timeouts,
            key,
        })
    }

    #[must_use]
    pub fn secret_path(&self, agent: Agent) -> PathBuf {
        self.paths.secret_path(agent)
    }

    /// Validate, encrypt, and store `secret` for `agent`.
    ///
    /// # Errors
    ///
    /// [`SecurityError::InvalidSecretFormat`] before anything is written,
    /// [`SecurityError::EncryptionFailed`] if `age` fails, or an I/O error
    /// while placing the file.
    pub async fn encrypt_secret(&self, agent: Agent, secret: &str) -> Result<PathBuf> {
        if !SecretValidator::validate(agent, secret) {
            tracing::error!(%agent, "refusing to store secret: invalid format");
            return Err(SecurityError::InvalidSecretFormat(agent).into());
        }

        let target = self.secret_path(agent);
        let staging = stage_secret_file(&target, &self.operator)?;

        let pipeline = Pipeline::new(
            vec![Stage::new("encrypt", &self.tools.age, ["-r", self.key.public_key()])],
            self.timeouts.pipeline(),
        )
        .input(PipelineInput::Bytes(secret.as_bytes().to_vec()))
        .output(PipelineOutput::File(staging.to_path_buf()));

        let report = match self.runner.run_pipeline(&pipeline).await {
            Ok(r) => r,
            Err(e) => {
                // Process-layer errors carry no input; keep them for diagnosis.
                if let Some(pe @ PipelineError::ProgramNotFound { .. }) = e.downcast_ref::<PipelineError>() {
                    tracing::error!(%agent, error = %pe, "encryption tool missing");
                }
                return Err(e.context(SecurityError::EncryptionFailed(agent)));
            }
        };
        if let Some(failed) = report.failed_stage() {
            tracing::error!(%agent, code = ?failed.status.code, "encryption failed");
            return Err(SecurityError::EncryptionFailed(agent).into());
        }

        install_secret_file(staging, &target, &self.operator)?;
        tracing::info!(%agent, path = %target.display(), "secret stored");
        Ok(target)
    }

    #[must_use]
    pub fn verify_secret_exists(&self, agent: Agent) -> bool {
        self.secret_path(agent).is_file()
    }

    /// True iff the file's permission bits are exactly 0600.
    #[must_use]
    pub fn verify_secret_permissions(&self, agent: Agent) -> bool {
        mode_of(&self.secret_path(agent)).is_ok_and(|m| m == SECRET_MODE)
    }

    /// Decrypt to memory and check the plaintext is non-empty.
    pub async fn test_decryption(&self, agent: Agent) -> bool {
        let path = self.secret_path(agent);
        let pipeline = Pipeline::new(
            vec![decrypt_stage(&self.tools, self.key.private_key_path(), &path)],
            self.timeouts.pipeline(),
        )
        .output(PipelineOutput::Capture);
        match self.runner.run_pipeline(&pipeline).await {
            Ok(report) => {
                let ok = report.success() && !report.stdout.trim_ascii().is_empty();
                drop(report);
                if !ok {
                    tracing::debug!(%agent, "secret did not decrypt");
                }
                ok
            }
            Err(e) => {
                tracing::debug!(%agent, error = %e, "decryption check could not run");
                false
            }
        }
    }

    /// Existence, permissions, and decryptability for every agent.
    pub async fn verify_all(&self) -> Vec<SecretCheck> {
        let mut checks = Vec::with_capacity(Agent::ALL.len());
        for agent in Agent::ALL {
            let exists = self.verify_secret_exists(agent);
            checks.push(SecretCheck {
                agent,
                exists,
                permissions_ok: exists && self.verify_secret_permissions(agent),
                decryptable: exists && self.test_decryption(agent).await,
            });
        }
        checks
    }
}

/// Create the agent's `context/` directory (and the agent directory above it
/// when missing, both owned by the operator) and a 0600 temp file beside the
/// target so the final rename stays on one filesystem.
fn stage_secret_file(target: &Path, operator: &OperatorIdentity) -> Result<TempPath> {
    let dir = target
        .parent()
        .with_context(|| format!("{} has no parent directory", target.display()))?;
    create_dirs_for_operator(dir, operator)?;
    let file = tempfile::Builder::new()
        .prefix(".secrets.")
        .suffix(".tmp")
        .tempfile_in(dir)
        .with_context(|| format!("creating temp file in {}", dir.display()))?;
    Ok(file.into_temp_path())
}

fn install_secret_file(staging: TempPath, target: &Path, operator: &OperatorIdentity) -> Result<()> {
    staging
        .persist(target)
        .with_context(|| format!("replacing {}", target.display()))?;
    set_mode(target, SECRET_MODE)?;
    chown_to_operator(target, operator)
}
