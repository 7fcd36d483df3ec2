//! Encrypted whole-tree backup and restore.
//!
//! A backup is `tar` piped into `age`, written straight into a pre-created
//! 0600 file so plaintext never lands on disk. A backup counts as good only
//! after a round trip (`age -d` piped into `tar -t`) lists at least one entry;
//! only good backups move the `latest` pointer. Restore always round-trips
//! first and never touches the live tree when that fails.

use std::fs::OpenOptions;
use std::io::ErrorKind;
use std::os::unix::fs::OpenOptionsExt as _;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use fleet_common::{Agent, BackupEntry, BackupMetadata};

use crate::application::ports::{PipelineRunner, ProgressReporter};
use crate::application::services::files::{chown_to_operator, ensure_dir, set_mode};
use crate::application::services::keys::load_key_material;
use crate::domain::backup::{
    BACKUP_FORMAT, LATEST_POINTER, archive_stage, artifact_name, decrypt_stage, encrypt_stage,
    extract_stage, is_artifact_name, list_stage, metadata_name, parse_listing,
};
use crate::domain::config::{CryptoTools, DeploymentPaths, FleetConfig, Timeouts};
use crate::domain::error::{BackupError, PipelineError, SecurityError};
use crate::domain::identity::OperatorIdentity;
use crate::domain::keys::KeyMaterial;
use crate::domain::pipeline::{Pipeline, PipelineOutput, PipelineReport};

const ARTIFACT_MODE: u32 = 0o600;
const BACKUP_DIR_MODE: u32 = 0o700;
/// Same-second collisions tolerated before giving up on a name.
const MAX_NAME_ATTEMPTS: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackupOptions {
    pub include_secrets: bool,
    pub validate: bool,
}

impl Default for BackupOptions {
    fn default() -> Self {
        Self {
            include_secrets: true,
            validate: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestoreOptions {
    pub create_safety_backup: bool,
    pub dry_run: bool,
}

impl Default for RestoreOptions {
    fn default() -> Self {
        Self {
            create_safety_backup: true,
            dry_run: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BackupReport {
    pub path: PathBuf,
    pub metadata: BackupMetadata,
    pub size: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreOutcome {
    /// Validated only; the live tree was not touched.
    DryRun { files: Vec<String> },
    Restored {
        files: Vec<String>,
        safety_backup: Option<PathBuf>,
    },
}

pub struct SecureBackupManager<'a, P: PipelineRunner> {
    runner: &'a P,
    paths: DeploymentPaths,
    operator: OperatorIdentity,
    tools: CryptoTools,
    timeouts: Timeouts,
    key: KeyMaterial,
}

impl<'a, P: PipelineRunner> SecureBackupManager<'a, P> {
    /// # Errors
    ///
    /// Returns a [`SecurityError`] if the key material is missing or unsafe.
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
    pub fn backup_dir(&self) -> &Path {
        &self.paths.backup_dir
    }

    /// Create an encrypted backup of the whole agent tree.
    ///
    /// # Errors
    ///
    /// [`BackupError::CreateFailed`] naming the failing stage, or
    /// [`SecurityError::RoundTripFailed`] when validation is on and the new
    /// artifact does not decrypt and list. No partial artifact is left behind.
    pub async fn create_backup(
        &self,
        options: BackupOptions,
        reporter: &impl ProgressReporter,
    ) -> Result<BackupReport> {
        let created_at = Local::now();
        let artifact = reserve_artifact(&self.paths.backup_dir, created_at, &self.operator)
            .map_err(|e| create_failed("prepare", &e))?;
        tracing::info!(path = %artifact.display(), include_secrets = options.include_secrets, "creating backup");

        match self.write_artifact(&artifact, created_at, options, reporter).await {
            Ok(report) => Ok(report),
            Err(e) => {
                remove_partial(&artifact);
                Err(e)
            }
        }
    }

    async fn write_artifact(
        &self,
        artifact: &Path,
        created_at: DateTime<Local>,
        options: BackupOptions,
        reporter: &impl ProgressReporter,
    ) -> Result<BackupReport> {
        reporter.step("archiving and encrypting agent data...");
        let pipeline = Pipeline::new(
            vec![
                archive_stage(&self.tools, &self.paths.ai_root, options.include_secrets),
                encrypt_stage(&self.tools, self.key.public_key()),
            ],
            self.timeouts.pipeline(),
        )
        .output(PipelineOutput::File(artifact.to_path_buf()));
        let report = self
            .runner
            .run_pipeline(&pipeline)
            .await
            .map_err(|e| create_failed("pipeline", &e))?;
        if let Some(failed) = report.failed_stage() {
            return Err(BackupError::CreateFailed {
                stage: failed.name.clone(),
                reason: failed.describe_failure(),
            }
            .into());
        }
        secure_file(artifact, &self.operator).map_err(|e| create_failed("permissions", &e))?;

        let file_count = if options.validate {
            reporter.step("validating backup (decrypt + list)...");
            Some(self.verify_backup(artifact).await?.len())
        } else {
            None
        };

        let metadata = BackupMetadata {
            created_at,
            include_secrets: options.include_secrets,
            agents: Agent::ALL.to_vec(),
            format: BACKUP_FORMAT.to_string(),
            validated: options.validate,
            file_count,
        };
        write_sidecar(artifact, &metadata, &self.operator).map_err(|e| create_failed("metadata", &e))?;
        if options.validate {
            point_latest(&self.paths.backup_dir, artifact).map_err(|e| create_failed("latest", &e))?;
        }

        let size = file_size(artifact);
        tracing::info!(path = %artifact.display(), size, validated = options.validate, "backup created");
        Ok(BackupReport {
            path: artifact.to_path_buf(),
            metadata,
            size,
        })
    }

    /// Decrypt and list `path` without extracting. Returns the entries.
    ///
    /// # Errors
    ///
    /// [`BackupError::NotFound`] if `path` is not a file;
    /// [`SecurityError::RoundTripFailed`] if either stage fails or the
    /// archive lists nothing.
    pub async fn verify_backup(&self, path: &Path) -> Result<Vec<String>> {
        if !path.is_file() {
            return Err(BackupError::NotFound(path.to_path_buf()).into());
        }
        let pipeline = Pipeline::new(
            vec![
                decrypt_stage(&self.tools, self.key.private_key_path(), path),
                list_stage(&self.tools),
            ],
            self.timeouts.pipeline(),
        )
        .output(PipelineOutput::Capture);
        let round_trip_failed = |reason: String| SecurityError::RoundTripFailed {
            path: path.to_path_buf(),
            reason,
        };

        let report = match self.runner.run_pipeline(&pipeline).await {
            Ok(r) => r,
            Err(e) => return Err(round_trip_failed(format!("{e:#}")).into()),
        };
        if let Some(failed) = report.failed_stage() {
            return Err(round_trip_failed(failed.describe_failure()).into());
        }
        let files = parse_listing(&String::from_utf8_lossy(&report.stdout));
        if files.is_empty() {
            return Err(round_trip_failed("archive lists no entries".to_string()).into());
        }
        tracing::debug!(path = %path.display(), entries = files.len(), "backup round trip ok");
        Ok(files)
    }

    /// Restore the agent tree from `path`.
    ///
    /// # Errors
    ///
    /// [`BackupError::NotFound`], [`SecurityError::RoundTripFailed`] (tree
    /// untouched), or [`BackupError::RestoreFailed`] carrying the safety
    /// backup path when one was made.
    pub async fn restore_backup(
        &self,
        path: &Path,
        options: RestoreOptions,
        reporter: &impl ProgressReporter,
    ) -> Result<RestoreOutcome> {
        if !path.is_file() {
            return Err(BackupError::NotFound(path.to_path_buf()).into());
        }
        reporter.step("validating backup (decrypt + list)...");
        let files = self.verify_backup(path).await?;
        if options.dry_run {
            tracing::info!(path = %path.display(), entries = files.len(), "dry run: tree untouched");
            return Ok(RestoreOutcome::DryRun { files });
        }

        let safety_backup = if options.create_safety_backup && self.paths.ai_root.exists() {
            reporter.step("creating safety backup of current data...");
            match self.create_backup(BackupOptions::default(), reporter).await {
                Ok(report) => {
                    reporter.success(&format!("safety backup: {}", report.path.display()));
                    Some(report.path)
                }
                Err(e) => {
                    tracing::warn!(error = %format!("{e:#}"), "safety backup failed; continuing restore");
                    reporter.warn("safety backup failed; continuing without one");
                    None
                }
            }
        } else {
            None
        };

        reporter.step("decrypting and extracting...");
        let restore_failed = |reason: String| BackupError::RestoreFailed {
            reason,
            safety_backup: safety_backup.clone(),
        };
        ensure_tree(&self.paths.ai_root).map_err(|e| restore_failed(format!("{e:#}")))?;
        let pipeline = Pipeline::new(
            vec![
                decrypt_stage(&self.tools, self.key.private_key_path(), path),
                extract_stage(&self.tools, &self.paths.ai_root),
            ],
            self.timeouts.pipeline(),
        );
        let report: PipelineReport = match self.runner.run_pipeline(&pipeline).await {
            Ok(r) => r,
            Err(e) => return Err(restore_failed(format!("{e:#}")).into()),
        };
        if let Some(failed) = report.failed_stage() {
            return Err(restore_failed(failed.describe_failure()).into());
        }
        tracing::info!(path = %path.display(), entries = files.len(), "restore complete");
        Ok(RestoreOutcome::Restored {
            files,
            safety_backup,
        })
    }

    /// The key-free view of the backup directory.
    #[must_use]
    pub fn store(&self) -> BackupStore {
        BackupStore::new(self.paths.backup_dir.clone())
    }

    /// See [`BackupStore::list`].
    ///
    /// # Errors
    ///
    /// Returns an error if the backup directory exists but cannot be listed.
    pub fn list_backups(&self) -> Result<Vec<BackupEntry>> {
        self.store().list()
    }

    #[must_use]
    pub fn latest(&self) -> Option<PathBuf> {
        self.store().latest()
    }

    /// See [`BackupStore::delete`].
    ///
    /// # Errors
    ///
    /// [`BackupError::NotFound`] or [`BackupError::DeleteFailed`].
    pub fn delete_backup(&self, path: &Path) -> Result<()> {
        self.store().delete(path)
    }
}

/// Listing, pointer lookup, and deletion in the backup directory. None of
/// these need key material.
#[derive(Debug, Clone)]
pub struct BackupStore {
    dir: PathBuf,
}

impl BackupStore {
    #[must_use]
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// Artifacts in the backup store, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the backup directory exists but cannot be listed.
    pub fn list(&self) -> Result<Vec<BackupEntry>> {
        let dir = &self.dir;
        let entries = match std::fs::read_dir(dir) {
            Ok(e) => e,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e).with_context(|| format!("listing {}", dir.display())),
        };
        let latest = self.latest();
        let mut backups = Vec::new();
        for entry in entries.flatten() {
            let name = entry.file_name().to_string_lossy().into_owned();
            if !is_artifact_name(&name) {
                continue;
            }
            let Ok(meta) = entry.metadata() else { continue };
            if !meta.is_file() {
                continue;
            }
            let path = entry.path();
            let modified = meta
                .modified()
                .map(DateTime::<Local>::from)
                .unwrap_or_else(|_| Local::now());
            backups.push(BackupEntry {
                is_latest: latest.as_deref() == Some(path.as_path()),
                metadata: read_sidecar(&path),
                size_bytes: meta.len(),
                modified,
                name,
                path,
            });
        }
        backups.sort_by(|a, b| b.modified.cmp(&a.modified).then_with(|| b.name.cmp(&a.name)));
        Ok(backups)
    }

    /// The artifact `latest` points at, if the pointer exists and resolves.
    #[must_use]
    pub fn latest(&self) -> Option<PathBuf> {
        let dir = &self.dir;
        let target = std::fs::read_link(dir.join(LATEST_POINTER)).ok()?;
        let resolved = if target.is_absolute() { target } else { dir.join(target) };
        resolved.is_file().then_some(resolved)
    }

    /// Delete an artifact and its sidecar; drops `latest` if it pointed here.
    ///
    /// # Errors
    ///
    /// [`BackupError::NotFound`] if absent, [`BackupError::DeleteFailed`] if
    /// the artifact cannot be removed.
    pub fn delete(&self, path: &Path) -> Result<()> {
        if !path.is_file() {
            return Err(BackupError::NotFound(path.to_path_buf()).into());
        }
        let points_here = self
            .latest()
            .is_some_and(|l| same_file(&l, path));

        std::fs::remove_file(path).map_err(|e| BackupError::DeleteFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let sidecar = sidecar_path(path);
        if let Err(e) = std::fs::remove_file(&sidecar) {
            if e.kind() != ErrorKind::NotFound {
                tracing::warn!(path = %sidecar.display(), error = %e, "could not remove backup metadata");
            }
        }
        if points_here {
            let pointer = self.dir.join(LATEST_POINTER);
            std::fs::remove_file(&pointer).with_context(|| format!("removing {}", pointer.display()))?;
            tracing::info!("latest pointer removed with its backup");
        }
        tracing::info!(path = %path.display(), "backup deleted");
        Ok(())
    }
}

fn create_failed(stage: &str, err: &anyhow::Error) -> anyhow::Error {
    let (stage, reason) = match err.downcast_ref::<PipelineError>() {
        Some(PipelineError::ProgramNotFound { stage, program }) => {
            (stage.clone(), format!("{program} not found"))
        }
        _ => (stage.to_string(), format!("{err:#}")),
    };
    BackupError::CreateFailed { stage, reason }.into()
}

fn file_size(path: &Path) -> u64 {
    std::fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}

fn sidecar_path(artifact: &Path) -> PathBuf {
    let name = artifact
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    artifact.with_file_name(metadata_name(&name))
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (std::fs::canonicalize(a), std::fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Create the backup dir and an empty 0600 artifact under a free name.
fn reserve_artifact(dir: &Path, at: DateTime<Local>, operator: &OperatorIdentity) -> Result<PathBuf> {
    ensure_dir(dir, BACKUP_DIR_MODE)?;
    chown_to_operator(dir, operator)?;
    for attempt in 0..MAX_NAME_ATTEMPTS {
        let path = dir.join(artifact_name(at, attempt));
        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .mode(ARTIFACT_MODE)
            .open(&path)
        {
            Ok(_) => return Ok(path),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {}
            Err(e) => return Err(e).with_context(|| format!("creating {}", path.display())),
        }
    }
    anyhow::bail!("no free backup name in {} for {}", dir.display(), at.format("%Y%m%d-%H%M%S"))
}

fn ensure_tree(root: &Path) -> Result<()> {
    std::fs::create_dir_all(root).with_context(|| format!("creating {}", root.display()))
}

fn secure_file(path: &Path, operator: &OperatorIdentity) -> Result<()> {
    set_mode(path, ARTIFACT_MODE)?;
    chown_to_operator(path, operator)
}

fn remove_partial(artifact: &Path) {
    for path in [artifact.to_path_buf(), sidecar_path(artifact)] {
        match std::fs::remove_file(&path) {
            Ok(()) => tracing::debug!(path = %path.display(), "removed partial backup file"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(path = %path.display(), error = %e, "could not remove partial backup file"),
        }
    }
}

fn write_sidecar(artifact: &Path, metadata: &BackupMetadata, operator: &OperatorIdentity) -> Result<()> {
    use std::io::Write as _;
    let path = sidecar_path(artifact);
    let content = serde_json::to_string_pretty(metadata).context("serializing backup metadata")?;
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(ARTIFACT_MODE)
        .open(&path)
        .with_context(|| format!("creating {}", path.display()))?;
    file.write_all(content.as_bytes())
        .with_context(|| format!("writing {}", path.display()))?;
    secure_file(&path, operator)
}

fn read_sidecar(artifact: &Path) -> Option<BackupMetadata> {
    let content = std::fs::read_to_string(sidecar_path(artifact)).ok()?;
    serde_json::from_str(&content).ok()
}

/// Redirect `latest` by renaming a fresh symlink over it.
fn point_latest(dir: &Path, artifact: &Path) -> Result<()> {
    let name = artifact
        .file_name()
        .with_context(|| format!("{} has no file name", artifact.display()))?;
    let tmp = dir.join(format!(".{LATEST_POINTER}.{}.tmp", std::process::id()));
    let _ = std::fs::remove_file(&tmp);
    std::os::unix::fs::symlink(name, &tmp)
        .with_context(|| format!("creating {}", tmp.display()))?;
    let pointer = dir.join(LATEST_POINTER);
    std::fs::rename(&tmp, &pointer).with_context(|| format!("replacing {}", pointer.display()))?;
    tracing::debug!(artifact = %name.to_string_lossy(), "latest pointer updated");
    Ok(())
}
