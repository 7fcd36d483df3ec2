//! Typed error enums for the deployment subsystem.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All error types implement `thiserror::Error` and convert to `anyhow::Error`
//! via the `?` operator; callers that branch on the kind use `downcast_ref`.

use std::path::{Path, PathBuf};

use fleet_common::{Agent, UnknownAgent};
use thiserror::Error;

// ── Input errors ──────────────────────────────────────────────────────────────

/// Rejected operator input. Raised before any command is built.
#[derive(Debug, Error)]
pub enum DeploymentError {
    #[error(transparent)]
    InvalidAgent(#[from] UnknownAgent),

    #[error("Invalid name '{0}': must match ^[A-Za-z0-9][A-Za-z0-9._-]{{0,63}}$")]
    InvalidName(String),
}

// ── State detection ───────────────────────────────────────────────────────────

/// A read-only probe failed. Only ever logged: detection degrades to `false`.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("probe '{probe}' failed: {reason}")]
    ProbeFailed { probe: &'static str, reason: String },

    #[error("probe '{probe}' timed out after {secs}s")]
    ProbeTimedOut { probe: &'static str, secs: u64 },
}

// ── Security ──────────────────────────────────────────────────────────────────

/// Security violations. Always fatal; never retried or auto-corrected.
#[derive(Debug, Error)]
pub enum SecurityError {
    #[error("Age key not found: {}", .0.display())]
    KeyNotFound(PathBuf),

    #[error("Age key has insecure permissions: {mode:03o}. Run: chmod 600 {}", .path.display())]
    InsecureKeyPermissions { path: PathBuf, mode: u32 },

    #[error("Public key not found in age key file: {}", .0.display())]
    PublicKeyMissing(PathBuf),

    #[error("Invalid {0} API key format")]
    InvalidSecretFormat(Agent),

    #[error("Failed to encrypt {0} secret")]
    EncryptionFailed(Agent),

    #[error("Backup failed validation (decrypt + list): {}: {reason}", .path.display())]
    RoundTripFailed { path: PathBuf, reason: String },
}

// ── Backup ────────────────────────────────────────────────────────────────────

/// Failures while creating, restoring, or deleting backups.
#[derive(Debug, Error)]
pub enum BackupError {
    #[error("Backup not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Backup failed at {stage}: {reason}")]
    CreateFailed { stage: String, reason: String },

    #[error("Restore failed: {reason}{}", safety_hint(.safety_backup.as_deref()))]
    RestoreFailed {
        reason: String,
        safety_backup: Option<PathBuf>,
    },

    #[error("Failed to delete backup {}: {reason}", .path.display())]
    DeleteFailed { path: PathBuf, reason: String },
}

fn safety_hint(path: Option<&Path>) -> String {
    match path {
        Some(p) => format!(
            "\nSafety backup preserved at: {}\nRecover with: fleetctl restore {}",
            p.display(),
            p.display()
        ),
        None => String::new(),
    }
}

// ── Containers ────────────────────────────────────────────────────────────────

/// Container engine failures, reported with the command that failed.
#[derive(Debug, Error)]
pub enum ContainerError {
    #[error("Container engine '{0}' not found. Install with: apt install podman")]
    EngineNotFound(String),

    #[error("Container operation timed out after {secs}s: {command}")]
    TimedOut { command: String, secs: u64 },

    #[error("Container command failed: {command}\nstderr: {stderr}")]
    CommandFailed { command: String, stderr: String },

    #[error("{0} does not exist")]
    NotFound(String),

    #[error("{0} is not running")]
    NotRunning(String),
}

// ── Process layer ─────────────────────────────────────────────────────────────

/// Failures of a single external command.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("{0} not found")]
    ProgramNotFound(String),

    #[error("{program} timed out after {secs}s")]
    TimedOut { program: String, secs: u64 },

    #[error("failed to spawn {program}: {reason}")]
    Spawn { program: String, reason: String },
}

/// Failures of a multi-stage pipeline that are not a stage's own exit status.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("pipeline stage '{stage}': program {program} not found")]
    ProgramNotFound { stage: String, program: String },

    #[error("pipeline timed out after {secs}s")]
    TimedOut { secs: u64 },

    #[error("pipeline stage '{stage}' could not start: {reason}")]
    Spawn { stage: String, reason: String },

    #[error("pipeline {what}: {reason}")]
    Io { what: String, reason: String },

    #[error("pipeline has no stages")]
    Empty,
}

/// Stable machine-readable code for `err`, looking through context layers.
#[must_use]
pub fn error_code(err: &anyhow::Error) -> &'static str {
    if let Some(e) = err.downcast_ref::<SecurityError>() {
        return match e {
            SecurityError::KeyNotFound(_) => "KEY_NOT_FOUND",
            SecurityError::InsecureKeyPermissions { .. } => "INSECURE_KEY_PERMISSIONS",
            SecurityError::PublicKeyMissing(_) => "PUBLIC_KEY_MISSING",
            SecurityError::InvalidSecretFormat(_) => "INVALID_SECRET_FORMAT",
            SecurityError::EncryptionFailed(_) => "ENCRYPTION_FAILED",
            SecurityError::RoundTripFailed { .. } => "BACKUP_VALIDATION_FAILED",
        };
    }
    if let Some(e) = err.downcast_ref::<BackupError>() {
        return match e {
            BackupError::NotFound(_) => "BACKUP_NOT_FOUND",
            BackupError::CreateFailed { .. } => "BACKUP_FAILED",
            BackupError::RestoreFailed { .. } => "RESTORE_FAILED",
            BackupError::DeleteFailed { .. } => "DELETE_FAILED",
        };
    }
    if let Some(e) = err.downcast_ref::<ContainerError>() {
        return match e {
            ContainerError::EngineNotFound(_) => "ENGINE_NOT_FOUND",
            ContainerError::TimedOut { .. } => "CONTAINER_TIMEOUT",
            ContainerError::CommandFailed { .. } => "CONTAINER_COMMAND_FAILED",
            ContainerError::NotFound(_) => "CONTAINER_NOT_FOUND",
            ContainerError::NotRunning(_) => "CONTAINER_NOT_RUNNING",
        };
    }
    match err.downcast_ref::<DeploymentError>() {
        Some(DeploymentError::InvalidAgent(_)) => "INVALID_AGENT",
        Some(DeploymentError::InvalidName(_)) => "INVALID_NAME",
        None => "ERROR",
    }
}
