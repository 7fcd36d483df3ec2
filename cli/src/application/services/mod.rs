//! Application services: use-case orchestration.
//!
//! Each service composes domain logic with port trait calls. Services import
//! only from `crate::domain` and `crate::application::ports`, never from
//! `crate::infra`, `crate::commands`, or `crate::output`.

pub mod backup_manager;
pub mod container_manager;
pub mod files;
pub mod keys;
pub mod secrets_manager;
pub mod state_detector;

pub use backup_manager::{
    BackupOptions, BackupReport, BackupStore, RestoreOptions, RestoreOutcome, SecureBackupManager,
};
pub use container_manager::ContainerManager;
pub use secrets_manager::{SecretCheck, SecretsManager};
pub use state_detector::StateDetector;
