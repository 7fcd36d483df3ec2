//! Domain layer: pure types, parsing, and validation.
//!
//! Nothing here touches the filesystem, spawns processes, or awaits.
//! Functions take data in and return data out.

pub mod agent;
pub mod backup;
pub mod config;
pub mod container;
pub mod context;
pub mod error;
pub mod identity;
pub mod keys;
pub mod pipeline;
pub mod registry;
pub mod secret;
pub mod timestamp;

pub use config::{CryptoTools, DeploymentPaths, EngineSettings, FleetConfig, Timeouts};
pub use error::{
    BackupError, CommandError, ContainerError, DeploymentError, PipelineError, SecurityError,
    StateError,
};
pub use identity::OperatorIdentity;
pub use keys::KeyMaterial;
pub use secret::SecretValidator;
