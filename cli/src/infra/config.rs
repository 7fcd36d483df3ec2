//! YAML configuration file loader.

use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::domain::config::FleetConfig;

/// Environment variable overriding the config file location.
pub const CONFIG_ENV: &str = "FLEETCTL_CONFIG";

/// Reads `FleetConfig` from `~/.fleetctl/config.yaml` (or `$FLEETCTL_CONFIG`).
pub struct YamlConfigStore {
    home: PathBuf,
}

impl YamlConfigStore {
    /// `home` is the operator's home, so `sudo fleetctl` reads the operator's file.
    #[must_use]
    pub fn new(home: PathBuf) -> Self {
        Self { home }
    }

    /// Load the config; a missing file yields defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(&self) -> Result<FleetConfig> {
        let path = self.path();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(FleetConfig::default());
        }
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("cannot read {}", path.display()))?;
        if content.trim().is_empty() {
            return Ok(FleetConfig::default());
        }
        serde_yaml::from_str(&content).with_context(|| format!("cannot parse {}", path.display()))
    }

    #[must_use]
    pub fn path(&self) -> PathBuf {
        if let Ok(val) = std::env::var(CONFIG_ENV) {
            return PathBuf::from(val);
        }
        self.home.join(".fleetctl").join("config.yaml")
    }
}
