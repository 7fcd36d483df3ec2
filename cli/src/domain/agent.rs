//! Agent identifier boundary.
//!
//! Operator-supplied strings become [`Agent`] values here and nowhere else.

use anyhow::Result;
use fleet_common::Agent;

use crate::domain::error::DeploymentError;

/// Parse an operator-supplied agent name.
///
/// Rejection happens before any path or command line is derived from the
/// value, so strings such as `claude; rm -rf /` never reach a subprocess.
///
/// # Errors
///
/// Returns [`DeploymentError::InvalidAgent`] for anything outside the fixed set.
pub fn parse_agent(name: &str) -> Result<Agent> {
    name.parse::<Agent>()
        .map_err(|e| DeploymentError::InvalidAgent(e).into())
}
