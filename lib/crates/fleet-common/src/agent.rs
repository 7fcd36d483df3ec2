//! The closed set of agents managed by fleetctl.
//!
//! An [`Agent`] can only be obtained through [`Agent::ALL`] or by parsing one
//! of the three known identifiers, so every container name, secret path and
//! engine argument derived from it is known at compile time.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One of the three agent services deployed in the pod.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Agent {
    Claude,
    Grok,
    Gemini,
}

/// Returned when a string is not one of the known agent identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid agent name '{0}': must be one of claude, grok, gemini")]
pub struct UnknownAgent(pub String);

impl Agent {
    /// Every agent, in deployment order.
    pub const ALL: [Agent; 3] = [Agent::Claude, Agent::Grok, Agent::Gemini];

    /// Stable identifier used in paths and on the command line.
    #[must_use]
    pub const fn id(self) -> &'static str {
        match self {
            Agent::Claude => "claude",
            Agent::Grok => "grok",
            Agent::Gemini => "gemini",
        }
    }

    /// Name of the agent's container inside the pod.
    #[must_use]
    pub const fn container_name(self) -> &'static str {
        match self {
            Agent::Claude => "claude-agent",
            Agent::Grok => "grok-agent",
            Agent::Gemini => "gemini-agent",
        }
    }
}

impl fmt::Display for Agent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Agent {
    type Err = UnknownAgent;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Agent::ALL
            .into_iter()
            .find(|a| a.id() == s)
            .ok_or_else(|| UnknownAgent(s.to_string()))
    }
}
