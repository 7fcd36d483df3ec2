//! Credential format validation. Pure predicates: no I/O, no logging.

use anyhow::Result;
use fleet_common::Agent;

use crate::domain::agent::parse_agent;

/// Per-agent API key format rules.
pub struct SecretValidator;

impl SecretValidator {
    /// Anthropic keys: `sk-ant-` prefix, longer than 50 characters.
    #[must_use]
    pub fn validate_claude_key(key: &str) -> bool {
        key.starts_with("sk-ant-") && key.chars().count() > 50
    }

    /// xAI keys: `xai-` prefix, longer than 30 characters.
    #[must_use]
    pub fn validate_grok_key(key: &str) -> bool {
        key.starts_with("xai-") && key.chars().count() > 30
    }

    /// Google keys: `AIza` prefix, longer than 30 characters.
    #[must_use]
    pub fn validate_gemini_key(key: &str) -> bool {
        key.starts_with("AIza") && key.chars().count() > 30
    }

    #[must_use]
    pub fn validate(agent: Agent, key: &str) -> bool {
        match agent {
            Agent::Claude => Self::validate_claude_key(key),
            Agent::Grok => Self::validate_grok_key(key),
            Agent::Gemini => Self::validate_gemini_key(key),
        }
    }

    /// Validate against an agent given by name.
    ///
    /// # Errors
    ///
    /// Returns an error if `agent` is not one of the known agents.
    pub fn validate_str(agent: &str, key: &str) -> Result<bool> {
        Ok(Self::validate(parse_agent(agent)?, key))
    }
}
