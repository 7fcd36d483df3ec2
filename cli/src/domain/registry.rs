//! Project registry records and the versioned-record contract.
//!
//! The registry groups conversation contexts under named projects. Writers
//! read a [`Versioned`] snapshot, modify it, and write it back only if the
//! generation is still the one they read.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use anyhow::Result;
use chrono::{DateTime, Local};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::domain::error::DeploymentError;
use crate::domain::timestamp::deserialize_local;

/// Project and context names become path components and JSON keys.
pub static NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    // Safety: constant pattern, cannot fail.
    #[allow(clippy::expect_used)]
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]{0,63}$").expect("valid regex")
});

/// Validate a project or context name.
///
/// # Errors
///
/// Returns [`DeploymentError::InvalidName`] if the name does not match [`NAME_RE`].
pub fn validate_name(name: &str) -> Result<()> {
    if !NAME_RE.is_match(name) {
        return Err(DeploymentError::InvalidName(name.to_string()).into());
    }
    Ok(())
}

/// A value together with the generation it was read at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Versioned<T> {
    pub generation: u64,
    pub value: T,
}

/// Result of a conditional write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOutcome {
    /// Written; carries the new generation.
    Stored(u64),
    /// Someone else wrote first; carries the generation found on disk.
    Conflict(u64),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    #[serde(default)]
    pub description: String,
    #[serde(deserialize_with = "deserialize_local")]
    pub created: DateTime<Local>,
    #[serde(deserialize_with = "deserialize_local")]
    pub last_activity: DateTime<Local>,
    #[serde(default)]
    pub conversations: Vec<String>,
}

/// Contents of `history/projects.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectRegistry {
    /// Files written before versioning read as generation 0.
    #[serde(default)]
    pub generation: u64,
    #[serde(default)]
    pub projects: BTreeMap<String, Project>,
}

impl ProjectRegistry {
    /// Add a project. Returns `false` if the name is taken.
    pub fn create_project(&mut self, name: &str, description: &str, now: DateTime<Local>) -> bool {
        if self.projects.contains_key(name) {
            return false;
        }
        self.projects.insert(
            name.to_string(),
            Project {
                description: description.to_string(),
                created: now,
                last_activity: now,
                conversations: Vec::new(),
            },
        );
        true
    }

    /// Bump a project's activity timestamp. Returns `false` if unknown.
    pub fn touch(&mut self, name: &str, now: DateTime<Local>) -> bool {
        match self.projects.get_mut(name) {
            Some(p) => {
                p.last_activity = now;
                true
            }
            None => false,
        }
    }

    /// Link `context` to `project`, keeping insertion order and no duplicates.
    /// Returns `false` if the project is unknown or the link already existed.
    pub fn link_context(&mut self, project: &str, context: &str, now: DateTime<Local>) -> bool {
        let Some(p) = self.projects.get_mut(project) else {
            return false;
        };
        if p.conversations.iter().any(|c| c == context) {
            return false;
        }
        p.conversations.push(context.to_string());
        p.last_activity = now;
        true
    }

    /// Projects, most recently active first.
    #[must_use]
    pub fn sorted_by_activity(&self) -> Vec<(&str, &Project)> {
        let mut v: Vec<_> = self.projects.iter().map(|(k, p)| (k.as_str(), p)).collect();
        v.sort_by(|a, b| b.1.last_activity.cmp(&a.1.last_activity).then(a.0.cmp(b.0)));
        v
    }
}
