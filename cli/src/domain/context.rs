//! Conversation context metadata and the current-context pointer format.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::domain::registry::NAME_RE;
use crate::domain::timestamp::deserialize_local;

pub const CURRENT_POINTER: &str = ".current";
pub const METADATA_FILE: &str = "metadata.json";
pub const REGISTRY_FILE: &str = "projects.json";

/// Contents of `history/<context>/metadata.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextMetadata {
    pub name: String,
    #[serde(deserialize_with = "deserialize_local")]
    pub created: DateTime<Local>,
    #[serde(deserialize_with = "deserialize_local")]
    pub last_used: DateTime<Local>,
    #[serde(default)]
    pub message_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
}

/// Parse the body of the `.current` pointer. Anything but a single valid
/// context name reads as no current context.
#[must_use]
pub fn parse_current_pointer(contents: &str) -> Option<String> {
    let name = contents.trim();
    NAME_RE.is_match(name).then(|| name.to_string())
}

/// Newest `last_used` first, then by name.
pub fn sort_by_last_used(contexts: &mut [ContextMetadata]) {
    contexts.sort_by(|a, b| b.last_used.cmp(&a.last_used).then_with(|| a.name.cmp(&b.name)));
}
