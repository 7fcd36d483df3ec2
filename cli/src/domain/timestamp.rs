//! Timestamps in history files.
//!
//! Files written by the agent wrappers carry naive ISO-8601 local times
//! (`2025-12-01T10:00:00.123456`); fleetctl writes RFC 3339 with an offset.
//! Both must read back as the same local instant.

use chrono::{DateTime, Local, NaiveDateTime, TimeZone as _};
use serde::{Deserialize, Deserializer};

const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Parse an offset-carrying or naive timestamp. Naive values are local wall
/// time; one skipped by a DST jump is read as UTC.
#[must_use]
pub fn parse_local(raw: &str) -> Option<DateTime<Local>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Local));
    }
    let naive = NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())?;
    Some(
        Local
            .from_local_datetime(&naive)
            .earliest()
            .unwrap_or_else(|| Local.from_utc_datetime(&naive)),
    )
}

/// `deserialize_with` adapter for [`parse_local`].
///
/// # Errors
///
/// Fails when the value is not a string or matches no accepted format.
pub fn deserialize_local<'de, D>(deserializer: D) -> Result<DateTime<Local>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_local(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("unrecognised timestamp {raw:?}")))
}
