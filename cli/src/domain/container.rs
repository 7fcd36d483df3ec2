//! Container engine record parsing and lifecycle outcomes.

use fleet_common::{ContainerInfo, ContainerStatus};

/// `inspect --format` template producing a `name|status|pod|image` record.
pub const INSPECT_FORMAT: &str = "{{.Name}}|{{.State.Status}}|{{.Pod}}|{{.ImageName}}";

/// Result of an idempotent lifecycle request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The engine was asked to change state and did.
    Applied,
    /// Already in the requested state; no engine command was issued.
    Unchanged,
}

/// Parse one `name|status|pod|image` inspection record.
///
/// Returns `None` unless the record has exactly four fields.
#[must_use]
pub fn parse_inspect_record(record: &str) -> Option<ContainerInfo> {
    let fields: Vec<&str> = record.trim().split('|').collect();
    let [name, status, pod, image] = fields.as_slice() else {
        return None;
    };
    Some(ContainerInfo {
        name: name.trim_start_matches('/').to_string(),
        status: ContainerStatus::from_engine(status),
        pod: (!pod.is_empty()).then(|| (*pod).to_string()),
        image: (*image).to_string(),
    })
}

/// Whether `pod ps --format {{.Status}}` output reports a running pod.
#[must_use]
pub fn pod_status_is_running(output: &str) -> bool {
    output.contains("Running")
}

/// Whether `ps --format {{.Names}}` output lists `name` exactly.
///
/// Name filters match substrings, so `claude-agent` must not be reported
/// running because `claude-agent-old` is.
#[must_use]
pub fn names_output_contains(output: &str, name: &str) -> bool {
    output.lines().any(|l| l.trim() == name)
}
