//! Backup artifact naming and archive stage construction.

use std::path::Path;

use chrono::{DateTime, Local};

use crate::domain::config::{CryptoTools, SECRET_FILE_NAME};
use crate::domain::pipeline::Stage;

pub const ARTIFACT_PREFIX: &str = "ai-backup-";
pub const ARTIFACT_SUFFIX: &str = ".tar.gz.age";
pub const METADATA_SUFFIX: &str = ".json";
pub const LATEST_POINTER: &str = "latest";
pub const BACKUP_FORMAT: &str = "encrypted-v2";

/// `ai-backup-YYYYMMDD-HHMMSS[-N].tar.gz.age`; `attempt` 0 has no suffix.
#[must_use]
pub fn artifact_name(at: DateTime<Local>, attempt: u32) -> String {
    let stamp = at.format("%Y%m%d-%H%M%S");
    if attempt == 0 {
        format!("{ARTIFACT_PREFIX}{stamp}{ARTIFACT_SUFFIX}")
    } else {
        format!("{ARTIFACT_PREFIX}{stamp}-{attempt}{ARTIFACT_SUFFIX}")
    }
}

#[must_use]
pub fn is_artifact_name(name: &str) -> bool {
    name.starts_with(ARTIFACT_PREFIX) && name.ends_with(ARTIFACT_SUFFIX)
}

/// Sidecar metadata file name for an artifact.
#[must_use]
pub fn metadata_name(artifact: &str) -> String {
    format!("{artifact}{METADATA_SUFFIX}")
}

/// `tar` stage archiving the whole tree under `root` to stdout.
#[must_use]
pub fn archive_stage(tools: &CryptoTools, root: &Path, include_secrets: bool) -> Stage {
    let mut args = vec!["-czf".to_string(), "-".to_string()];
    if !include_secrets {
        args.push(format!("--exclude={SECRET_FILE_NAME}"));
    }
    args.extend(["-C".to_string(), root.display().to_string(), ".".to_string()]);
    Stage::new("archive", &tools.tar, args)
}

/// `tar` stage listing an archive read from stdin.
#[must_use]
pub fn list_stage(tools: &CryptoTools) -> Stage {
    Stage::new("list", &tools.tar, ["-tzf", "-"])
}

/// `tar` stage extracting an archive from stdin over `root`.
#[must_use]
pub fn extract_stage(tools: &CryptoTools, root: &Path) -> Stage {
    Stage::new(
        "extract",
        &tools.tar,
        ["-xzf".to_string(), "-".to_string(), "-C".to_string(), root.display().to_string()],
    )
}

/// `age` stage encrypting stdin to `recipient`.
#[must_use]
pub fn encrypt_stage(tools: &CryptoTools, recipient: &str) -> Stage {
    Stage::new("encrypt", &tools.age, ["-r", recipient])
}

/// `age` stage decrypting `input` with the private key at `identity`.
#[must_use]
pub fn decrypt_stage(tools: &CryptoTools, identity: &Path, input: &Path) -> Stage {
    Stage::new(
        "decrypt",
        &tools.age,
        [
            "-d".to_string(),
            "-i".to_string(),
            identity.display().to_string(),
            input.display().to_string(),
        ],
    )
}

/// Entries of a `tar -t` listing, skipping blanks and the bare `./` root.
#[must_use]
pub fn parse_listing(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && *l != "./" && *l != ".")
        .map(String::from)
        .collect()
}
