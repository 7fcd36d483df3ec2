//! Content checksum over a whole directory tree.

use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use walkdir::WalkDir;

/// Compute a SHA-256 over every entry under `root`: relative path, kind, and
/// content (or link target). Stable across runs for an unchanged tree.
///
/// # Errors
///
/// Returns an error if any entry cannot be read.
pub fn tree_checksum(root: &Path) -> Result<String> {
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; 65536];
    for entry in WalkDir::new(root).follow_links(false).sort_by_file_name() {
        let entry = entry.with_context(|| format!("walking {}", root.display()))?;
        let rel = entry.path().strip_prefix(root).unwrap_or(entry.path());
        hasher.update(rel.as_os_str().as_encoded_bytes());
        hasher.update([0]);
        let ft = entry.file_type();
        if ft.is_dir() {
            hasher.update(b"d");
        } else if ft.is_symlink() {
            hasher.update(b"l");
            let target = std::fs::read_link(entry.path())
                .with_context(|| format!("reading link {}", entry.path().display()))?;
            hasher.update(target.as_os_str().as_encoded_bytes());
        } else {
            hasher.update(b"f");
            let mut file = std::fs::File::open(entry.path())
                .with_context(|| format!("opening {}", entry.path().display()))?;
            loop {
                let n = file.read(&mut buf).context("reading file")?;
                if n == 0 {
                    break;
                }
                hasher.update(&buf[..n]);
            }
        }
        hasher.update([0]);
    }
    Ok(hasher
        .finalize()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect())
}
