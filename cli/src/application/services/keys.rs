//! Loading the operator's age key material from disk.

use std::io::ErrorKind;
use std::os::unix::fs::PermissionsExt as _;
use std::path::Path;

use anyhow::{Context, Result};

use crate::domain::error::SecurityError;
use crate::domain::keys::KeyMaterial;

/// Stat and read the key file, then apply the key-material rules.
///
/// # Errors
///
/// Returns [`SecurityError::KeyNotFound`], [`SecurityError::InsecureKeyPermissions`]
/// or [`SecurityError::PublicKeyMissing`], or an I/O error for an unreadable file.
pub fn load_key_material(path: &Path) -> Result<KeyMaterial> {
    let meta = match std::fs::metadata(path) {
        Ok(m) => m,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(SecurityError::KeyNotFound(path.to_path_buf()).into());
        }
        Err(e) => return Err(e).with_context(|| format!("reading metadata of {}", path.display())),
    };
    let mode = meta.permissions().mode() & 0o777;
    // Check permissions before reading so a world-readable key is refused untouched.
    crate::domain::keys::check_key_mode(path, mode)?;
    let contents =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    Ok(KeyMaterial::from_parts(path, mode, &contents)?)
}
