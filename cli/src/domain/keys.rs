//! Age key material: parsing and permission rules. No filesystem access.

use std::path::{Path, PathBuf};

use crate::domain::error::SecurityError;

/// Line prefix under which `age-keygen` records the public half.
pub const PUBLIC_KEY_MARKER: &str = "# public key:";

/// A validated age identity: the private key file plus its public recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyMaterial {
    private_key_path: PathBuf,
    public_key: String,
}

impl KeyMaterial {
    /// Build key material from an already-read key file.
    ///
    /// # Errors
    ///
    /// Returns [`SecurityError::InsecureKeyPermissions`] if group or other
    /// have any access, and [`SecurityError::PublicKeyMissing`] if the file
    /// carries no public key marker.
    pub fn from_parts(path: &Path, mode: u32, contents: &str) -> Result<Self, SecurityError> {
        check_key_mode(path, mode)?;
        let public_key =
            parse_public_key(contents).ok_or_else(|| SecurityError::PublicKeyMissing(path.to_path_buf()))?;
        Ok(Self {
            private_key_path: path.to_path_buf(),
            public_key,
        })
    }

    #[must_use]
    pub fn private_key_path(&self) -> &Path {
        &self.private_key_path
    }

    /// Recipient string passed to `age -r`.
    #[must_use]
    pub fn public_key(&self) -> &str {
        &self.public_key
    }
}

/// Extract the public key from the contents of an age identity file.
#[must_use]
pub fn parse_public_key(contents: &str) -> Option<String> {
    contents
        .lines()
        .find(|l| l.starts_with(PUBLIC_KEY_MARKER))
        .and_then(|l| l.rsplit(':').next())
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(String::from)
}

/// The key file must not be accessible to group or other.
///
/// # Errors
///
/// Returns [`SecurityError::InsecureKeyPermissions`] when `mode & 0o077 != 0`.
pub fn check_key_mode(path: &Path, mode: u32) -> Result<(), SecurityError> {
    if mode & 0o077 != 0 {
        return Err(SecurityError::InsecureKeyPermissions {
            path: path.to_path_buf(),
            mode: mode & 0o777,
        });
    }
    Ok(())
}
