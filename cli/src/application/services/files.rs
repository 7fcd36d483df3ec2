//! Small synchronous filesystem helpers shared by the services.

use std::os::unix::fs::{MetadataExt as _, PermissionsExt as _};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::domain::identity::OperatorIdentity;

/// Permission bits (`& 0o777`) of `path`, following symlinks.
///
/// # Errors
///
/// Returns an error if `path` cannot be stat'ed.
pub fn mode_of(path: &Path) -> Result<u32> {
    let meta = std::fs::metadata(path).with_context(|| format!("reading metadata of {}", path.display()))?;
    Ok(meta.permissions().mode() & 0o777)
}

/// # Errors
///
/// Returns an error if the permissions cannot be changed.
pub fn set_mode(path: &Path, mode: u32) -> Result<()> {
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
        .with_context(|| format!("setting permissions on {}", path.display()))
}

/// Hand `path` to the operator. Skipped when ownership already matches, so
/// unprivileged runs work on files they created themselves.
///
/// # Errors
///
/// Returns an error if ownership has to change and cannot.
pub fn chown_to_operator(path: &Path, operator: &OperatorIdentity) -> Result<()> {
    let meta = std::fs::symlink_metadata(path)
        .with_context(|| format!("reading metadata of {}", path.display()))?;
    if meta.uid() == operator.uid && meta.gid() == operator.gid {
        return Ok(());
    }
    std::os::unix::fs::chown(path, Some(operator.uid), Some(operator.gid))
        .with_context(|| format!("changing owner of {} to {}", path.display(), operator.user))
}

/// Create `dir` and any missing parents, handing each new directory to the
/// operator. Returns the directories created, outermost first.
///
/// # Errors
///
/// Returns an error if a directory cannot be created or chowned.
pub fn create_dirs_for_operator(dir: &Path, operator: &OperatorIdentity) -> Result<Vec<PathBuf>> {
    let mut missing: Vec<PathBuf> = dir
        .ancestors()
        .take_while(|p| !p.as_os_str().is_empty() && !p.exists())
        .map(Path::to_path_buf)
        .collect();
    missing.reverse();
    std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    for created in &missing {
        chown_to_operator(created, operator)?;
    }
    Ok(missing)
}

/// Create `dir` (and parents) and restrict it to `mode`.
///
/// # Errors
///
/// Returns an error if the directory cannot be created or restricted.
pub fn ensure_dir(dir: &Path, mode: u32) -> Result<()> {
    std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    set_mode(dir, mode)
}
