//! Conversation contexts under an agent's `history/` directory and the
//! `.current` pointer naming the active one.

use std::io::{ErrorKind, Write as _};
use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::domain::context::{
    CURRENT_POINTER, ContextMetadata, METADATA_FILE, parse_current_pointer, sort_by_last_used,
};
use crate::domain::registry::validate_name;

pub struct ContextStore {
    dir: PathBuf,
}

impl ContextStore {
    #[must_use]
    pub fn new(history_dir: PathBuf) -> Self {
        Self { dir: history_dir }
    }

    /// The active context, if the pointer exists and holds a valid name.
    ///
    /// # Errors
    ///
    /// Returns an error if the pointer exists but cannot be read.
    pub fn current(&self) -> Result<Option<String>> {
        let path = self.dir.join(CURRENT_POINTER);
        match std::fs::read_to_string(&path) {
            Ok(content) => {
                let name = parse_current_pointer(&content);
                if name.is_none() {
                    tracing::warn!(path = %path.display(), "ignoring malformed context pointer");
                }
                Ok(name)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("reading {}", path.display())),
        }
    }

    /// Point `.current` at `name`, replacing the file atomically.
    ///
    /// # Errors
    ///
    /// Returns an error for an invalid name or if the pointer cannot be written.
    pub fn set_current(&self, name: &str) -> Result<()> {
        validate_name(name)?;
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("creating {}", self.dir.display()))?;
        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)
            .with_context(|| format!("creating temp file in {}", self.dir.display()))?;
        writeln!(tmp, "{name}").context("writing context pointer")?;
        let target = self.dir.join(CURRENT_POINTER);
        tmp.persist(&target)
            .with_context(|| format!("replacing {}", target.display()))?;
        Ok(())
    }

    /// Every context directory with a readable `metadata.json`, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the history directory exists but cannot be listed.
    pub fn list(&self) -> Result<Vec<ContextMetadata>> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(e) => e,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e).with_context(|| format!("listing {}", self.dir.display())),
        };
        let mut contexts = Vec::new();
        for entry in entries.flatten() {
            if !entry.file_type().is_ok_and(|t| t.is_dir()) {
                continue;
            }
            let meta_path = entry.path().join(METADATA_FILE);
            let parsed = std::fs::read_to_string(&meta_path)
                .map_err(anyhow::Error::from)
                .and_then(|s| serde_json::from_str::<ContextMetadata>(&s).map_err(Into::into));
            match parsed {
                Ok(meta) => contexts.push(meta),
                Err(e) => tracing::debug!(path = %meta_path.display(), error = %e, "skipping context"),
            }
        }
        sort_by_last_used(&mut contexts);
        Ok(contexts)
    }
}
