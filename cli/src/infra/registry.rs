//! On-disk project registry with optimistic concurrency.
//!
//! `projects.json` is shared by every session of an agent. Reads take a shared
//! `fs2` lock on `projects.json.lock`; a conditional write takes the exclusive
//! lock, checks the generation it was based on, and replaces the file by
//! rename. No lock is held between the read and the write.

use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Write as _};
use std::os::unix::fs::OpenOptionsExt as _;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;
use fs2::FileExt;

use crate::domain::context::REGISTRY_FILE;
use crate::domain::registry::{Project, ProjectRegistry, StoreOutcome, Versioned, validate_name};

const LOCK_FILE: &str = "projects.json.lock";
const MAX_ATTEMPTS: u32 = 5;

pub struct RegistryStore {
    dir: PathBuf,
}

/// Releases the advisory lock when dropped.
struct LockGuard(File);

impl Drop for LockGuard {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.0);
    }
}

impl RegistryStore {
    /// `history_dir` is the agent's `history/` directory.
    #[must_use]
    pub fn new(history_dir: PathBuf) -> Self {
        Self { dir: history_dir }
    }

    #[must_use]
    pub fn path(&self) -> PathBuf {
        self.dir.join(REGISTRY_FILE)
    }

    fn open_lock(&self) -> Result<File> {
        let path = self.dir.join(LOCK_FILE);
        OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .mode(0o600)
            .open(&path)
            .with_context(|| format!("opening lock file {}", path.display()))
    }

    fn lock_shared(&self) -> Result<LockGuard> {
        let file = self.open_lock()?;
        FileExt::lock_shared(&file).context("locking project registry")?;
        Ok(LockGuard(file))
    }

    fn lock_exclusive(&self) -> Result<LockGuard> {
        let file = self.open_lock()?;
        FileExt::lock_exclusive(&file).context("locking project registry")?;
        Ok(LockGuard(file))
    }

    /// Read the registry. A missing or unparsable file reads as an empty
    /// registry at generation 0.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read, or the lock
    /// cannot be taken.
    pub fn load(&self) -> Result<Versioned<ProjectRegistry>> {
        if !self.dir.is_dir() {
            return Ok(Versioned {
                generation: 0,
                value: ProjectRegistry::default(),
            });
        }
        let _guard = self.lock_shared()?;
        let path = self.path();
        let value = match read_registry(&path)? {
            OnDisk::Parsed(r) => r,
            OnDisk::Missing => ProjectRegistry::default(),
            OnDisk::Unreadable(e) => {
                tracing::warn!(path = %path.display(), error = %e, "project registry unreadable, treating as empty");
                ProjectRegistry::default()
            }
        };
        Ok(Versioned {
            generation: value.generation,
            value,
        })
    }

    /// Write `registry` only if the file is still at generation `expected`.
    /// An existing file that does not parse is never replaced.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory, lock, or file cannot be written, or
    /// if `projects.json` exists but is unreadable.
    pub fn store_if(&self, expected: u64, registry: &ProjectRegistry) -> Result<StoreOutcome> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("creating {}", self.dir.display()))?;
        let _guard = self.lock_exclusive()?;

        let path = self.path();
        let found = match read_registry(&path)? {
            OnDisk::Missing => 0,
            OnDisk::Parsed(r) => r.generation,
            OnDisk::Unreadable(e) => anyhow::bail!(
                "{} is unreadable ({e}); refusing to overwrite it. Fix or move the file aside first",
                path.display()
            ),
        };
        if found != expected {
            return Ok(StoreOutcome::Conflict(found));
        }

        let mut next = registry.clone();
        next.generation = expected + 1;
        let content = serde_json::to_string_pretty(&next).context("serializing project registry")?;

        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)
            .with_context(|| format!("creating temp file in {}", self.dir.display()))?;
        tmp.write_all(content.as_bytes())
            .context("writing project registry")?;
        tmp.persist(&path)
            .with_context(|| format!("replacing {}", path.display()))?;
        Ok(StoreOutcome::Stored(next.generation))
    }

    /// Read-modify-write with retry on conflict.
    ///
    /// `f` may run more than once and must only touch the registry it is given.
    /// Nothing is written when `f` leaves the registry unchanged.
    ///
    /// # Errors
    ///
    /// Returns an error on I/O failure or if every attempt conflicted.
    pub fn update<T>(&self, mut f: impl FnMut(&mut ProjectRegistry) -> T) -> Result<T> {
        for attempt in 1..=MAX_ATTEMPTS {
            let snapshot = self.load()?;
            let mut value = snapshot.value.clone();
            let out = f(&mut value);
            if value == snapshot.value {
                return Ok(out);
            }
            match self.store_if(snapshot.generation, &value)? {
                StoreOutcome::Stored(generation) => {
                    tracing::debug!(generation, "project registry updated");
                    return Ok(out);
                }
                StoreOutcome::Conflict(found) => {
                    tracing::debug!(attempt, expected = snapshot.generation, found, "registry write conflict, retrying");
                }
            }
        }
        anyhow::bail!("project registry changed concurrently {MAX_ATTEMPTS} times; giving up")
    }

    /// Create a project. Returns `false` if one with that name exists.
    ///
    /// # Errors
    ///
    /// Returns an error for an invalid name or on I/O failure.
    pub fn create_project(&self, name: &str, description: &str) -> Result<bool> {
        validate_name(name)?;
        self.update(|r| r.create_project(name, description, Local::now()))
    }

    /// # Errors
    ///
    /// Returns an error if the registry cannot be read.
    pub fn get_project(&self, name: &str) -> Result<Option<Project>> {
        Ok(self.load()?.value.projects.get(name).cloned())
    }

    /// Projects, most recently active first.
    ///
    /// # Errors
    ///
    /// Returns an error if the registry cannot be read.
    pub fn list_projects(&self) -> Result<Vec<(String, Project)>> {
        let registry = self.load()?.value;
        Ok(registry
            .sorted_by_activity()
            .into_iter()
            .map(|(n, p)| (n.to_string(), p.clone()))
            .collect())
    }

    /// # Errors
    ///
    /// Returns an error on I/O failure.
    pub fn touch(&self, name: &str) -> Result<bool> {
        self.update(|r| r.touch(name, Local::now()))
    }

    /// Link a context to a project. Returns `false` if the project is unknown
    /// or the link already existed.
    ///
    /// # Errors
    ///
    /// Returns an error for invalid names or on I/O failure.
    pub fn link_context(&self, project: &str, context: &str) -> Result<bool> {
        validate_name(project)?;
        validate_name(context)?;
        self.update(|r| r.link_context(project, context, Local::now()))
    }
}

/// What is on disk at `projects.json`.
enum OnDisk {
    Missing,
    Parsed(ProjectRegistry),
    Unreadable(serde_json::Error),
}

fn read_registry(path: &Path) -> Result<OnDisk> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(OnDisk::Missing),
        Err(e) => return Err(e).with_context(|| format!("reading {}", path.display())),
    };
    Ok(match serde_json::from_str(&content) {
        Ok(r) => OnDisk::Parsed(r),
        Err(e) => OnDisk::Unreadable(e),
    })
}
