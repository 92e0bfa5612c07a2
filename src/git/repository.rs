//! Cached repository handle and the `GitService` facade that owns it.

use git2::Repository;
use std::path::{Path, PathBuf};

use crate::config::SyncConfig;
use crate::error::{AppError, Result};

/// Lazily opened, cached handle to the repository at the work directory.
///
/// Holds at most one `git2::Repository`. `open(true)` drops the cached handle
/// before reopening, so callers must not keep a borrow across a refresh (the
/// borrow checker enforces this).
pub struct RepositoryHandle {
    path: PathBuf,
    repo: Option<Repository>,
}

impl RepositoryHandle {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            repo: None,
        }
    }

    /// Whether the work directory already carries repository metadata.
    pub fn exists(&self) -> bool {
        self.path.join(".git").exists()
    }

    pub fn open(&mut self, refresh: bool) -> Result<&Repository> {
        let repo = match self.repo.take() {
            Some(repo) if !refresh => repo,
            _ => Repository::open(&self.path).map_err(|e| {
                AppError::RepositoryUnavailable(format!("{}: {}", self.path.display(), e.message()))
            })?,
        };
        Ok(self.repo.insert(repo))
    }

    /// Initialize an empty repository at the work directory and cache a
    /// fresh handle to it.
    pub fn init(&mut self) -> Result<&Repository> {
        self.repo = None;
        Repository::init(&self.path)?;
        self.open(true)
    }
}

/// Entry point of the updater: owns the configuration and the single
/// repository handle. Every public operation reports failures as values.
pub struct GitService {
    pub(crate) config: SyncConfig,
    pub(crate) handle: RepositoryHandle,
}

impl GitService {
    pub fn new(config: SyncConfig) -> Self {
        super::disable_global_config();
        let handle = RepositoryHandle::new(&config.work_dir);
        Self { config, handle }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn repository_exists(&self) -> bool {
        self.handle.exists()
    }

    /// Drop the cached handle and reopen it on next use.
    pub fn refresh(&mut self) -> Result<()> {
        self.handle.open(true).map(|_| ())
    }

    pub fn with_repo<F, T>(&mut self, f: F) -> Result<T>
    where
        F: FnOnce(&Repository, &SyncConfig) -> Result<T>,
    {
        let repo = self.handle.open(false)?;
        f(repo, &self.config)
    }
}
