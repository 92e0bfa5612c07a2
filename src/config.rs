//! Updater configuration.
//!
//! `SyncConfig` is read from a JSON file and then patched by command-line
//! flags. Every field has a default so a partial (or missing) file is valid.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Default config file looked up inside the work directory.
pub const CONFIG_FILE_NAME: &str = "git-updater.json";

/// Hosting provider the application is published on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    Github,
    Gitee,
}

/// Transport protocol used to talk to the provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    #[default]
    Https,
    Ssh,
}

/// Remote URLs of the project on every supported provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoryUrls {
    pub github_https: String,
    pub github_ssh: String,
    pub gitee_https: String,
    pub gitee_ssh: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Application tree kept in sync; also the repository root.
    pub work_dir: PathBuf,
    /// The single tracked branch.
    pub branch: String,
    pub provider: Provider,
    pub transport: Transport,
    /// Allow destructive resets that discard local changes or commits.
    pub force_update: bool,
    pub personal_proxy_enabled: bool,
    /// `http://`, `https://`, `socks5://` URL or bare `host:port`.
    pub personal_proxy: String,
    /// Route the initial HTTPS clone through a hosting mirror.
    pub hosting_proxy_enabled: bool,
    pub hosting_proxy_url: String,
    pub repositories: RepositoryUrls,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from("."),
            branch: "main".to_string(),
            provider: Provider::default(),
            transport: Transport::default(),
            force_update: false,
            personal_proxy_enabled: false,
            personal_proxy: String::new(),
            hosting_proxy_enabled: false,
            hosting_proxy_url: String::new(),
            repositories: RepositoryUrls::default(),
        }
    }
}

impl SyncConfig {
    /// Load a config file. Relative `work_dir` values are resolved against
    /// the directory containing the file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)?;
        let mut config: SyncConfig = serde_json::from_str(&raw)
            .map_err(|e| AppError::Config(format!("{}: {}", path.display(), e)))?;

        if config.work_dir.is_relative() {
            if let Some(parent) = path.parent() {
                config.work_dir = parent.join(&config.work_dir);
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Load `<work_dir>/git-updater.json` when it exists, defaults otherwise.
    pub fn discover<P: AsRef<Path>>(work_dir: P) -> Result<Self> {
        let work_dir = work_dir.as_ref();
        let candidate = work_dir.join(CONFIG_FILE_NAME);
        if candidate.is_file() {
            return Self::load(candidate);
        }

        Ok(Self {
            work_dir: work_dir.to_path_buf(),
            ..Self::default()
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.branch.trim().is_empty() {
            return Err(AppError::Config("branch must not be empty".to_string()));
        }
        if git2::Branch::name_is_valid(&self.branch).ok() != Some(true) {
            return Err(AppError::Config(format!("invalid branch name: {}", self.branch)));
        }
        Ok(())
    }

    /// Path of the repository metadata directory.
    pub fn dot_git_dir(&self) -> PathBuf {
        self.work_dir.join(".git")
    }
}
