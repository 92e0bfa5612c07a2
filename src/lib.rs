//! git-updater - keeps a deployed application tree in sync with its git remote.
//!
//! `GitService` is the entry point. It owns the configuration and the single
//! cached repository handle, and exposes:
//!
//! - `fetch_latest_code` / `sync`: clone or update the tracked branch
//! - `is_current_branch_latest`: fetch and compare with the remote
//! - `page_commits`, `total_commit_count`, `current_version`, `reset_to_commit`
//! - `latest_tags`: newest stable / pre-release tags on the remote
//! - `read_file_at`: file content at any revision, without checkout
//!
//! Every operation is blocking and reports failures as values.

pub mod config;
pub mod error;
pub mod git;
pub mod models;
pub mod routes;

pub use config::{Provider, RepositoryUrls, SyncConfig, Transport};
pub use error::{AppError, Result};
pub use git::{GitService, ProgressCallback};
pub use models::{CommitRecord, SyncCode, SyncResult, TagPair};
