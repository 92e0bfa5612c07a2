//! Commit history DTOs.
//!
//! - `CommitRecord`: one row of the update history view
//! - `CommitPage`: a page of records plus the total commit count
//! - `VersionInfo`: what is currently deployed

use serde::{Deserialize, Serialize};

/// Read-only projection of a commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRecord {
    /// First 7 hex characters of the commit id
    pub short_id: String,
    pub author: String,
    /// Commit time in UTC, `%Y-%m-%d %H:%M:%S`
    pub commit_time: String,
    /// First line of the commit message
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitPage {
    pub page: usize,
    pub page_size: usize,
    pub total: usize,
    pub commits: Vec<CommitRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionInfo {
    pub version: Option<String>,
    pub branch: Option<String>,
    pub clean: Option<bool>,
}
