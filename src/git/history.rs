//! Update history: commit paging, deployed version and rollback.

use git2::{Repository, ResetType, Sort};
use tracing::{error, info, warn};

use crate::error::Result;
use crate::git::repository::GitService;
use crate::models::CommitRecord;

const SHORT_ID_LEN: usize = 7;

pub fn commit_to_record(commit: &git2::Commit) -> CommitRecord {
    let mut short_id = commit.id().to_string();
    short_id.truncate(SHORT_ID_LEN);

    let commit_time = chrono::DateTime::from_timestamp(commit.time().seconds(), 0)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_default();

    CommitRecord {
        short_id,
        author: commit.author().name().unwrap_or("").to_string(),
        commit_time,
        message: commit.message().unwrap_or("").lines().next().unwrap_or("").to_string(),
    }
}

/// Walk from HEAD with the given sorting; `None` for an empty repository.
fn walk_from_head(repo: &Repository, sorting: Sort) -> Result<Option<git2::Revwalk<'_>>> {
    let head = match repo.head().map(|h| h.target()) {
        Ok(Some(oid)) => oid,
        Ok(None) | Err(_) => {
            warn!("HEAD unavailable, repository may be empty");
            return Ok(None);
        }
    };

    let mut revwalk = repo.revwalk()?;
    revwalk.set_sorting(sorting)?;
    revwalk.push(head)?;
    Ok(Some(revwalk))
}

fn count_commits(repo: &Repository) -> Result<usize> {
    let Some(revwalk) = walk_from_head(repo, Sort::TOPOLOGICAL)? else {
        return Ok(0);
    };

    let mut total = 0;
    for oid in revwalk {
        oid?;
        total += 1;
    }
    Ok(total)
}

fn page_of_commits(repo: &Repository, page: usize, page_size: usize) -> Result<Vec<CommitRecord>> {
    if page_size == 0 {
        return Ok(Vec::new());
    }
    let Some(revwalk) = walk_from_head(repo, Sort::TIME)? else {
        return Ok(Vec::new());
    };

    let mut records = Vec::new();
    for oid in revwalk.skip(page.saturating_mul(page_size)).take(page_size) {
        let commit = repo.find_commit(oid?)?;
        records.push(commit_to_record(&commit));
    }
    Ok(records)
}

impl GitService {
    /// Number of commits reachable from HEAD; 0 for an empty repository.
    pub fn total_commit_count(&mut self) -> usize {
        info!("Counting commits");
        self.with_repo(|repo, _| count_commits(repo)).unwrap_or_else(|e| {
            error!(error = %e, "Failed to count commits");
            0
        })
    }

    /// Commits newest first; `page` is zero-based.
    pub fn page_commits(&mut self, page: usize, page_size: usize) -> Vec<CommitRecord> {
        info!(page, page_size, "Loading commit page");
        self.with_repo(|repo, _| page_of_commits(repo, page, page_size))
            .unwrap_or_else(|e| {
                error!(error = %e, "Failed to load commits");
                Vec::new()
            })
    }

    /// Short id of the most recent commit.
    pub fn current_version(&mut self) -> Option<String> {
        self.page_commits(0, 1).into_iter().next().map(|record| record.short_id)
    }

    /// Roll the work directory back (or forward) to any revision.
    pub fn reset_to_commit(&mut self, rev: &str) -> bool {
        let result = self.with_repo(|repo, _| {
            let commit = repo.revparse_single(rev)?.peel_to_commit()?;
            repo.reset(commit.as_object(), ResetType::Hard, None)?;
            Ok(commit.id())
        });

        match result {
            Ok(oid) => {
                info!(rev, commit = %oid, "Reset to commit");
                true
            }
            Err(e) => {
                error!(rev, error = %e, "Failed to reset to commit");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use git2::{Signature, Time};
    use tempfile::TempDir;

    #[test]
    fn test_record_projection() {
        let tmp = TempDir::new().unwrap();
        let repo = Repository::init(tmp.path()).unwrap();
        let tree = repo.find_tree(repo.index().unwrap().write_tree().unwrap()).unwrap();
        let sig = Signature::new("Ada", "ada@example.com", &Time::new(0, 0)).unwrap();
        let oid = repo
            .commit(Some("HEAD"), &sig, &sig, "Subject line\n\nBody text", &tree, &[])
            .unwrap();

        let record = commit_to_record(&repo.find_commit(oid).unwrap());
        assert_eq!(record.short_id, oid.to_string()[..7]);
        assert_eq!(record.author, "Ada");
        assert_eq!(record.commit_time, "1970-01-01 00:00:00");
        assert_eq!(record.message, "Subject line");
    }

    #[test]
    fn test_empty_repository_has_no_history() {
        let tmp = TempDir::new().unwrap();
        let repo = Repository::init(tmp.path()).unwrap();

        assert_eq!(count_commits(&repo).unwrap(), 0);
        assert!(page_of_commits(&repo, 0, 10).unwrap().is_empty());
    }

    #[test]
    fn test_huge_page_size() {
        let tmp = TempDir::new().unwrap();
        let repo = Repository::init(tmp.path()).unwrap();
        let tree = repo.find_tree(repo.index().unwrap().write_tree().unwrap()).unwrap();
        let sig = Signature::new("Ada", "ada@example.com", &Time::new(0, 0)).unwrap();
        repo.commit(Some("HEAD"), &sig, &sig, "only", &tree, &[]).unwrap();

        let page = page_of_commits(&repo, 0, usize::MAX).unwrap();
        assert_eq!(page.len(), 1);
        assert!(page_of_commits(&repo, usize::MAX, usize::MAX).unwrap().is_empty());
    }
}
