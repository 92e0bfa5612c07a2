//! Sync engine: bring the work directory to the tip of the tracked branch.
//!
//! Without a repository the engine clones (init + fetch + checkout). With one
//! it fetches, guards uncommitted changes, switches to the target branch and
//! reconciles the local tip with the remote-tracking tip:
//!
//! - remote branch missing → soft success, nothing to sync against
//! - no local commit → reset (forced update only)
//! - local is (an ancestor of) remote → fast-forward via hard reset
//! - diverged or ahead → hard reset when forced, otherwise refuse
//!
//! Hard resets happen only on fast-forward or with `force_update` enabled.

use git2::build::CheckoutBuilder;
use git2::{BranchType, Commit, ErrorCode, Oid, Remote, Repository, ResetType, StatusOptions};
use tracing::{debug, error, info, warn};

use crate::config::SyncConfig;
use crate::error::{AppError, Result};
use crate::git::proxy::apply_proxy;
use crate::git::remote::{FETCH_REFSPEC, REMOTE_NAME, fetch_options, prepare_remote};
use crate::git::repository::GitService;
use crate::models::{SyncCode, SyncResult};

/// Progress sink: `(fraction, message)`, fraction `-1.0` is indeterminate.
pub type ProgressCallback<'a> = &'a mut dyn FnMut(f32, &str);

const MSG_INIT: &str = "Initializing local repository";
const MSG_CHECKING: &str = "Checking local repository";
const MSG_REMOTE_FAILED: &str = "Failed to update remote repository address";
const MSG_FETCH_OK: &str = "Fetched remote code";
const MSG_FETCH_FAILED: &str = "Failed to fetch remote code";
const MSG_CLONE_OK: &str = "Repository cloned";
const MSG_CLONE_FAILED: &str = "Failed to clone repository";
const MSG_DIRTY: &str = "Local changes detected and forced update is disabled, resolve them before updating";
const MSG_FORCE_FAILED: &str = "Forced update failed";
const MSG_CLEAN: &str = "No local changes";
const MSG_BRANCH_FAILED: &str = "Failed to detect current branch";
const MSG_BRANCH_OK: &str = "Detected current branch";
const MSG_SWITCH_FAILED: &str = "Failed to switch to target branch";
const MSG_SWITCH_OK: &str = "Switched to target branch";
const MSG_UPDATE_OK: &str = "Local code updated";
const MSG_UPDATE_FAILED: &str = "Failed to update local code";
const MSG_REMOTE_BRANCH_MISSING: &str = "Remote branch not found, nothing to update";
const MSG_NOT_LATEST: &str = "Local branch differs from remote";

struct Progress<'a> {
    callback: Option<ProgressCallback<'a>>,
}

impl<'a> Progress<'a> {
    fn new(callback: Option<ProgressCallback<'a>>) -> Self {
        Self { callback }
    }

    fn report(&mut self, fraction: f32, message: &str) {
        if let Some(callback) = self.callback.as_deref_mut() {
            callback(fraction, message);
        }
    }
}

pub fn local_ref(branch: &str) -> String {
    format!("refs/heads/{}", branch)
}

pub fn remote_ref(branch: &str) -> String {
    format!("refs/remotes/{}/{}", REMOTE_NAME, branch)
}

/// Commit of the remote-tracking ref, `None` when the ref does not exist.
pub fn remote_branch_commit<'r>(repo: &'r Repository, branch: &str) -> Result<Option<Commit<'r>>> {
    match repo.find_reference(&remote_ref(branch)) {
        Ok(reference) => Ok(Some(reference.peel_to_commit()?)),
        Err(e) if e.code() == ErrorCode::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Remote-tracking commit first, then (if allowed) whatever HEAD points at.
fn resolve_branch_commit<'r>(repo: &'r Repository, branch: &str, allow_local: bool) -> Option<Commit<'r>> {
    match remote_branch_commit(repo, branch) {
        Ok(Some(commit)) => return Some(commit),
        Ok(None) => debug!(branch, "No remote-tracking ref"),
        Err(e) => error!(branch, error = %e, "Failed to read remote branch"),
    }

    if allow_local {
        match repo.head().and_then(|head| head.peel_to_commit()) {
            Ok(commit) => return Some(commit),
            Err(e) => error!(error = %e, "Failed to read local HEAD"),
        }
    }

    None
}

/// Switch HEAD to the local branch and force-checkout it.
///
/// A missing local branch is created at `commit`. An existing one keeps its
/// tip unless `move_existing` is set.
fn checkout_branch(repo: &Repository, branch: &str, commit: &Commit<'_>, move_existing: bool) -> Result<Oid> {
    let target = match repo.find_branch(branch, BranchType::Local) {
        Ok(mut existing) if move_existing => {
            existing.get_mut().set_target(commit.id(), "git-updater: move branch")?;
            commit.id()
        }
        Ok(existing) => existing.get().peel_to_commit()?.id(),
        Err(e) if e.code() == ErrorCode::NotFound => {
            repo.branch(branch, commit, false)?;
            commit.id()
        }
        Err(e) => return Err(e.into()),
    };

    repo.set_head(&local_ref(branch))?;
    repo.checkout_head(Some(CheckoutBuilder::new().force()))?;
    Ok(target)
}

fn hard_reset(repo: &Repository, commit: &Commit<'_>) -> Result<()> {
    repo.reset(commit.as_object(), ResetType::Hard, None)?;
    Ok(())
}

/// Clean means no staged, unstaged or untracked (non-ignored) changes.
pub fn working_tree_clean(repo: &Repository) -> Result<bool> {
    let mut opts = StatusOptions::new();
    opts.include_untracked(true).include_ignored(false);
    Ok(repo.statuses(Some(&mut opts))?.is_empty())
}

/// Name of the branch HEAD points at, including an unborn branch.
pub fn current_branch_name(repo: &Repository) -> Result<String> {
    match repo.head() {
        Ok(head) => head
            .shorthand()
            .map(str::to_string)
            .ok_or_else(|| AppError::Internal("HEAD name is not valid UTF-8".to_string())),
        Err(e) if e.code() == ErrorCode::UnbornBranch => {
            let head = repo.find_reference("HEAD")?;
            let target = head
                .symbolic_target()
                .ok_or_else(|| AppError::Internal("HEAD is not symbolic".to_string()))?;
            Ok(target.trim_start_matches("refs/heads/").to_string())
        }
        Err(e) => Err(e.into()),
    }
}

fn fetch_remote(
    repo: &Repository,
    remote: &mut Remote<'_>,
    config: &SyncConfig,
) -> std::result::Result<(), SyncResult> {
    info!(url = remote.url().unwrap_or(""), "Fetching remote code");
    apply_proxy(repo, config);

    let mut fetch = fetch_options();
    match remote.fetch(&[FETCH_REFSPEC], Some(&mut fetch), None) {
        Ok(()) => {
            info!("Fetched remote code");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Failed to fetch remote code");
            Err(SyncResult::fail(SyncCode::FetchError, MSG_FETCH_FAILED).with_detail(e.message()))
        }
    }
}

fn clone_into(repo: &Repository, config: &SyncConfig, progress: &mut Progress<'_>) -> SyncResult {
    let Some(mut remote) = prepare_remote(repo, config, true) else {
        return SyncResult::fail(SyncCode::RemoteConfigError, MSG_REMOTE_FAILED);
    };
    if let Err(result) = fetch_remote(repo, &mut remote, config) {
        return result;
    }
    progress.report(0.6, MSG_FETCH_OK);

    let branch = &config.branch;
    let commit = match remote_branch_commit(repo, branch) {
        Ok(Some(commit)) => commit,
        Ok(None) => {
            error!(branch = %branch, "Remote branch not found");
            return SyncResult::fail(SyncCode::RemoteBranchMissing, MSG_CLONE_FAILED)
                .with_detail(format!("missing {}", remote_ref(branch)));
        }
        Err(e) => {
            error!(error = %e, "Failed to read remote branch");
            return SyncResult::fail(SyncCode::SyncError, MSG_CLONE_FAILED).with_detail(e.to_string());
        }
    };

    let checked_out = checkout_branch(repo, branch, &commit, true).and_then(|_| hard_reset(repo, &commit));
    if let Err(e) = checked_out {
        error!(error = %e, "Failed to check out cloned branch");
        return SyncResult::fail(SyncCode::SyncError, MSG_CLONE_FAILED).with_detail(e.to_string());
    }

    progress.report(1.0, MSG_CLONE_OK);
    SyncResult::ok(SyncCode::ResetHead, MSG_CLONE_OK).with_detail(format!("cloned {}", commit.id()))
}

fn checkout_latest(repo: &Repository, config: &SyncConfig, progress: &mut Progress<'_>) -> SyncResult {
    progress.report(0.0, MSG_CHECKING);

    let Some(mut remote) = prepare_remote(repo, config, false) else {
        return SyncResult::fail(SyncCode::RemoteConfigError, MSG_REMOTE_FAILED);
    };
    if let Err(result) = fetch_remote(repo, &mut remote, config) {
        return result;
    }
    progress.report(0.2, MSG_FETCH_OK);

    let branch = &config.branch;
    let clean = working_tree_clean(repo).unwrap_or_else(|e| {
        warn!(error = %e, "Failed to read working tree status");
        false
    });
    if !clean {
        if !config.force_update {
            return SyncResult::fail(SyncCode::NeedManualResolution, MSG_DIRTY);
        }
        warn!(branch = %branch, "Discarding local changes (forced update)");
        let reset = match remote_branch_commit(repo, branch) {
            Ok(Some(commit)) => hard_reset(repo, &commit),
            Ok(None) => Err(AppError::BranchNotFound(remote_ref(branch))),
            Err(e) => Err(e),
        };
        if let Err(e) = reset {
            error!(error = %e, "Forced update failed");
            return SyncResult::fail(SyncCode::SyncError, MSG_FORCE_FAILED).with_detail(e.to_string());
        }
    }
    progress.report(0.4, MSG_CLEAN);

    match current_branch_name(repo) {
        Ok(current) => debug!(current = %current, target = %branch, "Detected current branch"),
        Err(e) => {
            error!(error = %e, "Failed to detect current branch");
            return SyncResult::fail(SyncCode::SyncError, MSG_BRANCH_FAILED).with_detail(e.to_string());
        }
    }
    progress.report(0.6, MSG_BRANCH_OK);

    let Some(commit) = resolve_branch_commit(repo, branch, true) else {
        return SyncResult::fail(SyncCode::SyncError, MSG_SWITCH_FAILED)
            .with_detail(format!("no commit for {}", branch));
    };
    if let Err(e) = checkout_branch(repo, branch, &commit, false) {
        error!(error = %e, "Failed to switch branch");
        return SyncResult::fail(SyncCode::SyncError, MSG_SWITCH_FAILED).with_detail(e.to_string());
    }
    progress.report(0.8, MSG_SWITCH_OK);

    let result = reconcile(repo, branch, config.force_update).unwrap_or_else(|e| {
        error!(error = %e, "Failed to sync branch");
        SyncResult::fail(SyncCode::SyncError, MSG_UPDATE_FAILED).with_detail(e.to_string())
    });
    if result.success {
        progress.report(1.0, &result.message);
    }
    result
}

/// Move the local tip to the remote-tracking tip when that is allowed.
fn reconcile(repo: &Repository, branch: &str, force: bool) -> Result<SyncResult> {
    let Some(remote_commit) = remote_branch_commit(repo, branch)? else {
        return Ok(SyncResult::ok(SyncCode::RemoteBranchMissing, MSG_REMOTE_BRANCH_MISSING)
            .with_detail(format!("missing {}", remote_ref(branch))));
    };
    let remote_oid = remote_commit.id();

    let local_oid = repo.head().ok().and_then(|head| head.target());
    let Some(local_oid) = local_oid else {
        if force {
            hard_reset(repo, &remote_commit)?;
            return Ok(SyncResult::ok(SyncCode::ResetHead, MSG_UPDATE_OK)
                .with_detail(format!("reset to {}", remote_oid)));
        }
        return Ok(SyncResult::fail(SyncCode::HeadMissing, MSG_UPDATE_FAILED).with_detail("HEAD missing"));
    };

    let fast_forward =
        local_oid == remote_oid || repo.graph_descendant_of(remote_oid, local_oid).unwrap_or(false);
    if fast_forward {
        hard_reset(repo, &remote_commit)?;
        return Ok(SyncResult::ok(SyncCode::FastForward, MSG_UPDATE_OK)
            .with_detail(format!("{} -> {}", local_oid, remote_oid)));
    }

    if force {
        warn!(local = %local_oid, remote = %remote_oid, "Discarding local commits (forced update)");
        hard_reset(repo, &remote_commit)?;
        return Ok(SyncResult::ok(SyncCode::ForcedReset, MSG_UPDATE_OK)
            .with_detail(format!("{} -> {}", local_oid, remote_oid)));
    }

    Ok(SyncResult::fail(SyncCode::NeedManualRebase, MSG_UPDATE_FAILED)
        .with_detail(format!("local {} diverged from {}", local_oid, remote_oid)))
}

fn is_latest(repo: &Repository, config: &SyncConfig) -> Result<(bool, String)> {
    let Some(mut remote) = prepare_remote(repo, config, false) else {
        return Ok((false, MSG_REMOTE_FAILED.to_string()));
    };
    if let Err(result) = fetch_remote(repo, &mut remote, config) {
        return Ok(result.into_tuple());
    }

    let Some(remote_commit) = remote_branch_commit(repo, &config.branch)? else {
        return Ok((false, MSG_NOT_LATEST.to_string()));
    };
    let local_commit = repo.head()?.peel_to_commit()?;
    if local_commit.id() == remote_commit.id() {
        return Ok((true, String::new()));
    }

    let diff = repo.diff_tree_to_tree(Some(&local_commit.tree()?), Some(&remote_commit.tree()?), None)?;
    if diff.deltas().len() == 0 {
        Ok((true, String::new()))
    } else {
        Ok((false, MSG_NOT_LATEST.to_string()))
    }
}

impl GitService {
    /// Update the work directory and collapse the outcome to `(success, message)`.
    pub fn fetch_latest_code(&mut self, progress: Option<ProgressCallback<'_>>) -> (bool, String) {
        self.sync(progress).into_tuple()
    }

    /// Clone when no repository exists, otherwise update the tracked branch.
    pub fn sync(&mut self, progress: Option<ProgressCallback<'_>>) -> SyncResult {
        info!(path = %self.config.dot_git_dir().display(), "Checking repository");

        let result = if self.handle.exists() {
            self.checkout_latest_branch(progress)
        } else {
            self.clone_repository(progress)
        };

        if result.success {
            info!(code = %result.code, detail = result.detail.as_deref().unwrap_or(""), "{}", result.message);
        } else {
            error!(code = %result.code, detail = result.detail.as_deref().unwrap_or(""), "{}", result.message);
        }
        result
    }

    pub fn clone_repository(&mut self, progress: Option<ProgressCallback<'_>>) -> SyncResult {
        let mut progress = Progress::new(progress);
        progress.report(-1.0, MSG_INIT);
        info!(path = %self.config.work_dir.display(), "Initializing local repository");

        let config = &self.config;
        match self.handle.init() {
            Ok(repo) => clone_into(repo, config, &mut progress),
            Err(e) => {
                error!(error = %e, "Failed to initialize repository");
                SyncResult::fail(SyncCode::SyncError, MSG_CLONE_FAILED).with_detail(e.to_string())
            }
        }
    }

    pub fn checkout_latest_branch(&mut self, progress: Option<ProgressCallback<'_>>) -> SyncResult {
        let mut progress = Progress::new(progress);
        let config = &self.config;
        match self.handle.open(false) {
            Ok(repo) => checkout_latest(repo, config, &mut progress),
            Err(e) => {
                error!(error = %e, "Failed to open repository");
                SyncResult::fail(SyncCode::SyncError, MSG_UPDATE_FAILED).with_detail(e.to_string())
            }
        }
    }

    /// Fetch and compare HEAD with the remote-tracking tip, by id then by tree.
    pub fn is_current_branch_latest(&mut self) -> (bool, String) {
        info!("Checking whether local code is up to date");
        self.with_repo(is_latest).unwrap_or_else(|e| {
            error!(error = %e, "Failed to check for updates");
            (false, MSG_NOT_LATEST.to_string())
        })
    }

    pub fn current_branch(&mut self) -> Option<String> {
        self.with_repo(|repo, _| current_branch_name(repo)).ok()
    }

    /// `None` when the status could not be read.
    pub fn is_current_branch_clean(&mut self) -> Option<bool> {
        self.with_repo(|repo, _| working_tree_clean(repo)).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use git2::Signature;
    use std::path::Path;
    use tempfile::TempDir;

    fn commit_file(repo: &Repository, name: &str, content: &str) -> Oid {
        let workdir = repo.workdir().unwrap();
        std::fs::write(workdir.join(name), content).unwrap();
        let mut index = repo.index().unwrap();
        index.add_path(Path::new(name)).unwrap();
        index.write().unwrap();
        let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
        let sig = Signature::now("Tester", "tester@example.com").unwrap();
        let parents: Vec<Commit<'_>> = repo.head().ok().and_then(|h| h.peel_to_commit().ok()).into_iter().collect();
        let parent_refs: Vec<&Commit<'_>> = parents.iter().collect();
        repo.commit(Some("HEAD"), &sig, &sig, content, &tree, &parent_refs).unwrap()
    }

    #[test]
    fn test_refs_are_namespaced() {
        assert_eq!(local_ref("main"), "refs/heads/main");
        assert_eq!(remote_ref("main"), "refs/remotes/origin/main");
    }

    #[test]
    fn test_current_branch_on_unborn_head() {
        let tmp = TempDir::new().unwrap();
        let repo = Repository::init(tmp.path()).unwrap();
        repo.set_head("refs/heads/dev").unwrap();

        assert_eq!(current_branch_name(&repo).unwrap(), "dev");
    }

    #[test]
    fn test_working_tree_clean_tracks_untracked_files() {
        let tmp = TempDir::new().unwrap();
        let repo = Repository::init(tmp.path()).unwrap();
        commit_file(&repo, "a.txt", "one");
        assert!(working_tree_clean(&repo).unwrap());

        std::fs::write(tmp.path().join("new.txt"), "x").unwrap();
        assert!(!working_tree_clean(&repo).unwrap());
    }

    #[test]
    fn test_reconcile_without_remote_ref_is_soft_success() {
        let tmp = TempDir::new().unwrap();
        let repo = Repository::init(tmp.path()).unwrap();
        commit_file(&repo, "a.txt", "one");

        let result = reconcile(&repo, "main", false).unwrap();
        assert!(result.success);
        assert_eq!(result.code, SyncCode::RemoteBranchMissing);
    }

    #[test]
    fn test_reconcile_classifies_divergence() {
        let tmp = TempDir::new().unwrap();
        let repo = Repository::init(tmp.path()).unwrap();
        let base = commit_file(&repo, "a.txt", "base");
        let remote_tip = commit_file(&repo, "a.txt", "remote");
        repo.reference(&remote_ref("main"), remote_tip, true, "test").unwrap();

        // local diverges from base on its own line
        let base_commit = repo.find_commit(base).unwrap();
        repo.reset(base_commit.as_object(), ResetType::Hard, None).unwrap();
        let local_tip = commit_file(&repo, "b.txt", "local");

        let refused = reconcile(&repo, "main", false).unwrap();
        assert!(!refused.success);
        assert_eq!(refused.code, SyncCode::NeedManualRebase);
        assert_eq!(repo.head().unwrap().target(), Some(local_tip));

        let forced = reconcile(&repo, "main", true).unwrap();
        assert!(forced.success);
        assert_eq!(forced.code, SyncCode::ForcedReset);
        assert_eq!(repo.head().unwrap().target(), Some(remote_tip));
    }

    #[test]
    fn test_reconcile_fast_forwards_ancestor() {
        let tmp = TempDir::new().unwrap();
        let repo = Repository::init(tmp.path()).unwrap();
        let base = commit_file(&repo, "a.txt", "base");
        let remote_tip = commit_file(&repo, "a.txt", "newer");
        repo.reference(&remote_ref("main"), remote_tip, true, "test").unwrap();
        let base_commit = repo.find_commit(base).unwrap();
        repo.reset(base_commit.as_object(), ResetType::Hard, None).unwrap();

        let result = reconcile(&repo, "main", false).unwrap();
        assert_eq!(result.code, SyncCode::FastForward);
        assert_eq!(repo.head().unwrap().target(), Some(remote_tip));
        assert_eq!(std::fs::read_to_string(tmp.path().join("a.txt")).unwrap(), "newer");
    }

    #[test]
    fn test_reconcile_unborn_head() {
        let tmp = TempDir::new().unwrap();
        let upstream = Repository::init(tmp.path().join("up")).unwrap();
        let tip = commit_file(&upstream, "a.txt", "remote");

        let repo = Repository::init(tmp.path().join("local")).unwrap();
        let mut remote = repo.remote(REMOTE_NAME, upstream.workdir().unwrap().to_str().unwrap()).unwrap();
        remote.fetch(&[FETCH_REFSPEC], None, None).unwrap();
        let branch = current_branch_name(&upstream).unwrap();
        repo.set_head(&local_ref(&branch)).unwrap();

        let refused = reconcile(&repo, &branch, false).unwrap();
        assert_eq!(refused.code, SyncCode::HeadMissing);

        let reset = reconcile(&repo, &branch, true).unwrap();
        assert_eq!(reset.code, SyncCode::ResetHead);
        assert_eq!(repo.head().unwrap().target(), Some(tip));
    }
}
