//! Remote endpoint resolution and the canonical `origin` remote.
//!
//! The URL is recomputed from `SyncConfig` on every call: the user may switch
//! provider, transport or hosting mirror between two runs.

use git2::{Cred, CredentialType, ErrorCode, FetchOptions, ProxyOptions, Remote, RemoteCallbacks, Repository};
use tracing::{error, info};

use crate::config::{Provider, RepositoryUrls, SyncConfig, Transport};
use crate::error::{AppError, Result};
use crate::git::repository::GitService;

/// Name of the single managed remote.
pub const REMOTE_NAME: &str = "origin";

/// Refspec used for every fetch; tracking refs follow server-side force pushes.
pub const FETCH_REFSPEC: &str = "+refs/heads/*:refs/remotes/origin/*";

const MAX_CREDENTIAL_ATTEMPTS: usize = 3;

/// Provider/transport selection derived from `SyncConfig`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteConfig {
    pub provider: Provider,
    pub transport: Transport,
    /// Hosting mirror prefix, present only when enabled and non-empty
    pub hosting_proxy: Option<String>,
}

impl RemoteConfig {
    pub fn from_config(config: &SyncConfig) -> Self {
        let mirror = config.hosting_proxy_url.trim().trim_end_matches('/');
        Self {
            provider: config.provider,
            transport: config.transport,
            hosting_proxy: (config.hosting_proxy_enabled && !mirror.is_empty())
                .then(|| mirror.to_string()),
        }
    }

    /// Effective remote URL, or `None` when the selected pair has no URL.
    ///
    /// Only GitHub over HTTPS goes through the hosting mirror, and only for
    /// the initial clone; incremental fetches talk to the canonical host.
    pub fn resolve(&self, urls: &RepositoryUrls, for_clone: bool) -> Option<String> {
        let url = match (self.provider, self.transport) {
            (Provider::Github, Transport::Https) => urls.github_https.trim(),
            (Provider::Github, Transport::Ssh) => urls.github_ssh.trim(),
            (Provider::Gitee, Transport::Https) => urls.gitee_https.trim(),
            (Provider::Gitee, Transport::Ssh) => urls.gitee_ssh.trim(),
        };
        if url.is_empty() {
            return None;
        }

        match (&self.hosting_proxy, self.provider, self.transport) {
            (Some(mirror), Provider::Github, Transport::Https) if for_clone => {
                Some(format!("{}/{}", mirror, url))
            }
            _ => Some(url.to_string()),
        }
    }
}

/// Make `origin` point at `url`: reuse, update in place, or create.
pub fn ensure_remote<'r>(repo: &'r Repository, url: &str) -> Result<Remote<'r>> {
    match repo.find_remote(REMOTE_NAME) {
        Ok(remote) => {
            if remote.url() == Some(url) {
                return Ok(remote);
            }
            info!(
                from = remote.url().unwrap_or(""),
                to = url,
                "Updating remote URL"
            );
            repo.remote_set_url(REMOTE_NAME, url)?;
            Ok(repo.find_remote(REMOTE_NAME)?)
        }
        Err(e) if e.code() == ErrorCode::NotFound => {
            info!(remote = REMOTE_NAME, url, "Creating remote");
            Ok(repo.remote(REMOTE_NAME, url)?)
        }
        Err(e) => Err(e.into()),
    }
}

fn configure_remote<'r>(repo: &'r Repository, config: &SyncConfig, for_clone: bool) -> Result<Remote<'r>> {
    let url = RemoteConfig::from_config(config)
        .resolve(&config.repositories, for_clone)
        .ok_or_else(|| {
            AppError::RemoteUnavailable(format!("{:?} over {:?}", config.provider, config.transport))
        })?;
    ensure_remote(repo, &url)
}

/// Resolve the URL and ensure the remote; failures are logged and yield `None`.
pub(crate) fn prepare_remote<'r>(
    repo: &'r Repository,
    config: &SyncConfig,
    for_clone: bool,
) -> Option<Remote<'r>> {
    match configure_remote(repo, config, for_clone) {
        Ok(remote) => Some(remote),
        Err(e) => {
            error!(error = %e, "Failed to configure remote");
            None
        }
    }
}

/// Credentials: SSH agent for SSH remotes, libgit2 defaults otherwise.
pub(crate) fn remote_callbacks<'cb>() -> RemoteCallbacks<'cb> {
    let mut attempts = 0;
    let mut callbacks = RemoteCallbacks::new();
    callbacks.credentials(move |_url, username_from_url, allowed| {
        attempts += 1;
        if attempts > MAX_CREDENTIAL_ATTEMPTS {
            return Err(git2::Error::from_str("authentication failed"));
        }
        if allowed.contains(CredentialType::SSH_KEY) {
            return Cred::ssh_key_from_agent(username_from_url.unwrap_or("git"));
        }
        Cred::default()
    });
    callbacks
}

/// Let libgit2 pick up `http.proxy` from the repository config.
pub(crate) fn auto_proxy<'a>() -> ProxyOptions<'a> {
    let mut proxy = ProxyOptions::new();
    proxy.auto();
    proxy
}

pub(crate) fn fetch_options<'cb>() -> FetchOptions<'cb> {
    let mut fetch = FetchOptions::new();
    fetch.remote_callbacks(remote_callbacks());
    fetch.proxy_options(auto_proxy());
    fetch
}

impl GitService {
    pub fn remote_url(&self, for_clone: bool) -> Option<String> {
        RemoteConfig::from_config(&self.config).resolve(&self.config.repositories, for_clone)
    }

    /// Re-apply the configured remote URL when a repository exists.
    pub fn update_remote(&mut self) -> bool {
        if !self.handle.exists() {
            return false;
        }

        let config = &self.config;
        match self.handle.open(false) {
            Ok(repo) => prepare_remote(repo, config, false).is_some(),
            Err(e) => {
                error!(error = %e, "Failed to open repository");
                false
            }
        }
    }
}
