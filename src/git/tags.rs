//! Release tags published on the remote.
//!
//! Tags are read with a live `ls-remote` style listing, so the answer reflects
//! the server even when nothing has been fetched yet.

use std::collections::HashSet;

use git2::{Direction, Remote};
use semver::Version;
use tracing::{debug, error};

use crate::error::Result;
use crate::git::proxy::apply_proxy;
use crate::git::remote::{auto_proxy, prepare_remote, remote_callbacks};
use crate::git::repository::GitService;
use crate::models::TagPair;

/// Tag-name convention marking a pre-release.
pub const PRERELEASE_MARKER: &str = "-beta";

const TAG_PREFIX: &str = "refs/tags/";

/// Lenient version parse: optional `v`, missing minor/patch padded with 0.
pub fn parse_version(tag: &str) -> Option<Version> {
    let raw = tag.strip_prefix('v').or_else(|| tag.strip_prefix('V')).unwrap_or(tag);
    if let Ok(version) = Version::parse(raw) {
        return Some(version);
    }

    let (core, suffix) = match raw.find(|c: char| c == '-' || c == '+') {
        Some(idx) => raw.split_at(idx),
        None => (raw, ""),
    };
    let mut parts: Vec<&str> = core.split('.').collect();
    if parts.len() > 3 {
        return None;
    }
    while parts.len() < 3 {
        parts.push("0");
    }
    Version::parse(&format!("{}{}", parts.join("."), suffix)).ok()
}

/// De-duplicate and order tag names by semantic version, oldest first.
/// Names that are not versions are dropped.
pub fn sort_versions<I>(names: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut seen = HashSet::new();
    let mut versions: Vec<(Version, String)> = names
        .into_iter()
        .filter(|name| seen.insert(name.clone()))
        .filter_map(|name| match parse_version(&name) {
            Some(version) => Some((version, name)),
            None => {
                debug!(tag = %name, "Skipping non-version tag");
                None
            }
        })
        .collect();
    versions.sort_by(|a, b| a.0.cmp(&b.0));
    versions.into_iter().map(|(_, name)| name).collect()
}

/// Pick the newest stable tag, plus the newest pre-release published after it.
///
/// `versions` must be sorted ascending. Scanning runs newest first and stops
/// at the first stable tag.
pub fn select_latest(versions: &[String]) -> TagPair {
    let mut pair = TagPair::default();
    for version in versions.iter().rev() {
        if version.contains(PRERELEASE_MARKER) {
            if pair.latest_beta.is_none() {
                pair.latest_beta = Some(version.clone());
            }
        } else {
            pair.latest_stable = Some(version.clone());
            break;
        }
    }
    pair
}

fn list_remote_tags(remote: &mut Remote<'_>) -> Result<Vec<String>> {
    let connection = remote.connect_auth(Direction::Fetch, Some(remote_callbacks()), Some(auto_proxy()))?;
    let names = connection
        .list()?
        .iter()
        .filter_map(|head| head.name().strip_prefix(TAG_PREFIX))
        .map(|name| name.trim_end_matches("^{}").to_string())
        .collect();
    Ok(names)
}

impl GitService {
    pub fn latest_tags(&mut self) -> TagPair {
        if !self.handle.exists() {
            return TagPair::default();
        }

        let config = &self.config;
        let repo = match self.handle.open(false) {
            Ok(repo) => repo,
            Err(e) => {
                error!(error = %e, "Failed to open repository");
                return TagPair::default();
            }
        };
        let Some(mut remote) = prepare_remote(repo, config, false) else {
            error!("Failed to update remote repository address");
            return TagPair::default();
        };
        apply_proxy(repo, config);

        match list_remote_tags(&mut remote) {
            Ok(names) => select_latest(&sort_versions(names)),
            Err(e) => {
                error!(error = %e, "Failed to list remote tags");
                TagPair::default()
            }
        }
    }
}
