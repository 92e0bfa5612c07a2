//! Git layer of the updater, built on libgit2.
//!
//! - `repository`: the cached repository handle and the `GitService` facade
//! - `remote`: remote URL resolution and the `origin` remote
//! - `proxy`: repository-local proxy settings
//! - `sync`: clone / fast-forward / reset state machine
//! - `history`: commit paging, current version, rollback
//! - `tags`: latest stable and pre-release tags on the remote
//! - `tree`: file content at any revision

pub mod history;
pub mod proxy;
pub mod remote;
pub mod repository;
pub mod sync;
pub mod tags;
pub mod tree;

use std::sync::Once;

use git2::ConfigLevel;
use tracing::warn;

pub use repository::{GitService, RepositoryHandle};
pub use sync::ProgressCallback;

static DISABLE_GLOBAL_CONFIG: Once = Once::new();

/// Restrict libgit2 to the repository's own config file.
///
/// Clears the system, XDG, global and ProgramData search paths once per
/// process, so proxy and remote settings are fully determined by `.git/config`.
pub fn disable_global_config() {
    DISABLE_GLOBAL_CONFIG.call_once(|| {
        for level in [
            ConfigLevel::System,
            ConfigLevel::XDG,
            ConfigLevel::Global,
            ConfigLevel::ProgramData,
        ] {
            // SAFETY: runs once, before this process opens a repository
            // through `GitService`; nothing else reads the search path concurrently.
            if let Err(e) = unsafe { git2::opts::set_search_path(level, "") } {
                warn!(?level, error = %e, "Failed to clear git config search path");
            }
        }
    });
}
