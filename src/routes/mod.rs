//! Status API for a version-check UI.
//!
//! Each submodule defines routes for a feature area:
//! - `version`: deployed version and "is latest" check
//! - `commits`: paged update history
//! - `tags`: newest stable / pre-release tags on the remote
//! - `file`: file content at a revision
//! - `sync`: trigger an update
//!
//! The engine is blocking and not reentrant: every handler runs it on a
//! blocking worker while holding the single service mutex.

pub mod commits;
pub mod file;
pub mod sync;
pub mod tags;
pub mod version;

use std::sync::{Arc, Mutex};

use axum::Router;

use crate::error::{AppError, Result};
use crate::git::GitService;

pub type SharedService = Arc<Mutex<GitService>>;

pub fn create_router(service: SharedService) -> Router {
    Router::new()
        .merge(version::routes(service.clone()))
        .merge(commits::routes(service.clone()))
        .merge(tags::routes(service.clone()))
        .merge(file::routes(service.clone()))
        .merge(sync::routes(service))
}

/// Run `f` against the service on a blocking thread.
pub(crate) async fn run_blocking<F, T>(service: SharedService, f: F) -> Result<T>
where
    F: FnOnce(&mut GitService) -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let mut service = service
            .lock()
            .map_err(|_| AppError::Internal("Lock poisoned".to_string()))?;
        Ok(f(&mut service))
    })
    .await
    .map_err(|e| AppError::Internal(e.to_string()))?
}
