//! Version endpoints.
//!
//! - GET /api/v1/version
//!   Short id of the deployed commit, current branch, working tree cleanliness.
//!
//! - GET /api/v1/latest
//!   Fetches and reports whether the local branch matches the remote.

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::error::Result;
use crate::models::VersionInfo;
use crate::routes::{run_blocking, SharedService};

pub fn routes(service: SharedService) -> Router {
    Router::new()
        .route("/api/v1/version", get(get_version))
        .route("/api/v1/latest", get(get_latest))
        .with_state(service)
}

async fn get_version(State(service): State<SharedService>) -> Result<Json<VersionInfo>> {
    let info = run_blocking(service, |service| VersionInfo {
        version: service.current_version(),
        branch: service.current_branch(),
        clean: service.is_current_branch_clean(),
    })
    .await?;
    Ok(Json(info))
}

#[derive(Debug, Serialize)]
struct LatestResponse {
    latest: bool,
    message: String,
}

async fn get_latest(State(service): State<SharedService>) -> Result<Json<LatestResponse>> {
    let (latest, message) = run_blocking(service, |service| service.is_current_branch_latest()).await?;
    Ok(Json(LatestResponse { latest, message }))
}
