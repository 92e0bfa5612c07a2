//! Update endpoint.
//!
//! POST /api/v1/sync
//!
//! Runs a full sync and returns the `SyncResult`. Progress is logged; the
//! request completes when the sync does.

use axum::{extract::State, routing::post, Json, Router};

use crate::error::Result;
use crate::models::SyncResult;
use crate::routes::{run_blocking, SharedService};

pub fn routes(service: SharedService) -> Router {
    Router::new()
        .route("/api/v1/sync", post(run_sync))
        .with_state(service)
}

async fn run_sync(State(service): State<SharedService>) -> Result<Json<SyncResult>> {
    let result = run_blocking(service, |service| {
        let mut log_progress = |fraction: f32, message: &str| {
            tracing::info!(fraction, "{}", message);
        };
        service.sync(Some(&mut log_progress))
    })
    .await?;
    Ok(Json(result))
}
