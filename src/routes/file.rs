//! File content endpoint.
//!
//! GET /api/v1/file?path=<path>&ref=<optional>
//!
//! Returns the file as committed at `ref` (HEAD by default) without touching
//! the working tree. 404 when the path does not exist at that revision.

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::routes::{run_blocking, SharedService};

pub fn routes(service: SharedService) -> Router {
    Router::new()
        .route("/api/v1/file", get(get_file))
        .with_state(service)
}

#[derive(Debug, Deserialize)]
struct FileQuery {
    path: String,
    #[serde(rename = "ref")]
    rev: Option<String>,
}

async fn get_file(
    State(service): State<SharedService>,
    Query(query): Query<FileQuery>,
) -> Result<Json<String>> {
    let FileQuery { path, rev } = query;
    let lookup = path.clone();
    let content = run_blocking(service, move |service| service.read_file_at(&lookup, rev.as_deref())).await?;
    content.map(Json).ok_or(AppError::PathNotFound(path))
}
