use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::error::Result;
use crate::models::CommitPage;
use crate::routes::{run_blocking, SharedService};

pub fn routes(service: SharedService) -> Router {
    Router::new()
        .route("/api/v1/commits", get(get_commits))
        .with_state(service)
}

#[derive(Debug, Deserialize)]
struct CommitsQuery {
    #[serde(default)]
    page: usize,
    #[serde(default = "default_page_size")]
    page_size: usize,
}

fn default_page_size() -> usize {
    10
}

async fn get_commits(
    State(service): State<SharedService>,
    Query(query): Query<CommitsQuery>,
) -> Result<Json<CommitPage>> {
    let CommitsQuery { page, page_size } = query;
    let response = run_blocking(service, move |service| CommitPage {
        page,
        page_size,
        total: service.total_commit_count(),
        commits: service.page_commits(page, page_size),
    })
    .await?;
    Ok(Json(response))
}
