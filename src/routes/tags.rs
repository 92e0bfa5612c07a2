use axum::{extract::State, routing::get, Json, Router};

use crate::error::Result;
use crate::models::TagPair;
use crate::routes::{run_blocking, SharedService};

pub fn routes(service: SharedService) -> Router {
    Router::new()
        .route("/api/v1/tags", get(get_tags))
        .with_state(service)
}

async fn get_tags(State(service): State<SharedService>) -> Result<Json<TagPair>> {
    let tags = run_blocking(service, |service| service.latest_tags()).await?;
    Ok(Json(tags))
}
