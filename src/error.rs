//! Application error types and HTTP response mapping.
//!
//! `AppError` is the internal error type of the engine. Sync, history, tag
//! and tree operations on `GitService` never return it: failures are logged
//! and translated into a `SyncResult`, an `Option`, or a default value. The
//! status API converts it into a JSON error body.
//!
//! Error mappings:
//! - `RepositoryUnavailable`, `BranchNotFound`, `PathNotFound` → 404
//! - `RemoteUnavailable`, `Config` → 400
//! - `Git`, `Io`, `Internal` → 500

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Repository unavailable: {0}")]
    RepositoryUnavailable(String),

    #[error("No remote URL configured for {0}")]
    RemoteUnavailable(String),

    #[error("Branch not found: {0}")]
    BranchNotFound(String),

    #[error("Path not found: {0}")]
    PathNotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::RepositoryUnavailable(_)
            | AppError::BranchNotFound(_)
            | AppError::PathNotFound(_) => StatusCode::NOT_FOUND,
            AppError::RemoteUnavailable(_) | AppError::Config(_) => StatusCode::BAD_REQUEST,
            AppError::Git(_) | AppError::Io(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = Json(json!({
            "error": self.to_string(),
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
