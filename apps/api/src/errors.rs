use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::server::PublishError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Failed to refresh reviews: {0}")]
    Refresh(#[source] PublishError),

    #[error("Failed to serve reviews: {0}")]
    ServeFile(#[source] PublishError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            AppError::NotFound(message) => (
                StatusCode::NOT_FOUND,
                json!({ "error": "Not found", "message": message }),
            ),
            AppError::Refresh(e) => {
                tracing::error!("Error refreshing reviews: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({
                        "success": false,
                        "error": "Failed to refresh reviews",
                        "message": e.to_string()
                    }),
                )
            }
            AppError::ServeFile(e) => {
                tracing::error!("Error serving reviews.json: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Failed to serve reviews", "message": e.to_string() }),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": "Internal server error", "message": e.to_string() }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}
