use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::errors::AppError;
use crate::models::{Review, Snapshot};
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewsResponse {
    pub success: bool,
    pub reviews: Vec<Review>,
    pub count: usize,
    pub last_updated: DateTime<Utc>,
    pub source: String,
}

impl From<Snapshot> for ReviewsResponse {
    fn from(snapshot: Snapshot) -> Self {
        Self {
            success: true,
            count: snapshot.count(),
            reviews: snapshot.reviews,
            last_updated: snapshot.last_updated,
            source: snapshot.source,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub message: &'static str,
    #[serde(flatten)]
    pub snapshot: ReviewsResponse,
}

/// GET /api/reviews
pub async fn handle_get_reviews(State(state): State<AppState>) -> Json<ReviewsResponse> {
    Json(state.publisher.get_reviews().await.into())
}

/// POST /api/reviews/refresh
pub async fn handle_refresh(
    State(state): State<AppState>,
) -> Result<Json<RefreshResponse>, AppError> {
    let snapshot = state.publisher.refresh().await;
    state
        .publisher
        .publish(&snapshot)
        .await
        .map_err(AppError::Refresh)?;

    Ok(Json(RefreshResponse {
        message: "Reviews refreshed successfully",
        snapshot: snapshot.into(),
    }))
}

/// GET /reviews.json
pub async fn handle_reviews_file(
    State(state): State<AppState>,
) -> Result<Json<Snapshot>, AppError> {
    let snapshot = state
        .publisher
        .serve_published()
        .await
        .map_err(AppError::ServeFile)?;
    Ok(Json(snapshot))
}
