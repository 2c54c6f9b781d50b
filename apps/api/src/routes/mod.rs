pub mod health;
pub mod reviews;

use std::any::Any;
use std::path::Path;

use axum::{
    handler::HandlerWithoutStateExt,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use tower_http::{catch_panic::CatchPanicLayer, services::ServeDir};

use crate::errors::AppError;
use crate::state::AppState;

async fn not_found() -> AppError {
    AppError::NotFound("The requested endpoint does not exist".to_string())
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let message = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "handler panicked".to_string()
    };
    AppError::Internal(anyhow::anyhow!(message)).into_response()
}

/// Turns handler panics into the JSON 500 shape.
pub fn with_error_handling(router: Router) -> Router {
    router.layer(CatchPanicLayer::custom(handle_panic))
}

/// API routes, the published snapshot, and static files from `public_dir`.
/// Anything else is a JSON 404.
pub fn build_router(state: AppState, public_dir: &Path) -> Router {
    let static_files = ServeDir::new(public_dir)
        .call_fallback_on_method_not_allowed(true)
        .not_found_service(not_found.into_service());

    let router = Router::new()
        .route("/api/health", get(health::health_handler))
        .route("/api/reviews", get(reviews::handle_get_reviews))
        .route("/api/reviews/refresh", post(reviews::handle_refresh))
        .route("/reviews.json", get(reviews::handle_reviews_file))
        .fallback_service(static_files)
        .with_state(state);

    with_error_handling(router)
}
