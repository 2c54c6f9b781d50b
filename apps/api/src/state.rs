use std::sync::Arc;
use std::time::Instant;

use crate::clock::Clock;
use crate::server::ReviewPublisher;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub publisher: Arc<ReviewPublisher>,
    pub clock: Arc<dyn Clock>,
    /// Process start, for the health endpoint's uptime.
    pub started_at: Instant,
}

impl AppState {
    pub fn new(publisher: Arc<ReviewPublisher>, clock: Arc<dyn Clock>) -> Self {
        Self {
            publisher,
            clock,
            started_at: Instant::now(),
        }
    }
}
