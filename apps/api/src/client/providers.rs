//! Layers of the client fallback chain.
//!
//! Each layer is a `ReviewProvider`. `first_success` walks them in order and
//! stops at the first one that yields a non-empty list; a layer only starts
//! once the previous one has definitively failed.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::fallback::fallback_reviews;
use crate::models::Review;

/// Default bound on every client network call.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP error! status: {status}")]
    Status { status: u16 },

    #[error("no reviews found in response")]
    NoReviews,

    #[error("gave up after {attempts} attempts: {last}")]
    Exhausted {
        attempts: u32,
        #[source]
        last: Box<ProviderError>,
    },

    #[error("every review layer failed")]
    AllFailed,
}

#[async_trait]
pub trait ReviewProvider: Send + Sync {
    fn name(&self) -> &str;
    async fn fetch(&self) -> Result<Vec<Review>, ProviderError>;
}

/// Tries each provider in order; returns the first non-empty result and the
/// name of the layer that produced it. First success wins even if a later
/// layer would have answered differently.
pub async fn first_success(
    providers: &[Arc<dyn ReviewProvider>],
) -> Result<(Vec<Review>, String), ProviderError> {
    for provider in providers {
        match provider.fetch().await {
            Ok(reviews) if !reviews.is_empty() => {
                info!("Loaded {} reviews from {}", reviews.len(), provider.name());
                return Ok((reviews, provider.name().to_string()));
            }
            Ok(_) => warn!("{} returned no reviews", provider.name()),
            Err(e) => warn!("{} failed: {e}", provider.name()),
        }
    }
    Err(ProviderError::AllFailed)
}

/// Re-runs `inner` up to `attempts` times, sleeping `delay` between failed
/// attempts (not after the last one).
pub struct Retry {
    inner: Arc<dyn ReviewProvider>,
    attempts: u32,
    delay: Duration,
}

impl Retry {
    pub fn new(inner: Arc<dyn ReviewProvider>, attempts: u32, delay: Duration) -> Self {
        Self {
            inner,
            attempts: attempts.max(1),
            delay,
        }
    }
}

#[async_trait]
impl ReviewProvider for Retry {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn fetch(&self) -> Result<Vec<Review>, ProviderError> {
        let mut last_error = ProviderError::NoReviews;

        for attempt in 1..=self.attempts {
            info!(
                "Attempting to fetch reviews from {} (attempt {attempt}/{})",
                self.inner.name(),
                self.attempts
            );
            match self.inner.fetch().await {
                Ok(reviews) if !reviews.is_empty() => return Ok(reviews),
                Ok(_) => last_error = ProviderError::NoReviews,
                Err(e) => last_error = e,
            }
            warn!("Attempt {attempt} failed: {last_error}");

            if attempt < self.attempts {
                info!("Waiting {}ms before retry", self.delay.as_millis());
                tokio::time::sleep(self.delay).await;
            }
        }

        Err(ProviderError::Exhausted {
            attempts: self.attempts,
            last: Box::new(last_error),
        })
    }
}

fn http_client(timeout: Duration) -> Result<Client, ProviderError> {
    Ok(Client::builder().timeout(timeout).build()?)
}

#[derive(Debug, Deserialize)]
struct ApiReviewsResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    reviews: Vec<Review>,
}

/// `GET {server}/api/reviews`.
pub struct RemoteApiProvider {
    client: Client,
    url: String,
}

impl RemoteApiProvider {
    pub fn new(server_url: &str, timeout: Duration) -> Result<Self, ProviderError> {
        Ok(Self {
            client: http_client(timeout)?,
            url: format!("{}/api/reviews", server_url.trim_end_matches('/')),
        })
    }
}

#[async_trait]
impl ReviewProvider for RemoteApiProvider {
    fn name(&self) -> &str {
        "review API"
    }

    async fn fetch(&self) -> Result<Vec<Review>, ProviderError> {
        let response = self.client.get(&self.url).send().await?;
        if !response.status().is_success() {
            return Err(ProviderError::Status {
                status: response.status().as_u16(),
            });
        }

        let body: ApiReviewsResponse = response.json().await?;
        if !body.success || body.reviews.is_empty() {
            return Err(ProviderError::NoReviews);
        }
        Ok(body.reviews)
    }
}

#[derive(Debug, Deserialize)]
struct PublishedFile {
    #[serde(default)]
    reviews: Vec<Review>,
}

/// The published `reviews.json`, fetched directly and bypassing the API.
pub struct StaticFileProvider {
    client: Client,
    url: String,
}

impl StaticFileProvider {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, ProviderError> {
        Ok(Self {
            client: http_client(timeout)?,
            url: url.into(),
        })
    }
}

#[async_trait]
impl ReviewProvider for StaticFileProvider {
    fn name(&self) -> &str {
        "published file"
    }

    async fn fetch(&self) -> Result<Vec<Review>, ProviderError> {
        let response = self.client.get(&self.url).send().await?;
        if !response.status().is_success() {
            return Err(ProviderError::Status {
                status: response.status().as_u16(),
            });
        }

        let file: PublishedFile = response.json().await?;
        if file.reviews.is_empty() {
            return Err(ProviderError::NoReviews);
        }
        Ok(file.reviews)
    }
}

/// The hardcoded set. Never fails.
pub struct FallbackProvider;

#[async_trait]
impl ReviewProvider for FallbackProvider {
    fn name(&self) -> &str {
        "fallback"
    }

    async fn fetch(&self) -> Result<Vec<Review>, ProviderError> {
        Ok(fallback_reviews())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{closed_port, live_reviews, serve};
    use axum::{http::StatusCode, routing::get, Json, Router};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn layer<P: ReviewProvider + 'static>(provider: Arc<P>) -> Arc<dyn ReviewProvider> {
        provider
    }

    struct Scripted {
        name: &'static str,
        outcome: fn() -> Result<Vec<Review>, ProviderError>,
        calls: AtomicUsize,
    }

    impl Scripted {
        fn new(
            name: &'static str,
            outcome: fn() -> Result<Vec<Review>, ProviderError>,
        ) -> Arc<Self> {
            Arc::new(Self {
                name,
                outcome,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ReviewProvider for Scripted {
        fn name(&self) -> &str {
            self.name
        }

        async fn fetch(&self) -> Result<Vec<Review>, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (self.outcome)()
        }
    }

    #[tokio::test]
    async fn test_first_success_stops_at_first_answer() {
        let failing = Scripted::new("down", || Err(ProviderError::Status { status: 500 }));
        let answering = Scripted::new("up", || Ok(live_reviews(2)));
        let never = Scripted::new("never", || Ok(live_reviews(9)));
        let chain = vec![layer(failing.clone()), layer(answering.clone()), layer(never.clone())];

        let (reviews, layer) = first_success(&chain).await.unwrap();
        assert_eq!(reviews.len(), 2);
        assert_eq!(layer, "up");
        assert_eq!((failing.calls(), answering.calls(), never.calls()), (1, 1, 0));
    }

    #[tokio::test]
    async fn test_first_success_treats_empty_as_failure() {
        let empty = Scripted::new("empty", || Ok(vec![]));
        let chain = vec![layer(empty), layer(Arc::new(FallbackProvider))];

        let (reviews, layer) = first_success(&chain).await.unwrap();
        assert_eq!(reviews, fallback_reviews());
        assert_eq!(layer, "fallback");
    }

    #[tokio::test]
    async fn test_first_success_all_failed() {
        let chain = vec![layer(Scripted::new("down", || Err(ProviderError::NoReviews)))];
        assert!(matches!(first_success(&chain).await, Err(ProviderError::AllFailed)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_makes_three_attempts_two_delays_apart() {
        let down = Scripted::new("down", || Err(ProviderError::Status { status: 503 }));
        let retry = Retry::new(down.clone(), 3, Duration::from_secs(2));

        let started = tokio::time::Instant::now();
        let err = retry.fetch().await.unwrap_err();

        assert_eq!(down.calls(), 3);
        assert_eq!(started.elapsed(), Duration::from_secs(4));
        assert!(matches!(err, ProviderError::Exhausted { attempts: 3, .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_returns_on_first_success_without_waiting() {
        let up = Scripted::new("up", || Ok(live_reviews(1)));
        let retry = Retry::new(up.clone(), 3, Duration::from_secs(2));

        let started = tokio::time::Instant::now();
        retry.fetch().await.unwrap();
        assert_eq!(up.calls(), 1);
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_remote_api_parses_success_payload() {
        let router = Router::new().route(
            "/api/reviews",
            get(|| async {
                Json(json!({"success": true, "reviews": live_reviews(2), "count": 2}))
            }),
        );
        let base = serve(router).await;

        let provider = RemoteApiProvider::new(&format!("{base}/"), REQUEST_TIMEOUT).unwrap();
        let reviews = provider.fetch().await.unwrap();
        assert_eq!(reviews, live_reviews(2));
    }

    #[tokio::test]
    async fn test_remote_api_rejects_unsuccessful_or_empty_payloads() {
        let router = Router::new()
            .route(
                "/a/api/reviews",
                get(|| async { Json(json!({"success": false, "reviews": live_reviews(1)})) }),
            )
            .route(
                "/b/api/reviews",
                get(|| async { Json(json!({"success": true, "reviews": []})) }),
            )
            .route(
                "/c/api/reviews",
                get(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
            );
        let base = serve(router).await;

        for (prefix, expect_status) in [("a", false), ("b", false), ("c", true)] {
            let provider =
                RemoteApiProvider::new(&format!("{base}/{prefix}"), REQUEST_TIMEOUT).unwrap();
            let err = provider.fetch().await.unwrap_err();
            if expect_status {
                assert!(matches!(err, ProviderError::Status { status: 500 }));
            } else {
                assert!(matches!(err, ProviderError::NoReviews), "{prefix}: {err}");
            }
        }
    }

    #[tokio::test]
    async fn test_static_file_provider() {
        let router = Router::new().route(
            "/reviews.json",
            get(|| async {
                Json(json!({
                    "reviews": live_reviews(2),
                    "count": 2,
                    "lastUpdated": "2025-10-03T00:00:00Z"
                }))
            }),
        );
        let base = serve(router).await;

        let ok = StaticFileProvider::new(format!("{base}/reviews.json"), REQUEST_TIMEOUT).unwrap();
        assert_eq!(ok.fetch().await.unwrap().len(), 2);

        let missing =
            StaticFileProvider::new(format!("{base}/nope.json"), REQUEST_TIMEOUT).unwrap();
        assert!(matches!(
            missing.fetch().await,
            Err(ProviderError::Status { status: 404 })
        ));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_http_error() {
        let provider = RemoteApiProvider::new(&closed_port().await, REQUEST_TIMEOUT).unwrap();
        assert!(matches!(provider.fetch().await, Err(ProviderError::Http(_))));
    }

    #[tokio::test]
    async fn test_hanging_server_is_cut_off_by_timeout() {
        let router = Router::new().route(
            "/api/reviews",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Json(json!({"success": true, "reviews": live_reviews(1)}))
            }),
        );
        let base = serve(router).await;
        let provider = RemoteApiProvider::new(&base, Duration::from_millis(300)).unwrap();

        let started = std::time::Instant::now();
        let err = provider.fetch().await.unwrap_err();

        assert!(started.elapsed() < Duration::from_secs(5));
        match err {
            ProviderError::Http(e) => assert!(e.is_timeout(), "{e}"),
            other => panic!("expected a timeout, got {other}"),
        }
    }
}
