//! Client Review Loader
//!
//! Resolution order: fresh local cache, then the review API (retried), then
//! the published file, then the hardcoded fallback. Whatever a network
//! layer or the fallback produces is written back to the local cache.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{error, info, warn};

use crate::fallback::fallback_reviews;
use crate::models::Review;
use crate::scheduler::ScheduledJob;

use super::cache::ClientCache;
use super::providers::{
    first_success, FallbackProvider, ProviderError, RemoteApiProvider, Retry, ReviewProvider,
    StaticFileProvider, REQUEST_TIMEOUT,
};

/// How often a long-lived client reloads on its own.
pub const AUTO_REFRESH_PERIOD: Duration = Duration::from_secs(30 * 60);

/// How the review API layer is retried, and how long each request may take.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay: Duration::from_secs(2),
            timeout: REQUEST_TIMEOUT,
        }
    }
}

pub struct ReviewLoader {
    cache: ClientCache,
    layers: Vec<Arc<dyn ReviewProvider>>,
}

impl ReviewLoader {
    /// `layers` are tried in order after the cache misses. The hardcoded
    /// fallback is always appended as the final layer.
    pub fn new(cache: ClientCache, mut layers: Vec<Arc<dyn ReviewProvider>>) -> Self {
        layers.push(Arc::new(FallbackProvider));
        Self { cache, layers }
    }

    /// The standard chain against a running review server.
    pub fn over_http(
        cache: ClientCache,
        server_url: &str,
        static_url: &str,
        retry: RetryPolicy,
    ) -> Result<Self, ProviderError> {
        let api: Arc<dyn ReviewProvider> =
            Arc::new(RemoteApiProvider::new(server_url, retry.timeout)?);
        let retried: Arc<dyn ReviewProvider> =
            Arc::new(Retry::new(api, retry.attempts, retry.delay));
        let published: Arc<dyn ReviewProvider> =
            Arc::new(StaticFileProvider::new(static_url, retry.timeout)?);
        Ok(Self::new(cache, vec![retried, published]))
    }

    /// Always returns a non-empty list.
    pub async fn load(&self) -> Vec<Review> {
        if let Some(reviews) = self.cache.read().await {
            info!("Using cached reviews");
            return reviews;
        }
        self.load_uncached().await
    }

    /// Drops the local cache and resolves from the network layers.
    pub async fn refresh(&self) -> Vec<Review> {
        info!("Manual refresh requested");
        if let Err(e) = self.cache.invalidate().await {
            warn!("Failed to clear cache: {e}");
        }
        self.load_uncached().await
    }

    async fn load_uncached(&self) -> Vec<Review> {
        let reviews = match first_success(&self.layers).await {
            Ok((reviews, _layer)) => reviews,
            Err(e) => {
                error!("Failed to load reviews: {e}");
                fallback_reviews()
            }
        };

        if let Err(e) = self.cache.write(&reviews).await {
            warn!("Caching skipped: {e}");
        }
        reviews
    }
}

/// Reloads through the full chain on every tick and hands the result to
/// `on_load` (usually a render step).
pub struct AutoRefreshJob<F> {
    loader: Arc<ReviewLoader>,
    on_load: F,
}

impl<F> AutoRefreshJob<F>
where
    F: Fn(&[Review]) + Send + Sync + 'static,
{
    pub fn new(loader: Arc<ReviewLoader>, on_load: F) -> Self {
        Self { loader, on_load }
    }
}

#[async_trait]
impl<F> ScheduledJob for AutoRefreshJob<F>
where
    F: Fn(&[Review]) + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        "review auto-refresh"
    }

    async fn run(&self) -> anyhow::Result<()> {
        let reviews = self.loader.load().await;
        (self.on_load)(&reviews);
        Ok(())
    }
}
