//! Review Publisher. Produces the canonical snapshot and writes it where
//! the web server can hand it out as a plain file.
//!
//! `get_reviews` never fails: every error on the way degrades to the
//! fallback snapshot. Fallback data is never written to the cache, so a
//! transient upstream failure cannot poison it.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::clock::Clock;
use crate::fallback::fallback_snapshot;
use crate::models::{Snapshot, SOURCE_LIVE};
use crate::scheduler::ScheduledJob;
use crate::source::ReviewSource;

use super::cache::SnapshotCache;
use super::write_atomic;

/// File name of the published snapshot inside the public directory.
pub const PUBLISHED_FILE: &str = "reviews.json";

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("failed to encode snapshot: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("published file {} is malformed: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

pub struct ReviewPublisher {
    source: Arc<dyn ReviewSource>,
    cache: SnapshotCache,
    public_path: PathBuf,
    clock: Arc<dyn Clock>,
    /// Held while talking to the source so overlapping misses share one fetch.
    fetch_lock: Mutex<()>,
}

impl ReviewPublisher {
    pub fn new(
        source: Arc<dyn ReviewSource>,
        cache: SnapshotCache,
        public_dir: impl AsRef<Path>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            source,
            cache,
            public_path: public_dir.as_ref().join(PUBLISHED_FILE),
            clock,
            fetch_lock: Mutex::new(()),
        }
    }

    pub fn public_path(&self) -> &Path {
        &self.public_path
    }

    /// Fresh cache, else live fetch, else fallback.
    pub async fn get_reviews(&self) -> Snapshot {
        if let Some(snapshot) = self.cache.peek().await {
            return snapshot;
        }

        let _guard = self.fetch_lock.lock().await;
        // Someone else may have filled the cache while we waited. Stale
        // entries are only removed under the lock.
        if let Some(snapshot) = self.cache.read().await {
            return snapshot;
        }
        self.fetch_live().await
    }

    /// Drops the cache and goes to the source even if the cache was fresh.
    pub async fn refresh(&self) -> Snapshot {
        info!("Force refreshing reviews");
        let _guard = self.fetch_lock.lock().await;
        if let Err(e) = self.cache.invalidate().await {
            warn!("Failed to invalidate cache before refresh: {e}");
        }
        self.fetch_live().await
    }

    async fn fetch_live(&self) -> Snapshot {
        match self.source.fetch().await {
            Ok(reviews) if !reviews.is_empty() => {
                let snapshot = Snapshot::new(reviews, SOURCE_LIVE, self.clock.now());
                if let Err(e) = self.cache.write(&snapshot).await {
                    warn!("Serving snapshot without caching it: {e}");
                }
                snapshot
            }
            Ok(_) => {
                warn!("No reviews found, using fallback data");
                fallback_snapshot(self.clock.now())
            }
            Err(e) => {
                warn!("Error fetching reviews, using fallback data: {e}");
                fallback_snapshot(self.clock.now())
            }
        }
    }

    /// Writes `snapshot` to the public path. Publishing the same snapshot
    /// twice leaves the same bytes on disk.
    pub async fn publish(&self, snapshot: &Snapshot) -> Result<(), PublishError> {
        let json = serde_json::to_vec_pretty(snapshot).map_err(PublishError::Encode)?;
        write_atomic(&self.public_path, &json)
            .await
            .map_err(|source| PublishError::Write {
                path: self.public_path.clone(),
                source,
            })?;
        info!(
            "Published {} reviews to {}",
            snapshot.count(),
            self.public_path.display()
        );
        Ok(())
    }

    /// The currently published snapshot, `None` if nothing was published yet.
    pub async fn published(&self) -> Result<Option<Snapshot>, PublishError> {
        let bytes = match tokio::fs::read(&self.public_path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(PublishError::Read {
                    path: self.public_path.clone(),
                    source,
                })
            }
        };

        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| PublishError::Parse {
                path: self.public_path.clone(),
                source,
            })
    }

    /// The published snapshot, generating and publishing one if it is absent
    /// or unreadable as JSON.
    pub async fn serve_published(&self) -> Result<Snapshot, PublishError> {
        match self.published().await {
            Ok(Some(snapshot)) => return Ok(snapshot),
            Ok(None) => info!("No published snapshot yet, generating one"),
            Err(e @ PublishError::Parse { .. }) => warn!("Regenerating: {e}"),
            Err(e) => return Err(e),
        }

        let snapshot = self.get_reviews().await;
        self.publish(&snapshot).await?;
        Ok(snapshot)
    }

    /// `get_reviews` followed by `publish`.
    pub async fn update(&self) -> Result<Snapshot, PublishError> {
        let snapshot = self.get_reviews().await;
        self.publish(&snapshot).await?;
        Ok(snapshot)
    }
}

/// Scheduler job that keeps the published file current.
pub struct PublishJob {
    publisher: Arc<ReviewPublisher>,
}

impl PublishJob {
    pub fn new(publisher: Arc<ReviewPublisher>) -> Self {
        Self { publisher }
    }
}

#[async_trait]
impl ScheduledJob for PublishJob {
    fn name(&self) -> &str {
        "review update"
    }

    async fn run(&self) -> anyhow::Result<()> {
        let snapshot = self.publisher.update().await?;
        info!(
            "Scheduled review update published {} reviews ({})",
            snapshot.count(),
            snapshot.source
        );
        Ok(())
    }
}
