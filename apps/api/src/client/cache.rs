//! Client Cache Store. Same freshness rule as the server cache, kept in
//! local storage under a single key as `{reviews, timestamp}`.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::clock::{is_fresh, Clock};
use crate::models::Review;

use super::storage::{LocalStorage, StorageError};

pub const CACHE_KEY: &str = "urp_reviews_cache";

#[derive(Debug, Serialize, Deserialize)]
struct ClientCacheEntry {
    reviews: Vec<Review>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    timestamp: DateTime<Utc>,
}

pub struct ClientCache {
    storage: Arc<dyn LocalStorage>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl ClientCache {
    pub fn new(storage: Arc<dyn LocalStorage>, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            storage,
            ttl,
            clock,
        }
    }

    /// Fresh, non-empty cached reviews. Anything else is a miss, and a stale
    /// or malformed entry is removed on the way out.
    pub async fn read(&self) -> Option<Vec<Review>> {
        let raw = match self.storage.get_item(CACHE_KEY).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!("Error reading cache: {e}");
                return None;
            }
        };

        let entry: ClientCacheEntry = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Discarding malformed cache entry: {e}");
                self.discard().await;
                return None;
            }
        };

        if !is_fresh(entry.timestamp, self.clock.now(), self.ttl) {
            info!("Cache expired");
            self.discard().await;
            return None;
        }
        if entry.reviews.is_empty() {
            self.discard().await;
            return None;
        }

        debug!("Using {} cached reviews", entry.reviews.len());
        Some(entry.reviews)
    }

    /// Overwrites the entry. Callers treat an error as "not cached".
    pub async fn write(&self, reviews: &[Review]) -> Result<(), StorageError> {
        let entry = ClientCacheEntry {
            reviews: reviews.to_vec(),
            timestamp: self.clock.now(),
        };
        let json = serde_json::to_string(&entry)?;
        self.storage.set_item(CACHE_KEY, &json).await?;
        debug!("Reviews cached successfully");
        Ok(())
    }

    pub async fn invalidate(&self) -> Result<(), StorageError> {
        self.storage.remove_item(CACHE_KEY).await
    }

    async fn discard(&self) {
        if let Err(e) = self.invalidate().await {
            warn!("Failed to remove cache entry: {e}");
        }
    }
}
