//! Server Cache Store
//!
//! One JSON file holding the last good snapshot and when it was taken.
//! Stale entries are deleted on read, never handed out.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::clock::{is_fresh, Clock};
use crate::models::Snapshot;

use super::write_atomic;

pub const DEFAULT_TTL_SECS: u64 = 30 * 60;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache write failed: {0}")]
    Write(#[source] std::io::Error),

    #[error("cache read failed: {0}")]
    Read(#[source] std::io::Error),

    #[error("cache entry is malformed: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry {
    snapshot: Snapshot,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    timestamp: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    expires: DateTime<Utc>,
}

enum Lookup {
    Missing,
    Fresh(Snapshot),
    Stale,
    Corrupt(CacheError),
}

pub struct SnapshotCache {
    path: PathBuf,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl SnapshotCache {
    pub fn new(path: impl Into<PathBuf>, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            path: path.into(),
            ttl,
            clock,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the cached snapshot if it is still fresh.
    ///
    /// A stale or unreadable entry is removed and reported as a miss. Callers
    /// that may race a writer should hold the writer's lock, or use `peek`.
    pub async fn read(&self) -> Option<Snapshot> {
        match self.lookup().await {
            Lookup::Fresh(snapshot) => {
                debug!("Using cached reviews");
                Some(snapshot)
            }
            Lookup::Missing => None,
            Lookup::Stale => {
                info!("Cache expired");
                self.discard().await;
                None
            }
            Lookup::Corrupt(e) => {
                warn!("Discarding cache: {e}");
                self.discard().await;
                None
            }
        }
    }

    /// Like `read`, but leaves the file alone whatever its state.
    pub async fn peek(&self) -> Option<Snapshot> {
        match self.lookup().await {
            Lookup::Fresh(snapshot) => Some(snapshot),
            _ => None,
        }
    }

    async fn lookup(&self) -> Lookup {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Lookup::Missing,
            Err(e) => {
                warn!("{}", CacheError::Read(e));
                return Lookup::Missing;
            }
        };

        match serde_json::from_slice::<CacheEntry>(&bytes) {
            Ok(entry) if is_fresh(entry.timestamp, self.clock.now(), self.ttl) => {
                Lookup::Fresh(entry.snapshot)
            }
            Ok(_) => Lookup::Stale,
            Err(e) => Lookup::Corrupt(CacheError::Parse(e)),
        }
    }

    pub async fn write(&self, snapshot: &Snapshot) -> Result<(), CacheError> {
        let now = self.clock.now();
        let entry = CacheEntry {
            snapshot: snapshot.clone(),
            timestamp: now,
            expires: now + self.ttl,
        };
        let json = serde_json::to_vec_pretty(&entry)?;
        write_atomic(&self.path, &json)
            .await
            .map_err(CacheError::Write)?;
        info!("Reviews cached successfully");
        Ok(())
    }

    /// Removes the entry. A missing file is not an error.
    pub async fn invalidate(&self) -> Result<(), CacheError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CacheError::Write(e)),
        }
    }

    async fn discard(&self) {
        if let Err(e) = self.invalidate().await {
            warn!("Failed to remove stale cache: {e}");
        }
    }
}
