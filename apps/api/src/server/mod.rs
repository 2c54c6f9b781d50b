//! Server half of the pipeline: the snapshot cache and the publisher that
//! owns it.

pub mod cache;
pub mod publisher;

use std::path::Path;

use uuid::Uuid;

pub use cache::{CacheError, SnapshotCache, DEFAULT_TTL_SECS};
pub use publisher::{PublishError, PublishJob, ReviewPublisher, PUBLISHED_FILE};

/// Writes to a sibling temp file, then renames over `path`, so readers see
/// either the old file or the new one and never a partial write.
pub(crate) async fn write_atomic(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }

    let tmp_path = path.with_extension(format!(
        "tmp.{}.{}",
        std::process::id(),
        Uuid::new_v4().simple()
    ));
    tokio::fs::write(&tmp_path, contents).await?;
    if let Err(e) = tokio::fs::rename(&tmp_path, path).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(e);
    }
    Ok(())
}
