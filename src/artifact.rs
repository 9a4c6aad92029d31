//! Batch artifact emission.
//!
//! After persistence, the full batch is serialized to a single JSON file
//! for downstream consumers. The file is overwritten on every run: it is
//! a snapshot of what this run produced, not a growing log. The store is
//! the durable record, so a failed artifact write costs the snapshot and
//! nothing else.

use std::path::Path;
use tokio::fs;
use tracing::{error, info, instrument};

use crate::error::Result;
use crate::models::Batch;

/// Where the artifact lands unless overridden on the command line.
pub const DEFAULT_ARTIFACT_PATH: &str = "scraped_data/articles.json";

/// Write the batch as a pretty-printed JSON array.
///
/// Timestamps serialize in RFC 3339, so consumers can parse the file
/// without knowing anything about this crate.
///
/// # Arguments
///
/// * `batch` - The records produced by this run, in harvest order
/// * `path` - Destination file; parent directories are created as needed
///
/// # Returns
///
/// `Ok(())` on success, or an error if directory creation, serialization,
/// or the file write fails.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn write_batch(batch: &Batch, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(batch)?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            if let Err(e) = fs::create_dir_all(parent).await {
                error!(dir = %parent.display(), error = %e, "Failed to create artifact dir");
                return Err(e.into());
            }
        }
    }

    fs::write(path, json).await?;
    info!(count = batch.len(), "Wrote batch artifact");
    Ok(())
}
