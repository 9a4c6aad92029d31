//! Deduplication and persistence gateway.
//!
//! Each record in a batch is checked against the store by URL and inserted
//! only if novel. The check and the insert are two separate store calls;
//! a concurrent run can slip between them, in which case the loser's
//! insert fails on the primary key and is counted as a per-record failure
//! rather than crashing the run. No error leaves this module: the caller
//! gets a [`PersistSummary`] and the logs tell the rest.

use tracing::{error, info, instrument};

use crate::models::ArticleRecord;
use crate::store::ArticleStore;
use crate::utils::truncate_for_log;

/// What happened to a batch at the store boundary.
///
/// `stored + skipped + failed` always equals the batch length.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PersistSummary {
    /// Records newly inserted this run.
    pub stored: usize,
    /// Records skipped because their URL was already present.
    pub skipped: usize,
    /// Records dropped by a store lookup or insert failure.
    pub failed: usize,
}

/// Persist a batch, one record at a time, in batch order.
///
/// # Arguments
///
/// * `store` - The store to deduplicate against and insert into
/// * `records` - The batch produced by this run
///
/// # Returns
///
/// A [`PersistSummary`] tallying stored, skipped, and failed records.
/// This function never returns an error; store failures cost individual
/// records only.
#[instrument(level = "info", skip_all, fields(records = records.len()))]
pub async fn persist_batch(store: &dyn ArticleStore, records: &[ArticleRecord]) -> PersistSummary {
    let mut summary = PersistSummary::default();
    if records.is_empty() {
        info!("Nothing to persist");
        return summary;
    }

    for record in records {
        match store.find_by_url(&record.url).await {
            Ok(Some(_)) => {
                summary.skipped += 1;
                info!(title = %truncate_for_log(&record.title, 50), "Already exists");
            }
            Ok(None) => match store.insert(record).await {
                Ok(()) => {
                    summary.stored += 1;
                    info!(title = %truncate_for_log(&record.title, 50), "Stored");
                }
                Err(e) => {
                    summary.failed += 1;
                    error!(error = %e, url = %record.url, "Insert failed; continuing with batch");
                }
            },
            Err(e) => {
                summary.failed += 1;
                error!(error = %e, url = %record.url, "Store lookup failed; continuing with batch");
            }
        }
    }

    info!(
        stored = summary.stored,
        skipped = summary.skipped,
        failed = summary.failed,
        "Batch persisted"
    );
    summary
}
