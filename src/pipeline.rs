//! Pipeline orchestration.
//!
//! The [`Pipeline`] walks the source registry in order, collects each
//! source's harvest into one batch, and hands the batch to the
//! persistence gateway. All collaborators are injected at construction,
//! so tests can run the full pipeline against an in-memory fetcher and
//! store.
//!
//! A fixed courtesy pause separates consecutive sources so that a run
//! never hammers the remote hosts back to back. Failures anywhere below
//! startup only narrow the batch; `run` always completes.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, info, instrument};

use crate::fetch::PageFetcher;
use crate::harvest::ListingHarvester;
use crate::models::Batch;
use crate::persist::{persist_batch, PersistSummary};
use crate::sources::SourceDescriptor;
use crate::store::ArticleStore;

/// Default pause between consecutive sources.
pub const SOURCE_THROTTLE: Duration = Duration::from_secs(2);

/// One-shot ingestion pipeline over a fixed source registry.
pub struct Pipeline {
    sources: Vec<SourceDescriptor>,
    harvester: ListingHarvester,
    store: Arc<dyn ArticleStore>,
    throttle: Duration,
}

impl Pipeline {
    /// Assemble a pipeline from its collaborators.
    ///
    /// # Arguments
    ///
    /// * `sources` - The validated source registry, visited in order
    /// * `fetcher` - Shared fetcher for listing and article pages
    /// * `store` - Store used for deduplication and persistence
    /// * `throttle` - Pause inserted after each source's harvest
    pub fn new(
        sources: Vec<SourceDescriptor>,
        fetcher: Arc<dyn PageFetcher>,
        store: Arc<dyn ArticleStore>,
        throttle: Duration,
    ) -> Self {
        Self {
            sources,
            harvester: ListingHarvester::new(fetcher),
            store,
            throttle,
        }
    }

    /// Run the pipeline once.
    ///
    /// Harvests every source sequentially, persists the accumulated batch
    /// through the gateway, and returns the batch together with the
    /// persistence summary. Per-source and per-record failures are logged
    /// and absorbed; this method has no error path.
    #[instrument(level = "info", skip_all, fields(sources = self.sources.len()))]
    pub async fn run(&self) -> (Batch, PersistSummary) {
        let mut batch: Batch = Vec::new();

        for source in &self.sources {
            info!(source = %source.name, "Harvesting source");
            let records = self.harvester.harvest(source).await;
            info!(source = %source.name, count = records.len(), "Source finished");
            batch.extend(records);

            // Courtesy pause, applied after every source including the last
            debug!(delay = ?self.throttle, "Throttling between sources");
            sleep(self.throttle).await;
        }

        info!(count = batch.len(), "Harvest complete; persisting batch");
        let summary = persist_batch(self.store.as_ref(), &batch).await;

        (batch, summary)
    }
}
