//! # News Harvest
//!
//! A one-shot news ingestion pipeline. Each run harvests article listings
//! from a fixed set of news sources, extracts article body text, dedupes
//! the results against a SQLite store by URL, and writes the full batch to
//! a JSON artifact for downstream consumers.
//!
//! ## Usage
//!
//! ```sh
//! DATABASE_URL=sqlite:articles.db news_harvest
//! ```
//!
//! ## Architecture
//!
//! The application follows a pipeline architecture:
//! 1. **Registry**: load and validate the source descriptors
//! 2. **Harvest**: per source, select up to ten listing candidates and
//!    extract each article's body
//! 3. **Persist**: find-then-insert deduplication by URL against the store
//! 4. **Artifact**: write the accumulated batch to a single JSON file
//!
//! Failures below startup never abort the run; they shrink the batch and
//! show up in the logs. Only startup problems (bad registry, unwritable
//! artifact directory, unreachable store) exit non-zero.

use clap::Parser;
use std::error::Error;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{fmt as tfmt, EnvFilter};

mod artifact;
mod cli;
mod error;
mod extract;
mod fetch;
mod harvest;
mod models;
mod persist;
mod pipeline;
mod sources;
mod store;
mod utils;

use cli::Cli;
use fetch::{HttpFetcher, PageFetcher, RetryFetch};
use pipeline::Pipeline;
use store::{ArticleStore, SqliteStore};
use utils::ensure_writable_dir;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // .env is optional; a missing file is not an error
    let _ = dotenvy::dotenv();

    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("news_harvest starting up");

    // Parse CLI
    let args = Cli::parse();
    debug!(?args.sources, ?args.artifact_path, args.throttle_secs, "Parsed CLI arguments");

    // ---- Source registry ----
    let registry = match &args.sources {
        Some(path) => sources::load_sources(path).await?,
        None => sources::builtin_sources(),
    };
    sources::validate_sources(&registry)?;
    info!(count = registry.len(), "Source registry ready");

    // Early check: ensure the artifact directory is writable
    let artifact_dir = args
        .artifact_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    if let Err(e) = ensure_writable_dir(artifact_dir).await {
        error!(
            path = %artifact_dir.display(),
            error = %e,
            "Artifact directory is not writable (fix perms or choose a different path)"
        );
        return Err(e.into());
    }

    // ---- Store connection ----
    let store = SqliteStore::connect(&args.database_url).await?;
    let store: Arc<dyn ArticleStore> = Arc::new(store);

    // ---- Assemble and run the pipeline ----
    const FETCH_RETRIES: usize = 2;
    const RETRY_BASE_DELAY: Duration = Duration::from_secs(1);

    let fetcher: Arc<dyn PageFetcher> = Arc::new(RetryFetch::new(
        HttpFetcher::new()?,
        FETCH_RETRIES,
        RETRY_BASE_DELAY,
    ));
    let pipeline = Pipeline::new(
        registry,
        fetcher,
        store,
        Duration::from_secs(args.throttle_secs),
    );

    let (batch, summary) = pipeline.run().await;
    info!(
        records = batch.len(),
        stored = summary.stored,
        skipped = summary.skipped,
        failed = summary.failed,
        "Pipeline run complete"
    );

    // ---- Artifact output ----
    if let Err(e) = artifact::write_batch(&batch, &args.artifact_path).await {
        error!(path = %args.artifact_path.display(), error = %e, "Failed to write batch artifact");
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );

    Ok(())
}
