//! Data models for harvested news articles.
//!
//! This module defines the core data structures shared across the pipeline:
//! - [`ArticleRecord`]: One harvested article, as stored and as emitted in
//!   the JSON batch artifact
//! - [`Batch`]: The collection of records produced by a single run
//!
//! Field names are chosen to match the JSON documents the store holds and
//! the artifact file exposes, so one `serde` shape serves both.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single harvested news article.
///
/// Records are created by the listing harvester once a candidate headline
/// has survived extraction, and flow unchanged through deduplication,
/// storage, and the batch artifact.
///
/// # Fields
///
/// * `title` - The headline text, whitespace-trimmed
/// * `url` - The absolute article URL; identity for deduplication
/// * `source` - The human-readable name of the originating news source
/// * `content` - Extracted article text, or the extraction sentinel
/// * `scraped_at` - UTC instant the record was produced
/// * `processed` - Downstream consumption flag, always `false` at harvest
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ArticleRecord {
    /// The headline text of the article.
    pub title: String,
    /// The absolute URL of the article page.
    pub url: String,
    /// The display name of the news source this record came from.
    pub source: String,
    /// The extracted article body, or the sentinel when extraction failed.
    pub content: String,
    /// When this record was produced, in UTC.
    pub scraped_at: DateTime<Utc>,
    /// Whether a downstream consumer has processed this record yet.
    pub processed: bool,
}

impl ArticleRecord {
    /// Build a fresh record stamped with the current UTC time.
    ///
    /// New records always start unprocessed; the flag is flipped by
    /// downstream consumers, never by the harvester.
    pub fn new(
        title: impl Into<String>,
        url: impl Into<String>,
        source: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            source: source.into(),
            content: content.into(),
            scraped_at: Utc::now(),
            processed: false,
        }
    }
}

/// All records produced by one pipeline run, in harvest order.
pub type Batch = Vec<ArticleRecord>;
