//! Article body extraction.
//!
//! Given an article URL, this module fetches the page and pulls out the
//! main body text. News sites disagree wildly about markup, so extraction
//! is heuristic rather than per-site.
//!
//! # Extraction Strategy
//!
//! 1. Try an ordered list of known content-container selectors, broadest
//!    first. The first container whose joined paragraph text exceeds 200
//!    characters wins; shorter matches are treated as boilerplate (nav
//!    blocks and teasers often live inside `<article>` tags too) and the
//!    next selector is tried.
//! 2. If no container qualifies, fall back to every paragraph on the page
//!    whose trimmed text exceeds 50 characters, joined with blank lines
//!    and truncated to 5000 characters.
//! 3. If the page cannot be fetched at all, the fixed sentinel string is
//!    returned instead. Extraction never fails the caller; a bad article
//!    page costs one record's quality, not the run.

use std::sync::Arc;

use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info, instrument, warn};

use crate::fetch::PageFetcher;
use crate::utils::normalize_ws;

/// Placeholder body used when the article page cannot be fetched.
///
/// Distinguishes "tried and failed" from "not yet attempted" for
/// downstream consumers; records carrying it are still stored.
pub const EXTRACTION_SENTINEL: &str = "Content could not be extracted";

/// Candidate content containers, tried in order.
const CONTENT_CONTAINER_RULES: &[&str] = &[
    "article",
    ".article-body",
    ".story-body",
    ".post-content",
    "[data-testid=\"article-body\"]",
];

static CONTENT_CONTAINERS: Lazy<Vec<Selector>> = Lazy::new(|| {
    CONTENT_CONTAINER_RULES
        .iter()
        .map(|rule| Selector::parse(rule).unwrap())
        .collect()
});

static PARAGRAPH: Lazy<Selector> = Lazy::new(|| Selector::parse("p").unwrap());

/// Fetches article pages and extracts their body text.
///
/// The fetcher is injected so tests can run extraction against canned
/// markup without a network.
pub struct ContentExtractor {
    fetcher: Arc<dyn PageFetcher>,
}

impl ContentExtractor {
    pub fn new(fetcher: Arc<dyn PageFetcher>) -> Self {
        Self { fetcher }
    }

    /// Extract the body text of one article.
    ///
    /// # Arguments
    ///
    /// * `url` - Absolute URL of the article page
    ///
    /// # Returns
    ///
    /// The extracted body text, or [`EXTRACTION_SENTINEL`] if the page
    /// could not be fetched. This method never returns an error; per-article
    /// failures degrade the record instead of aborting the harvest.
    #[instrument(level = "info", skip_all, fields(url = %url))]
    pub async fn extract(&self, url: &str) -> String {
        match self.fetcher.fetch(url).await {
            Ok(body) => {
                let content = extract_from_html(&body);
                info!(chars = content.chars().count(), "Extracted article content");
                content
            }
            Err(e) => {
                warn!(error = %e, "Article fetch failed; substituting sentinel content");
                EXTRACTION_SENTINEL.to_string()
            }
        }
    }
}

/// Apply the extraction strategy to already-fetched markup.
fn extract_from_html(html: &str) -> String {
    let document = Html::parse_document(html);

    for (rule, selector) in CONTENT_CONTAINER_RULES.iter().zip(CONTENT_CONTAINERS.iter()) {
        if let Some(container) = document.select(selector).next() {
            let content = join_paragraphs(container.select(&PARAGRAPH));
            if content.chars().count() > 200 {
                debug!(selector = rule, chars = content.chars().count(), "Content container accepted");
                return content;
            }
        }
    }

    fallback_paragraphs(&document)
}

/// Join paragraph texts with blank lines, dropping empty ones.
fn join_paragraphs<'a>(paragraphs: impl Iterator<Item = ElementRef<'a>>) -> String {
    paragraphs
        .map(|p| normalize_ws(&p.text().collect::<Vec<_>>().join(" ")))
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Last-resort extraction: every substantial paragraph on the page.
///
/// Paragraphs of 50 characters or fewer are dropped as link text and
/// chrome. The result is capped at 5000 characters and may be empty; an
/// empty string is a valid outcome for pages with no prose at all.
fn fallback_paragraphs(document: &Html) -> String {
    let joined = document
        .select(&PARAGRAPH)
        .map(|p| normalize_ws(&p.text().collect::<Vec<_>>().join(" ")))
        .filter(|text| text.chars().count() > 50)
        .collect::<Vec<_>>()
        .join("\n\n");
    joined.chars().take(5000).collect()
}
