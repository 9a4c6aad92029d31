//! Listing harvesting: turning one source's listing page into article records.
//!
//! The harvester fetches a source's listing page, locates candidate headline
//! blocks with the source's selectors, and resolves each candidate to an
//! absolute article URL. Surviving candidates are handed to the
//! [`ContentExtractor`] one at a time and assembled into [`ArticleRecord`]s.
//!
//! # Failure Isolation
//!
//! - A listing fetch or scan failure costs the whole source: the harvester
//!   logs it and returns an empty batch, and the run moves on.
//! - A defective candidate (no title, no link, dead href) costs only
//!   itself. Each candidate is evaluated to an explicit
//!   [`CandidateOutcome`] so that skips are data, not control flow, and
//!   sibling candidates are never affected.
//! - An article fetch failure degrades that record's content to the
//!   extraction sentinel; the record is still produced.

use std::fmt;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, error, info, instrument};
use url::Url;

use crate::error::{Error, Result};
use crate::extract::ContentExtractor;
use crate::fetch::PageFetcher;
use crate::models::ArticleRecord;
use crate::sources::SourceDescriptor;
use crate::utils::normalize_ws;

/// Cap on candidates taken from one listing page, in document order.
///
/// Bounds per-run cost and per-source fetch volume; it is not a ranking,
/// just "the first ten blocks the selector finds".
pub const MAX_CANDIDATES_PER_SOURCE: usize = 10;

/// Why a listing candidate was skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// No element inside the candidate matched the title selector.
    MissingTitle,
    /// No element inside the candidate matched the link selector.
    MissingLink,
    /// The title element contained no text.
    EmptyTitle,
    /// The link element carried no usable `href` attribute.
    MissingHref,
    /// The `href` could not be resolved against the listing URL.
    UnresolvableUrl(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::MissingTitle => write!(f, "no element matched the title selector"),
            SkipReason::MissingLink => write!(f, "no element matched the link selector"),
            SkipReason::EmptyTitle => write!(f, "title text is empty"),
            SkipReason::MissingHref => write!(f, "link element has no href"),
            SkipReason::UnresolvableUrl(href) => {
                write!(f, "href `{href}` does not resolve against the listing URL")
            }
        }
    }
}

/// A candidate that survived listing evaluation: a headline plus the
/// absolute URL it points at. Content extraction happens afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateLink {
    pub title: String,
    pub url: String,
}

/// Per-candidate evaluation result: a usable link, or the reason it was
/// dropped.
pub type CandidateOutcome = std::result::Result<CandidateLink, SkipReason>;

/// Harvests article records from one source at a time.
pub struct ListingHarvester {
    fetcher: Arc<dyn PageFetcher>,
    extractor: ContentExtractor,
}

impl ListingHarvester {
    /// Build a harvester over the given fetcher.
    ///
    /// The same fetcher serves both listing pages and, through the
    /// embedded extractor, article pages.
    pub fn new(fetcher: Arc<dyn PageFetcher>) -> Self {
        let extractor = ContentExtractor::new(Arc::clone(&fetcher));
        Self { fetcher, extractor }
    }

    /// Harvest one source into article records.
    ///
    /// # Arguments
    ///
    /// * `source` - The source descriptor to harvest
    ///
    /// # Returns
    ///
    /// At most [`MAX_CANDIDATES_PER_SOURCE`] records in listing document
    /// order. An empty vector is a valid result and is what any
    /// source-level failure degrades to; this method never returns an
    /// error.
    #[instrument(level = "info", skip_all, fields(source = %source.name))]
    pub async fn harvest(&self, source: &SourceDescriptor) -> Vec<ArticleRecord> {
        let listing = match self.fetcher.fetch(&source.url).await {
            Ok(body) => body,
            Err(e) => {
                error!(error = %e, url = %source.url, "Listing fetch failed; skipping source");
                return Vec::new();
            }
        };

        let outcomes = match scan_listing(&listing, source) {
            Ok(outcomes) => outcomes,
            Err(e) => {
                error!(error = %e, url = %source.url, "Listing scan failed; skipping source");
                return Vec::new();
            }
        };

        let total = outcomes.len();
        let mut accepted = Vec::new();
        for (index, outcome) in outcomes.into_iter().enumerate() {
            match outcome {
                Ok(candidate) => accepted.push(candidate),
                Err(reason) => {
                    debug!(index, reason = %reason, "Skipped listing candidate");
                }
            }
        }
        info!(
            candidates = total,
            accepted = accepted.len(),
            url = %source.url,
            "Scanned listing page"
        );

        let records: Vec<ArticleRecord> = stream::iter(accepted)
            .then(|candidate| async move {
                let content = self.extractor.extract(&candidate.url).await;
                ArticleRecord::new(candidate.title, candidate.url, source.name.clone(), content)
            })
            .collect()
            .await;

        info!(count = records.len(), "Harvested source");
        records
    }
}

/// Scan a fetched listing page into per-candidate outcomes.
///
/// Parsing happens in one synchronous pass so the DOM never lives across
/// an await point; only owned titles and URLs leave this function.
fn scan_listing(html: &str, source: &SourceDescriptor) -> Result<Vec<CandidateOutcome>> {
    let article_sel = parse_selector(&source.selectors.articles)?;
    let title_sel = parse_selector(&source.selectors.title)?;
    let link_sel = parse_selector(&source.selectors.link)?;
    let base = Url::parse(&source.url).map_err(|e| Error::InvalidUrl {
        url: source.url.clone(),
        message: e.to_string(),
    })?;

    let document = Html::parse_document(html);
    Ok(document
        .select(&article_sel)
        .take(MAX_CANDIDATES_PER_SOURCE)
        .map(|element| evaluate_candidate(element, &title_sel, &link_sel, &base))
        .collect())
}

/// Evaluate one candidate block against the title and link selectors.
fn evaluate_candidate(
    element: ElementRef<'_>,
    title_sel: &Selector,
    link_sel: &Selector,
    base: &Url,
) -> CandidateOutcome {
    let title_elem = element
        .select(title_sel)
        .next()
        .ok_or(SkipReason::MissingTitle)?;
    let link_elem = element
        .select(link_sel)
        .next()
        .ok_or(SkipReason::MissingLink)?;

    let title = normalize_ws(&title_elem.text().collect::<Vec<_>>().join(" "));
    if title.is_empty() {
        return Err(SkipReason::EmptyTitle);
    }

    let href = link_elem
        .value()
        .attr("href")
        .filter(|href| !href.is_empty())
        .ok_or(SkipReason::MissingHref)?;
    let url = base
        .join(href)
        .map_err(|_| SkipReason::UnresolvableUrl(href.to_string()))?;

    Ok(CandidateLink {
        title,
        url: url.to_string(),
    })
}

fn parse_selector(raw: &str) -> Result<Selector> {
    Selector::parse(raw).map_err(|e| Error::Selector {
        selector: raw.to_string(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::EXTRACTION_SENTINEL;
    use crate::sources::SelectorRules;
    use async_trait::async_trait;
    use std::collections::HashMap;

    #[derive(Debug, Default)]
    struct MapFetcher {
        pages: HashMap<String, String>,
    }

    impl MapFetcher {
        fn with_page(mut self, url: &str, body: &str) -> Self {
            self.pages.insert(url.to_string(), body.to_string());
            self
        }
    }

    #[async_trait]
    impl PageFetcher for MapFetcher {
        async fn fetch(&self, url: &str) -> Result<String> {
            self.pages
                .get(url)
                .cloned()
                .ok_or_else(|| Error::Config(format!("no page for {url}")))
        }
    }

    fn test_source() -> SourceDescriptor {
        SourceDescriptor {
            name: "Example Wire".to_string(),
            url: "https://example.com/world/".to_string(),
            selectors: SelectorRules {
                articles: "article".to_string(),
                title: "h3 a".to_string(),
                link: "h3 a".to_string(),
            },
        }
    }

    fn candidate(title: &str, href: &str) -> String {
        format!("<article><h3><a href=\"{href}\">{title}</a></h3></article>")
    }

    fn article_page(seed: &str) -> String {
        format!("<html><body><article><p>{}</p></article></body></html>", seed.repeat(30))
    }

    #[tokio::test]
    async fn test_harvest_assembles_records_in_document_order() {
        let listing = format!(
            "<html><body>{}{}</body></html>",
            candidate("Markets rally", "/world/markets-rally"),
            candidate("Talks resume", "/world/talks-resume"),
        );
        let fetcher = MapFetcher::default()
            .with_page("https://example.com/world/", &listing)
            .with_page(
                "https://example.com/world/markets-rally",
                &article_page("Stocks climbed broadly. "),
            )
            .with_page(
                "https://example.com/world/talks-resume",
                &article_page("Delegates returned today. "),
            );
        let harvester = ListingHarvester::new(Arc::new(fetcher));

        let records = harvester.harvest(&test_source()).await;

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].title, "Markets rally");
        assert_eq!(records[0].url, "https://example.com/world/markets-rally");
        assert_eq!(records[0].source, "Example Wire");
        assert!(records[0].content.starts_with("Stocks climbed broadly."));
        assert!(!records[0].processed);
        assert_eq!(records[1].title, "Talks resume");
    }

    #[tokio::test]
    async fn test_candidates_capped_at_ten() {
        let mut listing = String::from("<html><body>");
        for i in 0..15 {
            listing.push_str(&candidate(&format!("Story {i}"), &format!("/s/{i}")));
        }
        listing.push_str("</body></html>");
        let fetcher = MapFetcher::default().with_page("https://example.com/world/", &listing);
        let harvester = ListingHarvester::new(Arc::new(fetcher));

        let records = harvester.harvest(&test_source()).await;

        assert_eq!(records.len(), MAX_CANDIDATES_PER_SOURCE);
        assert_eq!(records[0].title, "Story 0");
        assert_eq!(records[9].title, "Story 9");
    }

    #[tokio::test]
    async fn test_defective_candidates_do_not_affect_siblings() {
        let listing = format!(
            "<html><body>\
             {}\
             <article><span>No headline element</span></article>\
             <article><h3><a href=\"/x\">   </a></h3></article>\
             <article><h3><a href=\"\">Empty href</a></h3></article>\
             {}\
             </body></html>",
            candidate("First good", "/world/first"),
            candidate("Second good", "/world/second"),
        );
        let fetcher = MapFetcher::default().with_page("https://example.com/world/", &listing);
        let harvester = ListingHarvester::new(Arc::new(fetcher));

        let records = harvester.harvest(&test_source()).await;

        let titles: Vec<&str> = records.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["First good", "Second good"]);
    }

    #[tokio::test]
    async fn test_listing_fetch_failure_yields_empty_batch() {
        let harvester = ListingHarvester::new(Arc::new(MapFetcher::default()));

        let records = harvester.harvest(&test_source()).await;

        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_selector_yields_empty_batch() {
        let listing = candidate("Story", "/s");
        let fetcher = MapFetcher::default().with_page("https://example.com/world/", &listing);
        let harvester = ListingHarvester::new(Arc::new(fetcher));
        let mut source = test_source();
        source.selectors.title = "h3[".to_string();

        let records = harvester.harvest(&source).await;

        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn test_article_fetch_failure_degrades_to_sentinel() {
        let listing = candidate("Unreachable story", "/world/unreachable");
        let fetcher = MapFetcher::default().with_page("https://example.com/world/", &listing);
        let harvester = ListingHarvester::new(Arc::new(fetcher));

        let records = harvester.harvest(&test_source()).await;

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].content, EXTRACTION_SENTINEL);
        assert_eq!(records[0].title, "Unreachable story");
    }

    #[test]
    fn test_scan_reports_explicit_skip_reasons() {
        let listing = format!(
            "<html><body>\
             <article><span>nothing matches</span></article>\
             <article><h3><a href=\"/x\">  </a></h3></article>\
             <article><h3><a href=\"\">Empty href</a></h3></article>\
             <article><h3><a href=\"http://[::broken\">Bad href</a></h3></article>\
             {}\
             </body></html>",
            candidate("Markets rally", "/world/markets-rally"),
        );

        let outcomes = scan_listing(&listing, &test_source()).unwrap();

        assert_eq!(outcomes.len(), 5);
        assert_eq!(outcomes[0], Err(SkipReason::MissingTitle));
        assert_eq!(outcomes[1], Err(SkipReason::EmptyTitle));
        assert_eq!(outcomes[2], Err(SkipReason::MissingHref));
        assert!(matches!(outcomes[3], Err(SkipReason::UnresolvableUrl(_))));
        assert_eq!(
            outcomes[4],
            Ok(CandidateLink {
                title: "Markets rally".to_string(),
                url: "https://example.com/world/markets-rally".to_string(),
            })
        );
    }

    #[test]
    fn test_relative_links_resolve_against_listing_url() {
        let listing = candidate("Markets rally", "/world/markets-rally");

        let outcomes = scan_listing(&listing, &test_source()).unwrap();

        assert_eq!(
            outcomes[0].as_ref().unwrap().url,
            "https://example.com/world/markets-rally"
        );
    }

    #[test]
    fn test_absolute_links_pass_through_unchanged() {
        let listing = candidate("Elsewhere", "https://other.example.net/story");

        let outcomes = scan_listing(&listing, &test_source()).unwrap();

        assert_eq!(
            outcomes[0].as_ref().unwrap().url,
            "https://other.example.net/story"
        );
    }
}
