//! Source registry: which news sites to harvest and how to read their listings.
//!
//! This module defines the per-source configuration consumed by the listing
//! harvester:
//! - [`SourceDescriptor`]: One news site with its listing URL and selectors
//! - [`SelectorRules`]: The CSS selectors that locate headline candidates
//! - [`builtin_sources`]: The compiled-in default registry
//! - [`load_sources`]: Optional YAML override for the registry
//! - [`validate_sources`]: Startup validation; any failure here aborts the run
//!
//! Selectors are validated up front so that a typo in a selector surfaces as
//! a startup error instead of silently matching nothing at harvest time.

use std::path::Path;

use itertools::Itertools;
use scraper::Selector;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{info, instrument};
use url::Url;

use crate::error::{Error, Result};

/// CSS selectors describing how to pull headline candidates out of a
/// source's listing page.
///
/// # Fields
///
/// * `articles` - Matches each candidate block on the listing page
/// * `title` - Matches the headline element inside a candidate block
/// * `link` - Matches the anchor inside a candidate block whose `href`
///   points at the article
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SelectorRules {
    /// Selector for candidate blocks on the listing page.
    pub articles: String,
    /// Selector for the headline element within a candidate block.
    pub title: String,
    /// Selector for the link element within a candidate block.
    pub link: String,
}

/// One news source: a display name, a listing URL, and selector rules.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SourceDescriptor {
    /// Human-readable source name, used in logs and stored records.
    pub name: String,
    /// Absolute URL of the listing page to harvest.
    pub url: String,
    /// How to locate headline candidates on the listing page.
    pub selectors: SelectorRules,
}

/// The compiled-in default registry.
///
/// These are the sources harvested when no `--sources` file is supplied.
/// Selector choices track each site's current markup and are expected to
/// need occasional maintenance as the sites redesign.
pub fn builtin_sources() -> Vec<SourceDescriptor> {
    vec![
        SourceDescriptor {
            name: "Reuters".to_string(),
            url: "https://www.reuters.com/world/".to_string(),
            selectors: SelectorRules {
                articles: "article".to_string(),
                title: "h3 a, h2 a".to_string(),
                link: "h3 a, h2 a".to_string(),
            },
        },
        SourceDescriptor {
            name: "AP News".to_string(),
            url: "https://apnews.com/".to_string(),
            selectors: SelectorRules {
                articles: ".PagePromo".to_string(),
                title: ".PagePromo-title a".to_string(),
                link: ".PagePromo-title a".to_string(),
            },
        },
        SourceDescriptor {
            name: "BBC".to_string(),
            url: "https://www.bbc.com/news".to_string(),
            selectors: SelectorRules {
                articles: "[data-testid=\"card-headline\"]".to_string(),
                title: "h3".to_string(),
                link: "a".to_string(),
            },
        },
    ]
}

/// Load a source registry from a YAML file.
///
/// The file holds a YAML sequence of [`SourceDescriptor`] entries. The
/// loaded registry replaces the builtin one entirely; there is no merging.
///
/// # Arguments
///
/// * `path` - Path to the YAML registry file
///
/// # Errors
///
/// Returns an error if the file cannot be read or does not parse as a
/// sequence of source descriptors.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn load_sources(path: &Path) -> Result<Vec<SourceDescriptor>> {
    let raw = fs::read_to_string(path).await?;
    let sources: Vec<SourceDescriptor> = serde_yaml::from_str(&raw)?;
    info!(count = sources.len(), "Loaded source registry from file");
    Ok(sources)
}

/// Validate a registry before the run starts.
///
/// Checks that the registry is non-empty, that source names are unique,
/// that every listing URL is absolute, and that every selector parses.
///
/// # Errors
///
/// Returns a configuration error describing the first problem found. The
/// caller treats any error here as fatal.
pub fn validate_sources(sources: &[SourceDescriptor]) -> Result<()> {
    if sources.is_empty() {
        return Err(Error::Config("source registry is empty".to_string()));
    }

    let duplicates: Vec<&str> = sources
        .iter()
        .map(|s| s.name.as_str())
        .duplicates()
        .collect();
    if !duplicates.is_empty() {
        return Err(Error::Config(format!(
            "duplicate source names: {}",
            duplicates.join(", ")
        )));
    }

    for source in sources {
        Url::parse(&source.url).map_err(|e| Error::InvalidUrl {
            url: source.url.clone(),
            message: e.to_string(),
        })?;
        validate_selector(&source.selectors.articles)?;
        validate_selector(&source.selectors.title)?;
        validate_selector(&source.selectors.link)?;
    }

    Ok(())
}

fn validate_selector(raw: &str) -> Result<()> {
    Selector::parse(raw).map_err(|e| Error::Selector {
        selector: raw.to_string(),
        message: e.to_string(),
    })?;
    Ok(())
}
