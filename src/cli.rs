//! Command-line interface definitions for the news harvester.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! The store connection string can be provided via flag or environment
//! variable; everything else has a sensible default, so a bare invocation
//! runs the full pipeline once.

use clap::Parser;
use std::path::PathBuf;

use crate::artifact::DEFAULT_ARTIFACT_PATH;
use crate::pipeline::SOURCE_THROTTLE;

/// Command-line arguments for the news harvester.
///
/// # Examples
///
/// ```sh
/// # Run with the builtin source registry
/// DATABASE_URL=sqlite:articles.db news_harvest
///
/// # Custom registry and artifact location
/// news_harvest --database-url sqlite:articles.db -s sources.yaml -a out/articles.json
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// SQLite connection string for the article store
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: String,

    /// Path to a YAML source registry replacing the builtin one
    #[arg(short, long)]
    pub sources: Option<PathBuf>,

    /// Where to write the JSON batch artifact
    #[arg(short, long, default_value = DEFAULT_ARTIFACT_PATH)]
    pub artifact_path: PathBuf,

    /// Seconds to pause between consecutive sources
    #[arg(long, default_value_t = SOURCE_THROTTLE.as_secs())]
    pub throttle_secs: u64,
}
