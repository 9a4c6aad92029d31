//! Crate-wide error type.
//!
//! Most failures in this pipeline are swallowed at the component boundary
//! where they occur and turned into log events plus a degraded result (an
//! empty source contribution, a sentinel content value, a skipped record).
//! The variants here exist for the paths that do propagate: startup
//! validation, store access, and the fetch/extract internals before they
//! degrade.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid selector `{selector}`: {message}")]
    Selector { selector: String, message: String },

    #[error("invalid URL `{url}`: {message}")]
    InvalidUrl { url: String, message: String },

    #[error("store error: {0}")]
    Store(#[from] sqlx::Error),

    #[error("invalid stored timestamp `{value}`: {message}")]
    Timestamp { value: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("source file error: {0}")]
    SourceFile(#[from] serde_yaml::Error),
}

impl Error {
    /// Whether a retry could plausibly change the outcome.
    ///
    /// Transport-level failures (timeouts, connection resets) are worth a
    /// bounded retry. A definitive HTTP status (404, 500) is not: the
    /// server answered, and the per-article degradation policy takes over.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Http(e) => !e.is_status(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_errors_are_not_transient() {
        let e = Error::Config("missing DATABASE_URL".to_string());
        assert!(!e.is_transient());
    }

    #[test]
    fn selector_error_displays_rule() {
        let e = Error::Selector {
            selector: "div[".to_string(),
            message: "unexpected end of input".to_string(),
        };
        let rendered = e.to_string();
        assert!(rendered.contains("div["));
        assert!(rendered.contains("unexpected end of input"));
    }
}
