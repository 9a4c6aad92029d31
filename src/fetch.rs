//! Page fetching with timeouts and bounded retry.
//!
//! This module provides the HTTP layer used by both the listing harvester
//! and the content extractor. It includes automatic retry logic with
//! exponential backoff and jitter for transient transport failures.
//!
//! # Architecture
//!
//! The module uses a trait-based design for flexibility:
//! - [`PageFetcher`]: Core trait defining async page retrieval
//! - [`HttpFetcher`]: Production implementation backed by `reqwest`
//! - [`RetryFetch`]: Decorator that adds retry logic to any `PageFetcher`
//!
//! # Retry Strategy
//!
//! - Only transient transport failures are retried; a definitive HTTP
//!   status (404, 500) is returned immediately
//! - Exponential backoff starting at the configured base delay
//! - Maximum delay capped at 30 seconds
//! - Random jitter (0-250ms) added to prevent thundering herd

use async_trait::async_trait;
use rand::{rng, Rng};
use std::fmt;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{error, instrument, warn};

use crate::error::Result;

/// The User-Agent header sent with every request.
///
/// Several of the harvested sites serve a reduced or empty page to clients
/// without a browser-looking agent, so this matches a desktop browser.
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// How long a single page fetch may take before it is abandoned.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Trait for async page retrieval.
///
/// Implementors fetch a URL and return the response body as text. The
/// abstraction exists so the harvester and extractor can run against
/// in-memory fakes in tests and against a retrying HTTP client in
/// production.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch a page and return its body.
    ///
    /// # Arguments
    ///
    /// * `url` - The absolute URL to fetch
    ///
    /// # Returns
    ///
    /// The response body as text, or an error if the request failed or the
    /// server answered with a non-success status.
    async fn fetch(&self, url: &str) -> Result<String>;
}

/// Production [`PageFetcher`] backed by a shared `reqwest` client.
///
/// Every request carries the browser [`USER_AGENT`] and is subject to
/// [`FETCH_TIMEOUT`]. Non-success statuses are turned into errors so that
/// callers never mistake an error page for article markup.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Build a fetcher with the default [`FETCH_TIMEOUT`].
    pub fn new() -> Result<Self> {
        Self::with_timeout(FETCH_TIMEOUT)
    }

    /// Build a fetcher with a custom per-request timeout.
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    #[instrument(level = "info", skip_all, fields(url = %url))]
    async fn fetch(&self, url: &str) -> Result<String> {
        let t0 = Instant::now();
        let res = self.client.get(url).send().await;
        let dt = t0.elapsed();

        match res {
            Ok(response) => {
                let status = response.status();
                match response.error_for_status() {
                    Ok(ok) => Ok(ok.text().await?),
                    Err(e) => {
                        warn!(
                            status = %status,
                            elapsed_ms = dt.as_millis() as u128,
                            error = %e,
                            "Request returned error status"
                        );
                        Err(e.into())
                    }
                }
            }
            Err(e) => {
                warn!(elapsed_ms = dt.as_millis() as u128, error = %e, "Request failed");
                Err(e.into())
            }
        }
    }
}

/// Wrapper that adds exponential backoff retry logic to any [`PageFetcher`].
///
/// This decorator transparently retries transient transport failures
/// (timeouts, connection resets). Definitive server answers such as 404 or
/// 500 are not retried; the per-article degradation policy handles those.
///
/// # Backoff Strategy
///
/// The delay between retries follows this formula:
/// ```text
/// delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..250ms)
/// ```
pub struct RetryFetch<T> {
    /// The underlying fetcher to wrap.
    inner: T,
    /// Maximum number of retry attempts before giving up.
    max_retries: usize,
    /// Initial delay between retries (doubles with each attempt).
    base_delay: Duration,
    /// Maximum delay cap to prevent excessive waiting.
    max_delay: Duration,
}

impl<T> RetryFetch<T>
where
    T: PageFetcher,
{
    /// Create a new retry wrapper around an existing [`PageFetcher`].
    ///
    /// # Arguments
    ///
    /// * `inner` - The underlying fetcher to wrap
    /// * `max_retries` - Maximum number of retry attempts
    /// * `base_delay` - Initial delay between retries (1 second recommended)
    ///
    /// # Example
    ///
    /// ```ignore
    /// let fetcher = RetryFetch::new(HttpFetcher::new()?, 2, Duration::from_secs(1));
    /// ```
    pub fn new(inner: T, max_retries: usize, base_delay: Duration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: Duration::from_secs(30),
        }
    }
}

impl<T> fmt::Debug for RetryFetch<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryFetch")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

#[async_trait]
impl<T> PageFetcher for RetryFetch<T>
where
    T: PageFetcher + fmt::Debug,
{
    #[instrument(level = "info", skip_all, fields(url = %url))]
    async fn fetch(&self, url: &str) -> Result<String> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            let attempt_t0 = Instant::now();
            match self.inner.fetch(url).await {
                Ok(body) => {
                    return Ok(body);
                }
                Err(e) => {
                    attempt += 1;
                    let attempt_dt = attempt_t0.elapsed();
                    let total_dt = total_t0.elapsed();

                    if !e.is_transient() || attempt > self.max_retries {
                        error!(
                            attempt,
                            max = self.max_retries,
                            elapsed_ms_attempt = attempt_dt.as_millis() as u128,
                            elapsed_ms_total = total_dt.as_millis() as u128,
                            error = %e,
                            "fetch() giving up"
                        );
                        return Err(e);
                    }

                    // backoff calc
                    let mut delay = self.base_delay.saturating_mul(1 << (attempt - 1));
                    if delay > self.max_delay {
                        delay = self.max_delay;
                    }
                    let jitter_ms: u64 = rng().random_range(0..=250);
                    let delay = delay + Duration::from_millis(jitter_ms);

                    warn!(
                        attempt,
                        max = self.max_retries,
                        elapsed_ms_attempt = attempt_dt.as_millis() as u128,
                        elapsed_ms_total = total_dt.as_millis() as u128,
                        ?delay,
                        error = %e,
                        "fetch() attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_http_fetcher_returns_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/page"))
            .respond_with(ResponseTemplate::new(200).set_body_string("hello"))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new().unwrap();
        let body = fetcher.fetch(&format!("{}/page", server.uri())).await.unwrap();
        assert_eq!(body, "hello");
    }

    #[tokio::test]
    async fn test_http_fetcher_sends_browser_user_agent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ua"))
            .and(header("user-agent", USER_AGENT))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .expect(1)
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new().unwrap();
        fetcher.fetch(&format!("{}/ua", server.uri())).await.unwrap();
    }

    #[tokio::test]
    async fn test_http_fetcher_rejects_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new().unwrap();
        let err = fetcher
            .fetch(&format!("{}/missing", server.uri()))
            .await
            .unwrap_err();
        assert!(!err.is_transient());
        // the error keeps the definitive status the server answered with
        assert!(err.to_string().contains("404"));
    }

    #[tokio::test]
    async fn test_retry_fetch_does_not_retry_status_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/broken"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let fetcher = RetryFetch::new(HttpFetcher::new().unwrap(), 3, Duration::from_millis(10));
        let res = fetcher.fetch(&format!("{}/broken", server.uri())).await;
        assert!(res.is_err());
        // expect(1) verifies on drop that no retry happened
    }

    #[tokio::test]
    async fn test_retry_fetch_recovers_from_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/flaky"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("late")
                    .set_delay(Duration::from_millis(500)),
            )
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/flaky"))
            .respond_with(ResponseTemplate::new(200).set_body_string("recovered"))
            .mount(&server)
            .await;

        let inner = HttpFetcher::with_timeout(Duration::from_millis(100)).unwrap();
        let fetcher = RetryFetch::new(inner, 2, Duration::from_millis(10));
        let body = fetcher.fetch(&format!("{}/flaky", server.uri())).await.unwrap();
        assert_eq!(body, "recovered");
    }

    #[tokio::test]
    async fn test_retry_fetch_exhausts_attempts() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/slow"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("never")
                    .set_delay(Duration::from_millis(500)),
            )
            .expect(2)
            .mount(&server)
            .await;

        let inner = HttpFetcher::with_timeout(Duration::from_millis(50)).unwrap();
        let fetcher = RetryFetch::new(inner, 1, Duration::from_millis(10));
        let res = fetcher.fetch(&format!("{}/slow", server.uri())).await;
        assert!(res.is_err());
    }
}
