//! Document fetching and detail-page revision resolution.
//!
//! This crate provides:
//! - [`Fetcher`] — the seam through which listing and detail pages are fetched
//! - [`HttpFetcher`] — the `reqwest`-backed implementation
//! - [`revision`] — canonical revision extraction and stub resolution

pub mod revision;

use std::future::Future;
use std::time::Duration;

use arxivdigest_shared::{DigestError, Result};
use reqwest::Client;
use tracing::debug;
use url::Url;

pub use revision::{extract_revision, resolve};

/// User-Agent string for all requests.
const USER_AGENT: &str = concat!("arxivdigest/", env!("CARGO_PKG_VERSION"));

/// Maximum number of redirects to follow.
const MAX_REDIRECTS: usize = 5;

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Fetches a document body by URL.
///
/// Implementations carry no retry or backoff policy.
pub trait Fetcher: Send + Sync + 'static {
    fn fetch(&self, url: &Url) -> impl Future<Output = Result<String>> + Send;
}

// ---------------------------------------------------------------------------
// HttpFetcher
// ---------------------------------------------------------------------------

/// Plain HTTP fetcher. Non-2xx responses are errors.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Build a fetcher with the given per-request timeout.
    pub fn new(timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| DigestError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<String> {
        debug!(%url, "fetching");

        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| DigestError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DigestError::Network(format!("{url}: HTTP {status}")));
        }

        response
            .text()
            .await
            .map_err(|e| DigestError::Network(format!("{url}: body read failed: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fetches_body() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::method("GET"))
            .and(wiremock::matchers::path("/list/math.QA/new"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_string("<html></html>"))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new(5).unwrap();
        let url = Url::parse(&format!("{}/list/math.QA/new", server.uri())).unwrap();
        let body = fetcher.fetch(&url).await.unwrap();
        assert_eq!(body, "<html></html>");
    }

    #[tokio::test]
    async fn non_success_status_is_network_error() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::path("/abs/2401.00001"))
            .respond_with(wiremock::ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new(5).unwrap();
        let url = Url::parse(&format!("{}/abs/2401.00001", server.uri())).unwrap();
        let err = fetcher.fetch(&url).await.unwrap_err();
        assert!(matches!(err, DigestError::Network(_)));
        assert!(err.to_string().contains("503"));
    }

    #[tokio::test]
    async fn sends_user_agent() {
        let server = wiremock::MockServer::start().await;

        wiremock::Mock::given(wiremock::matchers::header("user-agent", USER_AGENT))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_string("ok"))
            .expect(1)
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new(5).unwrap();
        let url = Url::parse(&server.uri()).unwrap();
        assert_eq!(fetcher.fetch(&url).await.unwrap(), "ok");
    }
}
