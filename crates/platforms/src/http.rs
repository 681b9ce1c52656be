//! HTTP fetch port.
//!
//! Fetchers never talk to `reqwest` directly; they describe a request with
//! [`HttpRequest`] and hand it to an [`HttpFetcher`]. [`ReqwestFetcher`] is
//! the production implementation, tests plug in canned responses.

use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderName, HeaderValue};
use reqwest::{Client, ClientBuilder, Method};
use tracing::{debug, trace};

use crate::extractor::error::FetchError;

pub const DEFAULT_USER_AGENT: &str = "StageDock/1.0 (+https://github.com/owner/StageDock)";

/// Redirect hops followed before a page fetch gives up.
pub const DEFAULT_MAX_REDIRECTS: usize = 5;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

/// A single outgoing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl HttpRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::POST, url)
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Look up a header value, ignoring ASCII case of the name.
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Status code and decoded body text of a completed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    #[inline]
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }
}

/// Performs a request and returns status + body.
///
/// Implementations must follow redirects with a bounded depth and must be
/// safe to call from many tasks at once.
#[async_trait]
pub trait HttpFetcher: Send + Sync {
    async fn fetch(&self, request: HttpRequest) -> Result<HttpResponse, FetchError>;
}

/// Install the ring crypto provider for rustls once per process.
pub fn install_rustls_provider() {
    static PROVIDER_INSTALLED: OnceLock<()> = OnceLock::new();
    PROVIDER_INSTALLED.get_or_init(|| {
        if let Err(e) = rustls::crypto::ring::default_provider().install_default() {
            // Another crate got there first; either provider works.
            debug!(existing_provider = ?e, "rustls CryptoProvider already installed");
        }
    });
}

/// Client builder with the timeout and redirect policy used for every fetch.
pub fn create_client_builder(timeout: Duration, max_redirects: usize) -> ClientBuilder {
    install_rustls_provider();

    let mut builder = Client::builder()
        .redirect(reqwest::redirect::Policy::limited(max_redirects))
        .pool_max_idle_per_host(8);

    if timeout > Duration::ZERO {
        builder = builder.timeout(timeout);
    }

    builder
}

/// [`HttpFetcher`] backed by a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    client: Client,
}

impl ReqwestFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn with_settings(timeout: Duration, max_redirects: usize) -> Result<Self, FetchError> {
        let client = create_client_builder(timeout, max_redirects).build()?;
        Ok(Self::new(client))
    }

    pub fn client(&self) -> &Client {
        &self.client
    }
}

#[async_trait]
impl HttpFetcher for ReqwestFetcher {
    async fn fetch(&self, request: HttpRequest) -> Result<HttpResponse, FetchError> {
        let HttpRequest {
            method,
            url,
            headers,
            body,
        } = request;

        let mut builder = self.client.request(method, &url);
        for (name, value) in &headers {
            match (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                (Ok(name), Ok(value)) => builder = builder.header(name, value),
                _ => debug!(header = %name, "Invalid header; skipping"),
            }
        }
        if let Some(body) = body {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        trace!(url = %url, status, bytes = body.len(), "fetched");

        Ok(HttpResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builder() {
        let request = HttpRequest::post("https://gql.twitch.tv/gql")
            .header("Client-ID", "abc")
            .body("{}");

        assert_eq!(request.method, Method::POST);
        assert_eq!(request.header_value("client-id"), Some("abc"));
        assert_eq!(request.body.as_deref(), Some("{}"));
        assert_eq!(request.header_value("user-agent"), None);
    }

    #[test]
    fn test_response_is_ok() {
        assert!(HttpResponse::new(200, "").is_ok());
        assert!(!HttpResponse::new(204, "").is_ok());
        assert!(!HttpResponse::new(404, "").is_ok());
    }

    #[test]
    fn test_client_builder_builds() {
        let fetcher = ReqwestFetcher::with_settings(Duration::from_secs(5), 3);
        assert!(fetcher.is_ok());
    }
}
