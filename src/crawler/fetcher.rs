//! Fetch client seam and its HTTP implementation
//!
//! The coordinator and download manager only see the [`FetchClient`] trait.
//! [`HttpFetcher`] implements it with reqwest, sending browser-like headers
//! with a rotated User-Agent and Referer on every request.

use crate::config::FetchConfig;
use crate::model::CrawlRequest;
use async_trait::async_trait;
use rand::seq::IndexedRandom;
use reqwest::header::{
    HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL, CONNECTION, REFERER,
    UPGRADE_INSECURE_REQUESTS, USER_AGENT,
};
use reqwest::{Client, StatusCode};
use std::time::Duration;
use thiserror::Error;
use url::Url;

const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8";

/// Errors produced by a fetch client for a single request
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("HTTP {status} for {url}")]
    Http { url: String, status: u16 },

    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("Network error for {url}: {message}")]
    Network { url: String, message: String },

    #[error("Failed to read body of {url}: {message}")]
    Body { url: String, message: String },
}

impl FetchError {
    /// Whether retrying the same request could succeed
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http { status, .. } => *status == 429 || *status >= 500,
            Self::Timeout { .. } | Self::Network { .. } | Self::Body { .. } => true,
        }
    }
}

/// Content returned for a successful fetch
#[derive(Debug, Clone)]
pub struct Page {
    /// Final URL after redirects
    pub url: Url,
    pub status: u16,
    pub body: Vec<u8>,
}

impl Page {
    /// Body decoded as UTF-8, replacing invalid sequences
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Abstract "fetch page" capability
///
/// Implementations decide how to honor `CrawlRequest::render`.
#[async_trait]
pub trait FetchClient: Send + Sync {
    async fn fetch(&self, request: &CrawlRequest) -> Result<Page, FetchError>;
}

/// Builds the shared HTTP client
///
/// # Example
///
/// ```no_run
/// use repro_harvest::config::FetchConfig;
/// use repro_harvest::crawler::build_http_client;
///
/// let client = build_http_client(&FetchConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &FetchConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .gzip(true)
        .brotli(true)
        .build()
}

/// reqwest-backed fetch client
///
/// Requests asking for rendered content are fetched as plain HTML; script
/// execution belongs to a browser-backed client behind the same trait.
pub struct HttpFetcher {
    client: Client,
    config: FetchConfig,
}

impl HttpFetcher {
    pub fn new(config: FetchConfig) -> Result<Self, reqwest::Error> {
        let client = build_http_client(&config)?;
        Ok(Self { client, config })
    }

    /// Browser-like headers with a rotated User-Agent and Referer
    pub fn request_headers(&self) -> HeaderMap {
        let mut rng = rand::rng();
        let mut headers = HeaderMap::new();

        if let Some(ua) = self.config.user_agents.choose(&mut rng) {
            if let Ok(value) = HeaderValue::from_str(ua) {
                headers.insert(USER_AGENT, value);
            }
        }
        if let Some(referer) = self.config.referers.choose(&mut rng) {
            if let Ok(value) = HeaderValue::from_str(referer) {
                headers.insert(REFERER, value);
            }
        }
        if let Ok(value) = HeaderValue::from_str(&self.config.accept_language) {
            headers.insert(ACCEPT_LANGUAGE, value);
        }

        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_HTML));
        headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
        headers.insert(UPGRADE_INSECURE_REQUESTS, HeaderValue::from_static("1"));
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("max-age=0"));
        headers
    }
}

#[async_trait]
impl FetchClient for HttpFetcher {
    async fn fetch(&self, request: &CrawlRequest) -> Result<Page, FetchError> {
        let url_str = request.url.to_string();
        if request.render {
            tracing::trace!("Render requested for {}, fetching raw HTML", url_str);
        }

        let headers = self.request_headers();
        let response = self
            .client
            .get(request.url.clone())
            .headers(headers)
            .send()
            .await
            .map_err(|e| classify_error(&url_str, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Http {
                url: url_str,
                status: status.as_u16(),
            });
        }

        let final_url = response.url().clone();
        let body = response.bytes().await.map_err(|e| FetchError::Body {
            url: url_str.clone(),
            message: e.to_string(),
        })?;

        Ok(Page {
            url: final_url,
            status: status.as_u16(),
            body: body.to_vec(),
        })
    }
}

fn classify_error(url: &str, error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else if let Some(status) = error.status().filter(StatusCode::is_client_error) {
        FetchError::Http {
            url: url.to_string(),
            status: status.as_u16(),
        }
    } else {
        FetchError::Network {
            url: url.to_string(),
            message: error.to_string(),
        }
    }
}
