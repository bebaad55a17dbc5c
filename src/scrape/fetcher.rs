//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the engine, including:
//! - Building HTTP clients with proper user agent strings
//! - GET and HEAD requests with sanitized caller headers
//! - Manual redirect handling with loop detection
//! - Hard per-fetch timeouts independent of caller cancellation
//! - Error classification
//!
//! The [`Fetcher`] trait is the seam between the engine and the network;
//! tests substitute their own implementations.

use crate::config::UserAgentConfig;
use async_trait::async_trait;
use reqwest::{redirect::Policy, Client, Method};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Request headers never forwarded from caller-supplied maps
const UNSAFE_HEADERS: &[&str] = &[
    "host",
    "content-length",
    "connection",
    "transfer-encoding",
    "upgrade",
    "te",
    "trailer",
    "cookie",
    "authorization",
];

/// HTTP method for a fetch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FetchMethod {
    #[default]
    #[serde(rename = "GET")]
    Get,
    #[serde(rename = "HEAD")]
    Head,
}

impl FetchMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Head => "HEAD",
        }
    }
}

/// Redirect handling mode for a fetch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RedirectMode {
    #[default]
    Follow,
    Error,
    Manual,
}

/// Per-request fetch options
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchOptions {
    #[serde(default)]
    pub method: FetchMethod,

    #[serde(default)]
    pub redirect: RedirectMode,

    /// Extra request headers; unsafe headers are silently dropped
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub headers: HashMap<String, String>,
}

/// A successfully fetched page
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Final URL after redirects
    pub final_url: String,
    /// HTTP status code
    pub status_code: u16,
    /// Content-Type header value
    pub content_type: String,
    /// X-Frame-Options header, when present
    pub x_frame_options: Option<String>,
    /// Content-Security-Policy header, when present
    pub content_security_policy: Option<String>,
    /// Response body (empty for HEAD and manual-redirect fetches)
    pub body: String,
}

/// Result of a fetch operation
#[derive(Debug, Clone)]
pub enum FetchOutcome {
    /// Successfully fetched the page
    Success(FetchedPage),

    /// HTTP error status (4xx/5xx)
    HttpError {
        /// The HTTP status code
        status_code: u16,
    },

    /// Page content type is not text-like
    ContentMismatch {
        /// The actual Content-Type received
        content_type: String,
    },

    /// Redirect error (loop, too many redirects, or redirect under
    /// `RedirectMode::Error`)
    RedirectError {
        /// Error description
        error: String,
    },

    /// Network error (connection refused, timeout, etc.)
    NetworkError {
        /// Error description
        error: String,
    },

    /// The caller's cancellation token fired before completion
    Cancelled,
}

impl FetchOutcome {
    /// Returns the failure description for non-success outcomes
    pub fn failure_message(&self) -> Option<String> {
        match self {
            Self::Success(_) => None,
            Self::HttpError { status_code } => Some(format!("HTTP status {}", status_code)),
            Self::ContentMismatch { content_type } => {
                Some(format!("Unsupported content type: {}", content_type))
            }
            Self::RedirectError { error } => Some(error.clone()),
            Self::NetworkError { error } => Some(error.clone()),
            Self::Cancelled => Some("Cancelled".to_string()),
        }
    }
}

/// Trait for fetch backends
///
/// The default implementation is [`HttpFetcher`]; tests provide doubles
/// serving canned pages.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetches a URL, honoring the caller's cancellation token
    async fn fetch(
        &self,
        url: &Url,
        options: &FetchOptions,
        cancel: &CancellationToken,
    ) -> FetchOutcome;
}

/// Redirect chain tracker for manual redirect handling
#[derive(Debug, Default)]
struct RedirectChain {
    visited: HashSet<String>,
}

impl RedirectChain {
    const MAX_REDIRECTS: usize = 10;

    /// Adds a URL to the chain; returns false on a loop
    fn add_url(&mut self, url: &str) -> bool {
        self.visited.insert(url.to_string())
    }

    fn is_too_long(&self) -> bool {
        self.visited.len() > Self::MAX_REDIRECTS
    }
}

/// Builds an HTTP client with proper configuration
///
/// Redirects are disabled at the client so the fetcher can apply the
/// per-request redirect mode itself.
///
/// # Arguments
///
/// * `config` - The user agent configuration
pub fn build_http_client(config: &UserAgentConfig) -> Result<Client, reqwest::Error> {
    // Format: CrawlerName/Version (+ContactURL; ContactEmail)
    let user_agent = format!(
        "{}/{} (+{}; {})",
        config.crawler_name, config.crawler_version, config.contact_url, config.contact_email
    );

    Client::builder()
        .user_agent(user_agent)
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::none()) // Handle redirects manually
        .gzip(true)
        .brotli(true)
        .build()
}

/// Filters caller-supplied headers down to the safe subset
pub fn sanitize_headers(headers: &HashMap<String, String>) -> Vec<(String, String)> {
    headers
        .iter()
        .filter(|(name, _)| {
            let name = name.to_ascii_lowercase();
            !UNSAFE_HEADERS.contains(&name.as_str())
                && !name.starts_with("proxy-")
                && !name.starts_with("sec-")
        })
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect()
}

/// The default reqwest-backed fetcher
pub struct HttpFetcher {
    client: Client,
    hard_timeout: Duration,
}

impl HttpFetcher {
    /// Creates a fetcher with the given identity and hard timeout
    pub fn new(config: &UserAgentConfig, timeout_secs: u64) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(config)?,
            hard_timeout: Duration::from_secs(timeout_secs),
        })
    }

    async fn fetch_with_redirects(&self, url: &Url, options: &FetchOptions) -> FetchOutcome {
        let mut chain = RedirectChain::default();
        let mut current = url.clone();

        loop {
            if !chain.add_url(current.as_str()) {
                return FetchOutcome::RedirectError {
                    error: format!("Redirect loop detected at {}", current),
                };
            }

            if chain.is_too_long() {
                return FetchOutcome::RedirectError {
                    error: format!("Too many redirects (max {})", RedirectChain::MAX_REDIRECTS),
                };
            }

            let method = match options.method {
                FetchMethod::Get => Method::GET,
                FetchMethod::Head => Method::HEAD,
            };

            let mut request = self.client.request(method, current.clone());
            for (name, value) in sanitize_headers(&options.headers) {
                request = request.header(name, value);
            }

            let response = match request.send().await {
                Ok(response) => response,
                Err(e) => return classify_reqwest_error(&e),
            };

            let status = response.status();

            if status.is_redirection() {
                match options.redirect {
                    RedirectMode::Error => {
                        return FetchOutcome::RedirectError {
                            error: format!("Redirect ({}) from {}", status.as_u16(), current),
                        };
                    }
                    RedirectMode::Manual => {
                        // Hand the redirect response itself back to the caller
                        return FetchOutcome::Success(FetchedPage {
                            final_url: current.to_string(),
                            status_code: status.as_u16(),
                            content_type: header(&response, "content-type").unwrap_or_default(),
                            x_frame_options: header(&response, "x-frame-options"),
                            content_security_policy: header(
                                &response,
                                "content-security-policy",
                            ),
                            body: String::new(),
                        });
                    }
                    RedirectMode::Follow => {
                        let location = match header(&response, "location") {
                            Some(location) => location,
                            None => {
                                return FetchOutcome::RedirectError {
                                    error: "Redirect response without Location header".to_string(),
                                };
                            }
                        };

                        current = match current.join(&location) {
                            Ok(resolved) => resolved,
                            Err(_) => {
                                return FetchOutcome::RedirectError {
                                    error: format!("Invalid redirect URL: {}", location),
                                };
                            }
                        };

                        tracing::debug!("Following redirect to {}", current);
                        continue;
                    }
                }
            }

            if status.is_client_error() || status.is_server_error() {
                return FetchOutcome::HttpError {
                    status_code: status.as_u16(),
                };
            }

            let content_type = header(&response, "content-type").unwrap_or_default();
            if !content_type.is_empty() && !is_text_like(&content_type) {
                return FetchOutcome::ContentMismatch { content_type };
            }

            let final_url = response.url().to_string();
            let x_frame_options = header(&response, "x-frame-options");
            let content_security_policy = header(&response, "content-security-policy");
            let status_code = status.as_u16();

            let body = if options.method == FetchMethod::Head {
                String::new()
            } else {
                match response.text().await {
                    Ok(body) => body,
                    Err(e) => {
                        return FetchOutcome::NetworkError {
                            error: e.to_string(),
                        };
                    }
                }
            };

            return FetchOutcome::Success(FetchedPage {
                final_url,
                status_code,
                content_type,
                x_frame_options,
                content_security_policy,
                body,
            });
        }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(
        &self,
        url: &Url,
        options: &FetchOptions,
        cancel: &CancellationToken,
    ) -> FetchOutcome {
        tokio::select! {
            _ = cancel.cancelled() => FetchOutcome::Cancelled,
            result = tokio::time::timeout(self.hard_timeout, self.fetch_with_redirects(url, options)) => {
                match result {
                    Ok(outcome) => outcome,
                    Err(_) => FetchOutcome::NetworkError {
                        error: "Request timeout".to_string(),
                    },
                }
            }
        }
    }
}

/// Reads a response header as a string
fn header(response: &reqwest::Response, name: &str) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}

/// Returns true for content types the extractor can work with
fn is_text_like(content_type: &str) -> bool {
    let content_type = content_type.to_ascii_lowercase();
    content_type.starts_with("text/")
        || content_type.contains("html")
        || content_type.contains("xml")
        || content_type.contains("json")
}

/// Maps a reqwest error into a fetch outcome
fn classify_reqwest_error(error: &reqwest::Error) -> FetchOutcome {
    if error.is_timeout() {
        FetchOutcome::NetworkError {
            error: "Request timeout".to_string(),
        }
    } else if error.is_connect() {
        FetchOutcome::NetworkError {
            error: "Connection refused".to_string(),
        }
    } else if let Some(status) = error.status() {
        FetchOutcome::HttpError {
            status_code: status.as_u16(),
        }
    } else {
        FetchOutcome::NetworkError {
            error: error.to_string(),
        }
    }
}
