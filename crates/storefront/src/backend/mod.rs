//! Commerce backend REST client.
//!
//! # Architecture
//!
//! - The backend is the source of truth - no local persistence, direct API calls
//! - JSON over HTTP with `reqwest`, bearer tokens for customer calls
//! - In-memory caching via `moka` for catalog reads (5 minute TTL)
//!
//! # Example
//!
//! ```rust,ignore
//! use bazaar_storefront::backend::BackendClient;
//!
//! let client = BackendClient::new(&config.backend)?;
//! let product = client.product_by_slug("linen-shirt").await?;
//! let wheel = client.lucky_spin(Some(&customer.token)).await?;
//! ```

mod account;
mod cache;
mod catalog;
mod promotions;

pub use catalog::ProductQuery;
pub use promotions::{SharedWishlist, WishlistShare};

use std::sync::Arc;

use moka::future::Cache;
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::config::BackendConfig;
use cache::{CacheKey, CacheValue};

/// Errors that can occur when calling the backend API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed (connect, timeout, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Backend answered with an error status.
    #[error("Backend error ({status}): {message}")]
    Api { status: u16, message: String },

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Request URL could not be built.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Token missing, expired or revoked.
    #[error("Unauthorized")]
    Unauthorized,

    /// Rate limited by the backend.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),
}

impl ApiError {
    /// Whether this is the backend's (or the network's) fault rather than
    /// the request's.
    #[must_use]
    pub const fn is_upstream_failure(&self) -> bool {
        match self {
            Self::Http(_) | Self::Parse(_) | Self::Url(_) => true,
            Self::Api { status, .. } => *status >= 500,
            Self::NotFound(_) | Self::Unauthorized | Self::RateLimited(_) => false,
        }
    }

    /// Text safe to show a customer in a toast or inline error.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Api { status, message } if *status < 500 && !message.is_empty() => {
                message.clone()
            }
            Self::NotFound(_) => "We couldn't find what you were looking for.".to_string(),
            Self::Unauthorized => "Your session has expired. Please sign in again.".to_string(),
            Self::RateLimited(secs) => {
                format!("Too many requests. Please try again in {secs} seconds.")
            }
            _ => "The store is having trouble right now. Please try again.".to_string(),
        }
    }
}

/// Backend error body.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(alias = "error")]
    message: Option<String>,
}

/// List and detail endpoints answer either bare or wrapped in `{"data": ...}`.
#[derive(Deserialize)]
#[serde(untagged)]
enum Envelope<T> {
    Wrapped { data: T },
    Bare(T),
}

impl<T> Envelope<T> {
    fn into_inner(self) -> T {
        match self {
            Self::Wrapped { data } | Self::Bare(data) => data,
        }
    }
}

/// Client for the commerce backend.
///
/// Catalog facets and product detail are cached for 5 minutes; everything
/// customer-specific goes straight through.
#[derive(Clone)]
pub struct BackendClient {
    inner: Arc<BackendClientInner>,
}

struct BackendClientInner {
    client: reqwest::Client,
    base_url: String,
    cache: Cache<CacheKey, CacheValue>,
}

impl BackendClient {
    /// Create a new backend client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &BackendConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("bazaar-storefront/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            inner: Arc::new(BackendClientInner {
                client,
                base_url: config.base_url.trim_end_matches('/').to_string(),
                cache: cache::build(),
            }),
        })
    }

    fn url(&self, path: &str, query: &[(&str, String)]) -> Result<Url, ApiError> {
        let mut url = Url::parse(&format!("{}{path}", self.inner.base_url))?;
        if !query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(query.iter().map(|(k, v)| (*k, v.as_str())));
        }
        Ok(url)
    }

    fn authorize(builder: RequestBuilder, token: Option<&str>) -> RequestBuilder {
        match token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        token: Option<&str>,
    ) -> Result<T, ApiError> {
        let url = self.url(path, query)?;
        let builder = Self::authorize(self.inner.client.get(url), token);
        self.send(builder).await
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
        token: Option<&str>,
    ) -> Result<T, ApiError> {
        let url = self.url(path, &[])?;
        let builder = Self::authorize(self.inner.client.post(url).json(body), token);
        self.send(builder).await
    }

    async fn put<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
        token: Option<&str>,
    ) -> Result<T, ApiError> {
        let url = self.url(path, &[])?;
        let builder = Self::authorize(self.inner.client.put(url).json(body), token);
        self.send(builder).await
    }

    /// Send a request and decode its JSON body.
    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ApiError> {
        let text = self.send_raw(builder).await?;
        match serde_json::from_str::<Envelope<T>>(&text) {
            Ok(envelope) => Ok(envelope.into_inner()),
            Err(e) => {
                tracing::error!(
                    error = %e,
                    body = %text.chars().take(500).collect::<String>(),
                    "Failed to parse backend response"
                );
                Err(ApiError::Parse(e))
            }
        }
    }

    /// Send a request and return the body of a successful response.
    async fn send_raw(&self, builder: RequestBuilder) -> Result<String, ApiError> {
        let response = builder.send().await?;
        let status = response.status();
        let path = response.url().path().to_string();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(ApiError::RateLimited(retry_after));
        }

        let text = response.text().await?;

        if status.is_success() {
            return Ok(text);
        }

        match status {
            StatusCode::UNAUTHORIZED => Err(ApiError::Unauthorized),
            StatusCode::NOT_FOUND => Err(ApiError::NotFound(path)),
            _ => {
                let message = serde_json::from_str::<ErrorBody>(&text)
                    .ok()
                    .and_then(|b| b.message)
                    .unwrap_or_else(|| text.chars().take(200).collect());
                if status.is_server_error() {
                    tracing::error!(
                        status = %status,
                        path = %path,
                        body = %text.chars().take(500).collect::<String>(),
                        "Backend returned server error"
                    );
                } else {
                    debug!(
                        status = %status,
                        path = %path,
                        message = %message,
                        "Backend rejected request"
                    );
                }
                Err(ApiError::Api {
                    status: status.as_u16(),
                    message,
                })
            }
        }
    }

    /// Uncached round trip to the backend, for readiness checks.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend is unreachable or answers with an
    /// error status.
    pub async fn ping(&self) -> Result<(), ApiError> {
        let url = self.url("/api/categories", &[])?;
        self.send_raw(self.inner.client.get(url)).await.map(|_| ())
    }
}

/// Percent-encode a value for use as a single path segment.
fn segment(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_accepts_both_shapes() {
        let wrapped: Envelope<Vec<u32>> = serde_json::from_str(r#"{"data": [1, 2]}"#).unwrap();
        assert_eq!(wrapped.into_inner(), vec![1, 2]);
        let bare: Envelope<Vec<u32>> = serde_json::from_str("[3]").unwrap();
        assert_eq!(bare.into_inner(), vec![3]);
    }

    #[test]
    fn test_user_message() {
        let err = ApiError::Api {
            status: 400,
            message: "Coupon expired".to_string(),
        };
        assert_eq!(err.user_message(), "Coupon expired");
        assert!(!err.is_upstream_failure());

        let err = ApiError::Api {
            status: 503,
            message: "db down".to_string(),
        };
        assert!(!err.user_message().contains("db down"));
        assert!(err.is_upstream_failure());
    }

    #[test]
    fn test_rate_limited_error() {
        let err = ApiError::RateLimited(60);
        assert_eq!(err.to_string(), "Rate limited, retry after 60 seconds");
    }

    #[test]
    fn test_url_building() {
        let client = BackendClient::new(&BackendConfig::new("http://localhost:8080/")).unwrap();
        let url = client
            .url("/api/products", &[("search", "áo thun".to_string())])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:8080/api/products?search=%C3%A1o+thun"
        );
        assert_eq!(segment("a b/c"), "a%20b%2Fc");
    }
}
