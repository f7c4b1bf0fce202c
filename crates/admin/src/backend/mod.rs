//! Commerce backend REST client for the admin panel.
//!
//! Every call except login carries the signed-in admin's bearer token. No
//! caching: admins expect to see their own edits immediately.

mod activity;
mod auth;
mod promotions;
mod store;

pub use auth::{AdminAuthResponse, AdminProfile, DashboardStats};
pub use promotions::NightMarketOfferSummary;
pub use store::ListQuery;

use std::sync::Arc;

use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::config::BackendConfig;

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

    /// The token is valid but the backend refused the action.
    #[error("Forbidden")]
    Forbidden,

    /// Rate limited by the backend.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),
}

impl ApiError {
    /// Whether the backend or the network is at fault.
    #[must_use]
    pub const fn is_upstream_failure(&self) -> bool {
        match self {
            Self::Http(_) | Self::Parse(_) | Self::Url(_) => true,
            Self::Api { status, .. } => *status >= 500,
            Self::NotFound(_) | Self::Unauthorized | Self::Forbidden | Self::RateLimited(_) => {
                false
            }
        }
    }

    /// Text to show an admin in a toast or next to a form.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Api { status, message } if *status < 500 && !message.is_empty() => {
                message.clone()
            }
            Self::NotFound(_) => "That record no longer exists.".to_string(),
            Self::Unauthorized => "Your session has expired. Please sign in again.".to_string(),
            Self::Forbidden => "Your role does not allow this action.".to_string(),
            Self::RateLimited(secs) => format!("Too many requests. Try again in {secs} seconds."),
            _ => "The backend is not responding properly. Please try again.".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(alias = "error")]
    message: Option<String>,
}

/// Payloads come either bare or wrapped in `{"data": ...}`.
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

/// Client for the admin endpoints of the commerce backend.
#[derive(Clone)]
pub struct BackendClient {
    inner: Arc<BackendClientInner>,
}

struct BackendClientInner {
    client: reqwest::Client,
    base_url: String,
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
            .user_agent(concat!("bazaar-admin/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            inner: Arc::new(BackendClientInner {
                client,
                base_url: config.base_url.trim_end_matches('/').to_string(),
            }),
        })
    }

    fn request(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        token: Option<&str>,
    ) -> Result<RequestBuilder, ApiError> {
        let mut url = Url::parse(&format!("{}{path}", self.inner.base_url))?;
        if !query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(query.iter().map(|(k, v)| (*k, v.as_str())));
        }
        let builder = self.inner.client.request(method, url);
        Ok(match token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        })
    }

    async fn get<T: DeserializeOwned>(
        &self,
        token: &str,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let builder = self.request(Method::GET, path, query, Some(token))?;
        Self::decode(&Self::send(builder).await?)
    }

    async fn send_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: Method,
        token: Option<&str>,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let builder = self.request(method, path, &[], token)?.json(body);
        Self::decode(&Self::send(builder).await?)
    }

    /// `DELETE` whose response body is ignored.
    async fn delete(&self, token: &str, path: &str) -> Result<(), ApiError> {
        let builder = self.request(Method::DELETE, path, &[], Some(token))?;
        Self::send(builder).await.map(|_| ())
    }

    fn decode<T: DeserializeOwned>(text: &str) -> Result<T, ApiError> {
        serde_json::from_str::<Envelope<T>>(text)
            .map(Envelope::into_inner)
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    body = %text.chars().take(500).collect::<String>(),
                    "Failed to parse backend response"
                );
                ApiError::Parse(e)
            })
    }

    /// Send a request and return the body of a successful response.
    async fn send(builder: RequestBuilder) -> Result<String, ApiError> {
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
            StatusCode::FORBIDDEN => Err(ApiError::Forbidden),
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
                        "Backend returned server error"
                    );
                } else {
                    tracing::debug!(
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

    /// Unauthenticated round trip, for readiness checks. Any answer below
    /// 500 means the backend is up.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend is unreachable or failing.
    pub async fn ping(&self) -> Result<(), ApiError> {
        let builder = self.request(Method::GET, "/api/categories", &[], None)?;
        match Self::send(builder).await {
            Ok(_) => Ok(()),
            Err(e) if e.is_upstream_failure() => Err(e),
            Err(_) => Ok(()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_accepts_wrapped_and_bare() {
        let wrapped: Vec<u8> = BackendClient::decode(r#"{"data": [1]}"#).unwrap();
        assert_eq!(wrapped, vec![1]);
        let bare: Vec<u8> = BackendClient::decode("[2, 3]").unwrap();
        assert_eq!(bare, vec![2, 3]);
        assert!(matches!(
            BackendClient::decode::<Vec<u8>>("not json"),
            Err(ApiError::Parse(_))
        ));
    }

    #[test]
    fn test_user_message_hides_server_errors() {
        let rejected = ApiError::Api {
            status: 409,
            message: "Coupon code already exists".to_string(),
        };
        assert_eq!(rejected.user_message(), "Coupon code already exists");

        let broken = ApiError::Api {
            status: 500,
            message: "NullPointerException".to_string(),
        };
        assert!(!broken.user_message().contains("NullPointer"));
        assert!(broken.is_upstream_failure());
        assert!(!ApiError::Forbidden.is_upstream_failure());
    }

    #[test]
    fn test_request_builds_query() {
        let client = BackendClient::new(&BackendConfig::new("http://localhost:8080/")).unwrap();
        let request = client
            .request(
                Method::GET,
                "/api/admin/orders",
                &[("status", "pending".to_string()), ("search", "Lê".to_string())],
                Some("tok"),
            )
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(
            request.url().as_str(),
            "http://localhost:8080/api/admin/orders?status=pending&search=L%C3%AA"
        );
        assert_eq!(
            request
                .headers()
                .get("authorization")
                .and_then(|v| v.to_str().ok()),
            Some("Bearer tok")
        );
    }
}
