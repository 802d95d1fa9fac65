//! HTTP clients for the storefront backend.
//!
//! # Architecture
//!
//! - [`ApiClient`] owns the `reqwest` client, base URL and bearer token and
//!   handles status mapping and response parsing
//! - [`DeliveryClient`] wraps it for the delivery endpoints and caches
//!   options and zone lookups in `moka` (TTL from config)
//! - [`CatalogClient`] wraps it for product lookups; products are never
//!   cached since they carry authoritative stock
//!
//! Responses may be a bare JSON body or wrapped as `{"data": ...}`.

mod cache;
mod catalog;
mod delivery;

pub use catalog::CatalogClient;
pub use delivery::DeliveryClient;

use std::sync::Arc;

use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, error};
use url::Url;

use crate::config::ApiSettings;

/// Errors that can occur when calling the backend API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed (connection, timeout, TLS).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limited by the API.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// A request URL could not be built.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// No API base URL configured.
    #[error("API not configured")]
    NotConfigured,
}

/// Response body, optionally wrapped in a `data` envelope.
#[derive(serde::Deserialize)]
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

// =============================================================================
// ApiClient
// =============================================================================

/// Low-level JSON client shared by the endpoint wrappers.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: Url,
    token: Option<SecretString>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.inner.base_url.as_str())
            .field("token", &self.inner.token.as_ref().map(|_| "[REDACTED]"))
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Create a client from settings.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotConfigured` if no base URL is set, or
    /// `ApiError::Http` if the HTTP client cannot be built.
    pub fn new(settings: &ApiSettings) -> Result<Self, ApiError> {
        let base_url = settings.base_url.clone().ok_or(ApiError::NotConfigured)?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl(base_url.to_string()));
        }

        let client = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()?;

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                client,
                base_url,
                token: settings.token.clone(),
            }),
        })
    }

    /// The configured base URL.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// Build an endpoint URL by appending path segments to the base URL.
    /// Each segment is percent-encoded, so city names with spaces are safe.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.inner.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ApiError::InvalidUrl(self.inner.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// `GET` a JSON resource.
    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        segments: &[&str],
    ) -> Result<T, ApiError> {
        let url = self.endpoint(segments)?;
        let request = self.authorize(self.inner.client.get(url.clone()));
        Self::send(url, request).await
    }

    /// `POST` a JSON body and parse a JSON response.
    pub(crate) async fn post_json<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        segments: &[&str],
        body: &B,
    ) -> Result<T, ApiError> {
        let url = self.endpoint(segments)?;
        let request = self.authorize(self.inner.client.post(url.clone()).json(body));
        Self::send(url, request).await
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.inner.token {
            Some(token) => request.bearer_auth(token.expose_secret()),
            None => request,
        }
    }

    async fn send<T: DeserializeOwned>(
        url: Url,
        request: reqwest::RequestBuilder,
    ) -> Result<T, ApiError> {
        debug!(url = %url, "API request");
        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Err(ApiError::NotFound(url.path().to_owned()));
        }

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(ApiError::RateLimited(retry_after));
        }

        // Read as text first for better error diagnostics
        let response_text = response.text().await?;

        if !status.is_success() {
            error!(
                status = %status,
                body = %response_text.chars().take(500).collect::<String>(),
                "API returned non-success status"
            );
            return Err(ApiError::Api {
                status: status.as_u16(),
                message: response_text.chars().take(200).collect(),
            });
        }

        match serde_json::from_str::<Envelope<T>>(&response_text) {
            Ok(envelope) => Ok(envelope.into_inner()),
            Err(e) => {
                error!(
                    error = %e,
                    body = %response_text.chars().take(500).collect::<String>(),
                    "Failed to parse API response"
                );
                Err(ApiError::Parse(e))
            }
        }
    }
}
