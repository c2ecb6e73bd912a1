//! Client configuration.

use std::time::Duration;

use url::Url;

use crate::api::ApiError;

/// Default timeout for API requests.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Connection settings for the MetalCloud API, built once per invocation.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the API, without a trailing slash.
    pub endpoint: String,
    /// API key sent as a bearer token.
    pub api_key: String,
    /// Per-request timeout.
    pub request_timeout: Duration,
}

impl ClientConfig {
    /// Create a validated configuration.
    ///
    /// # Errors
    /// Returns [`ApiError::Config`] if the endpoint is not an http(s) URL or
    /// the API key is empty.
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Result<Self, ApiError> {
        let endpoint = endpoint.into();
        let api_key = api_key.into();

        let url = Url::parse(&endpoint)
            .map_err(|e| ApiError::Config(format!("invalid endpoint '{endpoint}': {e}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ApiError::Config(format!(
                "endpoint '{endpoint}' must use http or https"
            )));
        }

        if api_key.trim().is_empty() {
            return Err(ApiError::Config("API key must not be empty".to_string()));
        }

        Ok(Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        })
    }
}
