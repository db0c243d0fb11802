//! HTTP client for the audit APIs
//!
//! A thin wrapper around `reqwest` that handles:
//! - Base URL joining and authentication
//! - JSON response parsing
//! - Classifying 429 responses as throttling, distinct from other failures
//!
//! It never retries on its own: retry policy belongs to the export driver.

use crate::error::{Error, Result};
use reqwest::{Client, Response, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Credentials attached to every request
#[derive(Clone, Default)]
pub enum Credentials {
    /// No authentication
    #[default]
    None,

    /// HTTP Basic authentication (Jira: account email + API token)
    Basic {
        /// Username
        username: String,
        /// Password or API token
        password: String,
    },

    /// Bearer token authentication (organization admin API key)
    Bearer {
        /// The bearer token
        token: String,
    },
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credentials::None => write!(f, "None"),
            Credentials::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .finish_non_exhaustive(),
            Credentials::Bearer { .. } => f.debug_struct("Bearer").finish_non_exhaustive(),
        }
    }
}

/// Configuration for the HTTP client
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Base URL for all requests
    pub base_url: String,
    /// Request timeout
    pub timeout: Duration,
    /// Credentials
    pub credentials: Credentials,
    /// User agent string
    pub user_agent: String,
}

impl HttpClientConfig {
    /// Create a config for `base_url` with default settings
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: Duration::from_secs(30),
            credentials: Credentials::None,
            user_agent: format!("audit-export/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    /// Set the request timeout
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the credentials
    #[must_use]
    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }
}

/// HTTP client with authentication and throttle classification
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    config: HttpClientConfig,
}

impl HttpClient {
    /// Create a new HTTP client
    pub fn with_config(config: HttpClientConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()?;

        Ok(Self { client, config })
    }

    /// Make a GET request and parse the JSON response.
    ///
    /// HTTP 429 becomes [`Error::RateLimited`]; any other non-2xx status
    /// becomes [`Error::HttpStatus`].
    pub async fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<Value> {
        let url = self.build_url(path);

        let mut req = self.client.get(&url).query(query);
        req = match &self.config.credentials {
            Credentials::None => req,
            Credentials::Basic { username, password } => req.basic_auth(username, Some(password)),
            Credentials::Bearer { token } => req.bearer_auth(token),
        };

        let response = req.send().await?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(Error::RateLimited {
                retry_after_seconds: extract_retry_after(&response),
            });
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::http_status(status.as_u16(), body));
        }

        debug!(url = %url, status = status.as_u16(), "Request succeeded");

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Get the client configuration
    pub fn config(&self) -> &HttpClientConfig {
        &self.config
    }

    /// Build full URL from path
    pub fn build_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }

        let base = self.config.base_url.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        format!("{base}/{path}")
    }
}

/// Extract the `Retry-After` header as whole seconds
fn extract_retry_after(response: &Response) -> Option<u64> {
    response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse().ok())
}
