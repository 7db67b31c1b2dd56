//! HTTP client configuration.

use addiscare_core::defaults::{API_BASE_URL, REQUEST_TIMEOUT_SECS};

/// Configuration for [`NotificationClient`](crate::NotificationClient).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL the `/notifications` routes hang off (e.g. `https://host/api`).
    pub base_url: String,
    /// Bearer token for the current session.
    pub token: Option<String>,
    /// Request timeout in seconds.
    pub timeout_seconds: u64,
    /// User-Agent header value.
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: API_BASE_URL.to_string(),
            token: None,
            timeout_seconds: REQUEST_TIMEOUT_SECS,
            user_agent: format!("addiscare-client/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl ClientConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `ADDISCARE_API_URL` | `http://localhost:5000/api` | REST base URL |
    /// | `ADDISCARE_TOKEN` | (none) | Bearer token |
    /// | `ADDISCARE_TIMEOUT` | `30` | Request timeout (seconds) |
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            base_url: std::env::var("ADDISCARE_API_URL").unwrap_or(defaults.base_url),
            token: std::env::var("ADDISCARE_TOKEN")
                .ok()
                .filter(|t| !t.trim().is_empty()),
            timeout_seconds: std::env::var("ADDISCARE_TIMEOUT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.timeout_seconds),
            user_agent: defaults.user_agent,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    /// Join an endpoint path onto the base URL.
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}
