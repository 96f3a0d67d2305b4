//! Transport configuration.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://localhost:9621";

/// Options for the HTTP transport behind job streams.
///
/// There is deliberately no total request timeout: a job stream stays open
/// for as long as the job runs. Callers that need a deadline should race the
/// stream against a timer and cancel its token.
///
/// # Example
/// ```rust
/// use jobstream::options::TransportOptions;
/// use std::time::Duration;
///
/// let options = TransportOptions::new()
///     .with_base_url("https://index.internal:9621".to_string())
///     .with_connect_timeout(Duration::from_secs(5))
///     .with_header("X-Workspace".to_string(), "legal".to_string());
/// assert_eq!(options.base_url(), "https://index.internal:9621");
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TransportOptions {
    /// Base URL for API endpoints
    pub base_url: Option<String>,

    /// Timeout for establishing the connection only
    pub connect_timeout: Option<Duration>,

    /// HTTP proxy URL
    pub proxy: Option<String>,

    /// Additional HTTP headers to include in requests
    pub extra_headers: Option<HashMap<String, String>>,
}

impl TransportOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// The configured base URL, or [`DEFAULT_BASE_URL`].
    pub fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }

    /// Set the base URL.
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = Some(base_url);
        self
    }

    /// Set the connect timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Set the proxy URL.
    pub fn with_proxy(mut self, proxy: String) -> Self {
        self.proxy = Some(proxy);
        self
    }

    /// Set extra headers.
    pub fn with_extra_headers(mut self, headers: HashMap<String, String>) -> Self {
        self.extra_headers = Some(headers);
        self
    }

    /// Add a single extra header.
    pub fn with_header(mut self, key: String, value: String) -> Self {
        self.extra_headers
            .get_or_insert_with(HashMap::new)
            .insert(key, value);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_base_url() {
        assert_eq!(TransportOptions::new().base_url(), DEFAULT_BASE_URL);
    }

    #[test]
    fn test_deserialize_partial_config() {
        let options: TransportOptions = serde_json::from_str(
            r#"{"base_url": "http://10.0.0.2:9621", "connect_timeout": {"secs": 3, "nanos": 0}}"#,
        )
        .unwrap();
        assert_eq!(options.base_url(), "http://10.0.0.2:9621");
        assert_eq!(options.connect_timeout, Some(Duration::from_secs(3)));
        assert!(options.extra_headers.is_none());
    }

    #[test]
    fn test_with_header_accumulates() {
        let options = TransportOptions::new()
            .with_header("a".to_string(), "1".to_string())
            .with_header("b".to_string(), "2".to_string());
        assert_eq!(options.extra_headers.unwrap().len(), 2);
    }
}
