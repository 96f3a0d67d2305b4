//! reqwest-backed transport for job streams.

use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt};
use reqwest::header::ACCEPT;
use reqwest::{Client, RequestBuilder, Url};
use std::collections::HashMap;
use tracing::debug;

use crate::client::{ByteStream, ClientError, StreamRequest, Transport};
use crate::options::TransportOptions;

pub const EVENT_STREAM: &str = "text/event-stream";

/// Build a configured HTTP client from transport options.
///
/// Only a connect timeout is applied; an overall timeout would cut off
/// long-running job streams.
pub fn build_http_client(options: &TransportOptions) -> Result<Client, reqwest::Error> {
    let mut builder = Client::builder();

    if let Some(timeout) = options.connect_timeout {
        builder = builder.connect_timeout(timeout);
    }

    if let Some(proxy_url) = &options.proxy {
        if let Ok(proxy) = reqwest::Proxy::all(proxy_url) {
            builder = builder.proxy(proxy);
        }
    }

    builder.build()
}

/// Add extra headers to a request if specified in transport options.
pub fn add_extra_headers(
    mut request: RequestBuilder,
    extra_headers: &Option<HashMap<String, String>>,
) -> RequestBuilder {
    if let Some(headers) = extra_headers {
        for (key, value) in headers {
            request = request.header(key, value);
        }
    }
    request
}

/// Opens job streams over HTTP.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: Url,
    extra_headers: Option<HashMap<String, String>>,
}

impl HttpTransport {
    pub fn new(options: TransportOptions) -> Result<Self, ClientError> {
        let base_url = Url::parse(options.base_url())
            .map_err(|e| ClientError::Config(format!("Invalid base URL {}: {}", options.base_url(), e)))?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::Config(format!(
                "Base URL cannot have path segments: {}",
                base_url
            )));
        }

        Ok(Self {
            client: build_http_client(&options)?,
            base_url,
            extra_headers: options.extra_headers,
        })
    }

    /// Resolve request path segments against the base URL.
    pub fn endpoint(&self, segments: &[String]) -> Result<Url, ClientError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::Config(format!("Base URL cannot have path segments: {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn open_stream(&self, request: StreamRequest) -> Result<ByteStream, ClientError> {
        let url = self.endpoint(&request.segments)?;
        debug!("Opening event stream: {} {}", request.method, url);

        let mut req = self
            .client
            .request(request.method, url)
            .header(ACCEPT, EVENT_STREAM);

        req = add_extra_headers(req, &self.extra_headers);

        if let Some(body) = &request.body {
            req = req.json(body);
        }

        let response = req.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Open {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.bytes_stream().map_err(ClientError::from).boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_build_http_client() {
        let options = TransportOptions::new().with_connect_timeout(Duration::from_secs(30));
        assert!(build_http_client(&options).is_ok());
    }

    #[test]
    fn test_build_http_client_with_proxy() {
        let options = TransportOptions::new().with_proxy("http://proxy.example.com:8080".to_string());
        assert!(build_http_client(&options).is_ok());
    }

    #[test]
    fn test_endpoint_joins_and_encodes_segments() {
        let transport = HttpTransport::new(
            TransportOptions::new().with_base_url("http://localhost:9621/console/".to_string()),
        )
        .unwrap();

        let url = transport
            .endpoint(&["api".to_string(), "jobs".to_string(), "a b/c".to_string()])
            .unwrap();
        assert_eq!(url.as_str(), "http://localhost:9621/console/api/jobs/a%20b%2Fc");
    }

    #[test]
    fn test_invalid_base_url() {
        let result = HttpTransport::new(TransportOptions::new().with_base_url("not a url".to_string()));
        assert!(matches!(result, Err(ClientError::Config(_))));

        let result = HttpTransport::new(TransportOptions::new().with_base_url("mailto:ops@example.com".to_string()));
        assert!(matches!(result, Err(ClientError::Config(_))));
    }
}
