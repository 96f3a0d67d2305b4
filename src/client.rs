//! Core client, transport trait and error types.

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use reqwest::Method;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::http::HttpTransport;
use crate::jobs::{BatchProgressJob, BatchProgressParams, IngestJob, IngestParams, ReindexJob, ReindexParams, StreamingJob};
use crate::options::TransportOptions;
use crate::stream::StreamHandle;

/// Errors that can occur while opening or reading a job stream.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// The server refused to start streaming.
    #[error("Stream open failed (HTTP {status}): {body}")]
    Open { status: u16, body: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Stream cancelled")]
    StreamCancelled,

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ClientError {
    /// Whether this error only reflects a caller-initiated cancellation.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, ClientError::StreamCancelled)
    }
}

/// Raw body chunks of a streamed response. Dropping it releases the
/// underlying connection.
pub type ByteStream = BoxStream<'static, Result<Bytes, ClientError>>;

/// What a job asks the transport to open.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamRequest {
    pub method: Method,

    /// Path segments appended to the base URL; encoded by the transport.
    pub segments: Vec<String>,

    /// Optional JSON request body
    pub body: Option<serde_json::Value>,
}

impl StreamRequest {
    pub fn get<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            method: Method::GET,
            segments: segments.into_iter().map(Into::into).collect(),
            body: None,
        }
    }

    pub fn post<I, S>(segments: I, body: serde_json::Value) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            method: Method::POST,
            segments: segments.into_iter().map(Into::into).collect(),
            body: Some(body),
        }
    }
}

/// The one capability the stream controller needs from the network layer:
/// a byte-chunked readable stream over a successful streamed response.
///
/// Implementations must send an `Accept: text/event-stream` header and
/// return [`ClientError::Open`] carrying the response body for any
/// non-success status.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn open_stream(&self, request: StreamRequest) -> Result<ByteStream, ClientError>;
}

/// Opens job progress streams.
///
/// # Example
/// ```no_run
/// use jobstream::client::ProgressClient;
/// use jobstream::jobs::ReindexParams;
/// use jobstream::options::TransportOptions;
/// use tokio_util::sync::CancellationToken;
///
/// # async fn run() -> Result<(), jobstream::ClientError> {
/// let client = ProgressClient::new(
///     TransportOptions::new().with_base_url("http://localhost:9621".to_string()),
/// )?;
/// let mut handle = client
///     .reindex(&ReindexParams::default(), CancellationToken::new())
///     .await?;
///
/// while let Some(event) = handle.next_event().await {
///     println!("{:?}", event?.percent());
/// }
/// # Ok(())
/// # }
/// ```
pub struct ProgressClient<T = HttpTransport> {
    transport: T,
}

impl ProgressClient<HttpTransport> {
    /// Create a client backed by reqwest.
    pub fn new(options: TransportOptions) -> Result<Self, ClientError> {
        Ok(Self::with_transport(HttpTransport::new(options)?))
    }
}

impl<T: Transport> ProgressClient<T> {
    pub fn with_transport(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Open a stream for any job kind.
    ///
    /// Fails with [`ClientError::Open`] if the server rejects the request; in
    /// that case no events are ever produced. If `token` fires while the
    /// request is in flight, the returned handle is already cancelled and
    /// yields nothing.
    pub async fn open<J: StreamingJob>(
        &self,
        params: &J::Params,
        token: CancellationToken,
    ) -> Result<StreamHandle, ClientError> {
        let request = J::request(params)?;
        StreamHandle::open(&self.transport, request, J::KIND, token).await
    }

    /// Stream a bulk reindex.
    pub async fn reindex(
        &self,
        params: &ReindexParams,
        token: CancellationToken,
    ) -> Result<StreamHandle, ClientError> {
        self.open::<ReindexJob>(params, token).await
    }

    /// Stream ingestion of an explicit file list.
    pub async fn ingest(
        &self,
        params: &IngestParams,
        token: CancellationToken,
    ) -> Result<StreamHandle, ClientError> {
        self.open::<IngestJob>(params, token).await
    }

    /// Follow the progress of an already scheduled batch job.
    pub async fn batch_progress(
        &self,
        params: &BatchProgressParams,
        token: CancellationToken,
    ) -> Result<StreamHandle, ClientError> {
        self.open::<BatchProgressJob>(params, token).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream::{self, StreamExt};
    use std::sync::Mutex;

    use crate::model::ProgressEvent;

    /// Replays canned chunks and records the requests it was asked to open.
    struct ScriptedTransport {
        chunks: Vec<&'static str>,
        requests: Mutex<Vec<StreamRequest>>,
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn open_stream(&self, request: StreamRequest) -> Result<ByteStream, ClientError> {
            self.requests.lock().unwrap().push(request);
            let chunks: Vec<Result<Bytes, ClientError>> = self
                .chunks
                .iter()
                .copied()
                .map(|chunk| Ok(Bytes::from_static(chunk.as_bytes())))
                .collect();
            Ok(stream::iter(chunks).boxed())
        }
    }

    fn client(chunks: Vec<&'static str>) -> ProgressClient<ScriptedTransport> {
        ProgressClient::with_transport(ScriptedTransport {
            chunks,
            requests: Mutex::new(Vec::new()),
        })
    }

    #[test]
    fn test_error_display() {
        let err = ClientError::Open {
            status: 500,
            body: "disk full".to_string(),
        };
        assert_eq!(err.to_string(), "Stream open failed (HTTP 500): disk full");
        assert!(!err.is_cancellation());
        assert!(ClientError::StreamCancelled.is_cancellation());
    }

    #[tokio::test]
    async fn test_batch_progress_uses_batch_schema() {
        let client = client(vec![
            "data: {\"job_id\":\"b1\",\"status\":\"running\",\"progress_percent\":20}\n",
            "data: {\"job_id\":\"b1\",\"status\":\"completed\",\"progress_percent\":100}\n",
        ]);

        let handle = client
            .batch_progress(&BatchProgressParams::new("b1"), CancellationToken::new())
            .await
            .unwrap();
        let events: Vec<ProgressEvent> = handle
            .into_stream()
            .map(|event| event.unwrap())
            .collect()
            .await;

        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], ProgressEvent::Batch(_)));
        assert!(events[1].is_terminal());

        let requests = client.transport().requests.lock().unwrap();
        assert_eq!(requests[0].method, Method::GET);
        assert_eq!(
            requests[0].segments,
            vec!["api", "v1", "batch", "jobs", "b1", "progress", "stream"]
        );
    }

    #[tokio::test]
    async fn test_invalid_params_never_reach_transport() {
        let client = client(vec![]);
        let result = client
            .batch_progress(&BatchProgressParams::new("  "), CancellationToken::new())
            .await;

        assert!(matches!(result, Err(ClientError::Config(_))));
        assert!(client.transport().requests.lock().unwrap().is_empty());
    }
}
