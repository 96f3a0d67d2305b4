//! Stream controller: drives one job stream from raw bytes to typed events.
//!
//! ```text
//! bytes --FrameBuffer--> lines --parse_sse_line--> payloads --decode_payload--> ProgressEvent
//! ```
//!
//! The controller reads lazily: a pull decodes at most one buffered line, and
//! only reads another chunk from the transport when no complete line is
//! waiting. Every pending read is raced against the cancellation token.

use futures::stream::{self, Stream, StreamExt};
use std::collections::VecDeque;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::client::{ByteStream, ClientError, StreamRequest, Transport};
use crate::codec::{decode_payload, JobKind};
use crate::model::ProgressEvent;
use crate::sse::{parse_sse_line, FrameBuffer};

/// Lifecycle of a job stream. `Completed`, `Failed` and `Cancelled` are
/// terminal.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum StreamState {
    /// The request is in flight inside [`StreamHandle::open`]. No handle is
    /// ever returned in this state: opening ends in `Streaming`, `Cancelled`,
    /// or an `Err` (the `Failed` transition, with no handle at all).
    Opening,
    Streaming,
    /// The transport signalled end-of-stream.
    Completed,
    /// Open or read failure; the error was handed to the caller.
    Failed,
    /// The caller's token fired. No error is surfaced.
    Cancelled,
}

impl StreamState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            StreamState::Completed | StreamState::Failed | StreamState::Cancelled
        )
    }
}

/// Exclusive owner of one open job stream.
///
/// The reader is released exactly once: when the stream reaches a terminal
/// state, or when the handle is dropped early, whichever happens first.
pub struct StreamHandle {
    kind: JobKind,
    token: CancellationToken,
    reader: Option<ByteStream>,
    frames: FrameBuffer,
    lines: VecDeque<String>,
    state: StreamState,
    decode_failures: usize,
    saw_terminal_tick: bool,
}

impl std::fmt::Debug for StreamHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamHandle")
            .field("kind", &self.kind)
            .field("state", &self.state)
            .field("buffered_lines", &self.lines.len())
            .field("decode_failures", &self.decode_failures)
            .finish()
    }
}

impl StreamHandle {
    /// Wrap an already opened byte stream.
    pub fn new(reader: ByteStream, kind: JobKind, token: CancellationToken) -> Self {
        Self {
            kind,
            token,
            reader: Some(reader),
            frames: FrameBuffer::new(),
            lines: VecDeque::new(),
            state: StreamState::Streaming,
            decode_failures: 0,
            saw_terminal_tick: false,
        }
    }

    /// Open a stream through `transport`.
    ///
    /// This is the `Opening` phase of the lifecycle. It ends in one of:
    /// - `Streaming`: the server accepted; the returned handle reads events.
    /// - `Failed`: the open error is returned directly and no handle exists.
    /// - `Cancelled`: the token fired while the request was in flight; the
    ///   returned handle yields nothing.
    pub async fn open<T: Transport + ?Sized>(
        transport: &T,
        request: StreamRequest,
        kind: JobKind,
        token: CancellationToken,
    ) -> Result<Self, ClientError> {
        debug!("{} stream {:?}", kind, StreamState::Opening);

        let opened = tokio::select! {
            biased;
            _ = token.cancelled() => None,
            result = transport.open_stream(request) => Some(result),
        };

        match opened {
            Some(Ok(reader)) => {
                debug!("{} stream {:?} -> {:?}", kind, StreamState::Opening, StreamState::Streaming);
                Ok(Self::new(reader, kind, token))
            }
            Some(Err(e)) if !e.is_cancellation() => {
                debug!(
                    "{} stream {:?} -> {:?}: {}",
                    kind,
                    StreamState::Opening,
                    StreamState::Failed,
                    e
                );
                Err(e)
            }
            _ => {
                debug!("{} stream {:?} -> {:?}", kind, StreamState::Opening, StreamState::Cancelled);
                Ok(Self {
                    kind,
                    token,
                    reader: None,
                    frames: FrameBuffer::new(),
                    lines: VecDeque::new(),
                    state: StreamState::Cancelled,
                    decode_failures: 0,
                    saw_terminal_tick: false,
                })
            }
        }
    }

    pub fn kind(&self) -> JobKind {
        self.kind
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    /// Number of `data:` payloads skipped because they failed to decode.
    pub fn decode_failures(&self) -> usize {
        self.decode_failures
    }

    /// Whether a tick with a terminal job status has been yielded.
    pub fn saw_terminal_tick(&self) -> bool {
        self.saw_terminal_tick
    }

    /// A clone of the token this stream is cancelled by.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Pull the next event.
    ///
    /// Returns `None` once the stream ended cleanly or was cancelled, and
    /// `Some(Err(_))` exactly once if the transport failed; after that the
    /// sequence is exhausted.
    pub async fn next_event(&mut self) -> Option<Result<ProgressEvent, ClientError>> {
        loop {
            if self.state.is_terminal() {
                return None;
            }

            if self.token.is_cancelled() {
                self.finish(StreamState::Cancelled);
                return None;
            }

            if let Some(line) = self.lines.pop_front() {
                if let Some(event) = self.decode_line(&line) {
                    return Some(Ok(event));
                }
                continue;
            }

            let Some(reader) = self.reader.as_mut() else {
                self.finish(StreamState::Completed);
                return None;
            };

            let read = tokio::select! {
                biased;
                _ = self.token.cancelled() => Err(ClientError::StreamCancelled),
                chunk = reader.next() => chunk.transpose(),
            };

            match read {
                Ok(Some(chunk)) => {
                    self.lines.extend(self.frames.feed(&chunk));
                }
                Ok(None) => {
                    if let Some(remainder) = self.frames.finish() {
                        debug!(
                            "Discarding unterminated trailing line on {} stream ({} bytes)",
                            self.kind,
                            remainder.len()
                        );
                    }
                    self.finish(StreamState::Completed);
                    return None;
                }
                Err(e) if e.is_cancellation() || self.token.is_cancelled() => {
                    self.finish(StreamState::Cancelled);
                    return None;
                }
                Err(e) => {
                    warn!("{} stream failed: {}", self.kind, e);
                    self.finish(StreamState::Failed);
                    return Some(Err(e));
                }
            }
        }
    }

    /// Turn the handle into a lazy `Stream` of events.
    pub fn into_stream(self) -> impl Stream<Item = Result<ProgressEvent, ClientError>> + Send {
        stream::unfold(self, |mut handle| async move {
            handle.next_event().await.map(|event| (event, handle))
        })
    }

    fn decode_line(&mut self, line: &str) -> Option<ProgressEvent> {
        let payload = parse_sse_line(line)?;
        match decode_payload(self.kind, payload) {
            Ok(event) => {
                if event.is_terminal() {
                    self.saw_terminal_tick = true;
                }
                Some(event)
            }
            Err(e) => {
                self.decode_failures += 1;
                warn!("Skipping malformed {} event: {}", self.kind, e);
                None
            }
        }
    }

    fn finish(&mut self, state: StreamState) {
        debug!("{} stream {:?} -> {:?}", self.kind, self.state, state);
        self.state = state;
        self.lines.clear();
        self.release();
    }

    fn release(&mut self) {
        if let Some(reader) = self.reader.take() {
            drop(reader);
            debug!("Released {} stream reader", self.kind);
        }
    }
}

impl Drop for StreamHandle {
    fn drop(&mut self) {
        self.release();
    }
}
