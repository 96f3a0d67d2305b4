//! # jobstream - streaming job progress client
//!
//! Long-running indexing jobs (bulk reindex, document ingestion, batch
//! pipeline runs) push their progress over a one-directional, text-framed
//! event stream. This crate turns that byte stream into a lazy sequence of
//! typed [`ProgressEvent`]s.
//!
//! ## Features
//! - Async-first, tokio compatible
//! - Chunk-boundary and multi-byte safe line framing
//! - Malformed ticks are logged and skipped, never fatal
//! - Cooperative cancellation via `CancellationToken`
//! - The underlying connection is released exactly once on every exit path
//!
//! ## Architecture
//!
//! - [`sse`]: frame buffer and `data:` line extraction
//! - [`codec`]: per-job payload schemas
//! - [`stream`]: the stream controller ([`StreamHandle`])
//! - [`client`] / [`http`]: opening streams over a [`client::Transport`]
//! - [`jobs`]: request builders for each job kind
//! - [`history`]: optional caller-side aggregation
//!
//! ## Ending a stream
//!
//! Callers see three distinct endings:
//! 1. `None` after a tick with a terminal status: the job finished.
//! 2. `Some(Err(_))`: the stream failed; earlier events remain valid.
//! 3. `None` after cancelling the token: silent, no error.
//!
//! ## Example
//! ```no_run
//! use jobstream::client::ProgressClient;
//! use jobstream::jobs::IngestParams;
//! use jobstream::options::TransportOptions;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = ProgressClient::new(TransportOptions::new())?;
//!     let token = CancellationToken::new();
//!
//!     let params = IngestParams::new("inputs/report.pdf");
//!     let mut handle = client.ingest(&params, token.clone()).await?;
//!
//!     while let Some(event) = handle.next_event().await {
//!         let event = event?;
//!         println!("{:?}% done", event.percent());
//!     }
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod codec;
pub mod history;
pub mod http;
pub mod jobs;
pub mod model;
pub mod options;
pub mod sse;
pub mod stream;

// Re-exports for convenience
pub use client::{ClientError, ProgressClient, Transport};
pub use codec::JobKind;
pub use model::ProgressEvent;
pub use stream::{StreamHandle, StreamState};
