//! Streaming job definitions.
//!
//! Each job knows how to build its request and which payload schema its
//! stream carries. The buffering and decoding loop is shared.

pub mod batch;
pub mod documents;

use crate::client::{ClientError, StreamRequest};
use crate::codec::JobKind;

/// A long-running server job whose progress is pushed as an event stream.
///
/// # Example
/// ```rust,ignore
/// pub struct PipelineJob;
///
/// impl StreamingJob for PipelineJob {
///     type Params = PipelineParams;
///     const KIND: JobKind = JobKind::Detailed;
///
///     fn request(params: &Self::Params) -> Result<StreamRequest, ClientError> {
///         Ok(StreamRequest::get(["api", "v1", "pipeline", params.id.as_str(), "stream"]))
///     }
/// }
/// ```
pub trait StreamingJob {
    /// Job-selection parameters sent when opening the stream.
    type Params: Send + Sync;

    /// Schema every `data:` payload of this job is decoded against.
    const KIND: JobKind;

    /// Build the streaming request, validating parameters first.
    fn request(params: &Self::Params) -> Result<StreamRequest, ClientError>;
}

// Re-export for convenience
pub use batch::{BatchProgressJob, BatchProgressParams};
pub use documents::{IngestJob, IngestParams, ReindexJob, ReindexParams};
