//! Payload decoding for the job progress schemas.

use serde::Deserialize;

use crate::client::ClientError;
use crate::model::{BatchProgress, DetailedProgress, IngestionError, ProgressEvent, ReindexProgress};

/// Which schema a stream's payloads are decoded against.
///
/// Selected by the job that opened the connection, never sniffed from the
/// payload itself.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum JobKind {
    Reindex,
    Batch,
    Detailed,
    ErrorList,
}

impl std::fmt::Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            JobKind::Reindex => "reindex",
            JobKind::Batch => "batch",
            JobKind::Detailed => "detailed",
            JobKind::ErrorList => "error-list",
        };
        f.write_str(name)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ErrorListPayload {
    Bare(Vec<IngestionError>),
    Wrapped { errors: Vec<IngestionError> },
}

impl From<ErrorListPayload> for Vec<IngestionError> {
    fn from(payload: ErrorListPayload) -> Self {
        match payload {
            ErrorListPayload::Bare(errors) | ErrorListPayload::Wrapped { errors } => errors,
        }
    }
}

/// Decode one `data:` payload as the schema selected by `kind`.
///
/// A failure here is recoverable: the stream controller logs it and moves on
/// to the next line.
pub fn decode_payload(kind: JobKind, payload: &str) -> Result<ProgressEvent, ClientError> {
    let event = match kind {
        JobKind::Reindex => ProgressEvent::Reindex(serde_json::from_str::<ReindexProgress>(payload)?),
        JobKind::Batch => ProgressEvent::Batch(serde_json::from_str::<BatchProgress>(payload)?),
        JobKind::Detailed => {
            ProgressEvent::Detailed(serde_json::from_str::<DetailedProgress>(payload)?)
        }
        JobKind::ErrorList => {
            ProgressEvent::Errors(serde_json::from_str::<ErrorListPayload>(payload)?.into())
        }
    };
    Ok(event)
}
