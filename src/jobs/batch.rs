//! Batch pipeline progress.

use serde::{Deserialize, Serialize};

use crate::client::{ClientError, StreamRequest};
use crate::codec::JobKind;
use crate::jobs::StreamingJob;

/// Selects an already scheduled batch job by id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BatchProgressParams {
    pub job_id: String,
}

impl BatchProgressParams {
    pub fn new(job_id: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
        }
    }
}

pub struct BatchProgressJob;

impl StreamingJob for BatchProgressJob {
    type Params = BatchProgressParams;
    const KIND: JobKind = JobKind::Batch;

    fn request(params: &Self::Params) -> Result<StreamRequest, ClientError> {
        let job_id = params.job_id.trim();
        if job_id.is_empty() {
            return Err(ClientError::Config("Batch job id is required".to_string()));
        }
        Ok(StreamRequest::get([
            "api", "v1", "batch", "jobs", job_id, "progress", "stream",
        ]))
    }
}
