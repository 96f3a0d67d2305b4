//! Document reindex and ingestion jobs.
//!
//! Both report progress with the reindex tick schema.

use nonempty::NonEmpty;
use serde::{Deserialize, Serialize};

use crate::client::{ClientError, StreamRequest};
use crate::codec::JobKind;
use crate::jobs::StreamingJob;

/// Parameters for a bulk reindex.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReindexParams {
    /// Restrict the reindex to one input directory; all inputs when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory: Option<String>,

    /// Rebuild entries even if their content hash is unchanged.
    #[serde(default)]
    pub force: bool,
}

impl ReindexParams {
    pub fn with_directory(mut self, directory: impl Into<String>) -> Self {
        self.directory = Some(directory.into());
        self
    }

    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }
}

pub struct ReindexJob;

impl StreamingJob for ReindexJob {
    type Params = ReindexParams;
    const KIND: JobKind = JobKind::Reindex;

    fn request(params: &Self::Params) -> Result<StreamRequest, ClientError> {
        Ok(StreamRequest::post(
            ["api", "v1", "documents", "reindex", "stream"],
            serde_json::to_value(params)?,
        ))
    }
}

/// Parameters for ingesting an explicit list of files.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IngestParams {
    pub file_paths: NonEmpty<String>,
}

impl IngestParams {
    pub fn new(first: impl Into<String>) -> Self {
        Self {
            file_paths: NonEmpty::new(first.into()),
        }
    }

    /// Build from a list, rejecting an empty one.
    pub fn from_paths<I, S>(paths: I) -> Result<Self, ClientError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let paths: Vec<String> = paths.into_iter().map(Into::into).collect();
        NonEmpty::from_vec(paths)
            .map(|file_paths| Self { file_paths })
            .ok_or_else(|| ClientError::Config("At least one file path is required".to_string()))
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.file_paths.push(path.into());
        self
    }
}

pub struct IngestJob;

impl StreamingJob for IngestJob {
    type Params = IngestParams;
    const KIND: JobKind = JobKind::Reindex;

    fn request(params: &Self::Params) -> Result<StreamRequest, ClientError> {
        Ok(StreamRequest::post(
            ["api", "v1", "documents", "ingest", "stream"],
            serde_json::to_value(params)?,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::Method;
    use serde_json::json;

    #[test]
    fn test_reindex_request() {
        let request =
            ReindexJob::request(&ReindexParams::default().with_directory("inputs/legal")).unwrap();
        assert_eq!(request.method, Method::POST);
        assert_eq!(request.segments.join("/"), "api/v1/documents/reindex/stream");
        assert_eq!(request.body, Some(json!({"directory": "inputs/legal", "force": false})));

        let request = ReindexJob::request(&ReindexParams::default().with_force(true)).unwrap();
        assert_eq!(request.body, Some(json!({"force": true})));
    }

    #[test]
    fn test_ingest_request() {
        let params = IngestParams::new("a.pdf").with_path("b.docx");
        let request = IngestJob::request(&params).unwrap();
        assert_eq!(request.segments.join("/"), "api/v1/documents/ingest/stream");
        assert_eq!(request.body, Some(json!({"file_paths": ["a.pdf", "b.docx"]})));
        assert_eq!(IngestJob::KIND, JobKind::Reindex);
    }

    #[test]
    fn test_ingest_rejects_empty_list() {
        assert!(matches!(
            IngestParams::from_paths(Vec::<String>::new()),
            Err(ClientError::Config(_))
        ));
        let params = IngestParams::from_paths(["x.md", "y.md"]).unwrap();
        assert_eq!(params.file_paths.len(), 2);
    }
}
