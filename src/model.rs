//! Typed progress events decoded from job streams.
//!
//! Every struct here mirrors one JSON schema pushed by the server on a
//! `data:` line. Unknown fields are ignored; counters default to zero so that
//! a sparse tick such as `{"status":"in_progress","progress_percent":10}` still
//! decodes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Treat an explicit JSON `null` like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Status carried by a reindex or ingestion tick.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReindexStatus {
    InProgress,
    Completed,
    Error,
}

/// Pipeline phase a reindex job is currently in.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReindexPhase {
    Initialization,
    Deletion,
    Chunking,
    Embedding,
    Indexing,
    Validation,
    Completed,
}

/// One progress tick of a bulk reindex or document ingestion job.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReindexProgress {
    pub status: ReindexStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<ReindexPhase>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub processed_files: u64,

    #[serde(default, deserialize_with = "null_as_default")]
    pub total_files: u64,

    /// Completion in the range 0.0 - 100.0
    #[serde(default, deserialize_with = "null_as_default")]
    pub progress_percent: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_file: Option<String>,

    /// Human readable status line
    #[serde(default, deserialize_with = "null_as_default")]
    pub message: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detailed_progress: Option<DetailedProgress>,

    /// Errors riding along with this tick. Servers usually resend the whole
    /// list on every tick; see [`crate::history::ProgressHistory`] for merging.
    #[serde(default, deserialize_with = "null_as_default")]
    pub errors: Vec<IngestionError>,
}

impl ReindexProgress {
    /// Whether this tick is the logical end of the job.
    pub fn is_terminal(&self) -> bool {
        matches!(self.status, ReindexStatus::Completed | ReindexStatus::Error)
    }
}

/// Status of a discrete batch job.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

/// Job-scoped counters for a batch pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BatchProgress {
    pub job_id: String,
    pub status: BatchStatus,

    #[serde(default, deserialize_with = "null_as_default")]
    pub processed: u64,

    #[serde(default, deserialize_with = "null_as_default")]
    pub total: u64,

    #[serde(default, deserialize_with = "null_as_default")]
    pub failed: u64,

    #[serde(default, deserialize_with = "null_as_default")]
    pub progress_percent: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl BatchProgress {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.status,
            BatchStatus::Completed | BatchStatus::Failed | BatchStatus::Cancelled
        )
    }
}

/// Counters for a sub-task such as image captioning or chunk embedding.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubProgress {
    #[serde(default)]
    pub processed: u64,

    #[serde(default)]
    pub total: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

#[derive(Debug, Copy, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PhaseStatus {
    Pending,
    InProgress,
    Completed,
    Error,
    Skipped,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PipelinePhase {
    pub name: String,
    pub status: PhaseStatus,
}

/// Rich snapshot attached opportunistically to a reindex tick.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DetailedProgress {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_file: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_page: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_pages: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images: Option<SubProgress>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunks: Option<SubProgress>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub phases: Vec<PipelinePhase>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub entities_total: u64,

    #[serde(default, deserialize_with = "null_as_default")]
    pub relations_total: u64,
}

impl DetailedProgress {
    /// The first phase still running, if any.
    pub fn active_phase(&self) -> Option<&PipelinePhase> {
        self.phases
            .iter()
            .find(|phase| phase.status == PhaseStatus::InProgress)
    }
}

#[derive(Debug, Copy, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

/// A problem reported while ingesting one source file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IngestionError {
    pub severity: Severity,

    /// Kept as sent; use [`IngestionError::parsed_timestamp`] for a typed value.
    pub timestamp: String,

    pub file: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,

    pub message: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl IngestionError {
    /// Parse the timestamp as RFC 3339, returning `None` for other formats.
    pub fn parsed_timestamp(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.timestamp)
            .ok()
            .map(|ts| ts.with_timezone(&Utc))
    }
}

/// A decoded progress tick. Which variant a stream produces is fixed by the
/// [`crate::codec::JobKind`] the stream was opened with.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum ProgressEvent {
    Reindex(ReindexProgress),
    Batch(BatchProgress),
    Detailed(DetailedProgress),
    Errors(Vec<IngestionError>),
}

impl ProgressEvent {
    /// Whether this tick ends its job logically. The stream itself may
    /// still carry trailing ticks afterwards.
    pub fn is_terminal(&self) -> bool {
        match self {
            ProgressEvent::Reindex(progress) => progress.is_terminal(),
            ProgressEvent::Batch(progress) => progress.is_terminal(),
            ProgressEvent::Detailed(_) | ProgressEvent::Errors(_) => false,
        }
    }

    /// Percent complete, for the kinds that carry one.
    pub fn percent(&self) -> Option<f64> {
        match self {
            ProgressEvent::Reindex(progress) => Some(progress.progress_percent),
            ProgressEvent::Batch(progress) => Some(progress.progress_percent),
            ProgressEvent::Detailed(_) | ProgressEvent::Errors(_) => None,
        }
    }

    /// Ingestion errors carried by this tick.
    pub fn errors(&self) -> &[IngestionError] {
        match self {
            ProgressEvent::Reindex(progress) => &progress.errors,
            ProgressEvent::Errors(errors) => errors,
            ProgressEvent::Batch(_) | ProgressEvent::Detailed(_) => &[],
        }
    }
}
