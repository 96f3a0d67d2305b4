//! Caller-side aggregation of progress ticks.
//!
//! The decoder hands out each tick as-is. Servers resend the full error list
//! on every reindex tick, so a UI that wants "all problems seen so far" needs
//! to merge them; that lives here rather than in the decoder.

use itertools::Itertools;
use std::collections::{HashMap, HashSet};
use tracing::info;

use crate::client::ClientError;
use crate::model::{BatchProgress, IngestionError, ProgressEvent, ReindexProgress, Severity};
use crate::stream::{StreamHandle, StreamState};

/// Why a followed stream stopped.
#[derive(Debug)]
pub enum StreamEnd {
    /// Clean end-of-stream after a terminal job tick.
    Finished,
    /// Clean end-of-stream without ever seeing a terminal tick.
    Disconnected,
    /// The caller cancelled.
    Cancelled,
    /// Transport failure; events recorded before it are still valid.
    Failed(ClientError),
}

type ErrorKey = (String, String, Option<u32>, String);

/// Accumulated view of one job's progress.
#[derive(Debug, Default)]
pub struct ProgressHistory {
    events: usize,
    latest_reindex: Option<ReindexProgress>,
    latest_batch: Option<BatchProgress>,
    errors: Vec<IngestionError>,
    seen: HashSet<ErrorKey>,
    finished: bool,
}

impl ProgressHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one tick into the history.
    pub fn record(&mut self, event: &ProgressEvent) {
        self.events += 1;
        self.finished |= event.is_terminal();

        for error in event.errors() {
            let key = (
                error.timestamp.clone(),
                error.file.clone(),
                error.page,
                error.message.clone(),
            );
            if self.seen.insert(key) {
                self.errors.push(error.clone());
            }
        }

        match event {
            ProgressEvent::Reindex(progress) => self.latest_reindex = Some(progress.clone()),
            ProgressEvent::Batch(progress) => self.latest_batch = Some(progress.clone()),
            ProgressEvent::Detailed(detailed) => {
                if let Some(latest) = self.latest_reindex.as_mut() {
                    latest.detailed_progress = Some(detailed.clone());
                }
            }
            ProgressEvent::Errors(_) => {}
        }
    }

    pub fn event_count(&self) -> usize {
        self.events
    }

    pub fn latest_reindex(&self) -> Option<&ReindexProgress> {
        self.latest_reindex.as_ref()
    }

    pub fn latest_batch(&self) -> Option<&BatchProgress> {
        self.latest_batch.as_ref()
    }

    /// Distinct ingestion errors in first-seen order.
    pub fn errors(&self) -> &[IngestionError] {
        &self.errors
    }

    pub fn severity_counts(&self) -> HashMap<Severity, usize> {
        self.errors.iter().counts_by(|error| error.severity)
    }

    /// Whether a terminal job tick has been recorded.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Files that produced at least one error-severity entry.
    pub fn failed_files(&self) -> String {
        self.errors
            .iter()
            .filter(|error| error.severity == Severity::Error)
            .map(|error| error.file.as_str())
            .unique()
            .join(", ")
    }
}

/// Drain a stream into a history, reporting how it ended.
pub async fn follow(mut handle: StreamHandle) -> (ProgressHistory, StreamEnd) {
    let mut history = ProgressHistory::new();

    while let Some(event) = handle.next_event().await {
        match event {
            Ok(event) => history.record(&event),
            Err(e) => return (history, StreamEnd::Failed(e)),
        }
    }

    let end = match handle.state() {
        StreamState::Cancelled => StreamEnd::Cancelled,
        _ if handle.saw_terminal_tick() => StreamEnd::Finished,
        _ => StreamEnd::Disconnected,
    };
    info!(
        "{} stream ended ({:?}) after {} events, {} skipped",
        handle.kind(),
        end,
        history.event_count(),
        handle.decode_failures()
    );
    (history, end)
}
