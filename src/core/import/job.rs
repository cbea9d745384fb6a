//! Import job handles and their state machine.

use super::source::ImportSource;
use crate::core::model::Item;
use crate::core::similarity::SimilarPair;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use uuid::Uuid;

/// Lifecycle of an import job
///
/// ```text
/// Waiting -> Importing -> FailedDuplicate | FailedImport | SucceededSimilar | Succeeded
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    Waiting,
    Importing,
    /// The file's hash matched an item already in the library
    FailedDuplicate,
    /// The file could not be read, downloaded or stored
    FailedImport,
    /// Imported, and at least one near-duplicate exists
    SucceededSimilar,
    /// Imported with no near-duplicate
    Succeeded,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobStatus::Waiting | JobStatus::Importing)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, JobStatus::Succeeded | JobStatus::SucceededSimilar)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            JobStatus::Waiting => "waiting",
            JobStatus::Importing => "importing",
            JobStatus::FailedDuplicate => "duplicate",
            JobStatus::FailedImport => "failed",
            JobStatus::SucceededSimilar => "imported (similar)",
            JobStatus::Succeeded => "imported",
        };
        f.write_str(label)
    }
}

#[derive(Debug)]
struct JobState {
    status: JobStatus,
    progress: f32,
    cancelled: bool,
    item: Option<Arc<Item>>,
    duplicate_of: Option<Arc<Item>>,
    similar: Vec<SimilarPair>,
    error: Option<String>,
}

/// A queued file or URL import, shared between the caller and the worker
#[derive(Debug)]
pub struct ImportJob {
    id: Uuid,
    source: ImportSource,
    state: Mutex<JobState>,
    changed: Condvar,
}

impl ImportJob {
    pub(crate) fn new(source: ImportSource) -> Self {
        Self {
            id: Uuid::new_v4(),
            source,
            state: Mutex::new(JobState {
                status: JobStatus::Waiting,
                progress: 0.0,
                cancelled: false,
                item: None,
                duplicate_of: None,
                similar: Vec::new(),
                error: None,
            }),
            changed: Condvar::new(),
        }
    }

    fn state(&self) -> MutexGuard<'_, JobState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn source(&self) -> &ImportSource {
        &self.source
    }

    pub fn status(&self) -> JobStatus {
        self.state().status
    }

    /// Fraction complete in `[0, 1]`
    pub fn progress(&self) -> f32 {
        self.state().progress
    }

    /// Whether the job was removed from the queue before it started
    pub fn is_cancelled(&self) -> bool {
        self.state().cancelled
    }

    /// The item created by a successful import
    pub fn item(&self) -> Option<Arc<Item>> {
        self.state().item.clone()
    }

    /// The pre-existing item with the same content hash
    pub fn duplicate_of(&self) -> Option<Arc<Item>> {
        self.state().duplicate_of.clone()
    }

    /// Near-duplicate pairs found for the new item
    pub fn similar_pairs(&self) -> Vec<SimilarPair> {
        self.state().similar.clone()
    }

    /// Why the import failed, if it did
    pub fn error(&self) -> Option<String> {
        self.state().error.clone()
    }

    /// Block until the job reaches a terminal status or is cancelled
    pub fn wait(&self) -> JobStatus {
        let state = self
            .changed
            .wait_while(self.state(), |s| !s.status.is_terminal() && !s.cancelled)
            .unwrap_or_else(PoisonError::into_inner);
        state.status
    }

    /// Like [`wait`](Self::wait), giving up after `timeout`
    pub fn wait_timeout(&self, timeout: Duration) -> Option<JobStatus> {
        let (state, result) = self
            .changed
            .wait_timeout_while(self.state(), timeout, |s| {
                !s.status.is_terminal() && !s.cancelled
            })
            .unwrap_or_else(PoisonError::into_inner);
        (!result.timed_out()).then_some(state.status)
    }

    /// Waiting -> Importing. Fails if the job was cancelled or already started.
    pub(super) fn start(&self) -> bool {
        let mut state = self.state();
        if state.cancelled || state.status != JobStatus::Waiting {
            return false;
        }
        state.status = JobStatus::Importing;
        true
    }

    /// Mark a waiting job as cancelled. Fails once the worker has started it.
    pub(super) fn mark_cancelled(&self) -> bool {
        let mut state = self.state();
        if state.status != JobStatus::Waiting || state.cancelled {
            return false;
        }
        state.cancelled = true;
        drop(state);
        self.changed.notify_all();
        true
    }

    pub(super) fn set_progress(&self, progress: f32) {
        self.state().progress = progress.clamp(0.0, 1.0);
    }

    pub(super) fn finish_duplicate(&self, existing: Arc<Item>) {
        self.finish(JobStatus::FailedDuplicate, |state| {
            state.duplicate_of = Some(existing)
        });
    }

    pub(super) fn finish_failed(&self, reason: String) {
        self.finish(JobStatus::FailedImport, |state| state.error = Some(reason));
    }

    pub(super) fn finish_imported(&self, item: Arc<Item>, similar: Vec<SimilarPair>) {
        let status = if similar.is_empty() {
            JobStatus::Succeeded
        } else {
            JobStatus::SucceededSimilar
        };
        self.finish(status, |state| {
            state.item = Some(item);
            state.similar = similar;
        });
    }

    fn finish(&self, status: JobStatus, record: impl FnOnce(&mut JobState)) {
        let mut state = self.state();
        record(&mut state);
        state.status = status;
        state.progress = 1.0;
        drop(state);
        self.changed.notify_all();
    }
}
