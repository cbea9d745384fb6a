//! Event type definitions for progress reporting.

use crate::core::import::JobStatus;
use crate::core::model::ItemId;
use crate::core::online::MatchStatus;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// All events emitted by the library's background activities
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    /// Import queue events
    Import(ImportEvent),
    /// Similarity flag rebuild events
    Similarity(SimilarityEvent),
    /// Online match retrieval events
    Match(MatchEvent),
}

/// Events from the import worker
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ImportEvent {
    /// A job was added to the queue
    Queued { job_id: Uuid, source: String },
    /// A job moved to a new status
    StatusChanged { job_id: Uuid, status: JobStatus },
    /// A job made progress (0.0 - 1.0)
    Progress { job_id: Uuid, progress: f32 },
    /// A waiting job was removed from the queue
    Cancelled { job_id: Uuid },
    /// The queue was paused or resumed
    PausedChanged { paused: bool },
}

/// Events during a similarity flag rebuild
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SimilarityEvent {
    /// Rebuild has started
    Started { total: usize },
    /// A subject item finished
    Progress(RebuildProgress),
    /// Rebuild finished every subject
    Completed {
        processed: usize,
        without_similar: usize,
        duration_ms: u64,
    },
    /// Rebuild stopped early; flags already written are kept
    Cancelled { processed: usize },
}

/// Progress information during a rebuild
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebuildProgress {
    /// Subjects finished so far
    pub processed: usize,
    /// Total subjects
    pub total: usize,
}

/// Events during online match retrieval
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum MatchEvent {
    /// Retrieval started for an item
    Started { item: ItemId, finders: usize },
    /// One finder failed; retrieval continues with the rest
    FinderFailed {
        item: ItemId,
        finder: String,
        message: String,
    },
    /// Retrieval finished for an item
    Completed {
        item: ItemId,
        status: MatchStatus,
        matches: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_are_serializable() {
        let event = Event::Similarity(SimilarityEvent::Progress(RebuildProgress {
            processed: 10,
            total: 50,
        }));

        let json = serde_json::to_string(&event).unwrap();
        let deserialized: Event = serde_json::from_str(&json).unwrap();

        match deserialized {
            Event::Similarity(SimilarityEvent::Progress(p)) => {
                assert_eq!(p.processed, 10);
                assert_eq!(p.total, 50);
            }
            _ => panic!("Wrong event type"),
        }
    }

    #[test]
    fn import_status_event_is_serializable() {
        let event = Event::Import(ImportEvent::StatusChanged {
            job_id: Uuid::nil(),
            status: JobStatus::FailedDuplicate,
        });

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("FailedDuplicate"));
    }
}
