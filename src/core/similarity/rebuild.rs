//! All-pairs rebuild of the cached `no_similar` flag.

use super::SimilarityConfig;
use crate::core::cancel::CancellationToken;
use crate::core::histogram::Histogram;
use crate::core::model::{Item, MediaItem};
use crate::events::{Event, EventSender, RebuildProgress, SimilarityEvent};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;
use tracing::{debug, info};

/// Summary of a rebuild pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RebuildOutcome {
    /// Subjects whose flag was written
    pub processed: usize,
    /// Media items with histograms at the start of the pass
    pub total: usize,
    /// Subjects left flagged as having no similar partner
    pub without_similar: usize,
    /// Whether the pass stopped early
    pub cancelled: bool,
}

/// Recomputes `no_similar` for every media item with a histogram
///
/// Each subject is compared against every other candidate. Candidates already
/// flagged `no_similar` are skipped as comparison targets (never as subjects),
/// so a flagged item cannot become another item's partner within a pass.
#[derive(Debug, Clone, Default)]
pub struct SimilarityRebuilder {
    config: SimilarityConfig,
}

struct Candidate<'a> {
    item: &'a Arc<Item>,
    media: &'a MediaItem,
    histogram: Arc<Histogram>,
}

impl SimilarityRebuilder {
    pub fn new(config: SimilarityConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SimilarityConfig {
        &self.config
    }

    /// Run a rebuild on the calling thread.
    ///
    /// `items` must not be structurally modified while this runs. Cancellation
    /// is checked between subjects; flags already written stay in place.
    pub fn rebuild(
        &self,
        items: &[Arc<Item>],
        cancel: &CancellationToken,
        events: &EventSender,
    ) -> RebuildOutcome {
        self.rebuild_observed(items, cancel, events, |_| {})
    }

    /// Rebuild, calling `after_subject` once each flag is written
    fn rebuild_observed(
        &self,
        items: &[Arc<Item>],
        cancel: &CancellationToken,
        events: &EventSender,
        mut after_subject: impl FnMut(&RebuildProgress),
    ) -> RebuildOutcome {
        let start = Instant::now();
        let candidates: Vec<Candidate<'_>> = items
            .iter()
            .filter_map(|item| {
                let media = item.as_media()?;
                let histogram = media.histogram()?;
                Some(Candidate {
                    item,
                    media,
                    histogram,
                })
            })
            .collect();

        let total = candidates.len();
        info!("Rebuilding similarity flags for {} items", total);
        events.send(Event::Similarity(SimilarityEvent::Started { total }));

        let mut processed = 0;
        let mut without_similar = 0;

        for subject in &candidates {
            if cancel.is_cancelled() {
                info!("Similarity rebuild cancelled after {}/{} items", processed, total);
                events.send(Event::Similarity(SimilarityEvent::Cancelled { processed }));
                return RebuildOutcome {
                    processed,
                    total,
                    without_similar,
                    cancelled: true,
                };
            }

            let has_similar = candidates.iter().any(|target| {
                target.item.id() != subject.item.id()
                    && !target.media.has_no_similar()
                    && self
                        .config
                        .is_similar(&subject.histogram, &target.histogram)
                        .is_some()
            });

            subject.media.set_no_similar(!has_similar);
            if !has_similar {
                without_similar += 1;
            }
            processed += 1;

            debug!(item = %subject.item.id(), has_similar, "similarity flag written");
            let progress = RebuildProgress { processed, total };
            after_subject(&progress);
            events.send(Event::Similarity(SimilarityEvent::Progress(progress)));
        }

        let duration_ms = start.elapsed().as_millis() as u64;
        info!(
            "Similarity rebuild finished: {} of {} items have no similar partner ({} ms)",
            without_similar, total, duration_ms
        );
        events.send(Event::Similarity(SimilarityEvent::Completed {
            processed,
            without_similar,
            duration_ms,
        }));

        RebuildOutcome {
            processed,
            total,
            without_similar,
            cancelled: false,
        }
    }

    /// Run a rebuild on a dedicated thread
    pub fn spawn(self, items: Vec<Arc<Item>>, events: EventSender) -> std::io::Result<RebuildHandle> {
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let thread = thread::Builder::new()
            .name("similarity-rebuild".to_string())
            .spawn(move || self.rebuild(&items, &token, &events))?;

        Ok(RebuildHandle { cancel, thread })
    }
}

/// Handle to a rebuild running on its own thread
pub struct RebuildHandle {
    cancel: CancellationToken,
    thread: JoinHandle<RebuildOutcome>,
}

impl RebuildHandle {
    /// Ask the rebuild to stop before its next subject
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Wait for the rebuild to finish
    pub fn join(self) -> thread::Result<RebuildOutcome> {
        self.thread.join()
    }
}
