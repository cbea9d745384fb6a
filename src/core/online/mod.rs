//! # Online Module
//!
//! Aggregates candidate duplicates found by external services.
//!
//! Finders are plugins; the core only defines the contract they fulfil and
//! how their results are combined. A finder failure never aborts retrieval:
//! the remaining finders still run, partial matches are kept and the group
//! ends as `Failed`.

use crate::core::cancel::CancellationToken;
use crate::core::model::{Item, ItemId};
use crate::error::FinderError;
use crate::events::{Event, EventSender, MatchEvent};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};
use url::Url;

/// A candidate duplicate hosted somewhere online
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnlineMatch {
    thumbnail_url: Url,
    source_url: Url,
    image_url: Option<Url>,
}

impl OnlineMatch {
    pub fn new(thumbnail_url: Url, source_url: Url) -> Self {
        Self {
            thumbnail_url,
            source_url,
            image_url: None,
        }
    }

    /// Attach a link to the full-size image
    pub fn with_image_url(mut self, image_url: Url) -> Self {
        self.image_url = Some(image_url);
        self
    }

    pub fn thumbnail_url(&self) -> &Url {
        &self.thumbnail_url
    }

    /// The page the match was found on
    pub fn source_url(&self) -> &Url {
        &self.source_url
    }

    pub fn image_url(&self) -> Option<&Url> {
        self.image_url.as_ref()
    }
}

/// An external service that searches for copies of a file.
///
/// Implementations own their network and timeout policy.
pub trait DuplicateFinder: Send + Sync {
    /// Name used in logs and events
    fn name(&self) -> &str;

    /// Find matches for a local file
    fn matches_for(&self, file: &Path) -> Result<Vec<OnlineMatch>, FinderError>;
}

/// Where a match group is in its retrieval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchStatus {
    Waiting,
    Processing,
    /// At least one finder failed; matches may still be present
    Failed,
    Succeeded,
}

#[derive(Debug)]
struct MatchState {
    status: MatchStatus,
    matches: Vec<OnlineMatch>,
    errors: Vec<String>,
}

/// One library item and the matches found for it
#[derive(Debug)]
pub struct MatchGroup {
    item: Arc<Item>,
    state: Mutex<MatchState>,
}

impl MatchGroup {
    pub fn new(item: Arc<Item>) -> Self {
        Self {
            item,
            state: Mutex::new(MatchState {
                status: MatchStatus::Waiting,
                matches: Vec::new(),
                errors: Vec::new(),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, MatchState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn item(&self) -> &Arc<Item> {
        &self.item
    }

    pub fn status(&self) -> MatchStatus {
        self.state().status
    }

    /// Snapshot of the matches found so far
    pub fn matches(&self) -> Vec<OnlineMatch> {
        self.state().matches.clone()
    }

    /// Messages from finders that failed during the last retrieval
    pub fn errors(&self) -> Vec<String> {
        self.state().errors.clone()
    }

    /// Query every finder in order, accumulating their matches.
    ///
    /// Replaces the results of any earlier retrieval. Returns the final status.
    pub fn retrieve_matches(
        &self,
        finders: &[Arc<dyn DuplicateFinder>],
        events: &EventSender,
    ) -> MatchStatus {
        let id = self.item.id();
        {
            let mut state = self.state();
            state.status = MatchStatus::Processing;
            state.matches.clear();
            state.errors.clear();
        }
        events.send(Event::Match(MatchEvent::Started {
            item: id,
            finders: finders.len(),
        }));

        let status = match self.item.as_media() {
            Some(media) => self.query_finders(id, media.file(), finders, events),
            None => {
                let error = FinderError::Unsupported { item: id.0 };
                warn!("{}", error);
                self.state().errors.push(error.to_string());
                MatchStatus::Failed
            }
        };

        let matches = {
            let mut state = self.state();
            state.status = status;
            state.matches.len()
        };
        info!("Found {} online matches for item {} ({:?})", matches, id, status);
        events.send(Event::Match(MatchEvent::Completed {
            item: id,
            status,
            matches,
        }));
        status
    }

    fn query_finders(
        &self,
        id: ItemId,
        file: &Path,
        finders: &[Arc<dyn DuplicateFinder>],
        events: &EventSender,
    ) -> MatchStatus {
        let mut failed = false;

        for finder in finders {
            match finder.matches_for(file) {
                Ok(found) => {
                    debug!("{} returned {} matches for item {}", finder.name(), found.len(), id);
                    self.state().matches.extend(found);
                }
                Err(e) => {
                    warn!("{} failed for item {}: {}", finder.name(), id, e);
                    failed = true;
                    let message = e.to_string();
                    self.state().errors.push(message.clone());
                    events.send(Event::Match(MatchEvent::FinderFailed {
                        item: id,
                        finder: finder.name().to_string(),
                        message,
                    }));
                }
            }
        }

        if failed {
            MatchStatus::Failed
        } else {
            MatchStatus::Succeeded
        }
    }
}

/// Retrieve matches for each group in order.
///
/// Cancellation is checked between groups. Returns how many groups were processed.
pub fn retrieve_all(
    groups: &[Arc<MatchGroup>],
    finders: &[Arc<dyn DuplicateFinder>],
    cancel: &CancellationToken,
    events: &EventSender,
) -> usize {
    let mut processed = 0;
    for group in groups {
        if cancel.is_cancelled() {
            info!("Online match retrieval cancelled after {} groups", processed);
            break;
        }
        group.retrieve_matches(finders, events);
        processed += 1;
    }
    processed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{null_sender, EventChannel};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn url(path: &str) -> Url {
        Url::parse(&format!("https://example.com/{path}")).unwrap()
    }

    fn found(n: usize) -> Vec<OnlineMatch> {
        (0..n)
            .map(|i| OnlineMatch::new(url(&format!("thumb/{i}.jpg")), url(&format!("page/{i}"))))
            .collect()
    }

    struct FixedFinder {
        name: &'static str,
        count: usize,
        calls: AtomicUsize,
    }

    impl FixedFinder {
        fn new(name: &'static str, count: usize) -> Arc<Self> {
            Arc::new(Self {
                name,
                count,
                calls: AtomicUsize::new(0),
            })
        }
    }

    impl DuplicateFinder for FixedFinder {
        fn name(&self) -> &str {
            self.name
        }

        fn matches_for(&self, _file: &Path) -> Result<Vec<OnlineMatch>, FinderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(found(self.count))
        }
    }

    struct BrokenFinder;

    impl DuplicateFinder for BrokenFinder {
        fn name(&self) -> &str {
            "broken"
        }

        fn matches_for(&self, _file: &Path) -> Result<Vec<OnlineMatch>, FinderError> {
            Err(FinderError::MalformedResponse {
                finder: "broken".into(),
                reason: "unexpected HTML".into(),
            })
        }
    }

    fn media_group(id: u64) -> Arc<MatchGroup> {
        Arc::new(MatchGroup::new(Arc::new(Item::media(
            ItemId(id),
            format!("/photos/{id}.jpg"),
        ))))
    }

    #[test]
    fn new_group_is_waiting() {
        let group = media_group(1);
        assert_eq!(group.status(), MatchStatus::Waiting);
        assert!(group.matches().is_empty());
    }

    #[test]
    fn accumulates_matches_from_every_finder() {
        let group = media_group(1);
        let finders: Vec<Arc<dyn DuplicateFinder>> =
            vec![FixedFinder::new("a", 2), FixedFinder::new("b", 3)];

        let status = group.retrieve_matches(&finders, &null_sender());

        assert_eq!(status, MatchStatus::Succeeded);
        assert_eq!(group.status(), MatchStatus::Succeeded);
        assert_eq!(group.matches().len(), 5);
    }

    #[test]
    fn failure_keeps_partial_results_and_continues() {
        let group = media_group(1);
        let after = FixedFinder::new("after", 1);
        let finders: Vec<Arc<dyn DuplicateFinder>> = vec![
            FixedFinder::new("before", 2),
            Arc::new(BrokenFinder),
            after.clone(),
        ];
        let (sender, receiver) = EventChannel::new();

        let status = group.retrieve_matches(&finders, &sender);
        drop(sender);

        assert_eq!(status, MatchStatus::Failed);
        assert_eq!(group.matches().len(), 3);
        assert_eq!(after.calls.load(Ordering::SeqCst), 1);
        assert_eq!(group.errors().len(), 1);

        let failures: Vec<String> = receiver
            .iter()
            .filter_map(|event| match event {
                Event::Match(MatchEvent::FinderFailed { finder, .. }) => Some(finder),
                _ => None,
            })
            .collect();
        assert_eq!(failures, vec!["broken".to_string()]);
    }

    #[test]
    fn groups_are_unsupported() {
        let group = MatchGroup::new(Arc::new(Item::group(ItemId(1), "set")));
        let finder = FixedFinder::new("a", 1);
        let finders: Vec<Arc<dyn DuplicateFinder>> = vec![finder.clone()];

        assert_eq!(
            group.retrieve_matches(&finders, &null_sender()),
            MatchStatus::Failed
        );
        assert_eq!(finder.calls.load(Ordering::SeqCst), 0);
        assert!(group.errors()[0].contains("no file"));
    }

    #[test]
    fn retrying_replaces_previous_results() {
        let group = media_group(1);
        let finders: Vec<Arc<dyn DuplicateFinder>> = vec![FixedFinder::new("a", 2)];
        group.retrieve_matches(&finders, &null_sender());
        group.retrieve_matches(&finders, &null_sender());
        assert_eq!(group.matches().len(), 2);
    }

    #[test]
    fn retrieve_all_stops_when_cancelled() {
        let groups = vec![media_group(1), media_group(2)];
        let finders: Vec<Arc<dyn DuplicateFinder>> = vec![FixedFinder::new("a", 1)];

        let cancel = CancellationToken::new();
        assert_eq!(retrieve_all(&groups, &finders, &cancel, &null_sender()), 2);

        cancel.cancel();
        let fresh = vec![media_group(3)];
        assert_eq!(retrieve_all(&fresh, &finders, &cancel, &null_sender()), 0);
        assert_eq!(fresh[0].status(), MatchStatus::Waiting);
    }

    #[test]
    fn match_serializes_optional_image_url() {
        let m = OnlineMatch::new(url("t.jpg"), url("page")).with_image_url(url("full.jpg"));
        let json = serde_json::to_string(&m).unwrap();
        assert!(json.contains("full.jpg"));
        let back: OnlineMatch = serde_json::from_str(&json).unwrap();
        assert_eq!(back, m);
    }
}
