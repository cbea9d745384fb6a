//! Event channel built on crossbeam-channel.
//!
//! Senders never fail: the import worker, the rebuild thread and match
//! retrieval keep running whether or not anyone is listening.

use crossbeam_channel::{unbounded, Receiver, Sender};

use super::Event;

/// Cloneable handle that background work reports through
#[derive(Clone)]
pub struct EventSender {
    inner: Sender<Event>,
}

impl EventSender {
    /// Send an event. Discarded once the receiver is gone.
    pub fn send(&self, event: Event) {
        let _ = self.inner.send(event);
    }
}

/// Consumer side of an [`EventChannel`]
pub struct EventReceiver {
    inner: Receiver<Event>,
}

impl EventReceiver {
    /// Block until the next event, or `None` once every sender is dropped
    pub fn recv(&self) -> Option<Event> {
        self.inner.recv().ok()
    }

    /// Events in send order, ending when every sender is dropped
    pub fn iter(&self) -> impl Iterator<Item = Event> + '_ {
        self.inner.iter()
    }
}

/// Factory for sender/receiver pairs.
pub struct EventChannel;

impl EventChannel {
    /// Create an unbounded event channel
    pub fn new() -> (EventSender, EventReceiver) {
        let (sender, receiver) = unbounded();
        (
            EventSender { inner: sender },
            EventReceiver { inner: receiver },
        )
    }
}

/// A sender whose events go nowhere, for callers without a UI
pub fn null_sender() -> EventSender {
    let (sender, _receiver) = EventChannel::new();
    sender
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{ImportEvent, RebuildProgress, SimilarityEvent};
    use std::thread;

    fn paused(paused: bool) -> Event {
        Event::Import(ImportEvent::PausedChanged { paused })
    }

    #[test]
    fn events_cross_threads() {
        let (sender, receiver) = EventChannel::new();

        thread::spawn(move || {
            sender.send(Event::Similarity(SimilarityEvent::Progress(RebuildProgress {
                processed: 5,
                total: 25,
            })));
        })
        .join()
        .unwrap();

        match receiver.recv().unwrap() {
            Event::Similarity(SimilarityEvent::Progress(p)) => assert_eq!(p.total, 25),
            other => panic!("unexpected event {other:?}"),
        }
        assert!(receiver.recv().is_none());
    }

    #[test]
    fn iteration_keeps_order_and_ends_with_the_senders() {
        let (sender, receiver) = EventChannel::new();
        let clone = sender.clone();
        sender.send(paused(true));
        clone.send(paused(false));
        drop(sender);
        drop(clone);

        let flags: Vec<bool> = receiver
            .iter()
            .map(|event| match event {
                Event::Import(ImportEvent::PausedChanged { paused }) => paused,
                other => panic!("unexpected event {other:?}"),
            })
            .collect();
        assert_eq!(flags, vec![true, false]);
    }

    #[test]
    fn null_sender_swallows_events() {
        null_sender().send(paused(true));
    }
}
