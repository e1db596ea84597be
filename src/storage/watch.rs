//! Storage change notifications.
//!
//! Mirrors the browser `storage` event: a handle subscribes to a key prefix
//! and drains events to resynchronize state derived from those records.

use std::time::Duration;

use sled::{Event, Subscriber};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageEventKind {
    Set,
    Removed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageEvent {
    pub key: String,
    pub kind: StorageEventKind,
}

pub struct StorageWatcher {
    subscriber: Subscriber,
}

impl StorageWatcher {
    pub(crate) fn new(subscriber: Subscriber) -> Self {
        Self { subscriber }
    }

    /// Next pending event without blocking
    pub fn try_next(&mut self) -> Option<StorageEvent> {
        self.next_timeout(Duration::ZERO)
    }

    /// Wait up to `timeout` for the next event
    pub fn next_timeout(&mut self, timeout: Duration) -> Option<StorageEvent> {
        self.subscriber.next_timeout(timeout).ok().map(to_event)
    }

    /// Drain every event currently queued
    pub fn drain(&mut self) -> Vec<StorageEvent> {
        std::iter::from_fn(|| self.try_next()).collect()
    }
}

fn to_event(event: Event) -> StorageEvent {
    match event {
        Event::Insert { key, .. } => StorageEvent {
            key: String::from_utf8_lossy(&key).into_owned(),
            kind: StorageEventKind::Set,
        },
        Event::Remove { key } => StorageEvent {
            key: String::from_utf8_lossy(&key).into_owned(),
            kind: StorageEventKind::Removed,
        },
    }
}
