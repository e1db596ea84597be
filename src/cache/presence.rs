//! Observable cache presence.
//!
//! Tracks whether a valid image sits in the slot, updating after local
//! mutations and when another handle changes the slot.

use std::time::Duration;

use tracing::debug;

use super::{CachedImageInfo, ImageCache, LoadedImage};
use crate::storage::StorageWatcher;
use crate::types::ImageFile;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStatus {
    pub has_cached: bool,
    pub info: Option<CachedImageInfo>,
}

pub struct CachePresence {
    cache: ImageCache,
    watcher: StorageWatcher,
    status: CacheStatus,
}

impl CachePresence {
    pub fn new(cache: ImageCache) -> Self {
        let watcher = cache.watch();
        let mut presence = Self {
            cache,
            watcher,
            status: CacheStatus::default(),
        };
        presence.refresh();
        presence
    }

    pub fn status(&self) -> &CacheStatus {
        &self.status
    }

    pub fn cache(&self) -> &ImageCache {
        &self.cache
    }

    /// Re-read the slot. Returns whether the status changed.
    pub fn refresh(&mut self) -> bool {
        let info = self.cache.info();
        let next = CacheStatus {
            has_cached: info.is_some(),
            info,
        };
        let changed = next != self.status;
        self.status = next;
        changed
    }

    /// Apply pending change notifications without blocking
    pub fn poll(&mut self) -> bool {
        let events = self.watcher.drain();
        if events.is_empty() {
            return false;
        }
        debug!(events = events.len(), "Image cache changed elsewhere");
        self.refresh()
    }

    /// Wait up to `timeout` for a change notification, then apply it
    pub fn poll_timeout(&mut self, timeout: Duration) -> bool {
        match self.watcher.next_timeout(timeout) {
            Some(_) => {
                self.watcher.drain();
                self.refresh()
            }
            None => false,
        }
    }

    pub fn store(&mut self, file: &ImageFile) -> bool {
        let stored = self.cache.store(file);
        self.refresh();
        stored
    }

    pub fn load(&mut self) -> Option<LoadedImage> {
        let loaded = self.cache.load();
        self.refresh();
        loaded
    }

    pub fn clear(&mut self) {
        self.cache.clear();
        self.refresh();
    }
}
