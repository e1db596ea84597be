//! Pending Image Cache
//!
//! Keeps one image picked by a signed-out user across restarts so the upload
//! can resume after sign-in. The slot holds a base64 payload plus metadata,
//! expires after a fixed age, and refuses writes that would not fit its
//! capacity budget. Every read path treats an absent, expired or corrupt
//! record the same way: nothing is cached, and the bad record is removed.

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::clock::SharedClock;
use crate::config::ImageCacheConfig;
use crate::storage::{Storage, StorageWatcher, IMAGE_CACHE_KEY};
use crate::types::ImageFile;

pub mod presence;
pub mod preview;

pub use presence::{CachePresence, CacheStatus};
pub use preview::{Preview, PreviewHandle, PreviewRegistry};

const MILLIS_PER_HOUR: u64 = 60 * 60 * 1000;

/// Persisted slot record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedImage {
    /// Base64 payload
    pub data: String,
    pub filename: String,
    #[serde(rename = "type")]
    pub mime_type: String,
    /// Original byte length, before encoding
    #[serde(rename = "size")]
    pub size_bytes: u64,
    /// Milliseconds since the Unix epoch
    pub timestamp: u64,
    pub compressed: bool,
}

/// Metadata view of the slot; the payload field is skipped while parsing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedImageInfo {
    pub filename: String,
    #[serde(rename = "type")]
    pub mime_type: String,
    #[serde(rename = "size")]
    pub size_bytes: u64,
    pub timestamp: u64,
}

trait SlotEntry: DeserializeOwned {
    fn timestamp(&self) -> u64;
}

impl SlotEntry for CachedImage {
    fn timestamp(&self) -> u64 {
        self.timestamp
    }
}

impl SlotEntry for CachedImageInfo {
    fn timestamp(&self) -> u64 {
        self.timestamp
    }
}

/// A restored image and the preview handle minted for it
#[derive(Debug, Clone)]
pub struct LoadedImage {
    pub file: ImageFile,
    pub preview: PreviewHandle,
}

/// Capacity and expiry limits of the slot
#[derive(Debug, Clone, Copy)]
pub struct CachePolicy {
    pub capacity_bytes: u64,
    pub expiry_ms: u64,
    pub size_overhead_factor: f64,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self::from(&ImageCacheConfig::default())
    }
}

impl From<&ImageCacheConfig> for CachePolicy {
    fn from(config: &ImageCacheConfig) -> Self {
        Self {
            capacity_bytes: config.capacity_bytes,
            expiry_ms: config.expiry_hours * MILLIS_PER_HOUR,
            size_overhead_factor: config.size_overhead_factor,
        }
    }
}

#[derive(Clone)]
pub struct ImageCache {
    storage: Storage,
    clock: SharedClock,
    policy: CachePolicy,
    previews: Arc<PreviewRegistry>,
    current_preview: Arc<Mutex<Option<PreviewHandle>>>,
}

impl ImageCache {
    pub fn new(storage: Storage, clock: SharedClock, policy: CachePolicy) -> Self {
        Self {
            storage,
            clock,
            policy,
            previews: Arc::new(PreviewRegistry::new()),
            current_preview: Arc::new(Mutex::new(None)),
        }
    }

    pub fn policy(&self) -> CachePolicy {
        self.policy
    }

    pub fn previews(&self) -> &PreviewRegistry {
        &self.previews
    }

    /// Handle minted by the most recent `load()`, if not yet released
    pub fn current_preview(&self) -> Option<PreviewHandle> {
        *self.current_preview.lock()
    }

    /// Put an image into the slot, replacing any previous one.
    ///
    /// Returns `false` without touching the existing entry when the estimated
    /// encoded size does not fit the remaining capacity.
    pub fn store(&self, file: &ImageFile) -> bool {
        let estimated = file.size() as f64 * self.policy.size_overhead_factor;
        let available = self.available_space();
        if estimated > available as f64 {
            warn!(
                filename = %file.name,
                size = file.size(),
                estimated = estimated as u64,
                available,
                "Not enough space to cache image"
            );
            return false;
        }

        let record = CachedImage {
            data: BASE64.encode(&file.bytes),
            filename: file.name.clone(),
            mime_type: file.mime_type.clone(),
            size_bytes: file.size(),
            timestamp: self.clock.now_millis(),
            compressed: file.compressed,
        };
        let encoded = match serde_json::to_vec(&record) {
            Ok(encoded) => encoded,
            Err(e) => {
                warn!(error = %e, "Failed to encode image cache record");
                return false;
            }
        };
        if encoded.len() as u64 > self.policy.capacity_bytes {
            warn!(
                filename = %file.name,
                encoded = encoded.len(),
                capacity = self.policy.capacity_bytes,
                "Encoded image exceeds cache capacity"
            );
            return false;
        }

        if let Err(e) = self.storage.set_raw(IMAGE_CACHE_KEY, &encoded) {
            warn!(error = %e, "Failed to cache image");
            return false;
        }
        self.release_current_preview();
        info!(filename = %file.name, size = file.size(), "Image cached");
        true
    }

    /// Restore the cached image and mint a fresh preview handle for it.
    ///
    /// The previously minted handle, if any, is released.
    pub fn load(&self) -> Option<LoadedImage> {
        let record: CachedImage = self.read_entry()?;
        let bytes = match BASE64.decode(record.data.as_bytes()) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(error = %e, "Cached image payload is corrupt, clearing");
                self.clear();
                return None;
            }
        };

        let preview = self
            .previews
            .issue(record.mime_type.clone(), Arc::from(bytes.as_slice()));
        let previous = self.current_preview.lock().replace(preview);
        if let Some(previous) = previous {
            self.previews.release(previous);
        }

        info!(filename = %record.filename, "Retrieved cached image");
        Some(LoadedImage {
            file: ImageFile {
                name: record.filename,
                mime_type: record.mime_type,
                bytes,
                compressed: record.compressed,
            },
            preview,
        })
    }

    /// Remove the slot unconditionally
    pub fn clear(&self) {
        match self.storage.remove(IMAGE_CACHE_KEY) {
            Ok(true) => info!("Image cache cleared"),
            Ok(false) => debug!("Image cache already empty"),
            Err(e) => warn!(error = %e, "Failed to clear image cache"),
        }
        self.release_current_preview();
    }

    pub fn has_valid(&self) -> bool {
        self.read_entry::<CachedImageInfo>().is_some()
    }

    /// Slot metadata without decoding the payload
    pub fn info(&self) -> Option<CachedImageInfo> {
        self.read_entry()
    }

    /// Original size of the cached image, 0 when nothing is cached
    pub fn cache_size(&self) -> u64 {
        self.info().map(|i| i.size_bytes).unwrap_or(0)
    }

    /// Age of the cached image in hours
    pub fn cache_age_hours(&self) -> Option<f64> {
        let info = self.info()?;
        let age_ms = self.clock.now_millis().saturating_sub(info.timestamp);
        Some(age_ms as f64 / MILLIS_PER_HOUR as f64)
    }

    /// Explicitly release a preview handle once the UI no longer shows it
    pub fn release_preview(&self, handle: PreviewHandle) -> bool {
        let mut current = self.current_preview.lock();
        if *current == Some(handle) {
            *current = None;
        }
        drop(current);
        self.previews.release(handle)
    }

    /// Subscribe to slot changes made through any handle
    pub fn watch(&self) -> StorageWatcher {
        self.storage.watch(IMAGE_CACHE_KEY)
    }

    /// Bytes still free in the slot, counting the record currently stored
    pub fn available_space(&self) -> u64 {
        match self.storage.value_len(IMAGE_CACHE_KEY) {
            Ok(used) => self.policy.capacity_bytes.saturating_sub(used as u64),
            Err(e) => {
                warn!(error = %e, "Failed to measure image cache usage");
                0
            }
        }
    }

    fn is_expired(&self, timestamp: u64) -> bool {
        self.clock.now_millis().saturating_sub(timestamp) > self.policy.expiry_ms
    }

    fn read_entry<T: SlotEntry>(&self) -> Option<T> {
        let entry = match self.storage.get_json::<T>(IMAGE_CACHE_KEY) {
            Ok(Some(entry)) => entry,
            Ok(None) => return None,
            Err(e) => {
                warn!(error = %e, "Cached image record unreadable, clearing");
                self.clear();
                return None;
            }
        };
        if self.is_expired(entry.timestamp()) {
            info!("Cached image expired, clearing");
            self.clear();
            return None;
        }
        Some(entry)
    }

    fn release_current_preview(&self) {
        if let Some(handle) = self.current_preview.lock().take() {
            self.previews.release(handle);
        }
    }
}
