//! Revocable preview handles.
//!
//! A handle stands in for the decoded image so the UI can display it without
//! copying bytes again. Handles stay live until released.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PreviewHandle(u64);

impl PreviewHandle {
    pub fn id(self) -> u64 {
        self.0
    }
}

impl fmt::Display for PreviewHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "preview:{}", self.0)
    }
}

/// Bytes behind a live handle
#[derive(Debug, Clone)]
pub struct Preview {
    pub mime_type: String,
    pub bytes: Arc<[u8]>,
}

#[derive(Debug, Default)]
pub struct PreviewRegistry {
    next_id: AtomicU64,
    live: Mutex<HashMap<PreviewHandle, Preview>>,
}

impl PreviewRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&self, mime_type: impl Into<String>, bytes: Arc<[u8]>) -> PreviewHandle {
        let handle = PreviewHandle(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        self.live.lock().insert(
            handle,
            Preview {
                mime_type: mime_type.into(),
                bytes,
            },
        );
        debug!(%handle, "Issued preview handle");
        handle
    }

    pub fn resolve(&self, handle: PreviewHandle) -> Option<Preview> {
        self.live.lock().get(&handle).cloned()
    }

    /// Release a handle. Returns false if it was already released.
    pub fn release(&self, handle: PreviewHandle) -> bool {
        let released = self.live.lock().remove(&handle).is_some();
        if released {
            debug!(%handle, "Released preview handle");
        }
        released
    }

    pub fn live_count(&self) -> usize {
        self.live.lock().len()
    }
}
