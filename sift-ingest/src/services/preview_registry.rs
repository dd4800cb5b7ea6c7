//! Ephemeral preview handles
//!
//! Every file entry and every match outcome owns exactly one [`PreviewHandle`].
//! The handle is not `Clone`; releasing it consumes it, and a handle that goes
//! out of scope releases its preview as well. A preview can therefore never be
//! released twice or read through a handle after release.

use bytes::Bytes;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

/// Preview content served to the presentation layer
#[derive(Debug, Clone)]
pub struct Preview {
    pub bytes: Bytes,
    pub content_type: String,
}

type PreviewMap = Mutex<HashMap<Uuid, Preview>>;

fn lock(map: &PreviewMap) -> MutexGuard<'_, HashMap<Uuid, Preview>> {
    // A panic while holding the lock leaves the map itself consistent
    map.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Registry of live previews
#[derive(Clone, Default)]
pub struct PreviewRegistry {
    previews: Arc<PreviewMap>,
}

impl PreviewRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a preview; the returned handle carries the release obligation
    pub fn acquire(&self, bytes: Bytes, content_type: impl Into<String>) -> PreviewHandle {
        let id = Uuid::new_v4();
        lock(&self.previews).insert(
            id,
            Preview {
                bytes,
                content_type: content_type.into(),
            },
        );
        tracing::trace!(preview_id = %id, "Preview acquired");

        PreviewHandle {
            id,
            previews: Arc::clone(&self.previews),
        }
    }

    /// Release a preview
    pub fn release(&self, handle: PreviewHandle) {
        handle.release();
    }

    /// Look up a live preview by id
    pub fn fetch(&self, id: Uuid) -> Option<Preview> {
        lock(&self.previews).get(&id).cloned()
    }

    /// Number of outstanding previews
    pub fn live_count(&self) -> usize {
        lock(&self.previews).len()
    }
}

/// Owned reference to one live preview
pub struct PreviewHandle {
    id: Uuid,
    previews: Arc<PreviewMap>,
}

impl PreviewHandle {
    /// Preview id, used in `/previews/:id` URLs
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Release the preview now
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for PreviewHandle {
    fn drop(&mut self) {
        if lock(&self.previews).remove(&self.id).is_some() {
            tracing::trace!(preview_id = %self.id, "Preview released");
        }
    }
}

impl fmt::Debug for PreviewHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreviewHandle").field("id", &self.id).finish()
    }
}
