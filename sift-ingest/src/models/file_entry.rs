//! File entries held in the current batch

use bytes::Bytes;
use serde::Serialize;
use uuid::Uuid;

use crate::services::preview_registry::{PreviewHandle, PreviewRegistry};
use crate::services::archive_expander::ExpandedEntry;

/// One ingested image plus its preview
///
/// Owned by the batch until removed, cleared, or consumed by a submission.
#[derive(Debug)]
pub struct FileEntry {
    pub id: Uuid,
    pub bytes: Bytes,
    pub display_name: String,
    pub content_type: String,
    pub preview: PreviewHandle,
}

impl FileEntry {
    /// Materialize an expanded entry, acquiring its preview
    pub fn from_expanded(entry: ExpandedEntry, previews: &PreviewRegistry) -> Self {
        let preview = previews.acquire(entry.bytes.clone(), entry.content_type.clone());
        Self {
            id: Uuid::new_v4(),
            bytes: entry.bytes,
            display_name: entry.display_name,
            content_type: entry.content_type,
            preview,
        }
    }

    /// Copy of the uploadable content, without the preview
    pub fn snapshot(&self) -> FileSnapshot {
        FileSnapshot {
            id: self.id,
            bytes: self.bytes.clone(),
            display_name: self.display_name.clone(),
            content_type: self.content_type.clone(),
        }
    }

    pub fn summary(&self) -> FileSummary {
        FileSummary {
            id: self.id,
            display_name: self.display_name.clone(),
            content_type: self.content_type.clone(),
            size_bytes: self.bytes.len(),
            preview_id: self.preview.id(),
        }
    }
}

/// What an in-flight submission holds for one file
#[derive(Debug, Clone)]
pub struct FileSnapshot {
    pub id: Uuid,
    pub bytes: Bytes,
    pub display_name: String,
    pub content_type: String,
}

/// Read model for the presentation layer
#[derive(Debug, Clone, Serialize)]
pub struct FileSummary {
    pub id: Uuid,
    pub display_name: String,
    pub content_type: String,
    pub size_bytes: usize,
    pub preview_id: Uuid,
}
