//! The current batch of file entries
//!
//! Every entry leaving the batch (removal, clear, consumption by a
//! submission) releases its preview here.

use std::collections::HashSet;
use uuid::Uuid;

use crate::error::ValidationError;
use crate::models::{FileEntry, FileSnapshot, FileSummary};

#[derive(Debug, Default)]
pub struct FileBatch {
    entries: Vec<FileEntry>,
}

impl FileBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extend(&mut self, entries: impl IntoIterator<Item = FileEntry>) {
        self.entries.extend(entries);
    }

    /// Remove one entry by position, releasing its preview
    pub fn remove(&mut self, index: usize) -> Result<FileSummary, ValidationError> {
        if index >= self.entries.len() {
            return Err(ValidationError::IndexOutOfRange {
                index,
                len: self.entries.len(),
            });
        }

        let entry = self.entries.remove(index);
        let summary = entry.summary();
        entry.preview.release();
        Ok(summary)
    }

    /// Remove every entry; returns how many were removed
    pub fn clear(&mut self) -> usize {
        let removed = self.entries.len();
        for entry in self.entries.drain(..) {
            entry.preview.release();
        }
        removed
    }

    /// Remove the entries a finished submission consumed
    ///
    /// Entries added after the submission started are kept.
    pub fn consume(&mut self, submitted: &HashSet<Uuid>) -> usize {
        let (consumed, kept): (Vec<_>, Vec<_>) = self
            .entries
            .drain(..)
            .partition(|entry| submitted.contains(&entry.id));
        self.entries = kept;

        let count = consumed.len();
        for entry in consumed {
            entry.preview.release();
        }
        count
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.entries.iter().any(|entry| entry.id == id)
    }

    pub fn snapshots(&self) -> Vec<FileSnapshot> {
        self.entries.iter().map(FileEntry::snapshot).collect()
    }

    pub fn summaries(&self) -> Vec<FileSummary> {
        self.entries.iter().map(FileEntry::summary).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
