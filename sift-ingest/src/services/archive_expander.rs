//! Archive expansion for dropped entries
//!
//! Flattens a heterogeneous drop into plain image entries:
//! - ZIP containers are opened and each non-directory entry becomes a plain
//!   entry named by its internal path; the container itself is discarded
//! - images pass through unchanged
//! - anything else is rejected and reported
//!
//! A corrupt container fails as a whole. Its siblings are unaffected.

use bytes::Bytes;
use std::io::{Cursor, Read};
use std::path::Path;
use thiserror::Error;
use zip::ZipArchive;

/// Content types treated as ZIP containers
const CONTAINER_TYPES: &[&str] = &[
    "application/zip",
    "application/x-zip-compressed",
    "application/x-zip",
];

/// Declared types that carry no information
const GENERIC_TYPES: &[&str] = &["", "application/octet-stream"];

/// Expansion errors, scoped to one dropped entry or one internal entry
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ExpansionError {
    #[error("Corrupt container: {0}")]
    CorruptContainer(String),

    #[error("Unsupported file type: {0}")]
    UnsupportedType(String),

    #[error("Entry too large: {size} bytes (limit {limit})")]
    TooLarge { size: u64, limit: u64 },
}

/// One dropped or selected item, before classification
#[derive(Debug, Clone)]
pub struct RawEntry {
    pub name: String,
    pub bytes: Bytes,
    /// Content type declared by the client, if any
    pub content_type: Option<String>,
}

impl RawEntry {
    pub fn new(name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
            content_type: None,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

/// An accepted plain image
#[derive(Debug, Clone, PartialEq)]
pub struct ExpandedEntry {
    pub display_name: String,
    pub bytes: Bytes,
    pub content_type: String,
}

/// A dropped item (or internal entry) that did not make it into the batch
#[derive(Debug, Clone, PartialEq)]
pub struct Rejection {
    pub name: String,
    pub error: ExpansionError,
}

impl Rejection {
    /// Whether a whole container failed, as opposed to a single entry
    pub fn is_container_failure(&self) -> bool {
        matches!(self.error, ExpansionError::CorruptContainer(_))
    }
}

/// Result of expanding one drop
#[derive(Debug, Default)]
pub struct ExpansionReport {
    /// Accepted entries, in drop order then container-enumeration order
    pub entries: Vec<ExpandedEntry>,
    pub rejected: Vec<Rejection>,
}

#[derive(Debug, PartialEq)]
enum EntryKind {
    Container,
    Image(String),
    Other(String),
}

/// ZIP-aware expander for dropped entries
#[derive(Debug, Clone)]
pub struct ArchiveExpander {
    max_entry_bytes: u64,
}

impl ArchiveExpander {
    pub fn new(max_entry_bytes: u64) -> Self {
        Self { max_entry_bytes }
    }

    /// Expand a drop into plain image entries
    pub fn expand(&self, raw_entries: Vec<RawEntry>) -> ExpansionReport {
        let mut report = ExpansionReport::default();

        for raw in raw_entries {
            match classify(&raw.name, raw.content_type.as_deref(), &raw.bytes) {
                EntryKind::Container => match self.expand_container(&raw, &mut report) {
                    Ok(count) => {
                        tracing::debug!(container = %raw.name, entries = count, "Container expanded");
                    }
                    Err(error) => {
                        tracing::warn!(container = %raw.name, error = %error, "Container expansion failed");
                        report.rejected.push(Rejection {
                            name: raw.name,
                            error,
                        });
                    }
                },
                EntryKind::Image(content_type) => {
                    let size = raw.bytes.len() as u64;
                    if size > self.max_entry_bytes {
                        report.rejected.push(Rejection {
                            name: raw.name,
                            error: ExpansionError::TooLarge {
                                size,
                                limit: self.max_entry_bytes,
                            },
                        });
                    } else {
                        report.entries.push(ExpandedEntry {
                            display_name: raw.name,
                            bytes: raw.bytes,
                            content_type,
                        });
                    }
                }
                EntryKind::Other(content_type) => {
                    tracing::debug!(file = %raw.name, content_type = %content_type, "Rejected entry");
                    report.rejected.push(Rejection {
                        name: raw.name,
                        error: ExpansionError::UnsupportedType(content_type),
                    });
                }
            }
        }

        report
    }

    /// Expand one container into `report`
    ///
    /// Entries are staged and only committed once the whole container has
    /// been read, so a corrupt container contributes nothing.
    fn expand_container(
        &self,
        raw: &RawEntry,
        report: &mut ExpansionReport,
    ) -> Result<usize, ExpansionError> {
        let mut archive = ZipArchive::new(Cursor::new(raw.bytes.clone()))
            .map_err(|e| ExpansionError::CorruptContainer(e.to_string()))?;

        let mut entries = Vec::new();
        let mut rejected = Vec::new();

        for index in 0..archive.len() {
            let mut file = archive
                .by_index(index)
                .map_err(|e| ExpansionError::CorruptContainer(e.to_string()))?;

            if file.is_dir() || file.name().ends_with('/') {
                continue;
            }

            let name = file.name().to_string();
            let limit = self.max_entry_bytes;
            if file.size() > limit {
                rejected.push(Rejection {
                    name,
                    error: ExpansionError::TooLarge {
                        size: file.size(),
                        limit,
                    },
                });
                continue;
            }

            let mut buffer = Vec::with_capacity(file.size() as usize);
            (&mut file)
                .take(limit + 1)
                .read_to_end(&mut buffer)
                .map_err(|e| ExpansionError::CorruptContainer(format!("{}: {}", name, e)))?;

            if buffer.len() as u64 > limit {
                rejected.push(Rejection {
                    name,
                    error: ExpansionError::TooLarge {
                        size: buffer.len() as u64,
                        limit,
                    },
                });
                continue;
            }

            match classify(&name, None, &buffer) {
                EntryKind::Image(content_type) => entries.push(ExpandedEntry {
                    display_name: name,
                    bytes: Bytes::from(buffer),
                    content_type,
                }),
                EntryKind::Container => rejected.push(Rejection {
                    name,
                    error: ExpansionError::UnsupportedType("nested container".to_string()),
                }),
                EntryKind::Other(content_type) => rejected.push(Rejection {
                    name,
                    error: ExpansionError::UnsupportedType(content_type),
                }),
            }
        }

        let count = entries.len();
        report.entries.extend(entries);
        report.rejected.extend(rejected);
        Ok(count)
    }
}

/// Classify by declared type, then magic bytes, then extension
fn classify(name: &str, declared: Option<&str>, bytes: &[u8]) -> EntryKind {
    let declared = declared
        .map(|t| t.trim().to_ascii_lowercase())
        .filter(|t| !GENERIC_TYPES.contains(&t.as_str()));

    let content_type = declared
        .or_else(|| infer::get(bytes).map(|kind| kind.mime_type().to_string()))
        .or_else(|| type_from_extension(name).map(str::to_string));

    match content_type {
        Some(t) if CONTAINER_TYPES.contains(&t.as_str()) => EntryKind::Container,
        Some(t) if t.starts_with("image/") => EntryKind::Image(t),
        Some(t) => EntryKind::Other(t),
        None => EntryKind::Other("unknown".to_string()),
    }
}

fn type_from_extension(name: &str) -> Option<&'static str> {
    let extension = Path::new(name).extension()?.to_str()?.to_ascii_lowercase();
    match extension.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "bmp" => Some("image/bmp"),
        "tif" | "tiff" => Some("image/tiff"),
        "zip" => Some("application/zip"),
        _ => None,
    }
}
