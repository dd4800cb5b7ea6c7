//! Per-file verdicts and match outcomes

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::criterion::CriterionResult;
use super::file_entry::FileSnapshot;
use crate::services::preview_registry::PreviewHandle;

/// A file that satisfied every active criterion
///
/// Carries its own preview, independent from the batch entry's preview.
#[derive(Debug)]
pub struct MatchOutcome {
    pub file_id: Uuid,
    pub preview: PreviewHandle,
    pub display_name: String,
    pub criterion_results: Vec<CriterionResult>,
    pub matched_at: DateTime<Utc>,
}

impl MatchOutcome {
    pub fn summary(&self) -> OutcomeSummary {
        OutcomeSummary {
            file_id: self.file_id,
            preview_id: self.preview.id(),
            display_name: self.display_name.clone(),
            criterion_results: self.criterion_results.clone(),
            matched_at: self.matched_at,
        }
    }
}

/// Read model for the result view
#[derive(Debug, Clone, Serialize)]
pub struct OutcomeSummary {
    pub file_id: Uuid,
    pub preview_id: Uuid,
    pub display_name: String,
    pub criterion_results: Vec<CriterionResult>,
    pub matched_at: DateTime<Utc>,
}

/// How one file's task settled
#[derive(Debug, Clone, PartialEq)]
pub enum FileVerdict {
    /// Every criterion satisfied
    Matched(Vec<CriterionResult>),
    /// All queries succeeded but at least one criterion is unmet
    Unmatched(Vec<CriterionResult>),
    /// Upload-and-analyze failed
    UploadFailed(String),
    /// A criterion query failed
    MatchFailed(String),
}

/// Settled result for one submitted file
#[derive(Debug, Clone)]
pub struct FileReport {
    pub file: FileSnapshot,
    pub verdict: FileVerdict,
}

/// Counts recorded when a submission completes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SubmissionSummary {
    pub submitted: usize,
    pub matched: usize,
    pub unmatched: usize,
    pub failed: usize,
    /// Settled results dropped because the file left the batch mid-flight
    pub discarded: usize,
}
