//! Data models for the ingest pipeline

pub mod criterion;
pub mod file_entry;
pub mod outcome;

pub use criterion::{Criterion, CriterionResult};
pub use file_entry::{FileEntry, FileSnapshot, FileSummary};
pub use outcome::{FileReport, FileVerdict, MatchOutcome, OutcomeSummary, SubmissionSummary};
pub use sift_common::events::SubmissionState;
