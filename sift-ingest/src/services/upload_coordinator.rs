//! Batch fan-out: upload, analyze, match
//!
//! One task per file, all joined concurrently. Each task uploads its file and,
//! on success, runs the criterion matcher. A failure is confined to its own
//! file; there are no retries.

use futures::future::join_all;
use std::sync::Arc;

use super::analysis_client::AnalysisService;
use super::criterion_matcher::CriterionMatcher;
use crate::error::ValidationError;
use crate::models::{Criterion, FileReport, FileSnapshot, FileVerdict};

/// Receives progress from a running submission
///
/// Callbacks run on the submitting task and must not block.
pub trait SubmissionObserver: Send + Sync {
    /// Every per-file task has been created
    fn dispatched(&self, file_count: usize);

    /// One file's task settled
    fn settled(&self, report: &FileReport);
}

/// Observer that ignores everything
pub struct NoopObserver;

impl SubmissionObserver for NoopObserver {
    fn dispatched(&self, _file_count: usize) {}
    fn settled(&self, _report: &FileReport) {}
}

#[derive(Clone)]
pub struct UploadCoordinator {
    service: Arc<dyn AnalysisService>,
    matcher: CriterionMatcher,
}

impl UploadCoordinator {
    pub fn new(service: Arc<dyn AnalysisService>) -> Self {
        let matcher = CriterionMatcher::new(Arc::clone(&service));
        Self { service, matcher }
    }

    /// Preconditions checked before any network activity
    pub fn validate(files: &[FileSnapshot], criteria: &[Criterion]) -> Result<(), ValidationError> {
        if files.is_empty() {
            return Err(ValidationError::EmptyBatch);
        }
        if criteria.is_empty() {
            return Err(ValidationError::EmptyCriteria);
        }
        Ok(())
    }

    /// Validate, then process every file
    pub async fn submit_batch(
        &self,
        files: Vec<FileSnapshot>,
        criteria: Arc<[Criterion]>,
        observer: &dyn SubmissionObserver,
    ) -> Result<Vec<FileReport>, ValidationError> {
        Self::validate(&files, &criteria)?;
        Ok(self.dispatch(files, criteria, observer).await)
    }

    /// Process every file concurrently; resolves once all have settled
    ///
    /// Reports are returned in batch order. The observer sees them in
    /// settle order.
    pub async fn dispatch(
        &self,
        files: Vec<FileSnapshot>,
        criteria: Arc<[Criterion]>,
        observer: &dyn SubmissionObserver,
    ) -> Vec<FileReport> {
        let criteria: &[Criterion] = &criteria;
        let tasks: Vec<_> = files
            .into_iter()
            .map(|file| async move {
                let report = self.process_file(file, criteria).await;
                observer.settled(&report);
                report
            })
            .collect();

        tracing::info!(files = tasks.len(), criteria = criteria.len(), "Dispatching batch");
        observer.dispatched(tasks.len());

        join_all(tasks).await
    }

    async fn process_file(&self, file: FileSnapshot, criteria: &[Criterion]) -> FileReport {
        let verdict = match self.service.upload_and_analyze(&file).await {
            Err(e) => {
                tracing::warn!(file = %file.display_name, error = %e, "Upload failed");
                FileVerdict::UploadFailed(e.to_string())
            }
            Ok(payload) => match self.matcher.match_file(&payload, &file, criteria).await {
                Ok(decision) if decision.matched => FileVerdict::Matched(decision.results),
                Ok(decision) => FileVerdict::Unmatched(decision.results),
                Err(e) => FileVerdict::MatchFailed(e.to_string()),
            },
        };

        FileReport { file, verdict }
    }
}
