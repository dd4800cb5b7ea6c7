//! Search session: the explicit context object for one user's batch
//!
//! Owns the batch, the criteria set, the result aggregator and the preview
//! registry, and exposes the operations the presentation layer drives. State
//! sits behind a synchronous mutex that is never held across an await; a
//! submission works on snapshots of the batch and criteria taken when it
//! starts.

use chrono::Utc;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{info, warn};
use uuid::Uuid;

use sift_common::events::{EventBus, SiftEvent};

use crate::error::{SessionError, ValidationError};
use crate::models::{
    Criterion, FileEntry, FileReport, FileSnapshot, FileSummary, FileVerdict, OutcomeSummary,
    SubmissionState, SubmissionSummary,
};
use crate::services::{
    AnalysisService, ArchiveExpander, CriteriaSet, FileBatch, Preview, PreviewRegistry, RawEntry,
    Rejection, ResultAggregator, StateTransition, SubmissionObserver, UploadCoordinator,
};

#[derive(Debug, Default)]
struct SessionInner {
    batch: FileBatch,
    criteria: CriteriaSet,
    aggregator: ResultAggregator,
}

/// Outcome of adding a drop to the batch
#[derive(Debug)]
pub struct AddFilesReport {
    pub added: Vec<FileSummary>,
    pub rejected: Vec<Rejection>,
}

pub struct SearchSession {
    inner: Mutex<SessionInner>,
    coordinator: UploadCoordinator,
    expander: ArchiveExpander,
    previews: PreviewRegistry,
    event_bus: EventBus,
}

impl SearchSession {
    pub fn new(
        service: Arc<dyn AnalysisService>,
        event_bus: EventBus,
        max_entry_bytes: u64,
    ) -> Self {
        Self {
            inner: Mutex::new(SessionInner::default()),
            coordinator: UploadCoordinator::new(service),
            expander: ArchiveExpander::new(max_entry_bytes),
            previews: PreviewRegistry::new(),
            event_bus,
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit_transition(&self, transition: &StateTransition) {
        self.event_bus.emit_lossy(SiftEvent::SubmissionStateChanged {
            old_state: transition.old_state,
            new_state: transition.new_state,
            timestamp: transition.transitioned_at,
        });
    }

    /// Report a validation failure to the notifier and convert it
    fn rejected(&self, error: ValidationError) -> SessionError {
        self.event_bus.emit_lossy(SiftEvent::ValidationFailed {
            message: error.to_string(),
            timestamp: Utc::now(),
        });
        error.into()
    }

    // ------------------------------------------------------------------
    // Criteria
    // ------------------------------------------------------------------

    pub fn add_criterion(&self, label: &str, required_count: u32) -> Result<Criterion, SessionError> {
        let mut inner = self.lock();
        match inner.criteria.add(label, required_count) {
            Ok(criterion) => Ok(criterion.clone()),
            Err(e) => Err(self.rejected(e)),
        }
    }

    /// Add a criterion from raw form text (count still unparsed)
    pub fn add_criterion_text(&self, label: &str, count_text: &str) -> Result<Criterion, SessionError> {
        let mut inner = self.lock();
        match inner.criteria.add_parsed(label, count_text) {
            Ok(criterion) => Ok(criterion.clone()),
            Err(e) => Err(self.rejected(e)),
        }
    }

    pub fn remove_criterion(&self, index: usize) -> Result<Criterion, SessionError> {
        let mut inner = self.lock();
        inner.criteria.remove(index).map_err(|e| self.rejected(e))
    }

    pub fn criteria(&self) -> Vec<Criterion> {
        self.lock().criteria.as_slice().to_vec()
    }

    // ------------------------------------------------------------------
    // Batch
    // ------------------------------------------------------------------

    /// Expand and accept a drop
    ///
    /// A drop after a completed submission starts a new cycle: prior
    /// outcomes are discarded first.
    pub fn add_files(&self, raw_entries: Vec<RawEntry>) -> AddFilesReport {
        let report = self.expander.expand(raw_entries);

        for rejection in &report.rejected {
            let event = if rejection.is_container_failure() {
                SiftEvent::ContainerExpansionFailed {
                    container_name: rejection.name.clone(),
                    message: rejection.error.to_string(),
                    timestamp: Utc::now(),
                }
            } else {
                SiftEvent::FileRejected {
                    display_name: rejection.name.clone(),
                    reason: rejection.error.to_string(),
                    timestamp: Utc::now(),
                }
            };
            self.event_bus.emit_lossy(event);
        }

        let entries: Vec<FileEntry> = report
            .entries
            .into_iter()
            .map(|entry| FileEntry::from_expanded(entry, &self.previews))
            .collect();
        let added: Vec<FileSummary> = entries.iter().map(FileEntry::summary).collect();

        {
            let mut inner = self.lock();
            if let Some(transition) = inner.aggregator.reset() {
                self.emit_transition(&transition);
            }
            inner.batch.extend(entries);
        }

        if !added.is_empty() {
            info!(added = added.len(), rejected = report.rejected.len(), "Files added to batch");
            self.event_bus.emit_lossy(SiftEvent::FilesAdded {
                count: added.len(),
                timestamp: Utc::now(),
            });
        }

        AddFilesReport {
            added,
            rejected: report.rejected,
        }
    }

    pub fn remove_file(&self, index: usize) -> Result<FileSummary, SessionError> {
        let mut inner = self.lock();
        inner.batch.remove(index).map_err(|e| self.rejected(e))
    }

    /// Remove every file (the caller has confirmed)
    pub fn clear_all_files(&self) -> usize {
        let removed = self.lock().batch.clear();
        info!(removed, "Batch cleared");
        removed
    }

    pub fn files(&self) -> Vec<FileSummary> {
        self.lock().batch.summaries()
    }

    // ------------------------------------------------------------------
    // Results
    // ------------------------------------------------------------------

    pub fn state(&self) -> SubmissionState {
        self.lock().aggregator.state()
    }

    pub fn outcomes(&self) -> Vec<OutcomeSummary> {
        self.lock()
            .aggregator
            .outcomes()
            .iter()
            .map(|outcome| outcome.summary())
            .collect()
    }

    /// Remove one outcome from the result view
    pub fn discard_outcome(&self, index: usize) -> Result<OutcomeSummary, SessionError> {
        let mut inner = self.lock();
        inner.aggregator.discard(index).map_err(|e| self.rejected(e))
    }

    pub fn last_summary(&self) -> Option<SubmissionSummary> {
        self.lock().aggregator.last_summary().cloned()
    }

    pub fn preview(&self, id: Uuid) -> Option<Preview> {
        self.previews.fetch(id)
    }

    /// Outstanding preview handles (entries + displayed outcomes)
    pub fn live_previews(&self) -> usize {
        self.previews.live_count()
    }

    // ------------------------------------------------------------------
    // Submission
    // ------------------------------------------------------------------

    /// Upload, analyze and match the whole batch
    ///
    /// Resolves once every file has settled. The fan-out runs on its own
    /// task, so a started submission reaches `Complete` even if the caller
    /// stops waiting. The submitted entries are consumed from the batch when
    /// the submission completes.
    pub async fn submit(self: &Arc<Self>) -> Result<SubmissionSummary, SessionError> {
        let (files, criteria) = {
            let mut inner = self.lock();
            if inner.aggregator.is_running() {
                return Err(SessionError::Conflict(
                    "A submission is already in progress".to_string(),
                ));
            }

            let files = inner.batch.snapshots();
            let criteria = inner.criteria.snapshot();
            if let Err(e) = UploadCoordinator::validate(&files, &criteria) {
                return Err(self.rejected(e));
            }

            for transition in inner.aggregator.begin(files.len())? {
                self.emit_transition(&transition);
            }
            (files, criteria)
        };

        info!(
            files = files.len(),
            criteria = criteria.len(),
            "Submission started"
        );

        let session = Arc::clone(self);
        let handle = tokio::spawn(async move { session.run_submission(files, criteria).await });
        handle
            .await
            .map_err(|e| SessionError::TaskFailed(e.to_string()))?
    }

    /// Dispatch, then consume and complete
    async fn run_submission(
        &self,
        files: Vec<FileSnapshot>,
        criteria: Arc<[Criterion]>,
    ) -> Result<SubmissionSummary, SessionError> {
        let submitted: HashSet<Uuid> = files.iter().map(|file| file.id).collect();

        self.coordinator
            .dispatch(files, criteria, &SessionObserver { session: self })
            .await;

        let (transition, summary, consumed) = {
            let mut inner = self.lock();
            let consumed = inner.batch.consume(&submitted);
            let (transition, summary) = inner.aggregator.complete()?;
            (transition, summary, consumed)
        };

        self.emit_transition(&transition);
        self.event_bus.emit_lossy(SiftEvent::SubmissionCompleted {
            submitted: summary.submitted,
            matched: summary.matched,
            unmatched: summary.unmatched,
            failed: summary.failed,
            discarded: summary.discarded,
            timestamp: Utc::now(),
        });

        info!(
            matched = summary.matched,
            unmatched = summary.unmatched,
            failed = summary.failed,
            discarded = summary.discarded,
            consumed,
            "Submission complete"
        );
        Ok(summary)
    }
}

/// Routes coordinator progress into the session
struct SessionObserver<'a> {
    session: &'a SearchSession,
}

impl SubmissionObserver for SessionObserver<'_> {
    fn dispatched(&self, file_count: usize) {
        let mut inner = self.session.lock();
        match inner.aggregator.mark_dispatched() {
            Ok(transition) => self.session.emit_transition(&transition),
            Err(e) => warn!(error = %e, file_count, "Unexpected dispatch transition"),
        }
    }

    fn settled(&self, report: &FileReport) {
        let session = self.session;
        let display_name = report.file.display_name.clone();

        match &report.verdict {
            FileVerdict::UploadFailed(message) => session.event_bus.emit_lossy(SiftEvent::UploadFailed {
                display_name,
                message: message.clone(),
                timestamp: Utc::now(),
            }),
            FileVerdict::MatchFailed(message) => session.event_bus.emit_lossy(SiftEvent::MatchFailed {
                display_name,
                message: message.clone(),
                timestamp: Utc::now(),
            }),
            FileVerdict::Matched(_) | FileVerdict::Unmatched(_) => {}
        }

        let mut guard = session.lock();
        let inner = &mut *guard;
        let still_in_batch = inner.batch.contains(report.file.id);
        if let Some(outcome) = inner.aggregator.record(report, still_in_batch, &session.previews) {
            session.event_bus.emit_lossy(SiftEvent::MatchFound {
                file_id: outcome.file_id,
                display_name: outcome.display_name.clone(),
                timestamp: outcome.matched_at,
            });
        }
    }
}
