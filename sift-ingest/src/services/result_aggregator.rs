//! Submission state machine and outcome collection
//!
//! `Idle → Ingesting → Matching → Complete → Idle`
//!
//! There is no aborted state: once started, a submission always reaches
//! `Complete`. Outcomes are appended in settle order, which is unrelated to
//! batch order.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::preview_registry::PreviewRegistry;
use crate::error::{SessionError, ValidationError};
use crate::models::{
    FileReport, FileVerdict, MatchOutcome, OutcomeSummary, SubmissionState, SubmissionSummary,
};

/// State transition record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateTransition {
    pub old_state: SubmissionState,
    pub new_state: SubmissionState,
    pub transitioned_at: DateTime<Utc>,
}

fn is_allowed(from: SubmissionState, to: SubmissionState) -> bool {
    use SubmissionState::*;
    matches!(
        (from, to),
        (Idle, Ingesting) | (Ingesting, Matching) | (Matching, Complete) | (Complete, Idle)
    )
}

#[derive(Debug, Default)]
pub struct ResultAggregator {
    state: SubmissionState,
    outcomes: Vec<MatchOutcome>,
    running: SubmissionSummary,
    last_summary: Option<SubmissionSummary>,
}

impl ResultAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SubmissionState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        matches!(
            self.state,
            SubmissionState::Ingesting | SubmissionState::Matching
        )
    }

    fn transition_to(&mut self, new_state: SubmissionState) -> Result<StateTransition, SessionError> {
        if !is_allowed(self.state, new_state) {
            return Err(SessionError::InvalidTransition {
                from: self.state,
                to: new_state,
            });
        }

        let transition = StateTransition {
            old_state: self.state,
            new_state,
            transitioned_at: Utc::now(),
        };
        self.state = new_state;
        tracing::debug!(from = ?transition.old_state, to = ?new_state, "Submission state transition");
        Ok(transition)
    }

    /// `Complete → Idle`, discarding prior outcomes
    ///
    /// Returns `None` when there is nothing to reset.
    pub fn reset(&mut self) -> Option<StateTransition> {
        if self.state != SubmissionState::Complete {
            return None;
        }
        self.discard_all();
        self.transition_to(SubmissionState::Idle).ok()
    }

    /// Start a new submission of `submitted` files
    ///
    /// Resets a completed cycle first. Returns every transition taken.
    pub fn begin(&mut self, submitted: usize) -> Result<Vec<StateTransition>, SessionError> {
        if self.is_running() {
            return Err(SessionError::Conflict(
                "A submission is already in progress".to_string(),
            ));
        }

        let mut transitions = Vec::with_capacity(2);
        if let Some(reset) = self.reset() {
            transitions.push(reset);
        }
        transitions.push(self.transition_to(SubmissionState::Ingesting)?);

        self.running = SubmissionSummary {
            submitted,
            ..SubmissionSummary::default()
        };
        Ok(transitions)
    }

    /// Every per-file task has been started
    pub fn mark_dispatched(&mut self) -> Result<StateTransition, SessionError> {
        self.transition_to(SubmissionState::Matching)
    }

    /// Record one settled file
    ///
    /// `still_in_batch` is the dead-drop check: results for files removed
    /// mid-flight are counted as discarded and never displayed. Returns the
    /// new outcome, if one was created.
    pub fn record(
        &mut self,
        report: &FileReport,
        still_in_batch: bool,
        previews: &PreviewRegistry,
    ) -> Option<&MatchOutcome> {
        match &report.verdict {
            FileVerdict::UploadFailed(_) | FileVerdict::MatchFailed(_) => {
                self.running.failed += 1;
                None
            }
            _ if !still_in_batch => {
                tracing::debug!(file = %report.file.display_name, "Discarding result for file no longer in batch");
                self.running.discarded += 1;
                None
            }
            FileVerdict::Unmatched(_) => {
                self.running.unmatched += 1;
                None
            }
            FileVerdict::Matched(results) => {
                self.running.matched += 1;
                let preview =
                    previews.acquire(report.file.bytes.clone(), report.file.content_type.clone());
                self.outcomes.push(MatchOutcome {
                    file_id: report.file.id,
                    preview,
                    display_name: report.file.display_name.clone(),
                    criterion_results: results.clone(),
                    matched_at: Utc::now(),
                });
                self.outcomes.last()
            }
        }
    }

    /// Every dispatched task has settled
    pub fn complete(&mut self) -> Result<(StateTransition, SubmissionSummary), SessionError> {
        let transition = self.transition_to(SubmissionState::Complete)?;
        let summary = std::mem::take(&mut self.running);
        self.last_summary = Some(summary.clone());
        Ok((transition, summary))
    }

    /// Remove one outcome from the result view, releasing its preview
    pub fn discard(&mut self, index: usize) -> Result<OutcomeSummary, ValidationError> {
        if index >= self.outcomes.len() {
            return Err(ValidationError::IndexOutOfRange {
                index,
                len: self.outcomes.len(),
            });
        }
        let outcome = self.outcomes.remove(index);
        let summary = outcome.summary();
        outcome.preview.release();
        Ok(summary)
    }

    fn discard_all(&mut self) {
        for outcome in self.outcomes.drain(..) {
            outcome.preview.release();
        }
    }

    pub fn outcomes(&self) -> &[MatchOutcome] {
        &self.outcomes
    }

    pub fn last_summary(&self) -> Option<&SubmissionSummary> {
        self.last_summary.as_ref()
    }
}
