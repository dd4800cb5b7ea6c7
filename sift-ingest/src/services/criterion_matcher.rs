//! Multi-criteria matching for one analyzed file
//!
//! All criterion queries for a file run concurrently and must all settle
//! before the decision is made. The decision itself ([`evaluate`]) is a pure
//! function of the complete result set:
//! - `required_count == 0`: the object must be absent
//! - `required_count > 0`: at least that many instances
//! - the file matches only if every criterion is satisfied

use futures::future::join_all;
use std::sync::Arc;
use thiserror::Error;

use super::analysis_client::{AnalysisPayload, AnalysisService, TransportError};
use crate::models::{Criterion, CriterionResult, FileSnapshot};

/// A criterion query failed; the whole file's match is void
#[derive(Debug, Error, Clone, PartialEq)]
#[error("query for '{label}' failed: {source}")]
pub struct MatchError {
    pub label: String,
    #[source]
    pub source: TransportError,
}

/// Complete per-file result
#[derive(Debug, Clone, PartialEq)]
pub struct MatchDecision {
    /// One result per criterion, in criteria order
    pub results: Vec<CriterionResult>,
    pub matched: bool,
}

/// AND over all criteria
///
/// `results` must be in the same order as `criteria`.
pub fn evaluate(criteria: &[Criterion], results: &[CriterionResult]) -> bool {
    criteria.len() == results.len()
        && criteria
            .iter()
            .zip(results)
            .all(|(criterion, result)| criterion.is_satisfied_by(result.found_count))
}

/// Runs criterion queries against the analysis service
#[derive(Clone)]
pub struct CriterionMatcher {
    service: Arc<dyn AnalysisService>,
}

impl CriterionMatcher {
    pub fn new(service: Arc<dyn AnalysisService>) -> Self {
        Self { service }
    }

    /// Query every criterion concurrently, then decide
    pub async fn match_file(
        &self,
        payload: &AnalysisPayload,
        file: &FileSnapshot,
        criteria: &[Criterion],
    ) -> Result<MatchDecision, MatchError> {
        let queries = criteria.iter().map(|criterion| async move {
            self.service
                .find_object(payload, &criterion.object_label, criterion.required_count)
                .await
                .map(|found_count| CriterionResult {
                    object_label: criterion.object_label.clone(),
                    found_count,
                })
                .map_err(|source| MatchError {
                    label: criterion.object_label.clone(),
                    source,
                })
        });

        // Wait for every query, even after a failure
        let settled = join_all(queries).await;

        let mut results = Vec::with_capacity(settled.len());
        for outcome in settled {
            match outcome {
                Ok(result) => results.push(result),
                Err(e) => {
                    tracing::warn!(
                        file = %file.display_name,
                        label = %e.label,
                        error = %e.source,
                        "Criterion query failed"
                    );
                    return Err(e);
                }
            }
        }

        let matched = evaluate(criteria, &results);
        tracing::debug!(
            file = %file.display_name,
            criteria = criteria.len(),
            matched,
            "Match decision"
        );

        Ok(MatchDecision { results, matched })
    }
}
