//! Active search criteria
//!
//! Ordered, unique by label (case-insensitive). Criteria are only ever added
//! or removed, never edited in place. Submissions take a [`CriteriaSet::snapshot`]
//! so later edits cannot leak into in-flight matches.

use std::sync::Arc;

use crate::error::ValidationError;
use crate::models::Criterion;

/// Parse a user-entered count
pub fn parse_count(text: &str) -> Result<u32, ValidationError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::MissingField);
    }

    let value: i64 = trimmed
        .parse()
        .map_err(|_| ValidationError::InvalidCount(trimmed.to_string()))?;

    if value < 0 {
        return Err(ValidationError::NegativeCount(value));
    }

    u32::try_from(value).map_err(|_| ValidationError::InvalidCount(trimmed.to_string()))
}

#[derive(Debug, Clone, Default)]
pub struct CriteriaSet {
    criteria: Vec<Criterion>,
}

impl CriteriaSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a criterion
    pub fn add(&mut self, label: &str, required_count: u32) -> Result<&Criterion, ValidationError> {
        let label = label.trim();
        if label.is_empty() {
            return Err(ValidationError::EmptyLabel);
        }

        if self.criteria.iter().any(|c| c.same_label(label)) {
            return Err(ValidationError::DuplicateLabel(label.to_string()));
        }

        self.criteria.push(Criterion {
            object_label: label.to_string(),
            required_count,
        });
        tracing::debug!(label, required_count, "Criterion added");

        Ok(&self.criteria[self.criteria.len() - 1])
    }

    /// Append a criterion from raw form input
    pub fn add_parsed(&mut self, label: &str, count_text: &str) -> Result<&Criterion, ValidationError> {
        if label.trim().is_empty() || count_text.trim().is_empty() {
            return Err(ValidationError::MissingField);
        }
        let required_count = parse_count(count_text)?;
        self.add(label, required_count)
    }

    pub fn remove(&mut self, index: usize) -> Result<Criterion, ValidationError> {
        if index >= self.criteria.len() {
            return Err(ValidationError::IndexOutOfRange {
                index,
                len: self.criteria.len(),
            });
        }
        let removed = self.criteria.remove(index);
        tracing::debug!(label = %removed.object_label, "Criterion removed");
        Ok(removed)
    }

    /// Immutable copy for an in-flight submission
    pub fn snapshot(&self) -> Arc<[Criterion]> {
        Arc::from(self.criteria.as_slice())
    }

    pub fn as_slice(&self) -> &[Criterion] {
        &self.criteria
    }

    pub fn len(&self) -> usize {
        self.criteria.len()
    }

    pub fn is_empty(&self) -> bool {
        self.criteria.is_empty()
    }
}
