//! Search criteria and per-criterion results

use serde::{Deserialize, Serialize};

/// One (object label, required count) filter
///
/// `required_count == 0` means the object must be absent; any other value is
/// an at-least requirement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Criterion {
    pub object_label: String,
    pub required_count: u32,
}

impl Criterion {
    /// Whether `found_count` instances satisfy this criterion
    pub fn is_satisfied_by(&self, found_count: u32) -> bool {
        if self.required_count == 0 {
            found_count == 0
        } else {
            found_count >= self.required_count
        }
    }

    /// Labels compare case-insensitively
    pub fn same_label(&self, label: &str) -> bool {
        self.object_label.eq_ignore_ascii_case(label.trim())
    }
}

/// How many instances of a criterion's object were found in one file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriterionResult {
    pub object_label: String,
    pub found_count: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn criterion(label: &str, required_count: u32) -> Criterion {
        Criterion {
            object_label: label.to_string(),
            required_count,
        }
    }

    #[test]
    fn test_absence_requirement() {
        let dog = criterion("dog", 0);
        assert!(dog.is_satisfied_by(0));
        assert!(!dog.is_satisfied_by(1));
        assert!(!dog.is_satisfied_by(7));
    }

    #[test]
    fn test_at_least_requirement() {
        let cat = criterion("cat", 2);
        assert!(!cat.is_satisfied_by(0));
        assert!(!cat.is_satisfied_by(1));
        assert!(cat.is_satisfied_by(2));
        // at-least, not exact
        assert!(cat.is_satisfied_by(5));
    }

    #[test]
    fn test_same_label_ignores_case() {
        assert!(criterion("Cat", 1).same_label("cat"));
        assert!(criterion("cat", 1).same_label(" CAT "));
        assert!(!criterion("cat", 1).same_label("cats"));
    }
}
