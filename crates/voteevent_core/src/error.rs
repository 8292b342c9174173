use crate::schema::Column;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// A row failed a required-column check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ConstraintViolation {
    pub row: usize,         // zero-based position in the source relation
    pub id: Option<String>, // row id, when the id itself is present
    pub column: Column,
}

impl fmt::Display for ConstraintViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.id {
            Some(id) => write!(f, "row {} (id {id}): {} is null", self.row, self.column),
            None => write!(f, "row {}: {} is null", self.row, self.column),
        }
    }
}

#[derive(Debug, Error)]
pub enum ProjectionError {
    #[error("constraint violation: {0}")]
    ConstraintViolation(ConstraintViolation),
    #[error("{}", summarize(.0))]
    ConstraintViolations(Vec<ConstraintViolation>),
}

fn summarize(violations: &[ConstraintViolation]) -> String {
    match violations.first() {
        Some(first) => format!("{} constraint violations, first: {first}", violations.len()),
        None => "no constraint violations recorded".to_string(),
    }
}

impl ProjectionError {
    pub fn violations(&self) -> &[ConstraintViolation] {
        match self {
            Self::ConstraintViolation(violation) => std::slice::from_ref(violation),
            Self::ConstraintViolations(violations) => violations,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collected_violations_display_first() {
        let violations = vec![
            ConstraintViolation {
                row: 2,
                id: None,
                column: Column::Id,
            },
            ConstraintViolation {
                row: 5,
                id: Some("ocd-vote/5".to_string()),
                column: Column::UpdatedAt,
            },
        ];
        let err = ProjectionError::ConstraintViolations(violations);
        assert_eq!(err.to_string(), "2 constraint violations, first: row 2: id is null");
    }

    #[test]
    fn empty_violation_list_still_displays() {
        let err = ProjectionError::ConstraintViolations(Vec::new());
        assert_eq!(err.to_string(), "no constraint violations recorded");
        assert!(err.violations().is_empty());
    }
}
