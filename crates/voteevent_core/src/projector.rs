use crate::error::{ConstraintViolation, ProjectionError};
use crate::schema::{Relation, VoteEvent, REQUIRED_COLUMNS};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

pub const DEFAULT_OUTPUT_NAME: &str = "voteevent";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationMode {
    /// Stop at the first violated column.
    #[default]
    FailFast,
    /// Scan every row, then fail with all violations.
    CollectAll,
}

#[derive(Debug, Clone)]
pub struct VoteEventProjector {
    pub output_name: String,
    pub strict: bool,
    pub on_violation: ViolationMode,
}

impl Default for VoteEventProjector {
    fn default() -> Self {
        Self {
            output_name: DEFAULT_OUTPUT_NAME.to_string(),
            strict: false,
            on_violation: ViolationMode::FailFast,
        }
    }
}

impl VoteEventProjector {
    pub fn strict() -> Self {
        Self {
            strict: true,
            ..Self::default()
        }
    }

    pub fn with_output_name(mut self, name: impl Into<String>) -> Self {
        self.output_name = name.into();
        self
    }

    pub fn with_violation_mode(mut self, mode: ViolationMode) -> Self {
        self.on_violation = mode;
        self
    }

    /// Re-emits `source` unchanged as a named relation. In strict mode every
    /// row must carry `id`, `created_at` and `updated_at`.
    pub fn project<I>(&self, source: I) -> Result<Relation, ProjectionError>
    where
        I: IntoIterator<Item = VoteEvent>,
    {
        let mut rows = Vec::new();
        let mut violations = Vec::new();

        for (index, row) in source.into_iter().enumerate() {
            if self.strict {
                for violation in check_row(index, &row) {
                    warn!(%violation, "required column is null");
                    if self.on_violation == ViolationMode::FailFast {
                        return Err(ProjectionError::ConstraintViolation(violation));
                    }
                    violations.push(violation);
                }
            }
            rows.push(row);
        }

        if !violations.is_empty() {
            return Err(ProjectionError::ConstraintViolations(violations));
        }

        info!(
            relation = %self.output_name,
            rows = rows.len(),
            strict = self.strict,
            "projected vote events"
        );
        Ok(Relation::new(self.output_name.clone(), rows))
    }
}

/// Required-column violations of one row, in column order.
pub fn check_row(index: usize, row: &VoteEvent) -> Vec<ConstraintViolation> {
    REQUIRED_COLUMNS
        .iter()
        .filter(|column| row.is_null(**column))
        .map(|column| ConstraintViolation {
            row: index,
            id: row.id.clone(),
            column: *column,
        })
        .collect()
}
