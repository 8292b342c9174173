//! Row-level audit of the vote event relation.
//!
//! Produces one [`Check`] per finding. The audit never alters rows; it only
//! reports on them, so it can run against either projection variant.

use crate::projector::check_row;
use crate::schema::{VoteEvent, SOURCE_TABLE};
use anyhow::Result;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::json;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Warning,
    Important,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Check {
    pub collection: String,
    pub row: usize,
    pub id: Option<String>,
    pub tagname: String, // e.g. "missing-required-column"
    pub severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AuditReport {
    pub collection: String,
    pub generated_at: String, // RFC 3339
    pub row_count: usize,
    pub checks: Vec<Check>,
}

impl AuditReport {
    pub fn has_critical(&self) -> bool {
        self.checks
            .iter()
            .any(|check| check.severity == Severity::Critical)
    }
}

pub fn audit(rows: &[VoteEvent]) -> Result<AuditReport> {
    let mut checks = Vec::new();
    for (index, row) in rows.iter().enumerate() {
        checks.extend(check_voteevent(index, row));
    }
    Ok(AuditReport {
        collection: SOURCE_TABLE.to_string(),
        generated_at: OffsetDateTime::now_utc().format(&Rfc3339)?,
        row_count: rows.len(),
        checks,
    })
}

fn check_voteevent(index: usize, row: &VoteEvent) -> Vec<Check> {
    let check = |tagname: &str, severity: Severity, data: serde_json::Value| Check {
        collection: SOURCE_TABLE.to_string(),
        row: index,
        id: row.id.clone(),
        tagname: tagname.to_string(),
        severity,
        data: Some(data),
    };

    let mut checks: Vec<Check> = check_row(index, row)
        .into_iter()
        .map(|violation| {
            check(
                "missing-required-column",
                Severity::Critical,
                json!({ "column": violation.column }),
            )
        })
        .collect();

    let created = parse_timestamp(row.created_at.as_deref());
    let updated = parse_timestamp(row.updated_at.as_deref());

    for (column, raw, parsed) in [
        ("created_at", &row.created_at, &created),
        ("updated_at", &row.updated_at, &updated),
    ] {
        if let (Some(raw), None) = (raw, parsed) {
            checks.push(check(
                "unparseable-timestamp",
                Severity::Warning,
                json!({ "column": column, "value": raw }),
            ));
        }
    }

    if let (Some(created), Some(updated)) = (created, updated) {
        if updated < created {
            checks.push(check(
                "updated-before-created",
                Severity::Important,
                json!({
                    "created_at": row.created_at,
                    "updated_at": row.updated_at,
                }),
            ));
        }
    }

    checks
}

fn parse_timestamp(value: Option<&str>) -> Option<OffsetDateTime> {
    value.and_then(|raw| OffsetDateTime::parse(raw, &Rfc3339).ok())
}
