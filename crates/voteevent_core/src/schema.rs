use rusqlite::types::{ToSql, ToSqlOutput};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Source relation the projector reads from.
pub const SOURCE_TABLE: &str = "opencivicdata_voteevent";

/// Column names of the vote event relation, in relation order.
pub const COLUMNS: [&str; 15] = [
    "id",
    "identifier",
    "created_at",
    "updated_at",
    "extras",
    "motion_text",
    "motion_classification",
    "start_date",
    "result",
    "bill_id",
    "bill_action_id",
    "legislative_session_id",
    "organization_id",
    "order",
    "dedupe_key",
];

/// Columns the strict projection asserts to be non-null.
pub const REQUIRED_COLUMNS: [Column; 3] = [Column::Id, Column::CreatedAt, Column::UpdatedAt];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Column {
    Id,
    Identifier,
    CreatedAt,
    UpdatedAt,
    Extras,
    MotionText,
    MotionClassification,
    StartDate,
    Result,
    BillId,
    BillActionId,
    LegislativeSessionId,
    OrganizationId,
    Order,
    DedupeKey,
}

impl Column {
    pub const ALL: [Column; 15] = [
        Column::Id,
        Column::Identifier,
        Column::CreatedAt,
        Column::UpdatedAt,
        Column::Extras,
        Column::MotionText,
        Column::MotionClassification,
        Column::StartDate,
        Column::Result,
        Column::BillId,
        Column::BillActionId,
        Column::LegislativeSessionId,
        Column::OrganizationId,
        Column::Order,
        Column::DedupeKey,
    ];

    pub fn as_str(&self) -> &'static str {
        COLUMNS[self.position()]
    }

    /// Zero-based position of the column within the relation.
    pub fn position(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Value of the `order` column. Integers stay integers; anything else the
/// store holds there is kept as SQLite's own text rendering of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum OrderKey {
    Integer(i64),
    Text(String),
}

impl fmt::Display for OrderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderKey::Integer(value) => write!(f, "{value}"),
            OrderKey::Text(value) => write!(f, "{value}"),
        }
    }
}

impl From<i64> for OrderKey {
    fn from(value: i64) -> Self {
        OrderKey::Integer(value)
    }
}

impl ToSql for OrderKey {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        match self {
            OrderKey::Integer(value) => value.to_sql(),
            OrderKey::Text(value) => value.to_sql(),
        }
    }
}

/// One row of `opencivicdata_voteevent`.
///
/// Every column is optional here: nullability of `id`, `created_at` and
/// `updated_at` is asserted by the strict projection, not by the type.
/// Values are carried as the store holds them and never reformatted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct VoteEvent {
    pub id: Option<String>,                     // opaque, e.g. "ocd-vote/..."
    pub identifier: Option<String>,
    pub created_at: Option<String>,             // timestamp text as stored
    pub updated_at: Option<String>,
    pub extras: Option<String>,                 // raw JSON text
    pub motion_text: Option<String>,
    pub motion_classification: Option<String>,
    pub start_date: Option<String>,
    pub result: Option<String>,
    pub bill_id: Option<String>,
    pub bill_action_id: Option<String>,
    pub legislative_session_id: Option<String>,
    pub organization_id: Option<String>,
    pub order: Option<OrderKey>,
    pub dedupe_key: Option<String>,
}

impl VoteEvent {
    pub fn is_null(&self, column: Column) -> bool {
        match column {
            Column::Id => self.id.is_none(),
            Column::Identifier => self.identifier.is_none(),
            Column::CreatedAt => self.created_at.is_none(),
            Column::UpdatedAt => self.updated_at.is_none(),
            Column::Extras => self.extras.is_none(),
            Column::MotionText => self.motion_text.is_none(),
            Column::MotionClassification => self.motion_classification.is_none(),
            Column::StartDate => self.start_date.is_none(),
            Column::Result => self.result.is_none(),
            Column::BillId => self.bill_id.is_none(),
            Column::BillActionId => self.bill_action_id.is_none(),
            Column::LegislativeSessionId => self.legislative_session_id.is_none(),
            Column::OrganizationId => self.organization_id.is_none(),
            Column::Order => self.order.is_none(),
            Column::DedupeKey => self.dedupe_key.is_none(),
        }
    }

    /// Text form of every column, in relation order. NULL maps to `None`.
    pub fn values(&self) -> [Option<String>; 15] {
        [
            self.id.clone(),
            self.identifier.clone(),
            self.created_at.clone(),
            self.updated_at.clone(),
            self.extras.clone(),
            self.motion_text.clone(),
            self.motion_classification.clone(),
            self.start_date.clone(),
            self.result.clone(),
            self.bill_id.clone(),
            self.bill_action_id.clone(),
            self.legislative_session_id.clone(),
            self.organization_id.clone(),
            self.order.as_ref().map(|value| value.to_string()),
            self.dedupe_key.clone(),
        ]
    }

    pub fn extras_json(&self) -> serde_json::Result<Option<serde_json::Value>> {
        self.extras
            .as_deref()
            .map(serde_json::from_str)
            .transpose()
    }
}

/// A named output relation: the columns and rows of a projection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Relation {
    pub name: String,
    pub columns: Vec<String>,
    pub rows: Vec<VoteEvent>,
}

impl Relation {
    pub fn new(name: impl Into<String>, rows: Vec<VoteEvent>) -> Self {
        Self {
            name: name.into(),
            columns: COLUMNS.iter().map(|column| column.to_string()).collect(),
            rows,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
