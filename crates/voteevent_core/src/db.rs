use crate::schema::{OrderKey, Relation, VoteEvent};
use crate::sql::{
    column_list, load_sql, relation_kind, table_ddl, validate_identifier, RelationKind,
};
use anyhow::{bail, Result};
use rusqlite::types::ValueRef;
use rusqlite::{params, Connection, Row};
use tracing::debug;

pub fn open(db_path: &str) -> Result<Connection> {
    let conn = Connection::open(db_path)?;
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    Ok(conn)
}

pub fn open_in_memory() -> Result<Connection> {
    Ok(Connection::open_in_memory()?)
}

/// Creates the source table if it is missing. Upstream owns the real schema;
/// this mirror declares no constraints so it can hold whatever upstream holds.
pub fn init_source(conn: &Connection, source: &str) -> Result<()> {
    conn.execute_batch(&table_ddl(source, false)?)?;
    Ok(())
}

pub fn insert_voteevent(conn: &Connection, table: &str, event: &VoteEvent) -> Result<()> {
    validate_identifier(table)?;
    conn.execute(
        &format!(
            "INSERT INTO {table} ({}) VALUES \
             (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
            column_list()
        ),
        params![
            event.id,
            event.identifier,
            event.created_at,
            event.updated_at,
            event.extras,
            event.motion_text,
            event.motion_classification,
            event.start_date,
            event.result,
            event.bill_id,
            event.bill_action_id,
            event.legislative_session_id,
            event.organization_id,
            event.order,
            event.dedupe_key
        ],
    )?;
    Ok(())
}

/// Reads every row of `source` in insertion order.
pub fn load_voteevents(conn: &Connection, source: &str) -> Result<Vec<VoteEvent>> {
    let mut stmt = conn.prepare(&load_sql(source)?)?;
    let rows = stmt
        .query_map([], row_to_voteevent)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    debug!(source, rows = rows.len(), "loaded vote events");
    Ok(rows)
}

/// Replaces the table `relation.name` with the relation's rows. With
/// `strict` the table declares the required columns `NOT NULL`.
///
/// The output may never be `source` itself, nor an existing view.
pub fn write_relation(
    conn: &Connection,
    relation: &Relation,
    source: &str,
    strict: bool,
) -> Result<()> {
    validate_identifier(&relation.name)?;
    if relation.name.eq_ignore_ascii_case(source) {
        bail!("output relation {} would replace its source", relation.name);
    }
    if relation_kind(conn, &relation.name)? == Some(RelationKind::View) {
        bail!("{} is a view, not a table", relation.name);
    }

    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(&format!("DROP TABLE IF EXISTS {}", relation.name))?;
    tx.execute_batch(&table_ddl(&relation.name, strict)?)?;
    for event in &relation.rows {
        insert_voteevent(&tx, &relation.name, event)?;
    }
    tx.commit()?;
    debug!(relation = %relation.name, rows = relation.len(), strict, "wrote relation");
    Ok(())
}

// Columns arrive as text from `load_sql`; `order` is at 13, its text form at 15.
fn row_to_voteevent(row: &Row<'_>) -> rusqlite::Result<VoteEvent> {
    let order = match row.get_ref(13)? {
        ValueRef::Null => None,
        ValueRef::Integer(value) => Some(OrderKey::Integer(value)),
        _ => row.get::<_, Option<String>>(15)?.map(OrderKey::Text),
    };
    Ok(VoteEvent {
        id: row.get(0)?,
        identifier: row.get(1)?,
        created_at: row.get(2)?,
        updated_at: row.get(3)?,
        extras: row.get(4)?,
        motion_text: row.get(5)?,
        motion_classification: row.get(6)?,
        start_date: row.get(7)?,
        result: row.get(8)?,
        bill_id: row.get(9)?,
        bill_action_id: row.get(10)?,
        legislative_session_id: row.get(11)?,
        organization_id: row.get(12)?,
        order,
        dedupe_key: row.get(14)?,
    })
}
