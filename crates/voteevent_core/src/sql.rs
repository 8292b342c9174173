use crate::schema::{Column, REQUIRED_COLUMNS};
use anyhow::{bail, Result};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

/// Accepts plain SQL identifiers only: ASCII letters, digits and `_`, not
/// starting with a digit. Table and view names are spliced into statements.
pub fn validate_identifier(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };
    if !valid {
        bail!("invalid relation name: {name:?}");
    }
    Ok(())
}

fn quoted(column: Column) -> String {
    // `order` is a keyword
    format!("\"{}\"", column.as_str())
}

fn column_type(column: Column) -> &'static str {
    match column {
        Column::Order => "INTEGER",
        _ => "TEXT",
    }
}

pub fn column_list() -> String {
    Column::ALL
        .iter()
        .map(|column| quoted(*column))
        .collect::<Vec<_>>()
        .join(", ")
}

/// The pass-through query: every column, unchanged.
pub fn select_sql(source: &str) -> Result<String> {
    validate_identifier(source)?;
    Ok(format!("SELECT {} FROM {source}", column_list()))
}

/// Query used to load rows: every TEXT column goes through SQLite's own
/// text conversion, and `order` is selected both raw and as text (index 15).
pub fn load_sql(source: &str) -> Result<String> {
    validate_identifier(source)?;
    let columns = Column::ALL
        .iter()
        .map(|column| match column {
            Column::Order => quoted(*column),
            _ => format!("CAST({} AS TEXT)", quoted(*column)),
        })
        .collect::<Vec<_>>()
        .join(", ");
    Ok(format!(
        "SELECT {columns}, CAST({order} AS TEXT) FROM {source} ORDER BY rowid",
        order = quoted(Column::Order)
    ))
}

pub fn view_sql(name: &str, source: &str) -> Result<String> {
    validate_identifier(name)?;
    Ok(format!(
        "CREATE VIEW IF NOT EXISTS {name} AS {}",
        select_sql(source)?
    ))
}

/// DDL for a table holding the vote event columns. With `strict` the
/// required columns are declared `NOT NULL`.
pub fn table_ddl(name: &str, strict: bool) -> Result<String> {
    validate_identifier(name)?;
    let columns = Column::ALL
        .iter()
        .map(|column| {
            let not_null = strict && REQUIRED_COLUMNS.contains(column);
            format!(
                "  {} {}{}",
                quoted(*column),
                column_type(*column),
                if not_null { " NOT NULL" } else { "" }
            )
        })
        .collect::<Vec<_>>()
        .join(",\n");
    Ok(format!("CREATE TABLE IF NOT EXISTS {name} (\n{columns}\n)"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    Table,
    View,
}

/// Whether `name` is a table, a view, or absent. SQLite names are
/// case-insensitive.
pub fn relation_kind(conn: &Connection, name: &str) -> Result<Option<RelationKind>> {
    let kind: Option<String> = conn
        .query_row(
            "SELECT type FROM sqlite_master \
             WHERE type IN ('table', 'view') AND name = ?1 COLLATE NOCASE",
            params![name],
            |row| row.get(0),
        )
        .optional()?;
    Ok(match kind.as_deref() {
        Some("table") => Some(RelationKind::Table),
        Some("view") => Some(RelationKind::View),
        _ => None,
    })
}

/// Creates the pass-through view. Returns `false` when the view already
/// exists; fails when `name` is taken by a table.
pub fn create_view(conn: &Connection, name: &str, source: &str) -> Result<bool> {
    let sql = view_sql(name, source)?;
    match relation_kind(conn, name)? {
        Some(RelationKind::View) => return Ok(false),
        Some(RelationKind::Table) => bail!("{name} is a table, not a view"),
        None => {}
    }
    debug!(%sql, "creating view");
    conn.execute_batch(&sql)?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers_are_checked() {
        assert!(validate_identifier("opencivicdata_voteevent").is_ok());
        assert!(validate_identifier("_v2").is_ok());
        assert!(validate_identifier("").is_err());
        assert!(validate_identifier("2fast").is_err());
        assert!(validate_identifier("t; DROP TABLE x").is_err());
        assert!(validate_identifier("a-b").is_err());
    }

    #[test]
    fn select_lists_every_column_in_order() {
        let sql = select_sql("opencivicdata_voteevent").unwrap();
        assert_eq!(
            sql,
            "SELECT \"id\", \"identifier\", \"created_at\", \"updated_at\", \"extras\", \
             \"motion_text\", \"motion_classification\", \"start_date\", \"result\", \
             \"bill_id\", \"bill_action_id\", \"legislative_session_id\", \
             \"organization_id\", \"order\", \"dedupe_key\" FROM opencivicdata_voteevent"
        );
    }

    #[test]
    fn strict_ddl_differs_only_in_not_null() {
        let relaxed = table_ddl("voteevent", false).unwrap();
        let strict = table_ddl("voteevent", true).unwrap();
        assert!(!relaxed.contains("NOT NULL"));
        assert_eq!(strict.matches("NOT NULL").count(), 3);
        assert!(strict.contains("\"id\" TEXT NOT NULL"));
        assert!(strict.contains("\"created_at\" TEXT NOT NULL"));
        assert!(strict.contains("\"updated_at\" TEXT NOT NULL"));
        assert_eq!(strict.replace(" NOT NULL", ""), relaxed);
    }

    #[test]
    fn view_reads_through_to_source() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(&table_ddl("opencivicdata_voteevent", false).unwrap())
            .unwrap();
        conn.execute(
            "INSERT INTO opencivicdata_voteevent (id, \"order\") VALUES ('v1', 2)",
            [],
        )
        .unwrap();
        assert!(create_view(&conn, "voteevent", "opencivicdata_voteevent").unwrap());
        assert!(!create_view(&conn, "voteevent", "opencivicdata_voteevent").unwrap());
        assert_eq!(
            relation_kind(&conn, "VoteEvent").unwrap(),
            Some(RelationKind::View)
        );
        let (id, order): (String, i64) = conn
            .query_row("SELECT id, \"order\" FROM voteevent", [], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })
            .unwrap();
        assert_eq!(id, "v1");
        assert_eq!(order, 2);
    }

    #[test]
    fn view_is_not_created_over_a_table() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(&table_ddl("voteevent", false).unwrap())
            .unwrap();
        let err = create_view(&conn, "voteevent", "opencivicdata_voteevent").unwrap_err();
        assert_eq!(err.to_string(), "voteevent is a table, not a view");
        assert_eq!(
            relation_kind(&conn, "voteevent").unwrap(),
            Some(RelationKind::Table)
        );
    }

    #[test]
    fn load_sql_casts_text_columns() {
        let sql = load_sql("opencivicdata_voteevent").unwrap();
        assert!(sql.starts_with("SELECT CAST(\"id\" AS TEXT), "));
        assert!(sql.contains(", \"order\", "));
        assert!(sql.ends_with(
            ", CAST(\"order\" AS TEXT) FROM opencivicdata_voteevent ORDER BY rowid"
        ));
        assert!(load_sql("bad name").is_err());
    }
}
