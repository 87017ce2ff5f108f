//! Schema reconciliation on the session's own connection.
//!
//! Column presence is established by trial reads: `SELECT col FROM table
//! LIMIT 1` succeeds or fails with "no such column". Names are backquoted
//! because SQLite reads an unknown double-quoted identifier as a string
//! literal.

use crate::adapters::sql::{
    ColumnInventory, Dialect, FailureKind, KeySpec, SqlConnection, TABLES, TableSpec, add_missing_columns,
    apply_pending, create_indexes, create_tables,
};
use diesel::result::QueryResult;
use diesel::sqlite::SqliteConnection;

fn key_column(spec: &TableSpec) -> Option<&'static str> {
    match spec.key {
        KeySpec::TaskKey => Some(Dialect::Sqlite.task_key()),
        KeySpec::Serial => Some("id"),
        KeySpec::Text(name) => Some(name),
        KeySpec::Constraint => None,
    }
}

/// Returns `true` when a trial read of `column` succeeds.
pub(super) fn column_exists(conn: &mut SqliteConnection, table: &str, column: &str) -> QueryResult<bool> {
    match conn.execute_script(&format!("SELECT `{column}` FROM `{table}` LIMIT 1")) {
        Ok(()) => Ok(true),
        Err(err) if Dialect::Sqlite.classify(&err) == FailureKind::SchemaDrift => Ok(false),
        Err(err) => Err(err),
    }
}

pub(super) fn read_inventory(conn: &mut SqliteConnection) -> QueryResult<ColumnInventory> {
    let mut present = Vec::new();
    for spec in &TABLES {
        let physical = spec.physical(Dialect::Sqlite);
        let names = key_column(spec)
            .into_iter()
            .chain(spec.columns.iter().map(|column| column.name));
        for name in names {
            if column_exists(conn, physical, name)? {
                present.push((physical.to_owned(), name.to_owned()));
            }
        }
    }
    Ok(ColumnInventory::from_pairs(present))
}

/// Creates, patches, indexes and migrates; returns the schema version.
pub(super) fn reconcile(conn: &mut SqliteConnection) -> QueryResult<i64> {
    create_tables(conn)?;
    let found = read_inventory(conn)?;
    let current = if add_missing_columns(conn, &found)? == 0 {
        found
    } else {
        read_inventory(conn)?
    };
    create_indexes(conn, &current)?;
    apply_pending(conn)
}
