//! Schema reconciler.
//!
//! Runs on its own short-lived autocommit connection so structural changes
//! commit independently of the session's transaction. The lock timeout
//! keeps it from waiting on locks the session itself holds.

use crate::adapters::sql::{
    ColumnInventory, ColumnNameRow, SqlConnection, Statement, add_missing_columns, apply_pending,
    create_indexes, create_tables,
};
use diesel::pg::PgConnection;
use diesel::result::QueryResult;

pub(super) const SIDE_SESSION_SETUP: &str =
    "SET TIME ZONE 'UTC'; SET lock_timeout = '5s'; SET client_min_messages = warning";

const INVENTORY_SQL: &str = "SELECT CAST(table_name AS TEXT) AS table_name, \
     CAST(column_name AS TEXT) AS column_name FROM information_schema.columns \
     WHERE table_schema = current_schema()";

fn read_inventory(conn: &mut PgConnection) -> QueryResult<ColumnInventory> {
    let rows: Vec<ColumnNameRow> = conn.load_rows(&Statement::new(INVENTORY_SQL))?;
    Ok(ColumnInventory::from_pairs(
        rows.into_iter().map(|row| (row.table_name, row.column_name)),
    ))
}

/// Creates tables, adds missing columns, builds indexes whose columns
/// exist and applies pending migrations. Returns the schema version.
pub(super) fn reconcile(conn: &mut PgConnection) -> QueryResult<i64> {
    create_tables(conn)?;
    let found = read_inventory(conn)?;
    add_missing_columns(conn, &found)?;
    let current = read_inventory(conn)?;
    let skipped = create_indexes(conn, &current)?;
    if skipped > 0 {
        tracing::warn!(skipped, "some indexes were not built");
    }
    let version = apply_pending(conn)?;
    tracing::info!(version, "schema reconciled");
    Ok(version)
}
