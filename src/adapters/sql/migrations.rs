//! Ordered, versioned data migrations.
//!
//! Structural compatibility is handled by the column shim; migrations run
//! afterwards and the stored schema version records the last one applied.

use super::rows::{FilePathRow, VersionRow};
use super::{SqlConnection, SqlValue, Statement};
use crate::domain::file_type_of;
use diesel::result::QueryResult;

/// Version reached once every migration has run.
pub const CURRENT_SCHEMA_VERSION: i64 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Baseline,
    BackfillFileTypes,
    LogLookupIndex,
}

/// One versioned migration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Migration {
    /// Version recorded after the migration runs.
    pub version: i64,
    /// Short description for logs.
    pub name: &'static str,
    step: Step,
}

/// Every migration, in application order.
pub const MIGRATIONS: [Migration; 3] = [
    Migration {
        version: 1,
        name: "baseline",
        step: Step::Baseline,
    },
    Migration {
        version: 2,
        name: "backfill file types",
        step: Step::BackfillFileTypes,
    },
    Migration {
        version: 3,
        name: "log lookup index",
        step: Step::LogLookupIndex,
    },
];

/// Reads the stored schema version, `0` when none is recorded.
///
/// # Errors
///
/// Returns the error of the failing query.
pub fn read_version<C: SqlConnection>(conn: &mut C) -> QueryResult<i64> {
    let rows: Vec<VersionRow> = conn.load_rows(&Statement::new(
        "SELECT CAST(MAX(version) AS BIGINT) AS version FROM schema_version",
    ))?;
    Ok(rows
        .into_iter()
        .next()
        .and_then(|row| row.version)
        .unwrap_or(0))
}

/// Replaces the stored schema version.
///
/// Older stores keyed the table by version, so the row is replaced rather
/// than updated.
///
/// # Errors
///
/// Returns the error of the failing statement.
pub fn write_version<C: SqlConnection>(conn: &mut C, version: i64) -> QueryResult<()> {
    conn.execute_statement(&Statement::new("DELETE FROM schema_version"))?;
    conn.execute_statement(
        &Statement::new("INSERT INTO schema_version (version) VALUES (:version)")
            .bind("version", SqlValue::big_int(version)),
    )?;
    Ok(())
}

/// Applies every migration newer than the stored version and returns the
/// resulting version.
///
/// # Errors
///
/// Returns the error of the first failing migration; earlier migrations
/// stay applied and recorded.
pub fn apply_pending<C: SqlConnection>(conn: &mut C) -> QueryResult<i64> {
    let start = read_version(conn)?;
    let mut version = start;
    for migration in MIGRATIONS.iter().filter(|candidate| candidate.version > start) {
        run(conn, migration.step)?;
        write_version(conn, migration.version)?;
        tracing::info!(
            version = migration.version,
            migration = migration.name,
            "applied schema migration"
        );
        version = migration.version;
    }
    Ok(version)
}

fn run<C: SqlConnection>(conn: &mut C, step: Step) -> QueryResult<()> {
    match step {
        Step::Baseline => Ok(()),
        Step::BackfillFileTypes => backfill_file_types(conn),
        Step::LogLookupIndex => conn.execute_script(
            "CREATE INDEX IF NOT EXISTS idx_log_entries_task_id_id ON log_entries (\"task_id\", \"id\")",
        ),
    }
}

fn backfill_file_types<C: SqlConnection>(conn: &mut C) -> QueryResult<()> {
    let rows: Vec<FilePathRow> = conn.load_rows(&Statement::new(
        "SELECT CAST(id AS BIGINT) AS id, file_path FROM file_associations WHERE file_type IS NULL",
    ))?;
    for row in rows {
        let Some(file_type) = file_type_of(&row.file_path) else {
            continue;
        };
        conn.execute_statement(
            &Statement::new("UPDATE file_associations SET file_type = :file_type WHERE id = :id")
                .bind("file_type", SqlValue::text(file_type))
                .bind("id", SqlValue::big_int(row.id)),
        )?;
    }
    Ok(())
}
