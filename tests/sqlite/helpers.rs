//! Shared fixtures for the SQLite integration tests.

use camino::Utf8PathBuf;
use diesel::prelude::*;
use diesel::sql_types::BigInt;
use rstest::fixture;
use tempfile::TempDir;
use tracline::adapters::sqlite::SqliteEngine;
use tracline::ports::PersistenceEngine;

/// A connected engine over a database file that lives as long as the store.
pub struct SqliteStore {
    _dir: TempDir,
    /// Database file.
    pub path: Utf8PathBuf,
    /// Connected engine.
    pub engine: SqliteEngine,
}

/// Provides a fresh database file in a temporary directory.
#[fixture]
pub fn sqlite_store() -> SqliteStore {
    let dir = tempfile::tempdir().expect("temporary directory");
    let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 temp path");
    let path = root.join("tracline.db");
    let mut engine = SqliteEngine::open_path(path.clone());
    engine.connect().expect("sqlite store should connect");
    SqliteStore {
        _dir: dir,
        path,
        engine,
    }
}

/// Opens a connection that bypasses the engine.
pub fn raw_connection(path: &Utf8PathBuf) -> SqliteConnection {
    SqliteConnection::establish(path.as_str()).expect("raw connection")
}

#[derive(QueryableByName)]
struct Count {
    #[diesel(sql_type = BigInt)]
    value: i64,
}

/// Reports whether `table` currently has `column`.
pub fn has_column(path: &Utf8PathBuf, table: &str, column: &str) -> bool {
    let rows: Vec<Count> = diesel::sql_query(
        "SELECT COUNT(*) AS value FROM pragma_table_info(?) WHERE name = ?",
    )
    .bind::<diesel::sql_types::Text, _>(table)
    .bind::<diesel::sql_types::Text, _>(column)
    .load(&mut raw_connection(path))
    .expect("table info");
    rows.first().is_some_and(|row| row.value > 0)
}
