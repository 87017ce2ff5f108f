//! Schema repair on a live file and engine construction from configuration.

use crate::contract::scenarios;
use crate::sqlite::helpers::{SqliteStore, has_column, raw_connection, sqlite_store};
use crate::test_helpers::{stored_task, task_id};
use diesel::connection::SimpleConnection;
use rstest::rstest;
use tracline::adapters::factory::{connect_engine, create_engine};
use tracline::adapters::sql::CURRENT_SCHEMA_VERSION;
use tracline::config::{DatabaseConfig, TracLineConfig};
use tracline::ports::{BackendKind, PersistenceEngine};

#[rstest]
fn file_type_column_is_restored_on_read(mut sqlite_store: SqliteStore) {
    let path = sqlite_store.path.clone();

    scenarios::missing_file_type_column_is_restored(
        &mut sqlite_store.engine,
        || {
            raw_connection(&path)
                .batch_execute("ALTER TABLE file_associations DROP COLUMN file_type")
                .expect("drop column behind the engine's back");
            assert!(!has_column(&path, "file_associations", "file_type"));
        },
        || has_column(&path, "file_associations", "file_type"),
    );
}

#[rstest]
fn schema_version_is_recorded(mut sqlite_store: SqliteStore) {
    assert_eq!(
        sqlite_store.engine.schema_version().expect("version"),
        CURRENT_SCHEMA_VERSION
    );

    sqlite_store.engine.initialize_schema().expect("repeat initialization");

    assert_eq!(
        sqlite_store.engine.schema_version().expect("version"),
        CURRENT_SCHEMA_VERSION
    );
}

#[rstest]
fn data_survives_reopening_the_file(mut sqlite_store: SqliteStore) {
    stored_task(&mut sqlite_store.engine, "T-1");
    sqlite_store.engine.disconnect().expect("disconnect");
    assert!(!sqlite_store.engine.is_connected());

    let mut reopened = connect_engine(&DatabaseConfig::sqlite(sqlite_store.path.as_str())).expect("reopen");

    assert!(reopened
        .get_task(&task_id("T-1"))
        .expect("get")
        .is_some());
}

#[rstest]
fn yaml_configuration_selects_the_sqlite_engine(sqlite_store: SqliteStore) {
    let yaml = format!("database:\n  engine_type: sqlite3\n  path: {}\n", sqlite_store.path);
    let config = TracLineConfig::from_yaml(&yaml).expect("valid yaml");

    let mut engine = create_engine(&config.database).expect("supported engine");
    assert_eq!(engine.backend(), BackendKind::Sqlite);
    assert!(!engine.is_connected());

    engine.connect().expect("connect");
    assert!(engine.is_connected());
    engine.disconnect().expect("disconnect");
}

#[rstest]
fn unknown_engines_are_rejected() {
    let config = DatabaseConfig {
        engine: "oracle".to_owned(),
        ..DatabaseConfig::default()
    };

    let Err(err) = create_engine(&config) else {
        panic!("oracle should not be a supported engine");
    };

    assert!(err.to_string().contains("oracle"), "unexpected error: {err}");
}
