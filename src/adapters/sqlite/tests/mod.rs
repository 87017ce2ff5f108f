//! SQLite backend behaviour that depends on the physical store: parent
//! directory creation, legacy layouts and drift repair mid-session.

use super::SqliteEngine;
use crate::adapters::sql::CURRENT_SCHEMA_VERSION;
use crate::domain::{NewTask, ProjectId, Task, TaskId};
use crate::ports::{PersistenceEngine, PersistenceError};
use camino::Utf8PathBuf;
use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use mockable::DefaultClock;
use rstest::{fixture, rstest};
use tempfile::TempDir;

struct Store {
    _dir: TempDir,
    path: Utf8PathBuf,
}

#[fixture]
fn store() -> Store {
    let dir = tempfile::tempdir().expect("temporary directory");
    let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 temp path");
    Store {
        path: root.join("nested").join("tracline.db"),
        _dir: dir,
    }
}

fn raw(path: &Utf8PathBuf) -> SqliteConnection {
    SqliteConnection::establish(path.as_str()).expect("raw connection")
}

fn task(id: &str) -> Task {
    let new_task = NewTask::new(TaskId::new(id).expect("task id"), "Write docs").expect("new task");
    Task::create(new_task, &DefaultClock)
}

#[rstest]
fn connect_creates_parent_directory_and_schema(store: Store) {
    let mut engine = SqliteEngine::open_path(store.path.clone());

    engine.connect().expect("connect");

    assert!(store.path.exists());
    assert_eq!(engine.schema_version().expect("version"), CURRENT_SCHEMA_VERSION);
}

#[rstest]
fn operations_before_connect_are_rejected() {
    let mut engine = SqliteEngine::in_memory();
    let result = engine.get_task(&TaskId::new("T-1").expect("task id"));
    assert!(matches!(result, Err(PersistenceError::NotConnected)));
    engine.disconnect().expect("disconnect while closed is a no-op");
}

#[rstest]
fn legacy_tables_gain_missing_columns(store: Store) {
    std::fs::create_dir_all(store.path.parent().expect("parent")).expect("create parent");
    raw(&store.path)
        .batch_execute(
            "CREATE TABLE tasks (task_id TEXT PRIMARY KEY, title TEXT NOT NULL, status TEXT, \
             created_at TEXT, updated_at TEXT); \
             INSERT INTO tasks VALUES ('OLD-1', 'Legacy', 'TODO', '2023-01-02 03:04:05', '2023-01-02 03:04:05'); \
             CREATE TABLE schema_version (version INTEGER PRIMARY KEY); \
             INSERT INTO schema_version VALUES (1);",
        )
        .expect("legacy layout");

    let mut engine = SqliteEngine::open_path(store.path.clone());
    engine.connect().expect("connect heals legacy layout");

    let legacy = engine
        .get_task(&TaskId::new("OLD-1").expect("task id"))
        .expect("read legacy task")
        .expect("legacy task present");
    assert_eq!(legacy.title(), "Legacy");
    assert_eq!(legacy.work_started_file_count(), None);
    assert_eq!(legacy.created_at().to_rfc3339(), "2023-01-02T03:04:05+00:00");
    assert_eq!(engine.schema_version().expect("version"), CURRENT_SCHEMA_VERSION);
}

#[rstest]
fn dropped_table_is_recreated_on_demand(store: Store) {
    let mut engine = SqliteEngine::open_path(store.path.clone());
    engine.connect().expect("connect");
    raw(&store.path)
        .batch_execute("DROP TABLE project_settings")
        .expect("drop table behind the engine's back");

    let settings = engine
        .get_project_settings(&ProjectId::new("P-1").expect("project id"))
        .expect("drift is repaired and the read retried");

    assert_eq!(settings, None);
}

#[rstest]
fn dropped_column_is_restored_on_demand(store: Store) {
    let mut engine = SqliteEngine::open_path(store.path.clone());
    engine.connect().expect("connect");
    engine.create_task(&task("T-1")).expect("create");
    raw(&store.path)
        .batch_execute("ALTER TABLE tasks DROP COLUMN sync_status")
        .expect("drop column behind the engine's back");

    let found = engine
        .get_task(&TaskId::new("T-1").expect("task id"))
        .expect("drift is repaired and the read retried");

    assert!(found.is_some());
}

#[rstest]
fn reconnecting_is_idempotent(store: Store) {
    let mut engine = SqliteEngine::open_path(store.path.clone());
    engine.connect().expect("first connect");
    engine.create_task(&task("T-1")).expect("create");
    engine.disconnect().expect("disconnect");
    engine.connect().expect("second connect");
    engine.initialize_schema().expect("repeat initialization");

    assert!(engine.is_connected());
    assert!(engine
        .get_task(&TaskId::new("T-1").expect("task id"))
        .expect("read")
        .is_some());
}

#[rstest]
fn trial_reads_tell_present_columns_from_missing_ones(store: Store) {
    let mut engine = SqliteEngine::open_path(store.path.clone());
    engine.connect().expect("connect");
    engine.disconnect().expect("disconnect");
    let mut conn = raw(&store.path);
    conn.batch_execute("ALTER TABLE log_entries DROP COLUMN \"user\"")
        .expect("drop column");

    assert!(super::probe::column_exists(&mut conn, "log_entries", "timestamp").expect("trial read"));
    assert!(!super::probe::column_exists(&mut conn, "log_entries", "user").expect("trial read"));
    assert!(!super::probe::column_exists(&mut conn, "log_entries", "no_such_column").expect("trial read"));
}

#[rstest]
fn reconnecting_restores_a_column_named_like_a_keyword(store: Store) {
    let mut engine = SqliteEngine::open_path(store.path.clone());
    engine.connect().expect("connect");
    engine.disconnect().expect("disconnect");
    raw(&store.path)
        .batch_execute("ALTER TABLE log_entries DROP COLUMN \"user\"")
        .expect("drop column");

    engine.connect().expect("reconnect heals the layout");

    let mut conn = raw(&store.path);
    assert!(super::probe::column_exists(&mut conn, "log_entries", "user").expect("trial read"));
}
