//! Drift repair and transaction recovery against a live server.

use crate::contract::scenarios;
use crate::postgres::helpers::{PostgresStore, has_column, postgres_store, raw_connection};
use crate::test_helpers::{project_id, stored_task, task, task_id};
use diesel::connection::SimpleConnection;
use mockable::DefaultClock;
use rstest::rstest;
use std::sync::Arc;
use tracline::adapters::sql::CURRENT_SCHEMA_VERSION;
use tracline::config::StrictModeConfig;
use tracline::domain::{LogEntryType, TaskStatus};
use tracline::ports::{LogQuery, PersistenceEngine, PersistenceError};
use tracline::services::{LifecycleError, TaskLifecycleService, Workflow};

fn alter(url: &str, sql: &str) {
    raw_connection(url)
        .batch_execute(sql)
        .expect("schema change behind the engine's back");
}

#[rstest]
fn file_type_column_is_restored_on_read(postgres_store: Option<PostgresStore>) {
    let Some(mut store) = postgres_store else {
        return;
    };
    let url = store.url.clone();

    scenarios::missing_file_type_column_is_restored(
        &mut store.engine,
        || alter(&url, "ALTER TABLE file_associations DROP COLUMN file_type"),
        || has_column(&url, "file_associations", "file_type"),
    );
}

#[rstest]
fn dropped_table_is_recreated_on_demand(postgres_store: Option<PostgresStore>) {
    let Some(mut store) = postgres_store else {
        return;
    };
    alter(&store.url, "DROP TABLE project_settings");

    let settings = store
        .engine
        .get_project_settings(&project_id("web-app"))
        .expect("drift is repaired and the read retried");

    assert!(settings.is_none());
    assert!(has_column(&store.url, "project_settings", "strict_doc_read"));
}

#[rstest]
fn drift_inside_a_transaction_is_rolled_back_for_replay(postgres_store: Option<PostgresStore>) {
    let Some(mut store) = postgres_store else {
        return;
    };
    let url = store.url.clone();
    store.engine.begin().expect("begin");
    stored_task(&mut store.engine, "T-1");
    alter(&url, "ALTER TABLE file_associations DROP COLUMN relative_path");

    let interrupted = store.engine.list_file_associations(&task_id("T-1"));

    assert!(matches!(interrupted, Err(PersistenceError::TransactionAborted { .. })));
    assert!(!store.engine.in_transaction());
    assert!(has_column(&url, "file_associations", "relative_path"));
    assert!(store.engine.get_task(&task_id("T-1")).expect("get").is_none());

    store.engine.begin().expect("begin replay");
    stored_task(&mut store.engine, "T-1");
    assert!(store.engine.list_file_associations(&task_id("T-1")).expect("files").is_empty());
    store.engine.commit().expect("commit replay");
    assert!(store.engine.get_task(&task_id("T-1")).expect("get").is_some());
}

#[rstest]
fn aborted_transaction_is_rolled_back_and_reported(postgres_store: Option<PostgresStore>) {
    let Some(mut store) = postgres_store else {
        return;
    };
    store.engine.begin().expect("begin");
    stored_task(&mut store.engine, "T-1");
    let duplicate = store.engine.create_task(&task("T-1"));
    assert!(duplicate.is_err_and(|err| err.is_already_exists()));

    let after_abort = store.engine.get_task(&task_id("T-1"));

    assert!(matches!(after_abort, Err(PersistenceError::TransactionAborted { .. })));
    assert!(!store.engine.in_transaction());
    store.engine.commit().expect("commit without a transaction is a no-op");
    assert!(store.engine.get_task(&task_id("T-1")).expect("get").is_none());
}

#[rstest]
fn transition_interrupted_by_drift_writes_nothing(postgres_store: Option<PostgresStore>) {
    let Some(mut store) = postgres_store else {
        return;
    };
    let url = store.url.clone();
    stored_task(&mut store.engine, "T-1");
    alter(&url, "ALTER TABLE log_entries DROP COLUMN metadata");
    let mut lifecycle = TaskLifecycleService::new(
        &mut store.engine,
        Arc::new(Workflow::default()),
        Arc::new(StrictModeConfig::default()),
        Arc::new(DefaultClock),
    );

    let interrupted = lifecycle.advance_task(&task_id("T-1"), None);
    assert!(matches!(
        interrupted,
        Err(LifecycleError::Persistence(PersistenceError::TransactionAborted { .. }))
    ));
    let replayed = lifecycle
        .advance_task(&task_id("T-1"), None)
        .expect("transition replays after repair");

    assert!(replayed.old_state.is(TaskStatus::TODO));
    let changes = store
        .engine
        .list_log_entries(&LogQuery::for_task(task_id("T-1")).of_types([LogEntryType::StatusChanged]))
        .expect("logs");
    assert_eq!(changes.len(), 1);
    assert!(has_column(&url, "log_entries", "metadata"));
}

#[rstest]
fn reconnecting_keeps_the_schema_version(postgres_store: Option<PostgresStore>) {
    let Some(mut store) = postgres_store else {
        return;
    };
    stored_task(&mut store.engine, "T-1");
    store.engine.disconnect().expect("disconnect");
    store.engine.connect().expect("reconnect");

    assert_eq!(store.engine.schema_version().expect("version"), CURRENT_SCHEMA_VERSION);
    assert!(store.engine.get_task(&task_id("T-1")).expect("get").is_some());
}
