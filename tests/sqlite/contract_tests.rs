//! Backend-independent behaviour exercised on SQLite.

use crate::contract::{links, logs, scenarios, tasks, team, transactions};
use crate::sqlite::helpers::{SqliteStore, sqlite_store};
use rstest::rstest;

#[rstest]
fn created_tasks_get_increasing_order(mut sqlite_store: SqliteStore) {
    tasks::created_tasks_get_increasing_order(&mut sqlite_store.engine);
}

#[rstest]
fn duplicate_ids_are_rejected(mut sqlite_store: SqliteStore) {
    tasks::duplicate_ids_are_rejected(&mut sqlite_store.engine);
}

#[rstest]
fn updates_round_trip(mut sqlite_store: SqliteStore) {
    tasks::updates_round_trip(&mut sqlite_store.engine);
}

#[rstest]
fn updating_a_missing_task_reports_false(mut sqlite_store: SqliteStore) {
    tasks::updating_a_missing_task_reports_false(&mut sqlite_store.engine);
}

#[rstest]
fn listing_filters_and_limits(mut sqlite_store: SqliteStore) {
    tasks::listing_filters_and_limits(&mut sqlite_store.engine);
}

#[rstest]
fn next_task_prefers_priority_then_age(mut sqlite_store: SqliteStore) {
    tasks::next_task_prefers_priority_then_age(&mut sqlite_store.engine);
}

#[rstest]
fn reordering_shifts_the_tasks_in_between(mut sqlite_store: SqliteStore) {
    tasks::reordering_shifts_the_tasks_in_between(&mut sqlite_store.engine);
}

#[rstest]
fn reordering_past_the_end_lands_on_the_last_position(mut sqlite_store: SqliteStore) {
    tasks::reordering_past_the_end_lands_on_the_last_position(&mut sqlite_store.engine);
}

#[rstest]
fn deleting_a_task_removes_its_links(mut sqlite_store: SqliteStore) {
    tasks::deleting_a_task_removes_its_links(&mut sqlite_store.engine);
}

#[rstest]
fn relationships_are_unique_per_pair(mut sqlite_store: SqliteStore) {
    links::relationships_are_unique_per_pair(&mut sqlite_store.engine);
}

#[rstest]
fn relationships_are_found_from_either_end(mut sqlite_store: SqliteStore) {
    links::relationships_are_found_from_either_end(&mut sqlite_store.engine);
}

#[rstest]
fn file_associations_derive_type_and_reference_count(mut sqlite_store: SqliteStore) {
    links::file_associations_derive_type_and_reference_count(&mut sqlite_store.engine);
}

#[rstest]
fn duplicate_file_association_is_rejected(mut sqlite_store: SqliteStore) {
    links::duplicate_file_association_is_rejected(&mut sqlite_store.engine);
}

#[rstest]
fn files_trace_back_to_their_tasks(mut sqlite_store: SqliteStore) {
    links::files_trace_back_to_their_tasks(&mut sqlite_store.engine);
}

#[rstest]
fn entries_are_listed_newest_first(mut sqlite_store: SqliteStore) {
    logs::entries_are_listed_newest_first(&mut sqlite_store.engine);
}

#[rstest]
fn filters_narrow_by_type_and_identifier(mut sqlite_store: SqliteStore) {
    logs::filters_narrow_by_type_and_identifier(&mut sqlite_store.engine);
}

#[rstest]
fn members_round_trip_and_filter(mut sqlite_store: SqliteStore) {
    team::members_round_trip_and_filter(&mut sqlite_store.engine);
}

#[rstest]
fn removing_a_leader_orphans_reports_and_memberships(mut sqlite_store: SqliteStore) {
    team::removing_a_leader_orphans_reports_and_memberships(&mut sqlite_store.engine);
}

#[rstest]
fn projects_memberships_and_filters(mut sqlite_store: SqliteStore) {
    team::projects_memberships_and_filters(&mut sqlite_store.engine);
}

#[rstest]
fn settings_are_upserted(mut sqlite_store: SqliteStore) {
    team::settings_are_upserted(&mut sqlite_store.engine);
}

#[rstest]
fn rollback_discards_every_write(mut sqlite_store: SqliteStore) {
    transactions::rollback_discards_every_write(&mut sqlite_store.engine);
}

#[rstest]
fn commit_keeps_writes(mut sqlite_store: SqliteStore) {
    transactions::commit_keeps_writes(&mut sqlite_store.engine);
}

#[rstest]
fn nested_begin_is_refused(mut sqlite_store: SqliteStore) {
    transactions::nested_begin_is_refused(&mut sqlite_store.engine);
}

#[rstest]
fn failed_composite_write_leaves_no_trace(mut sqlite_store: SqliteStore) {
    transactions::failed_composite_write_leaves_no_trace(&mut sqlite_store.engine);
}

#[rstest]
fn completion_needs_a_file_attached_after_work_started(mut sqlite_store: SqliteStore) {
    scenarios::completion_needs_a_file_attached_after_work_started(&mut sqlite_store.engine);
}
