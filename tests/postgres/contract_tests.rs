//! Backend-independent behaviour exercised on `PostgreSQL`.

use crate::contract::{links, logs, scenarios, tasks, team, transactions};
use crate::postgres::helpers::{PostgresStore, postgres_store};
use rstest::rstest;

#[rstest]
fn created_tasks_get_increasing_order(postgres_store: Option<PostgresStore>) {
    let Some(mut store) = postgres_store else {
        return;
    };
    tasks::created_tasks_get_increasing_order(&mut store.engine);
}

#[rstest]
fn duplicate_ids_are_rejected(postgres_store: Option<PostgresStore>) {
    let Some(mut store) = postgres_store else {
        return;
    };
    tasks::duplicate_ids_are_rejected(&mut store.engine);
}

#[rstest]
fn updates_round_trip(postgres_store: Option<PostgresStore>) {
    let Some(mut store) = postgres_store else {
        return;
    };
    tasks::updates_round_trip(&mut store.engine);
}

#[rstest]
fn updating_a_missing_task_reports_false(postgres_store: Option<PostgresStore>) {
    let Some(mut store) = postgres_store else {
        return;
    };
    tasks::updating_a_missing_task_reports_false(&mut store.engine);
}

#[rstest]
fn listing_filters_and_limits(postgres_store: Option<PostgresStore>) {
    let Some(mut store) = postgres_store else {
        return;
    };
    tasks::listing_filters_and_limits(&mut store.engine);
}

#[rstest]
fn next_task_prefers_priority_then_age(postgres_store: Option<PostgresStore>) {
    let Some(mut store) = postgres_store else {
        return;
    };
    tasks::next_task_prefers_priority_then_age(&mut store.engine);
}

#[rstest]
fn reordering_shifts_the_tasks_in_between(postgres_store: Option<PostgresStore>) {
    let Some(mut store) = postgres_store else {
        return;
    };
    tasks::reordering_shifts_the_tasks_in_between(&mut store.engine);
}

#[rstest]
fn reordering_past_the_end_lands_on_the_last_position(postgres_store: Option<PostgresStore>) {
    let Some(mut store) = postgres_store else {
        return;
    };
    tasks::reordering_past_the_end_lands_on_the_last_position(&mut store.engine);
}

#[rstest]
fn deleting_a_task_removes_its_links(postgres_store: Option<PostgresStore>) {
    let Some(mut store) = postgres_store else {
        return;
    };
    tasks::deleting_a_task_removes_its_links(&mut store.engine);
}

#[rstest]
fn relationships_are_unique_per_pair(postgres_store: Option<PostgresStore>) {
    let Some(mut store) = postgres_store else {
        return;
    };
    links::relationships_are_unique_per_pair(&mut store.engine);
}

#[rstest]
fn relationships_are_found_from_either_end(postgres_store: Option<PostgresStore>) {
    let Some(mut store) = postgres_store else {
        return;
    };
    links::relationships_are_found_from_either_end(&mut store.engine);
}

#[rstest]
fn file_associations_derive_type_and_reference_count(postgres_store: Option<PostgresStore>) {
    let Some(mut store) = postgres_store else {
        return;
    };
    links::file_associations_derive_type_and_reference_count(&mut store.engine);
}

#[rstest]
fn duplicate_file_association_is_rejected(postgres_store: Option<PostgresStore>) {
    let Some(mut store) = postgres_store else {
        return;
    };
    links::duplicate_file_association_is_rejected(&mut store.engine);
}

#[rstest]
fn files_trace_back_to_their_tasks(postgres_store: Option<PostgresStore>) {
    let Some(mut store) = postgres_store else {
        return;
    };
    links::files_trace_back_to_their_tasks(&mut store.engine);
}

#[rstest]
fn entries_are_listed_newest_first(postgres_store: Option<PostgresStore>) {
    let Some(mut store) = postgres_store else {
        return;
    };
    logs::entries_are_listed_newest_first(&mut store.engine);
}

#[rstest]
fn filters_narrow_by_type_and_identifier(postgres_store: Option<PostgresStore>) {
    let Some(mut store) = postgres_store else {
        return;
    };
    logs::filters_narrow_by_type_and_identifier(&mut store.engine);
}

#[rstest]
fn members_round_trip_and_filter(postgres_store: Option<PostgresStore>) {
    let Some(mut store) = postgres_store else {
        return;
    };
    team::members_round_trip_and_filter(&mut store.engine);
}

#[rstest]
fn removing_a_leader_orphans_reports_and_memberships(postgres_store: Option<PostgresStore>) {
    let Some(mut store) = postgres_store else {
        return;
    };
    team::removing_a_leader_orphans_reports_and_memberships(&mut store.engine);
}

#[rstest]
fn projects_memberships_and_filters(postgres_store: Option<PostgresStore>) {
    let Some(mut store) = postgres_store else {
        return;
    };
    team::projects_memberships_and_filters(&mut store.engine);
}

#[rstest]
fn settings_are_upserted(postgres_store: Option<PostgresStore>) {
    let Some(mut store) = postgres_store else {
        return;
    };
    team::settings_are_upserted(&mut store.engine);
}

#[rstest]
fn rollback_discards_every_write(postgres_store: Option<PostgresStore>) {
    let Some(mut store) = postgres_store else {
        return;
    };
    transactions::rollback_discards_every_write(&mut store.engine);
}

#[rstest]
fn commit_keeps_writes(postgres_store: Option<PostgresStore>) {
    let Some(mut store) = postgres_store else {
        return;
    };
    transactions::commit_keeps_writes(&mut store.engine);
}

#[rstest]
fn nested_begin_is_refused(postgres_store: Option<PostgresStore>) {
    let Some(mut store) = postgres_store else {
        return;
    };
    transactions::nested_begin_is_refused(&mut store.engine);
}

#[rstest]
fn failed_composite_write_leaves_no_trace(postgres_store: Option<PostgresStore>) {
    let Some(mut store) = postgres_store else {
        return;
    };
    transactions::failed_composite_write_leaves_no_trace(&mut store.engine);
}

#[rstest]
fn completion_needs_a_file_attached_after_work_started(postgres_store: Option<PostgresStore>) {
    let Some(mut store) = postgres_store else {
        return;
    };
    scenarios::completion_needs_a_file_attached_after_work_started(&mut store.engine);
}
