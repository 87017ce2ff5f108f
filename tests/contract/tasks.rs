//! Task rows: ordering, filters, next-task selection and deletion.

use crate::test_helpers::{project_id, stored_task, task, task_id, workspace_file};
use chrono::{TimeZone, Utc};
use mockable::DefaultClock;
use tracline::domain::{NewFileAssociation, NewRelationship, RelationshipKind, Task, TaskPriority, TaskStatus};
use tracline::ports::{
    NextTaskCriteria, PersistenceEngine, PersistenceError, RelationshipQuery, TaskFilter, TaskQuery,
    TaskSortKey,
};

fn order_of(engine: &mut dyn PersistenceEngine) -> Vec<String> {
    engine
        .list_tasks(&TaskQuery::all().sorted_by(TaskSortKey::OrderNum, false))
        .expect("list tasks")
        .iter()
        .map(|found| found.id().as_str().to_owned())
        .collect()
}

pub fn created_tasks_get_increasing_order(engine: &mut dyn PersistenceEngine) {
    let first = stored_task(engine, "T-1");
    let second = stored_task(engine, "T-2");

    assert_eq!(first.order_num(), 1);
    assert_eq!(second.order_num(), 2);
    assert_eq!(first.status().as_str(), TaskStatus::TODO);
}

pub fn duplicate_ids_are_rejected(engine: &mut dyn PersistenceEngine) {
    stored_task(engine, "T-1");

    let err = engine.create_task(&task("T-1")).expect_err("duplicate id");

    assert!(err.is_already_exists(), "unexpected error: {err:?}");
    assert!(matches!(err, PersistenceError::AlreadyExists { .. }));
}

pub fn updates_round_trip(engine: &mut dyn PersistenceEngine) {
    let mut stored = stored_task(engine, "T-1");
    let due = Utc.with_ymd_and_hms(2030, 5, 17, 9, 30, 0).single().expect("valid date");
    stored.rename("Ship the release", &DefaultClock).expect("rename");
    stored.set_priority(TaskPriority::new(5).expect("priority"), &DefaultClock);
    stored.set_tags(["release", "Docs"], &DefaultClock);
    stored.set_due_date(Some(due), &DefaultClock);
    stored.set_project(Some(project_id("web-app")), &DefaultClock);
    stored.assign(Some("alice".to_owned()), &DefaultClock);

    assert!(engine.update_task(&stored).expect("update"));
    let reloaded = engine
        .get_task(&task_id("T-1"))
        .expect("get task")
        .expect("task exists");

    assert_eq!(reloaded.title(), "Ship the release");
    assert_eq!(reloaded.priority().value(), 5);
    assert_eq!(reloaded.tags(), stored.tags());
    assert_eq!(reloaded.due_date(), Some(due));
    assert_eq!(reloaded.project_id().map(|id| id.as_str()), Some("web-app"));
    assert_eq!(reloaded.assignee(), Some("alice"));
}

pub fn updating_a_missing_task_reports_false(engine: &mut dyn PersistenceEngine) {
    assert!(!engine.update_task(&task("GHOST")).expect("update"));
    assert!(engine.get_task(&task_id("GHOST")).expect("get").is_none());
}

pub fn listing_filters_and_limits(engine: &mut dyn PersistenceEngine) {
    for (id, assignee) in [("T-1", "alice"), ("T-2", "bob"), ("T-3", "alice")] {
        let mut created = task(id);
        created.assign(Some(assignee.to_owned()), &DefaultClock);
        created.set_tags(["backend"], &DefaultClock);
        engine.create_task(&created).expect("create");
    }
    let mut done = engine.get_task(&task_id("T-3")).expect("get").expect("exists");
    done.transition_to(TaskStatus::done(), &DefaultClock);
    engine.update_task(&done).expect("update");

    let alice = TaskFilter {
        assignee: Some("alice".to_owned()),
        ..TaskFilter::default()
    };
    let open_for_alice = TaskFilter {
        exclude_status: Some("done".to_owned()),
        ..alice.clone()
    };
    let by_status = TaskFilter {
        status: Some("done".to_owned()),
        ..TaskFilter::default()
    };
    let by_tag = TaskFilter {
        tag: Some("backend".to_owned()),
        ..TaskFilter::default()
    };

    let ids = |tasks: Vec<Task>| -> Vec<String> { tasks.iter().map(|found| found.id().as_str().to_owned()).collect() };
    let query = |filter: TaskFilter| TaskQuery::all().with_filter(filter).sorted_by(TaskSortKey::Id, false);

    assert_eq!(ids(engine.list_tasks(&query(alice)).expect("list")), ["T-1", "T-3"]);
    assert_eq!(ids(engine.list_tasks(&query(open_for_alice)).expect("list")), ["T-1"]);
    assert_eq!(ids(engine.list_tasks(&query(by_status)).expect("list")), ["T-3"]);
    assert_eq!(engine.list_tasks(&query(by_tag)).expect("list").len(), 3);
    assert_eq!(
        engine
            .list_tasks(&TaskQuery::all().with_limit(2))
            .expect("list")
            .len(),
        2
    );
}

pub fn next_task_prefers_priority_then_age(engine: &mut dyn PersistenceEngine) {
    let mut low = task("LOW");
    low.set_priority(TaskPriority::new(1).expect("priority"), &DefaultClock);
    engine.create_task(&low).expect("create");
    let mut urgent = task("URGENT");
    urgent.set_priority(TaskPriority::new(5).expect("priority"), &DefaultClock);
    engine.create_task(&urgent).expect("create");

    let picked = engine
        .get_next_task(&NextTaskCriteria::default())
        .expect("next task")
        .expect("a task is available");
    assert_eq!(picked.id().as_str(), "URGENT");

    let mut finished = picked;
    finished.transition_to(TaskStatus::done(), &DefaultClock);
    engine.update_task(&finished).expect("update");
    let criteria = NextTaskCriteria {
        excluded_states: vec![TaskStatus::DONE.to_owned(), TaskStatus::CANCELED.to_owned()],
        ..NextTaskCriteria::default()
    };
    let following = engine.get_next_task(&criteria).expect("next task").expect("one left");
    assert_eq!(following.id().as_str(), "LOW");

    let elsewhere = NextTaskCriteria {
        project_id: Some(project_id("elsewhere")),
        ..criteria
    };
    assert!(engine.get_next_task(&elsewhere).expect("next task").is_none());
}

pub fn reordering_shifts_the_tasks_in_between(engine: &mut dyn PersistenceEngine) {
    for id in ["A", "B", "C", "D"] {
        stored_task(engine, id);
    }

    assert!(engine.reorder_task(&task_id("D"), 2).expect("move up"));
    assert_eq!(order_of(engine), ["A", "D", "B", "C"]);

    assert!(engine.reorder_task(&task_id("A"), 4).expect("move down"));
    assert_eq!(order_of(engine), ["D", "B", "C", "A"]);

    assert!(!engine.reorder_task(&task_id("GHOST"), 1).expect("missing task"));
}

pub fn reordering_past_the_end_lands_on_the_last_position(engine: &mut dyn PersistenceEngine) {
    for id in ["A", "B", "C"] {
        stored_task(engine, id);
    }

    assert!(engine.reorder_task(&task_id("A"), 99).expect("move past the end"));
    assert_eq!(order_of(engine), ["B", "C", "A"]);
    let positions: Vec<i64> = engine
        .list_tasks(&TaskQuery::all().sorted_by(TaskSortKey::OrderNum, false))
        .expect("list tasks")
        .iter()
        .map(Task::order_num)
        .collect();
    assert_eq!(positions, [1, 2, 3]);

    assert!(engine.reorder_task(&task_id("A"), 0).expect("move before the start"));
    assert_eq!(order_of(engine), ["A", "B", "C"]);
}

pub fn deleting_a_task_removes_its_links(engine: &mut dyn PersistenceEngine) {
    let parent = stored_task(engine, "PARENT");
    let child = stored_task(engine, "CHILD");
    let path = workspace_file("notes.md");
    engine
        .add_file_association(&NewFileAssociation::new(child.id().clone(), path.as_str()).expect("association"))
        .expect("attach");
    engine
        .create_relationship(
            &NewRelationship::new(parent.id().clone(), child.id().clone(), RelationshipKind::ParentChild)
                .expect("relationship"),
        )
        .expect("link");

    assert!(engine.delete_task(child.id()).expect("delete"));

    assert!(engine.get_task(child.id()).expect("get").is_none());
    assert!(engine.tasks_for_file(&path).expect("trace").is_empty());
    let edges = engine
        .list_relationships(&RelationshipQuery {
            task_id: Some(parent.id().clone()),
            ..RelationshipQuery::default()
        })
        .expect("relationships");
    assert!(edges.is_empty());
    assert!(!engine.delete_task(child.id()).expect("second delete"));
}
