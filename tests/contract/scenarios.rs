//! End-to-end walkthroughs across services and storage.

use crate::test_helpers::{project_id, stored_task, task_id, workspace_file};
use mockable::DefaultClock;
use std::sync::Arc;
use tracline::config::StrictModeConfig;
use tracline::domain::{LogEntryType, NewFileAssociation, NewTask, ProjectSettings, StrictFlags, TaskStatus};
use tracline::ports::{LogQuery, PersistenceEngine};
use tracline::services::{
    AttachFileRequest, LifecycleError, SessionContext, StrictViolation, TaskLifecycleService, TaskService, Workflow,
};

fn lifecycle(engine: &mut dyn PersistenceEngine) -> TaskLifecycleService<'_, dyn PersistenceEngine + '_, DefaultClock> {
    TaskLifecycleService::new(
        engine,
        Arc::new(Workflow::default()),
        Arc::new(StrictModeConfig::default()),
        Arc::new(DefaultClock),
    )
}

fn attach(engine: &mut dyn PersistenceEngine, context: &SessionContext, name: &str) {
    TaskService::new(engine, context.clone(), Arc::new(DefaultClock))
        .attach_file(AttachFileRequest::new(task_id("T1"), workspace_file(name)))
        .expect("file should attach");
}

/// A file attached before work starts does not count as new evidence;
/// one attached afterwards lets the task complete.
pub fn completion_needs_a_file_attached_after_work_started(engine: &mut dyn PersistenceEngine) {
    let project = project_id("web-app");
    let mut settings = ProjectSettings::new(project.clone(), &DefaultClock);
    settings.strict = StrictFlags {
        doc_read: false,
        file_ref: true,
        log_entry: false,
    };
    engine.save_project_settings(&settings).expect("settings should save");
    let context = SessionContext {
        default_assignee: Some("alice".to_owned()),
        current_project: Some(project),
        ..SessionContext::default()
    };

    let created = TaskService::new(&mut *engine, context.clone(), Arc::new(DefaultClock))
        .create_task(NewTask::new(task_id("T1"), "Write the release notes").expect("valid task"))
        .expect("task should be created");
    assert_eq!(created.status().as_str(), TaskStatus::TODO);
    assert_eq!(engine.count_file_associations(created.id()).expect("count"), 0);

    attach(&mut *engine, &context, "a.md");
    let started = lifecycle(&mut *engine)
        .advance_task(created.id(), None)
        .expect("advance to READY");
    assert_eq!(started.new_state.as_str(), TaskStatus::READY);
    let ready = engine.get_task(created.id()).expect("get").expect("task exists");
    assert_eq!(ready.work_started_file_count(), Some(1));

    let blocked = lifecycle(&mut *engine)
        .change_status(created.id(), "DONE", None)
        .expect_err("no new file since work started");
    assert!(matches!(
        blocked,
        LifecycleError::StrictModeBlocked(StrictViolation::NewFileRequired { baseline: 1, current: 1 })
    ));
    let unchanged = engine.get_task(created.id()).expect("get").expect("task exists");
    assert_eq!(unchanged.status().as_str(), TaskStatus::READY);

    let status_changes = LogQuery::for_task(created.id().clone()).of_types([LogEntryType::StatusChanged]);
    let before = engine.count_log_entries(&status_changes).expect("count");
    attach(&mut *engine, &context, "b.py");
    lifecycle(&mut *engine)
        .change_status(created.id(), "DONE", None)
        .expect("completion allowed");

    let done = engine.get_task(created.id()).expect("get").expect("task exists");
    assert!(done.status().is_done());
    assert!(done.completed_at().is_some());
    assert_eq!(engine.count_log_entries(&status_changes).expect("count"), before + 1);
    let newest = engine
        .list_log_entries(&status_changes.with_limit(1))
        .expect("list logs");
    let message = newest.first().map(|entry| entry.message.as_str()).expect("status change logged");
    assert!(message.contains("→ DONE"), "unexpected message: {message}");
}

/// A read that finds `file_associations.file_type` missing repairs the
/// column and succeeds.
pub fn missing_file_type_column_is_restored<D, P>(engine: &mut dyn PersistenceEngine, drop_column: D, has_column: P)
where
    D: FnOnce(),
    P: FnOnce() -> bool,
{
    let created = stored_task(engine, "T1");
    let path = workspace_file("notes.md");
    engine
        .add_file_association(&NewFileAssociation::new(created.id().clone(), path.as_str()).expect("association"))
        .expect("attach");

    drop_column();
    let files = engine
        .list_file_associations(created.id())
        .expect("drift is repaired without surfacing an error");

    assert!(has_column());
    assert_eq!(files.len(), 1);
    assert_eq!(files.first().map(|file| file.file_path.as_str()), Some(path.as_str()));
}
