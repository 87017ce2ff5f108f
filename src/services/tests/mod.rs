//! Unit tests for the application services.


use crate::adapters::sqlite::SqliteEngine;
use crate::domain::{NewTask, ProjectId, Task, TaskId};
use crate::ports::PersistenceEngine;
use crate::services::{SessionContext, TaskService};
use mockable::DefaultClock;
use std::sync::Arc;

fn connected_store() -> SqliteEngine {
    let mut engine = SqliteEngine::in_memory();
    engine.connect().expect("in-memory store should connect");
    engine
}

fn task_id(value: &str) -> TaskId {
    TaskId::new(value).expect("valid task id")
}

fn project_id(value: &str) -> ProjectId {
    ProjectId::new(value).expect("valid project id")
}

fn seed_task(engine: &mut SqliteEngine, id: &str, project: Option<&str>) -> Task {
    let context = SessionContext {
        default_assignee: Some("alice".to_owned()),
        current_project: project.map(project_id),
        ..SessionContext::default()
    };
    let mut tasks = TaskService::new(engine, context, Arc::new(DefaultClock));
    tasks
        .create_task(NewTask::new(task_id(id), format!("Task {id}")).expect("valid task"))
        .expect("task should be created")
}
