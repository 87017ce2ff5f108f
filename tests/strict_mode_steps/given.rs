//! Given steps for strict completion gate scenarios.

use super::world::StrictModeWorld;
use eyre::WrapErr;
use rstest_bdd_macros::given;
use tracline::domain::{LogEntryType, NewTask, Project, ProjectId, TaskId};
use tracline::services::{AttachFileRequest, SettingsUpdate};

#[given(r#"a project "{project}" requiring "{checks}""#)]
fn project_requiring(world: &mut StrictModeWorld, project: String, checks: String) -> Result<(), eyre::Report> {
    let mut update = SettingsUpdate::default();
    for check in checks.split(',').map(str::trim) {
        match check {
            "doc_read" => update.strict_doc_read = Some(true),
            "file_ref" => update.strict_file_ref = Some(true),
            "log_entry" => update.strict_log_entry = Some(true),
            other => return Err(eyre::eyre!("unknown strict check {other:?} in scenario")),
        }
    }
    let id = ProjectId::new(project.as_str()).wrap_err("project id in scenario")?;
    let created = Project::new(id.clone(), format!("Project {project}"), &*world.clock)
        .wrap_err("project in scenario")?;
    let mut team = world.team();
    team.add_project(created).wrap_err("create project for scenario")?;
    team.update_settings(&id, update).wrap_err("enable strict checks")?;
    Ok(())
}

fn create_task(world: &mut StrictModeWorld, task: &str, project: Option<&str>) -> Result<(), eyre::Report> {
    let mut new_task = NewTask::new(TaskId::new(task).wrap_err("task id in scenario")?, format!("Task {task}"))
        .wrap_err("task in scenario")?;
    if let Some(project_id) = project {
        new_task = new_task.with_project(ProjectId::new(project_id).wrap_err("project id in scenario")?);
    }
    let created = world.tasks().create_task(new_task).wrap_err("create task for scenario")?;
    world.task_id = Some(created.id().clone());
    Ok(())
}

#[given(r#"a task "{task}" in project "{project}""#)]
fn task_in_project(world: &mut StrictModeWorld, task: String, project: String) -> Result<(), eyre::Report> {
    create_task(world, &task, Some(&project))
}

#[given(r#"a task "{task}" outside any project"#)]
fn task_outside_projects(world: &mut StrictModeWorld, task: String) -> Result<(), eyre::Report> {
    create_task(world, &task, None)
}

#[given(r#"the file "{path}" is attached to the task"#)]
fn file_attached(world: &mut StrictModeWorld, path: String) -> Result<(), eyre::Report> {
    let task_id = world.current_task()?;
    world
        .tasks()
        .attach_file(AttachFileRequest::new(task_id, path))
        .wrap_err("attach file in scenario setup")?;
    Ok(())
}

#[given(r#"work "{message}" is logged on the task"#)]
fn work_logged(world: &mut StrictModeWorld, message: String) -> Result<(), eyre::Report> {
    let task_id = world.current_task()?;
    world
        .tasks()
        .add_log(&task_id, LogEntryType::Work, &message)
        .wrap_err("log work in scenario setup")?;
    Ok(())
}

#[given(r#"the task has moved to "{state}""#)]
fn task_has_moved(world: &mut StrictModeWorld, state: String) -> Result<(), eyre::Report> {
    let task_id = world.current_task()?;
    world
        .lifecycle()
        .change_status(&task_id, &state, None)
        .wrap_err("move task in scenario setup")?;
    Ok(())
}
