//! Task operations that leave an audit trail.
//!
//! Every write here is paired with one log entry in the same transaction.
//! Status changes belong to [`super::TaskLifecycleService`].

use super::lifecycle::{LifecycleError, LifecycleResult};
use super::{SessionContext, within_transaction};
use crate::domain::{
    DomainError, FileAssociation, LogEntry, LogEntryType, NewFileAssociation, NewLogEntry,
    NewRelationship, NewTask, ProjectId, RelationshipKind, Task, TaskId, TaskPriority,
    TaskRelationship, TaskStatus,
};
use crate::ports::{LogQuery, NextTaskCriteria, PersistenceEngine, TaskQuery};
use camino::{Utf8Path, Utf8PathBuf};
use cap_std::ambient_authority;
use cap_std::fs_utf8::Dir;
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde_json::Value;
use std::io;
use std::sync::Arc;

/// Field edits for [`TaskService::update_task`]; `None` leaves a field alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskUpdate {
    /// New title.
    pub title: Option<String>,
    /// New description; `Some(None)` clears it.
    pub description: Option<Option<String>>,
    /// New priority.
    pub priority: Option<TaskPriority>,
    /// New project; `Some(None)` detaches the task.
    pub project_id: Option<Option<ProjectId>>,
    /// Replacement tag set.
    pub tags: Option<Vec<String>>,
    /// New due date; `Some(None)` clears it.
    pub due_date: Option<Option<DateTime<Utc>>>,
}

impl TaskUpdate {
    fn changed_fields(&self) -> Vec<&'static str> {
        [
            ("title", self.title.is_some()),
            ("description", self.description.is_some()),
            ("priority", self.priority.is_some()),
            ("project_id", self.project_id.is_some()),
            ("tags", self.tags.is_some()),
            ("due_date", self.due_date.is_some()),
        ]
        .into_iter()
        .filter_map(|(field, changed)| changed.then_some(field))
        .collect()
    }
}

/// Request to attach a file to a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachFileRequest {
    /// Task receiving the file.
    pub task_id: TaskId,
    /// Absolute path, or a path relative to the project root.
    pub path: String,
    /// Free-text description.
    pub description: Option<String>,
}

impl AttachFileRequest {
    /// Attaches `path` to `task_id` without a description.
    #[must_use]
    pub fn new(task_id: TaskId, path: impl Into<String>) -> Self {
        Self {
            task_id,
            path: path.into(),
            description: None,
        }
    }

    /// Adds a description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Task CRUD, links, files and logs, scoped by a [`SessionContext`].
pub struct TaskService<'a, E, C>
where
    E: PersistenceEngine + ?Sized,
    C: Clock,
{
    engine: &'a mut E,
    context: SessionContext,
    clock: Arc<C>,
}

impl<'a, E, C> TaskService<'a, E, C>
where
    E: PersistenceEngine + ?Sized,
    C: Clock,
{
    /// Creates a task service over `engine`.
    #[must_use]
    pub const fn new(engine: &'a mut E, context: SessionContext, clock: Arc<C>) -> Self {
        Self {
            engine,
            context,
            clock,
        }
    }

    /// Caller context in use.
    #[must_use]
    pub const fn context(&self) -> &SessionContext {
        &self.context
    }

    fn actor(&self) -> Option<String> {
        self.context.default_assignee.clone()
    }

    fn entry(&self, entry_type: LogEntryType, message: String, task_id: &TaskId) -> NewLogEntry {
        NewLogEntry::new(entry_type, message, self.clock.utc())
            .for_task(task_id.clone())
            .by_user(self.actor())
    }

    fn load(&mut self, task_id: &TaskId) -> LifecycleResult<Task> {
        self.engine
            .get_task(task_id)?
            .ok_or_else(|| LifecycleError::TaskNotFound(task_id.clone()))
    }

    /// Creates a task in `TODO`.
    ///
    /// Assignee, project and priority fall back to the session context.
    ///
    /// # Errors
    ///
    /// Returns a storage error, including
    /// [`crate::ports::PersistenceError::AlreadyExists`] for a duplicate id.
    pub fn create_task(&mut self, new_task: NewTask) -> LifecycleResult<Task> {
        let mut request = new_task;
        if request.assignee().is_none() {
            if let Some(assignee) = &self.context.default_assignee {
                request = request.with_assignee(assignee.clone());
            }
        }
        if request.project_id().is_none() {
            if let Some(project_id) = &self.context.current_project {
                request = request.with_project(project_id.clone());
            }
        }
        if request.priority().is_none() {
            if let Some(priority) = self.context.default_priority {
                request = request.with_priority(priority);
            }
        }
        let task = Task::create(request, &*self.clock);
        let log = self.entry(
            LogEntryType::TaskCreated,
            format!("Task created: {}", task.title()),
            task.id(),
        );
        let stored = within_transaction(&mut *self.engine, |engine| {
            let stored = engine.create_task(&task)?;
            engine.add_log_entry(&log)?;
            Ok::<_, LifecycleError>(stored)
        })?;
        tracing::info!(task_id = %stored.id(), "task created");
        Ok(stored)
    }

    /// Applies field edits.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::TaskNotFound`], a domain error for a blank
    /// title, or a storage error.
    pub fn update_task(&mut self, task_id: &TaskId, update: TaskUpdate) -> LifecycleResult<Task> {
        let mut task = self.load(task_id)?;
        let fields = update.changed_fields();
        let clock = &*self.clock;
        if let Some(title) = update.title {
            task.rename(title, clock)?;
        }
        if let Some(description) = update.description {
            task.set_description(description, clock);
        }
        if let Some(priority) = update.priority {
            task.set_priority(priority, clock);
        }
        if let Some(project_id) = update.project_id {
            task.set_project(project_id, clock);
        }
        if let Some(tags) = update.tags {
            task.set_tags(tags, clock);
        }
        if let Some(due_date) = update.due_date {
            task.set_due_date(due_date, clock);
        }
        let log = self
            .entry(
                LogEntryType::TaskUpdated,
                format!("Task updated: {}", fields.join(", ")),
                task_id,
            )
            .with_metadata("fields", Value::from(fields));
        self.save_with_log(&task, &log)?;
        Ok(task)
    }

    /// Replaces the assignee.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::TaskNotFound`] or a storage error.
    pub fn assign_task(&mut self, task_id: &TaskId, assignee: Option<String>) -> LifecycleResult<Task> {
        let mut task = self.load(task_id)?;
        let previous = task.assign(assignee, &*self.clock);
        let current = task.assignee().map(str::to_owned);
        let log = self
            .entry(
                LogEntryType::AssigneeChanged,
                format!(
                    "Assignee changed: {} → {}",
                    previous.as_deref().unwrap_or("-"),
                    current.as_deref().unwrap_or("-")
                ),
                task_id,
            )
            .with_metadata("old_assignee", previous.map_or(Value::Null, Value::from))
            .with_metadata("new_assignee", current.map_or(Value::Null, Value::from));
        self.save_with_log(&task, &log)?;
        Ok(task)
    }

    fn save_with_log(&mut self, task: &Task, log: &NewLogEntry) -> LifecycleResult<()> {
        within_transaction(&mut *self.engine, |engine| {
            if !engine.update_task(task)? {
                return Err(LifecycleError::TaskNotFound(task.id().clone()));
            }
            engine.add_log_entry(log)?;
            Ok(())
        })
    }

    /// Deletes a task with its files and links. Returns `false` when it
    /// did not exist.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub fn delete_task(&mut self, task_id: &TaskId) -> LifecycleResult<bool> {
        let log = self.entry(LogEntryType::TaskDeleted, format!("Task deleted: {task_id}"), task_id);
        let removed = within_transaction(&mut *self.engine, |engine| {
            let removed = engine.delete_task(task_id)?;
            if removed {
                engine.add_log_entry(&log)?;
            }
            Ok::<_, LifecycleError>(removed)
        })?;
        if removed {
            tracing::info!(%task_id, "task deleted");
        }
        Ok(removed)
    }

    /// Links two existing tasks.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::TaskNotFound`] for either end, a domain
    /// error for a self link, or
    /// [`crate::ports::PersistenceError::AlreadyExists`] when the pair is
    /// already linked.
    pub fn link_tasks(
        &mut self,
        parent_id: &TaskId,
        child_id: &TaskId,
        kind: RelationshipKind,
    ) -> LifecycleResult<TaskRelationship> {
        let mut relationship = NewRelationship::new(parent_id.clone(), child_id.clone(), kind)?;
        if let Some(actor) = self.actor() {
            relationship = relationship.with_created_by(actor);
        }
        self.load(parent_id)?;
        self.load(child_id)?;
        let log = self
            .entry(
                LogEntryType::RelationshipCreated,
                format!("Relationship created: {parent_id} {kind} {child_id}"),
                parent_id,
            )
            .with_metadata("child_id", Value::from(child_id.as_str()))
            .with_metadata("relationship_type", Value::from(kind.as_str()));
        within_transaction(&mut *self.engine, |engine| {
            let stored = engine.create_relationship(&relationship)?;
            engine.add_log_entry(&log)?;
            Ok(stored)
        })
    }

    /// Removes the link from `parent_id` to `child_id`.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub fn unlink_tasks(&mut self, parent_id: &TaskId, child_id: &TaskId) -> LifecycleResult<bool> {
        let log = self
            .entry(
                LogEntryType::RelationshipDeleted,
                format!("Relationship deleted: {parent_id} → {child_id}"),
                parent_id,
            )
            .with_metadata("child_id", Value::from(child_id.as_str()));
        within_transaction(&mut *self.engine, |engine| {
            let removed = engine.delete_relationship_between(parent_id, child_id)?;
            if removed {
                engine.add_log_entry(&log)?;
            }
            Ok(removed)
        })
    }

    /// Attaches a file, reading its size and modification time when the
    /// file exists.
    ///
    /// Relative paths resolve against the project root of the task.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::TaskNotFound`], a domain error for a path
    /// that stays relative, [`LifecycleError::Filesystem`] when the file
    /// exists but cannot be inspected, or a storage error.
    pub fn attach_file(&mut self, request: AttachFileRequest) -> LifecycleResult<FileAssociation> {
        let task = self.load(&request.task_id)?;
        let project_root = match task.project_id() {
            Some(project_id) => self
                .engine
                .get_project_settings(project_id)?
                .and_then(|settings| settings.project_root),
            None => None,
        };
        let requested = Utf8Path::new(request.path.trim());
        let resolved = match project_root.as_deref() {
            Some(root) if requested.is_relative() && !requested.as_str().is_empty() => {
                Utf8Path::new(root).join(requested)
            }
            _ => requested.to_owned(),
        };

        let mut association = NewFileAssociation::new(request.task_id.clone(), resolved.as_str())?;
        if resolved.as_path() != requested {
            association = association.with_relative_path(requested.as_str());
        }
        if let Some(description) = request.description {
            association = association.with_description(description);
        }
        if let Some(actor) = self.actor() {
            association = association.with_created_by(actor);
        }
        if let Some((size, modified)) = read_metadata(&resolved)? {
            association = association.with_metadata(size, modified);
        }

        let log = self
            .entry(
                LogEntryType::FileAdded,
                format!("File added: {resolved}"),
                &request.task_id,
            )
            .with_metadata("file_path", Value::from(resolved.as_str()));
        within_transaction(&mut *self.engine, |engine| {
            let stored = engine.add_file_association(&association)?;
            engine.add_log_entry(&log)?;
            Ok(stored)
        })
    }

    /// Detaches a file.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub fn detach_file(&mut self, task_id: &TaskId, path: &str) -> LifecycleResult<bool> {
        let log = self
            .entry(LogEntryType::FileRemoved, format!("File removed: {path}"), task_id)
            .with_metadata("file_path", Value::from(path));
        within_transaction(&mut *self.engine, |engine| {
            let removed = engine.remove_file_association(task_id, path)?;
            if removed {
                engine.add_log_entry(&log)?;
            }
            Ok(removed)
        })
    }

    /// Records work or a user action against a task.
    ///
    /// # Errors
    ///
    /// Returns a domain error for any other entry type,
    /// [`LifecycleError::TaskNotFound`], or a storage error.
    pub fn add_log(&mut self, task_id: &TaskId, entry_type: LogEntryType, message: &str) -> LifecycleResult<LogEntry> {
        if !LogEntryType::EVIDENCE.contains(&entry_type) {
            return Err(DomainError::UnknownValue {
                kind: "work log type",
                value: entry_type.as_str().to_owned(),
            }
            .into());
        }
        if message.trim().is_empty() {
            return Err(DomainError::EmptyField { field: "message" }.into());
        }
        self.load(task_id)?;
        let entry = self.entry(entry_type, message.trim().to_owned(), task_id);
        Ok(self.engine.add_log_entry(&entry)?)
    }

    /// Lists tasks; unset assignee and project filters come from the
    /// session context.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub fn list_tasks(&mut self, query: TaskQuery) -> LifecycleResult<Vec<Task>> {
        let mut scoped = query;
        if scoped.filter.assignee.is_none() {
            scoped.filter.assignee.clone_from(&self.context.default_assignee);
        }
        if scoped.filter.project_id.is_none() {
            scoped.filter.project_id.clone_from(&self.context.current_project);
        }
        Ok(self.engine.list_tasks(&scoped)?)
    }

    /// Highest-priority open task for the session context.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub fn next_task(&mut self) -> LifecycleResult<Option<Task>> {
        let criteria = NextTaskCriteria {
            assignee: self.context.default_assignee.clone(),
            project_id: self.context.current_project.clone(),
            excluded_states: vec![TaskStatus::DONE.to_owned(), TaskStatus::CANCELED.to_owned()],
        };
        Ok(self.engine.get_next_task(&criteria)?)
    }

    /// Log entries of a task, newest first.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub fn task_logs(&mut self, task_id: &TaskId, limit: Option<u32>) -> LifecycleResult<Vec<LogEntry>> {
        let mut query = LogQuery::for_task(task_id.clone());
        query.limit = limit;
        Ok(self.engine.list_log_entries(&query)?)
    }
}

fn read_metadata(path: &Utf8Path) -> LifecycleResult<Option<(u64, Option<DateTime<Utc>>)>> {
    let (Some(parent), Some(name)) = (path.parent(), path.file_name()) else {
        return Ok(None);
    };
    let inspected = Dir::open_ambient_dir(parent, ambient_authority()).and_then(|dir| dir.metadata(name));
    match inspected {
        Ok(metadata) => {
            let modified = metadata
                .modified()
                .ok()
                .map(|time| DateTime::<Utc>::from(time.into_std()));
            Ok(Some((metadata.len(), modified)))
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(LifecycleError::Filesystem {
            path: Utf8PathBuf::from(path),
            source: Arc::new(err),
        }),
    }
}
