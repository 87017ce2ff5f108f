//! Storage contract shared by every backend.

use super::{
    LogQuery, MemberFilter, NextTaskCriteria, PersistenceResult, ProjectFilter,
    RelationshipQuery, TaskQuery,
};
use crate::domain::{
    FileAssociation, LogEntry, Member, MemberId, NewFileAssociation, NewLogEntry,
    NewRelationship, Project, ProjectId, ProjectMembership, ProjectSettings, Task, TaskId,
    TaskRelationship,
};
use std::fmt;

/// Storage engine family behind a [`PersistenceEngine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// Embedded single-file engine.
    Sqlite,
    /// Client/server engine.
    Postgres,
}

impl BackendKind {
    /// Returns a short lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sqlite => "sqlite",
            Self::Postgres => "postgresql",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Every storage operation of the task tracker.
///
/// Implementations own a single session and behave identically across
/// backends. Reads of missing entities return `Ok(None)`; updates and
/// deletes of missing entities return `Ok(false)`. Unique-key violations
/// return [`super::PersistenceError::AlreadyExists`].
///
/// Transactions are flat: `commit` and `rollback` without an open
/// transaction do nothing, and `begin` inside one is rejected.
#[cfg_attr(test, mockall::automock)]
pub trait PersistenceEngine {
    /// Reports which engine family this is.
    fn backend(&self) -> BackendKind;

    /// Opens the session and brings the schema up to date. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns [`super::PersistenceError::Connection`] when the store is
    /// unreachable, or a schema error when it cannot be prepared.
    fn connect(&mut self) -> PersistenceResult<()>;

    /// Closes the session. Idempotent, including after a failed connect.
    ///
    /// # Errors
    ///
    /// Implementations currently always succeed.
    fn disconnect(&mut self) -> PersistenceResult<()>;

    /// Returns `true` while a session is open.
    fn is_connected(&self) -> bool;

    /// Creates missing structure without touching existing data.
    ///
    /// # Errors
    ///
    /// Returns [`super::PersistenceError::SchemaDrift`] when the schema
    /// cannot be brought up to date.
    fn initialize_schema(&mut self) -> PersistenceResult<()>;

    /// Reads the stored schema version, `0` when none is recorded.
    ///
    /// # Errors
    ///
    /// Returns an error when the version table cannot be read.
    fn schema_version(&mut self) -> PersistenceResult<i64>;

    /// Records the schema version.
    ///
    /// # Errors
    ///
    /// Returns an error when the version table cannot be written.
    fn set_schema_version(&mut self, version: i64) -> PersistenceResult<()>;

    /// Opens a transaction.
    ///
    /// # Errors
    ///
    /// Returns [`super::PersistenceError::NestedTransaction`] when one is
    /// already open.
    fn begin(&mut self) -> PersistenceResult<()>;

    /// Commits the open transaction, if any.
    ///
    /// # Errors
    ///
    /// Returns an error when the commit fails.
    fn commit(&mut self) -> PersistenceResult<()>;

    /// Rolls back the open transaction, if any.
    ///
    /// # Errors
    ///
    /// Returns an error when the rollback fails.
    fn rollback(&mut self) -> PersistenceResult<()>;

    /// Returns `true` while a transaction is open.
    fn in_transaction(&self) -> bool;

    /// Stores a new task and returns it with its assigned ordering index.
    ///
    /// # Errors
    ///
    /// Returns [`super::PersistenceError::AlreadyExists`] for a duplicate id.
    fn create_task(&mut self, task: &Task) -> PersistenceResult<Task>;

    /// Loads a task.
    ///
    /// # Errors
    ///
    /// Returns an error when the query fails.
    fn get_task(&mut self, id: &TaskId) -> PersistenceResult<Option<Task>>;

    /// Overwrites a stored task. Returns `false` when it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error when the statement fails.
    fn update_task(&mut self, task: &Task) -> PersistenceResult<bool>;

    /// Deletes a task with its file associations and relationships.
    ///
    /// # Errors
    ///
    /// Returns an error when any statement fails; nothing is deleted then.
    fn delete_task(&mut self, id: &TaskId) -> PersistenceResult<bool>;

    /// Lists tasks.
    ///
    /// # Errors
    ///
    /// Returns an error when the query fails.
    fn list_tasks(&mut self, query: &TaskQuery) -> PersistenceResult<Vec<Task>>;

    /// Returns the highest-priority, oldest task matching the criteria.
    ///
    /// # Errors
    ///
    /// Returns an error when the query fails.
    fn get_next_task(&mut self, criteria: &NextTaskCriteria) -> PersistenceResult<Option<Task>>;

    /// Moves a task to `position` in the manual ordering.
    ///
    /// # Errors
    ///
    /// Returns an error when a statement fails; the ordering is unchanged then.
    fn reorder_task(&mut self, id: &TaskId, position: i64) -> PersistenceResult<bool>;

    /// Lists the tasks that reference `path`.
    ///
    /// # Errors
    ///
    /// Returns an error when the query fails.
    fn tasks_for_file(&mut self, path: &str) -> PersistenceResult<Vec<Task>>;

    /// Stores a relationship.
    ///
    /// # Errors
    ///
    /// Returns [`super::PersistenceError::AlreadyExists`] when the pair is
    /// already linked.
    fn create_relationship(&mut self, relationship: &NewRelationship) -> PersistenceResult<TaskRelationship>;

    /// Lists relationships.
    ///
    /// # Errors
    ///
    /// Returns an error when the query fails.
    fn list_relationships(&mut self, query: &RelationshipQuery) -> PersistenceResult<Vec<TaskRelationship>>;

    /// Deletes a relationship by identifier.
    ///
    /// # Errors
    ///
    /// Returns an error when the statement fails.
    fn delete_relationship(&mut self, id: i64) -> PersistenceResult<bool>;

    /// Deletes the relationship between two tasks.
    ///
    /// # Errors
    ///
    /// Returns an error when the statement fails.
    fn delete_relationship_between(&mut self, parent_id: &TaskId, child_id: &TaskId) -> PersistenceResult<bool>;

    /// Attaches a file to a task.
    ///
    /// # Errors
    ///
    /// Returns [`super::PersistenceError::AlreadyExists`] when the file is
    /// already attached to the task.
    fn add_file_association(&mut self, association: &NewFileAssociation) -> PersistenceResult<FileAssociation>;

    /// Lists the files attached to a task.
    ///
    /// # Errors
    ///
    /// Returns an error when the query fails.
    fn list_file_associations(&mut self, task_id: &TaskId) -> PersistenceResult<Vec<FileAssociation>>;

    /// Lists every file association, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error when the query fails.
    fn list_all_file_associations(&mut self) -> PersistenceResult<Vec<FileAssociation>>;

    /// Detaches a file from a task.
    ///
    /// # Errors
    ///
    /// Returns an error when the statement fails.
    fn remove_file_association(&mut self, task_id: &TaskId, path: &str) -> PersistenceResult<bool>;

    /// Counts the files attached to a task.
    ///
    /// # Errors
    ///
    /// Returns an error when the query fails.
    fn count_file_associations(&mut self, task_id: &TaskId) -> PersistenceResult<u64>;

    /// Appends a log entry.
    ///
    /// # Errors
    ///
    /// Returns an error when the statement fails.
    fn add_log_entry(&mut self, entry: &NewLogEntry) -> PersistenceResult<LogEntry>;

    /// Lists log entries, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error when the query fails.
    fn list_log_entries(&mut self, query: &LogQuery) -> PersistenceResult<Vec<LogEntry>>;

    /// Counts log entries, ignoring the query's limit.
    ///
    /// # Errors
    ///
    /// Returns an error when the query fails.
    fn count_log_entries(&mut self, query: &LogQuery) -> PersistenceResult<u64>;

    /// Stores a member.
    ///
    /// # Errors
    ///
    /// Returns [`super::PersistenceError::AlreadyExists`] for a duplicate id.
    fn create_member(&mut self, member: &Member) -> PersistenceResult<()>;

    /// Loads a member.
    ///
    /// # Errors
    ///
    /// Returns an error when the query fails.
    fn get_member(&mut self, id: &MemberId) -> PersistenceResult<Option<Member>>;

    /// Overwrites a stored member.
    ///
    /// # Errors
    ///
    /// Returns an error when the statement fails.
    fn update_member(&mut self, member: &Member) -> PersistenceResult<bool>;

    /// Deletes a member, its memberships, and its reports' leader links.
    ///
    /// # Errors
    ///
    /// Returns an error when any statement fails; nothing is deleted then.
    fn delete_member(&mut self, id: &MemberId) -> PersistenceResult<bool>;

    /// Lists members by name.
    ///
    /// # Errors
    ///
    /// Returns an error when the query fails.
    fn list_members(&mut self, filter: &MemberFilter) -> PersistenceResult<Vec<Member>>;

    /// Stores a project.
    ///
    /// # Errors
    ///
    /// Returns [`super::PersistenceError::AlreadyExists`] for a duplicate id.
    fn create_project(&mut self, project: &Project) -> PersistenceResult<()>;

    /// Loads a project.
    ///
    /// # Errors
    ///
    /// Returns an error when the query fails.
    fn get_project(&mut self, id: &ProjectId) -> PersistenceResult<Option<Project>>;

    /// Overwrites a stored project.
    ///
    /// # Errors
    ///
    /// Returns an error when the statement fails.
    fn update_project(&mut self, project: &Project) -> PersistenceResult<bool>;

    /// Deletes a project with its memberships and settings.
    ///
    /// # Errors
    ///
    /// Returns an error when any statement fails; nothing is deleted then.
    fn delete_project(&mut self, id: &ProjectId) -> PersistenceResult<bool>;

    /// Lists projects by name.
    ///
    /// # Errors
    ///
    /// Returns an error when the query fails.
    fn list_projects(&mut self, filter: &ProjectFilter) -> PersistenceResult<Vec<Project>>;

    /// Adds a member to a project.
    ///
    /// # Errors
    ///
    /// Returns [`super::PersistenceError::AlreadyExists`] when the member
    /// already belongs to the project.
    fn add_project_member(&mut self, membership: &ProjectMembership) -> PersistenceResult<()>;

    /// Removes a member from a project.
    ///
    /// # Errors
    ///
    /// Returns an error when the statement fails.
    fn remove_project_member(&mut self, project_id: &ProjectId, member_id: &MemberId) -> PersistenceResult<bool>;

    /// Lists the members of a project.
    ///
    /// # Errors
    ///
    /// Returns an error when the query fails.
    fn list_project_members(&mut self, project_id: &ProjectId) -> PersistenceResult<Vec<Member>>;

    /// Lists the projects a member belongs to.
    ///
    /// # Errors
    ///
    /// Returns an error when the query fails.
    fn list_member_projects(&mut self, member_id: &MemberId) -> PersistenceResult<Vec<Project>>;

    /// Loads a project's settings; `None` when never written.
    ///
    /// # Errors
    ///
    /// Returns an error when the query fails.
    fn get_project_settings(&mut self, project_id: &ProjectId) -> PersistenceResult<Option<ProjectSettings>>;

    /// Inserts or replaces a project's settings.
    ///
    /// # Errors
    ///
    /// Returns an error when the statement fails.
    fn save_project_settings(&mut self, settings: &ProjectSettings) -> PersistenceResult<()>;
}
