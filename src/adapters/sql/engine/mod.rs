//! Backend-neutral [`PersistenceEngine`] implementation.
//!
//! [`SqlEngine`] owns one session through a [`SqlBackend`] and runs every
//! operation as [`Statement`]s. Failures are classified by the backend's
//! dialect: unique violations become `AlreadyExists`, missing structure is
//! reconciled and the statement retried once, and an aborted transaction is
//! rolled back and the statement retried once. A statement never runs alone
//! after the caller's transaction was rolled back: the caller gets
//! `TransactionAborted` and replays its work.

mod links;
mod logs;
mod tasks;
mod team;

use super::migrations;
use super::{FailureKind, SqlConnection, Statement};
use crate::domain::{
    FileAssociation, LogEntry, Member, MemberId, NewFileAssociation, NewLogEntry,
    NewRelationship, Project, ProjectId, ProjectMembership, ProjectSettings, Task, TaskId,
    TaskRelationship,
};
use crate::ports::{
    BackendKind, LogQuery, MemberFilter, NextTaskCriteria, PersistenceEngine, PersistenceError,
    PersistenceResult, ProjectFilter, RelationshipQuery, TaskQuery,
};
use diesel::result::Error as DieselError;
use std::sync::Arc;

/// Session management for one database engine.
pub trait SqlBackend {
    /// Connection type the statements run on.
    type Connection: SqlConnection;

    /// Engine family reported by [`PersistenceEngine::backend`].
    const KIND: BackendKind;

    /// Opens the session. Called only while closed.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError::Connection`] when the store is
    /// unreachable.
    fn open(&mut self) -> PersistenceResult<()>;

    /// Drops the session.
    fn close(&mut self);

    /// Returns `true` while a session is open.
    fn is_open(&self) -> bool;

    /// Borrows the open session.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError::NotConnected`] while closed.
    fn connection(&mut self) -> PersistenceResult<&mut Self::Connection>;

    /// Creates missing tables, patches missing columns, builds indexes and
    /// applies pending migrations.
    ///
    /// # Errors
    ///
    /// Returns an error when the schema cannot be brought up to date.
    fn reconcile_schema(&mut self) -> PersistenceResult<()>;
}

/// A [`PersistenceEngine`] running over a [`SqlBackend`].
#[derive(Debug)]
pub struct SqlEngine<B> {
    backend: B,
    in_transaction: bool,
}

impl<B: SqlBackend> SqlEngine<B> {
    /// Wraps an unconnected backend.
    pub const fn new(backend: B) -> Self {
        Self {
            backend,
            in_transaction: false,
        }
    }

    /// Borrows the backend.
    pub const fn backend_ref(&self) -> &B {
        &self.backend
    }

    /// Runs `op` on the session with drift and abort recovery.
    fn recovering<R, F>(&mut self, operation: &'static str, mut op: F) -> PersistenceResult<R>
    where
        F: FnMut(&mut B::Connection) -> Result<R, DieselError>,
    {
        let dialect = <B::Connection as SqlConnection>::DIALECT;
        let err = match op(self.backend.connection()?) {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };
        match dialect.classify(&err) {
            FailureKind::UniqueViolation => Err(already_exists(operation, &err)),
            FailureKind::Other => Err(PersistenceError::query(operation, err)),
            FailureKind::SchemaDrift => {
                tracing::warn!(operation, error = %err, "schema drift detected, reconciling");
                let poisoned = self.in_transaction && dialect.failure_aborts_transaction();
                if poisoned {
                    self.abandon_transaction();
                }
                self.backend.reconcile_schema().map_err(|heal| match heal {
                    PersistenceError::SchemaDrift(_) => heal,
                    other => PersistenceError::schema_drift(other),
                })?;
                if poisoned {
                    return Err(PersistenceError::TransactionAborted {
                        operation,
                        source: Arc::new(err),
                    });
                }
                op(self.backend.connection()?).map_err(|retry| match dialect.classify(&retry) {
                    FailureKind::UniqueViolation => already_exists(operation, &retry),
                    FailureKind::SchemaDrift => PersistenceError::schema_drift(retry),
                    FailureKind::TransactionAborted | FailureKind::Other => {
                        PersistenceError::query(operation, retry)
                    }
                })
            }
            FailureKind::TransactionAborted if self.in_transaction => {
                tracing::warn!(operation, "transaction aborted, rolling back the caller's transaction");
                self.abandon_transaction();
                Err(PersistenceError::TransactionAborted {
                    operation,
                    source: Arc::new(err),
                })
            }
            FailureKind::TransactionAborted => {
                tracing::warn!(operation, "transaction aborted, rolling back and retrying");
                self.abandon_transaction();
                op(self.backend.connection()?).map_err(|retry| match dialect.classify(&retry) {
                    FailureKind::UniqueViolation => already_exists(operation, &retry),
                    FailureKind::SchemaDrift
                    | FailureKind::TransactionAborted
                    | FailureKind::Other => PersistenceError::TransactionAborted {
                        operation,
                        source: Arc::new(retry),
                    },
                })
            }
        }
    }

    fn execute(&mut self, operation: &'static str, statement: &Statement) -> PersistenceResult<usize> {
        self.recovering(operation, |conn| conn.execute_statement(statement))
    }

    fn load<T>(&mut self, operation: &'static str, statement: &Statement) -> PersistenceResult<Vec<T>>
    where
        T: diesel::deserialize::QueryableByName<diesel::pg::Pg>
            + diesel::deserialize::QueryableByName<diesel::sqlite::Sqlite>
            + 'static,
    {
        self.recovering(operation, |conn| conn.load_rows::<T>(statement))
    }

    /// Runs `work` inside a transaction, joining the caller's when one is
    /// open.
    ///
    /// A transaction opened here is replayed once when the backend rolled it
    /// back to repair the schema or after an abort.
    fn atomically<R, F>(&mut self, mut work: F) -> PersistenceResult<R>
    where
        F: FnMut(&mut Self) -> PersistenceResult<R>,
    {
        if self.in_transaction {
            return work(self);
        }
        match self.owned_transaction(&mut work) {
            Err(PersistenceError::TransactionAborted { operation, .. }) => {
                tracing::warn!(operation, "replaying write after its transaction was rolled back");
                self.owned_transaction(&mut work)
            }
            other => other,
        }
    }

    fn owned_transaction<R, F>(&mut self, work: &mut F) -> PersistenceResult<R>
    where
        F: FnMut(&mut Self) -> PersistenceResult<R>,
    {
        self.open_transaction()?;
        match work(self) {
            Ok(value) => {
                self.close_transaction()?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback) = self.discard_transaction() {
                    tracing::warn!(error = %rollback, "rollback after failed write also failed");
                }
                Err(err)
            }
        }
    }

    fn open_transaction(&mut self) -> PersistenceResult<()> {
        if self.in_transaction {
            return Err(PersistenceError::NestedTransaction);
        }
        self.backend
            .connection()?
            .execute_script("BEGIN")
            .map_err(|err| PersistenceError::query("begin", err))?;
        self.in_transaction = true;
        Ok(())
    }

    fn close_transaction(&mut self) -> PersistenceResult<()> {
        if !self.in_transaction {
            return Ok(());
        }
        self.backend
            .connection()?
            .execute_script("COMMIT")
            .map_err(|err| PersistenceError::query("commit", err))?;
        self.in_transaction = false;
        Ok(())
    }

    fn discard_transaction(&mut self) -> PersistenceResult<()> {
        if !self.in_transaction {
            return Ok(());
        }
        self.in_transaction = false;
        self.backend
            .connection()?
            .execute_script("ROLLBACK")
            .map_err(|err| PersistenceError::query("rollback", err))
    }

    /// Rolls back after the engine reported the transaction unusable.
    fn abandon_transaction(&mut self) {
        if let Ok(conn) = self.backend.connection() {
            if let Err(err) = conn.execute_script("ROLLBACK") {
                tracing::debug!(error = %err, "rollback of aborted transaction failed");
            }
        }
        self.in_transaction = false;
    }
}

fn already_exists(operation: &'static str, err: &DieselError) -> PersistenceError {
    let detail = match err {
        DieselError::DatabaseError(_, info) => info.message().to_owned(),
        other => other.to_string(),
    };
    PersistenceError::AlreadyExists { operation, detail }
}

impl<B: SqlBackend> PersistenceEngine for SqlEngine<B> {
    fn backend(&self) -> BackendKind {
        B::KIND
    }

    fn connect(&mut self) -> PersistenceResult<()> {
        if self.backend.is_open() {
            return Ok(());
        }
        self.backend.open()?;
        self.in_transaction = false;
        if let Err(err) = self.backend.reconcile_schema() {
            self.backend.close();
            return Err(err);
        }
        tracing::info!(backend = %B::KIND, "persistence engine connected");
        Ok(())
    }

    fn disconnect(&mut self) -> PersistenceResult<()> {
        if !self.backend.is_open() {
            return Ok(());
        }
        if let Err(err) = self.discard_transaction() {
            tracing::warn!(error = %err, "rollback on disconnect failed");
        }
        self.backend.close();
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.backend.is_open()
    }

    fn initialize_schema(&mut self) -> PersistenceResult<()> {
        self.backend.reconcile_schema()
    }

    fn schema_version(&mut self) -> PersistenceResult<i64> {
        self.recovering("read schema version", migrations::read_version)
    }

    fn set_schema_version(&mut self, version: i64) -> PersistenceResult<()> {
        self.atomically(|engine| {
            engine.recovering("write schema version", |conn| {
                migrations::write_version(conn, version)
            })
        })
    }

    fn begin(&mut self) -> PersistenceResult<()> {
        self.open_transaction()
    }

    fn commit(&mut self) -> PersistenceResult<()> {
        self.close_transaction()
    }

    fn rollback(&mut self) -> PersistenceResult<()> {
        self.discard_transaction()
    }

    fn in_transaction(&self) -> bool {
        self.in_transaction
    }

    fn create_task(&mut self, task: &Task) -> PersistenceResult<Task> {
        self.insert_task(task)
    }

    fn get_task(&mut self, id: &TaskId) -> PersistenceResult<Option<Task>> {
        self.find_task(id)
    }

    fn update_task(&mut self, task: &Task) -> PersistenceResult<bool> {
        self.save_task(task)
    }

    fn delete_task(&mut self, id: &TaskId) -> PersistenceResult<bool> {
        self.remove_task(id)
    }

    fn list_tasks(&mut self, query: &TaskQuery) -> PersistenceResult<Vec<Task>> {
        self.query_tasks(query)
    }

    fn get_next_task(&mut self, criteria: &NextTaskCriteria) -> PersistenceResult<Option<Task>> {
        self.find_next_task(criteria)
    }

    fn reorder_task(&mut self, id: &TaskId, position: i64) -> PersistenceResult<bool> {
        self.move_task(id, position)
    }

    fn tasks_for_file(&mut self, path: &str) -> PersistenceResult<Vec<Task>> {
        self.tasks_referencing(path)
    }

    fn create_relationship(&mut self, relationship: &NewRelationship) -> PersistenceResult<TaskRelationship> {
        self.insert_relationship(relationship)
    }

    fn list_relationships(&mut self, query: &RelationshipQuery) -> PersistenceResult<Vec<TaskRelationship>> {
        self.query_relationships(query)
    }

    fn delete_relationship(&mut self, id: i64) -> PersistenceResult<bool> {
        self.remove_relationship(id)
    }

    fn delete_relationship_between(&mut self, parent_id: &TaskId, child_id: &TaskId) -> PersistenceResult<bool> {
        self.remove_relationship_between(parent_id, child_id)
    }

    fn add_file_association(&mut self, association: &NewFileAssociation) -> PersistenceResult<FileAssociation> {
        self.insert_file(association)
    }

    fn list_file_associations(&mut self, task_id: &TaskId) -> PersistenceResult<Vec<FileAssociation>> {
        self.files_of(Some(task_id))
    }

    fn list_all_file_associations(&mut self) -> PersistenceResult<Vec<FileAssociation>> {
        self.files_of(None)
    }

    fn remove_file_association(&mut self, task_id: &TaskId, path: &str) -> PersistenceResult<bool> {
        self.remove_file(task_id, path)
    }

    fn count_file_associations(&mut self, task_id: &TaskId) -> PersistenceResult<u64> {
        self.count_files(task_id)
    }

    fn add_log_entry(&mut self, entry: &NewLogEntry) -> PersistenceResult<LogEntry> {
        self.append_log(entry)
    }

    fn list_log_entries(&mut self, query: &LogQuery) -> PersistenceResult<Vec<LogEntry>> {
        self.query_logs(query)
    }

    fn count_log_entries(&mut self, query: &LogQuery) -> PersistenceResult<u64> {
        self.count_logs(query)
    }

    fn create_member(&mut self, member: &Member) -> PersistenceResult<()> {
        self.insert_member(member)
    }

    fn get_member(&mut self, id: &MemberId) -> PersistenceResult<Option<Member>> {
        self.find_member(id)
    }

    fn update_member(&mut self, member: &Member) -> PersistenceResult<bool> {
        self.save_member(member)
    }

    fn delete_member(&mut self, id: &MemberId) -> PersistenceResult<bool> {
        self.remove_member(id)
    }

    fn list_members(&mut self, filter: &MemberFilter) -> PersistenceResult<Vec<Member>> {
        self.query_members(filter)
    }

    fn create_project(&mut self, project: &Project) -> PersistenceResult<()> {
        self.insert_project(project)
    }

    fn get_project(&mut self, id: &ProjectId) -> PersistenceResult<Option<Project>> {
        self.find_project(id)
    }

    fn update_project(&mut self, project: &Project) -> PersistenceResult<bool> {
        self.save_project(project)
    }

    fn delete_project(&mut self, id: &ProjectId) -> PersistenceResult<bool> {
        self.remove_project(id)
    }

    fn list_projects(&mut self, filter: &ProjectFilter) -> PersistenceResult<Vec<Project>> {
        self.query_projects(filter)
    }

    fn add_project_member(&mut self, membership: &ProjectMembership) -> PersistenceResult<()> {
        self.insert_membership(membership)
    }

    fn remove_project_member(&mut self, project_id: &ProjectId, member_id: &MemberId) -> PersistenceResult<bool> {
        self.remove_membership(project_id, member_id)
    }

    fn list_project_members(&mut self, project_id: &ProjectId) -> PersistenceResult<Vec<Member>> {
        self.members_of(project_id)
    }

    fn list_member_projects(&mut self, member_id: &MemberId) -> PersistenceResult<Vec<Project>> {
        self.projects_of(member_id)
    }

    fn get_project_settings(&mut self, project_id: &ProjectId) -> PersistenceResult<Option<ProjectSettings>> {
        self.find_settings(project_id)
    }

    fn save_project_settings(&mut self, settings: &ProjectSettings) -> PersistenceResult<()> {
        self.upsert_settings(settings)
    }
}
