//! Embedded single-file backend on SQLite.
//!
//! The task key column is physically `task_id` and relationships live in
//! `task_relationships`; [`Dialect::Sqlite`] maps both at the statement
//! boundary.

mod probe;

use crate::adapters::sql::{Dialect, SqlBackend, SqlConnection, SqlEngine, Statement, boxed_query};
use crate::ports::{BackendKind, PersistenceError, PersistenceResult};
use camino::{Utf8Path, Utf8PathBuf};
use cap_std::ambient_authority;
use cap_std::fs_utf8::Dir;
use diesel::connection::SimpleConnection;
use diesel::deserialize::QueryableByName;
use diesel::pg::Pg;
use diesel::prelude::*;
use diesel::result::QueryResult;
use diesel::sqlite::Sqlite;
use std::fmt;

/// Path that opens a private in-memory database.
pub const MEMORY_PATH: &str = ":memory:";

const SESSION_PRAGMAS: &str = "PRAGMA busy_timeout = 5000;";

/// [`SqlEngine`] over a SQLite file.
pub type SqliteEngine = SqlEngine<SqliteBackend>;

/// Session holder for one SQLite database.
pub struct SqliteBackend {
    path: Utf8PathBuf,
    connection: Option<SqliteConnection>,
}

impl SqliteBackend {
    /// Targets the database file at `path`; nothing is opened yet.
    pub fn new(path: impl Into<Utf8PathBuf>) -> Self {
        Self {
            path: path.into(),
            connection: None,
        }
    }

    /// Database file path, or [`MEMORY_PATH`].
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    fn is_memory(&self) -> bool {
        self.path.as_str() == MEMORY_PATH
    }
}

impl fmt::Debug for SqliteBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteBackend")
            .field("path", &self.path)
            .field("open", &self.connection.is_some())
            .finish()
    }
}

impl SqliteEngine {
    /// Creates an unconnected engine for the file at `path`.
    pub fn open_path(path: impl Into<Utf8PathBuf>) -> Self {
        Self::new(SqliteBackend::new(path))
    }

    /// Creates an unconnected engine over a private in-memory database.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::open_path(MEMORY_PATH)
    }
}

fn ensure_parent_dir(path: &Utf8Path) -> PersistenceResult<()> {
    let Some(parent) = path.parent().filter(|dir| !dir.as_str().is_empty()) else {
        return Ok(());
    };
    Dir::create_ambient_dir_all(parent, ambient_authority()).map_err(PersistenceError::connection)
}

impl SqlBackend for SqliteBackend {
    type Connection = SqliteConnection;

    const KIND: BackendKind = BackendKind::Sqlite;

    fn open(&mut self) -> PersistenceResult<()> {
        if !self.is_memory() {
            ensure_parent_dir(&self.path)?;
        }
        let mut connection =
            SqliteConnection::establish(self.path.as_str()).map_err(PersistenceError::connection)?;
        connection
            .batch_execute(SESSION_PRAGMAS)
            .map_err(PersistenceError::connection)?;
        tracing::debug!(path = %self.path, "opened sqlite database");
        self.connection = Some(connection);
        Ok(())
    }

    fn close(&mut self) {
        self.connection = None;
    }

    fn is_open(&self) -> bool {
        self.connection.is_some()
    }

    fn connection(&mut self) -> PersistenceResult<&mut SqliteConnection> {
        self.connection.as_mut().ok_or(PersistenceError::NotConnected)
    }

    fn reconcile_schema(&mut self) -> PersistenceResult<()> {
        let connection = self.connection()?;
        let version = probe::reconcile(connection)
            .map_err(|err| PersistenceError::query("initialize schema", err))?;
        tracing::debug!(version, "sqlite schema up to date");
        Ok(())
    }
}

impl SqlConnection for SqliteConnection {
    const DIALECT: Dialect = Dialect::Sqlite;

    fn execute_statement(&mut self, statement: &Statement) -> QueryResult<usize> {
        boxed_query::<Sqlite>(Self::DIALECT, statement)?.execute(self)
    }

    fn load_rows<T>(&mut self, statement: &Statement) -> QueryResult<Vec<T>>
    where
        T: QueryableByName<Pg> + QueryableByName<Sqlite> + 'static,
    {
        boxed_query::<Sqlite>(Self::DIALECT, statement)?.load::<T>(self)
    }

    fn execute_script(&mut self, sql: &str) -> QueryResult<()> {
        self.batch_execute(sql)
    }
}

#[cfg(test)]
mod tests;
