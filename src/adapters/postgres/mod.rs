//! Client/server backend on `PostgreSQL`.
//!
//! The task key column is physically `id` and relationships live in
//! `task_relations`. Sessions run in UTC. Schema work happens on a
//! separate autocommit connection, see [`reconciler`].

mod reconciler;

use crate::adapters::sql::{Dialect, SqlBackend, SqlConnection, SqlEngine, Statement, boxed_query};
use crate::ports::{BackendKind, PersistenceError, PersistenceResult};
use diesel::connection::SimpleConnection;
use diesel::deserialize::QueryableByName;
use diesel::pg::Pg;
use diesel::prelude::*;
use diesel::result::QueryResult;
use diesel::sqlite::Sqlite;
use std::fmt;

const SESSION_SETUP: &str = "SET TIME ZONE 'UTC'";

/// [`SqlEngine`] over a `PostgreSQL` database.
pub type PostgresEngine = SqlEngine<PostgresBackend>;

/// Session holder for one `PostgreSQL` database.
pub struct PostgresBackend {
    url: String,
    connection: Option<PgConnection>,
}

impl PostgresBackend {
    /// Targets the database at `url` (a libpq URI or key/value string).
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            connection: None,
        }
    }
}

impl fmt::Debug for PostgresBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostgresBackend")
            .field("open", &self.connection.is_some())
            .finish_non_exhaustive()
    }
}

impl PostgresEngine {
    /// Creates an unconnected engine for the database at `url`.
    pub fn with_url(url: impl Into<String>) -> Self {
        Self::new(PostgresBackend::new(url))
    }
}

fn establish(url: &str, setup: &str) -> PersistenceResult<PgConnection> {
    let mut connection = PgConnection::establish(url).map_err(PersistenceError::connection)?;
    connection
        .batch_execute(setup)
        .map_err(PersistenceError::connection)?;
    Ok(connection)
}

impl SqlBackend for PostgresBackend {
    type Connection = PgConnection;

    const KIND: BackendKind = BackendKind::Postgres;

    fn open(&mut self) -> PersistenceResult<()> {
        self.connection = Some(establish(&self.url, SESSION_SETUP)?);
        tracing::debug!("opened postgresql session");
        Ok(())
    }

    fn close(&mut self) {
        self.connection = None;
    }

    fn is_open(&self) -> bool {
        self.connection.is_some()
    }

    fn connection(&mut self) -> PersistenceResult<&mut PgConnection> {
        self.connection.as_mut().ok_or(PersistenceError::NotConnected)
    }

    fn reconcile_schema(&mut self) -> PersistenceResult<()> {
        if self.connection.is_none() {
            return Err(PersistenceError::NotConnected);
        }
        let mut side = establish(&self.url, reconciler::SIDE_SESSION_SETUP)?;
        let version = reconciler::reconcile(&mut side)
            .map_err(|err| PersistenceError::query("initialize schema", err))?;
        tracing::debug!(version, "postgresql schema up to date");
        Ok(())
    }
}

impl SqlConnection for PgConnection {
    const DIALECT: Dialect = Dialect::Postgres;

    fn execute_statement(&mut self, statement: &Statement) -> QueryResult<usize> {
        boxed_query::<Pg>(Self::DIALECT, statement)?.execute(self)
    }

    fn load_rows<T>(&mut self, statement: &Statement) -> QueryResult<Vec<T>>
    where
        T: QueryableByName<Pg> + QueryableByName<Sqlite> + 'static,
    {
        boxed_query::<Pg>(Self::DIALECT, statement)?.load::<T>(self)
    }

    fn execute_script(&mut self, sql: &str) -> QueryResult<()> {
        self.batch_execute(sql)
    }
}
