//! Per-test schemas on an external `PostgreSQL` server.

use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::sql_types::{BigInt, Text};
use rstest::fixture;
use tracline::adapters::postgres::PostgresEngine;
use tracline::ports::PersistenceEngine;

/// Variable naming the server used by these tests.
pub const POSTGRES_URL_VAR: &str = "TRACLINE_TEST_POSTGRES_URL";

/// A connected engine confined to a throwaway schema.
pub struct PostgresStore {
    base_url: String,
    schema: String,
    /// Connection string that selects the schema.
    pub url: String,
    /// Connected engine.
    pub engine: PostgresEngine,
}

impl Drop for PostgresStore {
    fn drop(&mut self) {
        if let Err(err) = self.engine.disconnect() {
            tracing::warn!(error = %err, "disconnect after test failed");
        }
        let statement = format!("DROP SCHEMA IF EXISTS \"{}\" CASCADE", self.schema);
        match PgConnection::establish(&self.base_url) {
            Ok(mut conn) => {
                if let Err(err) = conn.batch_execute(&statement) {
                    tracing::warn!(schema = %self.schema, error = %err, "test schema was not dropped");
                }
            }
            Err(err) => tracing::warn!(schema = %self.schema, error = %err, "test schema was not dropped"),
        }
    }
}

/// Appends a `search_path` option to a URI or key/value connection string.
pub fn with_search_path(base: &str, schema: &str) -> String {
    if base.starts_with("postgres://") || base.starts_with("postgresql://") {
        let separator = if base.contains('?') { '&' } else { '?' };
        format!("{base}{separator}options=-csearch_path%3D{schema}")
    } else {
        format!("{base} options='-csearch_path={schema}'")
    }
}

/// Provides a connected engine in a fresh schema, or `None` when no server
/// is configured.
#[fixture]
pub fn postgres_store() -> Option<PostgresStore> {
    let base_url = std::env::var(POSTGRES_URL_VAR).ok()?;
    let schema = format!("tracline_test_{}", uuid::Uuid::new_v4().simple());
    PgConnection::establish(&base_url)
        .expect("test server should accept connections")
        .batch_execute(&format!("CREATE SCHEMA \"{schema}\""))
        .expect("test schema should be created");
    let url = with_search_path(&base_url, &schema);
    let mut engine = PostgresEngine::with_url(url.clone());
    engine.connect().expect("postgres store should connect");
    Some(PostgresStore {
        base_url,
        schema,
        url,
        engine,
    })
}

/// Opens a connection that bypasses the engine; `url` is a store's
/// [`PostgresStore::url`].
pub fn raw_connection(url: &str) -> PgConnection {
    PgConnection::establish(url).expect("raw connection")
}

#[derive(QueryableByName)]
struct Count {
    #[diesel(sql_type = BigInt)]
    value: i64,
}

/// Reports whether `table` in the schema selected by `url` currently has
/// `column`.
pub fn has_column(url: &str, table: &str, column: &str) -> bool {
    let rows: Vec<Count> = diesel::sql_query(
        "SELECT COUNT(*) AS value FROM information_schema.columns \
         WHERE table_schema = current_schema() AND table_name = $1 AND column_name = $2",
    )
    .bind::<Text, _>(table)
    .bind::<Text, _>(column)
    .load(&mut raw_connection(url))
    .expect("column inventory");
    rows.first().is_some_and(|row| row.value > 0)
}
