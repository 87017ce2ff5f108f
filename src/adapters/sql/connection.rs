//! Execution seam between rendered statements and Diesel connections.

use super::{Dialect, RenderError, SqlValue, Statement};
use diesel::backend::Backend;
use diesel::deserialize::QueryableByName;
use diesel::pg::Pg;
use diesel::query_builder::{BoxedSqlQuery, SqlQuery};
use diesel::result::{Error as DieselError, QueryResult};
use diesel::serialize::ToSql;
use diesel::sql_types::{BigInt, Bool, HasSqlType, Nullable, Text};
use diesel::sqlite::Sqlite;

/// A Diesel connection that can run [`Statement`]s.
///
/// Implemented for `SqliteConnection` and `PgConnection` in their backend
/// modules. Row types are plain `QueryableByName` structs that decode on
/// either backend.
pub trait SqlConnection {
    /// SQL flavour spoken by this connection.
    const DIALECT: Dialect;

    /// Runs a statement and returns the number of affected rows.
    ///
    /// # Errors
    ///
    /// Returns the Diesel error reported by the database, or
    /// [`DieselError::QueryBuilderError`] when the statement cannot be
    /// rendered.
    fn execute_statement(&mut self, statement: &Statement) -> QueryResult<usize>;

    /// Runs a query and decodes every row.
    ///
    /// # Errors
    ///
    /// Returns the Diesel error reported by the database, or a decoding
    /// error when a column does not match `T`.
    fn load_rows<T>(&mut self, statement: &Statement) -> QueryResult<Vec<T>>
    where
        T: QueryableByName<Pg> + QueryableByName<Sqlite> + 'static;

    /// Runs parameterless SQL, possibly several `;`-separated statements.
    ///
    /// # Errors
    ///
    /// Returns the Diesel error reported by the database.
    fn execute_script(&mut self, sql: &str) -> QueryResult<()>;
}

/// Renders `statement` for `DB` and binds its values in placeholder order.
///
/// Timestamps and JSON travel as text; the PostgreSQL rendering casts them
/// back at the placeholder.
pub(crate) fn boxed_query<DB>(
    dialect: Dialect,
    statement: &Statement,
) -> QueryResult<BoxedSqlQuery<'static, DB, SqlQuery>>
where
    DB: Backend + HasSqlType<Text> + HasSqlType<BigInt> + HasSqlType<Bool>,
    Option<String>: ToSql<Nullable<Text>, DB>,
    Option<i64>: ToSql<Nullable<BigInt>, DB>,
    Option<bool>: ToSql<Nullable<Bool>, DB>,
{
    let rendered = dialect.render(statement).map_err(render_failure)?;
    let query = diesel::sql_query(rendered.sql).into_boxed::<DB>();
    Ok(rendered.values.into_iter().fold(query, |acc, value| match value {
        SqlValue::Text(text) | SqlValue::Timestamp(text) | SqlValue::Json(text) => {
            acc.bind::<Nullable<Text>, _>(text)
        }
        SqlValue::BigInt(number) => acc.bind::<Nullable<BigInt>, _>(number),
        SqlValue::Bool(flag) => acc.bind::<Nullable<Bool>, _>(flag),
    }))
}

fn render_failure(err: RenderError) -> DieselError {
    DieselError::QueryBuilderError(Box::new(err))
}
