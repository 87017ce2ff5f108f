//! Shared SQL machinery for the relational backends.
//!
//! Statements are written once with `:name` parameters and `{token}`
//! identifiers, rendered per [`Dialect`], and executed through Diesel's
//! `sql_query` on whichever connection the backend holds. The schema is
//! described declaratively so both backends can create, inspect and patch
//! it the same way.

mod connection;
mod convert;
mod dialect;
mod engine;
mod migrations;
mod rows;
mod schema;
mod statement;

pub use connection::SqlConnection;
pub(crate) use connection::boxed_query;
pub use dialect::{Dialect, FailureKind, RenderError, RenderedStatement};
pub use engine::{SqlBackend, SqlEngine};
pub use migrations::{CURRENT_SCHEMA_VERSION, MIGRATIONS, Migration, apply_pending, read_version, write_version};
pub(crate) use rows::ColumnNameRow;
pub use schema::{
    ColumnInventory, ColumnSpec, INDEXES, IndexSpec, KeySpec, TABLES, TableSpec,
    add_missing_columns, create_indexes, create_tables, table,
};
pub(crate) use statement::{Conditions, like_contains};
pub use statement::{SqlValue, Statement, format_timestamp};

#[cfg(test)]
mod tests;
