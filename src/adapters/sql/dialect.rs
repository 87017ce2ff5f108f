//! Engine-specific rendering of [`Statement`]s and error classification.

use super::{SqlValue, Statement};
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use thiserror::Error;

/// SQL flavour of a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    /// `?` placeholders, `task_id` task key.
    Sqlite,
    /// `$n` placeholders, `id` task key, typed casts for timestamps and JSON.
    Postgres,
}

/// Failure to turn a statement into engine syntax.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RenderError {
    /// A `{token}` has no physical name.
    #[error("unknown identifier token {{{0}}}")]
    UnknownIdentifier(String),
    /// A `{token}` was never closed.
    #[error("unterminated identifier token in: {0}")]
    UnterminatedToken(String),
    /// A `:name` has no bound value.
    #[error("no value bound for parameter :{0}")]
    MissingParameter(String),
}

/// Statement text and values in placeholder order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedStatement {
    /// Engine SQL.
    pub sql: String,
    /// One value per placeholder.
    pub values: Vec<SqlValue>,
}

/// How a failed statement should be handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// A unique key already holds the value.
    UniqueViolation,
    /// A table or column the statement needs is missing.
    SchemaDrift,
    /// An earlier failure left the transaction unusable.
    TransactionAborted,
    /// Anything else.
    Other,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Quote {
    None,
    Single,
    Double,
}

impl Dialect {
    /// Physical name of the task key column.
    #[must_use]
    pub const fn task_key(self) -> &'static str {
        match self {
            Self::Sqlite => "task_id",
            Self::Postgres => "id",
        }
    }

    /// Physical name of the relationship table.
    #[must_use]
    pub const fn relationships_table(self) -> &'static str {
        match self {
            Self::Sqlite => "task_relationships",
            Self::Postgres => "task_relations",
        }
    }

    fn identifier(self, token: &str) -> Option<&'static str> {
        match token {
            "tasks.key" => Some(self.task_key()),
            "relationships" => Some(self.relationships_table()),
            _ => None,
        }
    }

    fn placeholder(self, position: usize, value: &SqlValue) -> String {
        match self {
            Self::Sqlite => "?".to_owned(),
            Self::Postgres => match value {
                SqlValue::Timestamp(_) => format!("CAST(${position} AS TIMESTAMPTZ)"),
                SqlValue::Json(_) => format!("CAST(${position} AS JSONB)"),
                SqlValue::Text(_) | SqlValue::BigInt(_) | SqlValue::Bool(_) => format!("${position}"),
            },
        }
    }

    /// Renders `statement` into engine SQL.
    ///
    /// Quoted literals and identifiers are copied untouched, and `::` casts
    /// are not parameters.
    ///
    /// # Errors
    ///
    /// Returns a [`RenderError`] for unknown tokens or unbound parameters.
    pub fn render(self, statement: &Statement) -> Result<RenderedStatement, RenderError> {
        let source = statement.sql();
        let mut sql = String::with_capacity(source.len() + 16);
        let mut values = Vec::new();
        let mut quote = Quote::None;
        let mut chars = source.chars().peekable();

        while let Some(current) = chars.next() {
            match (quote, current) {
                (Quote::Single, '\'') | (Quote::Double, '"') => {
                    quote = Quote::None;
                    sql.push(current);
                }
                (Quote::Single | Quote::Double, _) => sql.push(current),
                (Quote::None, '\'') => {
                    quote = Quote::Single;
                    sql.push(current);
                }
                (Quote::None, '"') => {
                    quote = Quote::Double;
                    sql.push(current);
                }
                (Quote::None, '{') => {
                    let mut token = String::new();
                    let mut closed = false;
                    for next in chars.by_ref() {
                        if next == '}' {
                            closed = true;
                            break;
                        }
                        token.push(next);
                    }
                    if !closed {
                        return Err(RenderError::UnterminatedToken(source.to_owned()));
                    }
                    let physical = self
                        .identifier(&token)
                        .ok_or(RenderError::UnknownIdentifier(token))?;
                    sql.push_str(physical);
                }
                (Quote::None, ':') => match chars.peek() {
                    Some(':') => {
                        sql.push_str("::");
                        chars.next();
                    }
                    Some(next) if next.is_ascii_alphabetic() || *next == '_' => {
                        let mut name = String::new();
                        while let Some(next_char) =
                            chars.next_if(|candidate| candidate.is_ascii_alphanumeric() || *candidate == '_')
                        {
                            name.push(next_char);
                        }
                        let value = statement
                            .param(&name)
                            .ok_or(RenderError::MissingParameter(name))?;
                        values.push(value.clone());
                        sql.push_str(&self.placeholder(values.len(), value));
                    }
                    _ => sql.push(current),
                },
                (Quote::None, _) => sql.push(current),
            }
        }

        Ok(RenderedStatement { sql, values })
    }

    /// Decides how a failed statement should be handled.
    #[must_use]
    pub fn classify(self, error: &DieselError) -> FailureKind {
        let DieselError::DatabaseError(kind, info) = error else {
            return FailureKind::Other;
        };
        if matches!(kind, DatabaseErrorKind::UniqueViolation) {
            return FailureKind::UniqueViolation;
        }
        let message = info.message().to_ascii_lowercase();
        match self {
            Self::Sqlite => {
                if message.contains("no such column")
                    || message.contains("no such table")
                    || message.contains("has no column named")
                {
                    FailureKind::SchemaDrift
                } else {
                    FailureKind::Other
                }
            }
            Self::Postgres => {
                if message.contains("current transaction is aborted") {
                    FailureKind::TransactionAborted
                } else if message.contains("does not exist")
                    && (message.starts_with("column") || message.starts_with("relation"))
                {
                    FailureKind::SchemaDrift
                } else {
                    FailureKind::Other
                }
            }
        }
    }

    /// Whether any failed statement poisons the open transaction.
    #[must_use]
    pub const fn failure_aborts_transaction(self) -> bool {
        matches!(self, Self::Postgres)
    }
}
