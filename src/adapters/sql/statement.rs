//! Backend-neutral SQL statements.
//!
//! Statement text uses `:name` for parameters and `{token}` for physical
//! identifiers that differ between engines (for example `{tasks.key}`).
//! [`super::Dialect::render`] turns both into engine syntax.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};

/// A typed, nullable parameter value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlValue {
    /// Text.
    Text(Option<String>),
    /// 64-bit integer.
    BigInt(Option<i64>),
    /// Boolean.
    Bool(Option<bool>),
    /// UTC instant, carried as RFC 3339 text.
    Timestamp(Option<String>),
    /// JSON document, carried as text.
    Json(Option<String>),
}

impl SqlValue {
    /// Non-null text.
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(Some(value.into()))
    }

    /// Nullable text.
    pub fn opt_text<S: AsRef<str>>(value: Option<S>) -> Self {
        Self::Text(value.map(|text| text.as_ref().to_owned()))
    }

    /// Non-null integer.
    #[must_use]
    pub const fn big_int(value: i64) -> Self {
        Self::BigInt(Some(value))
    }

    /// Nullable integer.
    #[must_use]
    pub const fn opt_big_int(value: Option<i64>) -> Self {
        Self::BigInt(value)
    }

    /// Non-null boolean.
    #[must_use]
    pub const fn boolean(value: bool) -> Self {
        Self::Bool(Some(value))
    }

    /// Non-null timestamp.
    #[must_use]
    pub fn timestamp(value: DateTime<Utc>) -> Self {
        Self::Timestamp(Some(format_timestamp(value)))
    }

    /// Nullable timestamp.
    #[must_use]
    pub fn opt_timestamp(value: Option<DateTime<Utc>>) -> Self {
        Self::Timestamp(value.map(format_timestamp))
    }

    /// JSON object.
    #[must_use]
    pub fn json_object(value: &Map<String, Value>) -> Self {
        Self::Json(Some(Value::Object(value.clone()).to_string()))
    }
}

/// Formats an instant the way both backends store and sort it.
#[must_use]
pub fn format_timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// SQL text with named parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    sql: String,
    params: Vec<(String, SqlValue)>,
}

impl Statement {
    /// Creates a statement without parameters.
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    /// Binds `value` to every `:name` occurrence.
    #[must_use]
    pub fn bind(mut self, name: impl Into<String>, value: SqlValue) -> Self {
        let key = name.into();
        if let Some(slot) = self.params.iter_mut().find(|(existing, _)| *existing == key) {
            slot.1 = value;
        } else {
            self.params.push((key, value));
        }
        self
    }

    /// Returns the statement text.
    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Returns the value bound to `name`.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&SqlValue> {
        self.params
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, value)| value)
    }
}

/// Accumulates `AND`-joined conditions and their parameters.
#[derive(Debug, Default)]
pub(crate) struct Conditions {
    clauses: Vec<String>,
    params: Vec<(String, SqlValue)>,
}

impl Conditions {
    pub(crate) fn push(&mut self, clause: impl Into<String>) {
        self.clauses.push(clause.into());
    }

    pub(crate) fn push_bound(&mut self, clause: impl Into<String>, name: impl Into<String>, value: SqlValue) {
        self.clauses.push(clause.into());
        self.params.push((name.into(), value));
    }

    pub(crate) fn bind(&mut self, name: impl Into<String>, value: SqlValue) {
        self.params.push((name.into(), value));
    }

    /// Returns ` WHERE a AND b`, or nothing when empty.
    pub(crate) fn where_clause(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.clauses.join(" AND "))
        }
    }

    pub(crate) fn apply(self, statement: Statement) -> Statement {
        self.params
            .into_iter()
            .fold(statement, |acc, (name, value)| acc.bind(name, value))
    }
}

/// Escapes `LIKE` wildcards so `value` matches literally; pairs with
/// `ESCAPE '\'`.
pub(crate) fn like_contains(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len() + 2);
    escaped.push('%');
    for character in value.chars() {
        if matches!(character, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(character);
    }
    escaped.push('%');
    escaped
}
