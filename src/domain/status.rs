//! Task status names.
//!
//! The set of legal statuses is owned by the workflow configuration; this
//! type only guarantees a normalized, non-empty name.

use super::DomainError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Upper-case name of a workflow state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TaskStatus(String);

impl TaskStatus {
    /// Initial state of every new task.
    pub const TODO: &'static str = "TODO";
    /// State entered when work on a task starts.
    pub const READY: &'static str = "READY";
    /// Terminal success state.
    pub const DONE: &'static str = "DONE";
    /// Absorbing state for parked tasks.
    pub const PENDING: &'static str = "PENDING";
    /// Absorbing state for abandoned tasks.
    pub const CANCELED: &'static str = "CANCELED";

    /// Creates a status from text, trimming and upper-casing it.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::EmptyField`] when the value is blank.
    pub fn new(value: &str) -> Result<Self, DomainError> {
        let normalized = value.trim().to_ascii_uppercase();
        if normalized.is_empty() {
            return Err(DomainError::EmptyField { field: "status" });
        }
        Ok(Self(normalized))
    }

    /// Returns the `TODO` status.
    #[must_use]
    pub fn todo() -> Self {
        Self(Self::TODO.to_owned())
    }

    /// Returns the `READY` status.
    #[must_use]
    pub fn ready() -> Self {
        Self(Self::READY.to_owned())
    }

    /// Returns the `DONE` status.
    #[must_use]
    pub fn done() -> Self {
        Self(Self::DONE.to_owned())
    }

    /// Returns the status name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` when this status has the given name.
    #[must_use]
    pub fn is(&self, name: &str) -> bool {
        self.0 == name
    }

    /// Returns `true` for the terminal `DONE` status.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.is(Self::DONE)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for TaskStatus {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<TaskStatus> for String {
    fn from(value: TaskStatus) -> Self {
        value.0
    }
}
