//! Error types for entity validation and parsing.

use thiserror::Error;

/// Errors returned while constructing or parsing domain values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DomainError {
    /// An identifier was empty after trimming.
    #[error("{kind} identifier must not be empty")]
    EmptyIdentifier {
        /// Identifier kind, for example `task`.
        kind: &'static str,
    },

    /// A required display name or title was empty after trimming.
    #[error("{field} must not be empty")]
    EmptyField {
        /// Name of the offending field.
        field: &'static str,
    },

    /// The priority lies outside the supported range.
    #[error("invalid priority {0}, expected a value between 1 and 5")]
    InvalidPriority(i64),

    /// A relationship would connect a task to itself.
    #[error("task {0} cannot be related to itself")]
    SelfRelationship(String),

    /// A file association path was empty.
    #[error("file path must not be empty")]
    EmptyFilePath,

    /// A stored file association path must be absolute.
    #[error("file path '{0}' must be absolute")]
    RelativeFilePath(String),

    /// A textual value did not match any variant of a closed set.
    #[error("unknown {kind}: {value}")]
    UnknownValue {
        /// Kind of value being parsed, for example `relationship kind`.
        kind: &'static str,
        /// Rejected raw value.
        value: String,
    },
}

impl DomainError {
    pub(crate) fn unknown(kind: &'static str, value: &str) -> Self {
        Self::UnknownValue {
            kind,
            value: value.to_owned(),
        }
    }
}
