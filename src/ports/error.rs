//! Errors raised by persistence engines.

use std::sync::Arc;
use thiserror::Error;

/// Errors returned by [`super::PersistenceEngine`] implementations.
///
/// Missing entities are not errors: reads return `None` and writes return
/// `false`.
#[derive(Debug, Clone, Error)]
pub enum PersistenceError {
    /// An operation ran before `connect` succeeded.
    #[error("persistence engine is not connected")]
    NotConnected,

    /// Establishing the session failed.
    #[error("connection failed: {0}")]
    Connection(Arc<dyn std::error::Error + Send + Sync>),

    /// A unique key already holds this value.
    #[error("{operation} rejected: already exists ({detail})")]
    AlreadyExists {
        /// Operation that hit the constraint.
        operation: &'static str,
        /// Message reported by the database.
        detail: String,
    },

    /// `begin` was called with a transaction already open.
    #[error("a transaction is already open; nested transactions are not supported")]
    NestedTransaction,

    /// The session's transaction was aborted.
    ///
    /// Inside a caller's transaction everything written since `begin` was
    /// rolled back and must be replayed; outside one the single retry
    /// failed.
    #[error("{operation} aborted the transaction: {source}")]
    TransactionAborted {
        /// Operation that hit the abort.
        operation: &'static str,
        /// Failure that ended the transaction.
        source: Arc<dyn std::error::Error + Send + Sync>,
    },

    /// Missing structure could not be repaired.
    #[error("schema reconciliation failed: {0}")]
    SchemaDrift(Arc<dyn std::error::Error + Send + Sync>),

    /// A statement failed.
    #[error("{operation} failed: {source}")]
    Query {
        /// Operation that failed.
        operation: &'static str,
        /// Underlying failure.
        source: Arc<dyn std::error::Error + Send + Sync>,
    },

    /// A stored row could not be mapped to an entity.
    #[error("invalid persisted data: {0}")]
    InvalidData(String),

    /// The configured engine type is not supported.
    #[error("unsupported database engine: {0}")]
    UnsupportedEngine(String),
}

impl PersistenceError {
    /// Wraps a connection failure.
    pub fn connection(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Connection(Arc::new(err))
    }

    /// Wraps a statement failure for `operation`.
    pub fn query(operation: &'static str, err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Query {
            operation,
            source: Arc::new(err),
        }
    }

    /// Wraps a failed schema repair.
    pub fn schema_drift(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::SchemaDrift(Arc::new(err))
    }

    /// Returns `true` for unique-key violations.
    #[must_use]
    pub const fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists { .. })
    }
}

/// Result type for persistence engine operations.
pub type PersistenceResult<T> = Result<T, PersistenceError>;
