//! Port contracts for storage.

mod engine;
mod error;
mod queries;

#[cfg(test)]
pub use engine::MockPersistenceEngine;
pub use engine::{BackendKind, PersistenceEngine};
pub use error::{PersistenceError, PersistenceResult};
pub use queries::{
    LogQuery, MemberFilter, NextTaskCriteria, ProjectFilter, RelationshipQuery, TaskFilter,
    TaskQuery, TaskSortKey,
};
