//! Directed edges between tasks.

use super::{DomainError, TaskId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed set of edge kinds between two tasks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RelationshipKind {
    /// Hierarchical decomposition.
    #[default]
    ParentChild,
    /// The parent blocks the child.
    Blocks,
    /// Loose association.
    Related,
    /// The child duplicates the parent.
    Duplicate,
    /// Pipeline stage: requirement to design.
    RequirementDesign,
    /// Pipeline stage: design to implementation.
    DesignImplementation,
    /// Pipeline stage: implementation to test.
    ImplementationTest,
}

impl RelationshipKind {
    /// Every kind, in declaration order.
    pub const ALL: [Self; 7] = [
        Self::ParentChild,
        Self::Blocks,
        Self::Related,
        Self::Duplicate,
        Self::RequirementDesign,
        Self::DesignImplementation,
        Self::ImplementationTest,
    ];

    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ParentChild => "parent-child",
            Self::Blocks => "blocks",
            Self::Related => "related",
            Self::Duplicate => "duplicate",
            Self::RequirementDesign => "requirement-design",
            Self::DesignImplementation => "design-implementation",
            Self::ImplementationTest => "implementation-test",
        }
    }
}

impl fmt::Display for RelationshipKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for RelationshipKind {
    type Error = DomainError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase().replace('_', "-");
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| DomainError::unknown("relationship kind", value))
    }
}

/// Validated request to connect two tasks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRelationship {
    parent_id: TaskId,
    child_id: TaskId,
    kind: RelationshipKind,
    created_by: Option<String>,
}

impl NewRelationship {
    /// Creates a relationship request.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::SelfRelationship`] when both ends are the same
    /// task.
    pub fn new(
        parent_id: TaskId,
        child_id: TaskId,
        kind: RelationshipKind,
    ) -> Result<Self, DomainError> {
        if parent_id == child_id {
            return Err(DomainError::SelfRelationship(parent_id.into()));
        }
        Ok(Self {
            parent_id,
            child_id,
            kind,
            created_by: None,
        })
    }

    /// Records who created the edge.
    #[must_use]
    pub fn with_created_by(mut self, created_by: impl Into<String>) -> Self {
        self.created_by = Some(created_by.into());
        self
    }

    /// Returns the parent task.
    #[must_use]
    pub const fn parent_id(&self) -> &TaskId {
        &self.parent_id
    }

    /// Returns the child task.
    #[must_use]
    pub const fn child_id(&self) -> &TaskId {
        &self.child_id
    }

    /// Returns the edge kind.
    #[must_use]
    pub const fn kind(&self) -> RelationshipKind {
        self.kind
    }

    /// Returns the creator, if recorded.
    #[must_use]
    pub fn created_by(&self) -> Option<&str> {
        self.created_by.as_deref()
    }
}

/// Stored relationship between two tasks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRelationship {
    /// Storage-assigned identifier.
    pub id: i64,
    /// Parent task.
    pub parent_id: TaskId,
    /// Child task.
    pub child_id: TaskId,
    /// Edge kind.
    pub kind: RelationshipKind,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Creator, if recorded.
    pub created_by: Option<String>,
}
