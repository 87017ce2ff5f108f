//! Filter and sort parameters for list operations.

use crate::domain::{
    LogEntryType, MemberId, MemberPosition, MemberRole, ProjectId, ProjectStatus,
    RelationshipKind, TaskId, TaskPriority,
};

/// Sortable task fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum TaskSortKey {
    /// Task identifier.
    Id,
    /// Title.
    Title,
    /// Status name.
    Status,
    /// Assignee.
    Assignee,
    /// Priority.
    Priority,
    /// Creation time.
    #[default]
    CreatedAt,
    /// Update time.
    UpdatedAt,
    /// Due date.
    DueDate,
    /// Manual ordering index.
    OrderNum,
    /// Owning project.
    ProjectId,
}

impl TaskSortKey {
    /// Every sortable field.
    pub const ALL: [Self; 10] = [
        Self::Id,
        Self::Title,
        Self::Status,
        Self::Assignee,
        Self::Priority,
        Self::CreatedAt,
        Self::UpdatedAt,
        Self::DueDate,
        Self::OrderNum,
        Self::ProjectId,
    ];

    /// Returns the field name accepted by [`Self::parse_or_default`].
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Title => "title",
            Self::Status => "status",
            Self::Assignee => "assignee",
            Self::Priority => "priority",
            Self::CreatedAt => "created_at",
            Self::UpdatedAt => "updated_at",
            Self::DueDate => "due_date",
            Self::OrderNum => "order_num",
            Self::ProjectId => "project_id",
        }
    }

    /// Parses a field name, falling back to newest-first creation order.
    ///
    /// Returns the key and whether the order should be descending.
    #[must_use]
    pub fn parse_or_default(raw: &str) -> (Self, bool) {
        let normalized = raw.trim().to_ascii_lowercase();
        let lookup = if normalized == "task_id" {
            "id"
        } else {
            normalized.as_str()
        };
        Self::ALL
            .into_iter()
            .find(|key| key.as_str() == lookup)
            .map_or_else(
                || {
                    tracing::warn!(sort_key = raw, "unsupported sort key, using created_at");
                    (Self::CreatedAt, true)
                },
                |key| (key, false),
            )
    }
}

/// Equality, exclusion, and tag filters for task listings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFilter {
    /// Only tasks in this status.
    pub status: Option<String>,
    /// Only tasks with this assignee.
    pub assignee: Option<String>,
    /// Only tasks in this project.
    pub project_id: Option<ProjectId>,
    /// Only tasks with this priority.
    pub priority: Option<TaskPriority>,
    /// Skip tasks in this status.
    pub exclude_status: Option<String>,
    /// Only tasks whose tags contain this text.
    pub tag: Option<String>,
}

/// Task listing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskQuery {
    /// Row filters.
    pub filter: TaskFilter,
    /// Sort field.
    pub sort: TaskSortKey,
    /// Sort direction.
    pub descending: bool,
    /// Maximum number of rows.
    pub limit: Option<u32>,
}

impl Default for TaskQuery {
    fn default() -> Self {
        Self {
            filter: TaskFilter::default(),
            sort: TaskSortKey::CreatedAt,
            descending: true,
            limit: None,
        }
    }
}

impl TaskQuery {
    /// Lists every task, newest first.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Replaces the filters.
    #[must_use]
    pub fn with_filter(mut self, filter: TaskFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Sorts by `key` in the given direction.
    #[must_use]
    pub const fn sorted_by(mut self, key: TaskSortKey, descending: bool) -> Self {
        self.sort = key;
        self.descending = descending;
        self
    }

    /// Caps the number of rows.
    #[must_use]
    pub const fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Selection criteria for the next task to work on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NextTaskCriteria {
    /// Only tasks with this assignee.
    pub assignee: Option<String>,
    /// Only tasks in this project.
    pub project_id: Option<ProjectId>,
    /// Statuses that are never returned.
    pub excluded_states: Vec<String>,
}

/// Relationship listing request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelationshipQuery {
    /// Only edges touching this task, on either end.
    pub task_id: Option<TaskId>,
    /// Only edges of this kind.
    pub kind: Option<RelationshipKind>,
}

/// Log listing request. Results are newest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogQuery {
    /// Only entries about this task.
    pub task_id: Option<TaskId>,
    /// Only entries of these types; empty means all.
    pub entry_types: Vec<LogEntryType>,
    /// Only entries with an identifier greater than this.
    pub after_id: Option<i64>,
    /// Maximum number of rows.
    pub limit: Option<u32>,
}

impl LogQuery {
    /// Entries about one task.
    #[must_use]
    pub fn for_task(task_id: TaskId) -> Self {
        Self {
            task_id: Some(task_id),
            ..Self::default()
        }
    }

    /// Restricts the entry types.
    #[must_use]
    pub fn of_types(mut self, entry_types: impl IntoIterator<Item = LogEntryType>) -> Self {
        self.entry_types = entry_types.into_iter().collect();
        self
    }

    /// Keeps only entries newer than `id`.
    #[must_use]
    pub const fn after(mut self, id: i64) -> Self {
        self.after_id = Some(id);
        self
    }

    /// Caps the number of rows.
    #[must_use]
    pub const fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Member listing filters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemberFilter {
    /// Only members with this role.
    pub role: Option<MemberRole>,
    /// Only members in this position.
    pub position: Option<MemberPosition>,
    /// Only direct reports of this leader.
    pub leader_id: Option<MemberId>,
}

/// Project listing filters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectFilter {
    /// Only projects in this status.
    pub status: Option<ProjectStatus>,
    /// Only projects owned by this member.
    pub owner_id: Option<MemberId>,
}
