//! Append-only audit records.

use super::{DomainError, TaskId, TaskStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Arrow used between the old and new state in status-change messages.
pub const STATUS_ARROW: &str = "→";

/// Severity of a log entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    /// Routine information.
    #[default]
    Info,
    /// Something worth attention.
    Warning,
    /// A failure.
    Error,
    /// Diagnostic detail.
    Debug,
}

impl LogLevel {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
            Self::Debug => "DEBUG",
        }
    }
}

impl TryFrom<&str> for LogLevel {
    type Error = DomainError;

    fn try_from(value: &str) -> Result<Self, DomainError> {
        match value.trim().to_ascii_uppercase().as_str() {
            "INFO" => Ok(Self::Info),
            "WARNING" | "WARN" => Ok(Self::Warning),
            "ERROR" => Ok(Self::Error),
            "DEBUG" => Ok(Self::Debug),
            _ => Err(DomainError::unknown("log level", value)),
        }
    }
}

/// Kind of event a log entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogEntryType {
    /// A task was created.
    TaskCreated,
    /// Task fields were edited.
    TaskUpdated,
    /// A task was deleted.
    TaskDeleted,
    /// A task changed status.
    StatusChanged,
    /// A task changed assignee.
    AssigneeChanged,
    /// A file was attached.
    FileAdded,
    /// A file was detached.
    FileRemoved,
    /// Two tasks were linked.
    RelationshipCreated,
    /// A link between two tasks was removed.
    RelationshipDeleted,
    /// A person recorded an action.
    UserAction,
    /// A person recorded work on a task.
    Work,
    /// An issue-tracker synchronization ran.
    GithubSync,
    /// An issue was opened in the tracker.
    GithubIssueCreated,
    /// An issue was updated in the tracker.
    GithubIssueUpdated,
    /// Internal system event.
    System,
}

impl LogEntryType {
    /// Every entry type, in declaration order.
    pub const ALL: [Self; 15] = [
        Self::TaskCreated,
        Self::TaskUpdated,
        Self::TaskDeleted,
        Self::StatusChanged,
        Self::AssigneeChanged,
        Self::FileAdded,
        Self::FileRemoved,
        Self::RelationshipCreated,
        Self::RelationshipDeleted,
        Self::UserAction,
        Self::Work,
        Self::GithubSync,
        Self::GithubIssueCreated,
        Self::GithubIssueUpdated,
        Self::System,
    ];

    /// Entry types that count as evidence of work for strict mode.
    pub const EVIDENCE: [Self; 2] = [Self::Work, Self::UserAction];

    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TaskCreated => "task_created",
            Self::TaskUpdated => "task_updated",
            Self::TaskDeleted => "task_deleted",
            Self::StatusChanged => "status_changed",
            Self::AssigneeChanged => "assignee_changed",
            Self::FileAdded => "file_added",
            Self::FileRemoved => "file_removed",
            Self::RelationshipCreated => "relationship_created",
            Self::RelationshipDeleted => "relationship_deleted",
            Self::UserAction => "user_action",
            Self::Work => "work",
            Self::GithubSync => "github_sync",
            Self::GithubIssueCreated => "github_issue_created",
            Self::GithubIssueUpdated => "github_issue_updated",
            Self::System => "system",
        }
    }
}

impl fmt::Display for LogEntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for LogEntryType {
    type Error = DomainError;

    fn try_from(value: &str) -> Result<Self, DomainError> {
        let normalized = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|entry_type| entry_type.as_str() == normalized)
            .ok_or_else(|| DomainError::unknown("log entry type", value))
    }
}

/// Log entry waiting to be appended.
#[derive(Debug, Clone, PartialEq)]
pub struct NewLogEntry {
    /// Event time.
    pub timestamp: DateTime<Utc>,
    /// Severity.
    pub level: LogLevel,
    /// Event kind.
    pub entry_type: LogEntryType,
    /// Human-readable message.
    pub message: String,
    /// Task the entry is about, if any.
    pub task_id: Option<TaskId>,
    /// Acting user, if known.
    pub user: Option<String>,
    /// Structured details.
    pub metadata: Map<String, Value>,
}

impl NewLogEntry {
    /// Creates an `INFO` entry with empty metadata.
    #[must_use]
    pub fn new(entry_type: LogEntryType, message: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            level: LogLevel::Info,
            entry_type,
            message: message.into(),
            task_id: None,
            user: None,
            metadata: Map::new(),
        }
    }

    /// Creates the entry recorded for every status transition.
    #[must_use]
    pub fn status_change(
        task_id: &TaskId,
        old_state: &TaskStatus,
        new_state: &TaskStatus,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self::new(
            LogEntryType::StatusChanged,
            format!("Status changed: {old_state} {STATUS_ARROW} {new_state}"),
            timestamp,
        )
        .for_task(task_id.clone())
        .with_metadata("old_state", Value::from(old_state.as_str()))
        .with_metadata("new_state", Value::from(new_state.as_str()))
    }

    /// Attaches the entry to a task.
    #[must_use]
    pub fn for_task(mut self, task_id: TaskId) -> Self {
        self.task_id = Some(task_id);
        self
    }

    /// Records the acting user.
    #[must_use]
    pub fn by_user(mut self, user: Option<String>) -> Self {
        self.user = user;
        self
    }

    /// Overrides the severity.
    #[must_use]
    pub const fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    /// Adds one metadata field.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

/// Stored audit record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Storage-assigned, monotonically increasing identifier.
    pub id: i64,
    /// Event time.
    pub timestamp: DateTime<Utc>,
    /// Severity.
    pub level: LogLevel,
    /// Event kind.
    pub entry_type: LogEntryType,
    /// Human-readable message.
    pub message: String,
    /// Task the entry is about, if any.
    pub task_id: Option<TaskId>,
    /// Acting user, if known.
    pub user: Option<String>,
    /// Structured details.
    pub metadata: Map<String, Value>,
}

impl LogEntry {
    /// Splits a status-change message into its old and new state names.
    #[must_use]
    pub fn status_change_states(&self) -> Option<(&str, &str)> {
        if self.entry_type != LogEntryType::StatusChanged {
            return None;
        }
        let body = self
            .message
            .split_once(':')
            .map_or(self.message.as_str(), |(_, rest)| rest);
        let (old_state, new_state) = body.split_once(STATUS_ARROW)?;
        Some((old_state.trim(), new_state.trim()))
    }
}
