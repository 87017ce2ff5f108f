//! Task aggregate and its creation parameters.

use super::{DomainError, ProjectId, TaskId, TaskStatus, required_text};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};

/// Task priority from 1 (lowest) to 5 (highest).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskPriority(u8);

impl TaskPriority {
    /// Lowest priority.
    pub const LOWEST: Self = Self(1);
    /// Low priority.
    pub const LOW: Self = Self(2);
    /// Medium priority, used when none is given.
    pub const MEDIUM: Self = Self(3);
    /// High priority.
    pub const HIGH: Self = Self(4);
    /// Highest priority.
    pub const HIGHEST: Self = Self(5);

    /// Creates a validated priority.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidPriority`] outside `1..=5`.
    pub fn new(value: i64) -> Result<Self, DomainError> {
        u8::try_from(value)
            .ok()
            .filter(|candidate| (1..=5).contains(candidate))
            .map(Self)
            .ok_or(DomainError::InvalidPriority(value))
    }

    /// Reads a stored priority, clamping values written by older tools.
    #[must_use]
    pub fn from_persisted(value: i64) -> Self {
        let clamped = value.clamp(1, 5);
        u8::try_from(clamped).map_or(Self::MEDIUM, Self)
    }

    /// Returns the numeric value.
    #[must_use]
    pub const fn value(self) -> u8 {
        self.0
    }
}

impl Default for TaskPriority {
    fn default() -> Self {
        Self::MEDIUM
    }
}

/// Linkage of a task to a record in an external tracker.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalLink {
    /// Identifier in the external system.
    pub external_id: Option<String>,
    /// URL of the external record.
    pub external_url: Option<String>,
    /// Free-form synchronization marker.
    pub sync_status: Option<String>,
}

/// Trims, drops blanks, and de-duplicates tags while keeping their order.
#[must_use]
pub fn normalize_tags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut normalized: Vec<String> = Vec::new();
    for tag in tags {
        let trimmed = tag.as_ref().trim();
        if !trimmed.is_empty() && !normalized.iter().any(|existing| existing == trimmed) {
            normalized.push(trimmed.to_owned());
        }
    }
    normalized
}

/// Parameters for creating a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    id: TaskId,
    title: String,
    description: Option<String>,
    assignee: Option<String>,
    priority: Option<TaskPriority>,
    project_id: Option<ProjectId>,
    tags: Vec<String>,
    due_date: Option<DateTime<Utc>>,
}

impl NewTask {
    /// Starts a creation request with the mandatory fields.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::EmptyField`] when the title is blank.
    pub fn new(id: TaskId, title: impl Into<String>) -> Result<Self, DomainError> {
        Ok(Self {
            id,
            title: required_text(&title.into(), "title")?,
            description: None,
            assignee: None,
            priority: None,
            project_id: None,
            tags: Vec::new(),
            due_date: None,
        })
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the assignee.
    #[must_use]
    pub fn with_assignee(mut self, assignee: impl Into<String>) -> Self {
        self.assignee = Some(assignee.into());
        self
    }

    /// Sets the priority.
    #[must_use]
    pub const fn with_priority(mut self, priority: TaskPriority) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Sets the owning project.
    #[must_use]
    pub fn with_project(mut self, project_id: ProjectId) -> Self {
        self.project_id = Some(project_id);
        self
    }

    /// Sets the tags.
    #[must_use]
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.tags = normalize_tags(tags);
        self
    }

    /// Sets the due date.
    #[must_use]
    pub const fn with_due_date(mut self, due_date: DateTime<Utc>) -> Self {
        self.due_date = Some(due_date);
        self
    }

    /// Returns the requested identifier.
    #[must_use]
    pub const fn id(&self) -> &TaskId {
        &self.id
    }

    /// Returns the assignee, if any.
    #[must_use]
    pub fn assignee(&self) -> Option<&str> {
        self.assignee.as_deref()
    }

    /// Returns the priority, if one was chosen.
    #[must_use]
    pub const fn priority(&self) -> Option<TaskPriority> {
        self.priority
    }

    /// Returns the project, if any.
    #[must_use]
    pub const fn project_id(&self) -> Option<&ProjectId> {
        self.project_id.as_ref()
    }
}

/// Task aggregate root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    id: TaskId,
    title: String,
    description: Option<String>,
    status: TaskStatus,
    assignee: Option<String>,
    priority: TaskPriority,
    project_id: Option<ProjectId>,
    tags: Vec<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    due_date: Option<DateTime<Utc>>,
    order_num: i64,
    external: ExternalLink,
    work_started_file_count: Option<u64>,
}

/// Parameter object for reconstructing a persisted task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedTaskData {
    /// Persisted identifier.
    pub id: TaskId,
    /// Persisted title.
    pub title: String,
    /// Persisted description.
    pub description: Option<String>,
    /// Persisted status.
    pub status: TaskStatus,
    /// Persisted assignee.
    pub assignee: Option<String>,
    /// Persisted priority.
    pub priority: TaskPriority,
    /// Persisted project reference.
    pub project_id: Option<ProjectId>,
    /// Persisted tags.
    pub tags: Vec<String>,
    /// Persisted creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Persisted update timestamp.
    pub updated_at: DateTime<Utc>,
    /// Persisted completion timestamp.
    pub completed_at: Option<DateTime<Utc>>,
    /// Persisted due date.
    pub due_date: Option<DateTime<Utc>>,
    /// Persisted ordering index.
    pub order_num: i64,
    /// Persisted external linkage.
    pub external: ExternalLink,
    /// Persisted baseline file count.
    pub work_started_file_count: Option<u64>,
}

impl Task {
    /// Creates a task in the initial `TODO` state.
    #[must_use]
    pub fn create(new_task: NewTask, clock: &impl Clock) -> Self {
        let timestamp = clock.utc();
        Self {
            id: new_task.id,
            title: new_task.title,
            description: new_task.description,
            status: TaskStatus::todo(),
            assignee: new_task.assignee,
            priority: new_task.priority.unwrap_or_default(),
            project_id: new_task.project_id,
            tags: new_task.tags,
            created_at: timestamp,
            updated_at: timestamp,
            completed_at: None,
            due_date: new_task.due_date,
            order_num: 0,
            external: ExternalLink::default(),
            work_started_file_count: None,
        }
    }

    /// Reconstructs a task from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedTaskData) -> Self {
        Self {
            id: data.id,
            title: data.title,
            description: data.description,
            status: data.status,
            assignee: data.assignee,
            priority: data.priority,
            project_id: data.project_id,
            tags: data.tags,
            created_at: data.created_at,
            updated_at: data.updated_at,
            completed_at: data.completed_at,
            due_date: data.due_date,
            order_num: data.order_num,
            external: data.external,
            work_started_file_count: data.work_started_file_count,
        }
    }

    /// Returns the task identifier.
    #[must_use]
    pub const fn id(&self) -> &TaskId {
        &self.id
    }

    /// Returns the title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Returns the description, if any.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns the current status.
    #[must_use]
    pub const fn status(&self) -> &TaskStatus {
        &self.status
    }

    /// Returns the assignee, if any.
    #[must_use]
    pub fn assignee(&self) -> Option<&str> {
        self.assignee.as_deref()
    }

    /// Returns the priority.
    #[must_use]
    pub const fn priority(&self) -> TaskPriority {
        self.priority
    }

    /// Returns the owning project, if any.
    #[must_use]
    pub const fn project_id(&self) -> Option<&ProjectId> {
        self.project_id.as_ref()
    }

    /// Returns the tags.
    #[must_use]
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the latest update timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns the completion timestamp, if the task is done.
    #[must_use]
    pub const fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// Returns the due date, if any.
    #[must_use]
    pub const fn due_date(&self) -> Option<DateTime<Utc>> {
        self.due_date
    }

    /// Returns the ordering index.
    #[must_use]
    pub const fn order_num(&self) -> i64 {
        self.order_num
    }

    /// Returns the external tracker linkage.
    #[must_use]
    pub const fn external(&self) -> &ExternalLink {
        &self.external
    }

    /// Returns the file count recorded when work started, if recorded.
    #[must_use]
    pub const fn work_started_file_count(&self) -> Option<u64> {
        self.work_started_file_count
    }

    /// Replaces the title.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::EmptyField`] when the title is blank.
    pub fn rename(&mut self, title: impl Into<String>, clock: &impl Clock) -> Result<(), DomainError> {
        self.title = required_text(&title.into(), "title")?;
        self.touch(clock);
        Ok(())
    }

    /// Replaces the description.
    pub fn set_description(&mut self, description: Option<String>, clock: &impl Clock) {
        self.description = description;
        self.touch(clock);
    }

    /// Replaces the assignee and returns the previous one.
    pub fn assign(&mut self, assignee: Option<String>, clock: &impl Clock) -> Option<String> {
        let previous = std::mem::replace(&mut self.assignee, assignee);
        self.touch(clock);
        previous
    }

    /// Replaces the priority.
    pub fn set_priority(&mut self, priority: TaskPriority, clock: &impl Clock) {
        self.priority = priority;
        self.touch(clock);
    }

    /// Moves the task to another project, or detaches it.
    pub fn set_project(&mut self, project_id: Option<ProjectId>, clock: &impl Clock) {
        self.project_id = project_id;
        self.touch(clock);
    }

    /// Replaces the tag set.
    pub fn set_tags<I, S>(&mut self, tags: I, clock: &impl Clock)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.tags = normalize_tags(tags);
        self.touch(clock);
    }

    /// Replaces the due date.
    pub fn set_due_date(&mut self, due_date: Option<DateTime<Utc>>, clock: &impl Clock) {
        self.due_date = due_date;
        self.touch(clock);
    }

    /// Replaces the external tracker linkage.
    pub fn set_external_link(&mut self, external: ExternalLink, clock: &impl Clock) {
        self.external = external;
        self.touch(clock);
    }

    /// Moves the task to `status`.
    ///
    /// Entering `DONE` stamps the completion time; leaving it clears the
    /// stamp. Legality of the move is decided by the workflow, not here.
    pub fn transition_to(&mut self, status: TaskStatus, clock: &impl Clock) {
        let timestamp = clock.utc();
        self.completed_at = if status.is_done() {
            Some(timestamp)
        } else {
            None
        };
        self.status = status;
        self.updated_at = timestamp;
    }

    /// Records the baseline file count unless one is already recorded.
    ///
    /// Returns `true` when the baseline was written by this call.
    pub const fn record_work_started(&mut self, file_count: u64) -> bool {
        if self.work_started_file_count.is_some() {
            return false;
        }
        self.work_started_file_count = Some(file_count);
        true
    }

    pub(crate) const fn set_order_num(&mut self, order_num: i64) {
        self.order_num = order_num;
    }

    fn touch(&mut self, clock: &impl Clock) {
        self.updated_at = clock.utc();
    }
}
