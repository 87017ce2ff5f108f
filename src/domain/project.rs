//! Projects, their memberships, and per-project settings.

use super::{DomainError, MemberId, ProjectId, required_text};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};

/// Lifecycle status of a project.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ProjectStatus {
    /// Work is ongoing.
    #[default]
    Active,
    /// Work has finished.
    Completed,
    /// Kept for reference only.
    Archived,
    /// Abandoned.
    Cancelled,
}

impl ProjectStatus {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Completed => "COMPLETED",
            Self::Archived => "ARCHIVED",
            Self::Cancelled => "CANCELLED",
        }
    }
}

impl TryFrom<&str> for ProjectStatus {
    type Error = DomainError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_uppercase().as_str() {
            "ACTIVE" => Ok(Self::Active),
            "COMPLETED" => Ok(Self::Completed),
            "ARCHIVED" => Ok(Self::Archived),
            "CANCELLED" | "CANCELED" => Ok(Self::Cancelled),
            _ => Err(DomainError::unknown("project status", value)),
        }
    }
}

/// A named body of work that tasks and members belong to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    id: ProjectId,
    name: String,
    description: Option<String>,
    owner_id: Option<MemberId>,
    status: ProjectStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Parameter object for reconstructing a persisted project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedProjectData {
    /// Persisted identifier.
    pub id: ProjectId,
    /// Persisted name.
    pub name: String,
    /// Persisted description.
    pub description: Option<String>,
    /// Persisted owner.
    pub owner_id: Option<MemberId>,
    /// Persisted status.
    pub status: ProjectStatus,
    /// Persisted creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Persisted update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Project {
    /// Creates an active project.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::EmptyField`] when the name is blank.
    pub fn new(id: ProjectId, name: impl Into<String>, clock: &impl Clock) -> Result<Self, DomainError> {
        let timestamp = clock.utc();
        Ok(Self {
            id,
            name: required_text(&name.into(), "name")?,
            description: None,
            owner_id: None,
            status: ProjectStatus::Active,
            created_at: timestamp,
            updated_at: timestamp,
        })
    }

    /// Reconstructs a project from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedProjectData) -> Self {
        Self {
            id: data.id,
            name: data.name,
            description: data.description,
            owner_id: data.owner_id,
            status: data.status,
            created_at: data.created_at,
            updated_at: data.updated_at,
        }
    }

    /// Sets the description at construction time.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the owner at construction time.
    #[must_use]
    pub fn with_owner(mut self, owner_id: MemberId) -> Self {
        self.owner_id = Some(owner_id);
        self
    }

    /// Returns the identifier.
    #[must_use]
    pub const fn id(&self) -> &ProjectId {
        &self.id
    }

    /// Returns the name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the description, if any.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns the owner, if any.
    #[must_use]
    pub const fn owner_id(&self) -> Option<&MemberId> {
        self.owner_id.as_ref()
    }

    /// Returns the status.
    #[must_use]
    pub const fn status(&self) -> ProjectStatus {
        self.status
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

    /// Replaces the name.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::EmptyField`] when the name is blank.
    pub fn rename(&mut self, name: impl Into<String>, clock: &impl Clock) -> Result<(), DomainError> {
        self.name = required_text(&name.into(), "name")?;
        self.updated_at = clock.utc();
        Ok(())
    }

    /// Replaces the description.
    pub fn set_description(&mut self, description: Option<String>, clock: &impl Clock) {
        self.description = description;
        self.updated_at = clock.utc();
    }

    /// Replaces the owner.
    pub fn set_owner(&mut self, owner_id: Option<MemberId>, clock: &impl Clock) {
        self.owner_id = owner_id;
        self.updated_at = clock.utc();
    }

    /// Replaces the status.
    pub fn set_status(&mut self, status: ProjectStatus, clock: &impl Clock) {
        self.status = status;
        self.updated_at = clock.utc();
    }
}

/// Membership of a member in a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectMembership {
    /// Project side of the pair.
    pub project_id: ProjectId,
    /// Member side of the pair.
    pub member_id: MemberId,
    /// When the member joined.
    pub joined_at: DateTime<Utc>,
}

/// The three strict-mode switches stored per project.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrictFlags {
    /// Require document-read confirmation before completion.
    pub doc_read: bool,
    /// Require a file added since work started.
    pub file_ref: bool,
    /// Require a work log entry.
    pub log_entry: bool,
}

impl StrictFlags {
    /// Returns `true` when any check is enabled.
    #[must_use]
    pub const fn any(self) -> bool {
        self.doc_read || self.file_ref || self.log_entry
    }
}

/// Per-project configuration, created lazily on first write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectSettings {
    /// Owning project.
    pub project_id: ProjectId,
    /// Whether issue-tracker mirroring is enabled.
    pub github_enabled: bool,
    /// Mirrored repository in `owner/repo` form.
    pub github_repo: Option<String>,
    /// Access token for the mirror.
    pub github_token: Option<String>,
    /// Webhook endpoint for the mirror.
    pub webhook_url: Option<String>,
    /// Webhook signing secret.
    pub webhook_secret: Option<String>,
    /// Whether the filesystem monitor is enabled.
    pub monitor_enabled: bool,
    /// Directory watched by the monitor.
    pub monitor_path: Option<String>,
    /// Monitor polling interval in seconds.
    pub monitor_interval: u32,
    /// File extensions the monitor tracks.
    pub monitor_extensions: Vec<String>,
    /// Strict-mode switches.
    pub strict: StrictFlags,
    /// Root used to resolve relative file references.
    pub project_root: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Latest update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl ProjectSettings {
    /// Default monitor polling interval in seconds.
    pub const DEFAULT_MONITOR_INTERVAL: u32 = 60;

    /// Creates settings with every feature disabled.
    #[must_use]
    pub fn new(project_id: ProjectId, clock: &impl Clock) -> Self {
        let timestamp = clock.utc();
        Self {
            project_id,
            github_enabled: false,
            github_repo: None,
            github_token: None,
            webhook_url: None,
            webhook_secret: None,
            monitor_enabled: false,
            monitor_path: None,
            monitor_interval: Self::DEFAULT_MONITOR_INTERVAL,
            monitor_extensions: Vec::new(),
            strict: StrictFlags::default(),
            project_root: None,
            created_at: timestamp,
            updated_at: timestamp,
        }
    }
}
