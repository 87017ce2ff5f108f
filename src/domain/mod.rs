//! Entity model for task tracking.
//!
//! Plain records with validating constructors. Nothing here touches storage
//! or the workflow configuration.

mod error;
mod file_association;
mod hierarchy;
mod ids;
mod log_entry;
mod member;
mod project;
mod relationship;
mod status;
mod task;

pub use error::DomainError;
pub use file_association::{DOCUMENT_EXTENSIONS, FileAssociation, NewFileAssociation, file_type_of};
pub use hierarchy::{LeaderGraph, TeamNode};
pub use ids::{MemberId, ProjectId, TaskId};
pub use log_entry::{LogEntry, LogEntryType, LogLevel, NewLogEntry, STATUS_ARROW};
pub use member::{Member, MemberPosition, MemberProfile, MemberRole, PersistedMemberData};
pub use project::{
    PersistedProjectData, Project, ProjectMembership, ProjectSettings, ProjectStatus, StrictFlags,
};
pub use relationship::{NewRelationship, RelationshipKind, TaskRelationship};
pub use status::TaskStatus;
pub use task::{ExternalLink, NewTask, PersistedTaskData, Task, TaskPriority, normalize_tags};

pub(crate) fn required_text(value: &str, field: &'static str) -> Result<String, DomainError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DomainError::EmptyField { field });
    }
    Ok(trimmed.to_owned())
}

#[cfg(test)]
mod tests;
