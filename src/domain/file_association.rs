//! Files attached to tasks as evidence.

use super::{DomainError, TaskId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Extensions that mark a file as a document the assignee must read.
pub const DOCUMENT_EXTENSIONS: [&str; 5] = ["doc", "md", "txt", "pdf", "docx"];

/// Returns the lower-cased extension of the final path segment.
#[must_use]
pub fn file_type_of(path: &str) -> Option<String> {
    let name = path.rsplit(['/', '\\']).next().unwrap_or(path);
    let (stem, extension) = name.rsplit_once('.')?;
    if stem.is_empty() || extension.is_empty() {
        return None;
    }
    Some(extension.to_ascii_lowercase())
}

fn is_absolute(path: &str) -> bool {
    let bytes = path.as_bytes();
    path.starts_with('/')
        || path.starts_with('\\')
        || matches!(bytes, [drive, b':', ..] if drive.is_ascii_alphabetic())
}

/// Validated request to attach a file to a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewFileAssociation {
    task_id: TaskId,
    file_path: String,
    relative_path: Option<String>,
    description: Option<String>,
    created_by: Option<String>,
    file_size: Option<u64>,
    last_modified: Option<DateTime<Utc>>,
}

impl NewFileAssociation {
    /// Creates an attachment request for an absolute path.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::EmptyFilePath`] for a blank path and
    /// [`DomainError::RelativeFilePath`] for a relative one.
    pub fn new(task_id: TaskId, file_path: impl Into<String>) -> Result<Self, DomainError> {
        let raw = file_path.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(DomainError::EmptyFilePath);
        }
        if !is_absolute(trimmed) {
            return Err(DomainError::RelativeFilePath(trimmed.to_owned()));
        }
        Ok(Self {
            task_id,
            file_path: trimmed.to_owned(),
            relative_path: None,
            description: None,
            created_by: None,
            file_size: None,
            last_modified: None,
        })
    }

    /// Records the path relative to the project root.
    #[must_use]
    pub fn with_relative_path(mut self, relative_path: impl Into<String>) -> Self {
        self.relative_path = Some(relative_path.into());
        self
    }

    /// Sets a free-text description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Records who attached the file.
    #[must_use]
    pub fn with_created_by(mut self, created_by: impl Into<String>) -> Self {
        self.created_by = Some(created_by.into());
        self
    }

    /// Records the on-disk size and modification time.
    #[must_use]
    pub const fn with_metadata(mut self, file_size: u64, last_modified: Option<DateTime<Utc>>) -> Self {
        self.file_size = Some(file_size);
        self.last_modified = last_modified;
        self
    }

    /// Returns the owning task.
    #[must_use]
    pub const fn task_id(&self) -> &TaskId {
        &self.task_id
    }

    /// Returns the absolute path.
    #[must_use]
    pub fn file_path(&self) -> &str {
        &self.file_path
    }

    /// Returns the extension-derived file type.
    #[must_use]
    pub fn file_type(&self) -> Option<String> {
        file_type_of(&self.file_path)
    }

    /// Returns the path relative to the project root, if known.
    #[must_use]
    pub fn relative_path(&self) -> Option<&str> {
        self.relative_path.as_deref()
    }

    /// Returns the description, if any.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns the creator, if recorded.
    #[must_use]
    pub fn created_by(&self) -> Option<&str> {
        self.created_by.as_deref()
    }

    /// Returns the file size in bytes, if known.
    #[must_use]
    pub const fn file_size(&self) -> Option<u64> {
        self.file_size
    }

    /// Returns the modification time, if known.
    #[must_use]
    pub const fn last_modified(&self) -> Option<DateTime<Utc>> {
        self.last_modified
    }
}

/// Stored association between a task and a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileAssociation {
    /// Storage-assigned identifier.
    pub id: i64,
    /// Owning task.
    pub task_id: TaskId,
    /// Absolute path.
    pub file_path: String,
    /// Path relative to the project root.
    pub relative_path: Option<String>,
    /// Lower-cased extension.
    pub file_type: Option<String>,
    /// Free-text description.
    pub description: Option<String>,
    /// Attachment time.
    pub created_at: DateTime<Utc>,
    /// Who attached the file.
    pub created_by: Option<String>,
    /// Modification time when attached.
    pub last_modified: Option<DateTime<Utc>>,
    /// Size in bytes when attached.
    pub file_size: Option<u64>,
    /// Number of distinct tasks referencing this exact path.
    pub reference_count: u64,
}

impl FileAssociation {
    /// Returns `true` when the file's extension marks it as a document.
    #[must_use]
    pub fn is_document(&self) -> bool {
        self.file_type
            .as_deref()
            .map(str::to_ascii_lowercase)
            .or_else(|| file_type_of(&self.file_path))
            .is_some_and(|extension| DOCUMENT_EXTENSIONS.contains(&extension.as_str()))
    }
}
