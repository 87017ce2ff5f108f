//! Diesel row types for raw-SQL reads.
//!
//! Every select casts integers to `BIGINT` and timestamps to `TEXT`, so one
//! row type decodes on both backends. The column lists below are the only
//! place that knows those casts.

use super::convert::{
    decode_list, decode_metadata, decode_tags, invalid, opt_count, parse_optional_timestamp,
    timestamp_or_epoch, to_count,
};
use crate::domain::{
    ExternalLink, FileAssociation, LogEntry, LogEntryType, LogLevel, Member, MemberId,
    MemberPosition, MemberProfile, MemberRole, PersistedMemberData, PersistedProjectData,
    PersistedTaskData, Project, ProjectId, ProjectSettings, ProjectStatus, RelationshipKind,
    StrictFlags, Task, TaskId, TaskPriority, TaskRelationship, TaskStatus,
};
use crate::ports::PersistenceResult;
use diesel::QueryableByName;
use diesel::sql_types::{BigInt, Bool, Nullable, Text};

pub(crate) const TASK_COLUMNS: &str = concat!(
    "{tasks.key} AS task_id, title, description, status, assignee, ",
    "CAST(priority AS BIGINT) AS priority, project_id, CAST(tags AS TEXT) AS tags, ",
    "CAST(created_at AS TEXT) AS created_at, CAST(updated_at AS TEXT) AS updated_at, ",
    "CAST(completed_at AS TEXT) AS completed_at, CAST(due_date AS TEXT) AS due_date, ",
    "CAST(order_num AS BIGINT) AS order_num, external_id, external_url, sync_status, ",
    "CAST(work_started_file_count AS BIGINT) AS work_started_file_count"
);

pub(crate) const RELATIONSHIP_COLUMNS: &str = concat!(
    "CAST(id AS BIGINT) AS id, parent_id, child_id, relationship_type, ",
    "CAST(created_at AS TEXT) AS created_at, created_by"
);

pub(crate) const FILE_COLUMNS: &str = concat!(
    "CAST(fa.id AS BIGINT) AS id, fa.task_id AS task_id, fa.file_path AS file_path, ",
    "fa.relative_path AS relative_path, fa.file_type AS file_type, ",
    "fa.description AS description, CAST(fa.created_at AS TEXT) AS created_at, ",
    "fa.created_by AS created_by, CAST(fa.last_modified AS TEXT) AS last_modified, ",
    "CAST(fa.file_size AS BIGINT) AS file_size, ",
    "(SELECT CAST(COUNT(DISTINCT other.task_id) AS BIGINT) FROM file_associations other ",
    "WHERE other.file_path = fa.file_path) AS reference_count"
);

pub(crate) const LOG_COLUMNS: &str = concat!(
    "CAST(id AS BIGINT) AS id, CAST(\"timestamp\" AS TEXT) AS logged_at, level, entry_type, ",
    "message, task_id, \"user\" AS user_name, CAST(metadata AS TEXT) AS metadata"
);

pub(crate) const MEMBER_COLUMNS: &str = concat!(
    "m.id AS id, m.name AS name, m.role AS role, m.\"position\" AS member_position, ",
    "CAST(m.age AS BIGINT) AS age, m.sex AS sex, m.profile AS profile, ",
    "m.leader_id AS leader_id, m.profile_image_path AS profile_image_path, ",
    "CAST(m.created_at AS TEXT) AS created_at, CAST(m.updated_at AS TEXT) AS updated_at"
);

pub(crate) const PROJECT_COLUMNS: &str = concat!(
    "p.id AS id, p.name AS name, p.description AS description, p.owner_id AS owner_id, ",
    "p.status AS status, CAST(p.created_at AS TEXT) AS created_at, ",
    "CAST(p.updated_at AS TEXT) AS updated_at"
);

pub(crate) const SETTINGS_COLUMNS: &str = concat!(
    "project_id, github_enabled, github_repo, github_token, webhook_url, webhook_secret, ",
    "monitor_enabled, monitor_path, CAST(monitor_interval AS BIGINT) AS monitor_interval, ",
    "monitor_extensions, strict_doc_read, strict_file_ref, strict_log_entry, project_root, ",
    "CAST(created_at AS TEXT) AS created_at, CAST(updated_at AS TEXT) AS updated_at"
);

#[derive(Debug, QueryableByName)]
pub(crate) struct TaskRow {
    #[diesel(sql_type = Text)]
    task_id: String,
    #[diesel(sql_type = Nullable<Text>)]
    title: Option<String>,
    #[diesel(sql_type = Nullable<Text>)]
    description: Option<String>,
    #[diesel(sql_type = Nullable<Text>)]
    status: Option<String>,
    #[diesel(sql_type = Nullable<Text>)]
    assignee: Option<String>,
    #[diesel(sql_type = Nullable<BigInt>)]
    priority: Option<i64>,
    #[diesel(sql_type = Nullable<Text>)]
    project_id: Option<String>,
    #[diesel(sql_type = Nullable<Text>)]
    tags: Option<String>,
    #[diesel(sql_type = Nullable<Text>)]
    created_at: Option<String>,
    #[diesel(sql_type = Nullable<Text>)]
    updated_at: Option<String>,
    #[diesel(sql_type = Nullable<Text>)]
    completed_at: Option<String>,
    #[diesel(sql_type = Nullable<Text>)]
    due_date: Option<String>,
    #[diesel(sql_type = Nullable<BigInt>)]
    order_num: Option<i64>,
    #[diesel(sql_type = Nullable<Text>)]
    external_id: Option<String>,
    #[diesel(sql_type = Nullable<Text>)]
    external_url: Option<String>,
    #[diesel(sql_type = Nullable<Text>)]
    sync_status: Option<String>,
    #[diesel(sql_type = Nullable<BigInt>)]
    work_started_file_count: Option<i64>,
}

impl TaskRow {
    pub(crate) fn into_task(self) -> PersistenceResult<Task> {
        let created_at = timestamp_or_epoch(self.created_at)?;
        let updated_at = parse_optional_timestamp(self.updated_at)?.unwrap_or(created_at);
        Ok(Task::from_persisted(PersistedTaskData {
            id: TaskId::new(self.task_id).map_err(invalid)?,
            title: self.title.unwrap_or_default(),
            description: self.description,
            status: self
                .status
                .as_deref()
                .map_or_else(|| Ok(TaskStatus::todo()), TaskStatus::new)
                .map_err(invalid)?,
            assignee: self.assignee,
            priority: self
                .priority
                .map_or_else(TaskPriority::default, TaskPriority::from_persisted),
            project_id: optional_project(self.project_id)?,
            tags: decode_tags(self.tags),
            created_at,
            updated_at,
            completed_at: parse_optional_timestamp(self.completed_at)?,
            due_date: parse_optional_timestamp(self.due_date)?,
            order_num: self.order_num.unwrap_or_default(),
            external: ExternalLink {
                external_id: self.external_id,
                external_url: self.external_url,
                sync_status: self.sync_status,
            },
            work_started_file_count: opt_count(self.work_started_file_count),
        }))
    }
}

#[derive(Debug, QueryableByName)]
pub(crate) struct RelationshipRow {
    #[diesel(sql_type = BigInt)]
    id: i64,
    #[diesel(sql_type = Text)]
    parent_id: String,
    #[diesel(sql_type = Text)]
    child_id: String,
    #[diesel(sql_type = Nullable<Text>)]
    relationship_type: Option<String>,
    #[diesel(sql_type = Nullable<Text>)]
    created_at: Option<String>,
    #[diesel(sql_type = Nullable<Text>)]
    created_by: Option<String>,
}

impl RelationshipRow {
    pub(crate) fn into_relationship(self) -> PersistenceResult<TaskRelationship> {
        Ok(TaskRelationship {
            id: self.id,
            parent_id: TaskId::new(self.parent_id).map_err(invalid)?,
            child_id: TaskId::new(self.child_id).map_err(invalid)?,
            kind: self
                .relationship_type
                .as_deref()
                .map_or_else(|| Ok(RelationshipKind::default()), RelationshipKind::try_from)
                .map_err(invalid)?,
            created_at: timestamp_or_epoch(self.created_at)?,
            created_by: self.created_by,
        })
    }
}

#[derive(Debug, QueryableByName)]
pub(crate) struct FileRow {
    #[diesel(sql_type = BigInt)]
    id: i64,
    #[diesel(sql_type = Text)]
    task_id: String,
    #[diesel(sql_type = Text)]
    file_path: String,
    #[diesel(sql_type = Nullable<Text>)]
    relative_path: Option<String>,
    #[diesel(sql_type = Nullable<Text>)]
    file_type: Option<String>,
    #[diesel(sql_type = Nullable<Text>)]
    description: Option<String>,
    #[diesel(sql_type = Nullable<Text>)]
    created_at: Option<String>,
    #[diesel(sql_type = Nullable<Text>)]
    created_by: Option<String>,
    #[diesel(sql_type = Nullable<Text>)]
    last_modified: Option<String>,
    #[diesel(sql_type = Nullable<BigInt>)]
    file_size: Option<i64>,
    #[diesel(sql_type = Nullable<BigInt>)]
    reference_count: Option<i64>,
}

impl FileRow {
    pub(crate) fn into_association(self) -> PersistenceResult<FileAssociation> {
        Ok(FileAssociation {
            id: self.id,
            task_id: TaskId::new(self.task_id).map_err(invalid)?,
            file_path: self.file_path,
            relative_path: self.relative_path,
            file_type: self.file_type,
            description: self.description,
            created_at: timestamp_or_epoch(self.created_at)?,
            created_by: self.created_by,
            last_modified: parse_optional_timestamp(self.last_modified)?,
            file_size: opt_count(self.file_size),
            reference_count: self.reference_count.map_or(0, to_count),
        })
    }
}

#[derive(Debug, QueryableByName)]
pub(crate) struct LogRow {
    #[diesel(sql_type = BigInt)]
    id: i64,
    #[diesel(sql_type = Nullable<Text>)]
    logged_at: Option<String>,
    #[diesel(sql_type = Nullable<Text>)]
    level: Option<String>,
    #[diesel(sql_type = Nullable<Text>)]
    entry_type: Option<String>,
    #[diesel(sql_type = Nullable<Text>)]
    message: Option<String>,
    #[diesel(sql_type = Nullable<Text>)]
    task_id: Option<String>,
    #[diesel(sql_type = Nullable<Text>)]
    user_name: Option<String>,
    #[diesel(sql_type = Nullable<Text>)]
    metadata: Option<String>,
}

impl LogRow {
    pub(crate) fn into_entry(self) -> PersistenceResult<LogEntry> {
        Ok(LogEntry {
            id: self.id,
            timestamp: timestamp_or_epoch(self.logged_at)?,
            level: self
                .level
                .as_deref()
                .map_or_else(|| Ok(LogLevel::default()), LogLevel::try_from)
                .map_err(invalid)?,
            entry_type: self
                .entry_type
                .as_deref()
                .map_or_else(|| Ok(LogEntryType::System), LogEntryType::try_from)
                .map_err(invalid)?,
            message: self.message.unwrap_or_default(),
            task_id: self
                .task_id
                .filter(|value| !value.trim().is_empty())
                .map(TaskId::new)
                .transpose()
                .map_err(invalid)?,
            user: self.user_name,
            metadata: decode_metadata(self.metadata),
        })
    }
}

#[derive(Debug, QueryableByName)]
pub(crate) struct MemberRow {
    #[diesel(sql_type = Text)]
    id: String,
    #[diesel(sql_type = Nullable<Text>)]
    name: Option<String>,
    #[diesel(sql_type = Nullable<Text>)]
    role: Option<String>,
    #[diesel(sql_type = Nullable<Text>)]
    member_position: Option<String>,
    #[diesel(sql_type = Nullable<BigInt>)]
    age: Option<i64>,
    #[diesel(sql_type = Nullable<Text>)]
    sex: Option<String>,
    #[diesel(sql_type = Nullable<Text>)]
    profile: Option<String>,
    #[diesel(sql_type = Nullable<Text>)]
    leader_id: Option<String>,
    #[diesel(sql_type = Nullable<Text>)]
    profile_image_path: Option<String>,
    #[diesel(sql_type = Nullable<Text>)]
    created_at: Option<String>,
    #[diesel(sql_type = Nullable<Text>)]
    updated_at: Option<String>,
}

impl MemberRow {
    pub(crate) fn into_member(self) -> PersistenceResult<Member> {
        let created_at = timestamp_or_epoch(self.created_at)?;
        Ok(Member::from_persisted(PersistedMemberData {
            id: MemberId::new(self.id).map_err(invalid)?,
            name: self.name.unwrap_or_default(),
            role: self
                .role
                .as_deref()
                .map_or_else(|| Ok(MemberRole::default()), MemberRole::try_from)
                .map_err(invalid)?,
            position: self
                .member_position
                .as_deref()
                .map_or_else(|| Ok(MemberPosition::default()), MemberPosition::try_from)
                .map_err(invalid)?,
            leader_id: self
                .leader_id
                .filter(|value| !value.trim().is_empty())
                .map(MemberId::new)
                .transpose()
                .map_err(invalid)?,
            profile: MemberProfile {
                age: self.age.and_then(|age| u32::try_from(age).ok()),
                sex: self.sex,
                profile: self.profile,
                profile_image_path: self.profile_image_path,
            },
            created_at,
            updated_at: parse_optional_timestamp(self.updated_at)?.unwrap_or(created_at),
        }))
    }
}

#[derive(Debug, QueryableByName)]
pub(crate) struct ProjectRow {
    #[diesel(sql_type = Text)]
    id: String,
    #[diesel(sql_type = Nullable<Text>)]
    name: Option<String>,
    #[diesel(sql_type = Nullable<Text>)]
    description: Option<String>,
    #[diesel(sql_type = Nullable<Text>)]
    owner_id: Option<String>,
    #[diesel(sql_type = Nullable<Text>)]
    status: Option<String>,
    #[diesel(sql_type = Nullable<Text>)]
    created_at: Option<String>,
    #[diesel(sql_type = Nullable<Text>)]
    updated_at: Option<String>,
}

impl ProjectRow {
    pub(crate) fn into_project(self) -> PersistenceResult<Project> {
        let created_at = timestamp_or_epoch(self.created_at)?;
        Ok(Project::from_persisted(PersistedProjectData {
            id: ProjectId::new(self.id).map_err(invalid)?,
            name: self.name.unwrap_or_default(),
            description: self.description,
            owner_id: self
                .owner_id
                .filter(|value| !value.trim().is_empty())
                .map(MemberId::new)
                .transpose()
                .map_err(invalid)?,
            status: self
                .status
                .as_deref()
                .map_or_else(|| Ok(ProjectStatus::default()), ProjectStatus::try_from)
                .map_err(invalid)?,
            created_at,
            updated_at: parse_optional_timestamp(self.updated_at)?.unwrap_or(created_at),
        }))
    }
}

#[derive(Debug, QueryableByName)]
pub(crate) struct SettingsRow {
    #[diesel(sql_type = Text)]
    project_id: String,
    #[diesel(sql_type = Nullable<Bool>)]
    github_enabled: Option<bool>,
    #[diesel(sql_type = Nullable<Text>)]
    github_repo: Option<String>,
    #[diesel(sql_type = Nullable<Text>)]
    github_token: Option<String>,
    #[diesel(sql_type = Nullable<Text>)]
    webhook_url: Option<String>,
    #[diesel(sql_type = Nullable<Text>)]
    webhook_secret: Option<String>,
    #[diesel(sql_type = Nullable<Bool>)]
    monitor_enabled: Option<bool>,
    #[diesel(sql_type = Nullable<Text>)]
    monitor_path: Option<String>,
    #[diesel(sql_type = Nullable<BigInt>)]
    monitor_interval: Option<i64>,
    #[diesel(sql_type = Nullable<Text>)]
    monitor_extensions: Option<String>,
    #[diesel(sql_type = Nullable<Bool>)]
    strict_doc_read: Option<bool>,
    #[diesel(sql_type = Nullable<Bool>)]
    strict_file_ref: Option<bool>,
    #[diesel(sql_type = Nullable<Bool>)]
    strict_log_entry: Option<bool>,
    #[diesel(sql_type = Nullable<Text>)]
    project_root: Option<String>,
    #[diesel(sql_type = Nullable<Text>)]
    created_at: Option<String>,
    #[diesel(sql_type = Nullable<Text>)]
    updated_at: Option<String>,
}

impl SettingsRow {
    pub(crate) fn into_settings(self) -> PersistenceResult<ProjectSettings> {
        let created_at = timestamp_or_epoch(self.created_at)?;
        Ok(ProjectSettings {
            project_id: ProjectId::new(self.project_id).map_err(invalid)?,
            github_enabled: self.github_enabled.unwrap_or(false),
            github_repo: self.github_repo,
            github_token: self.github_token,
            webhook_url: self.webhook_url,
            webhook_secret: self.webhook_secret,
            monitor_enabled: self.monitor_enabled.unwrap_or(false),
            monitor_path: self.monitor_path,
            monitor_interval: self
                .monitor_interval
                .and_then(|seconds| u32::try_from(seconds).ok())
                .unwrap_or(ProjectSettings::DEFAULT_MONITOR_INTERVAL),
            monitor_extensions: decode_list(self.monitor_extensions),
            strict: StrictFlags {
                doc_read: self.strict_doc_read.unwrap_or(false),
                file_ref: self.strict_file_ref.unwrap_or(false),
                log_entry: self.strict_log_entry.unwrap_or(false),
            },
            project_root: self.project_root,
            created_at,
            updated_at: parse_optional_timestamp(self.updated_at)?.unwrap_or(created_at),
        })
    }
}

/// Single identifier returned by `RETURNING`.
#[derive(Debug, QueryableByName)]
pub(crate) struct IdRow {
    #[diesel(sql_type = BigInt)]
    pub(crate) id: i64,
}

/// Single aggregate value.
#[derive(Debug, QueryableByName)]
pub(crate) struct CountRow {
    #[diesel(sql_type = BigInt)]
    pub(crate) value: i64,
}

#[derive(Debug, QueryableByName)]
pub(crate) struct VersionRow {
    #[diesel(sql_type = Nullable<BigInt>)]
    pub(crate) version: Option<i64>,
}

#[derive(Debug, QueryableByName)]
pub(crate) struct ColumnNameRow {
    #[diesel(sql_type = Text)]
    pub(crate) table_name: String,
    #[diesel(sql_type = Text)]
    pub(crate) column_name: String,
}

#[derive(Debug, QueryableByName)]
pub(crate) struct FilePathRow {
    #[diesel(sql_type = BigInt)]
    pub(crate) id: i64,
    #[diesel(sql_type = Text)]
    pub(crate) file_path: String,
}

fn optional_project(raw: Option<String>) -> PersistenceResult<Option<ProjectId>> {
    raw.filter(|value| !value.trim().is_empty())
        .map(ProjectId::new)
        .transpose()
        .map_err(invalid)
}
