//! Member, project, membership and settings statements.

use super::{SqlBackend, SqlEngine};
use crate::adapters::sql::convert::encode_list;
use crate::adapters::sql::rows::{
    MEMBER_COLUMNS, MemberRow, PROJECT_COLUMNS, ProjectRow, SETTINGS_COLUMNS, SettingsRow,
};
use crate::adapters::sql::{Conditions, SqlValue, Statement};
use crate::domain::{Member, MemberId, Project, ProjectId, ProjectMembership, ProjectSettings};
use crate::ports::{MemberFilter, PersistenceResult, ProjectFilter};

fn bind_member(statement: Statement, member: &Member) -> Statement {
    let profile = member.profile();
    statement
        .bind("id", SqlValue::text(member.id().as_str()))
        .bind("name", SqlValue::text(member.name()))
        .bind("role", SqlValue::text(member.role().as_str()))
        .bind("position", SqlValue::text(member.position().as_str()))
        .bind("age", SqlValue::opt_big_int(profile.age.map(i64::from)))
        .bind("sex", SqlValue::opt_text(profile.sex.as_deref()))
        .bind("profile", SqlValue::opt_text(profile.profile.as_deref()))
        .bind("leader_id", SqlValue::opt_text(member.leader_id().map(MemberId::as_str)))
        .bind("profile_image_path", SqlValue::opt_text(profile.profile_image_path.as_deref()))
        .bind("created_at", SqlValue::timestamp(member.created_at()))
        .bind("updated_at", SqlValue::timestamp(member.updated_at()))
}

fn bind_project(statement: Statement, project: &Project) -> Statement {
    statement
        .bind("id", SqlValue::text(project.id().as_str()))
        .bind("name", SqlValue::text(project.name()))
        .bind("description", SqlValue::opt_text(project.description()))
        .bind("owner_id", SqlValue::opt_text(project.owner_id().map(MemberId::as_str)))
        .bind("status", SqlValue::text(project.status().as_str()))
        .bind("created_at", SqlValue::timestamp(project.created_at()))
        .bind("updated_at", SqlValue::timestamp(project.updated_at()))
}

fn bind_settings(statement: Statement, settings: &ProjectSettings) -> Statement {
    statement
        .bind("project_id", SqlValue::text(settings.project_id.as_str()))
        .bind("github_enabled", SqlValue::boolean(settings.github_enabled))
        .bind("github_repo", SqlValue::opt_text(settings.github_repo.as_deref()))
        .bind("github_token", SqlValue::opt_text(settings.github_token.as_deref()))
        .bind("webhook_url", SqlValue::opt_text(settings.webhook_url.as_deref()))
        .bind("webhook_secret", SqlValue::opt_text(settings.webhook_secret.as_deref()))
        .bind("monitor_enabled", SqlValue::boolean(settings.monitor_enabled))
        .bind("monitor_path", SqlValue::opt_text(settings.monitor_path.as_deref()))
        .bind("monitor_interval", SqlValue::big_int(i64::from(settings.monitor_interval)))
        .bind("monitor_extensions", SqlValue::Text(encode_list(&settings.monitor_extensions)))
        .bind("strict_doc_read", SqlValue::boolean(settings.strict.doc_read))
        .bind("strict_file_ref", SqlValue::boolean(settings.strict.file_ref))
        .bind("strict_log_entry", SqlValue::boolean(settings.strict.log_entry))
        .bind("project_root", SqlValue::opt_text(settings.project_root.as_deref()))
        .bind("created_at", SqlValue::timestamp(settings.created_at))
        .bind("updated_at", SqlValue::timestamp(settings.updated_at))
}

fn into_members(rows: Vec<MemberRow>) -> PersistenceResult<Vec<Member>> {
    rows.into_iter().map(MemberRow::into_member).collect()
}

fn into_projects(rows: Vec<ProjectRow>) -> PersistenceResult<Vec<Project>> {
    rows.into_iter().map(ProjectRow::into_project).collect()
}

impl<B: SqlBackend> SqlEngine<B> {
    pub(super) fn insert_member(&mut self, member: &Member) -> PersistenceResult<()> {
        let statement = bind_member(
            Statement::new(
                "INSERT INTO members (id, name, role, \"position\", age, sex, profile, leader_id, \
                 profile_image_path, created_at, updated_at) VALUES (:id, :name, :role, :position, :age, \
                 :sex, :profile, :leader_id, :profile_image_path, :created_at, :updated_at)",
            ),
            member,
        );
        self.execute("create member", &statement).map(|_| ())
    }

    pub(super) fn find_member(&mut self, id: &MemberId) -> PersistenceResult<Option<Member>> {
        let rows: Vec<MemberRow> = self.load(
            "get member",
            &Statement::new(format!("SELECT {MEMBER_COLUMNS} FROM members m WHERE m.id = :id"))
                .bind("id", SqlValue::text(id.as_str())),
        )?;
        rows.into_iter().next().map(MemberRow::into_member).transpose()
    }

    pub(super) fn save_member(&mut self, member: &Member) -> PersistenceResult<bool> {
        let statement = bind_member(
            Statement::new(
                "UPDATE members SET name = :name, role = :role, \"position\" = :position, age = :age, \
                 sex = :sex, profile = :profile, leader_id = :leader_id, \
                 profile_image_path = :profile_image_path, updated_at = :updated_at WHERE id = :id",
            ),
            member,
        );
        Ok(self.execute("update member", &statement)? > 0)
    }

    pub(super) fn remove_member(&mut self, id: &MemberId) -> PersistenceResult<bool> {
        let key = SqlValue::text(id.as_str());
        self.atomically(|engine| {
            engine.execute(
                "delete member",
                &Statement::new("UPDATE members SET leader_id = NULL WHERE leader_id = :id").bind("id", key.clone()),
            )?;
            engine.execute(
                "delete member",
                &Statement::new("DELETE FROM project_memberships WHERE member_id = :id").bind("id", key.clone()),
            )?;
            let removed = engine.execute(
                "delete member",
                &Statement::new("DELETE FROM members WHERE id = :id").bind("id", key.clone()),
            )?;
            Ok(removed > 0)
        })
    }

    pub(super) fn query_members(&mut self, filter: &MemberFilter) -> PersistenceResult<Vec<Member>> {
        let mut conditions = Conditions::default();
        if let Some(role) = filter.role {
            conditions.push_bound("m.role = :role", "role", SqlValue::text(role.as_str()));
        }
        if let Some(position) = filter.position {
            conditions.push_bound("m.\"position\" = :position", "position", SqlValue::text(position.as_str()));
        }
        if let Some(leader_id) = &filter.leader_id {
            conditions.push_bound("m.leader_id = :leader_id", "leader_id", SqlValue::text(leader_id.as_str()));
        }
        let where_clause = conditions.where_clause();
        let statement = conditions.apply(Statement::new(format!(
            "SELECT {MEMBER_COLUMNS} FROM members m{where_clause} ORDER BY m.name ASC, m.id ASC"
        )));
        into_members(self.load("list members", &statement)?)
    }

    pub(super) fn insert_project(&mut self, project: &Project) -> PersistenceResult<()> {
        let statement = bind_project(
            Statement::new(
                "INSERT INTO projects (id, name, description, owner_id, status, created_at, updated_at) \
                 VALUES (:id, :name, :description, :owner_id, :status, :created_at, :updated_at)",
            ),
            project,
        );
        self.execute("create project", &statement).map(|_| ())
    }

    pub(super) fn find_project(&mut self, id: &ProjectId) -> PersistenceResult<Option<Project>> {
        let rows: Vec<ProjectRow> = self.load(
            "get project",
            &Statement::new(format!("SELECT {PROJECT_COLUMNS} FROM projects p WHERE p.id = :id"))
                .bind("id", SqlValue::text(id.as_str())),
        )?;
        rows.into_iter().next().map(ProjectRow::into_project).transpose()
    }

    pub(super) fn save_project(&mut self, project: &Project) -> PersistenceResult<bool> {
        let statement = bind_project(
            Statement::new(
                "UPDATE projects SET name = :name, description = :description, owner_id = :owner_id, \
                 status = :status, updated_at = :updated_at WHERE id = :id",
            ),
            project,
        );
        Ok(self.execute("update project", &statement)? > 0)
    }

    pub(super) fn remove_project(&mut self, id: &ProjectId) -> PersistenceResult<bool> {
        let key = SqlValue::text(id.as_str());
        self.atomically(|engine| {
            engine.execute(
                "delete project",
                &Statement::new("DELETE FROM project_memberships WHERE project_id = :id").bind("id", key.clone()),
            )?;
            engine.execute(
                "delete project",
                &Statement::new("DELETE FROM project_settings WHERE project_id = :id").bind("id", key.clone()),
            )?;
            let removed = engine.execute(
                "delete project",
                &Statement::new("DELETE FROM projects WHERE id = :id").bind("id", key.clone()),
            )?;
            Ok(removed > 0)
        })
    }

    pub(super) fn query_projects(&mut self, filter: &ProjectFilter) -> PersistenceResult<Vec<Project>> {
        let mut conditions = Conditions::default();
        if let Some(status) = filter.status {
            conditions.push_bound("p.status = :status", "status", SqlValue::text(status.as_str()));
        }
        if let Some(owner_id) = &filter.owner_id {
            conditions.push_bound("p.owner_id = :owner_id", "owner_id", SqlValue::text(owner_id.as_str()));
        }
        let where_clause = conditions.where_clause();
        let statement = conditions.apply(Statement::new(format!(
            "SELECT {PROJECT_COLUMNS} FROM projects p{where_clause} ORDER BY p.name ASC, p.id ASC"
        )));
        into_projects(self.load("list projects", &statement)?)
    }

    pub(super) fn insert_membership(&mut self, membership: &ProjectMembership) -> PersistenceResult<()> {
        let statement = Statement::new(
            "INSERT INTO project_memberships (project_id, member_id, joined_at) \
             VALUES (:project_id, :member_id, :joined_at)",
        )
        .bind("project_id", SqlValue::text(membership.project_id.as_str()))
        .bind("member_id", SqlValue::text(membership.member_id.as_str()))
        .bind("joined_at", SqlValue::timestamp(membership.joined_at));
        self.execute("add project member", &statement).map(|_| ())
    }

    pub(super) fn remove_membership(&mut self, project_id: &ProjectId, member_id: &MemberId) -> PersistenceResult<bool> {
        let removed = self.execute(
            "remove project member",
            &Statement::new("DELETE FROM project_memberships WHERE project_id = :project_id AND member_id = :member_id")
                .bind("project_id", SqlValue::text(project_id.as_str()))
                .bind("member_id", SqlValue::text(member_id.as_str())),
        )?;
        Ok(removed > 0)
    }

    pub(super) fn members_of(&mut self, project_id: &ProjectId) -> PersistenceResult<Vec<Member>> {
        let statement = Statement::new(format!(
            "SELECT {MEMBER_COLUMNS} FROM members m JOIN project_memberships pm ON pm.member_id = m.id \
             WHERE pm.project_id = :project_id ORDER BY m.name ASC, m.id ASC"
        ))
        .bind("project_id", SqlValue::text(project_id.as_str()));
        into_members(self.load("list project members", &statement)?)
    }

    pub(super) fn projects_of(&mut self, member_id: &MemberId) -> PersistenceResult<Vec<Project>> {
        let statement = Statement::new(format!(
            "SELECT {PROJECT_COLUMNS} FROM projects p JOIN project_memberships pm ON pm.project_id = p.id \
             WHERE pm.member_id = :member_id ORDER BY p.name ASC, p.id ASC"
        ))
        .bind("member_id", SqlValue::text(member_id.as_str()));
        into_projects(self.load("list member projects", &statement)?)
    }

    pub(super) fn find_settings(&mut self, project_id: &ProjectId) -> PersistenceResult<Option<ProjectSettings>> {
        let rows: Vec<SettingsRow> = self.load(
            "get project settings",
            &Statement::new(format!(
                "SELECT {SETTINGS_COLUMNS} FROM project_settings WHERE project_id = :project_id"
            ))
            .bind("project_id", SqlValue::text(project_id.as_str())),
        )?;
        rows.into_iter().next().map(SettingsRow::into_settings).transpose()
    }

    pub(super) fn upsert_settings(&mut self, settings: &ProjectSettings) -> PersistenceResult<()> {
        let update = bind_settings(
            Statement::new(
                "UPDATE project_settings SET github_enabled = :github_enabled, github_repo = :github_repo, \
                 github_token = :github_token, webhook_url = :webhook_url, webhook_secret = :webhook_secret, \
                 monitor_enabled = :monitor_enabled, monitor_path = :monitor_path, \
                 monitor_interval = :monitor_interval, monitor_extensions = :monitor_extensions, \
                 strict_doc_read = :strict_doc_read, strict_file_ref = :strict_file_ref, \
                 strict_log_entry = :strict_log_entry, project_root = :project_root, \
                 updated_at = :updated_at WHERE project_id = :project_id",
            ),
            settings,
        );
        let insert = bind_settings(
            Statement::new(
                "INSERT INTO project_settings (project_id, github_enabled, github_repo, github_token, \
                 webhook_url, webhook_secret, monitor_enabled, monitor_path, monitor_interval, \
                 monitor_extensions, strict_doc_read, strict_file_ref, strict_log_entry, project_root, \
                 created_at, updated_at) VALUES (:project_id, :github_enabled, :github_repo, :github_token, \
                 :webhook_url, :webhook_secret, :monitor_enabled, :monitor_path, :monitor_interval, \
                 :monitor_extensions, :strict_doc_read, :strict_file_ref, :strict_log_entry, :project_root, \
                 :created_at, :updated_at)",
            ),
            settings,
        );
        self.atomically(|engine| {
            if engine.execute("save project settings", &update)? == 0 {
                engine.execute("save project settings", &insert)?;
            }
            Ok(())
        })
    }
}
