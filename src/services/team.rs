//! Members, projects, memberships and project settings.

use super::within_transaction;
use crate::domain::{
    DomainError, LeaderGraph, LogEntryType, Member, MemberId, MemberPosition, MemberProfile,
    MemberRole, NewLogEntry, Project, ProjectId, ProjectMembership, ProjectSettings,
    ProjectStatus, TeamNode,
};
use crate::ports::{MemberFilter, PersistenceEngine, PersistenceError, ProjectFilter};
use mockable::Clock;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use thiserror::Error;

/// Errors raised by [`TeamService`].
#[derive(Debug, Clone, Error)]
pub enum TeamError {
    /// The member does not exist.
    #[error("member {0} not found")]
    MemberNotFound(MemberId),
    /// The project does not exist.
    #[error("project {0} not found")]
    ProjectNotFound(ProjectId),
    /// The leader change would make a member report to itself.
    #[error("making {leader} the leader of {member} would create a reporting cycle")]
    LeaderCycle {
        /// Member being changed.
        member: MemberId,
        /// Requested leader.
        leader: MemberId,
    },
    /// Domain validation failed.
    #[error(transparent)]
    Domain(#[from] DomainError),
    /// Storage failed.
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

/// Result type for [`TeamService`].
pub type TeamResult<T> = Result<T, TeamError>;

/// Member edits; `None` leaves a field alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemberUpdate {
    /// New name.
    pub name: Option<String>,
    /// New role.
    pub role: Option<MemberRole>,
    /// New position.
    pub position: Option<MemberPosition>,
    /// New leader; `Some(None)` removes it.
    pub leader_id: Option<Option<MemberId>>,
    /// Replacement profile.
    pub profile: Option<MemberProfile>,
}

/// Project edits; `None` leaves a field alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectUpdate {
    /// New name.
    pub name: Option<String>,
    /// New description; `Some(None)` clears it.
    pub description: Option<Option<String>>,
    /// New owner; `Some(None)` clears it.
    pub owner_id: Option<Option<MemberId>>,
    /// New status.
    pub status: Option<ProjectStatus>,
}

/// Settings edits; `None` leaves a field alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsUpdate {
    /// Document-read check.
    pub strict_doc_read: Option<bool>,
    /// New file reference check.
    pub strict_file_ref: Option<bool>,
    /// Work log check.
    pub strict_log_entry: Option<bool>,
    /// Root for relative file paths; `Some(None)` clears it.
    pub project_root: Option<Option<String>>,
    /// Monitor switch.
    pub monitor_enabled: Option<bool>,
    /// Directory the monitor watches; `Some(None)` clears it.
    pub monitor_path: Option<Option<String>>,
    /// Extensions the monitor tracks.
    pub monitor_extensions: Option<Vec<String>>,
}

/// Team and project management with `user_action` audit entries.
pub struct TeamService<'a, E, C>
where
    E: PersistenceEngine + ?Sized,
    C: Clock,
{
    engine: &'a mut E,
    clock: Arc<C>,
    actor: Option<String>,
}

impl<'a, E, C> TeamService<'a, E, C>
where
    E: PersistenceEngine + ?Sized,
    C: Clock,
{
    /// Creates a team service over `engine`.
    #[must_use]
    pub const fn new(engine: &'a mut E, clock: Arc<C>) -> Self {
        Self {
            engine,
            clock,
            actor: None,
        }
    }

    /// Records `actor` as the user of every audit entry.
    #[must_use]
    pub fn acting_as(mut self, actor: impl Into<String>) -> Self {
        self.actor = Some(actor.into());
        self
    }

    fn audit(&self, message: String) -> NewLogEntry {
        NewLogEntry::new(LogEntryType::UserAction, message, self.clock.utc()).by_user(self.actor.clone())
    }

    fn require_member(&mut self, id: &MemberId) -> TeamResult<Member> {
        self.engine
            .get_member(id)?
            .ok_or_else(|| TeamError::MemberNotFound(id.clone()))
    }

    fn require_project(&mut self, id: &ProjectId) -> TeamResult<Project> {
        self.engine
            .get_project(id)?
            .ok_or_else(|| TeamError::ProjectNotFound(id.clone()))
    }

    fn ensure_acyclic(&mut self, member: &MemberId, leader: &MemberId) -> TeamResult<()> {
        self.require_member(leader)?;
        let members = self.engine.list_members(&MemberFilter::default())?;
        let graph = LeaderGraph::from_members(&members);
        if member == leader || graph.would_create_cycle(member, leader) {
            return Err(TeamError::LeaderCycle {
                member: member.clone(),
                leader: leader.clone(),
            });
        }
        Ok(())
    }

    /// Stores a new member.
    ///
    /// # Errors
    ///
    /// Returns [`TeamError::MemberNotFound`] for an unknown leader,
    /// [`TeamError::LeaderCycle`], or a storage error.
    pub fn add_member(&mut self, member: Member) -> TeamResult<Member> {
        if let Some(leader) = member.leader_id() {
            self.ensure_acyclic(member.id(), leader)?;
        }
        let log = self
            .audit(format!("Member added: {}", member.name()))
            .with_metadata("member_id", Value::from(member.id().as_str()));
        within_transaction(&mut *self.engine, |engine| {
            engine.create_member(&member)?;
            engine.add_log_entry(&log)?;
            Ok::<_, TeamError>(())
        })?;
        Ok(member)
    }

    /// Applies member edits.
    ///
    /// # Errors
    ///
    /// Returns [`TeamError::MemberNotFound`], [`TeamError::LeaderCycle`], a
    /// domain error for a blank name, or a storage error.
    pub fn update_member(&mut self, id: &MemberId, update: MemberUpdate) -> TeamResult<Member> {
        let mut member = self.require_member(id)?;
        if let Some(Some(leader)) = &update.leader_id {
            self.ensure_acyclic(id, leader)?;
        }
        let clock = &*self.clock;
        if let Some(name) = update.name {
            member.rename(name, clock)?;
        }
        if let Some(role) = update.role {
            member.set_role(role, clock);
        }
        if let Some(position) = update.position {
            member.set_position(position, clock);
        }
        if let Some(leader_id) = update.leader_id {
            member.set_leader(leader_id, clock);
        }
        if let Some(profile) = update.profile {
            member.set_profile(profile, clock);
        }
        let log = self
            .audit(format!("Member updated: {}", member.name()))
            .with_metadata("member_id", Value::from(id.as_str()));
        within_transaction(&mut *self.engine, |engine| {
            if !engine.update_member(&member)? {
                return Err(TeamError::MemberNotFound(member.id().clone()));
            }
            engine.add_log_entry(&log)?;
            Ok(())
        })?;
        Ok(member)
    }

    /// Points a member at a new leader, or removes it.
    ///
    /// # Errors
    ///
    /// See [`Self::update_member`].
    pub fn set_leader(&mut self, id: &MemberId, leader_id: Option<MemberId>) -> TeamResult<Member> {
        self.update_member(
            id,
            MemberUpdate {
                leader_id: Some(leader_id),
                ..MemberUpdate::default()
            },
        )
    }

    /// Deletes a member; its reports lose their leader.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub fn remove_member(&mut self, id: &MemberId) -> TeamResult<bool> {
        let log = self
            .audit(format!("Member removed: {id}"))
            .with_metadata("member_id", Value::from(id.as_str()));
        within_transaction(&mut *self.engine, |engine| {
            let removed = engine.delete_member(id)?;
            if removed {
                engine.add_log_entry(&log)?;
            }
            Ok(removed)
        })
    }

    /// Lists members by name.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub fn list_members(&mut self, filter: &MemberFilter) -> TeamResult<Vec<Member>> {
        Ok(self.engine.list_members(filter)?)
    }

    /// Builds the reporting tree under `leader`.
    ///
    /// Members already placed in the tree are not visited again, so a
    /// cycle in stored data ends the branch.
    ///
    /// # Errors
    ///
    /// Returns [`TeamError::MemberNotFound`] or a storage error.
    pub fn team_structure(&mut self, leader: &MemberId) -> TeamResult<TeamNode> {
        let root = self.require_member(leader)?;
        let members = self.engine.list_members(&MemberFilter::default())?;
        let graph = LeaderGraph::from_members(&members);
        let by_id: BTreeMap<MemberId, Member> = members
            .into_iter()
            .map(|member| (member.id().clone(), member))
            .collect();
        let mut placed = BTreeSet::from([root.id().clone()]);
        Ok(build_node(root, &graph, &by_id, &mut placed))
    }

    /// Stores a new project.
    ///
    /// # Errors
    ///
    /// Returns [`TeamError::MemberNotFound`] for an unknown owner, or a
    /// storage error.
    pub fn add_project(&mut self, project: Project) -> TeamResult<Project> {
        if let Some(owner) = project.owner_id() {
            self.require_member(owner)?;
        }
        let log = self
            .audit(format!("Project created: {}", project.name()))
            .with_metadata("project_id", Value::from(project.id().as_str()));
        within_transaction(&mut *self.engine, |engine| {
            engine.create_project(&project)?;
            engine.add_log_entry(&log)?;
            Ok::<_, TeamError>(())
        })?;
        Ok(project)
    }

    /// Applies project edits.
    ///
    /// # Errors
    ///
    /// Returns [`TeamError::ProjectNotFound`], [`TeamError::MemberNotFound`]
    /// for an unknown owner, a domain error for a blank name, or a storage
    /// error.
    pub fn update_project(&mut self, id: &ProjectId, update: ProjectUpdate) -> TeamResult<Project> {
        let mut project = self.require_project(id)?;
        if let Some(Some(owner)) = &update.owner_id {
            self.require_member(owner)?;
        }
        let clock = &*self.clock;
        if let Some(name) = update.name {
            project.rename(name, clock)?;
        }
        if let Some(description) = update.description {
            project.set_description(description, clock);
        }
        if let Some(owner_id) = update.owner_id {
            project.set_owner(owner_id, clock);
        }
        if let Some(status) = update.status {
            project.set_status(status, clock);
        }
        let log = self
            .audit(format!("Project updated: {}", project.name()))
            .with_metadata("project_id", Value::from(id.as_str()));
        within_transaction(&mut *self.engine, |engine| {
            if !engine.update_project(&project)? {
                return Err(TeamError::ProjectNotFound(project.id().clone()));
            }
            engine.add_log_entry(&log)?;
            Ok(())
        })?;
        Ok(project)
    }

    /// Deletes a project with its memberships and settings.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub fn remove_project(&mut self, id: &ProjectId) -> TeamResult<bool> {
        let log = self
            .audit(format!("Project deleted: {id}"))
            .with_metadata("project_id", Value::from(id.as_str()));
        within_transaction(&mut *self.engine, |engine| {
            let removed = engine.delete_project(id)?;
            if removed {
                engine.add_log_entry(&log)?;
            }
            Ok(removed)
        })
    }

    /// Adds an existing member to an existing project.
    ///
    /// # Errors
    ///
    /// Returns [`TeamError::ProjectNotFound`], [`TeamError::MemberNotFound`],
    /// or [`PersistenceError::AlreadyExists`] when already a member.
    pub fn join_project(&mut self, project_id: &ProjectId, member_id: &MemberId) -> TeamResult<ProjectMembership> {
        self.require_project(project_id)?;
        self.require_member(member_id)?;
        let membership = ProjectMembership {
            project_id: project_id.clone(),
            member_id: member_id.clone(),
            joined_at: self.clock.utc(),
        };
        let log = self
            .audit(format!("Member {member_id} joined project {project_id}"))
            .with_metadata("project_id", Value::from(project_id.as_str()))
            .with_metadata("member_id", Value::from(member_id.as_str()));
        within_transaction(&mut *self.engine, |engine| {
            engine.add_project_member(&membership)?;
            engine.add_log_entry(&log)?;
            Ok::<_, TeamError>(())
        })?;
        Ok(membership)
    }

    /// Removes a member from a project.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub fn leave_project(&mut self, project_id: &ProjectId, member_id: &MemberId) -> TeamResult<bool> {
        let log = self
            .audit(format!("Member {member_id} left project {project_id}"))
            .with_metadata("project_id", Value::from(project_id.as_str()))
            .with_metadata("member_id", Value::from(member_id.as_str()));
        within_transaction(&mut *self.engine, |engine| {
            let removed = engine.remove_project_member(project_id, member_id)?;
            if removed {
                engine.add_log_entry(&log)?;
            }
            Ok(removed)
        })
    }

    /// Members of a project.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub fn project_members(&mut self, project_id: &ProjectId) -> TeamResult<Vec<Member>> {
        Ok(self.engine.list_project_members(project_id)?)
    }

    /// Projects a member belongs to.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub fn member_projects(&mut self, member_id: &MemberId) -> TeamResult<Vec<Project>> {
        Ok(self.engine.list_member_projects(member_id)?)
    }

    /// Lists projects.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub fn list_projects(&mut self, filter: &ProjectFilter) -> TeamResult<Vec<Project>> {
        Ok(self.engine.list_projects(filter)?)
    }

    /// Applies settings edits, creating the settings on first write.
    ///
    /// # Errors
    ///
    /// Returns [`TeamError::ProjectNotFound`] or a storage error.
    pub fn update_settings(&mut self, project_id: &ProjectId, update: SettingsUpdate) -> TeamResult<ProjectSettings> {
        self.require_project(project_id)?;
        let now = self.clock.utc();
        let mut settings = self
            .engine
            .get_project_settings(project_id)?
            .unwrap_or_else(|| ProjectSettings::new(project_id.clone(), &*self.clock));
        if let Some(doc_read) = update.strict_doc_read {
            settings.strict.doc_read = doc_read;
        }
        if let Some(file_ref) = update.strict_file_ref {
            settings.strict.file_ref = file_ref;
        }
        if let Some(log_entry) = update.strict_log_entry {
            settings.strict.log_entry = log_entry;
        }
        if let Some(project_root) = update.project_root {
            settings.project_root = project_root;
        }
        if let Some(monitor_enabled) = update.monitor_enabled {
            settings.monitor_enabled = monitor_enabled;
        }
        if let Some(monitor_path) = update.monitor_path {
            settings.monitor_path = monitor_path;
        }
        if let Some(extensions) = update.monitor_extensions {
            settings.monitor_extensions = extensions;
        }
        settings.updated_at = now;
        let log = self
            .audit(format!("Project settings updated: {project_id}"))
            .with_metadata("project_id", Value::from(project_id.as_str()));
        within_transaction(&mut *self.engine, |engine| {
            engine.save_project_settings(&settings)?;
            engine.add_log_entry(&log)?;
            Ok::<_, TeamError>(())
        })?;
        Ok(settings)
    }
}

fn build_node(
    member: Member,
    graph: &LeaderGraph,
    by_id: &BTreeMap<MemberId, Member>,
    placed: &mut BTreeSet<MemberId>,
) -> TeamNode {
    let mut reports = Vec::new();
    for report_id in graph.direct_reports(member.id()) {
        if !placed.insert(report_id.clone()) {
            continue;
        }
        if let Some(report) = by_id.get(&report_id) {
            reports.push(build_node(report.clone(), graph, by_id, placed));
        }
    }
    TeamNode { member, reports }
}
