//! Team members and their organizational placement.

use super::{DomainError, MemberId, required_text};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};

/// Role a member plays in the team.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MemberRole {
    /// Product owner.
    Owner,
    /// Project manager.
    Pm,
    /// Technical lead.
    Tl,
    /// Software engineer.
    #[default]
    Engineer,
    /// Database specialist.
    Db,
    /// Tester.
    Tester,
    /// Designer.
    Designer,
    /// Analyst.
    Analyst,
    /// Anything else.
    Other,
}

impl MemberRole {
    /// Every role, in declaration order.
    pub const ALL: [Self; 9] = [
        Self::Owner,
        Self::Pm,
        Self::Tl,
        Self::Engineer,
        Self::Db,
        Self::Tester,
        Self::Designer,
        Self::Analyst,
        Self::Other,
    ];

    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Owner => "OWNER",
            Self::Pm => "PM",
            Self::Tl => "TL",
            Self::Engineer => "ENGINEER",
            Self::Db => "DB",
            Self::Tester => "TESTER",
            Self::Designer => "DESIGNER",
            Self::Analyst => "ANALYST",
            Self::Other => "OTHER",
        }
    }
}

impl TryFrom<&str> for MemberRole {
    type Error = DomainError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_uppercase();
        Self::ALL
            .into_iter()
            .find(|role| role.as_str() == normalized)
            .ok_or_else(|| DomainError::unknown("member role", value))
    }
}

/// Position of a member in the leader tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MemberPosition {
    /// Leads a team.
    Leader,
    /// Deputy of a leader.
    SubLeader,
    /// Regular member.
    #[default]
    Member,
}

impl MemberPosition {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Leader => "LEADER",
            Self::SubLeader => "SUB_LEADER",
            Self::Member => "MEMBER",
        }
    }
}

impl TryFrom<&str> for MemberPosition {
    type Error = DomainError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_uppercase().replace('-', "_").as_str() {
            "LEADER" => Ok(Self::Leader),
            "SUB_LEADER" => Ok(Self::SubLeader),
            "MEMBER" => Ok(Self::Member),
            _ => Err(DomainError::unknown("member position", value)),
        }
    }
}

/// Optional descriptive fields of a member.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberProfile {
    /// Age in years.
    pub age: Option<u32>,
    /// Free-text sex or gender.
    pub sex: Option<String>,
    /// Free-text profile.
    pub profile: Option<String>,
    /// Path to a profile picture.
    pub profile_image_path: Option<String>,
}

/// A person who can be assigned tasks and placed under a leader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    id: MemberId,
    name: String,
    role: MemberRole,
    position: MemberPosition,
    leader_id: Option<MemberId>,
    profile: MemberProfile,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Parameter object for reconstructing a persisted member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedMemberData {
    /// Persisted identifier.
    pub id: MemberId,
    /// Persisted name.
    pub name: String,
    /// Persisted role.
    pub role: MemberRole,
    /// Persisted position.
    pub position: MemberPosition,
    /// Persisted leader.
    pub leader_id: Option<MemberId>,
    /// Persisted profile fields.
    pub profile: MemberProfile,
    /// Persisted creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Persisted update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Member {
    /// Creates a member without a leader.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::EmptyField`] when the name is blank.
    pub fn new(
        id: MemberId,
        name: impl Into<String>,
        role: MemberRole,
        clock: &impl Clock,
    ) -> Result<Self, DomainError> {
        let timestamp = clock.utc();
        Ok(Self {
            id,
            name: required_text(&name.into(), "name")?,
            role,
            position: MemberPosition::default(),
            leader_id: None,
            profile: MemberProfile::default(),
            created_at: timestamp,
            updated_at: timestamp,
        })
    }

    /// Reconstructs a member from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedMemberData) -> Self {
        Self {
            id: data.id,
            name: data.name,
            role: data.role,
            position: data.position,
            leader_id: data.leader_id,
            profile: data.profile,
            created_at: data.created_at,
            updated_at: data.updated_at,
        }
    }

    /// Sets the position at construction time.
    #[must_use]
    pub const fn with_position(mut self, position: MemberPosition) -> Self {
        self.position = position;
        self
    }

    /// Sets the leader at construction time.
    #[must_use]
    pub fn with_leader(mut self, leader_id: MemberId) -> Self {
        self.leader_id = Some(leader_id);
        self
    }

    /// Sets the profile fields at construction time.
    #[must_use]
    pub fn with_profile(mut self, profile: MemberProfile) -> Self {
        self.profile = profile;
        self
    }

    /// Returns the identifier.
    #[must_use]
    pub const fn id(&self) -> &MemberId {
        &self.id
    }

    /// Returns the display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the role.
    #[must_use]
    pub const fn role(&self) -> MemberRole {
        self.role
    }

    /// Returns the position.
    #[must_use]
    pub const fn position(&self) -> MemberPosition {
        self.position
    }

    /// Returns the leader, if any.
    #[must_use]
    pub const fn leader_id(&self) -> Option<&MemberId> {
        self.leader_id.as_ref()
    }

    /// Returns the profile fields.
    #[must_use]
    pub const fn profile(&self) -> &MemberProfile {
        &self.profile
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

    /// Replaces the display name.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::EmptyField`] when the name is blank.
    pub fn rename(&mut self, name: impl Into<String>, clock: &impl Clock) -> Result<(), DomainError> {
        self.name = required_text(&name.into(), "name")?;
        self.updated_at = clock.utc();
        Ok(())
    }

    /// Replaces the role.
    pub fn set_role(&mut self, role: MemberRole, clock: &impl Clock) {
        self.role = role;
        self.updated_at = clock.utc();
    }

    /// Replaces the position.
    pub fn set_position(&mut self, position: MemberPosition, clock: &impl Clock) {
        self.position = position;
        self.updated_at = clock.utc();
    }

    /// Replaces the leader. Cycle checks belong to the caller.
    pub fn set_leader(&mut self, leader_id: Option<MemberId>, clock: &impl Clock) {
        self.leader_id = leader_id;
        self.updated_at = clock.utc();
    }

    /// Replaces the profile fields.
    pub fn set_profile(&mut self, profile: MemberProfile, clock: &impl Clock) {
        self.profile = profile;
        self.updated_at = clock.utc();
    }
}
