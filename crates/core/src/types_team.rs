use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Role of a user inside a team.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TeamRole {
    Leader,
    #[default]
    Member,
}

impl TeamRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Leader => "leader",
            Self::Member => "member",
        }
    }
}

impl From<String> for TeamRole {
    fn from(s: String) -> Self {
        match s.to_lowercase().as_str() {
            "leader" => Self::Leader,
            _ => Self::Member,
        }
    }
}

impl std::fmt::Display for TeamRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Invitation status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvitationStatus {
    #[default]
    Pending,
    Accepted,
    Declined,
}

impl InvitationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Declined => "declined",
        }
    }
}

impl From<String> for InvitationStatus {
    fn from(s: String) -> Self {
        match s.to_lowercase().as_str() {
            "accepted" => Self::Accepted,
            "declined" => Self::Declined,
            _ => Self::Pending,
        }
    }
}

impl std::fmt::Display for InvitationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Research team
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx-postgres", derive(sqlx::FromRow))]
pub struct Team {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    #[serde(rename = "createdBy")]
    pub created_by: String,
    #[serde(rename = "maxMembers")]
    pub max_members: Option<i32>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl Team {
    /// Whether a team of `member_count` people can take one more.
    pub fn has_room(&self, member_count: usize) -> bool {
        match self.max_members {
            Some(max) if max >= 0 => member_count < max as usize,
            _ => true,
        }
    }
}

/// Team membership row
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx-postgres", derive(sqlx::FromRow))]
pub struct TeamMember {
    pub id: String,
    #[serde(rename = "teamId")]
    pub team_id: String,
    #[serde(rename = "userId")]
    pub user_id: String,
    #[cfg_attr(feature = "sqlx-postgres", sqlx(try_from = "String"))]
    pub role: TeamRole,
    #[serde(rename = "joinedAt")]
    pub joined_at: DateTime<Utc>,
}

impl TeamMember {
    pub fn is_leader(&self) -> bool {
        self.role == TeamRole::Leader
    }
}

/// Pending or settled invitation for an email address to join a team.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx-postgres", derive(sqlx::FromRow))]
pub struct TeamInvitation {
    pub id: String,
    #[serde(rename = "teamId")]
    pub team_id: String,
    pub email: String,
    #[cfg_attr(feature = "sqlx-postgres", sqlx(try_from = "String"))]
    pub role: TeamRole,
    pub token: String,
    #[cfg_attr(feature = "sqlx-postgres", sqlx(try_from = "String"))]
    pub status: InvitationStatus,
    #[serde(rename = "invitedBy")]
    pub invited_by: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "acceptedAt")]
    pub accepted_at: Option<DateTime<Utc>>,
}

impl TeamInvitation {
    pub fn is_pending(&self) -> bool {
        self.status == InvitationStatus::Pending
    }
}

/// Member added at team creation time.
#[derive(Debug, Clone)]
pub struct NewMember {
    pub user_id: String,
    pub role: TeamRole,
}

/// Invitation issued at team creation time for an unregistered email.
#[derive(Debug, Clone)]
pub struct NewInvitee {
    pub email: String,
    pub role: TeamRole,
    pub token: String,
}

/// Everything written when a team is created. The creator is always added
/// as the sole leader; `members` with the creator's id are skipped.
#[derive(Debug, Clone)]
pub struct CreateTeam {
    pub name: String,
    pub description: Option<String>,
    pub max_members: Option<i32>,
    pub created_by: String,
    pub members: Vec<NewMember>,
    pub invitations: Vec<NewInvitee>,
}

impl CreateTeam {
    pub fn new(name: impl Into<String>, created_by: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            max_members: None,
            created_by: created_by.into(),
            members: Vec::new(),
            invitations: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }

    pub fn with_max_members(mut self, max_members: Option<i32>) -> Self {
        self.max_members = max_members;
        self
    }

    pub fn with_member(mut self, user_id: impl Into<String>, role: TeamRole) -> Self {
        self.members.push(NewMember {
            user_id: user_id.into(),
            role,
        });
        self
    }

    pub fn with_invitee(
        mut self,
        email: impl Into<String>,
        role: TeamRole,
        token: impl Into<String>,
    ) -> Self {
        self.invitations.push(NewInvitee {
            email: email.into().trim().to_lowercase(),
            role,
            token: token.into(),
        });
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct UpdateTeam {
    pub name: Option<String>,
    pub description: Option<String>,
    pub max_members: Option<i32>,
}

#[derive(Debug, Clone)]
pub struct CreateTeamMember {
    pub team_id: String,
    pub user_id: String,
    pub role: TeamRole,
}

#[derive(Debug, Clone)]
pub struct CreateTeamInvitation {
    pub team_id: String,
    pub email: String,
    pub role: TeamRole,
    pub token: String,
    pub invited_by: String,
}
