use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use research_hub_core::{Team, TeamInvitation, TeamMember, TeamRole, UserCard};

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub(super) struct CreateTeamRequest {
    #[serde(default)]
    pub name: String,
    pub description: Option<String>,
    #[validate(range(min = 1, message = "Max members must be at least 1"))]
    pub max_members: Option<i32>,
    /// Registered users added directly as members.
    #[serde(default)]
    pub member_ids: Vec<String>,
    /// People to add by email; unknown addresses get an invitation.
    #[serde(default)]
    #[validate(nested)]
    pub members: Vec<InviteeRequest>,
}

#[derive(Debug, Deserialize, Validate)]
pub(super) struct InviteeRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    pub role: Option<TeamRole>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub(super) struct UpdateTeamRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    #[validate(range(min = 1, message = "Max members must be at least 1"))]
    pub max_members: Option<i32>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub(super) struct AddMemberRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: Option<String>,
    pub user_id: Option<String>,
    pub role: Option<TeamRole>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct MemberView {
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub avatar: Option<String>,
    pub role: TeamRole,
    pub joined_at: DateTime<Utc>,
}

impl MemberView {
    pub fn new(member: &TeamMember, card: UserCard) -> Self {
        Self {
            user_id: member.user_id.clone(),
            name: card.name,
            email: card.email,
            avatar: card.avatar,
            role: member.role,
            joined_at: member.joined_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct TeamDetail {
    #[serde(flatten)]
    pub team: Team,
    pub creator: Option<UserCard>,
    pub members: Vec<MemberView>,
    pub member_count: usize,
    pub is_leader: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct MyTeamView {
    #[serde(flatten)]
    pub team: Team,
    pub member_count: usize,
    pub member_role: TeamRole,
    pub is_leader: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct InvitationView {
    #[serde(flatten)]
    pub invitation: TeamInvitation,
    pub team_name: Option<String>,
    pub invited_by_user: Option<UserCard>,
}

#[derive(Debug, Serialize)]
pub(super) struct InvitationSentResponse {
    pub message: &'static str,
    pub invitation: TeamInvitation,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct JoinedTeamResponse {
    pub message: &'static str,
    pub team_id: String,
}
