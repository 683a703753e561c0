use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::ApiResult;
use crate::types::{
    ActivityEntry, Citation, CreateActivity, CreateCitation, CreateDataset, CreateEvent,
    CreatePaper, CreateProject, CreateTeam, CreateTeamInvitation, CreateTeamMember, CreateUser,
    DashboardCounts, Dataset, DatasetFilter, Event, EventFilter, EventRegistration, Paper,
    PaperFilter, PaperWithCitations, Project, ProjectFilter, Team, TeamInvitation, TeamMember,
    UpdateProject, UpdateTeam, UpdateUser, User,
};

/// User persistence operations. Emails are matched case-insensitively.
#[async_trait]
pub trait UserOps: Send + Sync + 'static {
    /// Fails with 400 `User already exists` on a duplicate email.
    async fn create_user(&self, user: CreateUser) -> ApiResult<User>;
    async fn get_user_by_id(&self, id: &str) -> ApiResult<Option<User>>;
    async fn get_user_by_email(&self, email: &str) -> ApiResult<Option<User>>;
    async fn update_user(&self, id: &str, update: UpdateUser) -> ApiResult<User>;
    /// Users whose first name, last name or email contains `query`
    /// (case-insensitive), excluding `exclude_id`, ordered by name.
    async fn search_users(
        &self,
        query: &str,
        exclude_id: &str,
        limit: usize,
    ) -> ApiResult<Vec<User>>;
}

/// Team and membership operations.
///
/// The composite writes (`create_team`, `add_team_member`,
/// `remove_team_member`) are atomic: capacity and last-leader checks are
/// made against the same state the write lands in.
#[async_trait]
pub trait TeamOps: Send + Sync + 'static {
    /// Insert the team, the creator as leader, the listed members and the
    /// pending invitations in one unit.
    async fn create_team(&self, team: CreateTeam) -> ApiResult<Team>;
    async fn get_team(&self, id: &str) -> ApiResult<Option<Team>>;
    async fn update_team(&self, id: &str, update: UpdateTeam) -> ApiResult<Team>;
    /// Teams `user_id` belongs to, newest first, optionally filtered by a
    /// case-insensitive substring of name or description.
    async fn list_user_teams(&self, user_id: &str, search: Option<&str>) -> ApiResult<Vec<Team>>;
    async fn get_team_member(&self, team_id: &str, user_id: &str)
    -> ApiResult<Option<TeamMember>>;
    /// Members in join order.
    async fn list_team_members(&self, team_id: &str) -> ApiResult<Vec<TeamMember>>;
    /// 404 for a missing team, 400 `User is already a team member`,
    /// 400 `Team is full`.
    async fn add_team_member(&self, member: CreateTeamMember) -> ApiResult<TeamMember>;
    /// 404 `Team member not found`, 400 `Cannot remove last team leader`.
    async fn remove_team_member(&self, team_id: &str, user_id: &str) -> ApiResult<()>;
}

/// Team invitation operations.
#[async_trait]
pub trait InvitationOps: Send + Sync + 'static {
    async fn create_invitation(&self, invitation: CreateTeamInvitation)
    -> ApiResult<TeamInvitation>;
    async fn get_invitation_by_token(&self, token: &str) -> ApiResult<Option<TeamInvitation>>;
    /// Pending invitations addressed to `email`, newest first.
    async fn list_pending_invitations(&self, email: &str) -> ApiResult<Vec<TeamInvitation>>;
    /// Add `user_id` to the invitation's team with the invited role and
    /// mark the invitation accepted, atomically. 404 when the invitation is
    /// missing or no longer pending; membership errors as
    /// [`TeamOps::add_team_member`].
    async fn accept_invitation(&self, token: &str, user_id: &str) -> ApiResult<TeamMember>;
}

/// Project operations.
#[async_trait]
pub trait ProjectOps: Send + Sync + 'static {
    async fn create_project(&self, project: CreateProject) -> ApiResult<Project>;
    async fn get_project(&self, id: &str) -> ApiResult<Option<Project>>;
    /// Projects the filter's viewer may see (public, created by them, or
    /// belonging to one of their teams), newest first.
    async fn list_projects(&self, filter: ProjectFilter) -> ApiResult<Vec<Project>>;
    async fn update_project(&self, id: &str, update: UpdateProject) -> ApiResult<Project>;
    /// Remove the project together with its papers, their citations and
    /// its datasets.
    async fn delete_project(&self, id: &str) -> ApiResult<()>;
}

/// Papers, citations and datasets.
#[async_trait]
pub trait ResearchOps: Send + Sync + 'static {
    async fn create_paper(&self, paper: CreatePaper) -> ApiResult<Paper>;
    async fn get_paper(&self, id: &str) -> ApiResult<Option<Paper>>;
    /// Papers of projects the viewer may see, newest first.
    async fn list_papers(&self, filter: PaperFilter) -> ApiResult<Vec<PaperWithCitations>>;
    async fn create_citation(&self, citation: CreateCitation) -> ApiResult<Citation>;
    /// Citations of a paper, oldest first.
    async fn list_citations(&self, paper_id: &str) -> ApiResult<Vec<Citation>>;
    async fn create_dataset(&self, dataset: CreateDataset) -> ApiResult<Dataset>;
    /// Datasets of projects the viewer may see, newest first.
    async fn list_datasets(&self, filter: DatasetFilter) -> ApiResult<Vec<Dataset>>;
}

/// Events and registrations.
#[async_trait]
pub trait EventOps: Send + Sync + 'static {
    async fn create_event(&self, event: CreateEvent) -> ApiResult<Event>;
    async fn get_event(&self, id: &str) -> ApiResult<Option<Event>>;
    /// Matching events ordered by start date.
    async fn list_events(&self, filter: EventFilter) -> ApiResult<Vec<Event>>;
    /// Registrations in signup order.
    async fn list_event_registrations(&self, event_id: &str)
    -> ApiResult<Vec<EventRegistration>>;
    /// Atomic check-and-insert: 404 `Event not found`,
    /// 400 `Already registered for this event`, 400 `Event is full`.
    async fn register_for_event(
        &self,
        event_id: &str,
        user_id: &str,
    ) -> ApiResult<EventRegistration>;
    /// 404 `Registration not found`.
    async fn unregister_from_event(&self, event_id: &str, user_id: &str) -> ApiResult<()>;
    /// Events `user_id` registered for that start after `now`, soonest first.
    async fn list_upcoming_events(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> ApiResult<Vec<Event>>;
}

/// Activity log and dashboard aggregates.
#[async_trait]
pub trait ActivityOps: Send + Sync + 'static {
    async fn log_activity(&self, activity: CreateActivity) -> ApiResult<ActivityEntry>;
    /// Most recent entries by `user_id`, newest first.
    async fn list_user_activity(&self, user_id: &str, limit: usize)
    -> ApiResult<Vec<ActivityEntry>>;
    /// Counts for the dashboard; "recent" means within 30 days of `now`.
    async fn dashboard_counts(&self, user_id: &str, now: DateTime<Utc>)
    -> ApiResult<DashboardCounts>;
}
