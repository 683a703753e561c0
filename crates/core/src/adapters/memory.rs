use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::types::{
    ActivityEntry, Citation, CreateActivity, CreateCitation, CreateDataset, CreateEvent,
    CreatePaper, CreateProject, CreateTeam, CreateTeamInvitation, CreateTeamMember, CreateUser,
    DashboardCounts, Dataset, DatasetFilter, Event, EventFilter, EventRegistration,
    InvitationStatus, Paper, PaperFilter, PaperWithCitations, Project, ProjectFilter, Team,
    TeamInvitation, TeamMember, TeamRole, UpdateProject, UpdateTeam, UpdateUser, User, Visibility,
};

use super::memory_traits::{ApplyUpdate, FromCreate};
use super::traits::{
    ActivityOps, EventOps, InvitationOps, ProjectOps, ResearchOps, TeamOps, UserOps,
};

/// Window used for the dashboard's "recent" counts.
const RECENT_WINDOW_DAYS: i64 = 30;

/// Every table of the in-memory store. Rows are kept in insertion order,
/// so "newest first" is a reverse scan.
#[derive(Default)]
struct Tables {
    users: Vec<User>,
    teams: Vec<Team>,
    members: Vec<TeamMember>,
    invitations: Vec<TeamInvitation>,
    projects: Vec<Project>,
    papers: Vec<Paper>,
    citations: Vec<Citation>,
    datasets: Vec<Dataset>,
    events: Vec<Event>,
    registrations: Vec<EventRegistration>,
    activity: Vec<ActivityEntry>,
}

impl Tables {
    fn user(&self, id: &str) -> Option<&User> {
        self.users.iter().find(|u| u.id == id)
    }

    fn team(&self, id: &str) -> Option<&Team> {
        self.teams.iter().find(|t| t.id == id)
    }

    fn project(&self, id: &str) -> Option<&Project> {
        self.projects.iter().find(|p| p.id == id)
    }

    fn member(&self, team_id: &str, user_id: &str) -> Option<&TeamMember> {
        self.members
            .iter()
            .find(|m| m.team_id == team_id && m.user_id == user_id)
    }

    fn member_count(&self, team_id: &str) -> usize {
        self.members.iter().filter(|m| m.team_id == team_id).count()
    }

    fn can_view(&self, project: &Project, viewer_id: &str) -> bool {
        project.visibility == Visibility::Public
            || project.created_by == viewer_id
            || project
                .team_id
                .as_deref()
                .is_some_and(|team_id| self.member(team_id, viewer_id).is_some())
    }

    fn can_view_project_id(&self, project_id: &str, viewer_id: &str) -> bool {
        self.project(project_id)
            .is_some_and(|p| self.can_view(p, viewer_id))
    }

    fn insert_member(
        &mut self,
        create: &CreateTeamMember,
        now: DateTime<Utc>,
    ) -> ApiResult<TeamMember> {
        let team = self
            .team(&create.team_id)
            .ok_or_else(|| ApiError::not_found("Team not found"))?;

        if self.member(&create.team_id, &create.user_id).is_some() {
            return Err(ApiError::bad_request("User is already a team member"));
        }
        if !team.has_room(self.member_count(&create.team_id)) {
            return Err(ApiError::bad_request("Team is full"));
        }

        let member = TeamMember::from_create(Uuid::new_v4().to_string(), create, now);
        self.members.push(member.clone());
        Ok(member)
    }
}

/// In-memory database adapter for tests and local development.
///
/// All tables sit behind one lock, so each composite operation observes and
/// mutates a consistent snapshot.
#[derive(Clone, Default)]
pub struct MemoryDatabaseAdapter {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryDatabaseAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> ApiResult<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| ApiError::internal("In-memory store lock poisoned"))
    }
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

fn contains_ci(haystack: Option<&str>, needle_lower: &str) -> bool {
    haystack.is_some_and(|h| h.to_lowercase().contains(needle_lower))
}

#[async_trait]
impl UserOps for MemoryDatabaseAdapter {
    async fn create_user(&self, create: CreateUser) -> ApiResult<User> {
        let mut tables = self.tables()?;
        let email = create.email.to_lowercase();
        if tables.users.iter().any(|u| u.email == email) {
            return Err(ApiError::bad_request("User already exists"));
        }

        let user = User::from_create(new_id(), &create, Utc::now());
        tables.users.push(user.clone());
        Ok(user)
    }

    async fn get_user_by_id(&self, id: &str) -> ApiResult<Option<User>> {
        Ok(self.tables()?.user(id).cloned())
    }

    async fn get_user_by_email(&self, email: &str) -> ApiResult<Option<User>> {
        let email = email.trim().to_lowercase();
        Ok(self
            .tables()?
            .users
            .iter()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn update_user(&self, id: &str, update: UpdateUser) -> ApiResult<User> {
        let mut tables = self.tables()?;
        let user = tables
            .users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or(ApiError::UserNotFound)?;
        user.apply_update(&update, Utc::now());
        Ok(user.clone())
    }

    async fn search_users(
        &self,
        query: &str,
        exclude_id: &str,
        limit: usize,
    ) -> ApiResult<Vec<User>> {
        let needle = query.trim().to_lowercase();
        let tables = self.tables()?;
        let mut found: Vec<User> = tables
            .users
            .iter()
            .filter(|u| u.id != exclude_id)
            .filter(|u| {
                contains_ci(Some(&u.first_name), &needle)
                    || contains_ci(Some(&u.last_name), &needle)
                    || contains_ci(Some(&u.email), &needle)
            })
            .cloned()
            .collect();
        found.sort_by(|a, b| {
            (a.first_name.as_str(), a.last_name.as_str())
                .cmp(&(b.first_name.as_str(), b.last_name.as_str()))
        });
        found.truncate(limit);
        Ok(found)
    }
}

#[async_trait]
impl TeamOps for MemoryDatabaseAdapter {
    async fn create_team(&self, create: CreateTeam) -> ApiResult<Team> {
        let mut tables = self.tables()?;
        let now = Utc::now();

        // Validate everything before the first write.
        let mut member_rows: Vec<(String, TeamRole)> =
            vec![(create.created_by.clone(), TeamRole::Leader)];
        for member in &create.members {
            if member_rows.iter().any(|(id, _)| id == &member.user_id) {
                continue;
            }
            if tables.user(&member.user_id).is_none() {
                return Err(ApiError::UserNotFound);
            }
            member_rows.push((member.user_id.clone(), member.role));
        }
        if let Some(max) = create.max_members
            && member_rows.len() > max.max(0) as usize
        {
            return Err(ApiError::bad_request("Team is full"));
        }

        let team = Team {
            id: new_id(),
            name: create.name.clone(),
            description: create.description.clone(),
            created_by: create.created_by.clone(),
            max_members: create.max_members,
            created_at: now,
            updated_at: now,
        };
        tables.teams.push(team.clone());

        for (user_id, role) in member_rows {
            let row = CreateTeamMember {
                team_id: team.id.clone(),
                user_id,
                role,
            };
            tables
                .members
                .push(TeamMember::from_create(new_id(), &row, now));
        }

        for invitee in &create.invitations {
            let row = CreateTeamInvitation {
                team_id: team.id.clone(),
                email: invitee.email.clone(),
                role: invitee.role,
                token: invitee.token.clone(),
                invited_by: create.created_by.clone(),
            };
            tables
                .invitations
                .push(TeamInvitation::from_create(new_id(), &row, now));
        }

        Ok(team)
    }

    async fn get_team(&self, id: &str) -> ApiResult<Option<Team>> {
        Ok(self.tables()?.team(id).cloned())
    }

    async fn update_team(&self, id: &str, update: UpdateTeam) -> ApiResult<Team> {
        let mut tables = self.tables()?;
        let team = tables
            .teams
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| ApiError::not_found("Team not found"))?;
        team.apply_update(&update, Utc::now());
        Ok(team.clone())
    }

    async fn list_user_teams(&self, user_id: &str, search: Option<&str>) -> ApiResult<Vec<Team>> {
        let tables = self.tables()?;
        let needle = search.map(|s| s.to_lowercase());
        Ok(tables
            .teams
            .iter()
            .rev()
            .filter(|t| tables.member(&t.id, user_id).is_some())
            .filter(|t| match &needle {
                Some(n) => contains_ci(Some(&t.name), n) || contains_ci(t.description.as_deref(), n),
                None => true,
            })
            .cloned()
            .collect())
    }

    async fn get_team_member(
        &self,
        team_id: &str,
        user_id: &str,
    ) -> ApiResult<Option<TeamMember>> {
        Ok(self.tables()?.member(team_id, user_id).cloned())
    }

    async fn list_team_members(&self, team_id: &str) -> ApiResult<Vec<TeamMember>> {
        Ok(self
            .tables()?
            .members
            .iter()
            .filter(|m| m.team_id == team_id)
            .cloned()
            .collect())
    }

    async fn add_team_member(&self, member: CreateTeamMember) -> ApiResult<TeamMember> {
        self.tables()?.insert_member(&member, Utc::now())
    }

    async fn remove_team_member(&self, team_id: &str, user_id: &str) -> ApiResult<()> {
        let mut tables = self.tables()?;
        let index = tables
            .members
            .iter()
            .position(|m| m.team_id == team_id && m.user_id == user_id)
            .ok_or_else(|| ApiError::not_found("Team member not found"))?;

        if tables.members[index].is_leader() {
            let leaders = tables
                .members
                .iter()
                .filter(|m| m.team_id == team_id && m.is_leader())
                .count();
            if leaders <= 1 {
                return Err(ApiError::bad_request("Cannot remove last team leader"));
            }
        }

        tables.members.remove(index);
        Ok(())
    }
}

#[async_trait]
impl InvitationOps for MemoryDatabaseAdapter {
    async fn create_invitation(&self, create: CreateTeamInvitation) -> ApiResult<TeamInvitation> {
        let mut tables = self.tables()?;
        if tables.team(&create.team_id).is_none() {
            return Err(ApiError::not_found("Team not found"));
        }
        let invitation = TeamInvitation::from_create(new_id(), &create, Utc::now());
        tables.invitations.push(invitation.clone());
        Ok(invitation)
    }

    async fn get_invitation_by_token(&self, token: &str) -> ApiResult<Option<TeamInvitation>> {
        Ok(self
            .tables()?
            .invitations
            .iter()
            .find(|i| i.token == token)
            .cloned())
    }

    async fn list_pending_invitations(&self, email: &str) -> ApiResult<Vec<TeamInvitation>> {
        let email = email.trim().to_lowercase();
        Ok(self
            .tables()?
            .invitations
            .iter()
            .rev()
            .filter(|i| i.email == email && i.is_pending())
            .cloned()
            .collect())
    }

    async fn accept_invitation(&self, token: &str, user_id: &str) -> ApiResult<TeamMember> {
        let mut tables = self.tables()?;
        let now = Utc::now();
        let index = tables
            .invitations
            .iter()
            .position(|i| i.token == token && i.is_pending())
            .ok_or_else(|| ApiError::not_found("Invalid or expired invitation"))?;

        let row = CreateTeamMember {
            team_id: tables.invitations[index].team_id.clone(),
            user_id: user_id.to_string(),
            role: tables.invitations[index].role,
        };
        let member = tables.insert_member(&row, now)?;

        let invitation = &mut tables.invitations[index];
        invitation.status = InvitationStatus::Accepted;
        invitation.accepted_at = Some(now);
        Ok(member)
    }
}

#[async_trait]
impl ProjectOps for MemoryDatabaseAdapter {
    async fn create_project(&self, create: CreateProject) -> ApiResult<Project> {
        let mut tables = self.tables()?;
        if let Some(team_id) = &create.team_id
            && tables.team(team_id).is_none()
        {
            return Err(ApiError::not_found("Team not found"));
        }
        let project = Project::from_create(new_id(), &create, Utc::now());
        tables.projects.push(project.clone());
        Ok(project)
    }

    async fn get_project(&self, id: &str) -> ApiResult<Option<Project>> {
        Ok(self.tables()?.project(id).cloned())
    }

    async fn list_projects(&self, filter: ProjectFilter) -> ApiResult<Vec<Project>> {
        let tables = self.tables()?;
        Ok(tables
            .projects
            .iter()
            .rev()
            .filter(|p| tables.can_view(p, &filter.viewer_id) && filter.matches(p))
            .cloned()
            .collect())
    }

    async fn update_project(&self, id: &str, update: UpdateProject) -> ApiResult<Project> {
        let mut tables = self.tables()?;
        let project = tables
            .projects
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| ApiError::not_found("Project not found"))?;
        project.apply_update(&update, Utc::now());
        Ok(project.clone())
    }

    async fn delete_project(&self, id: &str) -> ApiResult<()> {
        let mut tables = self.tables()?;
        if tables.project(id).is_none() {
            return Err(ApiError::not_found("Project not found"));
        }

        let paper_ids: Vec<String> = tables
            .papers
            .iter()
            .filter(|p| p.project_id == id)
            .map(|p| p.id.clone())
            .collect();
        tables.citations.retain(|c| !paper_ids.contains(&c.paper_id));
        tables.papers.retain(|p| p.project_id != id);
        tables.datasets.retain(|d| d.project_id != id);
        tables.projects.retain(|p| p.id != id);
        Ok(())
    }
}

#[async_trait]
impl ResearchOps for MemoryDatabaseAdapter {
    async fn create_paper(&self, create: CreatePaper) -> ApiResult<Paper> {
        let mut tables = self.tables()?;
        if tables.project(&create.project_id).is_none() {
            return Err(ApiError::not_found("Project not found"));
        }
        let paper = Paper::from_create(new_id(), &create, Utc::now());
        tables.papers.push(paper.clone());
        Ok(paper)
    }

    async fn get_paper(&self, id: &str) -> ApiResult<Option<Paper>> {
        Ok(self
            .tables()?
            .papers
            .iter()
            .find(|p| p.id == id)
            .cloned())
    }

    async fn list_papers(&self, filter: PaperFilter) -> ApiResult<Vec<PaperWithCitations>> {
        let tables = self.tables()?;
        Ok(tables
            .papers
            .iter()
            .rev()
            .filter(|p| match &filter.project_id {
                Some(project_id) => &p.project_id == project_id,
                None => true,
            })
            .filter(|p| tables.can_view_project_id(&p.project_id, &filter.viewer_id))
            .map(|p| PaperWithCitations {
                paper: p.clone(),
                citation_count: tables.citations.iter().filter(|c| c.paper_id == p.id).count()
                    as i64,
            })
            .collect())
    }

    async fn create_citation(&self, create: CreateCitation) -> ApiResult<Citation> {
        let mut tables = self.tables()?;
        if !tables.papers.iter().any(|p| p.id == create.paper_id) {
            return Err(ApiError::not_found("Paper not found"));
        }
        let citation = Citation::from_create(new_id(), &create, Utc::now());
        tables.citations.push(citation.clone());
        Ok(citation)
    }

    async fn list_citations(&self, paper_id: &str) -> ApiResult<Vec<Citation>> {
        Ok(self
            .tables()?
            .citations
            .iter()
            .filter(|c| c.paper_id == paper_id)
            .cloned()
            .collect())
    }

    async fn create_dataset(&self, create: CreateDataset) -> ApiResult<Dataset> {
        let mut tables = self.tables()?;
        if tables.project(&create.project_id).is_none() {
            return Err(ApiError::not_found("Project not found"));
        }
        let dataset = Dataset::from_create(new_id(), &create, Utc::now());
        tables.datasets.push(dataset.clone());
        Ok(dataset)
    }

    async fn list_datasets(&self, filter: DatasetFilter) -> ApiResult<Vec<Dataset>> {
        let tables = self.tables()?;
        Ok(tables
            .datasets
            .iter()
            .rev()
            .filter(|d| match &filter.project_id {
                Some(project_id) => &d.project_id == project_id,
                None => true,
            })
            .filter(|d| tables.can_view_project_id(&d.project_id, &filter.viewer_id))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl EventOps for MemoryDatabaseAdapter {
    async fn create_event(&self, create: CreateEvent) -> ApiResult<Event> {
        let event = Event::from_create(new_id(), &create, Utc::now());
        self.tables()?.events.push(event.clone());
        Ok(event)
    }

    async fn get_event(&self, id: &str) -> ApiResult<Option<Event>> {
        Ok(self
            .tables()?
            .events
            .iter()
            .find(|e| e.id == id)
            .cloned())
    }

    async fn list_events(&self, filter: EventFilter) -> ApiResult<Vec<Event>> {
        let mut events: Vec<Event> = self
            .tables()?
            .events
            .iter()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect();
        events.sort_by_key(|e| e.start_date);
        Ok(events)
    }

    async fn list_event_registrations(&self, event_id: &str) -> ApiResult<Vec<EventRegistration>> {
        Ok(self
            .tables()?
            .registrations
            .iter()
            .filter(|r| r.event_id == event_id)
            .cloned()
            .collect())
    }

    async fn register_for_event(
        &self,
        event_id: &str,
        user_id: &str,
    ) -> ApiResult<EventRegistration> {
        let mut tables = self.tables()?;
        let event = tables
            .events
            .iter()
            .find(|e| e.id == event_id)
            .ok_or_else(|| ApiError::not_found("Event not found"))?;

        let registered: Vec<&EventRegistration> = tables
            .registrations
            .iter()
            .filter(|r| r.event_id == event_id)
            .collect();
        if registered.iter().any(|r| r.user_id == user_id) {
            return Err(ApiError::bad_request("Already registered for this event"));
        }
        if !event.has_capacity(registered.len()) {
            return Err(ApiError::bad_request("Event is full"));
        }

        let registration = EventRegistration {
            id: new_id(),
            event_id: event_id.to_string(),
            user_id: user_id.to_string(),
            registered_at: Utc::now(),
        };
        tables.registrations.push(registration.clone());
        Ok(registration)
    }

    async fn unregister_from_event(&self, event_id: &str, user_id: &str) -> ApiResult<()> {
        let mut tables = self.tables()?;
        let index = tables
            .registrations
            .iter()
            .position(|r| r.event_id == event_id && r.user_id == user_id)
            .ok_or_else(|| ApiError::not_found("Registration not found"))?;
        tables.registrations.remove(index);
        Ok(())
    }

    async fn list_upcoming_events(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> ApiResult<Vec<Event>> {
        let tables = self.tables()?;
        let mut events: Vec<Event> = tables
            .events
            .iter()
            .filter(|e| e.start_date > now)
            .filter(|e| {
                tables
                    .registrations
                    .iter()
                    .any(|r| r.event_id == e.id && r.user_id == user_id)
            })
            .cloned()
            .collect();
        events.sort_by_key(|e| e.start_date);
        Ok(events)
    }
}

#[async_trait]
impl ActivityOps for MemoryDatabaseAdapter {
    async fn log_activity(&self, create: CreateActivity) -> ApiResult<ActivityEntry> {
        let entry = ActivityEntry::from_create(new_id(), &create, Utc::now());
        self.tables()?.activity.push(entry.clone());
        Ok(entry)
    }

    async fn list_user_activity(
        &self,
        user_id: &str,
        limit: usize,
    ) -> ApiResult<Vec<ActivityEntry>> {
        Ok(self
            .tables()?
            .activity
            .iter()
            .rev()
            .filter(|a| a.user_id == user_id)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn dashboard_counts(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> ApiResult<DashboardCounts> {
        let tables = self.tables()?;
        let cutoff = now - Duration::days(RECENT_WINDOW_DAYS);

        let projects: Vec<&Project> = tables
            .projects
            .iter()
            .filter(|p| p.created_by == user_id)
            .collect();
        let memberships: Vec<&TeamMember> = tables
            .members
            .iter()
            .filter(|m| m.user_id == user_id)
            .collect();
        let papers: Vec<&Paper> = tables
            .papers
            .iter()
            .filter(|p| p.uploaded_by == user_id)
            .collect();
        let registrations: Vec<&EventRegistration> = tables
            .registrations
            .iter()
            .filter(|r| r.user_id == user_id)
            .filter(|r| {
                tables
                    .events
                    .iter()
                    .any(|e| e.id == r.event_id && e.end_date > now)
            })
            .collect();

        Ok(DashboardCounts {
            total_projects: projects.len() as i64,
            recent_projects: projects.iter().filter(|p| p.created_at >= cutoff).count() as i64,
            total_teams: memberships.len() as i64,
            recent_teams: memberships.iter().filter(|m| m.joined_at >= cutoff).count() as i64,
            total_papers: papers.len() as i64,
            recent_papers: papers.iter().filter(|p| p.created_at >= cutoff).count() as i64,
            upcoming_events: registrations.len() as i64,
            recent_events: registrations
                .iter()
                .filter(|r| r.registered_at >= cutoff)
                .count() as i64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn user(db: &MemoryDatabaseAdapter, email: &str) -> User {
        db.create_user(CreateUser::new(email, "hash", "Test", "User"))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_duplicate_email_is_rejected_case_insensitively() {
        let db = MemoryDatabaseAdapter::new();
        user(&db, "ada@lab.org").await;
        let err = db
            .create_user(CreateUser::new("ADA@lab.org", "hash", "A", "L"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "User already exists");
        assert!(db.get_user_by_email("Ada@Lab.org").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_creator_is_sole_leader_and_cannot_leave() {
        let db = MemoryDatabaseAdapter::new();
        let owner = user(&db, "owner@lab.org").await;
        let other = user(&db, "other@lab.org").await;

        let team = db
            .create_team(
                CreateTeam::new("Optics", &owner.id).with_member(&other.id, TeamRole::Leader),
            )
            .await
            .unwrap();

        let members = db.list_team_members(&team.id).await.unwrap();
        assert_eq!(members.len(), 2);
        assert_eq!(members[0].user_id, owner.id);
        assert!(members[0].is_leader());
        assert!(members[1].is_leader());

        db.remove_team_member(&team.id, &other.id).await.unwrap();
        let err = db.remove_team_member(&team.id, &owner.id).await.unwrap_err();
        assert_eq!(err.to_string(), "Cannot remove last team leader");
    }

    #[tokio::test]
    async fn test_team_capacity_is_enforced() {
        let db = MemoryDatabaseAdapter::new();
        let owner = user(&db, "owner@lab.org").await;
        let a = user(&db, "a@lab.org").await;
        let b = user(&db, "b@lab.org").await;

        let team = db
            .create_team(CreateTeam::new("Small", &owner.id).with_max_members(Some(2)))
            .await
            .unwrap();
        db.add_team_member(CreateTeamMember {
            team_id: team.id.clone(),
            user_id: a.id.clone(),
            role: TeamRole::Member,
        })
        .await
        .unwrap();

        let err = db
            .add_team_member(CreateTeamMember {
                team_id: team.id.clone(),
                user_id: b.id.clone(),
                role: TeamRole::Member,
            })
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Team is full");
    }

    #[tokio::test]
    async fn test_failed_team_creation_writes_nothing() {
        let db = MemoryDatabaseAdapter::new();
        let owner = user(&db, "owner@lab.org").await;
        let result = db
            .create_team(CreateTeam::new("Ghosts", &owner.id).with_member("missing", TeamRole::Member))
            .await;
        assert!(result.is_err());
        assert!(db.list_user_teams(&owner.id, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_accept_invitation_is_single_use() {
        let db = MemoryDatabaseAdapter::new();
        let owner = user(&db, "owner@lab.org").await;
        let invitee = user(&db, "new@lab.org").await;
        let team = db
            .create_team(CreateTeam::new("Optics", &owner.id).with_invitee(
                "new@lab.org",
                TeamRole::Member,
                "tok-1",
            ))
            .await
            .unwrap();

        let pending = db.list_pending_invitations("NEW@lab.org").await.unwrap();
        assert_eq!(pending.len(), 1);

        let member = db.accept_invitation("tok-1", &invitee.id).await.unwrap();
        assert_eq!(member.team_id, team.id);
        assert!(db.list_pending_invitations("new@lab.org").await.unwrap().is_empty());

        let err = db.accept_invitation("tok-1", &invitee.id).await.unwrap_err();
        assert_eq!(err.status_code(), 404);
    }

    #[tokio::test]
    async fn test_project_visibility() {
        let db = MemoryDatabaseAdapter::new();
        let owner = user(&db, "owner@lab.org").await;
        let teammate = user(&db, "mate@lab.org").await;
        let stranger = user(&db, "stranger@lab.org").await;
        let team = db
            .create_team(CreateTeam::new("Optics", &owner.id).with_member(&teammate.id, TeamRole::Member))
            .await
            .unwrap();

        for (title, visibility, team_id) in [
            ("open", Visibility::Public, None),
            ("mine", Visibility::Private, None),
            ("ours", Visibility::Team, Some(team.id.clone())),
        ] {
            db.create_project(CreateProject {
                title: title.into(),
                description: None,
                category: None,
                visibility,
                team_id,
                created_by: owner.id.clone(),
            })
            .await
            .unwrap();
        }

        let titles = |projects: Vec<Project>| -> Vec<String> {
            projects.into_iter().map(|p| p.title).collect()
        };
        assert_eq!(
            titles(db.list_projects(ProjectFilter::for_viewer(&owner.id)).await.unwrap()),
            vec!["ours", "mine", "open"]
        );
        assert_eq!(
            titles(db.list_projects(ProjectFilter::for_viewer(&teammate.id)).await.unwrap()),
            vec!["ours", "open"]
        );
        assert_eq!(
            titles(db.list_projects(ProjectFilter::for_viewer(&stranger.id)).await.unwrap()),
            vec!["open"]
        );
    }

    #[tokio::test]
    async fn test_delete_project_cascades() {
        let db = MemoryDatabaseAdapter::new();
        let owner = user(&db, "owner@lab.org").await;
        let project = db
            .create_project(CreateProject {
                title: "Cascade".into(),
                description: None,
                category: None,
                visibility: Visibility::Private,
                team_id: None,
                created_by: owner.id.clone(),
            })
            .await
            .unwrap();
        let paper = db
            .create_paper(CreatePaper {
                title: "Paper".into(),
                abstract_text: None,
                file_url: None,
                project_id: project.id.clone(),
                uploaded_by: owner.id.clone(),
            })
            .await
            .unwrap();
        db.create_citation(CreateCitation {
            paper_id: paper.id.clone(),
            cited_title: "Prior work".into(),
            cited_authors: None,
            cited_year: Some(1999),
            doi: None,
        })
        .await
        .unwrap();

        db.delete_project(&project.id).await.unwrap();
        assert!(db.get_paper(&paper.id).await.unwrap().is_none());
        assert!(db.list_citations(&paper.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_event_capacity_and_duplicates() {
        let db = MemoryDatabaseAdapter::new();
        let now = Utc::now();
        let event = db
            .create_event(CreateEvent {
                title: "Seminar".into(),
                description: None,
                start_date: now + Duration::days(1),
                end_date: now + Duration::days(1) + Duration::hours(2),
                location: None,
                event_type: Some("seminar".into()),
                max_participants: Some(1),
                created_by: "host".into(),
            })
            .await
            .unwrap();

        db.register_for_event(&event.id, "u1").await.unwrap();
        let dup = db.register_for_event(&event.id, "u1").await.unwrap_err();
        assert_eq!(dup.to_string(), "Already registered for this event");
        let full = db.register_for_event(&event.id, "u2").await.unwrap_err();
        assert_eq!(full.to_string(), "Event is full");

        db.unregister_from_event(&event.id, "u1").await.unwrap();
        db.register_for_event(&event.id, "u2").await.unwrap();
        let missing = db.unregister_from_event(&event.id, "u1").await.unwrap_err();
        assert_eq!(missing.to_string(), "Registration not found");
    }
}
