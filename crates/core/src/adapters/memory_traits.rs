use chrono::{DateTime, Utc};

use crate::types::{
    ActivityEntry, Citation, CreateActivity, CreateCitation, CreateDataset, CreateEvent,
    CreatePaper, CreateProject, CreateTeamInvitation, CreateTeamMember, CreateUser, Dataset, Event,
    InvitationStatus, Paper, Project, Team, TeamInvitation, TeamMember, UpdateProject, UpdateTeam,
    UpdateUser, User,
};

/// Build a stored row from its creation data.
pub(crate) trait FromCreate<C> {
    fn from_create(id: String, create: &C, now: DateTime<Utc>) -> Self;
}

/// Apply a partial update in place.
pub(crate) trait ApplyUpdate<U> {
    fn apply_update(&mut self, update: &U, now: DateTime<Utc>);
}

impl FromCreate<CreateUser> for User {
    fn from_create(id: String, create: &CreateUser, now: DateTime<Utc>) -> Self {
        User {
            id,
            email: create.email.to_lowercase(),
            password_hash: create.password_hash.clone(),
            first_name: create.first_name.clone(),
            last_name: create.last_name.clone(),
            role: create.role.clone(),
            institution: create.institution.clone(),
            department: create.department.clone(),
            research_interests: create.research_interests.clone(),
            avatar_url: None,
            created_at: now,
            updated_at: now,
        }
    }
}

impl ApplyUpdate<UpdateUser> for User {
    fn apply_update(&mut self, update: &UpdateUser, now: DateTime<Utc>) {
        if let Some(first_name) = &update.first_name {
            self.first_name = first_name.clone();
        }
        if let Some(last_name) = &update.last_name {
            self.last_name = last_name.clone();
        }
        if let Some(institution) = &update.institution {
            self.institution = Some(institution.clone());
        }
        if let Some(department) = &update.department {
            self.department = Some(department.clone());
        }
        if let Some(interests) = &update.research_interests {
            self.research_interests = interests.clone();
        }
        if let Some(avatar_url) = &update.avatar_url {
            self.avatar_url = Some(avatar_url.clone());
        }
        self.updated_at = now;
    }
}

impl ApplyUpdate<UpdateTeam> for Team {
    fn apply_update(&mut self, update: &UpdateTeam, now: DateTime<Utc>) {
        if let Some(name) = &update.name {
            self.name = name.clone();
        }
        if let Some(description) = &update.description {
            self.description = Some(description.clone());
        }
        if let Some(max_members) = update.max_members {
            self.max_members = Some(max_members);
        }
        self.updated_at = now;
    }
}

impl FromCreate<CreateTeamMember> for TeamMember {
    fn from_create(id: String, create: &CreateTeamMember, now: DateTime<Utc>) -> Self {
        TeamMember {
            id,
            team_id: create.team_id.clone(),
            user_id: create.user_id.clone(),
            role: create.role,
            joined_at: now,
        }
    }
}

impl FromCreate<CreateTeamInvitation> for TeamInvitation {
    fn from_create(id: String, create: &CreateTeamInvitation, now: DateTime<Utc>) -> Self {
        TeamInvitation {
            id,
            team_id: create.team_id.clone(),
            email: create.email.to_lowercase(),
            role: create.role,
            token: create.token.clone(),
            status: InvitationStatus::Pending,
            invited_by: create.invited_by.clone(),
            created_at: now,
            accepted_at: None,
        }
    }
}

impl FromCreate<CreateProject> for Project {
    fn from_create(id: String, create: &CreateProject, now: DateTime<Utc>) -> Self {
        Project {
            id,
            title: create.title.clone(),
            description: create.description.clone(),
            category: create.category.clone(),
            visibility: create.visibility,
            progress: 0,
            team_id: create.team_id.clone(),
            created_by: create.created_by.clone(),
            created_at: now,
            updated_at: now,
        }
    }
}

impl ApplyUpdate<UpdateProject> for Project {
    fn apply_update(&mut self, update: &UpdateProject, now: DateTime<Utc>) {
        if let Some(title) = &update.title {
            self.title = title.clone();
        }
        if let Some(description) = &update.description {
            self.description = Some(description.clone());
        }
        if let Some(category) = &update.category {
            self.category = Some(category.clone());
        }
        if let Some(visibility) = update.visibility {
            self.visibility = visibility;
        }
        if let Some(progress) = update.progress {
            self.progress = progress;
        }
        self.updated_at = now;
    }
}

impl FromCreate<CreatePaper> for Paper {
    fn from_create(id: String, create: &CreatePaper, now: DateTime<Utc>) -> Self {
        Paper {
            id,
            title: create.title.clone(),
            abstract_text: create.abstract_text.clone(),
            file_url: create.file_url.clone(),
            project_id: create.project_id.clone(),
            uploaded_by: create.uploaded_by.clone(),
            created_at: now,
        }
    }
}

impl FromCreate<CreateCitation> for Citation {
    fn from_create(id: String, create: &CreateCitation, now: DateTime<Utc>) -> Self {
        Citation {
            id,
            paper_id: create.paper_id.clone(),
            cited_title: create.cited_title.clone(),
            cited_authors: create.cited_authors.clone(),
            cited_year: create.cited_year,
            doi: create.doi.clone(),
            created_at: now,
        }
    }
}

impl FromCreate<CreateDataset> for Dataset {
    fn from_create(id: String, create: &CreateDataset, now: DateTime<Utc>) -> Self {
        Dataset {
            id,
            name: create.name.clone(),
            description: create.description.clone(),
            file_url: create.file_url.clone(),
            project_id: create.project_id.clone(),
            uploaded_by: create.uploaded_by.clone(),
            created_at: now,
        }
    }
}

impl FromCreate<CreateEvent> for Event {
    fn from_create(id: String, create: &CreateEvent, now: DateTime<Utc>) -> Self {
        Event {
            id,
            title: create.title.clone(),
            description: create.description.clone(),
            start_date: create.start_date,
            end_date: create.end_date,
            location: create.location.clone(),
            event_type: create.event_type.clone(),
            max_participants: create.max_participants,
            created_by: create.created_by.clone(),
            created_at: now,
        }
    }
}

impl FromCreate<CreateActivity> for ActivityEntry {
    fn from_create(id: String, create: &CreateActivity, now: DateTime<Utc>) -> Self {
        ActivityEntry {
            id,
            user_id: create.user_id.clone(),
            action: create.action.clone(),
            entity_type: create.entity_type.clone(),
            entity_id: create.entity_id.clone(),
            target_user_id: create.target_user_id.clone(),
            created_at: now,
        }
    }
}
