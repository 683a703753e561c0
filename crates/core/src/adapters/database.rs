pub use super::traits::{
    ActivityOps, EventOps, InvitationOps, ProjectOps, ResearchOps, TeamOps, UserOps,
};

/// Database adapter trait for persistence.
///
/// Combines all entity-specific operation traits. Any type that implements
/// all sub-traits automatically implements `DatabaseAdapter` via the
/// blanket impl.
///
/// Use the sub-traits directly when you only need a subset of operations.
pub trait DatabaseAdapter:
    UserOps + TeamOps + InvitationOps + ProjectOps + ResearchOps + EventOps + ActivityOps
{
}

impl<T> DatabaseAdapter for T where
    T: UserOps + TeamOps + InvitationOps + ProjectOps + ResearchOps + EventOps + ActivityOps
{
}

#[cfg(feature = "sqlx-postgres")]
pub mod sqlx_adapter {
    use super::*;
    use async_trait::async_trait;
    use chrono::{DateTime, Duration, Utc};
    use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
    use uuid::Uuid;

    use crate::error::{ApiError, ApiResult, DatabaseError};
    use crate::types::{
        ActivityEntry, Citation, CreateActivity, CreateCitation, CreateDataset, CreateEvent,
        CreatePaper, CreateProject, CreateTeam, CreateTeamInvitation, CreateTeamMember,
        CreateUser, DashboardCounts, Dataset, DatasetFilter, Event, EventFilter,
        EventRegistration, Paper, PaperFilter, PaperWithCitations, Project, ProjectFilter, Team,
        TeamInvitation, TeamMember, TeamRole, UpdateProject, UpdateTeam, UpdateUser, User,
    };

    const SCHEMA: &str = include_str!("schema.sql");

    /// PostgreSQL database adapter via SQLx.
    pub struct SqlxAdapter {
        pool: PgPool,
    }

    impl SqlxAdapter {
        pub async fn new(database_url: &str) -> Result<Self, sqlx::Error> {
            let pool = PgPool::connect(database_url).await?;
            Ok(Self { pool })
        }

        pub async fn with_config(
            database_url: &str,
            config: PoolConfig,
        ) -> Result<Self, sqlx::Error> {
            let pool = sqlx::postgres::PgPoolOptions::new()
                .max_connections(config.max_connections)
                .min_connections(config.min_connections)
                .acquire_timeout(config.acquire_timeout)
                .idle_timeout(config.idle_timeout)
                .max_lifetime(config.max_lifetime)
                .connect(database_url)
                .await?;
            Ok(Self { pool })
        }

        pub fn from_pool(pool: PgPool) -> Self {
            Self { pool }
        }

        pub async fn test_connection(&self) -> Result<(), sqlx::Error> {
            sqlx::query("SELECT 1").execute(&self.pool).await?;
            Ok(())
        }

        /// Create any missing tables and indexes.
        pub async fn migrate(&self) -> ApiResult<()> {
            sqlx::raw_sql(SCHEMA)
                .execute(&self.pool)
                .await
                .map_err(|e| DatabaseError::Migration(e.to_string()))?;
            Ok(())
        }

        pub fn pool_stats(&self) -> PoolStats {
            PoolStats {
                size: self.pool.size(),
                idle: self.pool.num_idle(),
            }
        }

        pub async fn close(&self) {
            self.pool.close().await;
        }
    }

    #[derive(Debug, Clone)]
    pub struct PoolConfig {
        pub max_connections: u32,
        pub min_connections: u32,
        pub acquire_timeout: std::time::Duration,
        pub idle_timeout: Option<std::time::Duration>,
        pub max_lifetime: Option<std::time::Duration>,
    }

    impl Default for PoolConfig {
        fn default() -> Self {
            Self {
                max_connections: 10,
                min_connections: 0,
                acquire_timeout: std::time::Duration::from_secs(30),
                idle_timeout: Some(std::time::Duration::from_secs(600)),
                max_lifetime: Some(std::time::Duration::from_secs(1800)),
            }
        }
    }

    #[derive(Debug, Clone)]
    pub struct PoolStats {
        pub size: u32,
        pub idle: usize,
    }

    fn new_id() -> String {
        Uuid::new_v4().to_string()
    }

    /// `%term%` for ILIKE with the LIKE metacharacters escaped.
    fn like_pattern(term: &str) -> String {
        let escaped = term
            .replace('\\', "\\\\")
            .replace('%', "\\%")
            .replace('_', "\\_");
        format!("%{}%", escaped)
    }

    /// Append the "viewer can see this project" predicate for alias `p`.
    fn push_can_view<'a>(query: &mut QueryBuilder<'a, Postgres>, viewer_id: &'a str) {
        query.push("(p.visibility = 'public' OR p.created_by = ");
        query.push_bind(viewer_id);
        query.push(
            " OR EXISTS (SELECT 1 FROM team_members tm WHERE tm.team_id = p.team_id AND tm.user_id = ",
        );
        query.push_bind(viewer_id);
        query.push("))");
    }

    /// Membership insert shared by `add_team_member` and `accept_invitation`.
    /// Locks the team row so concurrent joins see each other's count.
    async fn insert_member(
        conn: &mut PgConnection,
        create: &CreateTeamMember,
    ) -> ApiResult<TeamMember> {
        let team = sqlx::query_as::<_, Team>("SELECT * FROM teams WHERE id = $1 FOR UPDATE")
            .bind(&create.team_id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| ApiError::not_found("Team not found"))?;

        let already: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM team_members WHERE team_id = $1 AND user_id = $2)",
        )
        .bind(&create.team_id)
        .bind(&create.user_id)
        .fetch_one(&mut *conn)
        .await?;
        if already {
            return Err(ApiError::bad_request("User is already a team member"));
        }

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM team_members WHERE team_id = $1")
            .bind(&create.team_id)
            .fetch_one(&mut *conn)
            .await?;
        if !team.has_room(count as usize) {
            return Err(ApiError::bad_request("Team is full"));
        }

        let member = sqlx::query_as::<_, TeamMember>(
            r#"
            INSERT INTO team_members (id, team_id, user_id, role, joined_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(new_id())
        .bind(&create.team_id)
        .bind(&create.user_id)
        .bind(create.role.as_str())
        .bind(Utc::now())
        .fetch_one(&mut *conn)
        .await?;

        Ok(member)
    }

    // -- UserOps --

    #[async_trait]
    impl UserOps for SqlxAdapter {
        async fn create_user(&self, create: CreateUser) -> ApiResult<User> {
            let now = Utc::now();
            let result = sqlx::query_as::<_, User>(
                r#"
                INSERT INTO users (id, email, password_hash, first_name, last_name, role,
                                   institution, department, research_interests, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
                RETURNING *
                "#,
            )
            .bind(new_id())
            .bind(create.email.to_lowercase())
            .bind(&create.password_hash)
            .bind(&create.first_name)
            .bind(&create.last_name)
            .bind(&create.role)
            .bind(&create.institution)
            .bind(&create.department)
            .bind(&create.research_interests)
            .bind(now)
            .bind(now)
            .fetch_one(&self.pool)
            .await;

            match result {
                Ok(user) => Ok(user),
                Err(e) => match DatabaseError::from(e) {
                    DatabaseError::Constraint(_) => {
                        Err(ApiError::bad_request("User already exists"))
                    }
                    other => Err(other.into()),
                },
            }
        }

        async fn get_user_by_id(&self, id: &str) -> ApiResult<Option<User>> {
            let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
            Ok(user)
        }

        async fn get_user_by_email(&self, email: &str) -> ApiResult<Option<User>> {
            let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
                .bind(email.trim().to_lowercase())
                .fetch_optional(&self.pool)
                .await?;
            Ok(user)
        }

        async fn update_user(&self, id: &str, update: UpdateUser) -> ApiResult<User> {
            let mut query = QueryBuilder::<Postgres>::new("UPDATE users SET updated_at = NOW()");

            if let Some(first_name) = &update.first_name {
                query.push(", first_name = ");
                query.push_bind(first_name);
            }
            if let Some(last_name) = &update.last_name {
                query.push(", last_name = ");
                query.push_bind(last_name);
            }
            if let Some(institution) = &update.institution {
                query.push(", institution = ");
                query.push_bind(institution);
            }
            if let Some(department) = &update.department {
                query.push(", department = ");
                query.push_bind(department);
            }
            if let Some(interests) = &update.research_interests {
                query.push(", research_interests = ");
                query.push_bind(interests);
            }
            if let Some(avatar_url) = &update.avatar_url {
                query.push(", avatar_url = ");
                query.push_bind(avatar_url);
            }

            query.push(" WHERE id = ");
            query.push_bind(id);
            query.push(" RETURNING *");

            query
                .build_query_as::<User>()
                .fetch_optional(&self.pool)
                .await?
                .ok_or(ApiError::UserNotFound)
        }

        async fn search_users(
            &self,
            query: &str,
            exclude_id: &str,
            limit: usize,
        ) -> ApiResult<Vec<User>> {
            let users = sqlx::query_as::<_, User>(
                r#"
                SELECT * FROM users
                WHERE id <> $1
                  AND (first_name ILIKE $2 OR last_name ILIKE $2 OR email ILIKE $2)
                ORDER BY first_name, last_name
                LIMIT $3
                "#,
            )
            .bind(exclude_id)
            .bind(like_pattern(query.trim()))
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;
            Ok(users)
        }
    }

    // -- TeamOps --

    #[async_trait]
    impl TeamOps for SqlxAdapter {
        async fn create_team(&self, create: CreateTeam) -> ApiResult<Team> {
            let now = Utc::now();
            let mut tx = self.pool.begin().await?;

            let team = sqlx::query_as::<_, Team>(
                r#"
                INSERT INTO teams (id, name, description, created_by, max_members, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                RETURNING *
                "#,
            )
            .bind(new_id())
            .bind(&create.name)
            .bind(&create.description)
            .bind(&create.created_by)
            .bind(create.max_members)
            .bind(now)
            .bind(now)
            .fetch_one(&mut *tx)
            .await?;

            let mut rows = vec![(create.created_by.clone(), TeamRole::Leader)];
            for member in &create.members {
                if rows.iter().any(|(id, _)| id == &member.user_id) {
                    continue;
                }
                let exists: bool =
                    sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE id = $1)")
                        .bind(&member.user_id)
                        .fetch_one(&mut *tx)
                        .await?;
                if !exists {
                    return Err(ApiError::UserNotFound);
                }
                rows.push((member.user_id.clone(), member.role));
            }
            if !team.has_room(rows.len() - 1) {
                return Err(ApiError::bad_request("Team is full"));
            }

            for (user_id, role) in &rows {
                sqlx::query(
                    r#"
                    INSERT INTO team_members (id, team_id, user_id, role, joined_at)
                    VALUES ($1, $2, $3, $4, $5)
                    "#,
                )
                .bind(new_id())
                .bind(&team.id)
                .bind(user_id)
                .bind(role.as_str())
                .bind(now)
                .execute(&mut *tx)
                .await?;
            }

            for invitee in &create.invitations {
                sqlx::query(
                    r#"
                    INSERT INTO team_invitations (id, team_id, email, role, token, status, invited_by, created_at)
                    VALUES ($1, $2, $3, $4, $5, 'pending', $6, $7)
                    "#,
                )
                .bind(new_id())
                .bind(&team.id)
                .bind(invitee.email.to_lowercase())
                .bind(invitee.role.as_str())
                .bind(&invitee.token)
                .bind(&create.created_by)
                .bind(now)
                .execute(&mut *tx)
                .await?;
            }

            tx.commit().await?;
            Ok(team)
        }

        async fn get_team(&self, id: &str) -> ApiResult<Option<Team>> {
            let team = sqlx::query_as::<_, Team>("SELECT * FROM teams WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
            Ok(team)
        }

        async fn update_team(&self, id: &str, update: UpdateTeam) -> ApiResult<Team> {
            let mut query = QueryBuilder::<Postgres>::new("UPDATE teams SET updated_at = NOW()");

            if let Some(name) = &update.name {
                query.push(", name = ");
                query.push_bind(name);
            }
            if let Some(description) = &update.description {
                query.push(", description = ");
                query.push_bind(description);
            }
            if let Some(max_members) = update.max_members {
                query.push(", max_members = ");
                query.push_bind(max_members);
            }

            query.push(" WHERE id = ");
            query.push_bind(id);
            query.push(" RETURNING *");

            query
                .build_query_as::<Team>()
                .fetch_optional(&self.pool)
                .await?
                .ok_or_else(|| ApiError::not_found("Team not found"))
        }

        async fn list_user_teams(
            &self,
            user_id: &str,
            search: Option<&str>,
        ) -> ApiResult<Vec<Team>> {
            let mut query = QueryBuilder::<Postgres>::new(
                "SELECT t.* FROM teams t JOIN team_members tm ON tm.team_id = t.id WHERE tm.user_id = ",
            );
            query.push_bind(user_id);

            if let Some(search) = search {
                let pattern = like_pattern(search);
                query.push(" AND (t.name ILIKE ");
                query.push_bind(pattern.clone());
                query.push(" OR t.description ILIKE ");
                query.push_bind(pattern);
                query.push(")");
            }
            query.push(" ORDER BY t.created_at DESC");

            let teams = query.build_query_as::<Team>().fetch_all(&self.pool).await?;
            Ok(teams)
        }

        async fn get_team_member(
            &self,
            team_id: &str,
            user_id: &str,
        ) -> ApiResult<Option<TeamMember>> {
            let member = sqlx::query_as::<_, TeamMember>(
                "SELECT * FROM team_members WHERE team_id = $1 AND user_id = $2",
            )
            .bind(team_id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
            Ok(member)
        }

        async fn list_team_members(&self, team_id: &str) -> ApiResult<Vec<TeamMember>> {
            let members = sqlx::query_as::<_, TeamMember>(
                "SELECT * FROM team_members WHERE team_id = $1 ORDER BY joined_at ASC",
            )
            .bind(team_id)
            .fetch_all(&self.pool)
            .await?;
            Ok(members)
        }

        async fn add_team_member(&self, member: CreateTeamMember) -> ApiResult<TeamMember> {
            let mut tx = self.pool.begin().await?;
            let member = insert_member(&mut tx, &member).await?;
            tx.commit().await?;
            Ok(member)
        }

        async fn remove_team_member(&self, team_id: &str, user_id: &str) -> ApiResult<()> {
            let mut tx = self.pool.begin().await?;

            // Serialize leader changes per team.
            sqlx::query("SELECT id FROM teams WHERE id = $1 FOR UPDATE")
                .bind(team_id)
                .execute(&mut *tx)
                .await?;

            let member = sqlx::query_as::<_, TeamMember>(
                "SELECT * FROM team_members WHERE team_id = $1 AND user_id = $2",
            )
            .bind(team_id)
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| ApiError::not_found("Team member not found"))?;

            if member.is_leader() {
                let leaders: i64 = sqlx::query_scalar(
                    "SELECT COUNT(*) FROM team_members WHERE team_id = $1 AND role = 'leader'",
                )
                .bind(team_id)
                .fetch_one(&mut *tx)
                .await?;
                if leaders <= 1 {
                    return Err(ApiError::bad_request("Cannot remove last team leader"));
                }
            }

            sqlx::query("DELETE FROM team_members WHERE id = $1")
                .bind(&member.id)
                .execute(&mut *tx)
                .await?;

            tx.commit().await?;
            Ok(())
        }
    }

    // -- InvitationOps --

    #[async_trait]
    impl InvitationOps for SqlxAdapter {
        async fn create_invitation(
            &self,
            create: CreateTeamInvitation,
        ) -> ApiResult<TeamInvitation> {
            let invitation = sqlx::query_as::<_, TeamInvitation>(
                r#"
                INSERT INTO team_invitations (id, team_id, email, role, token, status, invited_by, created_at)
                VALUES ($1, $2, $3, $4, $5, 'pending', $6, $7)
                RETURNING *
                "#,
            )
            .bind(new_id())
            .bind(&create.team_id)
            .bind(create.email.to_lowercase())
            .bind(create.role.as_str())
            .bind(&create.token)
            .bind(&create.invited_by)
            .bind(Utc::now())
            .fetch_one(&self.pool)
            .await?;
            Ok(invitation)
        }

        async fn get_invitation_by_token(&self, token: &str) -> ApiResult<Option<TeamInvitation>> {
            let invitation = sqlx::query_as::<_, TeamInvitation>(
                "SELECT * FROM team_invitations WHERE token = $1",
            )
            .bind(token)
            .fetch_optional(&self.pool)
            .await?;
            Ok(invitation)
        }

        async fn list_pending_invitations(&self, email: &str) -> ApiResult<Vec<TeamInvitation>> {
            let invitations = sqlx::query_as::<_, TeamInvitation>(
                r#"
                SELECT * FROM team_invitations
                WHERE email = $1 AND status = 'pending'
                ORDER BY created_at DESC
                "#,
            )
            .bind(email.trim().to_lowercase())
            .fetch_all(&self.pool)
            .await?;
            Ok(invitations)
        }

        async fn accept_invitation(&self, token: &str, user_id: &str) -> ApiResult<TeamMember> {
            let mut tx = self.pool.begin().await?;

            let invitation = sqlx::query_as::<_, TeamInvitation>(
                "SELECT * FROM team_invitations WHERE token = $1 AND status = 'pending' FOR UPDATE",
            )
            .bind(token)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| ApiError::not_found("Invalid or expired invitation"))?;

            let member = insert_member(
                &mut tx,
                &CreateTeamMember {
                    team_id: invitation.team_id.clone(),
                    user_id: user_id.to_string(),
                    role: invitation.role,
                },
            )
            .await?;

            sqlx::query(
                "UPDATE team_invitations SET status = 'accepted', accepted_at = $1 WHERE id = $2",
            )
            .bind(Utc::now())
            .bind(&invitation.id)
            .execute(&mut *tx)
            .await?;

            tx.commit().await?;
            Ok(member)
        }
    }

    // -- ProjectOps --

    #[async_trait]
    impl ProjectOps for SqlxAdapter {
        async fn create_project(&self, create: CreateProject) -> ApiResult<Project> {
            let now = Utc::now();
            let project = sqlx::query_as::<_, Project>(
                r#"
                INSERT INTO projects (id, title, description, category, visibility, progress,
                                      team_id, created_by, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, 0, $6, $7, $8, $9)
                RETURNING *
                "#,
            )
            .bind(new_id())
            .bind(&create.title)
            .bind(&create.description)
            .bind(&create.category)
            .bind(create.visibility.as_str())
            .bind(&create.team_id)
            .bind(&create.created_by)
            .bind(now)
            .bind(now)
            .fetch_one(&self.pool)
            .await?;
            Ok(project)
        }

        async fn get_project(&self, id: &str) -> ApiResult<Option<Project>> {
            let project = sqlx::query_as::<_, Project>("SELECT * FROM projects WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
            Ok(project)
        }

        async fn list_projects(&self, filter: ProjectFilter) -> ApiResult<Vec<Project>> {
            let mut query = QueryBuilder::<Postgres>::new("SELECT p.* FROM projects p WHERE ");
            push_can_view(&mut query, &filter.viewer_id);

            if let Some(category) = &filter.category {
                query.push(" AND p.category = ");
                query.push_bind(category);
            }
            if let Some(visibility) = filter.visibility {
                query.push(" AND p.visibility = ");
                query.push_bind(visibility.as_str());
            }
            if let Some(search) = &filter.search {
                let pattern = like_pattern(search);
                query.push(" AND (p.title ILIKE ");
                query.push_bind(pattern.clone());
                query.push(" OR p.description ILIKE ");
                query.push_bind(pattern);
                query.push(")");
            }
            query.push(" ORDER BY p.created_at DESC");

            let projects = query
                .build_query_as::<Project>()
                .fetch_all(&self.pool)
                .await?;
            Ok(projects)
        }

        async fn update_project(&self, id: &str, update: UpdateProject) -> ApiResult<Project> {
            let mut query =
                QueryBuilder::<Postgres>::new("UPDATE projects SET updated_at = NOW()");

            if let Some(title) = &update.title {
                query.push(", title = ");
                query.push_bind(title);
            }
            if let Some(description) = &update.description {
                query.push(", description = ");
                query.push_bind(description);
            }
            if let Some(category) = &update.category {
                query.push(", category = ");
                query.push_bind(category);
            }
            if let Some(visibility) = update.visibility {
                query.push(", visibility = ");
                query.push_bind(visibility.as_str());
            }
            if let Some(progress) = update.progress {
                query.push(", progress = ");
                query.push_bind(progress);
            }

            query.push(" WHERE id = ");
            query.push_bind(id);
            query.push(" RETURNING *");

            query
                .build_query_as::<Project>()
                .fetch_optional(&self.pool)
                .await?
                .ok_or_else(|| ApiError::not_found("Project not found"))
        }

        async fn delete_project(&self, id: &str) -> ApiResult<()> {
            // Papers, citations and datasets go with it through ON DELETE CASCADE.
            let result = sqlx::query("DELETE FROM projects WHERE id = $1")
                .bind(id)
                .execute(&self.pool)
                .await?;
            if result.rows_affected() == 0 {
                return Err(ApiError::not_found("Project not found"));
            }
            Ok(())
        }
    }

    // -- ResearchOps --

    #[async_trait]
    impl ResearchOps for SqlxAdapter {
        async fn create_paper(&self, create: CreatePaper) -> ApiResult<Paper> {
            let paper = sqlx::query_as::<_, Paper>(
                r#"
                INSERT INTO research_papers (id, title, abstract, file_url, project_id, uploaded_by, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                RETURNING *
                "#,
            )
            .bind(new_id())
            .bind(&create.title)
            .bind(&create.abstract_text)
            .bind(&create.file_url)
            .bind(&create.project_id)
            .bind(&create.uploaded_by)
            .bind(Utc::now())
            .fetch_one(&self.pool)
            .await?;
            Ok(paper)
        }

        async fn get_paper(&self, id: &str) -> ApiResult<Option<Paper>> {
            let paper = sqlx::query_as::<_, Paper>("SELECT * FROM research_papers WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
            Ok(paper)
        }

        async fn list_papers(&self, filter: PaperFilter) -> ApiResult<Vec<PaperWithCitations>> {
            let mut query = QueryBuilder::<Postgres>::new(
                r#"
                SELECT rp.*,
                       (SELECT COUNT(*) FROM citations c WHERE c.paper_id = rp.id) AS citation_count
                FROM research_papers rp
                JOIN projects p ON p.id = rp.project_id
                WHERE "#,
            );
            push_can_view(&mut query, &filter.viewer_id);

            if let Some(project_id) = &filter.project_id {
                query.push(" AND rp.project_id = ");
                query.push_bind(project_id);
            }
            query.push(" ORDER BY rp.created_at DESC");

            let papers = query
                .build_query_as::<PaperWithCitations>()
                .fetch_all(&self.pool)
                .await?;
            Ok(papers)
        }

        async fn create_citation(&self, create: CreateCitation) -> ApiResult<Citation> {
            let citation = sqlx::query_as::<_, Citation>(
                r#"
                INSERT INTO citations (id, paper_id, cited_title, cited_authors, cited_year, doi, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                RETURNING *
                "#,
            )
            .bind(new_id())
            .bind(&create.paper_id)
            .bind(&create.cited_title)
            .bind(&create.cited_authors)
            .bind(create.cited_year)
            .bind(&create.doi)
            .bind(Utc::now())
            .fetch_one(&self.pool)
            .await?;
            Ok(citation)
        }

        async fn list_citations(&self, paper_id: &str) -> ApiResult<Vec<Citation>> {
            let citations = sqlx::query_as::<_, Citation>(
                "SELECT * FROM citations WHERE paper_id = $1 ORDER BY created_at ASC",
            )
            .bind(paper_id)
            .fetch_all(&self.pool)
            .await?;
            Ok(citations)
        }

        async fn create_dataset(&self, create: CreateDataset) -> ApiResult<Dataset> {
            let dataset = sqlx::query_as::<_, Dataset>(
                r#"
                INSERT INTO datasets (id, name, description, file_url, project_id, uploaded_by, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                RETURNING *
                "#,
            )
            .bind(new_id())
            .bind(&create.name)
            .bind(&create.description)
            .bind(&create.file_url)
            .bind(&create.project_id)
            .bind(&create.uploaded_by)
            .bind(Utc::now())
            .fetch_one(&self.pool)
            .await?;
            Ok(dataset)
        }

        async fn list_datasets(&self, filter: DatasetFilter) -> ApiResult<Vec<Dataset>> {
            let mut query = QueryBuilder::<Postgres>::new(
                "SELECT d.* FROM datasets d JOIN projects p ON p.id = d.project_id WHERE ",
            );
            push_can_view(&mut query, &filter.viewer_id);

            if let Some(project_id) = &filter.project_id {
                query.push(" AND d.project_id = ");
                query.push_bind(project_id);
            }
            query.push(" ORDER BY d.created_at DESC");

            let datasets = query
                .build_query_as::<Dataset>()
                .fetch_all(&self.pool)
                .await?;
            Ok(datasets)
        }
    }

    // -- EventOps --

    #[async_trait]
    impl EventOps for SqlxAdapter {
        async fn create_event(&self, create: CreateEvent) -> ApiResult<Event> {
            let event = sqlx::query_as::<_, Event>(
                r#"
                INSERT INTO events (id, title, description, start_date, end_date, location,
                                    event_type, max_participants, created_by, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                RETURNING *
                "#,
            )
            .bind(new_id())
            .bind(&create.title)
            .bind(&create.description)
            .bind(create.start_date)
            .bind(create.end_date)
            .bind(&create.location)
            .bind(&create.event_type)
            .bind(create.max_participants)
            .bind(&create.created_by)
            .bind(Utc::now())
            .fetch_one(&self.pool)
            .await?;
            Ok(event)
        }

        async fn get_event(&self, id: &str) -> ApiResult<Option<Event>> {
            let event = sqlx::query_as::<_, Event>("SELECT * FROM events WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
            Ok(event)
        }

        async fn list_events(&self, filter: EventFilter) -> ApiResult<Vec<Event>> {
            let mut query = QueryBuilder::<Postgres>::new("SELECT * FROM events WHERE 1 = 1");

            if let Some(event_type) = &filter.event_type {
                query.push(" AND event_type = ");
                query.push_bind(event_type);
            }
            if let Some(from) = filter.starts_after {
                query.push(" AND start_date >= ");
                query.push_bind(from);
            }
            if let Some(until) = filter.ends_before {
                query.push(" AND end_date <= ");
                query.push_bind(until);
            }
            if let Some(search) = &filter.search {
                let pattern = like_pattern(search);
                query.push(" AND (title ILIKE ");
                query.push_bind(pattern.clone());
                query.push(" OR description ILIKE ");
                query.push_bind(pattern);
                query.push(")");
            }
            query.push(" ORDER BY start_date ASC");

            let events = query.build_query_as::<Event>().fetch_all(&self.pool).await?;
            Ok(events)
        }

        async fn list_event_registrations(
            &self,
            event_id: &str,
        ) -> ApiResult<Vec<EventRegistration>> {
            let registrations = sqlx::query_as::<_, EventRegistration>(
                "SELECT * FROM event_registrations WHERE event_id = $1 ORDER BY registered_at ASC",
            )
            .bind(event_id)
            .fetch_all(&self.pool)
            .await?;
            Ok(registrations)
        }

        async fn register_for_event(
            &self,
            event_id: &str,
            user_id: &str,
        ) -> ApiResult<EventRegistration> {
            let mut tx = self.pool.begin().await?;

            let event = sqlx::query_as::<_, Event>("SELECT * FROM events WHERE id = $1 FOR UPDATE")
                .bind(event_id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| ApiError::not_found("Event not found"))?;

            let already: bool = sqlx::query_scalar(
                "SELECT EXISTS (SELECT 1 FROM event_registrations WHERE event_id = $1 AND user_id = $2)",
            )
            .bind(event_id)
            .bind(user_id)
            .fetch_one(&mut *tx)
            .await?;
            if already {
                return Err(ApiError::bad_request("Already registered for this event"));
            }

            let count: i64 =
                sqlx::query_scalar("SELECT COUNT(*) FROM event_registrations WHERE event_id = $1")
                    .bind(event_id)
                    .fetch_one(&mut *tx)
                    .await?;
            if !event.has_capacity(count as usize) {
                return Err(ApiError::bad_request("Event is full"));
            }

            let registration = sqlx::query_as::<_, EventRegistration>(
                r#"
                INSERT INTO event_registrations (id, event_id, user_id, registered_at)
                VALUES ($1, $2, $3, $4)
                RETURNING *
                "#,
            )
            .bind(new_id())
            .bind(event_id)
            .bind(user_id)
            .bind(Utc::now())
            .fetch_one(&mut *tx)
            .await?;

            tx.commit().await?;
            Ok(registration)
        }

        async fn unregister_from_event(&self, event_id: &str, user_id: &str) -> ApiResult<()> {
            let result = sqlx::query(
                "DELETE FROM event_registrations WHERE event_id = $1 AND user_id = $2",
            )
            .bind(event_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
            if result.rows_affected() == 0 {
                return Err(ApiError::not_found("Registration not found"));
            }
            Ok(())
        }

        async fn list_upcoming_events(
            &self,
            user_id: &str,
            now: DateTime<Utc>,
        ) -> ApiResult<Vec<Event>> {
            let events = sqlx::query_as::<_, Event>(
                r#"
                SELECT e.* FROM events e
                JOIN event_registrations er ON er.event_id = e.id
                WHERE er.user_id = $1 AND e.start_date > $2
                ORDER BY e.start_date ASC
                "#,
            )
            .bind(user_id)
            .bind(now)
            .fetch_all(&self.pool)
            .await?;
            Ok(events)
        }
    }

    // -- ActivityOps --

    #[async_trait]
    impl ActivityOps for SqlxAdapter {
        async fn log_activity(&self, create: CreateActivity) -> ApiResult<ActivityEntry> {
            let entry = sqlx::query_as::<_, ActivityEntry>(
                r#"
                INSERT INTO activity_log (id, user_id, action, entity_type, entity_id, target_user_id, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                RETURNING *
                "#,
            )
            .bind(new_id())
            .bind(&create.user_id)
            .bind(&create.action)
            .bind(&create.entity_type)
            .bind(&create.entity_id)
            .bind(&create.target_user_id)
            .bind(Utc::now())
            .fetch_one(&self.pool)
            .await?;
            Ok(entry)
        }

        async fn list_user_activity(
            &self,
            user_id: &str,
            limit: usize,
        ) -> ApiResult<Vec<ActivityEntry>> {
            let entries = sqlx::query_as::<_, ActivityEntry>(
                "SELECT * FROM activity_log WHERE user_id = $1 ORDER BY created_at DESC LIMIT $2",
            )
            .bind(user_id)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;
            Ok(entries)
        }

        async fn dashboard_counts(
            &self,
            user_id: &str,
            now: DateTime<Utc>,
        ) -> ApiResult<DashboardCounts> {
            let cutoff = now - Duration::days(30);
            let row: (i64, i64, i64, i64, i64, i64, i64, i64) = sqlx::query_as(
                r#"
                SELECT
                    (SELECT COUNT(*) FROM projects WHERE created_by = $1),
                    (SELECT COUNT(*) FROM projects WHERE created_by = $1 AND created_at >= $2),
                    (SELECT COUNT(*) FROM team_members WHERE user_id = $1),
                    (SELECT COUNT(*) FROM team_members WHERE user_id = $1 AND joined_at >= $2),
                    (SELECT COUNT(*) FROM research_papers WHERE uploaded_by = $1),
                    (SELECT COUNT(*) FROM research_papers WHERE uploaded_by = $1 AND created_at >= $2),
                    (SELECT COUNT(*) FROM event_registrations er JOIN events e ON e.id = er.event_id
                        WHERE er.user_id = $1 AND e.end_date > $3),
                    (SELECT COUNT(*) FROM event_registrations er JOIN events e ON e.id = er.event_id
                        WHERE er.user_id = $1 AND e.end_date > $3 AND er.registered_at >= $2)
                "#,
            )
            .bind(user_id)
            .bind(cutoff)
            .bind(now)
            .fetch_one(&self.pool)
            .await?;

            Ok(DashboardCounts {
                total_projects: row.0,
                recent_projects: row.1,
                total_teams: row.2,
                recent_teams: row.3,
                total_papers: row.4,
                recent_papers: row.5,
                upcoming_events: row.6,
                recent_events: row.7,
            })
        }
    }

}
