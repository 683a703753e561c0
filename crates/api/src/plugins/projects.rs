use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use validator::Validate;

use research_hub_core::adapters::DatabaseAdapter;
use research_hub_core::{ApiError, ApiResult, ApiRoute, HubContext, HubPlugin};
use research_hub_core::{
    ApiRequest, ApiResponse, CreateActivity, CreateProject, Dataset, DatasetFilter, HttpMethod,
    PaperFilter, PaperWithCitations, Project, ProjectFilter, UpdateProject, UserCard, Visibility,
};

use super::helpers::{
    can_manage_project, can_view_project, non_blank, parse_query, trimmed, user_card,
};

/// Research projects under `/projects`.
pub struct ProjectsPlugin;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct CreateProjectRequest {
    #[serde(default, deserialize_with = "trimmed")]
    #[validate(length(min = 1, max = 255, message = "Title is required"))]
    title: String,
    description: Option<String>,
    category: Option<String>,
    visibility: Option<Visibility>,
    team_id: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct UpdateProjectRequest {
    #[validate(length(min = 1, max = 255, message = "Title cannot be empty"))]
    title: Option<String>,
    description: Option<String>,
    category: Option<String>,
    visibility: Option<Visibility>,
    #[validate(range(min = 0, max = 100, message = "Progress must be between 0 and 100"))]
    progress: Option<i32>,
}

#[derive(Debug, Default, Deserialize)]
struct ListProjectsQuery {
    category: Option<String>,
    search: Option<String>,
    visibility: Option<String>,
}

#[derive(Debug, Serialize)]
struct TeamSummary {
    id: String,
    name: String,
}

#[derive(Debug, Serialize)]
struct ProjectDetail {
    #[serde(flatten)]
    project: Project,
    creator: Option<UserCard>,
    team: Option<TeamSummary>,
    papers: Vec<PaperWithCitations>,
    datasets: Vec<Dataset>,
}

impl ProjectsPlugin {
    async fn detail<DB: DatabaseAdapter>(
        ctx: &HubContext<DB>,
        project: Project,
        viewer_id: &str,
    ) -> ApiResult<ProjectDetail> {
        let creator = user_card(ctx, &project.created_by).await?;
        let team = match project.team_id.as_deref() {
            Some(team_id) => ctx
                .database
                .get_team(team_id)
                .await?
                .map(|t| TeamSummary {
                    id: t.id,
                    name: t.name,
                }),
            None => None,
        };
        let papers = ctx
            .database
            .list_papers(PaperFilter {
                viewer_id: viewer_id.to_string(),
                project_id: Some(project.id.clone()),
            })
            .await?;
        let datasets = ctx
            .database
            .list_datasets(DatasetFilter {
                viewer_id: viewer_id.to_string(),
                project_id: Some(project.id.clone()),
            })
            .await?;

        Ok(ProjectDetail {
            project,
            creator,
            team,
            papers,
            datasets,
        })
    }

    async fn require_project<DB: DatabaseAdapter>(
        ctx: &HubContext<DB>,
        id: &str,
    ) -> ApiResult<Project> {
        ctx.database
            .get_project(id)
            .await?
            .ok_or_else(|| ApiError::not_found("Project not found"))
    }

    async fn handle_create<DB: DatabaseAdapter>(
        &self,
        req: &ApiRequest,
        ctx: &HubContext<DB>,
    ) -> ApiResult<ApiResponse> {
        let user = ctx.require_user(req).await?;
        let body: CreateProjectRequest = match research_hub_core::validate_request_body(req) {
            Ok(v) => v,
            Err(resp) => return Ok(resp),
        };

        let team_id = non_blank(body.team_id);
        if let Some(team_id) = &team_id {
            if ctx.database.get_team(team_id).await?.is_none() {
                return Err(ApiError::not_found("Team not found"));
            }
            if ctx
                .database
                .get_team_member(team_id, &user.id)
                .await?
                .is_none()
            {
                return Err(ApiError::forbidden("Not a member of this team"));
            }
        }

        let project = ctx
            .database
            .create_project(CreateProject {
                title: body.title,
                description: non_blank(body.description),
                category: non_blank(body.category),
                visibility: body.visibility.unwrap_or_default(),
                team_id,
                created_by: user.id.clone(),
            })
            .await?;

        ctx.audit(CreateActivity::new(&user.id, "create", "project", &project.id))
            .await;

        let detail = Self::detail(ctx, project, &user.id).await?;
        Ok(ApiResponse::json(201, &detail)?)
    }

    async fn handle_list<DB: DatabaseAdapter>(
        &self,
        req: &ApiRequest,
        ctx: &HubContext<DB>,
    ) -> ApiResult<ApiResponse> {
        let user = ctx.require_user(req).await?;
        let query: ListProjectsQuery = parse_query(&req.query);

        let filter = ProjectFilter {
            viewer_id: user.id.clone(),
            category: non_blank(query.category),
            search: non_blank(query.search),
            visibility: query.visibility.as_deref().and_then(Visibility::parse),
        };
        let projects = ctx.database.list_projects(filter).await?;

        let mut details = Vec::with_capacity(projects.len());
        for project in projects {
            details.push(Self::detail(ctx, project, &user.id).await?);
        }
        Ok(ApiResponse::json(200, &details)?)
    }

    async fn handle_get<DB: DatabaseAdapter>(
        &self,
        req: &ApiRequest,
        ctx: &HubContext<DB>,
        id: &str,
    ) -> ApiResult<ApiResponse> {
        let user = ctx.require_user(req).await?;
        let hidden = || ApiError::not_found("Project not found or access denied");

        let project = ctx.database.get_project(id).await?.ok_or_else(hidden)?;
        if !can_view_project(ctx, &project, &user.id).await? {
            return Err(hidden());
        }

        let detail = Self::detail(ctx, project, &user.id).await?;
        Ok(ApiResponse::json(200, &detail)?)
    }

    async fn handle_update<DB: DatabaseAdapter>(
        &self,
        req: &ApiRequest,
        ctx: &HubContext<DB>,
        id: &str,
    ) -> ApiResult<ApiResponse> {
        let user = ctx.require_user(req).await?;
        let body: UpdateProjectRequest = match research_hub_core::validate_request_body(req) {
            Ok(v) => v,
            Err(resp) => return Ok(resp),
        };

        let project = Self::require_project(ctx, id).await?;
        if !can_manage_project(ctx, &project, &user.id).await? {
            return Err(ApiError::forbidden("Not authorized to update this project"));
        }

        let update = UpdateProject {
            title: body.title.map(|t| t.trim().to_string()),
            description: body.description,
            category: body.category,
            visibility: body.visibility,
            progress: body.progress,
        };
        let project = ctx.database.update_project(id, update).await?;

        ctx.audit(CreateActivity::new(&user.id, "update", "project", id))
            .await;

        let detail = Self::detail(ctx, project, &user.id).await?;
        Ok(ApiResponse::json(200, &detail)?)
    }

    async fn handle_delete<DB: DatabaseAdapter>(
        &self,
        req: &ApiRequest,
        ctx: &HubContext<DB>,
        id: &str,
    ) -> ApiResult<ApiResponse> {
        let user = ctx.require_user(req).await?;
        let project = Self::require_project(ctx, id).await?;
        if !can_manage_project(ctx, &project, &user.id).await? {
            return Err(ApiError::forbidden("Not authorized to delete this project"));
        }

        ctx.database.delete_project(id).await?;
        ctx.audit(CreateActivity::new(&user.id, "delete", "project", id))
            .await;

        tracing::info!(project_id = %id, user_id = %user.id, "project deleted");
        Ok(ApiResponse::message(200, "Project deleted successfully")?)
    }
}

#[async_trait]
impl<DB: DatabaseAdapter> HubPlugin<DB> for ProjectsPlugin {
    fn name(&self) -> &'static str {
        "projects"
    }

    fn routes(&self) -> Vec<ApiRoute> {
        vec![
            ApiRoute::post("/projects", "create_project"),
            ApiRoute::get("/projects", "list_projects"),
            ApiRoute::get("/projects/{id}", "get_project"),
            ApiRoute::put("/projects/{id}", "update_project"),
            ApiRoute::delete("/projects/{id}", "delete_project"),
        ]
    }

    async fn on_request(
        &self,
        req: &ApiRequest,
        ctx: &HubContext<DB>,
    ) -> ApiResult<Option<ApiResponse>> {
        let segments = req.segments();
        let response = match (req.method(), segments.as_slice()) {
            (HttpMethod::Post, ["projects"]) => self.handle_create(req, ctx).await?,
            (HttpMethod::Get, ["projects"]) => self.handle_list(req, ctx).await?,
            (HttpMethod::Get, ["projects", id]) => self.handle_get(req, ctx, id).await?,
            (HttpMethod::Put, ["projects", id]) => self.handle_update(req, ctx, id).await?,
            (HttpMethod::Delete, ["projects", id]) => self.handle_delete(req, ctx, id).await?,
            _ => return Ok(None),
        };
        Ok(Some(response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugins::test_helpers::{
        self, add_user, create_request, create_request_with_query, json_body,
    };
    use research_hub_core::{CreatePaper, CreateTeam, MemoryDatabaseAdapter, TeamRole};
    use research_hub_core::adapters::{ActivityOps, ProjectOps, ResearchOps, TeamOps};
    use serde_json::json;
    use std::collections::HashMap;

    async fn call(
        ctx: &HubContext<MemoryDatabaseAdapter>,
        req: ApiRequest,
    ) -> ApiResult<ApiResponse> {
        ProjectsPlugin
            .on_request(&req, ctx)
            .await
            .map(|r| r.expect("route handled"))
    }

    async fn create_project(
        ctx: &HubContext<MemoryDatabaseAdapter>,
        token: &str,
        body: serde_json::Value,
    ) -> serde_json::Value {
        let req = create_request(HttpMethod::Post, "/projects", Some(token), Some(body));
        let response = call(ctx, req).await.unwrap();
        assert_eq!(response.status, 201);
        json_body(&response)
    }

    #[tokio::test]
    async fn test_create_project_defaults() {
        let (ctx, user, token) =
            test_helpers::create_test_context_with_user("owner@lab.org").await;
        let project = create_project(&ctx, &token, json!({"title": "  Dark matter  "})).await;

        assert_eq!(project["title"], "Dark matter");
        assert_eq!(project["visibility"], "private");
        assert_eq!(project["progress"], 0);
        assert_eq!(project["creator"]["id"], user.id.as_str());
        assert_eq!(project["team"], serde_json::Value::Null);
        assert_eq!(project["papers"], json!([]));
        assert_eq!(project["datasets"], json!([]));

        let activity = ctx.database.list_user_activity(&user.id, 5).await.unwrap();
        assert_eq!(activity[0].action, "create");
        assert_eq!(activity[0].entity_type, "project");
    }

    #[tokio::test]
    async fn test_blank_title_is_validation_error() {
        let (ctx, _, token) = test_helpers::create_test_context_with_user("owner@lab.org").await;
        let req = create_request(
            HttpMethod::Post,
            "/projects",
            Some(&token),
            Some(json!({"title": "   "})),
        );
        let response = call(&ctx, req).await.unwrap();
        assert_eq!(response.status, 400);
        assert_eq!(json_body(&response)["message"], "Title is required");
    }

    #[tokio::test]
    async fn test_team_project_requires_membership() {
        let (ctx, leader, _) = test_helpers::create_test_context_with_user("lead@lab.org").await;
        let (_, outsider_token) = add_user(&ctx, "out@lab.org", "Out").await;
        let team = ctx
            .database
            .create_team(CreateTeam::new("Optics", &leader.id))
            .await
            .unwrap();

        let req = create_request(
            HttpMethod::Post,
            "/projects",
            Some(&outsider_token),
            Some(json!({"title": "Lasers", "teamId": team.id})),
        );
        let err = call(&ctx, req).await.unwrap_err();
        assert_eq!(err.status_code(), 403);
        assert_eq!(err.to_string(), "Not a member of this team");

        let req = create_request(
            HttpMethod::Post,
            "/projects",
            Some(&outsider_token),
            Some(json!({"title": "Lasers", "teamId": "missing"})),
        );
        let err = call(&ctx, req).await.unwrap_err();
        assert_eq!(err.status_code(), 404);
    }

    #[tokio::test]
    async fn test_visibility_rules() {
        let (ctx, owner, owner_token) =
            test_helpers::create_test_context_with_user("owner@lab.org").await;
        let (member, member_token) = add_user(&ctx, "member@lab.org", "Member").await;
        let (_, stranger_token) = add_user(&ctx, "stranger@lab.org", "Stranger").await;
        let team = ctx
            .database
            .create_team(
                CreateTeam::new("Optics", &owner.id).with_member(&member.id, TeamRole::Member),
            )
            .await
            .unwrap();

        let private = create_project(&ctx, &owner_token, json!({"title": "Private"})).await;
        let shared = create_project(
            &ctx,
            &owner_token,
            json!({"title": "Shared", "visibility": "team", "teamId": team.id}),
        )
        .await;
        create_project(
            &ctx,
            &owner_token,
            json!({"title": "Open", "visibility": "public", "category": "physics"}),
        )
        .await;

        let titles = |value: serde_json::Value| -> Vec<String> {
            value
                .as_array()
                .unwrap()
                .iter()
                .map(|p| p["title"].as_str().unwrap().to_string())
                .collect()
        };

        let req = create_request(HttpMethod::Get, "/projects", Some(&owner_token), None);
        let all = json_body(&call(&ctx, req).await.unwrap());
        assert_eq!(titles(all), vec!["Open", "Shared", "Private"]);

        let req = create_request(HttpMethod::Get, "/projects", Some(&member_token), None);
        let seen = json_body(&call(&ctx, req).await.unwrap());
        assert_eq!(titles(seen), vec!["Open", "Shared"]);

        let req = create_request(HttpMethod::Get, "/projects", Some(&stranger_token), None);
        let seen = json_body(&call(&ctx, req).await.unwrap());
        assert_eq!(titles(seen), vec!["Open"]);

        let mut query = HashMap::new();
        query.insert("category".to_string(), "physics".to_string());
        let req = create_request_with_query(
            HttpMethod::Get,
            "/projects",
            Some(&owner_token),
            None,
            query,
        );
        let filtered = json_body(&call(&ctx, req).await.unwrap());
        assert_eq!(titles(filtered), vec!["Open"]);

        let req = create_request(
            HttpMethod::Get,
            &format!("/projects/{}", private["id"].as_str().unwrap()),
            Some(&stranger_token),
            None,
        );
        let err = call(&ctx, req).await.unwrap_err();
        assert_eq!(err.status_code(), 404);
        assert_eq!(err.to_string(), "Project not found or access denied");

        let req = create_request(
            HttpMethod::Get,
            &format!("/projects/{}", shared["id"].as_str().unwrap()),
            Some(&member_token),
            None,
        );
        let detail = json_body(&call(&ctx, req).await.unwrap());
        assert_eq!(detail["team"]["name"], "Optics");
    }

    #[tokio::test]
    async fn test_update_permissions_and_progress_bounds() {
        let (ctx, owner, owner_token) =
            test_helpers::create_test_context_with_user("owner@lab.org").await;
        let (member, member_token) = add_user(&ctx, "member@lab.org", "Member").await;
        let team = ctx
            .database
            .create_team(
                CreateTeam::new("Optics", &owner.id).with_member(&member.id, TeamRole::Member),
            )
            .await
            .unwrap();
        let project = create_project(
            &ctx,
            &owner_token,
            json!({"title": "Shared", "visibility": "team", "teamId": team.id}),
        )
        .await;
        let path = format!("/projects/{}", project["id"].as_str().unwrap());

        let req = create_request(
            HttpMethod::Put,
            &path,
            Some(&member_token),
            Some(json!({"progress": 50})),
        );
        let err = call(&ctx, req).await.unwrap_err();
        assert_eq!(err.status_code(), 403);
        assert_eq!(err.to_string(), "Not authorized to update this project");

        let req = create_request(
            HttpMethod::Put,
            &path,
            Some(&owner_token),
            Some(json!({"progress": 101})),
        );
        assert_eq!(call(&ctx, req).await.unwrap().status, 400);

        let req = create_request(
            HttpMethod::Put,
            &path,
            Some(&owner_token),
            Some(json!({"progress": 40, "visibility": "public"})),
        );
        let updated = json_body(&call(&ctx, req).await.unwrap());
        assert_eq!(updated["progress"], 40);
        assert_eq!(updated["visibility"], "public");
        assert_eq!(updated["title"], "Shared");

        let req = create_request(
            HttpMethod::Put,
            "/projects/missing",
            Some(&owner_token),
            Some(json!({"progress": 1})),
        );
        let err = call(&ctx, req).await.unwrap_err();
        assert_eq!(err.to_string(), "Project not found");
    }

    #[tokio::test]
    async fn test_delete_cascades() {
        let (ctx, owner, owner_token) =
            test_helpers::create_test_context_with_user("owner@lab.org").await;
        let (_, other_token) = add_user(&ctx, "other@lab.org", "Other").await;
        let project = create_project(&ctx, &owner_token, json!({"title": "Doomed"})).await;
        let project_id = project["id"].as_str().unwrap().to_string();
        ctx.database
            .create_paper(CreatePaper {
                title: "Draft".into(),
                abstract_text: None,
                file_url: None,
                project_id: project_id.clone(),
                uploaded_by: owner.id.clone(),
            })
            .await
            .unwrap();

        let path = format!("/projects/{}", project_id);
        let req = create_request(HttpMethod::Delete, &path, Some(&other_token), None);
        let err = call(&ctx, req).await.unwrap_err();
        assert_eq!(err.to_string(), "Not authorized to delete this project");

        let req = create_request(HttpMethod::Delete, &path, Some(&owner_token), None);
        let body = json_body(&call(&ctx, req).await.unwrap());
        assert_eq!(body["message"], "Project deleted successfully");

        assert!(ctx.database.get_project(&project_id).await.unwrap().is_none());
        let papers = ctx
            .database
            .list_papers(PaperFilter {
                viewer_id: owner.id.clone(),
                project_id: None,
            })
            .await
            .unwrap();
        assert!(papers.is_empty());
    }
}
