use async_trait::async_trait;

use research_hub_core::adapters::DatabaseAdapter;
use research_hub_core::{ApiRequest, ApiResponse, ApiResult, ApiRoute, HttpMethod};
use research_hub_core::{HubContext, HubPlugin};

mod handlers;
mod types;


/// Teams, membership and invitations under `/teams`.
pub struct TeamsPlugin {
    config: TeamsConfig,
}

#[derive(Debug, Clone)]
pub struct TeamsConfig {
    /// Maximum number of users returned by `/teams/users/search`.
    pub user_search_limit: usize,
}

impl Default for TeamsConfig {
    fn default() -> Self {
        Self {
            user_search_limit: 10,
        }
    }
}

impl TeamsPlugin {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self {
            config: TeamsConfig::default(),
        }
    }

    pub fn with_config(config: TeamsConfig) -> Self {
        Self { config }
    }

    pub fn user_search_limit(mut self, limit: usize) -> Self {
        self.config.user_search_limit = limit;
        self
    }
}

#[async_trait]
impl<DB: DatabaseAdapter> HubPlugin<DB> for TeamsPlugin {
    fn name(&self) -> &'static str {
        "teams"
    }

    fn routes(&self) -> Vec<ApiRoute> {
        vec![
            ApiRoute::post("/teams", "create_team"),
            ApiRoute::get("/teams", "list_teams"),
            ApiRoute::get("/teams/my-teams", "my_teams"),
            ApiRoute::get("/teams/users/search", "search_users"),
            ApiRoute::get("/teams/invitations", "list_invitations"),
            ApiRoute::post("/teams/invitations/{token}/accept", "accept_invitation"),
            ApiRoute::get("/teams/{id}", "get_team"),
            ApiRoute::put("/teams/{id}", "update_team"),
            ApiRoute::post("/teams/{id}/members", "add_member"),
            ApiRoute::delete("/teams/{id}/members/{userId}", "remove_member"),
        ]
    }

    async fn on_request(
        &self,
        req: &ApiRequest,
        ctx: &HubContext<DB>,
    ) -> ApiResult<Option<ApiResponse>> {
        let segments = req.segments();
        let response = match (req.method(), segments.as_slice()) {
            (HttpMethod::Post, ["teams"]) => handlers::handle_create_team(req, ctx).await?,
            (HttpMethod::Get, ["teams"]) => handlers::handle_list_teams(req, ctx).await?,
            (HttpMethod::Get, ["teams", "my-teams"]) => handlers::handle_my_teams(req, ctx).await?,
            (HttpMethod::Get, ["teams", "users", "search"]) => {
                handlers::handle_search_users(req, ctx, &self.config).await?
            }
            (HttpMethod::Get, ["teams", "invitations"]) => {
                handlers::handle_list_invitations(req, ctx).await?
            }
            (HttpMethod::Post, ["teams", "invitations", token, "accept"]) => {
                handlers::handle_accept_invitation(req, ctx, token).await?
            }
            (HttpMethod::Get, ["teams", id]) => handlers::handle_get_team(req, ctx, id).await?,
            (HttpMethod::Put, ["teams", id]) => handlers::handle_update_team(req, ctx, id).await?,
            (HttpMethod::Post, ["teams", id, "members"]) => {
                handlers::handle_add_member(req, ctx, id).await?
            }
            (HttpMethod::Delete, ["teams", id, "members", user_id]) => {
                handlers::handle_remove_member(req, ctx, id, user_id).await?
            }
            _ => return Ok(None),
        };
        Ok(Some(response))
    }
}
