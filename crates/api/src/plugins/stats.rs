use async_trait::async_trait;
use chrono::Utc;

use research_hub_core::adapters::DatabaseAdapter;
use research_hub_core::{ApiRequest, ApiResponse, ApiResult, ApiRoute, HttpMethod};
use research_hub_core::{DashboardStats, HubContext, HubPlugin};

/// Per-user dashboard figures and activity feed under `/stats`.
pub struct StatsPlugin {
    config: StatsConfig,
}

#[derive(Debug, Clone)]
pub struct StatsConfig {
    pub default_activity_limit: usize,
    pub max_activity_limit: usize,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            default_activity_limit: 20,
            max_activity_limit: 100,
        }
    }
}

impl StatsPlugin {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self {
            config: StatsConfig::default(),
        }
    }

    pub fn with_config(config: StatsConfig) -> Self {
        Self { config }
    }

    /// `limit` query value clamped to `1..=max`; unparsable values fall back
    /// to the default.
    fn activity_limit(&self, req: &ApiRequest) -> usize {
        req.query_param("limit")
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(self.config.default_activity_limit)
            .clamp(1, self.config.max_activity_limit)
    }

    async fn handle_dashboard<DB: DatabaseAdapter>(
        &self,
        req: &ApiRequest,
        ctx: &HubContext<DB>,
    ) -> ApiResult<ApiResponse> {
        let user = ctx.require_user(req).await?;
        let counts = ctx.database.dashboard_counts(&user.id, Utc::now()).await?;
        Ok(ApiResponse::json(200, &DashboardStats::from(counts))?)
    }

    async fn handle_activity<DB: DatabaseAdapter>(
        &self,
        req: &ApiRequest,
        ctx: &HubContext<DB>,
    ) -> ApiResult<ApiResponse> {
        let user = ctx.require_user(req).await?;
        let entries = ctx
            .database
            .list_user_activity(&user.id, self.activity_limit(req))
            .await?;
        Ok(ApiResponse::json(200, &entries)?)
    }
}

#[async_trait]
impl<DB: DatabaseAdapter> HubPlugin<DB> for StatsPlugin {
    fn name(&self) -> &'static str {
        "stats"
    }

    fn routes(&self) -> Vec<ApiRoute> {
        vec![
            ApiRoute::get("/stats/dashboard", "dashboard_stats"),
            ApiRoute::get("/stats/activity", "recent_activity"),
        ]
    }

    async fn on_request(
        &self,
        req: &ApiRequest,
        ctx: &HubContext<DB>,
    ) -> ApiResult<Option<ApiResponse>> {
        match (req.method(), req.path()) {
            (HttpMethod::Get, "/stats/dashboard") => {
                Ok(Some(self.handle_dashboard(req, ctx).await?))
            }
            (HttpMethod::Get, "/stats/activity") => Ok(Some(self.handle_activity(req, ctx).await?)),
            _ => Ok(None),
        }
    }
}
