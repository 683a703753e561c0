use std::sync::Arc;

use research_hub_api::plugins::{
    AuthPlugin, EventsPlugin, ProjectsPlugin, ResearchPlugin, StatsPlugin, TeamsPlugin,
};
use research_hub_core::{
    ApiError, ApiRequest, ApiResponse, ApiResult, ApiRoute, DatabaseAdapter, EmailProvider,
    HealthCheckResponse, HttpMethod, HubConfig, HubContext, HubPlugin,
    middleware::{self, BodyLimitConfig, BodyLimitMiddleware, CorsConfig, CorsMiddleware, Middleware},
};

/// The Research Hub instance, generic over the database adapter.
pub struct ResearchHub<DB: DatabaseAdapter> {
    config: Arc<HubConfig>,
    plugins: Vec<Box<dyn HubPlugin<DB>>>,
    middlewares: Vec<Box<dyn Middleware>>,
    database: Arc<DB>,
    context: HubContext<DB>,
    body_read_limit: usize,
}

/// Initial builder for configuring the hub.
///
/// Call `.database(adapter)` to obtain a [`TypedHubBuilder`] that can
/// accept plugins.
pub struct HubBuilder {
    config: HubConfig,
    cors_config: Option<CorsConfig>,
    body_limit_config: Option<BodyLimitConfig>,
    custom_middlewares: Vec<Box<dyn Middleware>>,
}

/// Typed builder returned by [`HubBuilder::database`].
pub struct TypedHubBuilder<DB: DatabaseAdapter> {
    config: HubConfig,
    database: Arc<DB>,
    plugins: Vec<Box<dyn HubPlugin<DB>>>,
    cors_config: Option<CorsConfig>,
    body_limit_config: Option<BodyLimitConfig>,
    custom_middlewares: Vec<Box<dyn Middleware>>,
}

impl HubBuilder {
    pub fn new(config: HubConfig) -> Self {
        Self {
            config,
            cors_config: None,
            body_limit_config: None,
            custom_middlewares: Vec::new(),
        }
    }

    /// Set the database adapter, returning a [`TypedHubBuilder`].
    pub fn database<DB: DatabaseAdapter>(self, database: DB) -> TypedHubBuilder<DB> {
        self.shared_database(Arc::new(database))
    }

    /// Like [`HubBuilder::database`], for an adapter that is also used
    /// elsewhere (migrations, background jobs).
    pub fn shared_database<DB: DatabaseAdapter>(self, database: Arc<DB>) -> TypedHubBuilder<DB> {
        TypedHubBuilder {
            config: self.config,
            database,
            plugins: Vec::new(),
            cors_config: self.cors_config,
            body_limit_config: self.body_limit_config,
            custom_middlewares: self.custom_middlewares,
        }
    }

    pub fn cors(mut self, config: CorsConfig) -> Self {
        self.cors_config = Some(config);
        self
    }

    pub fn body_limit(mut self, config: BodyLimitConfig) -> Self {
        self.body_limit_config = Some(config);
        self
    }

    pub fn email_provider<E: EmailProvider + 'static>(mut self, provider: E) -> Self {
        self.config.email_provider = Some(Arc::new(provider));
        self
    }
}

impl<DB: DatabaseAdapter> TypedHubBuilder<DB> {
    /// Add a resource plugin.
    pub fn plugin<P: HubPlugin<DB> + 'static>(mut self, plugin: P) -> Self {
        self.plugins.push(Box::new(plugin));
        self
    }

    /// Register the full platform: auth, teams, projects, research, events
    /// and stats, each with its default configuration.
    pub fn default_plugins(self) -> Self {
        self.plugin(AuthPlugin::new())
            .plugin(TeamsPlugin::new())
            .plugin(ProjectsPlugin)
            .plugin(ResearchPlugin)
            .plugin(EventsPlugin)
            .plugin(StatsPlugin::new())
    }

    pub fn cors(mut self, config: CorsConfig) -> Self {
        self.cors_config = Some(config);
        self
    }

    pub fn body_limit(mut self, config: BodyLimitConfig) -> Self {
        self.body_limit_config = Some(config);
        self
    }

    pub fn email_provider<E: EmailProvider + 'static>(mut self, provider: E) -> Self {
        self.config.email_provider = Some(Arc::new(provider));
        self
    }

    /// Add a custom middleware; it runs after the built-in ones.
    pub fn middleware<M: Middleware + 'static>(mut self, mw: M) -> Self {
        self.custom_middlewares.push(Box::new(mw));
        self
    }

    pub async fn build(self) -> ApiResult<ResearchHub<DB>> {
        self.config.validate()?;

        let config = Arc::new(self.config);
        let database = self.database;

        let mut context = HubContext::new(config.clone(), database.clone())?;
        for plugin in &self.plugins {
            plugin.on_init(&mut context).await?;
        }

        // Order: body limit, then CORS, then custom.
        let body_limit = self
            .body_limit_config
            .unwrap_or_else(|| BodyLimitConfig::default().for_uploads(config.uploads.max_file_size));
        let cors = self
            .cors_config
            .unwrap_or_else(|| CorsConfig::new().allowed_origin(config.frontend_url.clone()));

        let body_read_limit = body_limit.read_limit();
        let mut middlewares: Vec<Box<dyn Middleware>> = vec![
            Box::new(BodyLimitMiddleware::new(body_limit)),
            Box::new(CorsMiddleware::new(cors)),
        ];
        middlewares.extend(self.custom_middlewares);

        tracing::debug!(
            plugins = self.plugins.len(),
            middlewares = middlewares.len(),
            "research hub built"
        );

        Ok(ResearchHub {
            config,
            plugins: self.plugins,
            middlewares,
            database,
            context,
            body_read_limit,
        })
    }
}

impl<DB: DatabaseAdapter> ResearchHub<DB> {
    /// Create a new hub builder.
    #[allow(clippy::new_ret_no_self)]
    pub fn new(config: HubConfig) -> HubBuilder {
        HubBuilder::new(config)
    }

    /// Handle a request relative to the mount point.
    ///
    /// Errors are converted into `{ "message": "..." }` responses via
    /// [`ApiError::into_response`]; after-middleware runs on every
    /// response, errors included.
    pub async fn handle_request(&self, req: ApiRequest) -> ApiResult<ApiResponse> {
        let response = match self.handle_request_inner(&req).await {
            Ok(response) => response,
            Err(err) => {
                if err.status_code() >= 500 {
                    self.config.logger.error(&format!(
                        "{:?} {} failed: {}",
                        req.method(),
                        req.path(),
                        err
                    ));
                }
                err.into_response()
            }
        };
        middleware::run_after(&self.middlewares, &req, response).await
    }

    async fn handle_request_inner(&self, req: &ApiRequest) -> ApiResult<ApiResponse> {
        if let Some(response) = middleware::run_before(&self.middlewares, req).await? {
            return Ok(response);
        }

        if let Some(response) = self.handle_core_request(req)? {
            return Ok(response);
        }

        for plugin in &self.plugins {
            if let Some(response) = plugin.on_request(req, &self.context).await? {
                return Ok(response);
            }
        }

        Err(ApiError::not_found("No handler found for this request"))
    }

    fn handle_core_request(&self, req: &ApiRequest) -> ApiResult<Option<ApiResponse>> {
        match (req.method(), req.path()) {
            (HttpMethod::Get, "/health") => Ok(Some(ApiResponse::json(
                200,
                &HealthCheckResponse {
                    status: "ok",
                    service: "research-hub",
                },
            )?)),
            _ => Ok(None),
        }
    }

    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    pub fn database(&self) -> &Arc<DB> {
        &self.database
    }

    /// Context shared with plugins (token manager, upload store, ...).
    pub fn context(&self) -> &HubContext<DB> {
        &self.context
    }

    /// Largest request body an HTTP integration should buffer.
    pub fn body_read_limit(&self) -> usize {
        self.body_read_limit
    }

    /// Every route declared by the registered plugins.
    pub fn routes(&self) -> Vec<ApiRoute> {
        self.plugins.iter().flat_map(|p| p.routes()).collect()
    }

    pub fn plugins(&self) -> &[Box<dyn HubPlugin<DB>>] {
        &self.plugins
    }

    pub fn get_plugin(&self, name: &str) -> Option<&dyn HubPlugin<DB>> {
        self.plugins
            .iter()
            .find(|p| p.name() == name)
            .map(|p| p.as_ref())
    }

    pub fn plugin_names(&self) -> Vec<&'static str> {
        self.plugins.iter().map(|p| p.name()).collect()
    }
}
