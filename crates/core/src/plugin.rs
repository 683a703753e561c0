use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use crate::adapters::DatabaseAdapter;
use crate::config::HubConfig;
use crate::email::EmailProvider;
use crate::error::{ApiError, ApiResult};
use crate::token::{Claims, TokenManager};
use crate::types::{ApiRequest, ApiResponse, CreateActivity, HttpMethod, User};
use crate::uploads::UploadStore;

/// Trait implemented by every resource plugin (auth, teams, projects, ...).
#[async_trait]
pub trait HubPlugin<DB: DatabaseAdapter>: Send + Sync {
    /// Plugin name - should be unique
    fn name(&self) -> &'static str;

    /// Routes that this plugin handles, in router syntax (`/teams/{id}`).
    fn routes(&self) -> Vec<ApiRoute>;

    /// Called once while the hub is being built.
    async fn on_init(&self, ctx: &mut HubContext<DB>) -> ApiResult<()> {
        let _ = ctx;
        Ok(())
    }

    /// Called for each request - return Some(response) to handle, None to pass through
    async fn on_request(
        &self,
        req: &ApiRequest,
        ctx: &HubContext<DB>,
    ) -> ApiResult<Option<ApiResponse>>;
}

/// Route definition for plugins
#[derive(Debug, Clone)]
pub struct ApiRoute {
    pub path: String,
    pub method: HttpMethod,
    pub operation_id: String,
}

impl ApiRoute {
    pub fn new(
        method: HttpMethod,
        path: impl Into<String>,
        operation_id: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            method,
            operation_id: operation_id.into(),
        }
    }

    pub fn get(path: impl Into<String>, operation_id: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, path, operation_id)
    }

    pub fn post(path: impl Into<String>, operation_id: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, path, operation_id)
    }

    pub fn put(path: impl Into<String>, operation_id: impl Into<String>) -> Self {
        Self::new(HttpMethod::Put, path, operation_id)
    }

    pub fn delete(path: impl Into<String>, operation_id: impl Into<String>) -> Self {
        Self::new(HttpMethod::Delete, path, operation_id)
    }

    /// Whether `segments` (a request path split on `/`) fits this route's
    /// pattern, treating `{name}` segments as wildcards.
    pub fn matches(&self, method: &HttpMethod, segments: &[&str]) -> bool {
        if &self.method != method {
            return false;
        }
        let pattern: Vec<&str> = self.path.split('/').filter(|s| !s.is_empty()).collect();
        pattern.len() == segments.len()
            && pattern.iter().zip(segments).all(|(p, s)| {
                (p.starts_with('{') && p.ends_with('}') && !s.is_empty()) || p == s
            })
    }
}

/// Context passed to plugin methods
pub struct HubContext<DB: DatabaseAdapter> {
    pub config: Arc<HubConfig>,
    pub database: Arc<DB>,
    pub tokens: TokenManager,
    pub uploads: UploadStore,
    pub email_provider: Option<Arc<dyn EmailProvider>>,
    pub metadata: HashMap<String, serde_json::Value>,
}

impl<DB: DatabaseAdapter> HubContext<DB> {
    pub fn new(config: Arc<HubConfig>, database: Arc<DB>) -> ApiResult<Self> {
        let tokens = TokenManager::new(&config)?;
        let uploads = UploadStore::new(&config.uploads);
        let email_provider = config.email_provider.clone();
        Ok(Self {
            config,
            database,
            tokens,
            uploads,
            email_provider,
            metadata: HashMap::new(),
        })
    }

    pub fn set_metadata(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.metadata.insert(key.into(), value);
    }

    pub fn get_metadata(&self, key: &str) -> Option<&serde_json::Value> {
        self.metadata.get(key)
    }

    /// Get the email provider, returning an error if none is configured.
    pub fn email_provider(&self) -> ApiResult<&dyn EmailProvider> {
        self.email_provider
            .as_deref()
            .ok_or_else(|| ApiError::config("No email provider configured"))
    }

    /// Verified token claims for `req`.
    pub fn claims(&self, req: &ApiRequest) -> ApiResult<Claims> {
        self.tokens.authenticate(req)
    }

    /// The user behind the bearer token. A token for a user that no longer
    /// exists is treated as invalid.
    pub async fn require_user(&self, req: &ApiRequest) -> ApiResult<User> {
        let claims = self.claims(req)?;
        self.database
            .get_user_by_id(&claims.user_id)
            .await?
            .ok_or(ApiError::InvalidToken)
    }

    /// Append to the activity log. A failed write is logged, never surfaced:
    /// the action it describes has already been committed.
    pub async fn audit(&self, activity: CreateActivity) {
        let action = activity.action.clone();
        let entity = activity.entity_type.clone();
        if let Err(e) = self.database.log_activity(activity).await {
            self.config.logger.warn(&format!(
                "Failed to record {} activity on {}: {}",
                action, entity, e
            ));
        }
    }
}
