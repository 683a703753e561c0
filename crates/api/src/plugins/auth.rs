use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use validator::Validate;

use research_hub_core::adapters::DatabaseAdapter;
use research_hub_core::password::{hash_password, validate_password, verify_password};
use research_hub_core::{ApiError, ApiResult, HubContext, HubPlugin, ApiRoute};
use research_hub_core::{ApiRequest, ApiResponse, CreateUser, HttpMethod, UpdateUser, UserSummary};

use super::helpers::non_blank;

/// Registration, login and profile endpoints under `/auth`.
pub struct AuthPlugin {
    config: AuthPluginConfig,
}

#[derive(Debug, Clone)]
pub struct AuthPluginConfig {
    pub enable_signup: bool,
}

impl Default for AuthPluginConfig {
    fn default() -> Self {
        Self {
            enable_signup: true,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct RegisterRequest {
    #[serde(default)]
    #[validate(email(message = "Please provide a valid email"))]
    email: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "Password is required"))]
    password: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "First name is required"))]
    first_name: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "Last name is required"))]
    last_name: String,
    institution: Option<String>,
    department: Option<String>,
    #[serde(default)]
    research_interests: Vec<String>,
}

#[derive(Debug, Deserialize, Validate)]
struct LoginRequest {
    #[serde(default)]
    #[validate(email(message = "Please provide a valid email"))]
    email: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "Password is required"))]
    password: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct UpdateProfileRequest {
    #[validate(length(min = 1, message = "First name cannot be empty"))]
    first_name: Option<String>,
    #[validate(length(min = 1, message = "Last name cannot be empty"))]
    last_name: Option<String>,
    institution: Option<String>,
    department: Option<String>,
    research_interests: Option<Vec<String>>,
    avatar: Option<String>,
}

#[derive(Debug, Serialize)]
struct TokenResponse {
    token: String,
    user: UserSummary,
}

impl AuthPlugin {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self {
            config: AuthPluginConfig::default(),
        }
    }

    pub fn with_config(config: AuthPluginConfig) -> Self {
        Self { config }
    }

    pub fn enable_signup(mut self, enable: bool) -> Self {
        self.config.enable_signup = enable;
        self
    }

    async fn handle_register<DB: DatabaseAdapter>(
        &self,
        req: &ApiRequest,
        ctx: &HubContext<DB>,
    ) -> ApiResult<ApiResponse> {
        if !self.config.enable_signup {
            return Err(ApiError::forbidden("User registration is not enabled"));
        }

        let body: RegisterRequest = match research_hub_core::validate_request_body(req) {
            Ok(v) => v,
            Err(resp) => return Ok(resp),
        };

        validate_password(&body.password, &ctx.config.password)?;

        if ctx
            .database
            .get_user_by_email(&body.email)
            .await?
            .is_some()
        {
            return Err(ApiError::bad_request("User already exists"));
        }

        let password_hash = hash_password(&body.password, &ctx.config.password.argon2_config)?;

        let interests: Vec<String> = body
            .research_interests
            .into_iter()
            .map(|i| i.trim().to_string())
            .filter(|i| !i.is_empty())
            .collect();
        let create = CreateUser::new(
            &body.email,
            password_hash,
            body.first_name.trim(),
            body.last_name.trim(),
        )
        .with_institution(non_blank(body.institution))
        .with_department(non_blank(body.department))
        .with_research_interests(interests);

        let user = ctx.database.create_user(create).await?;
        let token = ctx.tokens.issue(&user.id)?;

        tracing::info!(user_id = %user.id, "user registered");

        Ok(ApiResponse::json(
            201,
            &TokenResponse {
                token,
                user: user.summary(),
            },
        )?)
    }

    async fn handle_login<DB: DatabaseAdapter>(
        &self,
        req: &ApiRequest,
        ctx: &HubContext<DB>,
    ) -> ApiResult<ApiResponse> {
        let body: LoginRequest = match research_hub_core::validate_request_body(req) {
            Ok(v) => v,
            Err(resp) => return Ok(resp),
        };

        let user = ctx
            .database
            .get_user_by_email(&body.email)
            .await?
            .ok_or(ApiError::InvalidCredentials)?;

        verify_password(&body.password, &user.password_hash)?;

        let token = ctx.tokens.issue(&user.id)?;
        Ok(ApiResponse::json(
            200,
            &TokenResponse {
                token,
                user: user.summary(),
            },
        )?)
    }

    async fn handle_me<DB: DatabaseAdapter>(
        &self,
        req: &ApiRequest,
        ctx: &HubContext<DB>,
    ) -> ApiResult<ApiResponse> {
        let claims = ctx.claims(req)?;
        let user = ctx
            .database
            .get_user_by_id(&claims.user_id)
            .await?
            .ok_or(ApiError::UserNotFound)?;
        Ok(ApiResponse::json(200, &user)?)
    }

    async fn handle_update_me<DB: DatabaseAdapter>(
        &self,
        req: &ApiRequest,
        ctx: &HubContext<DB>,
    ) -> ApiResult<ApiResponse> {
        let claims = ctx.claims(req)?;
        let body: UpdateProfileRequest = match research_hub_core::validate_request_body(req) {
            Ok(v) => v,
            Err(resp) => return Ok(resp),
        };

        let update = UpdateUser {
            first_name: body.first_name.map(|s| s.trim().to_string()),
            last_name: body.last_name.map(|s| s.trim().to_string()),
            institution: body.institution,
            department: body.department,
            research_interests: body.research_interests,
            avatar_url: body.avatar,
        };
        let user = ctx.database.update_user(&claims.user_id, update).await?;
        Ok(ApiResponse::json(200, &user)?)
    }

    async fn handle_logout<DB: DatabaseAdapter>(
        &self,
        req: &ApiRequest,
        ctx: &HubContext<DB>,
    ) -> ApiResult<ApiResponse> {
        // Tokens are stateless; the client discards its copy.
        ctx.claims(req)?;
        Ok(ApiResponse::message(200, "Logged out successfully")?)
    }
}

#[async_trait]
impl<DB: DatabaseAdapter> HubPlugin<DB> for AuthPlugin {
    fn name(&self) -> &'static str {
        "auth"
    }

    fn routes(&self) -> Vec<ApiRoute> {
        let mut routes = vec![
            ApiRoute::post("/auth/login", "login"),
            ApiRoute::get("/auth/me", "get_me"),
            ApiRoute::put("/auth/me", "update_me"),
            ApiRoute::post("/auth/logout", "logout"),
        ];

        if self.config.enable_signup {
            routes.push(ApiRoute::post("/auth/register", "register"));
        }

        routes
    }

    async fn on_request(
        &self,
        req: &ApiRequest,
        ctx: &HubContext<DB>,
    ) -> ApiResult<Option<ApiResponse>> {
        match (req.method(), req.path()) {
            (HttpMethod::Post, "/auth/register") if self.config.enable_signup => {
                Ok(Some(self.handle_register(req, ctx).await?))
            }
            (HttpMethod::Post, "/auth/login") => Ok(Some(self.handle_login(req, ctx).await?)),
            (HttpMethod::Get, "/auth/me") => Ok(Some(self.handle_me(req, ctx).await?)),
            (HttpMethod::Put, "/auth/me") => Ok(Some(self.handle_update_me(req, ctx).await?)),
            (HttpMethod::Post, "/auth/logout") => Ok(Some(self.handle_logout(req, ctx).await?)),
            _ => Ok(None),
        }
    }
}
