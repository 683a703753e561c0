use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use research_hub_core::adapters::{MemoryDatabaseAdapter, UserOps};
use research_hub_core::{ApiRequest, CreateUser, HttpMethod, HubConfig, HubContext, User};

pub const TEST_SECRET: &str = "test-secret-key-that-is-at-least-32-chars-long";

pub fn test_config() -> HubConfig {
    HubConfig::new(TEST_SECRET).frontend_url("http://localhost:3000")
}

pub fn create_test_context() -> HubContext<MemoryDatabaseAdapter> {
    HubContext::new(
        Arc::new(test_config()),
        Arc::new(MemoryDatabaseAdapter::new()),
    )
    .expect("test context")
}

/// Context whose uploads land in `dir`.
pub fn create_test_context_in(dir: &Path) -> HubContext<MemoryDatabaseAdapter> {
    HubContext::new(
        Arc::new(test_config().upload_dir(dir)),
        Arc::new(MemoryDatabaseAdapter::new()),
    )
    .expect("test context")
}

/// Insert a user directly and mint a token for it.
pub async fn add_user(
    ctx: &HubContext<MemoryDatabaseAdapter>,
    email: &str,
    first_name: &str,
) -> (User, String) {
    let user = ctx
        .database
        .create_user(CreateUser::new(email, "unused-hash", first_name, "Tester"))
        .await
        .unwrap();
    let token = ctx.tokens.issue(&user.id).unwrap();
    (user, token)
}

pub async fn create_test_context_with_user(
    email: &str,
) -> (HubContext<MemoryDatabaseAdapter>, User, String) {
    let ctx = create_test_context();
    let (user, token) = add_user(&ctx, email, "Test").await;
    (ctx, user, token)
}

pub fn create_request(
    method: HttpMethod,
    path: &str,
    token: Option<&str>,
    body: Option<serde_json::Value>,
) -> ApiRequest {
    create_request_with_query(method, path, token, body, HashMap::new())
}

pub fn create_request_with_query(
    method: HttpMethod,
    path: &str,
    token: Option<&str>,
    body: Option<serde_json::Value>,
    query: HashMap<String, String>,
) -> ApiRequest {
    let mut headers = HashMap::new();
    if let Some(token) = token {
        headers.insert("authorization".to_string(), format!("Bearer {}", token));
    }
    if body.is_some() {
        headers.insert("content-type".to_string(), "application/json".to_string());
    }
    ApiRequest::from_parts(
        method,
        path.to_string(),
        headers,
        body.map(|b| b.to_string().into_bytes()),
        query,
    )
}

pub fn json_body(response: &research_hub_core::ApiResponse) -> serde_json::Value {
    serde_json::from_slice(&response.body).unwrap()
}
