//! Shared harness for the integration tests.
//!
//! Provides:
//! - [`TestHarness`]: a [`ResearchHub`] over the in-memory adapter with
//!   request builders and account helpers.
//! - [`unique_email`]: counter-based addresses so tests never collide.
//! - [`CapturingEmailProvider`]: records outgoing invitation emails.

#![allow(dead_code)]

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use research_hub::adapters::MemoryDatabaseAdapter;
use research_hub::{
    ApiRequest, ApiResult, EmailProvider, HttpMethod, HubBuilder, HubConfig, ResearchHub,
};
use serde_json::Value;

pub const TEST_SECRET: &str = "test-secret-key-that-is-at-least-32-characters-long";
pub const FRONTEND: &str = "http://localhost:3000";
pub const BOUNDARY: &str = "integration-test-boundary";

static EMAIL_COUNTER: AtomicU64 = AtomicU64::new(0);

pub fn unique_email(prefix: &str) -> String {
    let n = EMAIL_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}_{n}@lab.test")
}

// ---------------------------------------------------------------------------
// Email capture
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct SentEmail {
    pub to: String,
    pub subject: String,
    pub text: String,
}

#[derive(Default, Clone)]
pub struct CapturingEmailProvider {
    sent: Arc<Mutex<Vec<SentEmail>>>,
}

impl CapturingEmailProvider {
    pub fn sent(&self) -> Vec<SentEmail> {
        self.sent.lock().unwrap().clone()
    }

    /// Token at the end of the last invitation link sent to `to`.
    pub fn invitation_token(&self, to: &str) -> Option<String> {
        self.sent()
            .iter()
            .rev()
            .find(|m| m.to == to)
            .and_then(|m| {
                m.text
                    .split_whitespace()
                    .find(|w| w.contains("/teams/join/"))
                    .and_then(|link| link.rsplit('/').next())
                    .map(str::to_string)
            })
    }
}

#[async_trait]
impl EmailProvider for CapturingEmailProvider {
    async fn send(&self, to: &str, subject: &str, _html: &str, text: &str) -> ApiResult<()> {
        self.sent.lock().unwrap().push(SentEmail {
            to: to.to_string(),
            subject: subject.to_string(),
            text: text.to_string(),
        });
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Request builders
// ---------------------------------------------------------------------------

pub fn request(method: HttpMethod, path: &str, token: Option<&str>) -> ApiRequest {
    let (path, query) = match path.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (path, None),
    };
    let mut req = ApiRequest::new(method, path);
    if let Some(query) = query {
        for pair in query.split('&') {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            req.query
                .insert(key.to_string(), value.replace('+', " ").to_string());
        }
    }
    if let Some(token) = token {
        req.headers
            .insert("authorization".to_string(), format!("Bearer {}", token));
    }
    req
}

pub fn json_request(method: HttpMethod, path: &str, token: Option<&str>, body: Value) -> ApiRequest {
    let mut req = request(method, path, token);
    req.body = Some(body.to_string().into_bytes());
    req.headers
        .insert("content-type".to_string(), "application/json".to_string());
    req
}

/// `multipart/form-data` request; parts are `(field, file name, bytes)`.
pub fn multipart_request(
    path: &str,
    token: &str,
    parts: &[(&str, Option<&str>, &[u8])],
) -> ApiRequest {
    let mut body = Vec::new();
    for (name, file_name, data) in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        let disposition = match file_name {
            Some(f) => format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n\
                 Content-Type: application/octet-stream\r\n\r\n",
                name, f
            ),
            None => format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name),
        };
        body.extend_from_slice(disposition.as_bytes());
        body.extend_from_slice(data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

    let mut req = request(HttpMethod::Post, path, Some(token));
    req.headers.insert(
        "content-type".to_string(),
        format!("multipart/form-data; boundary={}", BOUNDARY),
    );
    req.body = Some(body);
    req
}

// ---------------------------------------------------------------------------
// TestHarness
// ---------------------------------------------------------------------------

pub struct Account {
    pub id: String,
    pub email: String,
    pub token: String,
}

pub struct TestHarness {
    hub: Arc<ResearchHub<MemoryDatabaseAdapter>>,
    pub emails: CapturingEmailProvider,
    uploads: tempfile::TempDir,
}

impl TestHarness {
    pub async fn new() -> Self {
        Self::with_config(|config| config).await
    }

    /// Harness whose config is adjusted by `configure` before building.
    pub async fn with_config(configure: impl FnOnce(HubConfig) -> HubConfig) -> Self {
        let uploads = tempfile::tempdir().expect("upload dir");
        let emails = CapturingEmailProvider::default();
        let config = HubConfig::new(TEST_SECRET)
            .frontend_url(FRONTEND)
            .upload_dir(uploads.path())
            .email_provider(Arc::new(emails.clone()));
        let hub = HubBuilder::new(configure(config))
            .database(MemoryDatabaseAdapter::new())
            .default_plugins()
            .build()
            .await
            .expect("Failed to build test hub");
        Self {
            hub: Arc::new(hub),
            emails,
            uploads,
        }
    }

    pub fn hub(&self) -> &ResearchHub<MemoryDatabaseAdapter> {
        &self.hub
    }

    pub fn arc(&self) -> Arc<ResearchHub<MemoryDatabaseAdapter>> {
        self.hub.clone()
    }

    pub fn upload_root(&self) -> &std::path::Path {
        self.uploads.path()
    }

    /// Send a request and return `(status, parsed_json_body)`.
    pub async fn send(&self, req: ApiRequest) -> (u16, Value) {
        let resp = self
            .hub
            .handle_request(req)
            .await
            .expect("Request should not fail");
        let json = serde_json::from_slice(&resp.body).unwrap_or(Value::Null);
        (resp.status, json)
    }

    pub async fn get(&self, path: &str, token: &str) -> (u16, Value) {
        self.send(request(HttpMethod::Get, path, Some(token))).await
    }

    pub async fn post(&self, path: &str, token: &str, body: Value) -> (u16, Value) {
        self.send(json_request(HttpMethod::Post, path, Some(token), body))
            .await
    }

    pub async fn put(&self, path: &str, token: &str, body: Value) -> (u16, Value) {
        self.send(json_request(HttpMethod::Put, path, Some(token), body))
            .await
    }

    pub async fn delete(&self, path: &str, token: &str) -> (u16, Value) {
        self.send(request(HttpMethod::Delete, path, Some(token)))
            .await
    }

    /// Register through `/auth/register` and return the new account.
    pub async fn signup(&self, first_name: &str) -> Account {
        let email = unique_email(&first_name.to_lowercase());
        let (status, json) = self
            .send(json_request(
                HttpMethod::Post,
                "/auth/register",
                None,
                serde_json::json!({
                    "email": email,
                    "password": "password123",
                    "firstName": first_name,
                    "lastName": "Tester",
                    "institution": "Test Institute"
                }),
            ))
            .await;
        assert_eq!(status, 201, "signup failed: {}", json);
        Account {
            id: json["user"]["id"].as_str().expect("user id").to_string(),
            email,
            token: json["token"].as_str().expect("token").to_string(),
        }
    }

    /// Create a team led by `leader` and return its id.
    pub async fn create_team(&self, leader: &Account, name: &str, body: Value) -> String {
        let mut payload = body;
        payload["name"] = Value::String(name.to_string());
        let (status, json) = self.post("/teams", &leader.token, payload).await;
        assert_eq!(status, 201, "team creation failed: {}", json);
        json["id"].as_str().expect("team id").to_string()
    }

    /// Create a project owned by `owner` and return its id.
    pub async fn create_project(&self, owner: &Account, body: Value) -> String {
        let (status, json) = self.post("/projects", &owner.token, body).await;
        assert_eq!(status, 201, "project creation failed: {}", json);
        json["id"].as_str().expect("project id").to_string()
    }
}
