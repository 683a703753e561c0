use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub use super::types_activity::{
    ActivityEntry, CreateActivity, DashboardCounts, DashboardStats, growth_percentage,
};
pub use super::types_event::{CreateEvent, Event, EventFilter, EventRegistration};
pub use super::types_project::{
    Citation, CreateCitation, CreateDataset, CreatePaper, CreateProject, Dataset, DatasetFilter,
    Paper, PaperFilter, PaperWithCitations, Project, ProjectFilter, UpdateProject, Visibility,
};
pub use super::types_team::{
    CreateTeam, CreateTeamInvitation, CreateTeamMember, InvitationStatus, NewInvitee, NewMember,
    Team, TeamInvitation, TeamMember, TeamRole, UpdateTeam,
};

/// Registered platform user.
///
/// The password hash never leaves the server: it is skipped when the user
/// is serialized.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "sqlx-postgres", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub role: String,
    pub institution: Option<String>,
    pub department: Option<String>,
    pub research_interests: Vec<String>,
    #[serde(rename = "avatar")]
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id.clone(),
            email: self.email.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            role: self.role.clone(),
        }
    }

    pub fn card(&self) -> UserCard {
        UserCard {
            id: self.id.clone(),
            name: self.full_name(),
            email: self.email.clone(),
            avatar: self.avatar_url.clone(),
        }
    }
}

/// Default role given to new accounts.
pub const DEFAULT_USER_ROLE: &str = "researcher";

/// User creation data. `email` is stored lowercased.
#[derive(Debug, Clone)]
pub struct CreateUser {
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub role: String,
    pub institution: Option<String>,
    pub department: Option<String>,
    pub research_interests: Vec<String>,
}

impl CreateUser {
    pub fn new(
        email: impl Into<String>,
        password_hash: impl Into<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
    ) -> Self {
        Self {
            email: email.into().trim().to_lowercase(),
            password_hash: password_hash.into(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            role: DEFAULT_USER_ROLE.to_string(),
            institution: None,
            department: None,
            research_interests: Vec::new(),
        }
    }

    pub fn with_institution(mut self, institution: Option<String>) -> Self {
        self.institution = institution;
        self
    }

    pub fn with_department(mut self, department: Option<String>) -> Self {
        self.department = department;
        self
    }

    pub fn with_research_interests(mut self, interests: Vec<String>) -> Self {
        self.research_interests = interests;
        self
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = role.into();
        self
    }
}

/// User update data
#[derive(Debug, Clone, Default)]
pub struct UpdateUser {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub institution: Option<String>,
    pub department: Option<String>,
    pub research_interests: Option<Vec<String>>,
    pub avatar_url: Option<String>,
}

/// `{id, email, firstName, lastName, role}` returned next to a fresh token.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: String,
}

/// Compact user reference embedded in teams, projects and events.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct UserCard {
    pub id: String,
    pub name: String,
    pub email: String,
    pub avatar: Option<String>,
}

/// HTTP method enumeration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Options,
    Head,
}

/// Framework-agnostic request.
///
/// `path` is relative to the configured base path, e.g. `/teams/42`.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: HttpMethod,
    pub path: String,
    pub headers: HashMap<String, String>,
    pub body: Option<Vec<u8>>,
    pub query: HashMap<String, String>,
}

/// Framework-agnostic response.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl ApiRequest {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: HashMap::new(),
            body: None,
            query: HashMap::new(),
        }
    }

    /// Construct a request from all public parts.
    pub fn from_parts(
        method: HttpMethod,
        path: String,
        headers: HashMap<String, String>,
        body: Option<Vec<u8>>,
        query: HashMap<String, String>,
    ) -> Self {
        Self {
            method,
            path,
            headers,
            body,
            query,
        }
    }

    pub fn method(&self) -> &HttpMethod {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Non-empty path segments, used for route matching.
    pub fn segments(&self) -> Vec<&str> {
        self.path.split('/').filter(|s| !s.is_empty()).collect()
    }

    /// Header lookup, case-insensitive on the name.
    pub fn header(&self, name: &str) -> Option<&String> {
        self.headers.get(name).or_else(|| {
            self.headers
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, v)| v)
        })
    }

    /// Query parameter, treating blank values as absent.
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// Token from an `Authorization: Bearer <token>` header.
    pub fn bearer_token(&self) -> Option<&str> {
        let value = self.header("authorization")?;
        let (scheme, token) = value.split_once(' ')?;
        if !scheme.eq_ignore_ascii_case("bearer") {
            return None;
        }
        let token = token.trim();
        (!token.is_empty()).then_some(token)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type").map(|s| s.as_str())
    }

    pub fn is_multipart(&self) -> bool {
        self.content_type()
            .is_some_and(|ct| ct.to_ascii_lowercase().starts_with("multipart/form-data"))
    }

    pub fn body_as_json<T: for<'de> Deserialize<'de>>(&self) -> Result<T, serde_json::Error> {
        match &self.body {
            Some(body) if !body.is_empty() => serde_json::from_slice(body),
            _ => serde_json::from_str("{}"),
        }
    }
}

impl ApiResponse {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: Vec::new(),
        }
    }

    pub fn json<T: Serialize>(status: u16, data: &T) -> Result<Self, serde_json::Error> {
        let body = serde_json::to_vec(data)?;
        let mut headers = HashMap::new();
        headers.insert("content-type".to_string(), "application/json".to_string());

        Ok(Self {
            status,
            headers,
            body,
        })
    }

    /// `{ "message": ... }` body with the given status.
    pub fn message(status: u16, message: impl Into<String>) -> Result<Self, serde_json::Error> {
        Self::json(
            status,
            &MessageResponse {
                message: message.into(),
            },
        )
    }

    pub fn text(status: u16, text: impl Into<String>) -> Self {
        let body = text.into().into_bytes();
        let mut headers = HashMap::new();
        headers.insert("content-type".to_string(), "text/plain".to_string());

        Self {
            status,
            headers,
            body,
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

/// Body `{ message }`.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Health-check response for `/health`.
#[derive(Debug, Serialize)]
pub struct HealthCheckResponse {
    pub status: &'static str,
    pub service: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_token_parsing() {
        let mut req = ApiRequest::new(HttpMethod::Get, "/auth/me");
        assert_eq!(req.bearer_token(), None);

        req.headers
            .insert("authorization".into(), "Bearer abc.def.ghi".into());
        assert_eq!(req.bearer_token(), Some("abc.def.ghi"));

        req.headers.insert("authorization".into(), "Basic abc".into());
        assert_eq!(req.bearer_token(), None);

        req.headers.insert("authorization".into(), "Bearer ".into());
        assert_eq!(req.bearer_token(), None);
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let mut req = ApiRequest::new(HttpMethod::Get, "/");
        req.headers
            .insert("Content-Type".into(), "multipart/form-data; boundary=x".into());
        assert!(req.is_multipart());
        assert_eq!(
            req.header("content-type").map(String::as_str),
            Some("multipart/form-data; boundary=x")
        );
    }

    #[test]
    fn test_segments_ignore_empty_parts() {
        let req = ApiRequest::new(HttpMethod::Get, "/teams//abc/members/");
        assert_eq!(req.segments(), vec!["teams", "abc", "members"]);
    }

    #[test]
    fn test_empty_body_parses_as_empty_object() {
        let mut req = ApiRequest::new(HttpMethod::Post, "/events");
        req.body = Some(Vec::new());
        let value: serde_json::Value = req.body_as_json().unwrap();
        assert!(value.as_object().unwrap().is_empty());
    }

    #[test]
    fn test_user_serialization_hides_password_hash() {
        let now = Utc::now();
        let user = User {
            id: "u1".into(),
            email: "ada@lab.org".into(),
            password_hash: "$argon2id$secret".into(),
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            role: DEFAULT_USER_ROLE.into(),
            institution: None,
            department: None,
            research_interests: vec!["analysis".into()],
            avatar_url: None,
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("passwordHash").is_none());
        assert_eq!(json["firstName"], "Ada");
        assert_eq!(json["researchInterests"][0], "analysis");
        assert_eq!(user.card().name, "Ada Lovelace");
    }
}
