use super::Middleware;
use crate::config::glob_match;
use crate::error::ApiResult;
use crate::types::{ApiRequest, ApiResponse, HttpMethod};
use async_trait::async_trait;

/// Configuration for CORS middleware.
#[derive(Debug, Clone)]
pub struct CorsConfig {
    /// Allowed origins. An empty list means no CORS headers are added.
    /// Entries may use `*` wildcards (`"https://*.example.org"`), and a
    /// bare `"*"` allows every origin.
    pub allowed_origins: Vec<String>,

    pub allowed_methods: Vec<String>,

    pub allowed_headers: Vec<String>,

    /// Headers exposed to the browser.
    pub exposed_headers: Vec<String>,

    /// Whether credentials (cookies, authorization) are allowed.
    pub allow_credentials: bool,

    /// Max age for preflight cache (seconds).
    pub max_age: u64,

    pub enabled: bool,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: Vec::new(),
            allowed_methods: vec![
                "GET".into(),
                "POST".into(),
                "PUT".into(),
                "DELETE".into(),
                "PATCH".into(),
                "OPTIONS".into(),
            ],
            allowed_headers: vec![
                "Content-Type".into(),
                "Authorization".into(),
                "X-Requested-With".into(),
            ],
            exposed_headers: Vec::new(),
            allow_credentials: true,
            max_age: 86400,
            enabled: true,
        }
    }
}

impl CorsConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allowed_origin(mut self, origin: impl Into<String>) -> Self {
        self.allowed_origins.push(origin.into());
        self
    }

    pub fn allow_credentials(mut self, allow: bool) -> Self {
        self.allow_credentials = allow;
        self
    }

    pub fn max_age(mut self, seconds: u64) -> Self {
        self.max_age = seconds;
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

/// CORS middleware.
///
/// Answers preflight OPTIONS requests and adds CORS headers to every
/// response for an allowed origin.
pub struct CorsMiddleware {
    config: CorsConfig,
}

impl CorsMiddleware {
    pub fn new(config: CorsConfig) -> Self {
        Self { config }
    }

    fn allowed_origin<'a>(&self, req: &'a ApiRequest) -> Option<&'a str> {
        if !self.config.enabled {
            return None;
        }
        let origin = req.header("origin")?;
        self.config
            .allowed_origins
            .iter()
            .any(|o| o == "*" || glob_match(o, origin))
            .then_some(origin.as_str())
    }

    fn cors_headers(&self, origin: &str) -> Vec<(String, String)> {
        let mut headers = Vec::new();

        // Credentials forbid the literal wildcard, so echo the origin instead.
        let allow_origin = if !self.config.allow_credentials
            && self.config.allowed_origins.iter().any(|o| o == "*")
        {
            "*".to_string()
        } else {
            origin.to_string()
        };

        headers.push(("Access-Control-Allow-Origin".into(), allow_origin));
        headers.push(("Vary".into(), "Origin".into()));

        if self.config.allow_credentials {
            headers.push(("Access-Control-Allow-Credentials".into(), "true".into()));
        }

        if !self.config.allowed_methods.is_empty() {
            headers.push((
                "Access-Control-Allow-Methods".into(),
                self.config.allowed_methods.join(", "),
            ));
        }

        if !self.config.allowed_headers.is_empty() {
            headers.push((
                "Access-Control-Allow-Headers".into(),
                self.config.allowed_headers.join(", "),
            ));
        }

        if !self.config.exposed_headers.is_empty() {
            headers.push((
                "Access-Control-Expose-Headers".into(),
                self.config.exposed_headers.join(", "),
            ));
        }

        headers.push((
            "Access-Control-Max-Age".into(),
            self.config.max_age.to_string(),
        ));

        headers
    }
}

#[async_trait]
impl Middleware for CorsMiddleware {
    fn name(&self) -> &'static str {
        "cors"
    }

    async fn before_request(&self, req: &ApiRequest) -> ApiResult<Option<ApiResponse>> {
        let Some(origin) = self.allowed_origin(req) else {
            return Ok(None);
        };

        if req.method == HttpMethod::Options {
            let mut response = ApiResponse::new(204);
            for (key, value) in self.cors_headers(origin) {
                response = response.with_header(key, value);
            }
            return Ok(Some(response));
        }

        Ok(None)
    }

    async fn after_request(
        &self,
        req: &ApiRequest,
        mut response: ApiResponse,
    ) -> ApiResult<ApiResponse> {
        if let Some(origin) = self.allowed_origin(req) {
            for (key, value) in self.cors_headers(origin) {
                response.headers.entry(key).or_insert(value);
            }
        }
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_request(method: HttpMethod, origin: Option<&str>) -> ApiRequest {
        let mut req = ApiRequest::new(method, "/projects");
        if let Some(origin) = origin {
            req.headers.insert("origin".to_string(), origin.to_string());
        }
        req
    }

    #[tokio::test]
    async fn test_cors_preflight_allowed() {
        let mw = CorsMiddleware::new(CorsConfig::new().allowed_origin("http://localhost:3000"));
        let req = make_request(HttpMethod::Options, Some("http://localhost:3000"));

        let resp = mw.before_request(&req).await.unwrap().unwrap();
        assert_eq!(resp.status, 204);
        assert_eq!(
            resp.headers.get("Access-Control-Allow-Origin").unwrap(),
            "http://localhost:3000"
        );
    }

    #[tokio::test]
    async fn test_cors_preflight_not_allowed() {
        let mw = CorsMiddleware::new(CorsConfig::new().allowed_origin("http://localhost:3000"));
        let req = make_request(HttpMethod::Options, Some("http://evil.example"));
        assert!(mw.before_request(&req).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_cors_wildcard_pattern() {
        let mw = CorsMiddleware::new(CorsConfig::new().allowed_origin("https://*.uni.edu"));
        let req = make_request(HttpMethod::Get, Some("https://physics.uni.edu"));

        let response = mw.after_request(&req, ApiResponse::new(200)).await.unwrap();
        assert_eq!(
            response.headers.get("Access-Control-Allow-Origin").unwrap(),
            "https://physics.uni.edu"
        );
        assert_eq!(
            response
                .headers
                .get("Access-Control-Allow-Credentials")
                .unwrap(),
            "true"
        );
    }

    #[tokio::test]
    async fn test_cors_no_origin_header() {
        let mw = CorsMiddleware::new(CorsConfig::new().allowed_origin("http://localhost:3000"));
        let req = make_request(HttpMethod::Get, None);

        assert!(mw.before_request(&req).await.unwrap().is_none());
        let response = mw.after_request(&req, ApiResponse::new(200)).await.unwrap();
        assert!(!response.headers.contains_key("Access-Control-Allow-Origin"));
    }

    #[tokio::test]
    async fn test_cors_any_origin_without_credentials() {
        let config = CorsConfig::new().allowed_origin("*").allow_credentials(false);
        let mw = CorsMiddleware::new(config);
        let req = make_request(HttpMethod::Get, Some("http://any-origin.example"));

        let response = mw.after_request(&req, ApiResponse::new(200)).await.unwrap();
        assert_eq!(
            response.headers.get("Access-Control-Allow-Origin").unwrap(),
            "*"
        );
    }
}
