use super::Middleware;
use crate::error::ApiResult;
use crate::types::{ApiRequest, ApiResponse};
use async_trait::async_trait;

/// Configuration for body size limit middleware.
#[derive(Debug, Clone)]
pub struct BodyLimitConfig {
    /// Maximum JSON body size in bytes. Defaults to 1 MB.
    pub max_bytes: usize,

    /// Maximum `multipart/form-data` body size in bytes. Defaults to
    /// 50 MiB plus room for the multipart framing.
    pub max_multipart_bytes: usize,

    /// Whether the middleware is enabled.
    pub enabled: bool,
}

/// Headroom allowed on top of the largest file for boundaries and text fields.
pub const MULTIPART_OVERHEAD: usize = 64 * 1024;

impl Default for BodyLimitConfig {
    fn default() -> Self {
        Self {
            max_bytes: 1_048_576, // 1 MB
            max_multipart_bytes: 50 * 1024 * 1024 + MULTIPART_OVERHEAD,
            enabled: true,
        }
    }
}

impl BodyLimitConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_bytes(mut self, max: usize) -> Self {
        self.max_bytes = max;
        self
    }

    /// Size multipart bodies for files up to `max_file_size`.
    pub fn for_uploads(mut self, max_file_size: usize) -> Self {
        self.max_multipart_bytes = max_file_size.saturating_add(MULTIPART_OVERHEAD);
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Most bytes worth buffering for any request before the middleware
    /// gets to look at it.
    pub fn read_limit(&self) -> usize {
        if self.enabled {
            self.max_bytes.max(self.max_multipart_bytes)
        } else {
            usize::MAX
        }
    }
}

/// Body size limit middleware.
///
/// Rejects requests whose body exceeds the configured maximum size. Upload
/// requests are measured against the multipart limit instead.
pub struct BodyLimitMiddleware {
    config: BodyLimitConfig,
}

impl BodyLimitMiddleware {
    pub fn new(config: BodyLimitConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Middleware for BodyLimitMiddleware {
    fn name(&self) -> &'static str {
        "body-limit"
    }

    async fn before_request(&self, req: &ApiRequest) -> ApiResult<Option<ApiResponse>> {
        if !self.config.enabled {
            return Ok(None);
        }

        let limit = if req.is_multipart() {
            self.config.max_multipart_bytes
        } else {
            self.config.max_bytes
        };

        if let Some(body) = &req.body
            && body.len() > limit
        {
            return Ok(Some(ApiResponse::json(
                413,
                &serde_json::json!({
                    "code": "BODY_TOO_LARGE",
                    "message": format!("Request body exceeds maximum size of {} bytes", limit),
                }),
            )?));
        }

        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::HttpMethod;
    use std::collections::HashMap;

    fn make_request_with_body(body_size: usize) -> ApiRequest {
        ApiRequest {
            method: HttpMethod::Post,
            path: "/projects".to_string(),
            headers: HashMap::new(),
            body: Some(vec![0u8; body_size]),
            query: HashMap::new(),
        }
    }

    #[tokio::test]
    async fn test_body_limit_allows_exact_limit() {
        let mw = BodyLimitMiddleware::new(BodyLimitConfig::new().max_bytes(1024));
        let req = make_request_with_body(1024);
        assert!(mw.before_request(&req).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_body_limit_rejects_over_limit() {
        let mw = BodyLimitMiddleware::new(BodyLimitConfig::new().max_bytes(1024));
        let req = make_request_with_body(2048);
        let resp = mw.before_request(&req).await.unwrap();
        assert_eq!(resp.unwrap().status, 413);
    }

    #[tokio::test]
    async fn test_multipart_uses_upload_limit() {
        let mw = BodyLimitMiddleware::new(
            BodyLimitConfig::new().max_bytes(1024).for_uploads(4096),
        );
        let mut req = make_request_with_body(4096);
        req.headers.insert(
            "content-type".into(),
            "multipart/form-data; boundary=abc".into(),
        );
        assert!(mw.before_request(&req).await.unwrap().is_none());

        req.body = Some(vec![0u8; 4096 + MULTIPART_OVERHEAD + 1]);
        assert!(mw.before_request(&req).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_body_limit_allows_no_body() {
        let mw = BodyLimitMiddleware::new(BodyLimitConfig::new().max_bytes(1024));
        let req = ApiRequest::new(HttpMethod::Get, "/teams");
        assert!(mw.before_request(&req).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_body_limit_disabled() {
        let config = BodyLimitConfig::new().max_bytes(10).enabled(false);
        let mw = BodyLimitMiddleware::new(config);
        let req = make_request_with_body(1000);
        assert!(mw.before_request(&req).await.unwrap().is_none());
    }

    #[test]
    fn test_read_limit_covers_both_limits() {
        let config = BodyLimitConfig::new().max_bytes(1024).for_uploads(4096);
        assert_eq!(config.read_limit(), 4096 + MULTIPART_OVERHEAD);

        let config = BodyLimitConfig::new().max_bytes(1 << 20).for_uploads(16);
        assert_eq!(config.read_limit(), 1 << 20);

        assert_eq!(config.enabled(false).read_limit(), usize::MAX);
    }
}
