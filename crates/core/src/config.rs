use crate::email::EmailProvider;
use crate::error::ApiError;
use crate::logger::{Logger, TracingLogger};
use chrono::Duration;
use std::path::PathBuf;
use std::sync::Arc;

/// Main configuration for the platform.
#[derive(Clone)]
pub struct HubConfig {
    /// Secret key used to sign access tokens.
    pub secret: String,

    /// Application name, used in email subjects and the health check.
    ///
    /// Defaults to `"Research Hub"`.
    pub app_name: String,

    /// Public URL of this API (e.g. `"https://api.example.org"`).
    pub base_url: String,

    /// Path where the API routes are mounted.
    ///
    /// Every plugin route is relative to this prefix, so with the default
    /// `"/api"` the team listing lives at `"/api/teams"`.
    pub base_path: String,

    /// URL of the web frontend. Used for invitation links and as the
    /// default CORS origin.
    pub frontend_url: String,

    /// Logger implementation for platform events.
    ///
    /// Defaults to a [`TracingLogger`](crate::logger::TracingLogger).
    pub logger: Arc<dyn Logger>,

    /// Access token configuration
    pub jwt: JwtConfig,

    /// Password configuration
    pub password: PasswordConfig,

    /// File upload configuration
    pub uploads: UploadConfig,

    /// Email provider used for team invitations.
    pub email_provider: Option<Arc<dyn EmailProvider>>,
}

/// JWT configuration
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// JWT expiration duration
    pub expires_in: Duration,

    /// JWT algorithm. Only the HMAC family is supported.
    pub algorithm: String,

    /// Issuer claim
    pub issuer: Option<String>,

    /// Audience claim
    pub audience: Option<String>,
}

/// Password hashing configuration
#[derive(Debug, Clone)]
pub struct PasswordConfig {
    /// Minimum password length
    pub min_length: usize,

    /// Maximum password length in bytes
    pub max_length: usize,

    /// Require uppercase letters
    pub require_uppercase: bool,

    /// Require lowercase letters
    pub require_lowercase: bool,

    /// Require numbers
    pub require_numbers: bool,

    /// Require special characters
    pub require_special: bool,

    /// Argon2 configuration
    pub argon2_config: Argon2Config,
}

/// Argon2 hashing configuration
#[derive(Debug, Clone)]
pub struct Argon2Config {
    pub memory_cost: u32,
    pub time_cost: u32,
    pub parallelism: u32,
}

/// Where uploaded papers and datasets are written, and how large they may be.
#[derive(Debug, Clone)]
pub struct UploadConfig {
    /// Root directory; papers and datasets get their own subdirectory.
    pub upload_dir: PathBuf,

    /// URL prefix the upload directory is served under.
    pub public_path: String,

    /// Largest accepted file, in bytes. Defaults to 50 MiB.
    pub max_file_size: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            app_name: "Research Hub".to_string(),
            base_url: "http://localhost:5000".to_string(),
            base_path: "/api".to_string(),
            frontend_url: "http://localhost:3000".to_string(),
            logger: Arc::new(TracingLogger),
            jwt: JwtConfig::default(),
            password: PasswordConfig::default(),
            uploads: UploadConfig::default(),
            email_provider: None,
        }
    }
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            expires_in: Duration::hours(24), // 1 day
            algorithm: "HS256".to_string(),
            issuer: None,
            audience: None,
        }
    }
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            min_length: 8,
            max_length: 128,
            require_uppercase: false,
            require_lowercase: false,
            require_numbers: false,
            require_special: false,
            argon2_config: Argon2Config::default(),
        }
    }
}

impl Default for Argon2Config {
    fn default() -> Self {
        Self {
            memory_cost: 4096, // 4MB
            time_cost: 3,      // 3 iterations
            parallelism: 1,    // 1 thread
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            upload_dir: PathBuf::from("uploads"),
            public_path: "/uploads".to_string(),
            max_file_size: 50 * 1024 * 1024,
        }
    }
}

impl HubConfig {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            ..Default::default()
        }
    }

    /// Set the application name.
    pub fn app_name(mut self, name: impl Into<String>) -> Self {
        self.app_name = name.into();
        self
    }

    /// Set the base URL (e.g. `"https://api.example.org"`).
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the base path where API routes are mounted.
    pub fn base_path(mut self, path: impl Into<String>) -> Self {
        self.base_path = path.into();
        self
    }

    /// Set the frontend URL used for invitation links and CORS.
    pub fn frontend_url(mut self, url: impl Into<String>) -> Self {
        self.frontend_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set a custom logger implementation.
    pub fn logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = logger;
        self
    }

    /// Set the JWT expiration duration.
    pub fn jwt_expires_in(mut self, duration: Duration) -> Self {
        self.jwt.expires_in = duration;
        self
    }

    /// Set the JWT issuer claim; tokens from other issuers are rejected.
    pub fn jwt_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.jwt.issuer = Some(issuer.into());
        self
    }

    /// Set the minimum password length.
    pub fn password_min_length(mut self, length: usize) -> Self {
        self.password.min_length = length;
        self
    }

    /// Set the directory uploaded files are written to.
    pub fn upload_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.uploads.upload_dir = dir.into();
        self
    }

    /// Set the largest accepted upload, in bytes.
    pub fn max_file_size(mut self, bytes: usize) -> Self {
        self.uploads.max_file_size = bytes;
        self
    }

    /// Set the provider used to deliver invitation emails.
    pub fn email_provider(mut self, provider: Arc<dyn EmailProvider>) -> Self {
        self.email_provider = Some(provider);
        self
    }

    /// Absolute link a new member follows to accept `token`.
    pub fn invitation_link(&self, token: &str) -> String {
        format!("{}/teams/join/{}", self.frontend_url, token)
    }

    pub fn validate(&self) -> Result<(), ApiError> {
        if self.secret.is_empty() {
            return Err(ApiError::config("Secret key cannot be empty"));
        }

        if self.secret.len() < 32 {
            return Err(ApiError::config(
                "Secret key must be at least 32 characters",
            ));
        }

        if !self.base_path.starts_with('/') {
            return Err(ApiError::config("Base path must start with '/'"));
        }

        if self.uploads.max_file_size == 0 {
            return Err(ApiError::config("Maximum file size must be positive"));
        }

        Ok(())
    }
}

/// Simple glob-pattern matching for origin strings.
///
/// Supports `*` as a wildcard. For example, `"https://*.example.com"`
/// matches `"https://app.example.com"`.
pub fn glob_match(pattern: &str, value: &str) -> bool {
    if !pattern.contains('*') {
        return pattern == value;
    }

    let parts: Vec<&str> = pattern.split('*').collect();

    // The value must start with the first part and end with the last part
    let first = parts[0];
    let last = parts[parts.len() - 1];

    if !value.starts_with(first) || !value.ends_with(last) {
        return false;
    }

    let mut pos = 0;
    for part in &parts {
        if part.is_empty() {
            continue;
        }
        match value[pos..].find(part) {
            Some(idx) => pos += idx + part.len(),
            None => return false,
        }
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-key-that-is-at-least-32-characters-long";

    #[test]
    fn test_validate_rejects_short_secret() {
        assert!(HubConfig::new("short").validate().is_err());
        assert!(HubConfig::new("").validate().is_err());
        assert!(HubConfig::new(SECRET).validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_relative_base_path() {
        let config = HubConfig::new(SECRET).base_path("api");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invitation_link_uses_frontend_url() {
        let config = HubConfig::new(SECRET).frontend_url("https://hub.example.org/");
        assert_eq!(
            config.invitation_link("abc123"),
            "https://hub.example.org/teams/join/abc123"
        );
    }

    #[test]
    fn test_defaults() {
        let config = HubConfig::new(SECRET);
        assert_eq!(config.base_path, "/api");
        assert_eq!(config.jwt.expires_in, Duration::hours(24));
        assert_eq!(config.uploads.max_file_size, 52_428_800);
        assert_eq!(config.password.min_length, 8);
    }

    #[test]
    fn test_glob_match() {
        assert!(glob_match("https://*.example.com", "https://app.example.com"));
        assert!(!glob_match("https://*.example.com", "https://example.org"));
        assert!(glob_match("http://localhost:3000", "http://localhost:3000"));
        assert!(!glob_match("http://localhost:3000", "http://localhost:3001"));
    }
}
