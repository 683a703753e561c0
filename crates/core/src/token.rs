use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::config::{HubConfig, JwtConfig};
use crate::error::{ApiError, ApiResult};
use crate::types::ApiRequest;

/// Claims carried by an access token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    #[serde(rename = "userId")]
    pub user_id: String,
    pub iat: i64,
    pub exp: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,
}

/// Issues and verifies the stateless bearer tokens used by every
/// authenticated route.
#[derive(Clone)]
pub struct TokenManager {
    encoding: EncodingKey,
    decoding: DecodingKey,
    algorithm: Algorithm,
    jwt: JwtConfig,
}

impl std::fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenManager")
            .field("algorithm", &self.algorithm)
            .field("jwt", &self.jwt)
            .finish_non_exhaustive()
    }
}

impl TokenManager {
    pub fn new(config: &HubConfig) -> ApiResult<Self> {
        let algorithm = Algorithm::from_str(&config.jwt.algorithm)
            .map_err(|_| ApiError::config(format!("Unknown JWT algorithm {}", config.jwt.algorithm)))?;

        if !matches!(
            algorithm,
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512
        ) {
            return Err(ApiError::config(
                "Only HMAC JWT algorithms (HS256, HS384, HS512) are supported",
            ));
        }

        Ok(Self {
            encoding: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.secret.as_bytes()),
            algorithm,
            jwt: config.jwt.clone(),
        })
    }

    /// Sign a token for `user_id`, valid for `JwtConfig::expires_in`.
    pub fn issue(&self, user_id: &str) -> ApiResult<String> {
        let now = Utc::now();
        let claims = Claims {
            user_id: user_id.to_string(),
            iat: now.timestamp(),
            exp: (now + self.jwt.expires_in).timestamp(),
            iss: self.jwt.issuer.clone(),
            aud: self.jwt.audience.clone(),
        };

        Ok(encode(&Header::new(self.algorithm), &claims, &self.encoding)?)
    }

    /// Check signature, expiry and the optional issuer/audience.
    pub fn verify(&self, token: &str) -> ApiResult<Claims> {
        let mut validation = Validation::new(self.algorithm);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);
        match &self.jwt.issuer {
            Some(issuer) => validation.set_issuer(&[issuer]),
            None => validation.iss = None,
        }
        match &self.jwt.audience {
            Some(audience) => validation.set_audience(&[audience]),
            None => validation.validate_aud = false,
        }

        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "rejected access token");
                ApiError::InvalidToken
            })
    }

    /// Claims of the bearer token on `req`.
    pub fn authenticate(&self, req: &ApiRequest) -> ApiResult<Claims> {
        let token = req.bearer_token().ok_or(ApiError::MissingToken)?;
        self.verify(token)
    }
}
