//! Argon2-based password hashing, verification and strength rules.

use argon2::password_hash::{PasswordHash, SaltString, rand_core::OsRng};
use argon2::{Algorithm, Argon2, Params, PasswordHasher, PasswordVerifier, Version};

use crate::config::{Argon2Config, PasswordConfig};
use crate::error::{ApiError, ApiResult};

fn hasher(config: &Argon2Config) -> ApiResult<Argon2<'static>> {
    let params = Params::new(
        config.memory_cost,
        config.time_cost,
        config.parallelism,
        None,
    )
    .map_err(|e| ApiError::PasswordHash(format!("Invalid Argon2 parameters: {}", e)))?;

    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}

/// Hash a plaintext password with Argon2id using a random salt.
pub fn hash_password(password: &str, config: &Argon2Config) -> ApiResult<String> {
    let salt = SaltString::generate(&mut OsRng);

    let password_hash = hasher(config)?
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| ApiError::PasswordHash(format!("Failed to hash password: {}", e)))?;

    Ok(password_hash.to_string())
}

/// Verify a plaintext password against an Argon2 hash string.
///
/// The cost parameters are read back from the PHC string, so hashes made
/// with older settings keep verifying after the config changes.
pub fn verify_password(password: &str, hash: &str) -> ApiResult<()> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| ApiError::PasswordHash(format!("Invalid password hash: {}", e)))?;

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| ApiError::InvalidCredentials)?;

    Ok(())
}

/// Check `password` against the configured strength rules.
pub fn validate_password(password: &str, config: &PasswordConfig) -> ApiResult<()> {
    if password.chars().count() < config.min_length {
        return Err(ApiError::bad_request(format!(
            "Password must be at least {} characters long",
            config.min_length
        )));
    }

    if password.len() > config.max_length {
        return Err(ApiError::bad_request(format!(
            "Password must be at most {} characters long",
            config.max_length
        )));
    }

    if config.require_uppercase && !password.chars().any(|c| c.is_uppercase()) {
        return Err(ApiError::bad_request(
            "Password must contain at least one uppercase letter",
        ));
    }

    if config.require_lowercase && !password.chars().any(|c| c.is_lowercase()) {
        return Err(ApiError::bad_request(
            "Password must contain at least one lowercase letter",
        ));
    }

    if config.require_numbers && !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(ApiError::bad_request(
            "Password must contain at least one number",
        ));
    }

    if config.require_special
        && !password
            .chars()
            .any(|c| "!@#$%^&*()_+-=[]{}|;:,.<>?".contains(c))
    {
        return Err(ApiError::bad_request(
            "Password must contain at least one special character",
        ));
    }

    Ok(())
}
