use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::config::SecurityConfig;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(user_id: Uuid, name: Option<String>, expiry_hours: u64) -> Self {
        let now = Utc::now();
        let exp = (now + Duration::hours(expiry_hours as i64)).timestamp();

        Self {
            sub: user_id,
            name,
            exp,
            iat: now.timestamp(),
        }
    }
}

/// Authenticated caller resolved from a bearer token
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub name: Option<String>,
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.sub,
            name: claims.name,
        }
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing Authorization header")]
    MissingHeader,

    #[error("Authorization header must use Bearer token format")]
    InvalidScheme,

    #[error("Empty bearer token")]
    EmptyToken,

    #[error("Invalid bearer token: {0}")]
    InvalidToken(String),

    #[error("JWT secret not configured")]
    SecretNotConfigured,

    #[error("JWT generation error: {0}")]
    TokenGeneration(String),
}

fn secret(security: &SecurityConfig) -> Result<&str, AuthError> {
    security
        .jwt_secret
        .as_deref()
        .filter(|s| !s.is_empty())
        .ok_or(AuthError::SecretNotConfigured)
}

/// Issue a signed token for a user. End-user token issuance lives outside this
/// service; this exists for the developer CLI and tests.
pub fn issue_token(security: &SecurityConfig, user_id: Uuid, name: Option<String>) -> Result<String, AuthError> {
    let secret = secret(security)?;
    let claims = Claims::new(user_id, name, security.jwt_expiry_hours);
    let encoding_key = EncodingKey::from_secret(secret.as_bytes());

    encode(&Header::default(), &claims, &encoding_key)
        .map_err(|e| AuthError::TokenGeneration(e.to_string()))
}

/// Extract the bearer token from an Authorization header value
pub fn bearer_token(header: Option<&str>) -> Result<&str, AuthError> {
    let auth_str = header.ok_or(AuthError::MissingHeader)?;
    let token = auth_str
        .strip_prefix("Bearer ")
        .ok_or(AuthError::InvalidScheme)?
        .trim();

    if token.is_empty() {
        return Err(AuthError::EmptyToken);
    }
    Ok(token)
}

/// Verify signature and expiry, returning the caller identity
pub fn verify_token(security: &SecurityConfig, token: &str) -> Result<AuthUser, AuthError> {
    let secret = secret(security)?;
    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    let validation = Validation::default();

    let token_data = decode::<Claims>(token, &decoding_key, &validation)
        .map_err(|e| AuthError::InvalidToken(e.to_string()))?;

    Ok(token_data.claims.into())
}
