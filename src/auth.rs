use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{async_trait, extract::FromRequestParts, http::request::Parts, RequestPartsExt};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::user::UserId;
use crate::error::AppError;

pub const TOKEN_TYPE_ACCESS: &str = "access";
pub const TOKEN_TYPE_REFRESH: &str = "refresh";

// --- Password handling (Argon2) ---

pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| anyhow::anyhow!("password hashing failed: {e}"))
}

pub fn verify_password(password: &str, password_hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(password_hash) else { return false };
    Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok()
}

// --- JWT handling ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,
    pub username: String,
    pub jti: String,
    pub token_type: String,
    pub iat: usize,
    pub exp: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

fn jwt_secret() -> String {
    std::env::var("JWT_SECRET").unwrap_or_else(|_| "insecure-dev-secret".into())
}

fn make_token(
    user_id: UserId,
    username: &str,
    token_type: &str,
    ttl: Duration,
) -> anyhow::Result<String> {
    let now = Utc::now();
    let expires = now
        .checked_add_signed(ttl)
        .ok_or_else(|| anyhow::anyhow!("token expiry out of range"))?;
    let claims = Claims {
        sub: user_id.0,
        username: username.to_owned(),
        jti: Uuid::new_v4().to_string(),
        token_type: token_type.to_owned(),
        iat: now.timestamp() as usize,
        exp: expires.timestamp() as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(jwt_secret().as_bytes()),
    )
    .map_err(|e| anyhow::anyhow!("token encoding failed: {e}"))
}

/// Short-lived access token for API requests plus a revocable refresh token.
pub fn issue_token_pair(user_id: UserId, username: &str) -> anyhow::Result<TokenPair> {
    Ok(TokenPair {
        access: issue_access_token(user_id, username)?,
        refresh: make_token(user_id, username, TOKEN_TYPE_REFRESH, Duration::days(1))?,
    })
}

pub fn issue_access_token(user_id: UserId, username: &str) -> anyhow::Result<String> {
    make_token(user_id, username, TOKEN_TYPE_ACCESS, Duration::minutes(15))
}

/// Verifies signature, expiry and token type. `None` on any mismatch; the
/// caller decides how the rejection is reported.
pub fn decode_token(token: &str, expected_type: &str) -> Option<Claims> {
    let decoded = decode::<Claims>(
        token,
        &DecodingKey::from_secret(jwt_secret().as_bytes()),
        &Validation::new(Algorithm::HS256),
    )
    .map_err(|e| tracing::debug!(error = %e, "token rejected"))
    .ok()?;
    (decoded.claims.token_type == expected_type).then_some(decoded.claims)
}

// --- Bearer-token extractor ---

pub struct AuthUser {
    pub id: UserId,
    pub username: String,
    /// Unix expiry of the presented access token.
    pub token_exp: usize,
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) = parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .map_err(|_| AppError::Auth("Authorization header missing".into()))?;

        let claims = decode_token(bearer.token(), TOKEN_TYPE_ACCESS)
            .ok_or_else(|| AppError::Auth("Invalid or expired token".into()))?;

        Ok(AuthUser {
            id: UserId(claims.sub),
            username: claims.username,
            token_exp: claims.exp,
        })
    }
}
