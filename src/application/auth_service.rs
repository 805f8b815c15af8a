use async_trait::async_trait;

use crate::auth::{self, TokenPair};
use crate::domain::repository::{TokenBlacklist, UserRepository};
use crate::domain::user::{NewUser, User, UserId};
use crate::error::{AppError, FieldErrors};

#[async_trait]
pub trait AuthService: Send + Sync + 'static {
    async fn register(&self, username: String, password: String) -> Result<User, AppError>;
    /// Every failure path returns the same 401 so usernames cannot be
    /// enumerated through the login endpoint.
    async fn login(
        &self,
        username: Option<String>,
        password: Option<String>,
    ) -> Result<TokenPair, AppError>;
    async fn logout(&self, refresh_token: &str) -> Result<(), AppError>;
    async fn refresh(&self, refresh_token: &str) -> Result<String, AppError>;
}

#[derive(Clone)]
pub struct AuthServiceImpl<U: UserRepository, B: TokenBlacklist> {
    users: U,
    blacklist: B,
}

impl<U: UserRepository, B: TokenBlacklist> AuthServiceImpl<U, B> {
    pub fn new(users: U, blacklist: B) -> Self { Self { users, blacklist } }
}

fn invalid_credentials() -> AppError {
    AppError::Auth("Invalid credentials".into())
}

#[async_trait]
impl<U: UserRepository, B: TokenBlacklist> AuthService for AuthServiceImpl<U, B> {
    async fn register(&self, username: String, password: String) -> Result<User, AppError> {
        if self.users.find_by_username(&username).await?.is_some() {
            return Err(AppError::Validation(FieldErrors::single(
                "username",
                "A user with that username already exists.",
            )));
        }
        let password_hash = auth::hash_password(&password)?;
        let user = self.users.create(NewUser { username, password_hash }).await?;
        tracing::info!(user_id = %user.id, username = %user.username, "user registered");
        Ok(user)
    }

    async fn login(
        &self,
        username: Option<String>,
        password: Option<String>,
    ) -> Result<TokenPair, AppError> {
        let (Some(username), Some(password)) = (username, password) else {
            return Err(invalid_credentials());
        };
        let Some(user) = self.users.find_by_username(&username).await? else {
            return Err(invalid_credentials());
        };
        if !auth::verify_password(&password, &user.password_hash) {
            return Err(invalid_credentials());
        }
        let pair = auth::issue_token_pair(user.id, &user.username)?;
        tracing::info!(user_id = %user.id, "user logged in");
        Ok(pair)
    }

    async fn logout(&self, refresh_token: &str) -> Result<(), AppError> {
        let Some(claims) = auth::decode_token(refresh_token, auth::TOKEN_TYPE_REFRESH) else {
            return Err(AppError::BadRequest("Invalid or expired token".into()));
        };
        if let Err(error) = self.blacklist.insert(&claims.jti).await {
            tracing::error!(error = ?error, "logout error");
            return Err(AppError::Server("Server error during logout".into()));
        }
        tracing::info!(user_id = claims.sub, "refresh token blacklisted");
        Ok(())
    }

    async fn refresh(&self, refresh_token: &str) -> Result<String, AppError> {
        let Some(claims) = auth::decode_token(refresh_token, auth::TOKEN_TYPE_REFRESH) else {
            return Err(AppError::Auth("Invalid or expired token".into()));
        };
        if self.blacklist.contains(&claims.jti).await? {
            return Err(AppError::Auth("Token is blacklisted".into()));
        }
        Ok(auth::issue_access_token(UserId(claims.sub), &claims.username)?)
    }
}
