use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

use crate::application::auth_service::AuthService;
use crate::auth::AuthUser;
use crate::error::{AppError, FieldErrors};
use crate::validation::ValidatedJson;

#[derive(Clone)]
pub struct AppState<A: AuthService> {
    pub service: A,
}

pub fn router<A: AuthService + Clone>(state: AppState<A>) -> Router {
    Router::new()
        .route("/api/accounts/register", post(register::<A>))
        .route("/api/accounts/login", post(login::<A>))
        .route("/api/accounts/check-auth", get(check_auth))
        .route("/api/accounts/logout", post(logout::<A>))
        .route("/api/accounts/token/refresh", post(refresh::<A>))
        .with_state(state)
}

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(
        required(message = "This field is required."),
        length(min = 1, message = "This field may not be blank.")
    )]
    pub username: Option<String>,
    #[validate(
        required(message = "This field is required."),
        length(min = 1, message = "This field may not be blank.")
    )]
    pub password: Option<String>,
}

async fn register<A: AuthService>(
    State(state): State<AppState<A>>,
    ValidatedJson(body): ValidatedJson<RegisterRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    let user = state
        .service
        .register(body.username.unwrap_or_default(), body.password.unwrap_or_default())
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "id": user.id,
            "username": user.username,
            "message": "User created successfully",
        })),
    ))
}

/// Both fields are optional at the parsing layer so that a missing field
/// takes the same uniform 401 path as a wrong password.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

async fn login<A: AuthService>(
    State(state): State<AppState<A>>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let pair = state.service.login(body.username, body.password).await?;
    Ok(Json(json!({ "access": pair.access, "refresh": pair.refresh })))
}

async fn check_auth(user: AuthUser) -> Json<serde_json::Value> {
    Json(json!({
        "authenticated": true,
        "user_id": user.id,
        "username": user.username,
        "token_expires": user.token_exp,
    }))
}

#[derive(Debug, Deserialize)]
pub struct LogoutRequest {
    pub refresh_token: Option<String>,
}

async fn logout<A: AuthService>(
    _user: AuthUser,
    State(state): State<AppState<A>>,
    Json(body): Json<LogoutRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    // An empty string counts as missing.
    let refresh_token = body.refresh_token.unwrap_or_default();
    if refresh_token.is_empty() {
        return Err(AppError::BadRequest("Refresh token is required".into()));
    }
    state.service.logout(&refresh_token).await?;
    Ok(Json(json!({ "detail": "Logout successful" })))
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh: Option<String>,
}

async fn refresh<A: AuthService>(
    State(state): State<AppState<A>>,
    Json(body): Json<RefreshRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let Some(token) = body.refresh.filter(|t| !t.is_empty()) else {
        return Err(AppError::Validation(FieldErrors::single(
            "refresh",
            "This field is required.",
        )));
    };
    let access = state.service.refresh(&token).await?;
    Ok(Json(json!({ "access": access })))
}
