use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

use crate::application::category_service::CategoryService;
use crate::auth::AuthUser;
use crate::domain::category::{CategoryId, CreateCategory};
use crate::error::AppError;
use crate::validation::ValidatedJson;

#[derive(Clone)]
pub struct AppState<C: CategoryService> {
    pub service: C,
}

pub fn router<C: CategoryService + Clone>(state: AppState<C>) -> Router {
    Router::new()
        .route("/api/categories", post(create::<C>))
        .route("/api/categories/all", get(list_all::<C>))
        .route("/api/categories/:id/delete", delete(destroy::<C>))
        .with_state(state)
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCategoryRequest {
    #[validate(
        required(message = "This field is required."),
        length(min = 1, max = 50, message = "This field may not be blank.")
    )]
    pub name: Option<String>,
}

async fn create<C: CategoryService>(
    _user: AuthUser,
    State(state): State<AppState<C>>,
    ValidatedJson(body): ValidatedJson<CreateCategoryRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    let category = state
        .service
        .create(CreateCategory { name: body.name.unwrap_or_default() })
        .await?;
    Ok((StatusCode::CREATED, Json(json!({ "id": category.id, "name": category.name }))))
}

async fn list_all<C: CategoryService>(
    _user: AuthUser,
    State(state): State<AppState<C>>,
) -> Result<Json<serde_json::Value>, AppError> {
    let categories = state.service.list_all().await?;
    Ok(Json(serde_json::to_value(categories).map_err(anyhow::Error::from)?))
}

async fn destroy<C: CategoryService>(
    _user: AuthUser,
    State(state): State<AppState<C>>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    state.service.delete(CategoryId(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
