use axum::extract::{Path, Query, State};
use axum::http::{StatusCode, Uri};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

use crate::application::task_service::TaskService;
use crate::auth::AuthUser;
use crate::domain::category::CategoryId;
use crate::domain::filter::TaskFilter;
use crate::domain::task::{CreateTask, Priority, Task, TaskId, UpdateTask};
use crate::error::{AppError, FieldErrors};
use crate::validation::ValidatedJson;

const DEFAULT_PAGE_SIZE: i64 = 10;
const MAX_PAGE_SIZE: i64 = 100;

const DATE_FORMAT: &str = "%Y-%m-%d";
const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Clone)]
pub struct AppState<S: TaskService> {
    pub service: S,
}

pub fn router<S: TaskService + Clone>(state: AppState<S>) -> Router {
    Router::new()
        .route("/api/tasks", get(list::<S>).post(create::<S>))
        .route("/api/tasks/my-tasks", get(my_tasks::<S>))
        .route("/api/tasks/:id", get(retrieve::<S>).patch(update::<S>).delete(destroy::<S>))
        .route("/api/tasks/:id/toggle-complete", post(toggle_complete::<S>))
        .with_state(state)
}

/// Raw query parameters; everything arrives as text and is parsed into a
/// `TaskFilter` so bad values become field errors instead of rejections.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub title: Option<String>,
    pub completed: Option<String>,
    pub created_at: Option<String>,
    pub completed_at: Option<String>,
    pub due_date: Option<String>,
    pub due_date_before: Option<String>,
    pub due_date_after: Option<String>,
    pub priority: Option<String>,
    pub category: Option<String>,
    pub search: Option<String>,
    pub page: Option<String>,
    pub page_size: Option<String>,
}

impl ListQuery {
    fn filter(&self) -> Result<TaskFilter, AppError> {
        Ok(TaskFilter {
            title: self.title.clone(),
            completed: self.completed.as_deref().map(parse_bool).transpose()?,
            created_at: parse_date_param("created_at", &self.created_at)?,
            completed_at: parse_date_param("completed_at", &self.completed_at)?,
            due_date: parse_date_param("due_date", &self.due_date)?,
            due_date_before: parse_date_param("due_date_before", &self.due_date_before)?,
            due_date_after: parse_date_param("due_date_after", &self.due_date_after)?,
            priority: self.priority.as_deref().map(parse_priority).transpose()?,
            category: self.category.clone(),
            search: self.search.clone(),
        })
    }
}

fn parse_bool(value: &str) -> Result<bool, AppError> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(AppError::Validation(FieldErrors::single(
            "completed",
            "Enter a valid boolean value.",
        ))),
    }
}

fn parse_date_param(field: &str, value: &Option<String>) -> Result<Option<NaiveDate>, AppError> {
    value
        .as_deref()
        .map(|raw| {
            NaiveDate::parse_from_str(raw, DATE_FORMAT).map_err(|_| {
                AppError::Validation(FieldErrors::single(field, "Enter a valid date."))
            })
        })
        .transpose()
}

fn parse_priority(value: &str) -> Result<Priority, AppError> {
    Priority::parse(value).ok_or_else(|| {
        AppError::Validation(FieldErrors::single(
            "priority",
            "Select a valid choice.",
        ))
    })
}

async fn list<S: TaskService>(
    user: AuthUser,
    State(state): State<AppState<S>>,
    uri: Uri,
    Query(query): Query<ListQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let filter = query.filter()?;
    let page = match query.page.as_deref() {
        None => 1,
        Some(raw) => raw.parse::<i64>().ok().filter(|p| *p >= 1).ok_or(AppError::InvalidPage)?,
    };
    // An unparseable page_size falls back to the default, the cap still holds.
    let page_size = query
        .page_size
        .as_deref()
        .and_then(|raw| raw.parse::<i64>().ok())
        .filter(|size| *size >= 1)
        .map(|size| size.min(MAX_PAGE_SIZE))
        .unwrap_or(DEFAULT_PAGE_SIZE);
    let offset = (page - 1) * page_size;

    let result = state.service.page(user.id, &filter, page_size, offset).await?;
    if page > 1 && offset >= result.count {
        return Err(AppError::InvalidPage);
    }

    let next = (offset + page_size < result.count).then(|| page_url(&uri, page + 1));
    let previous = (page > 1).then(|| page_url(&uri, page - 1));
    Ok(Json(json!({
        "count": result.count,
        "next": next,
        "previous": previous,
        "results": result.items.iter().map(task_json).collect::<Vec<_>>(),
    })))
}

async fn my_tasks<S: TaskService>(
    user: AuthUser,
    State(state): State<AppState<S>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let filter = query.filter()?;
    let tasks = state.service.list(user.id, &filter).await?;
    Ok(Json(serde_json::Value::Array(tasks.iter().map(task_json).collect())))
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateTaskRequest {
    #[validate(
        required(message = "This field is required."),
        length(min = 1, max = 200, message = "This field may not be blank.")
    )]
    pub title: Option<String>,
    pub description: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub priority: Option<Priority>,
    pub category: Option<i64>,
}

async fn create<S: TaskService>(
    user: AuthUser,
    State(state): State<AppState<S>>,
    ValidatedJson(body): ValidatedJson<CreateTaskRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    check_description(&body.description)?;
    let input = CreateTask {
        title: body.title.unwrap_or_default(),
        description: body.description,
        due_date: body.due_date,
        priority: body.priority,
        category: body.category.map(CategoryId),
    };
    let task = state.service.create(user.id, input).await?;
    Ok((StatusCode::CREATED, Json(task_json(&task))))
}

async fn retrieve<S: TaskService>(
    user: AuthUser,
    State(state): State<AppState<S>>,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, AppError> {
    let task = state.service.get(user.id, TaskId(id)).await?;
    Ok(Json(task_json(&task)))
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateTaskRequest {
    #[validate(length(min = 1, max = 200, message = "This field may not be blank."))]
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub due_date: Option<Option<NaiveDate>>,
    pub priority: Option<Priority>,
    #[serde(default, deserialize_with = "double_option")]
    pub category: Option<Option<i64>>,
}

/// Distinguishes an absent field from an explicit `null`.
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: serde::Deserialize<'de>,
    D: serde::Deserializer<'de>,
{
    serde::Deserialize::deserialize(deserializer).map(Some)
}

async fn update<S: TaskService>(
    user: AuthUser,
    State(state): State<AppState<S>>,
    Path(id): Path<i64>,
    ValidatedJson(body): ValidatedJson<UpdateTaskRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    check_description(&body.description)?;
    let input = UpdateTask {
        title: body.title,
        description: body.description,
        due_date: body.due_date,
        priority: body.priority,
        category: body.category.map(|c| c.map(CategoryId)),
    };
    let task = state.service.update(user.id, TaskId(id), input).await?;
    Ok(Json(task_json(&task)))
}

async fn destroy<S: TaskService>(
    user: AuthUser,
    State(state): State<AppState<S>>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    state.service.delete(user.id, TaskId(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn toggle_complete<S: TaskService>(
    user: AuthUser,
    State(state): State<AppState<S>>,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, AppError> {
    let task = state.service.toggle_complete(user.id, TaskId(id)).await?;
    let message =
        if task.completed { "Task marked as completed" } else { "Task marked as pending" };
    Ok(Json(json!({ "status": "success", "completed": task.completed, "message": message })))
}

fn check_description(description: &Option<String>) -> Result<(), AppError> {
    if description.as_deref().is_some_and(|d| d.trim().is_empty()) {
        return Err(AppError::Validation(FieldErrors::single(
            "description",
            "Description cannot be empty",
        )));
    }
    Ok(())
}

/// DRF-style representation: `completed_at` is present only when set, the
/// category appears as its name.
pub(crate) fn task_json(task: &Task) -> serde_json::Value {
    let mut body = json!({
        "id": task.id,
        "title": task.title,
        "description": task.description,
        "completed": task.completed,
        "created_at": task.created_at.format(DATETIME_FORMAT).to_string(),
        "user": task.user,
        "category": task.category.as_ref().map(|c| c.name.clone()),
        "priority": task.priority,
        "due_date": task.due_date.map(|d| d.format(DATE_FORMAT).to_string()),
    });
    if let Some(completed_at) = task.completed_at {
        body["completed_at"] = json!(completed_at.format(DATETIME_FORMAT).to_string());
    }
    body
}

fn page_url(uri: &Uri, page: i64) -> String {
    let mut params: Vec<String> = uri
        .query()
        .unwrap_or("")
        .split('&')
        .filter(|pair| !pair.is_empty() && !pair.starts_with("page="))
        .map(str::to_owned)
        .collect();
    if page > 1 {
        params.push(format!("page={page}"));
    }
    if params.is_empty() {
        uri.path().to_owned()
    } else {
        format!("{}?{}", uri.path(), params.join("&"))
    }
}
