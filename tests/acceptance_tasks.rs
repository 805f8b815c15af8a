use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use todo_api::application::auth_service::AuthServiceImpl;
use todo_api::application::category_service::CategoryServiceImpl;
use todo_api::application::task_service::TaskServiceImpl;
use todo_api::http::routes::{accounts, categories, tasks};
use todo_api::http::routing;
use todo_api::infrastructure::sqlite::SqliteStore;
use tower::ServiceExt;

#[tokio::test]
async fn acceptance_task_crud_flow() {
    let app = test_app().await;
    let (access, user_id) = login(&app, "apiuser", "apipass123").await;

    let res = request(
        &app,
        "POST",
        "/api/tasks",
        Some(&access),
        Some(json!({ "title": "New Task", "description": "New description" })),
    )
    .await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let task = json_body(res).await;
    assert_eq!(task["title"], "New Task");
    assert_eq!(task["user"], user_id);
    assert_eq!(task["completed"], false);
    assert_eq!(task["priority"], "medium");
    assert!(task.get("completed_at").is_none());
    let id = task["id"].as_i64().unwrap();

    let res = request(&app, "GET", &format!("/api/tasks/{id}"), Some(&access), None).await;
    assert_eq!(res.status(), StatusCode::OK);

    let res = request(
        &app,
        "PATCH",
        &format!("/api/tasks/{id}"),
        Some(&access),
        Some(json!({ "title": "Updated Title", "priority": "high" })),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);
    let task = json_body(res).await;
    assert_eq!(task["title"], "Updated Title");
    assert_eq!(task["priority"], "high");

    let res = request(&app, "DELETE", &format!("/api/tasks/{id}"), Some(&access), None).await;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let res = request(&app, "GET", &format!("/api/tasks/{id}"), Some(&access), None).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn acceptance_create_requires_authentication() {
    let app = test_app().await;
    let res =
        request(&app, "POST", "/api/tasks", None, Some(json!({ "title": "Should Fail" }))).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn acceptance_create_task_reports_field_errors() {
    let app = test_app().await;
    let (access, _) = login(&app, "apiuser", "apipass123").await;

    let res = request(
        &app,
        "POST",
        "/api/tasks",
        Some(&access),
        Some(json!({ "description": "Missing title" })),
    )
    .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body = json_body(res).await;
    assert_eq!(body["title"][0], "This field is required.");

    let res = request(
        &app,
        "POST",
        "/api/tasks",
        Some(&access),
        Some(json!({ "title": "Task", "description": "   " })),
    )
    .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body = json_body(res).await;
    assert_eq!(body["description"][0], "Description cannot be empty");
}

#[tokio::test]
async fn acceptance_toggle_complete_round_trip() {
    let app = test_app().await;
    let (access, _) = login(&app, "apiuser", "apipass123").await;
    let id = create_task(&app, &access, json!({ "title": "Existing Task" })).await;

    let res = request(
        &app,
        "POST",
        &format!("/api/tasks/{id}/toggle-complete"),
        Some(&access),
        None,
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);
    let body = json_body(res).await;
    assert_eq!(body["status"], "success");
    assert_eq!(body["completed"], true);
    assert_eq!(body["message"], "Task marked as completed");

    let res = request(&app, "GET", &format!("/api/tasks/{id}"), Some(&access), None).await;
    let task = json_body(res).await;
    assert_eq!(task["completed"], true);
    assert!(task["completed_at"].is_string());

    let res = request(
        &app,
        "POST",
        &format!("/api/tasks/{id}/toggle-complete"),
        Some(&access),
        None,
    )
    .await;
    let body = json_body(res).await;
    assert_eq!(body["completed"], false);
    assert_eq!(body["message"], "Task marked as pending");

    let res = request(&app, "GET", &format!("/api/tasks/{id}"), Some(&access), None).await;
    let task = json_body(res).await;
    assert_eq!(task["completed"], false);
    assert!(task.get("completed_at").is_none());
}

#[tokio::test]
async fn acceptance_other_users_tasks_yield_not_found() {
    let app = test_app().await;
    let (owner, _) = login(&app, "apiuser", "apipass123").await;
    let (stranger, _) = login(&app, "another", "pass12345").await;
    let id = create_task(&app, &owner, json!({ "title": "Existing Task" })).await;

    let path = format!("/api/tasks/{id}");
    for (method, target) in [
        ("GET", path.clone()),
        ("PATCH", path.clone()),
        ("DELETE", path.clone()),
        ("POST", format!("/api/tasks/{id}/toggle-complete")),
    ] {
        let body = (method == "PATCH").then(|| json!({ "title": "Hijacked" }));
        let res = request(&app, method, &target, Some(&stranger), body).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND, "{method} {target}");
        assert_eq!(json_body(res).await["detail"], "Not found.");
    }

    // Still intact for its owner.
    let res = request(&app, "GET", &path, Some(&owner), None).await;
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn acceptance_filter_and_search() {
    let app = test_app().await;
    let (access, _) = login(&app, "apiuser", "apipass123").await;

    let shopping = create_task(
        &app,
        &access,
        json!({ "title": "Shopping List", "description": "Groceries" }),
    )
    .await;
    create_task(&app, &access, json!({ "title": "Work Task", "description": "Complete report" }))
        .await;
    let res = request(
        &app,
        "POST",
        &format!("/api/tasks/{shopping}/toggle-complete"),
        Some(&access),
        None,
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);

    let res = request(&app, "GET", "/api/tasks?completed=True", Some(&access), None).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body = json_body(res).await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["results"][0]["completed"], true);

    let res = request(&app, "GET", "/api/tasks?search=shopping", Some(&access), None).await;
    let body = json_body(res).await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["results"][0]["title"], "Shopping List");

    // Search also hits descriptions, case-insensitively.
    let res = request(&app, "GET", "/api/tasks?search=GROCERIES", Some(&access), None).await;
    assert_eq!(json_body(res).await["count"], 1);

    let res = request(&app, "GET", "/api/tasks/my-tasks?search=Shopping", Some(&access), None).await;
    let body = json_body(res).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["title"], "Shopping List");

    // Unpaginated listing, newest first.
    let res = request(&app, "GET", "/api/tasks/my-tasks", Some(&access), None).await;
    let body = json_body(res).await;
    let titles: Vec<&str> =
        body.as_array().unwrap().iter().map(|t| t["title"].as_str().unwrap()).collect();
    assert_eq!(titles, ["Work Task", "Shopping List"]);
}

#[tokio::test]
async fn acceptance_pagination_envelope() {
    let app = test_app().await;
    let (access, _) = login(&app, "apiuser", "apipass123").await;
    for i in 0..12 {
        create_task(&app, &access, json!({ "title": format!("Task {i}") })).await;
    }

    let res = request(&app, "GET", "/api/tasks", Some(&access), None).await;
    let body = json_body(res).await;
    assert_eq!(body["count"], 12);
    assert_eq!(body["results"].as_array().unwrap().len(), 10);
    assert_eq!(body["next"], "/api/tasks?page=2");
    assert_eq!(body["previous"], Value::Null);

    let res = request(&app, "GET", "/api/tasks?page=2", Some(&access), None).await;
    let body = json_body(res).await;
    assert_eq!(body["results"].as_array().unwrap().len(), 2);
    assert_eq!(body["next"], Value::Null);
    assert_eq!(body["previous"], "/api/tasks");

    let res = request(&app, "GET", "/api/tasks?page_size=3", Some(&access), None).await;
    let body = json_body(res).await;
    assert_eq!(body["results"].as_array().unwrap().len(), 3);
    assert_eq!(body["next"], "/api/tasks?page_size=3&page=2");

    let res = request(&app, "GET", "/api/tasks?page=5", Some(&access), None).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(json_body(res).await["detail"], "Invalid page.");
}

#[tokio::test]
async fn acceptance_create_with_category_priority_and_due_date() {
    let app = test_app().await;
    let (access, _) = login(&app, "apiuser", "apipass123").await;

    let res = request(
        &app,
        "POST",
        "/api/categories",
        Some(&access),
        Some(json!({ "name": "Work" })),
    )
    .await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let category_id = json_body(res).await["id"].as_i64().unwrap();

    let res = request(
        &app,
        "POST",
        "/api/tasks",
        Some(&access),
        Some(json!({
            "title": "New Task",
            "description": "With category and due date",
            "category": category_id,
            "priority": "high",
            "due_date": "2023-12-31",
        })),
    )
    .await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let task = json_body(res).await;
    assert_eq!(task["category"], "Work");
    assert_eq!(task["priority"], "high");
    assert_eq!(task["due_date"], "2023-12-31");

    let res = request(
        &app,
        "POST",
        "/api/tasks",
        Some(&access),
        Some(json!({ "title": "Bad", "category": 999 })),
    )
    .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert!(json_body(res).await.get("category").is_some());
}

#[tokio::test]
async fn acceptance_update_validation_and_clearing() {
    let app = test_app().await;
    let (access, _) = login(&app, "apiuser", "apipass123").await;
    let id =
        create_task(&app, &access, json!({ "title": "Task", "due_date": "2024-06-01" })).await;

    let res = request(
        &app,
        "PATCH",
        &format!("/api/tasks/{id}"),
        Some(&access),
        Some(json!({ "title": "" })),
    )
    .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(res).await["title"][0], "This field may not be blank.");

    let res = request(
        &app,
        "PATCH",
        &format!("/api/tasks/{id}"),
        Some(&access),
        Some(json!({ "due_date": null })),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(json_body(res).await["due_date"], Value::Null);
}

// --- helpers ---

async fn test_app() -> Router {
    let store = SqliteStore::connect("sqlite::memory:").await.unwrap();
    store.init().await.unwrap();
    routing::app(
        accounts::router(accounts::AppState {
            service: AuthServiceImpl::new(store.clone(), store.clone()),
        }),
        tasks::router(tasks::AppState {
            service: TaskServiceImpl::new(store.clone(), store.clone()),
        }),
        categories::router(categories::AppState { service: CategoryServiceImpl::new(store) }),
    )
}

/// Registers the user and returns an access token plus the user id.
async fn login(app: &Router, username: &str, password: &str) -> (String, i64) {
    let res = request(
        app,
        "POST",
        "/api/accounts/register",
        None,
        Some(json!({ "username": username, "password": password })),
    )
    .await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let user_id = json_body(res).await["id"].as_i64().unwrap();

    let res = request(
        app,
        "POST",
        "/api/accounts/login",
        None,
        Some(json!({ "username": username, "password": password })),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);
    let access = json_body(res).await["access"].as_str().unwrap().to_string();
    (access, user_id)
}

async fn create_task(app: &Router, access: &str, body: Value) -> i64 {
    let res = request(app, "POST", "/api/tasks", Some(access), Some(body)).await;
    assert_eq!(res.status(), StatusCode::CREATED);
    json_body(res).await["id"].as_i64().unwrap()
}

async fn request(
    app: &Router,
    method: &str,
    path: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> hyper::Response<Body> {
    let mut builder =
        Request::builder().method(Method::from_bytes(method.as_bytes()).unwrap()).uri(path);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.clone().oneshot(request).await.unwrap()
}

async fn json_body(response: hyper::Response<Body>) -> Value {
    serde_json::from_slice(&to_bytes(response.into_body(), 1024 * 1024).await.unwrap()).unwrap()
}
