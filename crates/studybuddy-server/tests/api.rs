//! End-to-end tests over the router with an in-memory task store.

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use studybuddy_core::{Config, TaskDb};
use studybuddy_server::{app, AppState};

fn test_app() -> Router {
    let db = TaskDb::open_memory().unwrap();
    app(AppState::with_db(Config::default(), db))
}

async fn send(router: Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };

    let response = router.oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

fn sample_task(title: &str) -> Value {
    json!({
        "title": title,
        "deadline": "2099-06-03T14:00:00Z",
        "priority": "high",
        "estimateMinutes": 90,
        "status": "todo",
    })
}

#[tokio::test]
async fn health_reports_missing_integrations() {
    let (status, body) = send(test_app(), Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["google"], false);
    assert_eq!(body["ai"], false);
}

#[tokio::test]
async fn task_crud_lifecycle() {
    let router = test_app();

    let (status, body) = send(
        router.clone(),
        Method::POST,
        "/api/tasks",
        Some(sample_task("Ôn tập Toán")),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    let id = body["task"]["id"].as_str().unwrap().to_string();
    assert_eq!(body["task"]["title"], "Ôn tập Toán");
    assert_eq!(body["task"]["priority"], "high");
    assert_eq!(body["task"]["estimateMinutes"], 90);

    let (status, body) = send(router.clone(), Method::GET, &format!("/api/tasks/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["task"]["id"], id.as_str());

    let (status, body) = send(
        router.clone(),
        Method::PUT,
        &format!("/api/tasks/{id}"),
        Some(json!({ "status": "done" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["task"]["status"], "done");

    let (status, body) = send(
        router.clone(),
        Method::DELETE,
        &format!("/api/tasks/{id}"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Task deleted");

    let (status, body) = send(router, Method::GET, &format!("/api/tasks/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Task not found");
}

#[tokio::test]
async fn blank_title_is_rejected() {
    let (status, body) = send(
        test_app(),
        Method::POST,
        "/api/tasks",
        Some(sample_task("   ")),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn list_filters_by_status() {
    let router = test_app();
    send(
        router.clone(),
        Method::POST,
        "/api/tasks",
        Some(sample_task("open")),
    )
    .await;
    let mut done = sample_task("finished");
    done["status"] = json!("done");
    send(router.clone(), Method::POST, "/api/tasks", Some(done)).await;

    let (status, body) = send(router.clone(), Method::GET, "/api/tasks?status=done", None).await;
    assert_eq!(status, StatusCode::OK);
    let tasks = body["tasks"].as_array().unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0]["title"], "finished");

    let (status, body) = send(router, Method::GET, "/api/tasks?status=nope", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn analytics_over_empty_store_is_all_zeros() {
    let (status, body) = send(test_app(), Method::GET, "/api/analytics", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["total"], 0);
    assert_eq!(body["completionRate"], 0);
    assert_eq!(body["averageCompletionTime"], 0);
    assert_eq!(body["weeklyData"].as_array().unwrap().len(), 7);
    assert_eq!(body["priorityStats"]["high"], 0);
}

#[tokio::test]
async fn analytics_counts_completions() {
    let router = test_app();
    let mut done = sample_task("finished");
    done["status"] = json!("done");
    send(router.clone(), Method::POST, "/api/tasks", Some(done)).await;
    send(
        router.clone(),
        Method::POST,
        "/api/tasks",
        Some(sample_task("open")),
    )
    .await;

    let (status, body) = send(router, Method::GET, "/api/analytics", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 2);
    assert_eq!(body["completed"], 1);
    assert_eq!(body["pending"], 1);
    assert_eq!(body["completionRate"], 50);
    assert_eq!(body["averageCompletionTime"], 90);
}

#[tokio::test]
async fn suggestion_requires_a_task_list() {
    let (status, body) = send(
        test_app(),
        Method::POST,
        "/api/ai/suggestion",
        Some(json!({ "tasks": [] })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Task list is required");
}

#[tokio::test]
async fn suggestion_without_api_key_is_unavailable() {
    let router = test_app();
    let (status, body) = send(
        router.clone(),
        Method::POST,
        "/api/tasks",
        Some(sample_task("seed")),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let task = body["task"].clone();

    let (status, body) = send(
        router,
        Method::POST,
        "/api/ai/suggestion",
        Some(json!({ "tasks": [task] })),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn calendar_status_starts_disconnected() {
    let (status, body) = send(test_app(), Method::GET, "/api/google-calendar/status", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["initialized"], false);
}

#[tokio::test]
async fn auth_url_without_credentials_is_unavailable() {
    let (status, body) = send(
        test_app(),
        Method::GET,
        "/api/google-calendar/auth-url",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn sync_without_connection_is_unavailable() {
    let mut config = Config::default();
    config.google.client_id = Some("id".into());
    config.google.client_secret = Some("secret".into());
    let router = app(AppState::with_db(config, TaskDb::open_memory().unwrap()));

    let (status, body) = send(router, Method::POST, "/api/google-calendar/sync", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(
        body["error"],
        "Google Calendar is not connected. Authorize first."
    );
}

#[tokio::test]
async fn auth_code_requires_a_code() {
    let mut config = Config::default();
    config.google.client_id = Some("id".into());
    config.google.client_secret = Some("secret".into());
    let router = app(AppState::with_db(config, TaskDb::open_memory().unwrap()));

    let (status, body) = send(
        router,
        Method::POST,
        "/api/google-calendar/auth-code",
        Some(json!({ "code": "" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Authorization code is required");
}

#[tokio::test]
async fn connected_sync_reconciles_remote_events() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock(
            "GET",
            mockito::Matcher::Regex(r"^/calendars/primary/events\?.*".into()),
        )
        .with_status(200)
        .with_body(
            r#"{"items":[{"id":"evt-1","summary":"Remote task","colorId":"5",
                "start":{"dateTime":"2099-06-03T14:00:00Z"},
                "end":{"dateTime":"2099-06-03T15:00:00Z"},
                "updated":"2025-06-02T10:00:00Z",
                "extendedProperties":{"private":{
                    "studybuddyTaskId":"remote-1","priority":"medium","status":"todo"}}}]}"#,
        )
        .create_async()
        .await;

    let mut config = Config::default();
    config.google.client_id = Some("id".into());
    config.google.client_secret = Some("secret".into());
    let state = AppState::with_db(config, TaskDb::open_memory().unwrap());

    // Wire in a connected session against the mock calendar API.
    {
        use studybuddy_core::calendar::{CalendarClient, CalendarSession, OAuthConfig, OAuthTokens};
        let oauth = OAuthConfig::google(&state.config.google).unwrap();
        let tokens = OAuthTokens {
            access_token: "at".to_string(),
            refresh_token: None,
            expires_at: Some(chrono::Utc::now().timestamp() + 3600),
            token_type: "Bearer".to_string(),
            scope: None,
        };
        let mut cal = state.calendar.lock().await;
        cal.client = CalendarClient::new("primary").with_base_url(server.url());
        cal.session = Some(CalendarSession::new(oauth, tokens));
    }

    let router = app(state.clone());
    let (status, body) = send(
        router.clone(),
        Method::POST,
        "/api/google-calendar/sync",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["stats"]["created"], 1);
    assert_eq!(body["stats"]["updated"], 0);

    let (status, body) = send(router, Method::GET, "/api/tasks/remote-1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["task"]["title"], "Remote task");
    assert_eq!(body["task"]["googleEventId"], "evt-1");
}
