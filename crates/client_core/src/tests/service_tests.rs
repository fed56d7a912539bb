use super::*;
use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, put},
    Json, Router,
};
use serde_json::{json, Value};
use shared::{
    domain::Priority,
    protocol::{SortKey, SortOrder},
};
use tokio::{net::TcpListener, sync::Mutex};

#[derive(Clone, Default)]
struct Recorded {
    queries: Arc<Mutex<Vec<HashMap<String, String>>>>,
    auth: Arc<Mutex<Vec<Option<String>>>>,
    bodies: Arc<Mutex<Vec<Value>>>,
    deleted: Arc<Mutex<Vec<String>>>,
}

fn todo_body(id: &str, title: &str) -> Value {
    json!({
        "_id": id,
        "title": title,
        "description": "",
        "priority": "high",
        "tags": ["ops"],
        "mentions": [{ "_id": "u1", "username": "alice", "name": "Alice" }, "u2"],
        "completed": false,
        "createdAt": "2024-05-01T08:00:00Z",
        "updatedAt": "2024-05-01T08:00:00Z",
        "notes": []
    })
}

async fn list_todos(
    State(rec): State<Recorded>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Json<Value> {
    rec.queries.lock().await.push(query);
    rec.auth.lock().await.push(
        headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
    );
    Json(json!({
        "data": [todo_body("t1", "first"), todo_body("t2", "second")],
        "pagination": { "page": 1, "limit": 10, "totalPages": 1 }
    }))
}

async fn create_todo(State(rec): State<Recorded>, Json(body): Json<Value>) -> Json<Value> {
    let title = body["title"].as_str().unwrap_or_default().to_string();
    rec.bodies.lock().await.push(body);
    Json(json!({ "data": todo_body("t9", &title) }))
}

async fn stats() -> Json<Value> {
    Json(json!({
        "data": {
            "totalTodos": 2,
            "completedTodos": 1,
            "pendingTodos": 1,
            "highPriority": 2,
            "mediumPriority": 0,
            "lowPriority": 0
        }
    }))
}

async fn update_todo(
    State(rec): State<Recorded>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    if id == "bad" {
        return Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "message": "title is required" })),
        ));
    }
    rec.bodies.lock().await.push(body);
    Ok(Json(json!({ "data": todo_body(&id, "updated") })))
}

async fn delete_todo(State(rec): State<Recorded>, Path(id): Path<String>) -> StatusCode {
    if id == "missing" {
        return StatusCode::NOT_FOUND;
    }
    rec.deleted.lock().await.push(id);
    StatusCode::OK
}

async fn users() -> Json<Value> {
    Json(json!({
        "data": [
            { "_id": "u1", "username": "alice", "name": "Alice" },
            { "_id": "u2", "username": "bob", "name": "Bob" }
        ]
    }))
}

async fn spawn_todo_server() -> anyhow::Result<(String, Recorded)> {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let rec = Recorded::default();
    let app = Router::new()
        .route("/api/todos", get(list_todos).post(create_todo))
        .route("/api/todos/stats", get(stats))
        .route("/api/todos/:id", put(update_todo).delete(delete_todo))
        .route("/api/users", get(users))
        .with_state(rec.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok((format!("http://{addr}/api/"), rec))
}

fn service_for(url: String, token: Option<&str>) -> HttpTodoService {
    let settings = Settings {
        api_url: url,
        api_token: token.map(str::to_string),
        ..Settings::default()
    };
    HttpTodoService::new(&settings).expect("client")
}

#[tokio::test]
async fn list_sends_only_set_filters_and_bearer_token() {
    let (url, rec) = spawn_todo_server().await.expect("spawn server");
    let service = service_for(url, Some("tok-123"));
    assert!(!service.base_url().ends_with('/'));

    let query = ListTodosQuery {
        page: 2,
        limit: 10,
        sort_by: SortKey::CreatedAt,
        sort_order: SortOrder::Asc,
        priority: Some(Priority::High),
        tag: None,
        mention: Some("alice".into()),
        completed: Some(false),
        search: None,
    };
    let page = service.list_todos(&query).await.expect("list");

    assert_eq!(page.items.len(), 2);
    assert_eq!(page.info.total_pages, 1);
    assert_eq!(page.items[0].mentions[1].username, "u2");

    let queries = rec.queries.lock().await;
    let sent = &queries[0];
    assert_eq!(sent.get("page").map(String::as_str), Some("2"));
    assert_eq!(sent.get("sortBy").map(String::as_str), Some("createdAt"));
    assert_eq!(sent.get("sortOrder").map(String::as_str), Some("asc"));
    assert_eq!(sent.get("priority").map(String::as_str), Some("high"));
    assert_eq!(sent.get("mention").map(String::as_str), Some("alice"));
    assert_eq!(sent.get("completed").map(String::as_str), Some("false"));
    assert!(!sent.contains_key("tag"));
    assert!(!sent.contains_key("search"));

    let auth = rec.auth.lock().await;
    assert_eq!(auth[0].as_deref(), Some("Bearer tok-123"));
}

#[tokio::test]
async fn history_query_uses_completed_at_descending() {
    let (url, rec) = spawn_todo_server().await.expect("spawn server");
    let service = service_for(url, None);

    service
        .list_todos(&ListTodosQuery::completed_history(10))
        .await
        .expect("history");

    let queries = rec.queries.lock().await;
    let sent = &queries[0];
    assert_eq!(sent.get("completed").map(String::as_str), Some("true"));
    assert_eq!(sent.get("sortBy").map(String::as_str), Some("completedAt"));
    assert_eq!(sent.get("sortOrder").map(String::as_str), Some("desc"));
    assert_eq!(sent.get("limit").map(String::as_str), Some("10"));
    assert_eq!(rec.auth.lock().await[0], None);
}

#[tokio::test]
async fn create_and_update_post_json_bodies() {
    let (url, rec) = spawn_todo_server().await.expect("spawn server");
    let service = service_for(url, None);

    let created = service
        .create_todo(&CreateTodoRequest {
            title: "Write docs".into(),
            description: "api reference".into(),
            priority: Priority::Medium,
            tags: vec!["docs".into()],
            mentions: vec!["alice".into()],
        })
        .await
        .expect("create");
    assert_eq!(created.title, "Write docs");

    service
        .update_todo(
            &TodoId::from("t1"),
            &UpdateTodoRequest {
                completed: Some(true),
                ..UpdateTodoRequest::default()
            },
        )
        .await
        .expect("update");

    let bodies = rec.bodies.lock().await;
    assert_eq!(bodies[0]["priority"], "medium");
    assert_eq!(bodies[0]["mentions"], json!(["alice"]));
    assert_eq!(bodies[1], json!({ "completed": true }));
}

#[tokio::test]
async fn error_status_carries_service_message() {
    let (url, _rec) = spawn_todo_server().await.expect("spawn server");
    let service = service_for(url, None);

    let err = service
        .update_todo(&TodoId::from("bad"), &UpdateTodoRequest::default())
        .await
        .expect_err("must fail");
    match err {
        ServiceError::Status { status, message } => {
            assert_eq!(status, 422);
            assert_eq!(message, "title is required");
        }
        other => panic!("unexpected error: {other:?}"),
    }

    let err = service
        .delete_todo(&TodoId::from("missing"))
        .await
        .expect_err("must fail");
    assert!(matches!(err, ServiceError::Status { status: 404, .. }));
}

#[tokio::test]
async fn delete_stats_and_users_round_trip() {
    let (url, rec) = spawn_todo_server().await.expect("spawn server");
    let service = service_for(url, None);

    service
        .delete_todo(&TodoId::from("t2"))
        .await
        .expect("delete");
    assert_eq!(*rec.deleted.lock().await, vec!["t2".to_string()]);

    let stats = service.stats().await.expect("stats");
    assert_eq!(stats.total_todos, 2);
    assert_eq!(stats.completion_rate(), 50);

    let users = service.list_users().await.expect("users");
    assert_eq!(users[1].name, "Bob");
}

#[tokio::test]
async fn unreachable_service_is_a_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let service = service_for(format!("http://{addr}/api"), None);
    let err = service.stats().await.expect_err("must fail");
    assert!(matches!(err, ServiceError::Transport(_)));
}

#[tokio::test]
async fn missing_directory_reports_unavailable() {
    let err = MissingUserDirectory
        .list_users()
        .await
        .expect_err("must fail");
    assert!(err.to_string().contains("unavailable"));
}
