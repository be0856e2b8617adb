//! HTTP surface tests: the parameterized routers against an in-process
//! registry, driven through tower's oneshot.

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use metaforge::{
    app_router, Actor, AppState, AuthConfig, Backend, FieldDefinition, FieldType, Registry,
    SchemaDefinition,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

fn app() -> Router {
    let registry = Arc::new(Registry::new(Backend::Memory));
    registry
        .register(
            SchemaDefinition::build(
                "Task",
                vec![
                    FieldDefinition::new("title", FieldType::String)
                        .required()
                        .max_length(200),
                    FieldDefinition::new("status", FieldType::Choice)
                        .choices(["todo", "done"])
                        .default_value(json!("todo")),
                ],
            )
            .unwrap()
            .with_auth(AuthConfig {
                read_public: true,
                ..AuthConfig::default()
            }),
        )
        .unwrap();
    app_router(AppState::new(registry))
}

fn actor() -> Actor {
    Actor {
        id: 7,
        permissions: vec![],
    }
}

fn request(method: Method, uri: &str, body: Option<Value>, with_actor: bool) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if with_actor {
        builder = builder.extension(actor());
    }
    match body {
        Some(v) => builder
            .header("content-type", "application/json")
            .body(Body::from(v.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

#[tokio::test]
async fn create_requires_an_actor() {
    let app = app();
    let (status, body) = send(
        &app,
        request(Method::POST, "/tasks", Some(json!({"title": "t"})), false),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "unauthorized");
}

#[tokio::test]
async fn create_read_update_delete_roundtrip() {
    let app = app();

    let (status, created) = send(
        &app,
        request(
            Method::POST,
            "/tasks",
            Some(json!({"title": "write tests", "bogus": 1})),
            true,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["id"], 1);
    assert_eq!(created["status"], "todo");
    assert_eq!(created["created_by_id"], 7);
    // Projection drops unknown and internal columns.
    assert!(created.get("bogus").is_none());
    assert!(created.get("metadata_json").is_none());

    let (status, fetched) = send(&app, request(Method::GET, "/tasks/1", None, false)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["title"], "write tests");

    let (status, updated) = send(
        &app,
        request(Method::PUT, "/tasks/1", Some(json!({"status": "done"})), true),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["status"], "done");
    assert_eq!(updated["title"], "write tests");

    let (status, _) = send(&app, request(Method::DELETE, "/tasks/1", None, true)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, request(Method::GET, "/tasks/1", None, false)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    // Soft deleted: still reachable with the flag.
    let (status, hidden) = send(
        &app,
        request(Method::GET, "/tasks/1?include_deleted=true", None, false),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(hidden["is_deleted"], true);
}

#[tokio::test]
async fn hard_delete_is_final() {
    let app = app();
    send(
        &app,
        request(Method::POST, "/tasks", Some(json!({"title": "x"})), true),
    )
    .await;
    let (status, _) = send(
        &app,
        request(Method::DELETE, "/tasks/1?hard_delete=true", None, true),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(
        &app,
        request(Method::GET, "/tasks/1?include_deleted=true", None, false),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    // Deleting again reports the missing record.
    let (status, _) = send(&app, request(Method::DELETE, "/tasks/1", None, true)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn list_envelope_paginates() {
    let app = app();
    for i in 1..=12 {
        send(
            &app,
            request(
                Method::POST,
                "/tasks",
                Some(json!({"title": format!("task {}", i)})),
                true,
            ),
        )
        .await;
    }

    let (status, body) = send(
        &app,
        request(Method::GET, "/tasks?skip=10&limit=5", None, false),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 12);
    assert_eq!(body["items"].as_array().unwrap().len(), 2);
    assert_eq!(body["skip"], 10);
    assert_eq!(body["limit"], 5);
    assert_eq!(body["has_next"], false);

    let (_, body) = send(&app, request(Method::GET, "/tasks?limit=5", None, false)).await;
    assert_eq!(body["has_next"], true);

    let (_, body) = send(&app, request(Method::GET, "/tasks/count", None, false)).await;
    assert_eq!(body["count"], 12);
}

#[tokio::test]
async fn filters_and_search_narrow_the_list() {
    let app = app();
    for (title, status) in [("alpha", "todo"), ("beta", "done"), ("alpha two", "done")] {
        send(
            &app,
            request(
                Method::POST,
                "/tasks",
                Some(json!({"title": title, "status": status})),
                true,
            ),
        )
        .await;
    }

    let (_, body) = send(
        &app,
        request(Method::GET, "/tasks?status=done", None, false),
    )
    .await;
    assert_eq!(body["total"], 2);

    let (_, body) = send(
        &app,
        request(Method::GET, "/tasks?search=ALPHA&status=done", None, false),
    )
    .await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["items"][0]["title"], "alpha two");
}

#[tokio::test]
async fn validation_errors_are_422() {
    let app = app();
    let (status, body) = send(
        &app,
        request(
            Method::POST,
            "/tasks",
            Some(json!({"title": "t", "status": "nope"})),
            true,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "validation_error");
}

#[tokio::test]
async fn non_object_body_is_400() {
    let app = app();
    let (status, _) = send(
        &app,
        request(Method::POST, "/tasks", Some(json!(["not", "an", "object"])), true),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_entity_and_bad_id_fail_cleanly() {
    let app = app();
    let (status, _) = send(&app, request(Method::GET, "/widgets", None, false)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&app, request(Method::GET, "/tasks/abc", None, false)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn meta_routes_describe_the_registry() {
    let app = app();
    let (status, body) = send(&app, request(Method::GET, "/_meta/schemas", None, false)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["name"], "Task");
    assert_eq!(body[0]["field_count"], 2);

    let (status, body) = send(
        &app,
        request(Method::GET, "/_meta/schemas/Task", None, false),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["table_name"], "tasks");
    assert!(body["contracts"]["create"].is_array());

    let (status, _) = send(
        &app,
        request(Method::GET, "/_meta/schemas/Ghost", None, false),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(&app, request(Method::GET, "/_meta/stats", None, false)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_schemas"], 1);
    assert_eq!(body["total_endpoints"], 6);
}

#[tokio::test]
async fn health_and_version_respond() {
    let app = app();
    let (status, body) = send(&app, request(Method::GET, "/health", None, false)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    let (status, body) = send(&app, request(Method::GET, "/version", None, false)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "metaforge");
}
