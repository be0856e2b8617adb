//! Demo server: registers a pair of example schemas and serves the generated
//! API. Backed by PostgreSQL when DATABASE_URL is set, by the in-process
//! store otherwise.

use axum::extract::State;
use axum::http::Method;
use axum::routing::get;
use axum::Json;
use metaforge::schema::presets;
use metaforge::{
    apply_storage, app_router, AppError, AppState, AuthConfig, Backend, FieldDefinition,
    FieldType, QueryParams, RelationshipKind, Registry, SchemaDefinition,
};
use serde_json::json;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::limit::RequestBodyLimitLayer;

const MAX_BODY_BYTES: usize = 1024 * 1024;

fn project_schema() -> Result<SchemaDefinition, AppError> {
    Ok(SchemaDefinition::build(
        "Project",
        vec![
            presets::name_field().indexed(),
            presets::description_field(),
            presets::status_field(),
        ],
    )?
    .with_title("Project"))
}

fn task_schema() -> Result<SchemaDefinition, AppError> {
    Ok(SchemaDefinition::build(
        "Task",
        vec![
            FieldDefinition::new("title", FieldType::String)
                .required()
                .max_length(200)
                .indexed(),
            FieldDefinition::new("description", FieldType::Text),
            FieldDefinition::new("status", FieldType::Choice)
                .choices(["todo", "in_progress", "done"])
                .default_value(json!("todo")),
            FieldDefinition::new("priority", FieldType::Choice)
                .choices(["low", "medium", "high"])
                .default_value(json!("medium")),
            FieldDefinition::new("due_date", FieldType::Date),
            FieldDefinition::new("estimated_hours", FieldType::Float).min_value(0.0),
            FieldDefinition::new("project", FieldType::Integer)
                .relationship(RelationshipKind::ManyToOne, "Project"),
        ],
    )?
    .with_title("Task")
    .with_auth(AuthConfig {
        read_public: true,
        ..AuthConfig::default()
    }))
}

/// Custom route example: aggregate task counts by completion.
async fn task_summary(State(state): State<AppState>) -> Result<Json<serde_json::Value>, AppError> {
    let handle = state
        .registry
        .get("Task")
        .ok_or_else(|| AppError::NotFound("Task".into()))?;
    let total = handle.service.count(&QueryParams::default()).await?;
    let done = handle
        .service
        .count(&QueryParams {
            filters: vec![("status".into(), json!("done"))],
            ..QueryParams::default()
        })
        .await?;
    Ok(Json(json!({ "total": total, "done": done, "open": total - done })))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("metaforge=info")),
        )
        .init();

    let backend = match std::env::var("DATABASE_URL") {
        Ok(url) => {
            let pool = sqlx::postgres::PgPoolOptions::new()
                .max_connections(5)
                .connect(&url)
                .await?;
            Backend::Postgres(pool)
        }
        Err(_) => {
            tracing::info!("DATABASE_URL not set, using in-process storage");
            Backend::Memory
        }
    };
    let pool = match &backend {
        Backend::Postgres(pool) => Some(pool.clone()),
        Backend::Memory => None,
    };

    let registry = Arc::new(Registry::new(backend));
    registry.register(project_schema()?)?;
    registry.register(task_schema()?)?;
    if let Some(pool) = &pool {
        for model in registry.storage_models() {
            apply_storage(pool, model.as_ref()).await?;
        }
    }
    registry.register_custom_route(
        "Task",
        Method::GET,
        "/summary",
        get(task_summary),
        json!({"description": "task counts by completion"}),
    )?;

    let state = AppState::new(registry);
    let app = app_router(state).layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES));

    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:3000".into());
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
