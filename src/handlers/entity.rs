//! Generated CRUD handlers. Routes are parameterized on the plural path
//! segment; each handler resolves the schema against the registry at request
//! time, enforces the resolved authorization requirement, and dispatches to
//! the schema's CRUD service.

use crate::api::auth::{AuthRequirement, Operation};
use crate::error::AppError;
use crate::extractors::MaybeActor;
use crate::mapping::{ColumnType, StorageModel};
use crate::registry::SchemaHandle;
use crate::response::{CountBody, ListEnvelope};
use crate::service::QueryParams;
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde_json::{Map, Value};
use std::collections::HashMap;

fn resolve(state: &AppState, path_segment: &str) -> Result<SchemaHandle, AppError> {
    state
        .registry
        .resolve(path_segment)
        .ok_or_else(|| AppError::NotFound(path_segment.to_string()))
}

/// Enforce the operation's requirement and hand back the actor id for audit
/// stamping. A public operation still stamps the actor when one is present.
fn authorize(
    handle: &SchemaHandle,
    op: Operation,
    actor: &MaybeActor,
) -> Result<Option<i64>, AppError> {
    let actor_id = actor.0.as_ref().map(|a| a.id);
    if handle.auth_for(op) == AuthRequirement::Required && actor_id.is_none() {
        return Err(AppError::Unauthorized);
    }
    Ok(actor_id)
}

fn parse_id(id_str: &str) -> Result<i64, AppError> {
    id_str
        .parse()
        .map_err(|_| AppError::BadRequest("invalid id".into()))
}

fn body_to_map(value: Value) -> Result<Map<String, Value>, AppError> {
    match value {
        Value::Object(m) => Ok(m),
        _ => Err(AppError::BadRequest("body must be a JSON object".into())),
    }
}

fn flag(params: &HashMap<String, String>, name: &str) -> bool {
    params
        .get(name)
        .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
        .unwrap_or(false)
}

/// Coerce a query-string filter value to the filtered column's JSON kind so
/// exact-match filtering compares like with like.
fn filter_value(model: &StorageModel, column: &str, raw: &str) -> Value {
    match model.column(column).map(|c| &c.column_type) {
        Some(ColumnType::BigInt) => raw
            .parse::<i64>()
            .map(|n| Value::Number(n.into()))
            .unwrap_or_else(|_| Value::String(raw.to_string())),
        Some(ColumnType::Double) | Some(ColumnType::Numeric { .. }) => raw
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .unwrap_or_else(|| Value::String(raw.to_string())),
        Some(ColumnType::Boolean) => {
            if raw.eq_ignore_ascii_case("true") {
                Value::Bool(true)
            } else if raw.eq_ignore_ascii_case("false") {
                Value::Bool(false)
            } else {
                Value::String(raw.to_string())
            }
        }
        _ => Value::String(raw.to_string()),
    }
}

/// Split the raw query string into the reserved list parameters and
/// column-name filters. Unknown keys that are not columns are ignored.
fn parse_query(model: &StorageModel, raw: HashMap<String, String>) -> QueryParams {
    let mut params = QueryParams::default();
    for (key, value) in raw {
        match key.as_str() {
            "skip" => params.skip = value.parse().unwrap_or(0),
            "limit" => params.limit = value.parse().unwrap_or(params.limit),
            "order_by" => params.order_by = Some(value),
            "order_desc" => params.order_desc = value.eq_ignore_ascii_case("true") || value == "1",
            "search" => params.search = Some(value),
            "search_fields" => {
                params.search_fields =
                    Some(value.split(',').map(|s| s.trim().to_string()).collect())
            }
            "include_deleted" => {
                params.include_deleted = value.eq_ignore_ascii_case("true") || value == "1"
            }
            _ => {
                if model.has_column(&key) {
                    let coerced = filter_value(model, &key, &value);
                    params.filters.push((key, coerced));
                }
            }
        }
    }
    params
}

pub async fn create(
    State(state): State<AppState>,
    Path(path_segment): Path<String>,
    actor: MaybeActor,
    Json(body): Json<Value>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let handle = resolve(&state, &path_segment)?;
    let actor_id = authorize(&handle, Operation::Create, &actor)?;
    let body = body_to_map(body)?;
    let record = handle.service.create(body, actor_id).await?;
    Ok((
        axum::http::StatusCode::CREATED,
        Json(handle.contracts.project(&record)),
    ))
}

pub async fn list(
    State(state): State<AppState>,
    Path(path_segment): Path<String>,
    actor: MaybeActor,
    Query(raw): Query<HashMap<String, String>>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let handle = resolve(&state, &path_segment)?;
    authorize(&handle, Operation::List, &actor)?;
    let params = parse_query(&handle.model, raw);
    let total = handle.service.count(&params).await?;
    let items = handle
        .service
        .list(&params)
        .await?
        .iter()
        .map(|r| handle.contracts.project(r))
        .collect();
    Ok(Json(ListEnvelope::new(
        items,
        total,
        params.skip,
        params.clamped_limit(),
    )))
}

pub async fn count(
    State(state): State<AppState>,
    Path(path_segment): Path<String>,
    actor: MaybeActor,
    Query(raw): Query<HashMap<String, String>>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let handle = resolve(&state, &path_segment)?;
    authorize(&handle, Operation::Count, &actor)?;
    let params = parse_query(&handle.model, raw);
    let count = handle.service.count(&params).await?;
    Ok(Json(CountBody { count }))
}

pub async fn read(
    State(state): State<AppState>,
    Path((path_segment, id_str)): Path<(String, String)>,
    actor: MaybeActor,
    Query(raw): Query<HashMap<String, String>>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let handle = resolve(&state, &path_segment)?;
    authorize(&handle, Operation::Get, &actor)?;
    let id = parse_id(&id_str)?;
    let record = handle
        .service
        .get(id, flag(&raw, "include_deleted"))
        .await?
        .ok_or_else(|| AppError::NotFound(format!("{}/{}", path_segment, id_str)))?;
    Ok(Json(handle.contracts.project(&record)))
}

pub async fn update(
    State(state): State<AppState>,
    Path((path_segment, id_str)): Path<(String, String)>,
    actor: MaybeActor,
    Json(body): Json<Value>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let handle = resolve(&state, &path_segment)?;
    let actor_id = authorize(&handle, Operation::Update, &actor)?;
    let id = parse_id(&id_str)?;
    let body = body_to_map(body)?;
    let record = handle
        .service
        .update(id, body, actor_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("{}/{}", path_segment, id_str)))?;
    Ok(Json(handle.contracts.project(&record)))
}

pub async fn delete(
    State(state): State<AppState>,
    Path((path_segment, id_str)): Path<(String, String)>,
    actor: MaybeActor,
    Query(raw): Query<HashMap<String, String>>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let handle = resolve(&state, &path_segment)?;
    let actor_id = authorize(&handle, Operation::Delete, &actor)?;
    let id = parse_id(&id_str)?;
    let deleted = handle
        .service
        .delete(id, actor_id, flag(&raw, "hard_delete"))
        .await?;
    if !deleted {
        return Err(AppError::NotFound(format!("{}/{}", path_segment, id_str)));
    }
    Ok(axum::http::StatusCode::NO_CONTENT)
}
