//! Introspection handlers: what is registered and what it exposes.

use crate::error::AppError;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    Json,
};

pub async fn list_schemas(State(state): State<AppState>) -> impl axum::response::IntoResponse {
    Json(state.registry.list_schemas())
}

pub async fn schema_info(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let info = state
        .registry
        .schema_info(&name)
        .ok_or_else(|| AppError::NotFound(name))?;
    Ok(Json(info))
}

pub async fn stats(State(state): State<AppState>) -> impl axum::response::IntoResponse {
    Json(state.registry.stats())
}
