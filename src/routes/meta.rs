//! Introspection routes, under the reserved `_meta` prefix (schema names may
//! not start with an underscore, so no entity path can collide).

use crate::handlers::meta::{list_schemas, schema_info, stats};
use crate::state::AppState;
use axum::{routing::get, Router};

pub fn meta_routes(state: AppState) -> Router {
    Router::new()
        .route("/_meta/schemas", get(list_schemas))
        .route("/_meta/schemas/:name", get(schema_info))
        .route("/_meta/stats", get(stats))
        .with_state(state)
}
