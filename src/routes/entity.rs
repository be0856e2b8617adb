//! Generated entity routes. Paths are parameterized on the plural segment so
//! one router serves every registered schema; handlers resolve the schema at
//! request time, which is what lets register/remove take effect without
//! rebuilding the router.

use crate::handlers::entity::{count, create, delete as delete_handler, list, read, update};
use crate::state::AppState;
use axum::{routing::get, Router};

pub fn entity_routes(state: AppState) -> Router {
    Router::new()
        .route("/:path_segment", get(list).post(create))
        // Static segment wins over the :id capture in axum's matcher.
        .route("/:path_segment/count", get(count))
        .route(
            "/:path_segment/:id",
            get(read).put(update).delete(delete_handler),
        )
        .with_state(state)
}
