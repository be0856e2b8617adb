//! Router assembly.

pub mod common;
pub mod entity;
pub mod meta;

use crate::state::AppState;
use axum::Router;

pub use common::common_routes;
pub use entity::entity_routes;
pub use meta::meta_routes;

/// Full application router: health/version, introspection, custom routes,
/// then the parameterized entity routes. Custom routes registered after this
/// is called need a rebuilt router; the generated entity routes do not, since
/// they resolve schemas per request.
pub fn app_router(state: AppState) -> Router {
    Router::new()
        .merge(common_routes())
        .merge(meta_routes(state.clone()))
        .merge(state.registry.custom_router().with_state(state.clone()))
        .merge(entity_routes(state))
}
