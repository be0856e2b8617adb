//! Schema-agnostic data access: query parameter resolution and the CRUD
//! service each registered schema gets an instance of.

pub mod crud;
pub mod query;

pub use crud::CrudService;
pub use query::{ListQuery, QueryParams, SearchSpec, DEFAULT_LIMIT, MAX_LIMIT};
