//! Metaforge: schema-driven backend engine.
//!
//! A schema ([`SchemaDefinition`]) describes an entity once; the engine
//! derives everything else at runtime: the storage mapping (typed columns,
//! indexes, validators), a generic CRUD service with soft delete, audit
//! stamping, search and pagination, and the HTTP surface (routes, request
//! and response contracts, per-operation authorization). A [`Registry`] owns
//! the registered schemas and every derived artifact; removing a schema
//! drops them all, and updating is a full remove + re-register.

pub mod api;
pub mod case;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod mapping;
pub mod registry;
pub mod response;
pub mod routes;
pub mod schema;
pub mod service;
pub mod sql;
pub mod state;
pub mod storage;

pub use api::{Actor, AuthRequirement, Operation, RouteSet, SchemaContracts};
pub use error::{AppError, MappingError, SchemaError};
pub use mapping::{apply_storage, StorageMapper, StorageModel};
pub use registry::{Registry, SchemaHandle, SchemaInfo, SchemaSummary, SystemStats};
pub use response::{CountBody, ListEnvelope};
pub use routes::{app_router, common_routes, entity_routes, meta_routes};
pub use schema::{
    AuthConfig, FieldDefinition, FieldType, RelationshipKind, SchemaDefinition, SchemaFeatures,
};
pub use service::{CrudService, QueryParams};
pub use state::AppState;
pub use storage::{Backend, MemStorage, PgStorage, Storage};
