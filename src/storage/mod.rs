//! Persistence seam for the data-access service. The service owns the CRUD
//! semantics; a [`Storage`] implementation owns row persistence and query
//! execution for one backend.

pub mod memory;
pub mod postgres;

use crate::error::AppError;
use crate::mapping::StorageModel;
use crate::service::query::ListQuery;
use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::PgPool;
use std::sync::Arc;

pub use memory::MemStorage;
pub use postgres::PgStorage;

/// Row-level persistence operations, parameterized by the storage model so
/// one backend instance serves every registered schema.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Insert a row and return the full stored record (id and storage-default
    /// columns populated).
    async fn insert(
        &self,
        model: &StorageModel,
        row: Map<String, Value>,
    ) -> Result<Value, AppError>;

    async fn fetch(
        &self,
        model: &StorageModel,
        id: i64,
        include_deleted: bool,
    ) -> Result<Option<Value>, AppError>;

    async fn query(&self, model: &StorageModel, query: &ListQuery)
        -> Result<Vec<Value>, AppError>;

    async fn count(&self, model: &StorageModel, query: &ListQuery) -> Result<u64, AppError>;

    /// Apply changes to a row. Returns the updated record, None for an
    /// unknown id.
    async fn update(
        &self,
        model: &StorageModel,
        id: i64,
        changes: Map<String, Value>,
    ) -> Result<Option<Value>, AppError>;

    /// Physically remove a row. Returns whether it existed.
    async fn remove(&self, model: &StorageModel, id: i64) -> Result<bool, AppError>;
}

/// Backend selection for a registry: PostgreSQL for real deployments, the
/// in-process store for tests and demos.
#[derive(Clone)]
pub enum Backend {
    Postgres(PgPool),
    Memory,
}

impl Backend {
    pub fn into_storage(self) -> Arc<dyn Storage> {
        match self {
            Backend::Postgres(pool) => Arc::new(PgStorage::new(pool)),
            Backend::Memory => Arc::new(MemStorage::new()),
        }
    }
}
