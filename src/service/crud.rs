//! Generic CRUD execution bound to one registered schema. All record
//! mutations in the system flow through here: unknown-field filtering,
//! required/validator enforcement, audit stamping, and soft-delete handling
//! live in the service; row persistence lives behind [`Storage`].

use crate::error::AppError;
use crate::mapping::StorageModel;
use crate::schema::SchemaDefinition;
use crate::service::query::{ListQuery, QueryParams, SearchSpec};
use crate::storage::Storage;
use chrono::Utc;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Columns managed by the engine; client payloads can never set them.
const SYSTEM_COLUMNS: [&str; 9] = [
    "id",
    "created_at",
    "updated_at",
    "created_by_id",
    "updated_by_id",
    "is_deleted",
    "deleted_at",
    "metadata_json",
    "tags",
];

pub struct CrudService {
    schema: Arc<SchemaDefinition>,
    model: Arc<StorageModel>,
    storage: Arc<dyn Storage>,
}

impl CrudService {
    pub fn new(
        schema: Arc<SchemaDefinition>,
        model: Arc<StorageModel>,
        storage: Arc<dyn Storage>,
    ) -> Self {
        CrudService {
            schema,
            model,
            storage,
        }
    }

    pub fn schema(&self) -> &Arc<SchemaDefinition> {
        &self.schema
    }

    pub fn model(&self) -> &Arc<StorageModel> {
        &self.model
    }

    /// Create a record. Unknown keys are silently dropped, defaults applied,
    /// required fields and validators enforced, audit stamp added when an
    /// actor is present.
    pub async fn create(
        &self,
        data: Map<String, Value>,
        actor_id: Option<i64>,
    ) -> Result<Value, AppError> {
        let mut row = self.filter_client_fields(data);

        for field in &self.schema.fields {
            if field.is_relationship() {
                continue;
            }
            if !row.contains_key(&field.name) {
                if let Some(default) = &field.default {
                    row.insert(field.name.clone(), default.clone());
                }
            }
        }
        for field in self.schema.required_fields() {
            // Required to-one relationships are checked at their foreign-key
            // column; collection-side relationships carry no column here.
            let column = match field.foreign_key_column() {
                Some(fk) => fk,
                None if field.is_relationship() => continue,
                None => field.name.clone(),
            };
            let missing = row.get(&column).map(Value::is_null).unwrap_or(true);
            if missing {
                return Err(AppError::validation(column, "field is required"));
            }
        }
        self.run_validators(&row)?;

        if self.schema.features.audit {
            if let Some(id) = actor_id {
                row.insert("created_by_id".into(), Value::Number(id.into()));
            }
        }

        tracing::debug!(schema = %self.schema.name, "create");
        self.storage.insert(&self.model, row).await
    }

    /// Fetch by id. `Ok(None)` when absent or hidden by the soft-delete
    /// filter; callers translate that to their 404 equivalent.
    pub async fn get(&self, id: i64, include_deleted: bool) -> Result<Option<Value>, AppError> {
        self.storage.fetch(&self.model, id, include_deleted).await
    }

    pub async fn list(&self, params: &QueryParams) -> Result<Vec<Value>, AppError> {
        let query = self.resolve_query(params)?;
        self.storage.query(&self.model, &query).await
    }

    pub async fn count(&self, params: &QueryParams) -> Result<u64, AppError> {
        let query = self.resolve_query(params)?;
        self.storage.count(&self.model, &query).await
    }

    /// Partial update: only fields present in the payload change. Stamps
    /// updated_at / updated_by_id when the matching features are enabled.
    /// Records hidden by the soft-delete filter are not updatable; like an
    /// absent id this is `Ok(None)`.
    pub async fn update(
        &self,
        id: i64,
        data: Map<String, Value>,
        actor_id: Option<i64>,
    ) -> Result<Option<Value>, AppError> {
        if self.storage.fetch(&self.model, id, false).await?.is_none() {
            return Ok(None);
        }
        let mut changes = self.filter_client_fields(data);
        self.reject_null_required(&changes)?;
        self.run_validators(&changes)?;

        if self.schema.features.timestamps {
            changes.insert("updated_at".into(), Value::String(Utc::now().to_rfc3339()));
        }
        if self.schema.features.audit {
            if let Some(actor) = actor_id {
                changes.insert("updated_by_id".into(), Value::Number(actor.into()));
            }
        }

        tracing::debug!(schema = %self.schema.name, id, "update");
        self.storage.update(&self.model, id, changes).await
    }

    /// Soft delete by default; hard delete physically removes the record and
    /// is unconditional. Returns whether anything was deleted.
    pub async fn delete(
        &self,
        id: i64,
        actor_id: Option<i64>,
        hard: bool,
    ) -> Result<bool, AppError> {
        if hard || !self.schema.features.soft_delete {
            tracing::debug!(schema = %self.schema.name, id, "hard delete");
            return self.storage.remove(&self.model, id).await;
        }

        // Soft delete only applies to visible records.
        if self.storage.fetch(&self.model, id, false).await?.is_none() {
            return Ok(false);
        }
        let mut changes = Map::new();
        changes.insert("is_deleted".into(), Value::Bool(true));
        changes.insert("deleted_at".into(), Value::String(Utc::now().to_rfc3339()));
        if self.schema.features.audit {
            if let Some(actor) = actor_id {
                changes.insert("updated_by_id".into(), Value::Number(actor.into()));
            }
        }
        tracing::debug!(schema = %self.schema.name, id, "soft delete");
        Ok(self.storage.update(&self.model, id, changes).await?.is_some())
    }

    /// Keep only writable columns: known to the model and not system-managed.
    fn filter_client_fields(&self, data: Map<String, Value>) -> Map<String, Value> {
        data.into_iter()
            .filter(|(key, _)| {
                self.model.has_column(key) && !SYSTEM_COLUMNS.contains(&key.as_str())
            })
            .collect()
    }

    /// A partial payload may omit required fields, but it cannot null one
    /// out: the column would violate its NOT NULL constraint in storage.
    fn reject_null_required(&self, changes: &Map<String, Value>) -> Result<(), AppError> {
        for (key, value) in changes {
            if value.is_null() {
                if let Some(column) = self.model.column(key) {
                    if !column.nullable {
                        return Err(AppError::validation(key, "field cannot be null"));
                    }
                }
            }
        }
        Ok(())
    }

    fn run_validators(&self, row: &Map<String, Value>) -> Result<(), AppError> {
        for validator in &self.model.validators {
            if let Some(value) = row.get(&validator.field) {
                validator.run(value)?;
            }
        }
        Ok(())
    }

    /// Validate caller query params against the model and resolve them into
    /// the storage-level query.
    fn resolve_query(&self, params: &QueryParams) -> Result<ListQuery, AppError> {
        let order = match &params.order_by {
            Some(column) => {
                if !self.model.has_column(column) {
                    return Err(AppError::validation(column, "unknown sort field"));
                }
                Some((column.clone(), params.order_desc))
            }
            None => None,
        };

        let search = match params.search.as_deref().filter(|s| !s.is_empty()) {
            Some(term) => {
                let columns = match &params.search_fields {
                    Some(fields) => {
                        let valid: Vec<String> = fields
                            .iter()
                            .filter(|f| self.model.has_column(f))
                            .cloned()
                            .collect();
                        if valid.is_empty() {
                            self.model.searchable.clone()
                        } else {
                            valid
                        }
                    }
                    None => self.model.searchable.clone(),
                };
                Some(SearchSpec {
                    term: term.to_string(),
                    columns,
                })
            }
            None => None,
        };

        let filters: Vec<(String, Value)> = params
            .filters
            .iter()
            .filter(|(column, _)| self.model.has_column(column))
            .cloned()
            .collect();

        Ok(ListQuery {
            filters,
            search,
            exclude_deleted: self.model.has_column("is_deleted") && !params.include_deleted,
            order,
            skip: params.skip,
            limit: params.clamped_limit(),
        })
    }
}
