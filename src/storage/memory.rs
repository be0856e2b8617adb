//! In-process storage backend. Mirrors the PostgreSQL backend's query
//! semantics through the shared evaluation helpers, which is what makes the
//! data-access service testable without a database.

use crate::error::AppError;
use crate::mapping::StorageModel;
use crate::service::query::{self, ListQuery};
use crate::storage::Storage;
use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

#[derive(Default)]
struct Table {
    rows: BTreeMap<i64, Value>,
    next_id: i64,
}

#[derive(Default)]
pub struct MemStorage {
    tables: Mutex<HashMap<String, Table>>,
}

impl MemStorage {
    pub fn new() -> Self {
        MemStorage::default()
    }

    fn with_table<R>(&self, name: &str, f: impl FnOnce(&mut Table) -> R) -> R {
        let mut tables = self.tables.lock().unwrap_or_else(|e| e.into_inner());
        f(tables.entry(name.to_string()).or_default())
    }
}

/// Unique-column check matching what the UNIQUE constraints reject in the
/// PostgreSQL backend. Null never collides; `skip_id` exempts the row being
/// updated.
fn check_unique(
    model: &StorageModel,
    table: &Table,
    candidate: &Map<String, Value>,
    skip_id: Option<i64>,
) -> Result<(), AppError> {
    let unique: Vec<&str> = model
        .columns
        .iter()
        .filter(|c| c.unique)
        .map(|c| c.name.as_str())
        .collect();
    if unique.is_empty() {
        return Ok(());
    }
    for (id, row) in &table.rows {
        if skip_id == Some(*id) {
            continue;
        }
        for column in &unique {
            let new = candidate.get(*column).filter(|v| !v.is_null());
            let existing = row.get(*column).filter(|v| !v.is_null());
            if let (Some(new), Some(existing)) = (new, existing) {
                if new == existing {
                    return Err(AppError::Crud(
                        "value already exists for a unique field".into(),
                    ));
                }
            }
        }
    }
    Ok(())
}

#[async_trait]
impl Storage for MemStorage {
    async fn insert(
        &self,
        model: &StorageModel,
        mut row: Map<String, Value>,
    ) -> Result<Value, AppError> {
        // Storage-populated columns: id, created_at, soft-delete default.
        self.with_table(&model.table_name, |table| {
            check_unique(model, table, &row, None)?;
            table.next_id += 1;
            let id = table.next_id;
            row.insert("id".into(), Value::Number(id.into()));
            if model.has_column("created_at") {
                row.insert("created_at".into(), Value::String(Utc::now().to_rfc3339()));
            }
            if model.has_column("is_deleted") && !row.contains_key("is_deleted") {
                row.insert("is_deleted".into(), Value::Bool(false));
            }
            for col in &model.columns {
                row.entry(col.name.clone()).or_insert(Value::Null);
            }
            let record = Value::Object(row);
            table.rows.insert(id, record.clone());
            Ok(record)
        })
    }

    async fn fetch(
        &self,
        model: &StorageModel,
        id: i64,
        include_deleted: bool,
    ) -> Result<Option<Value>, AppError> {
        self.with_table(&model.table_name, |table| {
            let record = match table.rows.get(&id) {
                Some(r) => r.clone(),
                None => return Ok(None),
            };
            let deleted = record
                .get("is_deleted")
                .and_then(Value::as_bool)
                .unwrap_or(false);
            if deleted && !include_deleted {
                return Ok(None);
            }
            Ok(Some(record))
        })
    }

    async fn query(
        &self,
        model: &StorageModel,
        list_query: &ListQuery,
    ) -> Result<Vec<Value>, AppError> {
        self.with_table(&model.table_name, |table| {
            let mut hits: Vec<Value> = table
                .rows
                .values()
                .filter(|r| query::matches(r, list_query))
                .cloned()
                .collect();
            query::sort(&mut hits, list_query);
            Ok(query::paginate(hits, list_query))
        })
    }

    async fn count(&self, model: &StorageModel, list_query: &ListQuery) -> Result<u64, AppError> {
        self.with_table(&model.table_name, |table| {
            Ok(table
                .rows
                .values()
                .filter(|r| query::matches(r, list_query))
                .count() as u64)
        })
    }

    async fn update(
        &self,
        model: &StorageModel,
        id: i64,
        changes: Map<String, Value>,
    ) -> Result<Option<Value>, AppError> {
        self.with_table(&model.table_name, |table| {
            if !table.rows.contains_key(&id) {
                return Ok(None);
            }
            check_unique(model, table, &changes, Some(id))?;
            let Some(record) = table.rows.get_mut(&id) else {
                return Ok(None);
            };
            if let Value::Object(existing) = record {
                for (key, value) in changes {
                    if model.has_column(&key) {
                        existing.insert(key, value);
                    }
                }
            }
            Ok(Some(record.clone()))
        })
    }

    async fn remove(&self, model: &StorageModel, id: i64) -> Result<bool, AppError> {
        self.with_table(&model.table_name, |table| Ok(table.rows.remove(&id).is_some()))
    }
}
