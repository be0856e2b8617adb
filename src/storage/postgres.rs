//! PostgreSQL storage backend. Every write runs in its own transaction,
//! committed on success; dropping an uncommitted transaction rolls it back on
//! any error path.

use crate::error::AppError;
use crate::mapping::StorageModel;
use crate::service::query::ListQuery;
use crate::sql::{self, QueryBuf};
use crate::storage::Storage;
use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::postgres::PgRow;
use sqlx::PgPool;

pub struct PgStorage {
    pool: PgPool,
}

impl PgStorage {
    pub fn new(pool: PgPool) -> Self {
        PgStorage { pool }
    }

    fn bind_all<'q>(
        q: &'q QueryBuf,
    ) -> sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments> {
        let mut query = sqlx::query(&q.sql);
        for p in &q.params {
            query = query.bind(p.clone());
        }
        query
    }
}

#[async_trait]
impl Storage for PgStorage {
    async fn insert(
        &self,
        model: &StorageModel,
        row: Map<String, Value>,
    ) -> Result<Value, AppError> {
        let q = sql::insert(model, &row);
        tracing::debug!(sql = %q.sql, "insert");
        let mut tx = self.pool.begin().await?;
        let created = Self::bind_all(&q).fetch_one(&mut *tx).await?;
        tx.commit().await?;
        Ok(row_to_json(&created))
    }

    async fn fetch(
        &self,
        model: &StorageModel,
        id: i64,
        include_deleted: bool,
    ) -> Result<Option<Value>, AppError> {
        let q = sql::select_by_id(model, id, include_deleted);
        tracing::debug!(sql = %q.sql, id, "fetch");
        let row = Self::bind_all(&q).fetch_optional(&self.pool).await?;
        Ok(row.map(|r| row_to_json(&r)))
    }

    async fn query(
        &self,
        model: &StorageModel,
        query: &ListQuery,
    ) -> Result<Vec<Value>, AppError> {
        let q = sql::select_list(model, query);
        tracing::debug!(sql = %q.sql, "list");
        let rows = Self::bind_all(&q).fetch_all(&self.pool).await?;
        Ok(rows.iter().map(row_to_json).collect())
    }

    async fn count(&self, model: &StorageModel, query: &ListQuery) -> Result<u64, AppError> {
        let q = sql::count(model, query);
        tracing::debug!(sql = %q.sql, "count");
        let mut scalar = sqlx::query_scalar::<_, i64>(&q.sql);
        for p in &q.params {
            scalar = scalar.bind(p.clone());
        }
        let n = scalar.fetch_one(&self.pool).await?;
        Ok(n.max(0) as u64)
    }

    async fn update(
        &self,
        model: &StorageModel,
        id: i64,
        changes: Map<String, Value>,
    ) -> Result<Option<Value>, AppError> {
        let q = sql::update(model, id, &changes);
        tracing::debug!(sql = %q.sql, id, "update");
        let mut tx = self.pool.begin().await?;
        let row = Self::bind_all(&q).fetch_optional(&mut *tx).await?;
        tx.commit().await?;
        Ok(row.map(|r| row_to_json(&r)))
    }

    async fn remove(&self, model: &StorageModel, id: i64) -> Result<bool, AppError> {
        let q = sql::delete(model, id);
        tracing::debug!(sql = %q.sql, id, "hard delete");
        let mut tx = self.pool.begin().await?;
        let row = Self::bind_all(&q).fetch_optional(&mut *tx).await?;
        tx.commit().await?;
        Ok(row.is_some())
    }
}

fn row_to_json(row: &PgRow) -> Value {
    use sqlx::{Column, Row};
    let mut map = serde_json::Map::new();
    for col in row.columns() {
        let name = col.name();
        map.insert(name.to_string(), cell_to_value(row, name));
    }
    Value::Object(map)
}

/// Decode one cell into JSON, trying the types our column set can produce.
fn cell_to_value(row: &PgRow, name: &str) -> Value {
    use sqlx::Row;
    if let Ok(Some(n)) = row.try_get::<Option<i64>, _>(name) {
        return Value::Number(n.into());
    }
    if let Ok(Some(b)) = row.try_get::<Option<bool>, _>(name) {
        return Value::Bool(b);
    }
    if let Ok(Some(n)) = row.try_get::<Option<f64>, _>(name) {
        if let Some(n) = serde_json::Number::from_f64(n) {
            return Value::Number(n);
        }
    }
    if let Ok(Some(u)) = row.try_get::<Option<uuid::Uuid>, _>(name) {
        return Value::String(u.to_string());
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(name) {
        return Value::String(d.to_rfc3339());
    }
    if let Ok(Some(d)) = row.try_get::<Option<chrono::NaiveDate>, _>(name) {
        return Value::String(d.format("%Y-%m-%d").to_string());
    }
    if let Ok(Some(t)) = row.try_get::<Option<chrono::NaiveTime>, _>(name) {
        return Value::String(t.format("%H:%M:%S").to_string());
    }
    if let Ok(Some(s)) = row.try_get::<Option<String>, _>(name) {
        return Value::String(s);
    }
    if let Ok(Some(j)) = row.try_get::<Option<Value>, _>(name) {
        return j;
    }
    Value::Null
}
