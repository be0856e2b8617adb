//! DDL for storage models: CREATE TABLE / CREATE INDEX statements plus a
//! helper that applies them to PostgreSQL. Idempotent (IF NOT EXISTS); shape
//! changes to an existing table are not reconciled.

use crate::error::AppError;
use crate::mapping::column::{ColumnSpec, ColumnType, StorageModel};
use serde_json::Value;
use sqlx::PgPool;

fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

/// CREATE TABLE statement for a storage model.
pub fn create_table_sql(model: &StorageModel) -> String {
    let mut defs: Vec<String> = Vec::with_capacity(model.columns.len() + 2);
    for col in &model.columns {
        defs.push(column_def(col));
    }
    if let Some(uq) = &model.composite_unique {
        let cols: Vec<String> = uq.columns.iter().map(|c| quoted(c)).collect();
        defs.push(format!(
            "CONSTRAINT {} UNIQUE ({})",
            quoted(&uq.name),
            cols.join(", ")
        ));
    }
    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n  {}\n)",
        quoted(&model.table_name),
        defs.join(",\n  ")
    )
}

/// CREATE INDEX statements, one per indexed column.
pub fn create_index_sql(model: &StorageModel) -> Vec<String> {
    model
        .indexes
        .iter()
        .map(|idx| {
            format!(
                "CREATE INDEX IF NOT EXISTS {} ON {} ({})",
                quoted(&idx.name),
                quoted(&model.table_name),
                quoted(&idx.column)
            )
        })
        .collect()
}

fn column_def(col: &ColumnSpec) -> String {
    if col.name == "id" {
        return format!("{} BIGSERIAL PRIMARY KEY", quoted("id"));
    }
    let mut def = format!("{} {}", quoted(&col.name), col.column_type.sql_type());
    if !col.nullable {
        def.push_str(" NOT NULL");
    }
    if col.unique {
        def.push_str(" UNIQUE");
    }
    if let Some(default) = &col.default {
        def.push_str(" DEFAULT ");
        def.push_str(&default_literal(default, &col.column_type));
    }
    if let Some(table) = &col.references {
        def.push_str(&format!(" REFERENCES {} ({})", quoted(table), quoted("id")));
    }
    def
}

fn default_literal(value: &Value, column_type: &ColumnType) -> String {
    match value {
        Value::String(s) if s == "now()" => "NOW()".into(),
        Value::String(s) => format!("'{}'", s.replace('\'', "''")),
        Value::Bool(b) => b.to_string().to_uppercase(),
        Value::Number(n) => n.to_string(),
        Value::Null => "NULL".into(),
        other => format!(
            "'{}'::{}",
            other.to_string().replace('\'', "''"),
            column_type.cast_type()
        ),
    }
}

/// Apply the table and index DDL for one model.
pub async fn apply_storage(pool: &PgPool, model: &StorageModel) -> Result<(), AppError> {
    let table_sql = create_table_sql(model);
    tracing::debug!(table = %model.table_name, "applying storage DDL");
    sqlx::query(&table_sql).execute(pool).await?;
    for index_sql in create_index_sql(model) {
        sqlx::query(&index_sql).execute(pool).await?;
    }
    Ok(())
}
