//! Builds parameterized INSERT, SELECT, UPDATE, DELETE from a storage model
//! and a resolved list query.

use crate::mapping::{ColumnType, StorageModel};
use crate::service::query::ListQuery;
use crate::sql::BindValue;
use serde_json::{Map, Value};

/// Quote identifier for PostgreSQL (identifiers come from validated schemas,
/// quoting is belt and braces).
fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<BindValue>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    fn push_param(&mut self, v: BindValue) -> usize {
        self.params.push(v);
        self.params.len()
    }
}

/// SELECT list: numeric columns cast to text so the driver hands back strings
/// instead of a binary numeric encoding.
fn select_column_list(model: &StorageModel) -> String {
    model
        .columns
        .iter()
        .map(|c| {
            let q = quoted(&c.name);
            if matches!(c.column_type, ColumnType::Numeric { .. }) {
                format!("{}::text AS {}", q, q)
            } else {
                q
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn placeholder(model: &StorageModel, column: &str, n: usize) -> String {
    match model.column(column) {
        Some(c) => format!("${}::{}", n, c.column_type.cast_type()),
        None => format!("${}", n),
    }
}

/// INSERT with columns taken from the row (id and absent columns are omitted
/// so storage defaults apply). Returns the full created row.
pub fn insert(model: &StorageModel, row: &Map<String, Value>) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut cols = Vec::new();
    let mut placeholders = Vec::new();
    for col in &model.columns {
        if col.name == "id" {
            continue;
        }
        let Some(value) = row.get(&col.name) else { continue };
        let n = q.push_param(BindValue::for_column(value, Some(&col.column_type)));
        cols.push(quoted(&col.name));
        placeholders.push(format!("${}::{}", n, col.column_type.cast_type()));
    }
    q.sql = format!(
        "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
        quoted(&model.table_name),
        cols.join(", "),
        placeholders.join(", "),
        select_column_list(model)
    );
    q
}

/// SELECT one row by primary key, honoring the soft-delete filter.
pub fn select_by_id(model: &StorageModel, id: i64, include_deleted: bool) -> QueryBuf {
    let mut q = QueryBuf::new();
    q.push_param(BindValue::I64(id));
    let mut sql = format!(
        "SELECT {} FROM {} WHERE {} = $1",
        select_column_list(model),
        quoted(&model.table_name),
        quoted("id")
    );
    if model.has_column("is_deleted") && !include_deleted {
        sql.push_str(" AND \"is_deleted\" = FALSE");
    }
    q.sql = sql;
    q
}

fn where_clause(model: &StorageModel, query: &ListQuery, buf: &mut QueryBuf) -> String {
    let mut parts = Vec::new();
    if query.exclude_deleted && model.has_column("is_deleted") {
        parts.push("\"is_deleted\" = FALSE".to_string());
    }
    for (column, value) in &query.filters {
        let column_type = model.column(column).map(|c| &c.column_type);
        let n = buf.push_param(BindValue::for_column(value, column_type));
        parts.push(format!("{} = {}", quoted(column), placeholder(model, column, n)));
    }
    if let Some(search) = &query.search {
        if !search.columns.is_empty() {
            let n = buf.push_param(BindValue::Text(format!("%{}%", search.term)));
            let ors: Vec<String> = search
                .columns
                .iter()
                .map(|c| format!("{}::text ILIKE ${}", quoted(c), n))
                .collect();
            parts.push(format!("({})", ors.join(" OR ")));
        }
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", parts.join(" AND "))
    }
}

/// SELECT list: filters + search + soft-delete, ORDER BY with id tiebreak,
/// LIMIT/OFFSET from the resolved query.
pub fn select_list(model: &StorageModel, query: &ListQuery) -> QueryBuf {
    let mut q = QueryBuf::new();
    let where_sql = where_clause(model, query, &mut q);
    let order_sql = match &query.order {
        Some((column, desc)) => format!(
            " ORDER BY {} {}, {} ASC",
            quoted(column),
            if *desc { "DESC" } else { "ASC" },
            quoted("id")
        ),
        None => " ORDER BY \"id\" ASC".to_string(),
    };
    q.sql = format!(
        "SELECT {} FROM {}{}{} LIMIT {} OFFSET {}",
        select_column_list(model),
        quoted(&model.table_name),
        where_sql,
        order_sql,
        query.limit,
        query.skip
    );
    q
}

/// COUNT with the same visibility/filter/search semantics as the list.
pub fn count(model: &StorageModel, query: &ListQuery) -> QueryBuf {
    let mut q = QueryBuf::new();
    let where_sql = where_clause(model, query, &mut q);
    q.sql = format!(
        "SELECT COUNT(*) FROM {}{}",
        quoted(&model.table_name),
        where_sql
    );
    q
}

/// UPDATE by id: SET only the provided columns. Falls back to a plain SELECT
/// when there is nothing to set.
pub fn update(model: &StorageModel, id: i64, changes: &Map<String, Value>) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut sets = Vec::new();
    for col in &model.columns {
        if col.name == "id" {
            continue;
        }
        let Some(value) = changes.get(&col.name) else { continue };
        let n = q.push_param(BindValue::for_column(value, Some(&col.column_type)));
        sets.push(format!(
            "{} = ${}::{}",
            quoted(&col.name),
            n,
            col.column_type.cast_type()
        ));
    }
    if sets.is_empty() {
        return select_by_id(model, id, true);
    }
    let id_param = q.push_param(BindValue::I64(id));
    q.sql = format!(
        "UPDATE {} SET {} WHERE {} = ${} RETURNING {}",
        quoted(&model.table_name),
        sets.join(", "),
        quoted("id"),
        id_param,
        select_column_list(model)
    );
    q
}

/// Hard DELETE by id.
pub fn delete(model: &StorageModel, id: i64) -> QueryBuf {
    let mut q = QueryBuf::new();
    q.push_param(BindValue::I64(id));
    q.sql = format!(
        "DELETE FROM {} WHERE {} = $1 RETURNING {}",
        quoted(&model.table_name),
        quoted("id"),
        quoted("id")
    );
    q
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::StorageMapper;
    use crate::schema::{FieldDefinition, FieldType, SchemaDefinition};
    use crate::service::query::SearchSpec;
    use serde_json::json;
    use std::collections::HashMap;

    fn task_model() -> StorageModel {
        let schema = SchemaDefinition::build(
            "Task",
            vec![
                FieldDefinition::new("title", FieldType::String).required(),
                FieldDefinition::new("priority", FieldType::Choice).choices(["low", "high"]),
                FieldDefinition::new("estimate", FieldType::Decimal),
            ],
        )
        .unwrap();
        let known: HashMap<String, String> = [("Task".to_string(), "tasks".to_string())].into();
        (*StorageMapper::new().map(&schema, &known).unwrap()).clone()
    }

    fn base_query() -> ListQuery {
        ListQuery {
            filters: Vec::new(),
            search: None,
            exclude_deleted: true,
            order: None,
            skip: 0,
            limit: 100,
        }
    }

    #[test]
    fn insert_skips_absent_columns() {
        let model = task_model();
        let row = json!({"title": "write docs"});
        let q = insert(&model, row.as_object().unwrap());
        assert!(q.sql.starts_with("INSERT INTO \"tasks\" (\"title\") VALUES ($1::varchar)"));
        assert_eq!(q.params, vec![BindValue::Text("write docs".into())]);
        assert!(q.sql.contains("RETURNING"));
        assert!(q.sql.contains("\"estimate\"::text"));
    }

    #[test]
    fn uuid_columns_bind_native_values() {
        let schema = SchemaDefinition::build(
            "Device",
            vec![
                FieldDefinition::new("token", FieldType::Uuid),
                FieldDefinition::new("label", FieldType::String),
            ],
        )
        .unwrap();
        let known: HashMap<String, String> =
            [("Device".to_string(), "devices".to_string())].into();
        let model = StorageMapper::new().map(&schema, &known).unwrap();

        let token = "0b7f3d52-8f3e-4c6a-9d25-0d4f5f9d0a11";
        // The same uuid-shaped string binds per column type.
        let row = json!({"token": token, "label": token});
        let q = insert(&model, row.as_object().unwrap());
        assert_eq!(q.params[0], BindValue::Uuid(token.parse().unwrap()));
        assert_eq!(q.params[1], BindValue::Text(token.into()));
    }

    #[test]
    fn select_by_id_honors_soft_delete() {
        let model = task_model();
        let q = select_by_id(&model, 7, false);
        assert!(q.sql.ends_with("WHERE \"id\" = $1 AND \"is_deleted\" = FALSE"));
        assert_eq!(q.params, vec![BindValue::I64(7)]);
        let q = select_by_id(&model, 7, true);
        assert!(q.sql.ends_with("WHERE \"id\" = $1"));
    }

    #[test]
    fn list_defaults_to_id_order() {
        let model = task_model();
        let q = select_list(&model, &base_query());
        assert!(q.sql.contains("WHERE \"is_deleted\" = FALSE"));
        assert!(q.sql.contains("ORDER BY \"id\" ASC LIMIT 100 OFFSET 0"));
    }

    #[test]
    fn list_orders_with_id_tiebreak() {
        let model = task_model();
        let mut query = base_query();
        query.order = Some(("priority".into(), true));
        query.skip = 20;
        query.limit = 10;
        let q = select_list(&model, &query);
        assert!(q
            .sql
            .contains("ORDER BY \"priority\" DESC, \"id\" ASC LIMIT 10 OFFSET 20"));
    }

    #[test]
    fn search_is_an_ilike_group() {
        let model = task_model();
        let mut query = base_query();
        query.search = Some(SearchSpec {
            term: "docs".into(),
            columns: vec!["title".into(), "priority".into()],
        });
        query.filters = vec![("priority".into(), json!("high"))];
        let q = select_list(&model, &query);
        assert!(q.sql.contains("\"priority\" = $1::varchar"));
        assert!(q
            .sql
            .contains("(\"title\"::text ILIKE $2 OR \"priority\"::text ILIKE $2)"));
        assert_eq!(q.params[0], BindValue::Text("high".into()));
        assert_eq!(q.params[1], BindValue::Text("%docs%".into()));
    }

    #[test]
    fn count_shares_where_semantics() {
        let model = task_model();
        let mut query = base_query();
        query.filters = vec![("priority".into(), json!("low"))];
        let q = count(&model, &query);
        assert!(q.sql.starts_with("SELECT COUNT(*) FROM \"tasks\" WHERE"));
        assert!(!q.sql.contains("LIMIT"));
    }

    #[test]
    fn update_sets_only_present_columns() {
        let model = task_model();
        let changes = json!({"title": "new title", "unknown": 1});
        let q = update(&model, 7, changes.as_object().unwrap());
        assert!(q.sql.contains("SET \"title\" = $1::varchar WHERE \"id\" = $2"));
        assert_eq!(
            q.params,
            vec![BindValue::Text("new title".into()), BindValue::I64(7)]
        );
    }

    #[test]
    fn empty_update_falls_back_to_select() {
        let model = task_model();
        let changes = serde_json::Map::new();
        let q = update(&model, 7, &changes);
        assert!(q.sql.starts_with("SELECT"));
        assert_eq!(q.params, vec![BindValue::I64(7)]);
    }
}
