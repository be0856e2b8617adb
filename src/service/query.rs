//! Query parameters for list/count and the resolved query the storage layer
//! executes. Evaluation helpers live here so both backends share one
//! definition of filter/search/sort semantics.

use serde::Deserialize;
use serde_json::Value;
use std::cmp::Ordering;

pub const DEFAULT_LIMIT: u32 = 100;
pub const MAX_LIMIT: u32 = 1000;

/// Caller-facing list/count parameters, shared by list and count.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct QueryParams {
    pub skip: u32,
    pub limit: u32,
    pub order_by: Option<String>,
    pub order_desc: bool,
    pub search: Option<String>,
    /// Explicit search columns; all textual fields when unset.
    pub search_fields: Option<Vec<String>>,
    pub include_deleted: bool,
    /// Extra exact-match filters, ANDed together.
    pub filters: Vec<(String, Value)>,
}

impl Default for QueryParams {
    fn default() -> Self {
        QueryParams {
            skip: 0,
            limit: DEFAULT_LIMIT,
            order_by: None,
            order_desc: false,
            search: None,
            search_fields: None,
            include_deleted: false,
            filters: Vec::new(),
        }
    }
}

impl QueryParams {
    pub fn clamped_limit(&self) -> u32 {
        self.limit.clamp(1, MAX_LIMIT)
    }
}

/// Case-insensitive substring search over a resolved column list.
#[derive(Clone, Debug)]
pub struct SearchSpec {
    pub term: String,
    pub columns: Vec<String>,
}

/// Query after the data-access service has validated it against a storage
/// model: filters reference real columns, search columns are resolved, and
/// the soft-delete filter is decided.
#[derive(Clone, Debug)]
pub struct ListQuery {
    pub filters: Vec<(String, Value)>,
    pub search: Option<SearchSpec>,
    pub exclude_deleted: bool,
    /// (column, descending); ties always broken by id ascending.
    pub order: Option<(String, bool)>,
    pub skip: u32,
    pub limit: u32,
}

/// Whether a record matches the query's filters, search, and soft-delete
/// visibility. Pagination and ordering are not part of matching.
pub fn matches(record: &Value, query: &ListQuery) -> bool {
    if query.exclude_deleted
        && record
            .get("is_deleted")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    {
        return false;
    }
    for (column, expected) in &query.filters {
        if record.get(column) != Some(expected) {
            return false;
        }
    }
    if let Some(search) = &query.search {
        let needle = search.term.to_lowercase();
        let hit = search.columns.iter().any(|col| {
            record
                .get(col)
                .and_then(Value::as_str)
                .map(|s| s.to_lowercase().contains(&needle))
                .unwrap_or(false)
        });
        if !hit {
            return false;
        }
    }
    true
}

/// Sort records by the query's order column (id ascending when none), with
/// ties broken by id ascending for deterministic pagination.
pub fn sort(records: &mut [Value], query: &ListQuery) {
    records.sort_by(|a, b| {
        let by_id = |r: &Value| r.get("id").and_then(Value::as_i64).unwrap_or(0);
        match &query.order {
            Some((column, desc)) => {
                let ord = compare_values(a.get(column), b.get(column));
                let ord = if *desc { ord.reverse() } else { ord };
                ord.then_with(|| by_id(a).cmp(&by_id(b)))
            }
            None => by_id(a).cmp(&by_id(b)),
        }
    });
}

/// Total order over JSON scalars: null sorts last, mixed kinds sort by kind.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(v: Option<&Value>) -> u8 {
        match v {
            Some(Value::Bool(_)) => 0,
            Some(Value::Number(_)) => 1,
            Some(Value::String(_)) => 2,
            Some(Value::Array(_)) | Some(Value::Object(_)) => 3,
            Some(Value::Null) | None => 4,
        }
    }
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

/// Apply skip/limit to an already-sorted vector.
pub fn paginate(records: Vec<Value>, query: &ListQuery) -> Vec<Value> {
    records
        .into_iter()
        .skip(query.skip as usize)
        .take(query.limit as usize)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn query() -> ListQuery {
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
    fn soft_deleted_records_are_hidden_by_default() {
        let alive = json!({"id": 1, "is_deleted": false});
        let gone = json!({"id": 2, "is_deleted": true});
        let q = query();
        assert!(matches(&alive, &q));
        assert!(!matches(&gone, &q));

        let mut q = q;
        q.exclude_deleted = false;
        assert!(matches(&gone, &q));
    }

    #[test]
    fn filters_are_anded() {
        let record = json!({"id": 1, "status": "todo", "priority": "high"});
        let mut q = query();
        q.filters = vec![
            ("status".into(), json!("todo")),
            ("priority".into(), json!("high")),
        ];
        assert!(matches(&record, &q));
        q.filters.push(("status".into(), json!("done")));
        assert!(!matches(&record, &q));
    }

    #[test]
    fn search_is_case_insensitive_substring() {
        let record = json!({"id": 1, "title": "Fix the Parser", "notes": null});
        let mut q = query();
        q.search = Some(SearchSpec {
            term: "parser".into(),
            columns: vec!["title".into(), "notes".into()],
        });
        assert!(matches(&record, &q));
        q.search.as_mut().unwrap().term = "compiler".into();
        assert!(!matches(&record, &q));
    }

    #[test]
    fn sort_breaks_ties_by_id_ascending() {
        let mut records = vec![
            json!({"id": 3, "rank": 1}),
            json!({"id": 1, "rank": 2}),
            json!({"id": 2, "rank": 1}),
        ];
        let mut q = query();
        q.order = Some(("rank".into(), false));
        sort(&mut records, &q);
        let ids: Vec<i64> = records.iter().map(|r| r["id"].as_i64().unwrap()).collect();
        assert_eq!(ids, vec![2, 3, 1]);
    }

    #[test]
    fn descending_reverses_column_but_not_tiebreak() {
        let mut records = vec![
            json!({"id": 2, "rank": 1}),
            json!({"id": 1, "rank": 1}),
            json!({"id": 3, "rank": 5}),
        ];
        let mut q = query();
        q.order = Some(("rank".into(), true));
        sort(&mut records, &q);
        let ids: Vec<i64> = records.iter().map(|r| r["id"].as_i64().unwrap()).collect();
        assert_eq!(ids, vec![3, 1, 2]);
    }

    #[test]
    fn nulls_sort_last() {
        let mut records = vec![
            json!({"id": 1, "due": null}),
            json!({"id": 2, "due": "2026-01-01"}),
        ];
        let mut q = query();
        q.order = Some(("due".into(), false));
        sort(&mut records, &q);
        assert_eq!(records[0]["id"], 2);
    }

    #[test]
    fn paginate_applies_skip_then_limit() {
        let records: Vec<Value> = (1..=5).map(|i| json!({"id": i})).collect();
        let mut q = query();
        q.skip = 3;
        q.limit = 10;
        let page = paginate(records, &q);
        assert_eq!(page.len(), 2);
        assert_eq!(page[0]["id"], 4);
    }

    #[test]
    fn limit_is_clamped() {
        let params = QueryParams {
            limit: 10_000,
            ..QueryParams::default()
        };
        assert_eq!(params.clamped_limit(), MAX_LIMIT);
        let params = QueryParams {
            limit: 0,
            ..QueryParams::default()
        };
        assert_eq!(params.clamped_limit(), 1);
    }
}
