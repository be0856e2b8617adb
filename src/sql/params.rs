//! Typed bind parameters for the PostgreSQL backend. The storage model's
//! column type picks the variant, so a uuid string lands as a native UUID
//! while an ordinary string stays text, and `produces` tells the driver the
//! wire type of each variant.

use crate::mapping::ColumnType;
use serde_json::Value;
use sqlx::encode::{Encode, IsNull};
use sqlx::postgres::{PgTypeInfo, Postgres};
use sqlx::Database;

#[derive(Clone, Debug, PartialEq)]
pub enum BindValue {
    Null,
    Bool(bool),
    I64(i64),
    F64(f64),
    Text(String),
    Uuid(uuid::Uuid),
    Json(Value),
}

impl BindValue {
    /// Pick the bind variant for a JSON value headed to `column`. The column
    /// type decides the ambiguous cases: only uuid columns parse their
    /// strings, and jsonb columns take any shape verbatim. A string that
    /// fails to parse as a uuid falls through as text and is rejected by the
    /// server-side cast.
    pub fn for_column(value: &Value, column: Option<&ColumnType>) -> Self {
        match column {
            Some(ColumnType::Uuid) => {
                if let Some(u) = value.as_str().and_then(|s| uuid::Uuid::parse_str(s).ok()) {
                    return BindValue::Uuid(u);
                }
            }
            Some(ColumnType::Jsonb) if !value.is_null() => {
                return BindValue::Json(value.clone());
            }
            _ => {}
        }
        match value {
            Value::Null => BindValue::Null,
            Value::Bool(b) => BindValue::Bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => BindValue::I64(i),
                None => BindValue::F64(n.as_f64().unwrap_or(0.0)),
            },
            Value::String(s) => BindValue::Text(s.clone()),
            Value::Array(_) | Value::Object(_) => BindValue::Json(value.clone()),
        }
    }
}

impl<'q> Encode<'q, Postgres> for BindValue {
    fn encode_by_ref(
        &self,
        buf: &mut <Postgres as Database>::ArgumentBuffer<'q>,
    ) -> Result<IsNull, Box<dyn std::error::Error + Send + Sync>> {
        match self {
            BindValue::Null => Ok(IsNull::Yes),
            BindValue::Bool(b) => <bool as Encode<Postgres>>::encode_by_ref(b, buf),
            BindValue::I64(n) => <i64 as Encode<Postgres>>::encode_by_ref(n, buf),
            BindValue::F64(n) => <f64 as Encode<Postgres>>::encode_by_ref(n, buf),
            BindValue::Text(s) => <String as Encode<Postgres>>::encode_by_ref(s, buf),
            BindValue::Uuid(u) => <uuid::Uuid as Encode<Postgres>>::encode_by_ref(u, buf),
            BindValue::Json(v) => <Value as Encode<Postgres>>::encode_by_ref(v, buf),
        }
    }

    fn produces(&self) -> Option<PgTypeInfo> {
        Some(match self {
            BindValue::Null | BindValue::Text(_) => PgTypeInfo::with_name("TEXT"),
            BindValue::Bool(_) => PgTypeInfo::with_name("BOOL"),
            BindValue::I64(_) => PgTypeInfo::with_name("INT8"),
            BindValue::F64(_) => PgTypeInfo::with_name("FLOAT8"),
            BindValue::Uuid(_) => PgTypeInfo::with_name("UUID"),
            BindValue::Json(_) => PgTypeInfo::with_name("JSONB"),
        })
    }
}

impl sqlx::Type<Postgres> for BindValue {
    fn type_info() -> PgTypeInfo {
        PgTypeInfo::with_name("TEXT")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn column_type_drives_the_variant() {
        let token = "0b7f3d52-8f3e-4c6a-9d25-0d4f5f9d0a11";
        assert_eq!(
            BindValue::for_column(&json!(token), Some(&ColumnType::Uuid)),
            BindValue::Uuid(token.parse().unwrap())
        );
        // The same string on a text column stays text.
        assert_eq!(
            BindValue::for_column(&json!(token), Some(&ColumnType::Text)),
            BindValue::Text(token.into())
        );
        assert_eq!(
            BindValue::for_column(&json!({"a": 1}), Some(&ColumnType::Jsonb)),
            BindValue::Json(json!({"a": 1}))
        );
        assert_eq!(
            BindValue::for_column(&json!(3), Some(&ColumnType::BigInt)),
            BindValue::I64(3)
        );
        assert_eq!(BindValue::for_column(&Value::Null, None), BindValue::Null);
    }

    #[test]
    fn malformed_uuid_string_stays_text() {
        assert_eq!(
            BindValue::for_column(&json!("not-a-uuid"), Some(&ColumnType::Uuid)),
            BindValue::Text("not-a-uuid".into())
        );
    }
}
