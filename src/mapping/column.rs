//! Storage-mapped model: typed columns, indexes, and constraints derived from
//! a schema definition. One `StorageModel` per registered schema.

use crate::mapping::validators::FieldValidator;
use serde_json::Value;

/// Storage primitive a field type maps to. Rendered as PostgreSQL syntax but
/// deliberately small enough for any relational backend.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ColumnType {
    VarChar(u32),
    Text,
    BigInt,
    Double,
    Boolean,
    Date,
    Timestamptz,
    Time,
    Uuid,
    Jsonb,
    Numeric { precision: u8, scale: u8 },
}

impl ColumnType {
    /// Type name used in DDL and `$n::type` binding casts.
    pub fn sql_type(&self) -> String {
        match self {
            ColumnType::VarChar(n) => format!("varchar({})", n),
            ColumnType::Text => "text".into(),
            ColumnType::BigInt => "bigint".into(),
            ColumnType::Double => "double precision".into(),
            ColumnType::Boolean => "boolean".into(),
            ColumnType::Date => "date".into(),
            ColumnType::Timestamptz => "timestamptz".into(),
            ColumnType::Time => "time".into(),
            ColumnType::Uuid => "uuid".into(),
            ColumnType::Jsonb => "jsonb".into(),
            ColumnType::Numeric { precision, scale } => {
                format!("numeric({},{})", precision, scale)
            }
        }
    }

    /// Bare type name for parameter casts (no length/precision args).
    pub fn cast_type(&self) -> &'static str {
        match self {
            ColumnType::VarChar(_) => "varchar",
            ColumnType::Text => "text",
            ColumnType::BigInt => "bigint",
            ColumnType::Double => "double precision",
            ColumnType::Boolean => "boolean",
            ColumnType::Date => "date",
            ColumnType::Timestamptz => "timestamptz",
            ColumnType::Time => "time",
            ColumnType::Uuid => "uuid",
            ColumnType::Jsonb => "jsonb",
            ColumnType::Numeric { .. } => "numeric",
        }
    }

    pub fn is_textual(&self) -> bool {
        matches!(self, ColumnType::VarChar(_) | ColumnType::Text)
    }
}

#[derive(Clone, Debug)]
pub struct ColumnSpec {
    pub name: String,
    pub column_type: ColumnType,
    pub nullable: bool,
    pub unique: bool,
    pub indexed: bool,
    pub default: Option<Value>,
    /// Referenced table for foreign-key columns (always references its `id`).
    pub references: Option<String>,
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        ColumnSpec {
            name: name.into(),
            column_type,
            nullable: true,
            unique: false,
            indexed: false,
            default: None,
            references: None,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexSpec {
    pub name: String,
    pub column: String,
}

/// Composite unique constraint covering more than one unique field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UniqueConstraint {
    pub name: String,
    pub columns: Vec<String>,
}

/// The concrete storage shape for one schema, built once at registration.
#[derive(Clone, Debug)]
pub struct StorageModel {
    pub schema_name: String,
    pub table_name: String,
    /// All columns in declaration order: id first, user fields, then mixins.
    pub columns: Vec<ColumnSpec>,
    pub indexes: Vec<IndexSpec>,
    pub composite_unique: Option<UniqueConstraint>,
    /// Per-field validator chains, declaration order, short-circuit on first
    /// failure.
    pub validators: Vec<FieldValidator>,
    /// Columns participating in substring search when no explicit list is
    /// given (textual user fields).
    pub searchable: Vec<String>,
}

impl StorageModel {
    pub fn column(&self, name: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn validators_for(&self, field: &str) -> Option<&FieldValidator> {
        self.validators.iter().find(|v| v.field == field)
    }
}
