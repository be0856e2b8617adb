//! Field-level definition types: the closed set of field types, relationship
//! descriptors, and custom validation rules.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Supported field types. Closed set: the storage mapper has a fixed mapping
/// entry for every variant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    String,
    Text,
    Integer,
    Float,
    Boolean,
    Date,
    Datetime,
    Time,
    Email,
    Url,
    Uuid,
    Json,
    Decimal,
    Currency,
    Choice,
    MultiChoice,
    File,
    Image,
}

impl FieldType {
    /// Whether the field is backed by a textual column and therefore
    /// participates in substring search by default.
    pub fn is_textual(self) -> bool {
        matches!(
            self,
            FieldType::String
                | FieldType::Text
                | FieldType::Email
                | FieldType::Url
                | FieldType::Choice
                | FieldType::File
                | FieldType::Image
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipKind {
    OneToOne,
    OneToMany,
    ManyToOne,
    ManyToMany,
}

/// Per-field access hint. The core records it; enforcement belongs to the
/// surrounding application.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionLevel {
    #[default]
    Public,
    ReadOnly,
    AdminOnly,
    OwnerOnly,
    Private,
}

/// One allowed value for a choice / multi-choice field.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Choice {
    pub value: String,
    #[serde(default)]
    pub label: Option<String>,
}

impl Choice {
    pub fn new(value: impl Into<String>) -> Self {
        Choice {
            value: value.into(),
            label: None,
        }
    }
}

/// Custom validation rule attached to a field. `regex` is the only rule kind
/// the mapper compiles today; unknown kinds are rejected at mapping time.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ValidationSpec {
    pub rule: String,
    pub value: Value,
    #[serde(default)]
    pub message: Option<String>,
}

/// One attribute of an entity.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub name: String,
    pub field_type: FieldType,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub unique: bool,
    #[serde(default)]
    pub indexed: bool,
    #[serde(default)]
    pub default: Option<Value>,

    #[serde(default)]
    pub min_length: Option<u32>,
    #[serde(default)]
    pub max_length: Option<u32>,
    #[serde(default)]
    pub min_value: Option<f64>,
    #[serde(default)]
    pub max_value: Option<f64>,

    #[serde(default)]
    pub choices: Option<Vec<Choice>>,

    #[serde(default)]
    pub relationship_kind: Option<RelationshipKind>,
    #[serde(default)]
    pub related_schema: Option<String>,
    #[serde(default)]
    pub foreign_key: Option<String>,

    #[serde(default)]
    pub permission_level: PermissionLevel,
    #[serde(default)]
    pub validation_rules: Vec<ValidationSpec>,
}

impl FieldDefinition {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        FieldDefinition {
            name: name.into(),
            field_type,
            label: None,
            description: None,
            required: false,
            unique: false,
            indexed: false,
            default: None,
            min_length: None,
            max_length: None,
            min_value: None,
            max_value: None,
            choices: None,
            relationship_kind: None,
            related_schema: None,
            foreign_key: None,
            permission_level: PermissionLevel::Public,
            validation_rules: Vec::new(),
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn indexed(mut self) -> Self {
        self.indexed = true;
        self
    }

    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.description = Some(text.into());
        self
    }

    pub fn default_value(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    pub fn max_length(mut self, n: u32) -> Self {
        self.max_length = Some(n);
        self
    }

    pub fn min_length(mut self, n: u32) -> Self {
        self.min_length = Some(n);
        self
    }

    pub fn min_value(mut self, n: f64) -> Self {
        self.min_value = Some(n);
        self
    }

    pub fn max_value(mut self, n: f64) -> Self {
        self.max_value = Some(n);
        self
    }

    pub fn choices<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.choices = Some(values.into_iter().map(|v| Choice::new(v)).collect());
        self
    }

    pub fn relationship(
        mut self,
        kind: RelationshipKind,
        related_schema: impl Into<String>,
    ) -> Self {
        self.relationship_kind = Some(kind);
        self.related_schema = Some(related_schema.into());
        self
    }

    pub fn regex_rule(mut self, pattern: impl Into<String>, message: Option<String>) -> Self {
        self.validation_rules.push(ValidationSpec {
            rule: "regex".into(),
            value: Value::String(pattern.into()),
            message,
        });
        self
    }

    pub fn is_relationship(&self) -> bool {
        self.relationship_kind.is_some()
    }

    /// Writable foreign-key column backing a to-one relationship: the
    /// explicit `foreign_key` name, or `{name}_id`. Collection-side
    /// relationships carry no column on this schema.
    pub fn foreign_key_column(&self) -> Option<String> {
        match self.relationship_kind {
            Some(RelationshipKind::ManyToOne) | Some(RelationshipKind::OneToOne) => Some(
                self.foreign_key
                    .clone()
                    .unwrap_or_else(|| format!("{}_id", self.name)),
            ),
            _ => None,
        }
    }
}
