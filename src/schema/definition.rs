//! Schema definitions: a named, versioned, validated description of one
//! entity. Construction goes through [`SchemaDefinition::build`]; a definition
//! that reaches the registry is immutable for its registered lifetime.

use crate::case::derive_table_name;
use crate::error::SchemaError;
use crate::schema::field::{FieldDefinition, FieldType};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};

/// Field names owned by the engine; user fields may not shadow them.
pub const RESERVED_FIELD_NAMES: [&str; 5] =
    ["id", "created_at", "updated_at", "is_deleted", "deleted_at"];

/// Per-operation visibility controls for generated routes.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "default_true")]
    pub require_auth: bool,
    /// Operations that are explicitly public ("list", "get", "count", ...).
    #[serde(default)]
    pub public_routes: Vec<String>,
    /// Operations that are explicitly protected. Wins over everything else.
    #[serde(default)]
    pub protected_routes: Vec<String>,
    #[serde(default)]
    pub read_public: bool,
    #[serde(default = "default_true")]
    pub write_protected: bool,
}

fn default_true() -> bool {
    true
}

impl Default for AuthConfig {
    fn default() -> Self {
        AuthConfig {
            require_auth: true,
            public_routes: Vec::new(),
            protected_routes: Vec::new(),
            read_public: false,
            write_protected: true,
        }
    }
}

/// Feature flags controlling which capability mixins the storage mapper adds.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct SchemaFeatures {
    #[serde(default = "default_true")]
    pub timestamps: bool,
    #[serde(default = "default_true")]
    pub audit: bool,
    #[serde(default = "default_true")]
    pub soft_delete: bool,
}

impl Default for SchemaFeatures {
    fn default() -> Self {
        SchemaFeatures {
            timestamps: true,
            audit: true,
            soft_delete: true,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SchemaDefinition {
    pub name: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,

    pub fields: Vec<FieldDefinition>,

    /// Explicit table name; derived from the schema name when absent.
    #[serde(default)]
    pub table_name: Option<String>,
    /// Plural path segment for API endpoints; derived when absent.
    #[serde(default)]
    pub plural_name: Option<String>,

    #[serde(default)]
    pub features: SchemaFeatures,
    #[serde(default)]
    pub auth: AuthConfig,

    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

fn default_version() -> String {
    "1.0.0".into()
}

impl SchemaDefinition {
    /// Construct and validate a definition. Fails fast on a malformed schema;
    /// nothing partial ever escapes.
    pub fn build(
        name: impl Into<String>,
        fields: Vec<FieldDefinition>,
    ) -> Result<Self, SchemaError> {
        let def = SchemaDefinition {
            name: name.into(),
            version: default_version(),
            title: None,
            description: None,
            fields,
            table_name: None,
            plural_name: None,
            features: SchemaFeatures::default(),
            auth: AuthConfig::default(),
            tags: Vec::new(),
            metadata: HashMap::new(),
        };
        def.validate()?;
        Ok(def)
    }

    /// Re-validate a definition, e.g. one deserialized from JSON. Serde fills
    /// in defaults but enforces none of the structural invariants.
    pub fn validate(&self) -> Result<(), SchemaError> {
        if self.name.is_empty()
            || !self
                .name
                .chars()
                .enumerate()
                .all(|(i, c)| c == '_' || if i == 0 { c.is_alphabetic() } else { c.is_alphanumeric() })
        {
            return Err(SchemaError::InvalidName(self.name.clone()));
        }
        if self.name.starts_with('_') {
            return Err(SchemaError::ReservedName(self.name.clone()));
        }
        if self.fields.is_empty() {
            return Err(SchemaError::NoFields);
        }
        let mut seen = HashSet::new();
        for field in &self.fields {
            if !seen.insert(field.name.as_str()) {
                return Err(SchemaError::DuplicateField(field.name.clone()));
            }
            if RESERVED_FIELD_NAMES.contains(&field.name.as_str()) {
                return Err(SchemaError::ReservedField(field.name.clone()));
            }
            if matches!(field.field_type, FieldType::Choice | FieldType::MultiChoice)
                && field.choices.as_ref().map(|c| c.is_empty()).unwrap_or(true)
            {
                return Err(SchemaError::MissingChoices(field.name.clone()));
            }
            // Relationship descriptor is all-or-nothing.
            if field.relationship_kind.is_some() != field.related_schema.is_some() {
                return Err(SchemaError::IncompleteRelationship(field.name.clone()));
            }
        }
        Ok(())
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_features(mut self, features: SchemaFeatures) -> Self {
        self.features = features;
        self
    }

    pub fn with_auth(mut self, auth: AuthConfig) -> Self {
        self.auth = auth;
        self
    }

    pub fn with_plural_name(mut self, plural: impl Into<String>) -> Self {
        self.plural_name = Some(plural.into());
        self
    }

    /// Storage table name: explicit or derived (snake_case + pluralize).
    pub fn storage_name(&self) -> String {
        self.table_name
            .clone()
            .unwrap_or_else(|| derive_table_name(&self.name))
    }

    /// Path segment used for API endpoints, e.g. "tasks".
    pub fn api_plural(&self) -> String {
        self.plural_name
            .clone()
            .unwrap_or_else(|| derive_table_name(&self.name))
    }

    pub fn get_field(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn required_fields(&self) -> impl Iterator<Item = &FieldDefinition> {
        self.fields.iter().filter(|f| f.required)
    }

    pub fn relationship_fields(&self) -> impl Iterator<Item = &FieldDefinition> {
        self.fields.iter().filter(|f| f.is_relationship())
    }
}
