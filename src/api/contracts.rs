//! Request/response contract views derived once per registration. The views
//! are descriptive (served by introspection) and the response view doubles as
//! the projection applied to every outgoing record.

use crate::schema::{FieldDefinition, FieldType, SchemaDefinition};
use serde::Serialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Serialize)]
pub struct ContractField {
    pub name: String,
    pub field_type: FieldType,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// The three views of one schema: create (required honored, system fields
/// excluded), update (everything optional), response (id + schema fields +
/// enabled enterprise columns).
#[derive(Debug, Clone, Serialize)]
pub struct SchemaContracts {
    pub create: Vec<ContractField>,
    pub update: Vec<ContractField>,
    pub response: Vec<String>,
}

impl SchemaContracts {
    pub fn build(schema: &SchemaDefinition) -> Self {
        let mut create = Vec::new();
        let mut response = vec!["id".to_string()];

        for field in &schema.fields {
            let Some((name, field_type)) = writable_column(field) else {
                continue;
            };
            create.push(ContractField {
                name: name.clone(),
                field_type,
                required: field.required,
                description: field.description.clone(),
            });
            response.push(name);
        }

        let update = create
            .iter()
            .map(|f| ContractField {
                required: false,
                ..f.clone()
            })
            .collect();

        if schema.features.timestamps {
            response.push("created_at".into());
            response.push("updated_at".into());
        }
        if schema.features.audit {
            response.push("created_by_id".into());
            response.push("updated_by_id".into());
        }
        if schema.features.soft_delete {
            response.push("is_deleted".into());
            response.push("deleted_at".into());
        }

        SchemaContracts {
            create,
            update,
            response,
        }
    }

    /// Project a stored record through the response view, dropping any column
    /// outside it. Absent columns surface as null so the shape is stable.
    pub fn project(&self, record: &Value) -> Value {
        let empty = Map::new();
        let source = record.as_object().unwrap_or(&empty);
        let mut out = Map::with_capacity(self.response.len());
        for name in &self.response {
            out.insert(
                name.clone(),
                source.get(name).cloned().unwrap_or(Value::Null),
            );
        }
        Value::Object(out)
    }
}

/// The writable column behind a field: the field itself, or the foreign-key
/// column for to-one relationships. Collection-side relationships have no
/// writable column here.
fn writable_column(field: &FieldDefinition) -> Option<(String, FieldType)> {
    if !field.is_relationship() {
        return Some((field.name.clone(), field.field_type));
    }
    field
        .foreign_key_column()
        .map(|name| (name, FieldType::Integer))
}
