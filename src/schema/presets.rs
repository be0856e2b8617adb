//! Reusable field definitions for quick schema assembly.

use crate::schema::field::{FieldDefinition, FieldType};
use serde_json::Value;

pub fn name_field() -> FieldDefinition {
    FieldDefinition::new("name", FieldType::String)
        .required()
        .indexed()
        .max_length(255)
        .description("Name of the item")
}

pub fn email_field() -> FieldDefinition {
    FieldDefinition::new("email", FieldType::Email)
        .required()
        .unique()
        .indexed()
        .description("Email address")
}

pub fn status_field() -> FieldDefinition {
    FieldDefinition::new("status", FieldType::Choice)
        .choices(["active", "inactive", "pending"])
        .default_value(Value::String("active".into()))
        .indexed()
        .description("Current status")
}

pub fn description_field() -> FieldDefinition {
    FieldDefinition::new("description", FieldType::Text).description("Detailed description")
}
