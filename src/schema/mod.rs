//! Schema Model: immutable, validated descriptions of entities.

pub mod definition;
pub mod field;
pub mod presets;

pub use definition::{AuthConfig, SchemaDefinition, SchemaFeatures, RESERVED_FIELD_NAMES};
pub use field::{
    Choice, FieldDefinition, FieldType, PermissionLevel, RelationshipKind, ValidationSpec,
};
