//! Storage mapper: turns a validated schema definition into a concrete
//! storage model. Idempotent and cached by schema name; mapping either fully
//! succeeds or leaves no trace (fail-fast, no partial registration).

use crate::error::MappingError;
use crate::mapping::column::{ColumnSpec, ColumnType, IndexSpec, StorageModel, UniqueConstraint};
use crate::mapping::validators::FieldValidator;
use crate::schema::{FieldDefinition, FieldType, RelationshipKind, SchemaDefinition};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

#[derive(Default)]
pub struct StorageMapper {
    cache: HashMap<String, Arc<StorageModel>>,
    /// Index and constraint names already claimed by cached models, so a new
    /// registration cannot silently shadow an existing one.
    index_names: HashSet<String>,
    constraint_names: HashSet<String>,
}

impl StorageMapper {
    pub fn new() -> Self {
        StorageMapper::default()
    }

    /// Map a schema to its storage model. `known_tables` maps every schema
    /// name the registry knows about (including the one being mapped) to its
    /// table name; relationship fields must resolve against it.
    pub fn map(
        &mut self,
        schema: &SchemaDefinition,
        known_tables: &HashMap<String, String>,
    ) -> Result<Arc<StorageModel>, MappingError> {
        if let Some(model) = self.cache.get(&schema.name) {
            return Ok(Arc::clone(model));
        }

        let model = build_model(schema, known_tables)?;

        // Claim names only after the whole model built cleanly.
        for idx in &model.indexes {
            if !self.index_names.insert(idx.name.clone()) {
                return Err(MappingError::IndexNameCollision(idx.name.clone()));
            }
        }
        if let Some(uq) = &model.composite_unique {
            if !self.constraint_names.insert(uq.name.clone()) {
                for idx in &model.indexes {
                    self.index_names.remove(&idx.name);
                }
                return Err(MappingError::ConstraintNameCollision(uq.name.clone()));
            }
        }

        let model = Arc::new(model);
        self.cache.insert(schema.name.clone(), Arc::clone(&model));
        Ok(model)
    }

    pub fn get(&self, schema_name: &str) -> Option<Arc<StorageModel>> {
        self.cache.get(schema_name).cloned()
    }

    /// Evict a schema's model and release its claimed index/constraint names.
    pub fn remove(&mut self, schema_name: &str) -> bool {
        match self.cache.remove(schema_name) {
            Some(model) => {
                for idx in &model.indexes {
                    self.index_names.remove(&idx.name);
                }
                if let Some(uq) = &model.composite_unique {
                    self.constraint_names.remove(&uq.name);
                }
                true
            }
            None => false,
        }
    }
}

fn build_model(
    schema: &SchemaDefinition,
    known_tables: &HashMap<String, String>,
) -> Result<StorageModel, MappingError> {
    let table_name = schema.storage_name();
    let mut columns = vec![ColumnSpec::new("id", ColumnType::BigInt).not_null()];
    let mut validators = Vec::new();
    let mut searchable = Vec::new();

    for field in &schema.fields {
        if field.is_relationship() {
            if let Some(col) = relationship_column(field, known_tables)? {
                columns.push(col);
            }
            continue;
        }

        let mut col = ColumnSpec::new(&field.name, column_type_for(field));
        col.nullable = !field.required;
        col.unique = field.unique;
        col.indexed = field.indexed;
        col.default = field.default.clone();
        if col.column_type.is_textual() {
            searchable.push(field.name.clone());
        }
        columns.push(col);

        if let Some(validator) = FieldValidator::for_field(field)? {
            validators.push(validator);
        }
    }

    append_mixin_columns(schema, &mut columns);

    // One index per indexed field, plus a composite unique constraint when
    // more than one field is marked unique.
    let mut indexes = Vec::new();
    let mut seen_index_names = HashSet::new();
    for field in schema.fields.iter().filter(|f| f.indexed && !f.is_relationship()) {
        let name = format!("idx_{}_{}", table_name, field.name);
        if !seen_index_names.insert(name.clone()) {
            return Err(MappingError::IndexNameCollision(name));
        }
        indexes.push(IndexSpec {
            name,
            column: field.name.clone(),
        });
    }

    let unique_fields: Vec<String> = schema
        .fields
        .iter()
        .filter(|f| f.unique && !f.is_relationship())
        .map(|f| f.name.clone())
        .collect();
    let composite_unique = if unique_fields.len() > 1 {
        Some(UniqueConstraint {
            name: format!("uq_{}", table_name),
            columns: unique_fields,
        })
    } else {
        None
    };

    Ok(StorageModel {
        schema_name: schema.name.clone(),
        table_name,
        columns,
        indexes,
        composite_unique,
        validators,
        searchable,
    })
}

/// Fixed field-type to storage-primitive table.
fn column_type_for(field: &FieldDefinition) -> ColumnType {
    match field.field_type {
        FieldType::String => ColumnType::VarChar(field.max_length.unwrap_or(255)),
        FieldType::Text => ColumnType::Text,
        FieldType::Integer => ColumnType::BigInt,
        FieldType::Float => ColumnType::Double,
        FieldType::Boolean => ColumnType::Boolean,
        FieldType::Date => ColumnType::Date,
        FieldType::Datetime => ColumnType::Timestamptz,
        FieldType::Time => ColumnType::Time,
        FieldType::Email => ColumnType::VarChar(255),
        FieldType::Url => ColumnType::VarChar(2048),
        FieldType::Uuid => ColumnType::Uuid,
        FieldType::Json | FieldType::MultiChoice => ColumnType::Jsonb,
        FieldType::Decimal | FieldType::Currency => ColumnType::Numeric {
            precision: 10,
            scale: 2,
        },
        FieldType::Choice => ColumnType::VarChar(100),
        FieldType::File | FieldType::Image => ColumnType::VarChar(500),
    }
}

/// many_to_one / one_to_one carry a foreign-key column; one_to_many lives on
/// the other side; many_to_many would need an association table and is
/// rejected until that exists.
fn relationship_column(
    field: &FieldDefinition,
    known_tables: &HashMap<String, String>,
) -> Result<Option<ColumnSpec>, MappingError> {
    let kind = field
        .relationship_kind
        .expect("caller checks is_relationship");
    let related = field
        .related_schema
        .as_deref()
        .expect("schema validation guarantees related_schema");

    let related_table = known_tables
        .get(related)
        .ok_or_else(|| MappingError::UnknownRelatedSchema {
            field: field.name.clone(),
            related: related.to_string(),
        })?;

    match kind {
        RelationshipKind::ManyToOne | RelationshipKind::OneToOne => {
            let name = field
                .foreign_key_column()
                .expect("to-one relationships carry a foreign-key column");
            let mut col = ColumnSpec::new(name, ColumnType::BigInt);
            col.nullable = !field.required;
            col.references = Some(related_table.clone());
            Ok(Some(col))
        }
        RelationshipKind::OneToMany => Ok(None),
        RelationshipKind::ManyToMany => {
            Err(MappingError::UnsupportedRelationship(field.name.clone()))
        }
    }
}

/// Capability mixins selected by the schema's feature flags. Free-form
/// metadata columns are always present on generated models.
fn append_mixin_columns(schema: &SchemaDefinition, columns: &mut Vec<ColumnSpec>) {
    if schema.features.timestamps {
        columns.push(
            ColumnSpec::new("created_at", ColumnType::Timestamptz)
                .not_null()
                .with_default(Value::String("now()".into())),
        );
        columns.push(ColumnSpec::new("updated_at", ColumnType::Timestamptz));
    }
    if schema.features.audit {
        columns.push(ColumnSpec::new("created_by_id", ColumnType::BigInt));
        columns.push(ColumnSpec::new("updated_by_id", ColumnType::BigInt));
    }
    if schema.features.soft_delete {
        columns.push(
            ColumnSpec::new("is_deleted", ColumnType::Boolean)
                .not_null()
                .with_default(Value::Bool(false)),
        );
        columns.push(ColumnSpec::new("deleted_at", ColumnType::Timestamptz));
    }
    columns.push(ColumnSpec::new("metadata_json", ColumnType::Jsonb));
    columns.push(ColumnSpec::new("tags", ColumnType::Jsonb));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldDefinition;

    fn known(names: &[&str]) -> HashMap<String, String> {
        names
            .iter()
            .map(|n| (n.to_string(), crate::case::derive_table_name(n)))
            .collect()
    }

    fn task_schema() -> SchemaDefinition {
        SchemaDefinition::build(
            "Task",
            vec![
                FieldDefinition::new("title", FieldType::String)
                    .required()
                    .max_length(200)
                    .indexed(),
                FieldDefinition::new("email", FieldType::Email).unique(),
                FieldDefinition::new("estimate", FieldType::Float),
            ],
        )
        .unwrap()
    }

    #[test]
    fn maps_field_types_to_storage_primitives() {
        let mut mapper = StorageMapper::new();
        let model = mapper.map(&task_schema(), &known(&["Task"])).unwrap();
        assert_eq!(model.table_name, "tasks");
        assert_eq!(
            model.column("title").unwrap().column_type,
            ColumnType::VarChar(200)
        );
        assert!(!model.column("title").unwrap().nullable);
        assert_eq!(
            model.column("estimate").unwrap().column_type,
            ColumnType::Double
        );
        assert!(model.column("email").unwrap().unique);
    }

    #[test]
    fn mixin_columns_follow_feature_flags() {
        let mut mapper = StorageMapper::new();
        let model = mapper.map(&task_schema(), &known(&["Task"])).unwrap();
        for name in ["id", "created_at", "updated_at", "created_by_id", "is_deleted", "deleted_at"] {
            assert!(model.has_column(name), "missing {}", name);
        }

        let mut schema = task_schema();
        schema.features.soft_delete = false;
        schema.features.audit = false;
        let mut mapper = StorageMapper::new();
        let model = mapper.map(&schema, &known(&["Task"])).unwrap();
        assert!(!model.has_column("is_deleted"));
        assert!(!model.has_column("created_by_id"));
        assert!(model.has_column("created_at"));
    }

    #[test]
    fn mapping_is_cached_by_schema_name() {
        let mut mapper = StorageMapper::new();
        let schema = task_schema();
        let a = mapper.map(&schema, &known(&["Task"])).unwrap();
        let b = mapper.map(&schema, &known(&["Task"])).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn remove_releases_index_names() {
        let mut mapper = StorageMapper::new();
        let schema = task_schema();
        mapper.map(&schema, &known(&["Task"])).unwrap();
        assert!(mapper.remove("Task"));
        assert!(!mapper.remove("Task"));
        // Same schema maps again without a name collision.
        mapper.map(&schema, &known(&["Task"])).unwrap();
    }

    #[test]
    fn many_to_one_adds_foreign_key_column() {
        let schema = SchemaDefinition::build(
            "Order",
            vec![
                FieldDefinition::new("total", FieldType::Currency).required(),
                FieldDefinition::new("customer", FieldType::Integer)
                    .relationship(RelationshipKind::ManyToOne, "Customer"),
            ],
        )
        .unwrap();
        let mut mapper = StorageMapper::new();
        let model = mapper
            .map(&schema, &known(&["Order", "Customer"]))
            .unwrap();
        let fk = model.column("customer_id").unwrap();
        assert_eq!(fk.references.as_deref(), Some("customers"));
        assert_eq!(fk.column_type, ColumnType::BigInt);
    }

    #[test]
    fn relationship_to_unknown_schema_fails() {
        let schema = SchemaDefinition::build(
            "Order",
            vec![
                FieldDefinition::new("total", FieldType::Currency),
                FieldDefinition::new("customer", FieldType::Integer)
                    .relationship(RelationshipKind::ManyToOne, "Customer"),
            ],
        )
        .unwrap();
        let mut mapper = StorageMapper::new();
        let err = mapper.map(&schema, &known(&["Order"])).unwrap_err();
        assert!(matches!(err, MappingError::UnknownRelatedSchema { .. }));
        // Fail-fast: nothing cached.
        assert!(mapper.get("Order").is_none());
    }

    #[test]
    fn many_to_many_is_rejected() {
        let schema = SchemaDefinition::build(
            "Post",
            vec![
                FieldDefinition::new("title", FieldType::String).required(),
                FieldDefinition::new("categories", FieldType::Integer)
                    .relationship(RelationshipKind::ManyToMany, "Category"),
            ],
        )
        .unwrap();
        let mut mapper = StorageMapper::new();
        let err = mapper
            .map(&schema, &known(&["Post", "Category"]))
            .unwrap_err();
        assert!(matches!(err, MappingError::UnsupportedRelationship(_)));
    }

    #[test]
    fn composite_unique_for_multiple_unique_fields() {
        let schema = SchemaDefinition::build(
            "Account",
            vec![
                FieldDefinition::new("email", FieldType::Email).unique(),
                FieldDefinition::new("handle", FieldType::String).unique(),
            ],
        )
        .unwrap();
        let mut mapper = StorageMapper::new();
        let model = mapper.map(&schema, &known(&["Account"])).unwrap();
        let uq = model.composite_unique.as_ref().unwrap();
        assert_eq!(uq.columns, vec!["email".to_string(), "handle".to_string()]);
    }

    #[test]
    fn searchable_covers_textual_fields_only() {
        let mut mapper = StorageMapper::new();
        let model = mapper.map(&task_schema(), &known(&["Task"])).unwrap();
        assert_eq!(model.searchable, vec!["title".to_string(), "email".to_string()]);
    }
}
