//! Consistency checks for schema registries.
//!
//! The encoder and decoder resolve reference and embedded targets lazily and
//! report an unknown target only when a document actually reaches it.
//! Running [`validate_registry`] once at startup surfaces those problems
//! before any document is processed.

use rustc_hash::FxHashSet;

use crate::error::SchemaError;
use crate::model::{FieldType, Schema, SchemaRegistry, ID_KEY};

/// Validates every schema in the registry.
///
/// Schemas are checked in name order so the reported error is stable.
pub fn validate_registry(registry: &SchemaRegistry) -> Result<(), SchemaError> {
    let mut schemas = registry.iter().collect::<Vec<_>>();
    schemas.sort_by(|a, b| a.name.cmp(&b.name));
    for schema in schemas {
        validate_schema(schema, registry)?;
    }
    Ok(())
}

/// Validates one schema against the registry it will be used with.
///
/// Checks:
/// - field names are unique
/// - the primary key is a declared `ObjectId` field
/// - no other field is named `id`, the key the primary key is emitted under
/// - every reference and embedded target is registered
pub fn validate_schema(schema: &Schema, registry: &SchemaRegistry) -> Result<(), SchemaError> {
    let mut seen = FxHashSet::default();
    for field in &schema.fields {
        if !seen.insert(field.name.as_str()) {
            return Err(SchemaError::DuplicateField {
                schema: schema.name.clone(),
                field: field.name.clone(),
            });
        }
    }

    if let Some(pk) = &schema.primary_key {
        match schema.field(pk) {
            None => {
                return Err(SchemaError::PrimaryKeyUndeclared {
                    schema: schema.name.clone(),
                    field: pk.clone(),
                });
            }
            Some(field) if field.field_type != FieldType::ObjectId => {
                return Err(SchemaError::PrimaryKeyNotObjectId {
                    schema: schema.name.clone(),
                    field: pk.clone(),
                });
            }
            Some(_) => {}
        }

        if let Some(field) = schema
            .fields
            .iter()
            .find(|f| f.name == ID_KEY && !schema.is_primary_key(&f.name))
        {
            return Err(SchemaError::IdKeyCollision {
                schema: schema.name.clone(),
                field: field.name.clone(),
            });
        }
    }

    for field in &schema.fields {
        let target = match field.field_type.element_type() {
            FieldType::Embedded(target) => target,
            FieldType::Reference(reference) => &reference.target,
            _ => continue,
        };
        if !registry.contains(target) {
            return Err(SchemaError::UnknownTarget {
                schema: schema.name.clone(),
                field: field.name.clone(),
                target: target.clone(),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FieldDescriptor, ReferenceField, SchemaBuilder};

    #[test]
    fn test_valid_registry() {
        let registry: SchemaRegistry = [
            SchemaBuilder::embedded("address").string("city").build(),
            SchemaBuilder::document("users")
                .embedded_field("home", "address")
                .reference_list("friends", ReferenceField::plain("users"))
                .build(),
        ]
        .into_iter()
        .collect();
        assert!(validate_registry(&registry).is_ok());
    }

    #[test]
    fn test_unknown_target() {
        let registry: SchemaRegistry = [SchemaBuilder::document("books")
            .reference("author", ReferenceField::follow("authors"))
            .build()]
        .into_iter()
        .collect();
        assert_eq!(
            validate_registry(&registry),
            Err(SchemaError::UnknownTarget {
                schema: "books".to_string(),
                field: "author".to_string(),
                target: "authors".to_string(),
            })
        );
    }

    #[test]
    fn test_primary_key_checks() {
        let mut wrong_type = SchemaBuilder::embedded("things").string("slug").build();
        wrong_type.primary_key = Some("slug".to_string());
        let registry: SchemaRegistry = [wrong_type].into_iter().collect();
        assert!(matches!(
            validate_registry(&registry),
            Err(SchemaError::PrimaryKeyNotObjectId { .. })
        ));

        let mut undeclared = SchemaBuilder::embedded("things").build();
        undeclared.primary_key = Some("_id".to_string());
        let registry: SchemaRegistry = [undeclared].into_iter().collect();
        assert!(matches!(
            validate_registry(&registry),
            Err(SchemaError::PrimaryKeyUndeclared { .. })
        ));
    }

    #[test]
    fn test_id_field_collides_with_primary_key() {
        let registry: SchemaRegistry = [SchemaBuilder::document("orders").string("id").build()]
            .into_iter()
            .collect();
        assert_eq!(
            validate_registry(&registry),
            Err(SchemaError::IdKeyCollision {
                schema: "orders".to_string(),
                field: "id".to_string(),
            })
        );

        // Fine when the primary key itself is named id, or there is no primary key
        let registry: SchemaRegistry = [
            SchemaBuilder::document("orders").primary_key("id").build(),
            SchemaBuilder::embedded("line").string("id").build(),
        ]
        .into_iter()
        .collect();
        assert!(validate_registry(&registry).is_ok());
    }

    #[test]
    fn test_duplicate_field() {
        let schema = SchemaBuilder::document("users")
            .string("name")
            .field(FieldDescriptor::new("name", FieldType::Int))
            .build();
        let registry: SchemaRegistry = [schema].into_iter().collect();
        assert!(matches!(
            validate_registry(&registry),
            Err(SchemaError::DuplicateField { .. })
        ));
    }
}
