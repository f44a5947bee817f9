//! Builder API for ergonomic schema and document construction.
//!
//! # Example
//!
//! ```rust
//! use goodjson::model::builder::{DocumentBuilder, SchemaBuilder};
//! use goodjson::model::{FieldPolicy, ObjectId, ReferenceField};
//!
//! let schema = SchemaBuilder::document("books")
//!     .string_required("title")
//!     .string_with("isbn", FieldPolicy::exclude_encode())
//!     .reference("author", ReferenceField::plain("authors"))
//!     .build();
//!
//! let author_id = ObjectId::derived(b"author-1");
//! let book = DocumentBuilder::new("books")
//!     .id(ObjectId::derived(b"book-1"))
//!     .set("title", "Dune")
//!     .reference("author", author_id)
//!     .build();
//!
//! assert_eq!(schema.fields.len(), 4);
//! assert_eq!(book.get("title").and_then(|v| v.as_str()), Some("Dune"));
//! ```

use crate::model::{
    Capabilities, Document, FieldDescriptor, FieldPolicy, FieldType, ObjectId, ReferenceField,
    Schema, Value, DEFAULT_PRIMARY_KEY,
};

/// Builder for constructing a [`Schema`] field by field.
#[derive(Debug, Clone)]
pub struct SchemaBuilder {
    name: String,
    fields: Vec<FieldDescriptor>,
    primary_key: Option<String>,
    capabilities: Capabilities,
}

impl SchemaBuilder {
    /// Starts a top-level document schema. Declares the `_id` primary key first.
    pub fn document(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: vec![FieldDescriptor::new(DEFAULT_PRIMARY_KEY, FieldType::ObjectId)],
            primary_key: Some(DEFAULT_PRIMARY_KEY.to_string()),
            capabilities: Capabilities::default(),
        }
    }

    /// Starts an embedded document schema (no primary key).
    pub fn embedded(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            primary_key: None,
            capabilities: Capabilities::default(),
        }
    }

    /// Renames the primary key field, keeping its position.
    pub fn primary_key(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if let Some(current) = self.primary_key.take() {
            if let Some(field) = self.fields.iter_mut().find(|f| f.name == current) {
                field.name = name.clone();
            }
        } else {
            self.fields.insert(0, FieldDescriptor::new(name.clone(), FieldType::ObjectId));
        }
        self.primary_key = Some(name);
        self
    }

    /// Sets the policy of the primary key field.
    pub fn primary_key_policy(mut self, policy: FieldPolicy) -> Self {
        if let Some(pk) = &self.primary_key {
            if let Some(field) = self.fields.iter_mut().find(|f| &f.name == pk) {
                field.policy = policy;
            }
        }
        self
    }

    /// Keeps undeclared keys (dynamic document).
    pub fn dynamic(mut self) -> Self {
        self.capabilities.dynamic = true;
        self
    }

    // =========================================================================
    // Fields
    // =========================================================================

    /// Adds a fully specified field.
    pub fn field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    /// Adds an optional field of the given type.
    pub fn typed(self, name: impl Into<String>, field_type: FieldType) -> Self {
        self.field(FieldDescriptor::new(name, field_type))
    }

    /// Adds a field of the given type with an inclusion policy.
    pub fn typed_with(
        self,
        name: impl Into<String>,
        field_type: FieldType,
        policy: FieldPolicy,
    ) -> Self {
        self.field(FieldDescriptor::new(name, field_type).with_policy(policy))
    }

    pub fn string(self, name: impl Into<String>) -> Self {
        self.typed(name, FieldType::String)
    }

    pub fn string_required(self, name: impl Into<String>) -> Self {
        self.field(FieldDescriptor::new(name, FieldType::String).required())
    }

    pub fn string_with(self, name: impl Into<String>, policy: FieldPolicy) -> Self {
        self.typed_with(name, FieldType::String, policy)
    }

    pub fn int(self, name: impl Into<String>) -> Self {
        self.typed(name, FieldType::Int)
    }

    pub fn float(self, name: impl Into<String>) -> Self {
        self.typed(name, FieldType::Float)
    }

    pub fn bool(self, name: impl Into<String>) -> Self {
        self.typed(name, FieldType::Bool)
    }

    pub fn datetime(self, name: impl Into<String>) -> Self {
        self.typed(name, FieldType::DateTime)
    }

    /// Adds an embedded-document field of the named schema.
    pub fn embedded_field(self, name: impl Into<String>, schema: impl Into<String>) -> Self {
        self.typed(name, FieldType::Embedded(schema.into()))
    }

    /// Adds a reference field.
    pub fn reference(self, name: impl Into<String>, reference: ReferenceField) -> Self {
        self.typed(name, FieldType::Reference(reference))
    }

    /// Adds a list-of-references field.
    pub fn reference_list(self, name: impl Into<String>, reference: ReferenceField) -> Self {
        self.typed(name, FieldType::list(FieldType::Reference(reference)))
    }

    /// Adds a list field of the given element type.
    pub fn list(self, name: impl Into<String>, element: FieldType) -> Self {
        self.typed(name, FieldType::list(element))
    }

    // =========================================================================
    // Build
    // =========================================================================

    /// Builds the final Schema.
    pub fn build(self) -> Schema {
        Schema {
            name: self.name,
            fields: self.fields,
            primary_key: self.primary_key,
            capabilities: self.capabilities,
        }
    }
}

/// Builder for a [`Document`] instance.
#[derive(Debug, Clone)]
pub struct DocumentBuilder {
    doc: Document,
}

impl DocumentBuilder {
    /// Starts an empty document of the named schema.
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            doc: Document::new(collection),
        }
    }

    /// Assigns the document id.
    pub fn id(mut self, id: ObjectId) -> Self {
        self.doc.set_id(id);
        self
    }

    /// Sets a field value.
    pub fn set(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.doc.set(field, value);
        self
    }

    /// Sets a datetime field from epoch milliseconds.
    pub fn datetime(self, field: impl Into<String>, epoch_millis: i64) -> Self {
        self.set(field, Value::DateTime(epoch_millis))
    }

    /// Sets a reference field to a document id.
    pub fn reference(self, field: impl Into<String>, id: ObjectId) -> Self {
        self.set(field, Value::Reference(id))
    }

    /// Sets a list-of-references field.
    pub fn references(self, field: impl Into<String>, ids: impl IntoIterator<Item = ObjectId>) -> Self {
        let refs = ids.into_iter().map(Value::Reference).collect::<Vec<_>>();
        self.set(field, Value::List(refs))
    }

    /// Sets an embedded document built with a nested builder.
    pub fn embed<F>(self, field: impl Into<String>, collection: impl Into<String>, f: F) -> Self
    where
        F: FnOnce(DocumentBuilder) -> DocumentBuilder,
    {
        let embedded = f(DocumentBuilder::new(collection)).build();
        self.set(field, embedded)
    }

    /// Builds the final Document.
    pub fn build(self) -> Document {
        self.doc
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_schema_declares_primary_key_first() {
        let schema = SchemaBuilder::document("authors").string("name").build();
        assert_eq!(schema.primary_key.as_deref(), Some("_id"));
        assert_eq!(schema.fields[0].name, "_id");
        assert_eq!(schema.fields[0].field_type, FieldType::ObjectId);
        assert_eq!(schema.fields[1].name, "name");
    }

    #[test]
    fn test_rename_primary_key_keeps_position() {
        let schema = SchemaBuilder::document("authors")
            .string("name")
            .primary_key("author_id")
            .build();
        assert_eq!(schema.fields[0].name, "author_id");
        assert!(schema.is_primary_key("author_id"));
        assert!(schema.field("_id").is_none());
    }

    #[test]
    fn test_embedded_schema_has_no_primary_key() {
        let schema = SchemaBuilder::embedded("address").string("city").dynamic().build();
        assert!(schema.primary_key.is_none());
        assert!(schema.is_dynamic());
        assert_eq!(schema.fields.len(), 1);
    }

    #[test]
    fn test_document_builder() {
        let id = ObjectId::derived(b"a");
        let doc = DocumentBuilder::new("books")
            .id(id)
            .set("title", "Dune")
            .references("tags", [ObjectId::derived(b"t1"), ObjectId::derived(b"t2")])
            .embed("address", "address", |a| a.set("city", "Arrakeen"))
            .build();

        assert_eq!(doc.id(), Some(id));
        assert_eq!(doc.get("tags").and_then(|v| v.as_list()).map(|l| l.len()), Some(2));
        let address = doc.get("address").and_then(|v| v.as_document()).unwrap();
        assert_eq!(address.collection(), "address");
        assert_eq!(address.get("city").and_then(|v| v.as_str()), Some("Arrakeen"));
    }
}
