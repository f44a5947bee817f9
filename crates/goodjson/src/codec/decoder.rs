//! Document decoding from plain JSON.
//!
//! Decoding is all-or-nothing. Documents constructed by auto-saving
//! reference fields are queued while the payload is decoded and persisted
//! only once the whole payload has decoded cleanly, so a failure leaves the
//! store untouched.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::debug;

use crate::codec::scalar::{decode_scalar_field, decode_untyped, json_kind, CodecOptions};
use crate::error::DecodeError;
use crate::model::{parse_object_id, Document, FieldType, SchemaRegistry, Value, ID_KEY};
use crate::policy::should_decode;
use crate::store::DocumentStore;

/// Options for decoding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DecodeOptions {
    /// Reject keys that no declared field maps to (non-dynamic schemas only).
    pub strict: bool,
    #[serde(flatten)]
    pub codec: CodecOptions,
}

impl DecodeOptions {
    /// Creates default (lenient) decoding options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates options that reject undeclared keys.
    pub fn strict() -> Self {
        Self {
            strict: true,
            ..Self::default()
        }
    }
}

/// Documents waiting to be persisted once a decode call succeeds.
pub(crate) type PendingSaves = Vec<Document>;

/// Decodes plain JSON into documents of registered schemas.
pub struct Decoder<'a> {
    registry: &'a SchemaRegistry,
    store: &'a dyn DocumentStore,
    options: DecodeOptions,
}

impl<'a> Decoder<'a> {
    /// Creates a decoder with default options.
    pub fn new(registry: &'a SchemaRegistry, store: &'a dyn DocumentStore) -> Self {
        Self {
            registry,
            store,
            options: DecodeOptions::default(),
        }
    }

    pub fn with_options(mut self, options: DecodeOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &DecodeOptions {
        &self.options
    }

    pub(crate) fn store(&self) -> &'a dyn DocumentStore {
        self.store
    }

    /// Decodes one JSON object into a document of `schema`.
    pub fn decode(&self, json: &JsonValue, schema: &str) -> Result<Document, DecodeError> {
        let mut pending = PendingSaves::new();
        let doc = self.decode_document(json, schema, &mut pending)?;
        self.flush(pending)?;
        debug!(collection = %schema, fields = doc.len(), created = doc.id().is_none(), "decoded document");
        Ok(doc)
    }

    /// Parses JSON text and decodes it.
    pub fn decode_str(&self, text: &str, schema: &str) -> Result<Document, DecodeError> {
        let json: JsonValue = serde_json::from_str(text)?;
        self.decode(&json, schema)
    }

    /// Decodes a JSON array of objects. Fails as a whole if any element fails.
    pub fn decode_many(&self, json: &JsonValue, schema: &str) -> Result<Vec<Document>, DecodeError> {
        let items = json.as_array().ok_or_else(|| {
            DecodeError::mismatch(schema, format!("expected an array of documents, found {}", json_kind(json)))
        })?;

        let mut pending = PendingSaves::new();
        let mut docs = Vec::with_capacity(items.len());
        for item in items {
            docs.push(self.decode_document(item, schema, &mut pending)?);
        }
        self.flush(pending)?;
        debug!(collection = %schema, count = docs.len(), "decoded documents");
        Ok(docs)
    }

    pub(crate) fn flush(&self, pending: PendingSaves) -> Result<(), DecodeError> {
        if pending.is_empty() {
            return Ok(());
        }
        let count = pending.len();
        for doc in pending {
            self.store.persist(doc)?;
        }
        debug!(count, "persisted auto-saved documents");
        Ok(())
    }

    // =========================================================================
    // Traversal
    // =========================================================================

    pub(crate) fn decode_document(
        &self,
        json: &JsonValue,
        schema_name: &str,
        pending: &mut PendingSaves,
    ) -> Result<Document, DecodeError> {
        let schema = self
            .registry
            .get(schema_name)
            .ok_or_else(|| DecodeError::UnknownSchema {
                name: schema_name.to_string(),
            })?;
        let obj = json.as_object().ok_or_else(|| {
            DecodeError::mismatch(schema_name, format!("expected an object, found {}", json_kind(json)))
        })?;

        let mut doc = Document::new(&schema.name);

        for field in &schema.fields {
            if schema.is_primary_key(&field.name) {
                if !should_decode(field) {
                    continue;
                }
                match obj.get(ID_KEY) {
                    Some(JsonValue::String(s)) => {
                        let id = parse_object_id(s).ok_or_else(|| {
                            DecodeError::invalid(ID_KEY, format!("{:?} is not a 24-character hex id", s))
                        })?;
                        doc.set_id(id);
                    }
                    None | Some(JsonValue::Null) => {}
                    Some(other) => {
                        return Err(DecodeError::mismatch(
                            ID_KEY,
                            format!("expected a hex string, found {}", json_kind(other)),
                        ));
                    }
                }
                continue;
            }

            if !should_decode(field) {
                if let Some(default) = &field.default {
                    doc.set(field.name.clone(), default.clone());
                }
                continue;
            }

            match obj.get(&field.name) {
                None | Some(JsonValue::Null) if field.required => {
                    return Err(DecodeError::mismatch(&field.name, "required field is missing"));
                }
                None => {
                    if let Some(default) = &field.default {
                        doc.set(field.name.clone(), default.clone());
                    }
                }
                Some(json) => {
                    let value = self.decode_field(&field.name, &field.field_type, json, pending)?;
                    doc.set(field.name.clone(), value);
                }
            }
        }

        for (key, json) in obj {
            if schema.declares_key(key) || schema.is_primary_key(key) {
                continue;
            }
            if schema.is_dynamic() {
                doc.set(key.clone(), decode_untyped(json));
            } else if self.options.strict {
                return Err(DecodeError::mismatch(key, format!("undeclared key for schema {:?}", schema.name)));
            }
        }

        Ok(doc)
    }

    fn decode_field(
        &self,
        field: &str,
        field_type: &FieldType,
        json: &JsonValue,
        pending: &mut PendingSaves,
    ) -> Result<Value, DecodeError> {
        match field_type {
            FieldType::Reference(reference) => self.resolve_reference(field, reference, json, pending),
            _ if json.is_null() => Ok(Value::Null),
            FieldType::Embedded(target) => {
                let doc = self.decode_document(json, target, pending)?;
                Ok(Value::Document(Box::new(doc)))
            }
            FieldType::List(inner) => {
                let items = json.as_array().ok_or_else(|| {
                    DecodeError::mismatch(field, format!("expected an array, found {}", json_kind(json)))
                })?;
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    out.push(self.decode_field(field, inner, item, pending)?);
                }
                Ok(Value::List(out))
            }
            _ => decode_scalar_field(field, field_type, json, &self.options.codec),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::error::ErrorKind;
    use crate::model::{FieldDescriptor, FieldPolicy, FollowOptions, ObjectId, ReferenceField, SchemaBuilder};
    use crate::store::MemoryStore;

    fn registry() -> SchemaRegistry {
        [
            SchemaBuilder::embedded("address").string_required("city").build(),
            SchemaBuilder::document("users")
                .string_required("name")
                .string_with("role", FieldPolicy::exclude_decode())
                .field(FieldDescriptor::new("active", FieldType::Bool).with_default(true))
                .datetime("joined")
                .embedded_field("address", "address")
                .typed("pattern", FieldType::Regex)
                .build(),
            SchemaBuilder::document("authors").string("name").build(),
            SchemaBuilder::document("books")
                .string_required("title")
                .reference(
                    "author",
                    ReferenceField::follow_with(
                        "authors",
                        FollowOptions {
                            autosave: true,
                            ..FollowOptions::default()
                        },
                    ),
                )
                .build(),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_decode_basic() {
        let registry = registry();
        let store = MemoryStore::new();
        let id = ObjectId::derived(b"ada");
        let doc = Decoder::new(&registry, &store)
            .decode(
                &json!({
                    "id": id.to_hex(),
                    "name": "Ada",
                    "joined": "2024-03-15T14:30:00Z",
                    "address": { "city": "London" },
                }),
                "users",
            )
            .unwrap();

        assert_eq!(doc.id(), Some(id));
        assert_eq!(doc.get("name"), Some(&Value::from("Ada")));
        assert_eq!(doc.get("joined"), Some(&Value::DateTime(1_710_513_000_000)));
        assert_eq!(doc.get("active"), Some(&Value::Bool(true)));
        let address = doc.get("address").and_then(Value::as_document).unwrap();
        assert_eq!(address.get("city"), Some(&Value::from("London")));
    }

    #[test]
    fn test_missing_required_field() {
        let registry = registry();
        let store = MemoryStore::new();
        let err = Decoder::new(&registry, &store)
            .decode(&json!({ "joined": 0 }), "users")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SchemaMismatch);
        assert!(matches!(err, DecodeError::SchemaMismatch { ref field, .. } if field == "name"));

        // Embedded documents check their own required fields
        let err = Decoder::new(&registry, &store)
            .decode(&json!({ "name": "Ada", "address": {} }), "users")
            .unwrap_err();
        assert!(matches!(err, DecodeError::SchemaMismatch { ref field, .. } if field == "city"));
    }

    #[test]
    fn test_excluded_from_decode_is_ignored() {
        let registry = registry();
        let store = MemoryStore::new();
        let doc = Decoder::new(&registry, &store)
            .decode(&json!({ "name": "Ada", "role": "admin" }), "users")
            .unwrap();
        assert_eq!(doc.get("role"), None);
    }

    #[test]
    fn test_encode_only_type_rejected() {
        let registry = registry();
        let store = MemoryStore::new();
        let err = Decoder::new(&registry, &store)
            .decode(&json!({ "name": "Ada", "pattern": { "regex": "^a" } }), "users")
            .unwrap_err();
        assert_eq!(err.kind().code(), "GJ001");
    }

    #[test]
    fn test_strict_rejects_undeclared_keys() {
        let registry = registry();
        let store = MemoryStore::new();
        let payload = json!({ "name": "Ada", "nickname": "A" });

        let lenient = Decoder::new(&registry, &store).decode(&payload, "users").unwrap();
        assert!(!lenient.contains("nickname"));

        let err = Decoder::new(&registry, &store)
            .with_options(DecodeOptions::strict())
            .decode(&payload, "users")
            .unwrap_err();
        assert!(matches!(err, DecodeError::SchemaMismatch { ref field, .. } if field == "nickname"));
    }

    #[test]
    fn test_failed_decode_saves_nothing() {
        let registry = registry();
        let store = MemoryStore::new();
        let decoder = Decoder::new(&registry, &store);
        let payload = json!([
            { "title": "Excession", "author": { "name": "Banks" } },
            { "author": { "name": "Herbert" } },
        ]);

        let err = decoder.decode_many(&payload, "books").unwrap_err();
        assert!(matches!(err, DecodeError::SchemaMismatch { ref field, .. } if field == "title"));
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn test_decode_many_requires_array() {
        let registry = registry();
        let store = MemoryStore::new();
        let err = Decoder::new(&registry, &store)
            .decode_many(&json!({ "title": "x" }), "books")
            .unwrap_err();
        assert!(matches!(err, DecodeError::SchemaMismatch { .. }));
    }

    #[test]
    fn test_decode_str_reports_bad_json() {
        let registry = registry();
        let store = MemoryStore::new();
        let err = Decoder::new(&registry, &store).decode_str("{not json", "users").unwrap_err();
        assert!(matches!(err, DecodeError::Json(_)));
    }

    #[test]
    fn test_dynamic_keeps_undeclared_keys() {
        let registry: SchemaRegistry = [SchemaBuilder::document("notes").dynamic().string("title").build()]
            .into_iter()
            .collect();
        let store = MemoryStore::new();
        let doc = Decoder::new(&registry, &store)
            .decode(&json!({ "title": "t", "score": 4.5, "tags": ["x"] }), "notes")
            .unwrap();
        assert_eq!(doc.get("score"), Some(&Value::Float(4.5)));
        assert_eq!(doc.get("tags"), Some(&Value::List(vec![Value::from("x")])));
    }
}
