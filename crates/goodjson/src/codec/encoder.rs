//! Document encoding to plain JSON.
//!
//! Declared fields are emitted in declaration order, skipping fields whose
//! policy excludes them from encoding and fields the document leaves unset.
//! The primary key is always emitted as `"id"`. Dynamic schemas then emit
//! their undeclared fields in insertion order.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::debug;

use crate::codec::reference::{Ancestors, RecursionBudget};
use crate::codec::scalar::{encode_scalar_field, CodecOptions};
use crate::error::EncodeError;
use crate::model::{Document, FieldType, JsonMap, MaxDepth, Schema, SchemaRegistry, Value, ID_KEY};
use crate::policy::should_encode;
use crate::store::DocumentStore;

/// Options for encoding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EncodeOptions {
    /// Inline plain references instead of rendering their ids.
    pub follow_reference: bool,
    /// Hop budget for inlining. Also caps auto-following fields.
    pub max_depth: MaxDepth,
    #[serde(flatten)]
    pub codec: CodecOptions,
}

impl EncodeOptions {
    /// Creates default options: ids only, epoch-millisecond datetimes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Follow mode with the default depth of 3.
    pub fn follow() -> Self {
        Self {
            follow_reference: true,
            ..Self::default()
        }
    }

    /// Follow mode with an explicit hop limit.
    pub fn follow_to(max_depth: u32) -> Self {
        Self {
            follow_reference: true,
            max_depth: MaxDepth::Limited(max_depth),
            ..Self::default()
        }
    }

    pub fn with_max_depth(mut self, max_depth: MaxDepth) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_codec(mut self, codec: CodecOptions) -> Self {
        self.codec = codec;
        self
    }
}

/// The encoded form of one document: output key to plain JSON value.
///
/// Built fresh per encode call and read-only afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct DocumentNode(JsonMap);

impl DocumentNode {
    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Output keys in emission order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_map(&self) -> &JsonMap {
        &self.0
    }

    pub fn into_value(self) -> JsonValue {
        JsonValue::Object(self.0)
    }

    /// Serializes to compact JSON text.
    pub fn to_json_string(&self) -> String {
        JsonValue::Object(self.0.clone()).to_string()
    }
}

impl From<DocumentNode> for JsonValue {
    fn from(node: DocumentNode) -> Self {
        node.into_value()
    }
}

/// Encodes documents against a schema registry, fetching referenced
/// documents from a store when they are inlined.
pub struct Encoder<'a> {
    registry: &'a SchemaRegistry,
    store: &'a dyn DocumentStore,
    options: EncodeOptions,
}

impl<'a> Encoder<'a> {
    /// Creates an encoder with default options.
    pub fn new(registry: &'a SchemaRegistry, store: &'a dyn DocumentStore) -> Self {
        Self {
            registry,
            store,
            options: EncodeOptions::default(),
        }
    }

    pub fn with_options(mut self, options: EncodeOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &EncodeOptions {
        &self.options
    }

    pub fn registry(&self) -> &'a SchemaRegistry {
        self.registry
    }

    pub(crate) fn store(&self) -> &'a dyn DocumentStore {
        self.store
    }

    /// Encodes one document with a fresh budget.
    pub fn encode(&self, doc: &Document) -> Result<DocumentNode, EncodeError> {
        self.encode_with_budget(doc, RecursionBudget::new(self.options.max_depth))
    }

    /// Encodes one document starting from an existing budget.
    pub fn encode_with_budget(
        &self,
        doc: &Document,
        budget: RecursionBudget,
    ) -> Result<DocumentNode, EncodeError> {
        let mut ancestors = Ancestors::new();
        let node = self.encode_document(doc, budget, &mut ancestors)?;
        debug!(
            collection = %doc.collection(),
            follow = self.options.follow_reference,
            max_depth = ?self.options.max_depth,
            keys = node.len(),
            "encoded document"
        );
        Ok(node)
    }

    /// Encodes a sequence of documents, each with its own fresh budget.
    pub fn encode_many<'d, I>(&self, docs: I) -> Result<Vec<DocumentNode>, EncodeError>
    where
        I: IntoIterator<Item = &'d Document>,
    {
        docs.into_iter().map(|doc| self.encode(doc)).collect()
    }

    /// Encodes a sequence into a JSON array.
    pub fn encode_array<'d, I>(&self, docs: I) -> Result<JsonValue, EncodeError>
    where
        I: IntoIterator<Item = &'d Document>,
    {
        let nodes = self.encode_many(docs)?;
        Ok(JsonValue::Array(nodes.into_iter().map(DocumentNode::into_value).collect()))
    }

    /// Encodes a single list element of the given element type with a fresh budget.
    pub fn encode_element(
        &self,
        field: &str,
        element_type: &FieldType,
        value: &Value,
    ) -> Result<JsonValue, EncodeError> {
        let mut ancestors = Ancestors::new();
        let budget = RecursionBudget::new(self.options.max_depth);
        self.encode_field(field, element_type, value, budget, &mut ancestors)
    }

    // =========================================================================
    // Traversal
    // =========================================================================

    pub(crate) fn encode_document(
        &self,
        doc: &Document,
        budget: RecursionBudget,
        ancestors: &mut Ancestors,
    ) -> Result<DocumentNode, EncodeError> {
        let schema = self
            .registry
            .get(doc.collection())
            .ok_or_else(|| EncodeError::UnknownSchema {
                name: doc.collection().to_string(),
            })?;

        let guard = match (budget.max(), doc.id()) {
            (MaxDepth::Unlimited, Some(id)) => {
                let key = (doc.collection().to_string(), id);
                if ancestors.contains(&key) {
                    return Err(EncodeError::UnboundedRecursion {
                        collection: key.0,
                        id,
                    });
                }
                ancestors.push(key);
                true
            }
            _ => false,
        };

        let result = self.encode_fields(schema, doc, budget, ancestors);
        if guard {
            ancestors.pop();
        }
        result
    }

    fn encode_fields(
        &self,
        schema: &Schema,
        doc: &Document,
        budget: RecursionBudget,
        ancestors: &mut Ancestors,
    ) -> Result<DocumentNode, EncodeError> {
        let mut out = JsonMap::new();

        for field in &schema.fields {
            if !should_encode(field) {
                continue;
            }
            if schema.is_primary_key(&field.name) {
                if let Some(id) = doc.id() {
                    out.insert(ID_KEY.to_string(), JsonValue::String(id.to_hex()));
                }
                continue;
            }
            let Some(value) = doc.get(&field.name) else {
                continue;
            };
            let json = self.encode_field(&field.name, &field.field_type, value, budget, ancestors)?;
            out.insert(field.name.clone(), json);
        }

        if schema.is_dynamic() {
            for (key, value) in doc.iter() {
                if schema.field(key).is_some() || out.contains_key(key) {
                    continue;
                }
                let json = self.encode_dynamic(key, value, budget, ancestors)?;
                out.insert(key.to_string(), json);
            }
        }

        Ok(DocumentNode(out))
    }

    fn encode_field(
        &self,
        field: &str,
        field_type: &FieldType,
        value: &Value,
        budget: RecursionBudget,
        ancestors: &mut Ancestors,
    ) -> Result<JsonValue, EncodeError> {
        match (field_type, value) {
            (_, Value::Null) => Ok(JsonValue::Null),
            (FieldType::Reference(reference), _) => {
                self.resolve_reference(field, reference, value, budget, ancestors)
            }
            // Embedded documents share the parent's budget
            (FieldType::Embedded(_), Value::Document(doc)) => {
                Ok(self.encode_document(doc, budget, ancestors)?.into_value())
            }
            (FieldType::List(inner), Value::List(items)) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    out.push(self.encode_field(field, inner, item, budget, ancestors)?);
                }
                Ok(JsonValue::Array(out))
            }
            (FieldType::Embedded(_), _) | (FieldType::List(_), _) | (_, Value::Document(_)) => {
                Err(EncodeError::TypeMismatch {
                    field: field.to_string(),
                    expected: field_type.name(),
                })
            }
            (_, scalar) => encode_scalar_field(field, scalar, &self.options.codec),
        }
    }

    /// Encodes an undeclared field of a dynamic document by its value alone.
    fn encode_dynamic(
        &self,
        field: &str,
        value: &Value,
        budget: RecursionBudget,
        ancestors: &mut Ancestors,
    ) -> Result<JsonValue, EncodeError> {
        match value {
            Value::Document(doc) => Ok(self.encode_document(doc, budget, ancestors)?.into_value()),
            Value::List(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    out.push(self.encode_dynamic(field, item, budget, ancestors)?);
                }
                Ok(JsonValue::Array(out))
            }
            scalar => encode_scalar_field(field, scalar, &self.options.codec),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::codec::scalar::DateTimeFormat;
    use crate::model::{DocumentBuilder, FieldPolicy, ObjectId, ReferenceField, SchemaBuilder};
    use crate::store::{DocumentStore, MemoryStore};

    fn registry() -> SchemaRegistry {
        [
            SchemaBuilder::embedded("address").string("city").build(),
            SchemaBuilder::document("users")
                .string("name")
                .string_with("password", FieldPolicy::exclude_encode())
                .datetime("joined")
                .embedded_field("address", "address")
                .list("tags", FieldType::String)
                .build(),
            SchemaBuilder::document("nodes")
                .string("label")
                .reference("next", ReferenceField::plain("nodes"))
                .build(),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_declaration_order_and_id_rename() {
        let registry = registry();
        let store = MemoryStore::new();
        let id = ObjectId::derived(b"user");
        // Set out of declaration order on purpose
        let doc = DocumentBuilder::new("users")
            .set("tags", vec![Value::from("a"), Value::from("b")])
            .set("name", "Ada")
            .id(id)
            .datetime("joined", 0)
            .embed("address", "address", |a| a.set("city", "London"))
            .build();

        let node = Encoder::new(&registry, &store).encode(&doc).unwrap();
        assert_eq!(node.keys().collect::<Vec<_>>(), ["id", "name", "joined", "address", "tags"]);
        assert_eq!(
            node.into_value(),
            json!({
                "id": id.to_hex(),
                "name": "Ada",
                "joined": 0,
                "address": { "city": "London" },
                "tags": ["a", "b"],
            })
        );
    }

    #[test]
    fn test_excluded_and_unset_fields_are_skipped() {
        let registry = registry();
        let store = MemoryStore::new();
        let doc = DocumentBuilder::new("users")
            .set("name", "Ada")
            .set("password", "hunter2")
            .build();

        let node = Encoder::new(&registry, &store).encode(&doc).unwrap();
        assert!(!node.contains_key("password"));
        assert!(!node.contains_key("joined"));
        // No id assigned yet
        assert!(!node.contains_key("id"));
        assert!(!node.contains_key("_id"));
    }

    #[test]
    fn test_iso_datetime_option() {
        let registry = registry();
        let store = MemoryStore::new();
        let doc = DocumentBuilder::new("users").datetime("joined", 86_400_000).build();
        let options = EncodeOptions::new().with_codec(CodecOptions {
            datetime_format: DateTimeFormat::Iso8601,
        });

        let node = Encoder::new(&registry, &store).with_options(options).encode(&doc).unwrap();
        assert_eq!(node.get("joined"), Some(&json!("1970-01-02T00:00:00.000Z")));
    }

    #[test]
    fn test_unknown_schema() {
        let registry = registry();
        let store = MemoryStore::new();
        let err = Encoder::new(&registry, &store)
            .encode(&Document::new("ghosts"))
            .unwrap_err();
        assert_eq!(err, EncodeError::UnknownSchema { name: "ghosts".to_string() });
    }

    #[test]
    fn test_self_cycle_bounded_by_budget() {
        let registry = registry();
        let store = MemoryStore::new();
        let id = ObjectId::derived(b"loop");
        let node = DocumentBuilder::new("nodes")
            .id(id)
            .set("label", "loop")
            .reference("next", id)
            .build();
        store.persist(node.clone()).unwrap();

        let json = Encoder::new(&registry, &store)
            .with_options(EncodeOptions::follow_to(2))
            .encode(&node)
            .unwrap()
            .into_value();
        assert_eq!(json["next"]["next"]["next"], json!(id.to_hex()));
    }

    #[test]
    fn test_self_cycle_unlimited_is_an_error() {
        let registry = registry();
        let store = MemoryStore::new();
        let id = ObjectId::derived(b"loop");
        let node = DocumentBuilder::new("nodes").id(id).reference("next", id).build();
        store.persist(node.clone()).unwrap();

        let err = Encoder::new(&registry, &store)
            .with_options(EncodeOptions::follow().with_max_depth(MaxDepth::Unlimited))
            .encode(&node)
            .unwrap_err();
        assert!(matches!(err, EncodeError::UnboundedRecursion { .. }));
    }

    #[test]
    fn test_dynamic_fields_after_declared() {
        let registry: SchemaRegistry = [SchemaBuilder::document("notes").dynamic().string("title").build()]
            .into_iter()
            .collect();
        let store = MemoryStore::new();
        let doc = DocumentBuilder::new("notes")
            .set("extra", 7)
            .set("title", "todo")
            .build();

        let node = Encoder::new(&registry, &store).encode(&doc).unwrap();
        assert_eq!(node.to_json_string(), r#"{"title":"todo","extra":7}"#);
    }

    #[test]
    fn test_options_from_request_params() {
        let options: EncodeOptions =
            serde_json::from_value(json!({ "followReference": true, "maxDepth": 2 })).unwrap();
        assert_eq!(options, EncodeOptions::follow_to(2));

        let defaults: EncodeOptions = serde_json::from_value(json!({})).unwrap();
        assert_eq!(defaults, EncodeOptions::default());
        assert_eq!(defaults.max_depth, MaxDepth::Limited(3));
    }
}
