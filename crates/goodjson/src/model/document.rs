//! Document instances.

use indexmap::IndexMap;

use crate::model::{ObjectId, Value};

/// One document: its schema name, its id (if it has been assigned one) and
/// its field values.
///
/// Field values are keyed by internal field name. The primary key lives in
/// [`Document::id`], never in the field map, so no encoder can leak the
/// internal key name.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    collection: String,
    id: Option<ObjectId>,
    fields: IndexMap<String, Value>,
}

impl Document {
    /// Creates an empty document of the named schema.
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            id: None,
            fields: IndexMap::new(),
        }
    }

    /// Creates an empty document with an id already assigned.
    pub fn with_id(collection: impl Into<String>, id: ObjectId) -> Self {
        Self {
            id: Some(id),
            ..Self::new(collection)
        }
    }

    /// Name of the schema this document belongs to.
    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn id(&self) -> Option<ObjectId> {
        self.id
    }

    pub fn set_id(&mut self, id: ObjectId) {
        self.id = Some(id);
    }

    /// Gets a field value. Unset fields return `None`; an explicit null is `Some(Value::Null)`.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Sets a field value, keeping the position of an existing key.
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(field.into(), value.into());
    }

    /// Removes a field, returning its previous value.
    pub fn unset(&mut self, field: &str) -> Option<Value> {
        self.fields.shift_remove(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    /// Iterates over set fields in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
