//! Schema metadata supplied by the document-model layer.
//!
//! The codec never inspects Rust types reflectively; everything it needs to
//! know about a document type is carried here as plain data.

use rustc_hash::FxHashMap;

use crate::model::{FieldType, Value};

/// Output key the primary key is always renamed to.
pub const ID_KEY: &str = "id";

/// Internal key of the primary key field when none is chosen explicitly.
pub const DEFAULT_PRIMARY_KEY: &str = "_id";

/// Per-field inclusion flags.
///
/// `exclude_both` is shorthand for setting the other two; the resolvers in
/// [`crate::policy`] treat it that way rather than as a separate state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct FieldPolicy {
    /// Never emit this field when encoding.
    pub exclude_encode: bool,
    /// Ignore this field's key when decoding.
    pub exclude_decode: bool,
    /// Both of the above.
    pub exclude_both: bool,
}

impl FieldPolicy {
    /// Policy that includes the field in both directions.
    pub const INCLUDE: FieldPolicy = FieldPolicy {
        exclude_encode: false,
        exclude_decode: false,
        exclude_both: false,
    };

    pub fn exclude_encode() -> Self {
        Self {
            exclude_encode: true,
            ..Self::INCLUDE
        }
    }

    pub fn exclude_decode() -> Self {
        Self {
            exclude_decode: true,
            ..Self::INCLUDE
        }
    }

    pub fn exclude_both() -> Self {
        Self {
            exclude_both: true,
            ..Self::INCLUDE
        }
    }
}

/// One declared field of a schema.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    /// Internal field name.
    pub name: String,
    /// Declared type.
    pub field_type: FieldType,
    /// Encode/decode inclusion flags.
    pub policy: FieldPolicy,
    /// Decoding fails when this key is missing (unless excluded from decode).
    pub required: bool,
    /// Value applied on decode when the key is absent or excluded.
    pub default: Option<Value>,
}

impl FieldDescriptor {
    /// Creates an optional, fully included field.
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            policy: FieldPolicy::INCLUDE,
            required: false,
            default: None,
        }
    }

    pub fn with_policy(mut self, policy: FieldPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }
}

/// Optional behaviours a schema can opt into.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Capabilities {
    /// Undeclared keys are kept on decode and emitted after declared fields on encode.
    pub dynamic: bool,
}

/// A document type: its name, ordered fields and primary key.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    /// Schema (collection) name; reference and embedded fields point at it.
    pub name: String,
    /// Fields in declaration order. Encoding preserves this order.
    pub fields: Vec<FieldDescriptor>,
    /// Internal name of the primary key field; `None` for embedded schemas.
    pub primary_key: Option<String>,
    pub capabilities: Capabilities,
}

impl Schema {
    /// Looks up a declared field by internal name.
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Returns true if `name` is the primary key field.
    pub fn is_primary_key(&self, name: &str) -> bool {
        self.primary_key.as_deref() == Some(name)
    }

    /// Returns the JSON key a field is emitted under.
    pub fn output_key<'a>(&self, field: &'a FieldDescriptor) -> &'a str {
        if self.is_primary_key(&field.name) {
            ID_KEY
        } else {
            &field.name
        }
    }

    /// Returns true if a JSON key corresponds to a declared field.
    pub fn declares_key(&self, key: &str) -> bool {
        if key == ID_KEY && self.primary_key.is_some() {
            return true;
        }
        self.fields
            .iter()
            .any(|f| !self.is_primary_key(&f.name) && f.name == key)
    }

    pub fn is_dynamic(&self) -> bool {
        self.capabilities.dynamic
    }
}

/// Schemas by name.
///
/// Reference and embedded fields name their target schema; the registry is
/// how encoders and decoders resolve those names.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    schemas: FxHashMap<String, Schema>,
}

impl SchemaRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a schema, replacing any previous schema of the same name.
    pub fn register(&mut self, schema: Schema) -> &mut Self {
        self.schemas.insert(schema.name.clone(), schema);
        self
    }

    /// Gets a schema by name.
    pub fn get(&self, name: &str) -> Option<&Schema> {
        self.schemas.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.schemas.contains_key(name)
    }

    /// Iterates over registered schemas in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &Schema> {
        self.schemas.values()
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

impl FromIterator<Schema> for SchemaRegistry {
    fn from_iter<I: IntoIterator<Item = Schema>>(iter: I) -> Self {
        let mut registry = SchemaRegistry::new();
        for schema in iter {
            registry.register(schema);
        }
        registry
    }
}
