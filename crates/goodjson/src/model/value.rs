//! Typed values and field types.
//!
//! A [`Value`] is what a document stores in one field; a [`FieldType`] is what
//! the schema declares that field to hold. Plain JSON is not self-describing,
//! so decoding always goes through the declared type.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::{Document, ObjectId};

/// A JSON object, used for schemaless dict fields and code scopes.
pub type JsonMap = serde_json::Map<String, serde_json::Value>;

/// Default reference-following depth.
pub const DEFAULT_MAX_DEPTH: u32 = 3;

/// How far references may be followed.
///
/// Deserializes from an integer or `null` (unlimited).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Option<u32>", into = "Option<u32>")]
pub enum MaxDepth {
    /// At most this many hops into referenced documents.
    Limited(u32),
    /// No limit. Reference cycles become the caller's problem.
    Unlimited,
}

impl Default for MaxDepth {
    fn default() -> Self {
        MaxDepth::Limited(DEFAULT_MAX_DEPTH)
    }
}

impl From<Option<u32>> for MaxDepth {
    fn from(v: Option<u32>) -> Self {
        match v {
            Some(n) => MaxDepth::Limited(n),
            None => MaxDepth::Unlimited,
        }
    }
}

impl From<MaxDepth> for Option<u32> {
    fn from(v: MaxDepth) -> Self {
        match v {
            MaxDepth::Limited(n) => Some(n),
            MaxDepth::Unlimited => None,
        }
    }
}

/// Options for an auto-following reference field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FollowOptions {
    /// Persist documents constructed while decoding this field.
    pub autosave: bool,
    /// Fail encoding when an unsaved document must be rendered as an id.
    pub id_check: bool,
    /// Hop limit for this field, independent of the caller's follow mode.
    pub max_depth: MaxDepth,
}

impl Default for FollowOptions {
    fn default() -> Self {
        Self {
            autosave: false,
            id_check: true,
            max_depth: MaxDepth::default(),
        }
    }
}

/// A field that names another document by id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReferenceField {
    /// Name of the target schema (collection).
    pub target: String,
    /// Render the bare form as `{"collection", "id"}` instead of a hex string.
    pub dbref: bool,
    /// Present on auto-following fields.
    pub follow: Option<FollowOptions>,
}

impl ReferenceField {
    /// A plain reference: identifier only unless the caller asks to follow.
    pub fn plain(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            dbref: false,
            follow: None,
        }
    }

    /// An auto-following reference with default options.
    pub fn follow(target: impl Into<String>) -> Self {
        Self::follow_with(target, FollowOptions::default())
    }

    /// An auto-following reference with explicit options.
    pub fn follow_with(target: impl Into<String>, options: FollowOptions) -> Self {
        Self {
            target: target.into(),
            dbref: false,
            follow: Some(options),
        }
    }

    /// Switches the bare rendering to the `{"collection", "id"}` form.
    pub fn with_dbref(mut self) -> Self {
        self.dbref = true;
        self
    }

    /// Returns true if this field always attempts inlining.
    pub fn is_auto_following(&self) -> bool {
        self.follow.is_some()
    }
}

/// The declared type of a field.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldType {
    String,
    Int,
    Float,
    Bool,
    Binary,
    ObjectId,
    Uuid,
    DateTime,
    /// Schemaless JSON object.
    Dict,
    Regex,
    MinKey,
    MaxKey,
    Timestamp,
    Code,
    /// Embedded document of the named schema.
    Embedded(String),
    Reference(ReferenceField),
    List(Box<FieldType>),
}

impl FieldType {
    /// Shorthand for `FieldType::List(Box::new(inner))`.
    pub fn list(inner: FieldType) -> Self {
        FieldType::List(Box::new(inner))
    }

    /// Returns true for the wrapper types that have a JSON rendering but no decode path.
    pub fn is_encode_only(&self) -> bool {
        matches!(
            self,
            FieldType::Regex
                | FieldType::MinKey
                | FieldType::MaxKey
                | FieldType::Timestamp
                | FieldType::Code
        )
    }

    /// Returns the innermost element type, looking through lists.
    pub fn element_type(&self) -> &FieldType {
        match self {
            FieldType::List(inner) => inner.element_type(),
            other => other,
        }
    }

    /// Returns a short type name for error messages.
    pub fn name(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Int => "int",
            FieldType::Float => "float",
            FieldType::Bool => "bool",
            FieldType::Binary => "binary",
            FieldType::ObjectId => "objectid",
            FieldType::Uuid => "uuid",
            FieldType::DateTime => "datetime",
            FieldType::Dict => "dict",
            FieldType::Regex => "regex",
            FieldType::MinKey => "minkey",
            FieldType::MaxKey => "maxkey",
            FieldType::Timestamp => "timestamp",
            FieldType::Code => "code",
            FieldType::Embedded(_) => "embedded document",
            FieldType::Reference(_) => "reference",
            FieldType::List(_) => "list",
        }
    }
}

/// Binary payload with its subtype byte.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Binary {
    pub subtype: u8,
    pub data: Vec<u8>,
}

/// Regular expression pattern with single-character flags (e.g. `"im"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Regex {
    pub pattern: String,
    pub flags: String,
}

/// Replication timestamp: seconds plus an ordinal within that second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Timestamp {
    pub time: u32,
    pub inc: u32,
}

/// JavaScript code with an optional scope document.
#[derive(Debug, Clone, PartialEq)]
pub struct Code {
    pub code: String,
    pub scope: Option<JsonMap>,
}

/// A typed value stored in a document field.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Binary(Binary),
    ObjectId(ObjectId),
    Uuid(Uuid),
    /// Milliseconds since Unix epoch (UTC).
    DateTime(i64),
    Regex(Regex),
    MinKey,
    MaxKey,
    Timestamp(Timestamp),
    Code(Code),
    Dict(JsonMap),
    List(Vec<Value>),
    /// An embedded document, or a dereferenced document held by a reference field.
    Document(Box<Document>),
    /// The id of a referenced document.
    Reference(ObjectId),
}

impl Value {
    /// Returns a short tag name for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Binary(_) => "binary",
            Value::ObjectId(_) => "objectid",
            Value::Uuid(_) => "uuid",
            Value::DateTime(_) => "datetime",
            Value::Regex(_) => "regex",
            Value::MinKey => "minkey",
            Value::MaxKey => "maxkey",
            Value::Timestamp(_) => "timestamp",
            Value::Code(_) => "code",
            Value::Dict(_) => "dict",
            Value::List(_) => "list",
            Value::Document(_) => "document",
            Value::Reference(_) => "reference",
        }
    }

    /// Returns true for [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns the referenced id for a reference, or the id of a held document.
    pub fn reference_id(&self) -> Option<ObjectId> {
        match self {
            Value::Reference(id) | Value::ObjectId(id) => Some(*id),
            Value::Document(doc) => doc.id(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_document(&self) -> Option<&Document> {
        match self {
            Value::Document(doc) => Some(doc),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<Uuid> for Value {
    fn from(v: Uuid) -> Self {
        Value::Uuid(v)
    }
}

impl From<Document> for Value {
    fn from(v: Document) -> Self {
        Value::Document(Box::new(v))
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::List(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_only_types() {
        for ft in [
            FieldType::Regex,
            FieldType::MinKey,
            FieldType::MaxKey,
            FieldType::Timestamp,
            FieldType::Code,
        ] {
            assert!(ft.is_encode_only(), "{:?} should be encode-only", ft);
        }
        assert!(!FieldType::DateTime.is_encode_only());
        assert!(!FieldType::list(FieldType::Regex).is_encode_only());
        assert_eq!(FieldType::list(FieldType::Regex).element_type(), &FieldType::Regex);
    }

    #[test]
    fn test_max_depth_serde() {
        let limited: MaxDepth = serde_json::from_str("2").unwrap();
        assert_eq!(limited, MaxDepth::Limited(2));
        let unlimited: MaxDepth = serde_json::from_str("null").unwrap();
        assert_eq!(unlimited, MaxDepth::Unlimited);
        assert_eq!(serde_json::to_string(&MaxDepth::default()).unwrap(), "3");
    }

    #[test]
    fn test_reference_field_constructors() {
        let plain = ReferenceField::plain("authors");
        assert!(!plain.is_auto_following());
        assert!(!plain.dbref);

        let follow = ReferenceField::follow("authors").with_dbref();
        assert!(follow.is_auto_following());
        assert!(follow.dbref);
        assert_eq!(follow.follow, Some(FollowOptions::default()));
    }

    #[test]
    fn test_reference_id() {
        let id = ObjectId::derived(b"x");
        assert_eq!(Value::Reference(id).reference_id(), Some(id));
        assert_eq!(Value::Int(3).reference_id(), None);
    }
}
