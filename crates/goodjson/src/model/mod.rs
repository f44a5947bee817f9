//! Data model types for goodjson.
//!
//! This module contains the types the codec works on:
//! - Identifiers (object ids)
//! - Values (typed field values) and field types
//! - Schemas (ordered field descriptors with inclusion policies)
//! - Documents (field values of one record)
//! - Builders (ergonomic construction)

pub mod builder;
pub mod document;
pub mod id;
pub mod schema;
pub mod value;

pub use builder::{DocumentBuilder, SchemaBuilder};
pub use document::Document;
pub use id::{format_object_id, parse_object_id, ObjectId, ParseObjectIdError};
pub use schema::{
    Capabilities, FieldDescriptor, FieldPolicy, Schema, SchemaRegistry, DEFAULT_PRIMARY_KEY, ID_KEY,
};
pub use value::{
    Binary, Code, FieldType, FollowOptions, JsonMap, MaxDepth, ReferenceField, Regex, Timestamp,
    Value, DEFAULT_MAX_DEPTH,
};
