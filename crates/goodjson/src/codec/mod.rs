//! Conversion between documents and plain JSON.
//!
//! - [`scalar`]: wrapper and scalar values
//! - [`reference`]: depth-bounded reference inlining and decode-time binding
//! - [`encoder`] / [`decoder`]: per-document orchestration

pub mod decoder;
pub mod encoder;
pub mod reference;
pub mod scalar;

pub use decoder::{DecodeOptions, Decoder};
pub use encoder::{DocumentNode, EncodeOptions, Encoder};
pub use reference::RecursionBudget;
pub use scalar::{decode_scalar, decode_untyped, encode_scalar, field_type_of, CodecOptions, DateTimeFormat};

use serde_json::Value as JsonValue;

use crate::error::{DecodeError, EncodeError};
use crate::model::{Document, SchemaRegistry};
use crate::store::DocumentStore;

/// Encodes one document with the given options.
pub fn encode_document(
    registry: &SchemaRegistry,
    store: &dyn DocumentStore,
    doc: &Document,
    options: EncodeOptions,
) -> Result<DocumentNode, EncodeError> {
    Encoder::new(registry, store).with_options(options).encode(doc)
}

/// Decodes one JSON object into a document of the named schema.
pub fn decode_document(
    registry: &SchemaRegistry,
    store: &dyn DocumentStore,
    json: &JsonValue,
    schema: &str,
    options: DecodeOptions,
) -> Result<Document, DecodeError> {
    Decoder::new(registry, store).with_options(options).decode(json, schema)
}
