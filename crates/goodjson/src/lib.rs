//! goodjson: schema-aware conversion between document-database records and plain JSON.
//!
//! Document databases store typed wrapper values (object ids, datetimes,
//! regexes, timestamps, code, min/max sentinels) that have no direct JSON
//! form. This crate renders every such value as plain JSON, renames the
//! primary key to `"id"`, applies per-field inclusion policies in each
//! direction, and can inline referenced documents up to a bounded depth.
//!
//! # Quick Start
//!
//! ```rust
//! use goodjson::codec::{Decoder, EncodeOptions, Encoder};
//! use goodjson::model::{DocumentBuilder, FieldPolicy, ReferenceField, SchemaBuilder, SchemaRegistry};
//! use goodjson::store::{DocumentStore, MemoryStore};
//!
//! let registry: SchemaRegistry = [
//!     SchemaBuilder::document("authors").string("name").build(),
//!     SchemaBuilder::document("books")
//!         .string_required("title")
//!         .string_with("isbn", FieldPolicy::exclude_encode())
//!         .reference("author", ReferenceField::plain("authors"))
//!         .build(),
//! ]
//! .into_iter()
//! .collect();
//!
//! let store = MemoryStore::new();
//! let author = store
//!     .persist(DocumentBuilder::new("authors").set("name", "Ursula K. Le Guin").build())
//!     .unwrap();
//! let book = DocumentBuilder::new("books")
//!     .set("title", "The Dispossessed")
//!     .set("isbn", "978-0061054884")
//!     .reference("author", author)
//!     .build();
//!
//! // Identifiers only
//! let node = Encoder::new(&registry, &store).encode(&book).unwrap();
//! assert_eq!(node.get("author").unwrap(), &serde_json::json!(author.to_hex()));
//! assert!(node.get("isbn").is_none());
//!
//! // Referenced documents inlined
//! let node = Encoder::new(&registry, &store)
//!     .with_options(EncodeOptions::follow())
//!     .encode(&book)
//!     .unwrap();
//! assert_eq!(node.get("author").unwrap()["name"], "Ursula K. Le Guin");
//!
//! // And back
//! let decoded = Decoder::new(&registry, &store)
//!     .decode(&node.into_value(), "books")
//!     .unwrap();
//! assert_eq!(decoded.get("author").and_then(|v| v.reference_id()), Some(author));
//! ```
//!
//! # Modules
//!
//! - [`model`]: ids, typed values, schemas, documents, builders
//! - [`policy`]: per-field encode/decode inclusion
//! - [`codec`]: scalar codec, reference resolver, document encoder/decoder
//! - [`pagination`]: page envelopes over encoded documents
//! - [`store`]: the storage seam used to fetch and persist referenced documents
//! - [`validate`]: registry consistency checks
//! - [`error`]: error types
//!
//! # Cycles
//!
//! Reference cycles are bounded only by the depth budget. With
//! [`MaxDepth::Unlimited`](model::MaxDepth) the encoder detects re-entry of
//! a document it is already encoding and fails with
//! [`EncodeError::UnboundedRecursion`].

pub mod codec;
pub mod error;
pub mod model;
pub mod pagination;
pub mod policy;
pub mod store;
pub mod util;
pub mod validate;

// Re-export commonly used types at crate root
pub use codec::{
    decode_document, decode_scalar, encode_document, encode_scalar, CodecOptions, DateTimeFormat,
    DecodeOptions, Decoder, DocumentNode, EncodeOptions, Encoder, RecursionBudget,
};
pub use error::{DecodeError, EncodeError, ErrorKind, PaginationError, SchemaError, StoreError};
pub use model::{
    Document, DocumentBuilder, FieldDescriptor, FieldPolicy, FieldType, FollowOptions, MaxDepth,
    ObjectId, ReferenceField, Schema, SchemaBuilder, SchemaRegistry, Value,
};
pub use pagination::{paginate, paginate_field, Page, PageEnvelope, PageRequest};
pub use policy::{should_decode, should_encode};
pub use store::{DocumentStore, MemoryStore};
pub use validate::validate_registry;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
