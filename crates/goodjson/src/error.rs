//! Error types for goodjson encoding, decoding, pagination and storage.

use thiserror::Error;

use crate::model::{FieldType, ObjectId};

/// Broad classification shared by every error type in the crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// GJ001: the field type has an encode-only rendering
    UnsupportedDecode,
    /// GJ002: required field missing or JSON shape does not match the schema
    SchemaMismatch,
    /// GJ003: caller-supplied parameter out of range
    InvalidParameter,
    /// GJ004: JSON value has the right shape but cannot be parsed
    InvalidValue,
    /// GJ005: reference cycle with no depth limit
    UnboundedRecursion,
    /// GJ006: failure reported by the storage collaborator
    Storage,
}

impl ErrorKind {
    /// Returns the error code string (e.g., "GJ001").
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::UnsupportedDecode => "GJ001",
            ErrorKind::SchemaMismatch => "GJ002",
            ErrorKind::InvalidParameter => "GJ003",
            ErrorKind::InvalidValue => "GJ004",
            ErrorKind::UnboundedRecursion => "GJ005",
            ErrorKind::Storage => "GJ006",
        }
    }
}

/// Error reported by a [`DocumentStore`](crate::store::DocumentStore).
///
/// The codec never interprets these; they are passed through unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("document {id} not found in collection {collection:?}")]
    NotFound { collection: String, id: ObjectId },

    #[error("storage backend failure: {0}")]
    Backend(String),
}

/// Error while encoding a document into plain JSON.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EncodeError {
    #[error("field {field:?} holds a value that does not fit its declared type {expected}")]
    TypeMismatch { field: String, expected: &'static str },

    #[error("field {field:?} holds a NaN or infinite float, which JSON cannot represent")]
    NonFiniteFloat { field: String },

    #[error("field {field:?} references a document that has no id")]
    MissingReferenceId { field: String },

    #[error("no schema registered under {name:?}")]
    UnknownSchema { name: String },

    #[error("reference cycle through {collection}/{id} with unlimited depth")]
    UnboundedRecursion { collection: String, id: ObjectId },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl EncodeError {
    /// Returns the classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            EncodeError::UnboundedRecursion { .. } => ErrorKind::UnboundedRecursion,
            EncodeError::Store(_) => ErrorKind::Storage,
            EncodeError::NonFiniteFloat { .. } => ErrorKind::InvalidValue,
            _ => ErrorKind::SchemaMismatch,
        }
    }
}

/// Error while decoding plain JSON into a document.
///
/// Decoding is all-or-nothing: no partially decoded document is returned
/// alongside any of these.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeError {
    #[error("field {field:?} has type {field_type:?}, which can be encoded but not decoded")]
    UnsupportedDecode { field: String, field_type: FieldType },

    #[error("schema mismatch at {field:?}: {reason}")]
    SchemaMismatch { field: String, reason: String },

    #[error("invalid value for field {field:?}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("no schema registered under {name:?}")]
    UnknownSchema { name: String },

    #[error("malformed JSON input: {0}")]
    Json(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl DecodeError {
    /// Returns the classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            DecodeError::UnsupportedDecode { .. } => ErrorKind::UnsupportedDecode,
            DecodeError::InvalidValue { .. } | DecodeError::Json(_) => ErrorKind::InvalidValue,
            DecodeError::Store(_) => ErrorKind::Storage,
            _ => ErrorKind::SchemaMismatch,
        }
    }

    pub(crate) fn mismatch(field: &str, reason: impl Into<String>) -> Self {
        DecodeError::SchemaMismatch {
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid(field: &str, reason: impl Into<String>) -> Self {
        DecodeError::InvalidValue {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for DecodeError {
    fn from(err: serde_json::Error) -> Self {
        DecodeError::Json(err.to_string())
    }
}

/// Error while paginating a sequence of documents.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PaginationError {
    #[error("invalid parameter {name}: {value} (must be at least 1)")]
    InvalidParameter { name: &'static str, value: usize },

    #[error("field {field:?} is not a list field")]
    NotAList { field: String },

    #[error("field {field:?} is excluded from encoding")]
    ExcludedField { field: String },

    #[error(transparent)]
    Encode(#[from] EncodeError),
}

impl PaginationError {
    /// Returns the classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            PaginationError::InvalidParameter { .. } => ErrorKind::InvalidParameter,
            PaginationError::NotAList { .. } | PaginationError::ExcludedField { .. } => {
                ErrorKind::SchemaMismatch
            }
            PaginationError::Encode(e) => e.kind(),
        }
    }
}

/// Error found while checking a schema registry for consistency.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("schema {schema:?} field {field:?} points at unregistered schema {target:?}")]
    UnknownTarget {
        schema: String,
        field: String,
        target: String,
    },

    #[error("schema {schema:?} primary key {field:?} is not an ObjectId field")]
    PrimaryKeyNotObjectId { schema: String, field: String },

    #[error("schema {schema:?} primary key {field:?} is not a declared field")]
    PrimaryKeyUndeclared { schema: String, field: String },

    #[error("schema {schema:?} declares field {field:?} twice")]
    DuplicateField { schema: String, field: String },

    #[error("schema {schema:?} field {field:?} collides with the key its primary key is emitted under")]
    IdKeyCollision { schema: String, field: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = DecodeError::UnsupportedDecode {
            field: "pattern".to_string(),
            field_type: FieldType::Regex,
        };
        assert_eq!(err.kind(), ErrorKind::UnsupportedDecode);
        assert_eq!(err.kind().code(), "GJ001");

        let err = PaginationError::InvalidParameter { name: "per_page", value: 0 };
        assert_eq!(err.kind().code(), "GJ003");

        let err = PaginationError::ExcludedField { field: "tokens".to_string() };
        assert_eq!(err.kind(), ErrorKind::SchemaMismatch);
    }

    #[test]
    fn test_store_errors_pass_through() {
        let inner = StoreError::Backend("connection reset".to_string());
        let err: EncodeError = inner.clone().into();
        assert_eq!(err.to_string(), inner.to_string());
        assert_eq!(err.kind(), ErrorKind::Storage);
    }
}
