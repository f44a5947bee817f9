//! Reference resolution with a bounded hop budget.
//!
//! On encode, a reference is either inlined (the referenced document is
//! fetched and encoded in place) or rendered bare (its hex id, or the
//! `{"collection", "id"}` form for dbref fields). On decode, a plain
//! reference keeps only the id; an auto-following reference binds to an
//! existing document or constructs a new one.
//!
//! # Budget
//!
//! Every hop into a referenced document spends one unit of the
//! [`RecursionBudget`]. Embedded documents do not. With `max_depth = 2` the
//! chain `A -> B -> C -> D` encodes A with B and C inlined and D bare.
//!
//! In bounded mode nothing else stops a cycle: a self-referencing document
//! is re-entered until the budget runs out. In [`MaxDepth::Unlimited`] mode
//! the encoder tracks the documents currently being encoded and fails with
//! [`EncodeError::UnboundedRecursion`] when a reference re-enters one.

use serde_json::{json, Value as JsonValue};
use tracing::trace;

use crate::codec::decoder::{Decoder, PendingSaves};
use crate::codec::encoder::Encoder;
use crate::error::{DecodeError, EncodeError};
use crate::model::{parse_object_id, MaxDepth, ObjectId, ReferenceField, Value, ID_KEY};

/// Hop counter plus the configured maximum, threaded through every
/// recursive encode call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecursionBudget {
    max: MaxDepth,
    depth: u32,
}

impl RecursionBudget {
    /// A fresh budget at the root document.
    pub fn new(max: MaxDepth) -> Self {
        Self { max, depth: 0 }
    }

    /// Hops already taken from the root document.
    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn max(&self) -> MaxDepth {
        self.max
    }

    /// Hops still allowed; `None` when unlimited.
    pub fn remaining(&self) -> Option<u32> {
        match self.max {
            MaxDepth::Limited(max) => Some(max.saturating_sub(self.depth)),
            MaxDepth::Unlimited => None,
        }
    }

    /// Returns true if one more hop is allowed.
    pub fn can_descend(&self) -> bool {
        self.remaining() != Some(0)
    }

    /// The budget one hop further down.
    pub fn descend(&self) -> Self {
        Self {
            max: self.max,
            depth: self.depth.saturating_add(1),
        }
    }
}

/// Documents currently being encoded, root first. Only populated in
/// unlimited mode.
pub(crate) type Ancestors = Vec<(String, ObjectId)>;

// =============================================================================
// ENCODE
// =============================================================================

impl Encoder<'_> {
    /// Renders one reference value: inlined document, bare id, or null.
    ///
    /// `value` is a single element; reference lists are resolved element by
    /// element by the document encoder.
    pub fn resolve_for_encode(
        &self,
        field: &str,
        reference: &ReferenceField,
        value: &Value,
        budget: RecursionBudget,
    ) -> Result<JsonValue, EncodeError> {
        let mut ancestors = Ancestors::new();
        self.resolve_reference(field, reference, value, budget, &mut ancestors)
    }

    pub(crate) fn resolve_reference(
        &self,
        field: &str,
        reference: &ReferenceField,
        value: &Value,
        budget: RecursionBudget,
        ancestors: &mut Ancestors,
    ) -> Result<JsonValue, EncodeError> {
        let inline = self.should_inline(reference, budget);
        trace!(
            field,
            target = %reference.target,
            depth = budget.depth(),
            remaining = ?budget.remaining(),
            inline,
            "resolving reference"
        );

        match value {
            Value::Null => Ok(JsonValue::Null),
            Value::Reference(id) | Value::ObjectId(id) => {
                if inline {
                    let doc = self.store().fetch(&reference.target, id)?;
                    let node = self.encode_document(&doc, budget.descend(), ancestors)?;
                    Ok(node.into_value())
                } else {
                    Ok(bare_reference(reference, id))
                }
            }
            Value::Document(doc) => {
                if inline {
                    let node = self.encode_document(doc, budget.descend(), ancestors)?;
                    return Ok(node.into_value());
                }
                match doc.id() {
                    Some(id) => Ok(bare_reference(reference, &id)),
                    None if reference.follow.is_none_or(|f| f.id_check) => {
                        Err(EncodeError::MissingReferenceId {
                            field: field.to_string(),
                        })
                    }
                    None => Ok(JsonValue::Null),
                }
            }
            _ => Err(EncodeError::TypeMismatch {
                field: field.to_string(),
                expected: "reference",
            }),
        }
    }

    /// Decides whether a reference at this budget is inlined.
    ///
    /// Plain references follow the caller's follow mode. Auto-following
    /// references always try, capped by their own `max_depth` as well as
    /// the caller's budget.
    fn should_inline(&self, reference: &ReferenceField, budget: RecursionBudget) -> bool {
        if !budget.can_descend() {
            return false;
        }
        match &reference.follow {
            Some(follow) => match follow.max_depth {
                MaxDepth::Limited(max) => budget.depth() < max,
                MaxDepth::Unlimited => true,
            },
            None => self.options().follow_reference,
        }
    }
}

fn bare_reference(reference: &ReferenceField, id: &ObjectId) -> JsonValue {
    if reference.dbref {
        json!({ "collection": reference.target, "id": id.to_hex() })
    } else {
        JsonValue::String(id.to_hex())
    }
}

// =============================================================================
// DECODE
// =============================================================================

impl Decoder<'_> {
    /// Turns one JSON reference payload into a field value.
    ///
    /// Documents constructed by auto-saving fields are persisted before this
    /// returns.
    pub fn resolve_for_decode(
        &self,
        field: &str,
        reference: &ReferenceField,
        json: &JsonValue,
    ) -> Result<Value, DecodeError> {
        let mut pending = PendingSaves::new();
        let value = self.resolve_reference(field, reference, json, &mut pending)?;
        self.flush(pending)?;
        Ok(value)
    }

    pub(crate) fn resolve_reference(
        &self,
        field: &str,
        reference: &ReferenceField,
        json: &JsonValue,
        pending: &mut PendingSaves,
    ) -> Result<Value, DecodeError> {
        match json {
            JsonValue::Null => Ok(Value::Null),
            JsonValue::String(s) => parse_reference_id(field, s).map(Value::Reference),
            JsonValue::Object(obj) => {
                let id = match obj.get(ID_KEY) {
                    None | Some(JsonValue::Null) => None,
                    Some(JsonValue::String(s)) => Some(parse_reference_id(field, s)?),
                    Some(_) => {
                        return Err(DecodeError::mismatch(field, "reference \"id\" must be a hex string"));
                    }
                };

                let Some(follow) = reference.follow else {
                    // Plain references keep the id and drop everything else
                    return id
                        .map(Value::Reference)
                        .ok_or_else(|| DecodeError::mismatch(field, "reference object has no \"id\""));
                };

                if let Some(id) = id {
                    if self.store().exists(&reference.target, &id)? {
                        trace!(field, target = %reference.target, id = %id, "bound to existing document");
                        return Ok(Value::Reference(id));
                    }
                }

                let mut payload = obj.clone();
                payload.remove(ID_KEY);
                let mut doc =
                    self.decode_document(&JsonValue::Object(payload), &reference.target, pending)?;

                if follow.autosave {
                    let id = ObjectId::new();
                    doc.set_id(id);
                    trace!(field, target = %reference.target, id = %id, "queued new document for save");
                    pending.push(doc);
                    Ok(Value::Reference(id))
                } else {
                    Ok(Value::Document(Box::new(doc)))
                }
            }
            other => Err(DecodeError::mismatch(
                field,
                format!(
                    "expected a hex id or an object for reference field, found {}",
                    crate::codec::scalar::json_kind(other)
                ),
            )),
        }
    }
}

fn parse_reference_id(field: &str, s: &str) -> Result<ObjectId, DecodeError> {
    parse_object_id(s)
        .ok_or_else(|| DecodeError::invalid(field, format!("{:?} is not a 24-character hex id", s)))
}
