//! Scalar and wrapper-type conversion between [`Value`] and plain JSON.
//!
//! Every wrapper type has exactly one plain-JSON rendering:
//!
//! | Value       | JSON                                           |
//! |-------------|------------------------------------------------|
//! | `ObjectId`  | `"5f2b6c1e9d3a4b0012345678"`                   |
//! | `Uuid`      | `"550e8400-e29b-41d4-a716-446655440000"`       |
//! | `DateTime`  | `1710513000123` or `"2024-03-15T14:30:00.123Z"` |
//! | `Binary`    | `{"data": <base64>, "type": <subtype>}`        |
//! | `Regex`     | `{"regex": <pattern>, "flags": "im"}`          |
//! | `MinKey`    | `{"minKey": true}`                             |
//! | `MaxKey`    | `{"maxKey": true}`                             |
//! | `Timestamp` | `{"time": <secs>, "inc": <ordinal>}`           |
//! | `Code`      | `{"code": <source>, "scope": <object or null>}` |
//!
//! Regex, MinKey, MaxKey, Timestamp and Code are encode-only: decoding a field
//! declared with one of those types fails with
//! [`DecodeError::UnsupportedDecode`].

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use serde_json::{json, Number, Value as JsonValue};
use uuid::Uuid;

use crate::error::{DecodeError, EncodeError};
use crate::model::{parse_object_id, Binary, FieldType, JsonMap, Value};
use crate::util::{format_datetime_millis, parse_datetime_millis};

/// Rendering used for datetimes on encode. Decoding accepts either.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DateTimeFormat {
    /// Integer milliseconds since Unix epoch.
    #[default]
    EpochMillis,
    /// RFC 3339 string in UTC with millisecond precision.
    Iso8601,
}

/// Options for the scalar codec.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CodecOptions {
    pub datetime_format: DateTimeFormat,
}

impl CodecOptions {
    /// Creates default options (epoch-millisecond datetimes).
    pub fn new() -> Self {
        Self::default()
    }

    /// Options that render datetimes as ISO-8601 strings.
    pub fn iso8601() -> Self {
        Self {
            datetime_format: DateTimeFormat::Iso8601,
        }
    }
}

// =============================================================================
// ENCODING
// =============================================================================

/// Encodes a scalar or wrapper value to plain JSON.
///
/// Lists and dicts are encoded element-wise. Documents are not scalars and
/// must go through the document encoder.
pub fn encode_scalar(value: &Value, options: &CodecOptions) -> Result<JsonValue, EncodeError> {
    encode_scalar_field("", value, options)
}

/// Like [`encode_scalar`], naming `field` in errors.
pub(crate) fn encode_scalar_field(
    field: &str,
    value: &Value,
    options: &CodecOptions,
) -> Result<JsonValue, EncodeError> {
    let json = match value {
        Value::Null => JsonValue::Null,
        Value::Bool(v) => JsonValue::Bool(*v),
        Value::Int(v) => JsonValue::Number((*v).into()),
        Value::Float(v) => match Number::from_f64(*v) {
            Some(n) => JsonValue::Number(n),
            None => {
                return Err(EncodeError::NonFiniteFloat {
                    field: field.to_string(),
                });
            }
        },
        Value::String(s) => JsonValue::String(s.clone()),
        Value::Binary(bin) => json!({
            "data": STANDARD.encode(&bin.data),
            "type": bin.subtype,
        }),
        Value::ObjectId(id) | Value::Reference(id) => JsonValue::String(id.to_hex()),
        Value::Uuid(uuid) => JsonValue::String(uuid.hyphenated().to_string()),
        Value::DateTime(millis) => match options.datetime_format {
            DateTimeFormat::EpochMillis => JsonValue::Number((*millis).into()),
            DateTimeFormat::Iso8601 => JsonValue::String(format_datetime_millis(*millis)),
        },
        Value::Regex(re) => {
            let mut obj = JsonMap::new();
            obj.insert("regex".to_string(), JsonValue::String(re.pattern.clone()));
            if !re.flags.is_empty() {
                obj.insert("flags".to_string(), JsonValue::String(re.flags.clone()));
            }
            JsonValue::Object(obj)
        }
        Value::MinKey => json!({ "minKey": true }),
        Value::MaxKey => json!({ "maxKey": true }),
        Value::Timestamp(ts) => json!({ "time": ts.time, "inc": ts.inc }),
        Value::Code(code) => json!({
            "code": code.code,
            "scope": code.scope.clone().map(JsonValue::Object).unwrap_or(JsonValue::Null),
        }),
        Value::Dict(map) => JsonValue::Object(map.clone()),
        Value::List(items) => JsonValue::Array(
            items
                .iter()
                .map(|item| encode_scalar_field(field, item, options))
                .collect::<Result<Vec<_>, _>>()?,
        ),
        Value::Document(_) => {
            return Err(EncodeError::TypeMismatch {
                field: field.to_string(),
                expected: "scalar",
            });
        }
    };
    Ok(json)
}

// =============================================================================
// DECODING
// =============================================================================

/// Decodes plain JSON into a value of the declared field type.
///
/// `null` decodes to [`Value::Null`] for every type.
pub fn decode_scalar(
    field_type: &FieldType,
    json: &JsonValue,
    options: &CodecOptions,
) -> Result<Value, DecodeError> {
    decode_scalar_field("", field_type, json, options)
}

/// Like [`decode_scalar`], naming `field` in errors.
pub(crate) fn decode_scalar_field(
    field: &str,
    field_type: &FieldType,
    json: &JsonValue,
    options: &CodecOptions,
) -> Result<Value, DecodeError> {
    if field_type.is_encode_only() {
        return Err(DecodeError::UnsupportedDecode {
            field: field.to_string(),
            field_type: field_type.clone(),
        });
    }
    if json.is_null() {
        return Ok(Value::Null);
    }

    let expected = |what: &str| {
        DecodeError::mismatch(
            field,
            format!("expected {} for {} field, found {}", what, field_type.name(), json_kind(json)),
        )
    };

    match field_type {
        FieldType::String => json
            .as_str()
            .map(|s| Value::String(s.to_string()))
            .ok_or_else(|| expected("a string")),
        FieldType::Int => json.as_i64().map(Value::Int).ok_or_else(|| expected("an integer")),
        FieldType::Float => json.as_f64().map(Value::Float).ok_or_else(|| expected("a number")),
        FieldType::Bool => json.as_bool().map(Value::Bool).ok_or_else(|| expected("a boolean")),
        FieldType::Binary => decode_binary(field, json).map(Value::Binary),
        FieldType::ObjectId => {
            let s = json.as_str().ok_or_else(|| expected("a hex string"))?;
            parse_object_id(s)
                .map(Value::ObjectId)
                .ok_or_else(|| DecodeError::invalid(field, format!("{:?} is not a 24-character hex id", s)))
        }
        FieldType::Uuid => {
            let s = json.as_str().ok_or_else(|| expected("a UUID string"))?;
            Uuid::parse_str(s)
                .map(Value::Uuid)
                .map_err(|e| DecodeError::invalid(field, e.to_string()))
        }
        FieldType::DateTime => match json {
            JsonValue::Number(n) => n
                .as_i64()
                .map(Value::DateTime)
                .ok_or_else(|| expected("integer epoch milliseconds")),
            JsonValue::String(s) => parse_datetime_millis(s)
                .map(Value::DateTime)
                .map_err(|e| DecodeError::invalid(field, e.to_string())),
            _ => Err(expected("epoch milliseconds or an ISO-8601 string")),
        },
        FieldType::Dict => json
            .as_object()
            .map(|obj| Value::Dict(obj.clone()))
            .ok_or_else(|| expected("an object")),
        FieldType::List(inner) => {
            let items = json.as_array().ok_or_else(|| expected("an array"))?;
            items
                .iter()
                .map(|item| decode_scalar_field(field, inner, item, options))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::List)
        }
        FieldType::Embedded(_) | FieldType::Reference(_) => Err(DecodeError::mismatch(
            field,
            format!("{} fields are decoded by the document decoder", field_type.name()),
        )),
        FieldType::Regex
        | FieldType::MinKey
        | FieldType::MaxKey
        | FieldType::Timestamp
        | FieldType::Code => unreachable!("encode-only types rejected above"),
    }
}

fn decode_binary(field: &str, json: &JsonValue) -> Result<Binary, DecodeError> {
    let obj = json
        .as_object()
        .ok_or_else(|| DecodeError::mismatch(field, "expected {\"data\", \"type\"} object for binary field"))?;
    let data = obj
        .get("data")
        .and_then(JsonValue::as_str)
        .ok_or_else(|| DecodeError::mismatch(field, "binary object needs a base64 \"data\" string"))?;
    let subtype = match obj.get("type") {
        None | Some(JsonValue::Null) => 0,
        Some(t) => t
            .as_u64()
            .and_then(|t| u8::try_from(t).ok())
            .ok_or_else(|| DecodeError::invalid(field, "binary \"type\" must be 0-255"))?,
    };
    let data = STANDARD
        .decode(data)
        .map_err(|e| DecodeError::invalid(field, format!("bad base64: {}", e)))?;
    Ok(Binary { subtype, data })
}

/// Decodes JSON without a declared type (dynamic fields).
///
/// Objects become [`Value::Dict`], arrays [`Value::List`], integers
/// [`Value::Int`] and any other number [`Value::Float`].
pub fn decode_untyped(json: &JsonValue) -> Value {
    match json {
        JsonValue::Null => Value::Null,
        JsonValue::Bool(b) => Value::Bool(*b),
        JsonValue::Number(n) => match n.as_i64() {
            Some(i) => Value::Int(i),
            None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
        },
        JsonValue::String(s) => Value::String(s.clone()),
        JsonValue::Array(items) => Value::List(items.iter().map(decode_untyped).collect()),
        JsonValue::Object(obj) => Value::Dict(obj.clone()),
    }
}

/// Returns the field type that decodes `value`'s rendering back to the same tag.
///
/// `None` for values whose type cannot be inferred from the value alone
/// (documents, references, lists).
pub fn field_type_of(value: &Value) -> Option<FieldType> {
    let ft = match value {
        Value::Bool(_) => FieldType::Bool,
        Value::Int(_) => FieldType::Int,
        Value::Float(_) => FieldType::Float,
        Value::String(_) => FieldType::String,
        Value::Binary(_) => FieldType::Binary,
        Value::ObjectId(_) => FieldType::ObjectId,
        Value::Uuid(_) => FieldType::Uuid,
        Value::DateTime(_) => FieldType::DateTime,
        Value::Regex(_) => FieldType::Regex,
        Value::MinKey => FieldType::MinKey,
        Value::MaxKey => FieldType::MaxKey,
        Value::Timestamp(_) => FieldType::Timestamp,
        Value::Code(_) => FieldType::Code,
        Value::Dict(_) => FieldType::Dict,
        Value::Null | Value::List(_) | Value::Document(_) | Value::Reference(_) => return None,
    };
    Some(ft)
}

pub(crate) fn json_kind(json: &JsonValue) -> &'static str {
    match json {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}
