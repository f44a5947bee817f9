//! Decodes a JSON file of records and prints what each field decoded to.
//!
//! Records are decoded against a dynamic schema: `created` is read as a
//! datetime (epoch millis or ISO-8601) and every other key is kept as-is.
//! The records are then re-encoded with ISO-8601 datetimes.

use std::collections::BTreeMap;
use std::fs;

use goodjson::model::{SchemaBuilder, SchemaRegistry, Value};
use goodjson::{CodecOptions, Decoder, EncodeOptions, Encoder, MemoryStore};

fn format_value(v: &Value) -> String {
    match v {
        Value::String(s) => {
            let preview: String = s.chars().take(60).collect();
            if s.chars().count() > 60 {
                format!("\"{}...\"", preview)
            } else {
                format!("\"{}\"", preview)
            }
        }
        Value::Int(i) => i.to_string(),
        Value::Float(f) => format!("{:.6}", f),
        Value::Bool(b) => b.to_string(),
        Value::DateTime(ms) => format!("DATETIME({})", goodjson::util::format_datetime_millis(*ms)),
        Value::Dict(map) => format!("DICT[{} keys]", map.len()),
        Value::List(items) => format!("LIST[{}]", items.len()),
        other => other.type_name().to_uppercase(),
    }
}

fn main() {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "records.json".to_string());

    println!("Reading: {}", path);
    let text = fs::read_to_string(&path).expect("Failed to read file");
    println!("File size: {} bytes", text.len());

    let registry: SchemaRegistry = [SchemaBuilder::document("records")
        .dynamic()
        .datetime("created")
        .build()]
    .into_iter()
    .collect();
    let store = MemoryStore::new();

    let json: serde_json::Value = serde_json::from_str(&text).expect("Failed to parse JSON");
    let records = Decoder::new(&registry, &store)
        .decode_many(&json, "records")
        .expect("Failed to decode");

    println!("\n=== Records: {} ===", records.len());
    let mut field_types: BTreeMap<String, BTreeMap<&'static str, usize>> = BTreeMap::new();
    for record in &records {
        for (field, value) in record.iter() {
            *field_types
                .entry(field.to_string())
                .or_default()
                .entry(value.type_name())
                .or_default() += 1;
        }
    }
    for (field, types) in &field_types {
        let summary = types
            .iter()
            .map(|(ty, count)| format!("{} x{}", ty, count))
            .collect::<Vec<_>>()
            .join(", ");
        println!("  {}: {}", field, summary);
    }

    if let Some(first) = records.first() {
        println!("\n=== First record ===");
        if let Some(id) = first.id() {
            println!("  id: {}", id);
        }
        for (field, value) in first.iter() {
            println!("  {}: {}", field, format_value(value));
        }
    }

    let encoder = Encoder::new(&registry, &store)
        .with_options(EncodeOptions::new().with_codec(CodecOptions::iso8601()));
    let encoded = encoder.encode_array(&records).expect("Failed to encode");
    let pretty = serde_json::to_string_pretty(&encoded).expect("Failed to serialize");
    println!("\n=== Re-encoded ({} bytes) ===", pretty.len());
    for line in pretty.lines().take(20) {
        println!("{}", line);
    }
}
