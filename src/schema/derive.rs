//! Flat field-schema inference from JSON documents.
//!
//! Catalogues the shape of observed API responses as a flat list of
//! `(path, type, storage hint)` rows. Arrays are assumed homogeneous: only
//! the first element is traversed, so heterogeneous arrays are described by
//! their first element alone. This is a known limitation, not a bug.

use serde_json::Value;

use serde::{Deserialize, Serialize};

/// Strings longer than this are hinted for out-of-line ("bytes") storage.
const LARGE_STRING_THRESHOLD: usize = 1000;

/// One row of a derived schema: a JSON-Pointer-like path, the inferred type
/// (`object`/`array`/`string`/`number`/`boolean`/`null`), and a storage hint
/// (`json` for containers, `string` or `bytes` for primitives).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSchema {
    pub path: String,
    pub inferred_type: String,
    pub storage_hint: String,
}

impl FieldSchema {
    fn new(path: &str, inferred_type: &str, storage_hint: &str) -> Self {
        Self {
            path: path.to_string(),
            inferred_type: inferred_type.to_string(),
            storage_hint: storage_hint.to_string(),
        }
    }
}

/// Derive a flat schema from a JSON document.
///
/// Fail-open: input that does not parse as JSON yields an empty schema
/// rather than an error, so a truncated body can never break export.
pub fn derive_schema(json_string: &str) -> Vec<FieldSchema> {
    match serde_json::from_str::<Value>(json_string) {
        Ok(value) => {
            let mut fields = Vec::new();
            traverse(&value, "$", &mut fields);
            fields
        }
        Err(e) => {
            log::debug!("SCHEMA_DERIVE_FAILED error={}", e);
            Vec::new()
        }
    }
}

fn traverse(value: &Value, path: &str, fields: &mut Vec<FieldSchema>) {
    match value {
        Value::Object(map) => {
            fields.push(FieldSchema::new(path, "object", "json"));
            for (key, member) in map {
                traverse(member, &format!("{}.{}", path, key), fields);
            }
        }
        Value::Array(items) => {
            fields.push(FieldSchema::new(path, "array", "json"));
            if let Some(first) = items.first() {
                traverse(first, &format!("{}[0]", path), fields);
            }
        }
        Value::String(s) => {
            let hint = if s.len() > LARGE_STRING_THRESHOLD {
                "bytes"
            } else {
                "string"
            };
            fields.push(FieldSchema::new(path, "string", hint));
        }
        Value::Bool(_) => fields.push(FieldSchema::new(path, "boolean", "string")),
        Value::Number(_) => fields.push(FieldSchema::new(path, "number", "string")),
        Value::Null => fields.push(FieldSchema::new(path, "null", "string")),
    }
}
