//! Record Normalizer
//!
//! Maps heterogeneous upstream objects onto [`TokenRecord`] and derives the
//! launch-entity group key.

use serde_json::{Map, Value};

use crate::fields::{Field, FIELD_TABLE};
use crate::models::TokenRecord;

/// Render a scalar JSON value as trimmed text. Blank strings, nulls and
/// containers are absent.
fn scalar_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null | Value::Array(_) | Value::Object(_) => return None,
    };
    (!text.is_empty()).then_some(text)
}

/// First non-blank alias value for `aliases`.
pub fn resolve(object: &Map<String, Value>, aliases: &[&str]) -> Option<String> {
    aliases
        .iter()
        .filter_map(|alias| object.get(*alias))
        .find_map(scalar_text)
}

/// Normalize one raw object through the field resolution table.
pub fn normalize_object(object: &Map<String, Value>) -> TokenRecord {
    let mut record = TokenRecord::default();
    for (field, aliases) in FIELD_TABLE {
        *record.slot_mut(*field) = resolve(object, aliases);
    }
    record
}

/// Normalize a sequence of raw values, skipping anything that is not an object.
pub fn normalize_all(values: &[Value]) -> Vec<TokenRecord> {
    values
        .iter()
        .filter_map(Value::as_object)
        .map(normalize_object)
        .collect()
}

/// Derive the launch-entity name for a record.
///
/// Resolution order: explicit LE name, status description, category, then a
/// name synthesized from token type, token and surface. Always non-empty.
pub fn group_key_of(record: &TokenRecord) -> String {
    for field in [Field::LeName, Field::SdsStatus, Field::TokenCategory] {
        if let Some(name) = record.get(field) {
            return name.to_string();
        }
    }

    let token_type = record.get(Field::TokenType).unwrap_or("Unknown");

    match (record.get(Field::SdsToken), record.get(Field::Surface)) {
        (Some(token), Some(surface)) => {
            let last_segment = token
                .rsplit('.')
                .next()
                .filter(|s| !s.is_empty())
                .unwrap_or(token);
            format!("{token_type} Changes - {last_segment} ({surface})")
        }
        (_, Some(surface)) => format!("{token_type} Changes - {surface}"),
        _ => format!("{token_type} Token Changes"),
    }
}
