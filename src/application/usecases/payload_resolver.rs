use serde_json::{Map, Value};

use crate::domain::value_objects::payloads::{RawBody, RawRequestParts, ResolvedPayload};

/// Transport-control keys the automation backend must never see.
/// They address the request; they are not part of its payload.
pub const RESERVED_KEYS: [&str; 6] = [
    "instance_id",
    "endpoint",
    "method",
    "operation",
    "token",
    "csrf_token",
];

/// Merges query params and body fields into the single payload the
/// backend receives. Body fields override query params of the same
/// name. A `data` body field holding a JSON object (or a string that
/// parses to one) replaces the merged payload outright.
pub fn resolve(parts: RawRequestParts) -> ResolvedPayload {
    let RawRequestParts { query, body } = parts;

    let mut files = Vec::new();
    let mut body_fields = match body {
        RawBody::Empty => Map::new(),
        RawBody::Json(Value::Object(map)) => map,
        RawBody::Json(_) => Map::new(),
        RawBody::Form(pairs) => pairs_to_fields(pairs),
        RawBody::Multipart {
            fields,
            files: uploaded,
        } => {
            files = uploaded;
            pairs_to_fields(fields)
        }
    };

    let mut fields = match body_fields.remove("data").and_then(into_object) {
        Some(data) => data,
        None => {
            let mut merged: Map<String, Value> = query
                .into_iter()
                .map(|(key, value)| (key, Value::String(value)))
                .collect();
            merged.extend(body_fields);
            merged
        }
    };

    for key in RESERVED_KEYS {
        fields.remove(key);
    }

    ResolvedPayload { fields, files }
}

/// Reads a transport-control value before resolution strips it. Body
/// fields win over query params; within a form the last entry wins.
pub fn control_value(parts: &RawRequestParts, key: &str) -> Option<String> {
    let from_body = match &parts.body {
        RawBody::Empty => None,
        RawBody::Json(Value::Object(map)) => map.get(key).and_then(scalar_to_string),
        RawBody::Json(_) => None,
        RawBody::Form(pairs) => last_pair(pairs, key),
        RawBody::Multipart { fields, .. } => last_pair(fields, key),
    };

    from_body.or_else(|| last_pair(&parts.query, key))
}

fn pairs_to_fields(pairs: Vec<(String, String)>) -> Map<String, Value> {
    pairs
        .into_iter()
        .map(|(key, value)| (key, Value::String(value)))
        .collect()
}

fn into_object(value: Value) -> Option<Map<String, Value>> {
    match value {
        Value::Object(map) => Some(map),
        Value::String(raw) => match serde_json::from_str(&raw) {
            Ok(Value::Object(map)) => Some(map),
            _ => None,
        },
        _ => None,
    }
}

fn last_pair(pairs: &[(String, String)], key: &str) -> Option<String> {
    pairs
        .iter()
        .rev()
        .find(|(name, _)| name == key)
        .map(|(_, value)| value.clone())
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}
