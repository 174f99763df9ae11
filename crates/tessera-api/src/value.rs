//! Helpers for working with loosely-typed JSON documents.
//!
//! Block documents and fetched records are plain `serde_json::Value`s. The
//! engine never fails on unexpected shapes: numbers are coerced permissively,
//! missing paths resolve to `None`, and every value has a display string.

use serde_json::{Map, Value};

/// Resolve a dot-separated path (`"author.name"`, `"items.0.price"`) inside a value.
///
/// Array segments are parsed as indices. Returns `None` as soon as a segment
/// does not resolve.
pub fn value_at_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return Some(value);
    }
    path.split('.').try_fold(value, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// Permissive numeric cast: anything that is not a finite number becomes `0.0`.
///
/// Strings are trimmed and parsed (an empty string is `0`), booleans map to
/// `1`/`0`, everything else contributes `0`.
pub fn to_number(value: &Value) -> f64 {
    let n = match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                0.0
            } else {
                trimmed.parse::<f64>().unwrap_or(0.0)
            }
        }
        Value::Bool(true) => 1.0,
        _ => 0.0,
    };
    if n.is_finite() {
        n
    } else {
        0.0
    }
}

/// Convert a computed float back into a JSON number, preferring an integer
/// representation when the value has no fractional part.
pub fn json_number(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 {
        Value::from(n as i64)
    } else {
        serde_json::Number::from_f64(n)
            .map(Value::Number)
            .unwrap_or_else(|| Value::from(0))
    }
}

/// Display string for a value, following the conventions block authors expect
/// from template placeholders and group keys.
///
/// Strings are used as-is, whole floats print without a trailing `.0`,
/// `null` prints as `"null"`, arrays are joined with commas and objects print
/// as `"[object Object]"`.
pub fn js_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                i.to_string()
            } else if let Some(u) = n.as_u64() {
                u.to_string()
            } else {
                let f = n.as_f64().unwrap_or(0.0);
                if f.fract() == 0.0 && f.abs() < 1e21 {
                    format!("{}", f as i64)
                } else {
                    f.to_string()
                }
            }
        }
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Null => String::new(),
                other => js_string(other),
            })
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => "[object Object]".to_string(),
    }
}

/// Extract a document list from an arbitrary payload.
///
/// Accepts a bare array, an object carrying a `docs` array, or a single
/// document (wrapped). `null` yields an empty list.
pub fn docs_from(value: &Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items.clone(),
        Value::Object(map) => match map.get("docs") {
            Some(Value::Array(items)) => items.clone(),
            _ => vec![value.clone()],
        },
        Value::Null => Vec::new(),
        other => vec![other.clone()],
    }
}

/// Identifier of a document as a string, if it has one.
pub fn document_id(doc: &Value) -> Option<String> {
    match doc.get("id")? {
        Value::Null => None,
        id => Some(js_string(id)),
    }
}

/// Shallow merge of `patch` into `target`; keys in `patch` win.
pub fn merge_objects(target: &mut Map<String, Value>, patch: &Map<String, Value>) {
    for (key, value) in patch {
        target.insert(key.clone(), value.clone());
    }
}
