// Accessor helpers for the raw NDC response documents.
//
// The distribution API returns deeply nested JSON where absence is normal:
// the same logical field can live at different levels depending on airline
// and fare family, and anything expected to be a list may arrive as a single
// object. These helpers keep that tolerance in one place so the transformer
// modules read as plain fallback chains.

use serde_json::Value;

/// Walks `path` through nested objects, returning `None` as soon as a key is
/// missing or the current node is not an object.
pub fn get_path<'a>(doc: &'a Value, path: &[&str]) -> Option<&'a Value> {
    let mut current = doc;
    for key in path {
        current = current.as_object()?.get(*key)?;
    }
    Some(current)
}

/// Like [`get_path`] but resolves to a string slice.
pub fn str_at<'a>(doc: &'a Value, path: &[&str]) -> Option<&'a str> {
    get_path(doc, path).and_then(Value::as_str)
}

/// Resolves `path` to a list of nodes, wrapping a lone object or scalar into
/// a one-element list. Missing keys and explicit nulls yield an empty list.
pub fn list_at<'a>(doc: &'a Value, path: &[&str]) -> Vec<&'a Value> {
    match get_path(doc, path) {
        Some(Value::Array(items)) => items.iter().collect(),
        Some(Value::Null) | None => Vec::new(),
        Some(other) => vec![other],
    }
}

/// Unwraps the `{ "value": … }` envelope several NDC fields use. A bare
/// string is accepted as-is, so both `"EK"` and `{"value": "EK"}` resolve.
pub fn unwrap_value(node: &Value) -> Option<&str> {
    match node {
        Value::String(s) => Some(s),
        Value::Object(map) => map.get("value").and_then(Value::as_str),
        _ => None,
    }
}

/// Numeric variant of [`unwrap_value`]: accepts a bare number or an object
/// carrying `value`. Anything else is 0.0.
pub fn unwrap_number(node: &Value) -> f64 {
    match node {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::Object(map) => map.get("value").and_then(Value::as_f64).unwrap_or(0.0),
        _ => 0.0,
    }
}

/// Renders an amount the way the source document carried it: integral values
/// print without a trailing `.0` so `200` stays `200` in derived keys.
pub fn format_amount(amount: f64) -> String {
    if amount.fract() == 0.0 && amount.abs() < 1e15 {
        format!("{}", amount as i64)
    } else {
        format!("{}", amount)
    }
}
