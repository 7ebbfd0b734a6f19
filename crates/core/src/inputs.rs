//! Submitted input values and the small coercions executors share.

use serde_json::{Map, Value};

/// Field name to submitted value. Keys not declared by the command are
/// ignored by every consumer.
pub type SubmittedInputs = Map<String, Value>;

/// Absent, `null`, or the empty string.
pub fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(_) => false,
    }
}

/// Loose truthiness used for flag inputs and opaque service results.
///
/// `false`, `0`, `""`, `"0"`, `"false"`, `null`, and empty collections are falsy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !(s.is_empty() || s == "0" || s.eq_ignore_ascii_case("false")),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Render a scalar for use on a command line. Strings are taken verbatim;
/// compound values fall back to their JSON text.
pub fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

/// Flatten a value to a single string, joining list items with commas.
pub fn flatten_to_string(value: &Value) -> String {
    match value {
        Value::Array(items) => items
            .iter()
            .map(flatten_to_string)
            .collect::<Vec<_>>()
            .join(","),
        other => scalar_to_string(other),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
