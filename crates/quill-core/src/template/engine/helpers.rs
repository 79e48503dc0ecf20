//! Value helpers for template rendering
//!
//! Context values are JSON; comparisons and truthiness follow the loose rules
//! template authors expect from JavaScript-flavoured engines.

use serde_json::{json, Map, Value};
use std::cmp::Ordering;

/// Stringify a value for template output
///
/// `null` renders as the empty string, integral numbers without a fraction,
/// arrays as their comma-joined items and objects as compact JSON.
pub(crate) fn stringify(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        // f64's Display already omits a trailing ".0"
        Value::Number(n) if n.is_f64() => format!("{}", n.as_f64().unwrap_or_default()),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(stringify).collect::<Vec<_>>().join(","),
        Value::Object(_) => value.to_string(),
    }
}

/// Build a JSON number from a float, keeping integral values integral
pub(crate) fn number(f: f64) -> Value {
    if f.fract() == 0.0 && f.abs() < 9.007_199_254_740_992e15 {
        json!(f as i64)
    } else {
        serde_json::Number::from_f64(f).map_or(Value::Null, Value::Number)
    }
}

pub(crate) fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Numeric view of a value (`NaN` when it has none)
pub(crate) fn to_number(value: &Value) -> f64 {
    match value {
        Value::Null => 0.0,
        Value::Bool(b) => f64::from(u8::from(*b)),
        Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                0.0
            } else {
                s.parse().unwrap_or(f64::NAN)
            }
        }
        Value::Array(_) | Value::Object(_) => f64::NAN,
    }
}

/// `===`: same type and same value
pub(crate) fn strict_eq(lhs: &Value, rhs: &Value) -> bool {
    match (lhs, rhs) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        _ => lhs == rhs,
    }
}

/// `==`: compares across types after coercion
pub(crate) fn loose_eq(lhs: &Value, rhs: &Value) -> bool {
    match (lhs, rhs) {
        (Value::Null, Value::Null) => true,
        (Value::Null, _) | (_, Value::Null) => false,
        (Value::String(a), Value::String(b)) => a == b,
        (Value::Array(_) | Value::Object(_), Value::Array(_) | Value::Object(_)) => lhs == rhs,
        (Value::Array(_) | Value::Object(_), _) | (_, Value::Array(_) | Value::Object(_)) => {
            stringify(lhs) == stringify(rhs)
        }
        _ => to_number(lhs) == to_number(rhs),
    }
}

/// Ordering for `<`, `>`, `<=`, `>=`
///
/// Two strings compare lexicographically, everything else numerically.
/// `None` when either side is not a number.
pub(crate) fn compare(lhs: &Value, rhs: &Value) -> Option<Ordering> {
    match (lhs, rhs) {
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => to_number(lhs).partial_cmp(&to_number(rhs)),
    }
}

/// `needle in haystack`
pub(crate) fn contains(haystack: &Value, needle: &Value) -> bool {
    match haystack {
        Value::Array(items) => items.iter().any(|item| strict_eq(item, needle)),
        Value::Object(map) => map.contains_key(&stringify(needle)),
        Value::String(s) => s.contains(&stringify(needle)),
        _ => false,
    }
}

/// Per-iteration `loop` record
pub(crate) fn loop_metadata(index: usize, length: usize, key: Value) -> Value {
    let mut meta = Map::new();
    meta.insert("index".into(), json!(index + 1));
    meta.insert("index0".into(), json!(index));
    meta.insert("revindex".into(), json!(length - index));
    meta.insert("revindex0".into(), json!(length - index - 1));
    meta.insert("first".into(), json!(index == 0));
    meta.insert("last".into(), json!(index + 1 == length));
    meta.insert("key".into(), key);
    meta.insert("length".into(), json!(length));
    Value::Object(meta)
}
