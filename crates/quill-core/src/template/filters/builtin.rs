//! Built-in filters

use regex::RegexBuilder;
use serde::Serialize;
use serde_json::Value;
use std::sync::{Arc, OnceLock};

use super::{EscapeKind, FilterRegistry};
use crate::template::date;
use crate::template::engine::helpers::{number, strict_eq, stringify, to_number};

pub(super) fn register(registry: &mut FilterRegistry, tz_offset: i32) {
    registry.insert("add", Arc::new(add));
    registry.insert("addslashes", Arc::new(addslashes));
    registry.insert("capitalize", Arc::new(capitalize));
    registry.insert(
        "date",
        Arc::new(move |input: &Value, args: &[Value]| date_filter(input, args, tz_offset)),
    );
    registry.insert("default", Arc::new(default));
    registry.insert("e", Arc::new(escape));
    registry.insert("escape", Arc::new(escape));
    registry.insert("first", Arc::new(first));
    registry.insert("join", Arc::new(join));
    registry.insert("json_encode", Arc::new(json_encode));
    registry.insert("last", Arc::new(last));
    registry.insert("length", Arc::new(length));
    registry.insert("lower", Arc::new(lower));
    registry.insert("raw", Arc::new(raw));
    registry.insert("replace", Arc::new(replace));
    registry.insert("reverse", Arc::new(reverse));
    registry.insert("striptags", Arc::new(striptags));
    registry.insert("title", Arc::new(title));
    registry.insert("uniq", Arc::new(uniq));
    registry.insert("upper", Arc::new(upper));
    registry.insert("url_encode", Arc::new(url_encode));
    registry.insert("url_decode", Arc::new(url_decode));
}

fn empty() -> Value {
    Value::String(String::new())
}

fn arg_str(args: &[Value], idx: usize) -> Option<String> {
    args.get(idx).filter(|v| !v.is_null()).map(stringify)
}

/// Apply `f` to every string inside `value`, recursing into arrays and objects
///
/// Other scalars are stringified first.
fn map_strings(value: &Value, f: &dyn Fn(&str) -> String) -> Value {
    match value {
        Value::Array(items) => Value::Array(items.iter().map(|item| map_strings(item, f)).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, item)| (key.clone(), map_strings(item, f)))
                .collect(),
        ),
        Value::String(s) => Value::String(f(s)),
        other => Value::String(f(&stringify(other))),
    }
}

fn add(input: &Value, args: &[Value]) -> Value {
    let addend = args.first().unwrap_or(&Value::Null);
    match (input, addend) {
        (Value::Array(lhs), Value::Array(rhs)) => Value::Array(lhs.iter().chain(rhs).cloned().collect()),
        (Value::Object(lhs), Value::Object(rhs)) => {
            let mut merged = lhs.clone();
            merged.extend(rhs.iter().map(|(k, v)| (k.clone(), v.clone())));
            Value::Object(merged)
        }
        (Value::Number(_), Value::Number(_)) => number(to_number(input) + to_number(addend)),
        _ => Value::String(stringify(input) + &stringify(addend)),
    }
}

fn addslashes(input: &Value, _args: &[Value]) -> Value {
    map_strings(input, &|s| s.replace('\\', "\\\\").replace('\'', "\\'").replace('"', "\\\""))
}

fn capitalize(input: &Value, _args: &[Value]) -> Value {
    map_strings(input, &|s| {
        let mut chars = s.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars.as_str().to_lowercase().chars()).collect(),
            None => String::new(),
        }
    })
}

/// `date(format, offset?, abbr?)`
fn date_filter(input: &Value, args: &[Value], tz_offset: i32) -> Value {
    let Some(instant) = date::parse_date(input) else {
        return empty();
    };
    let format = arg_str(args, 0).unwrap_or_default();
    let offset = args
        .get(1)
        .filter(|v| !v.is_null())
        .map(to_number)
        .filter(|n| n.is_finite())
        .map_or(tz_offset, |n| n as i32);
    let abbr = arg_str(args, 2);

    Value::String(date::format(&instant, &format, offset, abbr.as_deref()))
}

/// Falls back for `null`, `false` and `""`; `0` is kept
fn default(input: &Value, args: &[Value]) -> Value {
    let keep = match input {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        Value::Number(_) | Value::Array(_) | Value::Object(_) => true,
    };
    if keep {
        input.clone()
    } else {
        args.first().cloned().unwrap_or_else(empty)
    }
}

/// `escape(kind?)`, `kind` is `"html"` (default) or `"js"`
fn escape(input: &Value, args: &[Value]) -> Value {
    let kind = arg_str(args, 0)
        .and_then(|name| EscapeKind::from_name(&name))
        .unwrap_or_default();
    map_strings(input, &|s| kind.apply(s))
}

fn first(input: &Value, _args: &[Value]) -> Value {
    match input {
        Value::Array(items) => items.first().cloned().unwrap_or_else(empty),
        Value::String(s) => Value::String(s.chars().take(1).collect()),
        _ => empty(),
    }
}

fn last(input: &Value, _args: &[Value]) -> Value {
    match input {
        Value::Array(items) => items.last().cloned().unwrap_or_else(empty),
        Value::String(s) => Value::String(s.chars().last().map(String::from).unwrap_or_default()),
        _ => empty(),
    }
}

fn join(input: &Value, args: &[Value]) -> Value {
    let glue = arg_str(args, 0).unwrap_or_default();
    match input {
        Value::Array(items) => Value::String(items.iter().map(stringify).collect::<Vec<_>>().join(&glue)),
        Value::Object(map) => Value::String(map.values().map(stringify).collect::<Vec<_>>().join(&glue)),
        Value::String(_) => input.clone(),
        _ => empty(),
    }
}

/// Widest `json_encode` indent; larger widths are clamped
const MAX_JSON_INDENT: f64 = 10.0;

/// `json_encode(indent?)`
///
/// Indents below one space encode compactly.
fn json_encode(input: &Value, args: &[Value]) -> Value {
    let indent = args
        .first()
        .map(to_number)
        .filter(|n| n.is_finite() && *n >= 1.0)
        .map(|n| n.min(MAX_JSON_INDENT) as usize);
    let encoded = match indent {
        Some(width) => pretty_json(input, width),
        None => serde_json::to_string(input).ok(),
    };
    encoded.map_or_else(empty, Value::String)
}

fn pretty_json(value: &Value, width: usize) -> Option<String> {
    let indent = " ".repeat(width);
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(indent.as_bytes());
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut serializer).ok()?;
    String::from_utf8(buf).ok()
}

fn length(input: &Value, _args: &[Value]) -> Value {
    match input {
        Value::Array(items) => Value::from(items.len()),
        Value::Object(map) => Value::from(map.len()),
        Value::String(s) => Value::from(s.chars().count()),
        _ => empty(),
    }
}

fn lower(input: &Value, _args: &[Value]) -> Value {
    map_strings(input, &str::to_lowercase)
}

fn upper(input: &Value, _args: &[Value]) -> Value {
    map_strings(input, &str::to_uppercase)
}

fn raw(input: &Value, _args: &[Value]) -> Value {
    input.clone()
}

/// `replace(pattern, replacement, flags?)`
///
/// `pattern` is a regular expression. Without the `g` flag only the first
/// match is replaced; `i` makes it case-insensitive. An invalid pattern leaves
/// the input unchanged.
fn replace(input: &Value, args: &[Value]) -> Value {
    let text = stringify(input);
    let Some(pattern) = arg_str(args, 0) else {
        return Value::String(text);
    };
    let replacement = arg_str(args, 1).unwrap_or_default();
    let flags = arg_str(args, 2).unwrap_or_default();

    let regex = match RegexBuilder::new(&pattern)
        .case_insensitive(flags.contains('i'))
        .build()
    {
        Ok(regex) => regex,
        Err(err) => {
            tracing::debug!(%pattern, error = %err, "replace filter pattern rejected");
            return Value::String(text);
        }
    };

    let replaced = if flags.contains('g') {
        regex.replace_all(&text, replacement.as_str())
    } else {
        regex.replace(&text, replacement.as_str())
    };
    Value::String(replaced.into_owned())
}

fn reverse(input: &Value, _args: &[Value]) -> Value {
    match input {
        Value::Array(items) => Value::Array(items.iter().rev().cloned().collect()),
        other => other.clone(),
    }
}

fn tag_pattern() -> Option<&'static regex::Regex> {
    static TAGS: OnceLock<Option<regex::Regex>> = OnceLock::new();
    TAGS.get_or_init(|| regex::Regex::new(r"<[^>]+>").ok()).as_ref()
}

fn word_pattern() -> Option<&'static regex::Regex> {
    static WORDS: OnceLock<Option<regex::Regex>> = OnceLock::new();
    WORDS.get_or_init(|| regex::Regex::new(r"\w\S*").ok()).as_ref()
}

fn striptags(input: &Value, _args: &[Value]) -> Value {
    map_strings(input, &|s| match tag_pattern() {
        Some(tags) => tags.replace_all(s, "").into_owned(),
        None => s.to_string(),
    })
}

fn title(input: &Value, _args: &[Value]) -> Value {
    map_strings(input, &|s| match word_pattern() {
        Some(words) => words
            .replace_all(s, |caps: &regex::Captures<'_>| {
                let word = &caps[0];
                let mut chars = word.chars();
                chars
                    .next()
                    .map(|first| first.to_uppercase().chain(chars.as_str().to_lowercase().chars()).collect::<String>())
                    .unwrap_or_default()
            })
            .into_owned(),
        None => s.to_string(),
    })
}

fn uniq(input: &Value, _args: &[Value]) -> Value {
    let Value::Array(items) = input else {
        return input.clone();
    };
    let mut seen: Vec<Value> = Vec::with_capacity(items.len());
    for item in items {
        if !seen.iter().any(|kept| strict_eq(kept, item)) {
            seen.push(item.clone());
        }
    }
    Value::Array(seen)
}

fn url_encode(input: &Value, _args: &[Value]) -> Value {
    map_strings(input, &|s| urlencoding::encode(s).into_owned())
}

fn url_decode(input: &Value, _args: &[Value]) -> Value {
    map_strings(input, &|s| {
        urlencoding::decode(s).map_or_else(|_| s.to_string(), |decoded| decoded.into_owned())
    })
}

