//! Variable names and property-access chains

use serde_json::Value;

use super::expr::Expr;
use crate::template::error::TemplateError;

/// Words that can never name a variable
pub(crate) const RESERVED: &[&str] = &["and", "or", "not", "in", "if", "else", "for", "with", "as"];

/// Whether `name` is a syntactically valid identifier
pub(crate) fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

/// Validate a name that is about to be bound or looked up
///
/// # Errors
///
/// Returns [`TemplateError::InvalidVariable`] for malformed identifiers,
/// reserved control keywords and names starting with `__`.
pub(crate) fn validate_identifier(name: &str, line: usize) -> Result<(), TemplateError> {
    let reason = if name.starts_with("__") {
        "names starting with \"__\" are reserved"
    } else if RESERVED.contains(&name) {
        "reserved keyword"
    } else if !is_identifier(name) {
        "not a valid identifier"
    } else {
        return Ok(());
    };

    Err(TemplateError::InvalidVariable {
        name: name.to_string(),
        reason: reason.to_string(),
        line,
    })
}

/// One step of an access chain
#[derive(Debug, Clone)]
pub(crate) enum Segment {
    /// `.name` or a literal bracket key (`["name"]`, `[0]`)
    Key(Value),
    /// `[expr]` evaluated at render time under its own guard
    Index(Box<Expr>),
}

/// `root.a[b]["c"]`
#[derive(Debug, Clone)]
pub(crate) struct VarPath {
    pub root: String,
    pub segments: Vec<Segment>,
}

impl VarPath {
    pub fn new(root: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            segments: Vec::new(),
        }
    }

    /// Name under which a callable for this path is registered
    ///
    /// `form.input` maps to `form_input`, the way imported macros are exposed.
    /// Chains with dynamic segments have no callable name.
    pub fn callable_name(&self) -> Option<String> {
        let mut name = self.root.clone();
        for segment in &self.segments {
            match segment {
                Segment::Key(Value::String(key)) => {
                    name.push('_');
                    name.push_str(key);
                }
                _ => return None,
            }
        }
        Some(name)
    }

    /// Dotted form used in messages
    pub fn display(&self) -> String {
        let mut out = self.root.clone();
        for segment in &self.segments {
            match segment {
                Segment::Key(Value::String(key)) => {
                    out.push('.');
                    out.push_str(key);
                }
                Segment::Key(other) => out.push_str(&format!("[{other}]")),
                Segment::Index(_) => out.push_str("[...]"),
            }
        }
        out
    }
}

/// Take one step into `value`
///
/// Objects are keyed by the stringified key, arrays by a non-negative integer
/// (numeric strings included). Anything else has no members.
pub(crate) fn step<'v>(value: &'v Value, key: &Value) -> Option<&'v Value> {
    match value {
        Value::Object(map) => match key {
            Value::String(name) => map.get(name),
            other => map.get(&super::helpers::stringify(other)),
        },
        Value::Array(items) => array_index(key).and_then(|idx| items.get(idx)),
        _ => None,
    }
}

fn array_index(key: &Value) -> Option<usize> {
    match key {
        Value::Number(n) => n.as_u64().and_then(|idx| usize::try_from(idx).ok()),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// Walk every key of a chain, failing on the first undefined prefix
///
/// `null` counts as undefined, so `a.b` with `a = null` is not defined.
pub(crate) fn walk<'v>(root: &'v Value, keys: &[Value]) -> Option<&'v Value> {
    let mut current = root;
    if current.is_null() {
        return None;
    }
    for key in keys {
        current = step(current, key)?;
        if current.is_null() {
            return None;
        }
    }
    Some(current)
}
