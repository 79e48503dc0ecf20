//! Render context: data plus named callables

use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::node::MacroDef;

/// Native function signature: evaluated arguments in, value or message out
pub type NativeFn = dyn Fn(&[Value]) -> Result<Value, String> + Send + Sync;

#[derive(Clone)]
pub(crate) enum Callable {
    Macro(Arc<MacroDef>),
    Native(Arc<NativeFn>),
}

/// Data a template renders against
///
/// Holds a JSON object of variables and the callables defined so far (macros
/// declared or imported by templates, and host functions added with
/// [`Context::with_function`]).
///
/// ```rust
/// use quill_core::template::Context;
/// use serde_json::json;
///
/// let ctx = Context::new(json!({"name": "Ada"}))
///     .with_function("shout", |args| {
///         Ok(json!(args.first().and_then(|v| v.as_str()).unwrap_or_default().to_uppercase()))
///     });
/// assert_eq!(ctx.get("name"), Some(&json!("Ada")));
/// ```
#[derive(Clone, Default)]
pub struct Context {
    vars: Map<String, Value>,
    callables: HashMap<String, Callable>,
}

impl Context {
    /// Context over `data`
    ///
    /// Only objects contribute variables; any other value yields an empty
    /// context.
    pub fn new(data: Value) -> Self {
        match data {
            Value::Object(vars) => Self {
                vars,
                callables: HashMap::new(),
            },
            Value::Null => Self::empty(),
            other => {
                tracing::debug!(kind = %value_kind(&other), "non-object context data ignored");
                Self::empty()
            }
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.vars.get(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Value) -> Option<Value> {
        self.vars.insert(name.into(), value)
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.vars.remove(name)
    }

    pub fn with_function<F>(mut self, name: impl Into<String>, function: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, String> + Send + Sync + 'static,
    {
        self.add_function(name, function);
        self
    }

    pub fn add_function<F>(&mut self, name: impl Into<String>, function: F)
    where
        F: Fn(&[Value]) -> Result<Value, String> + Send + Sync + 'static,
    {
        self.callables
            .insert(name.into(), Callable::Native(Arc::new(function)));
    }

    /// Whether a macro or function is registered under `name`
    pub fn has_callable(&self, name: &str) -> bool {
        self.callables.contains_key(name)
    }

    pub(crate) fn callable(&self, name: &str) -> Option<&Callable> {
        self.callables.get(name)
    }

    pub(crate) fn define(&mut self, name: impl Into<String>, callable: Callable) {
        self.callables.insert(name.into(), callable);
    }

    pub(crate) fn callables(&self) -> impl Iterator<Item = (&String, &Callable)> {
        self.callables.iter()
    }

    /// Merge the entries of `vars` over the current variables
    pub(crate) fn extend(&mut self, vars: Map<String, Value>) {
        self.vars.extend(vars);
    }
}

impl From<Value> for Context {
    fn from(data: Value) -> Self {
        Self::new(data)
    }
}

impl From<Map<String, Value>> for Context {
    fn from(vars: Map<String, Value>) -> Self {
        Self {
            vars,
            callables: HashMap::new(),
        }
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut callables: Vec<_> = self.callables.keys().collect();
        callables.sort();
        f.debug_struct("Context")
            .field("vars", &self.vars)
            .field("callables", &callables)
            .finish()
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
