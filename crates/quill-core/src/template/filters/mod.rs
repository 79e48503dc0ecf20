//! Filter pipeline
//!
//! A filter is a total function from a value and its evaluated arguments to a
//! new value. Filters never fail: inputs of the wrong shape produce an empty
//! string.
//!
//! `raw`, `e` and `escape` are "safe" filters. Once one of them appears in an
//! output tag's chain, the automatic escape at the end of the chain is skipped.

mod builtin;
mod escape;

use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

pub use escape::EscapeKind;

/// Filter function signature: `(input, args) -> output`
pub type FilterFn = dyn Fn(&Value, &[Value]) -> Value + Send + Sync;

/// Shared handle to a filter function
pub type Filter = Arc<FilterFn>;

/// Filters that mark their output as already escaped
pub(crate) const SAFE_FILTERS: &[&str] = &["raw", "e", "escape"];

/// Named filters available to templates
#[derive(Clone, Default)]
pub struct FilterRegistry {
    filters: HashMap<String, Filter>,
}

impl FilterRegistry {
    /// Registry holding every built-in filter
    ///
    /// `tz_offset` (minutes behind UTC) is the default offset of `date`.
    pub fn builtin(tz_offset: i32) -> Self {
        let mut registry = Self::default();
        builtin::register(&mut registry, tz_offset);
        registry
    }

    /// Add or replace a filter
    pub fn insert(&mut self, name: impl Into<String>, filter: Filter) {
        self.filters.insert(name.into(), filter);
    }

    pub fn get(&self, name: &str) -> Option<Filter> {
        self.filters.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.filters.contains_key(name)
    }

    /// Run `value` through `chain` left to right
    ///
    /// Unknown filter names pass the value through unchanged.
    pub fn apply(&self, value: &Value, chain: &[(&str, Vec<Value>)]) -> Value {
        chain.iter().fold(value.clone(), |current, (name, args)| match self.filters.get(*name) {
            Some(filter) => filter(&current, args),
            None => current,
        })
    }
}

impl fmt::Debug for FilterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.filters.keys().collect();
        names.sort();
        f.debug_struct("FilterRegistry").field("filters", &names).finish()
    }
}

#[cfg(test)]
mod tests;
