//! Compiled template cache

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use super::compiled::Template;
use crate::template::error::TemplateError;

/// Compiled templates by key
///
/// Compilation runs outside the lock, so a template may compile other
/// templates (its layout, for one) while building. When two callers compile
/// the same key concurrently, the first to store its result wins and both
/// get that one.
#[derive(Default)]
pub(crate) struct TemplateCache {
    entries: RwLock<HashMap<String, Arc<Template>>>,
}

impl TemplateCache {
    pub fn get(&self, key: &str) -> Option<Arc<Template>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    pub fn get_or_compile<F>(&self, key: &str, compile: F) -> Result<Arc<Template>, TemplateError>
    where
        F: FnOnce() -> Result<Template, TemplateError>,
    {
        if let Some(hit) = self.get(key) {
            tracing::trace!(key, "template cache hit");
            return Ok(hit);
        }

        tracing::debug!(key, "template cache miss");
        let compiled = Arc::new(compile()?);

        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        Ok(Arc::clone(entries.entry(key.to_string()).or_insert(compiled)))
    }

    pub fn clear(&self) {
        self.entries.write().unwrap_or_else(PoisonError::into_inner).clear();
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        keys.sort();
        keys
    }
}
