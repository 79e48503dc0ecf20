//! Template source loading
//!
//! The engine never touches the filesystem itself: every template it needs
//! by name is requested from a [`TemplateLoader`] with the already-resolved
//! path.

use anyhow::{Context as _, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

/// Supplies template source by resolved path
pub trait TemplateLoader: Send + Sync {
    fn load(&self, path: &Path) -> Result<String>;
}

/// Reads templates from disk
#[derive(Debug, Clone, Copy, Default)]
pub struct FsLoader;

impl TemplateLoader for FsLoader {
    fn load(&self, path: &Path) -> Result<String> {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read template file: {}", path.display()))
    }
}

/// Serves templates from memory, keyed by path
///
/// ```rust
/// use quill_core::template::{Engine, MemoryLoader};
/// use quill_core::EngineConfig;
/// use serde_json::json;
///
/// let loader = MemoryLoader::new()
///     .with("base.html", "<h1>{% block title %}{% endblock %}</h1>")
///     .with("page.html", "{% extends \"base.html\" %}{% block title %}Hi{% endblock %}");
/// let engine = Engine::with_loader(EngineConfig::default(), loader);
///
/// assert_eq!(engine.render_file("page.html", json!({})).unwrap(), "<h1>Hi</h1>");
/// ```
#[derive(Debug, Default)]
pub struct MemoryLoader {
    templates: RwLock<HashMap<PathBuf, String>>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, path: impl Into<PathBuf>, source: impl Into<String>) -> Self {
        self.insert(path, source);
        self
    }

    /// Add or replace a template
    pub fn insert(&self, path: impl Into<PathBuf>, source: impl Into<String>) {
        self.templates
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(path.into(), source.into());
    }
}

impl TemplateLoader for MemoryLoader {
    fn load(&self, path: &Path) -> Result<String> {
        self.templates
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(path)
            .cloned()
            .with_context(|| format!("Template not found: {}", path.display()))
    }
}
