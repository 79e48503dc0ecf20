use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{QuillError, Result};
use crate::template::{CustomTag, EscapeKind, Extensions, Filter, NativeFn};

/// Automatic output escaping policy
///
/// In TOML either a boolean (`true` means HTML) or an escape kind name:
///
/// ```toml
/// autoescape = "js"
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Autoescape {
    Enabled(bool),
    Kind(EscapeKind),
}

impl Autoescape {
    /// Escape kind applied to output, `None` when disabled
    pub fn policy(self) -> Option<EscapeKind> {
        match self {
            Autoescape::Enabled(true) => Some(EscapeKind::default()),
            Autoescape::Enabled(false) => None,
            Autoescape::Kind(kind) => Some(kind),
        }
    }
}

impl Default for Autoescape {
    fn default() -> Self {
        Autoescape::Enabled(true)
    }
}

/// Engine configuration
///
/// The serialisable part can be read from TOML; filters, tags, global
/// functions and extensions are code-only and are added with the builder
/// methods.
#[derive(Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub autoescape: Autoescape,

    /// Memoize compiled templates by key
    #[serde(default = "default_cache")]
    pub cache: bool,

    /// Base directory for relative template names
    #[serde(default)]
    pub root: Option<PathBuf>,

    /// Default `date` filter offset, in minutes behind UTC
    #[serde(default)]
    pub tz_offset: i32,

    /// Propagate render errors instead of rendering an error marker
    #[serde(default)]
    pub debug: bool,

    /// Values visible to every template, looked up before the context
    #[serde(default)]
    pub globals: Map<String, Value>,

    #[serde(skip)]
    pub filters: HashMap<String, Filter>,

    #[serde(skip)]
    pub tags: HashMap<String, Arc<dyn CustomTag>>,

    #[serde(skip)]
    pub functions: HashMap<String, Arc<NativeFn>>,

    #[serde(skip)]
    pub extensions: Extensions,
}

fn default_cache() -> bool {
    true
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            autoescape: Autoescape::default(),
            cache: default_cache(),
            root: None,
            tz_offset: 0,
            debug: false,
            globals: Map::new(),
            filters: HashMap::new(),
            tags: HashMap::new(),
            functions: HashMap::new(),
            extensions: Extensions::new(),
        }
    }
}

impl fmt::Debug for EngineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut filters: Vec<_> = self.filters.keys().collect();
        filters.sort();
        let mut tags: Vec<_> = self.tags.keys().collect();
        tags.sort();
        let mut functions: Vec<_> = self.functions.keys().collect();
        functions.sort();
        let mut extensions: Vec<_> = self.extensions.keys().collect();
        extensions.sort();

        f.debug_struct("EngineConfig")
            .field("autoescape", &self.autoescape)
            .field("cache", &self.cache)
            .field("root", &self.root)
            .field("tz_offset", &self.tz_offset)
            .field("debug", &self.debug)
            .field("globals", &self.globals)
            .field("filters", &filters)
            .field("tags", &tags)
            .field("functions", &functions)
            .field("extensions", &extensions)
            .finish()
    }
}

impl EngineConfig {
    /// Load the serialisable settings from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(QuillError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        // Offsets beyond a day are rejected by chrono
        if self.tz_offset.abs() >= 24 * 60 {
            return Err(QuillError::ConfigInvalidValue {
                field: "tz_offset".to_string(),
                reason: format!("{} minutes is not a valid UTC offset", self.tz_offset),
            });
        }
        Ok(())
    }

    /// Register a filter, replacing a built-in of the same name
    pub fn with_filter<F>(mut self, name: impl Into<String>, filter: F) -> Self
    where
        F: Fn(&Value, &[Value]) -> Value + Send + Sync + 'static,
    {
        self.filters.insert(name.into(), Arc::new(filter));
        self
    }

    /// Register a custom tag, replacing a built-in of the same name
    pub fn with_tag(mut self, name: impl Into<String>, tag: impl CustomTag + 'static) -> Self {
        self.tags.insert(name.into(), Arc::new(tag));
        self
    }

    /// Register a function callable from every template
    pub fn with_function<F>(mut self, name: impl Into<String>, function: F) -> Self
    where
        F: Fn(&[Value]) -> std::result::Result<Value, String> + Send + Sync + 'static,
    {
        self.functions.insert(name.into(), Arc::new(function));
        self
    }

    /// Attach a host object that custom tags can reach through
    /// [`crate::template::TagCall::extension`]
    pub fn with_extension<T>(mut self, name: impl Into<String>, value: T) -> Self
    where
        T: std::any::Any + Send + Sync,
    {
        self.extensions.insert(name.into(), Arc::new(value));
        self
    }

    pub fn with_global(mut self, name: impl Into<String>, value: Value) -> Self {
        self.globals.insert(name.into(), value);
        self
    }
}
