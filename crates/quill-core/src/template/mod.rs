//! Template module - swig-style template compiler and renderer
//!
//! Templates are compiled once into a node tree and rendered any number of
//! times against JSON data.
//!
//! ## Syntax
//!
//! - Output: `{{ user.name|title }}`, escaped by default
//! - Logic: `{% if %}`, `{% for %}`, `{% set %}`, `{% macro %}`,
//!   `{% include %}`, `{% import %}`, `{% filter %}`, `{% autoescape %}`,
//!   `{% raw %}`
//! - Inheritance: `{% extends "base.html" %}` with `{% block %}` and
//!   `{% parent %}`
//! - Comments: `{# ... #}`
//! - Whitespace control: `{%- ... -%}` trims the text next to the tag
//!
//! ## Engines
//!
//! An [`Engine`] holds the configuration and the template cache. The free
//! functions of this module use a process-wide default engine, reconfigured
//! with [`init`]:
//!
//! ```rust
//! use quill_core::template::{self, CompileOptions};
//! use serde_json::json;
//!
//! let tpl = template::compile("{% for n in nums %}{{ n }}{% endfor %}", CompileOptions::default()).unwrap();
//! assert_eq!(tpl.render(json!({"nums": [1, 2, 3]})).unwrap(), "123");
//! ```

pub mod date;
pub(crate) mod engine;
pub mod error;
pub mod filters;
pub mod tags;

use std::sync::{Arc, OnceLock};

use crate::config::EngineConfig;

pub use engine::{
    CompileOptions, Context, Engine, FsLoader, MemoryLoader, NativeFn, Template, TemplateLoader,
};
pub use error::TemplateError;
pub use filters::{EscapeKind, Filter, FilterFn, FilterRegistry};
pub use tags::{CustomTag, Extensions, TagCall};

fn default_engine() -> &'static Engine {
    static ENGINE: OnceLock<Engine> = OnceLock::new();
    ENGINE.get_or_init(Engine::default)
}

/// Reconfigure the default engine, clearing its cache
pub fn init(config: EngineConfig) {
    default_engine().init(config);
}

/// Compile with the default engine
pub fn compile(source: &str, options: CompileOptions) -> Result<Arc<Template>, TemplateError> {
    default_engine().compile(source, options)
}

/// Compile a template file with the default engine
pub fn compile_file(name: &str) -> Result<Arc<Template>, TemplateError> {
    default_engine().compile_file(name)
}

/// Compile and render a template file with the default engine
pub fn render_file(name: &str, context: impl Into<Context>) -> Result<String, TemplateError> {
    default_engine().render_file(name, context)
}
