//! Template engine implementation
//!
//! Source text goes through four stages:
//!
//! 1. `tokenize` splits it into text and `{{ }}` / `{% %}` segments
//! 2. `parser` builds the token tree (block nesting, strip markers,
//!    `autoescape` scoping)
//! 3. `blocks` resolves `extends` and compiles blocks, with `compiler`
//!    turning tokens into nodes
//! 4. `render` interprets the nodes against a [`Context`]
//!
//! An [`Engine`] owns the configuration, the template cache and the loader
//! used for every template referenced by name.

mod args;
mod blocks;
mod cache;
mod compiled;
pub(crate) mod compiler;
pub(crate) mod context;
pub(crate) mod expr;
pub(crate) mod helpers;
mod loader;
pub(crate) mod node;
pub(crate) mod parser;
pub(crate) mod render;
mod tokenize;
mod varname;

#[cfg(test)]
mod tests;

use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use crate::config::EngineConfig;
use crate::path::resolve_template_path;
use crate::template::error::TemplateError;
use crate::template::filters::{EscapeKind, FilterRegistry};
use crate::template::tags::{Extensions, TagRegistry};

use blocks::{check_blocks, compile_program, extend, find_extends, Extends};
use cache::TemplateCache;
use compiled::Body;
use compiler::Compiler;
use expr::Expr;
use parser::parse;

pub use compiled::Template;
pub use context::{Context, NativeFn};
pub use loader::{FsLoader, MemoryLoader, TemplateLoader};

/// Per-call compile options
#[derive(Debug, Clone, Default)]
pub struct CompileOptions {
    /// Cache key and origin for relative includes; the source itself is the
    /// key when absent
    pub filename: Option<PathBuf>,
    /// Overrides the engine's `cache` setting for this call
    pub cache: Option<bool>,
    /// Return a template that renders the compile error instead of failing
    pub allow_errors: bool,
}

impl CompileOptions {
    pub fn filename(mut self, filename: impl Into<PathBuf>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    pub fn cache(mut self, cache: bool) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn allow_errors(mut self) -> Self {
        self.allow_errors = true;
        self
    }
}

/// Resolved engine configuration
pub(crate) struct Settings {
    pub autoescape: Option<EscapeKind>,
    pub cache: bool,
    pub root: Option<PathBuf>,
    pub debug: bool,
    pub globals: Map<String, Value>,
    pub functions: HashMap<String, Arc<NativeFn>>,
    pub filters: FilterRegistry,
    pub tags: TagRegistry,
    pub extensions: Extensions,
}

impl Settings {
    fn from_config(config: EngineConfig) -> Self {
        let mut filters = FilterRegistry::builtin(config.tz_offset);
        for (name, filter) in config.filters {
            filters.insert(name, filter);
        }

        let mut tags = TagRegistry::builtin();
        for (name, tag) in config.tags {
            tags.register(&name, tag);
        }

        Self {
            autoescape: config.autoescape.policy(),
            cache: config.cache,
            root: config.root,
            debug: config.debug,
            globals: config.globals,
            functions: config.functions,
            filters,
            tags,
            extensions: config.extensions,
        }
    }
}

pub(crate) struct EngineInner {
    settings: RwLock<Arc<Settings>>,
    cache: TemplateCache,
    loader: Arc<dyn TemplateLoader>,
}

impl EngineInner {
    pub(crate) fn settings(&self) -> Arc<Settings> {
        Arc::clone(&self.settings.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Load the template `name` referenced from `from`
    pub(crate) fn load(self: &Arc<Self>, name: &str, from: Option<&Path>) -> Result<Arc<Template>, TemplateError> {
        let settings = self.settings();
        let path = resolve(&settings, name, from)?;
        self.load_path(&settings, path, &mut Vec::new())
    }

    /// `stack` holds the keys of the templates whose layouts are being
    /// loaded, innermost last
    fn load_path(
        self: &Arc<Self>,
        settings: &Settings,
        path: PathBuf,
        stack: &mut Vec<String>,
    ) -> Result<Arc<Template>, TemplateError> {
        let key = path_key(&path);
        let mut compile = || {
            let source = self.loader.load(&path).map_err(|err| TemplateError::Load {
                name: key.clone(),
                message: format!("{err:#}"),
            })?;
            self.build(settings, key.clone(), &source, Some(path.clone()), stack)
        };

        if settings.cache {
            self.cache.get_or_compile(&key, compile)
        } else {
            compile().map(Arc::new)
        }
    }

    fn build(
        self: &Arc<Self>,
        settings: &Settings,
        id: String,
        source: &str,
        origin: Option<PathBuf>,
        stack: &mut Vec<String>,
    ) -> Result<Template, TemplateError> {
        let tokens = parse(source, &settings.tags, settings.autoescape)?;
        let compiler = Compiler::new(&settings.filters, &settings.tags);

        let (parent, body) = match find_extends(&compiler, &tokens)? {
            None => (None, Body::Ready(compile_program(&compiler, &tokens)?)),
            Some((Extends::Dynamic(layout), line)) => {
                check_blocks(&compiler, &tokens)?;
                tracing::debug!(template = %origin_label(origin.as_deref()), "layout deferred to render time");
                (None, Body::Deferred { layout, line, tokens })
            }
            Some((Extends::Literal(name), line)) => {
                let path = resolve(settings, &name, origin.as_deref())?;
                let key = path_key(&path);
                if key == id || stack.contains(&key) {
                    return Err(TemplateError::CircularExtends { name: key, line });
                }

                stack.push(id.clone());
                let layout = self.load_path(settings, path, stack);
                stack.pop();
                let layout = layout?;

                let body = match layout.compiled()? {
                    Some(program) => Body::Ready(extend(&compiler, &tokens, program)?),
                    None => {
                        check_blocks(&compiler, &tokens)?;
                        Body::Deferred {
                            layout: Expr::Literal(Value::String(name)),
                            line,
                            tokens,
                        }
                    }
                };
                (Some(key), body)
            }
        };

        tracing::debug!(template = %origin_label(origin.as_deref()), "compiled template");
        Ok(Template::new(id, origin, parent, body, Arc::downgrade(self)))
    }
}

fn resolve(settings: &Settings, name: &str, from: Option<&Path>) -> Result<PathBuf, TemplateError> {
    resolve_template_path(settings.root.as_deref(), from, name).map_err(|err| TemplateError::Load {
        name: name.to_string(),
        message: err.to_string(),
    })
}

fn path_key(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn origin_label(origin: Option<&Path>) -> String {
    origin.map_or_else(|| "<source>".to_string(), |path| path.display().to_string())
}

/// Compiles and renders templates
///
/// Cloning is cheap: clones share configuration and cache. Templates
/// compiled by an engine render only while some clone of it is alive.
///
/// ```rust
/// use quill_core::template::{Engine, MemoryLoader};
/// use quill_core::EngineConfig;
/// use serde_json::json;
///
/// let config = EngineConfig::default().with_filter("shout", |value, _args| {
///     json!(value.as_str().unwrap_or_default().to_uppercase())
/// });
/// let engine = Engine::with_loader(config, MemoryLoader::new());
///
/// let out = engine.render("{{ greeting|shout }}", json!({"greeting": "hi"})).unwrap();
/// assert_eq!(out, "HI");
/// ```
#[derive(Clone)]
pub struct Engine {
    inner: Arc<EngineInner>,
}

impl Engine {
    /// Engine loading templates from disk
    pub fn new(config: EngineConfig) -> Self {
        Self::with_loader(config, FsLoader)
    }

    pub fn with_loader(config: EngineConfig, loader: impl TemplateLoader + 'static) -> Self {
        Self {
            inner: Arc::new(EngineInner {
                settings: RwLock::new(Arc::new(Settings::from_config(config))),
                cache: TemplateCache::default(),
                loader: Arc::new(loader),
            }),
        }
    }

    /// Replace the configuration and clear the cache
    pub fn init(&self, config: EngineConfig) {
        let settings = Arc::new(Settings::from_config(config));
        *self.inner.settings.write().unwrap_or_else(PoisonError::into_inner) = settings;
        self.inner.cache.clear();
        tracing::debug!("engine reinitialised");
    }

    /// Compile template source
    ///
    /// # Errors
    ///
    /// Any parse or resolution error, unless `options.allow_errors` is set.
    pub fn compile(&self, source: &str, options: CompileOptions) -> Result<Arc<Template>, TemplateError> {
        let settings = self.inner.settings();
        let key = options
            .filename
            .as_deref()
            .map_or_else(|| source.to_string(), path_key);

        let compile = || self.inner.build(&settings, key.clone(), source, options.filename.clone(), &mut Vec::new());
        let compiled = if options.cache.unwrap_or(settings.cache) {
            self.inner.cache.get_or_compile(&key, compile)
        } else {
            compile().map(Arc::new)
        };

        match compiled {
            Err(err) if options.allow_errors => {
                tracing::debug!(error = %err, "compile error kept for rendering");
                Ok(Arc::new(Template::new(
                    key,
                    options.filename,
                    None,
                    Body::Failed(err),
                    Arc::downgrade(&self.inner),
                )))
            }
            other => other,
        }
    }

    /// Load and compile the template `name`, relative to `root`
    pub fn compile_file(&self, name: &str) -> Result<Arc<Template>, TemplateError> {
        let settings = self.inner.settings();
        let path = resolve(&settings, name, None)?;
        self.inner.load_path(&settings, path, &mut Vec::new())
    }

    /// Compile `source` and render it against `context`
    pub fn render(&self, source: &str, context: impl Into<Context>) -> Result<String, TemplateError> {
        self.compile(source, CompileOptions::default())?.render(context)
    }

    pub fn render_file(&self, name: &str, context: impl Into<Context>) -> Result<String, TemplateError> {
        self.compile_file(name)?.render(context)
    }

    pub fn clear_cache(&self) {
        self.inner.cache.clear();
    }

    /// Keys of the cached templates, sorted
    pub fn cached_keys(&self) -> Vec<String> {
        self.inner.cache.keys()
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("cached", &self.cached_keys())
            .finish_non_exhaustive()
    }
}
