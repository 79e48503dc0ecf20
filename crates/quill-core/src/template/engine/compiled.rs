//! Compiled templates

use serde_json::Value;
use std::borrow::Cow;
use std::cell::Cell;
use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Weak};

use super::blocks::{block_names, extend};
use super::compiler::Compiler;
use super::context::Context;
use super::expr::Expr;
use super::helpers::stringify;
use super::node::{BlockMap, Program};
use super::parser::Token;
use super::render::Renderer;
use super::{EngineInner, Settings};
use crate::config::consts::marker;
use crate::template::error::TemplateError;
use crate::template::filters::EscapeKind;

pub(crate) enum Body {
    Ready(Program),
    /// Layout named by an expression, or extending a deferred layout;
    /// compiled against the layout on every render
    Deferred {
        layout: Expr,
        line: usize,
        tokens: Vec<Token>,
    },
    /// Compiled with errors allowed; renders the error
    Failed(TemplateError),
}

/// A compiled template, ready to render
///
/// Obtained from [`Engine::compile`](crate::template::Engine::compile) and
/// friends. Rendering goes back to the engine that compiled it for filters,
/// globals and any template loaded at render time, so a template outliving
/// its engine can no longer render.
pub struct Template {
    id: String,
    origin: Option<PathBuf>,
    parent: Option<String>,
    body: Body,
    engine: Weak<EngineInner>,
}

impl Template {
    pub(crate) fn new(
        id: String,
        origin: Option<PathBuf>,
        parent: Option<String>,
        body: Body,
        engine: Weak<EngineInner>,
    ) -> Self {
        Self {
            id,
            origin,
            parent,
            body,
            engine,
        }
    }

    /// Cache key: the resolved path, or the source itself
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Key of the layout named by a literal `extends`
    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    /// Whether the whole inheritance chain was resolved at compile time
    ///
    /// `false` for templates whose layout depends on the render context.
    pub fn is_precompiled(&self) -> bool {
        matches!(self.body, Body::Ready(_))
    }

    /// The compiled program, `None` while the layout is deferred
    pub(crate) fn compiled(&self) -> Result<Option<&Program>, TemplateError> {
        match &self.body {
            Body::Ready(program) => Ok(Some(program)),
            Body::Deferred { .. } => Ok(None),
            Body::Failed(err) => Err(err.clone()),
        }
    }

    /// Names of the blocks this template renders through, sorted
    pub fn block_names(&self) -> Vec<String> {
        let mut names = match &self.body {
            Body::Ready(program) => program.blocks.keys().cloned().collect(),
            Body::Deferred { tokens, .. } => block_names(tokens),
            Body::Failed(_) => Vec::new(),
        };
        names.sort();
        names.dedup();
        names
    }

    /// Render against `context`
    ///
    /// Errors are returned only when the engine runs in debug mode; otherwise
    /// they are logged and rendered as an escaped `<pre>` marker.
    ///
    /// # Errors
    ///
    /// A template is bound to the lifetime of its engine. Once the engine is
    /// dropped, rendering fails with [`TemplateError::EngineGone`] whatever
    /// the debug setting, since there is no engine left to decide it.
    ///
    /// ```rust
    /// use quill_core::template::Engine;
    /// use serde_json::json;
    ///
    /// let engine = Engine::default();
    /// let template = engine.compile("Hello, {{ name }}!", Default::default()).unwrap();
    /// assert_eq!(template.render(json!({"name": "Ada"})).unwrap(), "Hello, Ada!");
    /// ```
    pub fn render(&self, context: impl Into<Context>) -> Result<String, TemplateError> {
        self.render_with(context, &[])
    }

    /// Render as part of a chain of `ancestors` (outermost first)
    ///
    /// Rendering a template that is already one of its ancestors is a
    /// circular include. Fails with [`TemplateError::EngineGone`] once the
    /// engine is dropped, like [`Template::render`].
    pub fn render_with(&self, context: impl Into<Context>, ancestors: &[String]) -> Result<String, TemplateError> {
        let engine = self.engine()?;
        let settings = engine.settings();
        let mut ctx = context.into();

        match self.execute_in(&engine, &settings, &mut ctx, ancestors) {
            Ok(out) => Ok(out),
            Err(err) if settings.debug => Err(err),
            Err(err) => {
                tracing::warn!(template = %self.label(), error = %err, "render failed");
                Ok(error_marker(&err))
            }
        }
    }

    /// Render into `ctx`, keeping whatever the template defines there
    pub(crate) fn execute(&self, ctx: &mut Context, ancestors: &[String]) -> Result<String, TemplateError> {
        let engine = self.engine()?;
        let settings = engine.settings();
        self.execute_in(&engine, &settings, ctx, ancestors)
    }

    fn execute_in(
        &self,
        engine: &Arc<EngineInner>,
        settings: &Settings,
        ctx: &mut Context,
        ancestors: &[String],
    ) -> Result<String, TemplateError> {
        if let Some(message) = self.circular_message(ancestors) {
            return Err(TemplateError::Render { message });
        }
        if let Body::Failed(err) = &self.body {
            return Ok(error_marker(err));
        }

        let mut chain = ancestors.to_vec();
        chain.push(self.id.clone());

        let program = self.program(engine, settings, ctx, &mut vec![self.id.clone()])?;
        let renderer = Renderer {
            engine,
            settings,
            blocks: &program.blocks,
            ancestors: &chain,
            origin: self.origin.as_deref(),
            macro_depth: Cell::new(0),
        };

        let mut out = String::new();
        renderer.render(&program.nodes, ctx, &mut out)?;
        Ok(out)
    }

    /// The program to run, resolving a deferred layout against `ctx`
    ///
    /// `chain` holds the templates of the inheritance chain resolved so far.
    fn program(
        &self,
        engine: &Arc<EngineInner>,
        settings: &Settings,
        ctx: &Context,
        chain: &mut Vec<String>,
    ) -> Result<Cow<'_, Program>, TemplateError> {
        let (layout, line, tokens) = match &self.body {
            Body::Ready(program) => return Ok(Cow::Borrowed(program)),
            Body::Failed(err) => return Err(err.clone()),
            Body::Deferred { layout, line, tokens } => (layout, *line, tokens),
        };

        let no_blocks = BlockMap::new();
        let evaluator = Renderer {
            engine,
            settings,
            blocks: &no_blocks,
            ancestors: &[],
            origin: self.origin.as_deref(),
            macro_depth: Cell::new(0),
        };
        let name = match evaluator.eval(layout, ctx)? {
            Value::Null => {
                return Err(TemplateError::Render {
                    message: format!("layout of \"{}\" is undefined", self.label()),
                })
            }
            value => stringify(&value),
        };

        let parent = engine.load(&name, self.origin.as_deref())?;
        if chain.contains(&parent.id) {
            return Err(TemplateError::CircularExtends {
                name: parent.id.clone(),
                line,
            });
        }
        chain.push(parent.id.clone());
        tracing::debug!(template = %self.label(), layout = %parent.id, "resolved deferred layout");

        let parent_program = parent.program(engine, settings, ctx, chain)?;
        let compiler = Compiler::new(&settings.filters, &settings.tags);
        Ok(Cow::Owned(extend(&compiler, tokens, &parent_program)?))
    }

    /// The circular import message when this template is one of `ancestors`
    pub(crate) fn circular_message(&self, ancestors: &[String]) -> Option<String> {
        if !ancestors.contains(&self.id) {
            return None;
        }
        let last = ancestors.last().map(String::as_str).unwrap_or_default();
        Some(format!("Circular import of template \"{}\" in \"{}\"!", self.label(), last))
    }

    fn engine(&self) -> Result<Arc<EngineInner>, TemplateError> {
        self.engine.upgrade().ok_or_else(|| TemplateError::EngineGone {
            id: self.label().into_owned(),
        })
    }

    /// Short name for logs: the origin path, or the start of the source
    fn label(&self) -> Cow<'_, str> {
        match &self.origin {
            Some(path) => path.to_string_lossy(),
            None => match self.id.char_indices().nth(40) {
                Some((idx, _)) => Cow::Owned(format!("{}...", &self.id[..idx])),
                None => Cow::Borrowed(&self.id),
            },
        }
    }
}

impl fmt::Debug for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Template")
            .field("id", &self.label())
            .field("parent", &self.parent)
            .field("precompiled", &self.is_precompiled())
            .finish_non_exhaustive()
    }
}

fn error_marker(err: &TemplateError) -> String {
    format!(
        "{}{}{}",
        marker::ERROR_OPEN,
        EscapeKind::Html.apply(&err.to_string()),
        marker::ERROR_CLOSE
    )
}
