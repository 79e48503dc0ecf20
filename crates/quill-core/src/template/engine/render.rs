//! Node tree interpreter

use serde_json::{Map, Value};
use std::cell::Cell;
use std::cmp::Ordering;
use std::path::Path;
use std::sync::Arc;

use super::context::{Callable, Context};
use super::expr::{BinaryOp, Expr, FilterCall};
use super::helpers::{compare, contains, is_truthy, loose_eq, strict_eq, stringify};
use super::node::{BlockMap, MacroDef, Node, Output};
use super::varname::{walk, Segment, VarPath};
use super::{EngineInner, Settings};
use crate::template::error::TemplateError;

/// Deepest chain of nested macro calls within one template invocation
pub(crate) const MAX_MACRO_DEPTH: usize = 100;

/// Renders the nodes of one template invocation
pub(crate) struct Renderer<'r> {
    pub engine: &'r Arc<EngineInner>,
    pub settings: &'r Settings,
    /// Effective blocks of the template being rendered
    pub blocks: &'r BlockMap,
    /// Templates being rendered, outermost first; the current one is last
    pub ancestors: &'r [String],
    /// Where the current template came from, for relative names
    pub origin: Option<&'r Path>,
    /// Macro calls currently on the stack
    pub macro_depth: Cell<usize>,
}

impl<'r> Renderer<'r> {
    pub fn render(&self, nodes: &[Node], ctx: &mut Context, out: &mut String) -> Result<(), TemplateError> {
        for node in nodes {
            self.render_node(node, ctx, out)?;
        }
        Ok(())
    }

    pub fn render_to_string(&self, nodes: &[Node], ctx: &mut Context) -> Result<String, TemplateError> {
        let mut out = String::new();
        self.render(nodes, ctx, &mut out)?;
        Ok(out)
    }

    fn render_node(&self, node: &Node, ctx: &mut Context, out: &mut String) -> Result<(), TemplateError> {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Output(output) => self.render_output(output, ctx, out)?,
            Node::If(if_node) => self.render_if(if_node, ctx, out)?,
            Node::For(for_node) => self.render_for(for_node, ctx, out)?,
            Node::Set { name, value } => self.render_set(name, value, ctx)?,
            Node::Filter { filter, body } => self.render_filter(filter.as_ref(), body, ctx, out)?,
            Node::Macro(def) => self.define_macro(def, ctx),
            Node::Include(include) => self.render_include(include, ctx, out)?,
            Node::Import { template, alias } => self.render_import(template, alias, ctx, out)?,
            Node::Block(name) => {
                if let Some(fragment) = self.blocks.get(name) {
                    self.render(fragment, ctx, out)?;
                }
            }
            Node::Fragment(fragment) => self.render(fragment, ctx, out)?,
            Node::Group(nodes) => self.render(nodes, ctx, out)?,
            Node::Custom(custom) => self.render_custom(custom, ctx, out)?,
            Node::Else { .. } => {}
        }
        Ok(())
    }

    fn render_output(&self, output: &Output, ctx: &mut Context, out: &mut String) -> Result<(), TemplateError> {
        let (value, safe) = match &output.expr {
            Expr::Call { path, args } => self.call(path, args, ctx)?,
            other => (self.eval(other, ctx)?, false),
        };
        let value = self.apply_filters(value, &output.filters, ctx)?;
        let text = stringify(&value);

        // Macro output is already rendered markup unless filters reshaped it
        match output.escape {
            Some(kind) if !(safe && output.filters.is_empty()) => out.push_str(&kind.apply(&text)),
            _ => out.push_str(&text),
        }
        Ok(())
    }

    pub fn apply_filters(
        &self,
        value: Value,
        filters: &[FilterCall],
        ctx: &Context,
    ) -> Result<Value, TemplateError> {
        let mut value = value;
        for call in filters {
            let args = self.eval_all(&call.args, ctx)?;
            value = (call.filter)(&value, &args);
        }
        Ok(value)
    }

    pub fn eval_all(&self, exprs: &[Expr], ctx: &Context) -> Result<Vec<Value>, TemplateError> {
        exprs.iter().map(|expr| self.eval(expr, ctx)).collect()
    }

    pub fn eval(&self, expr: &Expr, ctx: &Context) -> Result<Value, TemplateError> {
        Ok(match expr {
            Expr::Literal(value) => value.clone(),
            Expr::Path(path) => self.lookup(path, ctx)?,
            Expr::Call { path, args } => self.call(path, args, ctx)?.0,
            Expr::Array(items) => Value::Array(self.eval_all(items, ctx)?),
            Expr::Object(pairs) => {
                let mut map = Map::new();
                for (key, value) in pairs {
                    map.insert(key.clone(), self.eval(value, ctx)?);
                }
                Value::Object(map)
            }
            Expr::Filtered { base, filters } => {
                let value = self.eval(base, ctx)?;
                self.apply_filters(value, filters, ctx)?
            }
            Expr::Not(inner) => Value::Bool(!is_truthy(&self.eval(inner, ctx)?)),
            Expr::Binary { op, lhs, rhs } => self.eval_binary(*op, lhs, rhs, ctx)?,
        })
    }

    fn eval_binary(&self, op: BinaryOp, lhs: &Expr, rhs: &Expr, ctx: &Context) -> Result<Value, TemplateError> {
        let left = self.eval(lhs, ctx)?;
        let right = || self.eval(rhs, ctx);

        let result = match op {
            // Short-circuit, yielding the deciding operand
            BinaryOp::And => return if is_truthy(&left) { right() } else { Ok(left) },
            BinaryOp::Or => return if is_truthy(&left) { Ok(left) } else { right() },
            BinaryOp::Eq => loose_eq(&left, &right()?),
            BinaryOp::Ne => !loose_eq(&left, &right()?),
            BinaryOp::StrictEq => strict_eq(&left, &right()?),
            BinaryOp::StrictNe => !strict_eq(&left, &right()?),
            BinaryOp::Lt => compare(&left, &right()?) == Some(Ordering::Less),
            BinaryOp::Gt => compare(&left, &right()?) == Some(Ordering::Greater),
            BinaryOp::Le => matches!(compare(&left, &right()?), Some(Ordering::Less | Ordering::Equal)),
            BinaryOp::Ge => matches!(compare(&left, &right()?), Some(Ordering::Greater | Ordering::Equal)),
            BinaryOp::In => contains(&right()?, &left),
            BinaryOp::NotIn => !contains(&right()?, &left),
        };
        Ok(Value::Bool(result))
    }

    /// Resolve an access chain, globals first, then the context
    ///
    /// Undefined chains evaluate to `null`.
    pub fn lookup(&self, path: &VarPath, ctx: &Context) -> Result<Value, TemplateError> {
        let mut keys = Vec::with_capacity(path.segments.len());
        for segment in &path.segments {
            keys.push(match segment {
                Segment::Key(key) => key.clone(),
                Segment::Index(index) => self.eval(index, ctx)?,
            });
        }

        let found = self
            .settings
            .globals
            .get(&path.root)
            .and_then(|root| walk(root, &keys))
            .or_else(|| ctx.get(&path.root).and_then(|root| walk(root, &keys)));

        Ok(found.cloned().unwrap_or(Value::Null))
    }

    /// Call `path(args)`: context callable, then global function, then plain
    /// lookup of the path
    ///
    /// The flag is true when the value is macro output.
    fn call(&self, path: &VarPath, args: &[Expr], ctx: &Context) -> Result<(Value, bool), TemplateError> {
        let Some(name) = path.callable_name() else {
            return Ok((self.lookup(path, ctx)?, false));
        };

        if let Some(callable) = ctx.callable(&name) {
            let args = self.eval_all(args, ctx)?;
            return match callable {
                Callable::Macro(def) => Ok((Value::String(self.call_macro(def, args, ctx)?), true)),
                Callable::Native(function) => Ok((native_result(&name, function(&args))?, false)),
            };
        }

        if let Some(function) = self.settings.functions.get(&name) {
            let args = self.eval_all(args, ctx)?;
            return Ok((native_result(&name, function(&args))?, false));
        }

        Ok((self.lookup(path, ctx)?, false))
    }

    fn call_macro(&self, def: &MacroDef, args: Vec<Value>, ctx: &Context) -> Result<String, TemplateError> {
        let depth = self.macro_depth.get();
        if depth >= MAX_MACRO_DEPTH {
            return Err(TemplateError::Render {
                message: format!("macro \"{}\" exceeded the maximum call depth of {MAX_MACRO_DEPTH}", def.name),
            });
        }

        let mut scope = ctx.clone();
        let mut args = args.into_iter();
        for param in &def.params {
            scope.insert(param.clone(), args.next().unwrap_or(Value::Null));
        }

        self.macro_depth.set(depth + 1);
        let rendered = self.render_to_string(&def.body, &mut scope);
        self.macro_depth.set(depth);
        rendered
    }

    fn define_macro(&self, def: &Arc<MacroDef>, ctx: &mut Context) {
        ctx.define(def.name.clone(), Callable::Macro(Arc::clone(def)));
    }
}

fn native_result(name: &str, result: Result<Value, String>) -> Result<Value, TemplateError> {
    result.map_err(|message| TemplateError::Render {
        message: format!("function \"{name}\" failed: {message}"),
    })
}
