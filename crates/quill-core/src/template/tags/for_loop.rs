//! `for`

use serde_json::Value;

use crate::template::engine::compiler::{split_else, Compiler};
use crate::template::engine::context::Context;
use crate::template::engine::helpers::loop_metadata;
use crate::template::engine::node::{ForNode, Node};
use crate::template::engine::parser::LogicToken;
use crate::template::engine::render::Renderer;
use crate::template::error::TemplateError;

const LOOP_VAR: &str = "loop";

/// `{% for value in expr %}` or `{% for key, value in expr %}`
pub(crate) fn compile(compiler: &Compiler<'_>, token: &LogicToken) -> Result<Node, TemplateError> {
    let mut parser = compiler.expr_parser(&token.args, token.line)?;

    let first = parser.expect_ident()?;
    let (key_var, value_var) = if parser.eat_punct(',') {
        (Some(first), parser.expect_ident()?)
    } else {
        (None, first)
    };

    if !parser.eat_keyword("in") {
        return Err(TemplateError::InvalidArguments {
            tag: token.name.clone(),
            message: format!("expected \"in\" after \"{value_var}\""),
            line: token.line,
        });
    }
    let iterable = parser.parse_expr()?;
    parser.finish()?;

    let (body, sections) = split_else(compiler.compile_children(token)?);
    let mut empty = None;
    for (condition, line, nodes) in sections {
        if condition.is_some() || empty.is_some() {
            return Err(TemplateError::MalformedSyntax {
                message: "\"for\" takes a single plain \"else\"".to_string(),
                line,
            });
        }
        empty = Some(nodes);
    }

    Ok(Node::For(ForNode {
        key_var,
        value_var,
        iterable,
        body,
        empty: empty.unwrap_or_default(),
    }))
}

impl Renderer<'_> {
    pub(crate) fn render_for(&self, node: &ForNode, ctx: &mut Context, out: &mut String) -> Result<(), TemplateError> {
        let items: Vec<(Value, Value)> = match self.eval(&node.iterable, ctx)? {
            Value::Array(items) => items
                .into_iter()
                .enumerate()
                .map(|(idx, item)| (Value::from(idx), item))
                .collect(),
            Value::Object(map) => map.into_iter().map(|(key, item)| (Value::String(key), item)).collect(),
            _ => Vec::new(),
        };

        if items.is_empty() {
            return self.render(&node.empty, ctx, out);
        }

        // Bindings shadowed by the loop come back once it ends
        let saved_value = ctx.get(&node.value_var).cloned();
        let saved_key = node.key_var.as_ref().and_then(|key| ctx.get(key).cloned());
        let saved_loop = ctx.get(LOOP_VAR).cloned();

        let length = items.len();
        let mut result = Ok(());
        for (index, (key, item)) in items.into_iter().enumerate() {
            if let Some(key_var) = &node.key_var {
                ctx.insert(key_var.as_str(), key.clone());
            }
            ctx.insert(node.value_var.as_str(), item);
            ctx.insert(LOOP_VAR, loop_metadata(index, length, key));

            result = self.render(&node.body, ctx, out);
            if result.is_err() {
                break;
            }
        }

        restore(ctx, &node.value_var, saved_value);
        if let Some(key_var) = &node.key_var {
            restore(ctx, key_var, saved_key);
        }
        restore(ctx, LOOP_VAR, saved_loop);

        result
    }
}

fn restore(ctx: &mut Context, name: &str, saved: Option<Value>) {
    match saved {
        Some(value) => {
            ctx.insert(name, value);
        }
        None => {
            ctx.remove(name);
        }
    }
}
