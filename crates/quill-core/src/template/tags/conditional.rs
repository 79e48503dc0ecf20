//! `if` / `else`

use crate::template::engine::compiler::{split_else, Compiler};
use crate::template::engine::context::Context;
use crate::template::engine::helpers::is_truthy;
use crate::template::engine::node::{IfNode, Node};
use crate::template::engine::parser::LogicToken;
use crate::template::engine::render::Renderer;
use crate::template::error::TemplateError;

pub(crate) fn compile_if(compiler: &Compiler<'_>, token: &LogicToken) -> Result<Node, TemplateError> {
    if token.args.is_empty() {
        return Err(TemplateError::InvalidArguments {
            tag: token.name.clone(),
            message: "missing condition".to_string(),
            line: token.line,
        });
    }
    let condition = compiler.expr(&token.args, token.line)?;
    let (head, sections) = split_else(compiler.compile_children(token)?);

    let mut branches = vec![(condition, head)];
    let mut otherwise: Option<Vec<Node>> = None;

    for (condition, line, body) in sections {
        if otherwise.is_some() {
            return Err(TemplateError::MalformedSyntax {
                message: "\"else\" after the final \"else\" branch".to_string(),
                line,
            });
        }
        match condition {
            Some(condition) => branches.push((condition, body)),
            None => otherwise = Some(body),
        }
    }

    Ok(Node::If(IfNode {
        branches,
        otherwise: otherwise.unwrap_or_default(),
    }))
}

/// `else`, `else if <cond>`, `elseif <cond>` and `elif <cond>`
pub(crate) fn compile_else(compiler: &Compiler<'_>, token: &LogicToken) -> Result<Node, TemplateError> {
    let mut parser = compiler.expr_parser(&token.args, token.line)?;

    let conditional = token.name != "else" || parser.eat_keyword("if");
    let condition = if conditional {
        if parser.is_done() {
            return Err(TemplateError::InvalidArguments {
                tag: token.name.clone(),
                message: "missing condition".to_string(),
                line: token.line,
            });
        }
        Some(parser.parse_expr()?)
    } else {
        None
    };
    parser.finish()?;

    Ok(Node::Else {
        condition,
        line: token.line,
    })
}

impl Renderer<'_> {
    pub(crate) fn render_if(&self, node: &IfNode, ctx: &mut Context, out: &mut String) -> Result<(), TemplateError> {
        for (condition, body) in &node.branches {
            if is_truthy(&self.eval(condition, ctx)?) {
                return self.render(body, ctx, out);
            }
        }
        self.render(&node.otherwise, ctx, out)
    }
}
