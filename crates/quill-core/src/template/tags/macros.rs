//! `macro`

use std::sync::Arc;

use crate::template::engine::compiler::Compiler;
use crate::template::engine::node::{MacroDef, Node};
use crate::template::engine::parser::LogicToken;
use crate::template::error::TemplateError;

/// `{% macro name(a, b) %}` (the parentheses and commas are optional)
pub(crate) fn compile(compiler: &Compiler<'_>, token: &LogicToken) -> Result<Node, TemplateError> {
    let mut parser = compiler.expr_parser(&token.args, token.line)?;
    if parser.is_done() {
        return Err(TemplateError::InvalidArguments {
            tag: token.name.clone(),
            message: "missing macro name".to_string(),
            line: token.line,
        });
    }
    let name = parser.expect_ident()?;

    let parenthesized = parser.eat_punct('(');
    let mut params = Vec::new();
    loop {
        if parenthesized && parser.eat_punct(')') {
            break;
        }
        if parser.is_done() {
            if parenthesized {
                return Err(TemplateError::UnclosedArgument {
                    arg: token.args.clone(),
                    line: token.line,
                });
            }
            break;
        }
        params.push(parser.expect_ident()?);
        parser.eat_punct(',');
    }
    parser.finish()?;

    Ok(Node::Macro(Arc::new(MacroDef {
        name,
        params,
        body: compiler.compile_children(token)?.into(),
    })))
}
