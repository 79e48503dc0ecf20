//! `set`

use crate::template::engine::compiler::Compiler;
use crate::template::engine::context::Context;
use crate::template::engine::expr::Expr;
use crate::template::engine::node::Node;
use crate::template::engine::parser::LogicToken;
use crate::template::engine::render::Renderer;
use crate::template::error::TemplateError;

/// `{% set name = expr %}`
pub(crate) fn compile(compiler: &Compiler<'_>, token: &LogicToken) -> Result<Node, TemplateError> {
    let mut parser = compiler.expr_parser(&token.args, token.line)?;
    let name = parser.expect_ident()?;
    parser.expect_punct('=').map_err(|_| TemplateError::InvalidArguments {
        tag: token.name.clone(),
        message: format!("expected \"=\" after \"{name}\""),
        line: token.line,
    })?;
    let value = parser.parse_expr()?;
    parser.finish()?;

    Ok(Node::Set { name, value })
}

impl Renderer<'_> {
    pub(crate) fn render_set(&self, name: &str, value: &Expr, ctx: &mut Context) -> Result<(), TemplateError> {
        let value = self.eval(value, ctx)?;
        ctx.insert(name, value);
        Ok(())
    }
}
