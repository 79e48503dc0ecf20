//! `import`

use crate::template::engine::compiler::Compiler;
use crate::template::engine::context::Context;
use crate::template::engine::expr::Expr;
use crate::template::engine::helpers::stringify;
use crate::template::engine::node::Node;
use crate::template::engine::parser::LogicToken;
use crate::template::engine::render::Renderer;
use crate::template::error::TemplateError;

/// `{% import "file" as name %}`
pub(crate) fn compile(compiler: &Compiler<'_>, token: &LogicToken) -> Result<Node, TemplateError> {
    let mut parser = compiler.expr_parser(&token.args, token.line)?;
    if parser.is_done() {
        return Err(TemplateError::InvalidArguments {
            tag: token.name.clone(),
            message: "missing template name".to_string(),
            line: token.line,
        });
    }
    let template = parser.parse_expr()?;

    if !parser.eat_keyword("as") {
        return Err(TemplateError::InvalidArguments {
            tag: token.name.clone(),
            message: "expected \"as <name>\"".to_string(),
            line: token.line,
        });
    }
    let alias = parser.expect_ident()?;
    parser.finish()?;

    Ok(Node::Import { template, alias })
}

impl Renderer<'_> {
    /// Render the imported template for its callables only and expose them
    /// as `<alias>_<name>`
    ///
    /// A circular import writes its message to `out` and defines nothing.
    pub(crate) fn render_import(
        &self,
        template: &Expr,
        alias: &str,
        ctx: &mut Context,
        out: &mut String,
    ) -> Result<(), TemplateError> {
        let name = stringify(&self.eval(template, ctx)?);
        let imported = self.engine.load(&name, self.origin)?;
        if let Some(message) = imported.circular_message(self.ancestors) {
            out.push_str(&self.circular(&name, message)?);
            return Ok(());
        }

        let mut scope = Context::empty();
        imported.execute(&mut scope, self.ancestors)?;

        for (callable, definition) in scope.callables() {
            ctx.define(format!("{alias}_{callable}"), definition.clone());
        }
        Ok(())
    }
}
