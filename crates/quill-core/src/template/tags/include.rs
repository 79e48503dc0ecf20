//! `include`

use serde_json::Value;

use crate::template::engine::compiler::Compiler;
use crate::template::engine::context::Context;
use crate::template::engine::helpers::stringify;
use crate::template::engine::node::{IncludeNode, Node};
use crate::template::engine::parser::LogicToken;
use crate::template::engine::render::Renderer;
use crate::template::error::TemplateError;

/// `{% include tmpl [ignore missing] [with expr] [only] %}`
///
/// The modifiers may appear in any order after the template name.
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

    let mut node = IncludeNode {
        template,
        ignore_missing: false,
        with: None,
        only: false,
    };

    while !parser.is_done() {
        if parser.eat_keyword("ignore") {
            if !parser.eat_keyword("missing") {
                return Err(TemplateError::InvalidArguments {
                    tag: token.name.clone(),
                    message: "expected \"missing\" after \"ignore\"".to_string(),
                    line: token.line,
                });
            }
            node.ignore_missing = true;
        } else if parser.eat_keyword("only") {
            node.only = true;
        } else if parser.eat_keyword("with") {
            node.with = Some(parser.parse_expr()?);
        } else {
            parser.finish()?;
            break;
        }
    }

    Ok(Node::Include(node))
}

impl Renderer<'_> {
    pub(crate) fn render_include(
        &self,
        include: &IncludeNode,
        ctx: &mut Context,
        out: &mut String,
    ) -> Result<(), TemplateError> {
        let name = stringify(&self.eval(&include.template, ctx)?);

        let mut scope = if include.only { Context::empty() } else { ctx.clone() };
        if let Some(with) = &include.with {
            match self.eval(with, ctx)? {
                Value::Object(vars) => scope.extend(vars),
                Value::Null => {}
                other => {
                    tracing::debug!(template = %name, value = %other, "non-object include scope ignored");
                }
            }
        }

        let rendered = self.engine.load(&name, self.origin).and_then(|template| {
            match template.circular_message(self.ancestors) {
                Some(message) => self.circular(&name, message),
                None => template.execute(&mut scope, self.ancestors),
            }
        });

        match rendered {
            Ok(text) => out.push_str(&text),
            Err(err) if include.ignore_missing => {
                tracing::debug!(template = %name, error = %err, "include skipped");
            }
            Err(err) => return Err(err),
        }
        Ok(())
    }

    /// A circular include or import renders its message in place, keeping
    /// the surrounding output; debug mode propagates it instead
    pub(crate) fn circular(&self, name: &str, message: String) -> Result<String, TemplateError> {
        if self.settings.debug {
            return Err(TemplateError::Render { message });
        }
        tracing::warn!(template = %name, "circular import skipped");
        Ok(message)
    }
}
