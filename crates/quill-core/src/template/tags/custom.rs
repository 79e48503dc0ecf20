//! User-registered tags

use crate::template::engine::compiler::Compiler;
use crate::template::engine::context::Context;
use crate::template::engine::node::{CustomNode, Node};
use crate::template::engine::parser::LogicToken;
use crate::template::engine::render::Renderer;
use crate::template::error::TemplateError;
use crate::template::tags::TagCall;

/// Each grouped word of the tag is one argument expression
pub(crate) fn compile(compiler: &Compiler<'_>, name: &str, token: &LogicToken) -> Result<Node, TemplateError> {
    let tag = compiler.tags.custom(name).ok_or_else(|| TemplateError::UnknownTag {
        name: name.to_string(),
        line: token.line,
    })?;

    let args = token
        .words
        .iter()
        .map(|word| compiler.expr(word, token.line))
        .collect::<Result<Vec<_>, _>>()?;

    let body = if tag.ends() {
        Some(compiler.compile_children(token)?.into())
    } else {
        None
    };

    Ok(Node::Custom(CustomNode {
        name: name.to_string(),
        tag,
        args,
        body,
    }))
}

impl Renderer<'_> {
    pub(crate) fn render_custom(&self, custom: &CustomNode, ctx: &mut Context, out: &mut String) -> Result<(), TemplateError> {
        let args = self.eval_all(&custom.args, ctx)?;
        let body = match &custom.body {
            Some(body) => Some(self.render_to_string(body, ctx)?),
            None => None,
        };

        let call = TagCall {
            args: &args,
            body: body.as_deref(),
            context: ctx,
            extensions: &self.settings.extensions,
        };
        let text = custom.tag.render(call).map_err(|message| TemplateError::Render {
            message: format!("tag \"{}\" failed: {message}", custom.name),
        })?;
        out.push_str(&text);
        Ok(())
    }
}
