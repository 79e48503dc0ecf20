//! `filter`

use serde_json::Value;

use crate::template::engine::compiler::Compiler;
use crate::template::engine::context::Context;
use crate::template::engine::expr::FilterCall;
use crate::template::engine::helpers::stringify;
use crate::template::engine::node::Node;
use crate::template::engine::parser::LogicToken;
use crate::template::engine::render::Renderer;
use crate::template::error::TemplateError;

/// `{% filter name(args) %}...{% endfilter %}`
pub(crate) fn compile(compiler: &Compiler<'_>, token: &LogicToken) -> Result<Node, TemplateError> {
    let mut parser = compiler.expr_parser(&token.args, token.line)?;
    if parser.is_done() {
        return Err(TemplateError::InvalidArguments {
            tag: token.name.clone(),
            message: "missing filter name".to_string(),
            line: token.line,
        });
    }
    let filter = parser.parse_filter_call()?;
    parser.finish()?;

    Ok(Node::Filter {
        filter,
        body: compiler.compile_children(token)?.into(),
    })
}

impl Renderer<'_> {
    pub(crate) fn render_filter(
        &self,
        filter: Option<&FilterCall>,
        body: &[Node],
        ctx: &mut Context,
        out: &mut String,
    ) -> Result<(), TemplateError> {
        let text = self.render_to_string(body, ctx)?;
        match filter {
            Some(call) => {
                let filtered = self.apply_filters(Value::String(text), std::slice::from_ref(call), ctx)?;
                out.push_str(&stringify(&filtered));
            }
            None => out.push_str(&text),
        }
        Ok(())
    }
}
