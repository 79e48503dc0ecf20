//! Token tree → node tree

use super::expr::{parse_expr, parse_list, Expr, ExprParser};
use super::node::{Fragment, Node, Output};
use super::parser::{LogicToken, Token, VariableToken};
use crate::template::error::TemplateError;
use crate::template::filters::FilterRegistry;
use crate::template::tags::{self, Tag, TagRegistry};

/// Whitespace trimming applied to the edges of a child list
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Frame {
    pub strip_start: bool,
    pub strip_end: bool,
}

impl Frame {
    fn of(token: &LogicToken) -> Self {
        Self {
            strip_start: token.strip.start,
            strip_end: token.strip.end,
        }
    }
}

#[derive(Clone)]
pub(crate) struct Compiler<'a> {
    pub filters: &'a FilterRegistry,
    pub tags: &'a TagRegistry,
    /// What `{% parent %}` renders inside the block being compiled
    parent: Option<Fragment>,
}

impl<'a> Compiler<'a> {
    pub fn new(filters: &'a FilterRegistry, tags: &'a TagRegistry) -> Self {
        Self {
            filters,
            tags,
            parent: None,
        }
    }

    /// Compiler for the body of a block overriding `parent`
    pub fn with_parent(&self, parent: Option<Fragment>) -> Self {
        Self {
            parent,
            ..self.clone()
        }
    }

    pub fn expr(&self, src: &str, line: usize) -> Result<Expr, TemplateError> {
        parse_expr(src, line, self.filters)
    }

    pub fn expr_parser(&self, src: &str, line: usize) -> Result<ExprParser<'a>, TemplateError> {
        ExprParser::new(src, line, self.filters)
    }

    pub fn compile_tokens(&self, tokens: &[Token], frame: Frame) -> Result<Vec<Node>, TemplateError> {
        let mut nodes = Vec::with_capacity(tokens.len());

        for (idx, token) in tokens.iter().enumerate() {
            match token {
                Token::Literal(text) => {
                    let text = strip_literal(tokens, idx, text, frame);
                    if !text.is_empty() {
                        nodes.push(Node::Text(text.to_string()));
                    }
                }
                Token::Variable(variable) => nodes.push(self.output(variable)?),
                Token::Logic(logic) => {
                    if let Some(node) = self.logic(logic)? {
                        nodes.push(node);
                    }
                }
            }
        }

        Ok(nodes)
    }

    /// Compile the children of a block tag, honoring its strip flags
    pub fn compile_children(&self, token: &LogicToken) -> Result<Vec<Node>, TemplateError> {
        self.compile_tokens(&token.tokens, Frame::of(token))
    }

    fn output(&self, token: &VariableToken) -> Result<Node, TemplateError> {
        let expr = self.expr(&token.expr, token.line)?;

        let mut filters = Vec::with_capacity(token.filters.len());
        for filter_ref in &token.filters {
            let Some(filter) = self.filters.get(&filter_ref.name) else {
                tracing::debug!(filter = %filter_ref.name, line = token.line, "unknown filter ignored");
                continue;
            };
            let args = match &filter_ref.args {
                Some(raw) => parse_list(raw, token.line, self.filters)?,
                None => Vec::new(),
            };
            filters.push(super::expr::FilterCall {
                name: filter_ref.name.clone(),
                filter,
                args,
            });
        }

        Ok(Node::Output(Output {
            expr,
            filters,
            escape: token.escape,
        }))
    }

    fn logic(&self, token: &LogicToken) -> Result<Option<Node>, TemplateError> {
        let node = match &token.tag {
            Tag::For => tags::for_loop::compile(self, token)?,
            Tag::If => tags::conditional::compile_if(self, token)?,
            Tag::Else => tags::conditional::compile_else(self, token)?,
            Tag::Set => tags::set::compile(self, token)?,
            Tag::Filter => tags::filter::compile(self, token)?,
            Tag::Macro => tags::macros::compile(self, token)?,
            Tag::Include => tags::include::compile(self, token)?,
            Tag::Import => tags::import::compile(self, token)?,
            Tag::Block => Node::Block(token.words.concat()),
            Tag::Parent => match &self.parent {
                Some(fragment) => Node::Fragment(fragment.clone()),
                None => return Ok(None),
            },
            Tag::Autoescape | Tag::Raw => Node::Group(self.compile_children(token)?),
            // Resolved before compilation
            Tag::Extends => return Ok(None),
            Tag::Custom(name) => tags::custom::compile(self, name, token)?,
        };
        Ok(Some(node))
    }
}

fn strip_literal<'t>(tokens: &[Token], idx: usize, text: &'t str, frame: Frame) -> &'t str {
    let mut text = text;

    let trim_start = (idx == 0 && frame.strip_start)
        || idx
            .checked_sub(1)
            .and_then(|prev| tokens.get(prev))
            .is_some_and(|prev| matches!(prev, Token::Logic(logic) if logic.strip.after));
    let trim_end = (idx + 1 == tokens.len() && frame.strip_end)
        || matches!(tokens.get(idx + 1), Some(Token::Logic(logic)) if logic.strip.before);

    if trim_start {
        text = text.trim_start();
    }
    if trim_end {
        text = text.trim_end();
    }
    text
}

/// Split compiled children at `else` markers
///
/// Returns the leading nodes and each `else` section with its condition.
pub(crate) fn split_else(nodes: Vec<Node>) -> (Vec<Node>, Vec<(Option<Expr>, usize, Vec<Node>)>) {
    let mut head = Vec::new();
    let mut sections: Vec<(Option<Expr>, usize, Vec<Node>)> = Vec::new();

    for node in nodes {
        match node {
            Node::Else { condition, line } => sections.push((condition, line, Vec::new())),
            other => match sections.last_mut() {
                Some((_, _, body)) => body.push(other),
                None => head.push(other),
            },
        }
    }

    (head, sections)
}
