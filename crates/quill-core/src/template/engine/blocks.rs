//! Template inheritance: `extends`, `block` and `parent`
//!
//! A template either stands alone or extends a layout. Standalone templates
//! compile to their own nodes plus the blocks they declare. An extending
//! template keeps only its blocks and its top-level `set` tags: the blocks
//! override the layout's blocks of the same name, and the `set` tags run
//! before the layout's nodes.

use super::args::unquote;
use super::compiler::{Compiler, Frame};
use super::expr::Expr;
use super::node::{BlockMap, Fragment, Node, Program};
use super::parser::{LogicToken, Token};
use crate::template::error::TemplateError;
use crate::template::tags::Tag;

/// Argument of an `{% extends %}` tag
#[derive(Debug, Clone)]
pub(crate) enum Extends {
    /// Quoted name, resolved when the template is compiled
    Literal(String),
    /// Anything else, resolved against the render context
    Dynamic(Expr),
}

/// Find the `extends` tag of a template
///
/// It must be the first top-level token; whitespace-only text before it is
/// ignored.
///
/// # Errors
///
/// [`TemplateError::ExtendsNotFirst`] when an `extends` follows other
/// content, [`TemplateError::InvalidArguments`] when it does not name
/// exactly one template.
pub(crate) fn find_extends(
    compiler: &Compiler<'_>,
    tokens: &[Token],
) -> Result<Option<(Extends, usize)>, TemplateError> {
    let mut significant = tokens
        .iter()
        .filter(|token| !matches!(token, Token::Literal(text) if text.trim().is_empty()));

    let first = match significant.next() {
        Some(Token::Logic(token)) if token.tag == Tag::Extends => Some(token),
        _ => None,
    };

    if let Some(misplaced) = significant.find_map(extends_token) {
        return Err(TemplateError::ExtendsNotFirst { line: misplaced.line });
    }
    let Some(token) = first else {
        return Ok(None);
    };
    let target = match token.words.as_slice() {
        [single] => match unquote(single) {
            Some(name) => Extends::Literal(name),
            None => Extends::Dynamic(compiler.expr(single, token.line)?),
        },
        _ => {
            return Err(TemplateError::InvalidArguments {
                tag: token.name.clone(),
                message: "expected exactly one template name".to_string(),
                line: token.line,
            })
        }
    };

    Ok(Some((target, token.line)))
}

fn extends_token(token: &Token) -> Option<&LogicToken> {
    match token {
        Token::Logic(logic) if logic.tag == Tag::Extends => Some(logic),
        _ => None,
    }
}

/// Compile every block declared in `tokens`, nested blocks included
///
/// A block whose name exists in `inherited` compiles with the inherited
/// fragment as its `{% parent %}`.
pub(crate) fn compile_blocks(
    compiler: &Compiler<'_>,
    tokens: &[Token],
    inherited: Option<&BlockMap>,
    blocks: &mut BlockMap,
) -> Result<(), TemplateError> {
    for token in tokens {
        let Token::Logic(logic) = token else {
            continue;
        };
        if logic.tag != Tag::Block {
            continue;
        }

        let name = logic.words.concat();
        let parent = inherited.and_then(|map| map.get(&name)).cloned();
        let body: Fragment = compiler.with_parent(parent).compile_children(logic)?.into();
        blocks.insert(name, body);

        compile_blocks(compiler, &logic.tokens, inherited, blocks)?;
    }
    Ok(())
}

/// Names of the blocks declared at any depth, in source order
pub(crate) fn block_names(tokens: &[Token]) -> Vec<String> {
    let mut names = Vec::new();
    for token in tokens {
        if let Token::Logic(logic) = token {
            if logic.tag == Tag::Block {
                names.push(logic.words.concat());
                names.extend(block_names(&logic.tokens));
            }
        }
    }
    names
}

/// Compile a template that extends nothing
pub(crate) fn compile_program(compiler: &Compiler<'_>, tokens: &[Token]) -> Result<Program, TemplateError> {
    let nodes = compiler.compile_tokens(tokens, Frame::default())?;
    let mut blocks = BlockMap::new();
    compile_blocks(compiler, tokens, None, &mut blocks)?;

    Ok(Program {
        nodes: nodes.into(),
        blocks,
    })
}

/// Compile a child template over its resolved layout
pub(crate) fn extend(compiler: &Compiler<'_>, tokens: &[Token], parent: &Program) -> Result<Program, TemplateError> {
    let mut blocks = parent.blocks.clone();
    compile_blocks(compiler, tokens, Some(&parent.blocks), &mut blocks)?;

    let mut nodes = compiler.compile_tokens(&hoisted_sets(tokens), Frame::default())?;
    nodes.push(Node::Fragment(parent.nodes.clone()));

    Ok(Program {
        nodes: nodes.into(),
        blocks,
    })
}

/// Compile the blocks of a template whose layout is only known at render
/// time, so that their errors surface at compile time
pub(crate) fn check_blocks(compiler: &Compiler<'_>, tokens: &[Token]) -> Result<(), TemplateError> {
    let mut scratch = BlockMap::new();
    compile_blocks(compiler, tokens, None, &mut scratch)?;

    compiler.compile_tokens(&hoisted_sets(tokens), Frame::default())?;
    Ok(())
}

/// Top-level `set` tags, which survive inheritance
fn hoisted_sets(tokens: &[Token]) -> Vec<Token> {
    tokens
        .iter()
        .filter(|token| matches!(token, Token::Logic(logic) if logic.tag == Tag::Set))
        .cloned()
        .collect()
}
