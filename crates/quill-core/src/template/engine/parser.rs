//! Token tree construction
//!
//! Turns the flat segment stream into a tree: logic tags that open a block
//! own their child tokens until the matching `end<name>`. Tag names, block
//! pairing, strip markers and `autoescape` scoping are all settled here.

use super::args::{split_args, split_call, split_filters, unquote};
use super::tokenize::{Delimiter, Segment, TokenStream};
use crate::template::error::TemplateError;
use crate::template::filters::{EscapeKind, SAFE_FILTERS};
use crate::template::tags::{Tag, TagRegistry};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    Literal(String),
    Variable(VariableToken),
    Logic(LogicToken),
}

/// `{{ expr|filter(args) }}`, filters still unresolved
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct VariableToken {
    pub expr: String,
    pub filters: Vec<FilterRef>,
    /// Escape applied after the filters, `None` when disabled or a safe
    /// filter was used
    pub escape: Option<EscapeKind>,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct FilterRef {
    pub name: String,
    /// Raw argument list between the parentheses
    pub args: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct LogicToken {
    pub name: String,
    pub tag: Tag,
    /// Everything after the tag name
    pub args: String,
    /// `args` split into grouped words
    pub words: Vec<String>,
    pub line: usize,
    /// Child tokens of a block tag
    pub tokens: Vec<Token>,
    /// Names of the enclosing block tags, outermost first
    pub parents: Vec<String>,
    pub strip: Strip,
}

/// Whitespace control flags of a logic tag
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Strip {
    /// `{%-`: trim the preceding sibling literal's trailing whitespace
    pub before: bool,
    /// `-%}` (of the closing tag for blocks): trim the following sibling's
    /// leading whitespace
    pub after: bool,
    /// `-%}` on a block opener: trim the first child's leading whitespace
    pub start: bool,
    /// `{%-` on a block closer: trim the last child's trailing whitespace
    pub end: bool,
}

struct Parser<'t> {
    tags: &'t TagRegistry,
    root: Vec<Token>,
    open: Vec<LogicToken>,
    /// Policies to restore when `autoescape` blocks close
    escape_stack: Vec<Option<EscapeKind>>,
    escape: Option<EscapeKind>,
}

/// Parse template source into a token tree
///
/// `autoescape` is the policy in effect outside any `autoescape` block.
pub(crate) fn parse(
    source: &str,
    tags: &TagRegistry,
    autoescape: Option<EscapeKind>,
) -> Result<Vec<Token>, TemplateError> {
    let mut parser = Parser {
        tags,
        root: Vec::new(),
        open: Vec::new(),
        escape_stack: Vec::new(),
        escape: autoescape,
    };

    let mut stream = TokenStream::new(source);
    while let Some(segment) = stream.next() {
        match segment? {
            Segment::Text { text, .. } => parser.push(Token::Literal(text.to_string())),
            Segment::Tag {
                delimiter: Delimiter::Variable,
                content,
                line,
            } => {
                let token = parser.variable(content, line)?;
                parser.push(Token::Variable(token));
            }
            Segment::Tag { content, line, .. } => {
                if let Some(mut raw) = parser.logic(content, line)? {
                    let body = stream.take_raw(raw.line)?;
                    raw.strip.end = body.strip_before;
                    raw.strip.after = body.strip_after;
                    raw.tokens.push(Token::Literal(body.text.to_string()));
                    parser.push(Token::Logic(raw));
                }
            }
        }
    }

    if let Some(unclosed) = parser.open.last() {
        return Err(TemplateError::UnclosedTag {
            name: unclosed.name.clone(),
            line: unclosed.line,
        });
    }

    Ok(parser.root)
}

impl<'t> Parser<'t> {
    fn push(&mut self, token: Token) {
        match self.open.last_mut() {
            Some(block) => block.tokens.push(token),
            None => self.root.push(token),
        }
    }

    fn variable(&self, content: &str, line: usize) -> Result<VariableToken, TemplateError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(TemplateError::MalformedSyntax {
                message: "empty variable tag".to_string(),
                line,
            });
        }
        // Validates quote and bracket pairing
        split_args(content, line)?;

        let mut parts = split_filters(content).into_iter();
        let expr = parts.next().unwrap_or_default().trim().to_string();
        if expr.is_empty() {
            return Err(TemplateError::MalformedSyntax {
                message: format!("missing expression before filter in \"{content}\""),
                line,
            });
        }

        let mut filters = Vec::new();
        for part in parts {
            let (name, args) = split_call(part);
            if name.is_empty() {
                return Err(TemplateError::MalformedSyntax {
                    message: format!("empty filter in \"{content}\""),
                    line,
                });
            }
            filters.push(FilterRef {
                name: name.to_string(),
                args: args.map(str::to_string),
            });
        }

        let safe = filters.iter().any(|f| SAFE_FILTERS.contains(&f.name.as_str()));
        Ok(VariableToken {
            expr,
            filters,
            escape: if safe { None } else { self.escape },
            line,
        })
    }

    /// Handle a `{% ... %}` tag
    ///
    /// Returns the opened `raw` token when its body must be taken verbatim
    /// from the stream.
    fn logic(&mut self, content: &str, line: usize) -> Result<Option<LogicToken>, TemplateError> {
        let mut body = content.trim();
        let mut strip = Strip::default();
        if let Some(rest) = body.strip_prefix('-') {
            strip.before = true;
            body = rest;
        }
        if let Some(rest) = body.strip_suffix('-') {
            strip.after = true;
            body = rest;
        }
        let body = body.trim();

        let (name, args) = match body.find(char::is_whitespace) {
            Some(idx) => (&body[..idx], body[idx..].trim()),
            None => (body, ""),
        };
        if name.is_empty() {
            return Err(TemplateError::MalformedSyntax {
                message: "empty logic tag".to_string(),
                line,
            });
        }

        if name == "raw" {
            return Ok(Some(LogicToken {
                name: name.to_string(),
                tag: Tag::Raw,
                args: String::new(),
                words: Vec::new(),
                line,
                tokens: Vec::new(),
                parents: self.open.iter().map(|t| t.name.clone()).collect(),
                strip: Strip {
                    before: strip.before,
                    start: strip.after,
                    ..Strip::default()
                },
            }));
        }

        if let Some(closed) = name.strip_prefix("end") {
            if self.tags.get(name).is_none() {
                self.close(name, closed, strip, line)?;
                return Ok(None);
            }
        }

        let def = self.tags.get(name).ok_or_else(|| TemplateError::UnknownTag {
            name: name.to_string(),
            line,
        })?;
        let words = split_args(args, line)?;
        let parents: Vec<String> = self.open.iter().map(|t| t.name.clone()).collect();

        self.validate_placement(name, &def.tag, &words, &parents, line)?;

        let mut token = LogicToken {
            name: name.to_string(),
            tag: def.tag.clone(),
            args: args.to_string(),
            words,
            line,
            tokens: Vec::new(),
            parents,
            strip,
        };

        if !def.ends {
            self.push(Token::Logic(token));
            return Ok(None);
        }

        // The opener's `-%}` belongs to the first child; the block's own
        // strip-after comes from its closing tag
        token.strip.start = token.strip.after;
        token.strip.after = false;

        if token.tag == Tag::Autoescape {
            let policy = autoescape_policy(&token.words, line)?;
            self.escape_stack.push(self.escape);
            self.escape = policy;
        }

        self.open.push(token);
        Ok(None)
    }

    fn close(&mut self, found: &str, closed: &str, strip: Strip, line: usize) -> Result<(), TemplateError> {
        let Some(mut block) = self.open.pop() else {
            return Err(TemplateError::UnexpectedEndTag {
                found: found.to_string(),
                line,
            });
        };

        if block.name != closed {
            return Err(TemplateError::MismatchedEndTag {
                expected: block.name,
                opened: block.line,
                found: found.to_string(),
                line,
            });
        }

        block.strip.end = strip.before;
        block.strip.after = strip.after;

        if block.tag == Tag::Autoescape {
            self.escape = self.escape_stack.pop().unwrap_or(self.escape);
        }

        self.push(Token::Logic(block));
        Ok(())
    }

    fn validate_placement(
        &self,
        name: &str,
        tag: &Tag,
        words: &[String],
        parents: &[String],
        line: usize,
    ) -> Result<(), TemplateError> {
        match tag {
            Tag::Else => {
                let enclosing = self.open.last().map(|t| &t.tag);
                if !matches!(enclosing, Some(Tag::If | Tag::For)) {
                    return Err(TemplateError::MisplacedTag {
                        name: name.to_string(),
                        expected: "\"if\" or \"for\"",
                        line,
                    });
                }
            }
            Tag::Block => {
                if let Some(parent) = self.open.iter().find(|t| t.tag != Tag::Block) {
                    return Err(TemplateError::IllegalBlockNesting {
                        name: words.first().cloned().unwrap_or_default(),
                        parent: parent.name.clone(),
                        line,
                    });
                }
                let block_name = match words {
                    [single] => single,
                    _ => {
                        return Err(TemplateError::InvalidArguments {
                            tag: name.to_string(),
                            message: "expected exactly one block name".to_string(),
                            line,
                        })
                    }
                };
                if !is_block_name(block_name) {
                    return Err(TemplateError::InvalidBlockName {
                        name: block_name.clone(),
                        line,
                    });
                }
            }
            Tag::Extends if !parents.is_empty() => {
                return Err(TemplateError::ExtendsNotFirst { line });
            }
            _ => {}
        }
        Ok(())
    }
}

/// Letters, digits and underscores, starting with a letter
pub(crate) fn is_block_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn autoescape_policy(words: &[String], line: usize) -> Result<Option<EscapeKind>, TemplateError> {
    let invalid = || TemplateError::InvalidArguments {
        tag: "autoescape".to_string(),
        message: "expected true, false, \"html\" or \"js\"".to_string(),
        line,
    };

    match words {
        [word] if word == "true" => Ok(Some(EscapeKind::default())),
        [word] if word == "false" => Ok(None),
        [word] => unquote(word)
            .and_then(|kind| EscapeKind::from_name(&kind))
            .map(Some)
            .ok_or_else(invalid),
        _ => Err(invalid()),
    }
}
