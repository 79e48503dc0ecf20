//! Tag argument splitting
//!
//! Tag bodies are split on whitespace, but quoted strings, `[...]` lists,
//! `{...}` objects and `(...)` groups always stay a single argument.

use crate::template::error::TemplateError;

/// Quote and bracket tracking shared by every splitter in this module
#[derive(Debug, Default)]
struct Nesting {
    quote: Option<char>,
    escaped: bool,
    /// Expected closers, innermost last
    stack: Vec<char>,
}

#[derive(Debug, PartialEq)]
enum Step {
    /// Character outside any quote or group
    TopLevel,
    /// Character inside (or delimiting) a quote or group
    Nested,
    /// Closer that matches no open group
    Stray(char),
}

impl Nesting {
    fn step(&mut self, ch: char) -> Step {
        if let Some(quote) = self.quote {
            if self.escaped {
                self.escaped = false;
            } else if ch == '\\' {
                self.escaped = true;
            } else if ch == quote {
                self.quote = None;
            }
            return Step::Nested;
        }

        match ch {
            '"' | '\'' => {
                self.quote = Some(ch);
                Step::Nested
            }
            '(' => self.open(')'),
            '[' => self.open(']'),
            '{' => self.open('}'),
            ')' | ']' | '}' => {
                if self.stack.last() == Some(&ch) {
                    self.stack.pop();
                    Step::Nested
                } else {
                    Step::Stray(ch)
                }
            }
            _ if self.is_top_level() => Step::TopLevel,
            _ => Step::Nested,
        }
    }

    fn open(&mut self, closer: char) -> Step {
        self.stack.push(closer);
        Step::Nested
    }

    fn is_top_level(&self) -> bool {
        self.quote.is_none() && self.stack.is_empty()
    }
}

/// Split a tag body into whitespace-separated arguments
///
/// # Errors
///
/// - [`TemplateError::UnclosedArgument`] when a quote or group is never closed
/// - [`TemplateError::MalformedSyntax`] on a closer with no matching opener
pub(crate) fn split_args(raw: &str, line: usize) -> Result<Vec<String>, TemplateError> {
    let mut args = Vec::new();
    let mut nesting = Nesting::default();
    let mut start: Option<usize> = None;

    for (idx, ch) in raw.char_indices() {
        match nesting.step(ch) {
            Step::Stray(closer) => {
                return Err(TemplateError::MalformedSyntax {
                    message: format!("unexpected \"{closer}\" in \"{}\"", raw.trim()),
                    line,
                });
            }
            Step::TopLevel if ch.is_whitespace() => {
                if let Some(from) = start.take() {
                    args.push(raw[from..idx].to_string());
                }
            }
            _ => {
                start.get_or_insert(idx);
            }
        }
    }

    if let Some(from) = start {
        if !nesting.is_top_level() {
            return Err(TemplateError::UnclosedArgument {
                arg: raw[from..].trim_end().to_string(),
                line,
            });
        }
        args.push(raw[from..].to_string());
    }

    Ok(args)
}

/// Split an output expression on its top-level filter pipes
///
/// `||` is the logical operator and never splits.
pub(crate) fn split_filters(expr: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut nesting = Nesting::default();
    let mut start = 0;
    let mut chars = expr.char_indices().peekable();

    while let Some((idx, ch)) = chars.next() {
        if nesting.step(ch) != Step::TopLevel || ch != '|' {
            continue;
        }
        if chars.peek().is_some_and(|&(_, next)| next == '|') {
            chars.next();
            continue;
        }
        parts.push(&expr[start..idx]);
        start = idx + 1;
    }

    parts.push(&expr[start..]);
    parts
}

/// Split `name(args)` into its name and raw argument list
pub(crate) fn split_call(text: &str) -> (&str, Option<&str>) {
    let text = text.trim();
    match (text.find('('), text.ends_with(')')) {
        (Some(open), true) => (text[..open].trim(), Some(&text[open + 1..text.len() - 1])),
        _ => (text, None),
    }
}

/// Strip matching quotes and resolve backslash escapes
///
/// Returns `None` if `text` is not a quoted string literal.
pub(crate) fn unquote(text: &str) -> Option<String> {
    let text = text.trim();
    let quote = text.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    let inner = text.strip_prefix(quote)?.strip_suffix(quote)?;
    Some(unescape(inner))
}

/// Resolve backslash escapes inside a string literal body
pub(crate) fn unescape(body: &str) -> String {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();

    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }

    out
}
