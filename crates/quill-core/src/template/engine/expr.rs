//! Expressions used by output tags and logic tag arguments
//!
//! The grammar, loosest binding first:
//!
//! ```text
//! or         := and (("||" | "or") and)*
//! and        := not (("&&" | "and") not)*
//! not        := ("!" | "not") not | comparison
//! comparison := filtered (op filtered)?        op: == != === !== < > <= >= in, not in
//! filtered   := primary ("|" name ("(" list ")")?)*
//! primary    := literal | "(" or ")" | "[" list "]" | "{" pairs "}" | path ("(" list ")")?
//! ```
//!
//! There is no arithmetic. Unknown filters are dropped at compile time.

use serde_json::Value;
use std::fmt;

use super::args::unescape;
use super::helpers::number;
use super::varname::{validate_identifier, Segment, VarPath};
use crate::template::error::TemplateError;
use crate::template::filters::{Filter, FilterRegistry};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BinaryOp {
    Eq,
    Ne,
    StrictEq,
    StrictNe,
    Lt,
    Gt,
    Le,
    Ge,
    And,
    Or,
    In,
    NotIn,
}

#[derive(Debug, Clone)]
pub(crate) enum Expr {
    Literal(Value),
    Path(VarPath),
    Call { path: VarPath, args: Vec<Expr> },
    Array(Vec<Expr>),
    Object(Vec<(String, Expr)>),
    Filtered { base: Box<Expr>, filters: Vec<FilterCall> },
    Not(Box<Expr>),
    Binary { op: BinaryOp, lhs: Box<Expr>, rhs: Box<Expr> },
}

/// A filter resolved against the registry, with unevaluated arguments
#[derive(Clone)]
pub(crate) struct FilterCall {
    pub name: String,
    pub filter: Filter,
    pub args: Vec<Expr>,
}

impl fmt::Debug for FilterCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterCall")
            .field("name", &self.name)
            .field("args", &self.args)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Lexeme {
    Ident(String),
    Number(Value),
    Str(String),
    Op(&'static str),
    Punct(char),
}

/// Operators, longest first so `===` wins over `==`
const OPERATORS: &[&str] = &["===", "!==", "==", "!=", "<=", ">=", "&&", "||", "<", ">", "!"];

fn lex(src: &str, line: usize) -> Result<Vec<Lexeme>, TemplateError> {
    let bytes = src.as_bytes();
    let mut out = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        let byte = bytes[pos];
        let rest = &src[pos..];

        if byte.is_ascii_whitespace() {
            pos += 1;
            continue;
        }

        if byte == b'"' || byte == b'\'' {
            let (text, len) = lex_string(rest, line)?;
            out.push(Lexeme::Str(text));
            pos += len;
            continue;
        }

        let after_dot = matches!(out.last(), Some(Lexeme::Punct('.')));
        let negative = byte == b'-' && bytes.get(pos + 1).is_some_and(u8::is_ascii_digit);
        if byte.is_ascii_digit() && after_dot {
            // `items.0` indexes, it is not a float
            let len = rest.bytes().take_while(u8::is_ascii_digit).count();
            out.push(Lexeme::Ident(rest[..len].to_string()));
            pos += len;
            continue;
        }
        if byte.is_ascii_digit() || negative {
            let (value, len) = lex_number(rest, line)?;
            out.push(Lexeme::Number(value));
            pos += len;
            continue;
        }

        if byte.is_ascii_alphabetic() || byte == b'_' || byte == b'$' {
            let len = rest
                .bytes()
                .take_while(|b| b.is_ascii_alphanumeric() || *b == b'_' || *b == b'$')
                .count();
            out.push(Lexeme::Ident(rest[..len].to_string()));
            pos += len;
            continue;
        }

        if let Some(op) = OPERATORS.iter().find(|op| rest.starts_with(**op)) {
            out.push(Lexeme::Op(*op));
            pos += op.len();
            continue;
        }

        match byte {
            b'(' | b')' | b'[' | b']' | b'{' | b'}' | b',' | b':' | b'.' | b'|' | b'=' => {
                out.push(Lexeme::Punct(char::from(byte)));
                pos += 1;
            }
            _ => {
                let ch = rest.chars().next().unwrap_or_default();
                return Err(TemplateError::MalformedSyntax {
                    message: format!("unexpected character \"{ch}\" in \"{}\"", src.trim()),
                    line,
                });
            }
        }
    }

    Ok(out)
}

/// Returns (unescaped text, consumed byte length)
fn lex_string(rest: &str, line: usize) -> Result<(String, usize), TemplateError> {
    let quote = rest.as_bytes()[0];
    let mut escaped = false;

    for (idx, byte) in rest.bytes().enumerate().skip(1) {
        if escaped {
            escaped = false;
        } else if byte == b'\\' {
            escaped = true;
        } else if byte == quote {
            return Ok((unescape(&rest[1..idx]), idx + 1));
        }
    }

    Err(TemplateError::UnclosedArgument {
        arg: rest.to_string(),
        line,
    })
}

fn lex_number(rest: &str, line: usize) -> Result<(Value, usize), TemplateError> {
    let mut len = usize::from(rest.starts_with('-'));
    let mut seen_dot = false;

    for byte in rest.bytes().skip(len) {
        match byte {
            b'0'..=b'9' => len += 1,
            b'.' if !seen_dot && rest.as_bytes().get(len + 1).is_some_and(u8::is_ascii_digit) => {
                seen_dot = true;
                len += 1;
            }
            _ => break,
        }
    }

    let text = &rest[..len];
    let value = if seen_dot {
        text.parse::<f64>().ok().map(number)
    } else {
        text.parse::<i64>()
            .ok()
            .map(Value::from)
            .or_else(|| text.parse::<f64>().ok().map(number))
    };

    value.map(|v| (v, len)).ok_or_else(|| TemplateError::MalformedSyntax {
        message: format!("invalid number \"{text}\""),
        line,
    })
}

/// Recursive-descent parser over one tag's lexemes
///
/// Tag compilers drive it piecewise (`for x in ...` reads an identifier, a
/// keyword, then an expression) and call [`ExprParser::finish`] at the end.
pub(crate) struct ExprParser<'f> {
    lexemes: Vec<Lexeme>,
    pos: usize,
    line: usize,
    filters: &'f FilterRegistry,
}

impl<'f> ExprParser<'f> {
    pub fn new(src: &str, line: usize, filters: &'f FilterRegistry) -> Result<Self, TemplateError> {
        Ok(Self {
            lexemes: lex(src, line)?,
            pos: 0,
            line,
            filters,
        })
    }

    pub fn is_done(&self) -> bool {
        self.pos >= self.lexemes.len()
    }

    fn peek(&self) -> Option<&Lexeme> {
        self.lexemes.get(self.pos)
    }

    fn peek_nth(&self, n: usize) -> Option<&Lexeme> {
        self.lexemes.get(self.pos + n)
    }

    fn advance(&mut self) -> Option<Lexeme> {
        let lexeme = self.lexemes.get(self.pos).cloned();
        self.pos += 1;
        lexeme
    }

    fn malformed(&self, message: impl Into<String>) -> TemplateError {
        TemplateError::MalformedSyntax {
            message: message.into(),
            line: self.line,
        }
    }

    /// Consume `word` if it is the next identifier
    pub fn eat_keyword(&mut self, word: &str) -> bool {
        if matches!(self.peek(), Some(Lexeme::Ident(id)) if id == word) {
            self.pos += 1;
            return true;
        }
        false
    }

    pub fn eat_punct(&mut self, punct: char) -> bool {
        if self.peek() == Some(&Lexeme::Punct(punct)) {
            self.pos += 1;
            return true;
        }
        false
    }

    pub fn expect_punct(&mut self, punct: char) -> Result<(), TemplateError> {
        if self.eat_punct(punct) {
            Ok(())
        } else {
            Err(self.malformed(format!("expected \"{punct}\"")))
        }
    }

    /// Next lexeme must be a bindable identifier
    pub fn expect_ident(&mut self) -> Result<String, TemplateError> {
        match self.advance() {
            Some(Lexeme::Ident(name)) => {
                validate_identifier(&name, self.line)?;
                Ok(name)
            }
            other => Err(self.malformed(format!("expected a name, found {other:?}"))),
        }
    }

    /// Fail unless every lexeme was consumed
    pub fn finish(&self) -> Result<(), TemplateError> {
        match self.peek() {
            None => Ok(()),
            Some(Lexeme::Punct(')')) => Err(self.malformed("mismatched parentheses")),
            Some(other) => Err(self.malformed(format!("unexpected {other:?}"))),
        }
    }

    pub fn parse_expr(&mut self) -> Result<Expr, TemplateError> {
        self.parse_or()
    }

    /// Comma-separated expressions until end of input
    pub fn parse_list(&mut self) -> Result<Vec<Expr>, TemplateError> {
        let mut items = Vec::new();
        while !self.is_done() {
            items.push(self.parse_expr()?);
            if !self.eat_punct(',') {
                break;
            }
        }
        Ok(items)
    }

    /// `name` or `name(args)` of a filter, resolved against the registry
    ///
    /// Returns `None` for unknown filters.
    pub fn parse_filter_call(&mut self) -> Result<Option<FilterCall>, TemplateError> {
        let name = match self.advance() {
            Some(Lexeme::Ident(name)) => name,
            other => return Err(self.malformed(format!("expected a filter name, found {other:?}"))),
        };
        let args = if self.eat_punct('(') {
            self.parse_delimited(')')?
        } else {
            Vec::new()
        };

        match self.filters.get(&name) {
            Some(filter) => Ok(Some(FilterCall { name, filter, args })),
            None => {
                tracing::debug!(filter = %name, line = self.line, "unknown filter ignored");
                Ok(None)
            }
        }
    }

    fn parse_or(&mut self) -> Result<Expr, TemplateError> {
        let mut lhs = self.parse_and()?;
        while self.eat_op("||") || self.eat_keyword("or") {
            let rhs = self.parse_and()?;
            lhs = binary(BinaryOp::Or, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expr, TemplateError> {
        let mut lhs = self.parse_not()?;
        while self.eat_op("&&") || self.eat_keyword("and") {
            let rhs = self.parse_not()?;
            lhs = binary(BinaryOp::And, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_not(&mut self) -> Result<Expr, TemplateError> {
        if self.eat_op("!") || self.eat_keyword("not") {
            return Ok(Expr::Not(Box::new(self.parse_not()?)));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr, TemplateError> {
        let lhs = self.parse_filtered()?;

        let op = match self.peek() {
            Some(Lexeme::Op(op)) => match *op {
                "==" => BinaryOp::Eq,
                "!=" => BinaryOp::Ne,
                "===" => BinaryOp::StrictEq,
                "!==" => BinaryOp::StrictNe,
                "<" => BinaryOp::Lt,
                ">" => BinaryOp::Gt,
                "<=" => BinaryOp::Le,
                ">=" => BinaryOp::Ge,
                _ => return Ok(lhs),
            },
            Some(Lexeme::Ident(word)) if word == "in" => BinaryOp::In,
            Some(Lexeme::Ident(word))
                if word == "not"
                    && matches!(self.peek_nth(1), Some(Lexeme::Ident(next)) if next == "in") =>
            {
                self.pos += 1;
                BinaryOp::NotIn
            }
            _ => return Ok(lhs),
        };
        self.pos += 1;

        let rhs = self.parse_filtered()?;
        Ok(binary(op, lhs, rhs))
    }

    fn parse_filtered(&mut self) -> Result<Expr, TemplateError> {
        let base = self.parse_primary()?;
        let mut filters = Vec::new();

        while self.eat_punct('|') {
            filters.extend(self.parse_filter_call()?);
        }

        if filters.is_empty() {
            Ok(base)
        } else {
            Ok(Expr::Filtered {
                base: Box::new(base),
                filters,
            })
        }
    }

    fn parse_primary(&mut self) -> Result<Expr, TemplateError> {
        match self.advance() {
            Some(Lexeme::Number(value)) => Ok(Expr::Literal(value)),
            Some(Lexeme::Str(text)) => Ok(Expr::Literal(Value::String(text))),
            Some(Lexeme::Punct('(')) => {
                let inner = self.parse_or()?;
                if !self.eat_punct(')') {
                    return Err(self.malformed("mismatched parentheses"));
                }
                Ok(inner)
            }
            Some(Lexeme::Punct('[')) => Ok(Expr::Array(self.parse_delimited(']')?)),
            Some(Lexeme::Punct('{')) => self.parse_object(),
            Some(Lexeme::Ident(word)) => match word.as_str() {
                "true" => Ok(Expr::Literal(Value::Bool(true))),
                "false" => Ok(Expr::Literal(Value::Bool(false))),
                "null" | "undefined" => Ok(Expr::Literal(Value::Null)),
                _ => {
                    validate_identifier(&word, self.line)?;
                    self.parse_path(word)
                }
            },
            Some(Lexeme::Punct(')')) => Err(self.malformed("mismatched parentheses")),
            Some(other) => Err(self.malformed(format!("unexpected {other:?}"))),
            None => Err(self.malformed("unexpected end of expression")),
        }
    }

    fn parse_path(&mut self, root: String) -> Result<Expr, TemplateError> {
        let mut path = VarPath::new(root);

        loop {
            if self.eat_punct('.') {
                match self.advance() {
                    Some(Lexeme::Ident(key)) => {
                        if key.starts_with("__") {
                            validate_identifier(&key, self.line)?;
                        }
                        path.segments.push(Segment::Key(Value::String(key)));
                    }
                    other => {
                        return Err(self.malformed(format!("expected a property name, found {other:?}")))
                    }
                }
            } else if self.eat_punct('[') {
                let index = self.parse_or()?;
                self.expect_punct(']')?;
                path.segments.push(match index {
                    Expr::Literal(key) => Segment::Key(key),
                    dynamic => Segment::Index(Box::new(dynamic)),
                });
            } else if self.eat_punct('(') {
                let args = self.parse_delimited(')')?;
                return Ok(Expr::Call { path, args });
            } else {
                return Ok(Expr::Path(path));
            }
        }
    }

    /// Comma-separated expressions up to `close` (already past the opener)
    fn parse_delimited(&mut self, close: char) -> Result<Vec<Expr>, TemplateError> {
        let mut items = Vec::new();
        loop {
            if self.eat_punct(close) {
                return Ok(items);
            }
            if self.is_done() {
                return Err(self.unclosed(close));
            }
            items.push(self.parse_or()?);
            if !self.eat_punct(',') {
                return if self.eat_punct(close) {
                    Ok(items)
                } else {
                    Err(self.unclosed(close))
                };
            }
        }
    }

    fn parse_object(&mut self) -> Result<Expr, TemplateError> {
        let mut pairs = Vec::new();
        loop {
            if self.eat_punct('}') {
                return Ok(Expr::Object(pairs));
            }
            let key = match self.advance() {
                Some(Lexeme::Ident(key) | Lexeme::Str(key)) => key,
                Some(Lexeme::Number(n)) => n.to_string(),
                other => return Err(self.malformed(format!("expected an object key, found {other:?}"))),
            };
            self.expect_punct(':')?;
            pairs.push((key, self.parse_or()?));
            if !self.eat_punct(',') {
                self.expect_punct('}')?;
                return Ok(Expr::Object(pairs));
            }
        }
    }

    fn eat_op(&mut self, op: &str) -> bool {
        if matches!(self.peek(), Some(Lexeme::Op(found)) if *found == op) {
            self.pos += 1;
            return true;
        }
        false
    }

    fn unclosed(&self, close: char) -> TemplateError {
        if close == ')' {
            self.malformed("mismatched parentheses")
        } else {
            self.malformed(format!("expected \"{close}\""))
        }
    }
}

fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
    Expr::Binary {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    }
}

/// Parse a complete expression
pub(crate) fn parse_expr(src: &str, line: usize, filters: &FilterRegistry) -> Result<Expr, TemplateError> {
    let mut parser = ExprParser::new(src, line, filters)?;
    let expr = parser.parse_expr()?;
    parser.finish()?;
    Ok(expr)
}

/// Parse a comma-separated argument list (the inside of `name(...)`)
pub(crate) fn parse_list(src: &str, line: usize, filters: &FilterRegistry) -> Result<Vec<Expr>, TemplateError> {
    let mut parser = ExprParser::new(src, line, filters)?;
    let items = parser.parse_list()?;
    parser.finish()?;
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(src: &str) -> Result<Expr, TemplateError> {
        parse_expr(src, 1, &FilterRegistry::builtin(0))
    }

    #[test]
    fn test_literals() {
        assert!(matches!(parse("42").unwrap(), Expr::Literal(v) if v == json!(42)));
        assert!(matches!(parse("-1.5").unwrap(), Expr::Literal(v) if v == json!(-1.5)));
        assert!(matches!(parse("'it\\'s'").unwrap(), Expr::Literal(v) if v == json!("it's")));
        assert!(matches!(parse("true").unwrap(), Expr::Literal(Value::Bool(true))));
    }

    #[test]
    fn test_path_segments() {
        let Expr::Path(path) = parse("a.b[0][c].1").unwrap() else {
            panic!("expected a path");
        };
        assert_eq!(path.root, "a");
        assert_eq!(path.segments.len(), 4);
        assert!(matches!(&path.segments[1], Segment::Key(v) if *v == json!(0)));
        assert!(matches!(&path.segments[2], Segment::Index(_)));
        assert!(matches!(&path.segments[3], Segment::Key(v) if *v == json!("1")));
    }

    #[test]
    fn test_precedence() {
        let expr = parse("a or b and not c == d").unwrap();
        let Expr::Binary { op: BinaryOp::Or, rhs, .. } = expr else {
            panic!("or should bind loosest");
        };
        let Expr::Binary { op: BinaryOp::And, rhs, .. } = *rhs else {
            panic!("and binds tighter than or");
        };
        assert!(matches!(&*rhs, Expr::Not(inner) if matches!(**inner, Expr::Binary { op: BinaryOp::Eq, .. })));
    }

    #[test]
    fn test_not_in() {
        assert!(matches!(
            parse("x not in list").unwrap(),
            Expr::Binary { op: BinaryOp::NotIn, .. }
        ));
    }

    #[test]
    fn test_unknown_filter_is_dropped() {
        assert!(matches!(parse("a|nosuchfilter").unwrap(), Expr::Path(_)));
        let Expr::Filtered { filters, .. } = parse("a|upper|nosuch|lower").unwrap() else {
            panic!("expected filters");
        };
        let names: Vec<_> = filters.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["upper", "lower"]);
    }

    #[test]
    fn test_mismatched_parens() {
        for src in ["(a", "a)", "((a) && b"] {
            assert!(
                matches!(parse(src), Err(TemplateError::MalformedSyntax { ref message, .. }) if message == "mismatched parentheses"),
                "{src}"
            );
        }
    }

    #[test]
    fn test_reserved_root_rejected() {
        assert!(matches!(
            parse("__secret"),
            Err(TemplateError::InvalidVariable { .. })
        ));
    }

    #[test]
    fn test_object_and_array() {
        let Expr::Object(pairs) = parse("{ a: 1, 'b': [1, 2] }").unwrap() else {
            panic!("expected object");
        };
        assert_eq!(pairs[0].0, "a");
        assert!(matches!(&pairs[1].1, Expr::Array(items) if items.len() == 2));
    }
}
