//! Template error types

use thiserror::Error;

/// Template compile and render errors
///
/// Every variant raised while parsing or compiling carries the line the
/// offending tag started on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    /// `{{`, `{%` or `{#` without its closing delimiter
    #[error("Unclosed \"{delimiter}\" on line {line}")]
    UnclosedDelimiter {
        /// The opening delimiter
        delimiter: &'static str,
        /// Line number where the delimiter was opened
        line: usize,
    },

    /// Logic tag name not present in the tag registry
    #[error("Unexpected logic tag \"{name}\" on line {line}")]
    UnknownTag { name: String, line: usize },

    /// `end<name>` that does not close the innermost open block
    #[error(
        "Expected end of tag \"{expected}\" on line {opened}, but found \"{found}\" on line {line}"
    )]
    MismatchedEndTag {
        expected: String,
        opened: usize,
        found: String,
        line: usize,
    },

    /// `end<name>` with no open block
    #[error("Unexpected end of tag \"{found}\" on line {line}")]
    UnexpectedEndTag { found: String, line: usize },

    /// Block tag still open at end of input
    #[error("Missing end tag for \"{name}\" opened on line {line}")]
    UnclosedTag { name: String, line: usize },

    /// `{% raw %}` without `{% endraw %}`
    #[error("Missing end tag for \"raw\" opened on line {line}")]
    UnclosedRaw { line: usize },

    /// Quoted string, list, object or group never closed inside a tag
    #[error("Unclosed argument \"{arg}\" on line {line}")]
    UnclosedArgument { arg: String, line: usize },

    /// Tag used outside the block it belongs to (e.g. `else` outside `if`)
    #[error("Tag \"{name}\" on line {line} must be used inside {expected}")]
    MisplacedTag {
        name: String,
        expected: &'static str,
        line: usize,
    },

    #[error("Invalid block name \"{name}\" on line {line}")]
    InvalidBlockName { name: String, line: usize },

    #[error("Invalid variable name \"{name}\" on line {line}: {reason}")]
    InvalidVariable {
        name: String,
        reason: String,
        line: usize,
    },

    #[error("Invalid arguments for tag \"{tag}\" on line {line}: {message}")]
    InvalidArguments {
        tag: String,
        message: String,
        line: usize,
    },

    /// Malformed expression or tag body
    #[error("Malformed syntax at line {line}: {message}")]
    MalformedSyntax { message: String, line: usize },

    #[error("Circular extends of template \"{name}\" on line {line}")]
    CircularExtends { name: String, line: usize },

    #[error("Extends tag must be the first tag in the template, found on line {line}")]
    ExtendsNotFirst { line: usize },

    #[error("Block \"{name}\" on line {line} cannot be nested inside \"{parent}\"")]
    IllegalBlockNesting {
        name: String,
        parent: String,
        line: usize,
    },

    /// The loader collaborator failed to provide template source
    #[error("Unable to load template \"{name}\": {message}")]
    Load { name: String, message: String },

    /// Failure raised while a compiled template was rendering
    #[error("{message}")]
    Render { message: String },

    /// The owning engine was dropped before the template rendered
    #[error("Template \"{id}\" outlived its engine")]
    EngineGone { id: String },
}
