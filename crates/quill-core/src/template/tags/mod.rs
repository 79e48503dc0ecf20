//! Logic tags
//!
//! Tag names are resolved to a closed [`Tag`] set while parsing. Each built-in
//! tag module holds its compile step (token → node) and its render step.
//! User tags registered through [`CustomTag`] are carried as
//! [`Tag::Custom`] and dispatched by name.

pub(crate) mod conditional;
pub(crate) mod custom;
pub(crate) mod filter;
pub(crate) mod for_loop;
pub(crate) mod import;
pub(crate) mod include;
pub(crate) mod macros;
pub(crate) mod set;

use serde_json::Value;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::engine::context::Context;

/// Host objects handed to custom tags, keyed by name
pub type Extensions = HashMap<String, Arc<dyn Any + Send + Sync>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Tag {
    For,
    If,
    Else,
    Set,
    Filter,
    Macro,
    Include,
    Import,
    Block,
    Extends,
    Parent,
    Raw,
    Autoescape,
    Custom(String),
}

/// Registry entry for one tag name
#[derive(Debug, Clone)]
pub(crate) struct TagDef {
    pub tag: Tag,
    /// Whether the tag opens a block closed by `end<name>`
    pub ends: bool,
}

/// A user-defined logic tag
///
/// Arguments are evaluated against the render context before the call. For
/// tags that [`ends`](CustomTag::ends), the body is rendered first and passed
/// in as text. The returned string is appended to the output unescaped.
///
/// ```rust
/// use quill_core::template::{CustomTag, TagCall};
///
/// struct Repeat;
///
/// impl CustomTag for Repeat {
///     fn ends(&self) -> bool {
///         true
///     }
///
///     fn render(&self, call: TagCall<'_>) -> Result<String, String> {
///         let times = call.args.first().and_then(|v| v.as_u64()).unwrap_or(1);
///         Ok(call.body.unwrap_or_default().repeat(times as usize))
///     }
/// }
/// ```
pub trait CustomTag: Send + Sync {
    fn ends(&self) -> bool {
        false
    }

    fn render(&self, call: TagCall<'_>) -> Result<String, String>;
}

/// Everything a custom tag sees when it renders
pub struct TagCall<'a> {
    pub args: &'a [Value],
    pub body: Option<&'a str>,
    pub context: &'a Context,
    pub extensions: &'a Extensions,
}

impl<'a> TagCall<'a> {
    /// Typed access to a configured extension
    pub fn extension<T: Any + Send + Sync>(&self, name: &str) -> Option<&'a T> {
        self.extensions.get(name)?.downcast_ref::<T>()
    }
}

/// Built-in tags plus registered custom tags
#[derive(Clone)]
pub(crate) struct TagRegistry {
    defs: HashMap<String, TagDef>,
    custom: HashMap<String, Arc<dyn CustomTag>>,
}

const BUILTIN: &[(&str, Tag, bool)] = &[
    ("for", Tag::For, true),
    ("if", Tag::If, true),
    ("else", Tag::Else, false),
    ("elseif", Tag::Else, false),
    ("elif", Tag::Else, false),
    ("set", Tag::Set, false),
    ("filter", Tag::Filter, true),
    ("macro", Tag::Macro, true),
    ("include", Tag::Include, false),
    ("import", Tag::Import, false),
    ("block", Tag::Block, true),
    ("extends", Tag::Extends, false),
    ("parent", Tag::Parent, false),
    ("raw", Tag::Raw, true),
    ("autoescape", Tag::Autoescape, true),
];

impl TagRegistry {
    pub fn builtin() -> Self {
        let defs = BUILTIN
            .iter()
            .map(|(name, tag, ends)| {
                (
                    (*name).to_string(),
                    TagDef {
                        tag: tag.clone(),
                        ends: *ends,
                    },
                )
            })
            .collect();
        Self {
            defs,
            custom: HashMap::new(),
        }
    }

    /// Register a custom tag, replacing any tag of the same name
    pub fn register(&mut self, name: &str, tag: Arc<dyn CustomTag>) {
        self.defs.insert(
            name.to_string(),
            TagDef {
                tag: Tag::Custom(name.to_string()),
                ends: tag.ends(),
            },
        );
        self.custom.insert(name.to_string(), tag);
    }

    pub fn get(&self, name: &str) -> Option<&TagDef> {
        self.defs.get(name)
    }

    pub fn custom(&self, name: &str) -> Option<Arc<dyn CustomTag>> {
        self.custom.get(name).cloned()
    }
}

impl fmt::Debug for TagRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.defs.keys().collect();
        names.sort();
        f.debug_struct("TagRegistry").field("tags", &names).finish()
    }
}
