//! Compiled node tree
//!
//! A template compiles to a [`Program`]: a node list plus the named block
//! fragments it renders through. Fragments are shared, so a child template
//! extending a parent reuses the parent's nodes without copying them.

use std::collections::HashMap;
use std::sync::Arc;

use super::expr::{Expr, FilterCall};
use crate::template::filters::EscapeKind;
use crate::template::tags::CustomTag;

pub(crate) type Fragment = Arc<[Node]>;

/// Block name → compiled body
pub(crate) type BlockMap = HashMap<String, Fragment>;

#[derive(Debug, Clone)]
pub(crate) enum Node {
    Text(String),
    Output(Output),
    If(IfNode),
    For(ForNode),
    Set { name: String, value: Expr },
    Filter { filter: Option<FilterCall>, body: Fragment },
    Macro(Arc<MacroDef>),
    Include(IncludeNode),
    Import { template: Expr, alias: String },
    /// Rendered from the effective block map at render time
    Block(String),
    /// Shared nodes rendered in place (`{% parent %}`, inherited layouts)
    Fragment(Fragment),
    Group(Vec<Node>),
    Custom(CustomNode),
    /// Branch separator, only present until `if`/`for` split their bodies
    Else { condition: Option<Expr>, line: usize },
}

/// `{{ expr|filters }}`
#[derive(Debug, Clone)]
pub(crate) struct Output {
    pub expr: Expr,
    pub filters: Vec<FilterCall>,
    /// Automatic escape applied after the filters
    pub escape: Option<EscapeKind>,
}

#[derive(Debug, Clone)]
pub(crate) struct IfNode {
    pub branches: Vec<(Expr, Vec<Node>)>,
    pub otherwise: Vec<Node>,
}

#[derive(Debug, Clone)]
pub(crate) struct ForNode {
    pub key_var: Option<String>,
    pub value_var: String,
    pub iterable: Expr,
    pub body: Vec<Node>,
    pub empty: Vec<Node>,
}

#[derive(Debug)]
pub(crate) struct MacroDef {
    pub name: String,
    pub params: Vec<String>,
    pub body: Fragment,
}

#[derive(Debug, Clone)]
pub(crate) struct IncludeNode {
    pub template: Expr,
    pub ignore_missing: bool,
    pub with: Option<Expr>,
    pub only: bool,
}

#[derive(Clone)]
pub(crate) struct CustomNode {
    pub name: String,
    pub tag: Arc<dyn CustomTag>,
    pub args: Vec<Expr>,
    pub body: Option<Fragment>,
}

impl std::fmt::Debug for CustomNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CustomNode")
            .field("name", &self.name)
            .field("args", &self.args)
            .field("body", &self.body)
            .finish_non_exhaustive()
    }
}

/// A fully resolved template body
#[derive(Debug, Clone)]
pub(crate) struct Program {
    pub nodes: Fragment,
    pub blocks: BlockMap,
}
