//! The contract a host tree must satisfy
//!
//! The locator never sees a concrete AST type. Each parser or compiler that
//! wants stable node references implements [`HostTree`] once, and everything
//! above this module works in terms of the trait.
//!
//! # Required methods
//! - `num_children` / `child` / `parent`: the structural tree
//! - `type_name`: the simple runtime type of a node
//!
//! # Positions
//! Hosts expose positions through one of two conventions, selected per
//! snapshot by [`PositionConvention`](super::PositionConvention):
//! - `packed_span`: start and end already packed as `line << 12 | column`
//! - `line_column_span`: separate start/end line and column fields
//!
//! # Derived children
//! Nodes that are not structural children but the cached result of a
//! derived-value method on their parent (non-terminal attributes) are
//! described through `derived_origin` and re-created with `invoke_derived`.

use std::fmt;
use std::hash::Hash;

use thiserror::Error;

use super::span::Span;

/// Failure reported by a host adapter while answering a query.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct HostError {
    message: String,
}

impl HostError {
    pub fn new(message: impl Into<String>) -> Self {
        HostError { message: message.into() }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Start and end of a node as separate line and column fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct LineColumnSpan {
    pub start_line: u32,
    pub start_column: u32,
    pub end_line: u32,
    pub end_column: u32,
}

impl From<LineColumnSpan> for Span {
    fn from(lc: LineColumnSpan) -> Self {
        Span::from_line_columns(lc.start_line, lc.start_column, lc.end_line, lc.end_column)
    }
}

/// Optional per-type hooks whose availability is cached per snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostHook {
    /// `HostTree::label`
    Label,
    /// `HostTree::visible_in_node_list`
    NodeListVisibility,
    /// `HostTree::is_external`
    External,
}

/// Argument or result value of a derived-value method.
#[derive(Debug, Clone, PartialEq)]
pub enum HostValue<N> {
    Str(String),
    Int(i64),
    Bool(bool),
    Collection(Vec<HostValue<N>>),
    /// An output stream argument; only its name travels.
    OutputStream(String),
    /// A node-typed argument, possibly null.
    Node(Option<N>),
    /// A value the locator cannot describe.
    Any,
}

/// Where a derived child came from: which method on the parent produced it,
/// and with which arguments. Empty `args` means a zero-argument method.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedOrigin<N> {
    pub name: String,
    pub args: Vec<HostValue<N>>,
}

impl<N> DerivedOrigin<N> {
    pub fn new(name: impl Into<String>, args: Vec<HostValue<N>>) -> Self {
        DerivedOrigin { name: name.into(), args }
    }
}

/// Adapter over an externally built AST.
///
/// `Node` is a cheap handle with identity semantics: two handles are equal iff
/// they denote the same host node within one parse.
pub trait HostTree {
    type Node: Clone + Eq + Hash + fmt::Debug;

    /// Number of structural children.
    fn num_children(&self, node: &Self::Node) -> Result<usize, HostError>;

    /// The `index`-th structural child.
    fn child(&self, node: &Self::Node, index: usize) -> Result<Self::Node, HostError>;

    /// The parent, or `None` at the root.
    fn parent(&self, node: &Self::Node) -> Result<Option<Self::Node>, HostError>;

    /// Simple runtime type name, e.g. `"CallExpr"`.
    fn type_name<'a>(&'a self, node: &'a Self::Node) -> &'a str;

    /// Start and end as packed integers.
    fn packed_span(&self, _node: &Self::Node) -> Option<(u32, u32)> {
        None
    }

    /// Start and end as separate line and column fields.
    fn line_column_span(&self, _node: &Self::Node) -> Option<LineColumnSpan> {
        None
    }

    /// Custom label used instead of the type name for identification.
    fn label(&self, _node: &Self::Node) -> Option<String> {
        None
    }

    /// Overrides whether the node shows up in node listings.
    fn visible_in_node_list(&self, _node: &Self::Node) -> Option<bool> {
        None
    }

    /// True if the node's position refers to a different file than the root.
    fn is_external(&self, _node: &Self::Node) -> bool {
        false
    }

    /// Type of the node below which top-level TAL searches start.
    fn locator_tal_root(&self) -> Option<&str> {
        None
    }

    /// Whether nodes of `type_name` implement `hook`. Hosts with expensive
    /// hooks narrow this so the locator skips calling them.
    fn supports(&self, _type_name: &str, _hook: HostHook) -> bool {
        true
    }

    /// If `child` is the cached result of a derived-value method on `parent`,
    /// describes that method call.
    fn derived_origin(
        &self,
        _parent: &Self::Node,
        _child: &Self::Node,
    ) -> Result<Option<DerivedOrigin<Self::Node>>, HostError> {
        Ok(None)
    }

    /// Evaluates the derived-value method `name` on `node`.
    ///
    /// A method the node does not have, or arguments it does not accept, is
    /// `Ok(None)`. `Err` is reserved for failures of the host itself.
    fn invoke_derived(
        &self,
        _node: &Self::Node,
        _name: &str,
        _args: &[HostValue<Self::Node>],
    ) -> Result<Option<Self::Node>, HostError> {
        Ok(None)
    }
}
