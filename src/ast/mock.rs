//! Minimal in-memory host used by the unit tests of this crate.

use super::host::{DerivedOrigin, HostError, HostTree, HostValue, LineColumnSpan};
use super::span::{Span, column_of, line_of};

#[derive(Debug, Clone)]
struct MockNode {
    ty: String,
    span: Option<Span>,
    parent: Option<usize>,
    children: Vec<usize>,
    label: Option<String>,
    external: bool,
    visible: Option<bool>,
}

#[derive(Debug, Clone)]
struct Derived {
    owner: usize,
    name: String,
    args: Vec<HostValue<usize>>,
    node: usize,
}

/// Nodes are plain indices; the root is always `0`.
#[derive(Debug, Clone)]
pub(crate) struct MockTree {
    nodes: Vec<MockNode>,
    derived: Vec<Derived>,
    tal_root: Option<String>,
}

impl MockTree {
    pub(crate) fn new(ty: &str, span: Option<Span>) -> Self {
        MockTree {
            nodes: vec![MockNode::new(ty, span, None)],
            derived: Vec::new(),
            tal_root: None,
        }
    }

    /// Appends a structural child to `parent`.
    pub(crate) fn add(&mut self, parent: usize, ty: &str, span: Option<Span>) -> usize {
        let id = self.nodes.len();
        self.nodes.push(MockNode::new(ty, span, Some(parent)));
        self.nodes[parent].children.push(id);
        id
    }

    /// Adds a node produced by calling `name(args)` on `owner`. The node points
    /// at `owner` as its parent but is not one of its structural children.
    pub(crate) fn add_derived(
        &mut self,
        owner: usize,
        name: &str,
        args: Vec<HostValue<usize>>,
        ty: &str,
        span: Option<Span>,
    ) -> usize {
        let id = self.nodes.len();
        self.nodes.push(MockNode::new(ty, span, Some(owner)));
        self.derived.push(Derived { owner, name: name.to_string(), args, node: id });
        id
    }

    /// Lists an existing node as another child of `parent` without touching
    /// its parent pointer.
    pub(crate) fn link(&mut self, parent: usize, child: usize) {
        self.nodes[parent].children.push(child);
    }

    pub(crate) fn set_parent(&mut self, node: usize, parent: Option<usize>) {
        self.nodes[node].parent = parent;
    }

    pub(crate) fn set_label(&mut self, node: usize, label: &str) {
        self.nodes[node].label = Some(label.to_string());
    }

    pub(crate) fn set_external(&mut self, node: usize) {
        self.nodes[node].external = true;
    }

    pub(crate) fn set_visible(&mut self, node: usize, visible: bool) {
        self.nodes[node].visible = Some(visible);
    }

    pub(crate) fn set_tal_root(&mut self, ty: &str) {
        self.tal_root = Some(ty.to_string());
    }

    fn get(&self, node: usize) -> Result<&MockNode, HostError> {
        self.nodes.get(node).ok_or_else(|| HostError::new(format!("no node #{node}")))
    }
}

impl MockNode {
    fn new(ty: &str, span: Option<Span>, parent: Option<usize>) -> Self {
        MockNode {
            ty: ty.to_string(),
            span,
            parent,
            children: Vec::new(),
            label: None,
            external: false,
            visible: None,
        }
    }
}

impl HostTree for MockTree {
    type Node = usize;

    fn num_children(&self, node: &usize) -> Result<usize, HostError> {
        Ok(self.get(*node)?.children.len())
    }

    fn child(&self, node: &usize, index: usize) -> Result<usize, HostError> {
        self.get(*node)?
            .children
            .get(index)
            .copied()
            .ok_or_else(|| HostError::new(format!("node #{node} has no child {index}")))
    }

    fn parent(&self, node: &usize) -> Result<Option<usize>, HostError> {
        Ok(self.get(*node)?.parent)
    }

    fn type_name<'a>(&'a self, node: &'a usize) -> &'a str {
        self.nodes.get(*node).map_or("?", |n| n.ty.as_str())
    }

    fn packed_span(&self, node: &usize) -> Option<(u32, u32)> {
        self.nodes.get(*node)?.span.map(|s| (s.start, s.end))
    }

    fn line_column_span(&self, node: &usize) -> Option<LineColumnSpan> {
        let span = self.nodes.get(*node)?.span?;
        Some(LineColumnSpan {
            start_line: line_of(span.start),
            start_column: column_of(span.start),
            end_line: line_of(span.end),
            end_column: column_of(span.end),
        })
    }

    fn label(&self, node: &usize) -> Option<String> {
        self.nodes.get(*node)?.label.clone()
    }

    fn visible_in_node_list(&self, node: &usize) -> Option<bool> {
        self.nodes.get(*node)?.visible
    }

    fn is_external(&self, node: &usize) -> bool {
        self.nodes.get(*node).is_some_and(|n| n.external)
    }

    fn locator_tal_root(&self) -> Option<&str> {
        self.tal_root.as_deref()
    }

    fn derived_origin(&self, parent: &usize, child: &usize) -> Result<Option<DerivedOrigin<usize>>, HostError> {
        Ok(self
            .derived
            .iter()
            .find(|d| d.owner == *parent && d.node == *child)
            .map(|d| DerivedOrigin::new(d.name.clone(), d.args.clone())))
    }

    fn invoke_derived(&self, node: &usize, name: &str, args: &[HostValue<usize>]) -> Result<Option<usize>, HostError> {
        Ok(self
            .derived
            .iter()
            .find(|d| d.owner == *node && d.name == name && d.args == args)
            .map(|d| d.node))
    }
}
