//! Arena-backed node facade
//!
//! Every host node touched during an operation is interned into the arena of
//! its snapshot and addressed by a [`NodeId`]. The arena slot caches the
//! child array, the parent link and both spans, so repeated walks over the
//! same region of the tree never go back to the host.
//!
//! A reparse invalidates every id at once: call [`Ast::reset`] or build a new
//! `Ast`. Locators are the only references that survive.

use rustc_hash::FxHashMap;
use tracing::{trace, warn};

use super::host::{HostHook, HostTree};
use super::info::{AstInfo, IdentificationStyle, NodeKey, PositionConvention, TypeTag};
use super::recovery::RecoveryStrategy;
use super::span::Span;
use crate::error::{LocatorError, Result};

/// Index of a node within one snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParentLink {
    Unresolved,
    Root,
    Node(NodeId),
}

#[derive(Debug)]
struct NodeSlot<N> {
    host: N,
    // Sized on first access, filled one slot at a time.
    children: Option<Box<[Option<NodeId>]>>,
    parent: ParentLink,
    raw_span: Option<Span>,
    recovered: Option<(RecoveryStrategy, Span)>,
    tag: Option<TypeTag>,
    key: Option<NodeKey>,
}

impl<N> NodeSlot<N> {
    fn new(host: N) -> Self {
        NodeSlot {
            host,
            children: None,
            parent: ParentLink::Unresolved,
            raw_span: None,
            recovered: None,
            tag: None,
            key: None,
        }
    }
}

/// One parsed snapshot of a host tree.
///
/// All caches are filled lazily through `&mut self`, so operations on one
/// snapshot are serialized by construction. Separate snapshots share nothing.
pub struct Ast<'h, H: HostTree> {
    host: &'h H,
    info: AstInfo,
    slots: Vec<NodeSlot<H::Node>>,
    interned: FxHashMap<H::Node, NodeId>,
    root: NodeId,
}

impl<'h, H: HostTree> Ast<'h, H> {
    pub fn new(host: &'h H, root: H::Node, info: AstInfo) -> Self {
        let mut ast = Ast {
            host,
            info,
            slots: Vec::new(),
            interned: FxHashMap::default(),
            root: NodeId(0),
        };
        ast.root = ast.node(root);
        ast.load_tal_root();
        ast
    }

    /// Discards every node of the previous parse and starts over from `root`.
    pub fn reset(&mut self, host: &'h H, root: H::Node) {
        self.host = host;
        self.slots.clear();
        self.interned.clear();
        self.info.reset_caches();
        self.root = self.node(root);
        self.load_tal_root();
    }

    fn load_tal_root(&mut self) {
        let host = self.host;
        let tag = host.locator_tal_root().map(|name| self.info.types.intern(name));
        self.info.tal_root = tag;
    }

    pub fn host(&self) -> &'h H {
        self.host
    }

    pub fn info(&self) -> &AstInfo {
        &self.info
    }

    pub fn info_mut(&mut self) -> &mut AstInfo {
        &mut self.info
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of nodes interned so far.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Interns a host node, returning its id in this snapshot.
    pub fn node(&mut self, host_node: H::Node) -> NodeId {
        if let Some(id) = self.interned.get(&host_node) {
            return *id;
        }
        let id = NodeId(self.slots.len() as u32);
        self.interned.insert(host_node.clone(), id);
        self.slots.push(NodeSlot::new(host_node));
        id
    }

    /// Id of a host node that has already been interned.
    pub fn lookup(&self, host_node: &H::Node) -> Option<NodeId> {
        self.interned.get(host_node).copied()
    }

    pub fn host_node(&self, id: NodeId) -> &H::Node {
        &self.slots[id.index()].host
    }

    /// Number of structural children. Asks the host only once.
    pub fn num_children(&mut self, id: NodeId) -> Result<usize> {
        if let Some(children) = &self.slots[id.index()].children {
            return Ok(children.len());
        }
        let host = self.host;
        let count = host.num_children(&self.slots[id.index()].host)?;
        self.slots[id.index()].children = Some(vec![None; count].into_boxed_slice());
        Ok(count)
    }

    pub fn nth_child(&mut self, id: NodeId, index: usize) -> Result<NodeId> {
        let len = self.num_children(id)?;
        if index >= len {
            return Err(LocatorError::ChildOutOfRange { index, len });
        }
        if let Some(Some(child)) = self.slots[id.index()].children.as_ref().map(|c| c[index]) {
            return Ok(child);
        }
        let host = self.host;
        let child_host = host.child(&self.slots[id.index()].host, index)?;
        let child = self.node(child_host);
        if let Some(children) = self.slots[id.index()].children.as_mut() {
            children[index] = Some(child);
        }
        Ok(child)
    }

    pub fn children(&mut self, id: NodeId) -> Result<Vec<NodeId>> {
        let count = self.num_children(id)?;
        (0..count).map(|i| self.nth_child(id, i)).collect()
    }

    /// Parent of `id`, or `None` at the root.
    ///
    /// Fails with [`LocatorError::AstLoop`] if linking the host parent would
    /// close a cycle in the parent chain.
    pub fn parent(&mut self, id: NodeId) -> Result<Option<NodeId>> {
        match self.slots[id.index()].parent {
            ParentLink::Root => return Ok(None),
            ParentLink::Node(parent) => return Ok(Some(parent)),
            ParentLink::Unresolved => {}
        }
        let host = self.host;
        let Some(parent_host) = host.parent(&self.slots[id.index()].host)? else {
            self.slots[id.index()].parent = ParentLink::Root;
            return Ok(None);
        };
        let parent = self.node(parent_host);
        if self.closes_loop(id, parent) {
            return Err(self.loop_at(id));
        }
        self.slots[id.index()].parent = ParentLink::Node(parent);
        Ok(Some(parent))
    }

    /// True if `parent` is `child` or already reaches `child` through resolved
    /// parent links. The walk is bounded by the arena size.
    fn closes_loop(&self, child: NodeId, parent: NodeId) -> bool {
        let mut current = parent;
        for _ in 0..=self.slots.len() {
            if current == child {
                return true;
            }
            match self.slots[current.index()].parent {
                ParentLink::Node(next) => current = next,
                ParentLink::Root | ParentLink::Unresolved => return false,
            }
        }
        true
    }

    /// Fails once a downward walk has visited more nodes than the arena
    /// holds. Distinct nodes each take a slot, so this only happens when the
    /// host hands back a node the walk has already seen.
    pub(crate) fn bound_walk(&self, visited: usize, at: NodeId) -> Result<()> {
        if visited > self.slots.len() { Err(self.loop_at(at)) } else { Ok(()) }
    }

    fn loop_at(&self, id: NodeId) -> LocatorError {
        let type_name = self.type_name(id).to_string();
        warn!("Walk through a {} node loops back onto itself", type_name);
        LocatorError::AstLoop { type_name }
    }

    pub fn type_name(&self, id: NodeId) -> &str {
        self.host.type_name(&self.slots[id.index()].host)
    }

    pub fn type_tag(&mut self, id: NodeId) -> TypeTag {
        if let Some(tag) = self.slots[id.index()].tag {
            return tag;
        }
        let host = self.host;
        let name = host.type_name(&self.slots[id.index()].host);
        let tag = self.info.types.intern(name);
        self.slots[id.index()].tag = Some(tag);
        tag
    }

    /// Key compared by the TAL matcher.
    pub fn key(&mut self, id: NodeId) -> NodeKey {
        if let Some(key) = &self.slots[id.index()].key {
            return key.clone();
        }
        let tag = self.type_tag(id);
        let key = if self.info.identify == IdentificationStyle::Label {
            self.label(id).map_or(NodeKey::Type(tag), NodeKey::Label)
        } else {
            NodeKey::Type(tag)
        };
        self.slots[id.index()].key = Some(key.clone());
        key
    }

    pub fn label(&mut self, id: NodeId) -> Option<String> {
        let tag = self.type_tag(id);
        let host = self.host;
        if !self.info.hook_enabled(host, tag, HostHook::Label) {
            return None;
        }
        host.label(&self.slots[id.index()].host)
    }

    pub fn is_external(&mut self, id: NodeId) -> bool {
        let tag = self.type_tag(id);
        let host = self.host;
        self.info.hook_enabled(host, tag, HostHook::External) && host.is_external(&self.slots[id.index()].host)
    }

    pub fn is_list(&self, id: NodeId) -> bool {
        self.type_name(id) == "List"
    }

    pub fn is_opt(&self, id: NodeId) -> bool {
        self.type_name(id) == "Opt"
    }

    /// Whether the node belongs in user-facing node listings. List and Opt
    /// wrappers are hidden unless the host says otherwise.
    pub fn visible_in_node_list(&mut self, id: NodeId) -> bool {
        let tag = self.type_tag(id);
        let host = self.host;
        if self.info.hook_enabled(host, tag, HostHook::NodeListVisibility) {
            if let Some(visible) = host.visible_in_node_list(&self.slots[id.index()].host) {
                return visible;
            }
        }
        !(self.is_list(id) || self.is_opt(id))
    }

    /// Span as reported by the host, `Span::NONE` if absent.
    pub fn raw_span(&mut self, id: NodeId) -> Span {
        if let Some(span) = self.slots[id.index()].raw_span {
            return span;
        }
        let host = self.host;
        let node = &self.slots[id.index()].host;
        let span = match self.info.positions {
            PositionConvention::Packed => host.packed_span(node).map(|(start, end)| Span::new(start, end)),
            PositionConvention::LineColumn => host.line_column_span(node).map(Span::from),
        }
        .unwrap_or(Span::NONE);
        trace!("Raw span of {} is {}", self.type_name(id), span);
        self.slots[id.index()].raw_span = Some(span);
        span
    }

    pub(super) fn cached_recovery(&self, id: NodeId) -> Option<(RecoveryStrategy, Span)> {
        self.slots[id.index()].recovered
    }

    pub(super) fn store_recovery(&mut self, id: NodeId, strategy: RecoveryStrategy, span: Span) {
        self.slots[id.index()].recovered = Some((strategy, span));
    }
}
