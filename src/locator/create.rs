//! Locator encoder
//!
//! Walks from a node up to the root, classifying every parent-to-child hop,
//! then hands the root-to-node hop list to [`minimize`](super::minimize) to
//! drop the hops that are not needed to find the node again.

use tracing::{debug, warn};

use super::minimize::minimize;
use super::model::{FnStep, Locator, PropertyArg, TalStep};
use crate::ast::{Ast, DerivedOrigin, HostTree, HostValue, IdentificationStyle, NodeId};
use crate::error::Result;

/// One parent-to-child hop on the way from the root to a node.
#[derive(Debug, Clone, PartialEq)]
pub(super) enum Hop {
    /// `node` is the `index`-th structural child of the previous node. `tal`
    /// is set when the node can be found by type and span among its siblings.
    Structural { node: NodeId, index: usize, tal: bool },
    /// `node` is produced by a derived-value method on the previous node.
    Nta { node: NodeId, step: FnStep },
}

impl Hop {
    pub(super) fn node(&self) -> NodeId {
        match self {
            Hop::Structural { node, .. } | Hop::Nta { node, .. } => *node,
        }
    }

    pub(super) fn is_tal(&self) -> bool {
        matches!(self, Hop::Structural { tal: true, .. })
    }
}

/// Builds a locator for `id`.
///
/// Returns `Ok(None)` when some hop cannot be classified, which means the host
/// reports a parent that neither lists the node as a child nor derives it.
pub fn create_locator<H: HostTree>(ast: &mut Ast<'_, H>, id: NodeId) -> Result<Option<Locator>> {
    let Some(hops) = collect_hops(ast, id)? else {
        return Ok(None);
    };
    let result = describe(ast, id, hops.len() as u32)?;
    let steps = minimize(ast, &hops)?;
    debug!("Created locator with {} steps ({} hops) for {}", steps.len(), hops.len(), result);
    Ok(Some(Locator { result, steps }))
}

/// TAL fingerprint of `id`, expected `depth` hops below the search start.
pub(super) fn describe<H: HostTree>(ast: &mut Ast<'_, H>, id: NodeId, depth: u32) -> Result<TalStep> {
    let span = ast.recovered_span(id)?;
    let label = match ast.info().identify {
        IdentificationStyle::Label => ast.label(id),
        IdentificationStyle::Type => None,
    };
    Ok(TalStep {
        type_name: ast.type_name(id).to_string(),
        label,
        start: span.start,
        end: span.end,
        depth,
        external: ast.is_external(id),
    })
}

/// Hops from the root down to `id`, or `None` if the path is broken.
fn collect_hops<H: HostTree>(ast: &mut Ast<'_, H>, id: NodeId) -> Result<Option<Vec<Hop>>> {
    let mut hops = Vec::new();
    let mut current = id;

    while let Some(parent) = ast.parent(current)? {
        if let Some(origin) = derived_origin(ast, parent, current)? {
            let Some(step) = encode_call(ast, origin)? else {
                return Ok(None);
            };
            hops.push(Hop::Nta { node: current, step });
            current = parent;
            continue;
        }

        if ast.num_children(parent)? == 0 {
            // A childless parent only anchors a derived node owned by the
            // grandparent.
            let origin = match ast.parent(parent)? {
                Some(grandparent) => derived_origin(ast, grandparent, current)?.map(|o| (grandparent, o)),
                None => None,
            };
            let Some((grandparent, origin)) = origin else {
                warn!(
                    "{} has a childless parent {} that does not derive it",
                    ast.type_name(current),
                    ast.type_name(parent)
                );
                return Ok(None);
            };
            let Some(step) = encode_call(ast, origin)? else {
                return Ok(None);
            };
            hops.push(Hop::Nta { node: current, step });
            current = grandparent;
            continue;
        }

        let Some(index) = child_index(ast, parent, current)? else {
            warn!(
                "{} is neither a child of nor derived by its parent {}",
                ast.type_name(current),
                ast.type_name(parent)
            );
            return Ok(None);
        };
        let tal = is_tal_candidate(ast, parent, current)?;
        hops.push(Hop::Structural { node: current, index, tal });
        current = parent;
    }

    if current != ast.root() {
        debug!("{} is not below the root of this tree", ast.type_name(id));
        return Ok(None);
    }
    hops.reverse();
    Ok(Some(hops))
}

fn derived_origin<H: HostTree>(
    ast: &Ast<'_, H>,
    parent: NodeId,
    child: NodeId,
) -> Result<Option<DerivedOrigin<H::Node>>> {
    let host = ast.host();
    Ok(host.derived_origin(ast.host_node(parent), ast.host_node(child))?)
}

fn child_index<H: HostTree>(ast: &mut Ast<'_, H>, parent: NodeId, child: NodeId) -> Result<Option<usize>> {
    for index in 0..ast.num_children(parent)? {
        if ast.nth_child(parent, index)? == child {
            return Ok(Some(index));
        }
    }
    Ok(None)
}

/// A node can be found from its parent by type and span if the span is
/// meaningful and no sibling shares both.
fn is_tal_candidate<H: HostTree>(ast: &mut Ast<'_, H>, parent: NodeId, node: NodeId) -> Result<bool> {
    let span = ast.recovered_span(node)?;
    if !span.is_meaningful() || ast.is_external(node) {
        return Ok(false);
    }
    let key = ast.key(node);
    for sibling in ast.children(parent)? {
        if sibling != node && ast.key(sibling) == key && ast.recovered_span(sibling)? == span {
            return Ok(false);
        }
    }
    Ok(true)
}

fn encode_call<H: HostTree>(ast: &mut Ast<'_, H>, origin: DerivedOrigin<H::Node>) -> Result<Option<FnStep>> {
    let mut args = Vec::with_capacity(origin.args.len());
    for value in origin.args {
        let Some(arg) = encode_arg(ast, value)? else {
            debug!("Could not encode an argument of {}", origin.name);
            return Ok(None);
        };
        args.push(arg);
    }
    Ok(Some(FnStep { name: origin.name, args }))
}

fn encode_arg<H: HostTree>(ast: &mut Ast<'_, H>, value: HostValue<H::Node>) -> Result<Option<PropertyArg>> {
    Ok(Some(match value {
        HostValue::Str(s) => PropertyArg::String(s),
        HostValue::Int(i) => PropertyArg::Integer(i),
        HostValue::Bool(b) => PropertyArg::Bool(b),
        HostValue::OutputStream(name) => PropertyArg::OutputStream(name),
        HostValue::Any => PropertyArg::Any,
        HostValue::Node(None) => PropertyArg::NodeLocator(None),
        HostValue::Node(Some(node)) => {
            let id = ast.node(node);
            match create_locator(ast, id)? {
                Some(locator) => PropertyArg::NodeLocator(Some(locator)),
                None => return Ok(None),
            }
        }
        HostValue::Collection(items) => {
            let mut encoded = Vec::with_capacity(items.len());
            for item in items {
                match encode_arg(ast, item)? {
                    Some(arg) => encoded.push(arg),
                    None => return Ok(None),
                }
            }
            PropertyArg::Collection(encoded)
        }
    }))
}
