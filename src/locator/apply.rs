//! Locator decoder

use tracing::{debug, warn};

use super::create::create_locator;
use super::matcher::{TalTarget, best_matching_node};
use super::model::{FnStep, Locator, NodeLocatorStep, PropertyArg};
use crate::ast::{Ast, HostTree, HostValue, NodeId, Span};
use crate::error::Result;

/// A locator resolved against the current tree.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedLocator {
    pub node: NodeId,
    pub span: Span,
    /// Canonical locator for `node` in the current tree.
    pub locator: Locator,
}

/// Resolves `locator` against the current tree and re-encodes the result.
///
/// Returns `Ok(None)` as soon as a step matches nothing.
pub fn apply_locator<H: HostTree>(ast: &mut Ast<'_, H>, locator: &Locator) -> Result<Option<ResolvedLocator>> {
    let Some(node) = resolve_steps(ast, &locator.steps)? else {
        debug!("No node matches {}", locator);
        return Ok(None);
    };
    let span = ast.recovered_span(node)?;
    let locator = match create_locator(ast, node)? {
        Some(fresh) => fresh,
        None => {
            warn!("Resolved {} but could not re-encode it, keeping the old locator", ast.type_name(node));
            locator.clone()
        }
    };
    Ok(Some(ResolvedLocator { node, span, locator }))
}

/// Applies `steps` from the root without re-encoding.
pub fn resolve_steps<H: HostTree>(ast: &mut Ast<'_, H>, steps: &[NodeLocatorStep]) -> Result<Option<NodeId>> {
    let mut current = ast.root();
    for step in steps {
        let next = match step {
            NodeLocatorStep::Child(index) => {
                if *index < ast.num_children(current)? {
                    Some(ast.nth_child(current, *index)?)
                } else {
                    None
                }
            }
            NodeLocatorStep::Tal(tal) => {
                let target = TalTarget::from_step(ast, tal);
                best_matching_node(ast, current, &target, false, None)?.node()
            }
            NodeLocatorStep::Nta(call) => invoke(ast, current, call)?,
        };
        match next {
            Some(node) => current = node,
            None => {
                debug!("Step {} matched nothing below {}", step, ast.type_name(current));
                return Ok(None);
            }
        }
    }
    Ok(Some(current))
}

fn invoke<H: HostTree>(ast: &mut Ast<'_, H>, node: NodeId, call: &FnStep) -> Result<Option<NodeId>> {
    let mut args = Vec::with_capacity(call.args.len());
    for arg in &call.args {
        let Some(value) = decode_arg(ast, arg)? else {
            return Ok(None);
        };
        args.push(value);
    }
    let host = ast.host();
    let result = host.invoke_derived(ast.host_node(node), &call.name, &args)?;
    Ok(result.map(|value| ast.node(value)))
}

fn decode_arg<H: HostTree>(ast: &mut Ast<'_, H>, arg: &PropertyArg) -> Result<Option<HostValue<H::Node>>> {
    Ok(Some(match arg {
        PropertyArg::String(s) => HostValue::Str(s.clone()),
        PropertyArg::Integer(i) => HostValue::Int(*i),
        PropertyArg::Bool(b) => HostValue::Bool(*b),
        PropertyArg::OutputStream(name) => HostValue::OutputStream(name.clone()),
        PropertyArg::Any => HostValue::Any,
        PropertyArg::NodeLocator(None) => HostValue::Node(None),
        PropertyArg::NodeLocator(Some(locator)) => match resolve_steps(ast, &locator.steps)? {
            Some(id) => HostValue::Node(Some(ast.host_node(id).clone())),
            None => return Ok(None),
        },
        PropertyArg::Collection(items) => {
            let mut values = Vec::with_capacity(items.len());
            for item in items {
                match decode_arg(ast, item)? {
                    Some(value) => values.push(value),
                    None => return Ok(None),
                }
            }
            HostValue::Collection(values)
        }
    }))
}
