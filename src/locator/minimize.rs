//! Locator minimization
//!
//! Hops are grouped into segments: maximal runs of structural hops between
//! derived hops. Within each segment two passes drop hops:
//!
//! 1. Root collapsing. The deepest TAL hop that is uniquely found from the
//!    segment's anchor replaces every hop before it.
//! 2. Run collapsing. Inside a run of three or more TAL hops, interior hops
//!    are dropped whenever the next kept hop is uniquely found from the
//!    previous one. The first and last hop of a run are always kept.
//!
//! A hop is only dropped after a search from the would-be anchor returns the
//! exact node, so the result always resolves back to the same node.

use tracing::debug;

use super::create::{Hop, describe};
use super::matcher::{TalTarget, unique_match};
use super::model::NodeLocatorStep;
use crate::ast::{Ast, HostTree, NodeId};
use crate::error::Result;

pub(super) fn minimize<H: HostTree>(ast: &mut Ast<'_, H>, hops: &[Hop]) -> Result<Vec<NodeLocatorStep>> {
    let mut keep = vec![true; hops.len()];
    let mut start = 0;

    while start < hops.len() {
        let end = start
            + hops[start..]
                .iter()
                .take_while(|hop| matches!(hop, Hop::Structural { .. }))
                .count();
        let first = if start == 0 { below_tal_root(ast, hops, end) } else { start };
        if first < end {
            let first = collapse_root(ast, hops, first, end, &mut keep)?;
            collapse_runs(ast, hops, first, end, &mut keep)?;
        }
        // `end` is a derived hop or past the end.
        start = end + 1;
    }

    emit(ast, hops, &keep)
}

/// Node reached after `position` hops; position 0 is the root.
fn node_at<H: HostTree>(ast: &Ast<'_, H>, hops: &[Hop], position: usize) -> NodeId {
    match position {
        0 => ast.root(),
        p => hops[p - 1].node(),
    }
}

/// First hop of the top-level segment that may be collapsed. If the host
/// names a TAL root type, hops down to the first node of that type are kept.
fn below_tal_root<H: HostTree>(ast: &mut Ast<'_, H>, hops: &[Hop], end: usize) -> usize {
    let Some(tag) = ast.info().tal_root() else {
        return 0;
    };
    (0..end)
        .find(|&k| ast.type_tag(hops[k].node()) == tag)
        .map_or(0, |k| k + 1)
}

fn found_from<H: HostTree>(ast: &mut Ast<'_, H>, anchor: NodeId, node: NodeId, depth: usize) -> Result<bool> {
    let target = TalTarget::from_node(ast, node, depth as u32)?;
    Ok(unique_match(ast, anchor, &target, None)? == Some(node))
}

/// Drops the hops in `[start, end)` ahead of the deepest TAL hop that is
/// found from the segment anchor. Returns the first kept hop.
fn collapse_root<H: HostTree>(
    ast: &mut Ast<'_, H>,
    hops: &[Hop],
    start: usize,
    end: usize,
    keep: &mut [bool],
) -> Result<usize> {
    let anchor = node_at(ast, hops, start);
    for j in (start + 1..end).rev() {
        if hops[j].is_tal() && found_from(ast, anchor, hops[j].node(), j + 1 - start)? {
            debug!("Root collapse drops {} hops ahead of {}", j - start, ast.type_name(hops[j].node()));
            keep[start..j].fill(false);
            return Ok(j);
        }
    }
    Ok(start)
}

fn collapse_runs<H: HostTree>(
    ast: &mut Ast<'_, H>,
    hops: &[Hop],
    start: usize,
    end: usize,
    keep: &mut [bool],
) -> Result<()> {
    let mut a = start;
    while a < end {
        if !hops[a].is_tal() {
            a += 1;
            continue;
        }
        let mut b = a;
        while b + 1 < end && hops[b + 1].is_tal() {
            b += 1;
        }
        if b - a >= 2 {
            collapse_run(ast, hops, a, b, keep)?;
        }
        a = b + 1;
    }
    Ok(())
}

/// Collapses the TAL run `[first, last]`, greedily jumping from each kept hop
/// to the farthest hop found from it.
fn collapse_run<H: HostTree>(
    ast: &mut Ast<'_, H>,
    hops: &[Hop],
    first: usize,
    last: usize,
    keep: &mut [bool],
) -> Result<()> {
    let mut current = first;
    while current < last {
        let anchor = hops[current].node();
        let mut next = current + 1;
        for t in (current + 2..=last).rev() {
            if found_from(ast, anchor, hops[t].node(), t - current)? {
                next = t;
                break;
            }
        }
        if next > current + 1 {
            debug!("Run collapse drops {} hops between {} and {}", next - current - 1, current, next);
            keep[current + 1..next].fill(false);
        }
        current = next;
    }
    Ok(())
}

fn emit<H: HostTree>(ast: &mut Ast<'_, H>, hops: &[Hop], keep: &[bool]) -> Result<Vec<NodeLocatorStep>> {
    let mut steps = Vec::new();
    let mut anchor = 0;
    for (k, hop) in hops.iter().enumerate() {
        if !keep[k] {
            continue;
        }
        let step = match hop {
            Hop::Structural { node, tal: true, .. } => {
                NodeLocatorStep::Tal(describe(ast, *node, (k + 1 - anchor) as u32)?)
            }
            Hop::Structural { index, .. } => NodeLocatorStep::Child(*index),
            Hop::Nta { step, .. } => NodeLocatorStep::Nta(step.clone()),
        };
        steps.push(step);
        anchor = k + 1;
    }
    Ok(steps)
}
