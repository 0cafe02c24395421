//! Type-at-location search
//!
//! Finds the node in a subtree whose key matches a target and whose span is
//! closest to the target span. Subtrees whose own span cannot overlap the
//! target are skipped, which keeps the search small on well-formed trees where
//! spans shrink with depth.

use tracing::trace;

use super::model::TalStep;
use crate::ast::{Ast, HostTree, IdentificationStyle, NodeId, NodeKey, Span};
use crate::error::Result;

/// What a TAL search looks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TalTarget {
    pub key: NodeKey,
    pub span: Span,
    /// Expected number of hops below the search start.
    pub depth: u32,
}

impl TalTarget {
    pub fn from_step<H: HostTree>(ast: &mut Ast<'_, H>, step: &TalStep) -> Self {
        let key = match &step.label {
            Some(label) if ast.info().identify == IdentificationStyle::Label => NodeKey::Label(label.clone()),
            _ => NodeKey::Type(ast.info_mut().types.intern(&step.type_name)),
        };
        TalTarget { key, span: step.span(), depth: step.depth }
    }

    /// Target describing `id` itself, expected `depth` hops below the start.
    pub fn from_node<H: HostTree>(ast: &mut Ast<'_, H>, id: NodeId, depth: u32) -> Result<Self> {
        Ok(TalTarget {
            key: ast.key(id),
            span: ast.recovered_span(id)?,
            depth,
        })
    }
}

/// Lower is better. Distance always dominates; the depth error only separates
/// candidates that are equally close by position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct MatchScore {
    pub distance: u32,
    pub depth_error: u32,
}

impl MatchScore {
    pub const EXACT: MatchScore = MatchScore { distance: 0, depth_error: 0 };
}

/// Outcome of [`best_matching_node`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Match {
    /// No node with the target key in scope.
    None,
    Best(NodeId, MatchScore),
    /// Two or more nodes share the best score. Only reported when the search
    /// was asked to fail on ambiguity.
    Ambiguous,
}

impl Match {
    pub fn node(self) -> Option<NodeId> {
        match self {
            Match::Best(node, _) => Some(node),
            Match::None | Match::Ambiguous => None,
        }
    }
}

/// Searches the subtree at `root` for the node closest to `target`.
///
/// Candidates are visited in pre-order. On a tie the first candidate found is
/// kept, unless `fail_on_ambiguity` is set, in which case the search reports
/// [`Match::Ambiguous`]. An exact tie aborts immediately since nothing can
/// beat it. `ignore` excludes one subtree from the search.
pub fn best_matching_node<H: HostTree>(
    ast: &mut Ast<'_, H>,
    root: NodeId,
    target: &TalTarget,
    fail_on_ambiguity: bool,
    ignore: Option<NodeId>,
) -> Result<Match> {
    let mut best: Option<(NodeId, MatchScore)> = None;
    let mut tied = false;
    let mut visited = 0;
    let mut stack = vec![(root, 0u32)];

    while let Some((id, depth)) = stack.pop() {
        visited += 1;
        ast.bound_walk(visited, id)?;
        if Some(id) == ignore {
            continue;
        }
        // External nodes carry positions from another file.
        if !ast.is_external(id) {
            let raw = ast.raw_span(id);
            if raw.is_meaningful() && !raw.overlaps(target.span.start, target.span.end) {
                trace!("Pruning {} at {}", ast.type_name(id), raw);
                continue;
            }
            if ast.key(id) == target.key {
                let span = ast.recovered_span(id)?;
                let score = MatchScore {
                    distance: span.distance(target.span.start, target.span.end),
                    depth_error: depth.abs_diff(target.depth),
                };
                match best {
                    Some((_, current)) if score > current => {}
                    Some((_, current)) if score == current => {
                        tied = true;
                        if fail_on_ambiguity && score == MatchScore::EXACT {
                            return Ok(Match::Ambiguous);
                        }
                    }
                    _ => {
                        best = Some((id, score));
                        tied = false;
                    }
                }
            }
        }
        let count = ast.num_children(id)?;
        for index in (0..count).rev() {
            let child = ast.nth_child(id, index)?;
            stack.push((child, depth + 1));
        }
    }

    Ok(match best {
        None => Match::None,
        Some(_) if tied && fail_on_ambiguity => Match::Ambiguous,
        Some((id, score)) => Match::Best(id, score),
    })
}

/// The single best match for `target`, or `None` if there is none or it is
/// not unique.
pub fn unique_match<H: HostTree>(
    ast: &mut Ast<'_, H>,
    root: NodeId,
    target: &TalTarget,
    ignore: Option<NodeId>,
) -> Result<Option<NodeId>> {
    Ok(best_matching_node(ast, root, target, true, ignore)?.node())
}

/// True unless exactly one best node for `tal` exists below `source`.
pub fn is_ambiguous_tal<H: HostTree>(
    ast: &mut Ast<'_, H>,
    source: NodeId,
    tal: &TalStep,
    ignore: Option<NodeId>,
) -> Result<bool> {
    let target = TalTarget::from_step(ast, tal);
    Ok(unique_match(ast, source, &target, ignore)?.is_none())
}
