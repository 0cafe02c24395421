//! Subtree listing below a located node

use serde::Serialize;

use super::Diagnostic;
use crate::ast::{Ast, HostTree, NodeId, Span};
use crate::error::Result;
use crate::locator::{Locator, apply_locator, create_locator};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ListedChildren {
    Children(Vec<ListedTreeNode>),
    /// Levels past the depth limit are only counted.
    Placeholder(usize),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListedTreeNode {
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub span: Span,
    /// `None` when the node cannot be referenced.
    pub locator: Option<Locator>,
    pub children: ListedChildren,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ListTreeResponse {
    pub tree: Option<ListedTreeNode>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}

/// Resolves `locator` and lists its subtree down to `max_depth` levels below
/// it.
pub fn list_tree<H: HostTree>(ast: &mut Ast<'_, H>, locator: &Locator, max_depth: usize) -> Result<ListTreeResponse> {
    let Some(resolved) = apply_locator(ast, locator)? else {
        return Ok(ListTreeResponse {
            tree: None,
            diagnostics: vec![Diagnostic::no_matching_node(locator.result.span())],
        });
    };
    let mut diagnostics = Vec::new();
    let tree = listed(ast, resolved.node, Some(resolved.locator), max_depth, &mut diagnostics)?;
    Ok(ListTreeResponse { tree: Some(tree), diagnostics })
}

fn listed<H: HostTree>(
    ast: &mut Ast<'_, H>,
    id: NodeId,
    locator: Option<Locator>,
    remaining: usize,
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<ListedTreeNode> {
    let span = ast.recovered_span(id)?;
    if locator.is_none() {
        diagnostics.push(Diagnostic::unlocatable_node(span));
    }
    let count = ast.num_children(id)?;
    let children = if remaining == 0 {
        ListedChildren::Placeholder(count)
    } else {
        let mut children = Vec::with_capacity(count);
        for child in ast.children(id)? {
            let child_locator = create_locator(ast, child)?;
            children.push(listed(ast, child, child_locator, remaining - 1, diagnostics)?);
        }
        ListedChildren::Children(children)
    };
    Ok(ListedTreeNode {
        type_name: ast.type_name(id).to_string(),
        label: ast.label(id),
        span,
        locator,
        children,
    })
}
