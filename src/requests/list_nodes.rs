//! Nodes under a text position

use serde::Serialize;
use tracing::debug;

use super::Diagnostic;
use crate::ast::{Ast, HostTree, NodeId, Span};
use crate::error::Result;
use crate::locator::{Locator, create_locator};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListedNode {
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub span: Span,
    pub locator: Locator,
    #[serde(skip)]
    pub node: NodeId,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ListNodesResponse {
    pub nodes: Vec<ListedNode>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}

/// Every visible node whose span contains the packed position `pos`,
/// innermost first.
pub fn list_nodes<H: HostTree>(ast: &mut Ast<'_, H>, pos: u32) -> Result<ListNodesResponse> {
    let mut hits: Vec<(NodeId, usize)> = Vec::new();
    let mut visited = 0;
    let mut stack = vec![(ast.root(), 0usize)];
    while let Some((id, depth)) = stack.pop() {
        visited += 1;
        ast.bound_walk(visited, id)?;
        let raw = ast.raw_span(id);
        if raw.is_meaningful() && !raw.contains(pos) && !ast.is_external(id) {
            continue;
        }
        if ast.recovered_span(id)?.contains(pos) && ast.visible_in_node_list(id) {
            hits.push((id, depth));
        }
        let count = ast.num_children(id)?;
        for index in (0..count).rev() {
            let child = ast.nth_child(id, index)?;
            stack.push((child, depth + 1));
        }
    }
    hits.sort_by(|a, b| b.1.cmp(&a.1));

    let mut response = ListNodesResponse::default();
    for (id, _) in hits {
        let span = ast.recovered_span(id)?;
        match create_locator(ast, id)? {
            Some(locator) => response.nodes.push(ListedNode {
                type_name: ast.type_name(id).to_string(),
                label: ast.label(id),
                span,
                locator,
                node: id,
            }),
            None => {
                debug!("Skipping unlocatable {} at {}", ast.type_name(id), span);
                response.diagnostics.push(Diagnostic::unlocatable_node(span));
            }
        }
    }
    Ok(response)
}
