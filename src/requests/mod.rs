//! Request handlers built on the locator
//!
//! Every handler takes locators in and hands fresh locators back, so clients
//! never hold anything that dies with a reparse. Failures that only concern
//! one node are reported as [`Diagnostic`]s next to the rest of the answer;
//! only host bugs surface as errors.

use serde::{Deserialize, Serialize};

use crate::ast::{Ast, HostTree, Span};
use crate::error::Result;
use crate::locator::{Locator, ResolvedLocator, apply_locator};

pub mod list_nodes;
pub mod list_tree;

pub use list_nodes::{ListNodesResponse, ListedNode, list_nodes};
pub use list_tree::{ListTreeResponse, ListedChildren, ListedTreeNode, list_tree};

pub const NO_MATCHING_NODE: &str = "no matching node, try remaking the probe";
pub const UNLOCATABLE_NODE: &str =
    "can't create a reference to this node; the host may be caching nodes it rebuilds on every access";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiagnosticKind {
    NoMatchingNode,
    UnlocatableNode,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub span: Option<Span>,
}

impl Diagnostic {
    pub fn no_matching_node(span: Span) -> Self {
        Diagnostic {
            kind: DiagnosticKind::NoMatchingNode,
            message: NO_MATCHING_NODE.to_string(),
            span: span.is_meaningful().then_some(span),
        }
    }

    pub fn unlocatable_node(span: Span) -> Self {
        Diagnostic {
            kind: DiagnosticKind::UnlocatableNode,
            message: UNLOCATABLE_NODE.to_string(),
            span: span.is_meaningful().then_some(span),
        }
    }
}

/// Outcome of [`resolve_request`]: either the resolved node or a diagnostic.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolveResponse {
    Resolved(ResolvedLocator),
    NotFound(Diagnostic),
}

impl ResolveResponse {
    pub fn resolved(&self) -> Option<&ResolvedLocator> {
        match self {
            ResolveResponse::Resolved(resolved) => Some(resolved),
            ResolveResponse::NotFound(_) => None,
        }
    }
}

/// Resolves a client locator, reporting a stale one as a diagnostic.
pub fn resolve_request<H: HostTree>(ast: &mut Ast<'_, H>, locator: &Locator) -> Result<ResolveResponse> {
    Ok(match apply_locator(ast, locator)? {
        Some(resolved) => ResolveResponse::Resolved(resolved),
        None => ResolveResponse::NotFound(Diagnostic::no_matching_node(locator.result.span())),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::AstInfo;
    use crate::ast::mock::MockTree;
    use crate::locator::create_locator;

    #[test]
    fn test_stale_locator_is_a_diagnostic() {
        let mut tree = MockTree::new("Program", Some(Span::from_line_columns(1, 1, 5, 1)));
        let stmt = tree.add(0, "Stmt", Some(Span::from_line_columns(2, 1, 2, 9)));
        let mut ast = Ast::new(&tree, 0, AstInfo::default());
        let id = ast.node(stmt);
        let locator = create_locator(&mut ast, id).unwrap().unwrap();

        let response = resolve_request(&mut ast, &locator).unwrap();
        assert_eq!(response.resolved().map(|r| r.node), Some(id));

        // The statement is gone after the edit.
        let edited = MockTree::new("Program", Some(Span::from_line_columns(1, 1, 5, 1)));
        let mut ast = Ast::new(&edited, 0, AstInfo::default());
        let response = resolve_request(&mut ast, &locator).unwrap();
        let ResolveResponse::NotFound(diagnostic) = response else {
            panic!("expected a diagnostic");
        };
        assert_eq!(diagnostic.kind, DiagnosticKind::NoMatchingNode);
        assert_eq!(diagnostic.span, Some(Span::from_line_columns(2, 1, 2, 9)));
    }

    #[test]
    fn test_diagnostic_json() {
        let diagnostic = Diagnostic::unlocatable_node(Span::NONE);
        let value = serde_json::to_value(&diagnostic).unwrap();
        assert_eq!(value["kind"], "UNLOCATABLE_NODE");
        assert!(value.get("span").is_none());
    }
}
