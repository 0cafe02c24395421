//! Error types for locator operations.
//!
//! Only conditions that abort an operation are errors. A locator that cannot be
//! created, or a step that matches nothing, is reported as `Ok(None)` by the
//! encoder and decoder instead.

use thiserror::Error;

use crate::ast::HostError;

/// Errors raised while walking a host tree.
#[derive(Debug, Error)]
#[must_use = "errors must not be silently ignored"]
pub enum LocatorError {
    /// A parent chain or a walk through children leads back to a node already
    /// visited. This is a bug in the host tree and is never retried.
    #[error("AST loop detected at a `{type_name}` node")]
    AstLoop { type_name: String },

    /// The host failed to answer a structural query about a node.
    #[error("invalid AST node: {0}")]
    Host(#[from] HostError),

    /// A child index outside `[0, num_children)` was requested.
    #[error("child index {index} is out of range for a node with {len} children")]
    ChildOutOfRange { index: usize, len: usize },
}

/// Errors raised while reading configuration values.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unknown {kind} `{value}`")]
    UnknownValue { kind: &'static str, value: String },
}

pub type Result<T, E = LocatorError> = std::result::Result<T, E>;
