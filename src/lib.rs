//! Stable node references for syntax trees that are rebuilt on every edit.
//!
//! A host implements [`HostTree`] for its parser's AST. [`create_locator`]
//! encodes a node as a [`Locator`], and [`apply_locator`] finds the node in the
//! same structural role in a later parse of the edited text.

pub mod ast;
pub mod config;
pub mod error;
pub mod locator;
pub mod logging;
pub mod requests;

pub use ast::{Ast, AstInfo, HostTree, NodeId, Span};
pub use config::LocatorConfig;
pub use error::{LocatorError, Result};
pub use locator::{Locator, ResolvedLocator, apply_locator, create_locator};
