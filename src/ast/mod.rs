//! Uniform, arena-backed view over an externally built syntax tree.

pub mod host;
pub mod info;
pub mod node;
pub mod recovery;
pub mod span;

#[cfg(test)]
pub(crate) mod mock;

pub use host::{DerivedOrigin, HostError, HostHook, HostTree, HostValue, LineColumnSpan};
pub use info::{AstInfo, IdentificationStyle, NodeKey, PositionConvention, TypeRegistry, TypeTag};
pub use node::{Ast, NodeId};
pub use recovery::RecoveryStrategy;
pub use span::Span;
