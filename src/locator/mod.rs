//! Stable references to nodes across reparses
//!
//! [`create_locator`] turns a node into a [`Locator`]; [`apply_locator`] finds
//! the node again in a newer tree and hands back a fresh locator.

pub mod apply;
pub mod create;
pub mod matcher;
mod minimize;
pub mod model;

pub use apply::{ResolvedLocator, apply_locator, resolve_steps};
pub use create::create_locator;
pub use matcher::{Match, MatchScore, TalTarget, best_matching_node, is_ambiguous_tal, unique_match};
pub use model::{FnStep, Locator, NodeLocatorStep, PropertyArg, TalStep};
