//! Position recovery for nodes without a usable span
//!
//! Synthesized nodes often carry no position at all. Recovery borrows the span
//! of a nearby node instead, walking up through parents, down through first
//! children, or both.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::trace;

use super::host::HostTree;
use super::node::{Ast, NodeId};
use super::span::Span;
use crate::error::{ConfigError, Result};

/// Strategy used when a node's own span is not meaningful.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecoveryStrategy {
    /// Keep the non-meaningful span.
    Fail,
    /// Nearest ancestor with a span.
    Parent,
    /// Nearest first-child descendant with a span.
    Child,
    /// `Parent`, then `Child`.
    SequenceParentChild,
    /// `Child`, then `Parent`.
    SequenceChildParent,
    /// One step up, one step down, and so on; nearest neighbour wins.
    #[default]
    AlternateParentChild,
}

impl RecoveryStrategy {
    pub const ALL: [RecoveryStrategy; 6] = [
        RecoveryStrategy::Fail,
        RecoveryStrategy::Parent,
        RecoveryStrategy::Child,
        RecoveryStrategy::SequenceParentChild,
        RecoveryStrategy::SequenceChildParent,
        RecoveryStrategy::AlternateParentChild,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RecoveryStrategy::Fail => "FAIL",
            RecoveryStrategy::Parent => "PARENT",
            RecoveryStrategy::Child => "CHILD",
            RecoveryStrategy::SequenceParentChild => "SEQUENCE_PARENT_CHILD",
            RecoveryStrategy::SequenceChildParent => "SEQUENCE_CHILD_PARENT",
            RecoveryStrategy::AlternateParentChild => "ALTERNATE_PARENT_CHILD",
        }
    }
}

impl fmt::Display for RecoveryStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecoveryStrategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_uppercase();
        RecoveryStrategy::ALL
            .into_iter()
            .find(|strategy| strategy.as_str() == wanted)
            .ok_or_else(|| ConfigError::UnknownValue { kind: "recovery strategy", value: s.to_string() })
    }
}

impl<H: HostTree> Ast<'_, H> {
    /// Span of `id` under the snapshot's configured strategy.
    pub fn recovered_span(&mut self, id: NodeId) -> Result<Span> {
        let strategy = self.info().recovery;
        self.recovered_span_with(id, strategy)
    }

    /// Span of `id` under an explicit strategy. The result is cached together
    /// with the strategy; asking again with another strategy recomputes.
    pub fn recovered_span_with(&mut self, id: NodeId, strategy: RecoveryStrategy) -> Result<Span> {
        let raw = self.raw_span(id);
        if raw.is_meaningful() {
            return Ok(raw);
        }
        if let Some((cached_strategy, span)) = self.cached_recovery(id) {
            if cached_strategy == strategy {
                return Ok(span);
            }
        }

        let span = match strategy {
            RecoveryStrategy::Fail => raw,
            RecoveryStrategy::Parent => self.recover_from_parents(id)?,
            RecoveryStrategy::Child => self.recover_from_children(id)?,
            RecoveryStrategy::SequenceParentChild => {
                let span = self.recover_from_parents(id)?;
                if span.is_meaningful() { span } else { self.recover_from_children(id)? }
            }
            RecoveryStrategy::SequenceChildParent => {
                let span = self.recover_from_children(id)?;
                if span.is_meaningful() { span } else { self.recover_from_parents(id)? }
            }
            RecoveryStrategy::AlternateParentChild => self.recover_alternating(id)?,
        };

        trace!("Recovered span {} for {} using {}", span, self.type_name(id), strategy);
        self.store_recovery(id, strategy, span);
        Ok(span)
    }

    fn recover_from_parents(&mut self, id: NodeId) -> Result<Span> {
        let mut current = id;
        while let Some(parent) = self.parent(current)? {
            let span = self.raw_span(parent);
            if span.is_meaningful() {
                return Ok(span);
            }
            current = parent;
        }
        Ok(Span::NONE)
    }

    fn recover_from_children(&mut self, id: NodeId) -> Result<Span> {
        let mut current = id;
        let mut visited = 1;
        while self.num_children(current)? > 0 {
            current = self.nth_child(current, 0)?;
            visited += 1;
            self.bound_walk(visited, current)?;
            let span = self.raw_span(current);
            if span.is_meaningful() {
                return Ok(span);
            }
        }
        Ok(Span::NONE)
    }

    fn recover_alternating(&mut self, id: NodeId) -> Result<Span> {
        let mut up = Some(id);
        let mut down = Some(id);
        let mut visited_down = 1;
        while up.is_some() || down.is_some() {
            if let Some(node) = up {
                up = self.parent(node)?;
                if let Some(parent) = up {
                    let span = self.raw_span(parent);
                    if span.is_meaningful() {
                        return Ok(span);
                    }
                }
            }
            if let Some(node) = down {
                down = if self.num_children(node)? > 0 { Some(self.nth_child(node, 0)?) } else { None };
                if let Some(child) = down {
                    visited_down += 1;
                    self.bound_walk(visited_down, child)?;
                    let span = self.raw_span(child);
                    if span.is_meaningful() {
                        return Ok(span);
                    }
                }
            }
        }
        Ok(Span::NONE)
    }
}
