//! Packed text positions and spans
//!
//! Positions are packed into a single integer: the 20 high bits hold the line
//! and the 12 low bits hold the column, so `line << 12 | column`. A span is a
//! pair of packed positions. The pair `(0, 0)` means "no position", which is
//! common for nodes synthesized by the host rather than parsed from text.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Number of bits reserved for the column in a packed position.
pub const COLUMN_BITS: u32 = 12;

/// Largest column that fits in a packed position.
pub const MAX_COLUMN: u32 = (1 << COLUMN_BITS) - 1;

/// Largest line that fits in a packed position.
pub const MAX_LINE: u32 = (1 << (32 - COLUMN_BITS)) - 1;

/// Packs a line and column. Out-of-range values are clamped.
pub fn pack(line: u32, column: u32) -> u32 {
    (line.min(MAX_LINE) << COLUMN_BITS) | column.min(MAX_COLUMN)
}

/// Returns the line of a packed position.
pub fn line_of(packed: u32) -> u32 {
    packed >> COLUMN_BITS
}

/// Returns the column of a packed position.
pub fn column_of(packed: u32) -> u32 {
    packed & MAX_COLUMN
}

/// Start and end of a node in packed form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Span {
    pub start: u32,
    pub end: u32,
}

impl Span {
    /// The "no position" span.
    pub const NONE: Span = Span { start: 0, end: 0 };

    pub const fn new(start: u32, end: u32) -> Self {
        Span { start, end }
    }

    /// Builds a span from separate line and column fields.
    pub fn from_line_columns(start_line: u32, start_column: u32, end_line: u32, end_column: u32) -> Self {
        Span {
            start: pack(start_line, start_column),
            end: pack(end_line, end_column),
        }
    }

    /// True unless this is the `(0, 0)` "no position" span.
    pub fn is_meaningful(&self) -> bool {
        self.start != 0 || self.end != 0
    }

    /// True if `[start, end]` shares at least one position with this span.
    pub fn overlaps(&self, start: u32, end: u32) -> bool {
        self.start <= end && start <= self.end
    }

    /// True if `pos` lies within this span. Both ends are inclusive so that a
    /// cursor placed right after the last character still hits the node.
    pub fn contains(&self, pos: u32) -> bool {
        self.start <= pos && pos <= self.end
    }

    /// L1 distance between the endpoints of this span and `[start, end]`.
    pub fn distance(&self, start: u32, end: u32) -> u32 {
        self.start.abs_diff(start).saturating_add(self.end.abs_diff(end))
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}-{}:{}",
            line_of(self.start),
            column_of(self.start),
            line_of(self.end),
            column_of(self.end)
        )
    }
}
