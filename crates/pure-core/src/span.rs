//! Source positions attached to syntax nodes and diagnostics.
//!
//! A [`Span`] records where a node starts in its source file. The analysis
//! never needs end positions for correctness, only for rendering, so the
//! length is carried as extra context.

use std::cmp::Ordering;
use std::fmt;

/// Start position of a syntax node.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Span {
    /// Line number (1-indexed).
    pub line: u32,
    /// Column number (1-indexed).
    pub col: u32,
    /// Length in bytes.
    pub len: u32,
}

impl Span {
    #[inline]
    pub fn new(line: u32, col: u32, len: u32) -> Self {
        Self { line, col, len }
    }

    /// Zero-length span at a position.
    #[inline]
    pub fn point(line: u32, col: u32) -> Self {
        Self { line, col, len: 0 }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn len(&self) -> u32 {
        self.len
    }

    /// Whether this span starts at or before `other`.
    ///
    /// Block-scoped declarations are only visible to references for which
    /// this holds.
    #[inline]
    pub fn starts_at_or_before(&self, other: Span) -> bool {
        self.position_cmp(&other) != Ordering::Greater
    }

    /// Orders spans by start position only.
    #[inline]
    pub fn position_cmp(&self, other: &Span) -> Ordering {
        (self.line, self.col).cmp(&(other.line, other.col))
    }
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}
