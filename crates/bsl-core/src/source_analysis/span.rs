// Copyright 2026 James Casey
// SPDX-License-Identifier: Apache-2.0

//! Byte spans and line/column positions.
//!
//! Offsets count bytes of the original text, BOM included. Tokens and errors
//! also carry the [`LineColumn`] of their first character.

use std::fmt;
use std::ops::Range;

/// Half-open byte range `start..end` in the source text.
///
/// ```
/// use bsl_core::source_analysis::Span;
///
/// let name = Span::new(0, 10).merge(Span::new(12, 20));
/// assert_eq!((name.start(), name.end()), (0, 20));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    start: u32,
    end: u32,
}

impl Span {
    #[must_use]
    pub const fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    #[must_use]
    pub const fn start(self) -> u32 {
        self.start
    }

    /// Exclusive.
    #[must_use]
    pub const fn end(self) -> u32 {
        self.end
    }

    /// True when `inner` lies entirely inside this span.
    #[must_use]
    pub const fn contains(self, inner: Self) -> bool {
        self.start <= inner.start && inner.end <= self.end
    }

    /// The smallest span covering both.
    #[must_use]
    pub fn merge(self, other: Self) -> Self {
        Self {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// Slicing range for `&source[..]`.
    #[must_use]
    pub const fn as_range(self) -> Range<usize> {
        self.start as usize..self.end as usize
    }
}

impl From<Range<usize>> for Span {
    #[expect(
        clippy::cast_possible_truncation,
        reason = "source files over 4GB are not supported"
    )]
    fn from(range: Range<usize>) -> Self {
        Self::new(range.start as u32, range.end as u32)
    }
}

impl From<Span> for miette::SourceSpan {
    fn from(span: Span) -> Self {
        span.as_range().into()
    }
}

/// A 1-based line and column (counted in characters, not bytes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LineColumn {
    pub line: u32,
    pub column: u32,
}

impl LineColumn {
    /// The first character of a file.
    pub const START: Self = Self { line: 1, column: 1 };

    #[must_use]
    pub const fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

impl Default for LineColumn {
    fn default() -> Self {
        Self::START
    }
}

impl fmt::Display for LineColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}
