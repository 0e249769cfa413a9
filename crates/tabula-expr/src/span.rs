//! Source location tracking for diagnostics.
//!
//! Every expression is parsed from its own small source buffer, so a span
//! is just a byte range; there is no file table. Line and column numbers
//! are computed lazily from the source text when a diagnostic is built.

use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Byte range within a single expression source, end-exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: u32,
    pub end: u32,
}

impl Span {
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    pub fn from_range(range: Range<usize>) -> Self {
        Self {
            start: range.start as u32,
            end: range.end as u32,
        }
    }

    /// Zero-length span at the start of the source.
    pub fn zero() -> Self {
        Self { start: 0, end: 0 }
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Span covering both `self` and `other`.
    pub fn merge(&self, other: &Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

/// A position within a source buffer. Line and column are 1-based; the
/// column counts characters, not bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pos {
    pub line: u32,
    pub column: u32,
    pub byte: u32,
}

/// Compute the position of `byte` within `src`. Offsets past the end of
/// the buffer are clamped to the end.
pub fn pos_at(src: &str, byte: u32) -> Pos {
    let byte = (byte as usize).min(src.len());
    let mut line = 1;
    let mut column = 1;
    for (i, ch) in src.char_indices() {
        if i >= byte {
            break;
        }
        if ch == '\n' {
            line += 1;
            column = 1;
        } else {
            column += 1;
        }
    }
    Pos {
        line,
        column,
        byte: byte as u32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pos_at_start() {
        assert_eq!(
            pos_at("a + b", 0),
            Pos {
                line: 1,
                column: 1,
                byte: 0
            }
        );
    }

    #[test]
    fn pos_at_mid_line() {
        assert_eq!(
            pos_at("a + b", 4),
            Pos {
                line: 1,
                column: 5,
                byte: 4
            }
        );
    }

    #[test]
    fn pos_at_second_line() {
        let src = "a +\nb";
        assert_eq!(
            pos_at(src, 4),
            Pos {
                line: 2,
                column: 1,
                byte: 4
            }
        );
    }

    #[test]
    fn pos_at_clamps_past_end() {
        assert_eq!(pos_at("ab", 99).byte, 2);
    }

    #[test]
    fn merge_covers_both() {
        let a = Span::new(2, 5);
        let b = Span::new(4, 9);
        assert_eq!(a.merge(&b), Span::new(2, 9));
    }

    #[test]
    fn zero_span_is_empty() {
        assert!(Span::zero().is_empty());
        assert!(!Span::new(1, 2).is_empty());
    }
}
