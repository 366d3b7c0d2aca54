//! Source Location Utilities
//!
//! Spans and positions used by the scanner, actions and diagnostics.
//! Offsets count code points: the scanner works on a `[char]` buffer, so an
//! offset is an index into that buffer, never a byte offset.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A range of the input being parsed
///
/// Captured by value; saving and restoring a span is how the scanner
/// backtracks, so the line number travels with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    /// Index of the file being parsed, as passed to the parse entry
    pub file_index: usize,
    /// Line of the start offset (1-based)
    pub line: usize,
    /// Start offset in code points
    pub start: usize,
    /// End offset in code points (exclusive)
    pub end: usize,
}

impl Span {
    /// Create a span covering `start..end`
    #[inline]
    pub fn new(file_index: usize, line: usize, start: usize, end: usize) -> Self {
        Self {
            file_index,
            line,
            start,
            end,
        }
    }

    /// Create a zero-length span at an offset
    #[inline]
    pub fn at(file_index: usize, line: usize, offset: usize) -> Self {
        Self::new(file_index, line, offset, offset)
    }

    /// Number of code points covered
    #[inline]
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    /// Check if this is a zero-length span
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// Copy of this span ending at `end`
    #[inline]
    pub fn with_end(self, end: usize) -> Self {
        Self { end, ..self }
    }
}

impl Default for Span {
    fn default() -> Self {
        Self::at(0, 1, 0)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, offset {}..{}", self.line, self.start, self.end)
    }
}

/// A position in source code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourcePosition {
    /// Code point offset from start of input
    pub offset: usize,
    /// Line number (1-based)
    pub line: usize,
    /// Column number (1-based, in code points)
    pub column: usize,
}

impl SourcePosition {
    /// Create a new source position
    #[inline]
    pub fn new(offset: usize, line: usize, column: usize) -> Self {
        Self {
            offset,
            line,
            column,
        }
    }

    /// Calculate position from an offset in the input
    pub fn from_offset(input: &[char], offset: usize) -> Self {
        let (line, column) = offset_to_line_col(input, offset);
        Self {
            offset: offset.min(input.len()),
            line,
            column,
        }
    }
}

impl fmt::Display for SourcePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

impl Default for SourcePosition {
    fn default() -> Self {
        Self::new(0, 1, 1)
    }
}

/// Convert a code point offset to (line, column), both 1-based
pub fn offset_to_line_col(input: &[char], offset: usize) -> (usize, usize) {
    let offset = offset.min(input.len());
    let mut line = 1;
    let mut column = 1;
    for &ch in &input[..offset] {
        if ch == '\n' {
            line += 1;
            column = 1;
        } else {
            column += 1;
        }
    }
    (line, column)
}

/// Get the text of the line containing an offset, without its line break
///
/// Lines end at `\n` only, as in [`offset_to_line_col`]; the `\r` of a
/// `\r\n` pair is dropped.
pub fn line_at_offset(input: &[char], offset: usize) -> String {
    let offset = offset.min(input.len());
    let start = input[..offset]
        .iter()
        .rposition(|&c| c == '\n')
        .map_or(0, |i| i + 1);
    let mut end = input[offset..]
        .iter()
        .position(|&c| c == '\n')
        .map_or(input.len(), |i| offset + i);
    if end > start && input[end - 1] == '\r' && end < input.len() {
        end -= 1;
    }
    input[start..end].iter().collect()
}
