//! Byte offsets and spans of UTF-8 source text

use std::{fmt, ops};

/// Byte offset in a source text
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Offset(u32);

impl Offset {
    pub fn into_usize(self) -> usize {
        self.0 as usize
    }
}

impl From<u32> for Offset {
    fn from(x: u32) -> Self {
        Self(x)
    }
}

impl From<usize> for Offset {
    fn from(x: usize) -> Self {
        assert!(x <= u32::MAX as usize, "source text is too large");
        Self(x as u32)
    }
}

impl From<Offset> for u32 {
    fn from(x: Offset) -> u32 {
        x.0
    }
}

impl From<Offset> for usize {
    fn from(x: Offset) -> usize {
        x.0 as usize
    }
}

impl ops::Add<u32> for Offset {
    type Output = Offset;
    fn add(self, rhs: u32) -> Offset {
        Offset(self.0 + rhs)
    }
}

impl ops::AddAssign<u32> for Offset {
    fn add_assign(&mut self, rhs: u32) {
        self.0 += rhs;
    }
}

impl ops::Sub<Offset> for Offset {
    type Output = u32;
    fn sub(self, rhs: Offset) -> u32 {
        self.0 - rhs.0
    }
}

/// Span of source text in range `[start, end)`, referred to as `sp`
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Span {
    pub start: Offset,
    pub end: Offset,
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start.0, self.end.0)
    }
}

impl Span {
    pub fn from(start: impl Into<Offset>, end: impl Into<Offset>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
        }
    }

    /// Zero-width span
    pub fn at(pos: impl Into<Offset>) -> Self {
        let pos = pos.into();
        Self {
            start: pos,
            end: pos,
        }
    }

    pub fn len(&self) -> u32 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Smallest span covering both
    pub fn cover(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    pub fn slice<'a>(&self, s: &'a str) -> &'a str {
        &s[self.start.into_usize()..self.end.into_usize()]
    }
}

/// Zero-based line and column (column counted in characters)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LineColumn {
    line0: u32,
    column0: u32,
}

impl LineColumn {
    pub fn new0(line0: impl TryInto<u32>, column0: impl TryInto<u32>) -> Self {
        Self {
            line0: line0.try_into().ok().unwrap_or(u32::MAX),
            column0: column0.try_into().ok().unwrap_or(u32::MAX),
        }
    }

    pub fn line0(&self) -> u32 {
        self.line0
    }

    pub fn line0_usize(&self) -> usize {
        self.line0 as usize
    }

    pub fn column0(&self) -> u32 {
        self.column0
    }

    pub fn line1(&self) -> u32 {
        self.line0 + 1
    }

    pub fn column1(&self) -> u32 {
        self.column0 + 1
    }
}

impl fmt::Display for LineColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line1(), self.column1())
    }
}

/// Start and end positions in line/column form
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct TextRange {
    pub start: LineColumn,
    pub end: LineColumn,
}

impl TextRange {
    pub fn new(start: LineColumn, end: LineColumn) -> Self {
        Self { start, end }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_cover_and_slice() {
        let a = Span::from(2u32, 4u32);
        let b = Span::from(6u32, 9u32);
        let c = a.cover(b);
        assert_eq!(c, Span::from(2u32, 9u32));
        assert_eq!(c.slice("0123456789"), "2345678");
        assert_eq!(c.len(), 7);
    }
}
