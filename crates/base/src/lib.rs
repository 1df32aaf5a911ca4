//! Source handling
//!
//! Byte offsets, spans and line/column conversion shared by the lexers, the parser and the
//! diagnostics renderer.

pub mod ln;
pub mod span;

impl span::Span {
    pub fn from_rowan_range(range: rowan::TextRange) -> Self {
        let (start, end): (u32, u32) = (range.start().into(), range.end().into());
        Self::from(start, end)
    }

    pub fn into_rowan_range(self) -> rowan::TextRange {
        let (start, end): (u32, u32) = (self.start.into(), self.end.into());
        rowan::TextRange::new(start.into(), end.into())
    }
}
