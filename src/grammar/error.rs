//! Syntax diagnostics
//!
//! Syntax errors are values collected into [`crate::syntax::ParseResult::diagnostics`]. Their
//! severity is derived from the numeric code: each surface syntax has an error code table whose
//! codes fall into one of three bands bounded by [`ErrorCodeTable::ERRORS`],
//! [`ErrorCodeTable::WARNINGS`] and [`ErrorCodeTable::MESSAGES`].

use base::span::{LineColumn, Span};
use itertools::Itertools;

use crate::{
    lang::SurfaceSyntax,
    syntax::token::TokenKind,
    util::diag::{Diagnostic, Severity},
};

/// Per-surface-syntax numeric error code enumeration
pub trait ErrorCodeTable: Copy {
    /// Codes below this are errors
    const ERRORS: u16 = 1000;
    /// Codes below this (and not errors) are warnings
    const WARNINGS: u16 = 2000;
    /// Codes below this (and not warnings) are messages
    const MESSAGES: u16 = 3000;

    const PREFIX: &'static str;

    fn code(self) -> u16;
    fn message(self) -> &'static str;

    fn severity(self) -> Severity {
        self::severity_of::<Self>(self.code())
    }

    fn label(self) -> String {
        format!("{}{:04}", Self::PREFIX, self.code())
    }
}

fn severity_of<T: ErrorCodeTable>(code: u16) -> Severity {
    if code < T::ERRORS {
        Severity::Error
    } else if code < T::WARNINGS {
        Severity::Warning
    } else {
        debug_assert!(code < T::MESSAGES, "error code out of bands: {code}");
        Severity::Message
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum CSharpErrorCode {
    UnexpectedToken = 1,
    UnexpectedEndOfFile = 2,
    InvalidToken = 3,

    /// `if (c);`
    PossibleMistakenEmptyStatement = 1001,

    /// `class A { };`
    RedundantSemicolon = 2001,
}

impl ErrorCodeTable for CSharpErrorCode {
    const PREFIX: &'static str = "CS";

    fn code(self) -> u16 {
        self as u16
    }

    fn message(self) -> &'static str {
        match self {
            Self::UnexpectedToken => "unexpected token",
            Self::UnexpectedEndOfFile => "unexpected end of file",
            Self::InvalidToken => "invalid token",
            Self::PossibleMistakenEmptyStatement => "possible mistaken empty statement",
            Self::RedundantSemicolon => "redundant semicolon",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum VbErrorCode {
    UnexpectedToken = 1,
    UnexpectedEndOfFile = 2,
    InvalidToken = 3,
}

impl ErrorCodeTable for VbErrorCode {
    const PREFIX: &'static str = "BC";

    fn code(self) -> u16 {
        self as u16
    }

    fn message(self) -> &'static str {
        match self {
            Self::UnexpectedToken => "unexpected token",
            Self::UnexpectedEndOfFile => "unexpected end of file",
            Self::InvalidToken => "invalid token",
        }
    }
}

/// Structured syntax diagnostic: location + numeric code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    pub syntax: SurfaceSyntax,
    pub code: u16,
    /// e.g. `CS0001`
    pub code_label: String,
    severity: Severity,
    pub span: Span,
    pub location: LineColumn,
    /// Tokens the parser would have accepted
    pub expected: Vec<TokenKind>,
    pub found: Option<TokenKind>,
    pub message: String,
    reason: &'static str,
}

impl SyntaxError {
    pub fn new<C: ErrorCodeTable>(
        syntax: SurfaceSyntax,
        code: C,
        span: Span,
        location: LineColumn,
    ) -> Self {
        Self {
            syntax,
            code: code.code(),
            code_label: code.label(),
            severity: code.severity(),
            span,
            location,
            expected: Vec::new(),
            found: None,
            message: code.message().to_string(),
            reason: code.message(),
        }
    }

    /// Adds the parser expectation to the message
    pub fn with_expectation(mut self, expected: Vec<TokenKind>, found: TokenKind) -> Self {
        self.message = if expected.is_empty() {
            format!("{}: `{found:?}`", self.reason)
        } else {
            format!(
                "expected {}, found `{found:?}`",
                expected.iter().map(|k| format!("`{k:?}`")).join(" or ")
            )
        };
        self.expected = expected;
        self.found = Some(found);
        self
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl Diagnostic for SyntaxError {
    fn code(&self) -> &str {
        &self.code_label
    }

    fn severity(&self) -> Severity {
        self.severity
    }

    fn msg(&self) -> String {
        self.message.clone()
    }

    fn reason(&self) -> &str {
        self.reason
    }

    fn span(&self) -> Span {
        self.span
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_bands() {
        assert_eq!(CSharpErrorCode::UnexpectedToken.severity(), Severity::Error);
        assert_eq!(
            CSharpErrorCode::PossibleMistakenEmptyStatement.severity(),
            Severity::Warning
        );
        assert_eq!(CSharpErrorCode::RedundantSemicolon.severity(), Severity::Message);
        assert_eq!(VbErrorCode::InvalidToken.severity(), Severity::Error);
    }

    #[test]
    fn labels() {
        assert_eq!(CSharpErrorCode::UnexpectedToken.label(), "CS0001");
        assert_eq!(CSharpErrorCode::PossibleMistakenEmptyStatement.label(), "CS1001");
        assert_eq!(VbErrorCode::UnexpectedEndOfFile.label(), "BC0002");
    }

    #[test]
    fn expectation_message() {
        let err = SyntaxError::new(
            SurfaceSyntax::CSharp,
            CSharpErrorCode::UnexpectedToken,
            Span::from(0u32, 1u32),
            LineColumn::new0(0u32, 0u32),
        )
        .with_expectation(vec![TokenKind::Semicolon], TokenKind::RBrace);
        assert!(err.is_error());
        assert_eq!(err.message, "expected `Semicolon`, found `RBrace`");
    }
}
