//! Lexer / tokenizer
//!
//! Both surface syntaxes are scanned by hand over a shared byte cursor ([`Scanner`]). Trivia
//! (white spaces, line breaks, comments) goes to a side channel and is paired with the token that
//! follows it.

use base::span::Span;
use thiserror::Error;

use crate::{
    lang::{KeywordTable, SurfaceSyntax},
    syntax::token::{NumberSuffix, Token, TokenIdx, TokenKind, TokenStream, TokenValue, Trivia},
    util::diag::{Diagnostic, Severity},
};

/// Tries lexing functions in order and returns the first token produced
macro_rules! try_syntax {
    ($obj:ident, $($syn:ident),* $(,)?) => {
        $(
            if let Some(tk) = $obj.$syn()? {
                return Ok(tk);
            }
        )*
    };
}

mod csharp;
mod vb;

pub use self::{csharp::CSharpLexer, vb::VbLexer};

/// Lexical error type. All of them are fatal.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LexError {
    #[error("Too many decimal points in number literal ({span:?})")]
    TooManyDecimalPoints { span: Span },
    #[error("Unterminated string literal ({span:?})")]
    UnterminatedString { span: Span },
    #[error("Unterminated block comment ({span:?})")]
    UnterminatedComment { span: Span },
    #[error("Invalid escape sequence ({span:?})")]
    InvalidEscape { span: Span },
    #[error("Character literal must contain exactly one character ({span:?})")]
    InvalidCharLiteral { span: Span },
}

impl LexError {
    pub fn span(&self) -> Span {
        match self {
            LexError::TooManyDecimalPoints { span }
            | LexError::UnterminatedString { span }
            | LexError::UnterminatedComment { span }
            | LexError::InvalidEscape { span }
            | LexError::InvalidCharLiteral { span } => *span,
        }
    }

    /// Returns a detailed error message
    pub fn detailed_message(&self, src: &str) -> String {
        let text = self.span().slice(src);
        match self {
            LexError::TooManyDecimalPoints { .. } => {
                format!("number literal `{text}` has more than one decimal point")
            }
            LexError::UnterminatedString { .. } => "string literal is not closed".to_string(),
            LexError::UnterminatedComment { .. } => "block comment is not closed".to_string(),
            LexError::InvalidEscape { .. } => format!("unknown escape sequence `{text}`"),
            LexError::InvalidCharLiteral { .. } => {
                format!("`{text}` is not a single character literal")
            }
        }
    }

    /// Returns a simplified error message, useful when quoting source text.
    pub fn simple_message(&self) -> &'static str {
        match self {
            LexError::TooManyDecimalPoints { .. } => "second decimal point",
            LexError::UnterminatedString { .. } => "unterminated string",
            LexError::UnterminatedComment { .. } => "unterminated comment",
            LexError::InvalidEscape { .. } => "invalid escape",
            LexError::InvalidCharLiteral { .. } => "invalid character literal",
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            LexError::TooManyDecimalPoints { .. } => "L0001",
            LexError::UnterminatedString { .. } => "L0002",
            LexError::UnterminatedComment { .. } => "L0003",
            LexError::InvalidEscape { .. } => "L0004",
            LexError::InvalidCharLiteral { .. } => "L0005",
        }
    }
}

impl Diagnostic for LexError {
    fn code(&self) -> &str {
        LexError::code(self)
    }

    fn severity(&self) -> Severity {
        Severity::Error
    }

    fn msg(&self) -> String {
        self.to_string()
    }

    fn reason(&self) -> &str {
        self.simple_message()
    }

    fn span(&self) -> Span {
        LexError::span(self)
    }
}

/// Pull-style lexer
pub trait Lexer {
    /// Returns the next significant token. Called until [`TokenKind::Eof`] is returned.
    fn read_next_token(&mut self) -> Result<Token, LexError>;

    /// Trivia read since the last call, in source order
    fn take_trivia(&mut self) -> Vec<Trivia>;
}

/// Converts source text into a [`TokenStream`]
pub fn tokenize(
    syntax: SurfaceSyntax,
    keywords: &KeywordTable,
    src: &str,
) -> Result<TokenStream, LexError> {
    match syntax {
        SurfaceSyntax::CSharp => self::run(CSharpLexer::new(src, keywords)),
        SurfaceSyntax::VisualBasic => self::run(VbLexer::new(src, keywords)),
    }
}

fn run(mut lexer: impl Lexer) -> Result<TokenStream, LexError> {
    let mut stream = TokenStream::default();

    loop {
        let tk = lexer.read_next_token()?;
        let idx = TokenIdx::from(stream.tokens.len());
        stream
            .trivia
            .extend(lexer.take_trivia().into_iter().map(|tr| (idx, tr)));

        let is_eof = tk.kind == TokenKind::Eof;
        stream.tokens.push(tk);
        if is_eof {
            break;
        }
    }

    log::trace!(
        "lexed {} tokens, {} trivia pieces",
        stream.tokens.len(),
        stream.trivia.len()
    );
    Ok(stream)
}

pub(crate) fn is_ident_start(c: u8) -> bool {
    // non-ASCII bytes are treated as letters
    c.is_ascii_alphabetic() || c == b'_' || c >= 0x80
}

pub(crate) fn is_ident_body(c: u8) -> bool {
    self::is_ident_start(c) || c.is_ascii_digit()
}

fn is_digit_or_sep(c: u8) -> bool {
    c.is_ascii_digit() || c == b'_'
}

fn is_hex_digit_or_sep(c: u8) -> bool {
    c.is_ascii_hexdigit() || c == b'_'
}

/// Byte cursor over the UTF-8 source shared by the lexers
///
/// The source is treated as bytes. This is valid since we're only interested in ASCII characters
/// while lexing, and all of them are single byte in UTF-8.
#[derive(Debug)]
pub(crate) struct Scanner<'s> {
    pub src: &'s str,
    bytes: &'s [u8],
    /// Span of the token being scanned
    pub sp: Span,
    pub trivia: Vec<Trivia>,
}

/// Lexing utilities
impl<'s> Scanner<'s> {
    pub fn new(src: &'s str) -> Self {
        Self {
            src,
            bytes: src.as_bytes(),
            sp: Span::default(),
            trivia: Vec::new(),
        }
    }

    pub fn is_eof(&self) -> bool {
        self.sp.end.into_usize() >= self.bytes.len()
    }

    pub fn peek(&self) -> Option<u8> {
        self.peek_at(0)
    }

    pub fn peek_at(&self, n: usize) -> Option<u8> {
        self.bytes.get(self.sp.end.into_usize() + n).copied()
    }

    /// Byte just before the cursor
    pub fn prev_byte(&self) -> Option<u8> {
        let end = self.sp.end.into_usize();
        if end == 0 {
            None
        } else {
            self.bytes.get(end - 1).copied()
        }
    }

    pub fn rest(&self) -> &'s str {
        &self.src[self.sp.end.into_usize()..]
    }

    /// Text of the span being scanned
    pub fn current(&self) -> &'s str {
        self.sp.slice(self.src)
    }

    pub fn consume_span(&mut self) -> Span {
        let sp = self.sp;
        self.sp.start = self.sp.end;
        sp
    }

    pub fn consume_span_as(&mut self, kind: TokenKind) -> Token {
        let sp = self.consume_span();
        Token::new(kind, sp)
    }

    pub fn consume_trivia(&mut self, kind: TokenKind) {
        let span = self.consume_span();
        self.trivia.push(Trivia { kind, span });
    }

    pub fn advance(&mut self, n: u32) {
        self.sp.end += n;
    }

    /// Advances over one (possibly multi-byte) character
    pub fn advance_char(&mut self) -> Option<char> {
        let c = self.rest().chars().next()?;
        self.sp.end += c.len_utf8() as u32;
        Some(c)
    }

    pub fn advance_if(&mut self, p: impl Fn(u8) -> bool) -> Option<()> {
        let peek = self.peek()?;
        if p(peek) {
            self.sp.end += 1u32;
            Some(())
        } else {
            None
        }
    }

    /// The predicate returns if we should continue scanning reading a byte
    pub fn advance_while(&mut self, p: impl Fn(u8) -> bool) {
        while let Some(peek) = self.peek() {
            if !p(peek) {
                return;
            }
            self.sp.end += 1u32;
        }
    }

    /// Advances until (excluding) the given byte or the end of input
    pub fn advance_until_byte(&mut self, b: u8) {
        self.advance_while(|c| c != b);
    }

    pub fn starts_with(&self, s: &str) -> bool {
        self.bytes[self.sp.end.into_usize()..].starts_with(s.as_bytes())
    }

    pub fn starts_with_ignore_case(&self, s: &str) -> bool {
        let rest = &self.bytes[self.sp.end.into_usize()..];
        rest.len() >= s.len() && rest[..s.len()].eq_ignore_ascii_case(s.as_bytes())
    }
}

/// Shared grammars (&mut self → Option<Token>)
impl<'s> Scanner<'s> {
    /// Unrecognized character
    pub fn lex_error_char(&mut self) -> Token {
        self.advance_char();
        self.consume_span_as(TokenKind::Error)
    }

    /// `\r\n` or `\n`
    pub fn eat_newline(&mut self) -> bool {
        if self.starts_with("\r\n") {
            self.advance(2);
            true
        } else if self.peek() == Some(b'\n') {
            self.advance(1);
            true
        } else {
            false
        }
    }

    /// Longest match among punctuation symbols. The table is ordered longest first.
    pub fn lex_symbol(&mut self, table: &[(&str, TokenKind)]) -> Option<Token> {
        let (text, kind) = table.iter().find(|(s, _)| self.starts_with(s))?;
        self.advance(text.len() as u32);
        Some(self.consume_span_as(*kind))
    }

    /// Identifier or keyword. Boolean keywords carry their value.
    pub fn lex_word(&mut self, keywords: &KeywordTable) -> Option<Token> {
        self.advance_if(self::is_ident_start)?;
        self.advance_while(self::is_ident_body);

        let word = self.current();
        let kind = keywords.lookup(word).unwrap_or(TokenKind::Identifier);
        let tk = self.consume_span_as(kind);

        Some(match kind {
            TokenKind::True => tk.with_value(TokenValue::Boolean(true)),
            TokenKind::False => tk.with_value(TokenValue::Boolean(false)),
            _ => tk,
        })
    }

    /// `[0-9][0-9_]*(.[0-9]+)?([eE][+-]?[0-9]+)?<suffix>?`, also `.5`
    ///
    /// A `.` belongs to the number only when a digit follows it, so that `1.ToString()` lexes as
    /// a member access. A second decimal point is fatal.
    pub fn lex_decimal(
        &mut self,
        suffix_of: fn(&str) -> Option<NumberSuffix>,
    ) -> Result<Option<Token>, LexError> {
        let starts_with_dot =
            self.peek() == Some(b'.') && self.peek_at(1).map_or(false, |c| c.is_ascii_digit());
        if !starts_with_dot && !self.peek().map_or(false, |c| c.is_ascii_digit()) {
            return Ok(None);
        }

        let mut n_dots = 0;
        let mut is_real = false;
        loop {
            match self.peek() {
                Some(c) if self::is_digit_or_sep(c) => self.advance(1),
                Some(b'.') if self.peek_at(1).map_or(false, |c| c.is_ascii_digit()) => {
                    n_dots += 1;
                    self.advance(1);
                    if n_dots > 1 {
                        return Err(LexError::TooManyDecimalPoints { span: self.sp });
                    }
                    is_real = true;
                }
                _ => break,
            }
        }

        // exponent
        if matches!(self.peek(), Some(b'e' | b'E')) {
            let digit_at = if matches!(self.peek_at(1), Some(b'+' | b'-')) {
                2
            } else {
                1
            };
            if self.peek_at(digit_at).map_or(false, |c| c.is_ascii_digit()) {
                self.advance(digit_at as u32);
                self.advance_while(self::is_digit_or_sep);
                is_real = true;
            }
        }

        let digits_end = self.sp.end;
        self.advance_while(|c| c.is_ascii_alphabetic());
        let suffix_text = &self.src[digits_end.into_usize()..self.sp.end.into_usize()];

        let Some(suffix) = suffix_of(suffix_text) else {
            log::debug!("unknown number suffix `{suffix_text}`");
            return Ok(Some(self.consume_span_as(TokenKind::Error)));
        };

        let digits: String = self.src[self.sp.start.into_usize()..digits_end.into_usize()]
            .chars()
            .filter(|c| *c != '_')
            .collect();

        let is_real = is_real
            || matches!(
                suffix,
                NumberSuffix::Float | NumberSuffix::Double | NumberSuffix::Decimal
            );

        let value = if is_real {
            digits
                .parse::<f64>()
                .ok()
                .map(|value| TokenValue::Real { value, suffix })
        } else {
            digits
                .parse::<u64>()
                .ok()
                .map(|value| TokenValue::Integer { value, suffix })
        };

        let kind = if is_real {
            TokenKind::RealLiteral
        } else {
            TokenKind::IntegerLiteral
        };

        Ok(Some(match value {
            Some(value) => self.consume_span_as(kind).with_value(value),
            None => self.consume_span_as(TokenKind::Error),
        }))
    }

    /// Hex digits after a prefix of `prefix_len` bytes (`0x`, `&H`)
    pub fn lex_hex_body(
        &mut self,
        prefix_len: u32,
        suffix_of: fn(&str) -> Option<NumberSuffix>,
    ) -> Token {
        self.advance(prefix_len);
        let digits_start = self.sp.end;
        self.advance_while(self::is_hex_digit_or_sep);
        let digits_end = self.sp.end;
        self.advance_while(|c| c.is_ascii_alphabetic());

        let digits: String = self.src[digits_start.into_usize()..digits_end.into_usize()]
            .chars()
            .filter(|c| *c != '_')
            .collect();
        let suffix = suffix_of(&self.src[digits_end.into_usize()..self.sp.end.into_usize()]);

        match (u64::from_str_radix(&digits, 16), suffix) {
            (Ok(value), Some(suffix)) if !digits.is_empty() => self
                .consume_span_as(TokenKind::IntegerLiteral)
                .with_value(TokenValue::Integer { value, suffix }),
            _ => self.consume_span_as(TokenKind::Error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(syntax: SurfaceSyntax, src: &str) -> Vec<TokenKind> {
        let keywords = KeywordTable::new(syntax.data());
        let stream = self::tokenize(syntax, &keywords, src).unwrap();
        stream.kinds().collect()
    }

    #[test]
    fn keyword_vs_identifier() {
        use TokenKind as K;
        assert_eq!(kinds(SurfaceSyntax::CSharp, "abstract"), [K::Abstract, K::Eof]);
        assert_eq!(kinds(SurfaceSyntax::CSharp, "abstract1"), [K::Identifier, K::Eof]);
        assert_eq!(kinds(SurfaceSyntax::VisualBasic, "MustInherit"), [K::MustInherit, K::Eof]);
    }

    #[test]
    fn trivia_is_paired_with_next_token() {
        let keywords = KeywordTable::new(SurfaceSyntax::CSharp.data());
        let src = "a // c\n b";
        let stream = self::tokenize(SurfaceSyntax::CSharp, &keywords, src).unwrap();
        assert_eq!(stream.tokens.len(), 3);

        let leading = stream.leading_trivia(TokenIdx::from(1));
        let kinds: Vec<_> = leading.iter().map(|(_, tr)| tr.kind).collect();
        assert_eq!(
            kinds,
            [
                TokenKind::Whitespace,
                TokenKind::LineComment,
                TokenKind::NewLine,
                TokenKind::Whitespace
            ]
        );
        assert_eq!(leading[1].1.slice(src), "// c");
    }
}
