//! VB-like scanner
//!
//! Line breaks are statement terminators here. A run of line breaks yields one
//! [`TokenKind::NewLine`](K::NewLine) token; line breaks that can't end a statement (at the start
//! of the input, after another terminator, after an explicit ` _` continuation, after a token that
//! implies continuation, or before a closing bracket) go to the trivia channel.

use crate::{
    lang::KeywordTable,
    syntax::{
        lex::{self, LexError, Lexer, Scanner},
        token::{NumberSuffix, Token, TokenKind as K, TokenValue, Trivia},
    },
};

/// Ordered longest first
static SYMBOLS: &[(&str, K)] = &[
    ("<<=", K::LtLtEq),
    (">>=", K::GtGtEq),
    ("<>", K::LtGt),
    ("<=", K::LtEq),
    (">=", K::GtEq),
    ("<<", K::LtLt),
    (">>", K::GtGt),
    ("+=", K::PlusEq),
    ("-=", K::MinusEq),
    ("*=", K::StarEq),
    ("/=", K::SlashEq),
    ("\\=", K::BackslashEq),
    ("^=", K::CaretEq),
    ("&=", K::AmpEq),
    ("?.", K::QuestionDot),
    ("(", K::LParen),
    (")", K::RParen),
    ("{", K::LBrace),
    ("}", K::RBrace),
    (",", K::Comma),
    (".", K::Dot),
    (":", K::Colon),
    ("?", K::Question),
    ("+", K::Plus),
    ("-", K::Minus),
    ("*", K::Star),
    ("/", K::Slash),
    ("\\", K::Backslash),
    ("^", K::Caret),
    ("&", K::Amp),
    ("=", K::Eq),
    ("<", K::Lt),
    (">", K::Gt),
    ("!", K::Bang),
];

/// `S`, `US`, `I`, `UI`, `L`, `UL`, `F`, `R`, `D` in any case
fn suffix_of(s: &str) -> Option<NumberSuffix> {
    Some(match s.to_ascii_lowercase().as_str() {
        "" => NumberSuffix::None,
        "s" => NumberSuffix::Short,
        "us" => NumberSuffix::UShort,
        "i" => NumberSuffix::Integer,
        "ui" => NumberSuffix::UInteger,
        "l" => NumberSuffix::Long,
        "ul" => NumberSuffix::ULong,
        "f" => NumberSuffix::Float,
        "r" => NumberSuffix::Double,
        "d" => NumberSuffix::Decimal,
        _ => return None,
    })
}

/// Tokens after which a line break continues the statement
fn continues_line(kind: K) -> bool {
    matches!(
        kind,
        K::Comma
            | K::LParen
            | K::LBrace
            | K::Dot
            | K::Eq
            | K::LtGt
            | K::Lt
            | K::Gt
            | K::LtEq
            | K::GtEq
            | K::Plus
            | K::Minus
            | K::Star
            | K::Slash
            | K::Backslash
            | K::Caret
            | K::Amp
            | K::LtLt
            | K::GtGt
            | K::PlusEq
            | K::MinusEq
            | K::StarEq
            | K::SlashEq
            | K::BackslashEq
            | K::CaretEq
            | K::AmpEq
            | K::LtLtEq
            | K::GtGtEq
            | K::And
            | K::AndAlso
            | K::Or
            | K::OrElse
            | K::Xor
            | K::Mod
            | K::Is
            | K::IsNot
            | K::Colon
            | K::NewLine
    )
}

/// Scanner for the VB-like surface syntax
#[derive(Debug)]
pub struct VbLexer<'s, 'k> {
    sc: Scanner<'s>,
    keywords: &'k KeywordTable,
    /// Last significant token kind
    prev: Option<K>,
}

impl<'s, 'k> Lexer for VbLexer<'s, 'k> {
    fn read_next_token(&mut self) -> Result<Token, LexError> {
        let tk = self.read_next_token_impl()?;
        self.prev = Some(tk.kind);
        Ok(tk)
    }

    fn take_trivia(&mut self) -> Vec<Trivia> {
        std::mem::take(&mut self.sc.trivia)
    }
}

impl<'s, 'k> VbLexer<'s, 'k> {
    pub fn new(src: &'s str, keywords: &'k KeywordTable) -> Self {
        Self {
            sc: Scanner::new(src),
            keywords,
            prev: None,
        }
    }

    fn read_next_token_impl(&mut self) -> Result<Token, LexError> {
        while !self.sc.is_eof() {
            if self.lex_trivia() {
                continue;
            }

            try_syntax!(
                self,
                lex_newline,
                lex_number,
                lex_str,
                lex_escaped_ident,
                lex_word,
                lex_symbol,
            );

            return Ok(self.sc.lex_error_char());
        }

        Ok(self.sc.consume_span_as(K::Eof))
    }

    fn lex_trivia(&mut self) -> bool {
        let sc = &mut self.sc;

        if sc.advance_if(|c| matches!(c, b' ' | b'\t' | b'\r')).is_some() {
            sc.advance_while(|c| matches!(c, b' ' | b'\t' | b'\r'));
            sc.consume_trivia(K::Whitespace);
            return true;
        }

        // ` _` + line break
        if sc.peek() == Some(b'_')
            && matches!(sc.prev_byte(), Some(b' ' | b'\t'))
            && self::only_spaces_until_newline(&sc.rest()[1..])
        {
            sc.advance(1);
            sc.advance_while(|c| matches!(c, b' ' | b'\t' | b'\r'));
            sc.eat_newline();
            sc.consume_trivia(K::LineContinuation);
            return true;
        }

        if sc.peek() == Some(b'\'') {
            let kind = if sc.starts_with("'''") {
                K::DocComment
            } else {
                K::LineComment
            };
            self::comment_to_line_end(sc, kind);
            return true;
        }

        if sc.starts_with_ignore_case("rem")
            && !sc.peek_at(3).map_or(false, lex::is_ident_body)
        {
            self::comment_to_line_end(sc, K::LineComment);
            return true;
        }

        // line breaks that don't terminate a statement
        if matches!(sc.peek(), Some(b'\n')) || sc.starts_with("\r\n") {
            let continues = self.prev.map_or(true, self::continues_line)
                || self::closes_bracket(self.sc.rest());
            if continues {
                self.sc.eat_newline();
                self.sc.consume_trivia(K::NewLine);
                return true;
            }
        }

        false
    }

    /// Statement terminator
    fn lex_newline(&mut self) -> Result<Option<Token>, LexError> {
        if self.sc.eat_newline() {
            Ok(Some(self.sc.consume_span_as(K::NewLine)))
        } else {
            Ok(None)
        }
    }

    /// Decimal or `&H` hex
    fn lex_number(&mut self) -> Result<Option<Token>, LexError> {
        if self.sc.starts_with_ignore_case("&h")
            && self.sc.peek_at(2).map_or(false, |c| c.is_ascii_hexdigit())
        {
            return Ok(Some(self.sc.lex_hex_body(2, self::suffix_of)));
        }
        self.sc.lex_decimal(self::suffix_of)
    }

    /// `"..."` where `""` stands for a quote, or `"c"c` for a character
    fn lex_str(&mut self) -> Result<Option<Token>, LexError> {
        if self.sc.advance_if(|c| c == b'"').is_none() {
            return Ok(None);
        }

        let mut value = String::new();
        loop {
            match self.sc.peek() {
                None | Some(b'\n') => {
                    return Err(LexError::UnterminatedString { span: self.sc.sp });
                }
                Some(b'"') if self.sc.peek_at(1) == Some(b'"') => {
                    self.sc.advance(2);
                    value.push('"');
                }
                Some(b'"') => {
                    self.sc.advance(1);
                    break;
                }
                Some(_) => {
                    if let Some(c) = self.sc.advance_char() {
                        value.push(c);
                    }
                }
            }
        }

        let is_char = matches!(self.sc.peek(), Some(b'c' | b'C'))
            && !self.sc.peek_at(1).map_or(false, lex::is_ident_body);
        if !is_char {
            return Ok(Some(
                self.sc
                    .consume_span_as(K::StringLiteral)
                    .with_value(TokenValue::String(value)),
            ));
        }

        self.sc.advance(1);
        let mut chars = value.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Ok(Some(
                self.sc
                    .consume_span_as(K::CharLiteral)
                    .with_value(TokenValue::Char(c)),
            )),
            _ => Err(LexError::InvalidCharLiteral { span: self.sc.sp }),
        }
    }

    /// `[Class]`: a keyword used as an identifier
    fn lex_escaped_ident(&mut self) -> Result<Option<Token>, LexError> {
        if self.sc.peek() != Some(b'[') || !self.sc.peek_at(1).map_or(false, lex::is_ident_start) {
            return Ok(None);
        }
        self.sc.advance(1);
        self.sc.advance_while(lex::is_ident_body);
        if self.sc.advance_if(|c| c == b']').is_none() {
            return Ok(Some(self.sc.consume_span_as(K::Error)));
        }
        Ok(Some(self.sc.consume_span_as(K::Identifier)))
    }

    fn lex_word(&mut self) -> Result<Option<Token>, LexError> {
        Ok(self.sc.lex_word(self.keywords))
    }

    fn lex_symbol(&mut self) -> Result<Option<Token>, LexError> {
        Ok(self.sc.lex_symbol(SYMBOLS))
    }
}

fn comment_to_line_end(sc: &mut Scanner, kind: K) {
    sc.advance_until_byte(b'\n');
    if sc.prev_byte() == Some(b'\r') {
        sc.sp.end = sc.sp.end.into_usize().saturating_sub(1).into();
    }
    sc.consume_trivia(kind);
}

fn only_spaces_until_newline(s: &str) -> bool {
    s.bytes()
        .find(|c| !matches!(c, b' ' | b'\t' | b'\r'))
        .map_or(true, |c| c == b'\n')
}

/// Whether the next significant character after the line break(s) is `)` or `}`
fn closes_bracket(s: &str) -> bool {
    s.bytes()
        .find(|c| !c.is_ascii_whitespace())
        .map_or(false, |c| matches!(c, b')' | b'}'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lang::SurfaceSyntax;

    fn lex(src: &str) -> Result<Vec<Token>, LexError> {
        let keywords = KeywordTable::new(SurfaceSyntax::VisualBasic.data());
        let stream = lex::tokenize(SurfaceSyntax::VisualBasic, &keywords, src)?;
        Ok(stream.tokens.into_iter().collect())
    }

    fn kinds(src: &str) -> Vec<K> {
        lex(src).unwrap().iter().map(|tk| tk.kind).collect()
    }

    #[test]
    fn keywords_ignore_case() {
        assert_eq!(kinds("DIM x aS iNTEGER"), [K::Dim, K::Identifier, K::As, K::Integer, K::Eof]);
    }

    #[test]
    fn newline_runs_collapse() {
        assert_eq!(
            kinds("\n\na = 1\n\n\nb = 2\n"),
            [
                K::Identifier,
                K::Eq,
                K::IntegerLiteral,
                K::NewLine,
                K::Identifier,
                K::Eq,
                K::IntegerLiteral,
                K::NewLine,
                K::Eof
            ]
        );
    }

    #[test]
    fn continuation() {
        // explicit
        assert_eq!(
            kinds("a = 1 _\n + 2"),
            [K::Identifier, K::Eq, K::IntegerLiteral, K::Plus, K::IntegerLiteral, K::Eof]
        );
        // implicit, after `,` and `(` and before `)`
        assert_eq!(
            kinds("f(a,\n b\n)"),
            [K::Identifier, K::LParen, K::Identifier, K::Comma, K::Identifier, K::RParen, K::Eof]
        );
        // identifiers may contain underscores
        assert_eq!(kinds("a_b"), [K::Identifier, K::Eof]);
    }

    #[test]
    fn comments() {
        let keywords = KeywordTable::new(SurfaceSyntax::VisualBasic.data());
        let src = "' c\nREM d\n''' e\nremark = 1";
        let stream = lex::tokenize(SurfaceSyntax::VisualBasic, &keywords, src).unwrap();
        let comments: Vec<_> = stream
            .trivia
            .iter()
            .map(|(_, tr)| tr.kind)
            .filter(|k| k.is_comment())
            .collect();
        assert_eq!(comments, [K::LineComment, K::LineComment, K::DocComment]);
        assert_eq!(
            stream.kinds().collect::<Vec<_>>(),
            [K::Identifier, K::Eq, K::IntegerLiteral, K::Eof]
        );
    }

    #[test]
    fn strings_chars_and_hex() {
        let tks = lex(r#""say ""hi""" "x"c &HFF 1.5R 3D"#).unwrap();
        assert_eq!(tks[0].value, Some(TokenValue::String("say \"hi\"".to_string())));
        assert_eq!(tks[1].value, Some(TokenValue::Char('x')));
        assert_eq!(
            tks[2].value,
            Some(TokenValue::Integer {
                value: 255,
                suffix: NumberSuffix::None
            })
        );
        assert_eq!(
            tks[3].value,
            Some(TokenValue::Real {
                value: 1.5,
                suffix: NumberSuffix::Double
            })
        );
        assert_eq!(
            tks[4].value,
            Some(TokenValue::Real {
                value: 3.0,
                suffix: NumberSuffix::Decimal
            })
        );
        assert!(matches!(lex(r#""ab"c"#), Err(LexError::InvalidCharLiteral { .. })));
    }

    #[test]
    fn escaped_identifier_and_separators() {
        assert_eq!(
            kinds("[Class] = 1 : x = 2"),
            [
                K::Identifier,
                K::Eq,
                K::IntegerLiteral,
                K::Colon,
                K::Identifier,
                K::Eq,
                K::IntegerLiteral,
                K::Eof
            ]
        );
        assert_eq!(kinds(";"), [K::Error, K::Eof]);
    }
}
