//! C#-like scanner

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
    ("??", K::QuestionQuestion),
    ("?.", K::QuestionDot),
    ("++", K::PlusPlus),
    ("--", K::MinusMinus),
    ("->", K::Arrow),
    ("=>", K::FatArrow),
    ("==", K::EqEq),
    ("!=", K::BangEq),
    ("<=", K::LtEq),
    (">=", K::GtEq),
    ("&&", K::AmpAmp),
    ("||", K::PipePipe),
    ("<<", K::LtLt),
    (">>", K::GtGt),
    ("+=", K::PlusEq),
    ("-=", K::MinusEq),
    ("*=", K::StarEq),
    ("/=", K::SlashEq),
    ("%=", K::PercentEq),
    ("^=", K::CaretEq),
    ("&=", K::AmpEq),
    ("|=", K::PipeEq),
    ("(", K::LParen),
    (")", K::RParen),
    ("{", K::LBrace),
    ("}", K::RBrace),
    ("[", K::LBracket),
    ("]", K::RBracket),
    (";", K::Semicolon),
    (",", K::Comma),
    (".", K::Dot),
    (":", K::Colon),
    ("?", K::Question),
    ("+", K::Plus),
    ("-", K::Minus),
    ("*", K::Star),
    ("/", K::Slash),
    ("%", K::Percent),
    ("^", K::Caret),
    ("&", K::Amp),
    ("|", K::Pipe),
    ("~", K::Tilde),
    ("!", K::Bang),
    ("=", K::Eq),
    ("<", K::Lt),
    (">", K::Gt),
];

/// `u`, `l`, `ul`, `f`, `d`, `m` in any case
fn suffix_of(s: &str) -> Option<NumberSuffix> {
    Some(match s.to_ascii_lowercase().as_str() {
        "" => NumberSuffix::None,
        "u" => NumberSuffix::UInteger,
        "l" => NumberSuffix::Long,
        "ul" | "lu" => NumberSuffix::ULong,
        "f" => NumberSuffix::Float,
        "d" => NumberSuffix::Double,
        "m" => NumberSuffix::Decimal,
        _ => return None,
    })
}

/// Scanner for the C#-like surface syntax
#[derive(Debug)]
pub struct CSharpLexer<'s, 'k> {
    sc: Scanner<'s>,
    keywords: &'k KeywordTable,
}

impl<'s, 'k> Lexer for CSharpLexer<'s, 'k> {
    fn read_next_token(&mut self) -> Result<Token, LexError> {
        while !self.sc.is_eof() {
            if self.lex_trivia()? {
                continue;
            }

            try_syntax!(
                self,
                lex_number,
                lex_verbatim_str,
                lex_str,
                lex_char,
                lex_escaped_ident,
                lex_word,
                lex_symbol,
            );

            return Ok(self.sc.lex_error_char());
        }

        Ok(self.sc.consume_span_as(K::Eof))
    }

    fn take_trivia(&mut self) -> Vec<Trivia> {
        std::mem::take(&mut self.sc.trivia)
    }
}

impl<'s, 'k> CSharpLexer<'s, 'k> {
    pub fn new(src: &'s str, keywords: &'k KeywordTable) -> Self {
        Self {
            sc: Scanner::new(src),
            keywords,
        }
    }

    /// White spaces, line breaks and comments. `/` is disambiguated by lookahead among `/`, `/=`,
    /// `//`, `///` and `/*`.
    fn lex_trivia(&mut self) -> Result<bool, LexError> {
        let sc = &mut self.sc;

        if sc.eat_newline() {
            sc.consume_trivia(K::NewLine);
            return Ok(true);
        }

        if sc.advance_if(|c| matches!(c, b' ' | b'\t' | b'\r' | b'\x0C')).is_some() {
            sc.advance_while(|c| matches!(c, b' ' | b'\t' | b'\r' | b'\x0C'));
            sc.consume_trivia(K::Whitespace);
            return Ok(true);
        }

        if sc.starts_with("//") {
            let kind = if sc.starts_with("///") && !sc.starts_with("////") {
                K::DocComment
            } else {
                K::LineComment
            };
            sc.advance_until_byte(b'\n');
            // keep `\r` of `\r\n` out of the comment
            if sc.prev_byte() == Some(b'\r') {
                sc.sp.end = sc.sp.end.into_usize().saturating_sub(1).into();
            }
            sc.consume_trivia(kind);
            return Ok(true);
        }

        if sc.starts_with("/*") {
            sc.advance(2);
            loop {
                if sc.is_eof() {
                    return Err(LexError::UnterminatedComment { span: sc.sp });
                }
                if sc.starts_with("*/") {
                    sc.advance(2);
                    break;
                }
                sc.advance_char();
            }
            sc.consume_trivia(K::BlockComment);
            return Ok(true);
        }

        Ok(false)
    }

    /// Decimal or `0x` hex
    fn lex_number(&mut self) -> Result<Option<Token>, LexError> {
        if self.sc.starts_with_ignore_case("0x") {
            return Ok(Some(self.sc.lex_hex_body(2, self::suffix_of)));
        }
        self.sc.lex_decimal(self::suffix_of)
    }

    /// `"..."` with backslash escapes
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
                Some(b'"') => {
                    self.sc.advance(1);
                    break;
                }
                Some(b'\\') => value.push(self.lex_escape()?),
                Some(_) => {
                    if let Some(c) = self.sc.advance_char() {
                        value.push(c);
                    }
                }
            }
        }

        Ok(Some(
            self.sc
                .consume_span_as(K::StringLiteral)
                .with_value(TokenValue::String(value)),
        ))
    }

    /// `@"..."` where `""` stands for a quote and line breaks are allowed
    fn lex_verbatim_str(&mut self) -> Result<Option<Token>, LexError> {
        if !self.sc.starts_with("@\"") {
            return Ok(None);
        }
        self.sc.advance(2);

        let mut value = String::new();
        loop {
            match self.sc.peek() {
                None => return Err(LexError::UnterminatedString { span: self.sc.sp }),
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

        Ok(Some(
            self.sc
                .consume_span_as(K::StringLiteral)
                .with_value(TokenValue::String(value)),
        ))
    }

    /// `'c'` or `'\n'`
    fn lex_char(&mut self) -> Result<Option<Token>, LexError> {
        if self.sc.advance_if(|c| c == b'\'').is_none() {
            return Ok(None);
        }

        let mut value = String::new();
        loop {
            match self.sc.peek() {
                None | Some(b'\n') => {
                    return Err(LexError::UnterminatedString { span: self.sc.sp });
                }
                Some(b'\'') => {
                    self.sc.advance(1);
                    break;
                }
                Some(b'\\') => value.push(self.lex_escape()?),
                Some(_) => {
                    if let Some(c) = self.sc.advance_char() {
                        value.push(c);
                    }
                }
            }
        }

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

    /// Escape table: `\n \r \t \0 \a \b \v \f \\ \' \"` and `\uXXXX`
    fn lex_escape(&mut self) -> Result<char, LexError> {
        let start = self.sc.sp.end;
        self.sc.advance(1);

        let c = match self.sc.peek() {
            Some(b'n') => '\n',
            Some(b'r') => '\r',
            Some(b't') => '\t',
            Some(b'0') => '\0',
            Some(b'a') => '\x07',
            Some(b'b') => '\x08',
            Some(b'v') => '\x0B',
            Some(b'f') => '\x0C',
            Some(b'\\') => '\\',
            Some(b'\'') => '\'',
            Some(b'"') => '"',
            Some(b'u') => {
                self.sc.advance(1);
                let hex = self.sc.rest().get(..4).unwrap_or("");
                let c = u32::from_str_radix(hex, 16)
                    .ok()
                    .filter(|_| hex.len() == 4)
                    .and_then(char::from_u32);
                let end = start + 2 + hex.len() as u32;
                return match c {
                    Some(c) => {
                        self.sc.advance(4);
                        Ok(c)
                    }
                    None => Err(LexError::InvalidEscape {
                        span: base::span::Span { start, end },
                    }),
                };
            }
            _ => {
                let end = self.sc.sp.end + 1;
                return Err(LexError::InvalidEscape {
                    span: base::span::Span { start, end },
                });
            }
        };

        self.sc.advance(1);
        Ok(c)
    }

    /// `@class`: a keyword used as an identifier
    fn lex_escaped_ident(&mut self) -> Result<Option<Token>, LexError> {
        if self.sc.peek() != Some(b'@') || !self.sc.peek_at(1).map_or(false, lex::is_ident_start)
        {
            return Ok(None);
        }
        self.sc.advance(1);
        self.sc.advance_while(lex::is_ident_body);
        Ok(Some(self.sc.consume_span_as(K::Identifier)))
    }

    fn lex_word(&mut self) -> Result<Option<Token>, LexError> {
        Ok(self.sc.lex_word(self.keywords))
    }

    fn lex_symbol(&mut self) -> Result<Option<Token>, LexError> {
        Ok(self.sc.lex_symbol(SYMBOLS))
    }
}

#[cfg(test)]
mod tests {
    use base::span::Span;

    use super::*;
    use crate::lang::SurfaceSyntax;

    fn lex(src: &str) -> Result<Vec<Token>, LexError> {
        let keywords = KeywordTable::new(SurfaceSyntax::CSharp.data());
        let stream = lex::tokenize(SurfaceSyntax::CSharp, &keywords, src)?;
        Ok(stream.tokens.into_iter().collect())
    }

    fn kinds(src: &str) -> Vec<K> {
        lex(src).unwrap().iter().map(|tk| tk.kind).collect()
    }

    #[test]
    fn numbers() {
        let tks = lex("1.5 10L 0x1F 2e3 .5 1.ToString").unwrap();
        assert_eq!(
            tks[0].value,
            Some(TokenValue::Real {
                value: 1.5,
                suffix: NumberSuffix::None
            })
        );
        assert_eq!(
            tks[1].value,
            Some(TokenValue::Integer {
                value: 10,
                suffix: NumberSuffix::Long
            })
        );
        assert_eq!(
            tks[2].value,
            Some(TokenValue::Integer {
                value: 31,
                suffix: NumberSuffix::None
            })
        );
        assert_eq!(tks[3].kind, K::RealLiteral);
        assert_eq!(tks[4].kind, K::RealLiteral);
        assert_eq!(tks[5].kind, K::IntegerLiteral);
        assert_eq!(tks[6].kind, K::Dot);
        assert_eq!(tks[7].kind, K::Identifier);
    }

    #[test]
    fn second_decimal_point_is_fatal() {
        assert_eq!(
            lex("1.2.3"),
            Err(LexError::TooManyDecimalPoints {
                span: Span::from(0u32, 4u32)
            })
        );
    }

    #[test]
    fn unknown_suffix_is_error_token() {
        assert_eq!(kinds("12qq"), [K::Error, K::Eof]);
    }

    #[test]
    fn strings_and_escapes() {
        let tks = lex(r#""a\tbA" @"c""d" '\n'"#).unwrap();
        assert_eq!(tks[0].value, Some(TokenValue::String("a\tbA".to_string())));
        assert_eq!(tks[1].value, Some(TokenValue::String("c\"d".to_string())));
        assert_eq!(tks[2].value, Some(TokenValue::Char('\n')));

        assert!(matches!(lex(r#""\q""#), Err(LexError::InvalidEscape { .. })));
        assert!(matches!(lex("\"abc"), Err(LexError::UnterminatedString { .. })));
    }

    #[test]
    fn slash_disambiguation() {
        let keywords = KeywordTable::new(SurfaceSyntax::CSharp.data());
        let stream =
            lex::tokenize(SurfaceSyntax::CSharp, &keywords, "a / b /= c // x\n/// d\n/* e */").unwrap();
        let kinds: Vec<_> = stream.kinds().collect();
        assert_eq!(
            kinds,
            [K::Identifier, K::Slash, K::Identifier, K::SlashEq, K::Identifier, K::Eof]
        );
        let trivia: Vec<_> = stream
            .trivia
            .iter()
            .map(|(_, tr)| tr.kind)
            .filter(|k| k.is_comment())
            .collect();
        assert_eq!(trivia, [K::LineComment, K::DocComment, K::BlockComment]);
    }

    #[test]
    fn longest_symbol_match() {
        assert_eq!(
            kinds("a <<= b ?? c?.d ++ ->"),
            [
                K::Identifier,
                K::LtLtEq,
                K::Identifier,
                K::QuestionQuestion,
                K::Identifier,
                K::QuestionDot,
                K::Identifier,
                K::PlusPlus,
                K::Arrow,
                K::Eof
            ]
        );
        assert_eq!(kinds("#"), [K::Error, K::Eof]);
    }

    #[test]
    fn escaped_identifier_and_contextual_keyword() {
        assert_eq!(kinds("@class get"), [K::Identifier, K::Get, K::Eof]);
        assert_eq!(
            lex("true").unwrap()[0].value,
            Some(TokenValue::Boolean(true))
        );
    }
}
