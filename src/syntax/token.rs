//! Tokens: numeric token codes shared by the lexers, the grammar and the AST

use base::span::Span;
use typed_index_collections::TiVec;

/// Numeric token code
///
/// The codes are shared by both surface syntaxes. A word that is a keyword in both languages
/// (`class`, `Class`) maps to the same code; a surface syntax simply never produces the codes it
/// has no keyword for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u16)]
pub enum TokenKind {
    // ----------------------------------------
    // Trivia
    // ----------------------------------------
    Whitespace,
    /// Line break. Trivia in C#, statement terminator in VB
    NewLine,
    /// `// ..` or `' ..`
    LineComment,
    /// `/// ..` or `''' ..`
    DocComment,
    /// `/* .. */`
    BlockComment,
    /// VB ` _` at the end of a line
    LineContinuation,

    // ----------------------------------------
    // Special
    // ----------------------------------------
    Eof,
    /// Unrecognized input
    Error,
    Identifier,
    IntegerLiteral,
    RealLiteral,
    StringLiteral,
    CharLiteral,

    // ----------------------------------------
    // Punctuation and operators
    // ----------------------------------------
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `{`
    LBrace,
    /// `}`
    RBrace,
    /// `[`
    LBracket,
    /// `]`
    RBracket,
    /// `;`
    Semicolon,
    /// `,`
    Comma,
    /// `.`
    Dot,
    /// `:`
    Colon,
    /// `?`
    Question,
    /// `?.`
    QuestionDot,
    /// `??`
    QuestionQuestion,
    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `*`
    Star,
    /// `/`
    Slash,
    /// `%`
    Percent,
    /// `\`
    Backslash,
    /// `^`
    Caret,
    /// `&`
    Amp,
    /// `|`
    Pipe,
    /// `~`
    Tilde,
    /// `!`
    Bang,
    /// `=`
    Eq,
    /// `==`
    EqEq,
    /// `!=`
    BangEq,
    /// `<>`
    LtGt,
    /// `<`
    Lt,
    /// `>`
    Gt,
    /// `<=`
    LtEq,
    /// `>=`
    GtEq,
    /// `&&`
    AmpAmp,
    /// `||`
    PipePipe,
    /// `++`
    PlusPlus,
    /// `--`
    MinusMinus,
    /// `<<`
    LtLt,
    /// `>>`
    GtGt,
    /// `+=`
    PlusEq,
    /// `-=`
    MinusEq,
    /// `*=`
    StarEq,
    /// `/=`
    SlashEq,
    /// `%=`
    PercentEq,
    /// `\=`
    BackslashEq,
    /// `^=`
    CaretEq,
    /// `&=`
    AmpEq,
    /// `|=`
    PipeEq,
    /// `<<=`
    LtLtEq,
    /// `>>=`
    GtGtEq,
    /// `->`
    Arrow,
    /// `=>`
    FatArrow,

    // ----------------------------------------
    // Keywords (both syntaxes)
    // ----------------------------------------
    Abstract,
    As,
    Base,
    Bool,
    Break,
    Byte,
    Case,
    Catch,
    Char,
    Class,
    Const,
    Continue,
    Decimal,
    Default,
    Do,
    Double,
    Else,
    Enum,
    Event,
    Extern,
    False,
    Finally,
    Fixed,
    Float,
    For,
    Foreach,
    If,
    In,
    Int,
    Interface,
    Internal,
    Is,
    Lock,
    Long,
    Namespace,
    New,
    Null,
    Object,
    Out,
    Override,
    Params,
    Private,
    Protected,
    Public,
    Readonly,
    Ref,
    Return,
    SByte,
    Sealed,
    Short,
    Static,
    String,
    Struct,
    Switch,
    This,
    Throw,
    True,
    Try,
    TypeOf,
    UInt,
    ULong,
    UShort,
    Unsafe,
    Using,
    Virtual,
    Void,
    Volatile,
    While,

    // VB only
    And,
    AndAlso,
    Boolean,
    ByRef,
    ByVal,
    CType,
    Dim,
    DirectCast,
    Each,
    ElseIf,
    End,
    Exit,
    Friend,
    Function,
    GetType,
    Implements,
    Imports,
    Inherits,
    Integer,
    IsNot,
    Loop,
    Me,
    Mod,
    Module,
    MustInherit,
    MustOverride,
    MyBase,
    Next,
    Not,
    NotInheritable,
    NotOverridable,
    Nothing,
    Optional,
    Or,
    OrElse,
    Overridable,
    Overrides,
    ParamArray,
    Property,
    Select,
    Shadows,
    Shared,
    Single,
    Step,
    Structure,
    Sub,
    SyncLock,
    Then,
    To,
    TryCast,
    UInteger,
    Until,
    WriteOnly,
    Xor,

    // ----------------------------------------
    // Contextual keywords (valid identifiers)
    // ----------------------------------------
    Get,
    Set,
    Value,
    Var,
    Partial,
    Add,
    Remove,

    /// Sentinel, not a token
    LAST,
}

impl TokenKind {
    pub fn code(self) -> u16 {
        self as u16
    }

    pub fn from_code(code: u16) -> Option<Self> {
        if code < TokenKind::LAST as u16 {
            // SAFETY: `TokenKind` is `repr(u16)` with contiguous discriminants below `LAST`
            Some(unsafe { std::mem::transmute::<u16, TokenKind>(code) })
        } else {
            None
        }
    }

    #[inline]
    pub fn is_trivia(self) -> bool {
        matches!(
            self,
            TokenKind::Whitespace
                | TokenKind::NewLine
                | TokenKind::LineComment
                | TokenKind::DocComment
                | TokenKind::BlockComment
                | TokenKind::LineContinuation
        )
    }

    pub fn is_comment(self) -> bool {
        matches!(
            self,
            TokenKind::LineComment | TokenKind::DocComment | TokenKind::BlockComment
        )
    }

    pub fn is_literal(self) -> bool {
        matches!(
            self,
            TokenKind::IntegerLiteral
                | TokenKind::RealLiteral
                | TokenKind::StringLiteral
                | TokenKind::CharLiteral
        )
    }

    pub fn is_keyword(self) -> bool {
        self >= TokenKind::Abstract && self < TokenKind::LAST
    }

    /// Fixed spelling of punctuation and operator tokens
    pub fn punct_text(self) -> Option<&'static str> {
        use TokenKind as K;
        Some(match self {
            K::LParen => "(",
            K::RParen => ")",
            K::LBrace => "{",
            K::RBrace => "}",
            K::LBracket => "[",
            K::RBracket => "]",
            K::Semicolon => ";",
            K::Comma => ",",
            K::Dot => ".",
            K::Colon => ":",
            K::Question => "?",
            K::QuestionDot => "?.",
            K::QuestionQuestion => "??",
            K::Plus => "+",
            K::Minus => "-",
            K::Star => "*",
            K::Slash => "/",
            K::Percent => "%",
            K::Backslash => "\\",
            K::Caret => "^",
            K::Amp => "&",
            K::Pipe => "|",
            K::Tilde => "~",
            K::Bang => "!",
            K::Eq => "=",
            K::EqEq => "==",
            K::BangEq => "!=",
            K::LtGt => "<>",
            K::Lt => "<",
            K::Gt => ">",
            K::LtEq => "<=",
            K::GtEq => ">=",
            K::AmpAmp => "&&",
            K::PipePipe => "||",
            K::PlusPlus => "++",
            K::MinusMinus => "--",
            K::LtLt => "<<",
            K::GtGt => ">>",
            K::PlusEq => "+=",
            K::MinusEq => "-=",
            K::StarEq => "*=",
            K::SlashEq => "/=",
            K::PercentEq => "%=",
            K::BackslashEq => "\\=",
            K::CaretEq => "^=",
            K::AmpEq => "&=",
            K::PipeEq => "|=",
            K::LtLtEq => "<<=",
            K::GtGtEq => ">>=",
            K::Arrow => "->",
            K::FatArrow => "=>",
            _ => return None,
        })
    }
}

impl From<TokenKind> for rowan::SyntaxKind {
    fn from(kind: TokenKind) -> Self {
        Self(kind as u16)
    }
}

/// Type suffix of a numeric literal, normalized across surface syntaxes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum NumberSuffix {
    #[default]
    None,
    Short,
    UShort,
    Integer,
    UInteger,
    Long,
    ULong,
    Float,
    Double,
    Decimal,
}

/// Interpreted value of a literal token
#[derive(Debug, Clone, PartialEq)]
pub enum TokenValue {
    Integer { value: u64, suffix: NumberSuffix },
    Real { value: f64, suffix: NumberSuffix },
    String(String),
    Char(char),
    Boolean(bool),
}

/// Text span with token code and, for literals, the interpreted value
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    pub value: Option<TokenValue>,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self {
            kind,
            span,
            value: None,
        }
    }

    pub fn with_value(mut self, value: TokenValue) -> Self {
        self.value = Some(value);
        self
    }

    pub fn slice<'s>(&self, src: &'s str) -> &'s str {
        self.span.slice(src)
    }
}

/// Comments, line breaks and white spaces, kept out of the token stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Trivia {
    pub kind: TokenKind,
    pub span: Span,
}

impl Trivia {
    pub fn slice<'s>(&self, src: &'s str) -> &'s str {
        self.span.slice(src)
    }
}

/// Index into [`TokenStream::tokens`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TokenIdx(usize);

impl From<usize> for TokenIdx {
    fn from(x: usize) -> Self {
        Self(x)
    }
}

impl From<TokenIdx> for usize {
    fn from(x: TokenIdx) -> Self {
        x.0
    }
}

/// Output of a lexer: significant tokens plus the trivia side channel
#[derive(Debug, Clone, Default)]
pub struct TokenStream {
    /// Always ends with an [`TokenKind::Eof`] token
    pub tokens: TiVec<TokenIdx, Token>,
    /// Trivia pieces paired with the token they precede
    pub trivia: Vec<(TokenIdx, Trivia)>,
}

impl TokenStream {
    /// Trivia pieces preceding the given token, in source order
    pub fn leading_trivia(&self, tk: TokenIdx) -> &[(TokenIdx, Trivia)] {
        let lo = self.trivia.partition_point(|(i, _)| *i < tk);
        let hi = self.trivia.partition_point(|(i, _)| *i <= tk);
        &self.trivia[lo..hi]
    }

    pub fn kinds(&self) -> impl Iterator<Item = TokenKind> + '_ {
        self.tokens.iter().map(|tk| tk.kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_round_trip() {
        for code in 0..TokenKind::LAST.code() {
            let kind = TokenKind::from_code(code).unwrap();
            assert_eq!(kind.code(), code);
        }
        assert_eq!(TokenKind::from_code(TokenKind::LAST.code()), None);
    }

    #[test]
    fn keyword_range() {
        assert!(TokenKind::Class.is_keyword());
        assert!(TokenKind::Get.is_keyword());
        assert!(!TokenKind::Identifier.is_keyword());
        assert!(!TokenKind::FatArrow.is_keyword());
    }
}
