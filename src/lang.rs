//! Surface syntaxes and the caller-owned language descriptor
//!
//! A [`Language`] bundles everything one surface syntax needs: its keyword table, its grammar
//! and its writer. It is built once by the caller and passed around by reference; nothing here
//! is process-wide state.

pub mod csharp;
pub mod vb;

use std::fmt;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::{
    ast::{kind::Modifier, Ast, NodeId},
    grammar::Grammar,
    syntax::{
        self,
        lex::{self, LexError},
        token::{TokenKind, TokenStream},
        Fragment, ParseError, ParseResult,
    },
    write::{self, options::FormattingOptions, WriteError},
};

/// One concrete source language targeting the shared AST
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SurfaceSyntax {
    #[serde(rename = "cs")]
    CSharp,
    #[serde(rename = "vb")]
    VisualBasic,
}

impl SurfaceSyntax {
    pub fn data(self) -> &'static LanguageData {
        match self {
            SurfaceSyntax::CSharp => &csharp::DATA,
            SurfaceSyntax::VisualBasic => &vb::DATA,
        }
    }

    /// Conventional file extension
    pub fn extension(self) -> &'static str {
        match self {
            SurfaceSyntax::CSharp => "cs",
            SurfaceSyntax::VisualBasic => "vb",
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "cs" => Some(SurfaceSyntax::CSharp),
            "vb" => Some(SurfaceSyntax::VisualBasic),
            _ => None,
        }
    }
}

impl fmt::Display for SurfaceSyntax {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.data().name)
    }
}

/// Static keyword / modifier / member-identifier lists of a surface syntax
#[derive(Debug)]
pub struct LanguageData {
    pub name: &'static str,
    pub case_sensitive: bool,
    /// Reserved words. They can't be used as identifiers without escaping.
    pub keywords: &'static [(&'static str, TokenKind)],
    /// Declaration modifiers and their canonical spellings
    pub modifiers: &'static [(&'static str, Modifier)],
    /// Contextual words: keywords in some positions, plain identifiers elsewhere
    pub member_identifiers: &'static [(&'static str, TokenKind)],
}

impl LanguageData {
    /// Canonical spelling of a keyword token, e.g. `TokenKind::Class` -> `"Class"` in VB
    pub fn keyword_text(&self, kind: TokenKind) -> Option<&'static str> {
        self.keywords
            .iter()
            .chain(self.member_identifiers.iter())
            .find(|(_, k)| *k == kind)
            .map(|(s, _)| *s)
    }

    /// First spelling registered for a modifier
    pub fn modifier_text(&self, modifier: Modifier) -> Option<&'static str> {
        self.modifiers
            .iter()
            .find(|(_, m)| *m == modifier)
            .map(|(s, _)| *s)
    }
}

/// Word to keyword code lookup, honouring the case sensitivity of the surface syntax
#[derive(Debug, Clone)]
pub struct KeywordTable {
    case_sensitive: bool,
    reserved: FxHashMap<String, TokenKind>,
    contextual: FxHashMap<String, TokenKind>,
}

impl KeywordTable {
    pub fn new(data: &LanguageData) -> Self {
        let key = |s: &str| self::normalize(data.case_sensitive, s);

        Self {
            case_sensitive: data.case_sensitive,
            reserved: data.keywords.iter().map(|(s, k)| (key(s), *k)).collect(),
            contextual: data
                .member_identifiers
                .iter()
                .map(|(s, k)| (key(s), *k))
                .collect(),
        }
    }

    pub fn is_case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    /// Token code for a word: a keyword, a contextual keyword, or `None` for plain identifiers
    pub fn lookup(&self, word: &str) -> Option<TokenKind> {
        let word = self::normalize(self.case_sensitive, word);
        self.reserved
            .get(word.as_str())
            .or_else(|| self.contextual.get(word.as_str()))
            .copied()
    }

    /// Whether the word needs escaping to be used as an identifier
    pub fn is_reserved(&self, word: &str) -> bool {
        let word = self::normalize(self.case_sensitive, word);
        self.reserved.contains_key(word.as_str())
    }

    /// Whether two identifiers name the same thing
    pub fn same_name(&self, a: &str, b: &str) -> bool {
        if self.case_sensitive {
            a == b
        } else {
            a.eq_ignore_ascii_case(b)
        }
    }
}

fn normalize(case_sensitive: bool, s: &str) -> String {
    if case_sensitive {
        s.to_string()
    } else {
        s.to_ascii_lowercase()
    }
}

/// Caller-owned surface syntax descriptor: keyword table + grammar
#[derive(Debug)]
pub struct Language {
    syntax: SurfaceSyntax,
    keywords: KeywordTable,
    grammar: Grammar,
}

impl Language {
    /// Builds the descriptor, including the grammar. Build it once and reuse it.
    pub fn new(syntax: SurfaceSyntax) -> Self {
        let grammar = match syntax {
            SurfaceSyntax::CSharp => crate::grammar::csharp::build(),
            SurfaceSyntax::VisualBasic => crate::grammar::vb::build(),
        };
        log::debug!("built {} grammar ({} elements)", syntax, grammar.len());

        Self {
            syntax,
            keywords: KeywordTable::new(syntax.data()),
            grammar,
        }
    }

    pub fn csharp() -> Self {
        Self::new(SurfaceSyntax::CSharp)
    }

    pub fn visual_basic() -> Self {
        Self::new(SurfaceSyntax::VisualBasic)
    }

    pub fn syntax(&self) -> SurfaceSyntax {
        self.syntax
    }

    pub fn data(&self) -> &'static LanguageData {
        self.syntax.data()
    }

    pub fn keywords(&self) -> &KeywordTable {
        &self.keywords
    }

    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    pub fn tokenize(&self, src: &str) -> Result<TokenStream, LexError> {
        lex::tokenize(self.syntax, &self.keywords, src)
    }

    /// Parses a whole compilation unit
    pub fn parse(&self, src: &str) -> Result<ParseResult, ParseError> {
        syntax::parse(self, Fragment::CompilationUnit, src)
    }

    /// Parses a fragment such as a single statement or expression
    pub fn parse_fragment(&self, fragment: Fragment, src: &str) -> Result<ParseResult, ParseError> {
        syntax::parse(self, fragment, src)
    }

    /// Prints the subtree rooted at `root` in this surface syntax
    pub fn write(
        &self,
        ast: &Ast,
        root: NodeId,
        options: &FormattingOptions,
    ) -> Result<String, WriteError> {
        write::write(self.syntax, &self.keywords, ast, root, options)
    }

    /// Default formatting options of this surface syntax
    pub fn default_options(&self) -> FormattingOptions {
        FormattingOptions::for_syntax(self.syntax)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn case_insensitive_lookup() {
        let vb = KeywordTable::new(SurfaceSyntax::VisualBasic.data());
        assert_eq!(vb.lookup("CLASS"), Some(TokenKind::Class));
        assert_eq!(vb.lookup("class"), Some(TokenKind::Class));
        assert!(vb.same_name("Foo", "fOO"));

        let cs = KeywordTable::new(SurfaceSyntax::CSharp.data());
        assert_eq!(cs.lookup("class"), Some(TokenKind::Class));
        assert_eq!(cs.lookup("Class"), None);
        assert!(!cs.same_name("Foo", "fOO"));
    }

    #[test]
    fn contextual_words_are_not_reserved() {
        let cs = KeywordTable::new(SurfaceSyntax::CSharp.data());
        assert_eq!(cs.lookup("get"), Some(TokenKind::Get));
        assert!(!cs.is_reserved("get"));
        assert!(cs.is_reserved("abstract"));
    }

    #[test]
    fn spellings() {
        let vb = SurfaceSyntax::VisualBasic.data();
        assert_eq!(vb.keyword_text(TokenKind::Integer), Some("Integer"));
        assert_eq!(vb.modifier_text(Modifier::Static), Some("Shared"));
        let cs = SurfaceSyntax::CSharp.data();
        assert_eq!(cs.modifier_text(Modifier::Internal), Some("internal"));
    }
}
