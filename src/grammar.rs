//! Declarative grammars and lowering into the AST
//!
//! A [`Grammar`] is a graph of [`Rule`]s over terminal ([`TokenGrammarElement`]) and non-terminal
//! ([`GrammarDefinition`]) elements. The packrat interpreter in [`parse`] runs the graph over a
//! token stream and produces a lossless raw parse tree (rowan green tree). Each definition may
//! carry a [`CreateNode`] callback that lowers its raw node ([`ParseNode`]) into an AST node.

pub mod csharp;
pub mod error;
pub mod lower;
pub mod node;
pub mod parse;
pub mod vb;

use std::{fmt, ops};

use derivative::Derivative;
use la_arena::{Arena, Idx, RawIdx};
use rustc_hash::FxHashMap;
use thiserror::Error;

pub use self::{
    error::SyntaxError,
    lower::Lowering,
    node::{ListItems, ParseChild, ParseNode, ParseToken},
};

use crate::{ast::NodeId, syntax::token::TokenKind};

pub type ElementId = Idx<Element>;

/// Terminal or non-terminal grammar element
#[derive(Debug)]
pub enum Element {
    Token(TokenGrammarElement),
    Definition(GrammarDefinition),
}

/// Terminal matching one token code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TokenGrammarElement {
    pub kind: TokenKind,
}

/// Lowering callback of a definition
pub type CreateNode =
    Box<dyn Fn(&ParseNode<'_>, &mut Lowering<'_>) -> Result<NodeId, LowerError> + Send + Sync>;

/// Named non-terminal
#[derive(Derivative)]
#[derivative(Debug)]
pub struct GrammarDefinition {
    pub name: &'static str,
    pub rule: Option<Rule>,
    /// Without a callback, the definition forwards to its single child
    #[derivative(Debug = "ignore")]
    pub create_node: Option<CreateNode>,
    /// Comments and blank lines before the definition become AST trivia nodes
    pub collects_trivia: bool,
}

/// Handle of a [`GrammarDefinition`] in a [`Grammar`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DefId(pub(crate) ElementId);

impl DefId {
    pub fn element(self) -> ElementId {
        self.0
    }

    fn index(self) -> u32 {
        u32::from(self.0.into_raw())
    }
}

/// Rule expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rule {
    /// Matches nothing, always succeeds
    Empty,
    Element(ElementId),
    Sequence(Vec<Rule>),
    /// Ordered choice: the first alternative that matches wins
    Choice(Vec<Rule>),
    Optional(Box<Rule>),
    /// `element (separator element)*` accumulated iteratively
    List {
        element: Box<Rule>,
        separator: Option<Box<Rule>>,
        min: usize,
        allow_trailing: bool,
    },
    /// Negative lookahead. Consumes nothing.
    NotFollowedBy(Box<Rule>),
}

impl Rule {
    pub fn opt(self) -> Rule {
        Rule::Optional(Box::new(self))
    }

    /// Zero or more, no separator
    pub fn star(self) -> Rule {
        Rule::List {
            element: Box::new(self),
            separator: None,
            min: 0,
            allow_trailing: false,
        }
    }

    /// One or more, no separator
    pub fn plus(self) -> Rule {
        Rule::List {
            element: Box::new(self),
            separator: None,
            min: 1,
            allow_trailing: false,
        }
    }

    /// One or more separated by `sep`
    pub fn sep_by1(self, sep: impl Into<Rule>) -> Rule {
        Rule::List {
            element: Box::new(self),
            separator: Some(Box::new(sep.into())),
            min: 1,
            allow_trailing: false,
        }
    }

    /// Zero or more separated by `sep`
    pub fn sep_by(self, sep: impl Into<Rule>) -> Rule {
        Rule::List {
            element: Box::new(self),
            separator: Some(Box::new(sep.into())),
            min: 0,
            allow_trailing: false,
        }
    }

    /// Accepts a trailing separator (list rules only)
    pub fn trailing(self) -> Rule {
        match self {
            Rule::List {
                element,
                separator,
                min,
                ..
            } => Rule::List {
                element,
                separator,
                min,
                allow_trailing: true,
            },
            other => other,
        }
    }

    pub fn not(self) -> Rule {
        Rule::NotFollowedBy(Box::new(self))
    }

    /// Positive lookahead. Consumes nothing.
    pub fn followed_by(self) -> Rule {
        self.not().not()
    }
}

impl From<ElementId> for Rule {
    fn from(id: ElementId) -> Rule {
        Rule::Element(id)
    }
}

impl From<DefId> for Rule {
    fn from(id: DefId) -> Rule {
        Rule::Element(id.0)
    }
}

impl<R: Into<Rule>> ops::Add<R> for Rule {
    type Output = Rule;
    fn add(self, rhs: R) -> Rule {
        let rhs = rhs.into();
        match self {
            Rule::Sequence(mut xs) => {
                xs.push(rhs);
                Rule::Sequence(xs)
            }
            lhs => Rule::Sequence(vec![lhs, rhs]),
        }
    }
}

impl<R: Into<Rule>> ops::BitOr<R> for Rule {
    type Output = Rule;
    fn bitor(self, rhs: R) -> Rule {
        let rhs = rhs.into();
        match self {
            Rule::Choice(mut xs) => {
                xs.push(rhs);
                Rule::Choice(xs)
            }
            lhs => Rule::Choice(vec![lhs, rhs]),
        }
    }
}

impl<R: Into<Rule>> ops::Add<R> for DefId {
    type Output = Rule;
    fn add(self, rhs: R) -> Rule {
        Rule::from(self) + rhs
    }
}

impl<R: Into<Rule>> ops::BitOr<R> for DefId {
    type Output = Rule;
    fn bitor(self, rhs: R) -> Rule {
        Rule::from(self) | rhs
    }
}

impl DefId {
    pub fn opt(self) -> Rule {
        Rule::from(self).opt()
    }

    pub fn star(self) -> Rule {
        Rule::from(self).star()
    }

    pub fn plus(self) -> Rule {
        Rule::from(self).plus()
    }

    pub fn sep_by1(self, sep: impl Into<Rule>) -> Rule {
        Rule::from(self).sep_by1(sep)
    }

    pub fn sep_by(self, sep: impl Into<Rule>) -> Rule {
        Rule::from(self).sep_by(sep)
    }
}

/// Error in lowering a raw parse node: the tree doesn't have the shape the callback expects
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LowerError {
    #[error("`{definition}`: expected {expected}")]
    UnexpectedShape {
        definition: &'static str,
        expected: String,
    },
    #[error("`{definition}` has no lowering and no single child to forward to")]
    NoLowering { definition: &'static str },
    #[error("`{text}` can't be converted into {expected}")]
    Unconvertible { expected: &'static str, text: String },
}

/// Rule graph of one surface syntax
#[derive(Debug, Default)]
pub struct Grammar {
    pub name: &'static str,
    elements: Arena<Element>,
    /// TokenMapping: exactly one terminal element per token code
    token_mapping: FxHashMap<TokenKind, ElementId>,
    roots: FxHashMap<&'static str, DefId>,
}

/// Construction
impl Grammar {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            ..Default::default()
        }
    }

    /// Terminal element for the token code, created on first use
    pub fn to_element(&mut self, kind: TokenKind) -> ElementId {
        if let Some(id) = self.token_mapping.get(&kind) {
            return *id;
        }
        let id = self
            .elements
            .alloc(Element::Token(TokenGrammarElement { kind }));
        self.token_mapping.insert(kind, id);
        id
    }

    /// Rule matching one token
    pub fn tk(&mut self, kind: TokenKind) -> Rule {
        Rule::Element(self.to_element(kind))
    }

    /// Choice among tokens
    pub fn any(&mut self, kinds: &[TokenKind]) -> Rule {
        Rule::Choice(kinds.iter().map(|k| self.tk(*k)).collect())
    }

    /// Declares a definition. Set its rule later to allow forward and recursive references.
    pub fn define(&mut self, name: &'static str) -> DefId {
        DefId(self.elements.alloc(Element::Definition(GrammarDefinition {
            name,
            rule: None,
            create_node: None,
            collects_trivia: false,
        })))
    }

    pub fn set_rule(&mut self, def: DefId, rule: impl Into<Rule>) {
        self.definition_mut(def).rule = Some(rule.into());
    }

    pub fn set_create_node(
        &mut self,
        def: DefId,
        f: impl Fn(&ParseNode<'_>, &mut Lowering<'_>) -> Result<NodeId, LowerError>
            + Send
            + Sync
            + 'static,
    ) {
        self.definition_mut(def).create_node = Some(Box::new(f));
    }

    /// Sets both the rule and the lowering callback
    pub fn rule(
        &mut self,
        def: DefId,
        rule: impl Into<Rule>,
        f: impl Fn(&ParseNode<'_>, &mut Lowering<'_>) -> Result<NodeId, LowerError>
            + Send
            + Sync
            + 'static,
    ) {
        self.set_rule(def, rule);
        self.set_create_node(def, f);
    }

    pub fn collect_trivia(&mut self, def: DefId) {
        self.definition_mut(def).collects_trivia = true;
    }

    pub fn add_root(&mut self, name: &'static str, def: DefId) {
        self.roots.insert(name, def);
    }

    fn definition_mut(&mut self, def: DefId) -> &mut GrammarDefinition {
        match &mut self.elements[def.0] {
            Element::Definition(d) => d,
            Element::Token(_) => unreachable!("`DefId` pointing to a token"),
        }
    }
}

/// Queries
impl Grammar {
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.len() == 0
    }

    pub fn element(&self, id: ElementId) -> &Element {
        &self.elements[id]
    }

    pub fn definition(&self, def: DefId) -> &GrammarDefinition {
        match &self.elements[def.0] {
            Element::Definition(d) => d,
            Element::Token(_) => unreachable!("`DefId` pointing to a token"),
        }
    }

    pub fn root(&self, name: &str) -> Option<DefId> {
        self.roots.get(name).copied()
    }

    pub fn roots(&self) -> impl Iterator<Item = (&'static str, DefId)> + '_ {
        self.roots.iter().map(|(name, def)| (*name, *def))
    }

    /// Already-created terminal for the token code
    pub fn token_element(&self, kind: TokenKind) -> Option<ElementId> {
        self.token_mapping.get(&kind).copied()
    }

    /// Definitions whose rule was never set
    pub fn undefined(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.elements.iter().filter_map(|(_, el)| match el {
            Element::Definition(d) if d.rule.is_none() => Some(d.name),
            _ => None,
        })
    }
}

// ----------------------------------------
// Raw parse tree (rowan)
// ----------------------------------------

/// Kind of a raw parse tree element: a matched token, a trivia token, a definition or the root
/// wrapper
///
/// Trivia gets its own kind range because some token codes are trivia in one position and
/// significant in another (VB line breaks).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RawKind(pub u16);

impl RawKind {
    /// Trivia kinds start here
    const TRIVIA_BASE: u16 = 0x0800;
    /// Definition kinds start here
    const DEF_BASE: u16 = 0x1000;
    pub const ROOT: RawKind = RawKind(u16::MAX);

    pub fn trivia(kind: TokenKind) -> Self {
        Self(Self::TRIVIA_BASE + kind.code())
    }

    pub fn is_trivia(self) -> bool {
        (Self::TRIVIA_BASE..Self::DEF_BASE).contains(&self.0)
    }

    pub fn definition(def: DefId) -> Self {
        let index = def.index();
        assert!(
            index < u32::from(u16::MAX - Self::DEF_BASE),
            "too many grammar elements"
        );
        Self(Self::DEF_BASE + index as u16)
    }

    /// Token code of a matched or trivia token
    pub fn token(self) -> Option<TokenKind> {
        if self.is_trivia() {
            TokenKind::from_code(self.0 - Self::TRIVIA_BASE)
        } else {
            TokenKind::from_code(self.0)
        }
    }

    pub fn as_definition(self) -> Option<DefId> {
        if self.0 >= Self::DEF_BASE && self != Self::ROOT {
            Some(DefId(Idx::from_raw(RawIdx::from(u32::from(
                self.0 - Self::DEF_BASE,
            )))))
        } else {
            None
        }
    }
}

impl From<TokenKind> for RawKind {
    fn from(kind: TokenKind) -> Self {
        Self(kind.code())
    }
}

impl From<RawKind> for rowan::SyntaxKind {
    fn from(kind: RawKind) -> Self {
        Self(kind.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RawLang {}

impl rowan::Language for RawLang {
    type Kind = RawKind;

    fn kind_from_raw(raw: rowan::SyntaxKind) -> RawKind {
        RawKind(raw.0)
    }

    fn kind_to_raw(kind: RawKind) -> rowan::SyntaxKind {
        rowan::SyntaxKind(kind.0)
    }
}

pub type SyntaxNode = rowan::SyntaxNode<RawLang>;
pub type SyntaxToken = rowan::SyntaxToken<RawLang>;
pub type SyntaxElement = rowan::NodeOrToken<SyntaxNode, SyntaxToken>;

/// Renders a raw parse tree with definition names
pub struct RawTreeDisplay<'a> {
    pub grammar: &'a Grammar,
    pub node: &'a SyntaxNode,
}

impl<'a> fmt::Display for RawTreeDisplay<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut depth = 0usize;
        for ev in self.node.preorder_with_tokens() {
            let indent = "  ".repeat(depth);
            match ev {
                rowan::WalkEvent::Enter(rowan::NodeOrToken::Node(node)) => {
                    let name = match node.kind().as_definition() {
                        Some(def) => self.grammar.definition(def).name,
                        None => "ROOT",
                    };
                    writeln!(f, "{indent}{name}")?;
                    depth += 1;
                }
                rowan::WalkEvent::Leave(rowan::NodeOrToken::Node(_)) => depth -= 1,
                rowan::WalkEvent::Enter(rowan::NodeOrToken::Token(tk)) => {
                    if !tk.kind().is_trivia() {
                        let kind = tk.kind().token().unwrap_or(TokenKind::Error);
                        writeln!(f, "{indent}{kind:?} {:?}", tk.text())?;
                    }
                }
                rowan::WalkEvent::Leave(rowan::NodeOrToken::Token(_)) => {}
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_mapping_is_shared() {
        let mut g = Grammar::new("test");
        let a = g.to_element(TokenKind::Comma);
        let b = g.to_element(TokenKind::Comma);
        let c = g.to_element(TokenKind::Semicolon);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(g.token_element(TokenKind::Comma), Some(a));
        assert_eq!(g.len(), 2);
    }

    #[test]
    fn combinators_flatten() {
        let mut g = Grammar::new("test");
        let a = g.tk(TokenKind::LParen);
        let b = g.tk(TokenKind::RParen);
        let c = g.tk(TokenKind::Comma);

        match a.clone() + b.clone() + c.clone() {
            Rule::Sequence(xs) => assert_eq!(xs.len(), 3),
            other => panic!("{other:?}"),
        }
        match a | b | c {
            Rule::Choice(xs) => assert_eq!(xs.len(), 3),
            other => panic!("{other:?}"),
        }
    }

    #[test]
    fn raw_kinds() {
        let mut g = Grammar::new("test");
        g.to_element(TokenKind::Comma);
        let def = g.define("Def");
        let kind = RawKind::definition(def);
        assert_eq!(kind.as_definition(), Some(def));
        assert_eq!(kind.token(), None);
        assert_eq!(RawKind::from(TokenKind::Comma).token(), Some(TokenKind::Comma));
        assert_eq!(RawKind::ROOT.as_definition(), None);

        let trivia = RawKind::trivia(TokenKind::NewLine);
        assert!(trivia.is_trivia());
        assert_eq!(trivia.token(), Some(TokenKind::NewLine));
        assert!(!RawKind::from(TokenKind::NewLine).is_trivia());
        assert_eq!(g.undefined().collect::<Vec<_>>(), ["Def"]);
    }
}
