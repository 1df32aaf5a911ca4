//! View over the raw parse tree handed to lowering callbacks

use base::span::Span;

use crate::{
    ast::{NodeId, NodeKind},
    grammar::{DefId, Grammar, Lowering, LowerError, Rule, SyntaxNode, SyntaxToken},
    syntax::token::TokenKind,
};

/// Raw parse node: a matched grammar definition (or the root wrapper)
#[derive(Debug, Clone)]
pub struct ParseNode<'g> {
    grammar: &'g Grammar,
    syn: SyntaxNode,
}

/// Non-trivia child of a [`ParseNode`]
#[derive(Debug, Clone)]
pub enum ParseChild<'g> {
    Node(ParseNode<'g>),
    Token(ParseToken),
}

/// Matched terminal
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParseToken {
    syn: SyntaxToken,
}

impl ParseToken {
    pub fn new(syn: SyntaxToken) -> Self {
        Self { syn }
    }

    pub fn kind(&self) -> TokenKind {
        self.syn.kind().token().unwrap_or(TokenKind::Error)
    }

    pub fn text(&self) -> &str {
        self.syn.text()
    }

    pub fn span(&self) -> Span {
        Span::from_rowan_range(self.syn.text_range())
    }

    pub fn syntax(&self) -> &SyntaxToken {
        &self.syn
    }

    /// Trivia tokens right in front of this token, in source order
    pub fn leading_trivia(&self) -> Vec<SyntaxToken> {
        let mut out: Vec<_> = std::iter::successors(self.syn.prev_token(), |t| t.prev_token())
            .take_while(|t| t.kind().is_trivia())
            .collect();
        out.reverse();
        out
    }
}

impl<'g> ParseChild<'g> {
    pub fn as_node(&self) -> Option<&ParseNode<'g>> {
        match self {
            ParseChild::Node(n) => Some(n),
            ParseChild::Token(_) => None,
        }
    }

    pub fn as_token(&self) -> Option<&ParseToken> {
        match self {
            ParseChild::Token(t) => Some(t),
            ParseChild::Node(_) => None,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            ParseChild::Node(n) => n.span(),
            ParseChild::Token(t) => t.span(),
        }
    }

    /// Lowers a node child, or turns a token child into an AST token
    pub fn lower(&self, cx: &mut Lowering<'_>) -> Result<NodeId, LowerError> {
        match self {
            ParseChild::Node(n) => n.create_ast_node(cx),
            ParseChild::Token(t) => Ok(cx.token(t)),
        }
    }
}

/// Flattened list match: elements and separators in source order
#[derive(Debug, Clone, Default)]
pub struct ListItems<'g> {
    pub elements: Vec<ParseChild<'g>>,
    pub separators: Vec<ParseChild<'g>>,
}

impl<'g> ParseNode<'g> {
    pub fn new(grammar: &'g Grammar, syn: SyntaxNode) -> Self {
        Self { grammar, syn }
    }

    pub fn grammar(&self) -> &'g Grammar {
        self.grammar
    }

    pub fn syntax(&self) -> &SyntaxNode {
        &self.syn
    }

    /// `None` for the root wrapper
    pub fn definition(&self) -> Option<DefId> {
        self.syn.kind().as_definition()
    }

    pub fn name(&self) -> &'static str {
        match self.definition() {
            Some(def) => self.grammar.definition(def).name,
            None => "ROOT",
        }
    }

    pub fn is(&self, def: DefId) -> bool {
        self.definition() == Some(def)
    }

    /// Matched children, trivia skipped
    pub fn children(&self) -> Vec<ParseChild<'g>> {
        self.syn
            .children_with_tokens()
            .filter_map(|el| match el {
                rowan::NodeOrToken::Node(n) => Some(ParseChild::Node(ParseNode::new(self.grammar, n))),
                rowan::NodeOrToken::Token(t) => {
                    (!t.kind().is_trivia()).then(|| ParseChild::Token(ParseToken::new(t)))
                }
            })
            .collect()
    }

    pub fn child(&self, index: usize) -> Option<ParseChild<'g>> {
        self.children().into_iter().nth(index)
    }

    /// First direct token child
    pub fn token(&self) -> Option<ParseToken> {
        self.children()
            .into_iter()
            .find_map(|c| c.as_token().cloned())
    }

    /// Source span from the first to the last significant token
    pub fn span(&self) -> Span {
        let mut tokens = self
            .syn
            .descendants_with_tokens()
            .filter_map(|el| el.into_token())
            .filter(|t| !t.kind().is_trivia());

        match tokens.next() {
            Some(first) => {
                let last = tokens.last().unwrap_or_else(|| first.clone());
                Span::from_rowan_range(first.text_range())
                    .cover(Span::from_rowan_range(last.text_range()))
            }
            None => Span::at(u32::from(self.syn.text_range().end())),
        }
    }

    /// Trivia tokens in front of the first significant token of this node
    ///
    /// Empty child nodes (an absent modifier list, say) hold no tokens and are skipped.
    pub fn leading_trivia(&self) -> Vec<SyntaxToken> {
        self.syn
            .descendants_with_tokens()
            .filter_map(|el| el.into_token())
            .take_while(|t| t.kind().is_trivia())
            .collect()
    }

    /// Trivia tokens between the end of this node and the next significant token
    pub fn trivia_after(&self) -> Vec<SyntaxToken> {
        let end = self.syn.text_range().end();
        let Some(root) = self.syn.ancestors().last() else {
            return Vec::new();
        };
        let first = match root.token_at_offset(end) {
            rowan::TokenAtOffset::None => None,
            rowan::TokenAtOffset::Single(t) if t.text_range().start() >= end => Some(t),
            rowan::TokenAtOffset::Single(t) => t.next_token(),
            rowan::TokenAtOffset::Between(_, right) => Some(right),
        };
        std::iter::successors(first, |t| t.next_token())
            .take_while(|t| t.kind().is_trivia())
            .collect()
    }

    /// Lowers this node with its definition's callback, or forwards to its single child
    pub fn create_ast_node(&self, cx: &mut Lowering<'_>) -> Result<NodeId, LowerError> {
        let Some(def) = self.definition() else {
            // root wrapper: the definition node, then EOF
            let node = self
                .children()
                .into_iter()
                .find_map(|c| match c {
                    ParseChild::Node(n) => Some(n),
                    ParseChild::Token(_) => None,
                })
                .ok_or(LowerError::UnexpectedShape {
                    definition: "ROOT",
                    expected: "a definition node".to_string(),
                })?;
            let id = node.create_ast_node(cx)?;
            let eof = self
                .children()
                .into_iter()
                .rev()
                .find_map(|c| c.as_token().cloned());
            // comments at the end of a file; fragments drop theirs
            let file = matches!(cx.ast.kind(id), NodeKind::CompilationUnit);
            if let (true, Some(eof)) = (file, eof) {
                cx.attach_trailing_trivia(id, &eof.leading_trivia());
            }
            return Ok(id);
        };

        let definition = self.grammar.definition(def);
        log::trace!("lowering `{}` at {:?}", definition.name, self.span());

        let id = match &definition.create_node {
            Some(f) => f(self, cx)?,
            None => match self.children().as_slice() {
                [only] => only.lower(cx)?,
                _ => {
                    return Err(LowerError::NoLowering {
                        definition: definition.name,
                    })
                }
            },
        };

        if definition.collects_trivia {
            cx.attach_leading_trivia(id, self);
        }

        Ok(id)
    }

    /// GetAllNodesFromListDefinition: splits the flat list match into elements and separators
    ///
    /// The list's element and separator must each be a single grammar element, so that they
    /// alternate positionally.
    pub fn list_items(&self) -> ListItems<'g> {
        let separated = match self.definition().and_then(|d| self.grammar.definition(d).rule.as_ref()) {
            Some(Rule::List { separator, .. }) => separator.is_some(),
            _ => false,
        };

        let mut items = ListItems::default();
        for (i, child) in self.children().into_iter().enumerate() {
            if separated && i % 2 == 1 {
                items.separators.push(child);
            } else {
                items.elements.push(child);
            }
        }
        items
    }

    /// Lowers every element of a list definition
    pub fn lower_list(&self, cx: &mut Lowering<'_>) -> Result<Vec<NodeId>, LowerError> {
        self.list_items()
            .elements
            .iter()
            .map(|el| el.lower(cx))
            .collect()
    }

    pub fn cursor(&self) -> ChildCursor<'g> {
        ChildCursor {
            definition: self.name(),
            children: self.children(),
            pos: 0,
        }
    }

    /// Shape error for lowering callbacks
    pub fn unexpected(&self, expected: impl Into<String>) -> LowerError {
        LowerError::UnexpectedShape {
            definition: self.name(),
            expected: expected.into(),
        }
    }
}

/// Positional reader over the children of a [`ParseNode`]
#[derive(Debug, Clone)]
pub struct ChildCursor<'g> {
    definition: &'static str,
    children: Vec<ParseChild<'g>>,
    pos: usize,
}

impl<'g> Iterator for ChildCursor<'g> {
    type Item = ParseChild<'g>;

    fn next(&mut self) -> Option<ParseChild<'g>> {
        let child = self.children.get(self.pos).cloned()?;
        self.pos += 1;
        Some(child)
    }
}

impl<'g> ChildCursor<'g> {
    /// Drops token children of the kinds
    pub fn skipping(mut self, kinds: &[TokenKind]) -> Self {
        self.children
            .retain(|c| !matches!(c, ParseChild::Token(t) if kinds.contains(&t.kind())));
        self
    }

    pub fn peek(&self) -> Option<&ParseChild<'g>> {
        self.children.get(self.pos)
    }

    pub fn is_at_end(&self) -> bool {
        self.pos >= self.children.len()
    }

    /// Whether the next child is a token of the kind
    pub fn at(&self, kind: TokenKind) -> bool {
        matches!(self.peek(), Some(ParseChild::Token(t)) if t.kind() == kind)
    }

    /// Whether the next child is a node of the definition
    pub fn at_def(&self, def: DefId) -> bool {
        matches!(self.peek(), Some(ParseChild::Node(n)) if n.is(def))
    }

    fn error(&self, expected: String) -> LowerError {
        LowerError::UnexpectedShape {
            definition: self.definition,
            expected,
        }
    }

    pub fn token(&mut self, kind: TokenKind) -> Result<ParseToken, LowerError> {
        self.eat(kind)
            .ok_or_else(|| self.error(format!("token `{kind:?}`")))
    }

    pub fn eat(&mut self, kind: TokenKind) -> Option<ParseToken> {
        if self.at(kind) {
            self.next().and_then(|c| c.as_token().cloned())
        } else {
            None
        }
    }

    /// Next token of any of the kinds
    pub fn eat_any(&mut self, kinds: &[TokenKind]) -> Option<ParseToken> {
        match self.peek() {
            Some(ParseChild::Token(t)) if kinds.contains(&t.kind()) => {
                self.next().and_then(|c| c.as_token().cloned())
            }
            _ => None,
        }
    }

    pub fn any_token(&mut self) -> Result<ParseToken, LowerError> {
        match self.peek() {
            Some(ParseChild::Token(_)) => self
                .next()
                .and_then(|c| c.as_token().cloned())
                .ok_or_else(|| self.error("a token".to_string())),
            _ => Err(self.error("a token".to_string())),
        }
    }

    pub fn node(&mut self) -> Result<ParseNode<'g>, LowerError> {
        self.eat_node()
            .ok_or_else(|| self.error("a node".to_string()))
    }

    pub fn eat_node(&mut self) -> Option<ParseNode<'g>> {
        match self.peek() {
            Some(ParseChild::Node(_)) => self.next().and_then(|c| c.as_node().cloned()),
            _ => None,
        }
    }

    pub fn def(&mut self, def: DefId) -> Result<ParseNode<'g>, LowerError> {
        self.eat_def(def)
            .ok_or_else(|| self.error(format!("definition #{:?}", def.element())))
    }

    pub fn eat_def(&mut self, def: DefId) -> Option<ParseNode<'g>> {
        if self.at_def(def) {
            self.eat_node()
        } else {
            None
        }
    }
}
