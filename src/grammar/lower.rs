//! Lowering context passed to the `CreateNode` callbacks

use base::{ln::LineTable, span::Span};

use crate::{
    ast::{
        kind::{
            AstToken, BinaryOperator, Comment, CommentKind, Literal, LiteralValue, RawLiteral,
        },
        Ast, NodeId, NodeKind, Title,
    },
    grammar::{
        error::{ErrorCodeTable, SyntaxError},
        ListItems, LowerError, ParseChild, ParseNode, ParseToken, SyntaxToken,
    },
    lang::{KeywordTable, SurfaceSyntax},
    syntax::token::{TokenKind, TokenStream, TokenValue},
};

/// AST under construction plus what the callbacks need to know about the source
pub struct Lowering<'a> {
    pub ast: Ast,
    syntax: SurfaceSyntax,
    src: &'a str,
    stream: &'a TokenStream,
    lines: &'a LineTable,
    keywords: &'a KeywordTable,
    diagnostics: Vec<SyntaxError>,
}

impl<'a> Lowering<'a> {
    pub fn new(
        syntax: SurfaceSyntax,
        src: &'a str,
        stream: &'a TokenStream,
        lines: &'a LineTable,
        keywords: &'a KeywordTable,
    ) -> Self {
        Self {
            ast: Ast::new(),
            syntax,
            src,
            stream,
            lines,
            keywords,
            diagnostics: Vec::new(),
        }
    }

    pub fn syntax(&self) -> SurfaceSyntax {
        self.syntax
    }

    pub fn src(&self) -> &'a str {
        self.src
    }

    pub fn keywords(&self) -> &'a KeywordTable {
        self.keywords
    }

    pub fn finish(self) -> (Ast, Vec<SyntaxError>) {
        (self.ast, self.diagnostics)
    }

    pub fn lower(&mut self, node: &ParseNode<'_>) -> Result<NodeId, LowerError> {
        node.create_ast_node(self)
    }

    pub fn lower_opt(&mut self, node: Option<&ParseNode<'_>>) -> Result<Option<NodeId>, LowerError> {
        node.map(|n| n.create_ast_node(self)).transpose()
    }

    /// Reports a non-fatal diagnostic (warning or message)
    pub fn report<C: ErrorCodeTable>(&mut self, span: Span, code: C) {
        let location = self.lines.line_column(span.start);
        let err = SyntaxError::new(self.syntax, code, span, location);
        log::debug!("{} at {}: {}", err.code_label, location, err.message);
        self.diagnostics.push(err);
    }
}

/// Node construction
impl<'a> Lowering<'a> {
    pub fn alloc(&mut self, kind: NodeKind, span: Span) -> NodeId {
        let range = self.lines.text_range(span);
        self.ast.alloc_at(kind, range)
    }

    /// Allocates a node covering the raw node
    pub fn node(&mut self, kind: NodeKind, raw: &ParseNode<'_>) -> NodeId {
        self.alloc(kind, raw.span())
    }

    pub fn token(&mut self, tk: &ParseToken) -> NodeId {
        self.alloc(
            NodeKind::Token(AstToken {
                kind: tk.kind(),
                text: tk.text().to_string(),
            }),
            tk.span(),
        )
    }

    /// Identifier with its escape (`@name`, `[name]`) removed
    pub fn identifier(&mut self, tk: &ParseToken) -> NodeId {
        let name = self::unescape_identifier(self.syntax, tk.text());
        self.alloc(NodeKind::Identifier(name.to_string()), tk.span())
    }

    pub fn set(&mut self, owner: NodeId, title: Title, child: NodeId) {
        self.ast.set_child(owner, title, Some(child));
    }

    pub fn set_opt(&mut self, owner: NodeId, title: Title, child: Option<NodeId>) {
        if let Some(child) = child {
            self.ast.set_child(owner, title, Some(child));
        }
    }

    pub fn set_token(&mut self, owner: NodeId, title: Title, tk: &ParseToken) {
        let child = self.token(tk);
        self.ast.set_child(owner, title, Some(child));
    }

    /// Closing token (`}`, VB `End`) with the comments in front of it
    pub fn set_closing(&mut self, owner: NodeId, title: Title, tk: &ParseToken) {
        self.attach_trailing_trivia(owner, &tk.leading_trivia());
        self.set_token(owner, title, tk);
    }

    pub fn set_token_opt(&mut self, owner: NodeId, title: Title, tk: Option<&ParseToken>) {
        if let Some(tk) = tk {
            self.set_token(owner, title, tk);
        }
    }

    pub fn push(&mut self, owner: NodeId, title: Title, child: NodeId) {
        self.ast.append_child(owner, title, child);
    }

    pub fn push_token(&mut self, owner: NodeId, title: Title, tk: &ParseToken) {
        let child = self.token(tk);
        self.ast.append_child(owner, title, child);
    }

    /// Interpreted value of a literal token
    pub fn value(&self, tk: &ParseToken) -> Option<&'a TokenValue> {
        let start = tk.span().start;
        let tokens = &self.stream.tokens.raw;
        let i = tokens
            .binary_search_by(|t| t.span.start.cmp(&start))
            .ok()?;
        tokens[i].value.as_ref()
    }

    /// `PrimitiveExpression` from a literal token, keeping its spelling
    pub fn literal(&mut self, tk: &ParseToken) -> Result<NodeId, LowerError> {
        let value = match (tk.kind(), self.value(tk)) {
            (TokenKind::Null | TokenKind::Nothing, _) => LiteralValue::Null,
            (_, Some(TokenValue::Boolean(b))) => LiteralValue::Boolean(*b),
            (_, Some(TokenValue::Integer { value, suffix })) => LiteralValue::Integer {
                value: *value,
                suffix: *suffix,
            },
            (_, Some(TokenValue::Real { value, suffix })) => LiteralValue::Real {
                value: *value,
                suffix: *suffix,
            },
            (_, Some(TokenValue::String(s))) => LiteralValue::String(s.clone()),
            (_, Some(TokenValue::Char(c))) => LiteralValue::Char(*c),
            (_, None) => {
                return Err(LowerError::Unconvertible {
                    expected: "literal",
                    text: tk.text().to_string(),
                })
            }
        };

        let literal = Literal {
            value,
            raw: Some(RawLiteral {
                syntax: self.syntax,
                text: tk.text().to_string(),
            }),
        };
        Ok(self.alloc(NodeKind::PrimitiveExpression(literal), tk.span()))
    }
}

/// Shared lowering patterns
impl<'a> Lowering<'a> {
    /// Modifier node from a keyword token, looked up by spelling
    pub fn modifier(&mut self, tk: &ParseToken) -> Result<NodeId, LowerError> {
        let keywords = self.keywords;
        let modifier = self
            .syntax
            .data()
            .modifiers
            .iter()
            .find(|(s, _)| keywords.same_name(s, tk.text()))
            .map(|(_, m)| *m)
            .ok_or_else(|| LowerError::Unconvertible {
                expected: "modifier",
                text: tk.text().to_string(),
            })?;
        Ok(self.alloc(NodeKind::Modifier(modifier), tk.span()))
    }

    /// Appends the modifier tokens of a raw node under [`Title::Modifiers`]
    pub fn modifiers(&mut self, owner: NodeId, raw: &ParseNode<'_>) -> Result<(), LowerError> {
        for child in raw.children() {
            if let ParseChild::Token(tk) = child {
                let m = self.modifier(&tk)?;
                self.push(owner, Title::Modifiers, m);
            }
        }
        Ok(())
    }

    /// Folds `e0 op e1 op e2 ..` into left-associative binary expressions
    pub fn fold_binary(
        &mut self,
        items: &ListItems<'_>,
        op_of: impl Fn(TokenKind) -> Option<BinaryOperator>,
    ) -> Result<NodeId, LowerError> {
        let Some((first, rest)) = items.elements.split_first() else {
            return Err(LowerError::UnexpectedShape {
                definition: "binary operator chain",
                expected: "an operand".to_string(),
            });
        };

        let mut span = first.span();
        let mut left = first.lower(self)?;
        for (sep, el) in items.separators.iter().zip(rest) {
            let right = el.lower(self)?;
            span = span.cover(el.span());
            left = self.binary(left, sep, right, span, &op_of)?;
        }
        Ok(left)
    }

    /// Folds `e0 op e1 op e2 ..` into right-associative binary expressions
    pub fn fold_binary_right(
        &mut self,
        items: &ListItems<'_>,
        op_of: impl Fn(TokenKind) -> Option<BinaryOperator>,
    ) -> Result<NodeId, LowerError> {
        let Some((last, init)) = items.elements.split_last() else {
            return Err(LowerError::UnexpectedShape {
                definition: "binary operator chain",
                expected: "an operand".to_string(),
            });
        };

        let mut span = last.span();
        let mut right = last.lower(self)?;
        for (sep, el) in items.separators.iter().zip(init).rev() {
            let left = el.lower(self)?;
            span = span.cover(el.span());
            right = self.binary(left, sep, right, span, &op_of)?;
        }
        Ok(right)
    }

    fn binary(
        &mut self,
        left: NodeId,
        sep: &ParseChild<'_>,
        right: NodeId,
        span: Span,
        op_of: &impl Fn(TokenKind) -> Option<BinaryOperator>,
    ) -> Result<NodeId, LowerError> {
        let tk = match sep {
            ParseChild::Token(tk) => tk.clone(),
            ParseChild::Node(n) => n.token().ok_or_else(|| n.unexpected("operator token"))?,
        };
        let op = op_of(tk.kind()).ok_or_else(|| LowerError::Unconvertible {
            expected: "binary operator",
            text: tk.text().to_string(),
        })?;

        let id = self.alloc(NodeKind::BinaryOperatorExpression(op), span);
        self.set(id, Title::Left, left);
        self.set_token(id, Title::OperatorToken, &tk);
        self.set(id, Title::Right, right);
        Ok(id)
    }
}

/// Trivia
impl<'a> Lowering<'a> {
    /// Turns comments and blank lines in front of the raw node into nodes under
    /// [`Title::LeadingTrivia`]
    pub fn attach_leading_trivia(&mut self, owner: NodeId, raw: &ParseNode<'_>) {
        let at = Span::at(raw.span().start);
        let trivia = self.trivia_nodes(&raw.leading_trivia(), Some(at));
        for id in trivia {
            self.ast.append_child(owner, Title::LeadingTrivia, id);
        }
    }

    /// Turns comments in front of a closing token (`}`, VB `End`, end of file) into nodes under
    /// [`Title::TrailingTrivia`]
    pub fn attach_trailing_trivia(&mut self, owner: NodeId, tokens: &[SyntaxToken]) {
        let trivia = self.trivia_nodes(tokens, None);
        for id in trivia {
            self.ast.append_child(owner, Title::TrailingTrivia, id);
        }
    }

    /// Comment nodes, with a blank line node where the source has an empty line before one.
    /// `last_blank` places a blank line after the last comment as well.
    fn trivia_nodes(&mut self, tokens: &[SyntaxToken], last_blank: Option<Span>) -> Vec<NodeId> {
        // VB: the line break ending the previous statement is a token, not trivia
        let mut threshold = match self.syntax {
            SurfaceSyntax::CSharp => 2,
            SurfaceSyntax::VisualBasic => 1,
        };
        let mut newlines = 0;
        let mut trivia = Vec::new();

        for tk in tokens {
            let Some(kind) = tk.kind().token() else {
                continue;
            };
            let span = Span::from_rowan_range(tk.text_range());

            match kind {
                TokenKind::NewLine => newlines += 1,
                TokenKind::LineComment | TokenKind::DocComment | TokenKind::BlockComment => {
                    if newlines >= threshold {
                        trivia.push(self.alloc(NodeKind::BlankLine, span));
                    }
                    let comment = self::comment(kind, tk.text());
                    trivia.push(self.alloc(NodeKind::Comment(comment), span));
                    newlines = 0;
                    threshold = 2;
                }
                _ => {}
            }
        }

        if let Some(at) = last_blank {
            if newlines >= threshold {
                trivia.push(self.alloc(NodeKind::BlankLine, at));
            }
        }

        trivia
    }
}

fn comment(kind: TokenKind, text: &str) -> Comment {
    let (kind, body) = match kind {
        TokenKind::DocComment => {
            let body = text
                .strip_prefix("///")
                .or_else(|| text.strip_prefix("'''"))
                .unwrap_or(text);
            (CommentKind::Doc, body)
        }
        TokenKind::BlockComment => {
            let body = text
                .strip_prefix("/*")
                .and_then(|s| s.strip_suffix("*/"))
                .unwrap_or(text);
            (CommentKind::Block, body)
        }
        _ => {
            let body = if let Some(s) = text.strip_prefix("//") {
                s
            } else if let Some(s) = text.strip_prefix('\'') {
                s
            } else if text.get(..3).map_or(false, |s| s.eq_ignore_ascii_case("rem")) {
                &text[3..]
            } else {
                text
            };
            (CommentKind::Line, body)
        }
    };

    let text = match kind {
        CommentKind::Block => body.to_string(),
        _ => body.trim_end().to_string(),
    };
    Comment { kind, text }
}

/// Strips `@` (C#) or `[..]` (VB) from an escaped identifier
pub fn unescape_identifier(syntax: SurfaceSyntax, text: &str) -> &str {
    match syntax {
        SurfaceSyntax::CSharp => text.strip_prefix('@').unwrap_or(text),
        SurfaceSyntax::VisualBasic => text
            .strip_prefix('[')
            .and_then(|s| s.strip_suffix(']'))
            .unwrap_or(text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comment_markers() {
        let c = self::comment(TokenKind::LineComment, "// hello  ");
        assert_eq!((c.kind, c.text.as_str()), (CommentKind::Line, " hello"));
        let c = self::comment(TokenKind::DocComment, "''' <summary>");
        assert_eq!((c.kind, c.text.as_str()), (CommentKind::Doc, " <summary>"));
        let c = self::comment(TokenKind::LineComment, "REM old style");
        assert_eq!(c.text, " old style");
        let c = self::comment(TokenKind::BlockComment, "/* a */");
        assert_eq!((c.kind, c.text.as_str()), (CommentKind::Block, " a "));
    }

    #[test]
    fn escaped_identifiers() {
        assert_eq!(unescape_identifier(SurfaceSyntax::CSharp, "@class"), "class");
        assert_eq!(unescape_identifier(SurfaceSyntax::VisualBasic, "[Class]"), "Class");
        assert_eq!(unescape_identifier(SurfaceSyntax::VisualBasic, "Foo"), "Foo");
    }
}
