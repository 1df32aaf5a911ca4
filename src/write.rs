//! Back end: AST to source text
//!
//! Each surface syntax has a writer implementing [`NodeWriter`]. Writers dispatch on the closed
//! [`NodeKind`] set, so a kind without a spelling in the target syntax is a compile-time
//! decision: it is either translated or reported as [`WriteError::Unsupported`].

pub mod csharp;
pub mod options;
pub mod vb;

use std::{fmt, ops::Range};

use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::{
    ast::{
        kind::{CommentKind, Comment},
        Ast, NodeId, NodeKind, Title,
    },
    lang::{KeywordTable, SurfaceSyntax},
};

use self::options::{BraceStyle, FormattingOptions};

#[derive(Debug, Error)]
pub enum WriteError {
    #[error("{0}")]
    Fmt(#[from] fmt::Error),
    #[error("`{node}` has no {syntax} spelling")]
    Unsupported {
        syntax: SurfaceSyntax,
        node: &'static str,
    },
    #[error("`{node}` has no {title:?} child")]
    MissingChild { node: &'static str, title: Title },
}

/// Sink of the writers
///
/// Writers never emit indentation themselves; the output indents every line it starts.
pub trait TextOutput {
    fn write_keyword(&mut self, keyword: &str) -> fmt::Result;
    fn write_identifier(&mut self, name: &str) -> fmt::Result;
    /// Punctuation and operators
    fn write_token(&mut self, token: &str) -> fmt::Result;
    fn write_literal(&mut self, text: &str) -> fmt::Result;
    /// Whole comment including its markers
    fn write_comment(&mut self, text: &str) -> fmt::Result;
    /// Single space, unless at the start of a line or after another space
    fn space(&mut self) -> fmt::Result;
    fn new_line(&mut self) -> fmt::Result;
    fn indent(&mut self);
    fn unindent(&mut self);
    /// Marks the start of a node's text
    fn start_node(&mut self, _id: NodeId) {}
    fn end_node(&mut self, _id: NodeId) {}
}

/// [`TextOutput`] into a `String`, recording the output range of every written node
#[derive(Debug, Clone, Default)]
pub struct StringOutput {
    buf: String,
    indent_unit: String,
    level: usize,
    at_line_start: bool,
    open: Vec<(NodeId, usize)>,
    ranges: FxHashMap<NodeId, Range<usize>>,
}

impl StringOutput {
    pub fn new(options: &FormattingOptions) -> Self {
        Self {
            indent_unit: options.indent_unit(),
            at_line_start: true,
            ..Self::default()
        }
    }

    pub fn as_str(&self) -> &str {
        &self.buf
    }

    /// Byte range of a node's text in the output
    pub fn node_range(&self, id: NodeId) -> Option<Range<usize>> {
        self.ranges.get(&id).cloned()
    }

    pub fn finish(self) -> String {
        self.buf
    }

    fn push(&mut self, s: &str) -> fmt::Result {
        if self.at_line_start && !s.is_empty() {
            for _ in 0..self.level {
                self.buf.push_str(&self.indent_unit);
            }
            self.at_line_start = false;
        }
        self.buf.push_str(s);
        Ok(())
    }
}

impl TextOutput for StringOutput {
    fn write_keyword(&mut self, keyword: &str) -> fmt::Result {
        self.push(keyword)
    }

    fn write_identifier(&mut self, name: &str) -> fmt::Result {
        self.push(name)
    }

    fn write_token(&mut self, token: &str) -> fmt::Result {
        self.push(token)
    }

    fn write_literal(&mut self, text: &str) -> fmt::Result {
        self.push(text)
    }

    fn write_comment(&mut self, text: &str) -> fmt::Result {
        self.push(text)
    }

    fn space(&mut self) -> fmt::Result {
        if !self.at_line_start && !self.buf.ends_with(' ') {
            self.buf.push(' ');
        }
        Ok(())
    }

    fn new_line(&mut self) -> fmt::Result {
        let trimmed = self.buf.trim_end_matches(' ').len();
        self.buf.truncate(trimmed);
        self.buf.push('\n');
        self.at_line_start = true;
        Ok(())
    }

    fn indent(&mut self) {
        self.level += 1;
    }

    fn unindent(&mut self) {
        self.level = self.level.saturating_sub(1);
    }

    fn start_node(&mut self, id: NodeId) {
        let pending = if self.at_line_start {
            self.indent_unit.len() * self.level
        } else {
            0
        };
        self.open.push((id, self.buf.len() + pending));
    }

    fn end_node(&mut self, id: NodeId) {
        if let Some((open, start)) = self.open.pop() {
            debug_assert_eq!(open, id);
            let end = self.buf.trim_end().len().max(start);
            self.ranges.insert(id, start..end);
        }
    }
}

/// Writer of one surface syntax
///
/// Implementors provide [`NodeWriter::write_node`]; the provided methods are the shared layout
/// helpers, all built on [`NodeWriter::write_interleaved`].
pub trait NodeWriter {
    fn syntax(&self) -> SurfaceSyntax;
    fn ast(&self) -> &Ast;
    fn out(&mut self) -> &mut dyn TextOutput;

    /// Writes one node, leading trivia excluded
    fn write_node(&mut self, id: NodeId) -> Result<(), WriteError>;

    /// Writes a comment in this syntax's markers
    fn write_comment(&mut self, comment: &Comment) -> Result<(), WriteError>;

    /// Children of a node under a title, detached from the borrow of `self`
    fn children_of(&self, id: NodeId, title: Title) -> Vec<NodeId> {
        self.ast().children(id, title).collect()
    }

    /// Writes the nodes with `sep` between each pair
    fn write_interleaved(
        &mut self,
        items: &[NodeId],
        sep: &mut dyn FnMut(&mut Self) -> Result<(), WriteError>,
    ) -> Result<(), WriteError>
    where
        Self: Sized,
    {
        for (i, id) in items.iter().enumerate() {
            if i > 0 {
                sep(self)?;
            }
            self.write_node(*id)?;
        }
        Ok(())
    }

    /// `a, b, c`, or one item per line
    fn write_comma_separated(&mut self, items: &[NodeId], each_on_new_line: bool) -> Result<(), WriteError>
    where
        Self: Sized,
    {
        self.write_interleaved(items, &mut |w| {
            w.out().write_token(",")?;
            if each_on_new_line {
                w.out().new_line()?;
            } else {
                w.out().space()?;
            }
            Ok(())
        })
    }

    /// Each node on its own line, with its leading trivia
    fn write_lines(&mut self, items: &[NodeId]) -> Result<(), WriteError>
    where
        Self: Sized,
    {
        for id in items {
            self.write_leading_trivia(*id)?;
            self.write_node(*id)?;
            self.out().new_line()?;
        }
        Ok(())
    }

    /// Comments and blank lines in front of a node, each ending a line
    fn write_leading_trivia(&mut self, id: NodeId) -> Result<(), WriteError> {
        self.write_trivia(id, Title::LeadingTrivia)
    }

    /// Comments in front of the closing token of `id`. The cursor must be at a line start.
    fn write_trailing_trivia(&mut self, id: NodeId) -> Result<(), WriteError> {
        self.write_trivia(id, Title::TrailingTrivia)
    }

    fn write_trivia(&mut self, id: NodeId, title: Title) -> Result<(), WriteError> {
        for trivia in self.children_of(id, title) {
            match self.ast().kind(trivia).clone() {
                NodeKind::Comment(comment) => {
                    self.write_comment(&comment)?;
                    self.out().new_line()?;
                }
                NodeKind::BlankLine => self.out().new_line()?,
                _ => {}
            }
        }
        Ok(())
    }

    /// `{` and a new indented line
    fn open_brace(&mut self, style: BraceStyle) -> Result<(), WriteError> {
        let out = self.out();
        match style {
            BraceStyle::EndOfLine => out.space()?,
            BraceStyle::NextLine => out.new_line()?,
        }
        out.write_token("{")?;
        out.new_line()?;
        out.indent();
        Ok(())
    }

    /// Dedents and writes `}`. The cursor must be at a line start.
    fn close_brace(&mut self) -> Result<(), WriteError> {
        let out = self.out();
        out.unindent();
        out.write_token("}")?;
        Ok(())
    }

    /// Body of `if`, `while`, ..: a block, or an indented statement on the next line
    fn write_embedded_statement(&mut self, id: NodeId) -> Result<(), WriteError> {
        if matches!(self.ast().kind(id), NodeKind::BlockStatement) {
            return self.write_node(id);
        }
        self.out().new_line()?;
        self.out().indent();
        self.write_leading_trivia(id)?;
        self.write_node(id)?;
        self.out().unindent();
        Ok(())
    }

    /// Error for a node without a spelling in this syntax
    fn unsupported(&self, id: NodeId) -> WriteError {
        let node = self.ast().kind(id).name();
        log::debug!("{} writer: unsupported `{node}`", self.syntax());
        WriteError::Unsupported {
            syntax: self.syntax(),
            node,
        }
    }
}

/// Writes the subtree rooted at `root` as source text of the surface syntax
pub fn write(
    syntax: SurfaceSyntax,
    keywords: &KeywordTable,
    ast: &Ast,
    root: NodeId,
    options: &FormattingOptions,
) -> Result<String, WriteError> {
    let mut out = StringOutput::new(options);
    self::write_to(&mut out, syntax, keywords, ast, root, options)?;
    Ok(out.finish())
}

/// Writes into a caller-provided output
pub fn write_to(
    out: &mut dyn TextOutput,
    syntax: SurfaceSyntax,
    keywords: &KeywordTable,
    ast: &Ast,
    root: NodeId,
    options: &FormattingOptions,
) -> Result<(), WriteError> {
    match syntax {
        SurfaceSyntax::CSharp => csharp::CSharpWriter::new(ast, keywords, options, out).write_root(root),
        SurfaceSyntax::VisualBasic => vb::VbWriter::new(ast, keywords, options, out).write_root(root),
    }
}

/// Comment markers of C# (`true`) or VB (`false`)
pub(crate) fn comment_text(csharp: bool, comment: &Comment) -> Vec<String> {
    match (csharp, comment.kind) {
        (true, CommentKind::Line) => vec![format!("//{}", comment.text)],
        (true, CommentKind::Doc) => vec![format!("///{}", comment.text)],
        (true, CommentKind::Block) => vec![format!("/*{}*/", comment.text)],
        (false, CommentKind::Line) => vec![format!("'{}", comment.text)],
        (false, CommentKind::Doc) => vec![format!("'''{}", comment.text)],
        (false, CommentKind::Block) => comment
            .text
            .lines()
            .map(|line| format!("' {}", line.trim()))
            .collect(),
    }
}

/// Integer literal value, looking through parentheses
pub(crate) fn integer_value(ast: &Ast, id: NodeId) -> Option<u64> {
    match ast.kind(id) {
        NodeKind::PrimitiveExpression(lit) => match lit.value {
            crate::ast::kind::LiteralValue::Integer { value, .. } => Some(value),
            _ => None,
        },
        NodeKind::ParenthesizedExpression => {
            self::integer_value(ast, ast.child(id, Title::Expression)?)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_indents_lazily_and_trims_line_ends() {
        let mut out = StringOutput::new(&FormattingOptions::default());
        out.write_keyword("class").unwrap();
        out.space().unwrap();
        out.new_line().unwrap();
        out.indent();
        out.write_token("x").unwrap();
        out.new_line().unwrap();
        out.new_line().unwrap();
        out.unindent();
        out.write_token("}").unwrap();
        assert_eq!(out.as_str(), "class\n    x\n\n}");
    }

    #[test]
    fn node_ranges_skip_indentation() {
        let mut ast = Ast::new();
        let id = ast.identifier("x");

        let mut out = StringOutput::new(&FormattingOptions::default());
        out.indent();
        out.start_node(id);
        out.write_identifier("x").unwrap();
        out.end_node(id);
        assert_eq!(out.node_range(id), Some(4..5));
    }

    #[test]
    fn vb_block_comments_become_line_comments() {
        let comment = Comment {
            kind: CommentKind::Block,
            text: " a\n b ".to_string(),
        };
        assert_eq!(comment_text(false, &comment), ["' a", "' b"]);
        assert_eq!(comment_text(true, &comment), ["/* a\n b */"]);
    }
}
