//! Front end: source text to AST
//!
//! Tokens are produced by [`lex`], matched by the surface syntax's [`Grammar`] and lowered into an
//! [`Ast`] by the grammar's callbacks. Syntax diagnostics are collected as values; only
//! error-severity ones make the parse fail.

pub mod lex;
pub mod token;

use base::ln::LineTable;
use thiserror::Error;

use crate::{
    ast::{Ast, NodeId},
    grammar::{
        error::{CSharpErrorCode, ErrorCodeTable, SyntaxError, VbErrorCode},
        parse::{self, ParseFailure},
        Grammar, LowerError, Lowering, ParseNode,
    },
    lang::{Language, SurfaceSyntax},
    syntax::{
        lex::LexError,
        token::{TokenKind, TokenStream},
    },
};

/// Entry point of a parse: which grammar root to match the whole input against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fragment {
    CompilationUnit,
    Statement,
    Expression,
    TypeMember,
}

impl Fragment {
    pub fn root_name(self) -> &'static str {
        match self {
            Fragment::CompilationUnit => "CompilationUnit",
            Fragment::Statement => "Statement",
            Fragment::Expression => "Expression",
            Fragment::TypeMember => "TypeMember",
        }
    }
}

/// Lowered AST with the non-fatal diagnostics (warnings and messages)
#[derive(Debug, Clone)]
pub struct ParseResult {
    pub ast: Ast,
    pub root: NodeId,
    pub diagnostics: Vec<SyntaxError>,
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ParseError {
    #[error("{0}")]
    Lex(#[from] LexError),
    #[error("{0}")]
    Lower(#[from] LowerError),
    #[error("{}", .0.first().map_or("syntax error", |e| e.message.as_str()))]
    Syntax(Vec<SyntaxError>),
    #[error("grammar has no `{}` root", .0.root_name())]
    MissingRoot(Fragment),
}

impl ParseError {
    /// Syntax diagnostics of a failed parse
    pub fn diagnostics(&self) -> &[SyntaxError] {
        match self {
            ParseError::Syntax(errs) => errs,
            _ => &[],
        }
    }
}

/// Parses `src` as the fragment with the language's grammar
pub fn parse(lang: &Language, fragment: Fragment, src: &str) -> Result<ParseResult, ParseError> {
    let stream = lang.tokenize(src)?;
    let grammar = lang.grammar();
    let root = grammar
        .root(fragment.root_name())
        .ok_or(ParseError::MissingRoot(fragment))?;
    let lines = LineTable::new(src);

    let tree = match parse::parse(grammar, root, src, &stream) {
        Ok(tree) => tree,
        Err(failure) => {
            let err = self::failure_error(lang.syntax(), &stream, &lines, &failure);
            return Err(ParseError::Syntax(vec![err]));
        }
    };

    let mut cx = Lowering::new(lang.syntax(), src, &stream, &lines, lang.keywords());
    let root = ParseNode::new(grammar, tree).create_ast_node(&mut cx)?;
    let (ast, diagnostics) = cx.finish();

    if diagnostics.iter().any(SyntaxError::is_error) {
        return Err(ParseError::Syntax(diagnostics));
    }

    log::debug!(
        "parsed {} `{}`: {} nodes, {} diagnostics",
        lang.syntax(),
        fragment.root_name(),
        ast.len(),
        diagnostics.len()
    );
    Ok(ParseResult {
        ast,
        root,
        diagnostics,
    })
}

/// Raw parse tree of `src` matched as the fragment, without lowering
pub fn parse_raw(
    lang: &Language,
    fragment: Fragment,
    src: &str,
) -> Result<crate::grammar::SyntaxNode, ParseError> {
    let stream = lang.tokenize(src)?;
    let grammar: &Grammar = lang.grammar();
    let root = grammar
        .root(fragment.root_name())
        .ok_or(ParseError::MissingRoot(fragment))?;

    parse::parse(grammar, root, src, &stream).map_err(|failure| {
        let lines = LineTable::new(src);
        ParseError::Syntax(vec![self::failure_error(
            lang.syntax(),
            &stream,
            &lines,
            &failure,
        )])
    })
}

fn failure_error(
    syntax: SurfaceSyntax,
    stream: &TokenStream,
    lines: &LineTable,
    failure: &ParseFailure,
) -> SyntaxError {
    let tk = &stream.tokens[failure.at];
    match syntax {
        SurfaceSyntax::CSharp => {
            let code = match tk.kind {
                TokenKind::Eof => CSharpErrorCode::UnexpectedEndOfFile,
                TokenKind::Error => CSharpErrorCode::InvalidToken,
                _ => CSharpErrorCode::UnexpectedToken,
            };
            self::located(syntax, code, stream, lines, failure)
        }
        SurfaceSyntax::VisualBasic => {
            let code = match tk.kind {
                TokenKind::Eof => VbErrorCode::UnexpectedEndOfFile,
                TokenKind::Error => VbErrorCode::InvalidToken,
                _ => VbErrorCode::UnexpectedToken,
            };
            self::located(syntax, code, stream, lines, failure)
        }
    }
}

fn located<C: ErrorCodeTable>(
    syntax: SurfaceSyntax,
    code: C,
    stream: &TokenStream,
    lines: &LineTable,
    failure: &ParseFailure,
) -> SyntaxError {
    let tk = &stream.tokens[failure.at];
    let location = lines.line_column(tk.span.start);
    SyntaxError::new(syntax, code, tk.span, location)
        .with_expectation(failure.expected.clone(), tk.kind)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::diag::Severity;

    #[test]
    fn missing_brace_is_end_of_file() {
        let cs = Language::csharp();
        let err = cs.parse("class A {").unwrap_err();
        let diags = err.diagnostics();
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].code_label, "CS0002");
        assert_eq!(diags[0].found, Some(TokenKind::Eof));
    }

    #[test]
    fn unexpected_token_location() {
        let cs = Language::csharp();
        let err = cs.parse("class A {\n  int ;\n}").unwrap_err();
        let diags = err.diagnostics();
        assert_eq!(diags[0].code_label, "CS0001");
        assert_eq!(diags[0].location.line1(), 2);
        assert_eq!(diags[0].severity(), Severity::Error);
    }

    #[test]
    fn vb_codes() {
        let vb = Language::visual_basic();
        let err = vb.parse("Class A\n").unwrap_err();
        assert_eq!(err.diagnostics()[0].code_label, "BC0002");
    }

    #[test]
    fn lex_errors_propagate() {
        let cs = Language::csharp();
        let err = cs.parse_fragment(Fragment::Expression, "1.2.3").unwrap_err();
        assert!(matches!(err, ParseError::Lex(LexError::TooManyDecimalPoints { .. })));
    }

    #[test]
    fn warnings_do_not_fail_the_parse() {
        let cs = Language::csharp();
        let res = cs.parse_fragment(Fragment::Statement, "if (x);").unwrap();
        assert_eq!(res.diagnostics.len(), 1);
        assert_eq!(res.diagnostics[0].severity(), Severity::Warning);
    }
}
