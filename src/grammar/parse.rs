//! Packrat interpreter over the rule graph
//!
//! Runs a [`Grammar`] over a [`TokenStream`] and builds a lossless green tree: every definition
//! becomes a node, every token becomes a token preceded by its leading trivia. Results of
//! definitions are memoized per position, so backtracking over ordered choices stays linear.
//! Definitions re-entered at the same position fail instead of recursing (grammars are written
//! without left recursion; lists are iterative).

use rowan::{GreenNode, GreenToken, NodeOrToken};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::{
    grammar::{DefId, Element, ElementId, Grammar, RawKind, Rule, SyntaxNode},
    syntax::token::{TokenIdx, TokenKind, TokenStream},
};

type GreenElement = NodeOrToken<GreenNode, GreenToken>;

/// Furthest position the parser failed at, with the tokens it would have accepted there
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseFailure {
    pub at: TokenIdx,
    pub expected: Vec<TokenKind>,
}

/// Parses the whole token stream as the given root definition
pub fn parse(
    grammar: &Grammar,
    root: DefId,
    src: &str,
    stream: &TokenStream,
) -> Result<SyntaxNode, ParseFailure> {
    let mut parser = Parser {
        grammar,
        src,
        stream,
        memo: FxHashMap::default(),
        active: FxHashSet::default(),
        furthest: 0,
        expected: Vec::new(),
        memo_hits: 0,
    };

    let mut children = Vec::new();
    let end = parser.definition(root, 0, &mut children);
    log::trace!(
        "parsed `{}`: {} memo entries, {} hits",
        grammar.definition(root).name,
        parser.memo.len(),
        parser.memo_hits
    );

    let eof = stream.tokens.len() - 1;
    match end {
        Some(end) if end == eof => {
            parser.push_token(eof, &mut children);
            let green = GreenNode::new(RawKind::ROOT.into(), children);
            Ok(SyntaxNode::new_root(green))
        }
        Some(end) => {
            // the root matched a prefix; the rest is unexpected
            if end > parser.furthest {
                parser.furthest = end;
                parser.expected.clear();
            }
            if end == parser.furthest {
                parser.expected.push(TokenKind::Eof);
            }
            Err(parser.into_failure())
        }
        None => Err(parser.into_failure()),
    }
}

struct Parser<'g, 's> {
    grammar: &'g Grammar,
    src: &'s str,
    stream: &'s TokenStream,
    /// (definition, position) -> (node, end position)
    memo: FxHashMap<(DefId, usize), Option<(GreenNode, usize)>>,
    /// Definitions being parsed, for the left recursion guard
    active: FxHashSet<(DefId, usize)>,
    furthest: usize,
    expected: Vec<TokenKind>,
    memo_hits: usize,
}

impl<'g, 's> Parser<'g, 's> {
    fn into_failure(self) -> ParseFailure {
        log::debug!(
            "parse failed at token {}, expected {:?}",
            self.furthest,
            self.expected
        );
        ParseFailure {
            at: TokenIdx::from(self.furthest),
            expected: self.expected,
        }
    }

    fn fail(&mut self, pos: usize, kind: TokenKind) {
        if pos > self.furthest {
            self.furthest = pos;
            self.expected.clear();
        }
        if pos == self.furthest && !self.expected.contains(&kind) {
            self.expected.push(kind);
        }
    }

    /// Pushes the token at `pos` with its leading trivia
    fn push_token(&mut self, pos: usize, out: &mut Vec<GreenElement>) {
        let idx = TokenIdx::from(pos);
        for (_, trivia) in self.stream.leading_trivia(idx) {
            out.push(NodeOrToken::Token(GreenToken::new(
                RawKind::trivia(trivia.kind).into(),
                trivia.slice(self.src),
            )));
        }
        let tk = &self.stream.tokens[idx];
        out.push(NodeOrToken::Token(GreenToken::new(
            RawKind::from(tk.kind).into(),
            tk.slice(self.src),
        )));
    }

    /// Every rule leaves `out` untouched when it fails
    fn rule(&mut self, rule: &'g Rule, pos: usize, out: &mut Vec<GreenElement>) -> Option<usize> {
        match rule {
            Rule::Empty => Some(pos),
            Rule::Element(el) => self.element(*el, pos, out),
            Rule::Sequence(rules) => {
                let mark = out.len();
                let mut p = pos;
                for r in rules {
                    match self.rule(r, p, out) {
                        Some(next) => p = next,
                        None => {
                            out.truncate(mark);
                            return None;
                        }
                    }
                }
                Some(p)
            }
            Rule::Choice(rules) => rules.iter().find_map(|r| self.rule(r, pos, out)),
            Rule::Optional(r) => Some(self.rule(r, pos, out).unwrap_or(pos)),
            Rule::List {
                element,
                separator,
                min,
                allow_trailing,
            } => self.list(element, separator.as_deref(), *min, *allow_trailing, pos, out),
            Rule::NotFollowedBy(r) => {
                // lookahead failures don't count as expectations
                let saved = (self.furthest, self.expected.clone());
                let mut scratch = Vec::new();
                let matched = self.rule(r, pos, &mut scratch).is_some();
                (self.furthest, self.expected) = saved;
                if matched {
                    None
                } else {
                    Some(pos)
                }
            }
        }
    }

    fn list(
        &mut self,
        element: &'g Rule,
        separator: Option<&'g Rule>,
        min: usize,
        allow_trailing: bool,
        pos: usize,
        out: &mut Vec<GreenElement>,
    ) -> Option<usize> {
        let mark = out.len();

        let Some(mut p) = self.rule(element, pos, out) else {
            return if min == 0 { Some(pos) } else { None };
        };
        let mut n = 1;

        loop {
            let before = out.len();
            let after_sep = match separator {
                Some(sep) => match self.rule(sep, p, out) {
                    Some(q) => q,
                    None => break,
                },
                None => p,
            };

            match self.rule(element, after_sep, out) {
                Some(q) if q > p => {
                    p = q;
                    n += 1;
                }
                Some(_) => {
                    // no progress
                    out.truncate(before);
                    break;
                }
                None => {
                    if separator.is_some() && allow_trailing {
                        p = after_sep;
                    } else {
                        out.truncate(before);
                    }
                    break;
                }
            }
        }

        if n < min {
            out.truncate(mark);
            None
        } else {
            Some(p)
        }
    }

    fn element(&mut self, el: ElementId, pos: usize, out: &mut Vec<GreenElement>) -> Option<usize> {
        match self.grammar.element(el) {
            Element::Token(t) => {
                let kind = t.kind;
                let tk = self.stream.tokens.get(TokenIdx::from(pos))?;
                if tk.kind != kind {
                    self.fail(pos, kind);
                    return None;
                }
                self.push_token(pos, out);
                Some(pos + 1)
            }
            Element::Definition(_) => self.definition(DefId(el), pos, out),
        }
    }

    fn definition(&mut self, def: DefId, pos: usize, out: &mut Vec<GreenElement>) -> Option<usize> {
        let key = (def, pos);

        if let Some(entry) = self.memo.get(&key) {
            self.memo_hits += 1;
            let (green, end) = entry.clone()?;
            out.push(NodeOrToken::Node(green));
            return Some(end);
        }

        if !self.active.insert(key) {
            log::trace!(
                "`{}` re-entered at token {pos}",
                self.grammar.definition(def).name
            );
            return None;
        }

        let grammar = self.grammar;
        let entry = match &grammar.definition(def).rule {
            Some(rule) => {
                let mut children = Vec::new();
                self.rule(rule, pos, &mut children).map(|end| {
                    let green = GreenNode::new(RawKind::definition(def).into(), children);
                    (green, end)
                })
            }
            None => {
                log::warn!("`{}` has no rule", grammar.definition(def).name);
                None
            }
        };

        self.active.remove(&key);
        self.memo.insert(key, entry.clone());

        let (green, end) = entry?;
        out.push(NodeOrToken::Node(green));
        Some(end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        lang::{KeywordTable, SurfaceSyntax},
        syntax::lex,
    };

    fn stream(src: &str) -> TokenStream {
        let keywords = KeywordTable::new(SurfaceSyntax::CSharp.data());
        lex::tokenize(SurfaceSyntax::CSharp, &keywords, src).unwrap()
    }

    /// `List = Ident (, Ident)*`
    fn list_grammar(trailing: bool) -> (Grammar, DefId) {
        let mut g = Grammar::new("test");
        let list = g.define("List");
        let ident = g.tk(TokenKind::Identifier);
        let comma = g.tk(TokenKind::Comma);
        let rule = ident.sep_by1(comma);
        g.set_rule(list, if trailing { rule.trailing() } else { rule });
        (g, list)
    }

    #[test]
    fn lossless_tree() {
        let (g, list) = list_grammar(false);
        let src = " a, /* c */ b ,c ";
        let tree = parse(&g, list, src, &stream(src)).unwrap();
        assert_eq!(tree.text().to_string(), src);
    }

    #[test]
    fn failure_reports_expectation() {
        let (g, list) = list_grammar(false);
        let src = "a, b,";
        let failure = parse(&g, list, src, &stream(src)).unwrap_err();
        assert_eq!(failure.at, TokenIdx::from(4));
        assert_eq!(failure.expected, [TokenKind::Identifier]);

        let (g, list) = list_grammar(true);
        assert!(parse(&g, list, src, &stream(src)).is_ok());
    }

    #[test]
    fn trailing_garbage_expects_eof() {
        let (g, list) = list_grammar(false);
        let src = "a b";
        let failure = parse(&g, list, src, &stream(src)).unwrap_err();
        assert_eq!(failure.at, TokenIdx::from(1));
        assert!(failure.expected.contains(&TokenKind::Eof));
    }

    #[test]
    fn left_recursion_fails_instead_of_looping() {
        let mut g = Grammar::new("test");
        let e = g.define("E");
        let plus = g.tk(TokenKind::Plus);
        let id = g.tk(TokenKind::Identifier);
        g.set_rule(e, (e + plus + id.clone()) | id);
        let src = "a + b";
        // the recursive alternative fails, so only `a` is matched
        assert!(parse(&g, e, src, &stream(src)).is_err());
        assert!(parse(&g, e, "a", &stream("a")).is_ok());
    }

    #[test]
    fn negative_lookahead() {
        let mut g = Grammar::new("test");
        let d = g.define("D");
        let id = g.tk(TokenKind::Identifier);
        let lp = g.tk(TokenKind::LParen);
        g.set_rule(d, id + lp.not());
        assert!(parse(&g, d, "a", &stream("a")).is_ok());
        assert!(parse(&g, d, "a(", &stream("a(")).is_err());
    }
}
