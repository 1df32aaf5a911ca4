//! Parsing and printing through the public API

use polysyn::{
    ast::{
        kind::{AssignmentOperator, BinaryOperator, KnownType, LiteralValue, TypeVariant},
        Ast, NodeId, NodeKind, Title,
    },
    grammar::node::{ParseChild, ParseNode},
    syntax::{self, token::TokenKind},
    util::diag::Severity,
    Fragment, Language,
};

use crate::util::{self, Test, TestResult};

/// Prints the source back in its own syntax and checks the re-parsed tree matches
fn round_trip(lang: &Language, test: Test) -> TestResult {
    let res = match lang.parse(&test.code) {
        Ok(res) => res,
        Err(err) => return test.fail(format!("parse error: {err}")),
    };

    let printed = match lang.write(&res.ast, res.root, &lang.default_options()) {
        Ok(s) => s,
        Err(err) => return test.fail(format!("write error: {err}")),
    };

    let reparsed = match lang.parse(&printed) {
        Ok(res) => res,
        Err(err) => return test.fail(format!("printed text doesn't parse: {err}\n{printed}")),
    };
    if !res.ast.match_nodes(res.root, &reparsed.ast, reparsed.root) {
        return test.fail(format!("re-parsed tree differs:\n{printed}"));
    }

    test.result(&printed)
}

#[test]
fn csharp_round_trip() {
    let src = include_str!("test_cases/round_trip_cs.txt");
    util::run_tests(src, |t| self::round_trip(&Language::csharp(), t));
}

#[test]
fn vb_round_trip() {
    let src = include_str!("test_cases/round_trip_vb.txt");
    util::run_tests(src, |t| self::round_trip(&Language::visual_basic(), t));
}

fn only(ast: &Ast, id: NodeId, title: Title) -> NodeId {
    let mut children = ast.children(id, title);
    let child = children.next().unwrap_or_else(|| panic!("no {title:?} child"));
    assert!(children.next().is_none(), "more than one {title:?} child");
    child
}

fn int_value(ast: &Ast, id: NodeId) -> u64 {
    match ast.kind(id) {
        NodeKind::PrimitiveExpression(lit) => match lit.value {
            LiteralValue::Integer { value, .. } => value,
            ref other => panic!("not an integer: {other:?}"),
        },
        other => panic!("not a literal: {other:?}"),
    }
}

#[test]
fn assignment_statement() {
    let cs = Language::csharp();
    let res = cs.parse_fragment(Fragment::Statement, "x = 1 + 2;").unwrap();
    let ast = &res.ast;

    assert_eq!(ast.kind(res.root), &NodeKind::ExpressionStatement);
    let assign = only(ast, res.root, Title::Expression);
    assert_eq!(
        ast.kind(assign),
        &NodeKind::AssignmentExpression(AssignmentOperator::Assign)
    );
    assert_eq!(ast.name_of(only(ast, assign, Title::Left)), Some("x"));

    let sum = only(ast, assign, Title::Value);
    assert_eq!(
        ast.kind(sum),
        &NodeKind::BinaryOperatorExpression(BinaryOperator::Add)
    );
    assert_eq!(int_value(ast, only(ast, sum, Title::Left)), 1);
    assert_eq!(int_value(ast, only(ast, sum, Title::Right)), 2);

    let printed = cs.write(ast, res.root, &cs.default_options()).unwrap();
    assert_eq!(printed, "x = 1 + 2;");
}

#[test]
fn class_with_field() {
    let cs = Language::csharp();
    let res = cs.parse("class Foo { int Bar; }").unwrap();
    let ast = &res.ast;

    let class = only(ast, res.root, Title::Members);
    assert_eq!(ast.kind(class), &NodeKind::TypeDeclaration(TypeVariant::Class));
    assert_eq!(ast.name_of(class), Some("Foo"));

    let field = only(ast, class, Title::Members);
    assert_eq!(ast.kind(field), &NodeKind::FieldDeclaration);
    assert_eq!(
        ast.kind(only(ast, field, Title::Type)),
        &NodeKind::PrimitiveType(KnownType::Int32)
    );
    let declarator = only(ast, field, Title::Variables);
    assert_eq!(ast.name_of(declarator), Some("Bar"));
    assert_eq!(ast.parent(declarator), Some(field));
}

#[test]
fn same_tree_from_both_syntaxes() {
    let cs = Language::csharp();
    let vb = Language::visual_basic();
    let a = cs.parse_fragment(Fragment::Expression, "a + b * (c - 1)").unwrap();
    let b = vb.parse_fragment(Fragment::Expression, "a + b * (c - 1)").unwrap();
    assert!(a.ast.match_nodes(a.root, &b.ast, b.root));
    assert!(b.ast.match_nodes(b.root, &a.ast, a.root));

    let c = vb.parse_fragment(Fragment::Expression, "a + b * c").unwrap();
    assert!(!a.ast.match_nodes(a.root, &c.ast, c.root));
}

#[test]
fn list_flattening() {
    let cs = Language::csharp();
    let src = "f(a, b, c)";
    let tree = syntax::parse_raw(&cs, Fragment::Expression, src).unwrap();

    let list = tree
        .descendants()
        .map(|n| ParseNode::new(cs.grammar(), n))
        .find(|n| n.name() == "ArgumentList")
        .expect("argument list node");

    let items = list.list_items();
    let elements: Vec<&str> = items
        .elements
        .iter()
        .map(|el| el.span().slice(src).trim())
        .collect();
    assert_eq!(elements, ["a", "b", "c"]);

    assert_eq!(items.separators.len(), 2);
    assert!(items
        .separators
        .iter()
        .all(|sep| matches!(sep, ParseChild::Token(tk) if tk.kind() == TokenKind::Comma)));

    // and the lowered invocation keeps only the elements
    let res = cs.parse_fragment(Fragment::Expression, src).unwrap();
    let args: Vec<_> = res
        .ast
        .children(res.root, Title::Arguments)
        .map(|arg| res.ast.name_of(arg).unwrap_or_default().to_string())
        .collect();
    assert_eq!(args, ["a", "b", "c"]);
}

#[test]
fn mistaken_empty_statement_warns() {
    let cs = Language::csharp();
    let res = cs
        .parse("class A { void F(bool x) { while (x); if (x) { } } }")
        .unwrap();
    assert_eq!(res.diagnostics.len(), 1);

    let warning = &res.diagnostics[0];
    assert_eq!(warning.severity(), Severity::Warning);
    assert_eq!(warning.location.line1(), 1);
    assert!(warning.message.contains("empty statement"), "{}", warning.message);
}

#[test]
fn vb_keywords_ignore_case() {
    let vb = Language::visual_basic();
    let upper = vb.parse("CLASS Foo\nEND CLASS\n").unwrap();
    let mixed = vb.parse("class Foo\nEnd Class\n").unwrap();
    assert!(upper.ast.match_nodes(upper.root, &mixed.ast, mixed.root));

    // identifiers keep their spelling
    let class = only(&upper.ast, upper.root, Title::Members);
    assert_eq!(upper.ast.name_of(class), Some("Foo"));

    let cs = Language::csharp();
    assert!(cs.parse("CLASS Foo { }").is_err());
}

#[test]
fn syntax_errors_are_located() {
    let vb = Language::visual_basic();
    let err = vb.parse("Class A\n    Sub F(\nEnd Class\n").unwrap_err();
    let diag = &err.diagnostics()[0];
    assert_eq!(diag.severity(), Severity::Error);
    assert!(diag.code_label.starts_with("BC"));
    assert!(diag.location.line1() >= 2, "{}", diag.location);
}

#[test]
fn vb_case_clauses() {
    let vb = Language::visual_basic();
    let src = "Select Case x\nCase 1 To 3, Is > 5, 7\ny = 1\nEnd Select\n";
    let res = vb.parse_fragment(Fragment::Statement, src).unwrap();
    let ast = &res.ast;

    let section = only(ast, res.root, Title::SwitchSections);
    let labels: Vec<NodeId> = ast.children(section, Title::CaseLabels).collect();
    assert_eq!(labels.len(), 3);

    assert_eq!(ast.kind(labels[0]), &NodeKind::CaseRange);
    assert_eq!(int_value(ast, only(ast, labels[0], Title::Expression)), 1);
    assert_eq!(int_value(ast, only(ast, labels[0], Title::Limit)), 3);

    assert_eq!(
        ast.kind(labels[1]),
        &NodeKind::CaseComparison(BinaryOperator::GreaterThan)
    );
    assert_eq!(int_value(ast, only(ast, labels[1], Title::Expression)), 5);

    assert_eq!(ast.kind(labels[2]), &NodeKind::CaseLabel);
    assert_eq!(int_value(ast, only(ast, labels[2], Title::Expression)), 7);

    // `Is` is optional
    let res = vb
        .parse_fragment(Fragment::Statement, "Select Case x\nCase <= 0\nEnd Select\n")
        .unwrap();
    let section = only(&res.ast, res.root, Title::SwitchSections);
    let label = only(&res.ast, section, Title::CaseLabels);
    assert_eq!(
        res.ast.kind(label),
        &NodeKind::CaseComparison(BinaryOperator::LessThanOrEqual)
    );
}

#[test]
fn csharp_pointer_types() {
    let cs = Language::csharp();
    let res = cs
        .parse_fragment(Fragment::Statement, "fixed (int* p = a) { }")
        .unwrap();
    let ast = &res.ast;
    assert_eq!(ast.kind(res.root), &NodeKind::FixedStatement);

    let ty = only(ast, res.root, Title::Type);
    assert_eq!(ast.kind(ty), &NodeKind::PointerType);
    assert_eq!(
        ast.kind(only(ast, ty, Title::Type)),
        &NodeKind::PrimitiveType(KnownType::Int32)
    );
    let printed = cs.write(ast, res.root, &cs.default_options()).unwrap();
    assert_eq!(printed, "fixed (int* p = a)\n{\n}");
}
