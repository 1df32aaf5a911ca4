//! Name resolution through the public API

use polysyn::{
    ast::{kind::KnownType, NodeId, NodeKind, Title},
    resolve::{def::Definition, CaseSensitivity, ResolveResult, Semantics, TypeRef},
    Language, ParseResult,
};

fn identifiers<'r>(res: &'r ParseResult, name: &'r str) -> impl Iterator<Item = NodeId> + 'r {
    let ast = &res.ast;
    ast.descendants(res.root)
        .filter(move |id| matches!(ast.kind(*id), NodeKind::IdentifierExpression))
        .filter(move |id| ast.name_of(*id) == Some(name))
}

fn calls<'r>(res: &'r ParseResult, name: &'r str) -> impl Iterator<Item = NodeId> + 'r {
    let ast = &res.ast;
    ast.descendants(res.root)
        .filter(move |id| matches!(ast.kind(*id), NodeKind::InvocationExpression))
        .filter(move |id| {
            ast.child(*id, Title::Target)
                .map_or(false, |target| ast.name_of(target) == Some(name))
        })
}

fn field_name(result: &ResolveResult) -> Option<&str> {
    match result.definition().map(|d| d.as_ref()) {
        Some(Definition::Field(f)) => Some(f.name.as_str()),
        _ => None,
    }
}

#[test]
fn field_from_both_syntaxes() {
    let cs = Language::csharp().parse("class Foo { int Bar; void M() { Bar = 1; } }").unwrap();
    let vb = Language::visual_basic()
        .parse("Class Foo\n    Private Bar As Integer\n\n    Sub M()\n        Bar = 1\n    End Sub\nEnd Class\n")
        .unwrap();

    for res in [&cs, &vb] {
        let sema = Semantics::new(&res.ast, CaseSensitivity::Sensitive);
        let bar = identifiers(res, "Bar").next().unwrap();
        let result = sema.resolve(bar);
        assert_eq!(field_name(&result), Some("Bar"), "{result:?}");
        assert_eq!(result.ty(), Some(&TypeRef::Known(KnownType::Int32)));
        assert!(!result.is_error());
    }
}

#[test]
fn null_argument_is_ambiguous() {
    let res = Language::csharp()
        .parse("class A { void H(object o) { } void H(string s) { } void M() { H(null); H(\"s\"); } }")
        .unwrap();
    let sema = Semantics::new(&res.ast, CaseSensitivity::Sensitive);
    let mut h = calls(&res, "H");

    let ResolveResult::Error { message, candidates } = sema.resolve(h.next().unwrap()) else {
        panic!("expected an ambiguity");
    };
    assert!(message.contains("ambiguous"), "{message}");
    assert_eq!(candidates.len(), 2);
    assert!(candidates.iter().all(|c| c.category() == "method"));

    // the exact match wins
    let exact = sema.resolve(h.next().unwrap());
    let Some(Definition::Method(method)) = exact.definition().map(|d| d.as_ref()) else {
        panic!("expected a call, got {exact:?}");
    };
    let param = method.parameters[0].ty.unwrap();
    assert_eq!(sema.type_at(param), Some(TypeRef::Known(KnownType::String)));
}

#[test]
fn case_sensitivity_follows_the_language() {
    let src = "\
Class Foo
    Private counter As Integer

    Sub Bump()
        Counter += 1
        COUNTER = counter
    End Sub
End Class
";
    let vb = Language::visual_basic();
    let res = vb.parse(src).unwrap();

    let sema = Semantics::for_language(&res.ast, &vb);
    for name in ["Counter", "COUNTER", "counter"] {
        let id = identifiers(&res, name).next().unwrap();
        assert_eq!(field_name(&sema.resolve(id)), Some("counter"), "{name}");
    }

    // the same tree read with C# rules only finds the exact spelling
    let strict = Semantics::new(&res.ast, CaseSensitivity::Sensitive);
    let id = identifiers(&res, "COUNTER").next().unwrap();
    assert_eq!(
        strict.resolve(id),
        ResolveResult::UnknownIdentifier {
            name: "COUNTER".to_string()
        }
    );
}
