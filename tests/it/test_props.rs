//! Properties over generated input

use proptest::prelude::*;

use polysyn::{syntax::token::TokenKind, Fragment, Language};

/// First significant token of the word
fn classify(lang: &Language, word: &str) -> TokenKind {
    let stream = lang.tokenize(word).unwrap();
    let kind = stream
        .kinds()
        .find(|k| !k.is_trivia() && *k != TokenKind::NewLine)
        .unwrap();
    kind
}

/// Arithmetic over a few names and small integers, fully parenthesized
fn arith() -> impl Strategy<Value = String> {
    let leaf = prop_oneof![
        prop::sample::select(vec!["a", "b", "total", "x1"]).prop_map(str::to_string),
        (0u32..1000).prop_map(|n| n.to_string()),
    ];
    leaf.prop_recursive(4, 32, 2, |inner| {
        (inner.clone(), prop::sample::select(vec!["+", "-", "*"]), inner)
            .prop_map(|(l, op, r)| format!("({l} {op} {r})"))
    })
}

proptest! {
    #[test]
    fn csharp_keywords_are_exact(
        kw in prop::sample::select(vec!["abstract", "class", "int", "return", "while"]),
        suffix in "[0-9][a-z0-9_]{0,3}",
    ) {
        let cs = Language::csharp();
        prop_assert!(classify(&cs, kw).is_keyword());
        prop_assert_eq!(classify(&cs, &format!("{kw}{suffix}")), TokenKind::Identifier);
        prop_assert_eq!(classify(&cs, &kw.to_uppercase()), TokenKind::Identifier);
    }

    #[test]
    fn vb_keywords_ignore_case(
        kw in prop::sample::select(vec!["Class", "Dim", "Integer", "Module", "Return", "While"]),
        upper in prop::collection::vec(any::<bool>(), 7),
    ) {
        let vb = Language::visual_basic();
        let spelled: String = kw
            .chars()
            .zip(upper.iter().cycle())
            .map(|(c, up)| if *up { c.to_ascii_uppercase() } else { c.to_ascii_lowercase() })
            .collect();
        prop_assert_eq!(classify(&vb, &spelled), classify(&vb, kw));
        prop_assert!(classify(&vb, kw).is_keyword());
    }

    #[test]
    fn matching_is_reflexive_and_symmetric(a in arith(), b in arith()) {
        let cs = Language::csharp();
        let x = cs.parse_fragment(Fragment::Expression, &a).unwrap();
        let y = cs.parse_fragment(Fragment::Expression, &b).unwrap();

        prop_assert!(x.ast.match_nodes(x.root, &x.ast, x.root));
        prop_assert_eq!(
            x.ast.match_nodes(x.root, &y.ast, y.root),
            y.ast.match_nodes(y.root, &x.ast, x.root)
        );
        if a == b {
            prop_assert!(x.ast.match_nodes(x.root, &y.ast, y.root));
        }
    }

    #[test]
    fn printed_expressions_reparse_to_the_same_tree(src in arith()) {
        let cs = Language::csharp();
        let vb = Language::visual_basic();
        let parsed = cs.parse_fragment(Fragment::Expression, &src).unwrap();

        for lang in [&cs, &vb] {
            let printed = lang.write(&parsed.ast, parsed.root, &lang.default_options()).unwrap();
            let reparsed = lang.parse_fragment(Fragment::Expression, &printed).unwrap();
            prop_assert!(
                parsed.ast.match_nodes(parsed.root, &reparsed.ast, reparsed.root),
                "{} printed as {}",
                src,
                printed
            );
        }
    }
}
