//! Conversion between the surface syntaxes

use polysyn::SurfaceSyntax;

use crate::util::{self, Test, TestResult};

fn convert(test: Test) -> TestResult {
    let prefix = test.title.split_whitespace().next().unwrap_or_default().to_string();
    let Some(from) = util::language_of(&prefix) else {
        return test.fail(format!("no surface syntax named `{prefix}`"));
    };
    let to = match from.syntax() {
        SurfaceSyntax::CSharp => util::language_of("vb"),
        SurfaceSyntax::VisualBasic => util::language_of("cs"),
    }
    .unwrap();

    let res = match from.parse(&test.code) {
        Ok(res) => res,
        Err(err) => return test.fail(format!("parse error: {err}")),
    };
    let printed = match to.write(&res.ast, res.root, &to.default_options()) {
        Ok(s) => s,
        Err(err) => return test.fail(format!("write error: {err}")),
    };

    // loops and modules change shape on the way; the output only has to parse
    match to.parse(&printed) {
        Ok(_) => test.result(&printed),
        Err(err) => test.fail(format!("converted text doesn't parse: {err}\n{printed}")),
    }
}

#[test]
fn convert_cases() {
    let src = include_str!("test_cases/convert.txt");
    util::run_tests(src, self::convert);
}
