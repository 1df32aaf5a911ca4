//! Test utilities, including data-driven ones.

use std::fmt::{self, Write};

use polysyn::{Language, SurfaceSyntax};

pub type TestResult<T = ()> = Result<T, TestError>;

/// Parsed test case
#[derive(Debug, Clone)]
pub struct Test {
    pub title: String,
    pub code: String,
    pub expected: String,
}

impl Test {
    pub fn result(self, output: &str) -> TestResult {
        // REMARK: trimmed
        if output.trim() == self.expected.trim() {
            Ok(())
        } else {
            Err(TestError {
                test: self.clone(),
                output: output.to_string(),
            })
        }
    }

    /// Fails the case with a message in place of the output
    pub fn fail(self, msg: impl fmt::Display) -> TestResult {
        let output = format!("<{msg}>");
        Err(TestError { test: self, output })
    }
}

#[derive(Debug, Clone)]
pub struct TestError {
    pub test: Test,
    pub output: String,
}

impl fmt::Display for TestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}
--- code:
{}
--- output:
{}
--- expected:
{}",
            self.test.title, self.test.code, self.output, self.test.expected,
        )
    }
}

pub fn run_tests(src: &str, runner: fn(Test) -> TestResult) {
    let tests = self::collect_tests(src);
    assert!(!tests.is_empty(), "no test case found");

    let errs = tests
        .into_iter()
        .filter_map(|t| runner(t).err())
        .collect::<Vec<_>>();

    if errs.is_empty() {
        return;
    }

    let mut s = String::new();
    writeln!(s, "Errors:").unwrap();
    for e in &errs {
        writeln!(s, "{}", e).unwrap();
        writeln!(s).unwrap();
    }

    panic!("{}", s);
}

/// Splits a case file: title line and code, 40 hyphens, expected output, 40 hyphens, ..
///
/// Lines starting with `//` in the header are comments.
pub fn collect_tests(src: &str) -> Vec<Test> {
    let mut chunks = {
        // 40 hyphens
        let delim = r#"----------------------------------------"#;
        src.split(delim)
    };

    let mut tests = vec![];
    while let Some(header) = chunks.next() {
        let expected = match chunks.next() {
            Some(block) => block,
            None => break,
        };

        let mut header = header
            .lines()
            .filter(|ln| !ln.starts_with("//"))
            .skip_while(|ln| ln.trim().is_empty());

        // first line: title
        let title = match header.next() {
            Some(t) => t,
            None => break,
        };

        // other lines: code
        let code = header.collect::<Vec<&str>>().join("\n");

        tests.push(Test {
            title: title.trim().to_string(),
            code: code.trim().to_string(),
            // keep inner indentation; only the separating newlines go
            expected: expected.trim_matches('\n').to_string(),
        });
    }

    tests
}

/// Language named by a `cs` / `vb` prefix of a case title
pub fn language_of(prefix: &str) -> Option<Language> {
    SurfaceSyntax::from_extension(prefix).map(Language::new)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn case_file_format() {
        let src = "\
// comment
first
code 1
----------------------------------------
out 1
----------------------------------------

second
  code 2
----------------------------------------
    out 2
----------------------------------------
";
        let tests = collect_tests(src);
        assert_eq!(tests.len(), 2);
        assert_eq!(tests[0].title, "first");
        assert_eq!(tests[0].code, "code 1");
        assert_eq!(tests[0].expected, "out 1");
        assert_eq!(tests[1].code, "code 2");
        assert_eq!(tests[1].expected, "    out 2");
    }
}
