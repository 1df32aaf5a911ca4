//! Diagnostic rendering

use std::fmt;

use base::{
    ln::LineTable,
    span::{LineColumn, Span},
};
use colored::Colorize;

pub const QUOTE: colored::Color = colored::Color::BrightBlue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
    Message,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Message => "message",
        }
    }

    pub fn color(&self) -> colored::Color {
        match self {
            Self::Error => colored::Color::Red,
            Self::Warning => colored::Color::Yellow,
            Self::Message => colored::Color::Blue,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub trait Diagnostic {
    // [<code]<severity>: msg
    fn code(&self) -> &str;
    fn severity(&self) -> Severity;
    fn msg(&self) -> String;
    fn reason(&self) -> &str;
    //    ^^^^ <reason>
    fn span(&self) -> Span;
}

/// ```text
/// <severity>[code]: <msg>
/// --> <src_file>:<ln>:<col>
/// ```
#[derive(Debug)]
pub struct Header<'a> {
    pub code: &'a str,
    pub severity: Severity,
    pub msg: String,
    pub src_file: &'a str,
    pub ln_col: LineColumn,
}

impl<'a> fmt::Display for Header<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let severity_code = format!("{}[{}]", self.severity.as_str(), self.code);

        writeln!(
            f,
            "{}: {}\n--> {}:{}:{}",
            severity_code.color(self.severity.color()).bold(),
            self.msg.as_str().bold(),
            self.src_file,
            self.ln_col.line1(),
            self.ln_col.column1(),
        )
    }
}

/// ```text
///      |
/// <ln> | <line_text>
///      |    ^^^^ <reason>
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Window<'a> {
    pub severity: Severity,
    pub line1: u32,
    pub line_text: &'a str,
    /// Span within the line string
    pub line_span: Span,
    pub reason: &'a str,
}

impl<'a> fmt::Display for Window<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let n_digits = self::n_digits(self.line1 as usize);
        let indent = " ".repeat(n_digits);

        let vbar = "|".color(QUOTE).bold();
        let line = format!("{}", self.line1);

        writeln!(f, "{indent} {vbar}")?;
        writeln!(f, "{} {vbar} {}", line.color(QUOTE).bold(), self.line_text)?;
        writeln!(
            f,
            "{indent} {vbar} {} {}",
            self::reason_range_string(self.line_span)
                .color(self.severity.color())
                .bold(),
            self.reason.color(self.severity.color()).bold(),
        )?;

        Ok(())
    }
}

#[derive(Debug)]
pub struct Render<'a> {
    pub header: Header<'a>,
    pub window: Window<'a>,
}

impl<'a> fmt::Display for Render<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // NOTE: each format contains the last newline character, so don't use `writeln!`
        write!(f, "{}", self.header)?;
        write!(f, "{}", self.window)?;
        Ok(())
    }
}

/// Line diagnostic window
pub fn line<'a>(
    src_file: &'a str,
    src_text: &'a str,
    ln_tbl: &LineTable,
    diag: &'a impl Diagnostic,
) -> Render<'a> {
    let span = diag.span();
    let ln_col = ln_tbl.line_column(span.start);

    let header = Header {
        code: diag.code(),
        severity: diag.severity(),
        msg: diag.msg(),
        src_file,
        ln_col,
    };

    let line_text_span = ln_tbl.line_span(span.start);
    let line_text = line_text_span.slice(src_text).trim_end();

    // clamp multi-line spans to the first line
    let start = span.start - line_text_span.start;
    let end = (span.end.min(line_text_span.end) - line_text_span.start)
        .min(line_text.len() as u32)
        .max(start + 1);

    let window = Window {
        severity: diag.severity(),
        line1: ln_col.line1(),
        line_text,
        line_span: Span::from(start, end),
        reason: diag.reason(),
    };

    Render { header, window }
}

fn reason_range_string(line_span: Span) -> String {
    let mut s = String::new();
    s.push_str(&" ".repeat(line_span.start.into_usize()));
    s.push_str(&"^".repeat(line_span.len() as usize));
    s
}

fn n_digits(mut x: usize) -> usize {
    let mut n_digits = 0;

    loop {
        x /= 10;
        n_digits += 1;

        if x == 0 {
            break;
        }
    }

    n_digits
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Dummy;

    impl Diagnostic for Dummy {
        fn code(&self) -> &str {
            "E0000"
        }
        fn severity(&self) -> Severity {
            Severity::Error
        }
        fn msg(&self) -> String {
            "dummy".to_string()
        }
        fn reason(&self) -> &str {
            "here"
        }
        fn span(&self) -> Span {
            Span::from(6u32, 9u32)
        }
    }

    #[test]
    fn window_points_at_span() {
        colored::control::set_override(false);
        let src = "a = 1;\nbad + 2;\n";
        let tbl = LineTable::new(src);
        let render = self::line("x.cs", src, &tbl, &Dummy);
        // the span starts at the line break, so it's clamped to one column
        assert_eq!(render.window.line1, 1);
        assert_eq!(render.window.line_span, Span::from(6u32, 7u32));

        let text = format!("{}", render);
        assert!(text.starts_with("error[E0000]: dummy\n--> x.cs:1:7\n"));
    }

    #[test]
    fn digits() {
        assert_eq!(n_digits(0), 1);
        assert_eq!(n_digits(9), 1);
        assert_eq!(n_digits(10), 2);
    }
}
