//! Formatting options of the writers

use serde::{Deserialize, Serialize};

use crate::lang::SurfaceSyntax;

/// Where an opening brace goes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BraceStyle {
    /// `if (c) {`
    EndOfLine,
    /// `if (c)` then `{` on its own line
    NextLine,
}

/// Indentation and per-construct brace placement
///
/// Loaded from JSON by the CLI; missing fields take the defaults of C#.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormattingOptions {
    pub indent_size: usize,
    pub use_tabs: bool,
    pub namespace_brace: BraceStyle,
    pub type_brace: BraceStyle,
    pub method_brace: BraceStyle,
    pub constructor_brace: BraceStyle,
    pub property_brace: BraceStyle,
    pub accessor_brace: BraceStyle,
    pub statement_brace: BraceStyle,
    /// `int X { get; set; }` on one line
    pub compact_auto_properties: bool,
}

impl Default for FormattingOptions {
    fn default() -> Self {
        Self {
            indent_size: 4,
            use_tabs: false,
            namespace_brace: BraceStyle::NextLine,
            type_brace: BraceStyle::NextLine,
            method_brace: BraceStyle::NextLine,
            constructor_brace: BraceStyle::NextLine,
            property_brace: BraceStyle::NextLine,
            accessor_brace: BraceStyle::NextLine,
            statement_brace: BraceStyle::NextLine,
            compact_auto_properties: true,
        }
    }
}

impl FormattingOptions {
    /// Conventional defaults of the surface syntax
    pub fn for_syntax(syntax: SurfaceSyntax) -> Self {
        match syntax {
            SurfaceSyntax::CSharp => Self::default(),
            // braces only appear in array initializers, which are written inline
            SurfaceSyntax::VisualBasic => Self {
                compact_auto_properties: true,
                ..Self::default()
            },
        }
    }

    /// Same brace style everywhere
    pub fn with_braces(mut self, style: BraceStyle) -> Self {
        self.namespace_brace = style;
        self.type_brace = style;
        self.method_brace = style;
        self.constructor_brace = style;
        self.property_brace = style;
        self.accessor_brace = style;
        self.statement_brace = style;
        self
    }

    /// One level of indentation
    pub fn indent_unit(&self) -> String {
        if self.use_tabs {
            "\t".to_string()
        } else {
            " ".repeat(self.indent_size)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_takes_defaults() {
        let opts: FormattingOptions =
            serde_json::from_str(r#"{ "indent_size": 2, "method_brace": "end_of_line" }"#).unwrap();
        assert_eq!(opts.indent_size, 2);
        assert_eq!(opts.method_brace, BraceStyle::EndOfLine);
        assert_eq!(opts.type_brace, BraceStyle::NextLine);
        assert_eq!(opts.indent_unit(), "  ");
    }

    #[test]
    fn with_braces_sets_every_construct() {
        let opts = FormattingOptions::default().with_braces(BraceStyle::EndOfLine);
        assert_eq!(opts.namespace_brace, BraceStyle::EndOfLine);
        assert_eq!(opts.statement_brace, BraceStyle::EndOfLine);
    }
}
