//! Slot keys of AST nodes

/// Typed slot key identifying a child (or an ordered child collection) of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Title {
    // ----------------------------------------
    // Semantic slots
    // ----------------------------------------
    Identifier,
    Modifiers,
    Type,
    BaseTypes,
    Members,
    /// Namespace name
    Name,
    /// Imported namespace of a using directive
    Import,
    Parameters,
    Body,
    Variables,
    Initializer,
    Arguments,
    Target,
    Left,
    Right,
    Value,
    Expression,
    Condition,
    TrueExpression,
    FalseExpression,
    TrueStatement,
    FalseStatement,
    EmbeddedStatement,
    Statements,
    /// `for` header initializers
    Initializers,
    /// `for` header iterators
    Iterators,
    /// `For .. To <limit>`
    Limit,
    Step,
    TryBlock,
    CatchClauses,
    FinallyBlock,
    SwitchSections,
    CaseLabels,
    ResourceAcquisition,
    Getter,
    Setter,
    DefaultExpression,
    Elements,

    // ----------------------------------------
    // Syntax slots (ignored by structural match)
    // ----------------------------------------
    LeftParenthesis,
    RightParenthesis,
    LeftBrace,
    RightBrace,
    LeftBracket,
    RightBracket,
    Semicolon,
    Comma,
    Dot,
    Colon,
    /// `=` of initializers and defaults
    Assign,
    OperatorToken,
    QuestionMark,
    Keyword,
    /// VB `End X`
    EndKeyword,
    /// VB line break or `:`
    Terminator,
    /// Comments and blank lines before a statement or member
    LeadingTrivia,
    /// Comments before the closing token of a block, type or file
    TrailingTrivia,
}

impl Title {
    /// Pure-syntax slots: punctuation, keywords and trivia
    pub fn is_syntax(self) -> bool {
        self >= Title::LeftParenthesis
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn syntax_slots() {
        assert!(!Title::Elements.is_syntax());
        assert!(!Title::Identifier.is_syntax());
        assert!(Title::LeftParenthesis.is_syntax());
        assert!(Title::LeadingTrivia.is_syntax());
        assert!(Title::TrailingTrivia.is_syntax());
    }
}
