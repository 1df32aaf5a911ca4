//! Node kinds: the closed set of AST node variants and their scalar payloads

use std::fmt;

use crate::syntax::token::{NumberSuffix, TokenKind};
use crate::SurfaceSyntax;

/// Kind of an AST node, with the scalar data the node carries
///
/// Children live in the node's title slots; only data that isn't a node (names, operators,
/// literal values) is stored here.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    // ----------------------------------------
    // Leaves
    // ----------------------------------------
    /// Syntax token kept for range-accurate round trips (parentheses, separators, keywords)
    Token(AstToken),
    Identifier(String),
    Modifier(Modifier),
    Comment(Comment),
    BlankLine,

    // ----------------------------------------
    // Types
    // ----------------------------------------
    PrimitiveType(KnownType),
    SimpleType,
    MemberType,
    ArrayType { rank: u32 },
    /// C# `T*`
    PointerType,

    // ----------------------------------------
    // Expressions
    // ----------------------------------------
    PrimitiveExpression(Literal),
    IdentifierExpression,
    MemberReferenceExpression { null_conditional: bool },
    InvocationExpression,
    IndexerExpression,
    BinaryOperatorExpression(BinaryOperator),
    UnaryOperatorExpression(UnaryOperator),
    AssignmentExpression(AssignmentOperator),
    ParenthesizedExpression,
    ConditionalExpression,
    CastExpression(CastStyle),
    AsExpression,
    IsExpression,
    TypeOfExpression,
    TypeReferenceExpression,
    ThisReferenceExpression,
    BaseReferenceExpression,
    ObjectCreateExpression,
    ArrayCreateExpression(ArrayBounds),
    ArrayInitializerExpression,
    DirectionExpression(FieldDirection),

    // ----------------------------------------
    // Statements
    // ----------------------------------------
    BlockStatement,
    ExpressionStatement,
    VariableDeclarationStatement,
    VariableDeclarator,
    IfElseStatement,
    WhileStatement,
    DoLoopStatement(DoLoop),
    ForStatement,
    ForeachStatement,
    ReturnStatement,
    BreakStatement,
    ContinueStatement,
    ThrowStatement,
    TryCatchStatement,
    CatchClause,
    SwitchStatement,
    SwitchSection,
    CaseLabel,
    UsingStatement,
    LockStatement,
    EmptyStatement,

    // ----------------------------------------
    // Declarations
    // ----------------------------------------
    CompilationUnit,
    UsingDeclaration,
    NamespaceDeclaration,
    TypeDeclaration(TypeVariant),
    FieldDeclaration,
    MethodDeclaration,
    ConstructorDeclaration,
    ConstructorInitializer(CtorInitializerKind),
    PropertyDeclaration,
    Accessor(AccessorKind),
    EventDeclaration,
    ParameterDeclaration(ParameterModifier),
    EnumMemberDeclaration,

    // ----------------------------------------
    // Surface-syntax extensions
    // ----------------------------------------
    /// C# `fixed (T* p = ..) ..`
    FixedStatement,
    /// VB `Exit Sub`, `Exit For`, ..
    ExitStatement(ExitKind),
    /// VB `For i = a To b Step c .. Next`
    ForNextStatement,
    /// VB `Case a To b`
    CaseRange,
    /// VB `Case Is > a`
    CaseComparison(BinaryOperator),
}

impl NodeKind {
    /// Structural equality of the scalar payload
    ///
    /// Tokens compare by token code only and literals by interpreted value, so that the same
    /// program spelled differently still matches.
    pub fn matches(&self, other: &NodeKind) -> bool {
        match (self, other) {
            (NodeKind::Token(a), NodeKind::Token(b)) => a.kind == b.kind,
            (NodeKind::PrimitiveExpression(a), NodeKind::PrimitiveExpression(b)) => {
                a.value == b.value
            }
            (NodeKind::Comment(a), NodeKind::Comment(b)) => a.text.trim() == b.text.trim(),
            _ => self == other,
        }
    }

    /// Variant name, e.g. `BinaryOperatorExpression`
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Token(_) => "Token",
            NodeKind::Identifier(_) => "Identifier",
            NodeKind::Modifier(_) => "Modifier",
            NodeKind::Comment(_) => "Comment",
            NodeKind::BlankLine => "BlankLine",
            NodeKind::PrimitiveType(_) => "PrimitiveType",
            NodeKind::SimpleType => "SimpleType",
            NodeKind::MemberType => "MemberType",
            NodeKind::ArrayType { .. } => "ArrayType",
            NodeKind::PointerType => "PointerType",
            NodeKind::PrimitiveExpression(_) => "PrimitiveExpression",
            NodeKind::IdentifierExpression => "IdentifierExpression",
            NodeKind::MemberReferenceExpression { .. } => "MemberReferenceExpression",
            NodeKind::InvocationExpression => "InvocationExpression",
            NodeKind::IndexerExpression => "IndexerExpression",
            NodeKind::BinaryOperatorExpression(_) => "BinaryOperatorExpression",
            NodeKind::UnaryOperatorExpression(_) => "UnaryOperatorExpression",
            NodeKind::AssignmentExpression(_) => "AssignmentExpression",
            NodeKind::ParenthesizedExpression => "ParenthesizedExpression",
            NodeKind::ConditionalExpression => "ConditionalExpression",
            NodeKind::CastExpression(_) => "CastExpression",
            NodeKind::AsExpression => "AsExpression",
            NodeKind::IsExpression => "IsExpression",
            NodeKind::TypeOfExpression => "TypeOfExpression",
            NodeKind::TypeReferenceExpression => "TypeReferenceExpression",
            NodeKind::ThisReferenceExpression => "ThisReferenceExpression",
            NodeKind::BaseReferenceExpression => "BaseReferenceExpression",
            NodeKind::ObjectCreateExpression => "ObjectCreateExpression",
            NodeKind::ArrayCreateExpression(_) => "ArrayCreateExpression",
            NodeKind::ArrayInitializerExpression => "ArrayInitializerExpression",
            NodeKind::DirectionExpression(_) => "DirectionExpression",
            NodeKind::BlockStatement => "BlockStatement",
            NodeKind::ExpressionStatement => "ExpressionStatement",
            NodeKind::VariableDeclarationStatement => "VariableDeclarationStatement",
            NodeKind::VariableDeclarator => "VariableDeclarator",
            NodeKind::IfElseStatement => "IfElseStatement",
            NodeKind::WhileStatement => "WhileStatement",
            NodeKind::DoLoopStatement(_) => "DoLoopStatement",
            NodeKind::ForStatement => "ForStatement",
            NodeKind::ForeachStatement => "ForeachStatement",
            NodeKind::ReturnStatement => "ReturnStatement",
            NodeKind::BreakStatement => "BreakStatement",
            NodeKind::ContinueStatement => "ContinueStatement",
            NodeKind::ThrowStatement => "ThrowStatement",
            NodeKind::TryCatchStatement => "TryCatchStatement",
            NodeKind::CatchClause => "CatchClause",
            NodeKind::SwitchStatement => "SwitchStatement",
            NodeKind::SwitchSection => "SwitchSection",
            NodeKind::CaseLabel => "CaseLabel",
            NodeKind::UsingStatement => "UsingStatement",
            NodeKind::LockStatement => "LockStatement",
            NodeKind::EmptyStatement => "EmptyStatement",
            NodeKind::CompilationUnit => "CompilationUnit",
            NodeKind::UsingDeclaration => "UsingDeclaration",
            NodeKind::NamespaceDeclaration => "NamespaceDeclaration",
            NodeKind::TypeDeclaration(_) => "TypeDeclaration",
            NodeKind::FieldDeclaration => "FieldDeclaration",
            NodeKind::MethodDeclaration => "MethodDeclaration",
            NodeKind::ConstructorDeclaration => "ConstructorDeclaration",
            NodeKind::ConstructorInitializer(_) => "ConstructorInitializer",
            NodeKind::PropertyDeclaration => "PropertyDeclaration",
            NodeKind::Accessor(_) => "Accessor",
            NodeKind::EventDeclaration => "EventDeclaration",
            NodeKind::ParameterDeclaration(_) => "ParameterDeclaration",
            NodeKind::EnumMemberDeclaration => "EnumMemberDeclaration",
            NodeKind::FixedStatement => "FixedStatement",
            NodeKind::ExitStatement(_) => "ExitStatement",
            NodeKind::ForNextStatement => "ForNextStatement",
            NodeKind::CaseRange => "CaseRange",
            NodeKind::CaseComparison(_) => "CaseComparison",
        }
    }

    pub fn is_expression(&self) -> bool {
        matches!(
            self,
            NodeKind::PrimitiveExpression(_)
                | NodeKind::IdentifierExpression
                | NodeKind::MemberReferenceExpression { .. }
                | NodeKind::InvocationExpression
                | NodeKind::IndexerExpression
                | NodeKind::BinaryOperatorExpression(_)
                | NodeKind::UnaryOperatorExpression(_)
                | NodeKind::AssignmentExpression(_)
                | NodeKind::ParenthesizedExpression
                | NodeKind::ConditionalExpression
                | NodeKind::CastExpression(_)
                | NodeKind::AsExpression
                | NodeKind::IsExpression
                | NodeKind::TypeOfExpression
                | NodeKind::TypeReferenceExpression
                | NodeKind::ThisReferenceExpression
                | NodeKind::BaseReferenceExpression
                | NodeKind::ObjectCreateExpression
                | NodeKind::ArrayCreateExpression(_)
                | NodeKind::ArrayInitializerExpression
                | NodeKind::DirectionExpression(_)
        )
    }

    pub fn is_type(&self) -> bool {
        matches!(
            self,
            NodeKind::PrimitiveType(_)
                | NodeKind::SimpleType
                | NodeKind::MemberType
                | NodeKind::ArrayType { .. }
                | NodeKind::PointerType
        )
    }

    pub fn is_statement(&self) -> bool {
        matches!(
            self,
            NodeKind::BlockStatement
                | NodeKind::ExpressionStatement
                | NodeKind::VariableDeclarationStatement
                | NodeKind::IfElseStatement
                | NodeKind::WhileStatement
                | NodeKind::DoLoopStatement(_)
                | NodeKind::ForStatement
                | NodeKind::ForeachStatement
                | NodeKind::ReturnStatement
                | NodeKind::BreakStatement
                | NodeKind::ContinueStatement
                | NodeKind::ThrowStatement
                | NodeKind::TryCatchStatement
                | NodeKind::SwitchStatement
                | NodeKind::UsingStatement
                | NodeKind::LockStatement
                | NodeKind::EmptyStatement
                | NodeKind::FixedStatement
                | NodeKind::ExitStatement(_)
                | NodeKind::ForNextStatement
        )
    }

    /// Loops a `break` / `continue` / `Exit` can refer to
    pub fn is_loop(&self) -> bool {
        matches!(
            self,
            NodeKind::WhileStatement
                | NodeKind::DoLoopStatement(_)
                | NodeKind::ForStatement
                | NodeKind::ForeachStatement
                | NodeKind::ForNextStatement
        )
    }

    /// Surface syntax an extension kind originates from, if any
    pub fn extension_of(&self) -> Option<SurfaceSyntax> {
        match self {
            NodeKind::FixedStatement | NodeKind::PointerType => Some(SurfaceSyntax::CSharp),
            NodeKind::ExitStatement(_)
            | NodeKind::ForNextStatement
            | NodeKind::CaseRange
            | NodeKind::CaseComparison(_) => {
                Some(SurfaceSyntax::VisualBasic)
            }
            _ => None,
        }
    }
}

/// Leaf token data. Matching compares the token code only.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AstToken {
    pub kind: TokenKind,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommentKind {
    /// `// ..` / `' ..`
    Line,
    /// `/// ..` / `''' ..`
    Doc,
    /// `/* .. */`
    Block,
}

/// Comment text without its markers
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Comment {
    pub kind: CommentKind,
    pub text: String,
}

/// Literal with its interpreted value and, if parsed, the original spelling
#[derive(Debug, Clone, PartialEq)]
pub struct Literal {
    pub value: LiteralValue,
    pub raw: Option<RawLiteral>,
}

impl Literal {
    pub fn new(value: LiteralValue) -> Self {
        Self { value, raw: None }
    }

    /// Original spelling, if the literal was parsed from the given surface syntax
    pub fn raw_for(&self, syntax: SurfaceSyntax) -> Option<&str> {
        self.raw
            .as_ref()
            .filter(|raw| raw.syntax == syntax)
            .map(|raw| raw.text.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RawLiteral {
    pub syntax: SurfaceSyntax,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    Null,
    Boolean(bool),
    Integer { value: u64, suffix: NumberSuffix },
    Real { value: f64, suffix: NumberSuffix },
    String(String),
    Char(char),
}

impl fmt::Display for LiteralValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LiteralValue::Null => write!(f, "null"),
            LiteralValue::Boolean(b) => write!(f, "{b}"),
            LiteralValue::Integer { value, .. } => write!(f, "{value}"),
            LiteralValue::Real { value, .. } => write!(f, "{value:?}"),
            LiteralValue::String(s) => write!(f, "{s:?}"),
            LiteralValue::Char(c) => write!(f, "{c:?}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Modifier {
    Public,
    Private,
    Protected,
    /// C# `internal`, VB `Friend`
    Internal,
    /// C# `static`, VB `Shared`
    Static,
    /// C# `abstract`, VB `MustInherit` / `MustOverride`
    Abstract,
    /// C# `virtual`, VB `Overridable`
    Virtual,
    /// C# `override`, VB `Overrides`
    Override,
    /// C# `sealed`, VB `NotInheritable` / `NotOverridable`
    Sealed,
    Readonly,
    Const,
    Extern,
    /// C# `new`, VB `Shadows`
    New,
    Partial,
    Volatile,
    Unsafe,
    /// VB `WriteOnly`
    WriteOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeVariant {
    Class,
    Struct,
    Interface,
    Enum,
    /// VB `Module`
    Module,
}

/// Types with a keyword spelling in both surface syntaxes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KnownType {
    Void,
    Object,
    String,
    Boolean,
    Char,
    SByte,
    Byte,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Single,
    Double,
    Decimal,
}

impl KnownType {
    pub const ALL: [KnownType; 16] = [
        KnownType::Void,
        KnownType::Object,
        KnownType::String,
        KnownType::Boolean,
        KnownType::Char,
        KnownType::SByte,
        KnownType::Byte,
        KnownType::Int16,
        KnownType::UInt16,
        KnownType::Int32,
        KnownType::UInt32,
        KnownType::Int64,
        KnownType::UInt64,
        KnownType::Single,
        KnownType::Double,
        KnownType::Decimal,
    ];

    /// Name in the `System` namespace, e.g. `Int32`
    pub fn name(self) -> &'static str {
        match self {
            KnownType::Void => "Void",
            KnownType::Object => "Object",
            KnownType::String => "String",
            KnownType::Boolean => "Boolean",
            KnownType::Char => "Char",
            KnownType::SByte => "SByte",
            KnownType::Byte => "Byte",
            KnownType::Int16 => "Int16",
            KnownType::UInt16 => "UInt16",
            KnownType::Int32 => "Int32",
            KnownType::UInt32 => "UInt32",
            KnownType::Int64 => "Int64",
            KnownType::UInt64 => "UInt64",
            KnownType::Single => "Single",
            KnownType::Double => "Double",
            KnownType::Decimal => "Decimal",
        }
    }

    pub fn csharp_keyword(self) -> &'static str {
        match self {
            KnownType::Void => "void",
            KnownType::Object => "object",
            KnownType::String => "string",
            KnownType::Boolean => "bool",
            KnownType::Char => "char",
            KnownType::SByte => "sbyte",
            KnownType::Byte => "byte",
            KnownType::Int16 => "short",
            KnownType::UInt16 => "ushort",
            KnownType::Int32 => "int",
            KnownType::UInt32 => "uint",
            KnownType::Int64 => "long",
            KnownType::UInt64 => "ulong",
            KnownType::Single => "float",
            KnownType::Double => "double",
            KnownType::Decimal => "decimal",
        }
    }

    /// VB has no `Void`; it is spelled by choosing `Sub` over `Function`
    pub fn vb_keyword(self) -> &'static str {
        match self {
            KnownType::Void => "Void",
            KnownType::Object => "Object",
            KnownType::String => "String",
            KnownType::Boolean => "Boolean",
            KnownType::Char => "Char",
            KnownType::SByte => "SByte",
            KnownType::Byte => "Byte",
            KnownType::Int16 => "Short",
            KnownType::UInt16 => "UShort",
            KnownType::Int32 => "Integer",
            KnownType::UInt32 => "UInteger",
            KnownType::Int64 => "Long",
            KnownType::UInt64 => "ULong",
            KnownType::Single => "Single",
            KnownType::Double => "Double",
            KnownType::Decimal => "Decimal",
        }
    }

    pub fn from_token(kind: TokenKind) -> Option<Self> {
        use TokenKind as K;
        Some(match kind {
            K::Void => KnownType::Void,
            K::Object => KnownType::Object,
            K::String => KnownType::String,
            K::Bool | K::Boolean => KnownType::Boolean,
            K::Char => KnownType::Char,
            K::SByte => KnownType::SByte,
            K::Byte => KnownType::Byte,
            K::Short => KnownType::Int16,
            K::UShort => KnownType::UInt16,
            K::Int | K::Integer => KnownType::Int32,
            K::UInt | K::UInteger => KnownType::UInt32,
            K::Long => KnownType::Int64,
            K::ULong => KnownType::UInt64,
            K::Float | K::Single => KnownType::Single,
            K::Double => KnownType::Double,
            K::Decimal => KnownType::Decimal,
            _ => return None,
        })
    }

    pub fn is_numeric(self) -> bool {
        !matches!(
            self,
            KnownType::Void | KnownType::Object | KnownType::String | KnownType::Boolean
        )
    }

    pub fn is_integral(self) -> bool {
        matches!(
            self,
            KnownType::SByte
                | KnownType::Byte
                | KnownType::Int16
                | KnownType::UInt16
                | KnownType::Int32
                | KnownType::UInt32
                | KnownType::Int64
                | KnownType::UInt64
        )
    }

    /// Implicit numeric conversion `self -> to`
    pub fn widens_to(self, to: KnownType) -> bool {
        use KnownType as T;
        if self == to {
            return true;
        }
        match self {
            T::SByte => matches!(to, T::Int16 | T::Int32 | T::Int64 | T::Single | T::Double | T::Decimal),
            T::Byte => matches!(
                to,
                T::Int16 | T::UInt16 | T::Int32 | T::UInt32 | T::Int64 | T::UInt64 | T::Single | T::Double | T::Decimal
            ),
            T::Int16 => matches!(to, T::Int32 | T::Int64 | T::Single | T::Double | T::Decimal),
            T::UInt16 => matches!(
                to,
                T::Int32 | T::UInt32 | T::Int64 | T::UInt64 | T::Single | T::Double | T::Decimal
            ),
            T::Char => matches!(
                to,
                T::UInt16 | T::Int32 | T::UInt32 | T::Int64 | T::UInt64 | T::Single | T::Double | T::Decimal
            ),
            T::Int32 => matches!(to, T::Int64 | T::Single | T::Double | T::Decimal),
            T::UInt32 => matches!(to, T::Int64 | T::UInt64 | T::Single | T::Double | T::Decimal),
            T::Int64 | T::UInt64 => matches!(to, T::Single | T::Double | T::Decimal),
            T::Single => matches!(to, T::Double),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulus,
    /// VB `\`
    IntegerDivide,
    /// VB `^`
    Power,
    /// VB `&`
    Concat,
    ShiftLeft,
    ShiftRight,
    BitwiseAnd,
    BitwiseOr,
    ExclusiveOr,
    ConditionalAnd,
    ConditionalOr,
    Equality,
    InEquality,
    LessThan,
    GreaterThan,
    LessThanOrEqual,
    GreaterThanOrEqual,
    NullCoalescing,
    /// VB `Is`
    ReferenceEquality,
    /// VB `IsNot`
    ReferenceInequality,
}

impl BinaryOperator {
    /// Binding power in C# terms, higher binds tighter
    pub fn precedence(self) -> u8 {
        use BinaryOperator as B;
        match self {
            B::NullCoalescing => 1,
            B::ConditionalOr => 2,
            B::ConditionalAnd => 3,
            B::BitwiseOr => 4,
            B::ExclusiveOr => 5,
            B::BitwiseAnd => 6,
            B::Equality | B::InEquality | B::ReferenceEquality | B::ReferenceInequality => 7,
            B::LessThan | B::GreaterThan | B::LessThanOrEqual | B::GreaterThanOrEqual => 8,
            B::ShiftLeft | B::ShiftRight => 9,
            B::Concat => 10,
            B::Add | B::Subtract => 11,
            B::Modulus => 12,
            B::IntegerDivide => 13,
            B::Multiply | B::Divide => 14,
            B::Power => 15,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOperator {
    /// `!x`, VB `Not x`
    Not,
    /// `~x`
    BitNot,
    Minus,
    Plus,
    /// `++x`
    Increment,
    /// `--x`
    Decrement,
    /// `x++`
    PostIncrement,
    /// `x--`
    PostDecrement,
}

impl UnaryOperator {
    pub fn is_postfix(self) -> bool {
        matches!(self, UnaryOperator::PostIncrement | UnaryOperator::PostDecrement)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssignmentOperator {
    Assign,
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulus,
    /// VB `\=`
    IntegerDivide,
    /// VB `^=`
    Power,
    /// VB `&=`
    Concat,
    ShiftLeft,
    ShiftRight,
    BitwiseAnd,
    BitwiseOr,
    ExclusiveOr,
}

impl AssignmentOperator {
    /// Binary operator a compound assignment applies
    pub fn binary(self) -> Option<BinaryOperator> {
        use AssignmentOperator as A;
        use BinaryOperator as B;
        Some(match self {
            A::Assign => return None,
            A::Add => B::Add,
            A::Subtract => B::Subtract,
            A::Multiply => B::Multiply,
            A::Divide => B::Divide,
            A::Modulus => B::Modulus,
            A::IntegerDivide => B::IntegerDivide,
            A::Power => B::Power,
            A::Concat => B::Concat,
            A::ShiftLeft => B::ShiftLeft,
            A::ShiftRight => B::ShiftRight,
            A::BitwiseAnd => B::BitwiseAnd,
            A::BitwiseOr => B::BitwiseOr,
            A::ExclusiveOr => B::ExclusiveOr,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CastStyle {
    /// C# `(T)x`, VB `CType(x, T)`
    Explicit,
    /// VB `DirectCast(x, T)`
    Direct,
}

/// How the sizes of an array creation are spelled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArrayBounds {
    /// C# `new int[3]`: three elements
    Length,
    /// VB `New Integer(2) {}`: upper bound, three elements
    UpperBound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldDirection {
    Ref,
    Out,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoopTest {
    /// `Do .. Loop`
    None,
    /// `Do While c .. Loop`
    Pre,
    /// `do .. while (c);`
    Post,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DoLoop {
    pub test: LoopTest,
    /// `Until` instead of `While`
    pub until: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExitKind {
    Sub,
    Function,
    Property,
    Do,
    For,
    While,
    Select,
    Try,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParameterModifier {
    None,
    Ref,
    Out,
    Params,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessorKind {
    Get,
    Set,
    Add,
    Remove,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CtorInitializerKind {
    Base,
    This,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_payload_matches_by_code() {
        let a = NodeKind::Token(AstToken {
            kind: TokenKind::Class,
            text: "class".to_string(),
        });
        let b = NodeKind::Token(AstToken {
            kind: TokenKind::Class,
            text: "Class".to_string(),
        });
        let c = NodeKind::Token(AstToken {
            kind: TokenKind::Struct,
            text: "class".to_string(),
        });
        assert!(a.matches(&b));
        assert!(!a.matches(&c));
    }

    #[test]
    fn literal_payload_ignores_spelling() {
        let value = LiteralValue::Integer {
            value: 16,
            suffix: NumberSuffix::None,
        };
        let hex = Literal {
            value: value.clone(),
            raw: Some(RawLiteral {
                syntax: SurfaceSyntax::CSharp,
                text: "0x10".to_string(),
            }),
        };
        let dec = Literal::new(value);
        assert!(NodeKind::PrimitiveExpression(hex).matches(&NodeKind::PrimitiveExpression(dec)));
    }

    #[test]
    fn widening() {
        assert!(KnownType::Int32.widens_to(KnownType::Int64));
        assert!(KnownType::Int32.widens_to(KnownType::Double));
        assert!(!KnownType::Int64.widens_to(KnownType::Int32));
        assert!(!KnownType::String.widens_to(KnownType::Object));
    }
}
