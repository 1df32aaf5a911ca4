//! Typed handles over AST nodes
//!
//! A handle is a [`NodeId`] known to be of a certain [`NodeKind`]. Accessors are thin wrappers over
//! the slot primitives of [`Ast`], so the parent invariants hold no matter which API is used.

use crate::ast::{
    kind::{
        AccessorKind, AssignmentOperator, BinaryOperator, ExitKind, Literal, Modifier, NodeKind,
        TypeVariant, UnaryOperator,
    },
    Ast, NodeId, Title,
};

/// Typed view of a node
pub trait AstNode: Sized + Copy {
    fn can_cast(kind: &NodeKind) -> bool;

    #[doc(hidden)]
    fn from_id_unchecked(id: NodeId) -> Self;

    fn id(&self) -> NodeId;

    fn cast(ast: &Ast, id: NodeId) -> Option<Self> {
        if Self::can_cast(ast.kind(id)) {
            Some(Self::from_id_unchecked(id))
        } else {
            None
        }
    }
}

/// Ordered, title-scoped children of one node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AstNodeCollection {
    pub owner: NodeId,
    pub title: Title,
}

impl AstNodeCollection {
    pub fn new(owner: NodeId, title: Title) -> Self {
        Self { owner, title }
    }

    pub fn iter<'a>(&self, ast: &'a Ast) -> impl Iterator<Item = NodeId> + 'a {
        ast.children(self.owner, self.title)
    }

    /// Elements of the given type, skipping others
    pub fn typed<'a, N: AstNode + 'a>(&self, ast: &'a Ast) -> impl Iterator<Item = N> + 'a {
        self.iter(ast).filter_map(move |id| N::cast(ast, id))
    }

    pub fn len(&self, ast: &Ast) -> usize {
        self.iter(ast).count()
    }

    pub fn is_empty(&self, ast: &Ast) -> bool {
        self.iter(ast).next().is_none()
    }

    pub fn get(&self, ast: &Ast, index: usize) -> Option<NodeId> {
        self.iter(ast).nth(index)
    }

    pub fn append(&self, ast: &mut Ast, child: NodeId) {
        ast.append_child(self.owner, self.title, child);
    }

    pub fn extend(&self, ast: &mut Ast, children: impl IntoIterator<Item = NodeId>) {
        ast.extend_children(self.owner, self.title, children);
    }
}

macro_rules! def_node {
    (
        $(
            $( #[$meta:meta] )*
            $ty:ident: $pat:pat => {
                $( $get:ident / $set:ident: $title:ident; )*
                $( [$lget:ident / $add:ident]: $ltitle:ident; )*
            }
        )*
    ) => {
        $(
            $( #[$meta] )*
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
            pub struct $ty(pub(crate) NodeId);

            impl AstNode for $ty {
                fn can_cast(kind: &NodeKind) -> bool {
                    matches!(kind, $pat)
                }

                fn from_id_unchecked(id: NodeId) -> Self {
                    Self(id)
                }

                fn id(&self) -> NodeId {
                    self.0
                }
            }

            #[allow(unused)]
            impl $ty {
                $(
                    pub fn $get(self, ast: &Ast) -> Option<NodeId> {
                        ast.child(self.0, Title::$title)
                    }

                    pub fn $set(self, ast: &mut Ast, child: Option<NodeId>) -> Option<NodeId> {
                        ast.set_child(self.0, Title::$title, child)
                    }
                )*

                $(
                    pub fn $lget(self) -> AstNodeCollection {
                        AstNodeCollection::new(self.0, Title::$ltitle)
                    }

                    pub fn $add(self, ast: &mut Ast, child: NodeId) {
                        ast.append_child(self.0, Title::$ltitle, child);
                    }
                )*
            }
        )*
    };
}

def_node! {
    // ----------------------------------------
    // Types
    // ----------------------------------------

    /// `int`, `Integer`
    PrimitiveType: NodeKind::PrimitiveType(_) => {}

    /// `Foo`
    SimpleType: NodeKind::SimpleType => {
        identifier / set_identifier: Identifier;
    }

    /// `System.Foo`
    MemberType: NodeKind::MemberType => {
        target / set_target: Target;
        identifier / set_identifier: Identifier;
    }

    /// `T[]`, `T(,)`
    ArrayType: NodeKind::ArrayType { .. } => {
        element_type / set_element_type: Type;
    }

    PointerType: NodeKind::PointerType => {
        element_type / set_element_type: Type;
    }

    // ----------------------------------------
    // Expressions
    // ----------------------------------------

    PrimitiveExpression: NodeKind::PrimitiveExpression(_) => {}

    IdentifierExpression: NodeKind::IdentifierExpression => {
        identifier / set_identifier: Identifier;
    }

    /// `target.member`
    MemberReferenceExpression: NodeKind::MemberReferenceExpression { .. } => {
        target / set_target: Target;
        member / set_member: Identifier;
    }

    /// `target(arguments)`
    InvocationExpression: NodeKind::InvocationExpression => {
        target / set_target: Target;
        [arguments / add_argument]: Arguments;
    }

    /// `target[arguments]`
    IndexerExpression: NodeKind::IndexerExpression => {
        target / set_target: Target;
        [arguments / add_argument]: Arguments;
    }

    BinaryOperatorExpression: NodeKind::BinaryOperatorExpression(_) => {
        left / set_left: Left;
        right / set_right: Right;
    }

    UnaryOperatorExpression: NodeKind::UnaryOperatorExpression(_) => {
        expression / set_expression: Expression;
    }

    /// `left = value`, `left += value`, ..
    AssignmentExpression: NodeKind::AssignmentExpression(_) => {
        left / set_left: Left;
        value / set_value: Value;
    }

    ParenthesizedExpression: NodeKind::ParenthesizedExpression => {
        expression / set_expression: Expression;
    }

    /// `c ? a : b`, VB `If(c, a, b)`
    ConditionalExpression: NodeKind::ConditionalExpression => {
        condition / set_condition: Condition;
        true_expression / set_true_expression: TrueExpression;
        false_expression / set_false_expression: FalseExpression;
    }

    CastExpression: NodeKind::CastExpression(_) => {
        ty / set_ty: Type;
        expression / set_expression: Expression;
    }

    /// `x as T`, VB `TryCast(x, T)`
    AsExpression: NodeKind::AsExpression => {
        expression / set_expression: Expression;
        ty / set_ty: Type;
    }

    /// `x is T`, VB `TypeOf x Is T`
    IsExpression: NodeKind::IsExpression => {
        expression / set_expression: Expression;
        ty / set_ty: Type;
    }

    /// `typeof(T)`, VB `GetType(T)`
    TypeOfExpression: NodeKind::TypeOfExpression => {
        ty / set_ty: Type;
    }

    /// Type used as an expression, e.g. `int` in `int.MaxValue`
    TypeReferenceExpression: NodeKind::TypeReferenceExpression => {
        ty / set_ty: Type;
    }

    ThisReferenceExpression: NodeKind::ThisReferenceExpression => {}

    BaseReferenceExpression: NodeKind::BaseReferenceExpression => {}

    /// `new T(arguments)`
    ObjectCreateExpression: NodeKind::ObjectCreateExpression => {
        ty / set_ty: Type;
        [arguments / add_argument]: Arguments;
    }

    /// `new T[n]`, `new T[] { .. }`
    ArrayCreateExpression: NodeKind::ArrayCreateExpression(_) => {
        ty / set_ty: Type;
        initializer / set_initializer: Initializer;
        [arguments / add_argument]: Arguments;
    }

    /// `{ a, b }`
    ArrayInitializerExpression: NodeKind::ArrayInitializerExpression => {
        [elements / add_element]: Elements;
    }

    /// `ref x`, `out x`
    DirectionExpression: NodeKind::DirectionExpression(_) => {
        expression / set_expression: Expression;
    }

    // ----------------------------------------
    // Statements
    // ----------------------------------------

    BlockStatement: NodeKind::BlockStatement => {
        [statements / add_statement]: Statements;
    }

    ExpressionStatement: NodeKind::ExpressionStatement => {
        expression / set_expression: Expression;
    }

    /// `int a = 1, b;`, VB `Dim a As Integer = 1`
    VariableDeclarationStatement: NodeKind::VariableDeclarationStatement => {
        ty / set_ty: Type;
        [modifiers / add_modifier]: Modifiers;
        [variables / add_variable]: Variables;
    }

    /// `a = 1` of a declaration. VB declarators may carry their own type.
    VariableDeclarator: NodeKind::VariableDeclarator => {
        identifier / set_identifier: Identifier;
        ty / set_ty: Type;
        initializer / set_initializer: Initializer;
    }

    IfElseStatement: NodeKind::IfElseStatement => {
        condition / set_condition: Condition;
        true_statement / set_true_statement: TrueStatement;
        false_statement / set_false_statement: FalseStatement;
    }

    WhileStatement: NodeKind::WhileStatement => {
        condition / set_condition: Condition;
        embedded_statement / set_embedded_statement: EmbeddedStatement;
    }

    DoLoopStatement: NodeKind::DoLoopStatement(_) => {
        condition / set_condition: Condition;
        embedded_statement / set_embedded_statement: EmbeddedStatement;
    }

    ForStatement: NodeKind::ForStatement => {
        condition / set_condition: Condition;
        embedded_statement / set_embedded_statement: EmbeddedStatement;
        [initializers / add_initializer]: Initializers;
        [iterators / add_iterator]: Iterators;
    }

    /// `foreach (T x in xs)`, VB `For Each x As T In xs`
    ForeachStatement: NodeKind::ForeachStatement => {
        ty / set_ty: Type;
        identifier / set_identifier: Identifier;
        expression / set_expression: Expression;
        embedded_statement / set_embedded_statement: EmbeddedStatement;
    }

    ReturnStatement: NodeKind::ReturnStatement => {
        expression / set_expression: Expression;
    }

    BreakStatement: NodeKind::BreakStatement => {}

    ContinueStatement: NodeKind::ContinueStatement => {}

    ThrowStatement: NodeKind::ThrowStatement => {
        expression / set_expression: Expression;
    }

    TryCatchStatement: NodeKind::TryCatchStatement => {
        try_block / set_try_block: TryBlock;
        finally_block / set_finally_block: FinallyBlock;
        [catch_clauses / add_catch_clause]: CatchClauses;
    }

    /// `catch (T e) { .. }`
    CatchClause: NodeKind::CatchClause => {
        ty / set_ty: Type;
        identifier / set_identifier: Identifier;
        body / set_body: Body;
    }

    SwitchStatement: NodeKind::SwitchStatement => {
        expression / set_expression: Expression;
        [sections / add_section]: SwitchSections;
    }

    SwitchSection: NodeKind::SwitchSection => {
        [labels / add_label]: CaseLabels;
        [statements / add_statement]: Statements;
    }

    /// `case e:`; `default:` when the expression is absent
    CaseLabel: NodeKind::CaseLabel => {
        expression / set_expression: Expression;
    }

    UsingStatement: NodeKind::UsingStatement => {
        resource / set_resource: ResourceAcquisition;
        embedded_statement / set_embedded_statement: EmbeddedStatement;
    }

    LockStatement: NodeKind::LockStatement => {
        expression / set_expression: Expression;
        embedded_statement / set_embedded_statement: EmbeddedStatement;
    }

    EmptyStatement: NodeKind::EmptyStatement => {}

    FixedStatement: NodeKind::FixedStatement => {
        ty / set_ty: Type;
        embedded_statement / set_embedded_statement: EmbeddedStatement;
        [variables / add_variable]: Variables;
    }

    ExitStatement: NodeKind::ExitStatement(_) => {}

    /// `For i As T = start To limit Step step .. Next`
    ForNextStatement: NodeKind::ForNextStatement => {
        identifier / set_identifier: Identifier;
        ty / set_ty: Type;
        start / set_start: Initializer;
        limit / set_limit: Limit;
        step / set_step: Step;
        embedded_statement / set_embedded_statement: EmbeddedStatement;
    }

    /// `Case lower To upper`
    CaseRange: NodeKind::CaseRange => {
        expression / set_expression: Expression;
        limit / set_limit: Limit;
    }

    /// `Case Is < value`
    CaseComparison: NodeKind::CaseComparison(_) => {
        expression / set_expression: Expression;
    }

    // ----------------------------------------
    // Declarations
    // ----------------------------------------

    CompilationUnit: NodeKind::CompilationUnit => {
        [members / add_member]: Members;
    }

    /// `using System;`, VB `Imports System`
    UsingDeclaration: NodeKind::UsingDeclaration => {
        import / set_import: Import;
    }

    NamespaceDeclaration: NodeKind::NamespaceDeclaration => {
        name / set_name: Name;
        [members / add_member]: Members;
    }

    TypeDeclaration: NodeKind::TypeDeclaration(_) => {
        identifier / set_identifier: Identifier;
        [modifiers / add_modifier]: Modifiers;
        [base_types / add_base_type]: BaseTypes;
        [members / add_member]: Members;
    }

    FieldDeclaration: NodeKind::FieldDeclaration => {
        ty / set_ty: Type;
        [modifiers / add_modifier]: Modifiers;
        [variables / add_variable]: Variables;
    }

    /// A missing return type means `void` / `Sub`
    MethodDeclaration: NodeKind::MethodDeclaration => {
        identifier / set_identifier: Identifier;
        return_type / set_return_type: Type;
        body / set_body: Body;
        [modifiers / add_modifier]: Modifiers;
        [parameters / add_parameter]: Parameters;
    }

    ConstructorDeclaration: NodeKind::ConstructorDeclaration => {
        identifier / set_identifier: Identifier;
        initializer / set_initializer: Initializer;
        body / set_body: Body;
        [modifiers / add_modifier]: Modifiers;
        [parameters / add_parameter]: Parameters;
    }

    /// `: base(..)`, VB `MyBase.New(..)`
    ConstructorInitializer: NodeKind::ConstructorInitializer(_) => {
        [arguments / add_argument]: Arguments;
    }

    PropertyDeclaration: NodeKind::PropertyDeclaration => {
        identifier / set_identifier: Identifier;
        ty / set_ty: Type;
        getter / set_getter: Getter;
        setter / set_setter: Setter;
        [modifiers / add_modifier]: Modifiers;
    }

    /// Body-less accessors make an auto property
    Accessor: NodeKind::Accessor(_) => {
        body / set_body: Body;
        [modifiers / add_modifier]: Modifiers;
    }

    EventDeclaration: NodeKind::EventDeclaration => {
        identifier / set_identifier: Identifier;
        ty / set_ty: Type;
        [modifiers / add_modifier]: Modifiers;
    }

    ParameterDeclaration: NodeKind::ParameterDeclaration(_) => {
        identifier / set_identifier: Identifier;
        ty / set_ty: Type;
        default_expression / set_default_expression: DefaultExpression;
    }

    EnumMemberDeclaration: NodeKind::EnumMemberDeclaration => {
        identifier / set_identifier: Identifier;
        initializer / set_initializer: Initializer;
    }
}

impl PrimitiveExpression {
    pub fn literal(self, ast: &Ast) -> &Literal {
        match ast.kind(self.0) {
            NodeKind::PrimitiveExpression(lit) => lit,
            _ => unreachable!("casted node changed its kind"),
        }
    }
}

impl BinaryOperatorExpression {
    pub fn new(ast: &mut Ast, left: NodeId, op: BinaryOperator, right: NodeId) -> Self {
        let id = ast.alloc(NodeKind::BinaryOperatorExpression(op));
        ast.set_child(id, Title::Left, Some(left));
        ast.set_child(id, Title::Right, Some(right));
        Self(id)
    }

    pub fn operator(self, ast: &Ast) -> BinaryOperator {
        match ast.kind(self.0) {
            NodeKind::BinaryOperatorExpression(op) => *op,
            _ => unreachable!("casted node changed its kind"),
        }
    }
}

impl UnaryOperatorExpression {
    pub fn operator(self, ast: &Ast) -> UnaryOperator {
        match ast.kind(self.0) {
            NodeKind::UnaryOperatorExpression(op) => *op,
            _ => unreachable!("casted node changed its kind"),
        }
    }
}

impl AssignmentExpression {
    pub fn new(ast: &mut Ast, left: NodeId, op: AssignmentOperator, value: NodeId) -> Self {
        let id = ast.alloc(NodeKind::AssignmentExpression(op));
        ast.set_child(id, Title::Left, Some(left));
        ast.set_child(id, Title::Value, Some(value));
        Self(id)
    }

    pub fn operator(self, ast: &Ast) -> AssignmentOperator {
        match ast.kind(self.0) {
            NodeKind::AssignmentExpression(op) => *op,
            _ => unreachable!("casted node changed its kind"),
        }
    }
}

impl ExpressionStatement {
    pub fn new(ast: &mut Ast, expr: NodeId) -> Self {
        let id = ast.alloc(NodeKind::ExpressionStatement);
        ast.set_child(id, Title::Expression, Some(expr));
        Self(id)
    }
}

impl InvocationExpression {
    pub fn new(ast: &mut Ast, target: NodeId, args: impl IntoIterator<Item = NodeId>) -> Self {
        let id = ast.alloc(NodeKind::InvocationExpression);
        ast.set_child(id, Title::Target, Some(target));
        ast.extend_children(id, Title::Arguments, args);
        Self(id)
    }
}

impl TypeDeclaration {
    pub fn variant(self, ast: &Ast) -> TypeVariant {
        match ast.kind(self.0) {
            NodeKind::TypeDeclaration(v) => *v,
            _ => unreachable!("casted node changed its kind"),
        }
    }

    pub fn name(self, ast: &Ast) -> Option<&str> {
        ast.name_of(self.0)
    }
}

impl Accessor {
    pub fn accessor_kind(self, ast: &Ast) -> AccessorKind {
        match ast.kind(self.0) {
            NodeKind::Accessor(k) => *k,
            _ => unreachable!("casted node changed its kind"),
        }
    }
}

impl ExitStatement {
    pub fn exit_kind(self, ast: &Ast) -> ExitKind {
        match ast.kind(self.0) {
            NodeKind::ExitStatement(k) => *k,
            _ => unreachable!("casted node changed its kind"),
        }
    }
}

/// Modifiers stored under [`Title::Modifiers`]
pub fn modifiers_of(ast: &Ast, id: NodeId) -> impl Iterator<Item = Modifier> + '_ {
    ast.children(id, Title::Modifiers)
        .filter_map(move |m| match ast.kind(m) {
            NodeKind::Modifier(m) => Some(*m),
            _ => None,
        })
}

pub fn has_modifier(ast: &Ast, id: NodeId, modifier: Modifier) -> bool {
    self::modifiers_of(ast, id).any(|m| m == modifier)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::kind::LiteralValue;

    #[test]
    fn typed_accessors_wrap_slots() {
        let mut ast = Ast::new();
        let one = ast.literal(LiteralValue::Integer {
            value: 1,
            suffix: Default::default(),
        });
        let two = ast.literal(LiteralValue::Integer {
            value: 2,
            suffix: Default::default(),
        });
        let bin = BinaryOperatorExpression::new(&mut ast, one, BinaryOperator::Add, two);
        assert_eq!(bin.left(&ast), Some(one));
        assert_eq!(bin.operator(&ast), BinaryOperator::Add);
        assert_eq!(ast.parent(two), Some(bin.id()));

        let x = ast.identifier_expression("x");
        let assign = AssignmentExpression::new(&mut ast, x, AssignmentOperator::Assign, bin.id());
        assert!(BinaryOperatorExpression::cast(&ast, assign.value(&ast).unwrap()).is_some());
        assert!(BinaryOperatorExpression::cast(&ast, assign.id()).is_none());

        let old = assign.set_value(&mut ast, Some(one));
        assert_eq!(old, Some(bin.id()));
        assert_eq!(ast.parent(bin.id()), None);
        assert_eq!(ast.parent(one), Some(assign.id()));
    }

    #[test]
    fn collection_view() {
        let mut ast = Ast::new();
        let block = ast.alloc(NodeKind::BlockStatement);
        let block = BlockStatement::cast(&ast, block).unwrap();
        let stmts = block.statements();
        assert!(stmts.is_empty(&ast));

        let a = ast.alloc(NodeKind::EmptyStatement);
        let b = ast.alloc(NodeKind::BreakStatement);
        stmts.extend(&mut ast, [a, b]);
        assert_eq!(stmts.len(&ast), 2);
        assert_eq!(stmts.get(&ast, 1), Some(b));
        assert_eq!(stmts.typed::<BreakStatement>(&ast).count(), 1);
    }
}
