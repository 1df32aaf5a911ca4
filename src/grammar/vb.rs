//! VB-like grammar and its lowering callbacks
//!
//! Statements end with a terminator: a line break token, `:` or the end of the input. Block
//! constructs close with `End X` (or `Next` / `Loop`) and lower to the same nodes as their braced
//! counterparts.

use base::span::Span;

use crate::{
    ast::{
        kind::{
            AccessorKind, ArrayBounds, AssignmentOperator, BinaryOperator, CastStyle,
            CtorInitializerKind, DoLoop, ExitKind, KnownType, LoopTest, Modifier,
            ParameterModifier, TypeVariant, UnaryOperator,
        },
        NodeId, NodeKind, Title,
    },
    grammar::{
        node::ChildCursor, DefId, Grammar, LowerError, Lowering, ParseChild, ParseNode, ParseToken,
        Rule,
    },
    syntax::token::TokenKind as T,
};

const TERMINATORS: &[T] = &[T::NewLine, T::Colon];

const PRIMITIVE_TYPES: &[T] = &[
    T::Object,
    T::String,
    T::Boolean,
    T::Char,
    T::SByte,
    T::Byte,
    T::Short,
    T::UShort,
    T::Integer,
    T::UInteger,
    T::Long,
    T::ULong,
    T::Single,
    T::Double,
    T::Decimal,
];

const MODIFIERS: &[T] = &[
    T::Public,
    T::Private,
    T::Protected,
    T::Friend,
    T::Shared,
    T::MustInherit,
    T::MustOverride,
    T::Overridable,
    T::Overrides,
    T::NotInheritable,
    T::NotOverridable,
    T::Readonly,
    T::Const,
    T::Shadows,
    T::Partial,
    T::WriteOnly,
];

const IDENTIFIERS: &[T] = &[T::Identifier, T::Get, T::Set, T::Value, T::Partial];

const LITERALS: &[T] = &[
    T::IntegerLiteral,
    T::RealLiteral,
    T::StringLiteral,
    T::CharLiteral,
    T::True,
    T::False,
    T::Nothing,
];

const ASSIGNMENT_OPS: &[T] = &[
    T::Eq,
    T::PlusEq,
    T::MinusEq,
    T::StarEq,
    T::SlashEq,
    T::BackslashEq,
    T::CaretEq,
    T::AmpEq,
    T::LtLtEq,
    T::GtGtEq,
];

const EXIT_KINDS: &[T] = &[
    T::Sub,
    T::Function,
    T::Property,
    T::Do,
    T::For,
    T::While,
    T::Select,
    T::Try,
];

/// Definitions referenced before their rule is set or from several lowering callbacks
#[derive(Debug, Clone, Copy)]
struct Forward {
    ty: DefId,
    non_array_type: DefId,
    type_name: DefId,
    expr: DefId,
    postfix: DefId,
    args: DefId,
    array_initializer: DefId,
    stmt: DefId,
    statements: DefId,
    declarators: DefId,
    type_member: DefId,
    namespace_member: DefId,
    imports: DefId,
}

/// Parts of a variable declarator
#[derive(Debug, Clone, Copy)]
struct DeclaratorDefs {
    /// `(2)` / `(,)` after the name
    array_suffix: DefId,
    /// `As T`
    as_type: DefId,
    /// `As New T(..)`
    as_new: DefId,
}

pub fn build() -> Grammar {
    let mut g = Grammar::new("VB");

    let fw = Forward {
        ty: g.define("Type"),
        non_array_type: g.define("NonArrayType"),
        type_name: g.define("TypeName"),
        expr: g.define("Expression"),
        postfix: g.define("PostfixExpression"),
        args: g.define("ArgumentList"),
        array_initializer: g.define("ArrayInitializer"),
        stmt: g.define("Statement"),
        statements: g.define("Statements"),
        declarators: g.define("VariableDeclaratorList"),
        type_member: g.define("TypeMember"),
        namespace_member: g.define("NamespaceMember"),
        imports: g.define("ImportsStatement"),
    };

    let ident = self::identifiers(&mut g);
    self::types(&mut g, fw, ident);
    self::expressions(&mut g, fw, ident);
    let defs = self::declarators(&mut g, fw, ident);
    self::statements(&mut g, fw, ident, defs);
    let cu = self::declarations(&mut g, fw, ident, defs);

    g.add_root("CompilationUnit", cu);
    g.add_root("Statement", fw.stmt);
    g.add_root("Expression", fw.expr);
    g.add_root("TypeMember", fw.type_member);

    debug_assert!(g.undefined().next().is_none(), "{:?}", g.undefined().collect::<Vec<_>>());
    g
}

/// Line break, `:` or the end of the input
fn term(g: &mut Grammar) -> Rule {
    g.tk(T::NewLine) | g.tk(T::Colon) | g.tk(T::Eof).followed_by()
}

/// Cursor over the children without statement terminators
fn cursor<'g>(n: &ParseNode<'g>) -> ChildCursor<'g> {
    n.cursor().skipping(TERMINATORS)
}

fn identifiers(g: &mut Grammar) -> DefId {
    let ident = g.define("Identifier");
    let rule = g.any(IDENTIFIERS);
    g.rule(ident, rule, |n, cx| {
        let tk = n.token().ok_or_else(|| n.unexpected("identifier token"))?;
        Ok(cx.identifier(&tk))
    });
    ident
}

// ----------------------------------------
// Types
// ----------------------------------------

fn lower_primitive_type(n: &ParseNode<'_>, cx: &mut Lowering<'_>) -> Result<NodeId, LowerError> {
    let tk = n.token().ok_or_else(|| n.unexpected("type keyword"))?;
    let ty = KnownType::from_token(tk.kind()).ok_or_else(|| LowerError::Unconvertible {
        expected: "primitive type",
        text: tk.text().to_string(),
    })?;
    Ok(cx.alloc(NodeKind::PrimitiveType(ty), tk.span()))
}

/// Number of dimensions spelled by a `(,,)` or `(a, b)` node
fn rank_of(n: &ParseNode<'_>) -> u32 {
    let commas = n
        .children()
        .iter()
        .map(|c| match c {
            ParseChild::Token(t) if t.kind() == T::Comma => 1,
            ParseChild::Node(dims) => dims.list_items().separators.len(),
            ParseChild::Token(_) => 0,
        })
        .sum::<usize>();
    commas as u32 + 1
}

fn types(g: &mut Grammar, fw: Forward, ident: DefId) {
    let primitive = g.define("PrimitiveType");
    let rule = g.any(PRIMITIVE_TYPES);
    g.rule(primitive, rule, lower_primitive_type);

    let dot = g.tk(T::Dot);
    g.rule(fw.type_name, ident.sep_by1(dot), |n, cx| {
        let mut ty: Option<NodeId> = None;
        let mut span = n.span();
        for (i, el) in n.list_items().elements.iter().enumerate() {
            let name = el.lower(cx)?;
            span = if i == 0 { el.span() } else { span.cover(el.span()) };
            let id = match ty {
                None => cx.alloc(NodeKind::SimpleType, span),
                Some(target) => {
                    let id = cx.alloc(NodeKind::MemberType, span);
                    cx.set(id, Title::Target, target);
                    id
                }
            };
            cx.set(id, Title::Identifier, name);
            ty = Some(id);
        }
        ty.ok_or_else(|| n.unexpected("type name"))
    });

    g.set_rule(fw.non_array_type, primitive | fw.type_name);

    // `Integer()`, `Integer(,)`
    let rank = g.define("RankSpecifier");
    let rule = g.tk(T::LParen) + g.tk(T::Comma).star() + g.tk(T::RParen);
    g.set_rule(rank, rule);

    g.rule(fw.ty, fw.non_array_type + rank.star(), |n, cx| {
        let mut cur = n.cursor();
        let base = cur.node()?;
        let mut span = base.span();
        let mut ty = cx.lower(&base)?;
        while let Some(r) = cur.eat_node() {
            span = span.cover(r.span());
            let id = cx.alloc(NodeKind::ArrayType { rank: self::rank_of(&r) }, span);
            cx.set(id, Title::Type, ty);
            ty = id;
        }
        Ok(ty)
    });
}

// ----------------------------------------
// Expressions
// ----------------------------------------

fn binary_op(kind: T) -> Option<BinaryOperator> {
    use BinaryOperator as B;
    Some(match kind {
        T::Plus => B::Add,
        T::Minus => B::Subtract,
        T::Star => B::Multiply,
        T::Slash => B::Divide,
        T::Backslash => B::IntegerDivide,
        T::Mod => B::Modulus,
        T::Caret => B::Power,
        T::Amp => B::Concat,
        T::LtLt => B::ShiftLeft,
        T::GtGt => B::ShiftRight,
        T::Eq => B::Equality,
        T::LtGt => B::InEquality,
        T::Lt => B::LessThan,
        T::Gt => B::GreaterThan,
        T::LtEq => B::LessThanOrEqual,
        T::GtEq => B::GreaterThanOrEqual,
        T::Is => B::ReferenceEquality,
        T::IsNot => B::ReferenceInequality,
        T::And => B::BitwiseAnd,
        T::AndAlso => B::ConditionalAnd,
        T::Or => B::BitwiseOr,
        T::OrElse => B::ConditionalOr,
        T::Xor => B::ExclusiveOr,
        _ => return None,
    })
}

fn assignment_op(kind: T) -> Option<AssignmentOperator> {
    use AssignmentOperator as A;
    Some(match kind {
        T::Eq => A::Assign,
        T::PlusEq => A::Add,
        T::MinusEq => A::Subtract,
        T::StarEq => A::Multiply,
        T::SlashEq => A::Divide,
        T::BackslashEq => A::IntegerDivide,
        T::CaretEq => A::Power,
        T::AmpEq => A::Concat,
        T::LtLtEq => A::ShiftLeft,
        T::GtGtEq => A::ShiftRight,
        _ => return None,
    })
}

fn binary_level(g: &mut Grammar, name: &'static str, operand: DefId, ops: &[T]) -> DefId {
    let def = g.define(name);
    let sep = g.any(ops);
    g.rule(def, operand.sep_by1(sep), |n, cx| {
        let items = n.list_items();
        cx.fold_binary(&items, binary_op)
    });
    def
}

/// `Not x`, `-x`
fn prefix_level(
    g: &mut Grammar,
    (name, op_name): (&'static str, &'static str),
    ops: &[T],
    operand: DefId,
) -> DefId {
    let def = g.define(name);
    let prefixed = g.define(op_name);
    let rule = g.any(ops) + def;
    g.rule(prefixed, rule, |n, cx| {
        let mut cur = n.cursor();
        let tk = cur.any_token()?;
        let op = match tk.kind() {
            T::Not => UnaryOperator::Not,
            T::Minus => UnaryOperator::Minus,
            T::Plus => UnaryOperator::Plus,
            _ => return Err(n.unexpected("prefix operator")),
        };
        let id = cx.node(NodeKind::UnaryOperatorExpression(op), n);
        cx.set_token(id, Title::OperatorToken, &tk);
        let operand = cx.lower(&cur.node()?)?;
        cx.set(id, Title::Expression, operand);
        Ok(id)
    });
    g.set_rule(def, prefixed | operand);
    def
}

fn expressions(g: &mut Grammar, fw: Forward, ident: DefId) {
    let comma = g.tk(T::Comma);
    g.set_rule(fw.args, fw.expr.sep_by(comma));

    let literal = g.define("Literal");
    let rule = g.any(LITERALS);
    g.rule(literal, rule, |n, cx| {
        let tk = n.token().ok_or_else(|| n.unexpected("literal token"))?;
        cx.literal(&tk)
    });

    let ident_expr = g.define("IdentifierExpression");
    g.rule(ident_expr, ident, |n, cx| {
        let id = cx.node(NodeKind::IdentifierExpression, n);
        let name = cx.lower(&n.cursor().node()?)?;
        cx.set(id, Title::Identifier, name);
        Ok(id)
    });

    let type_ref = g.define("TypeReferenceExpression");
    let primitive = g.define("PrimitiveTypeReference");
    let rule = g.any(PRIMITIVE_TYPES);
    g.rule(primitive, rule, lower_primitive_type);
    g.rule(type_ref, primitive, |n, cx| {
        let id = cx.node(NodeKind::TypeReferenceExpression, n);
        let ty = cx.lower(&n.cursor().node()?)?;
        cx.set(id, Title::Type, ty);
        Ok(id)
    });

    let paren = g.define("ParenthesizedExpression");
    let rule = g.tk(T::LParen) + fw.expr + g.tk(T::RParen);
    g.rule(paren, rule, |n, cx| {
        let mut cur = n.cursor();
        let id = cx.node(NodeKind::ParenthesizedExpression, n);
        cx.set_token(id, Title::LeftParenthesis, &cur.token(T::LParen)?);
        let expr = cx.lower(&cur.node()?)?;
        cx.set(id, Title::Expression, expr);
        cx.set_token(id, Title::RightParenthesis, &cur.token(T::RParen)?);
        Ok(id)
    });

    let me = g.define("Me");
    let rule = g.tk(T::Me);
    g.rule(me, rule, |n, cx| Ok(cx.node(NodeKind::ThisReferenceExpression, n)));

    let my_base = g.define("MyBase");
    let rule = g.tk(T::MyBase);
    g.rule(my_base, rule, |n, cx| Ok(cx.node(NodeKind::BaseReferenceExpression, n)));

    let get_type = g.define("GetTypeExpression");
    let rule = g.tk(T::GetType) + g.tk(T::LParen) + fw.ty + g.tk(T::RParen);
    g.rule(get_type, rule, |n, cx| {
        let mut cur = n.cursor();
        let id = cx.node(NodeKind::TypeOfExpression, n);
        cx.set_token(id, Title::Keyword, &cur.token(T::GetType)?);
        cur.token(T::LParen)?;
        let ty = cx.lower(&cur.node()?)?;
        cx.set(id, Title::Type, ty);
        Ok(id)
    });

    // `CType(x, T)`, `DirectCast(x, T)`, `TryCast(x, T)`
    let cast = g.define("CastExpression");
    let rule = g.any(&[T::CType, T::DirectCast, T::TryCast])
        + g.tk(T::LParen)
        + fw.expr
        + g.tk(T::Comma)
        + fw.ty
        + g.tk(T::RParen);
    g.rule(cast, rule, |n, cx| {
        let mut cur = n.cursor();
        let kw = cur.any_token()?;
        let kind = match kw.kind() {
            T::CType => NodeKind::CastExpression(CastStyle::Explicit),
            T::DirectCast => NodeKind::CastExpression(CastStyle::Direct),
            _ => NodeKind::AsExpression,
        };
        let id = cx.node(kind, n);
        cx.set_token(id, Title::Keyword, &kw);
        cur.token(T::LParen)?;
        let expr = cx.lower(&cur.node()?)?;
        cx.set(id, Title::Expression, expr);
        cur.token(T::Comma)?;
        let ty = cx.lower(&cur.node()?)?;
        cx.set(id, Title::Type, ty);
        cur.token(T::RParen)?;
        Ok(id)
    });

    // `TypeOf x Is T`
    let type_of_is = g.define("TypeOfIsExpression");
    let rule = g.tk(T::TypeOf) + fw.postfix + g.tk(T::Is) + fw.ty;
    g.rule(type_of_is, rule, |n, cx| {
        let mut cur = n.cursor();
        let id = cx.node(NodeKind::IsExpression, n);
        cx.set_token(id, Title::Keyword, &cur.token(T::TypeOf)?);
        let expr = cx.lower(&cur.node()?)?;
        cx.set(id, Title::Expression, expr);
        cur.token(T::Is)?;
        let ty = cx.lower(&cur.node()?)?;
        cx.set(id, Title::Type, ty);
        Ok(id)
    });

    // `If(a, b)` and `If(c, a, b)`
    let if_operator = g.define("IfOperator");
    let rule = g.tk(T::If)
        + g.tk(T::LParen)
        + fw.expr
        + g.tk(T::Comma)
        + fw.expr
        + (g.tk(T::Comma) + fw.expr).opt()
        + g.tk(T::RParen);
    g.rule(if_operator, rule, |n, cx| {
        let mut cur = n.cursor();
        cur.token(T::If)?;
        cur.token(T::LParen)?;
        let first = cx.lower(&cur.node()?)?;
        cur.token(T::Comma)?;
        let second = cx.lower(&cur.node()?)?;
        let id = match cur.eat(T::Comma) {
            Some(_) => {
                let id = cx.node(NodeKind::ConditionalExpression, n);
                cx.set(id, Title::Condition, first);
                cx.set(id, Title::TrueExpression, second);
                let third = cx.lower(&cur.node()?)?;
                cx.set(id, Title::FalseExpression, third);
                id
            }
            None => {
                let id = cx.node(NodeKind::BinaryOperatorExpression(BinaryOperator::NullCoalescing), n);
                cx.set(id, Title::Left, first);
                cx.set(id, Title::Right, second);
                id
            }
        };
        cur.token(T::RParen)?;
        Ok(id)
    });

    // `{ a, b }`
    let initializer_list = g.define("VariableInitializerList");
    let var_init = g.define("VariableInitializer");
    g.set_rule(var_init, fw.array_initializer | fw.expr);
    let comma = g.tk(T::Comma);
    g.set_rule(initializer_list, var_init.sep_by(comma));
    let rule = g.tk(T::LBrace) + initializer_list + g.tk(T::RBrace);
    g.rule(fw.array_initializer, rule, |n, cx| {
        let mut cur = n.cursor();
        let id = cx.node(NodeKind::ArrayInitializerExpression, n);
        cx.set_token(id, Title::LeftBrace, &cur.token(T::LBrace)?);
        for el in cur.node()?.lower_list(cx)? {
            cx.push(id, Title::Elements, el);
        }
        cx.set_token(id, Title::RightBrace, &cur.token(T::RBrace)?);
        Ok(id)
    });

    // `New Integer(2) {}`, `New Integer() {1, 2}`
    let rank = g.define("TrailingRankSpecifier");
    let rule = g.tk(T::LParen) + g.tk(T::Comma).star() + g.tk(T::RParen);
    g.set_rule(rank, rule);
    let array_create = g.define("ArrayCreation");
    let rule = g.tk(T::New)
        + fw.non_array_type
        + g.tk(T::LParen)
        + fw.args
        + g.tk(T::RParen)
        + rank.star()
        + fw.array_initializer;
    g.rule(array_create, rule, move |n, cx| {
        let mut cur = n.cursor();
        let kw = cur.token(T::New)?;
        let mut ty = cx.lower(&cur.node()?)?;
        cur.token(T::LParen)?;
        let args = cur.node()?.lower_list(cx)?;
        cur.token(T::RParen)?;
        // bounds only mean something when spelled
        let bounds = if args.is_empty() {
            ArrayBounds::Length
        } else {
            ArrayBounds::UpperBound
        };
        let id = cx.node(NodeKind::ArrayCreateExpression(bounds), n);
        cx.set_token(id, Title::Keyword, &kw);
        for arg in args {
            cx.push(id, Title::Arguments, arg);
        }
        while let Some(r) = cur.eat_def(rank) {
            let arr = cx.alloc(NodeKind::ArrayType { rank: self::rank_of(&r) }, r.span());
            cx.set(arr, Title::Type, ty);
            ty = arr;
        }
        cx.set(id, Title::Type, ty);
        let init = cx.lower(&cur.node()?)?;
        cx.set(id, Title::Initializer, init);
        Ok(id)
    });

    // `New Foo(a)`, `New Foo`
    let object_create = g.define("ObjectCreation");
    let rule = g.tk(T::New)
        + fw.non_array_type
        + (g.tk(T::LParen) + fw.args + g.tk(T::RParen)).opt();
    g.rule(object_create, rule, |n, cx| {
        let mut cur = n.cursor();
        let id = cx.node(NodeKind::ObjectCreateExpression, n);
        cx.set_token(id, Title::Keyword, &cur.token(T::New)?);
        let ty = cx.lower(&cur.node()?)?;
        cx.set(id, Title::Type, ty);
        if let Some(lp) = cur.eat(T::LParen) {
            cx.set_token(id, Title::LeftParenthesis, &lp);
            for arg in cur.node()?.lower_list(cx)? {
                cx.push(id, Title::Arguments, arg);
            }
            cx.set_token(id, Title::RightParenthesis, &cur.token(T::RParen)?);
        }
        Ok(id)
    });

    let primary = g.define("PrimaryExpression");
    g.set_rule(
        primary,
        literal
            | paren
            | me
            | my_base
            | get_type
            | cast
            | type_of_is
            | if_operator
            | array_create
            | object_create
            | type_ref
            | ident_expr,
    );

    // `.x`, `?.x`, `(..)`
    let suffix = g.define("PostfixSuffix");
    let rule = (g.tk(T::Dot) + ident)
        | (g.tk(T::QuestionDot) + ident)
        | (g.tk(T::LParen) + fw.args + g.tk(T::RParen));
    g.set_rule(suffix, rule);

    g.rule(fw.postfix, primary + suffix.star(), |n, cx| {
        let mut cur = n.cursor();
        let atom = cur.node()?;
        let mut span = atom.span();
        let mut expr = cx.lower(&atom)?;
        while let Some(sfx) = cur.eat_node() {
            span = span.cover(sfx.span());
            expr = self::lower_suffix(cx, expr, &sfx, span)?;
        }
        Ok(expr)
    });

    // tightest first
    let power = self::binary_level(g, "ExponentExpression", fw.postfix, &[T::Caret]);
    let negation = self::prefix_level(g, ("NegationExpression", "Negation"), &[T::Minus, T::Plus], power);
    let mul = self::binary_level(g, "MultiplicativeExpression", negation, &[T::Star, T::Slash]);
    let int_div = self::binary_level(g, "IntegerDivisionExpression", mul, &[T::Backslash]);
    let modulus = self::binary_level(g, "ModulusExpression", int_div, &[T::Mod]);
    let add = self::binary_level(g, "AdditiveExpression", modulus, &[T::Plus, T::Minus]);
    let concat = self::binary_level(g, "ConcatenationExpression", add, &[T::Amp]);
    let shift = self::binary_level(g, "ShiftExpression", concat, &[T::LtLt, T::GtGt]);
    let comparison = self::binary_level(
        g,
        "ComparisonExpression",
        shift,
        &[T::Eq, T::LtGt, T::Lt, T::Gt, T::LtEq, T::GtEq, T::Is, T::IsNot],
    );
    let not = self::prefix_level(g, ("NotExpression", "LogicalNot"), &[T::Not], comparison);
    let and = self::binary_level(g, "AndExpression", not, &[T::And, T::AndAlso]);
    let or = self::binary_level(g, "OrExpression", and, &[T::Or, T::OrElse]);
    let xor = self::binary_level(g, "XorExpression", or, &[T::Xor]);

    g.set_rule(fw.expr, xor);
}

fn lower_suffix(
    cx: &mut Lowering<'_>,
    target: NodeId,
    sfx: &ParseNode<'_>,
    span: Span,
) -> Result<NodeId, LowerError> {
    let mut cur = sfx.cursor();
    let tk = cur.any_token()?;
    match tk.kind() {
        T::Dot | T::QuestionDot => {
            let id = cx.alloc(
                NodeKind::MemberReferenceExpression {
                    null_conditional: tk.kind() == T::QuestionDot,
                },
                span,
            );
            cx.set(id, Title::Target, target);
            cx.set_token(id, Title::Dot, &tk);
            let member = cx.lower(&cur.node()?)?;
            cx.set(id, Title::Identifier, member);
            Ok(id)
        }
        // indexing and calls share the spelling; both are invocations here
        T::LParen => {
            let id = cx.alloc(NodeKind::InvocationExpression, span);
            cx.set(id, Title::Target, target);
            cx.set_token(id, Title::LeftParenthesis, &tk);
            for arg in cur.node()?.lower_list(cx)? {
                cx.push(id, Title::Arguments, arg);
            }
            cx.set_token(id, Title::RightParenthesis, &cur.token(T::RParen)?);
            Ok(id)
        }
        _ => Err(sfx.unexpected("postfix operator")),
    }
}

// ----------------------------------------
// Variable declarators
// ----------------------------------------

fn declarators(g: &mut Grammar, fw: Forward, ident: DefId) -> DeclaratorDefs {
    let dims = g.define("ArrayDimensions");
    let comma = g.tk(T::Comma);
    g.set_rule(dims, fw.expr.sep_by1(comma));

    let defs = DeclaratorDefs {
        array_suffix: g.define("ArrayNameSuffix"),
        as_type: g.define("AsClause"),
        as_new: g.define("AsNewClause"),
    };

    let rule = (g.tk(T::LParen) + dims + g.tk(T::RParen))
        | (g.tk(T::LParen) + g.tk(T::Comma).star() + g.tk(T::RParen));
    g.set_rule(defs.array_suffix, rule);

    let rule = g.tk(T::As) + fw.ty;
    g.set_rule(defs.as_type, rule);

    let rule = g.tk(T::As)
        + g.tk(T::New)
        + fw.non_array_type
        + (g.tk(T::LParen) + fw.args + g.tk(T::RParen)).opt();
    g.set_rule(defs.as_new, rule);

    let declarator = g.define("VariableDeclarator");
    let var_init = g.define("DeclaratorInitializer");
    g.set_rule(var_init, fw.array_initializer | fw.expr);
    let rule = ident
        + defs.array_suffix.opt()
        + (defs.as_new | defs.as_type).opt()
        + (g.tk(T::Eq) + var_init).opt();
    g.set_rule(declarator, rule);

    // lowered into its owner by `lower_declarators`
    let comma = g.tk(T::Comma);
    g.set_rule(fw.declarators, declarator.sep_by1(comma));

    defs
}

/// Raw parts of `name(2) As T = init`
struct DeclaratorParts<'g> {
    node: ParseNode<'g>,
    name: ParseNode<'g>,
    suffix: Option<ParseNode<'g>>,
    clause: Option<ParseNode<'g>>,
    eq: Option<ParseToken>,
    init: Option<ParseNode<'g>>,
}

impl<'g> DeclaratorParts<'g> {
    fn read(node: ParseNode<'g>, defs: DeclaratorDefs) -> Result<Self, LowerError> {
        let mut cur = node.cursor();
        let name = cur.node()?;
        let suffix = cur.eat_def(defs.array_suffix);
        let clause = cur.eat_def(defs.as_type).or_else(|| cur.eat_def(defs.as_new));
        let eq = cur.eat(T::Eq);
        let init = cur.eat_node();
        Ok(Self {
            node,
            name,
            suffix,
            clause,
            eq,
            init,
        })
    }
}

/// Type spelled by an `As` clause, lowered afresh on every call
fn clause_type(cx: &mut Lowering<'_>, clause: &ParseNode<'_>) -> Result<NodeId, LowerError> {
    let mut cur = clause.cursor();
    cur.token(T::As)?;
    cur.eat(T::New);
    cx.lower(&cur.node()?)
}

/// `New T(args)` of an `As New` clause
fn clause_creation(
    cx: &mut Lowering<'_>,
    clause: &ParseNode<'_>,
) -> Result<Option<NodeId>, LowerError> {
    let mut cur = clause.cursor();
    cur.token(T::As)?;
    let Some(kw) = cur.eat(T::New) else {
        return Ok(None);
    };
    let id = cx.node(NodeKind::ObjectCreateExpression, clause);
    cx.set_token(id, Title::Keyword, &kw);
    let ty = cx.lower(&cur.node()?)?;
    cx.set(id, Title::Type, ty);
    if cur.eat(T::LParen).is_some() {
        for arg in cur.node()?.lower_list(cx)? {
            cx.push(id, Title::Arguments, arg);
        }
    }
    Ok(Some(id))
}

/// Declared type of one declarator: the clause type wrapped by the name's array suffix
fn declarator_type(
    cx: &mut Lowering<'_>,
    parts: &DeclaratorParts<'_>,
    clause: Option<&ParseNode<'_>>,
) -> Result<Option<NodeId>, LowerError> {
    let Some(clause) = clause else {
        return Ok(None);
    };
    let ty = self::clause_type(cx, clause)?;
    Ok(Some(match &parts.suffix {
        Some(suffix) => {
            let arr = cx.alloc(NodeKind::ArrayType { rank: self::rank_of(suffix) }, suffix.span());
            cx.set(arr, Title::Type, ty);
            arr
        }
        None => ty,
    }))
}

/// Lowers `a, b As T, c(2) As U` into `owner`
///
/// A declarator without an `As` clause and initializer takes the type of the next clause. When
/// every declarator ends up with the same clause, the type is hoisted into the owner's `Type`
/// slot.
fn lower_declarators(
    cx: &mut Lowering<'_>,
    owner: NodeId,
    list: &ParseNode<'_>,
    defs: DeclaratorDefs,
) -> Result<(), LowerError> {
    let parts = list
        .list_items()
        .elements
        .iter()
        .filter_map(|c| c.as_node().cloned())
        .map(|n| DeclaratorParts::read(n, defs))
        .collect::<Result<Vec<_>, _>>()?;

    let mut clause_of = vec![None; parts.len()];
    let mut next = None;
    for (i, p) in parts.iter().enumerate().rev() {
        if p.clause.is_some() {
            next = Some(i);
            clause_of[i] = Some(i);
        } else if p.init.is_none() {
            clause_of[i] = next;
        }
    }

    let hoist = parts.len() == 1
        || (clause_of.windows(2).all(|w| w[0] == w[1]) && parts.iter().all(|p| p.suffix.is_none()));

    if hoist {
        if let Some(first) = parts.first() {
            let clause = clause_of[0].and_then(|j| parts[j].clause.as_ref());
            if let Some(ty) = self::declarator_type(cx, first, clause)? {
                cx.set(owner, Title::Type, ty);
            }
        }
    }

    for (i, p) in parts.iter().enumerate() {
        let clause = clause_of[i].and_then(|j| parts[j].clause.as_ref());
        let id = cx.node(NodeKind::VariableDeclarator, &p.node);
        let name = cx.lower(&p.name)?;
        cx.set(id, Title::Identifier, name);

        if !hoist {
            if let Some(ty) = self::declarator_type(cx, p, clause)? {
                cx.set(id, Title::Type, ty);
            }
        }

        let init = match (&p.init, &p.clause, &p.suffix) {
            (Some(init), _, _) => {
                if let Some(eq) = &p.eq {
                    cx.set_token(id, Title::Assign, eq);
                }
                Some(cx.lower(init)?)
            }
            (None, Some(own), _) if own.is(defs.as_new) => self::clause_creation(cx, own)?,
            // `a(2) As T` allocates the array
            (None, _, Some(suffix)) => match (suffix.child(1).and_then(|c| c.as_node().cloned()), clause) {
                (Some(dims), Some(clause)) => {
                    let create = cx.node(
                        NodeKind::ArrayCreateExpression(ArrayBounds::UpperBound),
                        suffix,
                    );
                    let ty = self::clause_type(cx, clause)?;
                    cx.set(create, Title::Type, ty);
                    for arg in dims.lower_list(cx)? {
                        cx.push(create, Title::Arguments, arg);
                    }
                    Some(create)
                }
                _ => None,
            },
            _ => None,
        };
        cx.set_opt(id, Title::Initializer, init);
        cx.push(owner, Title::Variables, id);
    }

    Ok(())
}

// ----------------------------------------
// Statements
// ----------------------------------------

fn statements(g: &mut Grammar, fw: Forward, ident: DefId, defs: DeclaratorDefs) {
    g.rule(fw.statements, fw.stmt.star(), |n, cx| {
        let id = cx.node(NodeKind::BlockStatement, n);
        for s in n.children() {
            let s = s.lower(cx)?;
            cx.push(id, Title::Statements, s);
        }
        // comments in front of the `End` / `Loop` / `Next` .. closing the block
        cx.attach_trailing_trivia(id, &n.trivia_after());
        Ok(id)
    });

    let declarators = fw.declarators;
    let local_decl = g.define("LocalDeclarationStatement");
    let rule = g.any(&[T::Dim, T::Const]) + fw.declarators + term(g);
    g.rule(local_decl, rule, move |n, cx| {
        let mut cur = self::cursor(n);
        let id = cx.node(NodeKind::VariableDeclarationStatement, n);
        let kw = cur.any_token()?;
        match kw.kind() {
            T::Const => {
                let m = cx.modifier(&kw)?;
                cx.push(id, Title::Modifiers, m);
            }
            _ => cx.set_token(id, Title::Keyword, &kw),
        }
        let list = cur.def(declarators)?;
        self::lower_declarators(cx, id, &list, defs)?;
        Ok(id)
    });

    // `If c Then` .. `ElseIf` .. `Else` .. `End If`
    let else_if_part = g.define("ElseIfPart");
    let rule = g.tk(T::ElseIf) + fw.expr + g.tk(T::Then).opt() + term(g) + fw.statements;
    g.set_rule(else_if_part, rule);

    let else_part = g.define("ElsePart");
    let rule = g.tk(T::Else) + term(g) + fw.statements;
    g.set_rule(else_part, rule);

    let if_block = g.define("IfBlock");
    let rule = g.tk(T::If)
        + fw.expr
        + g.tk(T::Then).opt()
        + term(g)
        + fw.statements
        + else_if_part.star()
        + else_part.opt()
        + g.tk(T::End)
        + g.tk(T::If)
        + term(g);
    g.rule(if_block, rule, move |n, cx| {
        let mut cur = self::cursor(n);
        let id = cx.node(NodeKind::IfElseStatement, n);
        cx.set_token(id, Title::Keyword, &cur.token(T::If)?);
        let cond = cx.lower(&cur.node()?)?;
        cx.set(id, Title::Condition, cond);
        cur.eat(T::Then);
        let body = cx.lower(&cur.node()?)?;
        cx.set(id, Title::TrueStatement, body);

        let mut else_ifs = Vec::new();
        while let Some(part) = cur.eat_def(else_if_part) {
            else_ifs.push(part);
        }

        let mut tail = match cur.eat_def(else_part) {
            Some(part) => {
                let mut pc = self::cursor(&part);
                pc.token(T::Else)?;
                Some(cx.lower(&pc.node()?)?)
            }
            None => None,
        };

        // `ElseIf` chains nest from the end
        for part in else_ifs.iter().rev() {
            let mut pc = self::cursor(part);
            let nested = cx.node(NodeKind::IfElseStatement, part);
            cx.set_token(nested, Title::Keyword, &pc.token(T::ElseIf)?);
            let cond = cx.lower(&pc.node()?)?;
            cx.set(nested, Title::Condition, cond);
            pc.eat(T::Then);
            let body = cx.lower(&pc.node()?)?;
            cx.set(nested, Title::TrueStatement, body);
            cx.set_opt(nested, Title::FalseStatement, tail);
            tail = Some(nested);
        }
        cx.set_opt(id, Title::FalseStatement, tail);

        cx.set_token(id, Title::EndKeyword, &cur.token(T::End)?);
        Ok(id)
    });

    // `If c Then x = 1`
    let single_line_if = g.define("SingleLineIf");
    let no_term = term(g).not();
    let rule = g.tk(T::If) + fw.expr + g.tk(T::Then) + no_term + fw.stmt;
    g.rule(single_line_if, rule, |n, cx| {
        let mut cur = self::cursor(n);
        let id = cx.node(NodeKind::IfElseStatement, n);
        cx.set_token(id, Title::Keyword, &cur.token(T::If)?);
        let cond = cx.lower(&cur.node()?)?;
        cx.set(id, Title::Condition, cond);
        cur.token(T::Then)?;
        let body = cx.lower(&cur.node()?)?;
        cx.set(id, Title::TrueStatement, body);
        Ok(id)
    });

    let while_block = g.define("WhileBlock");
    let rule = g.tk(T::While)
        + fw.expr
        + term(g)
        + fw.statements
        + g.tk(T::End)
        + g.tk(T::While)
        + term(g);
    g.rule(while_block, rule, |n, cx| {
        let mut cur = self::cursor(n);
        let id = cx.node(NodeKind::WhileStatement, n);
        cx.set_token(id, Title::Keyword, &cur.token(T::While)?);
        let cond = cx.lower(&cur.node()?)?;
        cx.set(id, Title::Condition, cond);
        let body = cx.lower(&cur.node()?)?;
        cx.set(id, Title::EmbeddedStatement, body);
        cx.set_token(id, Title::EndKeyword, &cur.token(T::End)?);
        Ok(id)
    });

    // `Do [While|Until c]` .. `Loop [While|Until c]`
    let do_block = g.define("DoLoopBlock");
    let pre = g.any(&[T::While, T::Until]) + fw.expr;
    let post = g.any(&[T::While, T::Until]) + fw.expr;
    let rule = g.tk(T::Do) + pre.opt() + term(g) + fw.statements + g.tk(T::Loop) + post.opt() + term(g);
    g.rule(do_block, rule, |n, cx| {
        let mut cur = self::cursor(n);
        let kw = cur.token(T::Do)?;

        let pre = match cur.eat_any(&[T::While, T::Until]) {
            Some(tk) => Some((tk.kind() == T::Until, cur.node()?)),
            None => None,
        };
        let body = cur.node()?;
        cur.token(T::Loop)?;
        let post = match cur.eat_any(&[T::While, T::Until]) {
            Some(tk) => Some((tk.kind() == T::Until, cur.node()?)),
            None => None,
        };

        let (test, until, cond) = match (pre, post) {
            (Some(_), Some(_)) => return Err(n.unexpected("a single loop condition")),
            (Some((until, c)), None) => (LoopTest::Pre, until, Some(c)),
            (None, Some((until, c))) => (LoopTest::Post, until, Some(c)),
            (None, None) => (LoopTest::None, false, None),
        };

        let id = cx.node(NodeKind::DoLoopStatement(DoLoop { test, until }), n);
        cx.set_token(id, Title::Keyword, &kw);
        if let Some(cond) = cond {
            let cond = cx.lower(&cond)?;
            cx.set(id, Title::Condition, cond);
        }
        let body = cx.lower(&body)?;
        cx.set(id, Title::EmbeddedStatement, body);
        Ok(id)
    });

    // `For Each x As T In xs` .. `Next`
    let for_each = g.define("ForEachBlock");
    let as_type = g.define("LoopVariableType");
    let rule = g.tk(T::As) + fw.ty;
    g.set_rule(as_type, rule);
    let rule = g.tk(T::For)
        + g.tk(T::Each)
        + ident
        + as_type.opt()
        + g.tk(T::In)
        + fw.expr
        + term(g)
        + fw.statements
        + g.tk(T::Next)
        + ident.opt()
        + term(g);
    g.rule(for_each, rule, move |n, cx| {
        let mut cur = self::cursor(n);
        let id = cx.node(NodeKind::ForeachStatement, n);
        cx.set_token(id, Title::Keyword, &cur.token(T::For)?);
        cur.token(T::Each)?;
        let name = cx.lower(&cur.node()?)?;
        cx.set(id, Title::Identifier, name);
        if let Some(ty) = cur.eat_def(as_type) {
            let ty = cx.lower(&ty.cursor().skipping(&[T::As]).node()?)?;
            cx.set(id, Title::Type, ty);
        }
        cur.token(T::In)?;
        let expr = cx.lower(&cur.node()?)?;
        cx.set(id, Title::Expression, expr);
        let body = cx.lower(&cur.node()?)?;
        cx.set(id, Title::EmbeddedStatement, body);
        Ok(id)
    });

    // `For i [As T] = a To b [Step c]` .. `Next`
    let for_next = g.define("ForNextBlock");
    let rule = g.tk(T::For)
        + ident
        + as_type.opt()
        + g.tk(T::Eq)
        + fw.expr
        + g.tk(T::To)
        + fw.expr
        + (g.tk(T::Step) + fw.expr).opt()
        + term(g)
        + fw.statements
        + g.tk(T::Next)
        + ident.opt()
        + term(g);
    g.rule(for_next, rule, move |n, cx| {
        let mut cur = self::cursor(n);
        let id = cx.node(NodeKind::ForNextStatement, n);
        cx.set_token(id, Title::Keyword, &cur.token(T::For)?);
        let name = cx.lower(&cur.node()?)?;
        cx.set(id, Title::Identifier, name);
        if let Some(ty) = cur.eat_def(as_type) {
            let ty = cx.lower(&ty.cursor().skipping(&[T::As]).node()?)?;
            cx.set(id, Title::Type, ty);
        }
        cur.token(T::Eq)?;
        let start = cx.lower(&cur.node()?)?;
        cx.set(id, Title::Initializer, start);
        cur.token(T::To)?;
        let limit = cx.lower(&cur.node()?)?;
        cx.set(id, Title::Limit, limit);
        if cur.eat(T::Step).is_some() {
            let step = cx.lower(&cur.node()?)?;
            cx.set(id, Title::Step, step);
        }
        let body = cx.lower(&cur.node()?)?;
        cx.set(id, Title::EmbeddedStatement, body);
        Ok(id)
    });

    let return_stmt = g.define("ReturnStatement");
    let rule = g.tk(T::Return) + fw.expr.opt() + term(g);
    g.rule(return_stmt, rule, |n, cx| {
        self::keyword_expression_statement(n, cx, NodeKind::ReturnStatement)
    });

    let throw_stmt = g.define("ThrowStatement");
    let rule = g.tk(T::Throw) + fw.expr.opt() + term(g);
    g.rule(throw_stmt, rule, |n, cx| {
        self::keyword_expression_statement(n, cx, NodeKind::ThrowStatement)
    });

    let exit_stmt = g.define("ExitStatement");
    let rule = g.tk(T::Exit) + g.any(EXIT_KINDS) + term(g);
    g.rule(exit_stmt, rule, |n, cx| {
        let mut cur = self::cursor(n);
        let kw = cur.token(T::Exit)?;
        let what = cur.any_token()?;
        let kind = match what.kind() {
            T::Sub => ExitKind::Sub,
            T::Function => ExitKind::Function,
            T::Property => ExitKind::Property,
            T::Do => ExitKind::Do,
            T::For => ExitKind::For,
            T::While => ExitKind::While,
            T::Select => ExitKind::Select,
            _ => ExitKind::Try,
        };
        let id = cx.node(NodeKind::ExitStatement(kind), n);
        cx.set_token(id, Title::Keyword, &kw);
        Ok(id)
    });

    let continue_stmt = g.define("ContinueStatement");
    let rule = g.tk(T::Continue) + g.any(&[T::For, T::Do, T::While]) + term(g);
    g.rule(continue_stmt, rule, |n, cx| {
        let mut cur = self::cursor(n);
        let id = cx.node(NodeKind::ContinueStatement, n);
        cx.set_token(id, Title::Keyword, &cur.token(T::Continue)?);
        Ok(id)
    });

    // `Try` .. `Catch e As T` .. `Finally` .. `End Try`
    let catch = g.define("CatchPart");
    let rule = g.tk(T::Catch) + (ident + g.tk(T::As) + fw.ty).opt() + term(g) + fw.statements;
    g.rule(catch, rule, |n, cx| {
        let mut cur = self::cursor(n);
        let id = cx.node(NodeKind::CatchClause, n);
        cx.set_token(id, Title::Keyword, &cur.token(T::Catch)?);
        // [name, type,] body
        let mut nodes = Vec::new();
        while let Some(node) = cur.eat_node() {
            nodes.push(node);
            cur.eat(T::As);
        }
        let body = nodes.pop().ok_or_else(|| n.unexpected("catch body"))?;
        if let [name, ty] = nodes.as_slice() {
            let name = cx.lower(name)?;
            cx.set(id, Title::Identifier, name);
            let ty = cx.lower(ty)?;
            cx.set(id, Title::Type, ty);
        }
        let body = cx.lower(&body)?;
        cx.set(id, Title::Body, body);
        Ok(id)
    });

    let finally = g.define("FinallyPart");
    let rule = g.tk(T::Finally) + term(g) + fw.statements;
    g.set_rule(finally, rule);

    let try_block = g.define("TryBlock");
    let rule = g.tk(T::Try)
        + term(g)
        + fw.statements
        + catch.star()
        + finally.opt()
        + g.tk(T::End)
        + g.tk(T::Try)
        + term(g);
    g.rule(try_block, rule, move |n, cx| {
        let mut cur = self::cursor(n);
        let id = cx.node(NodeKind::TryCatchStatement, n);
        cx.set_token(id, Title::Keyword, &cur.token(T::Try)?);
        let block = cx.lower(&cur.node()?)?;
        cx.set(id, Title::TryBlock, block);
        while let Some(c) = cur.eat_def(catch) {
            let c = cx.lower(&c)?;
            cx.push(id, Title::CatchClauses, c);
        }
        if let Some(f) = cur.eat_def(finally) {
            let mut fc = self::cursor(&f);
            fc.token(T::Finally)?;
            let block = cx.lower(&fc.node()?)?;
            cx.set(id, Title::FinallyBlock, block);
        }
        cx.set_token(id, Title::EndKeyword, &cur.token(T::End)?);
        Ok(id)
    });

    // `Select Case x` .. `Case 1, 2 To 4, Is > 9` .. `Case Else` .. `End Select`
    let case_range = g.define("CaseRangeClause");
    let rule = fw.expr + g.tk(T::To) + fw.expr;
    g.rule(case_range, rule, |n, cx| {
        let mut cur = self::cursor(n);
        let id = cx.node(NodeKind::CaseRange, n);
        let lower = cx.lower(&cur.node()?)?;
        cx.set(id, Title::Expression, lower);
        cur.token(T::To)?;
        let upper = cx.lower(&cur.node()?)?;
        cx.set(id, Title::Limit, upper);
        Ok(id)
    });

    let case_comparison = g.define("CaseComparisonClause");
    let comparisons = [T::Eq, T::LtGt, T::Lt, T::Gt, T::LtEq, T::GtEq];
    let rule = g.tk(T::Is).opt() + g.any(&comparisons) + fw.expr;
    g.rule(case_comparison, rule, |n, cx| {
        let mut cur = self::cursor(n);
        let is = cur.eat(T::Is);
        let op_tk = cur.any_token()?;
        let op = self::binary_op(op_tk.kind()).ok_or_else(|| n.unexpected("comparison operator"))?;
        let id = cx.node(NodeKind::CaseComparison(op), n);
        cx.set_token_opt(id, Title::Keyword, is.as_ref());
        cx.set_token(id, Title::OperatorToken, &op_tk);
        let value = cx.lower(&cur.node()?)?;
        cx.set(id, Title::Expression, value);
        Ok(id)
    });

    let case_clause = g.define("CaseClause");
    g.set_rule(case_clause, case_range | case_comparison | fw.expr);

    let case_values = g.define("CaseValueList");
    let comma = g.tk(T::Comma);
    g.set_rule(case_values, case_clause.sep_by1(comma));

    let case_block = g.define("CaseBlock");
    let rule = g.tk(T::Case) + (g.tk(T::Else) | case_values) + term(g) + fw.statements;
    g.rule(case_block, rule, |n, cx| {
        let mut cur = self::cursor(n);
        let id = cx.node(NodeKind::SwitchSection, n);
        let kw = cur.token(T::Case)?;
        match cur.eat(T::Else) {
            Some(_) => {
                let label = cx.alloc(NodeKind::CaseLabel, kw.span());
                cx.set_token(label, Title::Keyword, &kw);
                cx.push(id, Title::CaseLabels, label);
            }
            None => {
                for clause in cur.node()?.list_items().elements {
                    let span = clause.span();
                    let value = clause.lower(cx)?;
                    let clause_kind =
                        matches!(cx.ast.kind(value), NodeKind::CaseRange | NodeKind::CaseComparison(_));
                    let label = if clause_kind {
                        value
                    } else {
                        let label = cx.alloc(NodeKind::CaseLabel, span);
                        cx.set(label, Title::Expression, value);
                        label
                    };
                    cx.push(id, Title::CaseLabels, label);
                }
            }
        }
        for s in cur.node()?.children() {
            let s = s.lower(cx)?;
            cx.push(id, Title::Statements, s);
        }
        Ok(id)
    });

    let select_block = g.define("SelectBlock");
    let rule = g.tk(T::Select)
        + g.tk(T::Case)
        + fw.expr
        + term(g)
        + case_block.star()
        + g.tk(T::End)
        + g.tk(T::Select)
        + term(g);
    g.rule(select_block, rule, |n, cx| {
        let mut cur = self::cursor(n);
        let id = cx.node(NodeKind::SwitchStatement, n);
        cx.set_token(id, Title::Keyword, &cur.token(T::Select)?);
        cur.token(T::Case)?;
        let expr = cx.lower(&cur.node()?)?;
        cx.set(id, Title::Expression, expr);
        while let Some(section) = cur.eat_node() {
            let section = cx.lower(&section)?;
            cx.push(id, Title::SwitchSections, section);
        }
        cx.set_token(id, Title::EndKeyword, &cur.token(T::End)?);
        Ok(id)
    });

    // `Using r As New R()` .. `End Using`
    let resource_decl = g.define("UsingDeclaration");
    let ahead = (ident + g.any(&[T::As, T::Eq])).followed_by();
    g.rule(resource_decl, ahead + fw.declarators, move |n, cx| {
        let id = cx.node(NodeKind::VariableDeclarationStatement, n);
        let list = n.cursor().def(declarators)?;
        self::lower_declarators(cx, id, &list, defs)?;
        Ok(id)
    });

    let using_block = g.define("UsingBlock");
    let rule = g.tk(T::Using)
        + (resource_decl | fw.expr)
        + term(g)
        + fw.statements
        + g.tk(T::End)
        + g.tk(T::Using)
        + term(g);
    g.rule(using_block, rule, |n, cx| {
        let mut cur = self::cursor(n);
        let id = cx.node(NodeKind::UsingStatement, n);
        cx.set_token(id, Title::Keyword, &cur.token(T::Using)?);
        let res = cx.lower(&cur.node()?)?;
        cx.set(id, Title::ResourceAcquisition, res);
        let body = cx.lower(&cur.node()?)?;
        cx.set(id, Title::EmbeddedStatement, body);
        cx.set_token(id, Title::EndKeyword, &cur.token(T::End)?);
        Ok(id)
    });

    let sync_lock = g.define("SyncLockBlock");
    let rule = g.tk(T::SyncLock)
        + fw.expr
        + term(g)
        + fw.statements
        + g.tk(T::End)
        + g.tk(T::SyncLock)
        + term(g);
    g.rule(sync_lock, rule, |n, cx| {
        let mut cur = self::cursor(n);
        let id = cx.node(NodeKind::LockStatement, n);
        cx.set_token(id, Title::Keyword, &cur.token(T::SyncLock)?);
        let expr = cx.lower(&cur.node()?)?;
        cx.set(id, Title::Expression, expr);
        let body = cx.lower(&cur.node()?)?;
        cx.set(id, Title::EmbeddedStatement, body);
        cx.set_token(id, Title::EndKeyword, &cur.token(T::End)?);
        Ok(id)
    });

    // `x = 1`, `x += 1`
    let assignment = g.define("AssignmentStatement");
    let rule = fw.postfix + g.any(ASSIGNMENT_OPS) + fw.expr + term(g);
    g.rule(assignment, rule, |n, cx| {
        let mut cur = self::cursor(n);
        let stmt = cx.node(NodeKind::ExpressionStatement, n);
        let left = cx.lower(&cur.node()?)?;
        let tk = cur.any_token()?;
        let op = self::assignment_op(tk.kind()).ok_or_else(|| n.unexpected("assignment operator"))?;
        let id = cx.node(NodeKind::AssignmentExpression(op), n);
        cx.set(id, Title::Left, left);
        cx.set_token(id, Title::OperatorToken, &tk);
        let value = cx.lower(&cur.node()?)?;
        cx.set(id, Title::Value, value);
        cx.set(stmt, Title::Expression, id);
        Ok(stmt)
    });

    // `Foo(1)`
    let call = g.define("ExpressionStatement");
    let rule = fw.postfix + term(g);
    g.rule(call, rule, |n, cx| {
        let id = cx.node(NodeKind::ExpressionStatement, n);
        let expr = cx.lower(&self::cursor(n).node()?)?;
        cx.set(id, Title::Expression, expr);
        Ok(id)
    });

    g.set_rule(
        fw.stmt,
        local_decl
            | if_block
            | single_line_if
            | while_block
            | do_block
            | for_each
            | for_next
            | return_stmt
            | exit_stmt
            | continue_stmt
            | throw_stmt
            | try_block
            | select_block
            | using_block
            | sync_lock
            | assignment
            | call,
    );
    g.collect_trivia(fw.stmt);
}

/// `Return x`, `Throw`
fn keyword_expression_statement(
    n: &ParseNode<'_>,
    cx: &mut Lowering<'_>,
    kind: NodeKind,
) -> Result<NodeId, LowerError> {
    let mut cur = self::cursor(n);
    let id = cx.node(kind, n);
    cx.set_token(id, Title::Keyword, &cur.any_token()?);
    if let Some(expr) = cur.eat_node() {
        let expr = cx.lower(&expr)?;
        cx.set(id, Title::Expression, expr);
    }
    Ok(id)
}

// ----------------------------------------
// Declarations
// ----------------------------------------

/// Lowers modifier keywords, dropping `ReadOnly` / `WriteOnly` when `accessors` is set (they're
/// spelled by the accessor set of a property). Returns the dropped ones.
fn modifiers(
    cx: &mut Lowering<'_>,
    owner: NodeId,
    raw: &ParseNode<'_>,
    accessors: bool,
) -> Result<Vec<Modifier>, LowerError> {
    let mut dropped = Vec::new();
    for child in raw.children() {
        let Some(tk) = child.as_token() else {
            continue;
        };
        let m = cx.modifier(tk)?;
        let modifier = match cx.ast.kind(m) {
            NodeKind::Modifier(modifier) => Some(*modifier),
            _ => None,
        };
        match modifier {
            Some(modifier @ (Modifier::Readonly | Modifier::WriteOnly)) if accessors => {
                dropped.push(modifier);
            }
            _ => cx.push(owner, Title::Modifiers, m),
        }
    }
    Ok(dropped)
}

fn declarations(g: &mut Grammar, fw: Forward, ident: DefId, defs: DeclaratorDefs) -> DefId {
    let mods = g.define("Modifiers");
    let rule = g.any(MODIFIERS).star();
    g.set_rule(mods, rule);

    let as_type = g.define("ReturnType");
    let rule = g.tk(T::As) + fw.ty;
    g.set_rule(as_type, rule);

    // parameters
    let rank = g.define("ParameterRank");
    let rule = g.tk(T::LParen) + g.tk(T::Comma).star() + g.tk(T::RParen);
    g.set_rule(rank, rule);

    let parameter = g.define("Parameter");
    let rule = g.any(&[T::ByVal, T::ByRef, T::Optional, T::ParamArray]).star()
        + ident
        + rank.opt()
        + as_type.opt()
        + (g.tk(T::Eq) + fw.expr).opt();
    g.rule(parameter, rule, move |n, cx| {
        let mut cur = n.cursor();
        let mut modifier = ParameterModifier::None;
        while let Some(tk) = cur.eat_any(&[T::ByVal, T::ByRef, T::Optional, T::ParamArray]) {
            match tk.kind() {
                T::ByRef => modifier = ParameterModifier::Ref,
                T::ParamArray => modifier = ParameterModifier::Params,
                _ => {}
            }
        }
        let id = cx.node(NodeKind::ParameterDeclaration(modifier), n);
        let name = cx.lower(&cur.node()?)?;
        cx.set(id, Title::Identifier, name);
        let rank = cur.eat_def(rank);
        if let Some(clause) = cur.eat_def(as_type) {
            let mut ty = cx.lower(&clause.cursor().skipping(&[T::As]).node()?)?;
            if let Some(r) = rank {
                let arr = cx.alloc(NodeKind::ArrayType { rank: self::rank_of(&r) }, r.span());
                cx.set(arr, Title::Type, ty);
                ty = arr;
            }
            cx.set(id, Title::Type, ty);
        }
        if let Some(eq) = cur.eat(T::Eq) {
            cx.set_token(id, Title::Assign, &eq);
            let value = cx.lower(&cur.node()?)?;
            cx.set(id, Title::DefaultExpression, value);
        }
        Ok(id)
    });

    let params = g.define("ParameterList");
    let comma = g.tk(T::Comma);
    g.set_rule(params, parameter.sep_by(comma));

    let param_clause = g.define("ParameterClause");
    let rule = g.tk(T::LParen) + params + g.tk(T::RParen);
    g.set_rule(param_clause, rule);

    fn lower_parameters(
        cx: &mut Lowering<'_>,
        owner: NodeId,
        clause: Option<ParseNode<'_>>,
    ) -> Result<(), LowerError> {
        let Some(clause) = clause else {
            return Ok(());
        };
        let mut cur = clause.cursor();
        cx.set_token(owner, Title::LeftParenthesis, &cur.token(T::LParen)?);
        for p in cur.node()?.lower_list(cx)? {
            cx.push(owner, Title::Parameters, p);
        }
        cx.set_token(owner, Title::RightParenthesis, &cur.token(T::RParen)?);
        Ok(())
    }

    // fields
    let field = g.define("FieldDeclaration");
    let rule = mods + g.tk(T::Dim).opt() + fw.declarators + term(g);
    let declarators = fw.declarators;
    g.rule(field, rule, move |n, cx| {
        let mut cur = self::cursor(n);
        let id = cx.node(NodeKind::FieldDeclaration, n);
        cx.modifiers(id, &cur.node()?)?;
        cur.eat(T::Dim);
        let list = cur.def(declarators)?;
        self::lower_declarators(cx, id, &list, defs)?;
        Ok(id)
    });

    // `Sub F()` / `Function F() As T`, with or without a body
    let method_body = g.define("MethodBody");
    let rule = fw.statements + g.tk(T::End) + g.any(&[T::Sub, T::Function]) + term(g);
    g.set_rule(method_body, rule);

    let method = g.define("MethodDeclaration");
    let rule = mods
        + g.any(&[T::Sub, T::Function])
        + ident
        + param_clause.opt()
        + as_type.opt()
        + term(g)
        + method_body.opt();
    g.rule(method, rule, move |n, cx| {
        let mut cur = self::cursor(n);
        let id = cx.node(NodeKind::MethodDeclaration, n);
        cx.modifiers(id, &cur.node()?)?;
        let kw = cur.any_token()?;
        cx.set_token(id, Title::Keyword, &kw);
        let name = cx.lower(&cur.node()?)?;
        cx.set(id, Title::Identifier, name);
        lower_parameters(cx, id, cur.eat_def(param_clause))?;
        match cur.eat_def(as_type) {
            Some(clause) => {
                let ty = cx.lower(&clause.cursor().skipping(&[T::As]).node()?)?;
                cx.set(id, Title::Type, ty);
            }
            // a `Function` without `As` returns `Object`
            None if kw.kind() == T::Function => {
                let ty = cx.alloc(NodeKind::PrimitiveType(KnownType::Object), kw.span());
                cx.set(id, Title::Type, ty);
            }
            None => {}
        }
        if let Some(body) = cur.eat_def(method_body) {
            let mut bc = self::cursor(&body);
            let block = cx.lower(&bc.node()?)?;
            cx.set(id, Title::Body, block);
            cx.set_token(id, Title::EndKeyword, &bc.token(T::End)?);
        }
        Ok(id)
    });

    // `Sub New()` with an optional leading `MyBase.New(..)` / `Me.New(..)`
    let ctor_init = g.define("ConstructorInitializer");
    let rule = g.any(&[T::MyBase, T::Me])
        + g.tk(T::Dot)
        + g.tk(T::New)
        + g.tk(T::LParen)
        + fw.args
        + g.tk(T::RParen)
        + term(g);
    g.rule(ctor_init, rule, |n, cx| {
        let mut cur = self::cursor(n);
        let kw = cur.any_token()?;
        let kind = match kw.kind() {
            T::MyBase => CtorInitializerKind::Base,
            _ => CtorInitializerKind::This,
        };
        let id = cx.node(NodeKind::ConstructorInitializer(kind), n);
        cx.set_token(id, Title::Keyword, &kw);
        cur.token(T::Dot)?;
        cur.token(T::New)?;
        cur.token(T::LParen)?;
        for arg in cur.node()?.lower_list(cx)? {
            cx.push(id, Title::Arguments, arg);
        }
        cur.token(T::RParen)?;
        Ok(id)
    });

    let ctor = g.define("ConstructorDeclaration");
    let rule = mods
        + g.tk(T::Sub)
        + g.tk(T::New)
        + param_clause.opt()
        + term(g)
        + ctor_init.opt()
        + fw.statements
        + g.tk(T::End)
        + g.tk(T::Sub)
        + term(g);
    g.rule(ctor, rule, move |n, cx| {
        let mut cur = self::cursor(n);
        // named after its type by the enclosing declaration
        let id = cx.node(NodeKind::ConstructorDeclaration, n);
        cx.modifiers(id, &cur.node()?)?;
        cx.set_token(id, Title::Keyword, &cur.token(T::Sub)?);
        cur.token(T::New)?;
        lower_parameters(cx, id, cur.eat_def(param_clause))?;
        if let Some(init) = cur.eat_def(ctor_init) {
            let init = cx.lower(&init)?;
            cx.set(id, Title::Initializer, init);
        }
        let body = cx.lower(&cur.node()?)?;
        cx.set(id, Title::Body, body);
        cx.set_token(id, Title::EndKeyword, &cur.token(T::End)?);
        Ok(id)
    });

    // properties
    let accessor = g.define("AccessorBlock");
    let rule = mods
        + g.any(&[T::Get, T::Set])
        + param_clause.opt()
        + term(g)
        + fw.statements
        + g.tk(T::End)
        + g.any(&[T::Get, T::Set])
        + term(g);
    g.rule(accessor, rule, move |n, cx| {
        let mut cur = self::cursor(n);
        let mods = cur.node()?;
        let kw = cur.any_token()?;
        let kind = match kw.kind() {
            T::Get => AccessorKind::Get,
            _ => AccessorKind::Set,
        };
        let id = cx.node(NodeKind::Accessor(kind), n);
        cx.modifiers(id, &mods)?;
        cx.set_token(id, Title::Keyword, &kw);
        // `Set(value As T)`: the parameter is implicit in the tree
        cur.eat_def(param_clause);
        let body = cx.lower(&cur.node()?)?;
        cx.set(id, Title::Body, body);
        cx.set_token(id, Title::EndKeyword, &cur.token(T::End)?);
        Ok(id)
    });
    g.collect_trivia(accessor);

    let empty_parens = g.define("EmptyParameterClause");
    let rule = g.tk(T::LParen) + g.tk(T::RParen);
    g.set_rule(empty_parens, rule);

    let property = g.define("PropertyDeclaration");
    let rule = mods
        + g.tk(T::Property)
        + ident
        + empty_parens.opt()
        + as_type.opt()
        + term(g)
        + accessor.plus()
        + g.tk(T::End)
        + g.tk(T::Property)
        + term(g);
    g.rule(property, rule, move |n, cx| {
        let mut cur = self::cursor(n);
        let id = cx.node(NodeKind::PropertyDeclaration, n);
        self::modifiers(cx, id, &cur.node()?, true)?;
        cx.set_token(id, Title::Keyword, &cur.token(T::Property)?);
        let name = cx.lower(&cur.node()?)?;
        cx.set(id, Title::Identifier, name);
        cur.eat_def(empty_parens);
        if let Some(clause) = cur.eat_def(as_type) {
            let ty = cx.lower(&clause.cursor().skipping(&[T::As]).node()?)?;
            cx.set(id, Title::Type, ty);
        }
        while let Some(acc) = cur.eat_def(accessor) {
            let acc = cx.lower(&acc)?;
            let title = match cx.ast.kind(acc) {
                NodeKind::Accessor(AccessorKind::Get) => Title::Getter,
                _ => Title::Setter,
            };
            cx.set(id, title, acc);
        }
        cx.set_closing(id, Title::EndKeyword, &cur.token(T::End)?);
        Ok(id)
    });

    // `Property X As T`: accessors are implied
    let auto_property = g.define("AutoPropertyDeclaration");
    let rule = mods + g.tk(T::Property) + ident + empty_parens.opt() + as_type.opt() + term(g);
    g.rule(auto_property, rule, move |n, cx| {
        let mut cur = self::cursor(n);
        let id = cx.node(NodeKind::PropertyDeclaration, n);
        let dropped = self::modifiers(cx, id, &cur.node()?, true)?;
        let kw = cur.token(T::Property)?;
        cx.set_token(id, Title::Keyword, &kw);
        let name = cx.lower(&cur.node()?)?;
        cx.set(id, Title::Identifier, name);
        cur.eat_def(empty_parens);
        if let Some(clause) = cur.eat_def(as_type) {
            let ty = cx.lower(&clause.cursor().skipping(&[T::As]).node()?)?;
            cx.set(id, Title::Type, ty);
        }
        if !dropped.contains(&Modifier::WriteOnly) {
            let get = cx.alloc(NodeKind::Accessor(AccessorKind::Get), kw.span());
            cx.set(id, Title::Getter, get);
        }
        if !dropped.contains(&Modifier::Readonly) {
            let set = cx.alloc(NodeKind::Accessor(AccessorKind::Set), kw.span());
            cx.set(id, Title::Setter, set);
        }
        Ok(id)
    });

    let event = g.define("EventDeclaration");
    let rule = mods + g.tk(T::Event) + ident + g.tk(T::As) + fw.ty + term(g);
    g.rule(event, rule, |n, cx| {
        let mut cur = self::cursor(n);
        let id = cx.node(NodeKind::EventDeclaration, n);
        cx.modifiers(id, &cur.node()?)?;
        cx.set_token(id, Title::Keyword, &cur.token(T::Event)?);
        let name = cx.lower(&cur.node()?)?;
        cx.set(id, Title::Identifier, name);
        cur.token(T::As)?;
        let ty = cx.lower(&cur.node()?)?;
        cx.set(id, Title::Type, ty);
        Ok(id)
    });

    // enums
    let enum_member = g.define("EnumMemberDeclaration");
    let rule = ident + (g.tk(T::Eq) + fw.expr).opt() + term(g);
    g.rule(enum_member, rule, |n, cx| {
        let mut cur = self::cursor(n);
        let id = cx.node(NodeKind::EnumMemberDeclaration, n);
        let name = cx.lower(&cur.node()?)?;
        cx.set(id, Title::Identifier, name);
        if let Some(eq) = cur.eat(T::Eq) {
            cx.set_token(id, Title::Assign, &eq);
            let value = cx.lower(&cur.node()?)?;
            cx.set(id, Title::Initializer, value);
        }
        Ok(id)
    });
    g.collect_trivia(enum_member);

    let enum_decl = g.define("EnumDeclaration");
    let rule = mods
        + g.tk(T::Enum)
        + ident
        + as_type.opt()
        + term(g)
        + enum_member.star()
        + g.tk(T::End)
        + g.tk(T::Enum)
        + term(g);
    g.rule(enum_decl, rule, move |n, cx| {
        let mut cur = self::cursor(n);
        let id = cx.node(NodeKind::TypeDeclaration(TypeVariant::Enum), n);
        cx.modifiers(id, &cur.node()?)?;
        cx.set_token(id, Title::Keyword, &cur.token(T::Enum)?);
        let name = cx.lower(&cur.node()?)?;
        cx.set(id, Title::Identifier, name);
        if let Some(clause) = cur.eat_def(as_type) {
            let ty = cx.lower(&clause.cursor().skipping(&[T::As]).node()?)?;
            cx.push(id, Title::BaseTypes, ty);
        }
        while let Some(m) = cur.eat_def(enum_member) {
            let m = cx.lower(&m)?;
            cx.push(id, Title::Members, m);
        }
        cx.set_closing(id, Title::EndKeyword, &cur.token(T::End)?);
        Ok(id)
    });

    // classes, structures, interfaces, modules
    let type_list = g.define("TypeList");
    let comma = g.tk(T::Comma);
    g.set_rule(type_list, fw.ty.sep_by1(comma));

    let inherits = g.define("InheritsOrImplements");
    let rule = g.any(&[T::Inherits, T::Implements]) + type_list + term(g);
    g.set_rule(inherits, rule);

    const TYPE_KEYWORDS: &[T] = &[T::Class, T::Structure, T::Interface, T::Module];
    let type_decl = g.define("TypeDeclaration");
    let rule = mods
        + g.any(TYPE_KEYWORDS)
        + ident
        + term(g)
        + inherits.star()
        + fw.type_member.star()
        + g.tk(T::End)
        + g.any(TYPE_KEYWORDS)
        + term(g);
    g.rule(type_decl, rule, move |n, cx| {
        let mut cur = self::cursor(n);
        let mods = cur.node()?;
        let kw = cur.any_token()?;
        let variant = match kw.kind() {
            T::Class => TypeVariant::Class,
            T::Structure => TypeVariant::Struct,
            T::Interface => TypeVariant::Interface,
            _ => TypeVariant::Module,
        };
        let id = cx.node(NodeKind::TypeDeclaration(variant), n);
        cx.modifiers(id, &mods)?;
        cx.set_token(id, Title::Keyword, &kw);
        let name_node = cur.node()?;
        let name = cx.lower(&name_node)?;
        cx.set(id, Title::Identifier, name);

        while let Some(clause) = cur.eat_def(inherits) {
            let mut cc = self::cursor(&clause);
            cc.any_token()?;
            for ty in cc.node()?.lower_list(cx)? {
                cx.push(id, Title::BaseTypes, ty);
            }
        }

        while let Some(m) = cur.eat_node() {
            let m = cx.lower(&m)?;
            // `Sub New` takes the name of its type
            if matches!(cx.ast.kind(m), NodeKind::ConstructorDeclaration)
                && cx.ast.child(m, Title::Identifier).is_none()
            {
                let ctor_name = cx.lower(&name_node)?;
                cx.set(m, Title::Identifier, ctor_name);
            }
            cx.push(id, Title::Members, m);
        }
        cx.set_closing(id, Title::EndKeyword, &cur.token(T::End)?);
        Ok(id)
    });

    g.set_rule(
        fw.type_member,
        type_decl | enum_decl | ctor | method | property | auto_property | event | field,
    );
    g.collect_trivia(fw.type_member);

    // namespaces
    let rule = g.tk(T::Imports) + fw.type_name + term(g);
    g.rule(fw.imports, rule, |n, cx| {
        let mut cur = self::cursor(n);
        let id = cx.node(NodeKind::UsingDeclaration, n);
        cx.set_token(id, Title::Keyword, &cur.token(T::Imports)?);
        let name = cx.lower(&cur.node()?)?;
        cx.set(id, Title::Import, name);
        Ok(id)
    });
    g.collect_trivia(fw.imports);

    let namespace = g.define("NamespaceDeclaration");
    let rule = g.tk(T::Namespace)
        + fw.type_name
        + term(g)
        + fw.imports.star()
        + fw.namespace_member.star()
        + g.tk(T::End)
        + g.tk(T::Namespace)
        + term(g);
    g.rule(namespace, rule, |n, cx| {
        let mut cur = self::cursor(n);
        let id = cx.node(NodeKind::NamespaceDeclaration, n);
        cx.set_token(id, Title::Keyword, &cur.token(T::Namespace)?);
        let name = cx.lower(&cur.node()?)?;
        cx.set(id, Title::Name, name);
        while let Some(m) = cur.eat_node() {
            let m = cx.lower(&m)?;
            cx.push(id, Title::Members, m);
        }
        cx.set_closing(id, Title::EndKeyword, &cur.token(T::End)?);
        Ok(id)
    });

    g.set_rule(fw.namespace_member, namespace | type_decl | enum_decl);
    g.collect_trivia(fw.namespace_member);

    let cu = g.define("CompilationUnit");
    let rule = fw.imports.star() + fw.namespace_member.star();
    g.rule(cu, rule, |n, cx| {
        let id = cx.node(NodeKind::CompilationUnit, n);
        for m in n.children() {
            let m = m.lower(cx)?;
            cx.push(id, Title::Members, m);
        }
        Ok(id)
    });

    cu
}
