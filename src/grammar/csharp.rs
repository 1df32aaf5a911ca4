//! C#-like grammar and its lowering callbacks

use base::span::Span;

use crate::{
    ast::{
        kind::{
            AccessorKind, ArrayBounds, AssignmentOperator, BinaryOperator, CastStyle,
            CtorInitializerKind, DoLoop, FieldDirection, KnownType, LoopTest, ParameterModifier,
            TypeVariant, UnaryOperator,
        },
        NodeId, NodeKind, Title,
    },
    grammar::{
        error::CSharpErrorCode, node::ChildCursor, DefId, Grammar, LowerError, Lowering,
        ParseChild, ParseNode, Rule,
    },
    syntax::token::TokenKind as T,
};

const PRIMITIVE_TYPES: &[T] = &[
    T::Void,
    T::Object,
    T::String,
    T::Bool,
    T::Char,
    T::SByte,
    T::Byte,
    T::Short,
    T::UShort,
    T::Int,
    T::UInt,
    T::Long,
    T::ULong,
    T::Float,
    T::Double,
    T::Decimal,
];

const MODIFIERS: &[T] = &[
    T::Public,
    T::Private,
    T::Protected,
    T::Internal,
    T::Static,
    T::Abstract,
    T::Virtual,
    T::Override,
    T::Sealed,
    T::Readonly,
    T::Const,
    T::Extern,
    T::New,
    T::Partial,
    T::Volatile,
    T::Unsafe,
];

/// Words usable as identifiers
const IDENTIFIERS: &[T] = &[
    T::Identifier,
    T::Get,
    T::Set,
    T::Value,
    T::Var,
    T::Partial,
    T::Add,
    T::Remove,
];

const LITERALS: &[T] = &[
    T::IntegerLiteral,
    T::RealLiteral,
    T::StringLiteral,
    T::CharLiteral,
    T::True,
    T::False,
    T::Null,
];

const ASSIGNMENT_OPS: &[T] = &[
    T::Eq,
    T::PlusEq,
    T::MinusEq,
    T::StarEq,
    T::SlashEq,
    T::PercentEq,
    T::LtLtEq,
    T::GtGtEq,
    T::AmpEq,
    T::PipeEq,
    T::CaretEq,
];

/// Tokens that may follow the `)` of a cast to a named type
const CAST_FOLLOW: &[T] = &[
    T::Identifier,
    T::IntegerLiteral,
    T::RealLiteral,
    T::StringLiteral,
    T::CharLiteral,
    T::True,
    T::False,
    T::Null,
    T::LParen,
    T::This,
    T::Base,
    T::New,
    T::TypeOf,
    T::Bang,
    T::Tilde,
];

/// Definitions referenced before their rule is set
#[derive(Debug, Clone, Copy)]
struct Forward {
    ty: DefId,
    expr: DefId,
    unary: DefId,
    stmt: DefId,
    block: DefId,
    type_member: DefId,
    namespace_member: DefId,
    using_directive: DefId,
    local_decl: DefId,
    array_initializer: DefId,
}

pub fn build() -> Grammar {
    let mut g = Grammar::new("C#");

    let fw = Forward {
        ty: g.define("Type"),
        expr: g.define("Expression"),
        unary: g.define("UnaryExpression"),
        stmt: g.define("Statement"),
        block: g.define("Block"),
        type_member: g.define("TypeMember"),
        namespace_member: g.define("NamespaceMember"),
        using_directive: g.define("UsingDirective"),
        local_decl: g.define("LocalVariableDeclaration"),
        array_initializer: g.define("ArrayInitializer"),
    };

    let ident = self::identifiers(&mut g);
    let (type_name, non_array_type) = self::types(&mut g, fw, ident);
    let args = self::expressions(&mut g, fw, ident, non_array_type);
    let declarators = self::statements(&mut g, fw, ident);
    let cu = self::declarations(&mut g, fw, ident, type_name, args, declarators);

    g.add_root("CompilationUnit", cu);
    g.add_root("Statement", fw.stmt);
    g.add_root("Expression", fw.expr);
    g.add_root("TypeMember", fw.type_member);

    debug_assert!(g.undefined().next().is_none(), "{:?}", g.undefined().collect::<Vec<_>>());
    g
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

fn types(g: &mut Grammar, fw: Forward, ident: DefId) -> (DefId, DefId) {
    let primitive = g.define("PrimitiveType");
    let rule = g.any(PRIMITIVE_TYPES);
    g.rule(primitive, rule, lower_primitive_type);

    // `A.B.C`
    let type_name = g.define("TypeName");
    let dot = g.tk(T::Dot);
    g.rule(type_name, ident.sep_by1(dot), |n, cx| {
        let items = n.list_items();
        let mut ty: Option<NodeId> = None;
        let mut span = n.span();
        for (i, el) in items.elements.iter().enumerate() {
            let name = el.lower(cx)?;
            span = match i {
                0 => el.span(),
                _ => span.cover(el.span()),
            };
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

    let non_array = g.define("NonArrayType");
    g.set_rule(non_array, primitive | type_name);

    // `[,,]`
    let rank = g.define("RankSpecifier");
    let rule = g.tk(T::LBracket) + g.tk(T::Comma).star() + g.tk(T::RBracket);
    g.set_rule(rank, rule);

    // `int*[]` is an array of pointers
    let rule = non_array + g.tk(T::Star).star() + rank.star();
    g.rule(fw.ty, rule, |n, cx| {
        let mut cur = n.cursor();
        let base = cur.node()?;
        let mut ty = cx.lower(&base)?;
        let mut span = base.span();
        while let Some(star) = cur.eat(T::Star) {
            span = span.cover(star.span());
            let id = cx.alloc(NodeKind::PointerType, span);
            cx.set(id, Title::Type, ty);
            ty = id;
        }
        while let Some(rank) = cur.eat_node() {
            span = span.cover(rank.span());
            let commas = rank
                .children()
                .iter()
                .filter(|c| c.as_token().map_or(false, |t| t.kind() == T::Comma))
                .count();
            let id = cx.alloc(
                NodeKind::ArrayType {
                    rank: commas as u32 + 1,
                },
                span,
            );
            cx.set(id, Title::Type, ty);
            ty = id;
        }
        Ok(ty)
    });

    (type_name, non_array)
}

fn lower_primitive_type(n: &ParseNode<'_>, cx: &mut Lowering<'_>) -> Result<NodeId, LowerError> {
    let tk = n.token().ok_or_else(|| n.unexpected("type keyword"))?;
    let ty = KnownType::from_token(tk.kind()).ok_or_else(|| LowerError::Unconvertible {
        expected: "primitive type",
        text: tk.text().to_string(),
    })?;
    Ok(cx.alloc(NodeKind::PrimitiveType(ty), tk.span()))
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
        T::Percent => B::Modulus,
        T::LtLt => B::ShiftLeft,
        T::GtGt => B::ShiftRight,
        T::Amp => B::BitwiseAnd,
        T::Pipe => B::BitwiseOr,
        T::Caret => B::ExclusiveOr,
        T::AmpAmp => B::ConditionalAnd,
        T::PipePipe => B::ConditionalOr,
        T::EqEq => B::Equality,
        T::BangEq => B::InEquality,
        T::Lt => B::LessThan,
        T::Gt => B::GreaterThan,
        T::LtEq => B::LessThanOrEqual,
        T::GtEq => B::GreaterThanOrEqual,
        T::QuestionQuestion => B::NullCoalescing,
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
        T::PercentEq => A::Modulus,
        T::LtLtEq => A::ShiftLeft,
        T::GtGtEq => A::ShiftRight,
        T::AmpEq => A::BitwiseAnd,
        T::PipeEq => A::BitwiseOr,
        T::CaretEq => A::ExclusiveOr,
        _ => return None,
    })
}

fn prefix_op(kind: T) -> Option<UnaryOperator> {
    use UnaryOperator as U;
    Some(match kind {
        T::Bang => U::Not,
        T::Tilde => U::BitNot,
        T::Minus => U::Minus,
        T::Plus => U::Plus,
        T::PlusPlus => U::Increment,
        T::MinusMinus => U::Decrement,
        _ => return None,
    })
}

/// Left-associative binary level `operand (op operand)*`
fn binary_level(g: &mut Grammar, name: &'static str, operand: DefId, ops: &[T]) -> DefId {
    let def = g.define(name);
    let sep = g.any(ops);
    g.rule(def, operand.sep_by1(sep), |n, cx| {
        let items = n.list_items();
        cx.fold_binary(&items, binary_op)
    });
    def
}

/// Returns the argument list definition
fn expressions(g: &mut Grammar, fw: Forward, ident: DefId, non_array_type: DefId) -> DefId {
    // arguments
    let argument = g.define("Argument");
    let rule = (g.any(&[T::Ref, T::Out]) + fw.expr) | fw.expr;
    g.rule(argument, rule, |n, cx| {
        let mut cur = n.cursor();
        match cur.eat_any(&[T::Ref, T::Out]) {
            Some(tk) => {
                let dir = match tk.kind() {
                    T::Ref => FieldDirection::Ref,
                    _ => FieldDirection::Out,
                };
                let id = cx.node(NodeKind::DirectionExpression(dir), n);
                cx.set_token(id, Title::Keyword, &tk);
                let expr = cx.lower(&cur.node()?)?;
                cx.set(id, Title::Expression, expr);
                Ok(id)
            }
            None => cx.lower(&cur.node()?),
        }
    });

    let args = g.define("ArgumentList");
    let comma = g.tk(T::Comma);
    g.set_rule(args, argument.sep_by(comma));

    // primary atoms
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

    let this = g.define("This");
    let rule = g.tk(T::This);
    g.rule(this, rule, |n, cx| Ok(cx.node(NodeKind::ThisReferenceExpression, n)));

    let base_ref = g.define("Base");
    let rule = g.tk(T::Base);
    g.rule(base_ref, rule, |n, cx| Ok(cx.node(NodeKind::BaseReferenceExpression, n)));

    let type_of = g.define("TypeOfExpression");
    let rule = g.tk(T::TypeOf) + g.tk(T::LParen) + fw.ty + g.tk(T::RParen);
    g.rule(type_of, rule, |n, cx| {
        let mut cur = n.cursor();
        let id = cx.node(NodeKind::TypeOfExpression, n);
        cx.set_token(id, Title::Keyword, &cur.token(T::TypeOf)?);
        cur.token(T::LParen)?;
        let ty = cx.lower(&cur.node()?)?;
        cx.set(id, Title::Type, ty);
        Ok(id)
    });

    // `{ a, b, }`
    let initializer_list = g.define("VariableInitializerList");
    let var_init = g.define("VariableInitializer");
    g.set_rule(var_init, fw.array_initializer | fw.expr);
    let comma = g.tk(T::Comma);
    g.set_rule(initializer_list, var_init.sep_by(comma).trailing());
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

    // `new T[n] { .. }`
    let array_create_sized = g.define("ArrayCreationSized");
    let dimensions = g.define("ArrayDimensions");
    let comma = g.tk(T::Comma);
    g.set_rule(dimensions, fw.expr.sep_by1(comma));
    let rank = g.define("TrailingRankSpecifier");
    let rule = g.tk(T::LBracket) + g.tk(T::Comma).star() + g.tk(T::RBracket);
    g.set_rule(rank, rule);
    let rule = g.tk(T::New)
        + non_array_type
        + g.tk(T::LBracket)
        + dimensions
        + g.tk(T::RBracket)
        + rank.star()
        + fw.array_initializer.opt();
    g.rule(array_create_sized, rule, move |n, cx| {
        let mut cur = n.cursor();
        let id = cx.node(NodeKind::ArrayCreateExpression(ArrayBounds::Length), n);
        cx.set_token(id, Title::Keyword, &cur.token(T::New)?);
        let mut ty = cx.lower(&cur.node()?)?;
        cur.token(T::LBracket)?;
        for arg in cur.node()?.lower_list(cx)? {
            cx.push(id, Title::Arguments, arg);
        }
        cur.token(T::RBracket)?;
        // extra ranks belong to the element type: `new int[3][]` creates `int[][3]`
        while let Some(r) = cur.eat_def(rank) {
            let commas = r.children().len().saturating_sub(2);
            let arr = cx.alloc(
                NodeKind::ArrayType {
                    rank: commas as u32 + 1,
                },
                r.span(),
            );
            cx.set(arr, Title::Type, ty);
            ty = arr;
        }
        cx.set(id, Title::Type, ty);
        if let Some(init) = cur.eat_node() {
            let init = cx.lower(&init)?;
            cx.set(id, Title::Initializer, init);
        }
        Ok(id)
    });

    // `new T[] { .. }`: the type node carries the rank
    let array_create_init = g.define("ArrayCreationInitialized");
    let rule = g.tk(T::New) + fw.ty + fw.array_initializer;
    g.rule(array_create_init, rule, |n, cx| {
        let mut cur = n.cursor();
        let id = cx.node(NodeKind::ArrayCreateExpression(ArrayBounds::Length), n);
        cx.set_token(id, Title::Keyword, &cur.token(T::New)?);
        let ty = cx.lower(&cur.node()?)?;
        // strip the outermost array type: it's spelled by the creation itself
        let elem = match cx.ast.kind(ty) {
            NodeKind::ArrayType { rank: 1 } => cx.ast.child(ty, Title::Type),
            _ => None,
        };
        match elem {
            Some(elem) => {
                cx.ast.remove(elem);
                cx.set(id, Title::Type, elem);
            }
            None => return Err(n.unexpected("array type of rank 1")),
        }
        let init = cx.lower(&cur.node()?)?;
        cx.set(id, Title::Initializer, init);
        Ok(id)
    });

    let object_create = g.define("ObjectCreation");
    let rule = g.tk(T::New) + fw.ty + g.tk(T::LParen) + args + g.tk(T::RParen);
    g.rule(object_create, rule, |n, cx| {
        let mut cur = n.cursor();
        let id = cx.node(NodeKind::ObjectCreateExpression, n);
        cx.set_token(id, Title::Keyword, &cur.token(T::New)?);
        let ty = cx.lower(&cur.node()?)?;
        cx.set(id, Title::Type, ty);
        cx.set_token(id, Title::LeftParenthesis, &cur.token(T::LParen)?);
        for arg in cur.node()?.lower_list(cx)? {
            cx.push(id, Title::Arguments, arg);
        }
        cx.set_token(id, Title::RightParenthesis, &cur.token(T::RParen)?);
        Ok(id)
    });

    let primary = g.define("PrimaryExpression");
    g.set_rule(
        primary,
        literal
            | paren
            | this
            | base_ref
            | type_of
            | array_create_sized
            | array_create_init
            | object_create
            | type_ref
            | ident_expr,
    );

    // `.x`, `?.x`, `(..)`, `[..]`, `++`, `--`
    let suffix = g.define("PostfixSuffix");
    let rule = (g.tk(T::Dot) + ident)
        | (g.tk(T::QuestionDot) + ident)
        | (g.tk(T::LParen) + args + g.tk(T::RParen))
        | (g.tk(T::LBracket) + args + g.tk(T::RBracket))
        | g.tk(T::PlusPlus)
        | g.tk(T::MinusMinus);
    g.set_rule(suffix, rule);

    let postfix = g.define("PostfixExpression");
    g.rule(postfix, primary + suffix.star(), |n, cx| {
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

    // unary
    let prefix = g.define("PrefixUnaryExpression");
    let rule = g.any(&[T::Bang, T::Tilde, T::Minus, T::Plus, T::PlusPlus, T::MinusMinus]) + fw.unary;
    g.rule(prefix, rule, |n, cx| {
        let mut cur = n.cursor();
        let tk = cur.any_token()?;
        let op = self::prefix_op(tk.kind()).ok_or_else(|| n.unexpected("prefix operator"))?;
        let id = cx.node(NodeKind::UnaryOperatorExpression(op), n);
        cx.set_token(id, Title::OperatorToken, &tk);
        let operand = cx.lower(&cur.node()?)?;
        cx.set(id, Title::Expression, operand);
        Ok(id)
    });

    // `(int)-x` casts; `(a)-x` subtracts: only primitive casts take any operand
    let cast = g.define("CastExpression");
    let primitive_ahead = g.any(PRIMITIVE_TYPES).followed_by();
    let follow = g.any(CAST_FOLLOW).followed_by();
    let primitive_cast = g.tk(T::LParen) + primitive_ahead + fw.ty + g.tk(T::RParen) + fw.unary;
    let named_cast = g.tk(T::LParen) + fw.ty + g.tk(T::RParen) + follow + fw.unary;
    g.rule(cast, primitive_cast | named_cast, |n, cx| {
        let mut cur = n.cursor();
        let id = cx.node(NodeKind::CastExpression(CastStyle::Explicit), n);
        cx.set_token(id, Title::LeftParenthesis, &cur.token(T::LParen)?);
        let ty = cx.lower(&cur.node()?)?;
        cx.set(id, Title::Type, ty);
        cx.set_token(id, Title::RightParenthesis, &cur.token(T::RParen)?);
        let expr = cx.lower(&cur.node()?)?;
        cx.set(id, Title::Expression, expr);
        Ok(id)
    });

    g.set_rule(fw.unary, prefix | cast | postfix);

    // binary levels, tightest first
    let mul = self::binary_level(g, "MultiplicativeExpression", fw.unary, &[T::Star, T::Slash, T::Percent]);
    let add = self::binary_level(g, "AdditiveExpression", mul, &[T::Plus, T::Minus]);
    let shift = self::binary_level(g, "ShiftExpression", add, &[T::LtLt, T::GtGt]);

    let relational_tail = g.define("RelationalTail");
    let rule = (g.any(&[T::Lt, T::Gt, T::LtEq, T::GtEq]) + shift)
        | (g.tk(T::Is) + fw.ty)
        | (g.tk(T::As) + fw.ty);
    g.set_rule(relational_tail, rule);

    let relational = g.define("RelationalExpression");
    g.rule(relational, shift + relational_tail.star(), |n, cx| {
        let mut cur = n.cursor();
        let first = cur.node()?;
        let mut span = first.span();
        let mut left = cx.lower(&first)?;
        while let Some(tail) = cur.eat_node() {
            span = span.cover(tail.span());
            let mut tc = tail.cursor();
            let op = tc.any_token()?;
            let operand = cx.lower(&tc.node()?)?;
            left = match op.kind() {
                T::Is | T::As => {
                    let kind = match op.kind() {
                        T::Is => NodeKind::IsExpression,
                        _ => NodeKind::AsExpression,
                    };
                    let id = cx.alloc(kind, span);
                    cx.set(id, Title::Expression, left);
                    cx.set_token(id, Title::Keyword, &op);
                    cx.set(id, Title::Type, operand);
                    id
                }
                kind => {
                    let bop = self::binary_op(kind).ok_or_else(|| tail.unexpected("relational operator"))?;
                    let id = cx.alloc(NodeKind::BinaryOperatorExpression(bop), span);
                    cx.set(id, Title::Left, left);
                    cx.set_token(id, Title::OperatorToken, &op);
                    cx.set(id, Title::Right, operand);
                    id
                }
            };
        }
        Ok(left)
    });

    let equality = self::binary_level(g, "EqualityExpression", relational, &[T::EqEq, T::BangEq]);
    let bit_and = self::binary_level(g, "AndExpression", equality, &[T::Amp]);
    let xor = self::binary_level(g, "ExclusiveOrExpression", bit_and, &[T::Caret]);
    let bit_or = self::binary_level(g, "InclusiveOrExpression", xor, &[T::Pipe]);
    let and = self::binary_level(g, "ConditionalAndExpression", bit_or, &[T::AmpAmp]);
    let or = self::binary_level(g, "ConditionalOrExpression", and, &[T::PipePipe]);

    let coalescing = g.define("NullCoalescingExpression");
    let sep = g.tk(T::QuestionQuestion);
    g.rule(coalescing, or.sep_by1(sep), |n, cx| {
        let items = n.list_items();
        cx.fold_binary_right(&items, binary_op)
    });

    let conditional = g.define("ConditionalExpression");
    let rule = coalescing + (g.tk(T::Question) + fw.expr + g.tk(T::Colon) + fw.expr).opt();
    g.rule(conditional, rule, |n, cx| {
        let mut cur = n.cursor();
        let cond = cur.node()?;
        let Some(question) = cur.eat(T::Question) else {
            return cx.lower(&cond);
        };
        let id = cx.node(NodeKind::ConditionalExpression, n);
        let c = cx.lower(&cond)?;
        cx.set(id, Title::Condition, c);
        cx.set_token(id, Title::QuestionMark, &question);
        let t = cx.lower(&cur.node()?)?;
        cx.set(id, Title::TrueExpression, t);
        cx.set_token(id, Title::Colon, &cur.token(T::Colon)?);
        let f = cx.lower(&cur.node()?)?;
        cx.set(id, Title::FalseExpression, f);
        Ok(id)
    });

    let assignment = g.define("AssignmentExpression");
    let rule = fw.unary + g.any(ASSIGNMENT_OPS) + fw.expr;
    g.rule(assignment, rule, |n, cx| {
        let mut cur = n.cursor();
        let left = cx.lower(&cur.node()?)?;
        let tk = cur.any_token()?;
        let op = self::assignment_op(tk.kind()).ok_or_else(|| n.unexpected("assignment operator"))?;
        let id = cx.node(NodeKind::AssignmentExpression(op), n);
        cx.set(id, Title::Left, left);
        cx.set_token(id, Title::OperatorToken, &tk);
        let value = cx.lower(&cur.node()?)?;
        cx.set(id, Title::Value, value);
        Ok(id)
    });

    g.set_rule(fw.expr, assignment | conditional);

    args
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
        T::LParen | T::LBracket => {
            let (kind, close) = match tk.kind() {
                T::LParen => (NodeKind::InvocationExpression, T::RParen),
                _ => (NodeKind::IndexerExpression, T::RBracket),
            };
            let id = cx.alloc(kind, span);
            cx.set(id, Title::Target, target);
            let (open_title, close_title) = match close {
                T::RParen => (Title::LeftParenthesis, Title::RightParenthesis),
                _ => (Title::LeftBracket, Title::RightBracket),
            };
            cx.set_token(id, open_title, &tk);
            for arg in cur.node()?.lower_list(cx)? {
                cx.push(id, Title::Arguments, arg);
            }
            cx.set_token(id, close_title, &cur.token(close)?);
            Ok(id)
        }
        T::PlusPlus | T::MinusMinus => {
            let op = match tk.kind() {
                T::PlusPlus => UnaryOperator::PostIncrement,
                _ => UnaryOperator::PostDecrement,
            };
            let id = cx.alloc(NodeKind::UnaryOperatorExpression(op), span);
            cx.set(id, Title::Expression, target);
            cx.set_token(id, Title::OperatorToken, &tk);
            Ok(id)
        }
        _ => Err(sfx.unexpected("postfix operator")),
    }
}

// ----------------------------------------
// Statements
// ----------------------------------------

/// Returns the variable declarator list definition
fn statements(g: &mut Grammar, fw: Forward, ident: DefId) -> DefId {
    let declarator = g.define("VariableDeclarator");
    let var_init = g.define("DeclaratorInitializer");
    g.set_rule(var_init, fw.array_initializer | fw.expr);
    let rule = ident + (g.tk(T::Eq) + var_init).opt();
    g.rule(declarator, rule, |n, cx| {
        let mut cur = n.cursor();
        let id = cx.node(NodeKind::VariableDeclarator, n);
        let name = cx.lower(&cur.node()?)?;
        cx.set(id, Title::Identifier, name);
        if let Some(eq) = cur.eat(T::Eq) {
            cx.set_token(id, Title::Assign, &eq);
            let init = cx.lower(&cur.node()?)?;
            cx.set(id, Title::Initializer, init);
        }
        Ok(id)
    });

    let declarators = g.define("VariableDeclaratorList");
    let comma = g.tk(T::Comma);
    g.set_rule(declarators, declarator.sep_by1(comma));

    // `const int a = 1, b` (no terminator: reused by `for` / `using` headers)
    let rule = g.tk(T::Const).opt() + fw.ty + declarators;
    g.rule(fw.local_decl, rule, |n, cx| {
        let mut cur = n.cursor();
        let id = cx.node(NodeKind::VariableDeclarationStatement, n);
        if let Some(c) = cur.eat(T::Const) {
            let m = cx.modifier(&c)?;
            cx.push(id, Title::Modifiers, m);
        }
        let ty = cx.lower(&cur.node()?)?;
        cx.set(id, Title::Type, ty);
        for v in cur.node()?.lower_list(cx)? {
            cx.push(id, Title::Variables, v);
        }
        Ok(id)
    });

    let local_decl_stmt = g.define("LocalDeclarationStatement");
    let rule = fw.local_decl + g.tk(T::Semicolon);
    g.rule(local_decl_stmt, rule, |n, cx| {
        let mut cur = n.cursor();
        let id = cx.lower(&cur.node()?)?;
        cx.set_token(id, Title::Semicolon, &cur.token(T::Semicolon)?);
        Ok(id)
    });

    let rule = g.tk(T::LBrace) + fw.stmt.star() + g.tk(T::RBrace);
    g.rule(fw.block, rule, |n, cx| {
        let mut cur = n.cursor();
        let id = cx.node(NodeKind::BlockStatement, n);
        cx.set_token(id, Title::LeftBrace, &cur.token(T::LBrace)?);
        while let Some(stmt) = cur.eat_node() {
            let stmt = cx.lower(&stmt)?;
            cx.push(id, Title::Statements, stmt);
        }
        cx.set_closing(id, Title::RightBrace, &cur.token(T::RBrace)?);
        Ok(id)
    });

    let empty = g.define("EmptyStatement");
    let rule = g.tk(T::Semicolon);
    g.rule(empty, rule, |n, cx| {
        let id = cx.node(NodeKind::EmptyStatement, n);
        let tk = n.token().ok_or_else(|| n.unexpected("`;`"))?;
        cx.set_token(id, Title::Semicolon, &tk);
        Ok(id)
    });

    let expr_stmt = g.define("ExpressionStatement");
    let rule = fw.expr + g.tk(T::Semicolon);
    g.rule(expr_stmt, rule, |n, cx| {
        let mut cur = n.cursor();
        let id = cx.node(NodeKind::ExpressionStatement, n);
        let expr = cx.lower(&cur.node()?)?;
        cx.set(id, Title::Expression, expr);
        cx.set_token(id, Title::Semicolon, &cur.token(T::Semicolon)?);
        Ok(id)
    });

    let if_stmt = g.define("IfStatement");
    let rule = g.tk(T::If)
        + g.tk(T::LParen)
        + fw.expr
        + g.tk(T::RParen)
        + fw.stmt
        + (g.tk(T::Else) + fw.stmt).opt();
    g.rule(if_stmt, rule, |n, cx| {
        let mut cur = n.cursor();
        let id = cx.node(NodeKind::IfElseStatement, n);
        cx.set_token(id, Title::Keyword, &cur.token(T::If)?);
        cx.set_token(id, Title::LeftParenthesis, &cur.token(T::LParen)?);
        let cond = cx.lower(&cur.node()?)?;
        cx.set(id, Title::Condition, cond);
        cx.set_token(id, Title::RightParenthesis, &cur.token(T::RParen)?);
        let body = cur.node()?;
        self::warn_empty_body(cx, &body);
        let t = cx.lower(&body)?;
        cx.set(id, Title::TrueStatement, t);
        if cur.eat(T::Else).is_some() {
            let f = cx.lower(&cur.node()?)?;
            cx.set(id, Title::FalseStatement, f);
        }
        Ok(id)
    });

    let while_stmt = g.define("WhileStatement");
    let rule = g.tk(T::While) + g.tk(T::LParen) + fw.expr + g.tk(T::RParen) + fw.stmt;
    g.rule(while_stmt, rule, |n, cx| {
        let mut cur = n.cursor();
        let id = cx.node(NodeKind::WhileStatement, n);
        cx.set_token(id, Title::Keyword, &cur.token(T::While)?);
        cur.token(T::LParen)?;
        let cond = cx.lower(&cur.node()?)?;
        cx.set(id, Title::Condition, cond);
        cur.token(T::RParen)?;
        let body = cur.node()?;
        self::warn_empty_body(cx, &body);
        let body = cx.lower(&body)?;
        cx.set(id, Title::EmbeddedStatement, body);
        Ok(id)
    });

    let do_stmt = g.define("DoStatement");
    let rule = g.tk(T::Do)
        + fw.stmt
        + g.tk(T::While)
        + g.tk(T::LParen)
        + fw.expr
        + g.tk(T::RParen)
        + g.tk(T::Semicolon);
    g.rule(do_stmt, rule, |n, cx| {
        let mut cur = n.cursor();
        let kind = NodeKind::DoLoopStatement(DoLoop {
            test: LoopTest::Post,
            until: false,
        });
        let id = cx.node(kind, n);
        cx.set_token(id, Title::Keyword, &cur.token(T::Do)?);
        let body = cx.lower(&cur.node()?)?;
        cx.set(id, Title::EmbeddedStatement, body);
        cur.token(T::While)?;
        cur.token(T::LParen)?;
        let cond = cx.lower(&cur.node()?)?;
        cx.set(id, Title::Condition, cond);
        cur.token(T::RParen)?;
        cx.set_token(id, Title::Semicolon, &cur.token(T::Semicolon)?);
        Ok(id)
    });

    // `for` header parts reuse the declaration and expression rules without terminators
    let expr_list = g.define("StatementExpressionList");
    let comma = g.tk(T::Comma);
    g.set_rule(expr_list, fw.expr.sep_by1(comma));

    let for_stmt = g.define("ForStatement");
    let local_decl = fw.local_decl;
    let rule = g.tk(T::For)
        + g.tk(T::LParen)
        + (fw.local_decl | expr_list).opt()
        + g.tk(T::Semicolon)
        + fw.expr.opt()
        + g.tk(T::Semicolon)
        + expr_list.opt()
        + g.tk(T::RParen)
        + fw.stmt;
    g.rule(for_stmt, rule, move |n, cx| {
        let mut cur = n.cursor();
        let id = cx.node(NodeKind::ForStatement, n);
        cx.set_token(id, Title::Keyword, &cur.token(T::For)?);
        cur.token(T::LParen)?;

        if let Some(init) = cur.eat_node() {
            if init.is(local_decl) {
                let decl = cx.lower(&init)?;
                cx.push(id, Title::Initializers, decl);
            } else {
                for stmt in self::expression_statements(cx, &init)? {
                    cx.push(id, Title::Initializers, stmt);
                }
            }
        }
        cur.token(T::Semicolon)?;

        if let Some(cond) = cur.eat_node() {
            let cond = cx.lower(&cond)?;
            cx.set(id, Title::Condition, cond);
        }
        cur.token(T::Semicolon)?;

        if let Some(iter) = cur.eat_node() {
            for stmt in self::expression_statements(cx, &iter)? {
                cx.push(id, Title::Iterators, stmt);
            }
        }
        cur.token(T::RParen)?;

        let body = cx.lower(&cur.node()?)?;
        cx.set(id, Title::EmbeddedStatement, body);
        Ok(id)
    });

    let foreach_stmt = g.define("ForeachStatement");
    let rule = g.tk(T::Foreach)
        + g.tk(T::LParen)
        + fw.ty
        + ident
        + g.tk(T::In)
        + fw.expr
        + g.tk(T::RParen)
        + fw.stmt;
    g.rule(foreach_stmt, rule, |n, cx| {
        let mut cur = n.cursor();
        let id = cx.node(NodeKind::ForeachStatement, n);
        cx.set_token(id, Title::Keyword, &cur.token(T::Foreach)?);
        cur.token(T::LParen)?;
        let ty = cx.lower(&cur.node()?)?;
        cx.set(id, Title::Type, ty);
        let name = cx.lower(&cur.node()?)?;
        cx.set(id, Title::Identifier, name);
        cur.token(T::In)?;
        let expr = cx.lower(&cur.node()?)?;
        cx.set(id, Title::Expression, expr);
        cur.token(T::RParen)?;
        let body = cx.lower(&cur.node()?)?;
        cx.set(id, Title::EmbeddedStatement, body);
        Ok(id)
    });

    let return_stmt = g.define("ReturnStatement");
    let rule = g.tk(T::Return) + fw.expr.opt() + g.tk(T::Semicolon);
    g.rule(return_stmt, rule, |n, cx| {
        self::keyword_expression_statement(n, cx, NodeKind::ReturnStatement)
    });

    let throw_stmt = g.define("ThrowStatement");
    let rule = g.tk(T::Throw) + fw.expr.opt() + g.tk(T::Semicolon);
    g.rule(throw_stmt, rule, |n, cx| {
        self::keyword_expression_statement(n, cx, NodeKind::ThrowStatement)
    });

    let break_stmt = g.define("BreakStatement");
    let rule = g.tk(T::Break) + g.tk(T::Semicolon);
    g.rule(break_stmt, rule, |n, cx| {
        self::keyword_expression_statement(n, cx, NodeKind::BreakStatement)
    });

    let continue_stmt = g.define("ContinueStatement");
    let rule = g.tk(T::Continue) + g.tk(T::Semicolon);
    g.rule(continue_stmt, rule, |n, cx| {
        self::keyword_expression_statement(n, cx, NodeKind::ContinueStatement)
    });

    // try / catch / finally
    let catch = g.define("CatchClause");
    let rule = g.tk(T::Catch)
        + (g.tk(T::LParen) + fw.ty + ident.opt() + g.tk(T::RParen)).opt()
        + fw.block;
    g.rule(catch, rule, |n, cx| {
        let mut cur = n.cursor();
        let id = cx.node(NodeKind::CatchClause, n);
        cx.set_token(id, Title::Keyword, &cur.token(T::Catch)?);
        if cur.eat(T::LParen).is_some() {
            let ty = cx.lower(&cur.node()?)?;
            cx.set(id, Title::Type, ty);
            if let Some(name) = cur.eat_node() {
                let name = cx.lower(&name)?;
                cx.set(id, Title::Identifier, name);
            }
            cur.token(T::RParen)?;
        }
        let body = cx.lower(&cur.node()?)?;
        cx.set(id, Title::Body, body);
        Ok(id)
    });

    let try_stmt = g.define("TryStatement");
    let rule = g.tk(T::Try) + fw.block + catch.star() + (g.tk(T::Finally) + fw.block).opt();
    g.rule(try_stmt, rule, move |n, cx| {
        let mut cur = n.cursor();
        let id = cx.node(NodeKind::TryCatchStatement, n);
        cx.set_token(id, Title::Keyword, &cur.token(T::Try)?);
        let block = cx.lower(&cur.node()?)?;
        cx.set(id, Title::TryBlock, block);
        while let Some(c) = cur.eat_def(catch) {
            let c = cx.lower(&c)?;
            cx.push(id, Title::CatchClauses, c);
        }
        if cur.eat(T::Finally).is_some() {
            let block = cx.lower(&cur.node()?)?;
            cx.set(id, Title::FinallyBlock, block);
        }
        Ok(id)
    });

    // switch
    let label = g.define("SwitchLabel");
    let rule = (g.tk(T::Case) + fw.expr + g.tk(T::Colon)) | (g.tk(T::Default) + g.tk(T::Colon));
    g.rule(label, rule, |n, cx| {
        let mut cur = n.cursor();
        let id = cx.node(NodeKind::CaseLabel, n);
        let kw = cur.any_token()?;
        cx.set_token(id, Title::Keyword, &kw);
        if kw.kind() == T::Case {
            let expr = cx.lower(&cur.node()?)?;
            cx.set(id, Title::Expression, expr);
        }
        cx.set_token(id, Title::Colon, &cur.token(T::Colon)?);
        Ok(id)
    });

    let section = g.define("SwitchSection");
    g.rule(section, label.plus() + fw.stmt.plus(), move |n, cx| {
        let mut cur = n.cursor();
        let id = cx.node(NodeKind::SwitchSection, n);
        while let Some(l) = cur.eat_def(label) {
            let l = cx.lower(&l)?;
            cx.push(id, Title::CaseLabels, l);
        }
        while let Some(s) = cur.eat_node() {
            let s = cx.lower(&s)?;
            cx.push(id, Title::Statements, s);
        }
        Ok(id)
    });

    let switch_stmt = g.define("SwitchStatement");
    let rule = g.tk(T::Switch)
        + g.tk(T::LParen)
        + fw.expr
        + g.tk(T::RParen)
        + g.tk(T::LBrace)
        + section.star()
        + g.tk(T::RBrace);
    g.rule(switch_stmt, rule, |n, cx| {
        let mut cur = n.cursor();
        let id = cx.node(NodeKind::SwitchStatement, n);
        cx.set_token(id, Title::Keyword, &cur.token(T::Switch)?);
        cur.token(T::LParen)?;
        let expr = cx.lower(&cur.node()?)?;
        cx.set(id, Title::Expression, expr);
        cur.token(T::RParen)?;
        cx.set_token(id, Title::LeftBrace, &cur.token(T::LBrace)?);
        while let Some(s) = cur.eat_node() {
            let s = cx.lower(&s)?;
            cx.push(id, Title::SwitchSections, s);
        }
        cx.set_closing(id, Title::RightBrace, &cur.token(T::RBrace)?);
        Ok(id)
    });

    let using_stmt = g.define("UsingStatement");
    let rule = g.tk(T::Using)
        + g.tk(T::LParen)
        + (fw.local_decl | fw.expr)
        + g.tk(T::RParen)
        + fw.stmt;
    g.rule(using_stmt, rule, |n, cx| {
        let mut cur = n.cursor();
        let id = cx.node(NodeKind::UsingStatement, n);
        cx.set_token(id, Title::Keyword, &cur.token(T::Using)?);
        cur.token(T::LParen)?;
        let res = cx.lower(&cur.node()?)?;
        cx.set(id, Title::ResourceAcquisition, res);
        cur.token(T::RParen)?;
        let body = cx.lower(&cur.node()?)?;
        cx.set(id, Title::EmbeddedStatement, body);
        Ok(id)
    });

    let lock_stmt = g.define("LockStatement");
    let rule = g.tk(T::Lock) + g.tk(T::LParen) + fw.expr + g.tk(T::RParen) + fw.stmt;
    g.rule(lock_stmt, rule, |n, cx| {
        let mut cur = n.cursor();
        let id = cx.node(NodeKind::LockStatement, n);
        cx.set_token(id, Title::Keyword, &cur.token(T::Lock)?);
        cur.token(T::LParen)?;
        let expr = cx.lower(&cur.node()?)?;
        cx.set(id, Title::Expression, expr);
        cur.token(T::RParen)?;
        let body = cx.lower(&cur.node()?)?;
        cx.set(id, Title::EmbeddedStatement, body);
        Ok(id)
    });

    let fixed_stmt = g.define("FixedStatement");
    let rule = g.tk(T::Fixed) + g.tk(T::LParen) + fw.ty + declarators + g.tk(T::RParen) + fw.stmt;
    g.rule(fixed_stmt, rule, |n, cx| {
        let mut cur = n.cursor();
        let id = cx.node(NodeKind::FixedStatement, n);
        cx.set_token(id, Title::Keyword, &cur.token(T::Fixed)?);
        cur.token(T::LParen)?;
        let ty = cx.lower(&cur.node()?)?;
        cx.set(id, Title::Type, ty);
        for v in cur.node()?.lower_list(cx)? {
            cx.push(id, Title::Variables, v);
        }
        cur.token(T::RParen)?;
        let body = cx.lower(&cur.node()?)?;
        cx.set(id, Title::EmbeddedStatement, body);
        Ok(id)
    });

    g.set_rule(
        fw.stmt,
        fw.block
            | empty
            | if_stmt
            | while_stmt
            | do_stmt
            | for_stmt
            | foreach_stmt
            | return_stmt
            | break_stmt
            | continue_stmt
            | throw_stmt
            | try_stmt
            | switch_stmt
            | using_stmt
            | lock_stmt
            | fixed_stmt
            | local_decl_stmt
            | expr_stmt,
    );
    g.collect_trivia(fw.stmt);

    declarators
}

/// `return x;`, `throw;`, `break;`
fn keyword_expression_statement(
    n: &ParseNode<'_>,
    cx: &mut Lowering<'_>,
    kind: NodeKind,
) -> Result<NodeId, LowerError> {
    let mut cur = n.cursor();
    let id = cx.node(kind, n);
    cx.set_token(id, Title::Keyword, &cur.any_token()?);
    if let Some(expr) = cur.eat_node() {
        let expr = cx.lower(&expr)?;
        cx.set(id, Title::Expression, expr);
    }
    cx.set_token(id, Title::Semicolon, &cur.token(T::Semicolon)?);
    Ok(id)
}

/// Header expressions of `for` as terminator-less expression statements
fn expression_statements(
    cx: &mut Lowering<'_>,
    list: &ParseNode<'_>,
) -> Result<Vec<NodeId>, LowerError> {
    let mut out = Vec::new();
    for el in list.list_items().elements {
        let expr = el.lower(cx)?;
        let id = cx.alloc(NodeKind::ExpressionStatement, el.span());
        cx.set(id, Title::Expression, expr);
        out.push(id);
    }
    Ok(out)
}

/// `if (c);` and `while (c);`
fn warn_empty_body(cx: &mut Lowering<'_>, body: &ParseNode<'_>) {
    let is_empty = matches!(
        body.children().as_slice(),
        [ParseChild::Node(inner)] if inner.name() == "EmptyStatement"
    );
    if is_empty {
        cx.report(body.span(), CSharpErrorCode::PossibleMistakenEmptyStatement);
    }
}

// ----------------------------------------
// Declarations
// ----------------------------------------

fn declarations(
    g: &mut Grammar,
    fw: Forward,
    ident: DefId,
    type_name: DefId,
    args: DefId,
    declarators: DefId,
) -> DefId {
    let modifiers = g.define("Modifiers");
    let rule = g.any(MODIFIERS).star();
    g.set_rule(modifiers, rule);

    // parameters
    let parameter = g.define("Parameter");
    let rule = g.any(&[T::Ref, T::Out, T::Params]).opt()
        + fw.ty
        + ident
        + (g.tk(T::Eq) + fw.expr).opt();
    g.rule(parameter, rule, |n, cx| {
        let mut cur = n.cursor();
        let modifier = match cur.eat_any(&[T::Ref, T::Out, T::Params]).map(|t| t.kind()) {
            Some(T::Ref) => ParameterModifier::Ref,
            Some(T::Out) => ParameterModifier::Out,
            Some(_) => ParameterModifier::Params,
            None => ParameterModifier::None,
        };
        let id = cx.node(NodeKind::ParameterDeclaration(modifier), n);
        let ty = cx.lower(&cur.node()?)?;
        cx.set(id, Title::Type, ty);
        let name = cx.lower(&cur.node()?)?;
        cx.set(id, Title::Identifier, name);
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

    // `(params)` lowered into the owner
    fn parameters(
        cx: &mut Lowering<'_>,
        owner: NodeId,
        cur: &mut ChildCursor<'_>,
    ) -> Result<(), LowerError> {
        cx.set_token(owner, Title::LeftParenthesis, &cur.token(T::LParen)?);
        for p in cur.node()?.lower_list(cx)? {
            cx.push(owner, Title::Parameters, p);
        }
        cx.set_token(owner, Title::RightParenthesis, &cur.token(T::RParen)?);
        Ok(())
    }

    // fields
    let field = g.define("FieldDeclaration");
    let rule = modifiers + fw.ty + declarators + g.tk(T::Semicolon);
    g.rule(field, rule, |n, cx| {
        let mut cur = n.cursor();
        let id = cx.node(NodeKind::FieldDeclaration, n);
        cx.modifiers(id, &cur.node()?)?;
        let ty = cx.lower(&cur.node()?)?;
        cx.set(id, Title::Type, ty);
        for v in cur.node()?.lower_list(cx)? {
            cx.push(id, Title::Variables, v);
        }
        cx.set_token(id, Title::Semicolon, &cur.token(T::Semicolon)?);
        Ok(id)
    });

    // methods
    let method = g.define("MethodDeclaration");
    let rule = modifiers
        + fw.ty
        + ident
        + g.tk(T::LParen)
        + params
        + g.tk(T::RParen)
        + (Rule::from(fw.block) | g.tk(T::Semicolon));
    g.rule(method, rule, |n, cx| {
        let mut cur = n.cursor();
        let id = cx.node(NodeKind::MethodDeclaration, n);
        cx.modifiers(id, &cur.node()?)?;
        // `void` is spelled by the absence of a return type
        let ty = cur.node()?;
        if ty.span().slice(cx.src()) != "void" {
            let ty = cx.lower(&ty)?;
            cx.set(id, Title::Type, ty);
        }
        let name = cx.lower(&cur.node()?)?;
        cx.set(id, Title::Identifier, name);
        parameters(cx, id, &mut cur)?;
        match cur.eat(T::Semicolon) {
            Some(semi) => cx.set_token(id, Title::Semicolon, &semi),
            None => {
                let body = cx.lower(&cur.node()?)?;
                cx.set(id, Title::Body, body);
            }
        }
        Ok(id)
    });

    // constructors
    let ctor_init = g.define("ConstructorInitializer");
    let rule = g.tk(T::Colon)
        + g.any(&[T::Base, T::This])
        + g.tk(T::LParen)
        + args
        + g.tk(T::RParen);
    g.rule(ctor_init, rule, |n, cx| {
        let mut cur = n.cursor();
        cur.token(T::Colon)?;
        let kw = cur.any_token()?;
        let kind = match kw.kind() {
            T::Base => CtorInitializerKind::Base,
            _ => CtorInitializerKind::This,
        };
        let id = cx.node(NodeKind::ConstructorInitializer(kind), n);
        cx.set_token(id, Title::Keyword, &kw);
        cur.token(T::LParen)?;
        for arg in cur.node()?.lower_list(cx)? {
            cx.push(id, Title::Arguments, arg);
        }
        cur.token(T::RParen)?;
        Ok(id)
    });

    let ctor = g.define("ConstructorDeclaration");
    let rule = modifiers
        + ident
        + g.tk(T::LParen)
        + params
        + g.tk(T::RParen)
        + ctor_init.opt()
        + fw.block;
    g.rule(ctor, rule, move |n, cx| {
        let mut cur = n.cursor();
        let id = cx.node(NodeKind::ConstructorDeclaration, n);
        cx.modifiers(id, &cur.node()?)?;
        let name = cx.lower(&cur.node()?)?;
        cx.set(id, Title::Identifier, name);
        parameters(cx, id, &mut cur)?;
        if let Some(init) = cur.eat_def(ctor_init) {
            let init = cx.lower(&init)?;
            cx.set(id, Title::Initializer, init);
        }
        let body = cx.lower(&cur.node()?)?;
        cx.set(id, Title::Body, body);
        Ok(id)
    });

    // properties
    let accessor = g.define("Accessor");
    let rule = modifiers
        + g.any(&[T::Get, T::Set])
        + (Rule::from(fw.block) | g.tk(T::Semicolon));
    g.rule(accessor, rule, |n, cx| {
        let mut cur = n.cursor();
        let mods = cur.node()?;
        let kw = cur.any_token()?;
        let kind = match kw.kind() {
            T::Get => AccessorKind::Get,
            _ => AccessorKind::Set,
        };
        let id = cx.node(NodeKind::Accessor(kind), n);
        cx.modifiers(id, &mods)?;
        cx.set_token(id, Title::Keyword, &kw);
        match cur.eat(T::Semicolon) {
            Some(semi) => cx.set_token(id, Title::Semicolon, &semi),
            None => {
                let body = cx.lower(&cur.node()?)?;
                cx.set(id, Title::Body, body);
            }
        }
        Ok(id)
    });
    g.collect_trivia(accessor);

    let property = g.define("PropertyDeclaration");
    let rule = modifiers + fw.ty + ident + g.tk(T::LBrace) + accessor.star() + g.tk(T::RBrace);
    g.rule(property, rule, |n, cx| {
        let mut cur = n.cursor();
        let id = cx.node(NodeKind::PropertyDeclaration, n);
        cx.modifiers(id, &cur.node()?)?;
        let ty = cx.lower(&cur.node()?)?;
        cx.set(id, Title::Type, ty);
        let name = cx.lower(&cur.node()?)?;
        cx.set(id, Title::Identifier, name);
        cx.set_token(id, Title::LeftBrace, &cur.token(T::LBrace)?);
        while let Some(acc) = cur.eat_node() {
            let acc = cx.lower(&acc)?;
            let title = match cx.ast.kind(acc) {
                NodeKind::Accessor(AccessorKind::Get) => Title::Getter,
                _ => Title::Setter,
            };
            cx.set(id, title, acc);
        }
        cx.set_closing(id, Title::RightBrace, &cur.token(T::RBrace)?);
        Ok(id)
    });

    // events
    let event = g.define("EventDeclaration");
    let rule = modifiers + g.tk(T::Event) + fw.ty + ident + g.tk(T::Semicolon);
    g.rule(event, rule, |n, cx| {
        let mut cur = n.cursor();
        let id = cx.node(NodeKind::EventDeclaration, n);
        cx.modifiers(id, &cur.node()?)?;
        cx.set_token(id, Title::Keyword, &cur.token(T::Event)?);
        let ty = cx.lower(&cur.node()?)?;
        cx.set(id, Title::Type, ty);
        let name = cx.lower(&cur.node()?)?;
        cx.set(id, Title::Identifier, name);
        cx.set_token(id, Title::Semicolon, &cur.token(T::Semicolon)?);
        Ok(id)
    });

    // enums
    let enum_member = g.define("EnumMemberDeclaration");
    let rule = ident + (g.tk(T::Eq) + fw.expr).opt();
    g.rule(enum_member, rule, |n, cx| {
        let mut cur = n.cursor();
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

    let enum_members = g.define("EnumMemberList");
    let comma = g.tk(T::Comma);
    g.set_rule(enum_members, enum_member.sep_by(comma).trailing());

    let type_list = g.define("BaseTypeList");
    let comma = g.tk(T::Comma);
    g.set_rule(type_list, fw.ty.sep_by1(comma));

    let enum_decl = g.define("EnumDeclaration");
    let rule = modifiers
        + g.tk(T::Enum)
        + ident
        + (g.tk(T::Colon) + type_list).opt()
        + g.tk(T::LBrace)
        + enum_members
        + g.tk(T::RBrace)
        + g.tk(T::Semicolon).opt();
    g.rule(enum_decl, rule, |n, cx| {
        let mut cur = n.cursor();
        let id = cx.node(NodeKind::TypeDeclaration(TypeVariant::Enum), n);
        cx.modifiers(id, &cur.node()?)?;
        cx.set_token(id, Title::Keyword, &cur.token(T::Enum)?);
        let name = cx.lower(&cur.node()?)?;
        cx.set(id, Title::Identifier, name);
        if cur.eat(T::Colon).is_some() {
            for ty in cur.node()?.lower_list(cx)? {
                cx.push(id, Title::BaseTypes, ty);
            }
        }
        cx.set_token(id, Title::LeftBrace, &cur.token(T::LBrace)?);
        for m in cur.node()?.lower_list(cx)? {
            cx.push(id, Title::Members, m);
        }
        cx.set_closing(id, Title::RightBrace, &cur.token(T::RBrace)?);
        if let Some(semi) = cur.eat(T::Semicolon) {
            cx.report(semi.span(), CSharpErrorCode::RedundantSemicolon);
        }
        Ok(id)
    });

    // classes, structs, interfaces
    let type_decl = g.define("TypeDeclaration");
    let rule = modifiers
        + g.any(&[T::Class, T::Struct, T::Interface])
        + ident
        + (g.tk(T::Colon) + type_list).opt()
        + g.tk(T::LBrace)
        + fw.type_member.star()
        + g.tk(T::RBrace)
        + g.tk(T::Semicolon).opt();
    g.rule(type_decl, rule, |n, cx| {
        let mut cur = n.cursor();
        let mods = cur.node()?;
        let kw = cur.any_token()?;
        let variant = match kw.kind() {
            T::Class => TypeVariant::Class,
            T::Struct => TypeVariant::Struct,
            _ => TypeVariant::Interface,
        };
        let id = cx.node(NodeKind::TypeDeclaration(variant), n);
        cx.modifiers(id, &mods)?;
        cx.set_token(id, Title::Keyword, &kw);
        let name = cx.lower(&cur.node()?)?;
        cx.set(id, Title::Identifier, name);
        if cur.eat(T::Colon).is_some() {
            for ty in cur.node()?.lower_list(cx)? {
                cx.push(id, Title::BaseTypes, ty);
            }
        }
        cx.set_token(id, Title::LeftBrace, &cur.token(T::LBrace)?);
        while let Some(m) = cur.eat_node() {
            let m = cx.lower(&m)?;
            cx.push(id, Title::Members, m);
        }
        cx.set_closing(id, Title::RightBrace, &cur.token(T::RBrace)?);
        if let Some(semi) = cur.eat(T::Semicolon) {
            cx.report(semi.span(), CSharpErrorCode::RedundantSemicolon);
        }
        Ok(id)
    });

    g.set_rule(
        fw.type_member,
        type_decl | enum_decl | ctor | method | property | event | field,
    );
    g.collect_trivia(fw.type_member);

    // namespaces
    let rule = g.tk(T::Using) + type_name + g.tk(T::Semicolon);
    g.rule(fw.using_directive, rule, |n, cx| {
        let mut cur = n.cursor();
        let id = cx.node(NodeKind::UsingDeclaration, n);
        cx.set_token(id, Title::Keyword, &cur.token(T::Using)?);
        let name = cx.lower(&cur.node()?)?;
        cx.set(id, Title::Import, name);
        cx.set_token(id, Title::Semicolon, &cur.token(T::Semicolon)?);
        Ok(id)
    });
    g.collect_trivia(fw.using_directive);

    let namespace = g.define("NamespaceDeclaration");
    let rule = g.tk(T::Namespace)
        + type_name
        + g.tk(T::LBrace)
        + fw.using_directive.star()
        + fw.namespace_member.star()
        + g.tk(T::RBrace)
        + g.tk(T::Semicolon).opt();
    g.rule(namespace, rule, |n, cx| {
        let mut cur = n.cursor();
        let id = cx.node(NodeKind::NamespaceDeclaration, n);
        cx.set_token(id, Title::Keyword, &cur.token(T::Namespace)?);
        let name = cx.lower(&cur.node()?)?;
        cx.set(id, Title::Name, name);
        cx.set_token(id, Title::LeftBrace, &cur.token(T::LBrace)?);
        while let Some(m) = cur.eat_node() {
            let m = cx.lower(&m)?;
            cx.push(id, Title::Members, m);
        }
        cx.set_closing(id, Title::RightBrace, &cur.token(T::RBrace)?);
        if let Some(semi) = cur.eat(T::Semicolon) {
            cx.report(semi.span(), CSharpErrorCode::RedundantSemicolon);
        }
        Ok(id)
    });

    g.set_rule(fw.namespace_member, namespace | type_decl | enum_decl);
    g.collect_trivia(fw.namespace_member);

    let cu = g.define("CompilationUnit");
    let rule = fw.using_directive.star() + fw.namespace_member.star();
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
