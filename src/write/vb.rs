//! VB writer
//!
//! Blocks are line-delimited: statements never end with a terminator of their own, the enclosing
//! list breaks the line. C# constructs without a VB form are rewritten where the rewrite keeps the
//! meaning (`for` as `For`/`Next` or `While`, `a ?? b` as `If(a, b)`, `x++` as `x += 1`) and
//! rejected otherwise.

use crate::{
    ast::{
        kind::{
            AccessorKind, ArrayBounds, AssignmentOperator, BinaryOperator, CastStyle, Comment,
            CtorInitializerKind, DoLoop, ExitKind, KnownType, LiteralValue, LoopTest, Modifier,
            ParameterModifier, TypeVariant, UnaryOperator,
        },
        nodes::has_modifier,
        Ast, NodeId, NodeKind, Title,
    },
    lang::{KeywordTable, SurfaceSyntax},
    syntax::token::NumberSuffix,
    write::{self, options::FormattingOptions, NodeWriter, TextOutput, WriteError},
};

const XOR: u8 = 1;
const OR: u8 = 2;
const AND: u8 = 3;
const NOT: u8 = 4;
const COMPARISON: u8 = 5;
const SHIFT: u8 = 6;
const CONCAT: u8 = 7;
const ADDITIVE: u8 = 8;
const MODULUS: u8 = 9;
const INTEGER_DIVISION: u8 = 10;
const MULTIPLICATIVE: u8 = 11;
const NEGATION: u8 = 12;
const POWER: u8 = 13;
const PRIMARY: u8 = 20;

fn binary_precedence(op: BinaryOperator) -> u8 {
    use BinaryOperator as B;
    match op {
        B::ExclusiveOr => XOR,
        B::BitwiseOr | B::ConditionalOr => OR,
        B::BitwiseAnd | B::ConditionalAnd => AND,
        B::Equality
        | B::InEquality
        | B::ReferenceEquality
        | B::ReferenceInequality
        | B::LessThan
        | B::GreaterThan
        | B::LessThanOrEqual
        | B::GreaterThanOrEqual => COMPARISON,
        B::ShiftLeft | B::ShiftRight => SHIFT,
        B::Concat => CONCAT,
        B::Add | B::Subtract => ADDITIVE,
        B::Modulus => MODULUS,
        B::IntegerDivide => INTEGER_DIVISION,
        B::Multiply | B::Divide => MULTIPLICATIVE,
        B::Power => POWER,
        // `If(a, b)`
        B::NullCoalescing => PRIMARY,
    }
}

fn binary_text(op: BinaryOperator) -> &'static str {
    use BinaryOperator as B;
    match op {
        B::Add => "+",
        B::Subtract => "-",
        B::Multiply => "*",
        B::Divide => "/",
        B::IntegerDivide => "\\",
        B::Modulus => "Mod",
        B::Power => "^",
        B::Concat => "&",
        B::ShiftLeft => "<<",
        B::ShiftRight => ">>",
        B::BitwiseAnd => "And",
        B::BitwiseOr => "Or",
        B::ExclusiveOr => "Xor",
        B::ConditionalAnd => "AndAlso",
        B::ConditionalOr => "OrElse",
        B::Equality => "=",
        B::InEquality => "<>",
        B::LessThan => "<",
        B::GreaterThan => ">",
        B::LessThanOrEqual => "<=",
        B::GreaterThanOrEqual => ">=",
        B::ReferenceEquality => "Is",
        B::ReferenceInequality => "IsNot",
        B::NullCoalescing => "If",
    }
}

/// Compound assignment operator, or the binary operator it expands to
fn assignment_text(op: AssignmentOperator) -> Result<&'static str, BinaryOperator> {
    use AssignmentOperator as A;
    Ok(match op {
        A::Assign => "=",
        A::Add => "+=",
        A::Subtract => "-=",
        A::Multiply => "*=",
        A::Divide => "/=",
        A::IntegerDivide => "\\=",
        A::Power => "^=",
        A::Concat => "&=",
        A::ShiftLeft => "<<=",
        A::ShiftRight => ">>=",
        A::Modulus => return Err(BinaryOperator::Modulus),
        A::BitwiseAnd => return Err(BinaryOperator::BitwiseAnd),
        A::BitwiseOr => return Err(BinaryOperator::BitwiseOr),
        A::ExclusiveOr => return Err(BinaryOperator::ExclusiveOr),
    })
}

fn suffix_text(suffix: NumberSuffix) -> &'static str {
    match suffix {
        NumberSuffix::None => "",
        NumberSuffix::Short => "S",
        NumberSuffix::UShort => "US",
        NumberSuffix::Integer => "I",
        NumberSuffix::UInteger => "UI",
        NumberSuffix::Long => "L",
        NumberSuffix::ULong => "UL",
        NumberSuffix::Float => "F",
        NumberSuffix::Double => "R",
        NumberSuffix::Decimal => "D",
    }
}

/// Spelling of a literal value without a VB original
///
/// VB strings have no escapes: control characters are concatenated in with `ChrW`.
pub fn literal_text(value: &LiteralValue) -> String {
    match value {
        LiteralValue::Null => "Nothing".to_string(),
        LiteralValue::Boolean(true) => "True".to_string(),
        LiteralValue::Boolean(false) => "False".to_string(),
        LiteralValue::Integer { value, suffix } => format!("{value}{}", self::suffix_text(*suffix)),
        LiteralValue::Real { value, suffix } => format!("{value:?}{}", self::suffix_text(*suffix)),
        LiteralValue::String(s) => {
            let mut parts = Vec::new();
            let mut run = String::new();
            for c in s.chars() {
                if c.is_control() {
                    if !run.is_empty() {
                        parts.push(format!("\"{}\"", run.replace('"', "\"\"")));
                        run.clear();
                    }
                    parts.push(format!("ChrW({})", c as u32));
                } else {
                    run.push(c);
                }
            }
            if !run.is_empty() || parts.is_empty() {
                parts.push(format!("\"{}\"", run.replace('"', "\"\"")));
            }
            match parts.as_slice() {
                [one] => one.clone(),
                _ => format!("({})", parts.join(" & ")),
            }
        }
        LiteralValue::Char(c) if c.is_control() => format!("ChrW({})", *c as u32),
        LiteralValue::Char('"') => "\"\"\"\"c".to_string(),
        LiteralValue::Char(c) => format!("\"{c}\"c"),
    }
}

fn is_var(ast: &Ast, ty: NodeId) -> bool {
    matches!(ast.kind(ty), NodeKind::SimpleType) && ast.name_of(ty) == Some("var")
}

/// Loop a `break` / `continue` jumps out of, as VB names it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoopKeyword {
    Do,
    For,
    While,
    Select,
}

impl LoopKeyword {
    fn text(self) -> &'static str {
        match self {
            LoopKeyword::Do => "Do",
            LoopKeyword::For => "For",
            LoopKeyword::While => "While",
            LoopKeyword::Select => "Select",
        }
    }
}

/// C# `for` in the shape of `For i = start To limit Step step`
struct CountingLoop {
    name: NodeId,
    ty: Option<NodeId>,
    start: NodeId,
    limit: NodeId,
    /// `limit - 1` (`<`) or `limit + 1` (`>`)
    limit_offset: Option<&'static str>,
    step: Step,
}

enum Step {
    One,
    MinusOne,
    Up(NodeId),
    Down(NodeId),
}

pub struct VbWriter<'a, 'o> {
    ast: &'a Ast,
    keywords: &'a KeywordTable,
    #[allow(unused)]
    options: &'a FormattingOptions,
    out: &'o mut dyn TextOutput,
    /// Inside a `Using` header: no `Dim`
    in_header: bool,
}

impl<'a, 'o> NodeWriter for VbWriter<'a, 'o> {
    fn syntax(&self) -> SurfaceSyntax {
        SurfaceSyntax::VisualBasic
    }

    fn ast(&self) -> &Ast {
        self.ast
    }

    fn out(&mut self) -> &mut dyn TextOutput {
        self.out
    }

    fn write_comment(&mut self, comment: &Comment) -> Result<(), WriteError> {
        for (i, line) in write::comment_text(false, comment).iter().enumerate() {
            if i > 0 {
                self.out.new_line()?;
            }
            self.out.write_comment(line)?;
        }
        Ok(())
    }

    fn write_node(&mut self, id: NodeId) -> Result<(), WriteError> {
        self.out.start_node(id);
        self.write_kind(id)?;
        self.out.end_node(id);
        Ok(())
    }
}

impl<'a, 'o> VbWriter<'a, 'o> {
    pub fn new(
        ast: &'a Ast,
        keywords: &'a KeywordTable,
        options: &'a FormattingOptions,
        out: &'o mut dyn TextOutput,
    ) -> Self {
        Self {
            ast,
            keywords,
            options,
            out,
            in_header: false,
        }
    }

    pub fn write_root(&mut self, root: NodeId) -> Result<(), WriteError> {
        self.write_leading_trivia(root)?;
        self.write_node(root)
    }

    fn kw(&mut self, keyword: &str) -> Result<(), WriteError> {
        Ok(self.out.write_keyword(keyword)?)
    }

    fn tk(&mut self, token: &str) -> Result<(), WriteError> {
        Ok(self.out.write_token(token)?)
    }

    fn space(&mut self) -> Result<(), WriteError> {
        Ok(self.out.space()?)
    }

    fn nl(&mut self) -> Result<(), WriteError> {
        Ok(self.out.new_line()?)
    }

    fn required(&self, id: NodeId, title: Title) -> Result<NodeId, WriteError> {
        self.ast.child(id, title).ok_or_else(|| WriteError::MissingChild {
            node: self.ast.kind(id).name(),
            title,
        })
    }

    fn write_name(&mut self, name: &str) -> Result<(), WriteError> {
        if self.keywords.is_reserved(name) {
            self.out.write_identifier(&format!("[{name}]"))?;
        } else {
            self.out.write_identifier(name)?;
        }
        Ok(())
    }

    fn write_args(&mut self, id: NodeId, title: Title) -> Result<(), WriteError> {
        let items = self.children_of(id, title);
        self.write_comma_separated(&items, false)
    }

    /// ` As T`, unless the type is left to inference
    fn write_as_clause(&mut self, ty: Option<NodeId>) -> Result<(), WriteError> {
        match ty {
            Some(ty) if !self::is_var(self.ast, ty) => {
                self.tk(" ")?;
                self.kw("As")?;
                self.space()?;
                self.write_node(ty)
            }
            _ => Ok(()),
        }
    }

    /// Statements one per line; nested blocks are spliced in and empty statements dropped
    fn write_statements(&mut self, items: &[NodeId]) -> Result<(), WriteError> {
        let ast = self.ast;
        for &id in items {
            self.write_leading_trivia(id)?;
            match ast.kind(id) {
                NodeKind::BlockStatement => {
                    let inner: Vec<NodeId> = ast.children(id, Title::Statements).collect();
                    self.write_statements(&inner)?;
                    self.write_trailing_trivia(id)?;
                }
                NodeKind::EmptyStatement => {}
                _ => {
                    self.write_node(id)?;
                    self.nl()?;
                }
            }
        }
        Ok(())
    }

    /// Indented body of a block construct, cursor at a line start afterwards
    fn write_body(&mut self, stmt: NodeId) -> Result<(), WriteError> {
        self.out.indent();
        self.write_statements(&[stmt])?;
        self.out.unindent();
        Ok(())
    }

    /// Using directives inside namespaces, outermost first
    fn collect_nested_imports(&self, members: &[NodeId], out: &mut Vec<NodeId>) {
        for &m in members {
            if !matches!(self.ast.kind(m), NodeKind::NamespaceDeclaration) {
                continue;
            }
            let inner = self.children_of(m, Title::Members);
            out.extend(
                inner
                    .iter()
                    .copied()
                    .filter(|i| matches!(self.ast.kind(*i), NodeKind::UsingDeclaration)),
            );
            self.collect_nested_imports(&inner, out);
        }
    }

    /// `Keyword ..` line, body, `End Keyword`
    fn write_block_construct(&mut self, body: NodeId, end: &str) -> Result<(), WriteError> {
        self.nl()?;
        self.write_body(body)?;
        self.kw(end)
    }

    // ----------------------------------------
    // Expressions
    // ----------------------------------------

    fn precedence(&self, id: NodeId) -> u8 {
        match self.ast.kind(id) {
            NodeKind::BinaryOperatorExpression(op) => self::binary_precedence(*op),
            NodeKind::UnaryOperatorExpression(UnaryOperator::Not | UnaryOperator::BitNot) => NOT,
            NodeKind::UnaryOperatorExpression(_) => NEGATION,
            NodeKind::AssignmentExpression(_) => 0,
            _ => PRIMARY,
        }
    }

    fn write_operand(&mut self, id: NodeId, min: u8) -> Result<(), WriteError> {
        if self.precedence(id) < min {
            self.tk("(")?;
            self.write_node(id)?;
            self.tk(")")
        } else {
            self.write_node(id)
        }
    }

    fn is_null(&self, id: NodeId) -> bool {
        matches!(
            self.ast.kind(id),
            NodeKind::PrimitiveExpression(lit) if lit.value == LiteralValue::Null
        )
    }

    fn write_binary(&mut self, id: NodeId, op: BinaryOperator) -> Result<(), WriteError> {
        let left = self.required(id, Title::Left)?;
        let right = self.required(id, Title::Right)?;

        if op == BinaryOperator::NullCoalescing {
            self.kw("If")?;
            self.tk("(")?;
            self.write_node(left)?;
            self.tk(", ")?;
            self.write_node(right)?;
            return self.tk(")");
        }

        // `x == null` compares references
        let op = match op {
            BinaryOperator::Equality if self.is_null(left) || self.is_null(right) => {
                BinaryOperator::ReferenceEquality
            }
            BinaryOperator::InEquality if self.is_null(left) || self.is_null(right) => {
                BinaryOperator::ReferenceInequality
            }
            op => op,
        };

        let level = self::binary_precedence(op);
        self.write_operand(left, level)?;
        self.space()?;
        self.tk(self::binary_text(op))?;
        self.space()?;
        self.write_operand(right, level + 1)
    }

    /// Whether an expression stands as a statement, where `x++` and `x = y` have a VB form
    fn at_statement_level(&self, id: NodeId) -> bool {
        let Some(parent) = self.ast.parent(id) else {
            return true;
        };
        matches!(self.ast.kind(parent), NodeKind::ExpressionStatement)
            || matches!(
                self.ast.title_in_parent(id),
                Some(Title::Iterators | Title::Initializers)
            )
    }

    fn write_unary(&mut self, id: NodeId, op: UnaryOperator) -> Result<(), WriteError> {
        let operand = self.required(id, Title::Expression)?;
        match op {
            UnaryOperator::Not | UnaryOperator::BitNot => {
                self.kw("Not")?;
                self.space()?;
                self.write_operand(operand, NOT)
            }
            UnaryOperator::Minus | UnaryOperator::Plus => {
                self.tk(if op == UnaryOperator::Minus { "-" } else { "+" })?;
                if matches!(self.ast.kind(operand), NodeKind::UnaryOperatorExpression(_)) {
                    self.tk(" ")?;
                }
                self.write_operand(operand, NEGATION)
            }
            UnaryOperator::Increment
            | UnaryOperator::PostIncrement
            | UnaryOperator::Decrement
            | UnaryOperator::PostDecrement => {
                if !self.at_statement_level(id) {
                    return Err(self.unsupported(id));
                }
                let up = matches!(op, UnaryOperator::Increment | UnaryOperator::PostIncrement);
                self.write_operand(operand, PRIMARY)?;
                self.tk(if up { " += 1" } else { " -= 1" })
            }
        }
    }

    fn write_assignment(&mut self, id: NodeId, op: AssignmentOperator) -> Result<(), WriteError> {
        if !self.at_statement_level(id) {
            return Err(self.unsupported(id));
        }
        let left = self.required(id, Title::Left)?;
        let value = self.required(id, Title::Value)?;
        self.write_operand(left, PRIMARY)?;
        self.space()?;
        match self::assignment_text(op) {
            Ok(text) => {
                self.tk(text)?;
                self.space()?;
                self.write_node(value)
            }
            // `x %= y` is `x = x Mod y`
            Err(binary) => {
                let level = self::binary_precedence(binary);
                self.tk("= ")?;
                self.write_operand(left, level)?;
                self.space()?;
                self.tk(self::binary_text(binary))?;
                self.space()?;
                self.write_operand(value, level + 1)
            }
        }
    }

    fn write_literal(&mut self, id: NodeId) -> Result<(), WriteError> {
        let ast = self.ast;
        let NodeKind::PrimitiveExpression(lit) = ast.kind(id) else {
            return Err(self.unsupported(id));
        };
        match lit.raw_for(SurfaceSyntax::VisualBasic) {
            Some(raw) => self.out.write_literal(raw)?,
            None => self.out.write_literal(&self::literal_text(&lit.value))?,
        }
        Ok(())
    }

    /// `CType(x, T)`, `DirectCast(x, T)`, `TryCast(x, T)`
    fn write_conversion(&mut self, id: NodeId, function: &str) -> Result<(), WriteError> {
        let expr = self.required(id, Title::Expression)?;
        let ty = self.required(id, Title::Type)?;
        self.kw(function)?;
        self.tk("(")?;
        self.write_node(expr)?;
        self.tk(", ")?;
        self.write_node(ty)?;
        self.tk(")")
    }

    fn write_rank(&mut self, rank: u32) -> Result<(), WriteError> {
        self.tk("(")?;
        for _ in 1..rank {
            self.tk(",")?;
        }
        self.tk(")")
    }

    /// Upper bound of a dimension given its length
    fn write_upper_bound(&mut self, length: NodeId) -> Result<(), WriteError> {
        match write::integer_value(self.ast, length) {
            Some(n) if n > 0 => Ok(self.out.write_literal(&(n - 1).to_string())?),
            _ => {
                self.write_operand(length, ADDITIVE)?;
                self.tk(" - 1")
            }
        }
    }

    fn write_bounds(&mut self, args: &[NodeId], bounds: ArrayBounds) -> Result<(), WriteError> {
        self.tk("(")?;
        for (i, arg) in args.iter().enumerate() {
            if i > 0 {
                self.tk(", ")?;
            }
            match bounds {
                ArrayBounds::UpperBound => self.write_node(*arg)?,
                ArrayBounds::Length => self.write_upper_bound(*arg)?,
            }
        }
        self.tk(")")
    }

    /// Element type under the array ranks of `ty`, and the ranks outermost first
    fn split_array_type(&self, ty: NodeId) -> Result<(NodeId, Vec<u32>), WriteError> {
        let mut ranks = Vec::new();
        let mut elem = ty;
        while let NodeKind::ArrayType { rank } = self.ast.kind(elem) {
            ranks.push(*rank);
            elem = self.required(elem, Title::Type)?;
        }
        Ok((elem, ranks))
    }

    /// `New T(bounds)() {init}`; VB needs the initializer to tell it from an object creation
    fn write_array_creation(&mut self, id: NodeId, bounds: ArrayBounds) -> Result<(), WriteError> {
        let ty = self.required(id, Title::Type)?;
        let args = self.children_of(id, Title::Arguments);
        let (elem, ranks) = self.split_array_type(ty)?;

        self.kw("New")?;
        self.space()?;
        self.write_node(elem)?;
        self.write_bounds(&args, bounds)?;
        for rank in ranks.into_iter().rev() {
            self.write_rank(rank)?;
        }
        self.space()?;
        match self.ast.child(id, Title::Initializer) {
            Some(init) => self.write_node(init),
            None => self.tk("{}"),
        }
    }

    // ----------------------------------------
    // Declarations of variables
    // ----------------------------------------

    /// `a(2) As T`: the initializer only sizes the array
    fn sized_array(&self, ty: NodeId, init: NodeId) -> Option<(Vec<NodeId>, ArrayBounds, NodeId)> {
        let ast = self.ast;
        let NodeKind::ArrayCreateExpression(bounds) = ast.kind(init) else {
            return None;
        };
        let args: Vec<NodeId> = ast.children(init, Title::Arguments).collect();
        let NodeKind::ArrayType { rank } = ast.kind(ty) else {
            return None;
        };
        if args.len() != *rank as usize {
            return None;
        }
        let content = ast
            .child(init, Title::Initializer)
            .map_or(false, |i| ast.children(i, Title::Elements).next().is_some());
        let elem = ast.child(init, Title::Type)?;
        let same = ast.match_or_null(ast.child(ty, Title::Type), ast, Some(elem));
        (!content && same).then_some((args, *bounds, elem))
    }

    /// `name [As T] [= init]`, folding sized arrays and `As New`
    fn write_variable(&mut self, var: NodeId, ty: Option<NodeId>) -> Result<(), WriteError> {
        let ast = self.ast;
        let name = self.required(var, Title::Identifier)?;
        let init = ast.child(var, Title::Initializer);
        let ty = ty.filter(|t| !self::is_var(ast, *t));

        if let (Some(ty), Some(init)) = (ty, init) {
            if let Some((args, bounds, elem)) = self.sized_array(ty, init) {
                self.write_node(name)?;
                self.write_bounds(&args, bounds)?;
                return self.write_as_clause(Some(elem));
            }
            if matches!(ast.kind(init), NodeKind::ObjectCreateExpression)
                && ast.match_or_null(Some(ty), ast, ast.child(init, Title::Type))
            {
                self.write_node(name)?;
                self.tk(" ")?;
                self.kw("As")?;
                self.space()?;
                return self.write_node(init);
            }
        }

        self.write_node(name)?;
        self.write_as_clause(ty)?;
        if let Some(init) = init {
            self.tk(" = ")?;
            self.write_node(init)?;
        }
        Ok(())
    }

    /// Declarators of a local, field or `Using` resource
    fn write_declarators(&mut self, id: NodeId) -> Result<(), WriteError> {
        let ast = self.ast;
        let owner = ast.child(id, Title::Type);
        let vars = self.children_of(id, Title::Variables);
        let types: Vec<Option<NodeId>> = vars
            .iter()
            .map(|v| owner.or_else(|| ast.child(*v, Title::Type)))
            .collect();

        // `a, b As T`
        let shared = match types.as_slice() {
            [Some(first), rest @ ..] if rest.iter().all(|t| ast.match_or_null(Some(*first), ast, *t)) => {
                Some(*first)
            }
            _ => None,
        };
        let no_init = vars.iter().all(|v| ast.child(*v, Title::Initializer).is_none());
        if let (Some(ty), true, true) = (shared, no_init, vars.len() > 1) {
            for (i, var) in vars.iter().enumerate() {
                if i > 0 {
                    self.tk(", ")?;
                }
                let name = self.required(*var, Title::Identifier)?;
                self.write_node(name)?;
            }
            return self.write_as_clause(Some(ty));
        }

        for (i, (var, ty)) in vars.iter().zip(types).enumerate() {
            if i > 0 {
                self.tk(", ")?;
            }
            self.write_variable(*var, ty)?;
        }
        Ok(())
    }

    fn write_local_declaration(&mut self, id: NodeId) -> Result<(), WriteError> {
        if !self.in_header {
            let is_const = has_modifier(self.ast, id, Modifier::Const);
            self.kw(if is_const { "Const" } else { "Dim" })?;
            self.space()?;
        }
        self.write_declarators(id)
    }

    // ----------------------------------------
    // Statements
    // ----------------------------------------

    fn write_expression_statement(&mut self, id: NodeId) -> Result<(), WriteError> {
        let expr = self.required(id, Title::Expression)?;
        self.write_node(expr)
    }

    fn is_simple_statement(&self, id: NodeId) -> bool {
        matches!(
            self.ast.kind(id),
            NodeKind::ExpressionStatement
                | NodeKind::ReturnStatement
                | NodeKind::ThrowStatement
                | NodeKind::ExitStatement(_)
                | NodeKind::BreakStatement
                | NodeKind::ContinueStatement
        )
    }

    fn write_if(&mut self, id: NodeId) -> Result<(), WriteError> {
        let ast = self.ast;
        let cond = self.required(id, Title::Condition)?;
        let then = self.required(id, Title::TrueStatement)?;

        if ast.child(id, Title::FalseStatement).is_none() && self.is_simple_statement(then) {
            self.kw("If")?;
            self.space()?;
            self.write_node(cond)?;
            self.tk(" ")?;
            self.kw("Then")?;
            self.space()?;
            return self.write_node(then);
        }

        self.kw("If")?;
        self.space()?;
        self.write_node(cond)?;
        self.tk(" ")?;
        self.kw("Then")?;
        self.nl()?;
        self.write_body(then)?;

        // `ElseIf` chain, iteratively
        let mut next = ast.child(id, Title::FalseStatement);
        while let Some(other) = next {
            if matches!(ast.kind(other), NodeKind::IfElseStatement) {
                let cond = self.required(other, Title::Condition)?;
                let then = self.required(other, Title::TrueStatement)?;
                self.kw("ElseIf")?;
                self.space()?;
                self.write_node(cond)?;
                self.tk(" ")?;
                self.kw("Then")?;
                self.nl()?;
                self.write_body(then)?;
                next = ast.child(other, Title::FalseStatement);
            } else {
                self.kw("Else")?;
                self.nl()?;
                self.write_body(other)?;
                next = None;
            }
        }
        self.kw("End If")
    }

    fn write_do_loop(&mut self, id: NodeId, DoLoop { test, until }: DoLoop) -> Result<(), WriteError> {
        let body = self.required(id, Title::EmbeddedStatement)?;
        let cond = self.ast.child(id, Title::Condition);
        let test_keyword = if until { "Until" } else { "While" };

        self.kw("Do")?;
        if let (LoopTest::Pre, Some(cond)) = (test, cond) {
            self.space()?;
            self.kw(test_keyword)?;
            self.space()?;
            self.write_node(cond)?;
        }
        self.nl()?;
        self.write_body(body)?;
        self.kw("Loop")?;
        if let (LoopTest::Post, Some(cond)) = (test, cond) {
            self.space()?;
            self.kw(test_keyword)?;
            self.space()?;
            self.write_node(cond)?;
        }
        Ok(())
    }

    /// Name of an `IdentifierExpression`
    fn variable_name(&self, id: NodeId) -> Option<&'a str> {
        let ast = self.ast;
        match ast.kind(id) {
            NodeKind::IdentifierExpression => ast.name_of(id),
            _ => None,
        }
    }

    /// Matches `for (i = a; i < b; i++)` and its variations
    fn counting_loop(&self, id: NodeId) -> Option<CountingLoop> {
        let ast = self.ast;
        let inits: Vec<NodeId> = ast.children(id, Title::Initializers).collect();
        let iters: Vec<NodeId> = ast.children(id, Title::Iterators).collect();
        let ([init], [iter]) = (inits.as_slice(), iters.as_slice()) else {
            return None;
        };
        let iter = ast.child(*iter, Title::Expression)?;

        // `int i = a` or `i = a`
        let (name, ty, start) = match ast.kind(*init) {
            NodeKind::VariableDeclarationStatement => {
                let vars: Vec<NodeId> = ast.children(*init, Title::Variables).collect();
                let [var] = vars.as_slice() else {
                    return None;
                };
                let ty = ast.child(*init, Title::Type).or_else(|| ast.child(*var, Title::Type));
                (
                    ast.child(*var, Title::Identifier)?,
                    ty,
                    ast.child(*var, Title::Initializer)?,
                )
            }
            NodeKind::ExpressionStatement => {
                let assign = ast.child(*init, Title::Expression)?;
                if !matches!(ast.kind(assign), NodeKind::AssignmentExpression(AssignmentOperator::Assign)) {
                    return None;
                }
                let left = ast.child(assign, Title::Left)?;
                self.variable_name(left)?;
                (
                    ast.child(left, Title::Identifier)?,
                    None,
                    ast.child(assign, Title::Value)?,
                )
            }
            _ => return None,
        };
        let var = match ast.kind(name) {
            NodeKind::Identifier(var) => var.as_str(),
            _ => return None,
        };
        let is_var = |e: NodeId| {
            self.variable_name(e)
                .map_or(false, |n| self.keywords.same_name(n, var))
        };

        // `i < b`, `i <= b`, `i > b`, `i >= b`
        let cond = ast.child(id, Title::Condition)?;
        let NodeKind::BinaryOperatorExpression(cmp) = ast.kind(cond) else {
            return None;
        };
        if !is_var(ast.child(cond, Title::Left)?) {
            return None;
        }
        let limit = ast.child(cond, Title::Right)?;

        let step = match ast.kind(iter) {
            NodeKind::UnaryOperatorExpression(UnaryOperator::Increment | UnaryOperator::PostIncrement) => {
                Step::One
            }
            NodeKind::UnaryOperatorExpression(UnaryOperator::Decrement | UnaryOperator::PostDecrement) => {
                Step::MinusOne
            }
            NodeKind::AssignmentExpression(AssignmentOperator::Add) => Step::Up(ast.child(iter, Title::Value)?),
            NodeKind::AssignmentExpression(AssignmentOperator::Subtract) => {
                Step::Down(ast.child(iter, Title::Value)?)
            }
            _ => return None,
        };
        let target = match ast.kind(iter) {
            NodeKind::UnaryOperatorExpression(_) => ast.child(iter, Title::Expression)?,
            _ => ast.child(iter, Title::Left)?,
        };
        if !is_var(target) {
            return None;
        }

        let up = matches!(step, Step::One | Step::Up(_));
        let limit_offset = match (cmp, up) {
            (BinaryOperator::LessThan, true) => Some(" - 1"),
            (BinaryOperator::LessThanOrEqual, true) => None,
            (BinaryOperator::GreaterThan, false) => Some(" + 1"),
            (BinaryOperator::GreaterThanOrEqual, false) => None,
            _ => return None,
        };

        Some(CountingLoop {
            name,
            ty,
            start,
            limit,
            limit_offset,
            step,
        })
    }

    fn write_counting_loop(&mut self, l: CountingLoop, body: NodeId) -> Result<(), WriteError> {
        self.kw("For")?;
        self.space()?;
        self.write_node(l.name)?;
        self.write_as_clause(l.ty)?;
        self.tk(" = ")?;
        self.write_node(l.start)?;
        self.tk(" ")?;
        self.kw("To")?;
        self.space()?;
        match (l.limit_offset, write::integer_value(self.ast, l.limit)) {
            (None, _) => self.write_node(l.limit)?,
            (Some(" - 1"), Some(n)) if n > 0 => self.out.write_literal(&(n - 1).to_string())?,
            (Some(" + 1"), Some(n)) => self.out.write_literal(&(n + 1).to_string())?,
            (Some(offset), _) => {
                self.write_operand(l.limit, ADDITIVE)?;
                self.tk(offset)?;
            }
        }
        match l.step {
            Step::One => {}
            Step::MinusOne => {
                self.tk(" ")?;
                self.kw("Step")?;
                self.tk(" -1")?;
            }
            Step::Up(step) => {
                self.tk(" ")?;
                self.kw("Step")?;
                self.space()?;
                self.write_node(step)?;
            }
            Step::Down(step) => {
                self.tk(" ")?;
                self.kw("Step")?;
                self.tk(" -")?;
                self.write_operand(step, NEGATION)?;
            }
        }
        self.write_block_construct(body, "Next")
    }

    /// `for` as `For`/`Next`, or as its initializers and a `While` loop
    fn write_for(&mut self, id: NodeId) -> Result<(), WriteError> {
        let body = self.required(id, Title::EmbeddedStatement)?;
        if let Some(l) = self.counting_loop(id) {
            return self.write_counting_loop(l, body);
        }

        let ast = self.ast;
        let iters = self.children_of(id, Title::Iterators);
        // `continue` would skip the iterators appended to the body
        let skips_iterators = !iters.is_empty()
            && ast.descendants(body).any(|d| {
                matches!(ast.kind(d), NodeKind::ContinueStatement) && self.loop_of(d) == Some(id)
            });
        if skips_iterators {
            return Err(self.unsupported(id));
        }

        for init in self.children_of(id, Title::Initializers) {
            self.write_node(init)?;
            self.nl()?;
        }
        self.kw("While")?;
        self.space()?;
        match ast.child(id, Title::Condition) {
            Some(cond) => self.write_node(cond)?,
            None => self.kw("True")?,
        }
        self.nl()?;
        self.out.indent();
        self.write_statements(&[body])?;
        for iter in iters {
            self.write_node(iter)?;
            self.nl()?;
        }
        self.out.unindent();
        self.kw("End While")
    }

    fn write_foreach(&mut self, id: NodeId) -> Result<(), WriteError> {
        let name = self.required(id, Title::Identifier)?;
        let expr = self.required(id, Title::Expression)?;
        let body = self.required(id, Title::EmbeddedStatement)?;
        self.kw("For Each")?;
        self.space()?;
        self.write_node(name)?;
        self.write_as_clause(self.ast.child(id, Title::Type))?;
        self.tk(" ")?;
        self.kw("In")?;
        self.space()?;
        self.write_node(expr)?;
        self.write_block_construct(body, "Next")
    }

    fn write_for_next(&mut self, id: NodeId) -> Result<(), WriteError> {
        let name = self.required(id, Title::Identifier)?;
        let start = self.required(id, Title::Initializer)?;
        let limit = self.required(id, Title::Limit)?;
        let body = self.required(id, Title::EmbeddedStatement)?;
        self.kw("For")?;
        self.space()?;
        self.write_node(name)?;
        self.write_as_clause(self.ast.child(id, Title::Type))?;
        self.tk(" = ")?;
        self.write_node(start)?;
        self.tk(" ")?;
        self.kw("To")?;
        self.space()?;
        self.write_node(limit)?;
        if let Some(step) = self.ast.child(id, Title::Step) {
            self.tk(" ")?;
            self.kw("Step")?;
            self.space()?;
            self.write_node(step)?;
        }
        self.write_block_construct(body, "Next")
    }

    /// Innermost loop around a `continue`
    fn loop_of(&self, id: NodeId) -> Option<NodeId> {
        self.ast.ancestors(id).find(|a| self.ast.kind(*a).is_loop())
    }

    fn loop_keyword(&self, target: NodeId) -> Option<LoopKeyword> {
        Some(match self.ast.kind(target) {
            NodeKind::WhileStatement => LoopKeyword::While,
            NodeKind::DoLoopStatement(_) => LoopKeyword::Do,
            NodeKind::ForeachStatement | NodeKind::ForNextStatement => LoopKeyword::For,
            NodeKind::ForStatement if self.counting_loop(target).is_some() => LoopKeyword::For,
            NodeKind::ForStatement => LoopKeyword::While,
            NodeKind::SwitchStatement => LoopKeyword::Select,
            _ => return None,
        })
    }

    fn write_break(&mut self, id: NodeId) -> Result<(), WriteError> {
        let ast = self.ast;
        let target = ast.ancestors(id).find(|a| {
            let kind = ast.kind(*a);
            kind.is_loop() || matches!(kind, NodeKind::SwitchStatement)
        });
        match target.and_then(|t| self.loop_keyword(t)) {
            Some(keyword) => {
                self.kw("Exit")?;
                self.space()?;
                self.kw(keyword.text())
            }
            None => Err(self.unsupported(id)),
        }
    }

    fn write_continue(&mut self, id: NodeId) -> Result<(), WriteError> {
        match self.loop_of(id).and_then(|t| self.loop_keyword(t)) {
            Some(keyword) => {
                self.kw("Continue")?;
                self.space()?;
                self.kw(keyword.text())
            }
            None => Err(self.unsupported(id)),
        }
    }

    fn write_keyword_statement(&mut self, id: NodeId, keyword: &str) -> Result<(), WriteError> {
        self.kw(keyword)?;
        if let Some(expr) = self.ast.child(id, Title::Expression) {
            self.space()?;
            self.write_node(expr)?;
        }
        Ok(())
    }

    fn write_try(&mut self, id: NodeId) -> Result<(), WriteError> {
        let block = self.required(id, Title::TryBlock)?;
        self.kw("Try")?;
        self.nl()?;
        self.write_body(block)?;
        for catch in self.children_of(id, Title::CatchClauses) {
            self.write_node(catch)?;
        }
        if let Some(finally) = self.ast.child(id, Title::FinallyBlock) {
            self.kw("Finally")?;
            self.nl()?;
            self.write_body(finally)?;
        }
        self.kw("End Try")
    }

    /// `Catch [ex As T]` and its body, ending at a line start
    fn write_catch(&mut self, id: NodeId) -> Result<(), WriteError> {
        let body = self.required(id, Title::Body)?;
        self.kw("Catch")?;
        if let Some(ty) = self.ast.child(id, Title::Type) {
            self.space()?;
            match self.ast.child(id, Title::Identifier) {
                Some(name) => self.write_node(name)?,
                None => self.write_name("ex")?,
            }
            self.write_as_clause(Some(ty))?;
        }
        self.nl()?;
        self.write_body(body)
    }

    fn write_switch(&mut self, id: NodeId) -> Result<(), WriteError> {
        let expr = self.required(id, Title::Expression)?;
        self.kw("Select Case")?;
        self.space()?;
        self.write_node(expr)?;
        self.nl()?;
        self.out.indent();
        for section in self.children_of(id, Title::SwitchSections) {
            self.write_leading_trivia(section)?;
            self.write_node(section)?;
        }
        self.out.unindent();
        self.kw("End Select")
    }

    /// `Case ..` line and the statements; the closing `break` is implied in VB
    fn write_section(&mut self, id: NodeId) -> Result<(), WriteError> {
        let ast = self.ast;
        let labels = self.children_of(id, Title::CaseLabels);
        let default = labels.iter().any(|l| {
            matches!(ast.kind(*l), NodeKind::CaseLabel) && ast.child(*l, Title::Expression).is_none()
        });

        self.kw("Case")?;
        self.space()?;
        if default {
            self.kw("Else")?;
        } else {
            self.write_comma_separated(&labels, false)?;
        }
        self.nl()?;

        let mut stmts = self.children_of(id, Title::Statements);
        if stmts
            .last()
            .map_or(false, |s| matches!(ast.kind(*s), NodeKind::BreakStatement))
        {
            stmts.pop();
        }
        self.out.indent();
        self.write_statements(&stmts)?;
        self.out.unindent();
        Ok(())
    }

    fn write_using(&mut self, id: NodeId) -> Result<(), WriteError> {
        let res = self.required(id, Title::ResourceAcquisition)?;
        let body = self.required(id, Title::EmbeddedStatement)?;
        self.kw("Using")?;
        self.space()?;
        let prev = std::mem::replace(&mut self.in_header, true);
        let written = self.write_node(res);
        self.in_header = prev;
        written?;
        self.write_block_construct(body, "End Using")
    }

    // ----------------------------------------
    // Members
    // ----------------------------------------

    /// VB module, or a C# static class written as one
    fn is_module(&self, id: NodeId) -> bool {
        match self.ast.kind(id) {
            NodeKind::TypeDeclaration(TypeVariant::Module) => true,
            NodeKind::TypeDeclaration(TypeVariant::Class) => has_modifier(self.ast, id, Modifier::Static),
            _ => false,
        }
    }

    /// Modifiers with trailing spaces
    fn write_modifiers(&mut self, id: NodeId) -> Result<(), WriteError> {
        let ast = self.ast;
        let is_type = matches!(ast.kind(id), NodeKind::TypeDeclaration(_));
        let is_property = matches!(ast.kind(id), NodeKind::PropertyDeclaration);
        let in_module = ast.parent(id).map_or(false, |p| self.is_module(p));

        for m in self.children_of(id, Title::Modifiers) {
            let NodeKind::Modifier(modifier) = ast.kind(m) else {
                continue;
            };
            let text = match modifier {
                Modifier::Static if in_module || is_type => continue,
                Modifier::Readonly | Modifier::WriteOnly if is_property => continue,
                Modifier::Abstract if is_type => "MustInherit",
                Modifier::Abstract => "MustOverride",
                Modifier::Sealed if is_type => "NotInheritable",
                Modifier::Sealed => "NotOverridable",
                Modifier::Volatile | Modifier::Unsafe | Modifier::Extern => {
                    return Err(self.unsupported(m));
                }
                other => match SurfaceSyntax::VisualBasic.data().modifier_text(*other) {
                    Some(text) => text,
                    None => return Err(self.unsupported(m)),
                },
            };
            self.out.start_node(m);
            self.kw(text)?;
            self.out.end_node(m);
            self.space()?;
        }
        Ok(())
    }

    fn write_type_declaration(&mut self, id: NodeId, variant: TypeVariant) -> Result<(), WriteError> {
        let ast = self.ast;
        let name = self.required(id, Title::Identifier)?;
        let keyword = match variant {
            TypeVariant::Class if self.is_module(id) => "Module",
            TypeVariant::Class => "Class",
            TypeVariant::Struct => "Structure",
            TypeVariant::Interface => "Interface",
            TypeVariant::Enum => "Enum",
            TypeVariant::Module => "Module",
        };

        self.write_modifiers(id)?;
        self.kw(keyword)?;
        self.space()?;
        self.write_node(name)?;

        let bases = self.children_of(id, Title::BaseTypes);
        if variant == TypeVariant::Enum {
            self.write_as_clause(bases.first().copied())?;
        }
        self.nl()?;
        self.out.indent();

        if variant != TypeVariant::Enum && !bases.is_empty() {
            let looks_like_interface = |ty: NodeId| {
                let name = match ast.kind(ty) {
                    NodeKind::MemberType | NodeKind::SimpleType => ast.name_of(ty).unwrap_or(""),
                    _ => "",
                };
                let mut chars = name.chars();
                chars.next() == Some('I') && chars.next().map_or(false, |c| c.is_ascii_uppercase())
            };
            let (inherits, implements): (Vec<NodeId>, Vec<NodeId>) = match variant {
                TypeVariant::Interface => (bases, Vec::new()),
                TypeVariant::Class if !looks_like_interface(bases[0]) => {
                    (bases[..1].to_vec(), bases[1..].to_vec())
                }
                _ => (Vec::new(), bases),
            };
            for (keyword, list) in [("Inherits", inherits), ("Implements", implements)] {
                if list.is_empty() {
                    continue;
                }
                self.kw(keyword)?;
                self.space()?;
                self.write_comma_separated(&list, false)?;
                self.nl()?;
            }
        }

        let members = self.children_of(id, Title::Members);
        self.write_lines(&members)?;
        self.write_trailing_trivia(id)?;
        self.out.unindent();
        self.kw("End")?;
        self.space()?;
        self.kw(keyword)
    }

    fn write_field(&mut self, id: NodeId) -> Result<(), WriteError> {
        if self.ast.children(id, Title::Modifiers).next().is_none() {
            self.kw("Dim")?;
            self.space()?;
        }
        self.write_modifiers(id)?;
        self.write_declarators(id)
    }

    fn write_parameters(&mut self, id: NodeId) -> Result<(), WriteError> {
        self.tk("(")?;
        let params = self.children_of(id, Title::Parameters);
        self.write_comma_separated(&params, false)?;
        self.tk(")")
    }

    fn write_method(&mut self, id: NodeId) -> Result<(), WriteError> {
        let ast = self.ast;
        let name = self.required(id, Title::Identifier)?;
        let ret = ast
            .child(id, Title::Type)
            .filter(|t| !matches!(ast.kind(*t), NodeKind::PrimitiveType(KnownType::Void)));
        let keyword = if ret.is_some() { "Function" } else { "Sub" };

        self.write_modifiers(id)?;
        self.kw(keyword)?;
        self.space()?;
        self.write_node(name)?;
        self.write_parameters(id)?;
        self.write_as_clause(ret)?;
        if let Some(body) = ast.child(id, Title::Body) {
            self.write_block_construct(body, "End")?;
            self.space()?;
            self.kw(keyword)?;
        }
        Ok(())
    }

    fn write_constructor(&mut self, id: NodeId) -> Result<(), WriteError> {
        let body = self.required(id, Title::Body)?;
        self.write_modifiers(id)?;
        self.kw("Sub New")?;
        self.write_parameters(id)?;
        self.nl()?;
        self.out.indent();
        if let Some(init) = self.ast.child(id, Title::Initializer) {
            self.write_node(init)?;
            self.nl()?;
        }
        self.write_statements(&[body])?;
        self.out.unindent();
        self.kw("End Sub")
    }

    fn write_property(&mut self, id: NodeId) -> Result<(), WriteError> {
        let ast = self.ast;
        let name = self.required(id, Title::Identifier)?;
        let ty = ast.child(id, Title::Type);
        let getter = ast.child(id, Title::Getter);
        let setter = ast.child(id, Title::Setter);

        self.write_modifiers(id)?;
        match (getter, setter) {
            (Some(_), None) => {
                self.kw("ReadOnly")?;
                self.space()?;
            }
            (None, Some(_)) => {
                self.kw("WriteOnly")?;
                self.space()?;
            }
            _ => {}
        }
        self.kw("Property")?;
        self.space()?;
        self.write_node(name)?;
        self.write_as_clause(ty)?;

        let accessors: Vec<NodeId> = getter.into_iter().chain(setter).collect();
        if accessors.iter().all(|a| ast.child(*a, Title::Body).is_none()) {
            return Ok(());
        }

        self.nl()?;
        self.out.indent();
        for acc in accessors {
            self.write_leading_trivia(acc)?;
            self.write_node(acc)?;
            self.nl()?;
        }
        self.write_trailing_trivia(id)?;
        self.out.unindent();
        self.kw("End Property")
    }

    fn write_accessor(&mut self, id: NodeId, kind: AccessorKind) -> Result<(), WriteError> {
        let ast = self.ast;
        let keyword = match kind {
            AccessorKind::Get => "Get",
            AccessorKind::Set => "Set",
            AccessorKind::Add => "AddHandler",
            AccessorKind::Remove => "RemoveHandler",
        };
        self.write_modifiers(id)?;
        self.kw(keyword)?;
        if kind == AccessorKind::Set {
            self.tk("(")?;
            self.write_name("value")?;
            let ty = ast
                .parent(id)
                .and_then(|p| ast.child(p, Title::Type));
            self.write_as_clause(ty)?;
            self.tk(")")?;
        }
        self.nl()?;
        if let Some(body) = ast.child(id, Title::Body) {
            self.write_body(body)?;
        }
        self.kw("End")?;
        self.space()?;
        self.kw(keyword)
    }

    fn write_parameter(&mut self, id: NodeId, modifier: ParameterModifier) -> Result<(), WriteError> {
        let name = self.required(id, Title::Identifier)?;
        let default = self.ast.child(id, Title::DefaultExpression);
        if default.is_some() {
            self.kw("Optional")?;
            self.space()?;
        }
        match modifier {
            ParameterModifier::None => {}
            ParameterModifier::Ref | ParameterModifier::Out => {
                self.kw("ByRef")?;
                self.space()?;
            }
            ParameterModifier::Params => {
                self.kw("ParamArray")?;
                self.space()?;
            }
        }
        self.write_node(name)?;
        self.write_as_clause(self.ast.child(id, Title::Type))?;
        if let Some(default) = default {
            self.tk(" = ")?;
            self.write_node(default)?;
        }
        Ok(())
    }

    // ----------------------------------------
    // Dispatch
    // ----------------------------------------

    fn write_kind(&mut self, id: NodeId) -> Result<(), WriteError> {
        let ast = self.ast;
        match ast.kind(id) {
            NodeKind::Token(tk) => self.tk(&tk.text),
            NodeKind::Identifier(name) => self.write_name(name),
            NodeKind::Modifier(m) => match SurfaceSyntax::VisualBasic.data().modifier_text(*m) {
                Some(text) => self.kw(text),
                None => Err(self.unsupported(id)),
            },
            NodeKind::Comment(comment) => self.write_comment(comment),
            NodeKind::BlankLine => Ok(()),

            NodeKind::PrimitiveType(KnownType::Void) => Err(self.unsupported(id)),
            NodeKind::PrimitiveType(ty) => self.kw(ty.vb_keyword()),
            NodeKind::SimpleType => {
                let name = self.required(id, Title::Identifier)?;
                self.write_node(name)
            }
            NodeKind::MemberType => {
                let target = self.required(id, Title::Target)?;
                let name = self.required(id, Title::Identifier)?;
                self.write_node(target)?;
                self.tk(".")?;
                self.write_node(name)
            }
            NodeKind::ArrayType { rank } => {
                let elem = self.required(id, Title::Type)?;
                self.write_node(elem)?;
                self.write_rank(*rank)
            }

            NodeKind::PrimitiveExpression(_) => self.write_literal(id),
            NodeKind::IdentifierExpression => {
                let name = self.required(id, Title::Identifier)?;
                self.write_node(name)
            }
            NodeKind::MemberReferenceExpression { null_conditional } => {
                let target = self.required(id, Title::Target)?;
                let member = self.required(id, Title::Identifier)?;
                self.write_operand(target, PRIMARY)?;
                self.tk(if *null_conditional { "?." } else { "." })?;
                self.write_node(member)
            }
            NodeKind::InvocationExpression | NodeKind::IndexerExpression => {
                let target = self.required(id, Title::Target)?;
                self.write_operand(target, PRIMARY)?;
                self.tk("(")?;
                self.write_args(id, Title::Arguments)?;
                self.tk(")")
            }
            NodeKind::BinaryOperatorExpression(op) => self.write_binary(id, *op),
            NodeKind::UnaryOperatorExpression(op) => self.write_unary(id, *op),
            NodeKind::AssignmentExpression(op) => self.write_assignment(id, *op),
            NodeKind::ParenthesizedExpression => {
                let expr = self.required(id, Title::Expression)?;
                self.tk("(")?;
                self.write_node(expr)?;
                self.tk(")")
            }
            NodeKind::ConditionalExpression => {
                let cond = self.required(id, Title::Condition)?;
                let then = self.required(id, Title::TrueExpression)?;
                let other = self.required(id, Title::FalseExpression)?;
                self.kw("If")?;
                self.tk("(")?;
                self.write_node(cond)?;
                self.tk(", ")?;
                self.write_node(then)?;
                self.tk(", ")?;
                self.write_node(other)?;
                self.tk(")")
            }
            NodeKind::CastExpression(CastStyle::Explicit) => self.write_conversion(id, "CType"),
            NodeKind::CastExpression(CastStyle::Direct) => self.write_conversion(id, "DirectCast"),
            NodeKind::AsExpression => self.write_conversion(id, "TryCast"),
            NodeKind::IsExpression => {
                let expr = self.required(id, Title::Expression)?;
                let ty = self.required(id, Title::Type)?;
                self.kw("TypeOf")?;
                self.space()?;
                self.write_operand(expr, PRIMARY)?;
                self.tk(" ")?;
                self.kw("Is")?;
                self.space()?;
                self.write_node(ty)
            }
            NodeKind::TypeOfExpression => {
                let ty = self.required(id, Title::Type)?;
                self.kw("GetType")?;
                self.tk("(")?;
                self.write_node(ty)?;
                self.tk(")")
            }
            NodeKind::TypeReferenceExpression => {
                let ty = self.required(id, Title::Type)?;
                self.write_node(ty)
            }
            NodeKind::ThisReferenceExpression => self.kw("Me"),
            NodeKind::BaseReferenceExpression => self.kw("MyBase"),
            NodeKind::ObjectCreateExpression => {
                let ty = self.required(id, Title::Type)?;
                self.kw("New")?;
                self.space()?;
                self.write_node(ty)?;
                self.tk("(")?;
                self.write_args(id, Title::Arguments)?;
                self.tk(")")
            }
            NodeKind::ArrayCreateExpression(bounds) => self.write_array_creation(id, *bounds),
            NodeKind::ArrayInitializerExpression => {
                let elems = self.children_of(id, Title::Elements);
                self.tk("{")?;
                self.write_comma_separated(&elems, false)?;
                self.tk("}")
            }
            // VB passes by reference as the callee declares
            NodeKind::DirectionExpression(_) => {
                let expr = self.required(id, Title::Expression)?;
                self.write_node(expr)
            }

            NodeKind::BlockStatement => {
                let stmts = self.children_of(id, Title::Statements);
                self.write_statements(&stmts)
            }
            NodeKind::ExpressionStatement => self.write_expression_statement(id),
            NodeKind::VariableDeclarationStatement => self.write_local_declaration(id),
            NodeKind::VariableDeclarator => {
                let ty = ast.child(id, Title::Type);
                self.write_variable(id, ty)
            }
            NodeKind::IfElseStatement => self.write_if(id),
            NodeKind::WhileStatement => {
                let cond = self.required(id, Title::Condition)?;
                let body = self.required(id, Title::EmbeddedStatement)?;
                self.kw("While")?;
                self.space()?;
                self.write_node(cond)?;
                self.write_block_construct(body, "End While")
            }
            NodeKind::DoLoopStatement(do_loop) => self.write_do_loop(id, *do_loop),
            NodeKind::ForStatement => self.write_for(id),
            NodeKind::ForeachStatement => self.write_foreach(id),
            NodeKind::ReturnStatement => self.write_keyword_statement(id, "Return"),
            NodeKind::ThrowStatement => self.write_keyword_statement(id, "Throw"),
            NodeKind::BreakStatement => self.write_break(id),
            NodeKind::ContinueStatement => self.write_continue(id),
            NodeKind::TryCatchStatement => self.write_try(id),
            NodeKind::CatchClause => self.write_catch(id),
            NodeKind::SwitchStatement => self.write_switch(id),
            NodeKind::SwitchSection => self.write_section(id),
            NodeKind::CaseLabel => match ast.child(id, Title::Expression) {
                Some(expr) => self.write_node(expr),
                None => self.kw("Else"),
            },
            NodeKind::CaseRange => {
                let lower = self.required(id, Title::Expression)?;
                let upper = self.required(id, Title::Limit)?;
                self.write_node(lower)?;
                self.space()?;
                self.kw("To")?;
                self.space()?;
                self.write_node(upper)
            }
            NodeKind::CaseComparison(op) => {
                let value = self.required(id, Title::Expression)?;
                self.kw("Is")?;
                self.space()?;
                self.tk(self::binary_text(*op))?;
                self.space()?;
                self.write_node(value)
            }
            NodeKind::UsingStatement => self.write_using(id),
            NodeKind::LockStatement => {
                let expr = self.required(id, Title::Expression)?;
                let body = self.required(id, Title::EmbeddedStatement)?;
                self.kw("SyncLock")?;
                self.space()?;
                self.write_node(expr)?;
                self.write_block_construct(body, "End SyncLock")
            }
            NodeKind::EmptyStatement => Ok(()),

            NodeKind::CompilationUnit => {
                // `Imports` is only legal at the top of a file
                let (imports, members): (Vec<NodeId>, Vec<NodeId>) = self
                    .children_of(id, Title::Members)
                    .into_iter()
                    .partition(|m| matches!(self.ast.kind(*m), NodeKind::UsingDeclaration));
                let mut hoisted = imports;
                self.collect_nested_imports(&members, &mut hoisted);
                self.write_lines(&hoisted)?;
                self.write_lines(&members)?;
                self.write_trailing_trivia(id)
            }
            NodeKind::UsingDeclaration => {
                let import = self.required(id, Title::Import)?;
                self.kw("Imports")?;
                self.space()?;
                self.write_node(import)
            }
            NodeKind::NamespaceDeclaration => {
                let name = self.required(id, Title::Name)?;
                self.kw("Namespace")?;
                self.space()?;
                self.write_node(name)?;
                self.nl()?;
                self.out.indent();
                let members: Vec<NodeId> = self
                    .children_of(id, Title::Members)
                    .into_iter()
                    .filter(|m| !matches!(self.ast.kind(*m), NodeKind::UsingDeclaration))
                    .collect();
                self.write_lines(&members)?;
                self.write_trailing_trivia(id)?;
                self.out.unindent();
                self.kw("End Namespace")
            }
            NodeKind::TypeDeclaration(variant) => self.write_type_declaration(id, *variant),
            NodeKind::FieldDeclaration => self.write_field(id),
            NodeKind::MethodDeclaration => self.write_method(id),
            NodeKind::ConstructorDeclaration => self.write_constructor(id),
            NodeKind::ConstructorInitializer(kind) => {
                self.kw(match kind {
                    CtorInitializerKind::Base => "MyBase",
                    CtorInitializerKind::This => "Me",
                })?;
                self.tk(".")?;
                self.kw("New")?;
                self.tk("(")?;
                self.write_args(id, Title::Arguments)?;
                self.tk(")")
            }
            NodeKind::PropertyDeclaration => self.write_property(id),
            NodeKind::Accessor(kind) => self.write_accessor(id, *kind),
            NodeKind::EventDeclaration => {
                let name = self.required(id, Title::Identifier)?;
                let ty = self.required(id, Title::Type)?;
                self.write_modifiers(id)?;
                self.kw("Event")?;
                self.space()?;
                self.write_node(name)?;
                self.write_as_clause(Some(ty))
            }
            NodeKind::ParameterDeclaration(modifier) => self.write_parameter(id, *modifier),
            NodeKind::EnumMemberDeclaration => {
                let name = self.required(id, Title::Identifier)?;
                self.write_node(name)?;
                if let Some(value) = ast.child(id, Title::Initializer) {
                    self.tk(" = ")?;
                    self.write_node(value)?;
                }
                Ok(())
            }

            // pinning has no VB form
            NodeKind::FixedStatement | NodeKind::PointerType => Err(self.unsupported(id)),
            NodeKind::ExitStatement(kind) => {
                self.kw("Exit")?;
                self.space()?;
                self.kw(match kind {
                    ExitKind::Sub => "Sub",
                    ExitKind::Function => "Function",
                    ExitKind::Property => "Property",
                    ExitKind::Do => "Do",
                    ExitKind::For => "For",
                    ExitKind::While => "While",
                    ExitKind::Select => "Select",
                    ExitKind::Try => "Try",
                })
            }
            NodeKind::ForNextStatement => self.write_for_next(id),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{ast::kind::LiteralValue, syntax::Fragment, write::WriteError, Language};

    use super::literal_text;

    fn round_trip(src: &str) -> String {
        let vb = Language::visual_basic();
        let res = vb.parse(src).unwrap();
        vb.write(&res.ast, res.root, &vb.default_options()).unwrap()
    }

    fn cs_statement(src: &str) -> Result<String, WriteError> {
        let cs = Language::csharp();
        let vb = Language::visual_basic();
        let res = cs.parse_fragment(Fragment::Statement, src).unwrap();
        vb.write(&res.ast, res.root, &vb.default_options())
    }

    fn cs_member(src: &str) -> Result<String, WriteError> {
        let cs = Language::csharp();
        let vb = Language::visual_basic();
        let res = cs.parse_fragment(Fragment::TypeMember, src).unwrap();
        vb.write(&res.ast, res.root, &vb.default_options())
    }

    #[test]
    fn compilation_unit_round_trip() {
        let src = "\
Imports System

Namespace Demo
    Public Class Foo
        Inherits Base

        Private x As Integer = 1

        Public Function Bar(a As Integer) As Integer
            If a > 0 Then
                Return a * 2
            Else
                Return -a
            End If
        End Function
    End Class
End Namespace
";
        assert_eq!(round_trip(src), src);
    }

    #[test]
    fn comments_before_end_lines() {
        let src = "\
Class A
    Sub F()
        x = 1
        ' trailing
    End Sub
    ' after the last member
End Class
' end of file
";
        assert_eq!(round_trip(src), src);

        let src = "\
Class A
    Sub F()
        While x
            ' nothing yet
        End While
    End Sub
End Class
";
        assert_eq!(round_trip(src), src);
    }

    #[test]
    fn namespace_usings_move_to_the_top() {
        let cs = Language::csharp();
        let vb = Language::visual_basic();
        let src = "namespace Demo\n{\n    using System;\n    class A\n    {\n    }\n}\n";
        let res = cs.parse(src).unwrap();
        let out = vb.write(&res.ast, res.root, &vb.default_options()).unwrap();
        assert_eq!(
            out,
            "Imports System\nNamespace Demo\n    Class A\n    End Class\nEnd Namespace\n"
        );
    }

    #[test]
    fn csharp_loops() {
        assert_eq!(
            cs_statement("for (int i = 0; i < 10; i++) { s += i; }").unwrap(),
            "For i As Integer = 0 To 9\n    s += i\nNext"
        );
        assert_eq!(
            cs_statement("for (int i = n; i > 0; i -= 2) f(i);").unwrap(),
            "For i As Integer = n To 1 Step -2\n    f(i)\nNext"
        );
        // not a counting loop
        assert_eq!(
            cs_statement("for (i = 0; f(i); i++) { g(); }").unwrap(),
            "i = 0\nWhile f(i)\n    g()\n    i += 1\nEnd While"
        );
        assert_eq!(
            cs_statement("do { x--; } while (x > 0);").unwrap(),
            "Do\n    x -= 1\nLoop While x > 0"
        );
    }

    #[test]
    fn csharp_expressions() {
        assert_eq!(cs_statement("x = a ?? b;").unwrap(), "x = If(a, b)");
        assert_eq!(cs_statement("x = c ? a : b;").unwrap(), "x = If(c, a, b)");
        assert_eq!(cs_statement("x = !(a == null);").unwrap(), "x = Not (a Is Nothing)");
        assert_eq!(cs_statement("x = (int)y;").unwrap(), "x = CType(y, Integer)");
        assert_eq!(cs_statement("x = y as Foo;").unwrap(), "x = TryCast(y, Foo)");
        assert_eq!(cs_statement("x %= 3;").unwrap(), "x = x Mod 3");
        assert_eq!(cs_statement("s = \"a\\nb\";").unwrap(), "s = (\"a\" & ChrW(10) & \"b\")");
        assert_eq!(cs_statement("var a = new int[3];").unwrap(), "Dim a = New Integer(2) {}");
        assert_eq!(cs_statement("int[] a = new int[3];").unwrap(), "Dim a(2) As Integer");
    }

    #[test]
    fn increments_only_stand_alone() {
        assert_eq!(cs_statement("x++;").unwrap(), "x += 1");
        assert!(matches!(
            cs_statement("y = x++;"),
            Err(WriteError::Unsupported { node: "UnaryOperatorExpression", .. })
        ));
    }

    #[test]
    fn switch_drops_trailing_breaks() {
        let src = "switch (x) { case 1: case 2: y = 1; break; default: y = 2; break; }";
        assert_eq!(
            cs_statement(src).unwrap(),
            "Select Case x\n    Case 1, 2\n        y = 1\n    Case Else\n        y = 2\nEnd Select"
        );
    }

    #[test]
    fn breaks_name_their_loop() {
        let src = "while (true) { if (x) break; }";
        assert_eq!(
            cs_statement(src).unwrap(),
            "While True\n    If x Then Exit While\nEnd While"
        );
    }

    #[test]
    fn single_statement_ifs_stay_on_one_line() {
        assert_eq!(cs_statement("if (x) f();").unwrap(), "If x Then f()");
        assert_eq!(
            cs_statement("while (true) { if (x) continue; }").unwrap(),
            "While True\n    If x Then Continue While\nEnd While"
        );
        // braces or an `else` keep the block form
        assert_eq!(cs_statement("if (x) { f(); }").unwrap(), "If x Then\n    f()\nEnd If");
        assert_eq!(
            cs_statement("if (x) f(); else g();").unwrap(),
            "If x Then\n    f()\nElse\n    g()\nEnd If"
        );
    }

    #[test]
    fn fixed_has_no_vb_form() {
        let res = cs_statement("fixed (int* p = a) { }");
        assert!(matches!(
            res,
            Err(WriteError::Unsupported { node: "FixedStatement", .. })
        ));
        assert!(matches!(
            cs_member("private int* p;"),
            Err(WriteError::Unsupported { node: "PointerType", .. })
        ));
    }

    #[test]
    fn members_from_csharp() {
        assert_eq!(
            cs_member("public int X { get; private set; }").unwrap(),
            "Public Property X As Integer"
        );
        assert_eq!(
            cs_member("public abstract void F(ref int a, params object[] rest);").unwrap(),
            "Public MustOverride Sub F(ByRef a As Integer, ParamArray rest As Object())"
        );
        assert_eq!(
            cs_member("Foo(int a) : base(a) { }").unwrap(),
            "Sub New(a As Integer)\n    MyBase.New(a)\nEnd Sub"
        );
    }

    #[test]
    fn literals() {
        assert_eq!(literal_text(&LiteralValue::Null), "Nothing");
        assert_eq!(literal_text(&LiteralValue::Char('"')), "\"\"\"\"c");
        assert_eq!(literal_text(&LiteralValue::String("say \"hi\"".into())), "\"say \"\"hi\"\"\"");
        assert_eq!(literal_text(&LiteralValue::String(String::new())), "\"\"");
    }
}
