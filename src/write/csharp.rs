//! C# writer

use crate::{
    ast::{
        kind::{
            AccessorKind, ArrayBounds, AssignmentOperator, BinaryOperator, CastStyle, Comment,
            CtorInitializerKind, DoLoop, ExitKind, FieldDirection, LiteralValue,
            LoopTest, Modifier, ParameterModifier, TypeVariant, UnaryOperator,
        },
        nodes::has_modifier,
        Ast, NodeId, NodeKind, Title,
    },
    lang::{KeywordTable, SurfaceSyntax},
    syntax::token::NumberSuffix,
    write::{
        self,
        options::{BraceStyle, FormattingOptions},
        NodeWriter, TextOutput, WriteError,
    },
};

// binding power, higher binds tighter
const ASSIGNMENT: u8 = 1;
const CONDITIONAL: u8 = 2;
const COALESCING: u8 = 3;
const RELATIONAL: u8 = 10;
const ADDITIVE: u8 = 12;
const UNARY: u8 = 14;
const PRIMARY: u8 = 15;

fn binary_precedence(op: BinaryOperator) -> u8 {
    use BinaryOperator as B;
    match op {
        B::NullCoalescing => COALESCING,
        B::ConditionalOr => 4,
        B::ConditionalAnd => 5,
        B::BitwiseOr => 6,
        B::ExclusiveOr => 7,
        B::BitwiseAnd => 8,
        B::Equality | B::InEquality | B::ReferenceEquality | B::ReferenceInequality => 9,
        B::LessThan | B::GreaterThan | B::LessThanOrEqual | B::GreaterThanOrEqual => RELATIONAL,
        B::ShiftLeft | B::ShiftRight => 11,
        B::Add | B::Subtract | B::Concat => ADDITIVE,
        B::Multiply | B::Divide | B::Modulus | B::IntegerDivide => 13,
        // `Math.Pow(a, b)`
        B::Power => PRIMARY,
    }
}

fn binary_text(op: BinaryOperator) -> &'static str {
    use BinaryOperator as B;
    match op {
        B::Add | B::Concat => "+",
        B::Subtract => "-",
        B::Multiply => "*",
        B::Divide | B::IntegerDivide => "/",
        B::Modulus => "%",
        B::ShiftLeft => "<<",
        B::ShiftRight => ">>",
        B::BitwiseAnd => "&",
        B::BitwiseOr => "|",
        B::ExclusiveOr => "^",
        B::ConditionalAnd => "&&",
        B::ConditionalOr => "||",
        B::Equality | B::ReferenceEquality => "==",
        B::InEquality | B::ReferenceInequality => "!=",
        B::LessThan => "<",
        B::GreaterThan => ">",
        B::LessThanOrEqual => "<=",
        B::GreaterThanOrEqual => ">=",
        B::NullCoalescing => "??",
        B::Power => "Math.Pow",
    }
}

fn assignment_text(op: AssignmentOperator) -> Option<&'static str> {
    use AssignmentOperator as A;
    Some(match op {
        A::Assign => "=",
        A::Add | A::Concat => "+=",
        A::Subtract => "-=",
        A::Multiply => "*=",
        A::Divide | A::IntegerDivide => "/=",
        A::Modulus => "%=",
        A::ShiftLeft => "<<=",
        A::ShiftRight => ">>=",
        A::BitwiseAnd => "&=",
        A::BitwiseOr => "|=",
        A::ExclusiveOr => "^=",
        A::Power => return None,
    })
}

fn unary_text(op: UnaryOperator) -> &'static str {
    match op {
        UnaryOperator::Not => "!",
        UnaryOperator::BitNot => "~",
        UnaryOperator::Minus => "-",
        UnaryOperator::Plus => "+",
        UnaryOperator::Increment | UnaryOperator::PostIncrement => "++",
        UnaryOperator::Decrement | UnaryOperator::PostDecrement => "--",
    }
}

fn suffix_text(suffix: NumberSuffix) -> &'static str {
    match suffix {
        NumberSuffix::None | NumberSuffix::Short | NumberSuffix::UShort | NumberSuffix::Integer => "",
        NumberSuffix::UInteger => "u",
        NumberSuffix::Long => "L",
        NumberSuffix::ULong => "UL",
        NumberSuffix::Float => "f",
        NumberSuffix::Double => "d",
        NumberSuffix::Decimal => "m",
    }
}

fn push_escaped(out: &mut String, c: char, quote: char) {
    match c {
        '\\' => out.push_str("\\\\"),
        '\n' => out.push_str("\\n"),
        '\r' => out.push_str("\\r"),
        '\t' => out.push_str("\\t"),
        '\0' => out.push_str("\\0"),
        c if c == quote => {
            out.push('\\');
            out.push(c);
        }
        c if c.is_control() => out.push_str(&format!("\\u{:04x}", c as u32)),
        c => out.push(c),
    }
}

/// Spelling of a literal value without a C# original
pub fn literal_text(value: &LiteralValue) -> String {
    match value {
        LiteralValue::Null => "null".to_string(),
        LiteralValue::Boolean(b) => b.to_string(),
        LiteralValue::Integer { value, suffix } => format!("{value}{}", self::suffix_text(*suffix)),
        LiteralValue::Real { value, suffix } => format!("{value:?}{}", self::suffix_text(*suffix)),
        LiteralValue::String(s) => {
            let mut out = String::with_capacity(s.len() + 2);
            out.push('"');
            for c in s.chars() {
                self::push_escaped(&mut out, c, '"');
            }
            out.push('"');
            out
        }
        LiteralValue::Char(c) => {
            let mut out = String::from("'");
            self::push_escaped(&mut out, *c, '\'');
            out.push('\'');
            out
        }
    }
}

/// How the declared type of a variable declaration is spelled
enum DeclaredType {
    /// One type node for every declarator
    Node(NodeId),
    /// `var` or `object`
    Implicit(&'static str),
    /// Declarators disagree: one declaration each
    Split,
}

pub struct CSharpWriter<'a, 'o> {
    ast: &'a Ast,
    keywords: &'a KeywordTable,
    options: &'a FormattingOptions,
    out: &'o mut dyn TextOutput,
    /// Inside a `for` / `using` / `fixed` header: no terminators
    in_header: bool,
}

impl<'a, 'o> NodeWriter for CSharpWriter<'a, 'o> {
    fn syntax(&self) -> SurfaceSyntax {
        SurfaceSyntax::CSharp
    }

    fn ast(&self) -> &Ast {
        self.ast
    }

    fn out(&mut self) -> &mut dyn TextOutput {
        self.out
    }

    fn write_comment(&mut self, comment: &Comment) -> Result<(), WriteError> {
        for line in write::comment_text(true, comment) {
            self.out.write_comment(&line)?;
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

impl<'a, 'o> CSharpWriter<'a, 'o> {
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

    fn required(&self, id: NodeId, title: Title) -> Result<NodeId, WriteError> {
        self.ast.child(id, title).ok_or_else(|| WriteError::MissingChild {
            node: self.ast.kind(id).name(),
            title,
        })
    }

    fn end_statement(&mut self) -> Result<(), WriteError> {
        if !self.in_header {
            self.tk(";")?;
        }
        Ok(())
    }

    fn header<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T, WriteError>) -> Result<T, WriteError> {
        let prev = std::mem::replace(&mut self.in_header, true);
        let res = f(self);
        self.in_header = prev;
        res
    }

    fn write_name(&mut self, name: &str) -> Result<(), WriteError> {
        if self.keywords.is_reserved(name) {
            self.out.write_identifier(&format!("@{name}"))?;
        } else {
            self.out.write_identifier(name)?;
        }
        Ok(())
    }

    fn write_args(&mut self, id: NodeId, title: Title) -> Result<(), WriteError> {
        let items = self.children_of(id, title);
        self.write_comma_separated(&items, false)
    }

    /// Separator between a closing block and a following `else` / `catch` / `while`
    fn continuation(&mut self, prev: NodeId) -> Result<(), WriteError> {
        let after_block = matches!(self.ast.kind(prev), NodeKind::BlockStatement);
        if after_block && self.options.statement_brace == BraceStyle::EndOfLine {
            self.space()
        } else {
            Ok(self.out.new_line()?)
        }
    }

    fn write_block(&mut self, id: NodeId, style: BraceStyle) -> Result<(), WriteError> {
        self.out.start_node(id);
        self.open_brace(style)?;
        let stmts = self.children_of(id, Title::Statements);
        self.write_lines(&stmts)?;
        self.write_trailing_trivia(id)?;
        self.close_brace()?;
        self.out.end_node(id);
        Ok(())
    }

    // ----------------------------------------
    // Expressions
    // ----------------------------------------

    fn precedence(&self, id: NodeId) -> u8 {
        match self.ast.kind(id) {
            NodeKind::AssignmentExpression(_) => ASSIGNMENT,
            NodeKind::ConditionalExpression => CONDITIONAL,
            NodeKind::BinaryOperatorExpression(op) => self::binary_precedence(*op),
            NodeKind::UnaryOperatorExpression(op) if op.is_postfix() => PRIMARY,
            NodeKind::UnaryOperatorExpression(_) | NodeKind::CastExpression(_) => UNARY,
            NodeKind::IsExpression | NodeKind::AsExpression => RELATIONAL,
            _ => PRIMARY,
        }
    }

    /// Writes the expression, parenthesized if it binds looser than `min`
    fn write_operand(&mut self, id: NodeId, min: u8) -> Result<(), WriteError> {
        if self.precedence(id) < min {
            self.tk("(")?;
            self.write_node(id)?;
            self.tk(")")
        } else {
            self.write_node(id)
        }
    }

    fn write_literal(&mut self, id: NodeId) -> Result<(), WriteError> {
        let ast = self.ast;
        let NodeKind::PrimitiveExpression(lit) = ast.kind(id) else {
            return Err(self.unsupported(id));
        };
        match lit.raw_for(SurfaceSyntax::CSharp) {
            Some(raw) => self.out.write_literal(raw)?,
            None => self.out.write_literal(&self::literal_text(&lit.value))?,
        }
        Ok(())
    }

    fn write_binary(&mut self, id: NodeId, op: BinaryOperator) -> Result<(), WriteError> {
        let left = self.required(id, Title::Left)?;
        let right = self.required(id, Title::Right)?;

        if op == BinaryOperator::Power {
            self.tk("Math.Pow(")?;
            self.write_node(left)?;
            self.tk(", ")?;
            self.write_node(right)?;
            return self.tk(")");
        }

        let level = self::binary_precedence(op);
        // `??` folds to the right
        let (left_min, right_min) = match op {
            BinaryOperator::NullCoalescing => (level + 1, level),
            _ => (level, level + 1),
        };
        self.write_operand(left, left_min)?;
        self.space()?;
        self.tk(self::binary_text(op))?;
        self.space()?;
        self.write_operand(right, right_min)
    }

    fn write_unary(&mut self, id: NodeId, op: UnaryOperator) -> Result<(), WriteError> {
        let operand = self.required(id, Title::Expression)?;
        if op.is_postfix() {
            self.write_operand(operand, PRIMARY)?;
            return self.tk(self::unary_text(op));
        }

        self.tk(self::unary_text(op))?;
        // `- -x`, not `--x`
        let glued = match self.ast.kind(operand) {
            NodeKind::UnaryOperatorExpression(inner) if !inner.is_postfix() => {
                let first = self::unary_text(*inner).chars().next();
                first == self::unary_text(op).chars().next()
            }
            _ => false,
        };
        if glued {
            self.out.write_token(" ")?;
        }
        self.write_operand(operand, UNARY)
    }

    fn write_assignment(&mut self, id: NodeId, op: AssignmentOperator) -> Result<(), WriteError> {
        let left = self.required(id, Title::Left)?;
        let value = self.required(id, Title::Value)?;
        self.write_operand(left, UNARY)?;
        self.space()?;
        match self::assignment_text(op) {
            Some(text) => {
                self.tk(text)?;
                self.space()?;
                self.write_operand(value, ASSIGNMENT)
            }
            // `x ^= y` is `x = Math.Pow(x, y)`
            None => {
                self.tk("= Math.Pow(")?;
                self.write_node(left)?;
                self.tk(", ")?;
                self.write_node(value)?;
                self.tk(")")
            }
        }
    }

    fn write_cast(&mut self, id: NodeId) -> Result<(), WriteError> {
        let ty = self.required(id, Title::Type)?;
        let expr = self.required(id, Title::Expression)?;
        self.tk("(")?;
        self.write_node(ty)?;
        self.tk(")")?;
        // `(Foo)-x` reads as a subtraction; only keyword casts take any unary operand
        let min = match self.ast.kind(ty) {
            NodeKind::PrimitiveType(_) => UNARY,
            _ => PRIMARY,
        };
        self.write_operand(expr, min)
    }

    /// Element type, then dimensions, then the extra ranks in source order
    fn write_array_creation(&mut self, id: NodeId, bounds: ArrayBounds) -> Result<(), WriteError> {
        let ast = self.ast;
        let ty = self.required(id, Title::Type)?;
        let args: Vec<NodeId> = ast.children(id, Title::Arguments).collect();
        let init = ast.child(id, Title::Initializer);

        self.kw("new")?;
        self.space()?;

        if args.is_empty() {
            self.write_node(ty)?;
            self.tk("[]")?;
        } else {
            let mut ranks = Vec::new();
            let mut elem = ty;
            while let NodeKind::ArrayType { rank } = ast.kind(elem) {
                ranks.push(*rank);
                elem = self.required(elem, Title::Type)?;
            }
            self.write_node(elem)?;
            self.tk("[")?;
            for (i, arg) in args.iter().enumerate() {
                if i > 0 {
                    self.tk(", ")?;
                }
                match bounds {
                    ArrayBounds::Length => self.write_node(*arg)?,
                    ArrayBounds::UpperBound => self.write_length_of(*arg)?,
                }
            }
            self.tk("]")?;
            for rank in ranks.into_iter().rev() {
                self.write_rank(rank)?;
            }
        }

        if let Some(init) = init {
            // `New Integer(2) {}`: the initializer says nothing
            let empty = ast.children(init, Title::Elements).next().is_none();
            if !(empty && !args.is_empty()) {
                self.space()?;
                self.write_node(init)?;
            }
        }
        Ok(())
    }

    /// Length of a dimension given its upper bound
    fn write_length_of(&mut self, upper: NodeId) -> Result<(), WriteError> {
        if let Some(n) = write::integer_value(self.ast, upper) {
            return Ok(self.out.write_literal(&(n + 1).to_string())?);
        }
        self.write_operand(upper, ADDITIVE)?;
        self.tk(" + 1")
    }

    fn write_rank(&mut self, rank: u32) -> Result<(), WriteError> {
        self.tk("[")?;
        for _ in 1..rank {
            self.tk(",")?;
        }
        self.tk("]")
    }

    // ----------------------------------------
    // Statements
    // ----------------------------------------

    fn write_if(&mut self, id: NodeId) -> Result<(), WriteError> {
        let cond = self.required(id, Title::Condition)?;
        let then = self.required(id, Title::TrueStatement)?;
        self.kw("if")?;
        self.tk(" (")?;
        self.write_node(cond)?;
        self.tk(")")?;
        self.write_embedded_statement(then)?;

        if let Some(other) = self.ast.child(id, Title::FalseStatement) {
            self.continuation(then)?;
            self.kw("else")?;
            if matches!(self.ast.kind(other), NodeKind::IfElseStatement) {
                self.space()?;
                self.write_node(other)?;
            } else {
                self.write_embedded_statement(other)?;
            }
        }
        Ok(())
    }

    fn write_loop_condition(&mut self, cond: Option<NodeId>, until: bool) -> Result<(), WriteError> {
        match cond {
            None => self.kw("true"),
            Some(cond) if until => {
                self.tk("!")?;
                self.write_operand(cond, PRIMARY)
            }
            Some(cond) => self.write_node(cond),
        }
    }

    fn write_do_loop(&mut self, id: NodeId, DoLoop { test, until }: DoLoop) -> Result<(), WriteError> {
        let body = self.required(id, Title::EmbeddedStatement)?;
        let cond = self.ast.child(id, Title::Condition);
        match test {
            LoopTest::Post => {
                self.kw("do")?;
                self.write_embedded_statement(body)?;
                self.continuation(body)?;
                self.kw("while")?;
                self.tk(" (")?;
                self.write_loop_condition(cond, until)?;
                self.tk(");")
            }
            LoopTest::Pre | LoopTest::None => {
                self.kw("while")?;
                self.tk(" (")?;
                self.write_loop_condition(cond, until)?;
                self.tk(")")?;
                self.write_embedded_statement(body)
            }
        }
    }

    fn write_for(&mut self, id: NodeId) -> Result<(), WriteError> {
        let inits = self.children_of(id, Title::Initializers);
        let iters = self.children_of(id, Title::Iterators);
        let cond = self.ast.child(id, Title::Condition);
        let body = self.required(id, Title::EmbeddedStatement)?;

        self.kw("for")?;
        self.tk(" (")?;
        self.header(|w| {
            w.write_comma_separated(&inits, false)?;
            w.tk(";")?;
            if let Some(cond) = cond {
                w.space()?;
                w.write_node(cond)?;
            }
            w.tk(";")?;
            if !iters.is_empty() {
                w.space()?;
                w.write_comma_separated(&iters, false)?;
            }
            Ok(())
        })?;
        self.tk(")")?;
        self.write_embedded_statement(body)
    }

    /// `For i = a To b Step s` as a counting `for`
    fn write_for_next(&mut self, id: NodeId) -> Result<(), WriteError> {
        let ast = self.ast;
        let name = self.required(id, Title::Identifier)?;
        let start = self.required(id, Title::Initializer)?;
        let limit = self.required(id, Title::Limit)?;
        let body = self.required(id, Title::EmbeddedStatement)?;

        // a negated step counts down
        let (compare, step) = match ast.child(id, Title::Step) {
            None => (" <= ", None),
            Some(step) => match ast.kind(step) {
                NodeKind::UnaryOperatorExpression(UnaryOperator::Minus) => {
                    (" >= ", Some((" -= ", self.required(step, Title::Expression)?)))
                }
                _ => (" <= ", Some((" += ", step))),
            },
        };

        self.kw("for")?;
        self.tk(" (")?;
        if let Some(ty) = ast.child(id, Title::Type) {
            self.write_node(ty)?;
            self.space()?;
        }
        self.write_node(name)?;
        self.tk(" = ")?;
        self.write_node(start)?;
        self.tk("; ")?;
        self.write_node(name)?;
        self.tk(compare)?;
        self.write_operand(limit, RELATIONAL + 1)?;
        self.tk("; ")?;
        self.write_node(name)?;
        match step {
            None => self.tk("++")?,
            Some((op, step)) => {
                self.tk(op)?;
                self.write_operand(step, ASSIGNMENT)?;
            }
        }
        self.tk(")")?;
        self.write_embedded_statement(body)
    }

    fn write_foreach(&mut self, id: NodeId) -> Result<(), WriteError> {
        let name = self.required(id, Title::Identifier)?;
        let expr = self.required(id, Title::Expression)?;
        let body = self.required(id, Title::EmbeddedStatement)?;
        self.kw("foreach")?;
        self.tk(" (")?;
        match self.ast.child(id, Title::Type) {
            Some(ty) => self.write_node(ty)?,
            None => self.kw("var")?,
        }
        self.space()?;
        self.write_node(name)?;
        self.tk(" ")?;
        self.kw("in")?;
        self.space()?;
        self.write_node(expr)?;
        self.tk(")")?;
        self.write_embedded_statement(body)
    }

    fn write_keyword_statement(&mut self, id: NodeId, keyword: &str) -> Result<(), WriteError> {
        self.kw(keyword)?;
        if let Some(expr) = self.ast.child(id, Title::Expression) {
            self.space()?;
            self.write_node(expr)?;
        }
        self.end_statement()
    }

    /// Closest loop or switch around a jump
    fn jump_target(&self, id: NodeId) -> Option<NodeId> {
        self.ast.ancestors(id).find(|a| {
            let kind = self.ast.kind(*a);
            kind.is_loop() || matches!(kind, NodeKind::SwitchStatement)
        })
    }

    fn write_exit(&mut self, id: NodeId, kind: ExitKind) -> Result<(), WriteError> {
        let ast = self.ast;
        let target = self.jump_target(id).map(|t| ast.kind(t));
        let keyword = match (kind, target) {
            (ExitKind::Sub | ExitKind::Property, _) => "return",
            (ExitKind::Select, Some(NodeKind::SwitchStatement))
            | (ExitKind::Do, Some(NodeKind::DoLoopStatement(_)))
            | (ExitKind::While, Some(NodeKind::WhileStatement))
            | (
                ExitKind::For,
                Some(NodeKind::ForNextStatement | NodeKind::ForeachStatement | NodeKind::ForStatement),
            ) => "break",
            _ => return Err(self.unsupported(id)),
        };
        self.kw(keyword)?;
        self.end_statement()
    }

    fn write_try(&mut self, id: NodeId) -> Result<(), WriteError> {
        let block = self.required(id, Title::TryBlock)?;
        self.kw("try")?;
        self.write_block(block, self.options.statement_brace)?;
        let mut prev = block;
        for catch in self.children_of(id, Title::CatchClauses) {
            self.continuation(prev)?;
            self.write_node(catch)?;
            prev = self.ast.child(catch, Title::Body).unwrap_or(catch);
        }
        if let Some(finally) = self.ast.child(id, Title::FinallyBlock) {
            self.continuation(prev)?;
            self.kw("finally")?;
            self.write_block(finally, self.options.statement_brace)?;
        }
        Ok(())
    }

    fn write_catch(&mut self, id: NodeId) -> Result<(), WriteError> {
        let body = self.required(id, Title::Body)?;
        self.kw("catch")?;
        if let Some(ty) = self.ast.child(id, Title::Type) {
            self.tk(" (")?;
            self.write_node(ty)?;
            if let Some(name) = self.ast.child(id, Title::Identifier) {
                self.space()?;
                self.write_node(name)?;
            }
            self.tk(")")?;
        }
        self.write_block(body, self.options.statement_brace)
    }

    fn write_switch(&mut self, id: NodeId) -> Result<(), WriteError> {
        let expr = self.required(id, Title::Expression)?;
        self.kw("switch")?;
        self.tk(" (")?;
        self.write_node(expr)?;
        self.tk(")")?;
        self.open_brace(self.options.statement_brace)?;
        for section in self.children_of(id, Title::SwitchSections) {
            self.write_leading_trivia(section)?;
            self.write_node(section)?;
        }
        self.write_trailing_trivia(id)?;
        self.close_brace()
    }

    /// Labels, then the indented statements; falling off the end becomes `break;`
    fn write_section(&mut self, id: NodeId) -> Result<(), WriteError> {
        for label in self.children_of(id, Title::CaseLabels) {
            self.write_node(label)?;
            self.out.new_line()?;
        }
        self.out.indent();
        let stmts = self.children_of(id, Title::Statements);
        self.write_lines(&stmts)?;

        let jumps = stmts.last().map_or(false, |last| {
            matches!(
                self.ast.kind(*last),
                NodeKind::BreakStatement
                    | NodeKind::ContinueStatement
                    | NodeKind::ReturnStatement
                    | NodeKind::ThrowStatement
                    | NodeKind::ExitStatement(_)
            )
        });
        if !jumps {
            self.kw("break")?;
            self.tk(";")?;
            self.out.new_line()?;
        }
        self.out.unindent();
        Ok(())
    }

    fn write_case_label(&mut self, id: NodeId) -> Result<(), WriteError> {
        match self.ast.child(id, Title::Expression) {
            Some(expr) => {
                self.kw("case")?;
                self.space()?;
                self.write_node(expr)?;
            }
            None => self.kw("default")?,
        }
        self.tk(":")
    }

    fn write_header_statement(&mut self, id: NodeId, keyword: &str, title: Title) -> Result<(), WriteError> {
        let head = self.required(id, title)?;
        let body = self.required(id, Title::EmbeddedStatement)?;
        self.kw(keyword)?;
        self.tk(" (")?;
        self.header(|w| w.write_node(head))?;
        self.tk(")")?;
        self.write_embedded_statement(body)
    }

    fn write_fixed(&mut self, id: NodeId) -> Result<(), WriteError> {
        let ty = self.required(id, Title::Type)?;
        let body = self.required(id, Title::EmbeddedStatement)?;
        let vars = self.children_of(id, Title::Variables);
        self.kw("fixed")?;
        self.tk(" (")?;
        self.write_node(ty)?;
        self.space()?;
        self.write_comma_separated(&vars, false)?;
        self.tk(")")?;
        self.write_embedded_statement(body)
    }

    // ----------------------------------------
    // Declarations
    // ----------------------------------------

    fn declared_type(&self, id: NodeId, allow_var: bool) -> DeclaredType {
        let ast = self.ast;
        if let Some(ty) = ast.child(id, Title::Type) {
            return DeclaredType::Node(ty);
        }

        let vars: Vec<NodeId> = ast.children(id, Title::Variables).collect();
        let types: Vec<Option<NodeId>> = vars.iter().map(|v| ast.child(*v, Title::Type)).collect();

        if types.iter().all(Option::is_none) {
            let all_init = vars.iter().all(|v| ast.child(*v, Title::Initializer).is_some());
            return DeclaredType::Implicit(if allow_var && all_init { "var" } else { "object" });
        }

        match types.as_slice() {
            [Some(first), rest @ ..]
                if rest
                    .iter()
                    .all(|t| t.map_or(false, |t| ast.match_nodes(*first, ast, t))) =>
            {
                DeclaredType::Node(*first)
            }
            _ => DeclaredType::Split,
        }
    }

    /// Local, field or `for` / `using` header declaration
    fn write_declaration(&mut self, id: NodeId, is_field: bool) -> Result<(), WriteError> {
        let vars = self.children_of(id, Title::Variables);
        match self.declared_type(id, !is_field) {
            DeclaredType::Node(ty) => {
                self.write_modifiers(id)?;
                self.write_node(ty)?;
                self.space()?;
                self.write_comma_separated(&vars, false)?;
                self.end_statement()
            }
            DeclaredType::Implicit(name) => {
                self.write_modifiers(id)?;
                self.kw(name)?;
                self.space()?;
                self.write_comma_separated(&vars, false)?;
                self.end_statement()
            }
            DeclaredType::Split if self.in_header => Err(self.unsupported(id)),
            DeclaredType::Split => {
                for (i, var) in vars.iter().enumerate() {
                    if i > 0 {
                        self.out.new_line()?;
                    }
                    self.write_modifiers(id)?;
                    match self.ast.child(*var, Title::Type) {
                        Some(ty) => self.write_node(ty)?,
                        None if !is_field && self.ast.child(*var, Title::Initializer).is_some() => {
                            self.kw("var")?
                        }
                        None => self.kw("object")?,
                    }
                    self.space()?;
                    self.write_node(*var)?;
                    self.end_statement()?;
                }
                Ok(())
            }
        }
    }

    fn write_declarator(&mut self, id: NodeId) -> Result<(), WriteError> {
        let name = self.required(id, Title::Identifier)?;
        self.write_node(name)?;
        if let Some(init) = self.ast.child(id, Title::Initializer) {
            self.tk(" = ")?;
            self.write_operand(init, ASSIGNMENT)?;
        }
        Ok(())
    }

    fn in_module(&self, id: NodeId) -> bool {
        self.ast.parent(id).map_or(false, |p| {
            matches!(self.ast.kind(p), NodeKind::TypeDeclaration(TypeVariant::Module))
        })
    }

    /// Modifiers with trailing spaces
    ///
    /// Property access is spelled by its accessors; members of a VB module are static.
    fn write_modifiers(&mut self, id: NodeId) -> Result<(), WriteError> {
        let is_property = matches!(self.ast.kind(id), NodeKind::PropertyDeclaration);
        for m in self.children_of(id, Title::Modifiers) {
            if is_property
                && matches!(
                    self.ast.kind(m),
                    NodeKind::Modifier(Modifier::Readonly | Modifier::WriteOnly)
                )
            {
                continue;
            }
            self.write_node(m)?;
            self.space()?;
        }

        let implied_static = self.in_module(id)
            && !matches!(self.ast.kind(id), NodeKind::TypeDeclaration(_))
            && !has_modifier(self.ast, id, Modifier::Static)
            && !has_modifier(self.ast, id, Modifier::Const);
        if implied_static {
            self.kw("static")?;
            self.space()?;
        }
        Ok(())
    }

    fn write_type_declaration(&mut self, id: NodeId, variant: TypeVariant) -> Result<(), WriteError> {
        let name = self.required(id, Title::Identifier)?;
        self.write_modifiers(id)?;
        let keyword = match variant {
            TypeVariant::Class => "class",
            TypeVariant::Struct => "struct",
            TypeVariant::Interface => "interface",
            TypeVariant::Enum => "enum",
            TypeVariant::Module => {
                if !has_modifier(self.ast, id, Modifier::Static) {
                    self.kw("static")?;
                    self.space()?;
                }
                "class"
            }
        };
        self.kw(keyword)?;
        self.space()?;
        self.write_node(name)?;

        let bases = self.children_of(id, Title::BaseTypes);
        if !bases.is_empty() {
            self.tk(" : ")?;
            self.write_comma_separated(&bases, false)?;
        }

        self.open_brace(self.options.type_brace)?;
        let members = self.children_of(id, Title::Members);
        if variant == TypeVariant::Enum {
            for (i, m) in members.iter().enumerate() {
                self.write_leading_trivia(*m)?;
                self.write_node(*m)?;
                if i + 1 < members.len() {
                    self.tk(",")?;
                }
                self.out.new_line()?;
            }
        } else {
            self.write_lines(&members)?;
        }
        self.write_trailing_trivia(id)?;
        self.close_brace()
    }

    fn write_parameters(&mut self, id: NodeId) -> Result<(), WriteError> {
        self.tk("(")?;
        let params = self.children_of(id, Title::Parameters);
        self.write_comma_separated(&params, false)?;
        self.tk(")")
    }

    fn write_method(&mut self, id: NodeId) -> Result<(), WriteError> {
        let name = self.required(id, Title::Identifier)?;
        self.write_modifiers(id)?;
        match self.ast.child(id, Title::Type) {
            Some(ty) => self.write_node(ty)?,
            None => self.kw("void")?,
        }
        self.space()?;
        self.write_node(name)?;
        self.write_parameters(id)?;
        match self.ast.child(id, Title::Body) {
            Some(body) => self.write_block(body, self.options.method_brace),
            None => self.tk(";"),
        }
    }

    fn write_constructor(&mut self, id: NodeId) -> Result<(), WriteError> {
        self.write_modifiers(id)?;
        let ast = self.ast;
        match ast.child(id, Title::Identifier) {
            Some(name) => self.write_node(name)?,
            None => {
                let owner = ast.parent(id).and_then(|p| ast.name_of(p));
                match owner {
                    Some(owner) => self.write_name(owner)?,
                    None => return Err(self.unsupported(id)),
                }
            }
        }
        self.write_parameters(id)?;
        if let Some(init) = self.ast.child(id, Title::Initializer) {
            self.space()?;
            self.write_node(init)?;
        }
        let body = self.required(id, Title::Body)?;
        self.write_block(body, self.options.constructor_brace)
    }

    fn write_property(&mut self, id: NodeId) -> Result<(), WriteError> {
        let ast = self.ast;
        let name = self.required(id, Title::Identifier)?;
        let accessors: Vec<NodeId> = [Title::Getter, Title::Setter]
            .into_iter()
            .filter_map(|t| ast.child(id, t))
            .collect();

        self.write_modifiers(id)?;
        match ast.child(id, Title::Type) {
            Some(ty) => self.write_node(ty)?,
            None => self.kw("object")?,
        }
        self.space()?;
        self.write_node(name)?;

        let auto = accessors.iter().all(|a| ast.child(*a, Title::Body).is_none());
        if auto && self.options.compact_auto_properties {
            self.tk(" {")?;
            for acc in &accessors {
                self.space()?;
                self.write_node(*acc)?;
            }
            return self.tk(" }");
        }

        self.open_brace(self.options.property_brace)?;
        self.write_lines(&accessors)?;
        self.write_trailing_trivia(id)?;
        self.close_brace()
    }

    fn write_accessor(&mut self, id: NodeId, kind: AccessorKind) -> Result<(), WriteError> {
        self.write_modifiers(id)?;
        self.kw(match kind {
            AccessorKind::Get => "get",
            AccessorKind::Set => "set",
            AccessorKind::Add => "add",
            AccessorKind::Remove => "remove",
        })?;
        match self.ast.child(id, Title::Body) {
            Some(body) => self.write_block(body, self.options.accessor_brace),
            None => self.tk(";"),
        }
    }

    fn write_parameter(&mut self, id: NodeId, modifier: ParameterModifier) -> Result<(), WriteError> {
        let name = self.required(id, Title::Identifier)?;
        match modifier {
            ParameterModifier::None => {}
            ParameterModifier::Ref => self.kw("ref ")?,
            ParameterModifier::Out => self.kw("out ")?,
            ParameterModifier::Params => self.kw("params ")?,
        }
        match self.ast.child(id, Title::Type) {
            Some(ty) => self.write_node(ty)?,
            None => self.kw("object")?,
        }
        self.space()?;
        self.write_node(name)?;
        if let Some(default) = self.ast.child(id, Title::DefaultExpression) {
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
            NodeKind::Modifier(m) => match SurfaceSyntax::CSharp.data().modifier_text(*m) {
                Some(text) => self.kw(text),
                None => Err(self.unsupported(id)),
            },
            NodeKind::Comment(comment) => self.write_comment(comment),
            NodeKind::BlankLine => Ok(()),

            NodeKind::PrimitiveType(ty) => self.kw(ty.csharp_keyword()),
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
            NodeKind::PointerType => {
                let elem = self.required(id, Title::Type)?;
                self.write_node(elem)?;
                self.tk("*")
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
            NodeKind::InvocationExpression => {
                let target = self.required(id, Title::Target)?;
                self.write_operand(target, PRIMARY)?;
                self.tk("(")?;
                self.write_args(id, Title::Arguments)?;
                self.tk(")")
            }
            NodeKind::IndexerExpression => {
                let target = self.required(id, Title::Target)?;
                self.write_operand(target, PRIMARY)?;
                self.tk("[")?;
                self.write_args(id, Title::Arguments)?;
                self.tk("]")
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
                self.write_operand(cond, COALESCING)?;
                self.tk(" ? ")?;
                self.write_operand(then, ASSIGNMENT)?;
                self.tk(" : ")?;
                self.write_operand(other, ASSIGNMENT)
            }
            NodeKind::CastExpression(CastStyle::Explicit | CastStyle::Direct) => self.write_cast(id),
            NodeKind::AsExpression | NodeKind::IsExpression => {
                let expr = self.required(id, Title::Expression)?;
                let ty = self.required(id, Title::Type)?;
                self.write_operand(expr, RELATIONAL)?;
                self.space()?;
                self.kw(if matches!(ast.kind(id), NodeKind::AsExpression) { "as" } else { "is" })?;
                self.space()?;
                self.write_node(ty)
            }
            NodeKind::TypeOfExpression => {
                let ty = self.required(id, Title::Type)?;
                self.kw("typeof")?;
                self.tk("(")?;
                self.write_node(ty)?;
                self.tk(")")
            }
            NodeKind::TypeReferenceExpression => {
                let ty = self.required(id, Title::Type)?;
                self.write_node(ty)
            }
            NodeKind::ThisReferenceExpression => self.kw("this"),
            NodeKind::BaseReferenceExpression => self.kw("base"),
            NodeKind::ObjectCreateExpression => {
                let ty = self.required(id, Title::Type)?;
                self.kw("new")?;
                self.space()?;
                self.write_node(ty)?;
                self.tk("(")?;
                self.write_args(id, Title::Arguments)?;
                self.tk(")")
            }
            NodeKind::ArrayCreateExpression(bounds) => self.write_array_creation(id, *bounds),
            NodeKind::ArrayInitializerExpression => {
                let elems = self.children_of(id, Title::Elements);
                if elems.is_empty() {
                    return self.tk("{ }");
                }
                self.tk("{ ")?;
                self.write_comma_separated(&elems, false)?;
                self.tk(" }")
            }
            NodeKind::DirectionExpression(dir) => {
                let expr = self.required(id, Title::Expression)?;
                self.kw(match dir {
                    FieldDirection::Ref => "ref",
                    FieldDirection::Out => "out",
                })?;
                self.space()?;
                self.write_node(expr)
            }

            NodeKind::BlockStatement => self.write_block(id, self.options.statement_brace),
            NodeKind::ExpressionStatement => {
                let expr = self.required(id, Title::Expression)?;
                self.write_node(expr)?;
                self.end_statement()
            }
            NodeKind::VariableDeclarationStatement => self.write_declaration(id, false),
            NodeKind::VariableDeclarator => self.write_declarator(id),
            NodeKind::IfElseStatement => self.write_if(id),
            NodeKind::WhileStatement => {
                let cond = self.required(id, Title::Condition)?;
                let body = self.required(id, Title::EmbeddedStatement)?;
                self.kw("while")?;
                self.tk(" (")?;
                self.write_node(cond)?;
                self.tk(")")?;
                self.write_embedded_statement(body)
            }
            NodeKind::DoLoopStatement(do_loop) => self.write_do_loop(id, *do_loop),
            NodeKind::ForStatement => self.write_for(id),
            NodeKind::ForeachStatement => self.write_foreach(id),
            NodeKind::ReturnStatement => self.write_keyword_statement(id, "return"),
            NodeKind::ThrowStatement => self.write_keyword_statement(id, "throw"),
            NodeKind::BreakStatement => self.write_keyword_statement(id, "break"),
            NodeKind::ContinueStatement => self.write_keyword_statement(id, "continue"),
            NodeKind::TryCatchStatement => self.write_try(id),
            NodeKind::CatchClause => self.write_catch(id),
            NodeKind::SwitchStatement => self.write_switch(id),
            NodeKind::SwitchSection => self.write_section(id),
            NodeKind::CaseLabel => self.write_case_label(id),
            NodeKind::UsingStatement => {
                self.write_header_statement(id, "using", Title::ResourceAcquisition)
            }
            NodeKind::LockStatement => self.write_header_statement(id, "lock", Title::Expression),
            NodeKind::EmptyStatement => self.tk(";"),

            NodeKind::CompilationUnit => {
                let members = self.children_of(id, Title::Members);
                self.write_lines(&members)?;
                self.write_trailing_trivia(id)
            }
            NodeKind::UsingDeclaration => {
                let import = self.required(id, Title::Import)?;
                self.kw("using")?;
                self.space()?;
                self.write_node(import)?;
                self.tk(";")
            }
            NodeKind::NamespaceDeclaration => {
                let name = self.required(id, Title::Name)?;
                self.kw("namespace")?;
                self.space()?;
                self.write_node(name)?;
                self.open_brace(self.options.namespace_brace)?;
                let members = self.children_of(id, Title::Members);
                self.write_lines(&members)?;
                self.write_trailing_trivia(id)?;
                self.close_brace()
            }
            NodeKind::TypeDeclaration(variant) => self.write_type_declaration(id, *variant),
            NodeKind::FieldDeclaration => self.write_declaration(id, true),
            NodeKind::MethodDeclaration => self.write_method(id),
            NodeKind::ConstructorDeclaration => self.write_constructor(id),
            NodeKind::ConstructorInitializer(kind) => {
                self.tk(": ")?;
                self.kw(match kind {
                    CtorInitializerKind::Base => "base",
                    CtorInitializerKind::This => "this",
                })?;
                self.tk("(")?;
                self.write_args(id, Title::Arguments)?;
                self.tk(")")
            }
            NodeKind::PropertyDeclaration => self.write_property(id),
            NodeKind::Accessor(kind) => self.write_accessor(id, *kind),
            NodeKind::EventDeclaration => {
                let ty = self.required(id, Title::Type)?;
                let name = self.required(id, Title::Identifier)?;
                self.write_modifiers(id)?;
                self.kw("event")?;
                self.space()?;
                self.write_node(ty)?;
                self.space()?;
                self.write_node(name)?;
                self.tk(";")
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

            NodeKind::FixedStatement => self.write_fixed(id),
            NodeKind::ExitStatement(kind) => self.write_exit(id, *kind),
            NodeKind::ForNextStatement => self.write_for_next(id),
            NodeKind::CaseRange | NodeKind::CaseComparison(_) => Err(self.unsupported(id)),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        ast::{
            kind::{BinaryOperator, LiteralValue, UnaryOperator},
            nodes::{BinaryOperatorExpression, ExpressionStatement},
            Ast, NodeKind, Title,
        },
        syntax::Fragment,
        write::{
            options::{BraceStyle, FormattingOptions},
            WriteError,
        },
        Language,
    };

    fn round_trip(src: &str) -> String {
        let cs = Language::csharp();
        let res = cs.parse(src).unwrap();
        cs.write(&res.ast, res.root, &cs.default_options()).unwrap()
    }

    fn statement(lang: &Language, src: &str, target: &Language) -> Result<String, WriteError> {
        let res = lang.parse_fragment(Fragment::Statement, src).unwrap();
        target.write(&res.ast, res.root, &target.default_options())
    }

    #[test]
    fn compilation_unit_round_trip() {
        let src = "\
using System;

namespace Demo
{
    public class Foo : Base
    {
        private int x = 1, y;

        public int Bar(int a, ref int b)
        {
            if (a > 0)
            {
                return a * (b + 1);
            }
            else
                return -a;
        }
    }
}
";
        assert_eq!(round_trip(src), src);
    }

    #[test]
    fn comments_survive() {
        let src = "\
class A
{
    // counter
    int n;
}
";
        assert_eq!(round_trip(src), src);
    }

    #[test]
    fn comments_before_closing_braces() {
        let src = "\
// leading
class A
{
    void F()
    {
        x = 1;
        // after the last statement
    }
    // after the last member
}
// end of file
";
        assert_eq!(round_trip(src), src);
        assert_eq!(round_trip("// only\n"), "// only\n");
    }

    #[test]
    fn namespace_members_keep_blank_lines() {
        let src = "\
namespace Demo
{
    class A
    {
    }

    interface I
    {
    }

    enum Color
    {
        Red,
        Green
    }
}

class C
{
}
";
        assert_eq!(round_trip(src), src);
    }

    #[test]
    fn end_of_line_braces() {
        let cs = Language::csharp();
        let res = cs.parse("class A { void F() { while (x) { x = g(); } } }").unwrap();
        let opts = FormattingOptions::default().with_braces(BraceStyle::EndOfLine);
        let out = cs.write(&res.ast, res.root, &opts).unwrap();
        assert_eq!(
            out,
            "class A {\n    void F() {\n        while (x) {\n            x = g();\n        }\n    }\n}\n"
        );
    }

    #[test]
    fn synthesized_trees_get_parentheses() {
        let mut ast = Ast::new();
        let one = ast.literal(LiteralValue::Integer {
            value: 1,
            suffix: Default::default(),
        });
        let two = ast.literal(LiteralValue::Integer {
            value: 2,
            suffix: Default::default(),
        });
        let x = ast.identifier_expression("x");
        let sum = BinaryOperatorExpression::new(&mut ast, one, BinaryOperator::Add, two);
        let product = BinaryOperatorExpression::new(&mut ast, x, BinaryOperator::Multiply, sum.0);
        let neg = ast.alloc(NodeKind::UnaryOperatorExpression(UnaryOperator::Minus));
        ast.set_child(neg, Title::Expression, Some(product.0));
        let stmt = ExpressionStatement::new(&mut ast, neg);

        let cs = Language::csharp();
        let out = cs.write(&ast, stmt.0, &cs.default_options()).unwrap();
        assert_eq!(out, "-(x * (1 + 2));");
    }

    #[test]
    fn vb_statements_in_csharp() {
        let vb = Language::visual_basic();
        let cs = Language::csharp();

        assert_eq!(
            statement(&vb, "For i As Integer = 1 To 10 Step 2\nx += i\nNext\n", &cs).unwrap(),
            "for (int i = 1; i <= 10; i += 2)\n{\n    x += i;\n}"
        );
        assert_eq!(
            statement(&vb, "Do Until x > 3\nx = x + 1\nLoop\n", &cs).unwrap(),
            "while (!(x > 3))\n{\n    x = x + 1;\n}"
        );
        assert_eq!(
            statement(&vb, "Dim a(2) As Integer\n", &cs).unwrap(),
            "int[] a = new int[3];"
        );
        assert_eq!(
            statement(&vb, "s = a & b ^ 2\n", &cs).unwrap(),
            "s = a + Math.Pow(b, 2);"
        );
    }

    #[test]
    fn exit_statements_follow_their_target() {
        let vb = Language::visual_basic();
        let cs = Language::csharp();

        let out = statement(&vb, "While True\nExit While\nEnd While\n", &cs).unwrap();
        assert_eq!(out, "while (true)\n{\n    break;\n}");

        // `break` inside the `switch` would leave the switch, not the loop
        let src = "While True\nSelect Case x\nCase 1\nExit While\nEnd Select\nEnd While\n";
        assert!(matches!(
            statement(&vb, src, &cs),
            Err(WriteError::Unsupported { node: "ExitStatement", .. })
        ));

        let src = "Try\nExit Try\nFinally\nx = 1\nEnd Try\n";
        assert!(matches!(
            statement(&vb, src, &cs),
            Err(WriteError::Unsupported { node: "ExitStatement", .. })
        ));
    }

    #[test]
    fn switch_sections_end_with_break() {
        let vb = Language::visual_basic();
        let cs = Language::csharp();
        let src = "Select Case x\nCase 1, 2\ny = 1\nCase Else\nReturn\nEnd Select\n";
        assert_eq!(
            statement(&vb, src, &cs).unwrap(),
            "switch (x)\n{\n    case 1:\n    case 2:\n        y = 1;\n        break;\n    default:\n        return;\n}"
        );
    }

    #[test]
    fn case_ranges_have_no_csharp_form() {
        let vb = Language::visual_basic();
        let cs = Language::csharp();
        for src in [
            "Select Case x\nCase 1 To 3\ny = 1\nEnd Select\n",
            "Select Case x\nCase Is > 5\ny = 1\nEnd Select\n",
        ] {
            let res = statement(&vb, src, &cs);
            assert!(
                matches!(
                    res,
                    Err(WriteError::Unsupported { node: "CaseRange" | "CaseComparison", .. })
                ),
                "{res:?}"
            );
        }
    }

    #[test]
    fn reserved_names_are_escaped() {
        let vb = Language::visual_basic();
        let cs = Language::csharp();
        assert_eq!(statement(&vb, "[class] = 1\n", &cs).unwrap(), "@class = 1;");
    }
}
