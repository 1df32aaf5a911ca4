//! Symbol resolution: what names and expressions mean
//!
//! [`Semantics`] answers semantic queries over one [`Ast`]. Definitions are built from
//! declaration nodes on first access and cached. The scopes visible at a position are chained in
//! a [`Resolver`], innermost last, and lookups walk them outwards.
//!
//! Resolution never fails: every query returns exactly one [`ResolveResult`], with problems
//! reported as [`ResolveResult::Error`] or [`ResolveResult::UnknownIdentifier`].

pub mod builtins;
pub mod def;

use std::{cell::RefCell, cmp::Ordering, fmt, rc::Rc};

use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::{smallvec, SmallVec};

use crate::{
    ast::{
        kind::{
            AccessorKind, BinaryOperator, KnownType, LiteralValue, Modifier, NodeKind,
            ParameterModifier, TypeVariant, UnaryOperator,
        },
        nodes, Ast, NodeId, Title,
    },
    lang::{Language, SurfaceSyntax},
};

use self::{
    builtins::Builtins,
    def::{
        Definition, EventDef, FieldDef, MethodDef, NamespaceDef, ParameterDef, PropertyDef,
        TypeDef, TypeOrigin, VariableDef, VariableKind,
    },
};

/// Definitions a name denotes in one scope; several for an overloaded method
pub type Candidates = SmallVec<[Rc<Definition>; 1]>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CaseSensitivity {
    Sensitive,
    /// `Foo` and `FOO` are one name
    Insensitive,
}

impl CaseSensitivity {
    pub fn of(syntax: SurfaceSyntax) -> Self {
        if syntax.data().case_sensitive {
            CaseSensitivity::Sensitive
        } else {
            CaseSensitivity::Insensitive
        }
    }

    pub fn is_sensitive(self) -> bool {
        self == CaseSensitivity::Sensitive
    }
}

pub(crate) fn same_name(case_sensitive: bool, a: &str, b: &str) -> bool {
    if case_sensitive {
        a == b
    } else {
        a.eq_ignore_ascii_case(b)
    }
}

/// Type of a value
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeRef {
    Known(KnownType),
    /// `TypeDeclaration` node
    Declared(NodeId),
    Array { element: Box<TypeRef>, rank: u32 },
    /// Type of `null` / `Nothing`
    Null,
}

/// Value of a constant expression
#[derive(Debug, Clone, PartialEq)]
pub enum ConstantValue {
    Null,
    Boolean(bool),
    /// Wide enough for every integral type, negative values included
    Integer(i128),
    Real(f64),
    String(String),
    Char(char),
}

impl From<&LiteralValue> for ConstantValue {
    fn from(value: &LiteralValue) -> Self {
        match value {
            LiteralValue::Null => ConstantValue::Null,
            LiteralValue::Boolean(b) => ConstantValue::Boolean(*b),
            LiteralValue::Integer { value, .. } => ConstantValue::Integer(i128::from(*value)),
            LiteralValue::Real { value, .. } => ConstantValue::Real(*value),
            LiteralValue::String(s) => ConstantValue::String(s.clone()),
            LiteralValue::Char(c) => ConstantValue::Char(*c),
        }
    }
}

/// Text of the value in a string concatenation
impl fmt::Display for ConstantValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstantValue::Null => Ok(()),
            ConstantValue::Boolean(true) => f.write_str("True"),
            ConstantValue::Boolean(false) => f.write_str("False"),
            ConstantValue::Integer(i) => write!(f, "{i}"),
            ConstantValue::Real(r) => write!(f, "{r}"),
            ConstantValue::String(s) => f.write_str(s),
            ConstantValue::Char(c) => write!(f, "{c}"),
        }
    }
}

/// Outcome of resolving an expression or a type reference
#[derive(Debug, Clone, PartialEq)]
pub enum ResolveResult {
    UnknownIdentifier {
        name: String,
    },
    /// Named definition. A method group lists every overload.
    ///
    /// `ty` is the type of the value, or the type denoted when the definition is a type.
    Member {
        candidates: Candidates,
        ty: Option<TypeRef>,
    },
    Constant {
        value: ConstantValue,
        ty: Option<TypeRef>,
    },
    /// Bound call. `method` is `None` for the implicit constructor of a type without one.
    Invocation {
        method: Option<Rc<Definition>>,
        arguments: Vec<ResolveResult>,
        ty: Option<TypeRef>,
    },
    This {
        ty: Option<TypeRef>,
    },
    Base {
        ty: Option<TypeRef>,
    },
    Conversion {
        ty: TypeRef,
        operand: Box<ResolveResult>,
    },
    Error {
        message: String,
        candidates: Vec<Rc<Definition>>,
    },
}

impl ResolveResult {
    fn error(message: impl Into<String>) -> Self {
        ResolveResult::Error {
            message: message.into(),
            candidates: Vec::new(),
        }
    }

    pub fn ty(&self) -> Option<&TypeRef> {
        match self {
            ResolveResult::Member { ty, .. }
            | ResolveResult::Constant { ty, .. }
            | ResolveResult::Invocation { ty, .. }
            | ResolveResult::This { ty }
            | ResolveResult::Base { ty } => ty.as_ref(),
            ResolveResult::Conversion { ty, .. } => Some(ty),
            ResolveResult::UnknownIdentifier { .. } | ResolveResult::Error { .. } => None,
        }
    }

    /// Resolved definition: the (first) member, or the invoked method
    pub fn definition(&self) -> Option<&Rc<Definition>> {
        match self {
            ResolveResult::Member { candidates, .. } => candidates.first(),
            ResolveResult::Invocation { method, .. } => method.as_ref(),
            _ => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(
            self,
            ResolveResult::Error { .. } | ResolveResult::UnknownIdentifier { .. }
        )
    }

    /// Scope of the members reachable with `.` from this result
    pub fn scope(&self) -> Option<Scope> {
        let declared = |ty: Option<&TypeRef>| match ty {
            Some(TypeRef::Declared(decl)) => Some(Scope::Type(*decl)),
            _ => None,
        };

        match self {
            ResolveResult::Member { candidates, ty } => {
                let first = candidates.first()?;
                match first.as_ref() {
                    Definition::Namespace(_) => Some(Scope::Namespace(Rc::clone(first))),
                    Definition::Method(_) => None,
                    _ => declared(ty.as_ref()),
                }
            }
            ResolveResult::Constant { ty, .. }
            | ResolveResult::Invocation { ty, .. }
            | ResolveResult::This { ty }
            | ResolveResult::Base { ty } => declared(ty.as_ref()),
            ResolveResult::Conversion { ty, .. } => declared(Some(ty)),
            ResolveResult::UnknownIdentifier { .. } | ResolveResult::Error { .. } => None,
        }
    }
}

/// Region of the program where a set of names is declared
#[derive(Debug, Clone, PartialEq)]
pub enum Scope {
    /// Locals declared by the statements of a block (or switch section), up to and including
    /// the statement at `upto`
    Block { block: NodeId, upto: usize },
    /// Variables of a statement header: `for`, `foreach`, `using`, `fixed`, `catch`, `For .. To`
    Statement(NodeId),
    /// Parameters of a method, constructor or accessor
    Method(NodeId),
    /// Members of a type declaration and its base types
    Type(NodeId),
    /// Types and nested namespaces of a [`Definition::Namespace`]
    Namespace(Rc<Definition>),
    /// Types imported by the using directives of a namespace declaration or compilation unit
    Imports(NodeId),
    /// Global namespace of a compilation unit, plus keyword aliases of the built-in types
    CompilationUnit(NodeId),
}

impl Scope {
    /// Definitions the name denotes in this scope
    pub fn lookup(&self, sema: &Semantics<'_>, name: &str) -> Candidates {
        match self {
            Scope::Block { block, upto } => sema.lookup_block(*block, *upto, name),
            Scope::Statement(stmt) => sema.lookup_statement(*stmt, name),
            Scope::Method(decl) => sema.lookup_parameter(*decl, name),
            Scope::Type(decl) => sema.lookup_type_member(*decl, name),
            Scope::Namespace(def) => match def.as_ref() {
                Definition::Namespace(ns) => sema.lookup_namespace(ns, name),
                _ => Candidates::new(),
            },
            Scope::Imports(decl) => sema.lookup_imports(*decl, name),
            Scope::CompilationUnit(cu) => sema.lookup_global(*cu, name),
        }
    }
}

/// Scope chain at a position, innermost last
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resolver {
    scopes: Vec<Scope>,
}

impl Resolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_scope(mut self, scope: Scope) -> Self {
        self.scopes.push(scope);
        self
    }

    /// Innermost first
    pub fn scopes(&self) -> impl Iterator<Item = &Scope> + '_ {
        self.scopes.iter().rev()
    }

    pub fn lookup(&self, sema: &Semantics<'_>, name: &str) -> Candidates {
        self.lookup_where(sema, name, |_| true)
    }

    /// First non-empty lookup, innermost scope first, keeping only accepted definitions
    pub fn lookup_where(
        &self,
        sema: &Semantics<'_>,
        name: &str,
        accept: impl Fn(&Definition) -> bool,
    ) -> Candidates {
        for scope in self.scopes() {
            let found: Candidates = scope
                .lookup(sema, name)
                .into_iter()
                .filter(|def| accept(def.as_ref()))
                .collect();
            if !found.is_empty() {
                log::trace!("`{name}` found in {scope:?}");
                return found;
            }
        }
        Candidates::new()
    }

    /// Innermost enclosing type declaration
    pub fn enclosing_type(&self) -> Option<NodeId> {
        self.scopes().find_map(|scope| match scope {
            Scope::Type(decl) => Some(*decl),
            _ => None,
        })
    }
}

/// Cycle guard keys: which computation is running for a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Query {
    Bases,
    Type,
    Value,
}

/// Strength of an implicit conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Conv {
    None,
    Implicit,
    Exact,
}

/// Semantic queries over one tree
#[derive(Debug)]
pub struct Semantics<'a> {
    ast: &'a Ast,
    case: CaseSensitivity,
    builtins: Builtins,
    defs: RefCell<FxHashMap<NodeId, Rc<Definition>>>,
    namespaces: RefCell<FxHashMap<(NodeId, String), Option<Rc<Definition>>>>,
    in_progress: RefCell<FxHashSet<(Query, NodeId)>>,
}

impl<'a> Semantics<'a> {
    pub fn new(ast: &'a Ast, case: CaseSensitivity) -> Self {
        Self {
            ast,
            case,
            builtins: Builtins::new(),
            defs: RefCell::new(FxHashMap::default()),
            namespaces: RefCell::new(FxHashMap::default()),
            in_progress: RefCell::new(FxHashSet::default()),
        }
    }

    /// Semantics with the name rules of the language the tree was parsed from
    pub fn for_language(ast: &'a Ast, lang: &Language) -> Self {
        Self::new(ast, CaseSensitivity::of(lang.syntax()))
    }

    pub fn ast(&self) -> &'a Ast {
        self.ast
    }

    pub fn builtins(&self) -> &Builtins {
        &self.builtins
    }

    fn same_name(&self, a: &str, b: &str) -> bool {
        self::same_name(self.case.is_sensitive(), a, b)
    }

    /// Key of a name in member maps
    fn key(&self, name: &str) -> String {
        if self.case.is_sensitive() {
            name.to_string()
        } else {
            name.to_ascii_lowercase()
        }
    }

    fn root_of(&self, id: NodeId) -> NodeId {
        self.ast.ancestors(id).last().unwrap_or(id)
    }

    /// Runs `f` unless the same query is already running for the node
    fn guarded<T>(&self, query: Query, id: NodeId, f: impl FnOnce() -> Option<T>) -> Option<T> {
        if !self.in_progress.borrow_mut().insert((query, id)) {
            log::trace!("cycle in {query:?} of {id:?}");
            return None;
        }
        let res = f();
        self.in_progress.borrow_mut().remove(&(query, id));
        res
    }
}

/// Definitions and scopes of declarations
impl<'a> Semantics<'a> {
    /// Definition backing a declaration node, built on first access
    ///
    /// Declarators of fields and locals, parameters, `foreach` / `For` / `catch` statements and
    /// setters (for their implicit `value`) count as declarations too.
    pub fn definition_of(&self, decl: NodeId) -> Option<Rc<Definition>> {
        if matches!(self.ast.kind(decl), NodeKind::NamespaceDeclaration) {
            let full_name = self.namespace_name(decl)?;
            return self.namespace(self.root_of(decl), &full_name);
        }

        if let Some(def) = self.defs.borrow().get(&decl) {
            return Some(Rc::clone(def));
        }

        let def = Rc::new(self.build_definition(decl)?);
        log::trace!("definition of {decl:?}: {} `{}`", def.category(), def.name());
        self.defs.borrow_mut().insert(decl, Rc::clone(&def));
        Some(def)
    }

    /// Scope a declaration opens for its contents (`GetScope`)
    pub fn scope_of(&self, decl: NodeId) -> Option<Scope> {
        let ast = self.ast;
        Some(match ast.kind(decl) {
            NodeKind::TypeDeclaration(_) => Scope::Type(decl),
            NodeKind::NamespaceDeclaration => Scope::Namespace(self.definition_of(decl)?),
            NodeKind::MethodDeclaration
            | NodeKind::ConstructorDeclaration
            | NodeKind::Accessor(_) => Scope::Method(decl),
            NodeKind::BlockStatement | NodeKind::SwitchSection => Scope::Block {
                block: decl,
                upto: ast.children(decl, Title::Statements).count().saturating_sub(1),
            },
            NodeKind::ForStatement
            | NodeKind::ForeachStatement
            | NodeKind::ForNextStatement
            | NodeKind::UsingStatement
            | NodeKind::FixedStatement
            | NodeKind::CatchClause => Scope::Statement(decl),
            NodeKind::CompilationUnit => Scope::CompilationUnit(decl),
            _ => return None,
        })
    }

    /// Scopes the declaration itself is declared in (`GetDeclaringScope`)
    pub fn declaring_scope_of(&self, decl: NodeId) -> Resolver {
        self.scope_chain(decl)
    }

    /// Scopes visible at a node
    pub fn scope_chain(&self, node: NodeId) -> Resolver {
        let ast = self.ast;
        let mut inner_first = Vec::new();
        let mut child = node;

        for anc in ast.ancestors(node) {
            match ast.kind(anc) {
                NodeKind::BlockStatement | NodeKind::SwitchSection => {
                    if let Some(upto) = ast.children(anc, Title::Statements).position(|s| s == child) {
                        inner_first.push(Scope::Block { block: anc, upto });
                    }
                }
                // the iterated collection can't see the iteration variable
                NodeKind::ForeachStatement
                    if ast.title_in_parent(child) == Some(Title::Expression) => {}
                NodeKind::ForStatement
                | NodeKind::ForeachStatement
                | NodeKind::ForNextStatement
                | NodeKind::UsingStatement
                | NodeKind::FixedStatement
                | NodeKind::CatchClause => inner_first.push(Scope::Statement(anc)),
                NodeKind::MethodDeclaration
                | NodeKind::ConstructorDeclaration
                | NodeKind::Accessor(_) => inner_first.push(Scope::Method(anc)),
                NodeKind::TypeDeclaration(_) => inner_first.push(Scope::Type(anc)),
                NodeKind::NamespaceDeclaration => {
                    inner_first.extend(self.namespace_scopes(anc));
                    inner_first.push(Scope::Imports(anc));
                }
                NodeKind::CompilationUnit => {
                    inner_first.push(Scope::CompilationUnit(anc));
                    inner_first.push(Scope::Imports(anc));
                }
                _ => {}
            }
            child = anc;
        }

        inner_first.reverse();
        Resolver {
            scopes: inner_first,
        }
    }

    fn build_definition(&self, id: NodeId) -> Option<Definition> {
        let ast = self.ast;
        let name = || ast.name_of(id).map(str::to_string);

        Some(match ast.kind(id) {
            NodeKind::TypeDeclaration(variant) => Definition::Type(self.build_type(id, *variant)?),
            NodeKind::VariableDeclarator => {
                let parent = ast.parent(id)?;
                // VB declarators may carry their own type
                let ty = ast
                    .child(id, Title::Type)
                    .or_else(|| ast.child(parent, Title::Type));
                let is_const = nodes::has_modifier(ast, parent, Modifier::Const);
                let initializer = ast.child(id, Title::Initializer);

                if matches!(ast.kind(parent), NodeKind::FieldDeclaration) {
                    Definition::Field(FieldDef {
                        name: name()?,
                        decl: id,
                        ty,
                        declaring_type: ast.parent(parent)?,
                        is_const,
                        is_enum_member: false,
                        initializer,
                    })
                } else {
                    Definition::Variable(VariableDef {
                        name: name()?,
                        decl: id,
                        kind: VariableKind::Local,
                        ty,
                        is_const,
                        initializer,
                    })
                }
            }
            NodeKind::EnumMemberDeclaration => Definition::Field(FieldDef {
                name: name()?,
                decl: id,
                ty: None,
                declaring_type: ast.parent(id)?,
                is_const: true,
                is_enum_member: true,
                initializer: ast.child(id, Title::Initializer),
            }),
            NodeKind::PropertyDeclaration => Definition::Property(PropertyDef {
                name: name()?,
                decl: id,
                ty: ast.child(id, Title::Type),
                declaring_type: ast.parent(id)?,
                readable: ast.child(id, Title::Getter).is_some(),
                writable: ast.child(id, Title::Setter).is_some(),
            }),
            NodeKind::MethodDeclaration => Definition::Method(MethodDef {
                name: name()?,
                decl: id,
                return_type: ast.child(id, Title::Type),
                parameters: self.parameters(id),
                declaring_type: ast.parent(id)?,
                is_constructor: false,
            }),
            NodeKind::ConstructorDeclaration => {
                let declaring_type = ast.parent(id)?;
                let name = ast.name_of(declaring_type).or_else(|| ast.name_of(id))?;
                Definition::Method(MethodDef {
                    name: name.to_string(),
                    decl: id,
                    return_type: None,
                    parameters: self.parameters(id),
                    declaring_type,
                    is_constructor: true,
                })
            }
            NodeKind::EventDeclaration => Definition::Event(EventDef {
                name: name()?,
                decl: id,
                ty: ast.child(id, Title::Type),
                declaring_type: ast.parent(id)?,
            }),
            NodeKind::ParameterDeclaration(_) => Definition::Variable(VariableDef {
                name: name()?,
                decl: id,
                kind: VariableKind::Parameter,
                ty: ast.child(id, Title::Type),
                is_const: false,
                initializer: ast.child(id, Title::DefaultExpression),
            }),
            NodeKind::Accessor(AccessorKind::Set) => Definition::Variable(VariableDef {
                name: "value".to_string(),
                decl: id,
                kind: VariableKind::SetterValue,
                ty: ast.child(ast.parent(id)?, Title::Type),
                is_const: false,
                initializer: None,
            }),
            NodeKind::ForeachStatement => Definition::Variable(VariableDef {
                name: name()?,
                decl: id,
                kind: VariableKind::Iteration,
                ty: ast.child(id, Title::Type),
                is_const: false,
                initializer: ast.child(id, Title::Expression),
            }),
            NodeKind::ForNextStatement => Definition::Variable(VariableDef {
                name: name()?,
                decl: id,
                kind: VariableKind::Counter,
                ty: ast.child(id, Title::Type),
                is_const: false,
                initializer: ast.child(id, Title::Initializer),
            }),
            NodeKind::CatchClause => Definition::Variable(VariableDef {
                name: name()?,
                decl: id,
                kind: VariableKind::Catch,
                ty: ast.child(id, Title::Type),
                is_const: false,
                initializer: None,
            }),
            _ => return None,
        })
    }

    fn build_type(&self, id: NodeId, variant: TypeVariant) -> Option<TypeDef> {
        let ast = self.ast;
        let mut def = TypeDef {
            name: ast.name_of(id)?.to_string(),
            origin: TypeOrigin::Declared { decl: id, variant },
            members: Default::default(),
            constructors: SmallVec::new(),
            base_types: ast.children(id, Title::BaseTypes).collect(),
        };

        let mut add = |name: Option<&str>, member: NodeId| {
            if let Some(name) = name {
                def.members.entry(self.key(name)).or_default().push(member);
            }
        };

        for member in ast.children(id, Title::Members) {
            match ast.kind(member) {
                NodeKind::FieldDeclaration => {
                    for var in ast.children(member, Title::Variables) {
                        add(ast.name_of(var), var);
                    }
                }
                NodeKind::MethodDeclaration
                | NodeKind::PropertyDeclaration
                | NodeKind::EventDeclaration
                | NodeKind::EnumMemberDeclaration
                | NodeKind::TypeDeclaration(_) => add(ast.name_of(member), member),
                NodeKind::ConstructorDeclaration => def.constructors.push(member),
                _ => {}
            }
        }

        Some(def)
    }

    fn parameters(&self, decl: NodeId) -> Vec<ParameterDef> {
        let ast = self.ast;
        ast.children(decl, Title::Parameters)
            .filter_map(|p| {
                let modifier = match ast.kind(p) {
                    NodeKind::ParameterDeclaration(m) => *m,
                    _ => return None,
                };
                Some(ParameterDef {
                    name: ast.name_of(p)?.to_string(),
                    decl: p,
                    ty: ast.child(p, Title::Type),
                    modifier,
                    optional: ast.child(p, Title::DefaultExpression).is_some(),
                })
            })
            .collect()
    }
}

/// Namespaces
impl<'a> Semantics<'a> {
    /// `A.B.C` of a type name node
    fn dotted_name(&self, name: NodeId) -> Option<String> {
        let ast = self.ast;
        match ast.kind(name) {
            NodeKind::SimpleType | NodeKind::IdentifierExpression => {
                ast.name_of(name).map(str::to_string)
            }
            NodeKind::MemberType | NodeKind::MemberReferenceExpression { .. } => {
                let target = self.dotted_name(ast.child(name, Title::Target)?)?;
                Some(format!("{target}.{}", ast.name_of(name)?))
            }
            _ => None,
        }
    }

    /// Full name of a namespace declaration, enclosing declarations included
    fn namespace_name(&self, decl: NodeId) -> Option<String> {
        let ast = self.ast;
        let own = self.dotted_name(ast.child(decl, Title::Name)?)?;
        let outer = ast
            .ancestors(decl)
            .find(|a| matches!(ast.kind(*a), NodeKind::NamespaceDeclaration));
        match outer {
            Some(outer) => Some(format!("{}.{own}", self.namespace_name(outer)?)),
            None => Some(own),
        }
    }

    /// Namespace of a tree by its dotted name; `""` is the global namespace
    ///
    /// A namespace exists if it's declared, if it's a prefix of a declared namespace, or if it's
    /// `System`.
    pub fn namespace(&self, root: NodeId, full_name: &str) -> Option<Rc<Definition>> {
        let key = (root, self.key(full_name));
        if let Some(ns) = self.namespaces.borrow().get(&key) {
            return ns.clone();
        }

        let ns = self
            .collect_namespace(root, full_name)
            .map(|ns| Rc::new(Definition::Namespace(ns)));
        self.namespaces.borrow_mut().insert(key, ns.clone());
        ns
    }

    fn collect_namespace(&self, root: NodeId, full_name: &str) -> Option<NamespaceDef> {
        let ast = self.ast;
        let name = full_name.rsplit('.').next().unwrap_or(full_name).to_string();

        if full_name.is_empty() {
            return Some(NamespaceDef {
                name,
                full_name: String::new(),
                root,
                decls: vec![root],
            });
        }

        let mut decls = Vec::new();
        let mut exists = self.same_name(full_name, builtins::SYSTEM);
        for id in ast.descendants(root) {
            if !matches!(ast.kind(id), NodeKind::NamespaceDeclaration) {
                continue;
            }
            let Some(declared) = self.namespace_name(id) else {
                continue;
            };
            if self.same_name(&declared, full_name) {
                decls.push(id);
            } else if declared.as_bytes().get(full_name.len()) == Some(&b'.')
                && declared
                    .get(..full_name.len())
                    .map_or(false, |prefix| self.same_name(prefix, full_name))
            {
                exists = true;
            }
        }

        if decls.is_empty() && !exists {
            return None;
        }
        Some(NamespaceDef {
            name,
            full_name: full_name.to_string(),
            root,
            decls,
        })
    }

    /// Namespace scopes of a declaration: its full name, then the prefixes its own name spells
    fn namespace_scopes(&self, decl: NodeId) -> Vec<Scope> {
        let ast = self.ast;
        let root = self.root_of(decl);
        let own = ast
            .child(decl, Title::Name)
            .and_then(|name| self.dotted_name(name));
        let (Some(full), Some(own)) = (self.namespace_name(decl), own) else {
            return Vec::new();
        };

        let outer_len = full.len() - own.len();
        let mut names = vec![full.clone()];
        let mut end = full.len();
        while let Some(dot) = full[..end].rfind('.') {
            if dot < outer_len {
                break;
            }
            names.push(full[..dot].to_string());
            end = dot;
        }

        names
            .iter()
            .filter_map(|name| self.namespace(root, name))
            .map(Scope::Namespace)
            .collect()
    }
}

/// Lookups backing [`Scope::lookup`]
impl<'a> Semantics<'a> {
    fn declared_variable(&self, decl_stmt: NodeId, name: &str) -> Option<Rc<Definition>> {
        let ast = self.ast;
        ast.children(decl_stmt, Title::Variables)
            .find(|v| ast.name_of(*v).map_or(false, |n| self.same_name(n, name)))
            .and_then(|v| self.definition_of(v))
    }

    fn lookup_block(&self, block: NodeId, upto: usize, name: &str) -> Candidates {
        let ast = self.ast;
        ast.children(block, Title::Statements)
            .take(upto + 1)
            .filter(|s| matches!(ast.kind(*s), NodeKind::VariableDeclarationStatement))
            .find_map(|s| self.declared_variable(s, name))
            .into_iter()
            .collect()
    }

    fn lookup_statement(&self, stmt: NodeId, name: &str) -> Candidates {
        let ast = self.ast;
        let is_decl = |id: &NodeId| matches!(ast.kind(*id), NodeKind::VariableDeclarationStatement);

        let found = match ast.kind(stmt) {
            NodeKind::ForStatement => ast
                .children(stmt, Title::Initializers)
                .filter(is_decl)
                .find_map(|d| self.declared_variable(d, name)),
            NodeKind::UsingStatement => ast
                .child(stmt, Title::ResourceAcquisition)
                .filter(is_decl)
                .and_then(|d| self.declared_variable(d, name)),
            NodeKind::FixedStatement => self.declared_variable(stmt, name),
            NodeKind::ForeachStatement | NodeKind::ForNextStatement | NodeKind::CatchClause => {
                match ast.name_of(stmt) {
                    Some(n) if self.same_name(n, name) => self.definition_of(stmt),
                    _ => None,
                }
            }
            _ => None,
        };
        found.into_iter().collect()
    }

    fn lookup_parameter(&self, decl: NodeId, name: &str) -> Candidates {
        let ast = self.ast;
        let found = match ast.kind(decl) {
            NodeKind::Accessor(AccessorKind::Set) if self.same_name(name, "value") => {
                self.definition_of(decl)
            }
            _ => ast
                .children(decl, Title::Parameters)
                .find(|p| ast.name_of(*p).map_or(false, |n| self.same_name(n, name)))
                .and_then(|p| self.definition_of(p)),
        };
        found.into_iter().collect()
    }

    /// Members declared by the type itself
    fn lookup_own_member(&self, ty: NodeId, name: &str) -> Candidates {
        let Some(def) = self.definition_of(ty) else {
            return Candidates::new();
        };
        let Some(ids) = def.as_type().and_then(|td| td.members.get(&self.key(name))) else {
            return Candidates::new();
        };
        ids.iter().filter_map(|id| self.definition_of(*id)).collect()
    }

    /// Members of the type, then of its bases, breadth first
    fn lookup_type_member(&self, ty: NodeId, name: &str) -> Candidates {
        let mut queue = vec![ty];
        let mut seen = FxHashSet::default();
        let mut i = 0;

        while let Some(&ty) = queue.get(i) {
            i += 1;
            if !seen.insert(ty) {
                continue;
            }
            let found = self.lookup_own_member(ty, name);
            if !found.is_empty() {
                return found;
            }
            queue.extend(self.base_type_decls(ty));
        }

        Candidates::new()
    }

    fn lookup_namespace(&self, ns: &NamespaceDef, name: &str) -> Candidates {
        let ast = self.ast;
        let type_decls = || {
            ns.decls.iter().flat_map(move |decl| {
                ast.children(*decl, Title::Members)
                    .filter(move |m| matches!(ast.kind(*m), NodeKind::TypeDeclaration(_)))
            })
        };

        let mut found: Candidates = type_decls()
            .filter(|m| ast.name_of(*m).map_or(false, |n| self.same_name(n, name)))
            .filter_map(|m| self.definition_of(m))
            .collect();
        if self.same_name(&ns.full_name, builtins::SYSTEM) {
            found.extend(self.builtins.by_name(name, self.case.is_sensitive()));
        }
        if !found.is_empty() {
            return found;
        }

        let child = if ns.is_global() {
            name.to_string()
        } else {
            format!("{}.{name}", ns.full_name)
        };
        if let Some(child) = self.namespace(ns.root, &child) {
            return smallvec![child];
        }

        // members of VB modules are reachable without qualification
        type_decls()
            .filter(|m| matches!(ast.kind(*m), NodeKind::TypeDeclaration(TypeVariant::Module)))
            .flat_map(|m| self.lookup_own_member(m, name))
            .collect()
    }

    fn lookup_imports(&self, decl: NodeId, name: &str) -> Candidates {
        let ast = self.ast;
        let root = self.root_of(decl);
        let mut found = Candidates::new();

        for using in ast.children(decl, Title::Members) {
            if !matches!(ast.kind(using), NodeKind::UsingDeclaration) {
                continue;
            }
            let Some(import) = ast
                .child(using, Title::Import)
                .and_then(|i| self.dotted_name(i))
            else {
                continue;
            };
            let Some(ns) = self.namespace(root, &import) else {
                log::trace!("import of unknown namespace `{import}`");
                continue;
            };
            if let Definition::Namespace(ns) = ns.as_ref() {
                found.extend(
                    self.lookup_namespace(ns, name)
                        .into_iter()
                        .filter(|def| !matches!(def.as_ref(), Definition::Namespace(_))),
                );
            }
        }

        found
    }

    fn lookup_global(&self, cu: NodeId, name: &str) -> Candidates {
        let found = match self.namespace(cu, "") {
            Some(global) => match global.as_ref() {
                Definition::Namespace(ns) => self.lookup_namespace(ns, name),
                _ => Candidates::new(),
            },
            None => Candidates::new(),
        };
        if !found.is_empty() {
            return found;
        }
        self.builtins
            .by_keyword(name, self.case.is_sensitive())
            .into_iter()
            .collect()
    }
}

/// Types
impl<'a> Semantics<'a> {
    /// Type a type node denotes, resolved at its position
    pub fn type_at(&self, ty: NodeId) -> Option<TypeRef> {
        self.resolve_type(ty, &self.scope_chain(ty)).ty().cloned()
    }

    /// Type of the value a definition names, or the type a type definition denotes
    pub fn type_of_definition(&self, def: &Definition) -> Option<TypeRef> {
        match def {
            Definition::Namespace(_) | Definition::Method(_) => None,
            Definition::Type(td) => Some(match td.origin {
                TypeOrigin::Builtin(known) => TypeRef::Known(known),
                TypeOrigin::Declared { decl, .. } => TypeRef::Declared(decl),
            }),
            Definition::Field(f) if f.is_enum_member => Some(TypeRef::Declared(f.declaring_type)),
            Definition::Field(f) => self.declared_or_inferred(f.decl, f.ty, f.initializer),
            Definition::Property(p) => p.ty.and_then(|ty| self.type_at(ty)),
            Definition::Event(e) => e.ty.and_then(|ty| self.type_at(ty)),
            Definition::Variable(v) if v.kind == VariableKind::Iteration => {
                match v.ty.filter(|ty| !self.is_var(*ty)) {
                    Some(ty) => self.type_at(ty),
                    None => match self.inferred(v.decl, v.initializer)? {
                        TypeRef::Array { element, .. } => Some(*element),
                        _ => None,
                    },
                }
            }
            Definition::Variable(v) => self.declared_or_inferred(v.decl, v.ty, v.initializer),
        }
    }

    /// C# `var`
    fn is_var(&self, ty: NodeId) -> bool {
        matches!(self.ast.kind(ty), NodeKind::SimpleType) && self.ast.name_of(ty) == Some("var")
    }

    fn declared_or_inferred(
        &self,
        decl: NodeId,
        ty: Option<NodeId>,
        init: Option<NodeId>,
    ) -> Option<TypeRef> {
        match ty.filter(|ty| !self.is_var(*ty)) {
            Some(ty) => self.type_at(ty),
            None => self.inferred(decl, init),
        }
    }

    fn inferred(&self, decl: NodeId, init: Option<NodeId>) -> Option<TypeRef> {
        let init = init?;
        self.guarded(Query::Type, decl, || self.resolve(init).ty().cloned())
    }

    /// Declared types the base list of a type resolves to
    fn base_type_decls(&self, ty: NodeId) -> Vec<NodeId> {
        let Some(def) = self.definition_of(ty) else {
            return Vec::new();
        };
        let Some(td) = def.as_type() else {
            return Vec::new();
        };

        self.guarded(Query::Bases, ty, || {
            let bases = td
                .base_types
                .iter()
                .filter_map(|base| match self.type_at(*base) {
                    Some(TypeRef::Declared(decl)) => Some(decl),
                    _ => None,
                })
                .collect();
            Some(bases)
        })
        .unwrap_or_default()
    }

    fn variant_of(&self, ty: NodeId) -> Option<TypeVariant> {
        match self.ast.kind(ty) {
            NodeKind::TypeDeclaration(variant) => Some(*variant),
            _ => None,
        }
    }

    /// Base class of a type declaration; `Object` unless a class is listed
    fn base_class(&self, ty: NodeId) -> TypeRef {
        self.base_type_decls(ty)
            .into_iter()
            .find(|base| self.variant_of(*base) == Some(TypeVariant::Class))
            .map(TypeRef::Declared)
            .unwrap_or(TypeRef::Known(KnownType::Object))
    }

    /// Whether `ty` inherits (or implements) `base`, transitively
    fn derives_from(&self, ty: NodeId, base: NodeId) -> bool {
        let mut queue = self.base_type_decls(ty);
        let mut seen = FxHashSet::default();
        while let Some(next) = queue.pop() {
            if next == base {
                return true;
            }
            if seen.insert(next) {
                queue.extend(self.base_type_decls(next));
            }
        }
        false
    }

    fn is_reference(&self, ty: &TypeRef) -> bool {
        match ty {
            TypeRef::Known(known) => matches!(known, KnownType::String | KnownType::Object),
            TypeRef::Declared(decl) => !matches!(
                self.variant_of(*decl),
                Some(TypeVariant::Struct | TypeVariant::Enum)
            ),
            TypeRef::Array { .. } | TypeRef::Null => true,
        }
    }

    fn conversion(&self, from: &TypeRef, to: &TypeRef) -> Conv {
        if from == to {
            return Conv::Exact;
        }

        let implicit = match (from, to) {
            (_, TypeRef::Known(KnownType::Object)) => true,
            (TypeRef::Null, to) => self.is_reference(to),
            (TypeRef::Known(a), TypeRef::Known(b)) => a.widens_to(*b),
            (TypeRef::Declared(a), TypeRef::Declared(b)) => self.derives_from(*a, *b),
            (
                TypeRef::Array { element: a, rank: ra },
                TypeRef::Array { element: b, rank: rb },
            ) => ra == rb && self.is_reference(a) && self.conversion(a, b) != Conv::None,
            _ => false,
        };

        if implicit {
            Conv::Implicit
        } else {
            Conv::None
        }
    }

    fn return_type(&self, method: &MethodDef) -> Option<TypeRef> {
        match method.return_type {
            Some(ty) => self.type_at(ty),
            None if method.is_constructor => None,
            None => Some(TypeRef::Known(KnownType::Void)),
        }
    }
}

/// Resolution of expressions and type references
impl<'a> Semantics<'a> {
    /// Resolves an expression or type node in the scope at its position
    pub fn resolve(&self, node: NodeId) -> ResolveResult {
        self.resolve_expression(node, &self.scope_chain(node))
    }

    pub fn resolve_expression(&self, expr: NodeId, resolver: &Resolver) -> ResolveResult {
        let ast = self.ast;
        match ast.kind(expr) {
            NodeKind::PrimitiveExpression(lit) => {
                let ty = match &lit.value {
                    LiteralValue::Null => Some(TypeRef::Null),
                    value => builtins::literal_type(value).map(TypeRef::Known),
                };
                ResolveResult::Constant {
                    value: ConstantValue::from(&lit.value),
                    ty,
                }
            }
            NodeKind::IdentifierExpression => match ast.name_of(expr) {
                Some(name) => self.resolve_name(name, resolver),
                None => self.malformed(expr),
            },
            NodeKind::MemberReferenceExpression { .. } => {
                let (Some(target), Some(name)) = (ast.child(expr, Title::Target), ast.name_of(expr))
                else {
                    return self.malformed(expr);
                };
                let target = self.resolve_expression(target, resolver);
                self.resolve_member(&target, name)
            }
            NodeKind::InvocationExpression => self.resolve_invocation(expr, resolver),
            NodeKind::IndexerExpression => {
                let target = self.resolve_child(expr, Title::Target, resolver);
                self.element_of(target)
            }
            NodeKind::BinaryOperatorExpression(op) => self.resolve_binary(expr, *op, resolver),
            NodeKind::UnaryOperatorExpression(op) => self.resolve_unary(expr, *op, resolver),
            NodeKind::AssignmentExpression(_) => self.resolve_child(expr, Title::Left, resolver),
            NodeKind::ParenthesizedExpression | NodeKind::DirectionExpression(_) => {
                self.resolve_child(expr, Title::Expression, resolver)
            }
            NodeKind::ConditionalExpression => {
                let condition = self.resolve_child(expr, Title::Condition, resolver);
                match self.constant_of(&condition) {
                    Some(ConstantValue::Boolean(true)) => {
                        self.resolve_child(expr, Title::TrueExpression, resolver)
                    }
                    Some(ConstantValue::Boolean(false)) => {
                        self.resolve_child(expr, Title::FalseExpression, resolver)
                    }
                    _ => ResolveResult::error("conditional on a non-constant condition"),
                }
            }
            NodeKind::CastExpression(_) | NodeKind::AsExpression => {
                let Some(ty) = ast.child(expr, Title::Type) else {
                    return self.malformed(expr);
                };
                let target = self.resolve_type(ty, resolver);
                let Some(ty) = target.ty().cloned() else {
                    return target;
                };
                let operand = self.resolve_child(expr, Title::Expression, resolver);
                ResolveResult::Conversion {
                    ty,
                    operand: Box::new(operand),
                }
            }
            NodeKind::TypeReferenceExpression => match ast.child(expr, Title::Type) {
                Some(ty) => self.resolve_type(ty, resolver),
                None => self.malformed(expr),
            },
            NodeKind::ThisReferenceExpression => ResolveResult::This {
                ty: resolver.enclosing_type().map(TypeRef::Declared),
            },
            NodeKind::BaseReferenceExpression => ResolveResult::Base {
                ty: resolver.enclosing_type().map(|ty| self.base_class(ty)),
            },
            NodeKind::ObjectCreateExpression => self.resolve_creation(expr, resolver),
            NodeKind::PrimitiveType(_)
            | NodeKind::SimpleType
            | NodeKind::MemberType
            | NodeKind::ArrayType { .. }
            | NodeKind::PointerType => self.resolve_type(expr, resolver),
            kind @ (NodeKind::IsExpression
            | NodeKind::TypeOfExpression
            | NodeKind::ArrayCreateExpression(_)
            | NodeKind::ArrayInitializerExpression) => {
                ResolveResult::error(format!("`{}` is not resolved", kind.name()))
            }
            kind => ResolveResult::error(format!("`{}` is not an expression", kind.name())),
        }
    }

    pub fn resolve_type(&self, ty: NodeId, resolver: &Resolver) -> ResolveResult {
        let ast = self.ast;
        match ast.kind(ty) {
            NodeKind::PrimitiveType(known) => self.member(smallvec![self.builtins.get(*known)]),
            NodeKind::SimpleType => {
                let Some(name) = ast.name_of(ty) else {
                    return self.malformed(ty);
                };
                let found = resolver.lookup_where(self, name, Definition::is_type_like);
                if !found.is_empty() {
                    return self.member(found);
                }
                match self.builtins.by_keyword(name, self.case.is_sensitive()) {
                    Some(def) => self.member(smallvec![def]),
                    None => ResolveResult::UnknownIdentifier {
                        name: name.to_string(),
                    },
                }
            }
            NodeKind::MemberType => {
                let (Some(target), Some(name)) = (ast.child(ty, Title::Target), ast.name_of(ty))
                else {
                    return self.malformed(ty);
                };
                let target = self.resolve_type(target, resolver);
                let found: Candidates = match target.scope() {
                    Some(scope) => scope
                        .lookup(self, name)
                        .into_iter()
                        .filter(|def| def.is_type_like())
                        .collect(),
                    None => Candidates::new(),
                };
                if found.is_empty() {
                    ResolveResult::UnknownIdentifier {
                        name: name.to_string(),
                    }
                } else {
                    self.member(found)
                }
            }
            NodeKind::ArrayType { rank } => {
                let Some(element) = ast.child(ty, Title::Type) else {
                    return self.malformed(ty);
                };
                match self.resolve_type(element, resolver) {
                    ResolveResult::Member {
                        candidates,
                        ty: Some(element),
                    } => ResolveResult::Member {
                        candidates,
                        ty: Some(TypeRef::Array {
                            element: Box::new(element),
                            rank: *rank,
                        }),
                    },
                    other => other,
                }
            }
            // the pointee resolves; pointers have no type of their own here
            NodeKind::PointerType => match ast.child(ty, Title::Type) {
                Some(element) => match self.resolve_type(element, resolver) {
                    ResolveResult::Member { candidates, .. } => ResolveResult::Member {
                        candidates,
                        ty: None,
                    },
                    other => other,
                },
                None => self.malformed(ty),
            },
            kind => ResolveResult::error(format!("`{}` is not a type", kind.name())),
        }
    }

    fn malformed(&self, id: NodeId) -> ResolveResult {
        ResolveResult::error(format!("malformed `{}`", self.ast.kind(id).name()))
    }

    fn resolve_child(&self, expr: NodeId, title: Title, resolver: &Resolver) -> ResolveResult {
        match self.ast.child(expr, title) {
            Some(child) => self.resolve_expression(child, resolver),
            None => self.malformed(expr),
        }
    }

    fn member(&self, candidates: Candidates) -> ResolveResult {
        let ty = match candidates.as_slice() {
            [single] => self.type_of_definition(single),
            _ => None,
        };
        ResolveResult::Member { candidates, ty }
    }

    fn resolve_name(&self, name: &str, resolver: &Resolver) -> ResolveResult {
        let found = resolver.lookup(self, name);
        if found.is_empty() {
            log::trace!("unknown identifier `{name}`");
            return ResolveResult::UnknownIdentifier {
                name: name.to_string(),
            };
        }
        self.member(found)
    }

    /// `target.name`: looked up only if the target exposes a scope
    fn resolve_member(&self, target: &ResolveResult, name: &str) -> ResolveResult {
        let found = match target.scope() {
            Some(scope) => scope.lookup(self, name),
            None => Candidates::new(),
        };
        if found.is_empty() {
            ResolveResult::UnknownIdentifier {
                name: name.to_string(),
            }
        } else {
            self.member(found)
        }
    }

    /// Element of an array-typed member
    fn element_of(&self, target: ResolveResult) -> ResolveResult {
        match target {
            ResolveResult::Member {
                candidates,
                ty: Some(TypeRef::Array { element, .. }),
            } => ResolveResult::Member {
                candidates,
                ty: Some(*element),
            },
            ResolveResult::UnknownIdentifier { .. } | ResolveResult::Error { .. } => target,
            _ => ResolveResult::error("indexer on a non-array"),
        }
    }

    fn resolve_arguments(&self, expr: NodeId, resolver: &Resolver) -> Vec<ResolveResult> {
        self.ast
            .children(expr, Title::Arguments)
            .map(|arg| self.resolve_expression(arg, resolver))
            .collect()
    }

    fn resolve_invocation(&self, expr: NodeId, resolver: &Resolver) -> ResolveResult {
        let target = self.resolve_child(expr, Title::Target, resolver);
        let arguments = self.resolve_arguments(expr, resolver);

        if let ResolveResult::Member { candidates, ty } = &target {
            let methods: Vec<_> = candidates
                .iter()
                .filter(|def| def.as_method().is_some())
                .cloned()
                .collect();
            if !methods.is_empty() {
                return self.pick_overload(methods, arguments);
            }
            // VB indexes arrays with parentheses
            if matches!(ty, Some(TypeRef::Array { .. })) {
                return self.element_of(target);
            }
        }

        match target {
            ResolveResult::UnknownIdentifier { .. } | ResolveResult::Error { .. } => target,
            _ => ResolveResult::error("invoked expression is not a method"),
        }
    }

    fn resolve_creation(&self, expr: NodeId, resolver: &Resolver) -> ResolveResult {
        let Some(ty_node) = self.ast.child(expr, Title::Type) else {
            return self.malformed(expr);
        };
        let created = self.resolve_type(ty_node, resolver);
        let Some(ty) = created.ty().cloned() else {
            return created;
        };
        let arguments = self.resolve_arguments(expr, resolver);

        let ctors: Vec<Rc<Definition>> = match &ty {
            TypeRef::Declared(decl) => self
                .definition_of(*decl)
                .and_then(|def| {
                    let td = def.as_type()?;
                    Some(
                        td.constructors
                            .iter()
                            .filter_map(|ctor| self.definition_of(*ctor))
                            .collect(),
                    )
                })
                .unwrap_or_default(),
            _ => Vec::new(),
        };

        if ctors.is_empty() {
            if !arguments.is_empty() && matches!(ty, TypeRef::Declared(_)) {
                let name = created.definition().map_or("", |def| def.name());
                return ResolveResult::error(format!(
                    "`{name}` has no constructor taking {} argument(s)",
                    arguments.len()
                ));
            }
            return ResolveResult::Invocation {
                method: None,
                arguments,
                ty: Some(ty),
            };
        }

        let mut result = self.pick_overload(ctors, arguments);
        if let ResolveResult::Invocation { ty: result_ty, .. } = &mut result {
            *result_ty = Some(ty);
        }
        result
    }

    /// Single applicable overload, or an error listing the candidates
    ///
    /// Among several applicable overloads, one whose parameter types all match exactly wins;
    /// otherwise the call is ambiguous.
    fn pick_overload(
        &self,
        candidates: Vec<Rc<Definition>>,
        arguments: Vec<ResolveResult>,
    ) -> ResolveResult {
        let arg_types: Vec<Option<TypeRef>> = arguments.iter().map(|a| a.ty().cloned()).collect();
        let name = candidates
            .first()
            .map(|def| def.name().to_string())
            .unwrap_or_default();

        let applicable: Vec<(Rc<Definition>, bool)> = candidates
            .iter()
            .filter_map(|def| {
                let exact = self.applicability(def.as_method()?, &arg_types)?;
                Some((Rc::clone(def), exact))
            })
            .collect();

        let chosen = if applicable.is_empty() {
            return ResolveResult::Error {
                message: format!(
                    "no overload of `{name}` accepts {} argument(s) of these types",
                    arg_types.len()
                ),
                candidates,
            };
        } else if applicable.len() == 1 {
            Rc::clone(&applicable[0].0)
        } else {
            let exact: Vec<&Rc<Definition>> = applicable
                .iter()
                .filter(|(_, exact)| *exact)
                .map(|(def, _)| def)
                .collect();
            match exact.as_slice() {
                [single] => Rc::clone(single),
                _ => {
                    log::debug!("ambiguous call to `{name}`: {} candidates", applicable.len());
                    return ResolveResult::Error {
                        message: format!("ambiguous call to `{name}`"),
                        candidates: applicable.into_iter().map(|(def, _)| def).collect(),
                    };
                }
            }
        };

        let ty = chosen.as_method().and_then(|m| self.return_type(m));
        ResolveResult::Invocation {
            method: Some(chosen),
            arguments,
            ty,
        }
    }

    /// Whether the method accepts the arguments: `Some(true)` when every type matches exactly
    ///
    /// Unknown argument or parameter types match anything, inexactly.
    fn applicability(&self, method: &MethodDef, args: &[Option<TypeRef>]) -> Option<bool> {
        let (min, max) = method.arity();
        if args.len() < min || max.map_or(false, |max| args.len() > max) {
            return None;
        }

        let mut exact = true;
        for (i, arg) in args.iter().enumerate() {
            let param = method.parameters.get(i).or_else(|| method.parameters.last())?;
            let (Some(arg), Some(param_ty)) = (arg, param.ty.and_then(|ty| self.type_at(ty)))
            else {
                exact = false;
                continue;
            };

            let mut conv = self.conversion(arg, &param_ty);
            if conv == Conv::None && param.modifier == ParameterModifier::Params {
                if let TypeRef::Array { element, .. } = &param_ty {
                    conv = self.conversion(arg, element).min(Conv::Implicit);
                }
            }

            match conv {
                Conv::None => return None,
                Conv::Implicit => exact = false,
                Conv::Exact => {}
            }
        }

        Some(exact)
    }
}

/// Constant folding
impl<'a> Semantics<'a> {
    /// Value of a constant result, looking through `const` fields and locals
    pub fn constant_of(&self, result: &ResolveResult) -> Option<ConstantValue> {
        match result {
            ResolveResult::Constant { value, .. } => Some(value.clone()),
            ResolveResult::Member { candidates, .. } => {
                let [def] = candidates.as_slice() else {
                    return None;
                };
                let (decl, init) = match def.as_ref() {
                    Definition::Field(f) if f.is_const => (f.decl, f.initializer?),
                    Definition::Variable(v) if v.is_const => (v.decl, v.initializer?),
                    _ => return None,
                };
                self.guarded(Query::Value, decl, || self.constant_of(&self.resolve(init)))
            }
            ResolveResult::Conversion {
                ty: TypeRef::Known(known),
                operand,
            } => self::convert_constant(self.constant_of(operand)?, *known),
            _ => None,
        }
    }

    fn resolve_binary(&self, expr: NodeId, op: BinaryOperator, resolver: &Resolver) -> ResolveResult {
        let left = self.resolve_child(expr, Title::Left, resolver);
        let right = self.resolve_child(expr, Title::Right, resolver);
        let (Some(a), Some(b)) = (self.constant_of(&left), self.constant_of(&right)) else {
            return ResolveResult::error(format!("`{op:?}` is only evaluated on constants"));
        };

        match self::fold_binary(op, &a, &b) {
            Some(value) => {
                let ty = self::binary_type(op, left.ty(), right.ty())
                    .or_else(|| self::constant_type(&value));
                ResolveResult::Constant { value, ty }
            }
            None => ResolveResult::error(format!("can't evaluate `{op:?}` on {a:?} and {b:?}")),
        }
    }

    fn resolve_unary(&self, expr: NodeId, op: UnaryOperator, resolver: &Resolver) -> ResolveResult {
        let operand = self.resolve_child(expr, Title::Expression, resolver);
        let Some(value) = self.constant_of(&operand) else {
            return ResolveResult::error(format!("`{op:?}` is only evaluated on constants"));
        };

        let folded = match (op, &value) {
            (UnaryOperator::Plus, ConstantValue::Integer(_) | ConstantValue::Real(_)) => {
                Some(value.clone())
            }
            (UnaryOperator::Minus, ConstantValue::Integer(i)) => {
                i.checked_neg().map(ConstantValue::Integer)
            }
            (UnaryOperator::Minus, ConstantValue::Real(r)) => Some(ConstantValue::Real(-r)),
            (UnaryOperator::Not, ConstantValue::Boolean(b)) => Some(ConstantValue::Boolean(!b)),
            (UnaryOperator::Not | UnaryOperator::BitNot, ConstantValue::Integer(i)) => {
                Some(ConstantValue::Integer(!i))
            }
            _ => None,
        };

        match folded {
            Some(value) => ResolveResult::Constant {
                ty: operand.ty().cloned(),
                value,
            },
            None => ResolveResult::error(format!("can't evaluate `{op:?}` on {value:?}")),
        }
    }
}

fn constant_type(value: &ConstantValue) -> Option<TypeRef> {
    Some(TypeRef::Known(match value {
        ConstantValue::Null => return Some(TypeRef::Null),
        ConstantValue::Boolean(_) => KnownType::Boolean,
        ConstantValue::Integer(_) => KnownType::Int32,
        ConstantValue::Real(_) => KnownType::Double,
        ConstantValue::String(_) => KnownType::String,
        ConstantValue::Char(_) => KnownType::Char,
    }))
}

fn is_signed(ty: KnownType) -> bool {
    matches!(
        ty,
        KnownType::SByte | KnownType::Int16 | KnownType::Int32 | KnownType::Int64
    )
}

/// Binary numeric promotion
fn promote(a: KnownType, b: KnownType) -> Option<KnownType> {
    use KnownType as T;
    if !a.is_numeric() || !b.is_numeric() {
        return None;
    }
    let either = |t: T| a == t || b == t;
    Some(if either(T::Decimal) {
        T::Decimal
    } else if either(T::Double) {
        T::Double
    } else if either(T::Single) {
        T::Single
    } else if either(T::UInt64) {
        T::UInt64
    } else if either(T::Int64) {
        T::Int64
    } else if (a == T::UInt32 && is_signed(b)) || (b == T::UInt32 && is_signed(a)) {
        T::Int64
    } else if either(T::UInt32) {
        T::UInt32
    } else {
        T::Int32
    })
}

fn binary_type(op: BinaryOperator, left: Option<&TypeRef>, right: Option<&TypeRef>) -> Option<TypeRef> {
    use BinaryOperator as B;
    match op {
        B::Equality
        | B::InEquality
        | B::LessThan
        | B::GreaterThan
        | B::LessThanOrEqual
        | B::GreaterThanOrEqual
        | B::ConditionalAnd
        | B::ConditionalOr
        | B::ReferenceEquality
        | B::ReferenceInequality => Some(TypeRef::Known(KnownType::Boolean)),
        B::Concat => Some(TypeRef::Known(KnownType::String)),
        B::NullCoalescing => match left {
            Some(TypeRef::Null) | None => right.cloned(),
            left => left.cloned(),
        },
        B::Power => Some(TypeRef::Known(KnownType::Double)),
        _ => {
            let (TypeRef::Known(a), TypeRef::Known(b)) = (left?, right?) else {
                return None;
            };
            let known = match op {
                B::Add if *a == KnownType::String || *b == KnownType::String => KnownType::String,
                B::BitwiseAnd | B::BitwiseOr | B::ExclusiveOr
                    if *a == KnownType::Boolean && *b == KnownType::Boolean =>
                {
                    KnownType::Boolean
                }
                B::ShiftLeft | B::ShiftRight => promote(*a, KnownType::Int32)?,
                _ => promote(*a, *b)?,
            };
            Some(TypeRef::Known(known))
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Num {
    Int(i128),
    Real(f64),
}

impl Num {
    fn of(value: &ConstantValue) -> Option<Self> {
        match value {
            ConstantValue::Integer(i) => Some(Num::Int(*i)),
            ConstantValue::Real(r) => Some(Num::Real(*r)),
            ConstantValue::Char(c) => Some(Num::Int(i128::from(u32::from(*c)))),
            _ => None,
        }
    }

    fn real(self) -> f64 {
        match self {
            Num::Int(i) => i as f64,
            Num::Real(r) => r,
        }
    }
}

fn fold_binary(op: BinaryOperator, a: &ConstantValue, b: &ConstantValue) -> Option<ConstantValue> {
    use BinaryOperator as B;
    use ConstantValue as C;

    match (op, a, b) {
        (B::NullCoalescing, C::Null, _) => Some(b.clone()),
        (B::NullCoalescing, _, _) => Some(a.clone()),
        (B::Concat, _, _) | (B::Add, C::String(_), _) | (B::Add, _, C::String(_)) => {
            Some(C::String(format!("{a}{b}")))
        }
        (_, C::String(x), C::String(y)) => match op {
            B::Equality => Some(C::Boolean(x == y)),
            B::InEquality => Some(C::Boolean(x != y)),
            _ => None,
        },
        (_, C::Boolean(x), C::Boolean(y)) => Some(C::Boolean(match op {
            B::ConditionalAnd | B::BitwiseAnd => *x && *y,
            B::ConditionalOr | B::BitwiseOr => *x || *y,
            B::ExclusiveOr | B::InEquality => x != y,
            B::Equality => x == y,
            _ => return None,
        })),
        (_, C::Null, C::Null) => match op {
            B::Equality | B::ReferenceEquality => Some(C::Boolean(true)),
            B::InEquality | B::ReferenceInequality => Some(C::Boolean(false)),
            _ => None,
        },
        _ => self::fold_numeric(op, Num::of(a)?, Num::of(b)?),
    }
}

fn fold_numeric(op: BinaryOperator, a: Num, b: Num) -> Option<ConstantValue> {
    use BinaryOperator as B;

    let ordering = || match (a, b) {
        (Num::Int(x), Num::Int(y)) => Some(x.cmp(&y)),
        _ => a.real().partial_cmp(&b.real()),
    };

    Some(match op {
        B::Equality => ConstantValue::Boolean(ordering()? == Ordering::Equal),
        B::InEquality => ConstantValue::Boolean(ordering()? != Ordering::Equal),
        B::LessThan => ConstantValue::Boolean(ordering()? == Ordering::Less),
        B::GreaterThan => ConstantValue::Boolean(ordering()? == Ordering::Greater),
        B::LessThanOrEqual => ConstantValue::Boolean(ordering()? != Ordering::Greater),
        B::GreaterThanOrEqual => ConstantValue::Boolean(ordering()? != Ordering::Less),
        B::Power => ConstantValue::Real(a.real().powf(b.real())),
        _ => match (a, b) {
            (Num::Int(x), Num::Int(y)) => ConstantValue::Integer(match op {
                B::Add => x.checked_add(y)?,
                B::Subtract => x.checked_sub(y)?,
                B::Multiply => x.checked_mul(y)?,
                B::Divide | B::IntegerDivide => x.checked_div(y)?,
                B::Modulus => x.checked_rem(y)?,
                B::ShiftLeft => x.checked_shl(u32::try_from(y).ok()?)?,
                B::ShiftRight => x.checked_shr(u32::try_from(y).ok()?)?,
                B::BitwiseAnd => x & y,
                B::BitwiseOr => x | y,
                B::ExclusiveOr => x ^ y,
                _ => return None,
            }),
            _ => {
                let (x, y) = (a.real(), b.real());
                ConstantValue::Real(match op {
                    B::Add => x + y,
                    B::Subtract => x - y,
                    B::Multiply => x * y,
                    B::Divide => x / y,
                    B::IntegerDivide => (x / y).trunc(),
                    B::Modulus => x % y,
                    _ => return None,
                })
            }
        },
    })
}

/// Constant converted by an explicit cast to a built-in type
fn convert_constant(value: ConstantValue, to: KnownType) -> Option<ConstantValue> {
    Some(match (value, to) {
        (ConstantValue::Integer(i), to) if to.is_integral() => ConstantValue::Integer(i),
        (ConstantValue::Integer(i), KnownType::Single | KnownType::Double | KnownType::Decimal) => {
            ConstantValue::Real(i as f64)
        }
        (ConstantValue::Real(r), to) if to.is_integral() => ConstantValue::Integer(r.trunc() as i128),
        (ConstantValue::Real(r), KnownType::Single | KnownType::Double | KnownType::Decimal) => {
            ConstantValue::Real(r)
        }
        (ConstantValue::Char(c), to) if to.is_integral() => {
            ConstantValue::Integer(i128::from(u32::from(c)))
        }
        (value @ ConstantValue::String(_), KnownType::String)
        | (value @ ConstantValue::Boolean(_), KnownType::Boolean)
        | (value @ ConstantValue::Char(_), KnownType::Char) => value,
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::{Fragment, ParseResult};

    fn cs(src: &str) -> ParseResult {
        Language::csharp().parse(src).unwrap()
    }

    fn vb(src: &str) -> ParseResult {
        Language::visual_basic().parse(src).unwrap()
    }

    /// `nth` identifier expression spelled `name`
    fn identifier(res: &ParseResult, name: &str, nth: usize) -> NodeId {
        let ast = &res.ast;
        ast.descendants(res.root)
            .filter(|id| matches!(ast.kind(*id), NodeKind::IdentifierExpression))
            .filter(|id| ast.name_of(*id) == Some(name))
            .nth(nth)
            .unwrap()
    }

    /// `nth` call of a method spelled `name`
    fn call(res: &ParseResult, name: &str, nth: usize) -> NodeId {
        let ast = &res.ast;
        ast.descendants(res.root)
            .filter(|id| matches!(ast.kind(*id), NodeKind::InvocationExpression))
            .filter(|id| {
                let target = ast.child(*id, Title::Target).unwrap();
                ast.name_of(target) == Some(name)
            })
            .nth(nth)
            .unwrap()
    }

    fn first_of_kind(res: &ParseResult, pred: impl Fn(&NodeKind) -> bool) -> NodeId {
        res.ast
            .descendants(res.root)
            .find(|id| pred(res.ast.kind(*id)))
            .unwrap()
    }

    fn constant(src: &str) -> ResolveResult {
        let res = Language::csharp()
            .parse_fragment(Fragment::Expression, src)
            .unwrap();
        let sema = Semantics::new(&res.ast, CaseSensitivity::Sensitive);
        sema.resolve(res.root)
    }

    /// Declared type of the first parameter of an invoked method
    fn first_param_type(sema: &Semantics, result: &ResolveResult) -> Option<TypeRef> {
        let method = result.definition()?.as_method()?;
        sema.type_at(method.parameters.first()?.ty?)
    }

    #[test]
    fn field_in_method_body() {
        let res = cs("class Foo { int Bar; void M() { Bar = 1; } }");
        let sema = Semantics::new(&res.ast, CaseSensitivity::Sensitive);

        let result = sema.resolve(identifier(&res, "Bar", 0));
        let ResolveResult::Member { candidates, ty } = &result else {
            panic!("expected a member, got {result:?}");
        };
        assert_eq!(candidates.len(), 1);
        assert!(matches!(candidates[0].as_ref(), Definition::Field(f) if f.name == "Bar"));
        assert_eq!(ty, &Some(TypeRef::Known(KnownType::Int32)));
    }

    #[test]
    fn locals_shadow_fields_from_their_declaration_on() {
        let res = cs("class Foo { int x; void M() { x = 1; string x = \"\"; x = \"a\"; } }");
        let sema = Semantics::new(&res.ast, CaseSensitivity::Sensitive);

        let before = sema.resolve(identifier(&res, "x", 0));
        assert!(matches!(before.definition().map(|d| d.as_ref()), Some(Definition::Field(_))));

        let after = sema.resolve(identifier(&res, "x", 1));
        let Some(Definition::Variable(v)) = after.definition().map(|d| d.as_ref()) else {
            panic!("expected a local, got {after:?}");
        };
        assert_eq!(v.kind, VariableKind::Local);
        assert_eq!(after.ty(), Some(&TypeRef::Known(KnownType::String)));
    }

    #[test]
    fn unknown_identifier() {
        let res = cs("class Foo { void M() { y = 1; } }");
        let sema = Semantics::new(&res.ast, CaseSensitivity::Sensitive);
        assert_eq!(
            sema.resolve(identifier(&res, "y", 0)),
            ResolveResult::UnknownIdentifier {
                name: "y".to_string()
            }
        );
    }

    #[test]
    fn parameters_and_setter_value() {
        let res = cs("class Foo { int p; int P { get { return p; } set { p = value; } } void M(long a) { a = 1; } }");
        let sema = Semantics::new(&res.ast, CaseSensitivity::Sensitive);

        let value = sema.resolve(identifier(&res, "value", 0));
        assert_eq!(value.ty(), Some(&TypeRef::Known(KnownType::Int32)));

        let a = sema.resolve(identifier(&res, "a", 0));
        let Some(Definition::Variable(v)) = a.definition().map(|d| d.as_ref()) else {
            panic!("expected a parameter, got {a:?}");
        };
        assert_eq!(v.kind, VariableKind::Parameter);
        assert_eq!(a.ty(), Some(&TypeRef::Known(KnownType::Int64)));
    }

    #[test]
    fn member_access_recurses_into_the_target() {
        let res = cs("class A { B b; void M() { b.C = 1; b.D = 2; } } class B { int C; }");
        let sema = Semantics::new(&res.ast, CaseSensitivity::Sensitive);
        let ast = &res.ast;

        let mut refs = ast
            .descendants(res.root)
            .filter(|id| matches!(ast.kind(*id), NodeKind::MemberReferenceExpression { .. }));
        let c = sema.resolve(refs.next().unwrap());
        assert!(matches!(c.definition().map(|d| d.as_ref()), Some(Definition::Field(f)) if f.name == "C"));

        let d = sema.resolve(refs.next().unwrap());
        assert_eq!(d, ResolveResult::UnknownIdentifier { name: "D".to_string() });
    }

    #[test]
    fn members_of_base_types_and_this() {
        let res = cs("class B { int X; } class D : B { void M() { X = 1; this.X = 2; } }");
        let sema = Semantics::new(&res.ast, CaseSensitivity::Sensitive);

        let x = sema.resolve(identifier(&res, "X", 0));
        assert!(matches!(x.definition().map(|d| d.as_ref()), Some(Definition::Field(_))));

        let this = first_of_kind(&res, |k| matches!(k, NodeKind::ThisReferenceExpression));
        let ResolveResult::This { ty: Some(TypeRef::Declared(d)) } = sema.resolve(this) else {
            panic!("`this` without a type");
        };
        assert_eq!(res.ast.name_of(d), Some("D"));

        let member = res.ast.parent(this).unwrap();
        assert!(matches!(
            sema.resolve(member).definition().map(|d| d.as_ref()),
            Some(Definition::Field(f)) if f.name == "X"
        ));
    }

    #[test]
    fn overloads() {
        let res = cs("\
class A {
    void F(int a) { }
    void F(string s) { }
    void G(long a) { }
    void G(double a) { }
    void K(int a) { }
    void K(long a) { }
    void W(double d) { }
    void M() {
        F(1);
        F(\"x\");
        G(1);
        K(1);
        W(1);
        W(\"s\");
        F(unknown);
    }
}");
        let sema = Semantics::new(&res.ast, CaseSensitivity::Sensitive);

        let f_int = sema.resolve(call(&res, "F", 0));
        assert!(matches!(f_int, ResolveResult::Invocation { .. }));
        assert_eq!(first_param_type(&sema, &f_int), Some(TypeRef::Known(KnownType::Int32)));
        assert_eq!(f_int.ty(), Some(&TypeRef::Known(KnownType::Void)));

        let f_str = sema.resolve(call(&res, "F", 1));
        assert_eq!(first_param_type(&sema, &f_str), Some(TypeRef::Known(KnownType::String)));

        // `int` widens to both `long` and `double`
        let ResolveResult::Error { message, candidates } = sema.resolve(call(&res, "G", 0)) else {
            panic!("expected an ambiguity");
        };
        assert!(message.contains("ambiguous"), "{message}");
        assert_eq!(candidates.len(), 2);

        // the exact match wins over the widening one
        let k = sema.resolve(call(&res, "K", 0));
        assert_eq!(first_param_type(&sema, &k), Some(TypeRef::Known(KnownType::Int32)));

        let w = sema.resolve(call(&res, "W", 0));
        assert!(matches!(w, ResolveResult::Invocation { .. }));

        let ResolveResult::Error { message, candidates } = sema.resolve(call(&res, "W", 1)) else {
            panic!("expected no applicable overload");
        };
        assert!(message.contains("no overload"), "{message}");
        assert_eq!(candidates.len(), 1);

        // unknown arguments match anything
        assert!(matches!(
            sema.resolve(call(&res, "F", 2)),
            ResolveResult::Error { ref candidates, .. } if candidates.len() == 2
        ));
    }

    #[test]
    fn constructors() {
        let res = cs("class P { P(int a) { } } class Q { } class R { void M() { var p = new P(1); var q = new Q(); var e = new P(); } }");
        let sema = Semantics::new(&res.ast, CaseSensitivity::Sensitive);
        let ast = &res.ast;

        let mut news = ast
            .descendants(res.root)
            .filter(|id| matches!(ast.kind(*id), NodeKind::ObjectCreateExpression));

        let p = sema.resolve(news.next().unwrap());
        let ResolveResult::Invocation { method: Some(ctor), ty: Some(TypeRef::Declared(ty)), .. } = &p else {
            panic!("expected a constructor call, got {p:?}");
        };
        assert_eq!(ctor.category(), "constructor");
        assert_eq!(ast.name_of(*ty), Some("P"));

        let q = sema.resolve(news.next().unwrap());
        assert!(matches!(q, ResolveResult::Invocation { method: None, .. }));

        assert!(sema.resolve(news.next().unwrap()).is_error());

        // `var` takes the type of its initializer
        let p_var = identifier_declarator(&res, "p");
        let def = sema.definition_of(p_var).unwrap();
        assert!(matches!(sema.type_of_definition(&def), Some(TypeRef::Declared(_))));
    }

    fn identifier_declarator(res: &ParseResult, name: &str) -> NodeId {
        let ast = &res.ast;
        ast.descendants(res.root)
            .find(|id| matches!(ast.kind(*id), NodeKind::VariableDeclarator) && ast.name_of(*id) == Some(name))
            .unwrap()
    }

    #[test]
    fn folding() {
        let int = |i| ResolveResult::Constant {
            value: ConstantValue::Integer(i),
            ty: Some(TypeRef::Known(KnownType::Int32)),
        };
        assert_eq!(constant("1 + 2 * 3"), int(7));
        assert_eq!(constant("-(2 - 5)"), int(3));
        assert_eq!(constant("10 / 4"), int(2));
        assert_eq!(
            constant("10 / 4.0"),
            ResolveResult::Constant {
                value: ConstantValue::Real(2.5),
                ty: Some(TypeRef::Known(KnownType::Double)),
            }
        );
        assert_eq!(
            constant("\"a\" + 1"),
            ResolveResult::Constant {
                value: ConstantValue::String("a1".to_string()),
                ty: Some(TypeRef::Known(KnownType::String)),
            }
        );
        assert_eq!(
            constant("1 < 2 && true"),
            ResolveResult::Constant {
                value: ConstantValue::Boolean(true),
                ty: Some(TypeRef::Known(KnownType::Boolean)),
            }
        );
        assert!(constant("1 / 0").is_error());
        assert!(constant("x + 1").is_error());
    }

    #[test]
    fn negating_the_smallest_integer_is_an_error() {
        // -2^63 * 2^63 * 2 is the smallest representable constant
        let min = "-9223372036854775808 * 9223372036854775808 * 2";
        assert!(matches!(
            constant(min),
            ResolveResult::Constant { value: ConstantValue::Integer(i128::MIN), .. }
        ));
        assert!(constant(&format!("-({min})")).is_error());
        assert!(constant(&format!("({min}) * -1")).is_error());
    }

    #[test]
    fn const_fields_fold() {
        let res = cs("class A { const int N = 4; int M() { return N * 2; } }");
        let sema = Semantics::new(&res.ast, CaseSensitivity::Sensitive);

        let n = sema.resolve(identifier(&res, "N", 0));
        assert!(matches!(n, ResolveResult::Member { .. }));

        let product = first_of_kind(&res, |k| matches!(k, NodeKind::BinaryOperatorExpression(_)));
        assert_eq!(
            sema.resolve(product),
            ResolveResult::Constant {
                value: ConstantValue::Integer(8),
                ty: Some(TypeRef::Known(KnownType::Int32)),
            }
        );
    }

    #[test]
    fn vb_names_ignore_case() {
        let src = "\
Class Foo
    Private bar As Integer

    Sub M()
        BAR = 1
    End Sub
End Class
";
        let res = vb(src);
        let sema = Semantics::for_language(&res.ast, &Language::visual_basic());
        let result = sema.resolve(identifier(&res, "BAR", 0));
        assert!(matches!(
            result.definition().map(|d| d.as_ref()),
            Some(Definition::Field(f)) if f.name == "bar"
        ));

        let res = cs("class Foo { int bar; void M() { BAR = 1; } }");
        let sema = Semantics::for_language(&res.ast, &Language::csharp());
        assert!(sema.resolve(identifier(&res, "BAR", 0)).is_error());
    }

    #[test]
    fn vb_module_members_are_global() {
        let src = "\
Module Util
    Function Twice(x As Integer) As Integer
        Return x * 2
    End Function
End Module

Class C
    Sub M()
        Twice(1)
    End Sub
End Class
";
        let res = vb(src);
        let sema = Semantics::for_language(&res.ast, &Language::visual_basic());
        let twice = sema.resolve(call(&res, "Twice", 0));
        assert!(matches!(twice, ResolveResult::Invocation { method: Some(_), .. }));
        assert_eq!(twice.ty(), Some(&TypeRef::Known(KnownType::Int32)));
    }

    #[test]
    fn namespaces_and_imports() {
        let res = cs("\
namespace N { class T { } }
namespace M {
    using N;
    class U { T t; N.T u; System.Int32 v; }
}");
        let sema = Semantics::new(&res.ast, CaseSensitivity::Sensitive);

        let t = sema.definition_of(identifier_declarator(&res, "t")).unwrap();
        let u = sema.definition_of(identifier_declarator(&res, "u")).unwrap();
        let ty = sema.type_of_definition(&t);
        assert!(matches!(ty, Some(TypeRef::Declared(_))));
        assert_eq!(sema.type_of_definition(&u), ty);

        let v = sema.definition_of(identifier_declarator(&res, "v")).unwrap();
        assert_eq!(sema.type_of_definition(&v), Some(TypeRef::Known(KnownType::Int32)));
    }

    #[test]
    fn scopes_of_declarations() {
        let res = cs("namespace N { class T { void M() { } } }");
        let sema = Semantics::new(&res.ast, CaseSensitivity::Sensitive);
        let method = first_of_kind(&res, |k| matches!(k, NodeKind::MethodDeclaration));

        assert_eq!(sema.scope_of(method), Some(Scope::Method(method)));
        let chain = sema.declaring_scope_of(method);
        let kinds: Vec<_> = chain
            .scopes()
            .map(|s| match s {
                Scope::Type(_) => "type",
                Scope::Namespace(_) => "namespace",
                Scope::Imports(_) => "imports",
                Scope::CompilationUnit(_) => "unit",
                _ => "other",
            })
            .collect();
        assert_eq!(kinds, ["type", "namespace", "imports", "unit", "imports"]);

        // definitions are built once
        let class = first_of_kind(&res, |k| matches!(k, NodeKind::TypeDeclaration(_)));
        let a = sema.definition_of(class).unwrap();
        let b = sema.definition_of(class).unwrap();
        assert!(Rc::ptr_eq(&a, &b));
    }
}
