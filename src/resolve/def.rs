//! Definitions: what a name resolves to
//!
//! Definitions are built lazily from declaration nodes by [`Semantics`](super::Semantics) and
//! shared as `Rc<Definition>`. They keep the `NodeId`s of their type references instead of
//! resolved types; types are resolved on demand in the declaration's scope.

use indexmap::IndexMap;
use smallvec::SmallVec;

use crate::ast::{
    kind::{KnownType, ParameterModifier, TypeVariant},
    NodeId,
};

#[derive(Debug, Clone, PartialEq)]
pub enum Definition {
    Namespace(NamespaceDef),
    Type(TypeDef),
    Field(FieldDef),
    Property(PropertyDef),
    Method(MethodDef),
    Event(EventDef),
    /// Locals, parameters, loop and catch variables
    Variable(VariableDef),
}

impl Definition {
    pub fn name(&self) -> &str {
        match self {
            Definition::Namespace(ns) => &ns.name,
            Definition::Type(ty) => &ty.name,
            Definition::Field(f) => &f.name,
            Definition::Property(p) => &p.name,
            Definition::Method(m) => &m.name,
            Definition::Event(e) => &e.name,
            Definition::Variable(v) => &v.name,
        }
    }

    /// Declaring node. Namespaces and built-in types have none.
    pub fn decl(&self) -> Option<NodeId> {
        match self {
            Definition::Namespace(_) => None,
            Definition::Type(ty) => match ty.origin {
                TypeOrigin::Builtin(_) => None,
                TypeOrigin::Declared { decl, .. } => Some(decl),
            },
            Definition::Field(f) => Some(f.decl),
            Definition::Property(p) => Some(p.decl),
            Definition::Method(m) => Some(m.decl),
            Definition::Event(e) => Some(e.decl),
            Definition::Variable(v) => Some(v.decl),
        }
    }

    /// Human-readable category, e.g. in error messages
    pub fn category(&self) -> &'static str {
        match self {
            Definition::Namespace(_) => "namespace",
            Definition::Type(_) => "type",
            Definition::Field(_) => "field",
            Definition::Property(_) => "property",
            Definition::Method(m) if m.is_constructor => "constructor",
            Definition::Method(_) => "method",
            Definition::Event(_) => "event",
            Definition::Variable(_) => "variable",
        }
    }

    pub fn as_type(&self) -> Option<&TypeDef> {
        match self {
            Definition::Type(ty) => Some(ty),
            _ => None,
        }
    }

    pub fn as_method(&self) -> Option<&MethodDef> {
        match self {
            Definition::Method(m) => Some(m),
            _ => None,
        }
    }

    /// Namespaces and types: things that can stand in type position
    pub fn is_type_like(&self) -> bool {
        matches!(self, Definition::Namespace(_) | Definition::Type(_))
    }
}

/// All declarations of one (possibly dotted) namespace name
#[derive(Debug, Clone, PartialEq)]
pub struct NamespaceDef {
    /// Last segment
    pub name: String,
    /// Dotted name; empty for the global namespace
    pub full_name: String,
    /// Tree the namespace was collected from
    pub root: NodeId,
    /// `NamespaceDeclaration`s (or the compilation unit, for the global namespace) contributing
    /// members. Empty when the name is only a prefix of declared namespaces, or `System`.
    pub decls: Vec<NodeId>,
}

impl NamespaceDef {
    pub fn is_global(&self) -> bool {
        self.full_name.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeOrigin {
    Builtin(KnownType),
    Declared { decl: NodeId, variant: TypeVariant },
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeDef {
    pub name: String,
    pub origin: TypeOrigin,
    /// Member declarations keyed by the normalized name. Overloads share one entry. Fields and
    /// events contribute their declarators.
    pub members: IndexMap<String, SmallVec<[NodeId; 1]>>,
    pub constructors: SmallVec<[NodeId; 1]>,
    /// Type nodes of the base list, in source order
    pub base_types: Vec<NodeId>,
}

impl TypeDef {
    pub fn variant(&self) -> Option<TypeVariant> {
        match self.origin {
            TypeOrigin::Builtin(_) => None,
            TypeOrigin::Declared { variant, .. } => Some(variant),
        }
    }

    pub fn known_type(&self) -> Option<KnownType> {
        match self.origin {
            TypeOrigin::Builtin(ty) => Some(ty),
            TypeOrigin::Declared { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    pub name: String,
    /// `VariableDeclarator` or `EnumMemberDeclaration`
    pub decl: NodeId,
    pub ty: Option<NodeId>,
    pub declaring_type: NodeId,
    pub is_const: bool,
    pub is_enum_member: bool,
    pub initializer: Option<NodeId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PropertyDef {
    pub name: String,
    pub decl: NodeId,
    pub ty: Option<NodeId>,
    pub declaring_type: NodeId,
    pub readable: bool,
    pub writable: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodDef {
    pub name: String,
    pub decl: NodeId,
    /// `None` for `void` / `Sub` and constructors
    pub return_type: Option<NodeId>,
    pub parameters: Vec<ParameterDef>,
    pub declaring_type: NodeId,
    pub is_constructor: bool,
}

impl MethodDef {
    /// Number of arguments the method accepts, `None` meaning unbounded
    pub fn arity(&self) -> (usize, Option<usize>) {
        let required = self
            .parameters
            .iter()
            .filter(|p| !p.optional && p.modifier != ParameterModifier::Params)
            .count();
        let max = if self.parameters.iter().any(|p| p.modifier == ParameterModifier::Params) {
            None
        } else {
            Some(self.parameters.len())
        };
        (required, max)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParameterDef {
    pub name: String,
    pub decl: NodeId,
    pub ty: Option<NodeId>,
    pub modifier: ParameterModifier,
    /// Has a default value
    pub optional: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EventDef {
    pub name: String,
    pub decl: NodeId,
    pub ty: Option<NodeId>,
    pub declaring_type: NodeId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VariableKind {
    Local,
    Parameter,
    /// `foreach` / `For Each` variable
    Iteration,
    /// `For i = ..` counter
    Counter,
    Catch,
    /// Implicit `value` of a property setter
    SetterValue,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariableDef {
    pub name: String,
    /// Declarator, parameter or the statement introducing the variable
    pub decl: NodeId,
    pub kind: VariableKind,
    pub ty: Option<NodeId>,
    pub is_const: bool,
    /// Initial value; for iteration variables, the iterated collection
    pub initializer: Option<NodeId>,
}
