//! Built-in types of the `System` namespace

use std::rc::Rc;

use indexmap::IndexMap;
use smallvec::SmallVec;

use crate::ast::kind::{KnownType, LiteralValue};
use crate::syntax::token::NumberSuffix;

use super::def::{Definition, TypeDef, TypeOrigin};

/// Namespace of the built-in types
pub const SYSTEM: &str = "System";

/// Shared definitions of the [`KnownType`]s
#[derive(Debug, Clone)]
pub struct Builtins {
    types: Vec<(KnownType, Rc<Definition>)>,
}

impl Default for Builtins {
    fn default() -> Self {
        Self::new()
    }
}

impl Builtins {
    pub fn new() -> Self {
        let types = KnownType::ALL
            .iter()
            .map(|ty| {
                let def = Definition::Type(TypeDef {
                    name: ty.name().to_string(),
                    origin: TypeOrigin::Builtin(*ty),
                    members: IndexMap::new(),
                    constructors: SmallVec::new(),
                    base_types: Vec::new(),
                });
                (*ty, Rc::new(def))
            })
            .collect();

        Self { types }
    }

    pub fn get(&self, ty: KnownType) -> Rc<Definition> {
        self.types
            .iter()
            .find(|(t, _)| *t == ty)
            .map(|(_, def)| Rc::clone(def))
            .unwrap_or_else(|| unreachable!("every known type has a definition"))
    }

    /// Type by its `System` name, e.g. `Int32`
    pub fn by_name(&self, name: &str, case_sensitive: bool) -> Option<Rc<Definition>> {
        self.types
            .iter()
            .find(|(ty, _)| super::same_name(case_sensitive, ty.name(), name))
            .map(|(_, def)| Rc::clone(def))
    }

    /// Type by a keyword alias of either syntax: `int`, `Integer`, `bool`, ..
    pub fn by_keyword(&self, word: &str, case_sensitive: bool) -> Option<Rc<Definition>> {
        self.types
            .iter()
            .find(|(ty, _)| {
                ty.csharp_keyword() == word
                    || super::same_name(case_sensitive, ty.vb_keyword(), word)
            })
            .map(|(_, def)| Rc::clone(def))
    }
}

/// Type of a literal value
///
/// Unsuffixed integers take the first of `Int32`, `UInt32`, `Int64`, `UInt64` that holds the
/// value.
pub fn literal_type(value: &LiteralValue) -> Option<KnownType> {
    Some(match value {
        LiteralValue::Null => return None,
        LiteralValue::Boolean(_) => KnownType::Boolean,
        LiteralValue::String(_) => KnownType::String,
        LiteralValue::Char(_) => KnownType::Char,
        LiteralValue::Integer { value, suffix } => match suffix {
            NumberSuffix::None => {
                if *value <= i32::MAX as u64 {
                    KnownType::Int32
                } else if *value <= u32::MAX as u64 {
                    KnownType::UInt32
                } else if *value <= i64::MAX as u64 {
                    KnownType::Int64
                } else {
                    KnownType::UInt64
                }
            }
            suffix => self::suffix_type(*suffix)?,
        },
        LiteralValue::Real { suffix, .. } => match suffix {
            NumberSuffix::None => KnownType::Double,
            suffix => self::suffix_type(*suffix)?,
        },
    })
}

fn suffix_type(suffix: NumberSuffix) -> Option<KnownType> {
    Some(match suffix {
        NumberSuffix::None => return None,
        NumberSuffix::Short => KnownType::Int16,
        NumberSuffix::UShort => KnownType::UInt16,
        NumberSuffix::Integer => KnownType::Int32,
        NumberSuffix::UInteger => KnownType::UInt32,
        NumberSuffix::Long => KnownType::Int64,
        NumberSuffix::ULong => KnownType::UInt64,
        NumberSuffix::Float => KnownType::Single,
        NumberSuffix::Double => KnownType::Double,
        NumberSuffix::Decimal => KnownType::Decimal,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aliases() {
        let builtins = Builtins::new();
        let int = builtins.get(KnownType::Int32);
        assert_eq!(builtins.by_keyword("int", true), Some(Rc::clone(&int)));
        assert_eq!(builtins.by_keyword("integer", false), Some(Rc::clone(&int)));
        assert_eq!(builtins.by_keyword("integer", true), None);
        assert_eq!(builtins.by_name("int32", false), Some(int));
        assert_eq!(builtins.by_name("int32", true), None);
    }

    #[test]
    fn unsuffixed_integers_grow() {
        let int = |value| LiteralValue::Integer {
            value,
            suffix: NumberSuffix::None,
        };
        assert_eq!(literal_type(&int(1)), Some(KnownType::Int32));
        assert_eq!(literal_type(&int(3_000_000_000)), Some(KnownType::UInt32));
        assert_eq!(literal_type(&int(5_000_000_000)), Some(KnownType::Int64));
        assert_eq!(literal_type(&LiteralValue::Null), None);
    }
}
