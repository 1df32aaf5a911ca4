//! C#-like surface syntax data

use crate::{ast::kind::Modifier, lang::LanguageData, syntax::token::TokenKind as K};

pub static DATA: LanguageData = LanguageData {
    name: "C#",
    case_sensitive: true,
    keywords: KEYWORDS,
    modifiers: MODIFIERS,
    member_identifiers: MEMBER_IDENTIFIERS,
};

static KEYWORDS: &[(&str, K)] = &[
    ("abstract", K::Abstract),
    ("as", K::As),
    ("base", K::Base),
    ("bool", K::Bool),
    ("break", K::Break),
    ("byte", K::Byte),
    ("case", K::Case),
    ("catch", K::Catch),
    ("char", K::Char),
    ("class", K::Class),
    ("const", K::Const),
    ("continue", K::Continue),
    ("decimal", K::Decimal),
    ("default", K::Default),
    ("do", K::Do),
    ("double", K::Double),
    ("else", K::Else),
    ("enum", K::Enum),
    ("event", K::Event),
    ("extern", K::Extern),
    ("false", K::False),
    ("finally", K::Finally),
    ("fixed", K::Fixed),
    ("float", K::Float),
    ("for", K::For),
    ("foreach", K::Foreach),
    ("if", K::If),
    ("in", K::In),
    ("int", K::Int),
    ("interface", K::Interface),
    ("internal", K::Internal),
    ("is", K::Is),
    ("lock", K::Lock),
    ("long", K::Long),
    ("namespace", K::Namespace),
    ("new", K::New),
    ("null", K::Null),
    ("object", K::Object),
    ("out", K::Out),
    ("override", K::Override),
    ("params", K::Params),
    ("private", K::Private),
    ("protected", K::Protected),
    ("public", K::Public),
    ("readonly", K::Readonly),
    ("ref", K::Ref),
    ("return", K::Return),
    ("sbyte", K::SByte),
    ("sealed", K::Sealed),
    ("short", K::Short),
    ("static", K::Static),
    ("string", K::String),
    ("struct", K::Struct),
    ("switch", K::Switch),
    ("this", K::This),
    ("throw", K::Throw),
    ("true", K::True),
    ("try", K::Try),
    ("typeof", K::TypeOf),
    ("uint", K::UInt),
    ("ulong", K::ULong),
    ("unsafe", K::Unsafe),
    ("ushort", K::UShort),
    ("using", K::Using),
    ("virtual", K::Virtual),
    ("void", K::Void),
    ("volatile", K::Volatile),
    ("while", K::While),
];

static MODIFIERS: &[(&str, Modifier)] = &[
    ("public", Modifier::Public),
    ("private", Modifier::Private),
    ("protected", Modifier::Protected),
    ("internal", Modifier::Internal),
    ("static", Modifier::Static),
    ("abstract", Modifier::Abstract),
    ("virtual", Modifier::Virtual),
    ("override", Modifier::Override),
    ("sealed", Modifier::Sealed),
    ("readonly", Modifier::Readonly),
    ("const", Modifier::Const),
    ("extern", Modifier::Extern),
    ("new", Modifier::New),
    ("partial", Modifier::Partial),
    ("volatile", Modifier::Volatile),
    ("unsafe", Modifier::Unsafe),
];

static MEMBER_IDENTIFIERS: &[(&str, K)] = &[
    ("get", K::Get),
    ("set", K::Set),
    ("value", K::Value),
    ("var", K::Var),
    ("partial", K::Partial),
    ("add", K::Add),
    ("remove", K::Remove),
];
