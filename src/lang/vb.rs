//! VB-like surface syntax data
//!
//! Spellings are the canonical (Pascal case) ones; lookups are case-insensitive.

use crate::{ast::kind::Modifier, lang::LanguageData, syntax::token::TokenKind as K};

pub static DATA: LanguageData = LanguageData {
    name: "VB",
    case_sensitive: false,
    keywords: KEYWORDS,
    modifiers: MODIFIERS,
    member_identifiers: MEMBER_IDENTIFIERS,
};

static KEYWORDS: &[(&str, K)] = &[
    ("And", K::And),
    ("AndAlso", K::AndAlso),
    ("As", K::As),
    ("Boolean", K::Boolean),
    ("ByRef", K::ByRef),
    ("Byte", K::Byte),
    ("ByVal", K::ByVal),
    ("Case", K::Case),
    ("Catch", K::Catch),
    ("Char", K::Char),
    ("Class", K::Class),
    ("Const", K::Const),
    ("Continue", K::Continue),
    ("CType", K::CType),
    ("Decimal", K::Decimal),
    ("Dim", K::Dim),
    ("DirectCast", K::DirectCast),
    ("Do", K::Do),
    ("Double", K::Double),
    ("Each", K::Each),
    ("Else", K::Else),
    ("ElseIf", K::ElseIf),
    ("End", K::End),
    ("Enum", K::Enum),
    ("Event", K::Event),
    ("Exit", K::Exit),
    ("False", K::False),
    ("Finally", K::Finally),
    ("For", K::For),
    ("Friend", K::Friend),
    ("Function", K::Function),
    ("GetType", K::GetType),
    ("If", K::If),
    ("Implements", K::Implements),
    ("Imports", K::Imports),
    ("In", K::In),
    ("Inherits", K::Inherits),
    ("Integer", K::Integer),
    ("Interface", K::Interface),
    ("Is", K::Is),
    ("IsNot", K::IsNot),
    ("Long", K::Long),
    ("Loop", K::Loop),
    ("Me", K::Me),
    ("Mod", K::Mod),
    ("Module", K::Module),
    ("MustInherit", K::MustInherit),
    ("MustOverride", K::MustOverride),
    ("MyBase", K::MyBase),
    ("Namespace", K::Namespace),
    ("New", K::New),
    ("Next", K::Next),
    ("Not", K::Not),
    ("Nothing", K::Nothing),
    ("NotInheritable", K::NotInheritable),
    ("NotOverridable", K::NotOverridable),
    ("Object", K::Object),
    ("Optional", K::Optional),
    ("Or", K::Or),
    ("OrElse", K::OrElse),
    ("Overridable", K::Overridable),
    ("Overrides", K::Overrides),
    ("ParamArray", K::ParamArray),
    ("Private", K::Private),
    ("Property", K::Property),
    ("Protected", K::Protected),
    ("Public", K::Public),
    ("ReadOnly", K::Readonly),
    ("Return", K::Return),
    ("SByte", K::SByte),
    ("Select", K::Select),
    ("Shadows", K::Shadows),
    ("Shared", K::Shared),
    ("Short", K::Short),
    ("Single", K::Single),
    ("Step", K::Step),
    ("String", K::String),
    ("Structure", K::Structure),
    ("Sub", K::Sub),
    ("SyncLock", K::SyncLock),
    ("Then", K::Then),
    ("Throw", K::Throw),
    ("To", K::To),
    ("True", K::True),
    ("Try", K::Try),
    ("TryCast", K::TryCast),
    ("TypeOf", K::TypeOf),
    ("UInteger", K::UInteger),
    ("ULong", K::ULong),
    ("UShort", K::UShort),
    ("Until", K::Until),
    ("Using", K::Using),
    ("While", K::While),
    ("WriteOnly", K::WriteOnly),
    ("Xor", K::Xor),
];

static MODIFIERS: &[(&str, Modifier)] = &[
    ("Public", Modifier::Public),
    ("Private", Modifier::Private),
    ("Protected", Modifier::Protected),
    ("Friend", Modifier::Internal),
    ("Shared", Modifier::Static),
    ("MustInherit", Modifier::Abstract),
    ("MustOverride", Modifier::Abstract),
    ("Overridable", Modifier::Virtual),
    ("Overrides", Modifier::Override),
    ("NotInheritable", Modifier::Sealed),
    ("NotOverridable", Modifier::Sealed),
    ("ReadOnly", Modifier::Readonly),
    ("Const", Modifier::Const),
    ("Shadows", Modifier::New),
    ("Partial", Modifier::Partial),
    ("WriteOnly", Modifier::WriteOnly),
];

static MEMBER_IDENTIFIERS: &[(&str, K)] = &[
    ("Get", K::Get),
    ("Set", K::Set),
    ("Value", K::Value),
    ("Partial", K::Partial),
];
