/*!
One abstract syntax tree, several surface syntaxes

Source in a C#-like or a VB-like syntax is tokenized, parsed with a declarative grammar and lowered
into the shared [`ast::Ast`]. The tree can be queried for what its names mean ([`resolve`]) and
printed back in either syntax ([`write`]), which makes conversion between the two a parse followed
by a write.

```text
 source ─ lex ─▶ tokens ─ grammar ─▶ raw tree ─ lower ─▶ Ast ─ write ─▶ source
                                                          │
                                                          └─ resolve ─▶ ResolveResult
```
*/

pub mod ast;
pub mod grammar;
pub mod lang;
pub mod resolve;
pub mod syntax;
pub mod util;
pub mod write;

pub use crate::{
    lang::{Language, SurfaceSyntax},
    syntax::{Fragment, ParseError, ParseResult},
};
