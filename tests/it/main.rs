//! The only integration test crate

pub mod test_convert;
pub mod test_props;
pub mod test_resolve;
pub mod test_syntax;

// defines test case DSL
pub mod util;
