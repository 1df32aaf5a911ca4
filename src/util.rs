//! Common utilities

pub mod diag;
