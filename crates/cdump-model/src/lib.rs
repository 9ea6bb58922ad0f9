//! Shared data types of the dump tool.
//!
//! Everything here is plain data: identities of collected cluster objects and
//! the structured output of diagnostic checks.
mod domain;
pub use domain::*;
