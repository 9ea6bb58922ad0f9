//! Check engine: pluggable checks over a captured dump.
//!
//! A [`Check`] declares the file suffixes it needs and examines matching
//! files one at a time. [`analyse`] resolves check identifiers through a
//! [`CheckRegistry`], feeds each check its files from a [`Dump`] and gathers
//! the results into a [`Report`](cdump_model::Report).
mod error;
pub use error::CheckError;

pub mod check;
pub use check::{Check, EventCheck};

mod registry;
pub use registry::CheckRegistry;

pub mod dump;
pub use dump::{DirDump, Dump, MemoryDump, Scoped, open_path};

mod analyse;
pub use analyse::{Analysis, analyse, matching_files};

mod render;
pub use render::{Format, render};
