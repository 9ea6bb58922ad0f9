//! External collaborator of the dump tool: the cluster CLI.
//!
//! Commands are described by [`Invocation`] and turned into processes by a
//! [`CommandFactory`]; [`OcCli`] is the production mapping. [`Cluster`]
//! answers topology questions and [`collect`] builds the collection tasks.
mod error;
pub use error::ExecError;

mod command;
pub use command::{CommandFactory, Invocation, OcCli};

mod proc;
pub use proc::{Captured, capture, describe, run_command, words};

mod cluster;
pub use cluster::Cluster;

pub mod collect;

mod util;
