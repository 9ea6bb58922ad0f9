//! Collection runtime of the dump tool.
//!
//! - [`task`]: the unit of work and its outcome.
//! - [`pool`]: bounded concurrent execution of a task stream.
//! - [`sink`]: output destinations (files, memory, archive entries).
//! - [`archive`]: the single-consumer `.tar.gz` multiplexer.
pub mod archive;
pub use archive::{Archive, ArchiveEntry, ArchiveError, ArchiveOptions, ArchiveWriter};

pub mod error;
pub use error::{ErrorList, TaskError};

pub mod pool;
pub use pool::{PoolConfig, RunReport, run};

pub mod sink;
pub use sink::{PlatformOutput, ProjectOutput, Sink, SinkError, SinkFactory};

pub mod task;
pub use task::{Task, TaskOutcome, task_stream};
