use std::path::PathBuf;

use cdump_check::CheckError;
use cdump_core::ArchiveError;
use cdump_exec::ExecError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DumpError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("discover projects: {0}")]
    Discovery(#[source] ExecError),
    #[error("no projects visible to the currently logged in user")]
    NoProjects,
    #[error("archive: {0}")]
    Archive(#[from] ArchiveError),
    #[error(transparent)]
    Check(#[from] CheckError),
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("format timestamp: {0}")]
    Timestamp(String),
}
