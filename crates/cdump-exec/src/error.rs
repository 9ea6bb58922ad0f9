use cdump_core::{ErrorList, SinkError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExecError {
    #[error("spawn {command:?}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("command {command:?}: {status}: {stderr}")]
    Failed {
        command: String,
        status: String,
        stderr: String,
    },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("cancelled")]
    Cancelled,
    #[error(transparent)]
    Sink(#[from] SinkError),
    #[error(transparent)]
    Multiple(#[from] ErrorList),
}
