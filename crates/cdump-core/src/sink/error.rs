use thiserror::Error;

use crate::archive::ArchiveError;

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("write {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Archive(#[from] ArchiveError),
}
