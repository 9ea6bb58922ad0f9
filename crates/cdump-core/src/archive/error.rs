use thiserror::Error;

#[derive(Error, Debug)]
pub enum ArchiveError {
    /// The archive stopped accepting entries before this one was submitted.
    #[error("archive closed; entry {name:?} was not written")]
    Closed { name: String },
    /// The archive was finalized while handles were still open.
    #[error("archive finalized with {open} entries still open")]
    EntriesStillOpen { open: usize },
    #[error("write entry {name:?}: {source}")]
    Write {
        name: String,
        #[source]
        source: std::io::Error,
    },
    #[error("finalize archive: {0}")]
    Finish(#[source] std::io::Error),
    #[error("archive writer stopped: {0}")]
    Consumer(String),
}
