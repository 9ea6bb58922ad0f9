use cdump_model::CheckId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CheckError {
    #[error("no such check: {0}")]
    NoSuchCheck(CheckId),
    #[error("{file}: invalid input: {source}")]
    Parse {
        file: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("{file}: {source}")]
    Io {
        file: String,
        #[source]
        source: std::io::Error,
    },
    #[error("unsupported format {0:?}")]
    UnknownFormat(String),
    #[error("render: {0}")]
    Render(String),
}
