use std::{fmt, time::Duration};

use thiserror::Error;

/// Why a single task did not succeed.
#[derive(Error, Debug)]
pub enum TaskError {
    #[error("{0}")]
    Failed(String),
    #[error(transparent)]
    Multiple(#[from] ErrorList),
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("cancelled")]
    Cancelled,
    #[error("panicked: {0}")]
    Panicked(String),
}

impl TaskError {
    pub fn fail(reason: impl fmt::Display) -> Self {
        TaskError::Failed(reason.to_string())
    }
}

/// Several independent failures reported as one error.
///
/// Renders as `multiple errors:` followed by one line per failure.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ErrorList(Vec<String>);

impl ErrorList {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, err: impl fmt::Display) {
        self.0.push(err.to_string());
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// `Ok(())` when nothing was pushed, the list itself otherwise.
    pub fn into_result(self) -> Result<(), ErrorList> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for ErrorList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "multiple errors:\n{}", self.0.join("\n"))
    }
}

impl std::error::Error for ErrorList {}

impl<E: fmt::Display> FromIterator<E> for ErrorList {
    fn from_iter<I: IntoIterator<Item = E>>(iter: I) -> Self {
        Self(iter.into_iter().map(|e| e.to_string()).collect())
    }
}
