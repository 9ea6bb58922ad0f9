use serde::{Deserialize, Serialize};

use crate::CheckResult;

/// Aggregated results of an analysis run, serialized as `{"results": [...]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub results: Vec<CheckResult>,
}

impl Report {
    pub fn new(results: Vec<CheckResult>) -> Self {
        Self { results }
    }

    /// Returns `true` if any check detected its failure signature.
    pub fn any_detected(&self) -> bool {
        self.results.iter().any(CheckResult::is_detected)
    }
}
