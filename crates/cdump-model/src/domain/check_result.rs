use serde::{Deserialize, Serialize};

use crate::CheckStatus;

/// Status message of a check that found nothing.
pub const NOT_DETECTED_MESSAGE: &str = "This issue has not been detected";
/// Status message of a check that matched at least one record.
pub const DETECTED_MESSAGE: &str = "This issue may be present in the system";

/// One anomaly discovered by a check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Info {
    /// Path of the file the record was found in.
    pub file: String,
    /// Raw text of the matched record.
    pub entry: String,
    /// Name of the affected object.
    pub object_name: String,
    /// Project (namespace) of the affected object.
    pub namespace: String,
    /// How many times the cluster observed the record.
    pub count: u64,
}

/// Accumulated output of one check.
///
/// Appended to only by the check that owns it; callers receive clones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckResult {
    pub check_name: String,
    pub status: CheckStatus,
    pub status_message: String,
    #[serde(default)]
    pub info: Vec<Info>,
}

impl CheckResult {
    /// Fresh "not detected" result for the named check.
    pub fn new(check_name: impl Into<String>) -> Self {
        Self {
            check_name: check_name.into(),
            status: CheckStatus::NotDetected,
            status_message: NOT_DETECTED_MESSAGE.to_string(),
            info: Vec::new(),
        }
    }

    #[inline]
    pub fn is_detected(&self) -> bool {
        self.status.is_detected()
    }

    /// Appends anomalies and flips the status to detected.
    ///
    /// An empty batch leaves the result untouched.
    pub fn record<I>(&mut self, found: I)
    where
        I: IntoIterator<Item = Info>,
    {
        let before = self.info.len();
        self.info.extend(found);
        if self.info.len() > before {
            self.status = CheckStatus::Detected;
            self.status_message = DETECTED_MESSAGE.to_string();
        }
    }
}
