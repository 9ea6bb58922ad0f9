use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

/// Outcome of a diagnostic check.
///
/// Serialized as its numeric code (`0` = not detected, `1` = detected) so the
/// output stays compatible with consumers of earlier dump reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum CheckStatus {
    /// The failure signature was not found in any examined file.
    #[default]
    NotDetected,
    /// At least one record matched the failure signature.
    Detected,
}

impl CheckStatus {
    #[inline]
    pub fn code(self) -> u8 {
        match self {
            CheckStatus::NotDetected => 0,
            CheckStatus::Detected => 1,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(CheckStatus::NotDetected),
            1 => Some(CheckStatus::Detected),
            _ => None,
        }
    }

    #[inline]
    pub fn is_detected(self) -> bool {
        matches!(self, CheckStatus::Detected)
    }
}

impl Serialize for CheckStatus {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u8(self.code())
    }
}

impl<'de> Deserialize<'de> for CheckStatus {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let code = u8::deserialize(deserializer)?;
        CheckStatus::from_code(code)
            .ok_or_else(|| de::Error::custom(format!("unknown check status code: {code}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_not_detected() {
        assert_eq!(CheckStatus::default(), CheckStatus::NotDetected);
        assert!(!CheckStatus::default().is_detected());
    }

    #[test]
    fn serializes_as_code() {
        assert_eq!(serde_json::to_string(&CheckStatus::Detected).unwrap(), "1");
        assert_eq!(serde_json::to_string(&CheckStatus::NotDetected).unwrap(), "0");
    }

    #[test]
    fn rejects_unknown_code() {
        assert!(serde_json::from_str::<CheckStatus>("7").is_err());
        assert_eq!(
            serde_json::from_str::<CheckStatus>("1").unwrap(),
            CheckStatus::Detected
        );
    }
}
