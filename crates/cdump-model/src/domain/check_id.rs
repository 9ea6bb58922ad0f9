use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Stable identifier used to request a check from the registry.
///
/// Checks can be addressed either by their name (`ImagePullBackOff`) or by
/// their numeric code (`0`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CheckId {
    Code(u32),
    Name(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("empty check identifier")]
pub struct ParseCheckIdError;

impl FromStr for CheckId {
    type Err = ParseCheckIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ParseCheckIdError);
        }
        match s.parse::<u32>() {
            Ok(code) => Ok(CheckId::Code(code)),
            Err(_) => Ok(CheckId::Name(s.to_string())),
        }
    }
}

impl fmt::Display for CheckId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckId::Code(code) => write!(f, "{code}"),
            CheckId::Name(name) => f.write_str(name),
        }
    }
}

impl From<u32> for CheckId {
    fn from(code: u32) -> Self {
        CheckId::Code(code)
    }
}

impl From<&str> for CheckId {
    fn from(name: &str) -> Self {
        CheckId::Name(name.to_string())
    }
}
