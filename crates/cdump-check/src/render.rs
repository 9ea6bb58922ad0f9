use std::{fmt, str::FromStr};

use cdump_model::Report;

use crate::error::CheckError;

/// Serialization of an analysis [`Report`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Format {
    #[default]
    Json,
    Yaml,
}

impl FromStr for Format {
    type Err = CheckError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(Format::Json),
            "yaml" | "yml" => Ok(Format::Yaml),
            other => Err(CheckError::UnknownFormat(other.to_string())),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Format::Json => "json",
            Format::Yaml => "yaml",
        })
    }
}

/// Renders `report` as `{"results": [...]}`.
///
/// `pretty` indents JSON; YAML is always block-formatted.
pub fn render(report: &Report, format: Format, pretty: bool) -> Result<String, CheckError> {
    let rendered = match (format, pretty) {
        (Format::Json, true) => serde_json::to_string_pretty(report).map_err(|e| e.to_string()),
        (Format::Json, false) => serde_json::to_string(report).map_err(|e| e.to_string()),
        (Format::Yaml, _) => serde_yaml::to_string(report).map_err(|e| e.to_string()),
    };
    rendered.map_err(CheckError::Render)
}
